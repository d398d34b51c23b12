use std::fmt;

use colored::Colorize;
use scopewatch::ext::TimestampExt;
use time::OffsetDateTime;

/// One line of the hierarchy listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportedProject {
    pub path_name: String,
    pub is_root: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonitorSummary {
    pub monitored: usize,
    pub most_recent_change: Option<OffsetDateTime>,
    pub most_recent_creation: Option<OffsetDateTime>,
}

/// Everything `scopewatch` prints for a snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Report {
    pub projects: Vec<ReportedProject>,
    pub monitor: Option<MonitorSummary>,
}

fn write_timestamp(f: &mut fmt::Formatter<'_>, timestamp: Option<OffsetDateTime>) -> fmt::Result {
    match timestamp {
        Some(timestamp) => writeln!(f, "{}", timestamp.to_query_literal()),
        None => writeln!(f, "{}", "never".dimmed()),
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for project in &self.projects {
            if project.is_root {
                writeln!(f, "{}", project.path_name.bold().green())?;
            } else {
                writeln!(f, "{}", project.path_name)?;
            }
        }

        if let Some(summary) = &self.monitor {
            writeln!(f)?;
            writeln!(f, "Monitoring {} project(s)", summary.monitored)?;
            write!(f, "  most recent change:   ")?;
            write_timestamp(f, summary.most_recent_change)?;
            write!(f, "  most recent creation: ")?;
            write_timestamp(f, summary.most_recent_creation)?;
        }
        Ok(())
    }
}
