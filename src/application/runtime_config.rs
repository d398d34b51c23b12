use std::path::PathBuf;

use scopewatch::{AssetId, HierarchyConfig};

use crate::cli::Cli;

#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub snapshot: PathBuf,
    pub hierarchy: HierarchyConfig,
    pub monitored: Vec<AssetId>,
    pub include_descendants: bool,
}

impl From<Cli> for RuntimeConfig {
    fn from(cli: Cli) -> Self {
        Self {
            snapshot: cli.snapshot,
            hierarchy: HierarchyConfig {
                path_separator: cli.separator,
            },
            monitored: cli.monitor.into_iter().map(AssetId::from).collect(),
            include_descendants: cli.descendants,
        }
    }
}
