use std::path::PathBuf;

use clap::Parser;

use crate::application::data::LogLevel;

#[derive(Parser, Debug, Clone)]
#[command(version)]
pub struct Cli {
    /// YAML snapshot of the repository to inspect
    pub snapshot: PathBuf,
    #[clap(long, short, default_value = "warn", value_enum)]
    pub log_level: LogLevel,

    /// Separator placed between project names in a path
    #[clap(long, short, default_value = "\\")]
    pub separator: String,

    /// Project whose items are monitored, may be repeated
    #[clap(long, short)]
    pub monitor: Vec<String>,

    /// Also monitor every project below each `--monitor` project
    #[clap(long, short)]
    pub descendants: bool,
}
