use std::num::NonZeroUsize;
use std::path::PathBuf;

use clap::Parser;

use crate::application::data::LogLevel;

/// Keep two file trees in step through a shared ancestor.
#[derive(Parser, Debug, Clone)]
#[command(version)]
pub struct Cli {
    /// Session to synchronize, as named in tandem.yaml
    pub session: String,
    #[clap(long, short, default_value = "warn", value_enum)]
    pub log_level: LogLevel,
    /// Directory holding tandem.yaml; relative endpoint locations resolve against it
    #[clap(long, short, default_value = ".")]
    pub root: PathBuf,
    /// Maximum number of cycles; stops early once nothing is left to propagate
    #[clap(long, default_value = "1")]
    pub cycles: NonZeroUsize,
    /// Reconcile and report without staging or applying anything
    #[clap(long)]
    pub dry_run: bool,
}
