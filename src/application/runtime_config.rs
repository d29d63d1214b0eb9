use std::num::NonZeroUsize;
use std::path::PathBuf;

use crate::cli::Cli;

#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub session: String,
    pub root: PathBuf,
    /// Upper bound on cycles; the run stops earlier once nothing propagates.
    pub cycles: NonZeroUsize,
    pub dry_run: bool,
}

impl From<Cli> for RuntimeConfig {
    fn from(cli: Cli) -> Self {
        Self {
            session: cli.session,
            root: cli.root,
            cycles: cli.cycles,
            dry_run: cli.dry_run,
        }
    }
}
