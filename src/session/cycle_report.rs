use std::fmt;

use colored::Colorize;

use crate::sync::{Change, Conflict};

/// What a cycle propagated, or would propagate in a dry run.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CycleReport {
    /// Changes applied to alpha (they originate on beta).
    pub to_alpha: Vec<Change>,
    /// Changes applied to beta (they originate on alpha).
    pub to_beta: Vec<Change>,
    pub conflicts: Vec<Conflict>,
    /// Set when nothing was staged or applied.
    pub dry_run: bool,
}

impl CycleReport {
    /// True when the cycle had nothing to propagate in either direction.
    pub fn is_settled(&self) -> bool {
        self.to_alpha.is_empty() && self.to_beta.is_empty()
    }

    /// Prints every propagated change and conflict to stdout.
    pub fn print(&self, session: &str) {
        let verb = if self.dry_run { "would apply" } else { "applied" };
        println!("{} {}", session.bold(), self);

        for change in &self.to_beta {
            println!("  {} {} {}", "alpha → beta".green(), verb.dimmed(), change);
        }
        for change in &self.to_alpha {
            println!("  {} {} {}", "beta → alpha".cyan(), verb.dimmed(), change);
        }
        for conflict in &self.conflicts {
            let label = if conflict.is_deletion_conflict() {
                "conflict (deleted on one side)"
            } else {
                "conflict"
            };
            println!("  {} {}", label.red().bold(), conflict);
            for change in &conflict.alpha_changes {
                println!("    {} {}", "alpha:".yellow(), change);
            }
            for change in &conflict.beta_changes {
                println!("    {} {}", "beta:".yellow(), change);
            }
        }
    }
}

impl fmt::Display for CycleReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} change(s) to alpha, {} change(s) to beta, {} conflict(s)",
            self.to_alpha.len(),
            self.to_beta.len(),
            self.conflicts.len()
        )?;
        if self.dry_run {
            write!(f, " (dry run)")?;
        }
        Ok(())
    }
}
