use std::fmt;

use super::change::Change;
use super::path;

/// A path edited incompatibly on both sides since the ancestor.
///
/// Each side's list holds that side's changes relative to the ancestor within
/// the conflicting subtree. At least one change on each side sits at `path`
/// or beneath it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Conflict {
    pub path: String,
    pub alpha_changes: Vec<Change>,
    pub beta_changes: Vec<Change>,
}

impl Conflict {
    /// True when one side removed the conflicting subtree entirely while the
    /// other still has content there.
    pub fn is_deletion_conflict(&self) -> bool {
        let deleted = |changes: &[Change]| {
            changes
                .iter()
                .any(|change| change.path == self.path && change.is_deletion())
        };
        deleted(&self.alpha_changes) || deleted(&self.beta_changes)
    }
}

impl fmt::Display for Conflict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({} change(s) on alpha, {} on beta)",
            path::display(&self.path),
            self.alpha_changes.len(),
            self.beta_changes.len()
        )
    }
}
