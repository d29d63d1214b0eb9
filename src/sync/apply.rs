//! Applies edit scripts to snapshots.

use snafu::{OptionExt, Snafu, ensure};
use tracing::trace;

use super::change::Change;
use super::entry::Entry;
use super::path;

/// Applies `changes` to `root` in order and returns the resulting snapshot.
///
/// Each change sees the effect of the ones before it, so a script may create
/// a directory and then populate it. Application is all-or-nothing: `root`
/// is never modified, and on failure no partially updated tree escapes.
pub fn apply(root: &Entry, changes: &[Change]) -> Result<Entry, ApplyError> {
    let mut result = root.clone();
    for change in changes {
        let components = path::components(&change.path).collect::<Vec<_>>();
        result = replace(&result, &components, change)?;
    }
    trace!("Applied {} changes", changes.len());
    Ok(result)
}

fn replace(current: &Entry, components: &[&str], change: &Change) -> Result<Entry, ApplyError> {
    let Some((name, rest)) = components.split_first() else {
        ensure!(
            *current == change.old,
            StaleStateSnafu {
                path: &change.path
            }
        );
        return Ok(change.new.clone());
    };

    ensure!(
        path::is_valid_name(name) && current.is_directory(),
        PathSnafu {
            path: &change.path
        }
    );
    let replaced = replace(current.child(name), rest, change)?;
    current.with_child(name, replaced).context(PathSnafu {
        path: &change.path,
    })
}

#[derive(Debug, Snafu, PartialEq, Eq)]
pub enum ApplyError {
    #[snafu(display("Cannot apply change at '{}': the path is malformed or its parent is not a directory", path::display(path)))]
    PathError { path: String },
    #[snafu(display("Cannot apply change at '{}': the current entry does not match the expected state", path::display(path)))]
    StaleStateError { path: String },
}
