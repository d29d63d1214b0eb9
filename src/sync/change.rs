use std::fmt;

use super::content_hash::ContentHash;
use super::entry::Entry;
use super::path;

/// A single structural edit: the entry at `path` was `old` and becomes `new`.
///
/// `old` is a precondition. Appliers refuse to apply a change whose `old`
/// no longer matches what is actually at `path`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Change {
    pub path: String,
    pub old: Entry,
    pub new: Entry,
}

/// File content that must be present at an endpoint before a change creating
/// it can be applied there.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageRequest {
    pub path: String,
    pub digest: ContentHash,
}

impl Change {
    pub fn new(path: impl Into<String>, old: Entry, new: Entry) -> Self {
        Change {
            path: path.into(),
            old,
            new,
        }
    }

    pub fn is_creation(&self) -> bool {
        self.old.is_absent() && !self.new.is_absent()
    }

    pub fn is_deletion(&self) -> bool {
        !self.old.is_absent() && self.new.is_absent()
    }

    /// Files this change introduces whose content the destination does not
    /// already hold at the same location.
    pub fn stage_requests(&self) -> Vec<StageRequest> {
        self.new
            .files(&self.path)
            .into_iter()
            .filter(|(file_path, digest)| {
                let relative = file_path[self.path.len()..].trim_start_matches(path::SEPARATOR);
                !matches!(
                    self.old.entry_at(relative),
                    Entry::File { digest: existing, .. } if existing == digest
                )
            })
            .map(|(path, digest)| StageRequest { path, digest })
            .collect()
    }
}

impl fmt::Display for Change {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let path = path::display(&self.path);
        if self.is_creation() {
            write!(f, "create {} {}", self.new.kind(), path)
        } else if self.is_deletion() {
            write!(f, "delete {} {}", self.old.kind(), path)
        } else if self.old.kind() == self.new.kind() {
            write!(f, "modify {} {}", self.new.kind(), path)
        } else {
            write!(
                f,
                "replace {} with {} at {}",
                self.old.kind(),
                self.new.kind(),
                path
            )
        }
    }
}

/// Collects the stage requests of every change in a script.
pub fn stage_requests(changes: &[Change]) -> Vec<StageRequest> {
    changes.iter().flat_map(Change::stage_requests).collect()
}
