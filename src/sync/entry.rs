use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use derive_more::Display;

use super::content_hash::ContentHash;
use super::path;

/// Children of a directory entry, keyed by name.
pub type Children = BTreeMap<String, Entry>;

static ABSENT: Entry = Entry::Absent;

/// One node of an immutable filesystem snapshot.
///
/// Entries are values: they are never mutated after construction, and cloning
/// one only bumps the reference count of its children, so unchanged subtrees
/// are shared between snapshots instead of copied.
#[derive(Debug, Clone, Default)]
pub enum Entry {
    /// Nothing exists at this location.
    #[default]
    Absent,
    File {
        digest: ContentHash,
        executable: bool,
    },
    Symlink {
        target: String,
    },
    /// A directory. `Absent` is never stored as a child.
    Directory {
        children: Arc<Children>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum EntryKind {
    #[display("absent")]
    Absent,
    #[display("file")]
    File,
    #[display("symlink")]
    Symlink,
    #[display("directory")]
    Directory,
}

impl Entry {
    pub fn file(digest: ContentHash) -> Self {
        Entry::File {
            digest,
            executable: false,
        }
    }

    pub fn executable_file(digest: ContentHash) -> Self {
        Entry::File {
            digest,
            executable: true,
        }
    }

    pub fn symlink(target: impl Into<String>) -> Self {
        Entry::Symlink {
            target: target.into(),
        }
    }

    pub fn empty_directory() -> Self {
        Entry::Directory {
            children: Arc::new(Children::new()),
        }
    }

    /// Builds a directory from `(name, entry)` pairs, dropping absent children.
    pub fn directory<N, I>(children: I) -> Self
    where
        N: Into<String>,
        I: IntoIterator<Item = (N, Entry)>,
    {
        let children = children
            .into_iter()
            .filter(|(_, entry)| !entry.is_absent())
            .map(|(name, entry)| (name.into(), entry))
            .collect::<Children>();

        Entry::Directory {
            children: Arc::new(children),
        }
    }

    pub fn kind(&self) -> EntryKind {
        match self {
            Entry::Absent => EntryKind::Absent,
            Entry::File { .. } => EntryKind::File,
            Entry::Symlink { .. } => EntryKind::Symlink,
            Entry::Directory { .. } => EntryKind::Directory,
        }
    }

    pub fn is_absent(&self) -> bool {
        matches!(self, Entry::Absent)
    }

    pub fn is_directory(&self) -> bool {
        matches!(self, Entry::Directory { .. })
    }

    pub fn children(&self) -> Option<&Children> {
        match self {
            Entry::Directory { children } => Some(children.as_ref()),
            _ => None,
        }
    }

    /// Returns the named child, or `Absent` if there is none (including when
    /// this entry is not a directory).
    pub fn child(&self, name: &str) -> &Entry {
        self.children()
            .and_then(|children| children.get(name))
            .unwrap_or(&ABSENT)
    }

    /// Looks up the entry at a root-relative path.
    pub fn entry_at(&self, path: &str) -> &Entry {
        path::components(path).fold(self, |current, name| current.child(name))
    }

    /// Returns a copy of this directory with `name` replaced by `entry`.
    ///
    /// Siblings are shared with the original. Passing `Absent` removes the
    /// child. Returns `None` if this entry is not a directory.
    pub fn with_child(&self, name: &str, entry: Entry) -> Option<Entry> {
        let Entry::Directory { children } = self else {
            return None;
        };

        let mut children = Arc::clone(children);
        let map = Arc::make_mut(&mut children);
        if entry.is_absent() {
            map.remove(name);
        } else {
            map.insert(name.to_owned(), entry);
        }

        Some(Entry::Directory { children })
    }

    /// Number of existing nodes in this subtree, the entry itself included.
    pub fn count(&self) -> usize {
        match self {
            Entry::Absent => 0,
            Entry::File { .. } | Entry::Symlink { .. } => 1,
            Entry::Directory { children } => 1 + children.values().map(Entry::count).sum::<usize>(),
        }
    }

    /// Lists every file in this subtree as `(path, digest)`, with paths
    /// rooted at `path`.
    pub fn files(&self, path: &str) -> Vec<(String, ContentHash)> {
        let mut files = Vec::new();
        self.collect_files(path.to_owned(), &mut files);
        files
    }

    fn collect_files(&self, path: String, files: &mut Vec<(String, ContentHash)>) {
        match self {
            Entry::File { digest, .. } => files.push((path, *digest)),
            Entry::Directory { children } => {
                for (name, child) in children.iter() {
                    child.collect_files(path::join(&path, name), files);
                }
            }
            Entry::Absent | Entry::Symlink { .. } => {}
        }
    }

    /// Cheap identity check: true when both entries are the same leaf value or
    /// share the same directory allocation. Never descends.
    pub(crate) fn shares(&self, other: &Entry) -> bool {
        match (self, other) {
            (Entry::Directory { children: a }, Entry::Directory { children: b }) => {
                Arc::ptr_eq(a, b)
            }
            (Entry::Directory { .. }, _) | (_, Entry::Directory { .. }) => false,
            _ => self == other,
        }
    }
}

impl PartialEq for Entry {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Entry::Absent, Entry::Absent) => true,
            (
                Entry::File {
                    digest: a,
                    executable: a_executable,
                },
                Entry::File {
                    digest: b,
                    executable: b_executable,
                },
            ) => a == b && a_executable == b_executable,
            (Entry::Symlink { target: a }, Entry::Symlink { target: b }) => a == b,
            (Entry::Directory { children: a }, Entry::Directory { children: b }) => {
                Arc::ptr_eq(a, b) || a == b
            }
            _ => false,
        }
    }
}

impl Eq for Entry {}

/// Union of the child names of every directory among `entries`, in sorted
/// order. Non-directories contribute nothing.
pub(crate) fn child_names<'a>(entries: &[&'a Entry]) -> BTreeSet<&'a str> {
    entries
        .iter()
        .filter_map(|entry| entry.children())
        .flat_map(|children| children.keys().map(String::as_str))
        .collect()
}
