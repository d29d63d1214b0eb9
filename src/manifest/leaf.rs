use crate::sync::Entry;

const FILE_TAG: &str = "file";
const EXECUTABLE_TAG: &str = "exec";
const TEXT_TAG: &str = "text";
const LINK_TAG: &str = "link";

/// Scalar form of a non-directory entry, e.g. `file 0f3a…` or `link ../target`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(super) enum Leaf<'a> {
    File { digest: &'a str, executable: bool },
    Text(&'a str),
    Link(&'a str),
}

impl<'a> Leaf<'a> {
    /// Splits a leaf scalar into its tag and payload. Returns `None` for an
    /// unknown tag or when the separating space is missing.
    pub(super) fn parse(value: &'a str) -> Option<Self> {
        let (tag, payload) = value.split_once(' ')?;
        match tag {
            FILE_TAG => Some(Leaf::File {
                digest: payload.trim(),
                executable: false,
            }),
            EXECUTABLE_TAG => Some(Leaf::File {
                digest: payload.trim(),
                executable: true,
            }),
            TEXT_TAG => Some(Leaf::Text(payload)),
            LINK_TAG => Some(Leaf::Link(payload)),
            _ => None,
        }
    }
}

/// Renders the scalar form of a file or symlink. Directories and `Absent`
/// have no leaf form and yield `None`.
pub(super) fn render_leaf(entry: &Entry) -> Option<String> {
    match entry {
        Entry::File { digest, executable } => Some(format!(
            "{} {}",
            if *executable { EXECUTABLE_TAG } else { FILE_TAG },
            digest
        )),
        Entry::Symlink { target } => Some(format!("{LINK_TAG} {target}")),
        Entry::Absent | Entry::Directory { .. } => None,
    }
}
