//! Computes edit scripts between snapshots.

use std::sync::Arc;

use tracing::trace;

use super::change::Change;
use super::entry::{Entry, child_names};
use super::path::join;

/// Computes the minimal ordered list of changes that turns `old` into `new`,
/// with every change path rooted at `path`.
///
/// Directories present on both sides are descended into; any other
/// difference replaces the whole subtree with a single change. Children are
/// visited in lexicographic order, so the output is reproducible.
pub fn diff(path: &str, old: &Entry, new: &Entry) -> Vec<Change> {
    let mut changes = Vec::new();
    diff_recursive(&mut changes, path.to_owned(), old, new);
    trace!("Computed {} changes under '{}'", changes.len(), path);
    changes
}

fn diff_recursive(changes: &mut Vec<Change>, path: String, old: &Entry, new: &Entry) {
    match (old, new) {
        (Entry::Directory { children: olds }, Entry::Directory { children: news }) => {
            // Shared subtrees are unchanged by construction
            if Arc::ptr_eq(olds, news) {
                return;
            }
            for name in child_names(&[old, new]) {
                diff_recursive(changes, join(&path, name), old.child(name), new.child(name));
            }
        }
        // At most one side is a directory here, so this comparison is shallow
        _ if old == new => {}
        _ => changes.push(Change::new(path, old.clone(), new.clone())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sync::apply::apply;
    use crate::sync::content_hash::ContentHash;
    use rstest::*;

    fn file(content: &str) -> Entry {
        Entry::file(ContentHash::of(content))
    }

    fn directory_entry() -> Entry {
        Entry::directory([
            ("file", file("file")),
            ("exec", Entry::executable_file(ContentHash::of("exec"))),
            ("link", Entry::symlink("file")),
            (
                "directory",
                Entry::directory([
                    ("subfile", file("subfile")),
                    ("subdirectory", Entry::empty_directory()),
                ]),
            ),
        ])
    }

    fn alternate_directory_entry() -> Entry {
        Entry::directory([
            ("file", file("file changed")),
            ("exec", file("exec")),
            ("link", Entry::symlink("elsewhere")),
            ("new", file("new")),
            (
                "directory",
                Entry::directory([(
                    "subdirectory",
                    Entry::directory([("deep", file("deep"))]),
                )]),
            ),
        ])
    }

    fn snapshots() -> Vec<Entry> {
        vec![
            Entry::Absent,
            file("file"),
            Entry::symlink("target"),
            Entry::empty_directory(),
            directory_entry(),
            alternate_directory_entry(),
        ]
    }

    #[rstest]
    #[case(Entry::Absent)]
    #[case(file("file"))]
    #[case(Entry::empty_directory())]
    #[case(directory_entry())]
    fn test_diff_identical_is_empty(#[case] snapshot: Entry) {
        assert!(diff("", &snapshot, &snapshot.clone()).is_empty());
        assert!(diff("", &snapshot, &snapshot).is_empty());
    }

    #[test]
    fn test_diff_structurally_equal_copies_is_empty() {
        assert!(diff("", &directory_entry(), &directory_entry()).is_empty());
    }

    #[test]
    fn test_diff_creation_at_root() {
        let changes = diff("", &Entry::Absent, &directory_entry());

        assert_eq!(
            changes,
            vec![Change::new("", Entry::Absent, directory_entry())]
        );
    }

    #[test]
    fn test_diff_deletion_at_root() {
        let changes = diff("", &directory_entry(), &Entry::Absent);

        assert_eq!(
            changes,
            vec![Change::new("", directory_entry(), Entry::Absent)]
        );
    }

    #[test]
    fn test_diff_root_kind_change_is_single_change() {
        let changes = diff("", &directory_entry(), &file("file"));

        assert_eq!(
            changes,
            vec![Change::new("", directory_entry(), file("file"))]
        );
    }

    #[test]
    fn test_diff_single_file_creation() {
        let changes = diff("", &Entry::empty_directory(), &Entry::directory([("f", file("A"))]));

        assert_eq!(changes, vec![Change::new("f", Entry::Absent, file("A"))]);
    }

    #[test]
    fn test_diff_descends_and_orders_lexicographically() {
        let changes = diff("", &directory_entry(), &alternate_directory_entry());
        let paths = changes
            .iter()
            .map(|change| change.path.as_str())
            .collect::<Vec<_>>();

        assert_eq!(
            paths,
            vec![
                "directory/subdirectory/deep",
                "directory/subfile",
                "exec",
                "file",
                "link",
                "new",
            ]
        );
    }

    #[test]
    fn test_diff_emits_no_change_for_directory_nodes() {
        let changes = diff("", &directory_entry(), &alternate_directory_entry());

        assert!(
            changes
                .iter()
                .all(|change| !change.old.is_directory() || !change.new.is_directory())
        );
    }

    #[test]
    fn test_diff_uses_path_prefix() {
        let changes = diff(
            "some/where",
            &Entry::empty_directory(),
            &Entry::directory([("f", file("A"))]),
        );

        assert_eq!(changes[0].path, "some/where/f");
    }

    #[test]
    fn test_diff_is_deterministic() {
        let first = diff("", &directory_entry(), &alternate_directory_entry());
        let second = diff("", &directory_entry(), &alternate_directory_entry());

        assert_eq!(first, second);
    }

    #[test]
    fn test_diff_apply_round_trip_over_all_pairs() {
        for base in snapshots() {
            for target in snapshots() {
                let changes = diff("", &base, &target);
                let result = apply(&base, &changes).expect("diff output should apply cleanly");
                assert_eq!(result, target, "round trip failed for {base:?} -> {target:?}");
            }
        }
    }
}
