//! Slash-joined snapshot paths.
//!
//! Paths are always `/`-separated regardless of platform, relative to the
//! snapshot root, and the empty string denotes the root itself.

pub const SEPARATOR: char = '/';

/// Joins a child name onto a parent path.
pub fn join(parent: &str, name: &str) -> String {
    if parent.is_empty() {
        name.to_owned()
    } else {
        format!("{parent}{SEPARATOR}{name}")
    }
}

/// Iterates over the child names that make up a path. The root yields nothing.
pub fn components(path: &str) -> impl Iterator<Item = &str> {
    (!path.is_empty())
        .then(|| path.split(SEPARATOR))
        .into_iter()
        .flatten()
}

/// Whether `name` can be used as a directory child name.
pub fn is_valid_name(name: &str) -> bool {
    !name.is_empty() && !name.contains(SEPARATOR) && name != "." && name != ".."
}

/// Renders a path for humans, where the root has no visible name.
pub fn display(path: &str) -> &str {
    if path.is_empty() { "<root>" } else { path }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::*;

    #[rstest]
    #[case("", "something", "something")]
    #[case("", "some/path", "some/path")]
    #[case("some", "path", "some/path")]
    #[case("some", "path/other", "some/path/other")]
    #[case("some/path", "other", "some/path/other")]
    #[case("some/path", "other/path", "some/path/other/path")]
    fn test_join(#[case] parent: &str, #[case] name: &str, #[case] expected: &str) {
        assert_eq!(join(parent, name), expected);
    }

    #[rstest]
    #[case("", vec![])]
    #[case("a", vec!["a"])]
    #[case("a/b/c", vec!["a", "b", "c"])]
    #[case("a//b", vec!["a", "", "b"])]
    fn test_components(#[case] path: &str, #[case] expected: Vec<&str>) {
        assert_eq!(components(path).collect::<Vec<_>>(), expected);
    }

    #[rstest]
    #[case("file.txt", true)]
    #[case("with space", true)]
    #[case("тест", true)]
    #[case("", false)]
    #[case("a/b", false)]
    #[case(".", false)]
    #[case("..", false)]
    fn test_is_valid_name(#[case] name: &str, #[case] expected: bool) {
        assert_eq!(is_valid_name(name), expected);
    }

    #[test]
    fn test_display_root() {
        assert_eq!(display(""), "<root>");
        assert_eq!(display("a/b"), "a/b");
    }
}
