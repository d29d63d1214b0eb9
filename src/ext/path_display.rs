use std::path::{Component, Path, PathBuf};

/// Renders paths for logs and error messages: canonical when the path exists,
/// otherwise absolute with `.` and `..` folded away.
pub trait BestEffortPathExt {
    fn best_effort_path_display(&self) -> String;
}

impl<P: AsRef<Path> + ?Sized> BestEffortPathExt for P {
    fn best_effort_path_display(&self) -> String {
        let path = self.as_ref();
        if let Ok(canonical) = path.canonicalize() {
            return canonical.display().to_string();
        }
        let absolute = match std::env::current_dir() {
            Ok(current_dir) if path.is_relative() => current_dir.join(path),
            _ => path.to_path_buf(),
        };
        lexically_normalize(&absolute).display().to_string()
    }
}

fn lexically_normalize(path: &Path) -> PathBuf {
    let mut normalized: Vec<Component> = Vec::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if matches!(normalized.last(), Some(Component::Normal(_))) {
                    normalized.pop();
                }
            }
            other => normalized.push(other),
        }
    }
    normalized.iter().collect()
}
