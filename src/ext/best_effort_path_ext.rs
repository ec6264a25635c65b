use std::path::{Component, Path, PathBuf};

/// Renders a path for log and error messages.
///
/// Prefers the canonical form. Paths that do not exist (yet) are made
/// absolute against the working directory and normalized lexically instead.
pub fn best_effort_path_display(path: &Path) -> String {
    if let Ok(canonical_path) = path.canonicalize() {
        return canonical_path.display().to_string();
    }

    let absolute_path = std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf());
    normalize_lexically(&absolute_path).display().to_string()
}

/// Resolves `.` and `..` without touching the filesystem.
fn normalize_lexically(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();

    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if matches!(
                    normalized.components().next_back(),
                    Some(Component::Normal(_))
                ) {
                    normalized.pop();
                }
            }
            other => normalized.push(other),
        }
    }

    normalized
}

pub trait BestEffortPathExt {
    fn best_effort_path_display(&self) -> String;
}

impl BestEffortPathExt for Path {
    fn best_effort_path_display(&self) -> String {
        best_effort_path_display(self)
    }
}

impl BestEffortPathExt for PathBuf {
    fn best_effort_path_display(&self) -> String {
        best_effort_path_display(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("/a/b/../c", "/a/c")]
    #[case("/a/./b", "/a/b")]
    #[case("/../a", "/a")]
    #[case("/a/b/c/../../d", "/a/d")]
    fn normalize_lexically_resolves_dots(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(normalize_lexically(Path::new(input)), PathBuf::from(expected));
    }

    #[test]
    fn display_of_existing_path_is_canonical() {
        let temp_dir = tempfile::TempDir::new().expect("Failed to create temp directory");
        std::fs::create_dir(temp_dir.path().join("x")).expect("Failed to create subdirectory");
        let nested = temp_dir.path().join(".").join("x").join("..");

        let displayed = nested.best_effort_path_display();

        assert_eq!(
            displayed,
            temp_dir.path().canonicalize().unwrap().display().to_string()
        );
    }

    #[test]
    fn display_of_missing_path_is_absolute() {
        let displayed = Path::new("does/not/../exist.txt").best_effort_path_display();

        assert!(Path::new(&displayed).is_absolute());
        assert!(displayed.ends_with("does/exist.txt"));
    }
}
