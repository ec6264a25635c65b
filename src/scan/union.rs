use std::path::{Path, PathBuf};

use clap::ValueEnum;
use hashlink::LinkedHashMap;
use snafu::{OptionExt, ResultExt, Snafu};
use tracing::{debug, info};
use walkdir::WalkDir;

use crate::ext::BestEffortPathExt;
use crate::scan::ExcludeMatcher;

/// Which root claims a relative path present under several roots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum Precedence {
    /// The earliest root listed wins.
    #[default]
    First,
    /// The latest root listed wins.
    Last,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    File,
    Directory,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnionEntry {
    pub source: PathBuf,
    pub kind: EntryKind,
    pub root_index: usize,
}

/// A file that made it into the union view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScannedFile {
    /// Path components relative to the root it was found under.
    pub relative: Vec<String>,
    /// Canonical absolute path of the winning copy.
    pub source: PathBuf,
}

impl ScannedFile {
    pub fn relative_path(&self) -> String {
        self.relative.join("/")
    }
}

/// Merged view of several root directories, keyed by relative path.
///
/// Directories claim their relative path just like files do, so a file under
/// one root cannot replace a directory that won under another.
#[derive(Debug, Default)]
pub struct UnionScan {
    entries: LinkedHashMap<Vec<String>, UnionEntry>,
}

impl UnionScan {
    pub fn scan(
        roots: &[PathBuf],
        excludes: &ExcludeMatcher,
        precedence: Precedence,
    ) -> Result<Self, ScanError> {
        let mut union = Self::default();

        for (root_index, root) in roots.iter().enumerate() {
            union.scan_root(root_index, root, excludes, precedence)?;
        }

        info!(
            "Union of {} roots holds {} entries",
            roots.len(),
            union.len()
        );
        Ok(union)
    }

    fn scan_root(
        &mut self,
        root_index: usize,
        root: &Path,
        excludes: &ExcludeMatcher,
        precedence: Precedence,
    ) -> Result<(), ScanError> {
        debug!("Scanning root {}", root.display());
        let mut shadowed = 0usize;

        let walker = WalkDir::new(root)
            .min_depth(1)
            .follow_links(false)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|entry| !excludes.is_excluded(entry.path()));

        for entry in walker {
            let entry = entry.context(WalkSnafu {
                root: root.to_path_buf(),
            })?;
            let relative = relative_components(root, entry.path())?;
            let kind = if entry.file_type().is_dir() {
                EntryKind::Directory
            } else if is_regular_file(entry.path()) {
                EntryKind::File
            } else {
                debug!("Skipping non-regular entry {}", entry.path().display());
                continue;
            };

            if let Some(previous) = self.entries.get(&relative) {
                shadowed += 1;
                if precedence == Precedence::First {
                    continue;
                }
                debug!(
                    "{} replaces the copy from root #{}",
                    entry.path().display(),
                    previous.root_index
                );
            }

            self.entries.insert(
                relative,
                UnionEntry {
                    source: entry.into_path(),
                    kind,
                    root_index,
                },
            );
        }

        debug!(
            "Root {} overlapped {} entries of earlier roots",
            root.display(),
            shadowed
        );
        Ok(())
    }

    pub fn get(&self, relative: &[String]) -> Option<&UnionEntry> {
        self.entries.get(relative)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether an ancestor of `relative` was claimed by a file.
    fn is_shadowed_by_file(&self, relative: &[String]) -> bool {
        (1..relative.len()).any(|depth| {
            matches!(
                self.get(&relative[..depth]),
                Some(UnionEntry {
                    kind: EntryKind::File,
                    ..
                })
            )
        })
    }

    /// Files of the union, with their sources canonicalized.
    pub fn into_files(self) -> Result<Vec<ScannedFile>, ScanError> {
        let mut files = Vec::new();

        for (relative, entry) in &self.entries {
            if entry.kind != EntryKind::File || self.is_shadowed_by_file(relative) {
                continue;
            }
            let source = entry.source.canonicalize().context(CanonicalizeSnafu {
                path: entry.source.clone(),
            })?;
            source.to_str().context(NonUtf8PathSnafu {
                path: source.clone(),
            })?;

            files.push(ScannedFile {
                relative: relative.clone(),
                source,
            });
        }

        Ok(files)
    }
}

/// Follows symlinks, so links to directories and dangling links are not
/// regular files.
fn is_regular_file(path: &Path) -> bool {
    std::fs::metadata(path).is_ok_and(|metadata| metadata.is_file())
}

fn relative_components(root: &Path, path: &Path) -> Result<Vec<String>, ScanError> {
    let relative = path.strip_prefix(root).ok().context(OutsideRootSnafu {
        path: path.to_path_buf(),
        root: root.to_path_buf(),
    })?;

    relative
        .components()
        .map(|component| {
            component
                .as_os_str()
                .to_str()
                .map(str::to_string)
                .context(NonUtf8PathSnafu {
                    path: path.to_path_buf(),
                })
        })
        .collect()
}

#[derive(Debug, Snafu)]
pub enum ScanError {
    #[snafu(display("Failed to walk root directory {}", root.best_effort_path_display()))]
    WalkError {
        root: PathBuf,
        source: walkdir::Error,
    },
    #[snafu(display(
        "Path {} is not inside root {}",
        path.display(),
        root.display()
    ))]
    OutsideRootError { path: PathBuf, root: PathBuf },
    #[snafu(display("Path {} is not valid UTF-8", path.display()))]
    NonUtf8PathError { path: PathBuf },
    #[snafu(display("Failed to resolve {}", path.best_effort_path_display()))]
    CanonicalizeError {
        path: PathBuf,
        source: std::io::Error,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn write(root: &Path, relative: &str, content: &str) {
        let path = root.join(relative);
        fs::create_dir_all(path.parent().unwrap()).expect("Failed to create parent directory");
        fs::write(path, content).expect("Failed to write fixture");
    }

    fn relative(path: &str) -> Vec<String> {
        path.split('/').map(str::to_string).collect()
    }

    fn scan(roots: &[&TempDir], excludes: &[&str], precedence: Precedence) -> Vec<ScannedFile> {
        let roots: Vec<PathBuf> = roots
            .iter()
            .map(|root| root.path().canonicalize().unwrap())
            .collect();
        let excludes = ExcludeMatcher::new(excludes).unwrap();
        UnionScan::scan(&roots, &excludes, precedence)
            .expect("Scan failed")
            .into_files()
            .expect("Collecting files failed")
    }

    fn relative_paths(files: &[ScannedFile]) -> Vec<String> {
        let mut paths: Vec<String> = files.iter().map(ScannedFile::relative_path).collect();
        paths.sort();
        paths
    }

    #[test]
    fn earlier_root_wins_by_default() {
        let first = TempDir::new().unwrap();
        let second = TempDir::new().unwrap();
        write(first.path(), "gfx/a.png", "X");
        write(second.path(), "gfx/a.png", "Y");
        write(second.path(), "gfx/b.png", "Z");

        let files = scan(&[&first, &second], &[], Precedence::First);

        assert_eq!(relative_paths(&files), ["gfx/a.png", "gfx/b.png"]);
        let a = files.iter().find(|f| f.relative_path() == "gfx/a.png").unwrap();
        assert!(a.source.starts_with(first.path().canonicalize().unwrap()));
    }

    #[test]
    fn later_root_wins_with_last_precedence() {
        let first = TempDir::new().unwrap();
        let second = TempDir::new().unwrap();
        write(first.path(), "gfx/a.png", "X");
        write(second.path(), "gfx/a.png", "Y");

        let files = scan(&[&first, &second], &[], Precedence::Last);

        assert_eq!(files.len(), 1);
        assert!(files[0].source.starts_with(second.path().canonicalize().unwrap()));
    }

    #[test]
    fn hidden_and_excluded_entries_are_skipped() {
        let root = TempDir::new().unwrap();
        write(root.path(), "gfx/a.png", "a");
        write(root.path(), "gfx/.hidden.png", "h");
        write(root.path(), ".git/config", "c");
        write(root.path(), "gfx/a.psd", "p");
        write(root.path(), "src/shader.glsl", "s");

        let files = scan(&[&root], &["*.psd", "src"], Precedence::First);

        assert_eq!(relative_paths(&files), ["gfx/a.png"]);
    }

    #[test]
    fn directory_under_earlier_root_blocks_file_under_later_root() {
        let first = TempDir::new().unwrap();
        let second = TempDir::new().unwrap();
        write(first.path(), "x/y", "dir wins");
        write(second.path(), "x", "file loses");

        let files = scan(&[&first, &second], &[], Precedence::First);

        assert_eq!(relative_paths(&files), ["x/y"]);
    }

    #[test]
    fn file_under_earlier_root_shadows_directory_under_later_root() {
        let first = TempDir::new().unwrap();
        let second = TempDir::new().unwrap();
        write(first.path(), "x", "file wins");
        write(second.path(), "x/y", "shadowed");

        let files = scan(&[&first, &second], &[], Precedence::First);

        assert_eq!(relative_paths(&files), ["x"]);
    }

    #[test]
    fn later_file_shadows_earlier_directory_with_last_precedence() {
        let first = TempDir::new().unwrap();
        let second = TempDir::new().unwrap();
        write(first.path(), "x/y", "shadowed");
        write(second.path(), "x", "file wins");

        let files = scan(&[&first, &second], &[], Precedence::Last);

        assert_eq!(relative_paths(&files), ["x"]);
    }

    #[cfg(unix)]
    #[test]
    fn dangling_symlinks_are_skipped() {
        let root = TempDir::new().unwrap();
        write(root.path(), "real.txt", "real");
        std::os::unix::fs::symlink(root.path().join("missing.txt"), root.path().join("dangling.txt"))
            .unwrap();

        let files = scan(&[&root], &[], Precedence::First);

        assert_eq!(relative_paths(&files), ["real.txt"]);
    }

    #[test]
    fn symlinked_directory_does_not_hide_later_roots() {
        let outside = TempDir::new().unwrap();
        write(outside.path(), "a.png", "linked");
        let first = TempDir::new().unwrap();
        std::os::unix::fs::symlink(outside.path(), first.path().join("gfx")).unwrap();
        let second = TempDir::new().unwrap();
        write(second.path(), "gfx/b.png", "real");

        let files = scan(&[&first, &second], &[], Precedence::First);

        assert_eq!(relative_paths(&files), ["gfx/b.png"]);
    }

    #[test]
    fn dangling_symlink_does_not_hide_later_roots() {
        let first = TempDir::new().unwrap();
        std::os::unix::fs::symlink(first.path().join("missing"), first.path().join("gfx")).unwrap();
        let second = TempDir::new().unwrap();
        write(second.path(), "gfx/b.png", "real");

        let files = scan(&[&first, &second], &[], Precedence::First);

        assert_eq!(relative_paths(&files), ["gfx/b.png"]);
    }

    #[test]
    fn symlinked_file_is_indexed_from_its_target() {
        let outside = TempDir::new().unwrap();
        write(outside.path(), "a.png", "linked");
        let root = TempDir::new().unwrap();
        std::os::unix::fs::symlink(outside.path().join("a.png"), root.path().join("a.png")).unwrap();

        let files = scan(&[&root], &[], Precedence::First);

        assert_eq!(relative_paths(&files), ["a.png"]);
        assert_eq!(
            files[0].source,
            outside.path().join("a.png").canonicalize().unwrap()
        );
    }

    #[test]
    fn directories_claim_relative_paths() {
        let root = TempDir::new().unwrap();
        write(root.path(), "music/theme.ogg", "m");
        let roots = vec![root.path().canonicalize().unwrap()];

        let union = UnionScan::scan(&roots, &ExcludeMatcher::default(), Precedence::First).unwrap();

        assert_eq!(union.len(), 2);
        assert_eq!(union.get(&relative("music")).unwrap().kind, EntryKind::Directory);
        assert_eq!(union.get(&relative("music/theme.ogg")).unwrap().kind, EntryKind::File);
    }

    #[test]
    fn missing_root_is_a_walk_error() {
        let root = TempDir::new().unwrap();
        let roots = vec![root.path().join("nope")];

        let result = UnionScan::scan(&roots, &ExcludeMatcher::default(), Precedence::First);

        assert!(matches!(result, Err(ScanError::WalkError { .. })));
    }
}
