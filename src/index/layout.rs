use std::path::PathBuf;

use snafu::{Snafu, ensure};
use tracing::{debug, trace};

use crate::index::{ContentId, DirRow, FileRow, ResourceIndex, Span};
use crate::tree::{DirId, ROOT, ResourceTree};

/// A file row whose content id has not been computed yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingFile {
    pub index: usize,
    pub name: String,
    pub source_path: PathBuf,
}

/// Breadth-first linearisation of a [`ResourceTree`].
///
/// Directory 0 is the root. Every directory's subdirectories occupy one
/// contiguous span of the directory table, and its files one contiguous span
/// of the file table, assigned in directory table order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Layout {
    pub dirs: Vec<DirRow>,
    pub files: Vec<PendingFile>,
}

impl Layout {
    pub fn from_tree(tree: &ResourceTree) -> Self {
        let mut order: Vec<DirId> = vec![ROOT];
        let mut subdir_spans = Vec::with_capacity(tree.len());

        let mut cursor = 0;
        while cursor < order.len() {
            let begin = order.len();
            order.extend(tree.node(order[cursor]).subdirs());
            subdir_spans.push(Span::new(begin, order.len()));
            cursor += 1;
        }

        let mut dirs = Vec::with_capacity(order.len());
        let mut files = Vec::new();

        for (index, (&id, subdirs)) in order.iter().zip(subdir_spans).enumerate() {
            let node = tree.node(id);
            trace!(
                "Directory {} is '{}' with {} files",
                index,
                tree.path_of(id),
                node.file_count()
            );
            let begin = files.len();
            for (name, source) in node.files() {
                files.push(PendingFile {
                    index: files.len(),
                    name: name.to_string(),
                    source_path: source.clone(),
                });
            }

            dirs.push(DirRow {
                index,
                name: node.name().map(str::to_string),
                subdirs,
                files: Span::new(begin, files.len()),
            });
        }

        debug!(
            "Linearised {} directories and {} files",
            dirs.len(),
            files.len()
        );
        Self { dirs, files }
    }

    /// Source paths in file table order.
    pub fn source_paths(&self) -> Vec<PathBuf> {
        self.files
            .iter()
            .map(|file| file.source_path.clone())
            .collect()
    }

    /// Attaches content ids, given in file table order.
    pub fn into_index(self, content_ids: Vec<ContentId>) -> Result<ResourceIndex, LayoutError> {
        ensure!(
            content_ids.len() == self.files.len(),
            ContentIdCountSnafu {
                expected: self.files.len(),
                found: content_ids.len(),
            }
        );

        let files = self
            .files
            .into_iter()
            .zip(content_ids)
            .map(|(file, content_id)| FileRow {
                index: file.index,
                content_id,
                name: file.name,
                source_path: file.source_path,
            })
            .collect();

        Ok(ResourceIndex {
            dirs: self.dirs,
            files,
        })
    }
}

#[derive(Debug, Snafu)]
pub enum LayoutError {
    #[snafu(display("Expected {} content ids, got {}", expected, found))]
    ContentIdCountError { expected: usize, found: usize },
}
