use std::collections::BTreeMap;
use std::path::PathBuf;

use snafu::{Snafu, ensure};
use tracing::debug;

use crate::scan::ScannedFile;

pub type DirId = usize;

/// Id of the unnamed top-level directory.
pub const ROOT: DirId = 0;

/// A directory in the arena. Children are kept sorted by name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryNode {
    name: Option<String>,
    parent: Option<DirId>,
    subdirs: BTreeMap<String, DirId>,
    files: BTreeMap<String, PathBuf>,
}

impl DirectoryNode {
    fn new(name: Option<String>, parent: Option<DirId>) -> Self {
        Self {
            name,
            parent,
            subdirs: BTreeMap::new(),
            files: BTreeMap::new(),
        }
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn parent(&self) -> Option<DirId> {
        self.parent
    }

    /// Child directory ids in name order.
    pub fn subdirs(&self) -> impl Iterator<Item = DirId> + '_ {
        self.subdirs.values().copied()
    }

    /// `(name, source path)` of the files directly inside, in name order.
    pub fn files(&self) -> impl Iterator<Item = (&str, &PathBuf)> {
        self.files.iter().map(|(name, source)| (name.as_str(), source))
    }

    pub fn file_count(&self) -> usize {
        self.files.len()
    }
}

/// Directory tree of the indexed resources, stored as an arena of nodes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceTree {
    nodes: Vec<DirectoryNode>,
}

impl Default for ResourceTree {
    fn default() -> Self {
        Self {
            nodes: vec![DirectoryNode::new(None, None)],
        }
    }
}

impl ResourceTree {
    pub fn from_files(files: &[ScannedFile]) -> Result<Self, TreeError> {
        let mut tree = Self::default();

        for file in files {
            tree.insert_file(&file.relative, file.source.clone())?;
        }

        debug!(
            "Built resource tree with {} directories and {} files",
            tree.nodes.len(),
            files.len()
        );
        Ok(tree)
    }

    /// Inserts a file, creating missing directories along its relative path.
    pub fn insert_file(&mut self, components: &[String], source: PathBuf) -> Result<(), TreeError> {
        let Some((file_name, directories)) = components.split_last() else {
            return EmptyPathSnafu.fail();
        };

        let mut current = ROOT;
        for name in directories {
            ensure!(
                !self.nodes[current].files.contains_key(name),
                FileInPathSnafu {
                    path: components.join("/"),
                    component: name.clone(),
                }
            );
            current = match self.nodes[current].subdirs.get(name) {
                Some(&id) => id,
                None => self.add_directory(current, name),
            };
        }

        let directory = &mut self.nodes[current];
        ensure!(
            !directory.subdirs.contains_key(file_name),
            DirectoryExistsSnafu {
                path: components.join("/"),
            }
        );
        ensure!(
            !directory.files.contains_key(file_name),
            DuplicateFileSnafu {
                path: components.join("/"),
            }
        );
        directory.files.insert(file_name.clone(), source);

        Ok(())
    }

    fn add_directory(&mut self, parent: DirId, name: &str) -> DirId {
        let id = self.nodes.len();
        self.nodes
            .push(DirectoryNode::new(Some(name.to_string()), Some(parent)));
        self.nodes[parent].subdirs.insert(name.to_string(), id);
        id
    }

    pub fn node(&self, id: DirId) -> &DirectoryNode {
        &self.nodes[id]
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Relative path of a directory, following parent links up to the root.
    pub fn path_of(&self, id: DirId) -> String {
        let mut names = Vec::new();
        let mut current = Some(id);

        while let Some(node_id) = current {
            let node = &self.nodes[node_id];
            if let Some(name) = node.name() {
                names.push(name);
            }
            current = node.parent();
        }

        names.reverse();
        names.join("/")
    }
}

#[derive(Debug, Snafu)]
pub enum TreeError {
    #[snafu(display("Cannot insert a file with an empty relative path"))]
    EmptyPathError,
    #[snafu(display("Cannot insert '{}': '{}' is a file", path, component))]
    FileInPathError { path: String, component: String },
    #[snafu(display("Cannot insert '{}': a directory of that name exists", path))]
    DirectoryExistsError { path: String },
    #[snafu(display("File '{}' was inserted twice", path))]
    DuplicateFileError { path: String },
}
