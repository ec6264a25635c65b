//! Directory tree of the indexed resources.
//!
//! Nodes live in an arena and refer to each other by index, so parent links
//! need no shared ownership.

mod resource_tree;

pub use resource_tree::{DirId, ROOT, ResourceTree, TreeError};
