//! Linearised, content-addressed resource index.
//!
//! The directory tree is flattened breadth-first into a directory table and
//! a file table that reference their children by `(offset, count)` spans.
//! File contents are hashed on a worker pool before the tables are rendered.

mod content_id;
pub mod format;
mod hasher;
mod layout;
mod reader;
mod records;

pub use content_id::{ContentId, ContentIdError};
pub use hasher::{ContentHasher, HashError, HasherCreationError};
pub use layout::{Layout, LayoutError};
pub use reader::{ParseError, ParsedIndex};
pub use records::{DirRow, FileRow, ResourceIndex, Span};
