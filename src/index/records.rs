use std::ops::Range;
use std::path::PathBuf;

use crate::index::ContentId;
use crate::index::format;

/// `(offset, count)` reference into one of the flat tables.
/// An empty span is always `(0, 0)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Span {
    pub offset: usize,
    pub count: usize,
}

impl Span {
    pub fn new(begin: usize, end: usize) -> Self {
        if begin >= end {
            Self::default()
        } else {
            Self {
                offset: begin,
                count: end - begin,
            }
        }
    }

    pub fn range(&self) -> Range<usize> {
        self.offset..self.offset + self.count
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirRow {
    pub index: usize,
    /// `None` only for the root directory.
    pub name: Option<String>,
    pub subdirs: Span,
    pub files: Span,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileRow {
    pub index: usize,
    pub content_id: ContentId,
    pub name: String,
    pub source_path: PathBuf,
}

/// The linearised tables, ready to be written out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceIndex {
    pub dirs: Vec<DirRow>,
    pub files: Vec<FileRow>,
}

impl ResourceIndex {
    pub fn render(&self) -> String {
        format::render(self)
    }

    /// Files belonging directly to `dir`.
    pub fn files_of(&self, dir: &DirRow) -> &[FileRow] {
        &self.files[dir.files.range()]
    }

    pub fn subdirs_of(&self, dir: &DirRow) -> &[DirRow] {
        &self.dirs[dir.subdirs.range()]
    }
}
