use std::path::{Path, PathBuf};

use crate::output::{OutputError, update_text_file};

/// Makefile-style dependency record telling the build system which inputs
/// an output was generated from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Depfile {
    target: PathBuf,
    dependencies: Vec<PathBuf>,
}

impl Depfile {
    pub fn new(target: impl Into<PathBuf>) -> Self {
        Self {
            target: target.into(),
            dependencies: Vec::new(),
        }
    }

    pub fn add(&mut self, dependency: impl Into<PathBuf>) {
        self.dependencies.push(dependency.into());
    }

    pub fn extend<I, P>(&mut self, dependencies: I)
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        self.dependencies
            .extend(dependencies.into_iter().map(Into::into));
    }

    pub fn len(&self) -> usize {
        self.dependencies.len()
    }

    pub fn render(&self) -> String {
        let mut entries = Vec::with_capacity(self.dependencies.len() + 1);
        entries.push(format!("{}:", escape(&self.target)));
        entries.extend(self.dependencies.iter().map(|path| escape(path)));

        entries.join(" \\\n ")
    }

    pub async fn write(&self, path: &Path) -> Result<bool, OutputError> {
        update_text_file(path, &self.render()).await
    }
}

/// Make treats unescaped spaces as separators.
fn escape(path: &Path) -> String {
    path.to_string_lossy().replace(' ', "\\ ")
}
