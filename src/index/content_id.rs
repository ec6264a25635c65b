use std::path::{Path, PathBuf};

use compio::fs;
use derive_more::Display;
use sha2::{Digest, Sha256};
use snafu::{ResultExt, Snafu, ensure};

use crate::ext::{AsyncTryFrom, BestEffortPathExt};

/// Length of a hex encoded SHA-256 digest.
pub const CONTENT_ID_LEN: usize = 64;

/// SHA-256 digest of a file's bytes, hex encoded in lowercase.
///
/// Identical content always yields the same id, no matter which root or
/// relative path the file was found under.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Display)]
pub struct ContentId(String);

impl ContentId {
    pub fn from_bytes(bytes: &[u8]) -> Self {
        Self(hex::encode(Sha256::digest(bytes)))
    }

    /// Accepts only 64 lowercase hex characters.
    pub fn parse(hex_digest: &str) -> Option<Self> {
        let well_formed = hex_digest.len() == CONTENT_ID_LEN
            && hex_digest
                .bytes()
                .all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b));
        well_formed.then(|| Self(hex_digest.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl AsyncTryFrom<&Path> for ContentId {
    type Error = ContentIdError;

    async fn async_try_from(path: &Path) -> Result<Self, Self::Error> {
        let metadata = path.metadata().context(ReadSnafu {
            path: path.to_path_buf(),
        })?;
        ensure!(
            !metadata.is_dir(),
            DirectorySnafu {
                path: path.to_path_buf(),
            }
        );

        let bytes = fs::read(path).await.context(ReadSnafu {
            path: path.to_path_buf(),
        })?;

        Ok(Self::from_bytes(&bytes))
    }
}

#[derive(Debug, Snafu)]
pub enum ContentIdError {
    #[snafu(display("Failed to read resource {}", path.best_effort_path_display()))]
    ReadError {
        path: PathBuf,
        source: std::io::Error,
    },
    #[snafu(display("Cannot hash {}: it is a directory", path.best_effort_path_display()))]
    DirectoryError { path: PathBuf },
}
