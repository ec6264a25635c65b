use std::path::{Path, PathBuf};

use compio::fs;
use snafu::{ResultExt, Snafu};
use tracing::debug;

use crate::ext::BestEffortPathExt;

/// Writes `contents` to `path` unless the file already holds exactly that
/// text, so unchanged outputs keep their modification time.
///
/// Returns whether the file was written.
pub async fn update_text_file(path: &Path, contents: &str) -> Result<bool, OutputError> {
    match fs::read(path).await {
        Ok(existing) if existing == contents.as_bytes() => {
            debug!("{} is up to date", path.display());
            return Ok(false);
        }
        Ok(_) => debug!("{} changed, rewriting", path.display()),
        Err(e) => debug!("Cannot read {} ({}), writing fresh", path.display(), e),
    }

    fs::write(path, contents.as_bytes().to_vec())
        .await
        .0
        .context(WriteSnafu {
            path: path.to_path_buf(),
        })?;

    Ok(true)
}

#[derive(Debug, Snafu)]
pub enum OutputError {
    #[snafu(display("Failed to write {}", path.best_effort_path_display()))]
    WriteError {
        path: PathBuf,
        source: std::io::Error,
    },
}
