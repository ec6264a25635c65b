use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};

use compio::fs;
use snafu::prelude::*;
use tracing::debug;

use crate::cli::Cli;
use crate::config::{FileConfig, FileConfigError};
use crate::ext::BestEffortPathExt;
use crate::scan::{ExcludeMatcher, PatternError, Precedence};

/// Everything one indexing run needs, validated.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub output: PathBuf,
    /// Canonical root directories, in precedence order.
    pub roots: Vec<PathBuf>,
    pub excludes: ExcludeMatcher,
    pub depfile: Option<PathBuf>,
    pub precedence: Precedence,
    pub jobs: Option<NonZeroUsize>,
    pub verify: bool,
}

impl RuntimeConfig {
    /// Merges the command line with the optional config file. Exclusion
    /// patterns from both are used; other command line values win.
    pub async fn from_cli(cli: Cli) -> Result<Self, ConfigurationError> {
        let file_config = match &cli.config {
            Some(path) => FileConfig::from_path(path)
                .await
                .context(ConfigFileSnafu)?,
            None => FileConfig::default(),
        };
        debug!("Loaded file config: {:?}", file_config);

        ensure!(!cli.directories.is_empty(), NoRootsSnafu);
        let mut roots = Vec::with_capacity(cli.directories.len());
        for directory in &cli.directories {
            roots.push(validate_root(directory).await?);
        }

        let patterns: Vec<String> = file_config
            .exclude
            .into_iter()
            .chain(cli.exclude)
            .collect();
        let excludes = ExcludeMatcher::new(&patterns).context(InvalidExcludeSnafu)?;
        debug!("Compiled {} exclusion patterns", patterns.len());

        Ok(Self {
            output: cli.output,
            roots,
            excludes,
            depfile: cli.depfile,
            precedence: cli
                .precedence
                .or(file_config.precedence)
                .unwrap_or_default(),
            jobs: cli.jobs.or(file_config.jobs),
            verify: cli.verify,
        })
    }
}

async fn validate_root(path: &Path) -> Result<PathBuf, ConfigurationError> {
    let metadata = fs::metadata(path).await.context(RootMissingSnafu {
        path: path.to_path_buf(),
    })?;
    ensure!(
        metadata.is_dir(),
        RootNotDirectorySnafu {
            path: path.to_path_buf(),
        }
    );

    path.canonicalize().context(RootCanonicalizeSnafu {
        path: path.to_path_buf(),
    })
}

#[derive(Debug, Snafu)]
pub enum ConfigurationError {
    #[snafu(display("At least one resource directory is required"))]
    NoRootsError,
    #[snafu(display("Resource directory {} does not exist", path.best_effort_path_display()))]
    RootMissingError {
        path: PathBuf,
        source: std::io::Error,
    },
    #[snafu(display("Resource root {} is not a directory", path.best_effort_path_display()))]
    RootNotDirectoryError { path: PathBuf },
    #[snafu(display("Failed to resolve resource directory {}", path.best_effort_path_display()))]
    RootCanonicalizeError {
        path: PathBuf,
        source: std::io::Error,
    },
    #[snafu(display("Invalid exclusion pattern"))]
    InvalidExcludeError { source: PatternError },
    #[snafu(display("Failed to load the config file"))]
    ConfigFileError { source: FileConfigError },
}
