use snafu::Snafu;
use snafu::prelude::*;
use tracing::{debug, info, warn};

use crate::application::{ConfigurationError, RuntimeConfig};
use crate::cli::Cli;
use crate::ext::BestEffortPathExt;
use crate::index::{
    ContentHasher, HashError, HasherCreationError, Layout, LayoutError, ParseError, ParsedIndex,
    ResourceIndex,
};
use crate::output::{Depfile, OutputError, update_text_file};
use crate::scan::{ScanError, ScannedFile, UnionScan};
use crate::tree::{ResourceTree, TreeError};

pub struct Application;

/// What a run produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexSummary {
    pub directories: usize,
    pub files: usize,
    /// False when the output already held identical records.
    pub written: bool,
}

impl Application {
    pub async fn run(cli: Cli) -> Result<IndexSummary, ApplicationError> {
        let config = RuntimeConfig::from_cli(cli)
            .await
            .context(ConfigurationSnafu)?;
        debug!("Runtime config: {:?}", config);

        let summary = Self::index(&config).await?;
        info!(
            "Indexed {} files in {} directories into {}{}",
            summary.files,
            summary.directories,
            config.output.best_effort_path_display(),
            if summary.written { "" } else { " (unchanged)" }
        );

        Ok(summary)
    }

    /// Scans, hashes and writes the index. Nothing is written unless every
    /// step before the write succeeded.
    pub async fn index(config: &RuntimeConfig) -> Result<IndexSummary, ApplicationError> {
        let files = UnionScan::scan(&config.roots, &config.excludes, config.precedence)
            .and_then(UnionScan::into_files)
            .context(ScanSnafu)?;
        info!("Found {} files to index", files.len());

        Self::index_files(config, &files).await
    }

    async fn index_files(
        config: &RuntimeConfig,
        files: &[ScannedFile],
    ) -> Result<IndexSummary, ApplicationError> {
        let tree = ResourceTree::from_files(files).context(TreeSnafu)?;
        let layout = Layout::from_tree(&tree);
        let source_paths = layout.source_paths();

        let depfile = match &config.depfile {
            Some(depfile_path) => {
                let mut depfile = Depfile::new(config.output.clone());
                depfile.add(std::env::current_exe().context(CurrentExeSnafu)?);
                depfile.extend(source_paths.iter().cloned());
                Some((depfile_path, depfile))
            }
            None => None,
        };

        let hasher = ContentHasher::new(config.jobs).context(HasherCreationSnafu)?;
        let content_ids = hasher.hash_all(&source_paths).await.context(HashSnafu)?;
        let index = layout.into_index(content_ids).context(LayoutSnafu)?;

        let rendered = index.render();
        if config.verify {
            Self::verify(&rendered, &index, &tree, files)?;
        }

        let written = update_text_file(&config.output, &rendered)
            .await
            .context(OutputSnafu)?;

        if let Some((depfile_path, depfile)) = depfile {
            debug!(
                "Writing {} dependencies to {}",
                depfile.len(),
                depfile_path.best_effort_path_display()
            );
            depfile.write(depfile_path).await.context(OutputSnafu)?;
        }

        Ok(IndexSummary {
            directories: index.dirs.len(),
            files: index.files.len(),
            written,
        })
    }

    /// Reads the rendered records back and resolves every indexed file the
    /// way the engine would.
    fn verify(
        rendered: &str,
        index: &ResourceIndex,
        tree: &ResourceTree,
        files: &[ScannedFile],
    ) -> Result<(), ApplicationError> {
        let parsed = ParsedIndex::parse(rendered).context(VerificationParseSnafu)?;
        debug!(
            "Read back {} directories and {} files",
            parsed.dirs().len(),
            parsed.files().len()
        );

        for id in 0..tree.len() {
            let path = tree.path_of(id);
            let resolves = parsed
                .lookup_dir(&path)
                .is_some_and(|dir| dir.files.count == tree.node(id).file_count());
            ensure!(resolves, UnresolvedPathSnafu { path });
        }

        for file in files {
            let relative = file.relative_path();
            let row = parsed
                .lookup_file(&relative)
                .context(UnresolvedPathSnafu {
                    path: relative.clone(),
                })?;
            ensure!(
                row.source_path == file.source,
                UnresolvedPathSnafu { path: relative }
            );
        }

        if parsed.into_index() != *index {
            warn!("Rendered index does not read back to the same tables");
            return VerificationMismatchSnafu.fail();
        }

        debug!(
            "Verified {} directory and {} file lookups",
            tree.len(),
            files.len()
        );
        Ok(())
    }
}

#[derive(Debug, Snafu)]
pub enum ApplicationError {
    #[snafu(display("Critical failure encountered during configuration stage"))]
    ConfigurationError { source: ConfigurationError },
    #[snafu(display("Failed to scan the resource directories"))]
    ScanError { source: ScanError },
    #[snafu(display("Failed to build the resource tree"))]
    TreeError { source: TreeError },
    #[snafu(display("Failed to start the hashing workers"))]
    HasherCreationError { source: HasherCreationError },
    #[snafu(display("Failed to hash resource files"))]
    HashError { source: HashError },
    #[snafu(display("Failed to assemble the index tables"))]
    LayoutError { source: LayoutError },
    #[snafu(display("Rendered index could not be parsed back"))]
    VerificationParseError { source: ParseError },
    #[snafu(display("Rendered index does not resolve '{}'", path))]
    UnresolvedPathError { path: String },
    #[snafu(display("Rendered index does not match the generated tables"))]
    VerificationMismatchError,
    #[snafu(display("Failed to locate the running executable"))]
    CurrentExeError { source: std::io::Error },
    #[snafu(display("Failed to write output"))]
    OutputError { source: OutputError },
}
