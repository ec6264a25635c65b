use std::borrow::Cow;
use std::num::NonZeroUsize;
use std::path::Path;

use clap::ValueEnum;
use compio::fs;
use hashlink::LinkedHashMap;
use saphyr::{LoadableYamlNode, Scalar, Yaml};
use snafu::prelude::*;
use tracing::{debug, warn};

use crate::ext::BestEffortPathExt;
use crate::scan::Precedence;

const EXCLUDE_KEY: &str = "exclude";
const PRECEDENCE_KEY: &str = "precedence";
const JOBS_KEY: &str = "jobs";

fn key(name: &str) -> Yaml<'_> {
    Yaml::Value(Scalar::String(Cow::Borrowed(name)))
}

/// Settings read from an optional YAML file. Every key may be omitted:
///
/// ```yaml
/// exclude:
///   - "*.psd"
///   - "src"
/// precedence: first
/// jobs: 4
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileConfig {
    pub exclude: Vec<String>,
    pub precedence: Option<Precedence>,
    pub jobs: Option<NonZeroUsize>,
}

impl FileConfig {
    pub async fn from_path(path: &Path) -> Result<Self, FileConfigError> {
        debug!("Reading config file: {}", path.best_effort_path_display());
        let bytes = fs::read(path).await.context(ReadSnafu {
            file_path: path.best_effort_path_display(),
        })?;
        debug!("Successfully read config file: {} bytes", bytes.len());

        let contents = String::from_utf8(bytes).ok().context(NotUtf8Snafu {
            file_path: path.best_effort_path_display(),
        })?;
        contents.as_str().try_into()
    }

    fn parse_exclude(
        top_level: &LinkedHashMap<Yaml, Yaml>,
    ) -> Result<Vec<String>, FileConfigError> {
        let Some(value) = top_level.get(&key(EXCLUDE_KEY)) else {
            return Ok(Vec::new());
        };
        if matches!(value, Yaml::Value(Scalar::Null)) {
            return Ok(Vec::new());
        }

        value
            .as_sequence()
            .context(ExcludeNotSequenceSnafu)?
            .iter()
            .map(|item| {
                item.as_str()
                    .map(str::to_string)
                    .context(ExcludeEntryNotStringSnafu {
                        entry: format!("{item:?}"),
                    })
            })
            .collect()
    }

    fn parse_precedence(
        top_level: &LinkedHashMap<Yaml, Yaml>,
    ) -> Result<Option<Precedence>, FileConfigError> {
        let Some(value) = top_level.get(&key(PRECEDENCE_KEY)) else {
            return Ok(None);
        };
        if matches!(value, Yaml::Value(Scalar::Null)) {
            return Ok(None);
        }

        let raw = value.as_str().context(InvalidPrecedenceSnafu {
            value: format!("{value:?}"),
        })?;
        Precedence::from_str(raw, true)
            .ok()
            .map(Some)
            .context(InvalidPrecedenceSnafu { value: raw })
    }

    fn parse_jobs(
        top_level: &LinkedHashMap<Yaml, Yaml>,
    ) -> Result<Option<NonZeroUsize>, FileConfigError> {
        match top_level.get(&key(JOBS_KEY)) {
            None | Some(Yaml::Value(Scalar::Null)) => Ok(None),
            Some(Yaml::Value(Scalar::Integer(jobs))) => usize::try_from(*jobs)
                .ok()
                .and_then(NonZeroUsize::new)
                .map(Some)
                .context(InvalidJobsSnafu {
                    value: jobs.to_string(),
                }),
            Some(other) => InvalidJobsSnafu {
                value: format!("{other:?}"),
            }
            .fail(),
        }
    }
}

impl TryFrom<&str> for FileConfig {
    type Error = FileConfigError;

    fn try_from(contents: &str) -> Result<Self, Self::Error> {
        let documents =
            Yaml::load_from_str(contents).map_err(|e| FileConfigError::ParseError { source: e })?;
        let Some(document) = documents.first() else {
            debug!("Config file is empty, using defaults");
            return Ok(Self::default());
        };

        let top_level = document.as_mapping().context(TopLevelNotMapSnafu)?;

        for (entry, _) in top_level {
            let known = entry
                .as_str()
                .is_some_and(|name| [EXCLUDE_KEY, PRECEDENCE_KEY, JOBS_KEY].contains(&name));
            if !known {
                warn!("Skipping unknown config entry: {:?}", entry);
            }
        }

        Ok(FileConfig {
            exclude: Self::parse_exclude(top_level)?,
            precedence: Self::parse_precedence(top_level)?,
            jobs: Self::parse_jobs(top_level)?,
        })
    }
}

#[derive(Debug, Snafu)]
pub enum FileConfigError {
    #[snafu(display("Failed to read the config file: {}", file_path))]
    ReadError {
        file_path: String,
        source: std::io::Error,
    },
    #[snafu(display("Config file {} is not valid UTF-8", file_path))]
    NotUtf8Error { file_path: String },
    #[snafu(display("Failed to parse the config file"))]
    ParseError { source: saphyr::ScanError },
    #[snafu(display("Top level of config should be a map"))]
    TopLevelNotMap,
    #[snafu(display("'exclude' should be a list of patterns"))]
    ExcludeNotSequence,
    #[snafu(display("'exclude' entry {} is not a string", entry))]
    ExcludeEntryNotString { entry: String },
    #[snafu(display("'precedence' should be 'first' or 'last', got {}", value))]
    InvalidPrecedence { value: String },
    #[snafu(display("'jobs' should be a positive integer, got {}", value))]
    InvalidJobs { value: String },
}
