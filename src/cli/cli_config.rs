use std::num::NonZeroUsize;
use std::path::PathBuf;

use clap::Parser;

use crate::application::data::LogLevel;
use crate::scan::Precedence;

/// Builds a content-addressed index of resource files for the engine.
#[derive(Parser, Debug, Clone)]
#[command(version)]
pub struct Cli {
    /// File the index records are written to
    pub output: PathBuf,

    /// Resource root directories, earlier ones taking precedence by default
    #[clap(required = true, num_args = 1..)]
    pub directories: Vec<PathBuf>,

    /// Glob for entries to leave out of the index; may be repeated
    #[clap(long, value_name = "PATTERN")]
    pub exclude: Vec<String>,

    /// Write a Makefile-style dependency file listing every indexed file
    #[clap(long, value_name = "PATH")]
    pub depfile: Option<PathBuf>,

    /// Which root wins when a path exists under several of them
    #[clap(long, value_enum)]
    pub precedence: Option<Precedence>,

    /// Number of hashing worker threads
    #[clap(long, short)]
    pub jobs: Option<NonZeroUsize>,

    /// Optional YAML file with default settings
    #[clap(long, short, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Parse the rendered index back and check every file resolves
    #[clap(long)]
    pub verify: bool,

    #[clap(long, short, default_value = "warn", value_enum)]
    pub log_level: LogLevel,
}
