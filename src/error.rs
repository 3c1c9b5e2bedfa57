use std::path::PathBuf;
use thiserror::Error;

/// Per-job failure kinds. None of these is fatal to the run: every job is
/// attempted and reports exactly one result.
#[derive(Debug, Error)]
pub enum BackupError {
    #[error("source path does not exist or is not a directory: {}", .0.display())]
    SourceNotFound(PathBuf),

    #[error("cannot create output directory {}: {source}", .dir.display())]
    OutputDirUnavailable {
        dir: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid exclude pattern `{pattern}`: {source}")]
    InvalidExcludePattern {
        pattern: String,
        #[source]
        source: glob::PatternError,
    },

    #[error("archiving failed: {0}")]
    ArchiveFailed(String),
}
