//! dirbak: a directory-to-archive backup tool.
//!
//! Given a list of source directories, dirbak writes one gzip-compressed,
//! timestamped `.tgz` archive per directory into an output directory,
//! omitting configured exclude patterns at every depth and continuing past
//! per-directory failures.

pub mod config;
pub mod error;
pub mod fs_utils;
pub mod naming;
pub mod packaging;
pub mod process;
pub mod shell_exec;

pub use config::Config;
pub use error::BackupError;
pub use process::{ArchiveResult, BackupJob, run_jobs};
