use crate::config::Config;
use crate::error::BackupError;
use crate::fs_utils::{self, ExcludeSet, encode_size};
use crate::naming;
use crate::packaging;
use chrono::Local;
use std::fs;
use std::path::PathBuf;
use tracing::{info, warn};

/// One (source directory, output directory, exclude patterns) unit of work.
/// Immutable for the duration of a run.
#[derive(Debug, Clone)]
pub struct BackupJob {
    pub source_path: PathBuf,
    pub output_dir: PathBuf,
    pub exclude_patterns: Vec<String>,
}

/// Per-job outcome: logged, counted into the summary, not persisted.
#[derive(Debug)]
pub struct ArchiveResult {
    pub source_path: PathBuf,
    pub output_file: Option<PathBuf>,
    pub size_bytes: Option<u64>,
    pub error: Option<BackupError>,
}

impl ArchiveResult {
    pub fn success(&self) -> bool {
        self.error.is_none()
    }

    fn completed(source_path: PathBuf, output_file: PathBuf, size_bytes: u64) -> Self {
        Self {
            source_path,
            output_file: Some(output_file),
            size_bytes: Some(size_bytes),
            error: None,
        }
    }

    fn failed(source_path: PathBuf, output_file: Option<PathBuf>, error: BackupError) -> Self {
        Self {
            source_path,
            output_file,
            size_bytes: None,
            error: Some(error),
        }
    }
}

/// Builds the job list from merged configuration. Every source directory
/// shares the configured output directory and exclude patterns.
pub fn jobs_from_config(config: &Config) -> Vec<BackupJob> {
    let output_dir = PathBuf::from(config.output.as_deref().unwrap_or_default());
    let exclude = config.exclude.clone().unwrap_or_default();

    config
        .paths
        .iter()
        .flatten()
        .map(|p| BackupJob {
            source_path: PathBuf::from(p),
            output_dir: output_dir.clone(),
            exclude_patterns: exclude.clone(),
        })
        .collect()
}

/// Runs every job in list order. A failed job is reported once and skipped;
/// it never aborts the rest of the list, and there are no retries.
pub fn run_jobs(jobs: &[BackupJob], with_time: bool) -> Vec<ArchiveResult> {
    let mut results = Vec::with_capacity(jobs.len());
    for job in jobs {
        info!("archiving {}", job.source_path.display());
        let result = run_job(job, with_time);
        match &result.error {
            None => {
                if let (Some(out), Some(size)) = (&result.output_file, result.size_bytes) {
                    info!("wrote {} ({})", out.display(), encode_size(size));
                }
            }
            Some(err) => warn!("skipping {}: {err}", job.source_path.display()),
        }
        results.push(result);
    }

    let failed = results.iter().filter(|r| !r.success()).count();
    info!(
        "backup run complete: {} succeeded, {} failed",
        results.len() - failed,
        failed
    );
    results
}

fn run_job(job: &BackupJob, with_time: bool) -> ArchiveResult {
    let source = job.source_path.clone();
    if !source.is_dir() {
        return ArchiveResult::failed(source.clone(), None, BackupError::SourceNotFound(source));
    }

    let file_name = match naming::archive_file_name(&source, &Local::now(), with_time) {
        Ok(name) => name,
        Err(e) => {
            return ArchiveResult::failed(source, None, BackupError::ArchiveFailed(e.to_string()));
        }
    };
    let dest = job.output_dir.join(file_name);

    // Idempotent: an already-present output directory is not an error.
    if let Err(e) = fs::create_dir_all(&job.output_dir) {
        return ArchiveResult::failed(
            source,
            None,
            BackupError::OutputDirUnavailable {
                dir: job.output_dir.clone(),
                source: e,
            },
        );
    }

    let excludes = match ExcludeSet::compile(&job.exclude_patterns) {
        Ok(set) => set,
        Err(e) => return ArchiveResult::failed(source, None, e),
    };

    let entries = match fs_utils::collect_entries(&source, &excludes) {
        Ok(entries) => entries,
        Err(e) => {
            return ArchiveResult::failed(source, None, BackupError::ArchiveFailed(e.to_string()));
        }
    };

    if let Err(e) = packaging::create_tgz_and_save_sync(entries, &dest) {
        // Never leave a partial archive behind.
        if dest.exists() {
            let _ = fs::remove_file(&dest);
        }
        return ArchiveResult::failed(source, Some(dest), BackupError::ArchiveFailed(e.to_string()));
    }

    match fs::metadata(&dest) {
        Ok(meta) => ArchiveResult::completed(source, dest, meta.len()),
        Err(e) => {
            ArchiveResult::failed(source, Some(dest), BackupError::ArchiveFailed(e.to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn jobs_share_output_dir_and_excludes() {
        let config = Config {
            output: Some("/backups".into()),
            paths: Some(vec!["/srv/a".into(), "/srv/b".into()]),
            exclude: Some(vec!["node_modules".into()]),
            ..Default::default()
        };

        let jobs = jobs_from_config(&config);
        assert_eq!(jobs.len(), 2);
        assert_eq!(jobs[0].source_path, PathBuf::from("/srv/a"));
        assert_eq!(jobs[1].source_path, PathBuf::from("/srv/b"));
        for job in &jobs {
            assert_eq!(job.output_dir, PathBuf::from("/backups"));
            assert_eq!(job.exclude_patterns, vec!["node_modules".to_string()]);
        }
    }
}
