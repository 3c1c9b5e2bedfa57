use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use std::path::Path;

/// Computes the archive file name for one source directory.
///
/// Names follow `<basename>_<YYYY-MM-DD>.tgz`, or
/// `<basename>_<YYYY-MM-DD_HH-MM-SS>.tgz` when time-of-day granularity is
/// requested, so archives for one directory sort chronologically.
pub fn archive_file_name(source: &Path, now: &DateTime<Local>, with_time: bool) -> Result<String> {
    let base = source
        .file_name()
        .with_context(|| format!("source path has no base name: {}", source.display()))?
        .to_string_lossy();

    let stamp = if with_time {
        now.format("%Y-%m-%d_%H-%M-%S")
    } else {
        now.format("%Y-%m-%d")
    };

    Ok(format!("{base}_{stamp}.tgz"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> DateTime<Local> {
        Local.with_ymd_and_hms(y, mo, d, h, mi, s).unwrap()
    }

    #[test]
    fn date_only_name() {
        let name = archive_file_name(Path::new("/home/me/myproject"), &at(2026, 8, 7, 1, 2, 3), false)
            .unwrap();
        assert_eq!(name, "myproject_2026-08-07.tgz");
    }

    #[test]
    fn name_with_time_of_day() {
        let name = archive_file_name(Path::new("/home/me/myproject"), &at(2026, 8, 7, 1, 2, 3), true)
            .unwrap();
        assert_eq!(name, "myproject_2026-08-07_01-02-03.tgz");
    }

    #[test]
    fn trailing_slash_and_spaces_keep_the_base_name() {
        let name =
            archive_file_name(Path::new("/srv/project two/"), &at(2026, 8, 7, 0, 0, 0), false)
                .unwrap();
        assert_eq!(name, "project two_2026-08-07.tgz");
    }

    #[test]
    fn root_path_has_no_base_name() {
        assert!(archive_file_name(Path::new("/"), &at(2026, 8, 7, 0, 0, 0), false).is_err());
    }
}
