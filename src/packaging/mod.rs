use anyhow::Result;
use std::path::{Path, PathBuf};
use tokio::runtime::Builder;

pub mod tgz;

/// Represents one entry to include in the archive.
#[derive(Debug, Clone)]
pub struct FileEntry {
    pub path: PathBuf,
    pub name_in_archive: String,
}

/// Creates a gzipped tar stream and writes it to `dest`, managing its own
/// async runtime.
///
/// This is the main entrypoint for synchronous callers: the runner blocks
/// here until the archive is fully written or the first error surfaces.
pub fn create_tgz_and_save_sync(entries: Vec<FileEntry>, dest: &Path) -> Result<()> {
    let rt = Builder::new_multi_thread().enable_all().build()?;

    rt.block_on(async {
        let stream = tgz::package_tgz_streaming_async(entries);

        // Pin the stream so the save loop can call `stream.next()`.
        let mut pinned = Box::pin(stream);
        tgz::save_file_async(dest, &mut pinned).await
    })
}
