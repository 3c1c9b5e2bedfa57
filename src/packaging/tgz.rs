use anyhow::Result;
use bytes::Bytes;
use flate2::Compression;
use flate2::write::GzEncoder;
use futures::{Stream, StreamExt};
use std::fs::File;
use std::io::Write;
use std::path::Path;
use tar::{Builder, Header};
use tokio::sync::mpsc;
use tokio::task;
use tokio_stream::wrappers::ReceiverStream;

use super::FileEntry;

/// A `std::io::Write` implementation that forwards chunks into a
/// `tokio::sync::mpsc::Sender` using *blocking* sends.
///
/// Only valid inside `tokio::task::spawn_blocking`: `blocking_send` stalls
/// the writing thread whenever the async receiver falls behind, which bounds
/// the amount of archive data held in memory.
struct WriterToAsyncChannel {
    sender: mpsc::Sender<Result<Vec<u8>>>,
}

impl Write for WriterToAsyncChannel {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.sender
            .blocking_send(Ok(buf.to_vec()))
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::BrokenPipe, e.to_string()))?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

/// Creates an async streaming `.tgz` archive.
///
/// The synchronous tar/gzip work runs on tokio's blocking pool and pipes the
/// resulting chunks through a small channel, so the archive is never held in
/// memory as a whole. The first error aborts the archive and ends the
/// stream with that error.
pub fn package_tgz_streaming_async(entries: Vec<FileEntry>) -> impl Stream<Item = Result<Bytes>> {
    let (tx, rx) = mpsc::channel::<Result<Vec<u8>>>(4);

    task::spawn_blocking(move || {
        // The closure owns `tx`; the writer gets a clone so errors can still
        // be reported here after the archive has taken the writer.
        let pipe = WriterToAsyncChannel { sender: tx.clone() };
        let encoder = GzEncoder::new(pipe, Compression::default());
        let mut archive = Builder::new(encoder);

        for fe in entries {
            if fe.path.is_dir() {
                if let Err(e) = archive.append_dir(&fe.name_in_archive, &fe.path) {
                    let _ = tx.blocking_send(Err(anyhow::anyhow!(
                        "failed to add directory {}: {e}",
                        fe.name_in_archive
                    )));
                    return;
                }
                continue;
            }

            let mut file = match File::open(&fe.path) {
                Ok(f) => f,
                Err(e) => {
                    let _ = tx.blocking_send(Err(anyhow::anyhow!(
                        "failed to open {}: {e}",
                        fe.path.display()
                    )));
                    return;
                }
            };
            let meta = match file.metadata() {
                Ok(m) => m,
                Err(e) => {
                    let _ = tx.blocking_send(Err(e.into()));
                    return;
                }
            };

            let mut header = Header::new_gnu();
            header.set_metadata(&meta);
            if let Err(e) = archive.append_data(&mut header, &fe.name_in_archive, &mut file) {
                let _ = tx.blocking_send(Err(anyhow::anyhow!(
                    "failed to append {}: {e}",
                    fe.name_in_archive
                )));
                return;
            }
        }

        // Flush the tar trailer and the gzip footer. Dropping `tx` when the
        // closure ends closes the channel, which the receiver side sees as
        // the end of the stream.
        match archive.into_inner() {
            Ok(encoder) => {
                if let Err(e) = encoder.finish() {
                    let _ = tx.blocking_send(Err(e.into()));
                }
            }
            Err(e) => {
                let _ = tx.blocking_send(Err(e.into()));
            }
        }
    });

    ReceiverStream::new(rx).map(|r| r.map(Bytes::from))
}

/// Writes archive chunks to a local file asynchronously.
pub async fn save_file_async<S>(path: &Path, mut stream: S) -> Result<()>
where
    S: Stream<Item = Result<Bytes>> + Unpin,
{
    use tokio::fs::File;
    use tokio::io::AsyncWriteExt;

    let mut file = File::create(path).await?;

    while let Some(chunk_result) = stream.next().await {
        file.write_all(&chunk_result?).await?;
    }

    file.flush().await?;
    Ok(())
}
