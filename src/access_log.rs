//! Append-only access-log sinks.
//!
//! The access log is independent of the `tracing` output: it is a dedicated,
//! injected collaborator with a single write-a-line contract, so operators can
//! point it at a file that log shippers already understand. Writes are
//! best-effort at the call site; a failed write never fails the request that
//! produced it.

use std::path::Path;
use tokio::fs::{File, OpenOptions};
use tokio::io;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

/// A concurrent-safe, append-only destination for access-log lines.
#[async_trait::async_trait]
pub trait AccessLogSink: Send + Sync {
    /// Append one line (no trailing newline) to the sink.
    async fn write_line(&self, line: &str) -> io::Result<()>;
}

/// An [`AccessLogSink`] appending to a file, created when missing.
pub struct FileSink {
    file: Mutex<File>,
}

impl FileSink {
    /// Open (or create) the access-log file at `p` for appending.
    ///
    /// # Errors
    ///
    /// Returns the underlying IO error when the file can't be opened.
    pub async fn open(p: impl AsRef<Path>) -> io::Result<Self> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(p)
            .await?;
        Ok(Self {
            file: Mutex::new(file),
        })
    }
}

#[async_trait::async_trait]
impl AccessLogSink for FileSink {
    async fn write_line(&self, line: &str) -> io::Result<()> {
        let mut file = self.file.lock().await;
        file.write_all(line.as_bytes()).await?;
        file.write_all(b"\n").await?;
        file.flush().await
    }
}
