//! Download sinks: where finished files are saved.

use std::{
    io::{self, Write},
    path::{Path, PathBuf},
};

use async_trait::async_trait;
use mockall::automock;
use tempfile::NamedTempFile;

/// A file ready to hand to the shopper.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Download {
    /// File name, including extension
    pub file_name: String,

    /// MIME type of `bytes`
    pub content_type: &'static str,

    /// File contents
    pub bytes: Vec<u8>,
}

/// Saves downloads.
#[automock]
#[async_trait]
pub trait DownloadSink: Send + Sync {
    /// Save a download, returning where it was written.
    async fn save(&self, download: Download) -> io::Result<PathBuf>;
}

/// Writes downloads into a directory.
///
/// Each file is staged as a temp file in the same directory and only renamed into place once
/// fully written; the staging file is removed if anything fails.
#[derive(Debug, Clone)]
pub struct DirectorySink {
    dir: PathBuf,
}

impl DirectorySink {
    /// Save into `dir`, creating it on first use
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Target directory
    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

#[async_trait]
impl DownloadSink for DirectorySink {
    async fn save(&self, download: Download) -> io::Result<PathBuf> {
        let dir = self.dir.clone();

        tokio::task::spawn_blocking(move || write_staged(&dir, &download))
            .await
            .map_err(io::Error::other)?
    }
}

fn write_staged(dir: &Path, download: &Download) -> io::Result<PathBuf> {
    std::fs::create_dir_all(dir)?;

    let target = dir.join(&download.file_name);
    let mut staged = NamedTempFile::new_in(dir)?;

    staged.write_all(&download.bytes)?;
    staged.flush()?;
    staged.persist(&target)?;

    Ok(target)
}

#[cfg(test)]
mod tests {
    use testresult::TestResult;

    use super::*;

    #[tokio::test]
    async fn directory_sink_writes_the_named_file() -> TestResult {
        let dir = tempfile::tempdir()?;
        let sink = DirectorySink::new(dir.path().join("downloads"));

        let path = sink
            .save(Download {
                file_name: "poster.png".to_string(),
                content_type: "image/png",
                bytes: vec![1, 2, 3],
            })
            .await?;

        assert_eq!(path, dir.path().join("downloads").join("poster.png"));
        assert_eq!(std::fs::read(&path)?, vec![1, 2, 3]);
        assert_eq!(std::fs::read_dir(sink.dir())?.count(), 1);

        Ok(())
    }
}
