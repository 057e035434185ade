//! LocalFsSink - アップロードディレクトリにファイルとして保存
//!
//! Every location maps to exactly one file directly under `root`.

use std::io;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;
use tokio::io::{AsyncRead, AsyncWriteExt};

use crate::domain::ByteReader;
use crate::ports::{ByteSink, Location};

#[derive(Debug, Clone)]
pub struct LocalFsSink {
    root: PathBuf,
}

impl LocalFsSink {
    /// Open `root`, creating it (and its parents) if missing.
    pub async fn create(root: impl Into<PathBuf>) -> io::Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root).await?;
        tracing::debug!(root = %root.display(), "upload root ready");
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path(&self, location: &Location) -> PathBuf {
        self.root.join(location.as_str())
    }
}

#[async_trait]
impl ByteSink for LocalFsSink {
    async fn write(
        &self,
        location: &Location,
        source: &mut (dyn AsyncRead + Send + Unpin),
    ) -> io::Result<u64> {
        let path = self.path(location);
        let mut file = fs::File::create(&path).await?;
        let written = tokio::io::copy(source, &mut file).await?;
        file.flush().await?;
        // 公開前に永続化
        file.sync_all().await?;
        Ok(written)
    }

    async fn commit(&self, from: &Location, to: &Location) -> io::Result<()> {
        fs::rename(self.path(from), self.path(to)).await
    }

    async fn open(&self, location: &Location) -> io::Result<ByteReader> {
        let file = fs::File::open(self.path(location)).await?;
        Ok(Box::new(file))
    }

    async fn delete(&self, location: &Location) -> io::Result<()> {
        fs::remove_file(self.path(location)).await
    }

    async fn list(&self) -> io::Result<Vec<Location>> {
        let mut entries = fs::read_dir(&self.root).await?;
        let mut locations = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            if !entry.file_type().await?.is_file() {
                continue;
            }
            // Non-UTF-8 names were never written by us; skip them.
            if let Some(name) = entry.file_name().to_str() {
                locations.push(Location::from_listing(name));
            }
        }
        locations.sort();
        Ok(locations)
    }
}
