use std::{
    future::Future,
    io::ErrorKind,
    ops::Deref,
    path::{Path, PathBuf},
};

use anyhow::Result;
use fs4::tokio::AsyncFileExt;
use tokio::{
    fs::{self, File},
    io::{AsyncReadExt, AsyncWriteExt},
};
use tracing::debug;

/// Interface for abstracting the key/value blob storage backing the store.
/// The whole database image lives under a single key; the remaining keys
/// only matter to the legacy import.
pub trait BlobStorage {
    /// Reads the whole value stored under `key`. A missing key is `None`,
    /// not an error.
    fn read(&self, key: &str) -> impl Future<Output = Result<Option<String>>> + Send;

    /// Overwrites the whole value stored under `key`.
    fn write(&self, key: &str, value: &str) -> impl Future<Output = Result<()>> + Send;

    /// Lists every key currently present.
    fn keys(&self) -> impl Future<Output = Result<Vec<String>>> + Send;
}

impl<T: Deref> BlobStorage for T
where
    T::Target: BlobStorage,
{
    fn read(&self, key: &str) -> impl Future<Output = Result<Option<String>>> + Send {
        self.deref().read(key)
    }

    fn write(&self, key: &str, value: &str) -> impl Future<Output = Result<()>> + Send {
        self.deref().write(key, value)
    }

    fn keys(&self) -> impl Future<Output = Result<Vec<String>>> + Send {
        self.deref().keys()
    }
}

/// The main realization of [BlobStorage]. Keeps one file per key inside the
/// blob directory, with advisory locks guarding against a second concurrent
/// invocation of the application.
pub struct FileBlobStorage {
    blob_dir: PathBuf,
}

impl FileBlobStorage {
    pub fn new(blob_dir: PathBuf) -> Result<Self, std::io::Error> {
        std::fs::create_dir_all(&blob_dir)?;

        Ok(Self { blob_dir })
    }

    async fn read_inner(path: &Path) -> std::result::Result<String, std::io::Error> {
        debug!("Reading blob {path:?}");
        let mut file = File::open(path).await?;
        file.lock_shared()?;
        let mut value = String::new();
        let result = file.read_to_string(&mut value).await;
        file.unlock_async().await?;
        result?;
        Ok(value)
    }

    async fn write_inner(file: &mut File, value: &str) -> std::result::Result<(), std::io::Error> {
        file.set_len(0).await?;
        file.write_all(value.as_bytes()).await?;
        file.flush().await?;
        Ok(())
    }
}

impl BlobStorage for FileBlobStorage {
    async fn read(&self, key: &str) -> Result<Option<String>> {
        match Self::read_inner(&self.blob_dir.join(key)).await {
            Ok(v) => Ok(Some(v)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e)?,
        }
    }

    async fn write(&self, key: &str, value: &str) -> Result<()> {
        let mut file = File::options()
            .write(true)
            .create(true)
            .truncate(false)
            .open(self.blob_dir.join(key))
            .await?;

        // Semi-safe acquire-release for a file
        file.lock_exclusive()?;
        let result = Self::write_inner(&mut file, value).await;
        file.unlock_async().await?;
        result?;
        Ok(())
    }

    async fn keys(&self) -> Result<Vec<String>> {
        let mut dir = fs::read_dir(&self.blob_dir).await?;
        let mut keys = vec![];
        while let Some(entry) = dir.next_entry().await? {
            if entry.file_type().await?.is_file() {
                keys.push(entry.file_name().to_string_lossy().to_string());
            }
        }
        Ok(keys)
    }
}
