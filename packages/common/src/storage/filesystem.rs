use std::path::PathBuf;

use async_trait::async_trait;
use tokio::fs;
use tokio::io::BufReader;

use super::error::StorageError;
use super::hash::ContentHash;
use super::traits::{BoxReader, ImageStore};

/// Image store on the local filesystem.
///
/// Files live at `{base_path}/{2 hex chars}/{62 hex chars}`. Writes go to
/// `{base_path}/.tmp` first and are renamed into place, so readers never see
/// a partially written image.
pub struct FilesystemImageStore {
    base_path: PathBuf,
    max_size: u64,
}

impl FilesystemImageStore {
    pub async fn new(base_path: PathBuf, max_size: u64) -> Result<Self, StorageError> {
        fs::create_dir_all(base_path.join(".tmp")).await?;
        Ok(Self {
            base_path,
            max_size,
        })
    }

    fn image_path(&self, hash: &ContentHash) -> PathBuf {
        self.base_path.join(hash.shard_path())
    }

    fn temp_path(&self) -> PathBuf {
        self.base_path
            .join(".tmp")
            .join(uuid::Uuid::new_v4().to_string())
    }
}

#[async_trait]
impl ImageStore for FilesystemImageStore {
    async fn put(&self, data: &[u8]) -> Result<ContentHash, StorageError> {
        let actual = data.len() as u64;
        if actual > self.max_size {
            return Err(StorageError::TooLarge {
                actual,
                limit: self.max_size,
            });
        }

        let hash = ContentHash::compute(data);
        let target = self.image_path(&hash);
        if fs::try_exists(&target).await? {
            return Ok(hash);
        }

        let temp = self.temp_path();
        if let Err(e) = fs::write(&temp, data).await {
            let _ = fs::remove_file(&temp).await;
            return Err(e.into());
        }
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).await?;
        }
        if let Err(e) = fs::rename(&temp, &target).await {
            let _ = fs::remove_file(&temp).await;
            return Err(e.into());
        }

        tracing::debug!(hash = %hash, size = actual, "Stored image");
        Ok(hash)
    }

    async fn get_stream(&self, hash: &ContentHash) -> Result<BoxReader, StorageError> {
        match fs::File::open(self.image_path(hash)).await {
            Ok(file) => Ok(Box::new(BufReader::new(file))),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(StorageError::NotFound(hash.to_hex()))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn exists(&self, hash: &ContentHash) -> Result<bool, StorageError> {
        Ok(fs::try_exists(self.image_path(hash)).await?)
    }

    async fn delete(&self, hash: &ContentHash) -> Result<bool, StorageError> {
        match fs::remove_file(self.image_path(hash)).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}
