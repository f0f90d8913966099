use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncReadExt};

use super::error::StorageError;
use super::format::ImageFormat;
use super::hash::ContentHash;

/// Type alias for a boxed async reader.
pub type BoxReader = Box<dyn AsyncRead + Unpin + Send>;

/// Metadata of an image accepted by [`ImageStore::put_image`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoredImage {
    pub hash: ContentHash,
    pub format: ImageFormat,
    pub size: u64,
}

/// Content-addressed image storage.
#[async_trait]
pub trait ImageStore: Send + Sync {
    /// Validate that `data` is a supported image, then store it.
    async fn put_image(&self, data: &[u8]) -> Result<StoredImage, StorageError> {
        let format = ImageFormat::sniff(data).ok_or(StorageError::UnsupportedFormat)?;
        let hash = self.put(data).await?;
        Ok(StoredImage {
            hash,
            format,
            size: data.len() as u64,
        })
    }

    /// Store raw bytes and return their content hash.
    async fn put(&self, data: &[u8]) -> Result<ContentHash, StorageError>;

    async fn get_stream(&self, hash: &ContentHash) -> Result<BoxReader, StorageError>;

    async fn get(&self, hash: &ContentHash) -> Result<Vec<u8>, StorageError> {
        let mut reader = self.get_stream(hash).await?;
        let mut buf = Vec::new();
        reader.read_to_end(&mut buf).await?;
        Ok(buf)
    }

    async fn exists(&self, hash: &ContentHash) -> Result<bool, StorageError>;

    /// Returns `true` if the image was deleted, `false` if it did not exist.
    async fn delete(&self, hash: &ContentHash) -> Result<bool, StorageError>;
}
