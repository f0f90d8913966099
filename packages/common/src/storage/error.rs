use thiserror::Error;

/// Errors raised by image storage backends.
#[derive(Debug, Error)]
pub enum StorageError {
    /// No image is stored under the given hash.
    #[error("image not found: {0}")]
    NotFound(String),
    #[error("storage IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid content hash: {0}")]
    InvalidHash(String),
    /// The upload exceeds the configured size limit.
    #[error("image exceeds size limit ({actual} > {limit} bytes)")]
    TooLarge { actual: u64, limit: u64 },
    /// The upload is not a JPEG, PNG, GIF or WebP image.
    #[error("unsupported image format, expected JPEG, PNG, GIF or WebP")]
    UnsupportedFormat,
}
