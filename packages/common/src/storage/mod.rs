mod error;
mod format;
mod hash;
mod traits;

pub mod filesystem;

pub use error::StorageError;
pub use format::ImageFormat;
pub use hash::ContentHash;
pub use traits::{BoxReader, ImageStore, StoredImage};
