pub mod storage;

pub use storage::{ContentHash, ImageFormat, ImageStore, StorageError, StoredImage};
