//! Key-addressed file storage for generated artifacts.

mod file;

pub use file::FileStore;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum BlobError {
    #[error("blob I/O failed: {0}")]
    Io(String),

    #[error("invalid blob key {0}")]
    InvalidKey(String),
}

/// Storage for rendered artifacts, addressed by path-like keys such as
/// `qrcodes/C6001.svg`.
pub trait BlobStore: Send + Sync {
    /// Write `data` under `key`, replacing any previous blob.
    fn put(&self, key: &str, data: &[u8]) -> Result<(), BlobError>;

    /// Read the blob under `key`, or `None` when nothing was stored.
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, BlobError>;

    fn exists(&self, key: &str) -> Result<bool, BlobError>;
}
