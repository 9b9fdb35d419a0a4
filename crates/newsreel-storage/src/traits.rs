use async_trait::async_trait;
use bytes::Bytes;
use futures::Stream;
use std::pin::Pin;

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Object not found: {0}")]
    NotFound(String),

    #[error("Write failed: {0}")]
    WriteFailed(String),

    #[error("Read failed: {0}")]
    ReadFailed(String),

    #[error("Delete failed: {0}")]
    DeleteFailed(String),

    #[error("Invalid storage key: {0}")]
    InvalidKey(String),

    #[error("Assembled size {actual} bytes does not match declared size {expected} bytes")]
    SizeMismatch { actual: u64, expected: u64 },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Storage configuration error: {0}")]
    ConfigError(String),
}

pub type StorageResult<T> = Result<T, StorageError>;

/// Stream of file bytes, used for downloads and range reads.
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, StorageError>> + Send>>;

/// Blob storage abstraction for final media files and in-flight chunk
/// fragments.
///
/// Fragments live in a per-upload namespace keyed by `(upload_id, index)`;
/// re-writing an index overwrites that slot (last write wins). Final files are
/// addressed by storage key (e.g. `videos/<uuid>.mp4`).
#[async_trait]
pub trait Storage: Send + Sync {
    /// Write a whole file under `storage_key`, returning its public URL.
    async fn write_file(&self, storage_key: &str, data: Vec<u8>) -> StorageResult<String>;

    /// Persist one chunk fragment for `upload_id` at `index`.
    async fn write_chunk(&self, upload_id: &str, index: i32, data: &[u8]) -> StorageResult<()>;

    /// Concatenate the fragments of `upload_id` strictly in the given index
    /// order into a file at `dest_key`, verifying the result is exactly
    /// `expected_size` bytes. On a size mismatch no destination file is left
    /// behind and the fragments are retained for retry. Returns the number of
    /// bytes written.
    async fn assemble_chunks(
        &self,
        upload_id: &str,
        indices: &[i32],
        dest_key: &str,
        expected_size: u64,
    ) -> StorageResult<u64>;

    /// Remove all fragments for `upload_id`. Missing fragments are not an
    /// error.
    async fn delete_chunks(&self, upload_id: &str) -> StorageResult<()>;

    /// Delete a final file. Deleting a missing file is not an error.
    async fn delete(&self, storage_key: &str) -> StorageResult<()>;

    async fn exists(&self, storage_key: &str) -> StorageResult<bool>;

    /// Size in bytes of the stored file.
    async fn content_length(&self, storage_key: &str) -> StorageResult<u64>;

    /// Stream the whole file from disk.
    async fn download_stream(&self, storage_key: &str) -> StorageResult<ByteStream>;

    /// Stream the inclusive byte range `[start, end]` of the file. Callers
    /// must validate the range against [`Storage::content_length`] first.
    async fn read_range(&self, storage_key: &str, start: u64, end: u64)
        -> StorageResult<ByteStream>;

    /// Public URL for a storage key.
    fn url_for(&self, storage_key: &str) -> String;
}
