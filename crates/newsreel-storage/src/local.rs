use crate::traits::{ByteStream, Storage, StorageError, StorageResult};
use async_trait::async_trait;
use futures::StreamExt;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::{AsyncReadExt, AsyncSeekExt, AsyncWriteExt};
use tokio_util::io::ReaderStream;

/// Directory under the storage root holding in-flight chunk fragments.
const CHUNK_DIR: &str = "chunks";

/// Local filesystem storage implementation
#[derive(Clone)]
pub struct LocalStorage {
    base_path: PathBuf,
    base_url: String,
}

impl LocalStorage {
    /// Create a new LocalStorage instance
    ///
    /// # Arguments
    /// * `base_path` - Root directory for file storage (e.g., "/var/lib/newsreel/media")
    /// * `base_url` - Base URL for serving files (e.g., "http://localhost:4000/files")
    pub async fn new(base_path: impl Into<PathBuf>, base_url: String) -> StorageResult<Self> {
        let base_path = base_path.into();

        fs::create_dir_all(&base_path).await.map_err(|e| {
            StorageError::ConfigError(format!(
                "Failed to create storage directory {}: {}",
                base_path.display(),
                e
            ))
        })?;

        Ok(LocalStorage {
            base_path,
            base_url,
        })
    }

    /// Convert a storage key to a filesystem path, rejecting keys that could
    /// escape the base directory.
    fn key_to_path(&self, storage_key: &str) -> StorageResult<PathBuf> {
        if storage_key.is_empty()
            || storage_key.starts_with('/')
            || storage_key
                .split('/')
                .any(|part| part == ".." || part == "." || part.is_empty())
        {
            return Err(StorageError::InvalidKey(format!(
                "Storage key contains invalid path components: {}",
                storage_key
            )));
        }
        Ok(self.base_path.join(storage_key))
    }

    fn chunk_key(upload_id: &str, index: i32) -> String {
        format!("{}/{}/{:06}.part", CHUNK_DIR, upload_id, index)
    }

    fn chunk_dir_key(upload_id: &str) -> String {
        format!("{}/{}", CHUNK_DIR, upload_id)
    }

    /// Ensure parent directory exists
    async fn ensure_parent_dir(&self, path: &Path) -> StorageResult<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        Ok(())
    }
}

#[async_trait]
impl Storage for LocalStorage {
    async fn write_file(&self, storage_key: &str, data: Vec<u8>) -> StorageResult<String> {
        let path = self.key_to_path(storage_key)?;
        let size = data.len();

        self.ensure_parent_dir(&path).await?;

        let start = std::time::Instant::now();

        let mut file = fs::File::create(&path).await.map_err(|e| {
            StorageError::WriteFailed(format!("Failed to create file {}: {}", path.display(), e))
        })?;

        file.write_all(&data).await.map_err(|e| {
            StorageError::WriteFailed(format!("Failed to write file {}: {}", path.display(), e))
        })?;

        file.sync_all().await.map_err(|e| {
            StorageError::WriteFailed(format!("Failed to sync file {}: {}", path.display(), e))
        })?;

        tracing::info!(
            key = %storage_key,
            size_bytes = size,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Local storage write successful"
        );

        Ok(self.url_for(storage_key))
    }

    async fn write_chunk(&self, upload_id: &str, index: i32, data: &[u8]) -> StorageResult<()> {
        if index < 0 {
            return Err(StorageError::InvalidKey(format!(
                "Negative chunk index: {}",
                index
            )));
        }
        let key = Self::chunk_key(upload_id, index);
        let path = self.key_to_path(&key)?;

        self.ensure_parent_dir(&path).await?;

        // Plain create-and-write: re-delivery of the same index overwrites the
        // fragment slot, which is the intended last-write-wins behavior.
        let mut file = fs::File::create(&path).await.map_err(|e| {
            StorageError::WriteFailed(format!("Failed to create fragment {}: {}", key, e))
        })?;
        file.write_all(data).await.map_err(|e| {
            StorageError::WriteFailed(format!("Failed to write fragment {}: {}", key, e))
        })?;
        file.sync_all().await.map_err(|e| {
            StorageError::WriteFailed(format!("Failed to sync fragment {}: {}", key, e))
        })?;

        tracing::debug!(
            upload_id = %upload_id,
            chunk_index = index,
            size_bytes = data.len(),
            "Chunk fragment stored"
        );

        Ok(())
    }

    async fn assemble_chunks(
        &self,
        upload_id: &str,
        indices: &[i32],
        dest_key: &str,
        expected_size: u64,
    ) -> StorageResult<u64> {
        let dest_path = self.key_to_path(dest_key)?;
        self.ensure_parent_dir(&dest_path).await?;

        // Concatenate into a scratch file first; only a size-verified result
        // is renamed into the permanent location.
        let tmp_key = format!("{}.assembling", dest_key);
        let tmp_path = self.key_to_path(&tmp_key)?;

        let start = std::time::Instant::now();
        let mut dest = fs::File::create(&tmp_path).await.map_err(|e| {
            StorageError::WriteFailed(format!(
                "Failed to create assembly file {}: {}",
                tmp_path.display(),
                e
            ))
        })?;

        let mut total_bytes = 0u64;
        for &index in indices {
            let chunk_key = Self::chunk_key(upload_id, index);
            let chunk_path = self.key_to_path(&chunk_key)?;
            let mut chunk = match fs::File::open(&chunk_path).await {
                Ok(f) => f,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                    let _ = fs::remove_file(&tmp_path).await;
                    return Err(StorageError::NotFound(chunk_key));
                }
                Err(e) => {
                    let _ = fs::remove_file(&tmp_path).await;
                    return Err(StorageError::ReadFailed(format!(
                        "Failed to open fragment {}: {}",
                        chunk_key, e
                    )));
                }
            };
            let copied = tokio::io::copy(&mut chunk, &mut dest).await.map_err(|e| {
                StorageError::WriteFailed(format!(
                    "Failed to append fragment {} to {}: {}",
                    chunk_key, tmp_key, e
                ))
            })?;
            total_bytes += copied;
        }

        dest.sync_all().await.map_err(|e| {
            StorageError::WriteFailed(format!("Failed to sync assembly file: {}", e))
        })?;
        drop(dest);

        if total_bytes != expected_size {
            // Fragments stay in place for the retry window; only the scratch
            // output is removed.
            let _ = fs::remove_file(&tmp_path).await;
            return Err(StorageError::SizeMismatch {
                actual: total_bytes,
                expected: expected_size,
            });
        }

        fs::rename(&tmp_path, &dest_path).await.map_err(|e| {
            StorageError::WriteFailed(format!(
                "Failed to move assembled file into place {}: {}",
                dest_path.display(),
                e
            ))
        })?;

        tracing::info!(
            upload_id = %upload_id,
            dest_key = %dest_key,
            parts = indices.len(),
            size_bytes = total_bytes,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Chunk assembly successful"
        );

        Ok(total_bytes)
    }

    async fn delete_chunks(&self, upload_id: &str) -> StorageResult<()> {
        let dir = self.key_to_path(&Self::chunk_dir_key(upload_id))?;

        if !fs::try_exists(&dir).await.unwrap_or(false) {
            return Ok(());
        }

        fs::remove_dir_all(&dir).await.map_err(|e| {
            StorageError::DeleteFailed(format!(
                "Failed to delete fragments for upload {}: {}",
                upload_id, e
            ))
        })?;

        tracing::debug!(upload_id = %upload_id, "Chunk fragments deleted");
        Ok(())
    }

    async fn delete(&self, storage_key: &str) -> StorageResult<()> {
        let path = self.key_to_path(storage_key)?;

        if !fs::try_exists(&path).await.unwrap_or(false) {
            return Ok(());
        }

        fs::remove_file(&path).await.map_err(|e| {
            StorageError::DeleteFailed(format!("Failed to delete file {}: {}", path.display(), e))
        })?;

        tracing::info!(key = %storage_key, "Local storage delete successful");
        Ok(())
    }

    async fn exists(&self, storage_key: &str) -> StorageResult<bool> {
        let path = self.key_to_path(storage_key)?;
        Ok(fs::try_exists(&path).await.unwrap_or(false))
    }

    async fn content_length(&self, storage_key: &str) -> StorageResult<u64> {
        let path = self.key_to_path(storage_key)?;
        let meta = fs::metadata(&path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                StorageError::NotFound(storage_key.to_string())
            } else {
                StorageError::ReadFailed(e.to_string())
            }
        })?;
        Ok(meta.len())
    }

    async fn download_stream(&self, storage_key: &str) -> StorageResult<ByteStream> {
        let path = self.key_to_path(storage_key)?;

        if !fs::try_exists(&path).await.unwrap_or(false) {
            return Err(StorageError::NotFound(storage_key.to_string()));
        }

        let file = fs::File::open(&path).await.map_err(|e| {
            StorageError::ReadFailed(format!("Failed to open file {}: {}", path.display(), e))
        })?;

        let stream = ReaderStream::new(file).map(|result| {
            result.map_err(|e| StorageError::ReadFailed(format!("Failed to read chunk: {}", e)))
        });

        Ok(Box::pin(stream))
    }

    async fn read_range(
        &self,
        storage_key: &str,
        start: u64,
        end: u64,
    ) -> StorageResult<ByteStream> {
        let path = self.key_to_path(storage_key)?;

        let mut file = fs::File::open(&path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                StorageError::NotFound(storage_key.to_string())
            } else {
                StorageError::ReadFailed(format!("Failed to open file {}: {}", path.display(), e))
            }
        })?;

        file.seek(std::io::SeekFrom::Start(start))
            .await
            .map_err(|e| StorageError::ReadFailed(format!("Failed to seek to {}: {}", start, e)))?;

        // Inclusive range, so the reader is capped at end-start+1 bytes.
        let limited = file.take(end - start + 1);
        let stream = ReaderStream::new(limited).map(|result| {
            result.map_err(|e| StorageError::ReadFailed(format!("Failed to read range: {}", e)))
        });

        Ok(Box::pin(stream))
    }

    fn url_for(&self, storage_key: &str) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), storage_key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;
    use tempfile::tempdir;

    async fn storage(dir: &tempfile::TempDir) -> LocalStorage {
        LocalStorage::new(dir.path(), "http://localhost:4000/files".to_string())
            .await
            .unwrap()
    }

    async fn collect(mut stream: ByteStream) -> Vec<u8> {
        let mut out = Vec::new();
        while let Some(chunk) = stream.next().await {
            out.extend_from_slice(&chunk.unwrap());
        }
        out
    }

    #[tokio::test]
    async fn write_and_stream_roundtrip() {
        let dir = tempdir().unwrap();
        let s = storage(&dir).await;

        let url = s
            .write_file("images/a.png", b"png bytes".to_vec())
            .await
            .unwrap();
        assert_eq!(url, "http://localhost:4000/files/images/a.png");

        let body = collect(s.download_stream("images/a.png").await.unwrap()).await;
        assert_eq!(body, b"png bytes");
        assert_eq!(s.content_length("images/a.png").await.unwrap(), 9);
    }

    #[tokio::test]
    async fn assembly_is_index_ordered_regardless_of_arrival_order() {
        let dir = tempdir().unwrap();
        let s = storage(&dir).await;

        // delivered out of order: 1, 0, 2
        s.write_chunk("u1", 1, b"BBBB").await.unwrap();
        s.write_chunk("u1", 0, b"AAAA").await.unwrap();
        s.write_chunk("u1", 2, b"CC").await.unwrap();

        let size = s
            .assemble_chunks("u1", &[0, 1, 2], "videos/u1.mp4", 10)
            .await
            .unwrap();
        assert_eq!(size, 10);

        let body = collect(s.download_stream("videos/u1.mp4").await.unwrap()).await;
        assert_eq!(body, b"AAAABBBBCC");
    }

    #[tokio::test]
    async fn chunk_redelivery_overwrites_fragment_slot() {
        let dir = tempdir().unwrap();
        let s = storage(&dir).await;

        s.write_chunk("u2", 0, b"old!").await.unwrap();
        s.write_chunk("u2", 0, b"new!").await.unwrap();
        s.write_chunk("u2", 1, b"tail").await.unwrap();

        s.assemble_chunks("u2", &[0, 1], "videos/u2.mp4", 8)
            .await
            .unwrap();
        let body = collect(s.download_stream("videos/u2.mp4").await.unwrap()).await;
        assert_eq!(body, b"new!tail");
    }

    #[tokio::test]
    async fn size_mismatch_leaves_fragments_and_no_destination() {
        let dir = tempdir().unwrap();
        let s = storage(&dir).await;

        s.write_chunk("u3", 0, b"AAAA").await.unwrap();
        s.write_chunk("u3", 1, b"BB").await.unwrap();

        let err = s
            .assemble_chunks("u3", &[0, 1], "videos/u3.mp4", 99)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            StorageError::SizeMismatch {
                actual: 6,
                expected: 99
            }
        ));

        // no final file, fragments retained for retry
        assert!(!s.exists("videos/u3.mp4").await.unwrap());
        assert!(s.exists("chunks/u3/000000.part").await.unwrap());

        // retry with the corrected size succeeds
        let size = s
            .assemble_chunks("u3", &[0, 1], "videos/u3.mp4", 6)
            .await
            .unwrap();
        assert_eq!(size, 6);
    }

    #[tokio::test]
    async fn assembly_with_missing_fragment_fails() {
        let dir = tempdir().unwrap();
        let s = storage(&dir).await;

        s.write_chunk("u4", 0, b"AAAA").await.unwrap();

        let err = s
            .assemble_chunks("u4", &[0, 1], "videos/u4.mp4", 8)
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::NotFound(_)));
        assert!(!s.exists("videos/u4.mp4").await.unwrap());
    }

    #[tokio::test]
    async fn delete_chunks_removes_all_fragments() {
        let dir = tempdir().unwrap();
        let s = storage(&dir).await;

        s.write_chunk("u5", 0, b"AAAA").await.unwrap();
        s.write_chunk("u5", 1, b"BBBB").await.unwrap();

        s.delete_chunks("u5").await.unwrap();
        assert!(!s.exists("chunks/u5/000000.part").await.unwrap());

        // deleting again is a no-op
        s.delete_chunks("u5").await.unwrap();
    }

    #[tokio::test]
    async fn read_range_returns_exact_slice() {
        let dir = tempdir().unwrap();
        let s = storage(&dir).await;

        let data: Vec<u8> = (0..1000u32).map(|i| (i % 256) as u8).collect();
        s.write_file("videos/r.mp4", data.clone()).await.unwrap();

        let body = collect(s.read_range("videos/r.mp4", 0, 99).await.unwrap()).await;
        assert_eq!(body.len(), 100);
        assert_eq!(body, &data[0..100]);

        let tail = collect(s.read_range("videos/r.mp4", 990, 999).await.unwrap()).await;
        assert_eq!(tail, &data[990..1000]);
    }

    #[tokio::test]
    async fn path_traversal_rejected() {
        let dir = tempdir().unwrap();
        let s = storage(&dir).await;

        assert!(matches!(
            s.download_stream("../../../etc/passwd").await,
            Err(StorageError::InvalidKey(_))
        ));
        assert!(matches!(
            s.delete("/etc/passwd").await,
            Err(StorageError::InvalidKey(_))
        ));
        assert!(matches!(
            s.write_chunk("../evil", 0, b"x").await,
            Err(StorageError::InvalidKey(_))
        ));
    }

    #[tokio::test]
    async fn delete_nonexistent_is_ok() {
        let dir = tempdir().unwrap();
        let s = storage(&dir).await;
        assert!(s.delete("videos/nope.mp4").await.is_ok());
    }
}
