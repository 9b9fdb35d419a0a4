//! Storage backends for media files and chunk fragments.
//!
//! The [`Storage`] trait abstracts the blob layer: whole-file writes, per-chunk
//! fragment writes, index-ordered assembly, and incremental (range) reads.
//! [`LocalStorage`] is the filesystem implementation; everything streams so
//! memory use stays bounded regardless of file size.

pub mod local;
pub mod traits;

pub use local::LocalStorage;
pub use traits::{ByteStream, Storage, StorageError, StorageResult};
