pub mod media;
pub mod upload_session;

pub use media::{MediaAsset, MediaType, ProcessingStatus, VideoMetadata};
pub use upload_session::{SessionStatus, UploadSession};
