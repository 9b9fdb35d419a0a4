//! Upload policy validation.
//!
//! Checks run before any byte is written: content type must be on an explicit
//! image or video allow-list, whole files are bounded per media type, and
//! individual chunks are bounded separately.

use crate::models::MediaType;

/// Validation failures, rejected pre-write with a 400/413.
#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    #[error("File too large: {size} bytes (max: {max} bytes)")]
    FileTooLarge { size: usize, max: usize },

    #[error("Chunk too large: {size} bytes (max: {max} bytes)")]
    ChunkTooLarge { size: usize, max: usize },

    #[error("Invalid content type: {content_type} (allowed: {allowed:?})")]
    InvalidContentType {
        content_type: String,
        allowed: Vec<String>,
    },

    #[error("Empty file")]
    EmptyFile,
}

/// Size ceilings and content-type allow-lists for uploads.
#[derive(Debug, Clone)]
pub struct UploadPolicy {
    pub image_max_file_size: usize,
    pub video_max_file_size: usize,
    pub chunk_max_size: usize,
    pub image_allowed_content_types: Vec<String>,
    pub video_allowed_content_types: Vec<String>,
}

impl Default for UploadPolicy {
    fn default() -> Self {
        Self {
            image_max_file_size: 10 * 1024 * 1024,
            video_max_file_size: 1024 * 1024 * 1024,
            chunk_max_size: 5 * 1024 * 1024,
            image_allowed_content_types: vec![
                "image/jpeg".to_string(),
                "image/png".to_string(),
                "image/webp".to_string(),
                "image/gif".to_string(),
            ],
            video_allowed_content_types: vec![
                "video/mp4".to_string(),
                "video/webm".to_string(),
                "video/quicktime".to_string(),
            ],
        }
    }
}

/// Media upload validator
///
/// Classifies a declared content type into a media type and enforces the
/// size policy for that type, without coupling to storage details.
#[derive(Debug, Clone)]
pub struct MediaValidator {
    policy: UploadPolicy,
}

impl MediaValidator {
    pub fn new(policy: UploadPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &UploadPolicy {
        &self.policy
    }

    /// Map a content type to its media type, or fail if it is on neither
    /// allow-list.
    pub fn classify(&self, content_type: &str) -> Result<MediaType, ValidationError> {
        let ct = content_type.to_lowercase();
        if self.policy.image_allowed_content_types.contains(&ct) {
            return Ok(MediaType::Image);
        }
        if self.policy.video_allowed_content_types.contains(&ct) {
            return Ok(MediaType::Video);
        }
        let mut allowed = self.policy.image_allowed_content_types.clone();
        allowed.extend(self.policy.video_allowed_content_types.clone());
        Err(ValidationError::InvalidContentType {
            content_type: content_type.to_string(),
            allowed,
        })
    }

    pub fn max_file_size(&self, media_type: MediaType) -> usize {
        match media_type {
            MediaType::Image => self.policy.image_max_file_size,
            MediaType::Video => self.policy.video_max_file_size,
        }
    }

    /// Validate a whole-file upload's declared size against its type ceiling.
    pub fn validate_file_size(
        &self,
        media_type: MediaType,
        size: usize,
    ) -> Result<(), ValidationError> {
        if size == 0 {
            return Err(ValidationError::EmptyFile);
        }
        let max = self.max_file_size(media_type);
        if size > max {
            return Err(ValidationError::FileTooLarge { size, max });
        }
        Ok(())
    }

    /// Validate one chunk payload against the per-chunk ceiling.
    pub fn validate_chunk_size(&self, size: usize) -> Result<(), ValidationError> {
        if size == 0 {
            return Err(ValidationError::EmptyFile);
        }
        if size > self.policy.chunk_max_size {
            return Err(ValidationError::ChunkTooLarge {
                size,
                max: self.policy.chunk_max_size,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn validator() -> MediaValidator {
        MediaValidator::new(UploadPolicy::default())
    }

    #[test]
    fn classifies_by_allow_list() {
        assert_eq!(
            validator().classify("image/png").unwrap(),
            MediaType::Image
        );
        assert_eq!(
            validator().classify("video/mp4").unwrap(),
            MediaType::Video
        );
        assert_eq!(
            validator().classify("VIDEO/MP4").unwrap(),
            MediaType::Video
        );
    }

    #[test]
    fn rejects_unlisted_content_types() {
        let err = validator().classify("application/pdf").unwrap_err();
        assert!(matches!(err, ValidationError::InvalidContentType { .. }));
    }

    #[test]
    fn image_ceiling_is_smaller_than_video_ceiling() {
        let v = validator();
        let twenty_mb = 20 * 1024 * 1024;
        assert!(v.validate_file_size(MediaType::Image, twenty_mb).is_err());
        assert!(v.validate_file_size(MediaType::Video, twenty_mb).is_ok());
    }

    #[test]
    fn video_ceiling_enforced() {
        let v = validator();
        let over = 1024 * 1024 * 1024 + 1;
        let err = v.validate_file_size(MediaType::Video, over).unwrap_err();
        assert!(matches!(err, ValidationError::FileTooLarge { .. }));
    }

    #[test]
    fn chunk_ceiling_enforced() {
        let v = validator();
        assert!(v.validate_chunk_size(5 * 1024 * 1024).is_ok());
        let err = v.validate_chunk_size(5 * 1024 * 1024 + 1).unwrap_err();
        assert!(matches!(err, ValidationError::ChunkTooLarge { .. }));
    }

    #[test]
    fn empty_payloads_rejected() {
        let v = validator();
        assert!(matches!(
            v.validate_file_size(MediaType::Image, 0),
            Err(ValidationError::EmptyFile)
        ));
        assert!(matches!(
            v.validate_chunk_size(0),
            Err(ValidationError::EmptyFile)
        ));
    }
}
