//! Storage key and public URL derivation for media files.

use newsreel_core::models::MediaType;
use uuid::Uuid;

/// File extension for a validated content type. Callers validate the content
/// type first; "bin" only appears if the allowlist and this table disagree.
pub fn extension_for(content_type: &str) -> &'static str {
    match content_type {
        "image/jpeg" => "jpg",
        "image/png" => "png",
        "image/webp" => "webp",
        "image/gif" => "gif",
        "video/mp4" => "mp4",
        "video/webm" => "webm",
        "video/quicktime" => "mov",
        _ => "bin",
    }
}

/// Storage key for a media file: `images/<id>.<ext>` or `videos/<id>.<ext>`.
pub fn media_key(id: Uuid, media_type: MediaType, content_type: &str) -> String {
    let prefix = match media_type {
        MediaType::Image => "images",
        MediaType::Video => "videos",
    };
    format!("{}/{}.{}", prefix, id, extension_for(content_type))
}

/// Public URL for a storage key.
pub fn public_url(base_url: &str, key: &str) -> String {
    format!("{}/{}", base_url.trim_end_matches('/'), key)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_uses_media_type_prefix_and_content_type_extension() {
        let id = Uuid::nil();
        assert_eq!(
            media_key(id, MediaType::Video, "video/mp4"),
            "videos/00000000-0000-0000-0000-000000000000.mp4"
        );
        assert_eq!(
            media_key(id, MediaType::Image, "image/jpeg"),
            "images/00000000-0000-0000-0000-000000000000.jpg"
        );
    }

    #[test]
    fn url_joins_without_double_slash() {
        assert_eq!(
            public_url("http://localhost:4000/files/", "images/a.jpg"),
            "http://localhost:4000/files/images/a.jpg"
        );
        assert_eq!(
            public_url("http://localhost:4000/files", "images/a.jpg"),
            "http://localhost:4000/files/images/a.jpg"
        );
    }
}
