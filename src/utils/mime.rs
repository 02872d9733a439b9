//! MIME type resolution helpers

/// Generic binary MIME type used when nothing better is known
pub const OCTET_STREAM: &str = "application/octet-stream";

/// Look up a MIME type from a file extension (without the dot).
pub fn mime_from_extension(ext: &str) -> Option<&'static str> {
    let mime = match ext.to_ascii_lowercase().as_str() {
        "mp4" | "m4v" => "video/mp4",
        "webm" => "video/webm",
        "mkv" => "video/x-matroska",
        "mov" => "video/quicktime",
        "avi" => "video/x-msvideo",
        "mp3" => "audio/mpeg",
        "m4a" => "audio/mp4",
        "flac" => "audio/flac",
        "wav" => "audio/wav",
        "ogg" => "audio/ogg",
        "opus" => "audio/opus",
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "pdf" => "application/pdf",
        "zip" => "application/zip",
        _ => return None,
    };
    Some(mime)
}

/// Reverse lookup: a canonical extension for a known MIME type.
pub fn extension_for_mime(mime: &str) -> Option<&'static str> {
    let ext = match mime.to_ascii_lowercase().as_str() {
        "video/mp4" => "mp4",
        "video/webm" => "webm",
        "video/x-matroska" => "mkv",
        "video/quicktime" => "mov",
        "video/x-msvideo" => "avi",
        "audio/mpeg" => "mp3",
        "audio/mp4" => "m4a",
        "audio/flac" => "flac",
        "audio/wav" => "wav",
        "audio/ogg" => "ogg",
        "audio/opus" => "opus",
        "image/jpeg" => "jpg",
        "image/png" => "png",
        "image/gif" => "gif",
        "image/webp" => "webp",
        "application/pdf" => "pdf",
        "application/zip" => "zip",
        _ => return None,
    };
    Some(ext)
}

/// Strip parameters from a Content-Type header value, e.g.
/// `text/html; charset=utf-8` -> `text/html`.
pub fn strip_mime_params(content_type: &str) -> String {
    content_type
        .split(';')
        .next()
        .unwrap_or(content_type)
        .trim()
        .to_ascii_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_extensions() {
        assert_eq!(mime_from_extension("mp4"), Some("video/mp4"));
        assert_eq!(mime_from_extension("MP3"), Some("audio/mpeg"));
        assert_eq!(mime_from_extension("jpeg"), Some("image/jpeg"));
        assert_eq!(mime_from_extension("xyz"), None);
    }

    #[test]
    fn test_reverse_lookup_round_trips_for_canonical_types() {
        for ext in ["mp4", "webm", "mp3", "jpg", "png", "pdf"] {
            let mime = mime_from_extension(ext).unwrap();
            assert!(extension_for_mime(mime).is_some(), "no extension for {mime}");
        }
    }

    #[test]
    fn test_strip_mime_params() {
        assert_eq!(strip_mime_params("text/html; charset=utf-8"), "text/html");
        assert_eq!(strip_mime_params("Video/MP4"), "video/mp4");
        assert_eq!(strip_mime_params("application/json"), "application/json");
    }
}
