//! Content-type inference from file extensions.
//!
//! Pure lookup, no state. The table mirrors the content-delivery service
//! conventions: the MIME subtype is the extension itself except for `jpg`,
//! which normalizes to `image/jpeg`. The audio arms are matched before the
//! video arms, so `.ogg` resolves to `audio/ogg`.

/// Map a file path's extension to a MIME type.
///
/// Matching is case-insensitive and uses the text after the final `.` of the
/// whole path string. Unknown or missing extensions resolve to
/// `application/octet-stream`.
pub fn detect_content_type(path: &str) -> &'static str {
    let lowered = path.to_lowercase();
    let extension = lowered.rsplit('.').next().unwrap_or("");

    match extension {
        // Image types
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "svg" => "image/svg",
        "bmp" => "image/bmp",
        "ico" => "image/ico",

        // Audio types (checked before video, so .ogg is audio)
        "mp3" => "audio/mp3",
        "wav" => "audio/wav",
        "ogg" => "audio/ogg",
        "aac" => "audio/aac",
        "flac" => "audio/flac",
        "m4a" => "audio/m4a",

        // Video types
        "mp4" => "video/mp4",
        "webm" => "video/webm",
        "avi" => "video/avi",
        "mov" => "video/mov",
        "wmv" => "video/wmv",
        "flv" => "video/flv",

        // Animation types (apng; GIFs are handled above as images)
        "apng" => "image/apng",

        // Default to binary
        _ => "application/octet-stream",
    }
}
