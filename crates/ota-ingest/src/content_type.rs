// SPDX-License-Identifier: MIT OR Apache-2.0
//! Fixed extension-to-content-type table (§4.5 step 7).

/// Map a publisher-declared file extension (without the leading dot, e.g.
/// `"png"`, case-insensitively) to the MIME content type the manifest
/// advertises. Unknown extensions fall back to `application/octet-stream`.
pub fn content_type_for_extension(ext: &str) -> &'static str {
    match ext.to_ascii_lowercase().as_str() {
        "js" => "application/javascript",
        "json" => "application/json",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "svg" => "image/svg+xml",
        "ttf" => "font/ttf",
        "otf" => "font/otf",
        "woff" => "font/woff",
        "woff2" => "font/woff2",
        "mp3" => "audio/mpeg",
        "mp4" => "video/mp4",
        "webm" => "video/webm",
        _ => "application/octet-stream",
    }
}
