//! Content-Type detection for uploaded assets.
//!
//! Types are stored without parameters; text types get the configured
//! charset appended by [`content_type`].

use std::path::Path;

pub mod types {
    pub const HTML: &str = "text/html";
    pub const CSS: &str = "text/css";
    pub const JAVASCRIPT: &str = "text/javascript";
    pub const JSON: &str = "application/json";
    pub const MANIFEST: &str = "application/manifest+json";
    pub const XML: &str = "application/xml";
    pub const RSS: &str = "application/rss+xml";
    pub const ATOM: &str = "application/atom+xml";
    pub const MAP: &str = "application/json";
    pub const TXT: &str = "text/plain";
    pub const CSV: &str = "text/csv";
    pub const MARKDOWN: &str = "text/markdown";

    pub const PDF: &str = "application/pdf";
    pub const WASM: &str = "application/wasm";
    pub const OCTET_STREAM: &str = "application/octet-stream";

    pub const PNG: &str = "image/png";
    pub const JPEG: &str = "image/jpeg";
    pub const GIF: &str = "image/gif";
    pub const WEBP: &str = "image/webp";
    pub const AVIF: &str = "image/avif";
    pub const SVG: &str = "image/svg+xml";
    pub const ICO: &str = "image/x-icon";

    pub const MP3: &str = "audio/mpeg";
    pub const MP4: &str = "video/mp4";
    pub const WEBM: &str = "video/webm";

    pub const WOFF: &str = "font/woff";
    pub const WOFF2: &str = "font/woff2";
    pub const TTF: &str = "font/ttf";
    pub const OTF: &str = "font/otf";
}

/// Guess the bare MIME type from a file extension.
pub fn from_path(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);

    match ext.as_deref() {
        Some("html" | "htm") => types::HTML,
        Some("css") => types::CSS,
        Some("js" | "mjs" | "cjs") => types::JAVASCRIPT,
        Some("json") => types::JSON,
        Some("webmanifest") => types::MANIFEST,
        Some("map") => types::MAP,
        Some("xml") => types::XML,
        Some("rss") => types::RSS,
        Some("atom") => types::ATOM,
        Some("txt") => types::TXT,
        Some("csv") => types::CSV,
        Some("md") => types::MARKDOWN,

        Some("pdf") => types::PDF,
        Some("wasm") => types::WASM,

        Some("png") => types::PNG,
        Some("jpg" | "jpeg") => types::JPEG,
        Some("gif") => types::GIF,
        Some("webp") => types::WEBP,
        Some("avif") => types::AVIF,
        Some("svg") => types::SVG,
        Some("ico") => types::ICO,

        Some("mp3") => types::MP3,
        Some("mp4") => types::MP4,
        Some("webm") => types::WEBM,

        Some("woff") => types::WOFF,
        Some("woff2") => types::WOFF2,
        Some("ttf") => types::TTF,
        Some("otf") => types::OTF,

        _ => types::OCTET_STREAM,
    }
}

/// Whether the MIME type carries text that needs a charset.
pub fn is_text(mime: &str) -> bool {
    mime.starts_with("text/")
        || mime == types::JSON
        || mime == types::MANIFEST
        || mime == types::XML
        || mime == types::RSS
        || mime == types::ATOM
        || mime == types::SVG
}

/// Full `Content-Type` header value for a file.
///
/// `charset` is appended to text types (`text/css; charset=utf-8`).
/// `None` leaves every type bare.
pub fn content_type(path: &Path, charset: Option<&str>) -> String {
    let mime = from_path(path);
    match charset {
        Some(charset) if is_text(mime) => format!("{mime}; charset={charset}"),
        _ => mime.to_string(),
    }
}
