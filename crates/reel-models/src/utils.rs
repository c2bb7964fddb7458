//! Utility functions for source URL handling.

use std::sync::LazyLock;

use regex::Regex;
use url::Url;

/// Maximum accepted source URL length.
pub const MAX_URL_LENGTH: usize = 2048;

/// Hosts whose URLs carry an 11-character video id.
const VIDEO_ID_HOSTS: &[&str] = &[
    "youtube.com",
    "www.youtube.com",
    "m.youtube.com",
    "music.youtube.com",
    "youtu.be",
];

static SOURCE_ID_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(?:/watch/?\?(?:.*&)?v=|/(?:embed|shorts|live|v)/|/)([a-zA-Z0-9_-]{11})(?:[?&#/]|$)",
    )
    .expect("valid source id regex")
});

/// Extract the 11-character video id from a source URL.
///
/// Only YouTube hosts are considered. Works for `watch?v=`, `youtu.be/`,
/// `/embed/` and `/shorts/` forms; any other URL yields `None`.
pub fn extract_source_id(url: &str) -> Option<String> {
    let parsed = Url::parse(url.trim()).ok()?;
    let host = parsed.host_str()?.to_ascii_lowercase();
    if !VIDEO_ID_HOSTS.contains(&host.as_str()) {
        return None;
    }

    let target = match parsed.query() {
        Some(query) => format!("{}?{}", parsed.path(), query),
        None => parsed.path().to_string(),
    };
    SOURCE_ID_RE
        .captures(&target)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
}

/// Validate a source URL, returning the trimmed URL.
pub fn validate_source_url(url: &str) -> Result<String, String> {
    let url = url.trim();
    if url.is_empty() {
        return Err("Source URL is required".to_string());
    }
    if url.len() > MAX_URL_LENGTH {
        return Err(format!(
            "URL exceeds maximum length of {} characters",
            MAX_URL_LENGTH
        ));
    }

    let parsed = Url::parse(url).map_err(|e| format!("Invalid URL format: {}", e))?;
    match parsed.scheme() {
        "http" | "https" => {}
        scheme => {
            return Err(format!(
                "Invalid protocol '{}'. Only HTTP and HTTPS are allowed.",
                scheme
            ))
        }
    }
    if parsed.host_str().is_none() {
        return Err("URL must have a valid domain".to_string());
    }

    Ok(url.to_string())
}
