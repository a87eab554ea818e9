//! Utility functions for filedata

use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};

/// Percent-encoding set for document ids (includes /, %, and control chars)
const KEY_ENCODE_SET: &AsciiSet = &CONTROLS
    .add(b'/')
    .add(b'\\')
    .add(b'%')
    .add(b' ')
    .add(b'?')
    .add(b'#')
    .add(b'&')
    .add(b':');

/// File name used for an id with no bytes
pub const EMPTY_KEY_NAME: &str = "%empty";

/// Encode a key as a single file name.
///
/// A leading `.` is escaped so `.` and `..` never name a directory, and the
/// empty key maps to [`EMPTY_KEY_NAME`].
pub fn encode_key(key: &str) -> String {
    if key.is_empty() {
        return EMPTY_KEY_NAME.to_string();
    }
    match key.strip_prefix('.') {
        Some(rest) => format!("%2E{}", utf8_percent_encode(rest, KEY_ENCODE_SET)),
        None => utf8_percent_encode(key, KEY_ENCODE_SET).to_string(),
    }
}

/// Printable form of a raw document id: the id itself when it is
/// printable UTF-8, otherwise `0x` followed by its hex encoding.
pub fn display_id(id: &[u8]) -> String {
    match std::str::from_utf8(id) {
        Ok(s) if !s.chars().any(|c| c.is_control()) => s.to_string(),
        _ => format!("0x{}", hex::encode(id)),
    }
}

/// Format bytes as human-readable string
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB", "PB"];
    let mut size = bytes as f64;
    let mut unit_idx = 0;

    while size >= 1024.0 && unit_idx < UNITS.len() - 1 {
        size /= 1024.0;
        unit_idx += 1;
    }

    format!("{:.2} {}", size, UNITS[unit_idx])
}
