//! Reason phrases for HTTP status codes.

use http::StatusCode;

/// Phrase used when a status code has no registered reason phrase.
pub const UNKNOWN_STATUS: &str = "unknown status";

/// Get the registered reason phrase for a status code.
///
/// Returns `None` for codes outside the IANA registry known to `http`.
#[inline]
pub fn status_text_for(code: u16) -> Option<&'static str> {
    StatusCode::from_u16(code)
        .ok()
        .and_then(|status| status.canonical_reason())
}

/// Get the reason phrase for a status code, or [`UNKNOWN_STATUS`].
#[inline]
pub fn message_for_code(code: u16) -> &'static str {
    status_text_for(code).unwrap_or(UNKNOWN_STATUS)
}
