//! JSON decoder for the NEO feed.

use crate::model::FeedPayload;

/// Decodes a feed response body into a [`FeedPayload`].
///
/// # Errors
///
/// Returns an error for malformed JSON, missing or mistyped fields (including
/// any missing diameter unit), and numeric-string fields that do not hold a
/// finite decimal. A payload that fails anywhere fails as a whole.
pub fn parse_feed(bytes: &[u8]) -> Result<FeedPayload, serde_json::Error> {
    serde_json::from_slice(bytes)
}
