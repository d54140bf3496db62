use crate::data_uri::{self, SVG_BASE64_PREFIX};
use crate::error::DecodeError;
use crate::normalize::CanonicalMarkup;

/// Encodes canonical markup as a `data:image/svg+xml;base64,` URI.
///
/// The UTF-8 bytes are encoded directly, so multi-byte glyphs survive.
/// Returns an empty string when there is nothing to encode; callers treat
/// that as a failed strategy.
pub fn to_data_uri(markup: &CanonicalMarkup) -> String {
    if markup.as_str().trim().is_empty() {
        return String::new();
    }
    let encoded = data_uri::encode_base64(markup.as_bytes());
    let mut uri = String::with_capacity(SVG_BASE64_PREFIX.len() + encoded.len());
    uri.push_str(SVG_BASE64_PREFIX);
    uri.push_str(&encoded);
    uri
}

/// Inverse of [`to_data_uri`]; also accepts percent-encoded URIs.
pub fn decode_data_uri(uri: &str) -> Result<String, DecodeError> {
    data_uri::decode(uri)
}
