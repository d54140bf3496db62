use base64::Engine;
use base64::engine::general_purpose::{GeneralPurpose, GeneralPurposeConfig};
use base64::engine::{DecodePaddingMode, general_purpose};

use crate::error::DecodeError;

pub const DATA_URI_PREFIX: &str = "data:";
pub const SVG_MIME: &str = "image/svg+xml";
pub const SVG_BASE64_PREFIX: &str = "data:image/svg+xml;base64,";

/// Standard alphabet, but accepts payloads with or without trailing `=`.
const LENIENT_BASE64: GeneralPurpose = GeneralPurpose::new(
    &base64::alphabet::STANDARD,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Header of a `data:` URI, split at the first comma.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataUriHeader<'a> {
    pub mime: &'a str,
    pub is_base64: bool,
    pub payload: &'a str,
}

/// Splits a data URI into media type, encoding marker and payload (RFC 2397).
pub fn parse_header(uri: &str) -> Result<DataUriHeader<'_>, DecodeError> {
    let rest = strip_prefix_ignore_case(uri, DATA_URI_PREFIX).ok_or(DecodeError::NotDataUri)?;
    let (metadata, payload) = rest.split_once(',').ok_or(DecodeError::MissingComma)?;

    let mut parts = metadata.split(';');
    let mime = parts.next().unwrap_or("").trim();
    let is_base64 = parts.any(|param| param.trim().eq_ignore_ascii_case("base64"));

    Ok(DataUriHeader {
        mime,
        is_base64,
        payload,
    })
}

/// Decodes any `data:` URI into markup text, honouring its base64 marker.
pub fn decode(uri: &str) -> Result<String, DecodeError> {
    let header = parse_header(uri)?;
    let bytes = if header.is_base64 {
        decode_base64(header.payload)?
    } else {
        percent_decode(header.payload)?
    };
    String::from_utf8(bytes).map_err(|_| DecodeError::InvalidUtf8)
}

/// Decodes a base64 payload, tolerating ASCII whitespace and missing padding.
pub fn decode_base64(data: &str) -> Result<Vec<u8>, DecodeError> {
    let cleaned: Vec<u8> = data
        .bytes()
        .filter(|byte| !byte.is_ascii_whitespace())
        .collect();

    LENIENT_BASE64
        .decode(&cleaned)
        .map_err(|e| DecodeError::InvalidBase64 {
            reason: e.to_string(),
        })
}

pub fn encode_base64(bytes: &[u8]) -> String {
    general_purpose::STANDARD.encode(bytes)
}

/// Percent-decodes a payload without treating `+` as a space.
pub fn percent_decode(input: &str) -> Result<Vec<u8>, DecodeError> {
    let bytes = input.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i] != b'%' {
            out.push(bytes[i]);
            i += 1;
            continue;
        }
        if i + 2 >= bytes.len() {
            return Err(DecodeError::IncompletePercentEscape { offset: i });
        }
        let hi = (bytes[i + 1] as char).to_digit(16);
        let lo = (bytes[i + 2] as char).to_digit(16);
        match (hi, lo) {
            (Some(hi), Some(lo)) => {
                out.push(((hi << 4) | lo) as u8);
                i += 3;
            }
            _ => return Err(DecodeError::InvalidPercentEscape { offset: i }),
        }
    }

    Ok(out)
}

pub(crate) fn strip_prefix_ignore_case<'a>(input: &'a str, prefix: &str) -> Option<&'a str> {
    let head = input.get(..prefix.len())?;
    head.eq_ignore_ascii_case(prefix)
        .then(|| &input[prefix.len()..])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_detects_base64_marker_among_params() {
        let header = parse_header("data:image/svg+xml;charset=utf-8;BASE64,PHN2Zz4=").unwrap();
        assert_eq!(header.mime, "image/svg+xml");
        assert!(header.is_base64);
        assert_eq!(header.payload, "PHN2Zz4=");
    }

    #[test]
    fn payload_keeps_later_commas() {
        let header = parse_header("data:image/svg+xml,<svg a='1,2'/>").unwrap();
        assert!(!header.is_base64);
        assert_eq!(header.payload, "<svg a='1,2'/>");
    }

    #[test]
    fn base64_tolerates_whitespace_and_missing_padding() {
        assert_eq!(decode_base64("PHN2\nZz4").unwrap(), b"<svg>");
        assert_eq!(decode_base64("PHN2Zz4=").unwrap(), b"<svg>");
    }

    #[test]
    fn base64_rejects_garbage() {
        assert!(matches!(
            decode_base64("not*base64"),
            Err(DecodeError::InvalidBase64 { .. })
        ));
    }

    #[test]
    fn percent_decode_handles_utf8_sequences() {
        let decoded = percent_decode("%3Csvg%3E%E2%9C%93+").unwrap();
        assert_eq!(String::from_utf8(decoded).unwrap(), "<svg>✓+");
    }

    #[test]
    fn percent_decode_reports_truncated_escape() {
        assert_eq!(
            percent_decode("abc%4"),
            Err(DecodeError::IncompletePercentEscape { offset: 3 })
        );
        assert_eq!(
            percent_decode("%"),
            Err(DecodeError::IncompletePercentEscape { offset: 0 })
        );
        assert_eq!(
            percent_decode("%zz"),
            Err(DecodeError::InvalidPercentEscape { offset: 0 })
        );
    }

    #[test]
    fn percent_escape_at_end_is_complete() {
        assert_eq!(percent_decode("a%3E").unwrap(), b"a>");
    }

    #[test]
    fn decode_rejects_invalid_utf8() {
        assert_eq!(decode("data:image/svg+xml,%FF"), Err(DecodeError::InvalidUtf8));
    }
}
