use std::fmt;

use crate::data_uri::{self, DATA_URI_PREFIX, SVG_MIME};

/// Syntactic form of an incoming SVG string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContentForm {
    RawMarkup,
    Base64DataUri,
    PercentEncodedDataUri,
    Unrecognized,
}

impl ContentForm {
    pub fn as_str(self) -> &'static str {
        match self {
            ContentForm::RawMarkup => "raw-markup",
            ContentForm::Base64DataUri => "base64-data-uri",
            ContentForm::PercentEncodedDataUri => "percent-encoded-data-uri",
            ContentForm::Unrecognized => "unrecognized",
        }
    }
}

impl fmt::Display for ContentForm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identifies the form of `input`. Total: every string maps to exactly one form.
pub fn classify(input: &str) -> ContentForm {
    if input.is_empty() {
        return ContentForm::Unrecognized;
    }

    if let Some(form) = classify_svg_data_uri(input) {
        return form;
    }

    if starts_with_svg_root(input) {
        return ContentForm::RawMarkup;
    }

    // Some collectors emit non-standard prefixes ("data:image/svg;base64,",
    // "image/svg+xml;base64,"...). Accept them when the tail is valid base64.
    if let Some((_, tail)) = input.rsplit_once(',') {
        let tail = tail.trim();
        if !tail.is_empty() && data_uri::decode_base64(tail).is_ok() {
            return ContentForm::Base64DataUri;
        }
    }

    ContentForm::Unrecognized
}

fn classify_svg_data_uri(input: &str) -> Option<ContentForm> {
    let rest = data_uri::strip_prefix_ignore_case(input, DATA_URI_PREFIX)?;
    let rest = data_uri::strip_prefix_ignore_case(rest, SVG_MIME)?;
    let (params, _) = rest.split_once(',')?;

    if !params.is_empty() && !params.starts_with(';') {
        // e.g. "image/svg+xmlfoo,"
        return None;
    }

    let is_base64 = params
        .split(';')
        .any(|param| param.trim().eq_ignore_ascii_case("base64"));

    Some(if is_base64 {
        ContentForm::Base64DataUri
    } else {
        ContentForm::PercentEncodedDataUri
    })
}

/// True when the text, after leading whitespace and a BOM, opens an `<svg` tag.
pub fn starts_with_svg_root(input: &str) -> bool {
    let trimmed = input.trim_start_matches(|c: char| c.is_whitespace() || c == '\u{feff}');
    let Some(rest) = trimmed.strip_prefix("<svg") else {
        return false;
    };
    match rest.chars().next() {
        None => true,
        Some(c) => c.is_whitespace() || c == '>' || c == '/',
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn empty_is_unrecognized() {
        assert_eq!(classify(""), ContentForm::Unrecognized);
        assert_eq!(classify("   "), ContentForm::Unrecognized);
    }

    #[test]
    fn standard_prefixes() {
        assert_eq!(
            classify("data:image/svg+xml;base64,PHN2Zz48L3N2Zz4="),
            ContentForm::Base64DataUri
        );
        assert_eq!(
            classify("data:image/svg+xml,%3Csvg%3E%3C/svg%3E"),
            ContentForm::PercentEncodedDataUri
        );
        assert_eq!(
            classify("data:image/svg+xml;charset=utf-8,%3Csvg%3E"),
            ContentForm::PercentEncodedDataUri
        );
        assert_eq!(
            classify("DATA:image/SVG+xml;charset=utf-8;base64,PHN2Zz4="),
            ContentForm::Base64DataUri
        );
    }

    #[test]
    fn raw_markup_after_whitespace() {
        assert_eq!(classify("  \n<svg></svg>"), ContentForm::RawMarkup);
        assert_eq!(classify("\u{feff}<svg/>"), ContentForm::RawMarkup);
        assert_eq!(classify("<svg\nwidth='1'/>"), ContentForm::RawMarkup);
    }

    #[test]
    fn lookalike_tags_are_not_svg() {
        assert_eq!(classify("<svgfoo/>"), ContentForm::Unrecognized);
        assert_eq!(classify("<div><svg/></div>"), ContentForm::Unrecognized);
    }

    #[test]
    fn permissive_base64_fallback() {
        assert_eq!(
            classify("data:image/svg;base64,PHN2Zz48L3N2Zz4="),
            ContentForm::Base64DataUri
        );
        assert_eq!(classify("trailing comma,"), ContentForm::Unrecognized);
        assert_eq!(classify("Hello, world"), ContentForm::Unrecognized);
    }

    #[test]
    fn plain_urls_are_unrecognized() {
        assert_eq!(
            classify("https://example.com/logo.svg"),
            ContentForm::Unrecognized
        );
        assert_eq!(classify("data:image/png;base64,@@"), ContentForm::Unrecognized);
    }

    proptest! {
        #[test]
        fn classify_never_panics(input in any::<String>()) {
            let _ = classify(&input);
        }

        #[test]
        fn svg_prefixed_text_is_raw_markup(ws in "[ \t\r\n]{0,4}", body in "[a-z =\"0-9]{0,20}") {
            let input = format!("{ws}<svg {body}></svg>");
            prop_assert_eq!(classify(&input), ContentForm::RawMarkup);
        }
    }
}
