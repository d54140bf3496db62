use std::borrow::Cow;
use std::fmt;

use crate::classify::{ContentForm, classify};
use crate::config::EngineConfig;
use crate::data_uri;
use crate::error::DecodeError;
use crate::markup;

const PLACEHOLDER_SVG: &str = concat!(
    r#"<svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 24 24" width="24" height="24">"#,
    r##"<rect width="24" height="24" fill="#f0f0f0"/>"##,
    r##"<text x="12" y="12" font-family="sans-serif" font-size="14" text-anchor="middle" dominant-baseline="central" fill="#666">?</text>"##,
    "</svg>",
);

/// Decoded SVG markup with a namespace, a viewBox and painted shapes.
///
/// Only produced by [`normalize`]; never edited after construction.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CanonicalMarkup(String);

impl CanonicalMarkup {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

#[cfg(test)]
impl CanonicalMarkup {
    /// Wraps text without repairing it.
    pub(crate) fn from_raw(markup: impl Into<String>) -> Self {
        Self(markup.into())
    }
}

impl AsRef<str> for CanonicalMarkup {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CanonicalMarkup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Neutral 24x24 square with a question mark, shown for anything unusable.
pub fn placeholder(config: &EngineConfig) -> CanonicalMarkup {
    let markup = markup::repair(PLACEHOLDER_SVG, config).unwrap_or_else(|err| {
        tracing::error!(%err, "placeholder markup failed to repair");
        PLACEHOLDER_SVG.to_string()
    });
    CanonicalMarkup(markup)
}

/// Decodes `input` according to `form` and repairs it for display.
///
/// Never fails: undecodable or unrecognized input yields [`placeholder`].
pub fn normalize(input: &str, form: ContentForm, config: &EngineConfig) -> CanonicalMarkup {
    let decoded = match decode_payload(input, form) {
        Ok(Some(text)) => text,
        Ok(None) => {
            tracing::debug!(len = input.len(), "unrecognized SVG content, using placeholder");
            return placeholder(config);
        }
        Err(err) => {
            tracing::warn!(%err, %form, "failed to decode SVG data URI");
            return placeholder(config);
        }
    };

    match markup::repair(&decoded, config) {
        Ok(markup) => CanonicalMarkup(markup),
        Err(err) => {
            tracing::warn!(%err, %form, "unusable SVG markup, using placeholder");
            placeholder(config)
        }
    }
}

/// [`classify`] followed by [`normalize`].
pub fn normalize_content(input: &str, config: &EngineConfig) -> CanonicalMarkup {
    normalize(input, classify(input), config)
}

fn decode_payload(input: &str, form: ContentForm) -> Result<Option<Cow<'_, str>>, DecodeError> {
    match form {
        ContentForm::RawMarkup => Ok(Some(Cow::Borrowed(input))),
        ContentForm::Base64DataUri => {
            // Base64 never contains a comma, so the last one ends the header.
            let (_, payload) = input.rsplit_once(',').ok_or(DecodeError::MissingComma)?;
            let bytes = data_uri::decode_base64(payload)?;
            let text = String::from_utf8(bytes).map_err(|_| DecodeError::InvalidUtf8)?;
            Ok(Some(Cow::Owned(text)))
        }
        ContentForm::PercentEncodedDataUri => {
            let header = data_uri::parse_header(input)?;
            let bytes = data_uri::percent_decode(header.payload)?;
            let text = String::from_utf8(bytes).map_err(|_| DecodeError::InvalidUtf8)?;
            Ok(Some(Cow::Owned(text)))
        }
        ContentForm::Unrecognized => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_uri::encode_base64;
    use proptest::prelude::*;
    use resvg::usvg;

    fn norm(input: &str) -> String {
        normalize_content(input, &EngineConfig::default()).into_string()
    }

    fn parsed_size(markup: &str) -> (f32, f32) {
        let tree = usvg::Tree::from_str(markup, &usvg::Options::default())
            .expect("canonical markup parses");
        (tree.size().width(), tree.size().height())
    }

    #[test]
    fn rect_scenario() {
        let out = norm("<svg><rect width='10' height='10'/></svg>");
        assert!(out.contains("viewBox=\"0 0 10 10\""));
        assert!(out.contains("<rect width=\"10\" height=\"10\" fill=\"currentColor\"/>"));
        assert!(out.contains("xmlns=\"http://www.w3.org/2000/svg\""));
    }

    #[test]
    fn root_size_drives_viewbox() {
        let out = norm("<svg width='10' height='10'><rect width='10' height='10'/></svg>");
        assert!(out.contains("viewBox=\"0 0 10 10\""));
        assert!(out.contains("fill=\"currentColor\""));
    }

    #[test]
    fn base64_scenario() {
        let uri = format!(
            "data:image/svg+xml;base64,{}",
            encode_base64(b"<svg><path d='M0 0'/></svg>")
        );
        assert_eq!(classify(&uri), ContentForm::Base64DataUri);
        let out = norm(&uri);
        assert!(out.contains("<path d=\"M0 0\" fill=\"currentColor\"/>"));
        assert!(out.contains("viewBox="));
    }

    #[test]
    fn percent_encoded_input_is_decoded() {
        let out = norm("data:image/svg+xml,%3Csvg%20width%3D'8'%20height%3D'4'%3E%3C%2Fsvg%3E");
        assert!(out.starts_with("<svg width=\"8\" height=\"4\""));
        assert!(out.contains("viewBox=\"0 0 8 4\""));
    }

    #[test]
    fn non_ascii_glyphs_survive_decoding() {
        let uri = format!(
            "data:image/svg+xml;base64,{}",
            encode_base64("<svg><text>日本語 ✓</text></svg>".as_bytes())
        );
        assert!(norm(&uri).contains("<text>日本語 ✓</text>"));
    }

    #[test]
    fn garbage_becomes_placeholder() {
        let config = EngineConfig::default();
        let expected = placeholder(&config).into_string();
        for input in [
            "",
            "hello",
            "https://example.com/a.svg",
            "data:image/svg+xml;base64,!!!",
            "data:image/svg+xml,%ZZ",
            "<svg><g></svg>",
        ] {
            assert_eq!(norm(input), expected, "input: {input:?}");
        }
    }

    #[test]
    fn placeholder_is_canonical_and_visible() {
        let config = EngineConfig::default();
        let markup = placeholder(&config).into_string();
        assert!(markup.contains(">?</text>"));
        assert_eq!(norm(&markup), markup);
        assert_eq!(parsed_size(&markup), (24.0, 24.0));
    }

    #[test]
    fn output_parses_with_explicit_size() {
        for input in [
            "<svg><circle r='3'/></svg>",
            "<svg width='40' height='30'/>",
            "<svg><text>a&nbsp;b&unknown;</text></svg>",
            "data:image/svg+xml,%3C%3Fxml%20version='1.0'%3F%3E%3Csvg%20viewBox='0%200%205%205'%3E%3Cpath%20d='M0%200L5%205'/%3E%3C/svg%3E",
        ] {
            let (w, h) = parsed_size(&norm(input));
            assert!(w > 0.0 && h > 0.0, "input: {input:?}");
        }
    }

    #[test]
    fn style_attribute_is_never_duplicated() {
        let once = norm("<svg><path d='M0 0'/></svg>");
        let twice = norm(&once);
        let thrice = norm(&twice);
        assert_eq!(once.matches("style=").count(), 1);
        assert_eq!(thrice, once);
    }

    fn svg_strategy() -> impl Strategy<Value = String> {
        let root_attr = prop_oneof![
            Just(String::new()),
            Just(" width='16' height='8'".to_string()),
            Just(" viewBox='0 0 3 3'".to_string()),
            Just(" style='color:red'".to_string()),
            Just(" xmlns='http://www.w3.org/2000/svg'".to_string()),
        ];
        let child = prop_oneof![
            Just("<path d='M0 0'/>".to_string()),
            Just("<rect width='1' height='1' fill='red'/>".to_string()),
            Just("<polygon points='0,0 1,1' stroke='blue'/>".to_string()),
            Just("<circle r='1'></circle>".to_string()),
            Just("<g><ellipse rx='1' ry='1'/></g>".to_string()),
            "[a-zA-Z0-9 ✓é]{0,8}".prop_map(|t| format!("<text>{t}</text>")),
        ];
        (
            proptest::collection::vec(root_attr, 0..3),
            proptest::collection::vec(child, 0..5),
        )
            .prop_map(|(attrs, children)| {
                let mut seen = Vec::new();
                let attrs: String = attrs
                    .into_iter()
                    .filter(|a| {
                        let fresh = !seen.contains(a);
                        seen.push(a.clone());
                        fresh
                    })
                    .collect();
                format!("<svg{attrs}>{}</svg>", children.concat())
            })
    }

    proptest! {
        #[test]
        fn raw_markup_gains_viewbox_and_namespace(svg in svg_strategy()) {
            prop_assert_eq!(classify(&svg), ContentForm::RawMarkup);
            let out = normalize(&svg, ContentForm::RawMarkup, &EngineConfig::default());
            prop_assert!(out.as_str().contains("viewBox="));
            prop_assert!(out.as_str().contains("xmlns="));
        }

        #[test]
        fn normalize_is_idempotent(svg in svg_strategy()) {
            let once = norm(&svg);
            prop_assert_eq!(norm(&once), once);
        }

        #[test]
        fn normalize_is_idempotent_for_data_uris(svg in svg_strategy()) {
            let uri = format!("data:image/svg+xml;base64,{}", encode_base64(svg.as_bytes()));
            let once = norm(&uri);
            prop_assert_eq!(norm(&once), once);
        }

        #[test]
        fn arbitrary_input_never_panics(input in any::<String>()) {
            let out = norm(&input);
            prop_assert!(!out.is_empty());
        }
    }
}
