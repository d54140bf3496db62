//! SVG strings grouped the way an upstream extraction result delivers them.

use serde::{Deserialize, Serialize};

use crate::classify::{ContentForm, classify};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SvgAssetKind {
    Icon,
    Graphic,
}

impl SvgAssetKind {
    fn stem(self) -> &'static str {
        match self {
            SvgAssetKind::Icon => "icon",
            SvgAssetKind::Graphic => "graphic",
        }
    }
}

/// The SVG-bearing lists of an extraction result's `assets` object.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AssetPayload {
    #[serde(default)]
    pub icons: Vec<String>,
    #[serde(default)]
    pub svgs: Vec<String>,
}

#[derive(Deserialize)]
struct ResultEnvelope {
    assets: AssetPayload,
}

impl AssetPayload {
    /// Parses either a bare `assets` object or a full result wrapping one.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        let value: serde_json::Value = serde_json::from_str(json)?;
        if value.get("assets").is_some() {
            let envelope: ResultEnvelope = serde_json::from_value(value)?;
            Ok(envelope.assets)
        } else {
            serde_json::from_value(value)
        }
    }

    pub fn len(&self) -> usize {
        self.icons.len() + self.svgs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// SVG entries in payload order, icons first. Strings that cannot be
    /// SVG at all (plain URLs, other image types) are skipped.
    pub fn entries(&self) -> impl Iterator<Item = (SvgAssetKind, usize, &str)> + '_ {
        let icons = self
            .icons
            .iter()
            .enumerate()
            .map(|(i, s)| (SvgAssetKind::Icon, i, s.as_str()));
        let graphics = self
            .svgs
            .iter()
            .enumerate()
            .map(|(i, s)| (SvgAssetKind::Graphic, i, s.as_str()));
        icons.chain(graphics).filter(|(_, _, s)| looks_like_svg(s))
    }
}

pub fn looks_like_svg(content: &str) -> bool {
    classify(content) != ContentForm::Unrecognized
}

/// `icon-001.svg`, `graphic-012.svg`, ... (1-based).
pub fn export_filename(kind: SvgAssetKind, index: usize) -> String {
    format!("{}-{:03}.svg", kind.stem(), index + 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_full_result_and_bare_assets() {
        let full = r#"{
            "url": "https://example.com",
            "colors": {"from_css": []},
            "assets": {"icons": ["<svg/>"], "images": ["a.png"]}
        }"#;
        let payload = AssetPayload::from_json(full).unwrap();
        assert_eq!(payload.icons, vec!["<svg/>"]);
        assert!(payload.svgs.is_empty());

        let bare = r#"{"svgs": ["data:image/svg+xml,%3Csvg/%3E"]}"#;
        let payload = AssetPayload::from_json(bare).unwrap();
        assert_eq!(payload.len(), 1);
    }

    #[test]
    fn entries_skip_non_svg_strings() {
        let payload = AssetPayload {
            icons: vec!["<svg/>".into(), "https://x/y.png".into()],
            svgs: vec!["".into(), "data:image/svg+xml;base64,PHN2Zy8+".into()],
        };
        let entries: Vec<_> = payload.entries().collect();
        assert_eq!(
            entries,
            vec![
                (SvgAssetKind::Icon, 0, "<svg/>"),
                (SvgAssetKind::Graphic, 1, "data:image/svg+xml;base64,PHN2Zy8+"),
            ]
        );
    }

    #[test]
    fn filenames_are_one_based_and_padded() {
        assert_eq!(export_filename(SvgAssetKind::Icon, 0), "icon-001.svg");
        assert_eq!(export_filename(SvgAssetKind::Graphic, 41), "graphic-042.svg");
    }

    #[test]
    fn malformed_json_is_an_error() {
        assert!(AssetPayload::from_json("{").is_err());
        assert!(AssetPayload::from_json(r#"{"icons": 3}"#).is_err());
    }
}
