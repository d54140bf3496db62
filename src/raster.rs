//! Headless host surface and output conversions backed by resvg.

use std::path::Path;

use resvg::usvg;
use tiny_skia::{Pixmap, Transform};

use crate::cascade::RenderedSize;
use crate::data_uri;
use crate::error::RasterError;
use crate::normalize::CanonicalMarkup;
use crate::surface::{HostSurface, InlineMount, LoadOutcome};

/// Preferred family names picked from whatever fonts are installed.
#[derive(Debug, Default)]
struct FontFallbacks {
    sans: Option<String>,
    mono: Option<String>,
    first: Option<String>,
}

impl FontFallbacks {
    fn pick<'a>(families: impl Iterator<Item = &'a str>) -> Self {
        let mut picked = Self::default();
        for family in families {
            if picked.first.is_none() {
                picked.first = Some(family.to_string());
            }
            let lower = family.to_ascii_lowercase();
            if picked.sans.is_none() && lower.contains("sans") {
                picked.sans = Some(family.to_string());
            }
            if picked.mono.is_none() && (lower.contains("mono") || lower.contains("code")) {
                picked.mono = Some(family.to_string());
            }
        }
        picked
    }

    fn sans(&self) -> Option<&str> {
        self.sans.as_deref().or(self.first.as_deref())
    }

    fn mono(&self) -> Option<&str> {
        self.mono.as_deref().or_else(|| self.sans())
    }
}

/// Largest pixmap any conversion will allocate (8192x8192).
const MAX_PIXELS: u64 = 8192 * 8192;
/// Longest side of the raster used to check that an image loads.
const LOAD_CHECK_SIDE: f32 = 1024.0;

fn load_fonts(fontdb: &mut usvg::fontdb::Database) {
    fontdb.load_system_fonts();
    let local_fonts = Path::new("fonts");
    if local_fonts.is_dir() {
        fontdb.load_fonts_dir(local_fonts);
    }

    let fallbacks = FontFallbacks::pick(
        fontdb
            .faces()
            .flat_map(|face| face.families.iter().map(|(family, _)| family.as_str())),
    );
    if let Some(family) = fallbacks.sans() {
        fontdb.set_sans_serif_family(family);
        fontdb.set_serif_family(family);
    }
    if let Some(family) = fallbacks.mono() {
        fontdb.set_monospace_family(family);
    }
}

/// [`HostSurface`] that "displays" SVG by parsing and rasterizing it.
///
/// Inline mounts report an explicit rendered signal with the parsed tree
/// size, so the cascade never waits on the settle delay.
pub struct RasterSurface {
    options: usvg::Options<'static>,
    inline_size: Option<(u64, RenderedSize)>,
}

impl RasterSurface {
    pub fn new() -> Self {
        let mut options = usvg::Options::default();
        load_fonts(options.fontdb_mut());
        Self {
            options,
            inline_size: None,
        }
    }

    /// Skips font discovery; text renders as nothing.
    pub fn without_fonts() -> Self {
        Self {
            options: usvg::Options::default(),
            inline_size: None,
        }
    }

    fn parse(&self, svg: &str) -> Result<usvg::Tree, RasterError> {
        usvg::Tree::from_str(svg, &self.options).map_err(|e| RasterError::Parse(e.to_string()))
    }

    fn rasterize(&self, tree: &usvg::Tree, scale: f32) -> Result<Pixmap, RasterError> {
        if !scale.is_finite() || scale <= 0.0 {
            return Err(RasterError::Scale(scale));
        }
        let width = (tree.size().width() * scale).ceil() as u32;
        let height = (tree.size().height() * scale).ceil() as u32;
        if u64::from(width) * u64::from(height) > MAX_PIXELS {
            return Err(RasterError::Pixmap { width, height });
        }
        let mut pixmap = Pixmap::new(width, height).ok_or(RasterError::Pixmap { width, height })?;
        resvg::render(tree, Transform::from_scale(scale, scale), &mut pixmap.as_mut());
        Ok(pixmap)
    }

    pub fn svg_to_png(&self, svg: &str, scale: f32) -> Result<Vec<u8>, RasterError> {
        let tree = self.parse(svg)?;
        self.rasterize(&tree, scale)?
            .encode_png()
            .map_err(|e| RasterError::Encode(e.to_string()))
    }

    /// Renders `svg` shrunk so its longest side fits [`LOAD_CHECK_SIDE`].
    fn check_renders(&self, svg: &str) -> Result<(), RasterError> {
        let tree = self.parse(svg)?;
        let longest = tree.size().width().max(tree.size().height());
        let scale = if longest > LOAD_CHECK_SIDE {
            LOAD_CHECK_SIDE / longest
        } else {
            1.0
        };
        self.rasterize(&tree, scale).map(|_| ())
    }
}

impl Default for RasterSurface {
    fn default() -> Self {
        Self::new()
    }
}

impl HostSurface for RasterSurface {
    fn mount_inline(&mut self, markup: &CanonicalMarkup, key: u64) -> InlineMount {
        let measured = match self.parse(markup.as_str()) {
            Ok(tree) => Some(RenderedSize::new(tree.size().width(), tree.size().height())),
            Err(err) => {
                tracing::debug!(%err, "inline mount rejected markup");
                None
            }
        };
        self.inline_size = measured.map(|size| (key, size));
        InlineMount::Rendered(measured)
    }

    fn measure_inline(&mut self, key: u64) -> Option<RenderedSize> {
        self.inline_size
            .filter(|(mounted, _)| *mounted == key)
            .map(|(_, size)| size)
    }

    fn load_image(&mut self, data_uri: &str, _key: u64) -> LoadOutcome {
        let loaded = data_uri::decode(data_uri)
            .map_err(RasterError::from)
            .and_then(|svg| self.check_renders(&svg));
        match loaded {
            Ok(_) => LoadOutcome::Loaded,
            Err(err) => {
                tracing::debug!(%err, "image load failed");
                LoadOutcome::Failed
            }
        }
    }

    fn embed_object(&mut self, data_uri: &str, _key: u64) -> LoadOutcome {
        let loaded = data_uri::decode(data_uri)
            .map_err(RasterError::from)
            .and_then(|svg| self.parse(&svg));
        match loaded {
            Ok(_) => LoadOutcome::Loaded,
            Err(err) => {
                tracing::debug!(%err, "object embed failed");
                LoadOutcome::Failed
            }
        }
    }
}

/// Converts SVG to PDF, keeping text as paths.
pub fn svg_to_pdf(svg: &str) -> Result<Vec<u8>, RasterError> {
    use svg2pdf::usvg::fontdb;

    let mut fontdb = fontdb::Database::new();
    fontdb.load_system_fonts();
    let fallbacks = FontFallbacks::pick(
        fontdb
            .faces()
            .flat_map(|face| face.families.iter().map(|(family, _)| family.as_str())),
    );
    if let Some(family) = fallbacks.sans() {
        fontdb.set_sans_serif_family(family);
        fontdb.set_serif_family(family);
    }

    let opts = svg2pdf::usvg::Options {
        fontdb: std::sync::Arc::new(fontdb),
        ..Default::default()
    };
    let tree = svg2pdf::usvg::Tree::from_str(svg, &opts)
        .map_err(|e| RasterError::Parse(e.to_string()))?;

    let options = svg2pdf::ConversionOptions {
        embed_text: false,
        ..Default::default()
    };
    svg2pdf::to_pdf(&tree, options, svg2pdf::PageOptions::default())
        .map_err(|e| RasterError::Pdf(e.to_string()))
}
