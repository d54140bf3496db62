//! Normalization and progressive rendering of untrusted SVG strings.
//!
//! Input arrives as raw markup, a base64 or percent-encoded data URI, or
//! something else entirely. [`classify`] identifies the form, [`normalize`]
//! turns it into [`CanonicalMarkup`] that is guaranteed to be visible, and a
//! [`RenderCascade`] walks a host through inline, image and object display
//! strategies until one of them works.

pub mod cascade;
pub mod classify;
pub mod collection;
pub mod config;
pub mod data_uri;
pub mod encode;
pub mod error;
pub mod export;
mod markup;
pub mod normalize;
pub mod raster;
pub mod surface;
mod xml;

pub use cascade::{Mount, RenderAttempt, RenderCascade, RenderStrategy, RenderedSize, SettleTicket};
pub use classify::{ContentForm, classify};
pub use config::{DEFAULT_SETTLE_DELAY, EngineConfig};
pub use encode::{decode_data_uri, to_data_uri};
pub use export::{FsSink, clipboard_text, export_as_file, try_export_as_file};
pub use markup::{CURRENT_COLOR, SVG_NAMESPACE};
pub use normalize::{CanonicalMarkup, normalize, normalize_content, placeholder};
pub use surface::{FileSink, HostSurface, InlineMount, LoadOutcome, drive};
