//! Contract between the engine and whatever actually puts pixels on screen.

use crate::cascade::{Mount, RenderCascade, RenderStrategy, RenderedSize};
use crate::error::ExportError;
use crate::normalize::CanonicalMarkup;

/// Result of mounting canonical markup inline.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InlineMount {
    /// The host reported that the node rendered, with its size.
    Rendered(Option<RenderedSize>),
    /// No explicit signal; measure after the settle delay.
    Pending,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    Loaded,
    Failed,
}

pub trait HostSurface {
    fn mount_inline(&mut self, markup: &CanonicalMarkup, key: u64) -> InlineMount;

    /// Size of the inline node mounted under `key`, or `None` if there is none.
    fn measure_inline(&mut self, key: u64) -> Option<RenderedSize>;

    fn load_image(&mut self, data_uri: &str, key: u64) -> LoadOutcome;

    fn embed_object(&mut self, data_uri: &str, key: u64) -> LoadOutcome;
}

/// Host file-save mechanism.
pub trait FileSink {
    fn save(&mut self, filename: &str, mime: &str, bytes: &[u8]) -> Result<(), ExportError>;
}

enum Signal {
    Inline(u64, InlineMount),
    Load(u64, LoadOutcome),
}

/// Runs `cascade` against a synchronous host until a strategy settles or
/// every strategy has failed. Returns the final strategy.
///
/// Hosts without an explicit rendered signal are measured after the
/// configured settle delay.
pub fn drive<S: HostSurface + ?Sized>(cascade: &mut RenderCascade, surface: &mut S) -> RenderStrategy {
    while !cascade.is_settled() {
        let signal = match cascade.mount() {
            Mount::Inline { markup, key } => Signal::Inline(key, surface.mount_inline(markup, key)),
            Mount::Image { data_uri, key } => Signal::Load(key, surface.load_image(data_uri, key)),
            Mount::Object { data_uri, key, .. } => {
                Signal::Load(key, surface.embed_object(data_uri, key))
            }
            Mount::Failed { .. } => break,
        };

        let progressed = match signal {
            Signal::Inline(key, InlineMount::Rendered(size)) => cascade.on_inline_rendered(key, size),
            Signal::Inline(key, InlineMount::Pending) => match cascade.settle_ticket() {
                Some(ticket) => {
                    if !ticket.delay.is_zero() {
                        std::thread::sleep(ticket.delay);
                    }
                    let measured = surface.measure_inline(key);
                    cascade.on_inline_settled(ticket, measured)
                }
                None => false,
            },
            Signal::Load(key, LoadOutcome::Loaded) => cascade.on_load(key),
            Signal::Load(key, LoadOutcome::Failed) => cascade.on_load_error(key),
        };

        if !progressed {
            tracing::warn!(strategy = %cascade.strategy(), "render cascade made no progress");
            break;
        }
    }
    cascade.strategy()
}
