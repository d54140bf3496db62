//! Per-instance render cascade.
//!
//! A [`RenderCascade`] owns one displayed SVG: its canonical markup, the
//! data URI derived from it, and the current [`RenderAttempt`]. The host
//! mounts whatever [`RenderCascade::mount`] returns and reports back through
//! the `on_*` callbacks. Failures move the attempt one step along
//! `Inline -> ImageTag -> ObjectTag -> Error`; only [`RenderCascade::retry`]
//! or a new content identity moves it back to `Inline`.

use std::cell::OnceCell;
use std::fmt;
use std::time::Duration;

use crate::classify::{ContentForm, classify};
use crate::config::EngineConfig;
use crate::encode::to_data_uri;
use crate::normalize::{CanonicalMarkup, normalize};

pub const RENDER_FAILED_MESSAGE: &str = "Failed to render SVG";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RenderStrategy {
    /// Canonical markup embedded directly in the host document.
    Inline,
    /// Data URI loaded as an image resource.
    ImageTag,
    /// Data URI embedded as an external object, with a retry affordance.
    ObjectTag,
    /// Every strategy failed for this content.
    Error,
}

impl RenderStrategy {
    /// Strategies in the order they are attempted.
    pub const CASCADE: [RenderStrategy; 3] = [
        RenderStrategy::Inline,
        RenderStrategy::ImageTag,
        RenderStrategy::ObjectTag,
    ];

    /// The strategy that takes over when this one fails.
    pub fn next(self) -> Self {
        match self {
            RenderStrategy::Inline => RenderStrategy::ImageTag,
            RenderStrategy::ImageTag => RenderStrategy::ObjectTag,
            RenderStrategy::ObjectTag | RenderStrategy::Error => RenderStrategy::Error,
        }
    }

    pub fn is_terminal(self) -> bool {
        self == RenderStrategy::Error
    }

    fn needs_data_uri(self) -> bool {
        matches!(self, RenderStrategy::ImageTag | RenderStrategy::ObjectTag)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            RenderStrategy::Inline => "inline",
            RenderStrategy::ImageTag => "img",
            RenderStrategy::ObjectTag => "object",
            RenderStrategy::Error => "error",
        }
    }
}

impl fmt::Display for RenderStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderAttempt {
    pub strategy: RenderStrategy,
    /// Changes whenever the host must discard its mounted node and mount afresh.
    pub attempt_key: u64,
}

/// Size the host measured for a mounted node, in its own units.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderedSize {
    pub width: f32,
    pub height: f32,
}

impl RenderedSize {
    pub fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    /// Zero (or unmeasurable) in both dimensions.
    pub fn is_collapsed(&self) -> bool {
        !(self.width > 0.0) && !(self.height > 0.0)
    }
}

/// A pending inline settle check. Only valid for the content generation and
/// attempt that issued it; anything else is discarded on arrival.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SettleTicket {
    pub generation: u64,
    pub attempt_key: u64,
    pub delay: Duration,
}

/// What the host should display right now.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mount<'a> {
    Inline {
        markup: &'a CanonicalMarkup,
        key: u64,
    },
    Image {
        data_uri: &'a str,
        key: u64,
    },
    Object {
        data_uri: &'a str,
        key: u64,
        /// Show a manual retry control inside the object fallback.
        retry: bool,
    },
    Failed {
        message: &'static str,
        key: u64,
    },
}

#[derive(Debug)]
pub struct RenderCascade {
    config: EngineConfig,
    content: String,
    form: ContentForm,
    markup: CanonicalMarkup,
    data_uri: OnceCell<String>,
    attempt: RenderAttempt,
    generation: u64,
    next_key: u64,
    settled: bool,
    transitions: Vec<RenderStrategy>,
}

impl RenderCascade {
    pub fn new(content: impl Into<String>, config: EngineConfig) -> Self {
        let content = content.into();
        let form = classify(&content);
        let markup = normalize(&content, form, &config);

        Self {
            config,
            content,
            form,
            markup,
            data_uri: OnceCell::new(),
            attempt: RenderAttempt {
                strategy: RenderStrategy::Inline,
                attempt_key: 0,
            },
            generation: 0,
            next_key: 1,
            settled: false,
            transitions: vec![RenderStrategy::Inline],
        }
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn form(&self) -> ContentForm {
        self.form
    }

    pub fn markup(&self) -> &CanonicalMarkup {
        &self.markup
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn attempt(&self) -> RenderAttempt {
        self.attempt
    }

    pub fn strategy(&self) -> RenderStrategy {
        self.attempt.strategy
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// The current strategy has confirmed it displayed something.
    pub fn is_settled(&self) -> bool {
        self.settled
    }

    /// Strategies entered for the current content, in order, including retries.
    pub fn transitions(&self) -> &[RenderStrategy] {
        &self.transitions
    }

    /// Data URI for the image and object strategies, encoded on first use.
    pub fn data_uri(&self) -> &str {
        self.data_uri.get_or_init(|| to_data_uri(&self.markup))
    }

    pub fn mount(&self) -> Mount<'_> {
        let key = self.attempt.attempt_key;
        match self.attempt.strategy {
            RenderStrategy::Inline => Mount::Inline {
                markup: &self.markup,
                key,
            },
            RenderStrategy::ImageTag => Mount::Image {
                data_uri: self.data_uri(),
                key,
            },
            RenderStrategy::ObjectTag => Mount::Object {
                data_uri: self.data_uri(),
                key,
                retry: true,
            },
            RenderStrategy::Error => Mount::Failed {
                message: RENDER_FAILED_MESSAGE,
                key,
            },
        }
    }

    /// Ticket for the timed inline check, if one is due.
    pub fn settle_ticket(&self) -> Option<SettleTicket> {
        (self.attempt.strategy == RenderStrategy::Inline && !self.settled).then(|| SettleTicket {
            generation: self.generation,
            attempt_key: self.attempt.attempt_key,
            delay: self.config.settle_delay(),
        })
    }

    /// Timed inline check: `measured` is the node's size after the settle
    /// delay, or `None` if no node was found. Returns whether state changed.
    pub fn on_inline_settled(&mut self, ticket: SettleTicket, measured: Option<RenderedSize>) -> bool {
        if ticket.generation != self.generation {
            tracing::debug!(
                ticket = ticket.generation,
                current = self.generation,
                "discarding settle check for replaced content"
            );
            return false;
        }
        self.on_inline_rendered(ticket.attempt_key, measured)
    }

    /// Explicit "rendered" signal from the host for the inline strategy.
    pub fn on_inline_rendered(&mut self, key: u64, measured: Option<RenderedSize>) -> bool {
        if !self.accepts(key, |s| s == RenderStrategy::Inline) || self.settled {
            return false;
        }
        match measured {
            Some(size) if !size.is_collapsed() => {
                self.settled = true;
                true
            }
            _ => {
                tracing::debug!(?measured, "inline SVG did not render");
                self.escalate();
                true
            }
        }
    }

    /// The image or object resource loaded.
    pub fn on_load(&mut self, key: u64) -> bool {
        if !self.accepts(key, RenderStrategy::needs_data_uri) || self.settled {
            return false;
        }
        self.settled = true;
        true
    }

    /// The image or object resource reported a load failure.
    pub fn on_load_error(&mut self, key: u64) -> bool {
        if !self.accepts(key, RenderStrategy::needs_data_uri) {
            return false;
        }
        self.escalate();
        true
    }

    /// User-initiated retry: start over at `Inline` with a fresh key.
    pub fn retry(&mut self) -> RenderAttempt {
        let from = self.attempt.strategy;
        self.restart();
        self.log_transition(from, RenderStrategy::Inline, "retry");
        self.attempt
    }

    /// Swaps in new content. Same content is a no-op; different content
    /// restarts the cascade and invalidates outstanding tickets and keys.
    pub fn set_content(&mut self, content: impl Into<String>) -> bool {
        let content = content.into();
        if content == self.content {
            return false;
        }

        self.form = classify(&content);
        self.markup = normalize(&content, self.form, &self.config);
        self.content = content;
        self.data_uri = OnceCell::new();
        self.generation += 1;
        self.transitions.clear();

        let from = self.attempt.strategy;
        self.restart();
        self.log_transition(from, RenderStrategy::Inline, "content changed");
        true
    }

    fn accepts(&self, key: u64, strategy: impl Fn(RenderStrategy) -> bool) -> bool {
        if key != self.attempt.attempt_key {
            tracing::debug!(key, current = self.attempt.attempt_key, "ignoring stale render signal");
            return false;
        }
        strategy(self.attempt.strategy)
    }

    fn restart(&mut self) {
        self.attempt = RenderAttempt {
            strategy: RenderStrategy::Inline,
            attempt_key: self.next_key,
        };
        self.next_key += 1;
        self.settled = false;
        self.transitions.push(RenderStrategy::Inline);
    }

    fn escalate(&mut self) {
        let mut from = self.attempt.strategy;
        loop {
            let to = from.next();
            self.attempt.strategy = to;
            self.settled = false;
            self.transitions.push(to);
            self.log_transition(from, to, "strategy failed");

            if to.needs_data_uri() && self.data_uri().is_empty() {
                tracing::warn!(strategy = %to, "no data URI to load, skipping strategy");
                from = to;
                continue;
            }
            break;
        }
    }

    fn log_transition(&self, from: RenderStrategy, to: RenderStrategy, reason: &str) {
        let key = self.attempt.attempt_key;
        if self.config.debug {
            tracing::info!(%from, %to, key, reason, "svg render cascade");
        } else {
            tracing::debug!(%from, %to, key, reason, "svg render cascade");
        }
    }
}
