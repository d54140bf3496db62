//! Streaming rewrite of SVG markup over a parsed attribute model.
//!
//! Only the root element and shape elements that need an attribute are
//! rebuilt; every other event is copied through untouched, so running the
//! rewrite twice yields the same bytes.

use quick_xml::events::{BytesEnd, BytesRef, BytesStart, BytesText, Event};
use quick_xml::reader::Reader;
use quick_xml::writer::Writer;

use crate::config::EngineConfig;
use crate::error::MarkupError;
use crate::xml::{escape_attr, sanitize_xml_text};

pub const SVG_NAMESPACE: &str = "http://www.w3.org/2000/svg";
pub const CURRENT_COLOR: &str = "currentColor";

/// Shapes that are invisible without a paint; `true` if a stroke alone suffices.
const SHAPES: &[(&str, bool)] = &[
    ("path", true),
    ("polygon", true),
    ("polyline", true),
    ("rect", false),
    ("circle", false),
    ("ellipse", false),
];

#[derive(Debug, Clone, PartialEq, Eq)]
struct Attr {
    key: String,
    /// Value as written in the source, entities still escaped.
    raw: String,
}

/// One start tag broken into name and attributes.
#[derive(Debug)]
struct Tag {
    name: String,
    attrs: Vec<Attr>,
    changed: bool,
}

impl Tag {
    fn parse(start: &BytesStart<'_>) -> Result<Self, MarkupError> {
        let name = String::from_utf8_lossy(start.name().as_ref()).into_owned();
        let mut attrs: Vec<Attr> = Vec::new();
        let mut changed = false;

        for attr in start.attributes().with_checks(false) {
            let attr = attr.map_err(|e| MarkupError::Xml(format!("in <{name}>: {e}")))?;
            let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
            if attrs.iter().any(|a| a.key == key) {
                // First occurrence wins, as in HTML parsers.
                changed = true;
                continue;
            }
            attrs.push(Attr {
                key,
                raw: String::from_utf8_lossy(&attr.value).into_owned(),
            });
        }

        Ok(Self {
            name,
            attrs,
            changed,
        })
    }

    fn get(&self, key: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|a| a.key == key)
            .map(|a| a.raw.as_str())
    }

    fn has(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    fn prefix(&self) -> Option<&str> {
        self.name.split_once(':').map(|(prefix, _)| prefix)
    }

    fn local_name(&self) -> &str {
        self.name
            .split_once(':')
            .map_or(self.name.as_str(), |(_, local)| local)
    }

    /// Declares a paint either as an attribute or inside `style`.
    fn declares(&self, property: &str) -> bool {
        self.has(property)
            || self
                .get("style")
                .is_some_and(|style| style_declares(style, property))
    }

    fn push(&mut self, key: &str, value: &str) {
        self.attrs.push(Attr {
            key: key.to_string(),
            raw: escape_attr(value),
        });
        self.changed = true;
    }

    fn into_start<'a>(self) -> BytesStart<'a> {
        let mut content = self.name.clone();
        for attr in &self.attrs {
            content.push(' ');
            content.push_str(&attr.key);
            content.push_str("=\"");
            // Values that came single-quoted may hold a bare `"`.
            content.push_str(&attr.raw.replace('"', "&quot;").replace('<', "&lt;"));
            content.push('"');
        }
        BytesStart::from_content(content, self.name.len())
    }
}

fn style_declares(style: &str, property: &str) -> bool {
    style.split(';').any(|decl| {
        decl.split_once(':')
            .is_some_and(|(name, _)| name.trim().eq_ignore_ascii_case(property))
    })
}

fn digits(bytes: &[u8]) -> usize {
    bytes.iter().take_while(|b| b.is_ascii_digit()).count()
}

/// Leading unsigned `<number>` of a length such as `"24"`, `"24.5px"`,
/// `" 3em"` or `"1e3"`. The unit is ignored.
fn leading_number(value: &str) -> Option<&str> {
    let value = value.trim_start();
    let bytes = value.as_bytes();
    let mut end = digits(bytes);
    if end == 0 {
        return None;
    }
    if bytes.get(end) == Some(&b'.') {
        let frac_len = digits(&bytes[end + 1..]);
        if frac_len > 0 {
            end += 1 + frac_len;
        }
    }
    if matches!(bytes.get(end), Some(b'e' | b'E')) {
        let sign_len = usize::from(matches!(bytes.get(end + 1), Some(b'+' | b'-')));
        let exp_len = digits(&bytes[(end + 1 + sign_len).min(bytes.len())..]);
        // "1em" is a unit, not an exponent.
        if exp_len > 0 {
            end += 1 + sign_len + exp_len;
        }
    }
    let number = &value[..end];
    number
        .parse::<f64>()
        .ok()
        .filter(|n| n.is_finite() && *n > 0.0)
        .map(|_| number)
}

/// Numeric `width`/`height` of the first element inside the root that has
/// both. Nothing after the root's end tag is considered.
fn first_sized_descendant(text: &str) -> Option<(String, String)> {
    let mut reader = Reader::from_str(text);
    reader.config_mut().check_end_names = false;
    let mut depth = 0usize;

    loop {
        match reader.read_event().ok()? {
            Event::Start(start) => {
                depth += 1;
                if depth == 1 {
                    continue;
                }
                if let Some(size) = declared_size(&start) {
                    return Some(size);
                }
            }
            Event::Empty(start) => {
                if depth == 0 {
                    return None;
                }
                if let Some(size) = declared_size(&start) {
                    return Some(size);
                }
            }
            Event::End(_) => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    return None;
                }
            }
            Event::Eof => return None,
            _ => {}
        }
    }
}

fn declared_size(start: &BytesStart<'_>) -> Option<(String, String)> {
    let tag = Tag::parse(start).ok()?;
    let width = tag.get("width").and_then(leading_number)?;
    let height = tag.get("height").and_then(leading_number)?;
    Some((width.to_string(), height.to_string()))
}

/// Repairs the root tag. `body` is the whole document when the root has
/// children to borrow a size from, `None` for a self-closing root.
fn repair_root<'a>(
    start: BytesStart<'a>,
    body: Option<&str>,
    config: &EngineConfig,
) -> Result<BytesStart<'a>, MarkupError> {
    let mut tag = Tag::parse(&start)?;
    if !tag.local_name().eq_ignore_ascii_case("svg") {
        return Err(MarkupError::UnexpectedRoot(tag.name));
    }

    let has_namespace = tag.has("xmlns")
        || tag
            .prefix()
            .is_some_and(|prefix| tag.has(&format!("xmlns:{prefix}")));
    if !has_namespace {
        tag.push("xmlns", SVG_NAMESPACE);
    }

    if !tag.has("viewBox") {
        let width = tag.get("width").and_then(leading_number).map(str::to_string);
        let height = tag.get("height").and_then(leading_number).map(str::to_string);
        let size = match (width, height) {
            (Some(width), Some(height)) => Some((width, height)),
            // An unsized root usually wraps a single full-size shape.
            (None, None) => body.and_then(first_sized_descendant),
            _ => None,
        };
        match size {
            Some((width, height)) => {
                tag.push("viewBox", &format!("0 0 {width} {height}"));
            }
            _ => {
                let size = config.fallback_size.to_string();
                tag.push("viewBox", &format!("0 0 {size} {size}"));
                if !tag.has("width") {
                    tag.push("width", &size);
                }
                if !tag.has("height") {
                    tag.push("height", &size);
                }
            }
        }
    }

    if !tag.has("style") {
        tag.push("style", &format!("color: {}", config.foreground));
    }

    Ok(if tag.changed { tag.into_start() } else { start })
}

fn repair_shape(start: BytesStart<'_>) -> Result<BytesStart<'_>, MarkupError> {
    let local = start.local_name();
    let Some(&(_, stroke_suffices)) = SHAPES
        .iter()
        .find(|(shape, _)| local.as_ref().eq_ignore_ascii_case(shape.as_bytes()))
    else {
        return Ok(start);
    };

    let mut tag = Tag::parse(&start)?;
    let painted = tag.declares("fill") || (stroke_suffices && tag.declares("stroke"));
    if !painted {
        tag.push("fill", CURRENT_COLOR);
    }

    Ok(if tag.changed { tag.into_start() } else { start })
}

/// Rewrites `markup` so the root declares the SVG namespace, a viewBox and a
/// foreground colour, and every shape carries a paint.
///
/// Anything before the root element and after its end is dropped, and
/// elements still open at end of input are closed.
pub fn repair(markup: &str, config: &EngineConfig) -> Result<String, MarkupError> {
    let text = sanitize_xml_text(markup.trim_start_matches('\u{feff}'));
    let mut reader = Reader::from_str(&text);
    // End names are matched against our own stack below.
    reader.config_mut().check_end_names = false;

    let mut writer = Writer::new(Vec::with_capacity(text.len() + 128));
    let mut open: Vec<Vec<u8>> = Vec::new();
    let mut seen_root = false;

    loop {
        let event = reader.read_event().map_err(|e| {
            MarkupError::Xml(format!("{e} (near byte {})", reader.buffer_position()))
        })?;

        match event {
            Event::Start(start) => {
                let start = if seen_root {
                    repair_shape(start)?
                } else {
                    seen_root = true;
                    repair_root(start, Some(&*text), config)?
                };
                open.push(start.name().as_ref().to_vec());
                write(&mut writer, Event::Start(start))?;
            }
            Event::Empty(start) => {
                if seen_root {
                    write(&mut writer, Event::Empty(repair_shape(start)?))?;
                } else {
                    write(&mut writer, Event::Empty(repair_root(start, None, config)?))?;
                    seen_root = true;
                    break;
                }
            }
            Event::End(end) => {
                let Some(expected) = open.pop() else {
                    return Err(MarkupError::Xml(format!(
                        "unexpected </{}> before the root element",
                        String::from_utf8_lossy(end.name().as_ref())
                    )));
                };
                if expected != end.name().as_ref() {
                    return Err(MarkupError::Xml(format!(
                        "expected </{}>, found </{}>",
                        String::from_utf8_lossy(&expected),
                        String::from_utf8_lossy(end.name().as_ref())
                    )));
                }
                write(&mut writer, Event::End(end))?;
                if open.is_empty() {
                    break;
                }
            }
            Event::Eof => {
                while let Some(name) = open.pop() {
                    let name = String::from_utf8_lossy(&name).into_owned();
                    write(&mut writer, Event::End(BytesEnd::new(name)))?;
                }
                break;
            }
            Event::GeneralRef(reference) if seen_root => {
                write(&mut writer, resolve_reference(reference))?;
            }
            other => {
                if seen_root {
                    write(&mut writer, other)?;
                }
            }
        }
    }

    if !seen_root {
        return Err(MarkupError::MissingRoot);
    }

    String::from_utf8(writer.into_inner()).map_err(|e| MarkupError::Xml(e.to_string()))
}

/// HTML names that show up in hand-written SVG but are not XML entities.
const HTML_ENTITIES: &[(&str, u32)] = &[
    ("nbsp", 160),
    ("copy", 169),
    ("reg", 174),
    ("deg", 176),
    ("middot", 183),
    ("laquo", 171),
    ("raquo", 187),
    ("times", 215),
    ("ndash", 8211),
    ("mdash", 8212),
    ("bull", 8226),
    ("hellip", 8230),
    ("euro", 8364),
    ("trade", 8482),
];

/// Keeps character references and the five XML entities. Known HTML names
/// become numeric references; anything else is written out as literal text.
fn resolve_reference(reference: BytesRef<'_>) -> Event<'_> {
    let name = String::from_utf8_lossy(&reference).into_owned();
    if reference.is_char_ref() || matches!(name.as_str(), "amp" | "lt" | "gt" | "quot" | "apos") {
        return Event::GeneralRef(reference);
    }
    match HTML_ENTITIES.iter().find(|(entity, _)| *entity == name) {
        Some((_, code)) => Event::GeneralRef(BytesRef::new(format!("#{code}"))),
        None => Event::Text(BytesText::new(&format!("&{name};")).into_owned()),
    }
}

fn write(writer: &mut Writer<Vec<u8>>, event: Event<'_>) -> Result<(), MarkupError> {
    writer
        .write_event(event)
        .map_err(|e| MarkupError::Xml(e.to_string()))
}
