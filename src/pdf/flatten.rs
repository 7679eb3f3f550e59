//! Flattening XHTML fragments into styled text lines for pagination.
//!
//! The renderer draws text, not boxes: an incoming fragment is reduced to a
//! sequence of lines, each tagged with enough style to pick a font and
//! size. Unknown markup contributes its text content and nothing else.

use quick_xml::events::Event;
use quick_xml::Reader;

use crate::error::{Error, Result};

/// Style class of a flattened line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineKind {
    /// Section heading written by the job itself
    SectionHeading,
    /// Document heading of the given level (1..=6)
    Heading(u8),
    /// Ordinary body text
    Body,
}

/// One line of renderable text.
#[derive(Debug, Clone)]
pub struct Line {
    /// Visible text, whitespace-collapsed
    pub text: String,
    /// Style class
    pub kind: LineKind,
}

impl Line {
    pub(crate) fn new(text: impl Into<String>, kind: LineKind) -> Self {
        Self {
            text: text.into(),
            kind,
        }
    }
}

/// Reduce an XHTML fragment to its visible lines.
///
/// Block boundaries (`p`, headings, `li`, `div`, `br`) break lines; `img`
/// elements turn into a bracketed marker so the reader can tell where an
/// image sat. A fragment with no visible text flattens to nothing.
pub fn flatten_fragment(fragment: &str) -> Result<Vec<Line>> {
    let mut reader = Reader::from_str(fragment);
    let mut lines: Vec<Line> = Vec::new();
    let mut current = String::new();
    let mut kind = LineKind::Body;

    macro_rules! break_line {
        () => {
            let text = collapse(&current);
            if !text.is_empty() {
                lines.push(Line::new(text, kind));
            }
            current.clear();
        };
    }

    loop {
        match reader.read_event().map_err(Error::from)? {
            Event::Eof => break,
            Event::Start(e) => {
                let name = e.name();
                let name = name.as_ref();
                if let Some(level) = heading_level(name) {
                    break_line!();
                    kind = LineKind::Heading(level);
                } else if is_block(name) {
                    break_line!();
                    kind = LineKind::Body;
                }
            }
            Event::End(e) => {
                let name = e.name();
                let name = name.as_ref();
                if heading_level(name).is_some() || is_block(name) {
                    break_line!();
                    kind = LineKind::Body;
                }
            }
            Event::Empty(e) => {
                let name_owned = e.name().as_ref().to_vec();
                match name_owned.as_slice() {
                    b"br" => {
                        break_line!();
                    }
                    b"img" => {
                        let label = img_label(&e)?;
                        if !current.is_empty() {
                            current.push(' ');
                        }
                        current.push_str(&label);
                    }
                    _ => {}
                }
            }
            Event::Text(t) => {
                let text = t
                    .unescape()
                    .map_err(|e| Error::Xml(e.to_string()))?
                    .into_owned();
                current.push_str(&text);
            }
            Event::CData(c) => {
                current.push_str(&String::from_utf8_lossy(c.as_ref()));
            }
            _ => {}
        }
    }
    let text = collapse(&current);
    if !text.is_empty() {
        lines.push(Line::new(text, kind));
    }

    Ok(lines)
}

fn heading_level(name: &[u8]) -> Option<u8> {
    match name {
        b"h1" => Some(1),
        b"h2" => Some(2),
        b"h3" => Some(3),
        b"h4" => Some(4),
        b"h5" => Some(5),
        b"h6" => Some(6),
        _ => None,
    }
}

fn is_block(name: &[u8]) -> bool {
    matches!(
        name,
        b"p" | b"div" | b"li" | b"ul" | b"ol" | b"blockquote" | b"table" | b"tr" | b"body"
    )
}

fn img_label(e: &quick_xml::events::BytesStart) -> Result<String> {
    let mut alt = String::new();
    let mut src = String::new();
    for attr in e.attributes() {
        let attr = attr.map_err(|err| Error::Xml(err.to_string()))?;
        match attr.key.as_ref() {
            b"alt" => alt = String::from_utf8_lossy(&attr.value).into_owned(),
            b"src" => src = String::from_utf8_lossy(&attr.value).into_owned(),
            _ => {}
        }
    }
    let name = if !alt.is_empty() {
        alt
    } else {
        src.rsplit('/').next().unwrap_or("").to_string()
    };
    Ok(format!("[image: {name}]"))
}

fn collapse(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
