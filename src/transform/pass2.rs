//! Pass 2: cleanup and normalization of pass-1 XHTML.
//!
//! Structural event rewriting: redundant attribute-less `<span>` wrappers
//! are unwrapped, empty paragraphs dropped, and whitespace runs inside text
//! collapsed. Applying the pass to its own output changes nothing.

use quick_xml::events::{BytesText, Event};
use quick_xml::{Reader, Writer};

use super::{TransformParams, TransformPass, PASS2_NAME};
use crate::error::{Error, Result};

/// The built-in cleanup pass.
pub struct CleanupPass;

impl TransformPass for CleanupPass {
    fn name(&self) -> &'static str {
        PASS2_NAME
    }

    fn apply(&self, input: &str, _params: &TransformParams) -> Result<String> {
        // Spans first: unwrapping can leave a paragraph empty, dropping
        // paragraphs never exposes new spans.
        let unwrapped = unwrap_bare_spans(input)?;
        drop_empty_paragraphs(&unwrapped)
    }
}

/// Remove `<p></p>` pairs with nothing but whitespace between them.
///
/// Needs a small lookahead, so it runs as its own event scan: a pending
/// paragraph start is only emitted once real content shows up.
fn drop_empty_paragraphs(input: &str) -> Result<String> {
    let mut reader = Reader::from_str(input);
    let mut writer = Writer::new(Vec::new());
    // Start event + optional whitespace text held back until we know the
    // paragraph is non-empty.
    let mut pending: Vec<Event> = Vec::new();

    loop {
        let event = reader.read_event().map_err(Error::from)?;
        match event {
            Event::Start(ref e) if e.name().as_ref() == b"p" && e.attributes_raw().is_empty() => {
                flush(&mut writer, &mut pending)?;
                pending.push(event.into_owned());
            }
            Event::Text(ref t) if !pending.is_empty() => {
                let raw = String::from_utf8_lossy(t.as_ref()).into_owned();
                if raw.trim().is_empty() {
                    pending.push(event.into_owned());
                } else {
                    flush(&mut writer, &mut pending)?;
                    writer.write_event(event).map_err(|e| Error::Xml(e.to_string()))?;
                }
            }
            Event::End(ref e) if e.name().as_ref() == b"p" && !pending.is_empty() => {
                // Start + only-whitespace text followed by the end tag:
                // the whole paragraph disappears.
                pending.clear();
            }
            Event::Eof => {
                flush(&mut writer, &mut pending)?;
                break;
            }
            other => {
                flush(&mut writer, &mut pending)?;
                writer.write_event(other).map_err(|e| Error::Xml(e.to_string()))?;
            }
        }
    }

    String::from_utf8(writer.into_inner()).map_err(|e| Error::Xml(e.to_string()))
}

fn flush(writer: &mut Writer<Vec<u8>>, pending: &mut Vec<Event>) -> Result<()> {
    for event in pending.drain(..) {
        writer.write_event(event).map_err(|e| Error::Xml(e.to_string()))?;
    }
    Ok(())
}

/// Unwrap `<span>` elements that carry no attributes and collapse
/// whitespace runs in text nodes.
fn unwrap_bare_spans(input: &str) -> Result<String> {
    let mut reader = Reader::from_str(input);
    let mut writer = Writer::new(Vec::new());
    // Depth bookkeeping: for every open span, whether it was dropped.
    let mut span_stack: Vec<bool> = Vec::new();

    loop {
        match reader.read_event().map_err(Error::from)? {
            Event::Eof => break,
            Event::Start(e) if e.name().as_ref() == b"span" => {
                let bare = e.attributes_raw().is_empty();
                span_stack.push(bare);
                if !bare {
                    writer
                        .write_event(Event::Start(e.into_owned()))
                        .map_err(|e| Error::Xml(e.to_string()))?;
                }
            }
            Event::End(e) if e.name().as_ref() == b"span" => {
                let dropped = span_stack.pop().unwrap_or(false);
                if !dropped {
                    writer
                        .write_event(Event::End(e.into_owned()))
                        .map_err(|e| Error::Xml(e.to_string()))?;
                }
            }
            Event::Text(t) => {
                let raw = String::from_utf8_lossy(t.as_ref()).into_owned();
                let collapsed = collapse_whitespace(&raw);
                writer
                    .write_event(Event::Text(BytesText::from_escaped(collapsed)))
                    .map_err(|e| Error::Xml(e.to_string()))?;
            }
            other => writer
                .write_event(other)
                .map_err(|e| Error::Xml(e.to_string()))?,
        }
    }

    String::from_utf8(writer.into_inner()).map_err(|e| Error::Xml(e.to_string()))
}

/// Collapse internal runs of spaces and tabs to one space; newlines stay so
/// the markup keeps its line structure.
fn collapse_whitespace(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut in_blank = false;
    for ch in text.chars() {
        if ch == ' ' || ch == '\t' {
            if !in_blank {
                out.push(' ');
            }
            in_blank = true;
        } else {
            in_blank = false;
            out.push(ch);
        }
    }
    out
}
