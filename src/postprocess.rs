//! Post-transform cleanup of XHTML output.
//!
//! Word tooling and XML processors leave namespace noise on the transformed
//! markup: default-namespace declarations repeated on `<p>`/`<span>`,
//! empty-namespace resets, and `mml:`-prefixed MathML. These rewrites run
//! as structural event scans so the removals track elements and attributes
//! rather than text patterns; [`extract_body`] deliberately keeps its
//! historical first-greedy-match behavior.

use quick_xml::events::attributes::Attribute;
use quick_xml::events::{BytesEnd, BytesStart, Event};
use quick_xml::name::QName;
use quick_xml::{Reader, Writer};
use regex::Regex;

use crate::error::{Error, Result};

const XHTML_NS: &str = "http://www.w3.org/1999/xhtml";
const MATHML_NS: &str = "http://www.w3.org/1998/Math/MathML";

/// Remove namespace declarations injected onto `<p>`/`<span>` elements and
/// empty-namespace resets anywhere.
///
/// Idempotent: once the artifacts are gone a second application finds
/// nothing to remove.
pub fn strip_namespace_artifacts(xhtml: &str) -> Result<String> {
    rewrite_events(xhtml, |name, attrs| {
        let on_p_or_span = name == "p" || name == "span";
        attrs.retain(|(key, value)| {
            if key == "xmlns" && value.is_empty() {
                return false;
            }
            if on_p_or_span && key == "xmlns" && value == XHTML_NS {
                return false;
            }
            true
        });
    })
}

/// Remove the `mml:` prefix from MathML element and attribute names, drop
/// the implicit `mathvariant="normal"`, remove the prefixed namespace
/// declaration and re-declare the namespace on each top-level `<math>`.
pub fn remap_math(xhtml: &str) -> Result<String> {
    let mut reader = Reader::from_str(xhtml);
    let mut writer = Writer::new(Vec::new());
    // Nesting depth of math elements; only depth 0 openers get the
    // re-attached declaration.
    let mut math_depth: u32 = 0;

    loop {
        match reader.read_event().map_err(Error::from)? {
            Event::Eof => break,
            Event::Start(e) => {
                let element = remap_math_element(&e, &mut math_depth, true)?;
                writer
                    .write_event(Event::Start(element))
                    .map_err(|e| Error::Xml(e.to_string()))?;
            }
            Event::Empty(e) => {
                let element = remap_math_element(&e, &mut math_depth, false)?;
                writer
                    .write_event(Event::Empty(element))
                    .map_err(|e| Error::Xml(e.to_string()))?;
            }
            Event::End(e) => {
                let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
                let bare = name.strip_prefix("mml:").unwrap_or(&name).to_string();
                if bare == "math" {
                    math_depth = math_depth.saturating_sub(1);
                }
                writer
                    .write_event(Event::End(BytesEnd::new(bare)))
                    .map_err(|e| Error::Xml(e.to_string()))?;
            }
            other => writer
                .write_event(other)
                .map_err(|e| Error::Xml(e.to_string()))?,
        }
    }

    String::from_utf8(writer.into_inner()).map_err(|e| Error::Xml(e.to_string()))
}

fn remap_math_element(
    e: &BytesStart,
    math_depth: &mut u32,
    opens_scope: bool,
) -> Result<BytesStart<'static>> {
    let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
    let bare = name.strip_prefix("mml:").unwrap_or(&name).to_string();

    let mut attrs: Vec<(String, String)> = Vec::new();
    for attr in e.attributes() {
        let attr = attr.map_err(|err| Error::Xml(err.to_string()))?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let value = String::from_utf8_lossy(&attr.value).into_owned();
        if key == "xmlns:mml" && value == MATHML_NS {
            continue;
        }
        if key == "mathvariant" && value == "normal" {
            continue;
        }
        let key = key.strip_prefix("mml:").map(str::to_string).unwrap_or(key);
        attrs.push((key, value));
    }

    if bare == "math" {
        if *math_depth == 0 && !attrs.iter().any(|(k, _)| k == "xmlns") {
            attrs.push(("xmlns".to_string(), MATHML_NS.to_string()));
        }
        if opens_scope {
            *math_depth += 1;
        }
    }

    let mut element = BytesStart::new(bare);
    for (key, value) in &attrs {
        element.push_attribute(Attribute {
            key: QName(key.as_bytes()),
            value: value.clone().into_bytes().into(),
        });
    }
    Ok(element.into_owned())
}

/// Return the content between `<body ...>` and `</body>`, or the input
/// unchanged when no body element is present.
///
/// First greedy match; for nested or repeated body-like substrings the
/// behavior is the documented historical one, not a semantic guarantee.
pub fn extract_body(xhtml: &str) -> &str {
    let re = Regex::new(r"(?is)<body[^>]*>(.+)</body>").unwrap();
    match re.captures(xhtml) {
        Some(captures) => captures.get(1).map_or(xhtml, |m| m.as_str()),
        None => xhtml,
    }
}

/// Event scanner for attribute-only rewrites: `edit` receives each
/// start/empty tag's name and mutable attribute list; element names and
/// every other event pass through untouched.
fn rewrite_events<F>(input: &str, mut edit: F) -> Result<String>
where
    F: FnMut(&str, &mut Vec<(String, String)>),
{
    let mut reader = Reader::from_str(input);
    let mut writer = Writer::new(Vec::new());

    loop {
        match reader.read_event().map_err(Error::from)? {
            Event::Eof => break,
            Event::Start(e) => {
                let element = rebuild(&e, &mut edit)?;
                writer
                    .write_event(Event::Start(element))
                    .map_err(|e| Error::Xml(e.to_string()))?;
            }
            Event::Empty(e) => {
                let element = rebuild(&e, &mut edit)?;
                writer
                    .write_event(Event::Empty(element))
                    .map_err(|e| Error::Xml(e.to_string()))?;
            }
            other => writer
                .write_event(other)
                .map_err(|e| Error::Xml(e.to_string()))?,
        }
    }

    String::from_utf8(writer.into_inner()).map_err(|e| Error::Xml(e.to_string()))
}

fn rebuild<F>(e: &BytesStart, edit: &mut F) -> Result<BytesStart<'static>>
where
    F: FnMut(&str, &mut Vec<(String, String)>),
{
    let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
    let mut attrs: Vec<(String, String)> = Vec::new();
    for attr in e.attributes() {
        let attr = attr.map_err(|err| Error::Xml(err.to_string()))?;
        attrs.push((
            String::from_utf8_lossy(attr.key.as_ref()).into_owned(),
            String::from_utf8_lossy(&attr.value).into_owned(),
        ));
    }

    edit(&name, &mut attrs);

    let mut element = BytesStart::new(name);
    for (key, value) in &attrs {
        // Values pass through with their original escaping intact.
        element.push_attribute(Attribute {
            key: QName(key.as_bytes()),
            value: value.clone().into_bytes().into(),
        });
    }
    Ok(element.into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_removes_xhtml_declaration_on_p_and_span() {
        let input = format!(
            "<body><p xmlns=\"{XHTML_NS}\">a</p><span xmlns=\"{XHTML_NS}\">b</span></body>"
        );
        let out = strip_namespace_artifacts(&input).unwrap();
        assert_eq!(out, "<body><p>a</p><span>b</span></body>");
    }

    #[test]
    fn test_strip_keeps_declaration_on_other_elements() {
        let input = format!("<html xmlns=\"{XHTML_NS}\"><p>a</p></html>");
        let out = strip_namespace_artifacts(&input).unwrap();
        assert!(out.contains(&format!("<html xmlns=\"{XHTML_NS}\">")));
    }

    #[test]
    fn test_strip_removes_empty_namespace_resets() {
        let out = strip_namespace_artifacts("<div xmlns=\"\"><p xmlns=\"\">a</p></div>").unwrap();
        assert_eq!(out, "<div><p>a</p></div>");
    }

    #[test]
    fn test_strip_is_idempotent() {
        let input = format!(
            "<body><p xmlns=\"{XHTML_NS}\" class=\"x\">a</p><i xmlns=\"\">b</i></body>"
        );
        let once = strip_namespace_artifacts(&input).unwrap();
        let twice = strip_namespace_artifacts(&once).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn test_remap_math() {
        let input = format!(
            "<p><mml:math xmlns:mml=\"{MATHML_NS}\"><mml:mrow>\
             <mml:mi mathvariant=\"normal\">x</mml:mi><mml:mo>+</mml:mo><mml:mn>1</mml:mn>\
             </mml:mrow></mml:math></p>"
        );
        let out = remap_math(&input).unwrap();
        assert!(!out.contains("mml:"));
        assert!(!out.contains("mathvariant=\"normal\""));
        assert!(out.contains(&format!("<math xmlns=\"{MATHML_NS}\">")));
        assert!(out.contains("<mi>x</mi><mo>+</mo><mn>1</mn>"));
    }

    #[test]
    fn test_remap_math_keeps_other_mathvariant() {
        let input = format!(
            "<mml:math xmlns:mml=\"{MATHML_NS}\">\
             <mml:mi mathvariant=\"bold\">M</mml:mi></mml:math>"
        );
        let out = remap_math(&input).unwrap();
        assert!(out.contains("mathvariant=\"bold\""));
    }

    #[test]
    fn test_remap_math_single_declaration_per_math() {
        let input = format!(
            "<body><mml:math xmlns:mml=\"{MATHML_NS}\"><mml:mn>1</mml:mn></mml:math>\
             <mml:math xmlns:mml=\"{MATHML_NS}\"><mml:mn>2</mml:mn></mml:math></body>"
        );
        let out = remap_math(&input).unwrap();
        assert_eq!(
            out.matches(&format!("xmlns=\"{MATHML_NS}\"")).count(),
            2,
            "each top-level math carries exactly one declaration: {out}"
        );
    }

    #[test]
    fn test_extract_body() {
        assert_eq!(
            extract_body("<html><body class=\"a\">inner <b>text</b></body></html>"),
            "inner <b>text</b>"
        );
    }

    #[test]
    fn test_extract_body_no_body_returns_input() {
        let input = "<p>fragment without body</p>";
        assert_eq!(extract_body(input), input);
    }

    #[test]
    fn test_extract_body_greedy_first_match() {
        // Documented behavior: one greedy match spans to the last </body>.
        let input = "<body>a</body><body>b</body>";
        assert_eq!(extract_body(input), "a</body><body>b");
    }
}
