//! Pass 1: structural mapping of merged WordprocessingML into XHTML.
//!
//! Walks the merged document with a namespace-aware tree model. Paragraphs
//! and runs become block/inline elements, heading styles map to `h1`..`h6`
//! offset by the configured level, footnote references become anchors,
//! image placeholders resolve through the images container, and basic
//! `m:oMath` content becomes `mml:`-prefixed MathML.

use std::collections::HashMap;

use quick_xml::escape::escape;
use roxmltree::{Document, Node};

use super::{TransformParams, TransformPass, PASS1_NAME};
use crate::error::Result;

const WML_NS: &str = "http://schemas.openxmlformats.org/wordprocessingml/2006/main";
const DML_NS: &str = "http://schemas.openxmlformats.org/drawingml/2006/main";
const REL_NS: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";
const PKG_REL_NS: &str = "http://schemas.openxmlformats.org/package/2006/relationships";
const MATH_NS: &str = "http://schemas.openxmlformats.org/officeDocument/2006/math";
const DC_NS: &str = "http://purl.org/dc/elements/1.1/";

/// The built-in structural pass.
pub struct StructuralPass;

impl TransformPass for StructuralPass {
    fn name(&self) -> &'static str {
        PASS1_NAME
    }

    fn apply(&self, input: &str, params: &TransformParams) -> Result<String> {
        let doc = Document::parse(input)?;
        let ctx = Context::build(&doc, params);
        Ok(ctx.emit())
    }
}

struct ImageRef {
    url: String,
}

struct Context<'a, 'input> {
    params: &'a TransformParams,
    body: Option<Node<'a, 'input>>,
    footnotes: Vec<(String, Node<'a, 'input>)>,
    /// styleId → heading level (1-based) for paragraph styles
    heading_styles: HashMap<String, u8>,
    /// relationship id → target path, body and footnote tables combined
    rels: HashMap<String, String>,
    /// media-relative filename → stored image data
    images: HashMap<String, ImageRef>,
    title: String,
    used_footnotes: std::cell::RefCell<Vec<String>>,
}

impl<'a, 'input> Context<'a, 'input> {
    fn build(doc: &'a Document<'input>, params: &'a TransformParams) -> Self {
        let root = doc.root_element();
        let container = |tag: &str| root.children().find(|n| n.has_tag_name(tag));

        let body = container("wordmlContainer").and_then(|c| {
            c.descendants()
                .find(|n| n.has_tag_name((WML_NS, "body")))
        });

        let mut heading_styles = HashMap::new();
        if let Some(styles) = container("styleMap") {
            for style in styles
                .descendants()
                .filter(|n| n.has_tag_name((WML_NS, "style")))
            {
                if style.attribute((WML_NS, "type")) != Some("paragraph") {
                    continue;
                }
                let Some(id) = style.attribute((WML_NS, "styleId")) else {
                    continue;
                };
                if let Some(level) = style_heading_level(style) {
                    heading_styles.insert(id.to_string(), level);
                }
            }
        }

        let mut rels = HashMap::new();
        for links in ["documentLinks", "footnoteLinks"] {
            if let Some(node) = container(links) {
                for rel in node
                    .descendants()
                    .filter(|n| n.has_tag_name((PKG_REL_NS, "Relationship")))
                {
                    if let (Some(id), Some(target)) =
                        (rel.attribute("Id"), rel.attribute("Target"))
                    {
                        rels.insert(id.to_string(), target.to_string());
                    }
                }
            }
        }

        let mut images = HashMap::new();
        if let Some(files) = container("imagesContainer") {
            for file in files.children().filter(|n| n.has_tag_name("file")) {
                if let (Some(filename), Some(url)) =
                    (file.attribute("filename"), file.attribute("url"))
                {
                    images.insert(
                        filename.to_string(),
                        ImageRef {
                            url: url.to_string(),
                        },
                    );
                }
            }
        }

        let mut footnotes = Vec::new();
        if let Some(fns) = container("footnotesContainer") {
            for footnote in fns
                .descendants()
                .filter(|n| n.has_tag_name((WML_NS, "footnote")))
            {
                // Separator pseudo-footnotes carry a w:type; real ones don't.
                if footnote.attribute((WML_NS, "type")).is_some() {
                    continue;
                }
                if let Some(id) = footnote.attribute((WML_NS, "id")) {
                    footnotes.push((id.to_string(), footnote));
                }
            }
        }

        let title = container("dublinCore")
            .and_then(|c| {
                c.descendants()
                    .find(|n| n.has_tag_name((DC_NS, "title")))
                    .and_then(|n| n.text())
            })
            .unwrap_or_default()
            .to_string();

        Self {
            params,
            body,
            footnotes,
            heading_styles,
            rels,
            images,
            title,
            used_footnotes: std::cell::RefCell::new(Vec::new()),
        }
    }

    fn emit(&self) -> String {
        let mut out = String::new();
        out.push_str(&format!(
            "<html lang=\"{}\" dir=\"{}\">\n<head>\n<title>{}</title>\n</head>\n<body>\n",
            escape(&self.params.lang),
            self.params.direction.as_attr(),
            escape(&self.title),
        ));

        if let Some(body) = self.body {
            for child in body.children().filter(|n| n.is_element()) {
                match child.tag_name().name() {
                    "p" => self.emit_paragraph(child, &mut out),
                    "sectPr" => {}
                    other => log::debug!("pass 1 skipping body element {other}"),
                }
            }
        }

        self.emit_footnote_list(&mut out);
        out.push_str("</body>\n</html>\n");
        out
    }

    fn emit_paragraph(&self, p: Node, out: &mut String) {
        let style_id = wml(p, "pPr")
            .and_then(|ppr| wml(ppr, "pStyle"))
            .and_then(|s| s.attribute((WML_NS, "val")));
        let heading = style_id.and_then(|id| self.heading_styles.get(id));

        let tag = match heading {
            Some(level) => {
                // "Heading 1" lands on h{offset}; deeper styles follow.
                let mapped = level
                    .saturating_add(self.params.heading_offset)
                    .saturating_sub(1);
                format!("h{}", mapped.clamp(1, 6))
            }
            None => "p".to_string(),
        };

        let mut inline = String::new();
        self.emit_inline_children(p, &mut inline);

        out.push_str(&format!("<{tag}>{inline}</{tag}>\n"));
    }

    fn emit_inline_children(&self, parent: Node, out: &mut String) {
        for child in parent.children().filter(|n| n.is_element()) {
            let name = child.tag_name().name();
            let ns = child.tag_name().namespace();
            match (ns, name) {
                (Some(WML_NS), "r") => self.emit_run(child, out),
                (Some(WML_NS), "hyperlink") => self.emit_hyperlink(child, out),
                (Some(MATH_NS), "oMath") => self.emit_math(child, out),
                (Some(MATH_NS), "oMathPara") => self.emit_inline_children(child, out),
                (Some(WML_NS), "pPr") => {}
                _ => {}
            }
        }
    }

    fn emit_hyperlink(&self, link: Node, out: &mut String) {
        let href = link
            .attribute((REL_NS, "id"))
            .and_then(|id| self.rels.get(id).cloned())
            .or_else(|| link.attribute((WML_NS, "anchor")).map(|a| format!("#{a}")));

        match href {
            Some(href) => {
                out.push_str(&format!("<a href=\"{}\">", escape(&href)));
                self.emit_inline_children(link, out);
                out.push_str("</a>");
            }
            None => self.emit_inline_children(link, out),
        }
    }

    fn emit_run(&self, run: Node, out: &mut String) {
        let rpr = wml(run, "rPr");
        let bold = rpr.and_then(|p| wml_flag(p, "b")).unwrap_or(false);
        let italic = rpr.and_then(|p| wml_flag(p, "i")).unwrap_or(false);
        let underline = rpr
            .and_then(|p| wml(p, "u"))
            .map(|u| u.attribute((WML_NS, "val")) != Some("none"))
            .unwrap_or(false);
        let vert = rpr
            .and_then(|p| wml(p, "vertAlign"))
            .and_then(|v| v.attribute((WML_NS, "val")));

        let mut open = String::new();
        let mut close = String::new();
        for (on, tag) in [
            (bold, "strong"),
            (italic, "em"),
            (underline, "u"),
            (vert == Some("superscript"), "sup"),
            (vert == Some("subscript"), "sub"),
        ] {
            if on {
                open.push_str(&format!("<{tag}>"));
                close.insert_str(0, &format!("</{tag}>"));
            }
        }

        let mut text = String::new();
        for child in run.children().filter(|n| n.is_element()) {
            match child.tag_name().name() {
                "t" => {
                    if let Some(t) = child.text() {
                        text.push_str(&escape(t));
                    }
                }
                "br" => text.push_str("<br/>"),
                "tab" => text.push(' '),
                "footnoteReference" => {
                    if let Some(id) = child.attribute((WML_NS, "id")) {
                        self.used_footnotes.borrow_mut().push(id.to_string());
                        text.push_str(&format!(
                            "<a href=\"#footnote-{id}\" id=\"footnoteref-{id}\"><sup>{id}</sup></a>"
                        ));
                    }
                }
                "drawing" | "object" | "pict" => self.emit_image(child, &mut text),
                _ => {}
            }
        }

        if text.is_empty() {
            return;
        }
        out.push_str(&open);
        out.push_str(&text);
        out.push_str(&close);
    }

    fn emit_image(&self, drawing: Node, out: &mut String) {
        let Some(blip) = drawing
            .descendants()
            .find(|n| n.has_tag_name((DML_NS, "blip")))
        else {
            return;
        };
        let Some(target) = blip
            .attribute((REL_NS, "embed"))
            .and_then(|rid| self.rels.get(rid))
        else {
            return;
        };

        let alt = drawing
            .descendants()
            .find(|n| n.tag_name().name() == "docPr")
            .and_then(|d| d.attribute("descr").or_else(|| d.attribute("name")))
            .unwrap_or("");

        // Only a job running under this crate's own identity rewrites image
        // references to the resolved draft-storage URL; any other identity
        // keeps the package-relative path.
        let src = if self.params.plugin_tag == crate::PLUGIN_TAG {
            self.images
                .get(target.as_str())
                .map(|i| i.url.clone())
                .unwrap_or_else(|| target.clone())
        } else {
            target.clone()
        };

        out.push_str(&format!(
            "<img src=\"{}\" alt=\"{}\"/>",
            escape(&src),
            escape(alt)
        ));
    }

    fn emit_math(&self, omath: Node, out: &mut String) {
        out.push_str("<mml:math xmlns:mml=\"http://www.w3.org/1998/Math/MathML\"><mml:mrow>");
        for run in omath
            .descendants()
            .filter(|n| n.has_tag_name((MATH_NS, "r")))
        {
            for t in run.descendants().filter(|n| n.has_tag_name((MATH_NS, "t"))) {
                if let Some(text) = t.text() {
                    emit_math_tokens(text, out);
                }
            }
        }
        out.push_str("</mml:mrow></mml:math>");
    }

    fn emit_footnote_list(&self, out: &mut String) {
        let used = self.used_footnotes.borrow();
        if used.is_empty() {
            return;
        }
        out.push_str("<div class=\"footnotes\">\n<ol>\n");
        for (id, node) in &self.footnotes {
            if !used.contains(id) {
                continue;
            }
            out.push_str(&format!("<li id=\"footnote-{id}\">"));
            for p in node.children().filter(|n| n.has_tag_name((WML_NS, "p"))) {
                let mut inline = String::new();
                self.emit_inline_children(p, &mut inline);
                out.push_str(&inline);
            }
            out.push_str("</li>\n");
        }
        out.push_str("</ol>\n</div>\n");
    }
}

/// Tokenize plain math text into mn/mo/mi elements.
fn emit_math_tokens(text: &str, out: &mut String) {
    for ch in text.chars() {
        if ch.is_whitespace() {
            continue;
        }
        if ch.is_ascii_digit() {
            out.push_str(&format!("<mml:mn>{ch}</mml:mn>"));
        } else if "+-=*/()<>,.".contains(ch) {
            out.push_str(&format!("<mml:mo>{}</mml:mo>", escape(&ch.to_string())));
        } else {
            out.push_str(&format!(
                "<mml:mi mathvariant=\"normal\">{}</mml:mi>",
                escape(&ch.to_string())
            ));
        }
    }
}

/// Heading level of a style, from its name ("heading 2") or outline level.
fn style_heading_level(style: Node) -> Option<u8> {
    let by_name = wml(style, "name")
        .and_then(|n| n.attribute((WML_NS, "val")))
        .and_then(|name| {
            let lower = name.to_ascii_lowercase();
            lower
                .strip_prefix("heading ")
                .and_then(|rest| rest.parse::<u8>().ok())
        });
    if by_name.is_some() {
        return by_name;
    }

    wml(style, "pPr")
        .and_then(|ppr| wml(ppr, "outlineLvl"))
        .and_then(|lvl| lvl.attribute((WML_NS, "val")))
        .and_then(|v| v.parse::<u8>().ok())
        .map(|v| v + 1)
}

fn wml<'a, 'input>(node: Node<'a, 'input>, name: &str) -> Option<Node<'a, 'input>> {
    node.children()
        .find(|n| n.tag_name().name() == name && n.tag_name().namespace() == Some(WML_NS))
}

/// WML boolean toggle: present with no val, or val other than 0/false.
fn wml_flag(parent: Node, name: &str) -> Option<bool> {
    wml(parent, name).map(|n| {
        n.attribute((WML_NS, "val"))
            .map_or(true, |v| v != "0" && v != "false")
    })
}
