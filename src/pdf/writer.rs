//! PDF generation over lopdf.
//!
//! A [`PdfJob`] collects converted sections and paginates them into a single
//! document. Each section starts on a fresh page; a job with no sections
//! still finalizes into a valid document with zero pages.

use chrono::Utc;
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream};

use crate::error::Result;
use crate::pdf::flatten::{flatten_fragment, Line, LineKind};

const PAGE_WIDTH: f32 = 595.0;
const PAGE_HEIGHT: f32 = 842.0;
const MARGIN: f32 = 72.0;
const BODY_SIZE: f32 = 11.0;
const LEADING: f32 = 1.35;

/// A finished document.
#[derive(Debug, Clone)]
pub struct RenderedPdf {
    /// Number of pages written
    pub page_count: u32,
    /// Serialized PDF bytes
    pub bytes: Vec<u8>,
}

/// Accumulates sections and renders them into one PDF.
#[derive(Debug, Default)]
pub struct PdfJob {
    title: Option<String>,
    author: Option<String>,
    sections: Vec<Vec<Line>>,
}

impl PdfJob {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_author(mut self, author: impl Into<String>) -> Self {
        self.author = Some(author.into());
        self
    }

    pub fn set_title(&mut self, title: impl Into<String>) {
        self.title = Some(title.into());
    }

    pub fn set_author(&mut self, author: impl Into<String>) {
        self.author = Some(author.into());
    }

    /// Queue one converted fragment as a section.
    ///
    /// The heading, when present, is drawn above the section body. A
    /// fragment with no visible text is dropped entirely and contributes no
    /// pages.
    pub fn add_section(&mut self, heading: Option<&str>, fragment: &str) -> Result<()> {
        let body = flatten_fragment(fragment)?;
        if body.is_empty() {
            log::debug!("skipping section with no visible text");
            return Ok(());
        }
        let mut lines = Vec::with_capacity(body.len() + 1);
        if let Some(h) = heading {
            let h = h.trim();
            if !h.is_empty() {
                lines.push(Line::new(h, LineKind::SectionHeading));
            }
        }
        lines.extend(body);
        self.sections.push(lines);
        Ok(())
    }

    /// Paginate everything queued so far and serialize the document.
    pub fn finalize(self) -> Result<RenderedPdf> {
        let mut doc = Document::with_version("1.4");
        let pages_id = doc.new_object_id();

        let font_regular = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Helvetica",
            "Encoding" => "WinAnsiEncoding",
        });
        let font_bold = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Helvetica-Bold",
            "Encoding" => "WinAnsiEncoding",
        });
        let resources = doc.add_object(dictionary! {
            "Font" => dictionary! {
                "F1" => font_regular,
                "F2" => font_bold,
            },
        });

        let mut page_ids: Vec<Object> = Vec::new();
        for section in &self.sections {
            for ops in paginate(section) {
                let content = Content { operations: ops };
                let stream_id =
                    doc.add_object(Stream::new(dictionary! {}, content.encode()?));
                let page_id = doc.add_object(dictionary! {
                    "Type" => "Page",
                    "Parent" => pages_id,
                    "Contents" => stream_id,
                });
                page_ids.push(page_id.into());
            }
        }

        let page_count = page_ids.len() as u32;
        let pages = dictionary! {
            "Type" => "Pages",
            "Kids" => page_ids,
            "Count" => page_count as i64,
            "Resources" => resources,
            "MediaBox" => vec![0.into(), 0.into(), PAGE_WIDTH.into(), PAGE_HEIGHT.into()],
        };
        doc.objects.insert(pages_id, Object::Dictionary(pages));

        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);

        let mut info = dictionary! {
            "Producer" => Object::string_literal("word2pdf"),
            "CreationDate" => Object::string_literal(
                Utc::now().format("D:%Y%m%d%H%M%SZ").to_string(),
            ),
        };
        if let Some(title) = &self.title {
            info.set("Title", Object::string_literal(title.as_str()));
        }
        if let Some(author) = &self.author {
            info.set("Author", Object::string_literal(author.as_str()));
        }
        let info_id = doc.add_object(info);
        doc.trailer.set("Info", info_id);

        doc.compress();
        let mut bytes = Vec::new();
        doc.save_to(&mut bytes)?;

        log::info!("rendered {} page(s)", page_count);
        Ok(RenderedPdf { page_count, bytes })
    }
}

struct TextStyle {
    font: &'static str,
    size: f32,
}

fn style_of(kind: LineKind) -> TextStyle {
    match kind {
        LineKind::SectionHeading => TextStyle {
            font: "F2",
            size: 16.0,
        },
        LineKind::Heading(level) => TextStyle {
            font: "F2",
            size: (16.0 - f32::from(level.min(6))).max(BODY_SIZE),
        },
        LineKind::Body => TextStyle {
            font: "F1",
            size: BODY_SIZE,
        },
    }
}

/// Break a section's lines into per-page operation lists.
fn paginate(lines: &[Line]) -> Vec<Vec<Operation>> {
    let usable_width = PAGE_WIDTH - 2.0 * MARGIN;
    let mut pages: Vec<Vec<Operation>> = Vec::new();
    let mut ops: Vec<Operation> = Vec::new();
    let mut cursor_y = PAGE_HEIGHT - MARGIN;

    for line in lines {
        let style = style_of(line.kind);
        let step = style.size * LEADING;
        for piece in wrap(&line.text, style.size, usable_width) {
            if cursor_y - step < MARGIN {
                if !ops.is_empty() {
                    pages.push(std::mem::take(&mut ops));
                }
                cursor_y = PAGE_HEIGHT - MARGIN;
            }
            cursor_y -= step;
            ops.push(Operation::new("BT", vec![]));
            ops.push(Operation::new(
                "Tf",
                vec![style.font.into(), style.size.into()],
            ));
            ops.push(Operation::new("Td", vec![MARGIN.into(), cursor_y.into()]));
            ops.push(Operation::new(
                "Tj",
                vec![Object::string_literal(sanitize(&piece))],
            ));
            ops.push(Operation::new("ET", vec![]));
        }
        // blank half-line between blocks
        cursor_y -= step * 0.4;
    }
    if !ops.is_empty() {
        pages.push(ops);
    }
    pages
}

/// Greedy word wrap using an average character width approximation.
fn wrap(text: &str, size: f32, max_width: f32) -> Vec<String> {
    let char_width = size * 0.5;
    let max_chars = (max_width / char_width).floor().max(1.0) as usize;

    let mut out = Vec::new();
    let mut current = String::new();
    for word in text.split_whitespace() {
        let needed = if current.is_empty() {
            word.chars().count()
        } else {
            current.chars().count() + 1 + word.chars().count()
        };
        if needed > max_chars && !current.is_empty() {
            out.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(word);
    }
    if !current.is_empty() {
        out.push(current);
    }
    out
}

/// Reduce text to what WinAnsi can draw, substituting '?' elsewhere.
fn sanitize(text: &str) -> String {
    text.chars()
        .map(|c| {
            let code = c as u32;
            if (0x20..0x7f).contains(&code) || (0xa0..0x100).contains(&code) {
                c
            } else {
                '?'
            }
        })
        .collect()
}
