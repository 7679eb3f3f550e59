//! Shared fixtures for the integration suite.
#![allow(dead_code)]

use std::io::{Cursor, Write};

use zip::write::SimpleFileOptions;
use zip::ZipWriter;

const W_NS: &str = "http://schemas.openxmlformats.org/wordprocessingml/2006/main";
const A_NS: &str = "http://schemas.openxmlformats.org/drawingml/2006/main";
const R_NS: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";
const REL_NS: &str = "http://schemas.openxmlformats.org/package/2006/relationships";
const CP_NS: &str = "http://schemas.openxmlformats.org/package/2006/metadata/core-properties";
const DC_NS: &str = "http://purl.org/dc/elements/1.1/";

/// Builds synthetic .docx archives entry by entry.
pub struct DocxBuilder {
    body: String,
    core_props: Option<String>,
    styles: Option<String>,
    rels: Vec<(String, String, String)>,
    media: Vec<(String, Vec<u8>)>,
}

impl DocxBuilder {
    pub fn new() -> Self {
        Self {
            body: String::new(),
            core_props: None,
            styles: None,
            rels: Vec::new(),
            media: Vec::new(),
        }
    }

    /// Append a plain paragraph.
    pub fn paragraph(mut self, text: &str) -> Self {
        self.body
            .push_str(&format!("<w:p><w:r><w:t>{text}</w:t></w:r></w:p>"));
        self
    }

    /// Append raw WordprocessingML into the body.
    pub fn raw_body(mut self, xml: &str) -> Self {
        self.body.push_str(xml);
        self
    }

    /// Set Dublin Core title and creator.
    pub fn properties(mut self, title: &str, creator: &str) -> Self {
        self.core_props = Some(format!(
            "<cp:coreProperties xmlns:cp=\"{CP_NS}\" xmlns:dc=\"{DC_NS}\">\
             <dc:title>{title}</dc:title><dc:creator>{creator}</dc:creator>\
             </cp:coreProperties>"
        ));
        self
    }

    /// Declare a heading style mapped by name.
    pub fn heading_style(mut self, style_id: &str, name: &str) -> Self {
        let styles = self.styles.get_or_insert_with(String::new);
        styles.push_str(&format!(
            "<w:style w:type=\"paragraph\" w:styleId=\"{style_id}\">\
             <w:name w:val=\"{name}\"/></w:style>"
        ));
        self
    }

    /// Append a paragraph styled with the given style id.
    pub fn styled_paragraph(mut self, style_id: &str, text: &str) -> Self {
        self.body.push_str(&format!(
            "<w:p><w:pPr><w:pStyle w:val=\"{style_id}\"/></w:pPr>\
             <w:r><w:t>{text}</w:t></w:r></w:p>"
        ));
        self
    }

    /// Embed an image: media entry, relationship, and a drawing paragraph.
    pub fn image(mut self, rel_id: &str, name: &str, bytes: &[u8]) -> Self {
        self.rels.push((
            rel_id.to_string(),
            "image".to_string(),
            format!("media/{name}"),
        ));
        self.media.push((name.to_string(), bytes.to_vec()));
        self.body.push_str(&format!(
            "<w:p><w:r><w:drawing>\
             <a:blip xmlns:a=\"{A_NS}\" xmlns:r=\"{R_NS}\" r:embed=\"{rel_id}\"/>\
             </w:drawing></w:r></w:p>"
        ));
        self
    }

    /// Serialize to .docx bytes.
    pub fn build(self) -> Vec<u8> {
        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        let options = SimpleFileOptions::default();

        let document = format!(
            "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\
             <w:document xmlns:w=\"{W_NS}\"><w:body>{}</w:body></w:document>",
            self.body
        );
        zip.start_file("word/document.xml", options).unwrap();
        zip.write_all(document.as_bytes()).unwrap();

        if let Some(core) = &self.core_props {
            zip.start_file("docProps/core.xml", options).unwrap();
            zip.write_all(core.as_bytes()).unwrap();
        }
        if let Some(styles) = &self.styles {
            zip.start_file("word/styles.xml", options).unwrap();
            zip.write_all(format!("<w:styles xmlns:w=\"{W_NS}\">{styles}</w:styles>").as_bytes())
                .unwrap();
        }
        if !self.rels.is_empty() {
            let mut rels = format!("<Relationships xmlns=\"{REL_NS}\">");
            for (id, kind, target) in &self.rels {
                rels.push_str(&format!(
                    "<Relationship Id=\"{id}\" Type=\"{kind}\" Target=\"{target}\"/>"
                ));
            }
            rels.push_str("</Relationships>");
            zip.start_file("word/_rels/document.xml.rels", options)
                .unwrap();
            zip.write_all(rels.as_bytes()).unwrap();
        }
        for (name, bytes) in &self.media {
            zip.start_file(format!("word/media/{name}"), options)
                .unwrap();
            zip.write_all(bytes).unwrap();
        }

        zip.finish().unwrap().into_inner()
    }
}

/// A single-page PDF with the given text, for combine fixtures.
pub fn one_page_pdf(text: &str) -> Vec<u8> {
    let mut job = word2pdf::PdfJob::new();
    job.add_section(None, &format!("<p>{text}</p>")).unwrap();
    job.finalize().unwrap().bytes
}
