//! Integration tests for the docx to XHTML conversion chain.

mod common;

use common::DocxBuilder;
use word2pdf::{docx_to_xhtml, docx_to_xhtml_with_params, TextDirection, TransformParams};

#[test]
fn test_hello_body_fragment() {
    let docx = DocxBuilder::new().paragraph("Hello world").build();
    let body = docx_to_xhtml(&docx).unwrap();
    assert!(body.contains("<p>Hello world</p>"));
    // extract_body removed the document shell
    assert!(!body.contains("<html"));
    assert!(!body.contains("</body>"));
}

#[test]
fn test_heading_styles_respect_offset() {
    let docx = DocxBuilder::new()
        .heading_style("Heading1", "heading 1")
        .styled_paragraph("Heading1", "Chapter")
        .paragraph("text")
        .build();

    let body = docx_to_xhtml(&docx).unwrap();
    assert!(body.contains("<h3>Chapter</h3>"));

    let params = TransformParams::new().with_heading_offset(1);
    let body = docx_to_xhtml_with_params(&docx, &params).unwrap();
    assert!(body.contains("<h1>Chapter</h1>"));
}

#[test]
fn test_formatting_survives_cleanup() {
    let docx = DocxBuilder::new()
        .raw_body(
            "<w:p><w:r><w:rPr><w:b/></w:rPr><w:t>bold</w:t></w:r>\
             <w:r><w:t xml:space=\"preserve\"> and plain</w:t></w:r></w:p>",
        )
        .build();
    let body = docx_to_xhtml(&docx).unwrap();
    assert!(body.contains("<strong>bold</strong>"));
    assert!(body.contains("plain"));
}

#[test]
fn test_empty_paragraphs_are_dropped() {
    let docx = DocxBuilder::new()
        .raw_body("<w:p/><w:p/>")
        .paragraph("only this")
        .build();
    let body = docx_to_xhtml(&docx).unwrap();
    assert!(body.contains("<p>only this</p>"));
    assert!(!body.contains("<p></p>"));
    assert!(!body.contains("<p/>"));
}

#[test]
fn test_math_loses_prefix_and_gains_namespace() {
    let docx = DocxBuilder::new()
        .raw_body(
            "<w:p><m:oMath xmlns:m=\"http://schemas.openxmlformats.org/officeDocument/2006/math\">\
             <m:r><m:t>x+1</m:t></m:r></m:oMath></w:p>",
        )
        .build();
    let body = docx_to_xhtml(&docx).unwrap();
    assert!(body.contains("<math xmlns=\"http://www.w3.org/1998/Math/MathML\">"));
    assert!(!body.contains("mml:"));
    assert!(!body.contains("mathvariant"));
    assert!(body.contains("<mo>+</mo>"));
}

#[test]
fn test_footnote_anchors_and_list() {
    let docx = DocxBuilder::new()
        .raw_body("<w:p><w:r><w:t>text</w:t></w:r><w:r><w:footnoteReference w:id=\"1\"/></w:r></w:p>")
        .build();
    // Footnote part is absent, so the reference anchor renders without a list.
    let body = docx_to_xhtml(&docx).unwrap();
    assert!(body.contains("<a href=\"#footnote-1\" id=\"footnoteref-1\">"));
}

#[test]
fn test_rtl_direction_on_shell_not_body() {
    let docx = DocxBuilder::new().paragraph("one").build();
    let params = TransformParams::new().with_direction(TextDirection::Rtl);
    // The dir attribute lives on <html>, which extract_body strips away.
    let body = docx_to_xhtml_with_params(&docx, &params).unwrap();
    assert!(!body.contains("dir=\"rtl\""));
    assert!(body.contains("<p>one</p>"));
}

#[test]
fn test_no_namespace_artifacts_left() {
    let docx = DocxBuilder::new().paragraph("clean").build();
    let body = docx_to_xhtml(&docx).unwrap();
    assert!(!body.contains("xmlns=\"\""));
    assert!(!body.contains("xmlns=\"http://www.w3.org/1999/xhtml\""));
}
