//! # word2pdf
//!
//! Converts Microsoft Word (.docx) assignment submissions into paginated
//! PDF documents.
//!
//! The core pipeline unpacks the .docx ZIP container, merges its XML parts
//! into a single intermediate document, runs two transform passes into
//! clean XHTML, and renders the result into a PDF. Several uploads combine
//! into one artifact, and a second entry point merges already-rendered PDF
//! uploads instead.
//!
//! ## Quick Start
//!
//! ```no_run
//! fn main() -> word2pdf::Result<()> {
//!     let data = std::fs::read("essay.docx")?;
//!
//!     // One-shot conversion
//!     let rendered = word2pdf::docx_to_pdf(&data)?;
//!     std::fs::write("essay.pdf", &rendered.bytes)?;
//!     println!("{} page(s)", rendered.page_count);
//!
//!     Ok(())
//! }
//! ```
//!
//! For the full submission workflow (draft areas, image storage, status
//! records) use [`pipeline::SubmissionPipeline`] with your own
//! [`pipeline::storage::BlobStorage`] and [`pipeline::storage::MetadataStore`]
//! implementations.
//!
//! ## Features
//!
//! - **WordprocessingML subset**: paragraphs, runs, heading styles,
//!   hyperlinks, footnotes, images, basic math markup
//! - **Two-pass transform**: structural conversion then markup cleanup,
//!   both injectable behind a trait
//! - **PDF combining**: merge pre-rendered uploads page-for-page with
//!   header version validation

pub mod archive;
pub mod detect;
pub mod error;
pub mod merge;
pub mod pdf;
pub mod pipeline;
pub mod postprocess;
pub mod transform;

// Re-export commonly used types
pub use archive::{MediaAsset, PartKind, SourceArchive};
pub use detect::PdfVersion;
pub use error::{Error, Result};
pub use merge::{MergedDocument, StoredImage};
pub use pdf::{PdfJob, RenderedPdf};
pub use pipeline::{
    CombineReport, ConversionOutcome, PipelineOptions, SubmissionContext, SubmissionPipeline,
};
pub use transform::{TextDirection, TransformEngine, TransformParams, TransformPass};

/// Identity tag of this converter.
///
/// Transform parameters carrying this tag serialize image references as
/// resolved storage URLs; any other tag keeps the archive-relative paths.
pub const PLUGIN_TAG: &str = "word2pdf";

/// Convert .docx bytes to an XHTML body fragment.
///
/// Runs the full transform chain without touching any storage, so embedded
/// images keep their archive-relative paths.
///
/// # Example
///
/// ```no_run
/// let data = std::fs::read("essay.docx").unwrap();
/// let body = word2pdf::docx_to_xhtml(&data).unwrap();
/// println!("{}", body);
/// ```
pub fn docx_to_xhtml(data: &[u8]) -> Result<String> {
    docx_to_xhtml_with_params(data, &TransformParams::default())
}

/// Convert .docx bytes to an XHTML body fragment with custom parameters.
pub fn docx_to_xhtml_with_params(data: &[u8], params: &TransformParams) -> Result<String> {
    let source = archive::extract(data)?;
    let merged = merge::merge(&source.parts, &[]);
    let engine = TransformEngine::new();
    let xhtml = engine.run_pass1(&merged, params)?;
    let xhtml = postprocess::strip_namespace_artifacts(&xhtml)?;
    let xhtml = engine.run_pass2(&xhtml, params)?;
    let xhtml = postprocess::strip_namespace_artifacts(&xhtml)?;
    let xhtml = postprocess::remap_math(&xhtml)?;
    Ok(postprocess::extract_body(&xhtml).to_string())
}

/// Convert .docx bytes straight to a rendered PDF.
///
/// The document title and author come from the archive's Dublin Core
/// properties when present. An upload with no visible text renders to a
/// valid zero-page document.
pub fn docx_to_pdf(data: &[u8]) -> Result<RenderedPdf> {
    docx_to_pdf_with_params(data, &TransformParams::default())
}

/// Convert .docx bytes to a rendered PDF with custom parameters.
pub fn docx_to_pdf_with_params(data: &[u8], params: &TransformParams) -> Result<RenderedPdf> {
    let source = archive::extract(data)?;

    let mut job = PdfJob::new();
    let (title, author) = pipeline::read_core_props(source.part(PartKind::CoreProps));
    if let Some(title) = title {
        job.set_title(title);
    }
    if let Some(author) = author {
        job.set_author(author);
    }

    let merged = merge::merge(&source.parts, &[]);
    let engine = TransformEngine::new();
    let xhtml = engine.run_pass1(&merged, params)?;
    let xhtml = postprocess::strip_namespace_artifacts(&xhtml)?;
    let xhtml = engine.run_pass2(&xhtml, params)?;
    let xhtml = postprocess::strip_namespace_artifacts(&xhtml)?;
    let xhtml = postprocess::remap_math(&xhtml)?;
    job.add_section(None, postprocess::extract_body(&xhtml))?;
    job.finalize()
}
