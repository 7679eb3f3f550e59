//! End-to-end submission orchestration.
//!
//! The pipeline owns the conversion sequence for one submission: list the
//! draft uploads, convert each through the transform passes, paginate into
//! a single PDF, and persist artifact plus record through the collaborator
//! traits in [`storage`]. A second entry point combines already-rendered
//! PDF uploads instead of converting Word files.

pub mod storage;

use chrono::Utc;

use crate::archive::{self, MediaAsset, PartKind};
use crate::detect::{self, PdfVersion};
use crate::error::{Error, Result};
use crate::merge::{self, MergedDocument, StoredImage};
use crate::pdf::{self, PdfJob};
use crate::postprocess;
use crate::transform::{TransformEngine, TransformParams};

use storage::{BlobStorage, MetadataStore, SubmissionRecord, SubmissionStatus};

/// Fixed name of the final combined artifact.
pub const FINAL_FILENAME: &str = "submission.pdf";
/// Default draft file area name.
pub const DRAFT_AREA: &str = "submission_word2pdf_draft";
/// Default final file area name.
pub const FINAL_AREA: &str = "submission_word2pdf_final";

/// Per-installation pipeline configuration.
#[derive(Debug, Clone)]
pub struct PipelineOptions {
    /// Area the student's uploads live in
    pub draft_area: String,
    /// Area the rendered artifact is written to
    pub final_area: String,
    /// Name of the rendered artifact inside the final area
    pub final_filename: String,
    /// Highest PDF header version the combine variant accepts
    pub version_ceiling: PdfVersion,
    /// Base URL stored image references resolve under
    pub url_base: String,
    /// Transform parameters applied to every converted file
    pub params: TransformParams,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            draft_area: DRAFT_AREA.to_string(),
            final_area: FINAL_AREA.to_string(),
            final_filename: FINAL_FILENAME.to_string(),
            version_ceiling: PdfVersion::DEFAULT_CEILING,
            url_base: "files".to_string(),
            params: TransformParams::default(),
        }
    }
}

impl PipelineOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_draft_area(mut self, area: impl Into<String>) -> Self {
        self.draft_area = area.into();
        self
    }

    pub fn with_final_area(mut self, area: impl Into<String>) -> Self {
        self.final_area = area.into();
        self
    }

    pub fn with_final_filename(mut self, filename: impl Into<String>) -> Self {
        self.final_filename = filename.into();
        self
    }

    pub fn with_version_ceiling(mut self, ceiling: PdfVersion) -> Self {
        self.version_ceiling = ceiling;
        self
    }

    pub fn with_url_base(mut self, base: impl Into<String>) -> Self {
        self.url_base = base.into();
        self
    }

    pub fn with_params(mut self, params: TransformParams) -> Self {
        self.params = params;
        self
    }
}

/// Identifies whose submission a pipeline run is working on.
#[derive(Debug, Clone, Copy)]
pub struct SubmissionContext {
    pub assignment_id: u64,
    pub submission_id: u64,
    /// Storage context extracted images are filed under
    pub context_id: u64,
}

/// Terminal result of a Word-file submission run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConversionOutcome {
    /// A final artifact was rendered and persisted
    Submitted { page_count: u32 },
    /// Nothing convertible or no visible text; no artifact exists
    Empty,
}

/// Why a draft file was left out of a combine run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    /// The file does not carry a readable PDF header
    NotPdf,
    /// The header version is above the configured ceiling
    VersionAboveCeiling(PdfVersion),
}

/// Outcome of [`SubmissionPipeline::combine_submission`], naming every
/// draft file and what became of it.
#[derive(Debug, Clone)]
pub struct CombineReport {
    /// Files merged into the artifact, in area order
    pub accepted: Vec<String>,
    /// Files skipped, with the reason recorded per file
    pub rejected: Vec<(String, RejectReason)>,
    /// Pages in the combined artifact
    pub page_count: u32,
}

/// Drives one submission through conversion and persistence.
pub struct SubmissionPipeline<B, M> {
    blobs: B,
    metadata: M,
    engine: TransformEngine,
    options: PipelineOptions,
}

impl<B: BlobStorage, M: MetadataStore> SubmissionPipeline<B, M> {
    /// Build a pipeline over the given collaborators with the built-in
    /// transform passes and default options.
    pub fn new(blobs: B, metadata: M) -> Self {
        Self {
            blobs,
            metadata,
            engine: TransformEngine::new(),
            options: PipelineOptions::default(),
        }
    }

    pub fn with_options(mut self, options: PipelineOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_engine(mut self, engine: TransformEngine) -> Self {
        self.engine = engine;
        self
    }

    pub fn blobs(&self) -> &B {
        &self.blobs
    }

    pub fn blobs_mut(&mut self) -> &mut B {
        &mut self.blobs
    }

    pub fn metadata(&self) -> &M {
        &self.metadata
    }

    /// Convert every draft .docx upload and persist the combined PDF.
    ///
    /// Draft files are taken in area order; non-.docx uploads are ignored.
    /// Any per-file conversion failure aborts the whole submission with
    /// [`Error::Transform`] naming the file, leaving the previous artifact
    /// in place. A run that produces no pages records the submission as
    /// empty rather than failing.
    pub fn submit_for_grading(&mut self, ctx: &SubmissionContext) -> Result<ConversionOutcome> {
        let drafts = self.blobs.list(&self.options.draft_area, ctx.submission_id)?;
        let sources: Vec<_> = drafts
            .into_iter()
            .filter(|f| is_word_upload(&f.filename))
            .collect();

        let workspace = tempfile::Builder::new()
            .prefix(&format!("word2pdf-{}-", ctx.submission_id))
            .tempdir()
            .map_err(|e| Error::TempFolder(e.to_string()))?;
        log::debug!(
            "submission {}: {} convertible upload(s), workspace {}",
            ctx.submission_id,
            sources.len(),
            workspace.path().display()
        );

        let mut job = PdfJob::new();
        let mut title_set = false;
        for (index, file) in sources.iter().enumerate() {
            let bytes = self
                .blobs
                .read(&self.options.draft_area, ctx.submission_id, &file.filename)?;
            // Conversion reads from the scratch copy; index naming keeps
            // upload names out of the filesystem path.
            let scratch = workspace.path().join(format!("{index:03}.docx"));
            std::fs::write(&scratch, &bytes).map_err(|e| Error::TempFolder(e.to_string()))?;
            let bytes = std::fs::read(&scratch).map_err(|e| Error::TempFolder(e.to_string()))?;

            let source = archive::extract(&bytes)?;
            let (title, creator) = read_core_props(source.part(PartKind::CoreProps));
            if let Some(title) = title {
                if !title_set {
                    job.set_title(title);
                    title_set = true;
                }
            }
            if let Some(creator) = creator {
                job.set_author(creator);
            }

            let images = self.store_images(ctx, &source.media)?;
            let merged = merge::merge(&source.parts, &images);
            let body = self
                .convert(&merged)
                .map_err(|e| fatal_for(&file.filename, e))?;
            job.add_section(Some(&file.filename), &body)
                .map_err(|e| fatal_for(&file.filename, e))?;
        }

        let rendered = job.finalize()?;

        self.blobs.delete(
            &self.options.final_area,
            ctx.submission_id,
            &self.options.final_filename,
        )?;

        let outcome = if rendered.page_count == 0 {
            log::info!("submission {}: no visible content, recorded empty", ctx.submission_id);
            ConversionOutcome::Empty
        } else {
            self.blobs.write(
                &self.options.final_area,
                ctx.submission_id,
                &self.options.final_filename,
                &rendered.bytes,
            )?;
            ConversionOutcome::Submitted {
                page_count: rendered.page_count,
            }
        };

        self.metadata.upsert(SubmissionRecord {
            assignment_id: ctx.assignment_id,
            submission_id: ctx.submission_id,
            page_count: rendered.page_count,
            status: match outcome {
                ConversionOutcome::Submitted { .. } => SubmissionStatus::Submitted,
                ConversionOutcome::Empty => SubmissionStatus::Empty,
            },
        })?;

        Ok(outcome)
    }

    /// Merge already-rendered PDF uploads into the final artifact.
    ///
    /// Unlike the Word path, a draft file that fails validation is skipped
    /// and recorded per file rather than failing the run.
    pub fn combine_submission(&mut self, ctx: &SubmissionContext) -> Result<CombineReport> {
        let drafts = self.blobs.list(&self.options.draft_area, ctx.submission_id)?;

        let mut accepted = Vec::new();
        let mut inputs = Vec::new();
        let mut rejected = Vec::new();
        for file in drafts {
            let bytes = self
                .blobs
                .read(&self.options.draft_area, ctx.submission_id, &file.filename)?;
            match detect::detect_version(&bytes) {
                Ok(version) if version > self.options.version_ceiling => {
                    log::warn!(
                        "skipping {}: version {} above ceiling {}",
                        file.filename,
                        version,
                        self.options.version_ceiling
                    );
                    rejected.push((file.filename, RejectReason::VersionAboveCeiling(version)));
                }
                Ok(_) => {
                    accepted.push(file.filename);
                    inputs.push(bytes);
                }
                Err(e) => {
                    log::warn!("skipping {}: {}", file.filename, e);
                    rejected.push((file.filename, RejectReason::NotPdf));
                }
            }
        }

        let rendered = pdf::combine(&inputs)?;

        self.blobs.delete(
            &self.options.final_area,
            ctx.submission_id,
            &self.options.final_filename,
        )?;
        let status = if rendered.page_count == 0 {
            SubmissionStatus::Empty
        } else {
            self.blobs.write(
                &self.options.final_area,
                ctx.submission_id,
                &self.options.final_filename,
                &rendered.bytes,
            )?;
            SubmissionStatus::Submitted
        };
        self.metadata.upsert(SubmissionRecord {
            assignment_id: ctx.assignment_id,
            submission_id: ctx.submission_id,
            page_count: rendered.page_count,
            status,
        })?;

        Ok(CombineReport {
            accepted,
            rejected,
            page_count: rendered.page_count,
        })
    }

    fn convert(&self, merged: &MergedDocument) -> Result<String> {
        let params = &self.options.params;
        let xhtml = self.engine.run_pass1(merged, params)?;
        let xhtml = postprocess::strip_namespace_artifacts(&xhtml)?;
        let xhtml = self.engine.run_pass2(&xhtml, params)?;
        let xhtml = postprocess::strip_namespace_artifacts(&xhtml)?;
        let xhtml = postprocess::remap_math(&xhtml)?;
        Ok(postprocess::extract_body(&xhtml).to_string())
    }

    fn store_images(
        &mut self,
        ctx: &SubmissionContext,
        media: &[MediaAsset],
    ) -> Result<Vec<StoredImage>> {
        let mut stored = Vec::with_capacity(media.len());
        for asset in media {
            let stored_name = self.unique_name(ctx.submission_id, asset);
            self.blobs.write(
                &self.options.draft_area,
                ctx.submission_id,
                &stored_name,
                &asset.bytes,
            )?;
            let url = format!(
                "{}/{}/{}/{}",
                self.options.url_base, self.options.draft_area, ctx.submission_id, stored_name
            );
            stored.push(StoredImage {
                original_name: asset.original_name.clone(),
                stored_name,
                context_id: ctx.context_id,
                item_id: ctx.submission_id,
                url,
            });
        }
        Ok(stored)
    }

    /// Pick a draft-area name for an extracted image that collides with
    /// nothing already stored, inserting a time-derived token when the
    /// original name is taken.
    fn unique_name(&self, submission_id: u64, asset: &MediaAsset) -> String {
        if !self
            .blobs
            .exists(&self.options.draft_area, submission_id, &asset.original_name)
        {
            return asset.original_name.clone();
        }
        let stem = match asset.original_name.rsplit_once('.') {
            Some((stem, _)) => stem,
            None => asset.original_name.as_str(),
        };
        let mut seed = Utc::now().timestamp_micros() as u64;
        loop {
            let candidate = format!("{stem}_{seed:x}.{}", asset.suffix);
            if !self
                .blobs
                .exists(&self.options.draft_area, submission_id, &candidate)
            {
                return candidate;
            }
            seed = seed.wrapping_add(1);
        }
    }
}

fn is_word_upload(filename: &str) -> bool {
    filename.to_ascii_lowercase().ends_with(".docx")
}

fn fatal_for(filename: &str, err: Error) -> Error {
    match err {
        e @ Error::Transform { .. } => e,
        e => Error::Transform {
            filename: filename.to_string(),
            detail: e.to_string(),
        },
    }
}

/// Pull title and creator out of the Dublin Core part, if present.
pub(crate) fn read_core_props(xml: Option<&str>) -> (Option<String>, Option<String>) {
    const DC_NS: &str = "http://purl.org/dc/elements/1.1/";
    let Some(xml) = xml else {
        return (None, None);
    };
    let doc = match roxmltree::Document::parse(xml) {
        Ok(doc) => doc,
        Err(e) => {
            log::warn!("unreadable core properties: {e}");
            return (None, None);
        }
    };
    let text_of = |local: &str| {
        doc.descendants()
            .find(|n| n.tag_name() == (DC_NS, local).into())
            .and_then(|n| n.text())
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(str::to_string)
    };
    (text_of("title"), text_of("creator"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_word_upload_gate() {
        assert!(is_word_upload("essay.docx"));
        assert!(is_word_upload("ESSAY.DOCX"));
        assert!(!is_word_upload("essay.doc"));
        assert!(!is_word_upload("essay.pdf"));
        assert!(!is_word_upload("docx"));
    }

    #[test]
    fn test_fatal_for_wraps_once() {
        let wrapped = fatal_for("a.docx", Error::Xml("broken".into()));
        match &wrapped {
            Error::Transform { filename, .. } => assert_eq!(filename, "a.docx"),
            other => panic!("unexpected {other:?}"),
        }
        match fatal_for("b.docx", wrapped) {
            Error::Transform { filename, .. } => assert_eq!(filename, "a.docx"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_read_core_props() {
        let xml = concat!(
            "<cp:coreProperties ",
            "xmlns:cp=\"http://schemas.openxmlformats.org/package/2006/metadata/core-properties\" ",
            "xmlns:dc=\"http://purl.org/dc/elements/1.1/\">",
            "<dc:title>My Essay</dc:title>",
            "<dc:creator>A. Student</dc:creator>",
            "</cp:coreProperties>",
        );
        let (title, creator) = read_core_props(Some(xml));
        assert_eq!(title.as_deref(), Some("My Essay"));
        assert_eq!(creator.as_deref(), Some("A. Student"));
        assert_eq!(read_core_props(None), (None, None));
    }

    #[test]
    fn test_default_options() {
        let options = PipelineOptions::default();
        assert_eq!(options.draft_area, "submission_word2pdf_draft");
        assert_eq!(options.final_area, "submission_word2pdf_final");
        assert_eq!(options.final_filename, "submission.pdf");
        assert_eq!(options.version_ceiling, PdfVersion::DEFAULT_CEILING);
    }
}
