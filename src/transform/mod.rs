//! Two-pass transformation of merged WordprocessingML into clean XHTML.
//!
//! Pass 1 maps document structure (paragraphs, runs, styles, footnotes,
//! images, basic math) into XHTML; pass 2 tidies the result. Passes are
//! injected capabilities: constructing an engine without the required
//! passes is an error, there is no runtime feature probe.

mod pass1;
mod pass2;

pub use pass1::StructuralPass;
pub use pass2::CleanupPass;

use crate::error::{Error, Result};
use crate::merge::MergedDocument;

/// Name of the structural WordML→XHTML pass.
pub const PASS1_NAME: &str = "wordml2xhtml-pass1";
/// Name of the cleanup pass.
pub const PASS2_NAME: &str = "wordml2xhtml-pass2";

/// Text direction of the generated document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TextDirection {
    /// Left to right
    #[default]
    Ltr,
    /// Right to left
    Rtl,
}

impl TextDirection {
    /// Value for the XHTML `dir` attribute.
    pub fn as_attr(&self) -> &'static str {
        match self {
            TextDirection::Ltr => "ltr",
            TextDirection::Rtl => "rtl",
        }
    }
}

/// Parameters shared by both transform passes, immutable for one job.
#[derive(Debug, Clone)]
pub struct TransformParams {
    /// Language code for the generated `lang` attribute
    pub lang: String,
    /// Text direction for the generated `dir` attribute
    pub direction: TextDirection,
    /// Heading level the "Heading 1" style maps to (clamped to 1..=6)
    pub heading_offset: u8,
    /// Identity tag controlling how image references serialize: a job run
    /// under this crate's own tag emits resolved storage URLs, any other
    /// tag keeps the original relative paths.
    pub plugin_tag: String,
    /// Emit payload-snippet debug logging from the passes
    pub verbose: bool,
}

impl Default for TransformParams {
    fn default() -> Self {
        Self {
            lang: "en".to_string(),
            direction: TextDirection::Ltr,
            heading_offset: 3,
            plugin_tag: crate::PLUGIN_TAG.to_string(),
            verbose: false,
        }
    }
}

impl TransformParams {
    /// Create parameters with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the language code.
    pub fn with_lang(mut self, lang: impl Into<String>) -> Self {
        self.lang = lang.into();
        self
    }

    /// Set the text direction.
    pub fn with_direction(mut self, direction: TextDirection) -> Self {
        self.direction = direction;
        self
    }

    /// Set the level "Heading 1" maps to.
    pub fn with_heading_offset(mut self, offset: u8) -> Self {
        self.heading_offset = offset;
        self
    }

    /// Set the plugin identity tag.
    pub fn with_plugin_tag(mut self, tag: impl Into<String>) -> Self {
        self.plugin_tag = tag.into();
        self
    }

    /// Enable verbose pass logging.
    pub fn verbose(mut self) -> Self {
        self.verbose = true;
        self
    }
}

/// One transformation stage.
///
/// Implementations must be pure functions of `(input, params)`: no side
/// effects, deterministic, safe to re-run on retry.
pub trait TransformPass: Send + Sync {
    /// Stable name the engine resolves the pass by.
    fn name(&self) -> &'static str;

    /// Transform the input document.
    fn apply(&self, input: &str, params: &TransformParams) -> Result<String>;
}

/// The two-stage transform engine.
pub struct TransformEngine {
    pass1: Box<dyn TransformPass>,
    pass2: Box<dyn TransformPass>,
}

impl TransformEngine {
    /// Build an engine with the built-in passes.
    pub fn new() -> Self {
        Self {
            pass1: Box::new(StructuralPass),
            pass2: Box::new(CleanupPass),
        }
    }

    /// Build an engine from injected passes.
    ///
    /// Fails with [`Error::MissingToolchain`] when no passes are given and
    /// [`Error::MissingStylesheet`] when a required pass name is absent.
    pub fn from_passes(passes: Vec<Box<dyn TransformPass>>) -> Result<Self> {
        if passes.is_empty() {
            return Err(Error::MissingToolchain("no transform passes injected".into()));
        }
        let mut pass1 = None;
        let mut pass2 = None;
        for pass in passes {
            match pass.name() {
                PASS1_NAME => pass1 = Some(pass),
                PASS2_NAME => pass2 = Some(pass),
                other => log::warn!("ignoring unknown transform pass {other}"),
            }
        }
        Ok(Self {
            pass1: pass1.ok_or_else(|| Error::MissingStylesheet(PASS1_NAME.into()))?,
            pass2: pass2.ok_or_else(|| Error::MissingStylesheet(PASS2_NAME.into()))?,
        })
    }

    /// Run the structural pass over a merged document.
    pub fn run_pass1(&self, merged: &MergedDocument, params: &TransformParams) -> Result<String> {
        let output = self.pass1.apply(merged.as_str(), params)?;
        if params.verbose {
            log::debug!("pass 1 output head: {}", snippet(&output));
        }
        Ok(output)
    }

    /// Run the cleanup pass over pass-1 XHTML.
    pub fn run_pass2(&self, xhtml: &str, params: &TransformParams) -> Result<String> {
        let output = self.pass2.apply(xhtml, params)?;
        if params.verbose {
            log::debug!("pass 2 output head: {}", snippet(&output));
        }
        Ok(output)
    }
}

impl Default for TransformEngine {
    fn default() -> Self {
        Self::new()
    }
}

fn snippet(s: &str) -> String {
    let head: String = s.chars().take(200).collect();
    head.replace('\n', " ")
}
