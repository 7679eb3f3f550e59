//! Paginating converted XHTML into PDF output and combining PDFs.

mod combine;
mod flatten;
mod writer;

pub use combine::combine;
pub use flatten::{flatten_fragment, Line, LineKind};
pub use writer::{PdfJob, RenderedPdf};
