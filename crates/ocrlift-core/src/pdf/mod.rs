//! PDF renderer adapter.

mod renderer;

pub use renderer::{LopdfDocument, LopdfRenderer, MAX_RENDER_DIMENSION};
#[cfg(test)]
pub(crate) use renderer::tests::{build_pdf, build_text_pdf};

use crate::error::PdfError;
use image::DynamicImage;

/// Result type for PDF operations.
pub type Result<T> = std::result::Result<T, PdfError>;

/// Opens PDF documents.
pub trait PdfRenderer {
    /// A loaded document.
    type Document: PdfDocument;

    /// Parse a PDF from bytes. Fails with [`PdfError::Load`] or
    /// [`PdfError::Encrypted`] when the document cannot be read.
    fn load(&self, data: &[u8]) -> Result<Self::Document>;
}

/// A loaded PDF whose pages can be rasterized or read as text.
pub trait PdfDocument {
    /// Number of pages, possibly zero.
    fn page_count(&self) -> u32;

    /// Render a 1-indexed page as an image, `scale` times its size in points.
    /// Fails with [`PdfError::NoRasterContent`] when there is nothing to draw.
    fn render_page(&self, page: u32, scale: f32) -> Result<DynamicImage>;

    /// Text embedded in a 1-indexed page, or `None` when it has none.
    fn page_text(&self, _page: u32) -> Result<Option<String>> {
        Ok(None)
    }
}
