//! Page sources: where the images a job recognizes come from.

use image::DynamicImage;

use super::JobKind;
use crate::error::{JobError, OcrError, PdfError};
use crate::pdf::PdfDocument;

/// What a page source hands the pipeline for one page.
#[derive(Debug)]
pub enum PageContent {
    /// An image to run through OCR.
    Image(DynamicImage),
    /// Text the page already carries; used without OCR.
    Text(String),
}

/// Supplies the pages a job recognizes, in order.
pub trait PageSource {
    /// Which pipeline this source belongs to.
    fn kind(&self) -> JobKind;

    /// Number of pages to recognize.
    fn page_count(&self) -> u32;

    /// Produce the content of a 1-indexed page.
    fn page(&self, page: u32) -> Result<PageContent, JobError>;

    /// Text appended after each page's recognized text.
    fn page_terminator(&self) -> &str;
}

/// A single encoded image (PNG, JPEG, ...).
pub struct SingleImage<'a> {
    bytes: &'a [u8],
}

impl<'a> SingleImage<'a> {
    pub fn new(bytes: &'a [u8]) -> Self {
        Self { bytes }
    }
}

impl PageSource for SingleImage<'_> {
    fn kind(&self) -> JobKind {
        JobKind::Image
    }

    fn page_count(&self) -> u32 {
        1
    }

    fn page(&self, _page: u32) -> Result<PageContent, JobError> {
        image::load_from_memory(self.bytes)
            .map(PageContent::Image)
            .map_err(|e| JobError::Recognition(OcrError::InvalidImage(e.to_string())))
    }

    fn page_terminator(&self) -> &str {
        ""
    }
}

/// The pages of a loaded PDF, rendered on demand.
///
/// A page without raster content falls back to its embedded text; a page
/// with neither fails.
pub struct RenderedPdf<D> {
    document: D,
    scale: f32,
    separator: String,
}

impl<D: PdfDocument> RenderedPdf<D> {
    pub fn new(document: D, scale: f32, separator: impl Into<String>) -> Self {
        Self {
            document,
            scale,
            separator: separator.into(),
        }
    }
}

impl<D: PdfDocument> PageSource for RenderedPdf<D> {
    fn kind(&self) -> JobKind {
        JobKind::Pdf
    }

    fn page_count(&self) -> u32 {
        self.document.page_count()
    }

    fn page(&self, page: u32) -> Result<PageContent, JobError> {
        let render_error = |source| JobError::PageRender { page, source };

        match self.document.render_page(page, self.scale) {
            Ok(image) => Ok(PageContent::Image(image)),
            Err(PdfError::NoRasterContent(_)) => match self.document.page_text(page) {
                Ok(Some(text)) => Ok(PageContent::Text(text)),
                Ok(None) => Err(render_error(PdfError::NoRasterContent(page))),
                Err(source) => Err(render_error(source)),
            },
            Err(source) => Err(render_error(source)),
        }
    }

    fn page_terminator(&self) -> &str {
        &self.separator
    }
}

/// Concatenates per-page text in page order.
#[derive(Debug, Clone, Default)]
pub struct PageAccumulator {
    text: String,
    terminator: String,
    pages: u32,
}

impl PageAccumulator {
    pub fn new(terminator: impl Into<String>) -> Self {
        Self {
            text: String::new(),
            terminator: terminator.into(),
            pages: 0,
        }
    }

    pub fn push_page(&mut self, text: &str) {
        self.text.push_str(text);
        self.text.push_str(&self.terminator);
        self.pages += 1;
    }

    pub fn pages(&self) -> u32 {
        self.pages
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn finish(self) -> String {
        self.text
    }
}
