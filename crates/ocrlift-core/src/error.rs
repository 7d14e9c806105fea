//! Error types for the ocrlift-core library.

use thiserror::Error;

use crate::pipeline::{
    ENGINE_NOT_READY_MESSAGE, IMAGE_FAILURE_MESSAGE, JobKind, NO_INPUT_MESSAGE,
    PDF_FAILURE_MESSAGE,
};

/// Main error type for the ocrlift library.
#[derive(Error, Debug)]
pub enum OcrliftError {
    /// PDF processing error.
    #[error("PDF error: {0}")]
    Pdf(#[from] PdfError),

    /// OCR processing error.
    #[error("OCR error: {0}")]
    Ocr(#[from] OcrError),

    /// Extraction rule error.
    #[error("extraction error: {0}")]
    Extraction(#[from] ExtractionError),

    /// Recognition job error.
    #[error("job error: {0}")]
    Job(#[from] JobError),

    /// Image processing error.
    #[error("image error: {0}")]
    Image(#[from] image::ImageError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),
}

/// Errors raised by the PDF renderer adapter.
#[derive(Error, Debug)]
pub enum PdfError {
    /// Failed to open/parse the PDF document.
    #[error("failed to load PDF: {0}")]
    Load(String),

    /// The PDF is encrypted with a non-empty password.
    #[error("PDF is encrypted")]
    Encrypted,

    /// Invalid page number requested.
    #[error("invalid page number: {0}")]
    InvalidPage(u32),

    /// A page could not be turned into a raster image.
    #[error("failed to render page {page}: {reason}")]
    Render { page: u32, reason: String },

    /// A page carries no raster image to render.
    #[error("page {0} has no raster content")]
    NoRasterContent(u32),
}

impl PdfError {
    /// Whether this error happened while loading the document.
    pub fn is_load_error(&self) -> bool {
        matches!(self, Self::Load(_) | Self::Encrypted)
    }
}

/// Errors raised by the OCR engine adapter.
#[derive(Error, Debug)]
pub enum OcrError {
    /// The engine could not start (missing models, runtime fault).
    #[error("failed to initialize OCR engine: {0}")]
    EngineInit(String),

    /// Initialization failed earlier and no retry was requested.
    #[error("OCR engine is not ready")]
    EngineNotReady,

    /// The engine handle was released.
    #[error("OCR engine has been released")]
    Released,

    /// Text recognition failed.
    #[error("text recognition failed: {0}")]
    Recognition(String),

    /// Invalid image format or dimensions.
    #[error("invalid image: {0}")]
    InvalidImage(String),
}

/// Errors related to extraction rules.
#[derive(Error, Debug)]
pub enum ExtractionError {
    /// The rule cannot be compiled into a pattern.
    #[error("invalid extraction rule: {0}")]
    InvalidRule(String),
}

/// Why a recognition job failed.
#[derive(Error, Debug)]
pub enum JobError {
    /// No input bytes were supplied.
    #[error("no input selected")]
    NoInput,

    /// The OCR engine is unavailable.
    #[error("OCR engine is not ready: {0}")]
    EngineNotReady(OcrError),

    /// Recognition of a single image failed.
    #[error("recognition failed: {0}")]
    Recognition(OcrError),

    /// The PDF could not be loaded.
    #[error("PDF load failed: {0}")]
    PdfLoad(PdfError),

    /// A PDF page could not be rendered.
    #[error("page {page} render failed: {source}")]
    PageRender { page: u32, source: PdfError },

    /// A rendered PDF page could not be recognized.
    #[error("page {page} recognition failed: {source}")]
    PageRecognition { page: u32, source: OcrError },
}

/// User-facing failure categories, each with a fixed message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Failure {
    NoInput,
    EngineNotReady,
    RecognitionFailed,
    PdfFailed,
}

impl Failure {
    /// The fixed human-readable message shown in place of the text.
    pub fn message(self) -> &'static str {
        match self {
            Self::NoInput => NO_INPUT_MESSAGE,
            Self::EngineNotReady => ENGINE_NOT_READY_MESSAGE,
            Self::RecognitionFailed => IMAGE_FAILURE_MESSAGE,
            Self::PdfFailed => PDF_FAILURE_MESSAGE,
        }
    }
}

impl JobError {
    /// Fold this error into the failure category shown for a job of `kind`.
    pub fn failure(&self, kind: JobKind) -> Failure {
        match self {
            Self::NoInput => Failure::NoInput,
            Self::EngineNotReady(_) => Failure::EngineNotReady,
            _ => match kind {
                JobKind::Image => Failure::RecognitionFailed,
                JobKind::Pdf => Failure::PdfFailed,
            },
        }
    }
}

impl From<OcrError> for JobError {
    fn from(err: OcrError) -> Self {
        match err {
            OcrError::EngineInit(_) | OcrError::EngineNotReady | OcrError::Released => {
                Self::EngineNotReady(err)
            }
            other => Self::Recognition(other),
        }
    }
}

/// Result type for the ocrlift library.
pub type Result<T> = std::result::Result<T, OcrliftError>;
