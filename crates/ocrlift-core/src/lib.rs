//! Core library for ocrlift: recognize text in images and scanned PDFs and
//! pull a single field out of it.
//!
//! This crate provides:
//! - An OCR adapter with a lazily started, explicitly released engine
//! - PDF page rendering for scanned documents
//! - Regex-based field extraction (anchored date/time, labeled field)
//! - A job pipeline tying the three together

pub mod error;
pub mod extract;
pub mod models;
pub mod ocr;
pub mod pdf;
pub mod pipeline;

pub use error::{Failure, JobError, OcrliftError, Result};
pub use extract::{CompiledRule, Extraction, ExtractionRule, extract};
pub use models::OcrliftConfig;
pub use ocr::{BackendFactory, EngineHandle, OcrBackend, OcrResult, TextBox};
#[cfg(feature = "native")]
pub use ocr::{PureOcrEngine, PureOcrFactory};
pub use pdf::{LopdfRenderer, PdfDocument, PdfRenderer};
pub use pipeline::{JobKind, JobObserver, JobStatus, Orchestrator, RecognitionJob};
