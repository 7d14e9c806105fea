//! Data models shared by the pipeline and its front-ends.

pub mod config;

pub use config::{ExtractionConfig, OcrConfig, OcrliftConfig, PdfConfig};
