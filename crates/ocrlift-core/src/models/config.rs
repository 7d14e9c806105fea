//! Configuration structures for the OCR pipeline.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::OcrliftError;
use crate::extract::ExtractionRule;

/// Default rendering-resolution multiplier for PDF pages.
pub const DEFAULT_RENDER_SCALE: f32 = 1.5;

/// Default text placed after each recognized PDF page.
pub const DEFAULT_PAGE_SEPARATOR: &str = "\n\n";

/// Main configuration for the ocrlift pipeline.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OcrliftConfig {
    /// OCR configuration.
    pub ocr: OcrConfig,

    /// PDF processing configuration.
    pub pdf: PdfConfig,

    /// Extraction configuration.
    pub extraction: ExtractionConfig,
}

/// OCR engine configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OcrConfig {
    /// Directory containing model files.
    pub model_dir: PathBuf,

    /// Text detection model file name.
    pub detection_model: String,

    /// Text recognition model file name.
    pub recognition_model: String,

    /// Character dictionary file name.
    pub dictionary: String,

    /// Keep `[UNK]` tokens in recognized text instead of replacing them with spaces.
    pub keep_unk: bool,
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            model_dir: PathBuf::from("models"),
            detection_model: "det.onnx".to_string(),
            recognition_model: "latin_rec.onnx".to_string(),
            dictionary: "latin_dict.txt".to_string(),
            keep_unk: false,
        }
    }
}

/// PDF processing configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PdfConfig {
    /// Multiplier applied to the page size in points when rendering.
    pub render_scale: f32,

    /// Appended after every page's text.
    pub page_separator: String,
}

impl Default for PdfConfig {
    fn default() -> Self {
        Self {
            render_scale: DEFAULT_RENDER_SCALE,
            page_separator: DEFAULT_PAGE_SEPARATOR.to_string(),
        }
    }
}

/// Extraction configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionConfig {
    /// Rule applied to the recognized text.
    pub rule: ExtractionRule,
}

impl OcrliftConfig {
    /// Load configuration from a JSON file.
    pub fn from_file(path: &std::path::Path) -> Result<Self, std::io::Error> {
        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content).map_err(|e| {
            std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string())
        })
    }

    /// Save configuration to a JSON file.
    pub fn save(&self, path: &std::path::Path) -> Result<(), std::io::Error> {
        let content = serde_json::to_string_pretty(self).map_err(|e| {
            std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string())
        })?;
        std::fs::write(path, content)
    }

    /// Get full path to a model file.
    pub fn model_path(&self, model_name: &str) -> PathBuf {
        self.ocr.model_dir.join(model_name)
    }

    /// Check values serde cannot reject on its own.
    pub fn validate(&self) -> Result<(), OcrliftError> {
        if !self.pdf.render_scale.is_finite() || self.pdf.render_scale <= 0.0 {
            return Err(OcrliftError::Config(format!(
                "pdf.render_scale must be a positive number, got {}",
                self.pdf.render_scale
            )));
        }
        self.extraction.rule.compile()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_defaults() {
        let config = OcrliftConfig::default();
        assert_eq!(config.pdf.render_scale, 1.5);
        assert_eq!(config.pdf.page_separator, "\n\n");
        assert_eq!(config.extraction.rule, ExtractionRule::anchored_date_default());
        assert_eq!(config.model_path("det.onnx"), PathBuf::from("models/det.onnx"));
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: OcrliftConfig = serde_json::from_str(
            r#"{"pdf":{"render_scale":2.0},"extraction":{"rule":{"kind":"labeled_field","label":"Breaking changes:"}}}"#,
        )
        .unwrap();

        assert_eq!(config.pdf.render_scale, 2.0);
        assert_eq!(config.pdf.page_separator, "\n\n");
        assert_eq!(config.ocr, OcrConfig::default());
        assert_eq!(config.extraction.rule, ExtractionRule::labeled_field_default());
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");

        let mut config = OcrliftConfig::default();
        config.ocr.keep_unk = true;
        config.save(&path).unwrap();

        assert_eq!(OcrliftConfig::from_file(&path).unwrap(), config);
    }

    #[test]
    fn test_validate_rejects_bad_scale() {
        let mut config = OcrliftConfig::default();
        config.pdf.render_scale = 0.0;
        assert!(config.validate().is_err());

        config.pdf.render_scale = 1.0;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_rule() {
        let mut config = OcrliftConfig::default();
        config.extraction.rule = ExtractionRule::anchored_date("", 50);
        assert!(config.validate().is_err());
    }
}
