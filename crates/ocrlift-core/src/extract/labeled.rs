//! Free-text extraction after a fixed label.

use regex::Regex;

use super::{ExtractionMatch, FieldExtractor};
use crate::error::ExtractionError;

/// Captures the rest of the line following a label, trimmed.
///
/// Whitespace directly after the label may include line breaks, so a value
/// that OCR pushed onto the next line is still found. An empty capture counts
/// as no match.
#[derive(Debug, Clone)]
pub struct LabeledFieldExtractor {
    pattern: Regex,
}

impl LabeledFieldExtractor {
    pub fn new(label: &str) -> Result<Self, ExtractionError> {
        if label.trim().is_empty() {
            return Err(ExtractionError::InvalidRule(
                "label must not be empty".to_string(),
            ));
        }

        let pattern = format!(r"(?i){}\s*(.*)", regex::escape(label));
        let pattern =
            Regex::new(&pattern).map_err(|e| ExtractionError::InvalidRule(e.to_string()))?;

        Ok(Self { pattern })
    }

    fn to_match(caps: &regex::Captures<'_>) -> Option<ExtractionMatch<String>> {
        let capture = caps.get(1)?;
        let value = capture.as_str().trim();
        if value.is_empty() {
            return None;
        }

        let start = capture.start() + (capture.as_str().len() - capture.as_str().trim_start().len());
        Some(
            ExtractionMatch::new(value.to_string(), &caps[0])
                .with_position(start, start + value.len()),
        )
    }
}

impl FieldExtractor for LabeledFieldExtractor {
    type Output = ExtractionMatch<String>;

    fn extract(&self, text: &str) -> Option<Self::Output> {
        // Only the first label occurrence counts.
        let caps = self.pattern.captures(text)?;
        Self::to_match(&caps)
    }

    fn extract_all(&self, text: &str) -> Vec<Self::Output> {
        self.pattern
            .captures_iter(text)
            .filter_map(|caps| Self::to_match(&caps))
            .collect()
    }
}
