//! Pattern extraction over recognized text.

pub mod anchored;
pub mod labeled;
pub mod patterns;

pub use anchored::{AnchoredDateExtractor, parse_date_time};
pub use labeled::LabeledFieldExtractor;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::error::ExtractionError;
use patterns::{DEFAULT_ANCHOR, DEFAULT_LABEL, DEFAULT_WINDOW};

/// Default message when an anchored-date rule finds nothing.
pub const DATE_NOT_FOUND_MESSAGE: &str = "No date/time found near the anchor keyword.";

/// Default message when a labeled-field rule finds nothing.
pub const LABEL_NOT_FOUND_MESSAGE: &str = "No text found after the label.";

/// Trait for field extractors.
pub trait FieldExtractor {
    /// The type of value this extractor produces.
    type Output;

    /// Extract the first (leftmost) occurrence of the field.
    fn extract(&self, text: &str) -> Option<Self::Output>;

    /// Extract all occurrences of the field.
    fn extract_all(&self, text: &str) -> Vec<Self::Output>;
}

/// A matched value with where it came from.
#[derive(Debug, Clone)]
pub struct ExtractionMatch<T> {
    /// Extracted value.
    pub value: T,
    /// Byte range of the value in the source text.
    pub position: Option<(usize, usize)>,
    /// Full text the pattern matched, anchor or label included.
    pub source: String,
}

impl<T> ExtractionMatch<T> {
    pub fn new(value: T, source: impl Into<String>) -> Self {
        Self {
            value,
            position: None,
            source: source.into(),
        }
    }

    pub fn with_position(mut self, start: usize, end: usize) -> Self {
        self.position = Some((start, end));
        self
    }
}

/// A configurable extraction rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ExtractionRule {
    /// A date/time token shortly after an anchor keyword.
    AnchoredDate {
        anchor: String,
        #[serde(default = "default_window")]
        window: usize,
        #[serde(default = "default_date_not_found")]
        not_found: String,
    },
    /// The rest of the line following a label.
    LabeledField {
        label: String,
        #[serde(default = "default_label_not_found")]
        not_found: String,
    },
}

fn default_window() -> usize {
    DEFAULT_WINDOW
}

fn default_date_not_found() -> String {
    DATE_NOT_FOUND_MESSAGE.to_string()
}

fn default_label_not_found() -> String {
    LABEL_NOT_FOUND_MESSAGE.to_string()
}

impl ExtractionRule {
    pub fn anchored_date(anchor: impl Into<String>, window: usize) -> Self {
        Self::AnchoredDate {
            anchor: anchor.into(),
            window,
            not_found: default_date_not_found(),
        }
    }

    pub fn labeled_field(label: impl Into<String>) -> Self {
        Self::LabeledField {
            label: label.into(),
            not_found: default_label_not_found(),
        }
    }

    /// `AppOCR` followed by a date/time within 50 characters.
    pub fn anchored_date_default() -> Self {
        Self::anchored_date(DEFAULT_ANCHOR, DEFAULT_WINDOW)
    }

    /// Whatever follows `Breaking changes:` on its line.
    pub fn labeled_field_default() -> Self {
        Self::labeled_field(DEFAULT_LABEL)
    }

    /// Replace the message reported when nothing matches.
    pub fn with_not_found(mut self, message: impl Into<String>) -> Self {
        match &mut self {
            Self::AnchoredDate { not_found, .. } | Self::LabeledField { not_found, .. } => {
                *not_found = message.into();
            }
        }
        self
    }

    pub fn not_found_message(&self) -> &str {
        match self {
            Self::AnchoredDate { not_found, .. } | Self::LabeledField { not_found, .. } => {
                not_found
            }
        }
    }

    /// Build the matcher for this rule.
    pub fn compile(&self) -> Result<CompiledRule, ExtractionError> {
        let matcher = match self {
            Self::AnchoredDate { anchor, window, .. } => {
                Matcher::AnchoredDate(AnchoredDateExtractor::new(anchor, *window)?)
            }
            Self::LabeledField { label, .. } => {
                Matcher::LabeledField(LabeledFieldExtractor::new(label)?)
            }
        };

        Ok(CompiledRule {
            rule: self.clone(),
            matcher,
        })
    }
}

impl Default for ExtractionRule {
    fn default() -> Self {
        Self::anchored_date_default()
    }
}

#[derive(Debug, Clone)]
enum Matcher {
    AnchoredDate(AnchoredDateExtractor),
    LabeledField(LabeledFieldExtractor),
}

/// A rule with its pattern built, ready to run over text.
#[derive(Debug, Clone)]
pub struct CompiledRule {
    rule: ExtractionRule,
    matcher: Matcher,
}

impl CompiledRule {
    pub fn rule(&self) -> &ExtractionRule {
        &self.rule
    }

    /// Run the rule. Never fails: no match is an ordinary `NotFound`.
    pub fn apply(&self, text: &str) -> Extraction {
        let found = match &self.matcher {
            Matcher::AnchoredDate(extractor) => extractor.extract(text).map(|m| {
                let date_time = parse_date_time(&m.value);
                (m.value, date_time)
            }),
            Matcher::LabeledField(extractor) => extractor.extract(text).map(|m| (m.value, None)),
        };

        match found {
            Some((value, date_time)) => Extraction::Found { value, date_time },
            None => Extraction::NotFound {
                message: self.rule.not_found_message().to_string(),
            },
        }
    }
}

/// Outcome of applying an extraction rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Extraction {
    /// The rule matched.
    Found {
        value: String,
        /// Calendar reading of an anchored date/time token, when it is valid.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        date_time: Option<NaiveDateTime>,
    },
    /// The rule did not match; `message` is shown instead of a value.
    NotFound { message: String },
}

impl Extraction {
    pub fn is_found(&self) -> bool {
        matches!(self, Self::Found { .. })
    }

    /// The matched value, if any.
    pub fn value(&self) -> Option<&str> {
        match self {
            Self::Found { value, .. } => Some(value),
            Self::NotFound { .. } => None,
        }
    }

    /// Text for the result panel: the value or the not-found message.
    pub fn display_text(&self) -> &str {
        match self {
            Self::Found { value, .. } => value,
            Self::NotFound { message } => message,
        }
    }
}

/// Compile `rule` and apply it once.
pub fn extract(rule: &ExtractionRule, text: &str) -> Result<Extraction, ExtractionError> {
    Ok(rule.compile()?.apply(text))
}
