//! Common regex patterns for OCR field extraction.

use lazy_static::lazy_static;
use regex::Regex;

/// Date/time token: `D{1,2}[/-]D{1,2}[/-]D{2,4} H{1,2}:MM`.
pub const DATE_TIME_TOKEN: &str = r"\d{1,2}[/\-]\d{1,2}[/\-]\d{2,4}\s+\d{1,2}:\d{2}";

/// Keyword the anchored-date preset looks for.
pub const DEFAULT_ANCHOR: &str = "AppOCR";

/// Label the labeled-field preset looks for.
pub const DEFAULT_LABEL: &str = "Breaking changes:";

/// Default lookahead between the anchor and the date/time token, in characters.
pub const DEFAULT_WINDOW: usize = 50;

/// Largest lookahead window a rule may ask for.
pub const MAX_WINDOW: usize = 1000;

lazy_static! {
    // A whole date/time token, split into day, month, year, hour, minute.
    pub static ref DATE_TIME_PARTS: Regex = Regex::new(
        r"^(\d{1,2})[/\-](\d{1,2})[/\-](\d{2,4})\s+(\d{1,2}):(\d{2})$"
    ).unwrap();
}
