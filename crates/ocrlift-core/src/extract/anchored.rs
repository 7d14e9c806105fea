//! Date/time extraction near an anchor keyword.

use chrono::{NaiveDate, NaiveDateTime};
use regex::Regex;

use super::patterns::{DATE_TIME_PARTS, DATE_TIME_TOKEN, MAX_WINDOW};
use super::{ExtractionMatch, FieldExtractor};
use crate::error::ExtractionError;

/// Finds the first date/time token that follows an anchor keyword.
///
/// The anchor is matched case-insensitively. Between the end of the anchor and
/// the token there may be at most `window` characters, none of them a line
/// break. The lookahead is lazy, so the token nearest the anchor wins.
#[derive(Debug, Clone)]
pub struct AnchoredDateExtractor {
    pattern: Regex,
    window: usize,
}

impl AnchoredDateExtractor {
    pub fn new(anchor: &str, window: usize) -> Result<Self, ExtractionError> {
        if anchor.trim().is_empty() {
            return Err(ExtractionError::InvalidRule(
                "anchor keyword must not be empty".to_string(),
            ));
        }
        if window > MAX_WINDOW {
            return Err(ExtractionError::InvalidRule(format!(
                "lookahead window {} exceeds the maximum of {}",
                window, MAX_WINDOW
            )));
        }

        let pattern = format!(
            r"(?i){}.{{0,{}}}?({})",
            regex::escape(anchor.trim()),
            window,
            DATE_TIME_TOKEN
        );
        let pattern =
            Regex::new(&pattern).map_err(|e| ExtractionError::InvalidRule(e.to_string()))?;

        Ok(Self { pattern, window })
    }

    pub fn window(&self) -> usize {
        self.window
    }
}

impl FieldExtractor for AnchoredDateExtractor {
    type Output = ExtractionMatch<String>;

    fn extract(&self, text: &str) -> Option<Self::Output> {
        let caps = self.pattern.captures(text)?;
        let token = caps.get(1)?;
        Some(
            ExtractionMatch::new(token.as_str().to_string(), &caps[0])
                .with_position(token.start(), token.end()),
        )
    }

    fn extract_all(&self, text: &str) -> Vec<Self::Output> {
        self.pattern
            .captures_iter(text)
            .filter_map(|caps| {
                let token = caps.get(1)?;
                Some(
                    ExtractionMatch::new(token.as_str().to_string(), &caps[0])
                        .with_position(token.start(), token.end()),
                )
            })
            .collect()
    }
}

/// Interpret a date/time token as day/month/year hour:minute.
///
/// Returns `None` when the token is not a date/time token or names a
/// calendar value that does not exist (e.g. 31/02).
pub fn parse_date_time(token: &str) -> Option<NaiveDateTime> {
    let caps = DATE_TIME_PARTS.captures(token.trim())?;

    let day: u32 = caps[1].parse().ok()?;
    let month: u32 = caps[2].parse().ok()?;
    let year = parse_year(&caps[3])?;
    let hour: u32 = caps[4].parse().ok()?;
    let minute: u32 = caps[5].parse().ok()?;

    NaiveDate::from_ymd_opt(year, month, day)?.and_hms_opt(hour, minute, 0)
}

fn parse_year(s: &str) -> Option<i32> {
    let year: i32 = s.parse().ok()?;
    match s.len() {
        // Two-digit year: assume 2000s for 00-50, 1900s for 51-99
        2 if year <= 50 => Some(2000 + year),
        2 => Some(1900 + year),
        4 => Some(year),
        _ => None,
    }
}
