//! WASM bindings for ocrlift.
//!
//! In the browser the OCR engine and PDF renderer live in JavaScript. This
//! crate supplies the parts that do not: field extraction and a
//! [`RecognitionSession`] that tracks the single displayed job, accumulates
//! page text in order and discards results from superseded jobs.

use wasm_bindgen::prelude::*;

use ocrlift_core::error::Failure;
use ocrlift_core::extract::{CompiledRule, Extraction, ExtractionRule};
use ocrlift_core::models::config::{DEFAULT_PAGE_SEPARATOR, DEFAULT_RENDER_SCALE};
use ocrlift_core::pipeline::{
    JobBoard, JobId, JobKind, JobOutcome, JobTicket, PageAccumulator,
};

/// Initialize panic hook for better error messages in console.
#[wasm_bindgen(start)]
pub fn init() {
    #[cfg(feature = "console_error_panic_hook")]
    console_error_panic_hook::set_once();
}

/// Version information.
#[wasm_bindgen]
pub fn version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}

/// Find the date/time following the default `AppOCR` anchor.
#[wasm_bindgen]
pub fn extract_date_time(text: &str) -> Option<String> {
    apply(&ExtractionRule::anchored_date_default(), text)
}

/// Take the rest of the line following `label`.
#[wasm_bindgen]
pub fn extract_labeled_field(label: &str, text: &str) -> Result<Option<String>, JsValue> {
    let rule = ExtractionRule::labeled_field(label)
        .compile()
        .map_err(|e| JsValue::from_str(&e.to_string()))?;
    Ok(rule.apply(text).value().map(str::to_string))
}

/// Apply a rule given as a plain object, e.g.
/// `{ kind: "anchored_date", anchor: "AppOCR", window: 50 }`.
#[wasm_bindgen]
pub fn extract_with_rule(rule: JsValue, text: &str) -> Result<JsValue, JsValue> {
    let rule = parse_rule(rule)?;
    let extraction = rule.apply(text);
    serde_wasm_bindgen::to_value(&extraction).map_err(|e| JsValue::from_str(&e.to_string()))
}

/// Scale to render PDF pages at before recognition.
#[wasm_bindgen]
pub fn default_render_scale() -> f32 {
    DEFAULT_RENDER_SCALE
}

fn apply(rule: &ExtractionRule, text: &str) -> Option<String> {
    rule.compile()
        .ok()
        .and_then(|rule| rule.apply(text).value().map(str::to_string))
}

fn parse_rule(rule: JsValue) -> Result<CompiledRule, JsValue> {
    let rule: ExtractionRule = if rule.is_undefined() || rule.is_null() {
        ExtractionRule::default()
    } else {
        serde_wasm_bindgen::from_value(rule).map_err(|e| JsValue::from_str(&e.to_string()))?
    };
    rule.compile().map_err(|e| JsValue::from_str(&e.to_string()))
}

/// The job in progress and the text collected for it so far.
struct Pending {
    ticket: JobTicket,
    pages: PageAccumulator,
}

/// Tracks recognition jobs driven from JavaScript.
///
/// ```js
/// const job = session.begin_pdf_job();
/// for (let p = 1; p <= pdf.numPages; p++) {
///   const text = await recognize(await render(pdf, p));
///   if (!session.push_page(job, text)) return; // superseded
/// }
/// session.finish(job);
/// ```
#[wasm_bindgen]
pub struct RecognitionSession {
    board: JobBoard,
    rule: CompiledRule,
    separator: String,
    pending: Option<Pending>,
}

#[wasm_bindgen]
impl RecognitionSession {
    /// Create a session. `rule` is an extraction rule object; the
    /// anchored-date default is used when it is omitted.
    #[wasm_bindgen(constructor)]
    pub fn new(rule: JsValue) -> Result<RecognitionSession, JsValue> {
        Ok(Self::with_rule(parse_rule(rule)?))
    }

    /// Start an image job, superseding any running one. Returns its id.
    pub fn begin_image_job(&mut self) -> f64 {
        self.begin(JobKind::Image)
    }

    /// Start a PDF job, superseding any running one. Returns its id.
    pub fn begin_pdf_job(&mut self) -> f64 {
        self.begin(JobKind::Pdf)
    }

    /// Append one page's recognized text. Returns `false` when `job` is no
    /// longer current, or when it is an image job that already has its page;
    /// the caller should stop.
    pub fn push_page(&mut self, job: f64, text: &str) -> bool {
        match self.pending_for(job) {
            Some(pending) if pending.ticket.kind() == JobKind::Image && pending.pages.pages() > 0 => false,
            Some(pending) => {
                pending.pages.push_page(text);
                true
            }
            None => false,
        }
    }

    /// Complete `job` with the text pushed so far and run the extraction.
    /// An image job finished without its page fails as `no_input`. Returns
    /// `false` when the job is stale.
    pub fn finish(&mut self, job: f64) -> bool {
        if self.pending_for(job).is_none() {
            return self.discard(job);
        }
        let Some(pending) = self.pending.take() else {
            return false;
        };

        let pages = pending.pages.pages();
        let outcome = if pending.ticket.kind() == JobKind::Image && pages == 0 {
            JobOutcome::Failed {
                failure: Failure::NoInput,
                detail: Failure::NoInput.message().to_string(),
            }
        } else {
            let text = pending.pages.finish();
            let extraction = self.rule.apply(&text);
            JobOutcome::Succeeded {
                text,
                pages,
                extraction,
            }
        };
        self.board.publish(&pending.ticket, outcome)
    }

    /// Fail `job` with one of `no_input`, `engine_not_ready`,
    /// `recognition_failed` or `pdf_failed`. Returns `false` when the job is
    /// stale.
    pub fn fail(&mut self, job: f64, failure: &str, detail: Option<String>) -> Result<bool, JsValue> {
        let failure: Failure = serde_json::from_value(serde_json::Value::String(failure.to_string()))
            .map_err(|_| JsValue::from_str(&format!("unknown failure kind: {}", failure)))?;

        if self.pending_for(job).is_none() {
            return Ok(self.discard(job));
        }
        let Some(pending) = self.pending.take() else {
            return Ok(false);
        };

        Ok(self.board.publish(
            &pending.ticket,
            JobOutcome::Failed {
                failure,
                detail: detail.unwrap_or_else(|| failure.message().to_string()),
            },
        ))
    }

    /// `idle`, `running`, `succeeded` or `failed`.
    pub fn status(&self) -> String {
        self.board.status().to_string()
    }

    /// Whether the trigger control should be disabled.
    pub fn is_busy(&self) -> bool {
        self.board.status().is_busy()
    }

    /// The displayed job as a plain object, or `null`.
    pub fn current_job(&self) -> Result<JsValue, JsValue> {
        match self.board.current() {
            Some(job) => serde_wasm_bindgen::to_value(job).map_err(|e| JsValue::from_str(&e.to_string())),
            None => Ok(JsValue::NULL),
        }
    }

    /// Text for the result panel: the accumulated text or failure message.
    pub fn text(&self) -> Option<String> {
        self.board.current().map(|job| job.text.clone())
    }

    /// Text for the extracted-field panel, once the job succeeded.
    pub fn extracted(&self) -> Option<String> {
        self.board
            .current()
            .and_then(|job| job.extracted_text())
            .map(str::to_string)
    }

    /// Drop the displayed job and any job in progress.
    pub fn reset(&mut self) {
        self.pending = None;
        self.board.reset();
    }
}

impl RecognitionSession {
    pub fn with_rule(rule: CompiledRule) -> Self {
        Self {
            board: JobBoard::new(),
            rule,
            separator: DEFAULT_PAGE_SEPARATOR.to_string(),
            pending: None,
        }
    }

    fn begin(&mut self, kind: JobKind) -> f64 {
        let ticket = self.board.begin(kind);
        let terminator = match kind {
            JobKind::Image => "",
            JobKind::Pdf => self.separator.as_str(),
        };
        let id = ticket.id().0 as f64;
        self.pending = Some(Pending {
            ticket,
            pages: PageAccumulator::new(terminator),
        });
        id
    }

    fn pending_for(&mut self, job: f64) -> Option<&mut Pending> {
        self.pending
            .as_mut()
            .filter(|pending| pending.ticket.id() == JobId(job as u64))
    }

    fn discard(&self, job: f64) -> bool {
        web_sys::console::debug_1(&JsValue::from_str(&format!(
            "ocrlift: discarding result of stale job #{}",
            job
        )));
        false
    }

    /// The extraction of the displayed job, if it finished successfully.
    pub fn extraction(&self) -> Option<&Extraction> {
        self.board.current().and_then(|job| job.extraction.as_ref())
    }
}
