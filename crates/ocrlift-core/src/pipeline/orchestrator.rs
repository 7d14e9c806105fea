//! Drives image and PDF jobs from input bytes to an extraction.

use tracing::{debug, info, warn};

use super::{
    JobBoard, JobId, JobKind, JobObserver, JobOutcome, JobStatus, JobTicket, PageAccumulator,
    PageContent, PageSource, RecognitionJob, RenderedPdf, SingleImage,
};
use crate::error::{JobError, OcrliftError};
use crate::extract::CompiledRule;
use crate::models::OcrliftConfig;
use crate::models::config::{DEFAULT_PAGE_SEPARATOR, DEFAULT_RENDER_SCALE};
use crate::ocr::{BackendFactory, EngineHandle, OcrBackend};
use crate::pdf::PdfRenderer;

/// Runs recognition jobs against one OCR engine and one PDF renderer.
///
/// Jobs run one at a time; each replaces the previously displayed job. The
/// engine is started on first use and released on [`shutdown`](Self::shutdown)
/// or drop.
pub struct Orchestrator<F: BackendFactory, R: PdfRenderer> {
    engine: EngineHandle<F>,
    renderer: R,
    rule: CompiledRule,
    render_scale: f32,
    page_separator: String,
    board: JobBoard,
}

impl<F: BackendFactory, R: PdfRenderer> Orchestrator<F, R> {
    pub fn new(factory: F, renderer: R, rule: CompiledRule) -> Self {
        Self {
            engine: EngineHandle::new(factory),
            renderer,
            rule,
            render_scale: DEFAULT_RENDER_SCALE,
            page_separator: DEFAULT_PAGE_SEPARATOR.to_string(),
            board: JobBoard::new(),
        }
    }

    /// Build from a validated configuration.
    pub fn from_config(factory: F, renderer: R, config: &OcrliftConfig) -> Result<Self, OcrliftError> {
        config.validate()?;
        let rule = config.extraction.rule.compile()?;
        Ok(Self::new(factory, renderer, rule)
            .with_render_scale(config.pdf.render_scale)
            .with_page_separator(config.pdf.page_separator.clone()))
    }

    pub fn with_render_scale(mut self, scale: f32) -> Self {
        self.render_scale = scale;
        self
    }

    pub fn with_page_separator(mut self, separator: impl Into<String>) -> Self {
        self.page_separator = separator.into();
        self
    }

    pub fn rule(&self) -> &CompiledRule {
        &self.rule
    }

    /// Replace the rule used by later jobs.
    pub fn set_rule(&mut self, rule: CompiledRule) {
        self.rule = rule;
    }

    /// Recognize a single encoded image.
    pub fn run_image_job(&mut self, image: &[u8], observer: &mut dyn JobObserver) -> RecognitionJob {
        let ticket = self.begin(JobKind::Image, observer);

        let result = if image.is_empty() {
            Err(JobError::NoInput)
        } else {
            // The engine must be up before the image is touched.
            match self.engine.initialize() {
                Ok(()) => self.recognize_pages(&SingleImage::new(image), ticket.id(), observer),
                Err(e) => Err(JobError::from(e)),
            }
        };

        self.finish(&ticket, result, observer)
    }

    /// Render every page of a PDF and recognize them in order. Pages without
    /// raster content contribute their embedded text and never start the
    /// engine.
    pub fn run_pdf_job(&mut self, pdf: &[u8], observer: &mut dyn JobObserver) -> RecognitionJob {
        let ticket = self.begin(JobKind::Pdf, observer);

        let result = if pdf.is_empty() {
            Err(JobError::NoInput)
        } else {
            match self.renderer.load(pdf) {
                Ok(document) => {
                    let source =
                        RenderedPdf::new(document, self.render_scale, self.page_separator.clone());
                    self.recognize_pages(&source, ticket.id(), observer)
                }
                Err(e) => Err(JobError::PdfLoad(e)),
            }
        };

        self.finish(&ticket, result, observer)
    }

    /// Run a job over any page source.
    pub fn run_source<S: PageSource>(&mut self, source: &S, observer: &mut dyn JobObserver) -> RecognitionJob {
        let ticket = self.begin(source.kind(), observer);
        let result = self.recognize_pages(source, ticket.id(), observer);
        self.finish(&ticket, result, observer)
    }

    pub fn status(&self) -> JobStatus {
        self.board.status()
    }

    pub fn current_job(&self) -> Option<&RecognitionJob> {
        self.board.current()
    }

    /// Clear the displayed job.
    pub fn reset(&mut self) {
        self.board.reset();
    }

    /// Allow the engine to be started again after a failed start.
    pub fn retry_engine(&mut self) {
        self.engine.retry_initialization();
    }

    pub fn engine_ready(&self) -> bool {
        self.engine.is_ready()
    }

    /// Release the engine. Later jobs report the engine as not ready.
    pub fn shutdown(&mut self) {
        self.engine.release();
    }

    fn begin(&mut self, kind: JobKind, observer: &mut dyn JobObserver) -> JobTicket {
        let ticket = self.board.begin(kind);
        info!("Starting {} job {}", kind, ticket.id());
        observer.status_changed(ticket.id(), JobStatus::Running);
        ticket
    }

    fn recognize_pages<S: PageSource>(
        &mut self,
        source: &S,
        job: JobId,
        observer: &mut dyn JobObserver,
    ) -> Result<(u32, String), JobError> {
        let total = source.page_count();
        let mut pages = PageAccumulator::new(source.page_terminator());

        for page in 1..=total {
            observer.page_started(job, page, total);
            let text = match source.page(page)? {
                PageContent::Image(image) => {
                    let engine = self.engine.acquire()?;
                    engine.recognize(&image).map_err(|e| match source.kind() {
                        JobKind::Image => JobError::from(e),
                        JobKind::Pdf => JobError::PageRecognition { page, source: e },
                    })?
                }
                PageContent::Text(text) => {
                    debug!("Page {}/{} has no raster content, using embedded text", page, total);
                    text
                }
            };
            debug!("Page {}/{} recognized, {} chars", page, total, text.len());
            pages.push_page(&text);
        }

        Ok((pages.pages(), pages.finish()))
    }

    fn finish(
        &mut self,
        ticket: &JobTicket,
        result: Result<(u32, String), JobError>,
        observer: &mut dyn JobObserver,
    ) -> RecognitionJob {
        let outcome = match result {
            Ok((pages, text)) => {
                let extraction = self.rule.apply(&text);
                info!(
                    "Job {} succeeded: {} pages, field {}",
                    ticket.id(),
                    pages,
                    if extraction.is_found() { "found" } else { "not found" }
                );
                JobOutcome::Succeeded {
                    text,
                    pages,
                    extraction,
                }
            }
            Err(e) => {
                warn!("Job {} failed: {}", ticket.id(), e);
                JobOutcome::Failed {
                    failure: e.failure(ticket.kind()),
                    detail: e.to_string(),
                }
            }
        };

        let mut job = RecognitionJob::running(ticket.id(), ticket.kind());
        job.apply(outcome.clone());
        self.board.publish(ticket, outcome);
        observer.status_changed(ticket.id(), job.status);
        job
    }
}
