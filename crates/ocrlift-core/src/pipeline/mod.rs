//! Recognition jobs: acquire pages, OCR them in order, extract a field.

mod job;
mod orchestrator;
mod source;

pub use job::{JobBoard, JobId, JobOutcome, JobTicket, RecognitionJob};
pub use orchestrator::Orchestrator;
pub use source::{PageAccumulator, PageContent, PageSource, RenderedPdf, SingleImage};

use serde::{Deserialize, Serialize};

/// Shown when a job is started without input.
pub const NO_INPUT_MESSAGE: &str = "No file selected.";

/// Shown when the OCR engine failed to start.
pub const ENGINE_NOT_READY_MESSAGE: &str = "OCR engine is not ready.";

/// Shown when an image job fails.
pub const IMAGE_FAILURE_MESSAGE: &str = "Text recognition failed.";

/// Shown when a PDF job fails.
pub const PDF_FAILURE_MESSAGE: &str = "PDF processing failed.";

/// Which input-acquisition strategy a job uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobKind {
    /// One image, recognized directly.
    Image,
    /// A PDF whose pages are rendered and recognized one by one.
    Pdf,
}

impl std::fmt::Display for JobKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Image => write!(f, "image"),
            Self::Pdf => write!(f, "pdf"),
        }
    }
}

/// Lifecycle of a recognition job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    #[default]
    Idle,
    Running,
    Succeeded,
    Failed,
}

impl JobStatus {
    /// Whether the trigger control should be disabled.
    pub fn is_busy(self) -> bool {
        self == Self::Running
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed)
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::Running => "running",
            Self::Succeeded => "succeeded",
            Self::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Receives progress from a running job.
pub trait JobObserver {
    /// The job entered `status`.
    fn status_changed(&mut self, _job: JobId, _status: JobStatus) {}

    /// The job is about to render and recognize `page` of `total`.
    fn page_started(&mut self, _job: JobId, _page: u32, _total: u32) {}
}

/// Observer that ignores everything.
impl JobObserver for () {}
