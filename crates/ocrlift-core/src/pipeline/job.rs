//! Recognition job state and sequencing.

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{JobKind, JobStatus};
use crate::error::Failure;
use crate::extract::Extraction;

/// Monotonic job identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(pub u64);

impl std::fmt::Display for JobId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// One user-triggered extraction request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecognitionJob {
    pub id: JobId,
    pub kind: JobKind,
    pub status: JobStatus,
    /// Accumulated recognized text, or the fixed failure message.
    pub text: String,
    /// Pages recognized.
    pub pages: u32,
    /// Set once the text is final, only on success.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extraction: Option<Extraction>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<Failure>,
    /// Underlying error, for logs and diagnostics.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl RecognitionJob {
    pub(super) fn running(id: JobId, kind: JobKind) -> Self {
        Self {
            id,
            kind,
            status: JobStatus::Running,
            text: String::new(),
            pages: 0,
            extraction: None,
            failure: None,
            error: None,
        }
    }

    /// Move into the terminal state described by `outcome`.
    pub(super) fn apply(&mut self, outcome: JobOutcome) {
        self.status = outcome.status();
        match outcome {
            JobOutcome::Succeeded {
                text,
                pages,
                extraction,
            } => {
                self.text = text;
                self.pages = pages;
                self.extraction = Some(extraction);
            }
            JobOutcome::Failed { failure, detail } => {
                self.text = failure.message().to_string();
                self.extraction = None;
                self.failure = Some(failure);
                self.error = Some(detail);
            }
        }
    }

    /// Text for the result panel, if the job produced one.
    pub fn extracted_text(&self) -> Option<&str> {
        self.extraction.as_ref().map(|e| e.display_text())
    }
}

/// How a job ended.
#[derive(Debug, Clone, PartialEq)]
pub enum JobOutcome {
    Succeeded {
        text: String,
        pages: u32,
        extraction: Extraction,
    },
    Failed {
        failure: Failure,
        detail: String,
    },
}

impl JobOutcome {
    pub fn status(&self) -> JobStatus {
        match self {
            Self::Succeeded { .. } => JobStatus::Succeeded,
            Self::Failed { .. } => JobStatus::Failed,
        }
    }
}

/// Proof that a job was started; needed to publish its outcome.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobTicket {
    id: JobId,
    kind: JobKind,
}

impl JobTicket {
    pub fn id(&self) -> JobId {
        self.id
    }

    pub fn kind(&self) -> JobKind {
        self.kind
    }
}

/// The single job slot a front-end displays.
///
/// Starting a job supersedes whatever was there. Outcomes are published with
/// the ticket from [`begin`](Self::begin); an outcome for a job that is no
/// longer current is dropped, so a slow, stale job can never overwrite a newer
/// result.
#[derive(Debug, Default)]
pub struct JobBoard {
    last_id: u64,
    current: Option<RecognitionJob>,
}

impl JobBoard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a new job, superseding the current one.
    pub fn begin(&mut self, kind: JobKind) -> JobTicket {
        self.last_id += 1;
        let id = JobId(self.last_id);

        if let Some(previous) = &self.current {
            if previous.status.is_busy() {
                debug!("Job {} superseded by {}", previous.id, id);
            }
        }

        self.current = Some(RecognitionJob::running(id, kind));
        JobTicket { id, kind }
    }

    /// Whether `id` is the job currently shown.
    pub fn is_current(&self, id: JobId) -> bool {
        self.current.as_ref().is_some_and(|job| job.id == id)
    }

    /// Record how a job ended. Returns `false` when the outcome was discarded
    /// because the job is stale or already finished.
    pub fn publish(&mut self, ticket: &JobTicket, outcome: JobOutcome) -> bool {
        let Some(job) = self.current.as_mut().filter(|job| job.id == ticket.id) else {
            debug!("Discarding outcome of stale job {}", ticket.id);
            return false;
        };
        if job.status.is_terminal() {
            debug!("Job {} already finished, ignoring second outcome", ticket.id);
            return false;
        }

        job.apply(outcome);
        true
    }

    pub fn current(&self) -> Option<&RecognitionJob> {
        self.current.as_ref()
    }

    /// Status of the current job, `Idle` when there is none.
    pub fn status(&self) -> JobStatus {
        self.current
            .as_ref()
            .map(|job| job.status)
            .unwrap_or_default()
    }

    /// Forget the current job and return to `Idle`. Its ticket becomes stale.
    pub fn reset(&mut self) {
        self.current = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn success(text: &str) -> JobOutcome {
        JobOutcome::Succeeded {
            text: text.to_string(),
            pages: 1,
            extraction: Extraction::NotFound {
                message: "none".to_string(),
            },
        }
    }

    #[test]
    fn test_idle_until_first_job() {
        let mut board = JobBoard::new();
        assert_eq!(board.status(), JobStatus::Idle);
        assert!(board.current().is_none());

        let ticket = board.begin(JobKind::Image);
        assert_eq!(board.status(), JobStatus::Running);
        assert_eq!(ticket.id(), JobId(1));
        assert_eq!(ticket.kind(), JobKind::Image);
    }

    #[test]
    fn test_stale_completion_discarded() {
        let mut board = JobBoard::new();
        let old = board.begin(JobKind::Pdf);
        let new = board.begin(JobKind::Image);

        assert!(board.publish(&new, success("new text")));
        assert!(!board.publish(&old, success("old text")));

        let job = board.current().unwrap();
        assert_eq!(job.id, new.id());
        assert_eq!(job.text, "new text");
        assert_eq!(job.status, JobStatus::Succeeded);
    }

    #[test]
    fn test_stale_completion_while_new_job_running() {
        let mut board = JobBoard::new();
        let old = board.begin(JobKind::Image);
        let new = board.begin(JobKind::Image);

        assert!(!board.publish(&old, success("old text")));
        assert_eq!(board.status(), JobStatus::Running);
        assert!(board.is_current(new.id()));
        assert!(!board.is_current(old.id()));
    }

    #[test]
    fn test_second_outcome_ignored() {
        let mut board = JobBoard::new();
        let ticket = board.begin(JobKind::Image);

        assert!(board.publish(&ticket, success("first")));
        assert!(!board.publish(
            &ticket,
            JobOutcome::Failed {
                failure: Failure::RecognitionFailed,
                detail: "late".into()
            }
        ));
        assert_eq!(board.current().unwrap().text, "first");
    }

    #[test]
    fn test_failure_replaces_text_with_message() {
        let mut board = JobBoard::new();
        let ticket = board.begin(JobKind::Pdf);
        board.publish(
            &ticket,
            JobOutcome::Failed {
                failure: Failure::PdfFailed,
                detail: "page 2 render failed".into(),
            },
        );

        let job = board.current().unwrap();
        assert_eq!(job.status, JobStatus::Failed);
        assert_eq!(job.text, Failure::PdfFailed.message());
        assert_eq!(job.extraction, None);
        assert_eq!(job.error.as_deref(), Some("page 2 render failed"));
    }

    #[test]
    fn test_reset_makes_ticket_stale() {
        let mut board = JobBoard::new();
        let ticket = board.begin(JobKind::Image);
        board.reset();

        assert_eq!(board.status(), JobStatus::Idle);
        assert!(!board.publish(&ticket, success("late")));

        let next = board.begin(JobKind::Image);
        assert_eq!(next.id(), JobId(2));
    }
}
