//! Units of work bound to one project root.
//!
//! A job owns its error collector and a status stream. Errors recorded here
//! never propagate to the scheduler; callers inspect [`Job::errors`] after
//! the run. The status stream is best-effort: sends never block, messages
//! with no subscriber are dropped, and the stream closes when the job ends.

use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver, Sender};

use crate::cancel::CancellationToken;
use crate::error::JobError;

pub type StatusReceiver = Receiver<String>;

/// Lifecycle: `Created -> Staging (optional) -> Analyzing -> Done | Failed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    Created,
    Staging,
    Analyzing,
    Done,
    Failed,
}

impl JobState {
    pub fn is_finished(&self) -> bool {
        matches!(self, JobState::Done | JobState::Failed)
    }
}

pub trait Job: Send {
    fn dir(&self) -> &Path;

    fn files(&self) -> &[PathBuf];

    fn errors(&self) -> &JobErrors;

    fn state(&self) -> JobState;

    /// Hands out the receiving end of the status stream, replacing any
    /// earlier subscriber.
    fn subscribe(&mut self) -> StatusReceiver;

    /// Runs the job to completion. Failures are recorded on the job itself.
    fn run(&mut self, cancel: &CancellationToken);

    /// Closes the status stream so its consumer terminates.
    fn close_status(&mut self);
}

#[derive(Debug)]
struct RecordedError {
    error: JobError,
    critical: bool,
}

/// Ordered error log of a single job.
#[derive(Debug, Default)]
pub struct JobErrors {
    entries: Vec<RecordedError>,
}

impl JobErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn warning(&mut self, error: JobError) {
        self.entries.push(RecordedError {
            error,
            critical: false,
        });
    }

    pub fn critical(&mut self, error: JobError) {
        self.entries.push(RecordedError {
            error,
            critical: true,
        });
    }

    pub fn has_error(&self) -> bool {
        self.entries.iter().any(|e| e.critical)
    }

    pub fn get_all(&self) -> Vec<&JobError> {
        self.entries.iter().map(|e| &e.error).collect()
    }

    pub fn get_critical(&self) -> Vec<&JobError> {
        self.entries
            .iter()
            .filter(|e| e.critical)
            .map(|e| &e.error)
            .collect()
    }

    pub fn get_warnings(&self) -> Vec<&JobError> {
        self.entries
            .iter()
            .filter(|e| !e.critical)
            .map(|e| &e.error)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[derive(Debug, Default)]
pub struct StatusSender {
    tx: Option<Sender<String>>,
}

impl StatusSender {
    pub fn subscribe(&mut self) -> StatusReceiver {
        let (tx, rx) = mpsc::channel();
        self.tx = Some(tx);
        rx
    }

    pub fn send(&self, message: impl Into<String>) {
        if let Some(tx) = self.tx.as_ref() {
            let _ = tx.send(message.into());
        }
    }

    pub fn close(&mut self) {
        self.tx.take();
    }
}

/// State shared by every [`Job`] implementation.
#[derive(Debug)]
pub struct BaseJob {
    dir: PathBuf,
    files: Vec<PathBuf>,
    errors: JobErrors,
    status: StatusSender,
    state: JobState,
}

impl BaseJob {
    pub fn new(dir: impl Into<PathBuf>, files: Vec<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            files,
            errors: JobErrors::new(),
            status: StatusSender::default(),
            state: JobState::Created,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn files(&self) -> &[PathBuf] {
        &self.files
    }

    pub fn errors(&self) -> &JobErrors {
        &self.errors
    }

    pub fn state(&self) -> JobState {
        self.state
    }

    pub fn set_state(&mut self, state: JobState) {
        self.state = state;
    }

    /// Records a critical error and moves the job to `Failed`.
    pub fn fail(&mut self, error: JobError) {
        self.errors.critical(error);
        self.state = JobState::Failed;
    }

    pub fn send_status(&self, message: impl Into<String>) {
        self.status.send(message);
    }

    pub fn subscribe(&mut self) -> StatusReceiver {
        self.status.subscribe()
    }

    pub fn close_status(&mut self) {
        self.status.close();
    }
}
