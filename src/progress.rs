//! Per-job progress indicators.
//!
//! The board keeps the latest message and outcome of every indicator so the
//! final state can be inspected after a run, whatever the output mode.

use serde::Serialize;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, info, warn};

const PREFIX: &str = "[callgraph-gen]";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgressMode {
    /// Status lines on stderr.
    Terminal,
    /// Tracing events.
    Log,
    /// Record only.
    Silent,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IndicatorState {
    Pending,
    Running,
    Succeeded,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IndicatorSnapshot {
    pub title: String,
    pub message: Option<String>,
    pub state: IndicatorState,
}

#[derive(Debug, Clone)]
pub struct ProgressBoard {
    mode: ProgressMode,
    indicators: Arc<Mutex<Vec<IndicatorSnapshot>>>,
}

impl ProgressBoard {
    pub fn new(mode: ProgressMode) -> Self {
        Self {
            mode,
            indicators: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn silent() -> Self {
        Self::new(ProgressMode::Silent)
    }

    /// Registers a pending indicator titled `title`.
    pub fn add(&self, title: impl Into<String>) -> Indicator {
        let title = title.into();
        let mut indicators = self.lock();
        let id = indicators.len();
        indicators.push(IndicatorSnapshot {
            title: title.clone(),
            message: None,
            state: IndicatorState::Pending,
        });
        drop(indicators);

        match self.mode {
            ProgressMode::Terminal => eprintln!("{PREFIX} {title}: queued"),
            ProgressMode::Log => debug!(job = %title, "job queued"),
            ProgressMode::Silent => {}
        }

        Indicator {
            id,
            title,
            board: self.clone(),
        }
    }

    pub fn snapshot(&self) -> Vec<IndicatorSnapshot> {
        self.lock().clone()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<IndicatorSnapshot>> {
        self.indicators
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn update(&self, id: usize, apply: impl FnOnce(&mut IndicatorSnapshot)) {
        if let Some(snapshot) = self.lock().get_mut(id) {
            apply(snapshot);
        }
    }
}

/// Handle to one indicator on a [`ProgressBoard`]. Clones update the same line.
#[derive(Debug, Clone)]
pub struct Indicator {
    id: usize,
    title: String,
    board: ProgressBoard,
}

impl Indicator {
    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn start(&self) {
        match self.board.mode {
            ProgressMode::Terminal => eprintln!("{PREFIX} {}: started", self.title),
            ProgressMode::Log => info!(job = %self.title, "job started"),
            ProgressMode::Silent => {}
        }
        self.board
            .update(self.id, |snapshot| snapshot.state = IndicatorState::Running);
    }

    pub fn set_message(&self, message: impl Into<String>) {
        let message = message.into();
        match self.board.mode {
            ProgressMode::Terminal => eprintln!("{PREFIX} {}: {message}", self.title),
            ProgressMode::Log => info!(job = %self.title, "{message}"),
            ProgressMode::Silent => {}
        }
        self.board
            .update(self.id, |snapshot| snapshot.message = Some(message));
    }

    pub fn succeed(&self) {
        match self.board.mode {
            ProgressMode::Terminal => eprintln!("{PREFIX} {}: done", self.title),
            ProgressMode::Log => info!(job = %self.title, "job succeeded"),
            ProgressMode::Silent => {}
        }
        self.board
            .update(self.id, |snapshot| snapshot.state = IndicatorState::Succeeded);
    }

    pub fn fail(&self) {
        match self.board.mode {
            ProgressMode::Terminal => eprintln!("{PREFIX} {}: failed", self.title),
            ProgressMode::Log => warn!(job = %self.title, "job failed"),
            ProgressMode::Silent => {}
        }
        self.board
            .update(self.id, |snapshot| snapshot.state = IndicatorState::Failed);
    }
}
