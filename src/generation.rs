use serde::Serialize;

use crate::job::{Job, JobState};

/// Jobs of one scheduling pass, in the order they were supplied.
pub struct Generation {
    jobs: Vec<Box<dyn Job>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct JobSummary {
    pub dir: String,
    pub targets: Vec<String>,
    pub state: JobState,
    pub ok: bool,
    pub errors: Vec<String>,
}

impl Generation {
    pub fn new(jobs: Vec<Box<dyn Job>>) -> Self {
        Self { jobs }
    }

    pub fn jobs(&self) -> &[Box<dyn Job>] {
        &self.jobs
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    pub fn has_errors(&self) -> bool {
        self.jobs.iter().any(|job| job.errors().has_error())
    }

    pub fn failed_count(&self) -> usize {
        self.jobs
            .iter()
            .filter(|job| job.errors().has_error())
            .count()
    }

    pub fn summary(&self) -> Vec<JobSummary> {
        self.jobs
            .iter()
            .map(|job| JobSummary {
                dir: job.dir().to_string_lossy().to_string(),
                targets: job
                    .files()
                    .iter()
                    .map(|f| f.to_string_lossy().to_string())
                    .collect(),
                state: job.state(),
                ok: !job.errors().has_error(),
                errors: job
                    .errors()
                    .get_all()
                    .iter()
                    .map(|e| e.to_string())
                    .collect(),
            })
            .collect()
    }
}
