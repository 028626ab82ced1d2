//! Runs jobs and collects them into a [`Generation`].
//!
//! Every job's progress indicator is registered before the first job starts,
//! so the board lists the whole run up front. While a job runs, a thread
//! drains its status stream into its indicator. With one worker the jobs run in order on the
//! calling thread; with more they share a rayon pool of that size. Either
//! way the generation keeps the order the jobs were supplied in.

use anyhow::{Context, Result};
use rayon::prelude::*;
use tracing::{debug, info, warn};

use crate::cancel::CancellationToken;
use crate::generation::Generation;
use crate::job::Job;
use crate::progress::{Indicator, ProgressBoard, ProgressMode};

#[derive(Debug, Clone)]
pub struct Scheduler {
    workers: usize,
    progress: ProgressBoard,
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new(1)
    }
}

impl Scheduler {
    pub fn new(workers: usize) -> Self {
        Self {
            workers,
            progress: ProgressBoard::new(ProgressMode::Log),
        }
    }

    pub fn with_progress(mut self, progress: ProgressBoard) -> Self {
        self.progress = progress;
        self
    }

    pub fn progress(&self) -> &ProgressBoard {
        &self.progress
    }

    /// Runs every job. Job failures stay on the jobs; the error is reserved
    /// for failing to set up the worker pool.
    pub fn schedule(
        &self,
        mut jobs: Vec<Box<dyn Job>>,
        cancel: &CancellationToken,
    ) -> Result<Generation> {
        info!(jobs = jobs.len(), workers = self.workers, "scheduling jobs");

        let indicators: Vec<Indicator> = jobs
            .iter()
            .map(|job| self.progress.add(job.dir().display().to_string()))
            .collect();

        if self.workers <= 1 {
            for (job, indicator) in jobs.iter_mut().zip(&indicators) {
                self.run_job(job.as_mut(), indicator, cancel);
            }
        } else {
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(self.workers)
                .thread_name(|i| format!("callgraph-worker-{i}"))
                .build()
                .context("Failed to build worker pool")?;
            pool.install(|| {
                jobs.par_iter_mut()
                    .zip(indicators.par_iter())
                    .for_each(|(job, indicator)| self.run_job(job.as_mut(), indicator, cancel));
            });
        }

        Ok(Generation::new(jobs))
    }

    fn run_job(&self, job: &mut dyn Job, indicator: &Indicator, cancel: &CancellationToken) {
        indicator.start();
        let status = job.subscribe();
        let drain = {
            let indicator = indicator.clone();
            std::thread::spawn(move || {
                for message in status {
                    indicator.set_message(message);
                }
            })
        };

        job.run(cancel);
        job.close_status();
        if drain.join().is_err() {
            warn!(root = %job.dir().display(), "status drain thread panicked");
        }

        if job.errors().has_error() {
            indicator.fail();
        } else {
            indicator.succeed();
        }
        debug!(root = %job.dir().display(), state = ?job.state(), "job finished");
    }
}
