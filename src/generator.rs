//! The discovery-through-scheduling pipeline.

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::mpsc::{self, RecvTimeoutError};
use std::time::{Duration, Instant};
use tracing::{info, warn};

use crate::cancel::CancellationToken;
use crate::config::BuildConfig;
use crate::error::GenerateError;
use crate::finder::Finder;
use crate::generation::Generation;
use crate::job::Job;
use crate::scheduler::Scheduler;
use crate::staging::staging_exclusion;
use crate::strategy::StrategyFactory;

pub struct Generator {
    finder: Arc<dyn Finder>,
    strategies: Arc<dyn StrategyFactory>,
    scheduler: Scheduler,
}

impl Generator {
    pub fn new(
        finder: Arc<dyn Finder>,
        strategies: Arc<dyn StrategyFactory>,
        scheduler: Scheduler,
    ) -> Self {
        Self {
            finder,
            strategies,
            scheduler,
        }
    }

    /// Discovers files once, builds jobs for every configuration and runs
    /// them. A configuration whose strategy fails contributes no jobs.
    pub fn generate(
        &self,
        paths: &[PathBuf],
        exclusions: &[String],
        configs: &[BuildConfig],
        cancel: &CancellationToken,
    ) -> Result<Generation, GenerateError> {
        let mut exclusions = exclusions.to_vec();
        let staged = staging_exclusion();
        if !exclusions.contains(&staged) {
            exclusions.push(staged);
        }

        let started = Instant::now();
        let files = self
            .finder
            .find_files(paths, &exclusions, cancel)
            .map_err(GenerateError::Discovery)?;
        info!(
            files = files.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "discovered files"
        );

        let mut jobs: Vec<Box<dyn Job>> = Vec::new();
        for config in configs {
            let strategy = match self.strategies.make(config, &files, self.finder.as_ref()) {
                Ok(strategy) => strategy,
                Err(err) => {
                    warn!(
                        language = %config.language,
                        error = %format!("{err:#}"),
                        "skipping build configuration"
                    );
                    continue;
                }
            };
            match strategy.invoke() {
                Ok(found) => {
                    info!(
                        language = %config.language,
                        build_system = %config.build_system(),
                        jobs = found.len(),
                        "built jobs"
                    );
                    jobs.extend(found);
                }
                Err(err) => {
                    warn!(
                        language = %config.language,
                        error = %format!("{err:#}"),
                        "skipping build configuration"
                    );
                }
            }
        }

        self.scheduler
            .schedule(jobs, cancel)
            .map_err(GenerateError::Schedule)
    }

    /// Runs [`Generator::generate`] against a deadline. When it expires
    /// the run is cancelled and waited for, so no subprocess outlives the
    /// call.
    pub fn generate_with_timer(
        &self,
        paths: &[PathBuf],
        exclusions: &[String],
        configs: &[BuildConfig],
        timeout: Duration,
    ) -> Result<Generation, GenerateError> {
        let cancel = CancellationToken::new();
        let (tx, rx) = mpsc::channel();

        std::thread::scope(|scope| {
            let token = &cancel;
            scope.spawn(move || {
                let _ = tx.send(self.generate(paths, exclusions, configs, token));
            });

            match rx.recv_timeout(timeout) {
                Ok(result) => result,
                Err(RecvTimeoutError::Timeout) => {
                    warn!(timeout_secs = timeout.as_secs(), "deadline expired, cancelling");
                    cancel.cancel();
                    Err(GenerateError::Timeout(timeout))
                }
                Err(RecvTimeoutError::Disconnected) => Err(GenerateError::Aborted),
            }
        })
    }
}
