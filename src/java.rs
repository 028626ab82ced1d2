//! Java call graph jobs and the strategy that builds them.
//!
//! A job stages the root's external dependencies into
//! [`STAGING_DIR_NAME`](crate::staging::STAGING_DIR_NAME) unless they are
//! already there, then runs the call graph generator against the root's
//! entrypoint class directory with the staged jars on its library path.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::cancel::CancellationToken;
use crate::cmd::CmdFactory;
use crate::config::{BuildConfig, BuildSystem};
use crate::error::{JobError, Stage};
use crate::exec;
use crate::finder::{Finder, gcd_path, map_files_to_dir, with_trailing_separator};
use crate::gradle;
use crate::job::{BaseJob, Job, JobErrors, JobState, StatusReceiver};
use crate::staging::{self, StagingLocks};
use crate::strategy::Strategy;

pub const CALLGRAPH_OUTPUT_NAME: &str = ".callgraph-output";

/// Capabilities injected into every Java job.
#[derive(Clone)]
pub struct JavaToolchain {
    pub cmd_factory: Arc<dyn CmdFactory>,
    pub tool_jar: PathBuf,
    pub staging: Arc<StagingLocks>,
}

impl JavaToolchain {
    pub fn new(cmd_factory: Arc<dyn CmdFactory>, tool_jar: impl Into<PathBuf>) -> Self {
        Self {
            cmd_factory,
            tool_jar: tool_jar.into(),
            staging: Arc::new(StagingLocks::new()),
        }
    }
}

pub struct JavaJob {
    base: BaseJob,
    toolchain: JavaToolchain,
    config: BuildConfig,
}

impl JavaJob {
    pub fn new(
        dir: impl Into<PathBuf>,
        files: Vec<PathBuf>,
        toolchain: JavaToolchain,
        config: BuildConfig,
    ) -> Self {
        Self {
            base: BaseJob::new(dir, files),
            toolchain,
            config,
        }
    }

    fn execute(&mut self, cancel: &CancellationToken) -> Result<(), JobError> {
        let working_dir = self.base.dir().to_path_buf();
        let target_classes = self
            .base
            .files()
            .first()
            .cloned()
            .ok_or_else(|| JobError::Other("job has no entrypoint class directory".into()))?;
        let target_dir = staging::staging_dir(&working_dir);

        self.stage(&working_dir, &target_dir, cancel)?;

        if cancel.is_cancelled() {
            return Err(JobError::Cancelled {
                stage: Stage::Analysis,
            });
        }
        self.base.set_state(JobState::Analyzing);
        self.base.send_status("generating call graph");

        let cmd = self
            .toolchain
            .cmd_factory
            .make_call_graph_generation_cmd(
                &self.toolchain.tool_jar,
                &working_dir,
                &target_classes,
                &target_dir,
                &working_dir.join(CALLGRAPH_OUTPUT_NAME),
            )
            .map_err(|source| JobError::Setup {
                stage: Stage::Analysis,
                source,
            })?;
        exec::run(cmd, cancel).map_err(|source| JobError::Command {
            stage: Stage::Analysis,
            source,
        })?;
        Ok(())
    }

    fn stage(
        &mut self,
        working_dir: &Path,
        target_dir: &Path,
        cancel: &CancellationToken,
    ) -> Result<(), JobError> {
        let lock = self.toolchain.staging.lock_for(working_dir);
        let _guard = staging::acquire(&lock);

        if staging::is_staged(target_dir) {
            debug!(dir = %target_dir.display(), "dependencies already staged");
            return Ok(());
        }
        if cancel.is_cancelled() {
            return Err(JobError::Cancelled {
                stage: Stage::Staging,
            });
        }
        if target_dir.exists() {
            debug!(dir = %target_dir.display(), "removing unfinished staging directory");
            staging::discard_partial(target_dir)?;
        }

        self.base.set_state(JobState::Staging);
        self.base.send_status(format!(
            "copying external dependency artifacts to {}",
            target_dir.display()
        ));

        let cmd = self
            .staging_command(working_dir, target_dir)
            .map_err(|source| JobError::Setup {
                stage: Stage::Staging,
                source,
            })?;
        if let Err(source) = exec::run(cmd, cancel) {
            if let Err(err) = staging::discard_partial(target_dir) {
                warn!(
                    dir = %target_dir.display(),
                    error = %err,
                    "failed to remove partial staging directory"
                );
            }
            return Err(JobError::Command {
                stage: Stage::Staging,
                source,
            });
        }
        staging::mark_staged(target_dir)?;
        Ok(())
    }

    fn staging_command(&self, working_dir: &Path, target_dir: &Path) -> Result<Command> {
        let factory = &self.toolchain.cmd_factory;
        match self.config.build_system() {
            BuildSystem::Gradle => {
                let gradlew = gradle::gradle_executable(working_dir);
                let script = gradle::write_init_script(working_dir)?;
                factory.make_gradle_copy_dependencies_cmd(
                    working_dir,
                    &gradlew,
                    &script,
                    target_dir,
                )
            }
            BuildSystem::Maven | BuildSystem::Unspecified => {
                factory.make_mvn_copy_dependencies_cmd(working_dir, target_dir)
            }
        }
    }
}

impl Job for JavaJob {
    fn dir(&self) -> &Path {
        self.base.dir()
    }

    fn files(&self) -> &[PathBuf] {
        self.base.files()
    }

    fn errors(&self) -> &JobErrors {
        self.base.errors()
    }

    fn state(&self) -> JobState {
        self.base.state()
    }

    fn subscribe(&mut self) -> StatusReceiver {
        self.base.subscribe()
    }

    fn run(&mut self, cancel: &CancellationToken) {
        match self.execute(cancel) {
            Ok(()) => {
                self.base.set_state(JobState::Done);
                info!(root = %self.base.dir().display(), "call graph generated");
            }
            Err(err) => {
                warn!(root = %self.base.dir().display(), error = %err, "call graph job failed");
                self.base.fail(err);
            }
        }
        self.base.close_status();
    }

    fn close_status(&mut self) {
        self.base.close_status();
    }
}

/// Turns discovered files into one [`JavaJob`] per project root.
pub struct JavaStrategy<'a> {
    config: BuildConfig,
    files: &'a [PathBuf],
    finder: &'a dyn Finder,
    toolchain: JavaToolchain,
}

impl<'a> JavaStrategy<'a> {
    pub fn new(
        config: BuildConfig,
        files: &'a [PathBuf],
        finder: &'a dyn Finder,
        toolchain: JavaToolchain,
    ) -> Self {
        Self {
            config,
            files,
            finder,
            toolchain,
        }
    }
}

impl Strategy for JavaStrategy<'_> {
    fn invoke(&self) -> Result<Vec<Box<dyn Job>>> {
        if self.files.is_empty() {
            return Ok(Vec::new());
        }

        let build_system = self.config.build_system();
        let roots = self
            .finder
            .find_roots(build_system, self.files)
            .with_context(|| format!("Failed to find {build_system} project roots"))?;
        let class_dirs = self.finder.find_java_class_dirs(self.files);
        let mapping = map_files_to_dir(&roots, &class_dirs);
        debug!(
            build_system = %build_system,
            roots = roots.len(),
            class_dirs = class_dirs.len(),
            mapped = mapping.len(),
            "resolved roots"
        );

        let jobs = mapping
            .into_iter()
            .map(|(root, dirs)| {
                let mut entrypoint = PathBuf::from(gcd_path(&dirs));
                if entrypoint.as_os_str().is_empty() {
                    entrypoint = with_trailing_separator(&root);
                }
                Box::new(JavaJob::new(
                    root,
                    vec![entrypoint],
                    self.toolchain.clone(),
                    self.config.clone(),
                )) as Box<dyn Job>
            })
            .collect();

        Ok(jobs)
    }
}
