//! Test doubles shared by the unit tests.

use anyhow::{Result, anyhow};
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::cancel::CancellationToken;
use crate::cmd::CmdFactory;
use crate::config::BuildSystem;
use crate::error::JobError;
use crate::finder::Finder;
use crate::java::JavaToolchain;
use crate::job::{BaseJob, Job, JobErrors, JobState, StatusReceiver};

/// Finder returning canned results.
#[derive(Debug, Default)]
pub struct FinderMock {
    pub files: Vec<PathBuf>,
    pub roots: Vec<PathBuf>,
    pub class_dirs: Vec<PathBuf>,
    pub files_error: Option<String>,
    pub roots_error: Option<String>,
    pub seen_exclusions: Mutex<Vec<String>>,
}

impl FinderMock {
    pub fn seen_exclusions(&self) -> Vec<String> {
        self.seen_exclusions.lock().unwrap().clone()
    }
}

impl Finder for FinderMock {
    fn find_files(
        &self,
        _paths: &[PathBuf],
        exclusions: &[String],
        _cancel: &CancellationToken,
    ) -> Result<Vec<PathBuf>> {
        *self.seen_exclusions.lock().unwrap() = exclusions.to_vec();
        match &self.files_error {
            Some(message) => Err(anyhow!(message.clone())),
            None => Ok(self.files.clone()),
        }
    }

    fn find_roots(&self, _build_system: BuildSystem, _files: &[PathBuf]) -> Result<Vec<PathBuf>> {
        match &self.roots_error {
            Some(message) => Err(anyhow!(message.clone())),
            None => Ok(self.roots.clone()),
        }
    }

    fn find_java_class_dirs(&self, _files: &[PathBuf]) -> Vec<PathBuf> {
        self.class_dirs.clone()
    }
}

/// Behaviour of one command handed out by [`CmdFactoryMock`].
#[derive(Debug, Clone, Default)]
pub enum MockCmd {
    #[default]
    Succeed,
    /// Prints `mock failure` to stderr and exits with the code.
    Exit(i32),
    /// Leaves a half-filled target directory behind, then fails like `Exit`.
    PartialThenExit(i32),
    /// Creates the target directory when there is one, then sleeps.
    Sleep(Duration),
    SetupError(String),
}

impl MockCmd {
    fn command(&self, target: Option<&Path>) -> Result<Command> {
        let script = match self {
            MockCmd::Succeed => "exit 0".to_string(),
            MockCmd::Exit(code) => format!("echo mock failure >&2; exit {code}"),
            MockCmd::PartialThenExit(code) => format!(
                "mkdir -p \"$1\" && touch \"$1/partial.jar\"; echo mock failure >&2; exit {code}"
            ),
            MockCmd::Sleep(delay) => format!(
                "[ -n \"$1\" ] && mkdir -p \"$1\"; exec sleep {:.3}",
                delay.as_secs_f64()
            ),
            MockCmd::SetupError(message) => return Err(anyhow!(message.clone())),
        };
        let mut cmd = Command::new("sh");
        cmd.arg("-c").arg(script).arg("sh");
        if let Some(target) = target {
            cmd.arg(target);
        }
        Ok(cmd)
    }
}

/// Command factory producing `sh -c` stand-ins and recording what was built.
#[derive(Debug, Default)]
pub struct CmdFactoryMock {
    pub staging: MockCmd,
    pub analysis: MockCmd,
    pub calls: Mutex<Vec<String>>,
}

impl CmdFactoryMock {
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, name: &str) {
        self.calls.lock().unwrap().push(name.to_string());
    }
}

impl CmdFactory for CmdFactoryMock {
    fn make_mvn_copy_dependencies_cmd(
        &self,
        _working_dir: &Path,
        target_dir: &Path,
    ) -> Result<Command> {
        self.record("mvn");
        self.staging.command(Some(target_dir))
    }

    fn make_gradle_copy_dependencies_cmd(
        &self,
        _working_dir: &Path,
        _gradlew: &Path,
        _init_script: &Path,
        target_dir: &Path,
    ) -> Result<Command> {
        self.record("gradle");
        self.staging.command(Some(target_dir))
    }

    fn make_call_graph_generation_cmd(
        &self,
        _tool_jar: &Path,
        _working_dir: &Path,
        _target_classes: &Path,
        _dependency_dir: &Path,
        _output: &Path,
    ) -> Result<Command> {
        self.record("callgraph");
        self.analysis.command(None)
    }
}

pub fn toolchain() -> JavaToolchain {
    toolchain_with(Arc::new(CmdFactoryMock::default()))
}

pub fn toolchain_with(factory: Arc<CmdFactoryMock>) -> JavaToolchain {
    JavaToolchain::new(factory, "/opt/callgraph/callgraph.jar")
}

/// Job that reports one status line, optionally sleeps, then succeeds or fails.
pub struct JobMock {
    base: BaseJob,
    delay: Duration,
    failure: Option<String>,
}

impl JobMock {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            base: BaseJob::new(dir, Vec::new()),
            delay: Duration::ZERO,
            failure: None,
        }
    }

    pub fn failing(dir: impl Into<PathBuf>, message: &str) -> Self {
        Self {
            failure: Some(message.to_string()),
            ..Self::new(dir)
        }
    }

    pub fn delayed(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

impl Job for JobMock {
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
        self.base.set_state(JobState::Analyzing);
        self.base
            .send_status(format!("working in {}", self.base.dir().display()));
        std::thread::sleep(self.delay);

        if cancel.is_cancelled() {
            self.base.fail(JobError::Other("cancelled".into()));
        } else if let Some(message) = self.failure.clone() {
            self.base.fail(JobError::Other(message));
        } else {
            self.base.set_state(JobState::Done);
        }
        self.base.close_status();
    }

    fn close_status(&mut self) {
        self.base.close_status();
    }
}
