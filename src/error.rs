use std::fmt;
use std::io;
use std::process::ExitStatus;
use std::time::Duration;

use thiserror::Error;

/// Failure of a single external command.
#[derive(Debug, Error)]
pub enum ExecError {
    #[error("failed to start {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("{program} exited with {status}: {stderr}")]
    Failed {
        program: String,
        status: ExitStatus,
        stderr: String,
    },

    #[error("{program} was cancelled")]
    Cancelled { program: String },

    #[error("waiting for {program} failed: {source}")]
    Wait {
        program: String,
        #[source]
        source: io::Error,
    },
}

/// Step of a job that produced an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Staging,
    Analysis,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Staging => f.write_str("dependency staging"),
            Stage::Analysis => f.write_str("call graph generation"),
        }
    }
}

/// Errors recorded on a job's own collector. They never leave the job.
#[derive(Debug, Error)]
pub enum JobError {
    #[error("{stage}: could not build command: {source:#}")]
    Setup {
        stage: Stage,
        #[source]
        source: anyhow::Error,
    },

    #[error("{stage}: {source}")]
    Command {
        stage: Stage,
        #[source]
        source: ExecError,
    },

    #[error("{stage}: cancelled before start")]
    Cancelled { stage: Stage },

    #[error(transparent)]
    Io(#[from] io::Error),

    #[error("{0}")]
    Other(String),
}

impl JobError {
    pub fn stage(&self) -> Option<Stage> {
        match self {
            JobError::Setup { stage, .. }
            | JobError::Command { stage, .. }
            | JobError::Cancelled { stage } => Some(*stage),
            JobError::Io(_) | JobError::Other(_) => None,
        }
    }
}

/// Errors of the outer discovery-through-scheduling pipeline.
#[derive(Debug, Error)]
pub enum GenerateError {
    #[error("timed out after {}s waiting for call graph generation", .0.as_secs())]
    Timeout(Duration),

    #[error("file discovery failed: {0:#}")]
    Discovery(#[source] anyhow::Error),

    #[error("scheduling failed: {0:#}")]
    Schedule(#[source] anyhow::Error),

    #[error("generation thread exited without a result")]
    Aborted,
}

impl GenerateError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, GenerateError::Timeout(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn job_error_messages_name_the_stage() {
        let err = JobError::Cancelled {
            stage: Stage::Staging,
        };
        assert_eq!(err.to_string(), "dependency staging: cancelled before start");
        assert_eq!(err.stage(), Some(Stage::Staging));

        let err = JobError::Setup {
            stage: Stage::Analysis,
            source: anyhow::anyhow!("java not found"),
        };
        assert_eq!(
            err.to_string(),
            "call graph generation: could not build command: java not found"
        );
        assert_eq!(JobError::Other("x".into()).stage(), None);
    }

    #[test]
    fn timeout_is_identifiable() {
        let err = GenerateError::Timeout(Duration::from_secs(3));
        assert!(err.is_timeout());
        assert!(err.to_string().contains("3s"));
        assert!(!GenerateError::Aborted.is_timeout());
    }
}
