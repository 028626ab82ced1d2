//! Cancellable subprocess execution.
//!
//! Commands are spawned with piped output that is drained on helper threads,
//! so a chatty child can never block on a full pipe while we poll for its
//! exit. When the cancellation token fires the child is killed and reaped.

use std::io::Read;
use std::process::{Child, Command, ExitStatus, Output, Stdio};
use std::thread::JoinHandle;
use std::time::Duration;

use tracing::{debug, warn};

use crate::cancel::CancellationToken;
use crate::error::ExecError;

const POLL_INTERVAL_MS: u64 = 25;

pub fn program_name(cmd: &Command) -> String {
    cmd.get_program().to_string_lossy().to_string()
}

/// Runs `cmd` to completion, returning its captured output on a zero exit.
pub fn run(mut cmd: Command, cancel: &CancellationToken) -> Result<Output, ExecError> {
    let program = program_name(&cmd);
    if cancel.is_cancelled() {
        return Err(ExecError::Cancelled { program });
    }

    debug!(program = %program, args = ?cmd.get_args().collect::<Vec<_>>(), "spawning");
    let mut child = cmd
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|source| ExecError::Spawn {
            program: program.clone(),
            source,
        })?;

    let stdout = drain(child.stdout.take());
    let stderr = drain(child.stderr.take());

    let status = match wait(&mut child, cancel) {
        Ok(Some(status)) => status,
        Ok(None) => {
            // Grandchildren may still hold the pipes open; the drain threads
            // are left to finish on their own.
            kill(&mut child, &program);
            return Err(ExecError::Cancelled { program });
        }
        Err(source) => {
            kill(&mut child, &program);
            return Err(ExecError::Wait { program, source });
        }
    };

    let output = Output {
        status,
        stdout: join(stdout),
        stderr: join(stderr),
    };

    if !output.status.success() {
        return Err(ExecError::Failed {
            program,
            status: output.status,
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }

    Ok(output)
}

fn wait(child: &mut Child, cancel: &CancellationToken) -> std::io::Result<Option<ExitStatus>> {
    loop {
        if let Some(status) = child.try_wait()? {
            return Ok(Some(status));
        }
        if cancel.is_cancelled() {
            return Ok(None);
        }
        std::thread::sleep(Duration::from_millis(POLL_INTERVAL_MS));
    }
}

fn kill(child: &mut Child, program: &str) {
    if let Err(err) = child.kill() {
        warn!(program, error = %err, "failed to kill child process");
    }
    let _ = child.wait();
}

fn drain<R: Read + Send + 'static>(pipe: Option<R>) -> Option<JoinHandle<Vec<u8>>> {
    pipe.map(|mut pipe| {
        std::thread::spawn(move || {
            let mut buf = Vec::new();
            let _ = pipe.read_to_end(&mut buf);
            buf
        })
    })
}

fn join(handle: Option<JoinHandle<Vec<u8>>>) -> Vec<u8> {
    handle
        .and_then(|h| h.join().ok())
        .unwrap_or_default()
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::time::Instant;

    fn sh(script: &str) -> Command {
        let mut cmd = Command::new("sh");
        cmd.arg("-c").arg(script);
        cmd
    }

    #[test]
    fn captures_stdout_on_success() {
        let out = run(sh("echo hello"), &CancellationToken::new()).unwrap();
        assert_eq!(String::from_utf8_lossy(&out.stdout).trim(), "hello");
    }

    #[test]
    fn non_zero_exit_reports_stderr() {
        let err = run(sh("echo boom >&2; exit 3"), &CancellationToken::new()).unwrap_err();
        match err {
            ExecError::Failed { stderr, status, .. } => {
                assert_eq!(stderr, "boom");
                assert_eq!(status.code(), Some(3));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn missing_program_is_a_spawn_error() {
        let cmd = Command::new("/definitely/not/a/program");
        let err = run(cmd, &CancellationToken::new()).unwrap_err();
        assert!(matches!(err, ExecError::Spawn { .. }));
    }

    #[test]
    fn cancellation_kills_running_child() {
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        let canceller = std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(100));
            trigger.cancel();
        });

        let start = Instant::now();
        let err = run(sh("sleep 30"), &cancel).unwrap_err();
        canceller.join().unwrap();

        assert!(matches!(err, ExecError::Cancelled { .. }));
        assert!(start.elapsed() < Duration::from_secs(10));
    }

    #[test]
    fn already_cancelled_token_never_spawns() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let err = run(sh("exit 0"), &cancel).unwrap_err();
        assert!(matches!(err, ExecError::Cancelled { .. }));
    }
}
