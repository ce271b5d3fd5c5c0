//! Command runner over `std::process`, with a polled wall-clock timeout.

use std::error::Error;
use std::io::Read;
use std::process::{Child, Command, Stdio};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use crate::ports::runner::{CommandOutcome, CommandRunner, CommandSpec};

const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Runs programs on the host.
pub struct LiveCommandRunner;

fn drain<R: Read + Send + 'static>(pipe: Option<R>) -> Option<JoinHandle<String>> {
    pipe.map(|mut pipe| {
        thread::spawn(move || {
            let mut buf = Vec::new();
            let _ = pipe.read_to_end(&mut buf);
            String::from_utf8_lossy(&buf).into_owned()
        })
    })
}

fn collect(handle: Option<JoinHandle<String>>) -> String {
    handle.and_then(|h| h.join().ok()).unwrap_or_default()
}

/// Waits for the child, killing it once `deadline` passes. Returns `None`
/// on timeout.
fn wait_until(
    child: &mut Child,
    deadline: Option<Instant>,
) -> Result<Option<i32>, Box<dyn Error + Send + Sync>> {
    let Some(deadline) = deadline else {
        return Ok(Some(child.wait()?.code().unwrap_or(-1)));
    };
    loop {
        if let Some(status) = child.try_wait()? {
            return Ok(Some(status.code().unwrap_or(-1)));
        }
        if Instant::now() >= deadline {
            let _ = child.kill();
            let _ = child.wait();
            return Ok(None);
        }
        thread::sleep(POLL_INTERVAL);
    }
}

impl CommandRunner for LiveCommandRunner {
    fn run(
        &self,
        command: &CommandSpec,
        timeout: Option<Duration>,
    ) -> Result<CommandOutcome, Box<dyn Error + Send + Sync>> {
        debug!(command = %command.display(), ?timeout, "running");
        let mut cmd = Command::new(&command.program);
        cmd.args(&command.args).stdin(Stdio::null());
        if command.inherit_output {
            cmd.stdout(Stdio::inherit()).stderr(Stdio::inherit());
        } else {
            cmd.stdout(Stdio::piped()).stderr(Stdio::piped());
        }

        let mut child = cmd
            .spawn()
            .map_err(|e| format!("failed to spawn {}: {e}", command.program))?;
        let stdout = drain(child.stdout.take());
        let stderr = drain(child.stderr.take());

        let deadline = timeout.map(|t| Instant::now() + t);
        match wait_until(&mut child, deadline)? {
            Some(code) => Ok(CommandOutcome::Exited {
                code,
                stdout: collect(stdout),
                stderr: collect(stderr),
            }),
            None => {
                warn!(command = %command.program, "killed after timeout");
                Ok(CommandOutcome::TimedOut)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn captures_output_and_exit_code() {
        let outcome = LiveCommandRunner
            .run(&CommandSpec::new("sh").args(["-c", "echo hello; exit 42"]), None)
            .unwrap();
        let CommandOutcome::Exited { code, stdout, .. } = outcome else {
            panic!("expected exit, got {outcome:?}");
        };
        assert_eq!(code, 42);
        assert_eq!(stdout.trim(), "hello");
    }

    #[test]
    fn kills_on_timeout() {
        let started = Instant::now();
        let outcome = LiveCommandRunner
            .run(&CommandSpec::new("sleep").arg("30"), Some(Duration::from_millis(300)))
            .unwrap();
        assert_eq!(outcome, CommandOutcome::TimedOut);
        assert!(started.elapsed() < Duration::from_secs(10));
    }

    #[test]
    fn missing_program_is_an_error() {
        let result = LiveCommandRunner.run(&CommandSpec::new("hddkit-no-such-program"), None);
        assert!(result.is_err());
    }
}
