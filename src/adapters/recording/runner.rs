//! Recording adapter for the `CommandRunner` port.

use std::error::Error;
use std::time::Duration;

use serde::Serialize;

use super::record_result;
use crate::cassette::session::SharedRecorder;
use crate::ports::{CommandOutcome, CommandRunner, CommandSpec};

/// Records program invocations while delegating to an inner runner.
pub struct RecordingCommandRunner {
    inner: Box<dyn CommandRunner>,
    recorder: SharedRecorder,
}

impl RecordingCommandRunner {
    /// Wraps `inner`.
    pub fn new(inner: Box<dyn CommandRunner>, recorder: SharedRecorder) -> Self {
        Self { inner, recorder }
    }
}

#[derive(Serialize)]
struct RunInput<'a> {
    #[serde(flatten)]
    command: &'a CommandSpec,
    timeout_secs: Option<u64>,
}

impl CommandRunner for RecordingCommandRunner {
    fn run(
        &self,
        command: &CommandSpec,
        timeout: Option<Duration>,
    ) -> Result<CommandOutcome, Box<dyn Error + Send + Sync>> {
        let result = self.inner.run(command, timeout);
        let input = RunInput { command, timeout_secs: timeout.map(|t| t.as_secs()) };
        record_result(&self.recorder, "runner", "run", &input, &result);
        result
    }
}
