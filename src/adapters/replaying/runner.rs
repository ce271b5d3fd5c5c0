//! Replaying adapter for the `CommandRunner` port.

use std::error::Error;
use std::sync::Mutex;
use std::time::Duration;

use super::replay_result;
use crate::cassette::replayer::CassetteReplayer;
use crate::ports::runner::{CommandOutcome, CommandRunner, CommandSpec};

/// Serves recorded command outcomes in order.
pub struct ReplayingCommandRunner {
    replayer: Mutex<CassetteReplayer>,
}

impl ReplayingCommandRunner {
    /// Creates a replaying runner.
    #[must_use]
    pub fn new(replayer: CassetteReplayer) -> Self {
        Self { replayer: Mutex::new(replayer) }
    }
}

impl CommandRunner for ReplayingCommandRunner {
    fn run(
        &self,
        _command: &CommandSpec,
        _timeout: Option<Duration>,
    ) -> Result<CommandOutcome, Box<dyn Error + Send + Sync>> {
        replay_result(&self.replayer, "runner", "run")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::replaying::test_support::replayer;
    use serde_json::json;

    #[test]
    fn replays_exit_and_timeout() {
        let runner = ReplayingCommandRunner::new(replayer(&[
            ("runner", "run", json!({"ok": {"exited": {"code": 1, "stdout": "", "stderr": "no"}}})),
            ("runner", "run", json!({"ok": "timed_out"})),
        ]));
        let cmd = CommandSpec::new("virt-install");
        let first = runner.run(&cmd, None).unwrap();
        assert!(matches!(first, CommandOutcome::Exited { code: 1, .. }));
        assert_eq!(runner.run(&cmd, None).unwrap(), CommandOutcome::TimedOut);
    }
}
