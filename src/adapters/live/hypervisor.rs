//! Hypervisor adapter driving `virsh`.

use std::error::Error;

use crate::ports::hypervisor::{DomainState, Hypervisor};
use crate::ports::runner::{CommandOutcome, CommandRunner, CommandSpec};

use super::runner::LiveCommandRunner;

/// Controls libvirt domains through the `virsh` command line.
pub struct VirshHypervisor {
    uri: Option<String>,
    runner: Box<dyn CommandRunner>,
}

impl VirshHypervisor {
    /// Connects to `uri`, or virsh's default connection when `None`.
    #[must_use]
    pub fn new(uri: Option<String>) -> Self {
        Self::with_runner(uri, Box::new(LiveCommandRunner))
    }

    /// Uses `runner` to invoke virsh.
    #[must_use]
    pub fn with_runner(uri: Option<String>, runner: Box<dyn CommandRunner>) -> Self {
        Self { uri, runner }
    }

    fn virsh<'a>(&self, args: impl IntoIterator<Item = &'a str>) -> CommandSpec {
        let mut cmd = CommandSpec::new("virsh");
        if let Some(uri) = &self.uri {
            cmd = cmd.args(["-c", uri.as_str()]);
        }
        cmd.args(args)
    }

    fn call(&self, cmd: &CommandSpec) -> Result<(i32, String, String), Box<dyn Error + Send + Sync>> {
        match self.runner.run(cmd, None)? {
            CommandOutcome::Exited { code, stdout, stderr } => Ok((code, stdout, stderr)),
            CommandOutcome::TimedOut => Err(format!("{} timed out", cmd.display()).into()),
        }
    }

    fn checked(&self, cmd: &CommandSpec) -> Result<(), Box<dyn Error + Send + Sync>> {
        let (code, _, stderr) = self.call(cmd)?;
        if code == 0 {
            Ok(())
        } else {
            Err(format!("{} failed ({code}): {}", cmd.display(), stderr.trim()).into())
        }
    }
}

impl Hypervisor for VirshHypervisor {
    fn domain_state(&self, name: &str) -> Result<Option<DomainState>, Box<dyn Error + Send + Sync>> {
        let cmd = self.virsh(["domstate", name]);
        let (code, stdout, stderr) = self.call(&cmd)?;
        if code == 0 {
            return Ok(Some(DomainState::parse(&stdout)));
        }
        if stderr.contains("failed to get domain") || stderr.contains("Domain not found") {
            return Ok(None);
        }
        Err(format!("{} failed ({code}): {}", cmd.display(), stderr.trim()).into())
    }

    fn destroy(&self, name: &str) -> Result<(), Box<dyn Error + Send + Sync>> {
        self.checked(&self.virsh(["destroy", name]))
    }

    fn undefine(&self, name: &str) -> Result<(), Box<dyn Error + Send + Sync>> {
        self.checked(&self.virsh(["undefine", "--nvram", name]))
    }
}
