//! Disk imager adapter driving a `guestfish --listen` remote-control session.

use std::error::Error;
use std::fs::File;
use std::path::Path;
use std::sync::Mutex;

use tracing::debug;

use crate::catalog::PartitionKind;
use crate::ports::imager::{AddedPartition, DiskImager};
use crate::ports::runner::{CommandOutcome, CommandRunner, CommandSpec};

use super::runner::LiveCommandRunner;

/// One guestfish daemon per launched disk, addressed by its PID.
pub struct GuestfishImager {
    runner: Box<dyn CommandRunner>,
    pid: Mutex<Option<u32>>,
}

impl Default for GuestfishImager {
    fn default() -> Self {
        Self::with_runner(Box::new(LiveCommandRunner))
    }
}

impl GuestfishImager {
    /// Uses `runner` to invoke guestfish.
    #[must_use]
    pub fn with_runner(runner: Box<dyn CommandRunner>) -> Self {
        Self { runner, pid: Mutex::new(None) }
    }

    fn current_pid(&self) -> Result<u32, Box<dyn Error + Send + Sync>> {
        let guard = self.pid.lock().map_err(|e| format!("guestfish state poisoned: {e}"))?;
        guard.ok_or_else(|| "guestfish session not launched".into())
    }

    fn exec(&self, cmd: &CommandSpec) -> Result<String, Box<dyn Error + Send + Sync>> {
        match self.runner.run(cmd, None)? {
            CommandOutcome::Exited { code: 0, stdout, .. } => Ok(stdout),
            CommandOutcome::Exited { code, stderr, .. } => {
                Err(format!("{} failed ({code}): {}", cmd.display(), stderr.trim()).into())
            }
            CommandOutcome::TimedOut => Err(format!("{} timed out", cmd.display()).into()),
        }
    }

    /// Runs one guestfish command against the listening daemon.
    fn remote<'a>(
        &self,
        args: impl IntoIterator<Item = &'a str>,
    ) -> Result<String, Box<dyn Error + Send + Sync>> {
        let pid = self.current_pid()?;
        let cmd = CommandSpec::new("guestfish").arg(format!("--remote={pid}")).arg("--").args(args);
        debug!(command = %cmd.display(), "guestfish");
        self.exec(&cmd)
    }
}

/// Pulls the PID out of `GUESTFISH_PID=1234; export GUESTFISH_PID`.
fn parse_listen_pid(output: &str) -> Option<u32> {
    output
        .split(';')
        .find_map(|part| part.trim().strip_prefix("GUESTFISH_PID="))
        .and_then(|pid| pid.trim().parse().ok())
}

/// Last `part_num: N` in `part-list` output.
fn parse_last_part_num(output: &str) -> Option<u32> {
    output
        .lines()
        .filter_map(|line| line.trim().strip_prefix("part_num:"))
        .filter_map(|n| n.trim().parse().ok())
        .last()
}

fn lines(output: &str) -> Vec<String> {
    output.lines().map(str::trim).filter(|l| !l.is_empty()).map(str::to_string).collect()
}

impl DiskImager for GuestfishImager {
    fn create_disk(&self, path: &Path, size: u64) -> Result<(), Box<dyn Error + Send + Sync>> {
        let file = File::create(path)?;
        file.set_len(size)?;
        Ok(())
    }

    fn launch(&self, path: &Path) -> Result<String, Box<dyn Error + Send + Sync>> {
        let out = self.exec(&CommandSpec::new("guestfish").arg("--listen"))?;
        let pid = parse_listen_pid(&out)
            .ok_or_else(|| format!("unexpected guestfish --listen output: {}", out.trim()))?;
        *self.pid.lock().map_err(|e| format!("guestfish state poisoned: {e}"))? = Some(pid);

        let drive = path.display().to_string();
        self.remote(["add-drive", drive.as_str(), "format:raw", "readonly:false"])?;
        self.remote(["run"])?;
        let devices = lines(&self.remote(["list-devices"])?);
        devices.into_iter().next().ok_or_else(|| "appliance reports no devices".into())
    }

    fn part_init(&self, device: &str, label: &str) -> Result<(), Box<dyn Error + Send + Sync>> {
        self.remote(["part-init", device, label]).map(drop)
    }

    fn part_add(
        &self,
        device: &str,
        kind: PartitionKind,
        start: i64,
        end: i64,
    ) -> Result<AddedPartition, Box<dyn Error + Send + Sync>> {
        let (start, end) = (start.to_string(), end.to_string());
        self.remote(["part-add", device, kind.code(), start.as_str(), end.as_str()])?;
        let partition = lines(&self.remote(["list-partitions"])?)
            .pop()
            .ok_or("no partitions after part-add")?;
        let number = parse_last_part_num(&self.remote(["part-list", device])?)
            .ok_or("part-list returned no partitions")?;
        Ok(AddedPartition { device: partition, number })
    }

    fn part_set_gpt_type(
        &self,
        device: &str,
        number: u32,
        guid: &str,
    ) -> Result<(), Box<dyn Error + Send + Sync>> {
        let number = number.to_string();
        self.remote(["part-set-gpt-type", device, number.as_str(), guid]).map(drop)
    }

    fn mkfs(
        &self,
        fstype: &str,
        partition: &str,
        label: Option<&str>,
    ) -> Result<(), Box<dyn Error + Send + Sync>> {
        match label {
            Some(label) => {
                let label = format!("label:{label}");
                self.remote(["mkfs", fstype, partition, label.as_str()]).map(drop)
            }
            None => self.remote(["mkfs", fstype, partition]).map(drop),
        }
    }

    fn list_partitions(&self) -> Result<Vec<String>, Box<dyn Error + Send + Sync>> {
        Ok(lines(&self.remote(["list-partitions"])?))
    }

    fn mount(&self, partition: &str) -> Result<(), Box<dyn Error + Send + Sync>> {
        self.remote(["mount", partition, "/"]).map(drop)
    }

    fn write(&self, path: &str, content: &str) -> Result<(), Box<dyn Error + Send + Sync>> {
        self.remote(["write", path, content])?;
        self.remote(["sync"]).map(drop)
    }

    fn upload(&self, local: &Path, target: &str) -> Result<(), Box<dyn Error + Send + Sync>> {
        let local = local.display().to_string();
        self.remote(["upload", local.as_str(), target])?;
        self.remote(["sync"]).map(drop)
    }

    fn umount(&self) -> Result<(), Box<dyn Error + Send + Sync>> {
        self.remote(["umount", "/"]).map(drop)
    }

    fn shutdown(&self) -> Result<(), Box<dyn Error + Send + Sync>> {
        let pid = self.pid.lock().map_err(|e| format!("guestfish state poisoned: {e}"))?.take();
        let Some(pid) = pid else {
            return Ok(());
        };
        let cmd = CommandSpec::new("guestfish").arg(format!("--remote={pid}")).args(["--", "exit"]);
        self.exec(&cmd).map(drop)
    }
}
