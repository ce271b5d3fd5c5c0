//! Installer builder: runs the OS installer against a throwaway domain.
//!
//! Every attempt starts by clearing out the fixed domain, then runs the
//! installer with a wall-clock cap. A timed-out attempt is retried up to
//! `install_retries` times; any other failure is fatal at once. After a
//! clean exit the domain must be shut off before the disk is accepted.

use std::path::Path;

use tracing::{debug, info, warn};

use super::location::{
    find_kickstart, host_arch, install_location, memory_mib, profile_id, supported_arches,
    FALLBACK_PROFILE,
};
use super::{discard, BuildOutcome};
use crate::catalog::size::to_gib_ceil;
use crate::config::{EngineConfig, DOMAIN_NAME};
use crate::context::ServiceContext;
use crate::error::BuildError;
use crate::image::naming::temp_filename;
use crate::image::{InstallerImage, Release};
use crate::ports::{CommandOutcome, CommandSpec, DomainState};

/// Builds installer images through the runner and hypervisor ports.
pub struct InstallerBuilder<'a> {
    ctx: &'a ServiceContext,
    config: &'a EngineConfig,
    host_arch: String,
}

impl<'a> InstallerBuilder<'a> {
    /// Creates a builder for this host's architecture.
    #[must_use]
    pub fn new(ctx: &'a ServiceContext, config: &'a EngineConfig) -> Self {
        Self::for_host(ctx, config, host_arch())
    }

    /// Creates a builder that gates arches as if running on `host`.
    #[must_use]
    pub fn for_host(ctx: &'a ServiceContext, config: &'a EngineConfig, host: &str) -> Self {
        Self { ctx, config, host_arch: host.to_string() }
    }

    /// Builds `image` into the work directory.
    ///
    /// # Errors
    ///
    /// Returns [`BuildError::TimedOutTooManyTimes`] when every attempt
    /// timed out, [`BuildError::InstallerFailed`] on a nonzero exit,
    /// [`BuildError::DomainNotShutOff`] when the domain is left in any
    /// other state, and [`BuildError::MissingKickstart`] or a port error
    /// for problems found before the first attempt.
    pub fn build(&self, image: &InstallerImage) -> Result<BuildOutcome, BuildError> {
        if !supported_arches(&self.host_arch).contains(&image.arch.as_str()) {
            info!(
                "Won't create {} image on {} host. This is normal, don't worry. Run again on a \
                 {} host to create its base images",
                image.arch, self.host_arch, image.arch
            );
            return Ok(BuildOutcome::Skipped {
                reason: format!("{} images cannot be built on a {} host", image.arch, self.host_arch),
            });
        }

        let kickstart = find_kickstart(&*self.ctx.fs, &self.config.script_dir, image).ok_or_else(
            || BuildError::MissingKickstart {
                image: image.filename.clone(),
                dir: self.config.script_dir.clone(),
            },
        )?;
        debug!(kickstart = %kickstart, "using kickstart");
        let profile = self.profile(image.release);
        let location = self.location(image)?;
        let command = self.install_command(image, &profile, &location, &kickstart);

        let tmp = self.config.work_path(&temp_filename(&image.filename));
        let attempts = self.config.install_retries + 1;
        for attempt in 1..=attempts {
            self.clear_domain();
            info!("Install starting...");
            debug!(command = %command.display(), attempt, "running installer");
            if !self.config.interactive {
                info!("Connect via VNC to monitor");
            }

            let outcome = self.ctx.runner.run(&command, Some(self.config.install_timeout));
            match outcome {
                Ok(CommandOutcome::TimedOut) => {
                    warn!("Image creation timed out!");
                    self.clear_domain();
                    discard(&*self.ctx.fs, &tmp);
                    if attempt < attempts {
                        info!("Retrying: {} retries remain after this", attempts - attempt - 1);
                    }
                }
                Ok(CommandOutcome::Exited { code: 0, .. }) => return self.accept(image, &tmp),
                Ok(CommandOutcome::Exited { code, .. }) => {
                    discard(&*self.ctx.fs, &tmp);
                    return Err(BuildError::InstallerFailed { command: command.display(), code });
                }
                Err(e) => {
                    discard(&*self.ctx.fs, &tmp);
                    return Err(BuildError::port(format!("run {}", command.program), &*e));
                }
            }
        }
        Err(BuildError::TimedOutTooManyTimes { image: image.filename.clone(), attempts })
    }

    /// Checks the domain is off, then moves the readable disk into place.
    fn accept(&self, image: &InstallerImage, tmp: &Path) -> Result<BuildOutcome, BuildError> {
        let state = self.ctx.hypervisor.domain_state(DOMAIN_NAME).map_err(|e| {
            discard(&*self.ctx.fs, tmp);
            BuildError::port("query domain state", &*e)
        })?;
        if state != Some(DomainState::ShutOff) {
            discard(&*self.ctx.fs, tmp);
            return Err(BuildError::DomainNotShutOff {
                domain: DOMAIN_NAME.to_string(),
                state: state.map_or_else(|| "undefined".to_string(), |s| s.to_string()),
            });
        }

        self.ctx.fs.make_world_readable(tmp).map_err(|e| {
            discard(&*self.ctx.fs, tmp);
            BuildError::port("set image permissions", &*e)
        })?;
        let target = self.config.work_path(&image.filename);
        self.ctx.fs.rename(tmp, &target).map_err(|e| {
            discard(&*self.ctx.fs, tmp);
            BuildError::port("rename image", &*e)
        })?;
        // The image is final from here on; the domain is already off.
        if let Err(e) = self.ctx.hypervisor.undefine(DOMAIN_NAME) {
            warn!(error = %e, "could not undefine the build domain");
        }
        info!("Created {}", image.filename);
        Ok(BuildOutcome::Built)
    }

    /// Destroys and undefines the build domain. Absent or stopped domains
    /// are fine.
    fn clear_domain(&self) {
        if let Err(e) = self.ctx.hypervisor.destroy(DOMAIN_NAME) {
            debug!(error = %e, "destroy skipped");
        }
        if let Err(e) = self.ctx.hypervisor.undefine(DOMAIN_NAME) {
            debug!(error = %e, "undefine skipped");
        }
    }

    /// Installer profile for `release`, or the generic one if the host's
    /// registry does not know it.
    fn profile(&self, release: Release) -> String {
        let id = profile_id(release);
        let query = CommandSpec::new("osinfo-query").arg("os").arg(format!("short-id={id}"));
        match self.ctx.runner.run(&query, None) {
            Ok(CommandOutcome::Exited { stdout, .. })
                if stdout.split(|c: char| c.is_whitespace() || c == '|').any(|t| t == id) =>
            {
                id
            }
            Ok(_) => FALLBACK_PROFILE.to_string(),
            Err(e) => {
                warn!(error = %e, "installer profile lookup failed");
                FALLBACK_PROFILE.to_string()
            }
        }
    }

    fn location(&self, image: &InstallerImage) -> Result<String, BuildError> {
        let stable = match image.release {
            Release::Rawhide => None,
            Release::Number(_) => Some(
                self.ctx
                    .releases
                    .stable_release()
                    .map_err(|e| BuildError::port("discover stable release", &*e))?,
            ),
        };
        Ok(install_location(
            &self.config.mirror,
            image.release,
            stable,
            &image.arch,
            image.variant.as_deref(),
        ))
    }

    fn install_command(
        &self,
        image: &InstallerImage,
        profile: &str,
        location: &str,
        kickstart: &str,
    ) -> CommandSpec {
        let tmp = self.config.work_path(&temp_filename(&image.filename));
        let size_gib = to_gib_ceil(image.size);
        let mut cmd = CommandSpec::new("virt-install")
            .arg("--disk")
            .arg(format!("size={size_gib},path={}", tmp.display()))
            .args(["--os-variant", profile])
            .arg("-x")
            .arg(format!("inst.ks=file:/{kickstart}"))
            .arg("--initrd-inject")
            .arg(self.config.script_path(kickstart).display().to_string())
            .args(["--location", location, "--name", DOMAIN_NAME])
            .arg("--memory")
            .arg(memory_mib(&image.arch).to_string())
            .args(["--noreboot", "--wait", "-1"]);
        if self.config.installer_debug {
            cmd = cmd.arg("--debug");
        }
        if let Some(bootopts) = &image.bootopts {
            cmd = cmd.args(["--boot", bootopts.as_str()]);
        }
        cmd = if self.config.interactive {
            cmd.args(["--graphics", "none", "--extra-args", "console=ttyS0"]).inherit_output(true)
        } else {
            cmd.args(["--graphics", "vnc", "--noautoconsole"])
        };
        cmd.args(["--network", "user"])
    }
}
