//! Command dispatch and handlers.

pub mod all;
pub mod check;
pub mod group;

use std::env;
use std::path::Path;
use std::process::ExitCode;

use crate::cassette::session::RecordingSession;
use crate::catalog::Catalog;
use crate::cli::{Cli, Command, GroupArgs};
use crate::config::EngineConfig;
use crate::context::ServiceContext;
use crate::image::ConcreteImage;
use crate::reconcile::{list_engine_files, reconcile, ReconciliationResult};
use crate::resolve::Resolver;

/// Environment variable naming a directory to record port cassettes into.
pub const RECORD_ENV: &str = "HDDKIT_RECORD";

/// How a successful command run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitStatus {
    /// Nothing left to do.
    Success,
    /// Every expected image exists, but some are outdated.
    Outdated,
    /// At least one expected image is missing.
    Missing,
}

impl ExitStatus {
    /// Process exit code: 0, 1 or 2.
    #[must_use]
    pub fn code(self) -> u8 {
        match self {
            Self::Success => 0,
            Self::Outdated => 1,
            Self::Missing => 2,
        }
    }

    /// Missing wins over outdated.
    #[must_use]
    pub fn of(result: &ReconciliationResult) -> Self {
        if !result.missing.is_empty() {
            Self::Missing
        } else if !result.outdated.is_empty() {
            Self::Outdated
        } else {
            Self::Success
        }
    }
}

impl From<ExitStatus> for ExitCode {
    fn from(status: ExitStatus) -> Self {
        ExitCode::from(status.code())
    }
}

/// Dispatch a parsed command line to its handler.
///
/// When `HDDKIT_RECORD` is set to a directory path, all port interactions are
/// recorded to per-port cassette files in that directory.
///
/// # Errors
///
/// Returns an error string if the selected command handler fails.
pub fn dispatch(cli: &Cli) -> Result<ExitStatus, String> {
    let mut config = cli.engine_config();
    config.installer_debug = crate::logging::debug_enabled();
    crate::interrupt::install(config.work_dir.clone())?;

    let (ctx, session) = if let Ok(path) = env::var(RECORD_ENV) {
        let (ctx, session) = ServiceContext::recording_at(Path::new(&path), &config)?;
        (ctx, Some(session))
    } else {
        (ServiceContext::live(&config), None)
    };

    let result = dispatch_with_context(&cli.command, &ctx, &config);

    // Cassettes are written even when the command failed.
    if let Some(session) = session {
        drop(ctx);
        finish_recording(session)?;
    }

    result
}

/// Dispatch a command with the given service context.
///
/// # Errors
///
/// Returns an error string if the command fails.
pub fn dispatch_with_context(
    command: &Command,
    ctx: &ServiceContext,
    config: &EngineConfig,
) -> Result<ExitStatus, String> {
    match command {
        Command::All { delete, clean, nextrel } => all::run(
            ctx,
            config,
            &all::AllOptions { delete: *delete, clean: *clean, nextrel: *nextrel },
        ),
        Command::Check { rename, clean, nextrel } => check::run(
            ctx,
            config,
            &check::CheckOptions { rename: *rename, clean: *clean, nextrel: *nextrel },
        ),
        Command::Group(words) => group::run(ctx, config, &GroupArgs::parse_words(words)?),
    }
}

/// Finish a recording session and print the output directory.
fn finish_recording(session: RecordingSession) -> Result<(), String> {
    let output_dir = session.finish()?;
    eprintln!("Recording saved to: {}", output_dir.display());
    Ok(())
}

fn load_catalog(ctx: &ServiceContext, config: &EngineConfig) -> Result<Catalog, String> {
    Catalog::load(ctx, &config.catalog).map_err(|e| e.to_string())
}

fn resolve_expected(
    ctx: &ServiceContext,
    catalog: &Catalog,
    nextrel: Option<u32>,
) -> Result<Vec<ConcreteImage>, String> {
    Resolver::new(ctx, nextrel).resolve_all(catalog).map_err(|e| e.to_string())
}

/// Lists the work directory and classifies it against `expected`.
fn survey(
    ctx: &ServiceContext,
    config: &EngineConfig,
    expected: &[ConcreteImage],
) -> Result<ReconciliationResult, String> {
    let on_disk = list_engine_files(&*ctx.fs, &config.work_dir).map_err(|e| e.to_string())?;
    reconcile(ctx, config, expected, &on_disk).map_err(|e| e.to_string())
}
