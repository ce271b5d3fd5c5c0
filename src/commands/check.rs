//! `hddkit check` command.

use std::fmt::Write as _;

use tracing::info;

use super::{load_catalog, resolve_expected, survey, ExitStatus};
use crate::config::EngineConfig;
use crate::context::ServiceContext;
use crate::reconcile::{apply_renames, delete_files, ReconciliationResult};

/// Flags of `hddkit check`.
#[derive(Debug, Clone, Copy, Default)]
pub struct CheckOptions {
    /// Apply catalog renames first.
    pub rename: bool,
    /// Remove unknown images after reporting them.
    pub clean: bool,
    /// Next release hint.
    pub nextrel: Option<u32>,
}

/// Reports missing, outdated and unknown images.
///
/// # Errors
///
/// Returns an error string if the catalog cannot be resolved or the work
/// directory cannot be read or changed.
pub fn run(
    ctx: &ServiceContext,
    config: &EngineConfig,
    options: &CheckOptions,
) -> Result<ExitStatus, String> {
    let catalog = load_catalog(ctx, config)?;
    let expected = resolve_expected(ctx, &catalog, options.nextrel)?;
    if options.rename {
        apply_renames(&*ctx.fs, &config.work_dir, &catalog.renames).map_err(|e| e.to_string())?;
    }

    let result = survey(ctx, config, &expected)?;
    print!("{}", report(&result));

    if options.clean && !result.unknown.is_empty() {
        info!("Removing {} unknown images", result.unknown.len());
        delete_files(&*ctx.fs, &config.work_dir, &result.unknown);
    }
    Ok(ExitStatus::of(&result))
}

/// One line per non-empty category.
fn report(result: &ReconciliationResult) -> String {
    let mut out = String::new();
    let join = |images: &[crate::image::ConcreteImage]| {
        images.iter().map(|i| i.filename()).collect::<Vec<_>>().join(", ")
    };
    if !result.missing.is_empty() {
        let _ = writeln!(out, "Missing images: {}", join(&result.missing));
    }
    if !result.outdated.is_empty() {
        let _ = writeln!(out, "Outdated images: {}", join(&result.outdated));
    }
    if !result.unknown.is_empty() {
        let unknown: Vec<&str> = result.unknown.iter().map(String::as_str).collect();
        let _ = writeln!(out, "Unknown images: {}", unknown.join(", "));
    }
    out
}
