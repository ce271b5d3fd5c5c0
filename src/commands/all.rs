//! `hddkit all` command.

use tracing::info;

use super::{load_catalog, resolve_expected, survey, ExitStatus};
use crate::build::build_image;
use crate::config::EngineConfig;
use crate::context::ServiceContext;
use crate::reconcile::{apply_renames, delete_files, list_engine_files};

/// Flags of `hddkit all`.
#[derive(Debug, Clone, Copy, Default)]
pub struct AllOptions {
    /// Delete every engine-owned image first.
    pub delete: bool,
    /// Remove unknown images.
    pub clean: bool,
    /// Next release hint.
    pub nextrel: Option<u32>,
}

/// Builds every missing image, then every outdated one.
///
/// The catalog is resolved before anything in the work directory is
/// touched, so a bad catalog never costs an image.
///
/// # Errors
///
/// Returns an error string on a catalog problem, a work directory failure,
/// or the first failed build.
pub fn run(
    ctx: &ServiceContext,
    config: &EngineConfig,
    options: &AllOptions,
) -> Result<ExitStatus, String> {
    let catalog = load_catalog(ctx, config)?;
    let expected = resolve_expected(ctx, &catalog, options.nextrel)?;

    if options.delete {
        info!("Removing all images...");
        let files = list_engine_files(&*ctx.fs, &config.work_dir).map_err(|e| e.to_string())?;
        delete_files(&*ctx.fs, &config.work_dir, &files);
    }
    apply_renames(&*ctx.fs, &config.work_dir, &catalog.renames).map_err(|e| e.to_string())?;

    let result = survey(ctx, config, &expected)?;
    if options.clean {
        delete_files(&*ctx.fs, &config.work_dir, &result.unknown);
    }

    let queue = result.to_build();
    let total = queue.len();
    for (n, image) in queue.into_iter().enumerate() {
        info!("Creating image {}...[{}/{}]", image.filename(), n + 1, total);
        build_image(ctx, config, image).map_err(|e| e.to_string())?;
    }
    Ok(ExitStatus::Success)
}
