//! `hddkit <group>` command: unconditional rebuild of one group.

use tracing::info;

use super::{load_catalog, ExitStatus};
use crate::build::{build_image, BuildOutcome};
use crate::catalog::ReleaseKey;
use crate::cli::GroupArgs;
use crate::config::EngineConfig;
use crate::context::ServiceContext;
use crate::error::CatalogError;
use crate::resolve::{Overrides, Resolver};

/// Rebuilds the images of `args.name`, narrowed by the given options.
///
/// Existing images are overwritten whether or not they are current.
///
/// # Errors
///
/// Returns an error string for an unknown group, an invalid override, or
/// the first failed build.
pub fn run(
    ctx: &ServiceContext,
    config: &EngineConfig,
    args: &GroupArgs,
) -> Result<ExitStatus, String> {
    let catalog = load_catalog(ctx, config)?;
    let group = catalog.group(&args.name).ok_or_else(|| {
        format!(
            "{} (known groups: {})",
            CatalogError::UnknownGroup(args.name.clone()),
            catalog.group_names().join(", ")
        )
    })?;

    let narrow = &args.narrow;
    let release = narrow
        .release
        .as_deref()
        .map(|raw| ReleaseKey::parse_for(&args.name, raw))
        .transpose()
        .map_err(|e| e.to_string())?;
    let overrides = Overrides {
        label: narrow.label.clone(),
        filesystem: narrow.filesystem.clone(),
        release,
        arch: narrow.arch.clone(),
    };

    let images = Resolver::new(ctx, narrow.nextrel)
        .resolve_group(group, &overrides)
        .map_err(|e| e.to_string())?;
    if images.is_empty() {
        info!("Nothing to build for {}", args.name);
    }
    for image in &images {
        if let BuildOutcome::Skipped { reason } =
            build_image(ctx, config, image).map_err(|e| e.to_string())?
        {
            info!("Skipped {}: {reason}", image.filename());
        }
    }
    Ok(ExitStatus::Success)
}
