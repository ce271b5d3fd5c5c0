//! Work-directory maintenance around reconciliation: listing, rename
//! migration, deletion of unwanted images and leftover temp files.

use std::collections::BTreeSet;
use std::path::Path;

use tracing::{debug, info, warn};

use crate::catalog::Rename;
use crate::error::WorkDirError;
use crate::image::naming::{is_engine_owned, is_temp_image};
use crate::ports::FileSystem;

/// Engine-owned image filenames in `work_dir`.
///
/// # Errors
///
/// Returns [`WorkDirError::List`] if the directory cannot be listed.
pub fn list_engine_files(
    fs: &dyn FileSystem,
    work_dir: &Path,
) -> Result<BTreeSet<String>, WorkDirError> {
    let entries = fs
        .list_dir(work_dir)
        .map_err(|e| WorkDirError::List { dir: work_dir.to_path_buf(), reason: e.to_string() })?;
    Ok(entries.into_iter().filter(|name| is_engine_owned(name)).collect())
}

/// Applies each rename whose old file exists and whose new file does not.
/// Returns the renames that were applied.
///
/// # Errors
///
/// Returns [`WorkDirError::Rename`] if an eligible rename fails.
pub fn apply_renames<'a>(
    fs: &dyn FileSystem,
    work_dir: &Path,
    renames: &'a [Rename],
) -> Result<Vec<&'a Rename>, WorkDirError> {
    let mut applied = Vec::new();
    for rename in renames {
        let from = work_dir.join(&rename.from);
        let to = work_dir.join(&rename.to);
        if !fs.exists(&from) {
            debug!(from = %rename.from, "rename source absent, skipping");
            continue;
        }
        if fs.exists(&to) {
            warn!(from = %rename.from, to = %rename.to, "rename target exists, leaving source alone");
            continue;
        }
        fs.rename(&from, &to).map_err(|e| WorkDirError::Rename {
            from: rename.from.clone(),
            to: rename.to.clone(),
            reason: e.to_string(),
        })?;
        info!("Renamed {} to {}", rename.from, rename.to);
        applied.push(rename);
    }
    Ok(applied)
}

/// Best-effort removal of each named file from `work_dir`. A file that
/// cannot be removed is logged and skipped. Returns the names removed.
pub fn delete_files<'a>(
    fs: &dyn FileSystem,
    work_dir: &Path,
    names: impl IntoIterator<Item = &'a String>,
) -> Vec<&'a String> {
    names
        .into_iter()
        .filter(|name| match fs.remove_file(&work_dir.join(name)) {
            Ok(()) => {
                info!("Removed {name}");
                true
            }
            Err(e) => {
                warn!(file = %name, error = %e, "could not remove image");
                false
            }
        })
        .collect()
}

/// Best-effort removal of in-progress `disk*.tmp` files. Returns the
/// names removed.
pub fn remove_temp_files(fs: &dyn FileSystem, work_dir: &Path) -> Vec<String> {
    let Ok(entries) = fs.list_dir(work_dir) else {
        return Vec::new();
    };
    entries
        .into_iter()
        .filter(|name| is_temp_image(name))
        .filter(|name| match fs.remove_file(&work_dir.join(name)) {
            Ok(()) => true,
            Err(e) => {
                warn!(file = %name, error = %e, "could not remove temporary image");
                false
            }
        })
        .collect()
}
