//! Filename convention for image files.
//!
//! The filename is the engine's only persisted state: reconciliation decides
//! "present or not" purely by comparing these strings with the directory
//! listing, so every path that names an image must come through here.
//!
//! ```text
//! structural: disk_<name>[_<imgver>][_<extra>...].img
//! installer:  disk_f<release>_<name>[_<imgver>]_<arch>.img
//! ```

use super::Release;

/// Filename prefix shared by every engine-owned file.
pub const PREFIX: &str = "disk";

/// Suffix of finished images.
pub const IMAGE_SUFFIX: &str = "img";

/// Suffix appended to an image filename while it is being built.
pub const TEMP_SUFFIX: &str = ".tmp";

/// Builds the filename of a structural image.
#[must_use]
pub fn structural_filename(name: &str, imgver: Option<&str>, extras: &[&str]) -> String {
    let mut filename = format!("{PREFIX}_{name}");
    if let Some(ver) = imgver {
        filename.push('_');
        filename.push_str(ver);
    }
    for extra in extras {
        filename.push('_');
        filename.push_str(extra);
    }
    filename.push('.');
    filename.push_str(IMAGE_SUFFIX);
    filename
}

/// Builds the filename of an installer image.
#[must_use]
pub fn installer_filename(release: &Release, name: &str, imgver: Option<&str>, arch: &str) -> String {
    match imgver {
        Some(ver) => format!("{PREFIX}_f{release}_{name}_{ver}_{arch}.{IMAGE_SUFFIX}"),
        None => format!("{PREFIX}_f{release}_{name}_{arch}.{IMAGE_SUFFIX}"),
    }
}

/// Returns the temporary filename used while building `filename`.
#[must_use]
pub fn temp_filename(filename: &str) -> String {
    format!("{filename}{TEMP_SUFFIX}")
}

/// Whether a directory entry belongs to the engine: starts with `disk`
/// and ends with `img`.
#[must_use]
pub fn is_engine_owned(filename: &str) -> bool {
    filename.starts_with(PREFIX) && filename.ends_with(IMAGE_SUFFIX)
}

/// Whether a directory entry is a leftover in-progress build.
#[must_use]
pub fn is_temp_image(filename: &str) -> bool {
    filename.starts_with(PREFIX) && filename.ends_with(TEMP_SUFFIX)
}
