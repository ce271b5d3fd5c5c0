//! Image builders.
//!
//! Both builders share one contract: write into `<filename>.tmp` in the work
//! directory and rename it to the final filename only once everything has
//! succeeded. On failure the temporary file is removed before the error is
//! returned, so a failed build never leaves a final file behind.

pub mod filesystem;
pub mod installer;
pub mod location;

use std::path::Path;

use tracing::warn;

use crate::config::EngineConfig;
use crate::context::ServiceContext;
use crate::error::BuildError;
use crate::image::ConcreteImage;
use crate::ports::FileSystem;

pub use filesystem::FilesystemBuilder;
pub use installer::InstallerBuilder;

/// What a successful build call did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuildOutcome {
    /// The final image file now exists.
    Built,
    /// The image cannot be built on this host; nothing was touched.
    Skipped {
        /// Why the build was skipped.
        reason: String,
    },
}

/// Builds one image with the builder its backend calls for.
///
/// # Errors
///
/// Returns a [`BuildError`] if the build fails; no final file is left.
pub fn build_image(
    ctx: &ServiceContext,
    config: &EngineConfig,
    image: &ConcreteImage,
) -> Result<BuildOutcome, BuildError> {
    match image {
        ConcreteImage::Structural(img) => FilesystemBuilder::new(ctx, config).build(img),
        ConcreteImage::Installer(img) => InstallerBuilder::new(ctx, config).build(img),
    }
}

/// Removes a temporary image if it is there. Failures are only logged.
fn discard(fs: &dyn FileSystem, tmp: &Path) {
    if !fs.exists(tmp) {
        return;
    }
    if let Err(e) = fs.remove_file(tmp) {
        warn!(file = %tmp.display(), error = %e, "could not remove temporary image");
    }
}
