//! Release discovery port: which OS releases currently exist.

use std::error::Error;

/// Answers questions about the distribution's release cycle.
pub trait ReleaseDiscovery: Send + Sync {
    /// Returns the newest stable release number.
    ///
    /// # Errors
    ///
    /// Returns an error if the release metadata cannot be fetched or parsed.
    fn stable_release(&self) -> Result<u32, Box<dyn Error + Send + Sync>>;

    /// Returns the branched (feature-frozen, not yet stable) release, if
    /// one exists right now.
    ///
    /// # Errors
    ///
    /// Returns an error if the release metadata cannot be fetched or parsed.
    fn branched_release(&self) -> Result<Option<u32>, Box<dyn Error + Send + Sync>>;

    /// Returns the release after the newest stable or branched release.
    ///
    /// # Errors
    ///
    /// Returns an error if either underlying query fails.
    fn next_release(&self) -> Result<u32, Box<dyn Error + Send + Sync>> {
        let stable = self.stable_release()?;
        let branched = self.branched_release()?.unwrap_or(0);
        Ok(stable.max(branched) + 1)
    }
}
