//! Asset fetcher port for remote upload sources.

use std::error::Error;
use std::path::Path;

/// Downloads remote assets to local files.
pub trait AssetFetcher: Send + Sync {
    /// Downloads `url` into `dest`, overwriting it.
    ///
    /// # Errors
    ///
    /// Returns an error on network failure or a non-success HTTP status.
    fn download(&self, url: &str, dest: &Path) -> Result<(), Box<dyn Error + Send + Sync>>;
}
