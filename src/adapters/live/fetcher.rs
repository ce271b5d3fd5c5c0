//! Asset fetcher over HTTP.

use std::error::Error;
use std::fs::File;
use std::path::Path;

use reqwest::blocking::Client;
use tracing::info;

use crate::ports::fetcher::AssetFetcher;

/// Downloads remote upload sources with a blocking HTTP client.
pub struct LiveAssetFetcher {
    client: Client,
}

impl LiveAssetFetcher {
    /// Creates a fetcher.
    #[must_use]
    pub fn new() -> Self {
        Self { client: Client::new() }
    }
}

impl Default for LiveAssetFetcher {
    fn default() -> Self {
        Self::new()
    }
}

impl AssetFetcher for LiveAssetFetcher {
    fn download(&self, url: &str, dest: &Path) -> Result<(), Box<dyn Error + Send + Sync>> {
        info!(%url, "downloading");
        let mut response = self.client.get(url).send()?.error_for_status()?;
        let mut file = File::create(dest)?;
        response.copy_to(&mut file)?;
        Ok(())
    }
}
