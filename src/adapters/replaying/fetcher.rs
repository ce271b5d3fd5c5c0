//! Replaying adapter for the `AssetFetcher` port.

use std::error::Error;
use std::path::Path;
use std::sync::Mutex;

use super::next_output;
use crate::cassette::replayer::CassetteReplayer;
use crate::ports::fetcher::AssetFetcher;

/// Serves recorded download results. A successful download leaves an
/// empty file at the destination, since cassettes hold no payloads.
pub struct ReplayingAssetFetcher {
    replayer: Mutex<CassetteReplayer>,
}

impl ReplayingAssetFetcher {
    /// Creates a replaying fetcher.
    #[must_use]
    pub fn new(replayer: CassetteReplayer) -> Self {
        Self { replayer: Mutex::new(replayer) }
    }
}

impl AssetFetcher for ReplayingAssetFetcher {
    fn download(&self, _url: &str, dest: &Path) -> Result<(), Box<dyn Error + Send + Sync>> {
        let output = next_output(&self.replayer, "fetcher", "download");
        if let Some(err) = output.get("err") {
            return Err(err.as_str().unwrap_or("unknown error").to_string().into());
        }
        std::fs::File::create(dest)?;
        Ok(())
    }
}
