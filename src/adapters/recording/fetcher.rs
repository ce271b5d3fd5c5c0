//! Recording adapter for the `AssetFetcher` port.

use std::error::Error;
use std::path::Path;

use serde::Serialize;

use super::record_result;
use crate::cassette::session::SharedRecorder;
use crate::ports::AssetFetcher;

/// Records downloads while delegating to an inner fetcher.
pub struct RecordingAssetFetcher {
    inner: Box<dyn AssetFetcher>,
    recorder: SharedRecorder,
}

impl RecordingAssetFetcher {
    /// Wraps `inner`.
    pub fn new(inner: Box<dyn AssetFetcher>, recorder: SharedRecorder) -> Self {
        Self { inner, recorder }
    }
}

#[derive(Serialize)]
struct DownloadInput<'a> {
    url: &'a str,
    dest: String,
}

impl AssetFetcher for RecordingAssetFetcher {
    fn download(&self, url: &str, dest: &Path) -> Result<(), Box<dyn Error + Send + Sync>> {
        let result = self.inner.download(url, dest);
        let input = DownloadInput { url, dest: dest.display().to_string() };
        record_result(&self.recorder, "fetcher", "download", &input, &result);
        result
    }
}
