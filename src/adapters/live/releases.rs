//! Release discovery from the Fedora QA release metadata document.

use std::error::Error;
use std::sync::Mutex;

use reqwest::blocking::Client;
use serde::Deserialize;
use tracing::debug;

use crate::ports::releases::ReleaseDiscovery;

/// The part of the metadata document the engine reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct ReleaseMetadata {
    /// Newest stable release.
    pub stable: u32,
    /// Branched release; `false`, `null` or absent when there is none.
    #[serde(default, deserialize_with = "branched_or_none")]
    pub branched: Option<u32>,
}

#[derive(Deserialize)]
struct Document {
    fedora: ReleaseMetadata,
}

fn branched_or_none<'de, D>(deserializer: D) -> Result<Option<u32>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(value.as_u64().and_then(|n| u32::try_from(n).ok()).filter(|n| *n > 0))
}

/// Parses the metadata document.
///
/// # Errors
///
/// Returns an error if the text is not a metadata document.
pub fn parse_metadata(text: &str) -> Result<ReleaseMetadata, serde_json::Error> {
    serde_json::from_str::<Document>(text).map(|doc| doc.fedora)
}

/// Fetches the metadata document once per process and answers from it.
pub struct HttpReleaseDiscovery {
    url: String,
    client: Client,
    cached: Mutex<Option<ReleaseMetadata>>,
}

impl HttpReleaseDiscovery {
    /// Creates a discovery client for the document at `url`.
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into(), client: Client::new(), cached: Mutex::new(None) }
    }

    fn metadata(&self) -> Result<ReleaseMetadata, Box<dyn Error + Send + Sync>> {
        let mut cached = self.cached.lock().map_err(|e| format!("release cache poisoned: {e}"))?;
        if let Some(meta) = *cached {
            return Ok(meta);
        }
        debug!(url = %self.url, "fetching release metadata");
        let body = self.client.get(&self.url).send()?.error_for_status()?.text()?;
        let meta = parse_metadata(&body)
            .map_err(|e| format!("bad release metadata from {}: {e}", self.url))?;
        *cached = Some(meta);
        Ok(meta)
    }
}

impl ReleaseDiscovery for HttpReleaseDiscovery {
    fn stable_release(&self) -> Result<u32, Box<dyn Error + Send + Sync>> {
        Ok(self.metadata()?.stable)
    }

    fn branched_release(&self) -> Result<Option<u32>, Box<dyn Error + Send + Sync>> {
        Ok(self.metadata()?.branched)
    }
}
