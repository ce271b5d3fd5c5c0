//! Replaying adapters: serve recorded port outputs from cassettes.

pub mod clock;
pub mod fetcher;
pub mod filesystem;
pub mod hypervisor;
pub mod imager;
pub mod releases;
pub mod runner;

pub use clock::ReplayingClock;
pub use fetcher::ReplayingAssetFetcher;
pub use filesystem::ReplayingFileSystem;
pub use hypervisor::ReplayingHypervisor;
pub use imager::ReplayingDiskImager;
pub use releases::ReplayingReleaseDiscovery;
pub use runner::ReplayingCommandRunner;

use std::error::Error;
use std::sync::Mutex;

use serde::de::DeserializeOwned;

use crate::cassette::replayer::CassetteReplayer;

/// Takes the output of the next recorded `port::method` call.
pub(crate) fn next_output(
    replayer: &Mutex<CassetteReplayer>,
    port: &str,
    method: &str,
) -> serde_json::Value {
    let mut replayer = replayer.lock().expect("replayer lock poisoned");
    replayer.next_interaction(port, method).output.clone()
}

/// Turns `{"ok": value}` / `{"err": "message"}` back into a `Result`.
pub(crate) fn extract_result<T: DeserializeOwned>(
    output: &serde_json::Value,
    context: &str,
) -> Result<T, Box<dyn Error + Send + Sync>> {
    if let Some(err) = output.get("err") {
        let msg = err.as_str().unwrap_or("unknown error").to_string();
        return Err(msg.into());
    }
    let value = output.get("ok").unwrap_or(output);
    serde_json::from_value(value.clone())
        .map_err(|e| format!("{context}: failed to deserialize: {e}").into())
}

/// Replays the next `port::method` call as a `Result`.
pub(crate) fn replay_result<T: DeserializeOwned>(
    replayer: &Mutex<CassetteReplayer>,
    port: &str,
    method: &str,
) -> Result<T, Box<dyn Error + Send + Sync>> {
    let output = next_output(replayer, port, method);
    extract_result(&output, &format!("{port}::{method}"))
}
