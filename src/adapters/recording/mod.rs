//! Recording adapters: delegate to an inner port and log every call to a cassette.

pub mod clock;
pub mod fetcher;
pub mod filesystem;
pub mod hypervisor;
pub mod imager;
pub mod releases;
pub mod runner;

pub use clock::RecordingClock;
pub use fetcher::RecordingAssetFetcher;
pub use filesystem::RecordingFileSystem;
pub use hypervisor::RecordingHypervisor;
pub use imager::RecordingDiskImager;
pub use releases::RecordingReleaseDiscovery;
pub use runner::RecordingCommandRunner;

use serde::Serialize;

use crate::cassette::session::SharedRecorder;

/// Records an interaction whose return value is not a `Result`.
///
/// Mirror of the replaying side, which reads the output back verbatim.
pub(crate) fn record_interaction<I, O>(
    recorder: &SharedRecorder,
    port: &str,
    method: &str,
    input: &I,
    output: &O,
) where
    I: Serialize,
    O: Serialize,
{
    let input_json = serde_json::to_value(input).expect("failed to serialize recording input");
    let output_json = serde_json::to_value(output).expect("failed to serialize recording output");

    let mut guard = recorder.lock().expect("recorder lock poisoned");
    guard.record(port, method, input_json, output_json);
}

/// Records a `Result` as `{"ok": value}` or `{"err": "message"}`.
pub(crate) fn record_result<T, E, I>(
    recorder: &SharedRecorder,
    port: &str,
    method: &str,
    input: &I,
    result: &Result<T, E>,
) where
    T: Serialize,
    E: std::fmt::Display,
    I: Serialize,
{
    let input_json = serde_json::to_value(input).expect("failed to serialize recording input");
    let output_json = match result {
        Ok(v) => {
            let inner = serde_json::to_value(v).expect("failed to serialize ok value");
            serde_json::json!({ "ok": inner })
        }
        Err(e) => serde_json::json!({ "err": e.to_string() }),
    };

    let mut guard = recorder.lock().expect("recorder lock poisoned");
    guard.record(port, method, input_json, output_json);
}
