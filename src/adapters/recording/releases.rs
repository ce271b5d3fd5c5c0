//! Recording adapter for the `ReleaseDiscovery` port.

use std::error::Error;

use super::record_result;
use crate::cassette::session::SharedRecorder;
use crate::ports::ReleaseDiscovery;

/// Records release queries while delegating to an inner discovery source.
pub struct RecordingReleaseDiscovery {
    inner: Box<dyn ReleaseDiscovery>,
    recorder: SharedRecorder,
}

impl RecordingReleaseDiscovery {
    /// Wraps `inner`.
    pub fn new(inner: Box<dyn ReleaseDiscovery>, recorder: SharedRecorder) -> Self {
        Self { inner, recorder }
    }
}

impl ReleaseDiscovery for RecordingReleaseDiscovery {
    fn stable_release(&self) -> Result<u32, Box<dyn Error + Send + Sync>> {
        let result = self.inner.stable_release();
        record_result(&self.recorder, "releases", "stable_release", &(), &result);
        result
    }

    fn branched_release(&self) -> Result<Option<u32>, Box<dyn Error + Send + Sync>> {
        let result = self.inner.branched_release();
        record_result(&self.recorder, "releases", "branched_release", &(), &result);
        result
    }
}
