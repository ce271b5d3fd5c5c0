//! Replaying adapter for the `ReleaseDiscovery` port.

use std::error::Error;
use std::sync::Mutex;

use super::replay_result;
use crate::cassette::replayer::CassetteReplayer;
use crate::ports::releases::ReleaseDiscovery;

/// Serves recorded release answers.
pub struct ReplayingReleaseDiscovery {
    replayer: Mutex<CassetteReplayer>,
}

impl ReplayingReleaseDiscovery {
    /// Creates a replaying discovery source.
    #[must_use]
    pub fn new(replayer: CassetteReplayer) -> Self {
        Self { replayer: Mutex::new(replayer) }
    }
}

impl ReleaseDiscovery for ReplayingReleaseDiscovery {
    fn stable_release(&self) -> Result<u32, Box<dyn Error + Send + Sync>> {
        replay_result(&self.replayer, "releases", "stable_release")
    }

    fn branched_release(&self) -> Result<Option<u32>, Box<dyn Error + Send + Sync>> {
        replay_result(&self.replayer, "releases", "branched_release")
    }
}
