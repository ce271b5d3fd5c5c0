//! Replaying adapter for the `Hypervisor` port.

use std::error::Error;
use std::sync::Mutex;

use super::replay_result;
use crate::cassette::replayer::CassetteReplayer;
use crate::ports::hypervisor::{DomainState, Hypervisor};

/// Serves recorded domain states and control results.
pub struct ReplayingHypervisor {
    replayer: Mutex<CassetteReplayer>,
}

impl ReplayingHypervisor {
    /// Creates a replaying hypervisor.
    #[must_use]
    pub fn new(replayer: CassetteReplayer) -> Self {
        Self { replayer: Mutex::new(replayer) }
    }
}

impl Hypervisor for ReplayingHypervisor {
    fn domain_state(&self, _name: &str) -> Result<Option<DomainState>, Box<dyn Error + Send + Sync>> {
        replay_result(&self.replayer, "hypervisor", "domain_state")
    }

    fn destroy(&self, _name: &str) -> Result<(), Box<dyn Error + Send + Sync>> {
        replay_result(&self.replayer, "hypervisor", "destroy")
    }

    fn undefine(&self, _name: &str) -> Result<(), Box<dyn Error + Send + Sync>> {
        replay_result(&self.replayer, "hypervisor", "undefine")
    }
}
