//! Recording adapter for the `Hypervisor` port.

use std::error::Error;

use serde::Serialize;

use super::record_result;
use crate::cassette::session::SharedRecorder;
use crate::ports::{DomainState, Hypervisor};

/// Records domain control calls while delegating to an inner hypervisor.
pub struct RecordingHypervisor {
    inner: Box<dyn Hypervisor>,
    recorder: SharedRecorder,
}

impl RecordingHypervisor {
    /// Wraps `inner`.
    pub fn new(inner: Box<dyn Hypervisor>, recorder: SharedRecorder) -> Self {
        Self { inner, recorder }
    }
}

#[derive(Serialize)]
struct NameInput<'a> {
    name: &'a str,
}

impl Hypervisor for RecordingHypervisor {
    fn domain_state(&self, name: &str) -> Result<Option<DomainState>, Box<dyn Error + Send + Sync>> {
        let result = self.inner.domain_state(name);
        record_result(&self.recorder, "hypervisor", "domain_state", &NameInput { name }, &result);
        result
    }

    fn destroy(&self, name: &str) -> Result<(), Box<dyn Error + Send + Sync>> {
        let result = self.inner.destroy(name);
        record_result(&self.recorder, "hypervisor", "destroy", &NameInput { name }, &result);
        result
    }

    fn undefine(&self, name: &str) -> Result<(), Box<dyn Error + Send + Sync>> {
        let result = self.inner.undefine(name);
        record_result(&self.recorder, "hypervisor", "undefine", &NameInput { name }, &result);
        result
    }
}
