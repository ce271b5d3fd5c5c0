//! Hypervisor port for managing the throwaway install domain.

use std::error::Error;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Power state of a defined domain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DomainState {
    /// Running.
    Running,
    /// Paused or suspended.
    Paused,
    /// Shutting down but not yet off.
    ShuttingDown,
    /// Terminal "shut off" state.
    ShutOff,
    /// Crashed.
    Crashed,
    /// Any state the hypervisor reports that is not listed above.
    Other,
}

impl DomainState {
    /// Maps a `virsh domstate` line to a state.
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        match raw.trim() {
            "running" | "idle" => Self::Running,
            "paused" | "pmsuspended" => Self::Paused,
            "in shutdown" => Self::ShuttingDown,
            "shut off" => Self::ShutOff,
            "crashed" => Self::Crashed,
            _ => Self::Other,
        }
    }
}

impl fmt::Display for DomainState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Running => "running",
            Self::Paused => "paused",
            Self::ShuttingDown => "in shutdown",
            Self::ShutOff => "shut off",
            Self::Crashed => "crashed",
            Self::Other => "other",
        };
        f.write_str(s)
    }
}

/// Controls virtual machine domains by name.
pub trait Hypervisor: Send + Sync {
    /// Returns the domain's power state, or `None` if no such domain is defined.
    ///
    /// # Errors
    ///
    /// Returns an error if the hypervisor cannot be queried.
    fn domain_state(&self, name: &str) -> Result<Option<DomainState>, Box<dyn Error + Send + Sync>>;

    /// Forcibly powers the domain off.
    ///
    /// # Errors
    ///
    /// Returns an error if the domain is unknown or not running.
    fn destroy(&self, name: &str) -> Result<(), Box<dyn Error + Send + Sync>>;

    /// Removes the domain definition, including any NVRAM.
    ///
    /// # Errors
    ///
    /// Returns an error if the domain is unknown or cannot be undefined.
    fn undefine(&self, name: &str) -> Result<(), Box<dyn Error + Send + Sync>>;
}
