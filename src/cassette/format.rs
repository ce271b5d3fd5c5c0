//! Cassette data structures for recording and replaying port interactions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single recorded call on a port.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Interaction {
    /// Sequence number (assigned automatically by the recorder).
    pub seq: u64,
    /// Port name (e.g. "runner", "hypervisor", "imager").
    pub port: String,
    /// Method name invoked on the port.
    pub method: String,
    /// Arguments the port was called with.
    pub input: serde_json::Value,
    /// What the port returned.
    pub output: serde_json::Value,
}

/// A cassette containing a sequence of recorded interactions.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Cassette {
    /// Human-readable name for this cassette.
    pub name: String,
    /// When this cassette was recorded.
    pub recorded_at: DateTime<Utc>,
    /// Version of the tool that recorded it.
    pub version: String,
    /// Ordered list of interactions.
    pub interactions: Vec<Interaction>,
}
