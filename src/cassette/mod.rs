//! Cassette format for recording and replaying port interactions.

pub mod config;
pub mod format;
pub mod recorder;
pub mod replayer;
pub mod session;

/// Port names as they appear in cassettes, one cassette file per port.
pub const PORTS: [&str; 7] =
    ["clock", "fs", "runner", "hypervisor", "imager", "releases", "fetcher"];
