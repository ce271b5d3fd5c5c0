//! Port traits defining external boundaries.
//!
//! Each trait represents a boundary between the engine and an external
//! system (time, the working directory, external programs, the hypervisor,
//! the disk imaging appliance, release metadata, remote assets).
//! Implementations live in `src/adapters/`.

pub mod clock;
pub mod fetcher;
pub mod filesystem;
pub mod hypervisor;
pub mod imager;
pub mod releases;
pub mod runner;

pub use clock::Clock;
pub use fetcher::AssetFetcher;
pub use filesystem::FileSystem;
pub use hypervisor::{DomainState, Hypervisor};
pub use imager::{AddedPartition, DiskImager};
pub use releases::ReleaseDiscovery;
pub use runner::{CommandOutcome, CommandRunner, CommandSpec};
