//! Live adapters talking to the real system.

pub mod clock;
pub mod fetcher;
pub mod filesystem;
pub mod hypervisor;
pub mod imager;
pub mod releases;
pub mod runner;

pub use clock::LiveClock;
pub use fetcher::LiveAssetFetcher;
pub use filesystem::LiveFileSystem;
pub use hypervisor::VirshHypervisor;
pub use imager::GuestfishImager;
pub use releases::HttpReleaseDiscovery;
pub use runner::LiveCommandRunner;
