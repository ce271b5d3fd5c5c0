//! Service context bundling all port trait objects.

use std::error::Error;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::adapters::live::{
    GuestfishImager, HttpReleaseDiscovery, LiveAssetFetcher, LiveClock, LiveCommandRunner,
    LiveFileSystem, VirshHypervisor,
};
use crate::adapters::recording::{
    RecordingAssetFetcher, RecordingClock, RecordingCommandRunner, RecordingDiskImager,
    RecordingFileSystem, RecordingHypervisor, RecordingReleaseDiscovery,
};
use crate::adapters::replaying::{
    ReplayingAssetFetcher, ReplayingClock, ReplayingCommandRunner, ReplayingDiskImager,
    ReplayingFileSystem, ReplayingHypervisor, ReplayingReleaseDiscovery,
};
use crate::cassette::config::CassetteConfig;
use crate::cassette::session::RecordingSession;
use crate::catalog::PartitionKind;
use crate::config::EngineConfig;
use crate::ports::{
    AddedPartition, AssetFetcher, Clock, CommandOutcome, CommandRunner, CommandSpec, DiskImager,
    DomainState, FileSystem, Hypervisor, ReleaseDiscovery,
};

/// Bundles all port trait objects into a single context.
///
/// Each field provides access to one external boundary. Constructors
/// wire up different adapter implementations (live, replaying, recording).
pub struct ServiceContext {
    /// Clock for staleness checks.
    pub clock: Box<dyn Clock>,
    /// Filesystem for the work and script directories.
    pub fs: Box<dyn FileSystem>,
    /// Runner for external tools (installer, profile query).
    pub runner: Box<dyn CommandRunner>,
    /// Hypervisor controlling the throwaway install domain.
    pub hypervisor: Box<dyn Hypervisor>,
    /// Disk imaging appliance for structural builds.
    pub imager: Box<dyn DiskImager>,
    /// Release discovery for symbolic release keys.
    pub releases: Box<dyn ReleaseDiscovery>,
    /// Fetcher for remote upload assets.
    pub fetcher: Box<dyn AssetFetcher>,
}

impl ServiceContext {
    /// Bundles the given adapters.
    #[must_use]
    pub fn new(
        clock: Box<dyn Clock>,
        fs: Box<dyn FileSystem>,
        runner: Box<dyn CommandRunner>,
        hypervisor: Box<dyn Hypervisor>,
        imager: Box<dyn DiskImager>,
        releases: Box<dyn ReleaseDiscovery>,
        fetcher: Box<dyn AssetFetcher>,
    ) -> Self {
        Self { clock, fs, runner, hypervisor, imager, releases, fetcher }
    }

    /// Creates a context backed by the real system.
    #[must_use]
    pub fn live(config: &EngineConfig) -> Self {
        Self::new(
            Box::new(LiveClock),
            Box::new(LiveFileSystem),
            Box::new(LiveCommandRunner),
            Box::new(VirshHypervisor::new(config.libvirt_uri.clone())),
            Box::new(GuestfishImager::default()),
            Box::new(HttpReleaseDiscovery::new(config.release_metadata_url.clone())),
            Box::new(LiveAssetFetcher::new()),
        )
    }

    /// Creates a live context whose every port call is recorded into a
    /// fresh timestamped directory under `base`.
    ///
    /// Drop the context, then call [`RecordingSession::finish`] to write
    /// the cassettes. This is the developer-only mechanism behind
    /// `HDDKIT_RECORD`.
    ///
    /// # Errors
    ///
    /// Returns an error if the session directory cannot be created.
    pub fn recording_at(
        base: &Path,
        config: &EngineConfig,
    ) -> Result<(Self, RecordingSession), String> {
        let session = RecordingSession::new(base)?;
        let live = Self::live(config);
        let ctx = Self::new(
            Box::new(RecordingClock::new(live.clock, Arc::clone(&session.clock))),
            Box::new(RecordingFileSystem::new(live.fs, Arc::clone(&session.fs))),
            Box::new(RecordingCommandRunner::new(live.runner, Arc::clone(&session.runner))),
            Box::new(RecordingHypervisor::new(live.hypervisor, Arc::clone(&session.hypervisor))),
            Box::new(RecordingDiskImager::new(live.imager, Arc::clone(&session.imager))),
            Box::new(RecordingReleaseDiscovery::new(live.releases, Arc::clone(&session.releases))),
            Box::new(RecordingAssetFetcher::new(live.fetcher, Arc::clone(&session.fetcher))),
        );
        Ok((ctx, session))
    }

    /// Creates a replaying context from per-port cassette files.
    ///
    /// Ports without a configured cassette file use a panicking adapter
    /// that fails with a clear message when called.
    ///
    /// # Errors
    ///
    /// Returns an error if any configured cassette file cannot be read or parsed.
    pub fn replaying_from(config: &CassetteConfig) -> Result<Self, String> {
        let replayers = config.load_all()?;

        Ok(Self {
            clock: match replayers.clock {
                Some(r) => Box::new(ReplayingClock::new(r)),
                None => Box::new(Unconfigured),
            },
            fs: match replayers.fs {
                Some(r) => Box::new(ReplayingFileSystem::new(r)),
                None => Box::new(Unconfigured),
            },
            runner: match replayers.runner {
                Some(r) => Box::new(ReplayingCommandRunner::new(r)),
                None => Box::new(Unconfigured),
            },
            hypervisor: match replayers.hypervisor {
                Some(r) => Box::new(ReplayingHypervisor::new(r)),
                None => Box::new(Unconfigured),
            },
            imager: match replayers.imager {
                Some(r) => Box::new(ReplayingDiskImager::new(r)),
                None => Box::new(Unconfigured),
            },
            releases: match replayers.releases {
                Some(r) => Box::new(ReplayingReleaseDiscovery::new(r)),
                None => Box::new(Unconfigured),
            },
            fetcher: match replayers.fetcher {
                Some(r) => Box::new(ReplayingAssetFetcher::new(r)),
                None => Box::new(Unconfigured),
            },
        })
    }

    /// Replays a directory written by a recording session.
    ///
    /// # Errors
    ///
    /// Returns an error if a cassette in `dir` cannot be read or parsed.
    pub fn replaying_dir(dir: &Path) -> Result<Self, String> {
        Self::replaying_from(&CassetteConfig::from_dir(dir))
    }
}

// --- Panicking adapter for ports without a cassette ---

struct Unconfigured;

fn unconfigured(port: &str) -> ! {
    panic!("{port} port not configured in CassetteConfig: no cassette loaded for {port}");
}

type PortResult<T> = Result<T, Box<dyn Error + Send + Sync>>;

impl Clock for Unconfigured {
    fn now(&self) -> DateTime<Utc> {
        unconfigured("clock")
    }
}

impl FileSystem for Unconfigured {
    fn read_to_string(&self, _path: &Path) -> PortResult<String> {
        unconfigured("fs")
    }
    fn exists(&self, _path: &Path) -> bool {
        unconfigured("fs")
    }
    fn list_dir(&self, _path: &Path) -> PortResult<Vec<String>> {
        unconfigured("fs")
    }
    fn modified(&self, _path: &Path) -> PortResult<DateTime<Utc>> {
        unconfigured("fs")
    }
    fn rename(&self, _from: &Path, _to: &Path) -> PortResult<()> {
        unconfigured("fs")
    }
    fn remove_file(&self, _path: &Path) -> PortResult<()> {
        unconfigured("fs")
    }
    fn make_world_readable(&self, _path: &Path) -> PortResult<()> {
        unconfigured("fs")
    }
}

impl CommandRunner for Unconfigured {
    fn run(&self, _command: &CommandSpec, _timeout: Option<Duration>) -> PortResult<CommandOutcome> {
        unconfigured("runner")
    }
}

impl Hypervisor for Unconfigured {
    fn domain_state(&self, _name: &str) -> PortResult<Option<DomainState>> {
        unconfigured("hypervisor")
    }
    fn destroy(&self, _name: &str) -> PortResult<()> {
        unconfigured("hypervisor")
    }
    fn undefine(&self, _name: &str) -> PortResult<()> {
        unconfigured("hypervisor")
    }
}

impl DiskImager for Unconfigured {
    fn create_disk(&self, _path: &Path, _size: u64) -> PortResult<()> {
        unconfigured("imager")
    }
    fn launch(&self, _path: &Path) -> PortResult<String> {
        unconfigured("imager")
    }
    fn part_init(&self, _device: &str, _label: &str) -> PortResult<()> {
        unconfigured("imager")
    }
    fn part_add(
        &self,
        _device: &str,
        _kind: PartitionKind,
        _start: i64,
        _end: i64,
    ) -> PortResult<AddedPartition> {
        unconfigured("imager")
    }
    fn part_set_gpt_type(&self, _device: &str, _number: u32, _guid: &str) -> PortResult<()> {
        unconfigured("imager")
    }
    fn mkfs(&self, _fstype: &str, _partition: &str, _label: Option<&str>) -> PortResult<()> {
        unconfigured("imager")
    }
    fn list_partitions(&self) -> PortResult<Vec<String>> {
        unconfigured("imager")
    }
    fn mount(&self, _partition: &str) -> PortResult<()> {
        unconfigured("imager")
    }
    fn write(&self, _path: &str, _content: &str) -> PortResult<()> {
        unconfigured("imager")
    }
    fn upload(&self, _local: &Path, _target: &str) -> PortResult<()> {
        unconfigured("imager")
    }
    fn umount(&self) -> PortResult<()> {
        unconfigured("imager")
    }
    fn shutdown(&self) -> PortResult<()> {
        unconfigured("imager")
    }
}

impl ReleaseDiscovery for Unconfigured {
    fn stable_release(&self) -> PortResult<u32> {
        unconfigured("releases")
    }
    fn branched_release(&self) -> PortResult<Option<u32>> {
        unconfigured("releases")
    }
}

impl AssetFetcher for Unconfigured {
    fn download(&self, _url: &str, _dest: &Path) -> PortResult<()> {
        unconfigured("fetcher")
    }
}
