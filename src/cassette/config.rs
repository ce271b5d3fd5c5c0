//! Cassette configuration for composable per-port replay.

use std::path::{Path, PathBuf};

use super::format::Cassette;
use super::replayer::CassetteReplayer;

/// Per-port cassette file paths. Ports without a cassette panic if they
/// are called during replay.
#[derive(Debug, Clone, Default)]
pub struct CassetteConfig {
    /// Clock port cassette.
    pub clock: Option<PathBuf>,
    /// Filesystem port cassette.
    pub fs: Option<PathBuf>,
    /// Command runner port cassette.
    pub runner: Option<PathBuf>,
    /// Hypervisor port cassette.
    pub hypervisor: Option<PathBuf>,
    /// Disk imager port cassette.
    pub imager: Option<PathBuf>,
    /// Release discovery port cassette.
    pub releases: Option<PathBuf>,
    /// Asset fetcher port cassette.
    pub fetcher: Option<PathBuf>,
}

/// Per-port replayers, each with its own interaction stream.
pub struct PortReplayers {
    /// Clock replayer.
    pub clock: Option<CassetteReplayer>,
    /// Filesystem replayer.
    pub fs: Option<CassetteReplayer>,
    /// Command runner replayer.
    pub runner: Option<CassetteReplayer>,
    /// Hypervisor replayer.
    pub hypervisor: Option<CassetteReplayer>,
    /// Disk imager replayer.
    pub imager: Option<CassetteReplayer>,
    /// Release discovery replayer.
    pub releases: Option<CassetteReplayer>,
    /// Asset fetcher replayer.
    pub fetcher: Option<CassetteReplayer>,
}

impl CassetteConfig {
    /// Returns a config where no port has a cassette.
    #[must_use]
    pub fn panic_on_unspecified() -> Self {
        Self::default()
    }

    /// Picks up `<port>.cassette.yaml` for every port that has one in
    /// `dir`, the layout a recording session writes.
    #[must_use]
    pub fn from_dir(dir: &Path) -> Self {
        let pick = |port: &str| {
            let path = dir.join(format!("{port}.cassette.yaml"));
            path.is_file().then_some(path)
        };
        Self {
            clock: pick("clock"),
            fs: pick("fs"),
            runner: pick("runner"),
            hypervisor: pick("hypervisor"),
            imager: pick("imager"),
            releases: pick("releases"),
            fetcher: pick("fetcher"),
        }
    }

    /// Loads one cassette file into a replayer.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load_cassette(path: &Path) -> Result<CassetteReplayer, String> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read cassette file {}: {e}", path.display()))?;
        let cassette: Cassette = serde_yaml::from_str(&content)
            .map_err(|e| format!("Failed to parse cassette file {}: {e}", path.display()))?;
        Ok(CassetteReplayer::new(&cassette))
    }

    /// Loads every configured cassette.
    ///
    /// # Errors
    ///
    /// Returns an error if any configured cassette cannot be read or parsed.
    pub fn load_all(&self) -> Result<PortReplayers, String> {
        let load = |path: &Option<PathBuf>| path.as_deref().map(Self::load_cassette).transpose();
        Ok(PortReplayers {
            clock: load(&self.clock)?,
            fs: load(&self.fs)?,
            runner: load(&self.runner)?,
            hypervisor: load(&self.hypervisor)?,
            imager: load(&self.imager)?,
            releases: load(&self.releases)?,
            fetcher: load(&self.fetcher)?,
        })
    }
}
