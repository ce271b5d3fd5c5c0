//! Engine configuration threaded into the resolver, reconciler and builders.

use std::path::{Path, PathBuf};
use std::time::Duration;

/// Fedora QA release metadata, used to discover stable and branched releases.
pub const DEFAULT_RELEASE_METADATA_URL: &str =
    "https://fedorapeople.org/groups/qa/metadata/release.json";

/// Download mirror the installation trees are taken from.
pub const DEFAULT_MIRROR: &str = "https://download.fedoraproject.org/pub";

/// Catalog filename looked up in the script directory.
pub const DEFAULT_CATALOG_NAME: &str = "hdds.json";

/// Name of the single throwaway domain every installer build reuses.
pub const DOMAIN_NAME: &str = "hddkit";

/// Wall-clock cap on one installer attempt.
pub const INSTALL_TIMEOUT: Duration = Duration::from_secs(60 * 60);

/// Installer retries after the first timed-out attempt.
pub const DEFAULT_INSTALL_RETRIES: u32 = 3;

/// Explicit configuration for one engine run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// Directory holding the catalog, kickstarts and `uploads/`.
    pub script_dir: PathBuf,
    /// Directory where images are checked and created.
    pub work_dir: PathBuf,
    /// Catalog file.
    pub catalog: PathBuf,
    /// Hypervisor connection URI; the tool default when `None`.
    pub libvirt_uri: Option<String>,
    /// Release metadata document.
    pub release_metadata_url: String,
    /// Mirror root for installation trees.
    pub mirror: String,
    /// Run the installer attached to the terminal on a serial console.
    pub interactive: bool,
    /// Pass `--debug` to the installer tool.
    pub installer_debug: bool,
    /// Installer retries after a timeout.
    pub install_retries: u32,
    /// Wall-clock cap on one installer attempt.
    pub install_timeout: Duration,
}

impl EngineConfig {
    /// Creates a configuration with defaults for everything but the two
    /// directories. The catalog defaults to `<script_dir>/hdds.json`.
    #[must_use]
    pub fn new(script_dir: impl Into<PathBuf>, work_dir: impl Into<PathBuf>) -> Self {
        let script_dir = script_dir.into();
        Self {
            catalog: script_dir.join(DEFAULT_CATALOG_NAME),
            script_dir,
            work_dir: work_dir.into(),
            libvirt_uri: None,
            release_metadata_url: DEFAULT_RELEASE_METADATA_URL.to_string(),
            mirror: DEFAULT_MIRROR.to_string(),
            interactive: false,
            installer_debug: false,
            install_retries: DEFAULT_INSTALL_RETRIES,
            install_timeout: INSTALL_TIMEOUT,
        }
    }

    /// Path of `filename` inside the work directory.
    #[must_use]
    pub fn work_path(&self, filename: &str) -> PathBuf {
        self.work_dir.join(filename)
    }

    /// Path of a local upload asset.
    #[must_use]
    pub fn upload_path(&self, source: &str) -> PathBuf {
        self.script_dir.join("uploads").join(source)
    }

    /// Path of a file in the script directory.
    #[must_use]
    pub fn script_path(&self, name: impl AsRef<Path>) -> PathBuf {
        self.script_dir.join(name)
    }
}

/// The directory the running executable lives in, or `.` if unknown.
#[must_use]
pub fn executable_dir() -> PathBuf {
    std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(Path::to_path_buf))
        .unwrap_or_else(|| PathBuf::from("."))
}
