//! Recording session managing per-port cassette recorders.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use chrono::Utc;

use super::recorder::CassetteRecorder;

/// Shared handle a recording adapter writes through.
pub type SharedRecorder = Arc<Mutex<CassetteRecorder>>;

/// One recorder per port, all writing into a timestamped directory.
pub struct RecordingSession {
    /// Clock recorder.
    pub clock: SharedRecorder,
    /// Filesystem recorder.
    pub fs: SharedRecorder,
    /// Command runner recorder.
    pub runner: SharedRecorder,
    /// Hypervisor recorder.
    pub hypervisor: SharedRecorder,
    /// Disk imager recorder.
    pub imager: SharedRecorder,
    /// Release discovery recorder.
    pub releases: SharedRecorder,
    /// Asset fetcher recorder.
    pub fetcher: SharedRecorder,
    output_dir: PathBuf,
}

impl RecordingSession {
    /// Creates `<base>/<timestamp>/` and a recorder for every port in it.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory already exists or cannot be created.
    pub fn new(base: &Path) -> Result<Self, String> {
        let timestamp = Utc::now().format("%Y-%m-%dT%H-%M-%S").to_string();
        let output_dir = base.join(&timestamp);

        if output_dir.exists() {
            return Err(format!("Cassette directory already exists: {}", output_dir.display()));
        }
        std::fs::create_dir_all(&output_dir)
            .map_err(|e| format!("Failed to create cassette directory: {e}"))?;

        let make_recorder = |port: &str| -> SharedRecorder {
            let path = output_dir.join(format!("{port}.cassette.yaml"));
            let name = format!("{timestamp}-{port}");
            Arc::new(Mutex::new(CassetteRecorder::new(path, name, env!("CARGO_PKG_VERSION"))))
        };

        Ok(Self {
            clock: make_recorder("clock"),
            fs: make_recorder("fs"),
            runner: make_recorder("runner"),
            hypervisor: make_recorder("hypervisor"),
            imager: make_recorder("imager"),
            releases: make_recorder("releases"),
            fetcher: make_recorder("fetcher"),
            output_dir,
        })
    }

    /// Directory the cassettes are written to.
    #[must_use]
    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Writes every port's cassette. The recording context must have been
    /// dropped first so the recorders are no longer shared.
    ///
    /// # Errors
    ///
    /// Returns an error if a recorder is still shared or a file cannot be written.
    pub fn finish(self) -> Result<PathBuf, String> {
        fn finish_one(arc: SharedRecorder, port: &str) -> Result<(), String> {
            let recorder = Arc::try_unwrap(arc)
                .map_err(|_| format!("Recording adapter for {port} still has references"))?
                .into_inner()
                .map_err(|e| format!("Recorder lock for {port} poisoned: {e}"))?;
            recorder.finish().map_err(|e| format!("Failed to write {port} cassette: {e}"))?;
            Ok(())
        }

        finish_one(self.clock, "clock")?;
        finish_one(self.fs, "fs")?;
        finish_one(self.runner, "runner")?;
        finish_one(self.hypervisor, "hypervisor")?;
        finish_one(self.imager, "imager")?;
        finish_one(self.releases, "releases")?;
        finish_one(self.fetcher, "fetcher")?;

        Ok(self.output_dir)
    }
}
