//! Replaying adapter for the `FileSystem` port.

use std::error::Error;
use std::path::Path;
use std::sync::Mutex;

use chrono::{DateTime, Utc};

use super::{next_output, replay_result};
use crate::cassette::replayer::CassetteReplayer;
use crate::ports::filesystem::FileSystem;

/// Serves recorded filesystem results.
pub struct ReplayingFileSystem {
    replayer: Mutex<CassetteReplayer>,
}

impl ReplayingFileSystem {
    /// Creates a replaying filesystem.
    #[must_use]
    pub fn new(replayer: CassetteReplayer) -> Self {
        Self { replayer: Mutex::new(replayer) }
    }
}

impl FileSystem for ReplayingFileSystem {
    fn read_to_string(&self, _path: &Path) -> Result<String, Box<dyn Error + Send + Sync>> {
        replay_result(&self.replayer, "fs", "read_to_string")
    }

    fn exists(&self, _path: &Path) -> bool {
        next_output(&self.replayer, "fs", "exists")
            .as_bool()
            .expect("fs::exists: expected boolean output")
    }

    fn list_dir(&self, _path: &Path) -> Result<Vec<String>, Box<dyn Error + Send + Sync>> {
        replay_result(&self.replayer, "fs", "list_dir")
    }

    fn modified(&self, _path: &Path) -> Result<DateTime<Utc>, Box<dyn Error + Send + Sync>> {
        replay_result(&self.replayer, "fs", "modified")
    }

    fn rename(&self, _from: &Path, _to: &Path) -> Result<(), Box<dyn Error + Send + Sync>> {
        replay_result(&self.replayer, "fs", "rename")
    }

    fn remove_file(&self, _path: &Path) -> Result<(), Box<dyn Error + Send + Sync>> {
        replay_result(&self.replayer, "fs", "remove_file")
    }

    fn make_world_readable(&self, _path: &Path) -> Result<(), Box<dyn Error + Send + Sync>> {
        replay_result(&self.replayer, "fs", "make_world_readable")
    }
}
