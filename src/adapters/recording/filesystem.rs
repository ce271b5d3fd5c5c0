//! Recording adapter for the `FileSystem` port.

use std::error::Error;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::{record_interaction, record_result};
use crate::cassette::session::SharedRecorder;
use crate::ports::FileSystem;

/// Records filesystem calls while delegating to an inner implementation.
pub struct RecordingFileSystem {
    inner: Box<dyn FileSystem>,
    recorder: SharedRecorder,
}

impl RecordingFileSystem {
    /// Wraps `inner`.
    pub fn new(inner: Box<dyn FileSystem>, recorder: SharedRecorder) -> Self {
        Self { inner, recorder }
    }
}

#[derive(Serialize)]
struct PathInput {
    path: String,
}

impl PathInput {
    fn new(path: &Path) -> Self {
        Self { path: path.display().to_string() }
    }
}

#[derive(Serialize)]
struct RenameInput {
    from: String,
    to: String,
}

impl FileSystem for RecordingFileSystem {
    fn read_to_string(&self, path: &Path) -> Result<String, Box<dyn Error + Send + Sync>> {
        let result = self.inner.read_to_string(path);
        record_result(&self.recorder, "fs", "read_to_string", &PathInput::new(path), &result);
        result
    }

    fn exists(&self, path: &Path) -> bool {
        let result = self.inner.exists(path);
        record_interaction(&self.recorder, "fs", "exists", &PathInput::new(path), &result);
        result
    }

    fn list_dir(&self, path: &Path) -> Result<Vec<String>, Box<dyn Error + Send + Sync>> {
        let result = self.inner.list_dir(path);
        record_result(&self.recorder, "fs", "list_dir", &PathInput::new(path), &result);
        result
    }

    fn modified(&self, path: &Path) -> Result<DateTime<Utc>, Box<dyn Error + Send + Sync>> {
        let result = self.inner.modified(path);
        record_result(&self.recorder, "fs", "modified", &PathInput::new(path), &result);
        result
    }

    fn rename(&self, from: &Path, to: &Path) -> Result<(), Box<dyn Error + Send + Sync>> {
        let result = self.inner.rename(from, to);
        let input = RenameInput { from: from.display().to_string(), to: to.display().to_string() };
        record_result(&self.recorder, "fs", "rename", &input, &result);
        result
    }

    fn remove_file(&self, path: &Path) -> Result<(), Box<dyn Error + Send + Sync>> {
        let result = self.inner.remove_file(path);
        record_result(&self.recorder, "fs", "remove_file", &PathInput::new(path), &result);
        result
    }

    fn make_world_readable(&self, path: &Path) -> Result<(), Box<dyn Error + Send + Sync>> {
        let result = self.inner.make_world_readable(path);
        record_result(&self.recorder, "fs", "make_world_readable", &PathInput::new(path), &result);
        result
    }
}
