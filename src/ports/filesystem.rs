//! Filesystem port for the working directory that holds the image files.

use std::error::Error;
use std::path::Path;

use chrono::{DateTime, Utc};

/// Provides the filesystem operations the engine needs.
///
/// The image files themselves are the engine's only persisted state, so
/// every existence check, rename and removal goes through this trait.
pub trait FileSystem: Send + Sync {
    /// Reads the entire contents of a file as a UTF-8 string.
    ///
    /// # Errors
    ///
    /// Returns an error if the file does not exist or is not valid UTF-8.
    fn read_to_string(&self, path: &Path) -> Result<String, Box<dyn Error + Send + Sync>>;

    /// Returns `true` if the path exists on the filesystem.
    fn exists(&self, path: &Path) -> bool;

    /// Lists the entry names of a directory, sorted.
    ///
    /// # Errors
    ///
    /// Returns an error if the path is not a directory or cannot be read.
    fn list_dir(&self, path: &Path) -> Result<Vec<String>, Box<dyn Error + Send + Sync>>;

    /// Returns the last modification time of a file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file does not exist or has no usable mtime.
    fn modified(&self, path: &Path) -> Result<DateTime<Utc>, Box<dyn Error + Send + Sync>>;

    /// Renames `from` to `to`, replacing `to` if it exists.
    ///
    /// # Errors
    ///
    /// Returns an error if the rename fails.
    fn rename(&self, from: &Path, to: &Path) -> Result<(), Box<dyn Error + Send + Sync>>;

    /// Removes a file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file does not exist or cannot be removed.
    fn remove_file(&self, path: &Path) -> Result<(), Box<dyn Error + Send + Sync>>;

    /// Sets the file mode to `0o644`.
    ///
    /// # Errors
    ///
    /// Returns an error if the permissions cannot be changed.
    fn make_world_readable(&self, path: &Path) -> Result<(), Box<dyn Error + Send + Sync>>;
}
