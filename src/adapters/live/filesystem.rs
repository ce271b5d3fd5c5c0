//! Filesystem adapter over `std::fs`.

use std::error::Error;
use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::Path;

use chrono::{DateTime, Utc};

use crate::ports::filesystem::FileSystem;

/// Filesystem adapter backed by real disk I/O.
pub struct LiveFileSystem;

impl FileSystem for LiveFileSystem {
    fn read_to_string(&self, path: &Path) -> Result<String, Box<dyn Error + Send + Sync>> {
        Ok(fs::read_to_string(path)?)
    }

    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn list_dir(&self, path: &Path) -> Result<Vec<String>, Box<dyn Error + Send + Sync>> {
        let mut entries = Vec::new();
        for entry in fs::read_dir(path)? {
            let entry = entry?;
            if let Some(name) = entry.file_name().to_str() {
                entries.push(name.to_string());
            }
        }
        entries.sort();
        Ok(entries)
    }

    fn modified(&self, path: &Path) -> Result<DateTime<Utc>, Box<dyn Error + Send + Sync>> {
        Ok(DateTime::<Utc>::from(fs::metadata(path)?.modified()?))
    }

    fn rename(&self, from: &Path, to: &Path) -> Result<(), Box<dyn Error + Send + Sync>> {
        Ok(fs::rename(from, to)?)
    }

    fn remove_file(&self, path: &Path) -> Result<(), Box<dyn Error + Send + Sync>> {
        Ok(fs::remove_file(path)?)
    }

    fn make_world_readable(&self, path: &Path) -> Result<(), Box<dyn Error + Send + Sync>> {
        Ok(fs::set_permissions(path, fs::Permissions::from_mode(0o644))?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lists_sorted_names_and_renames() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("disk_b.img"), "b").unwrap();
        fs::write(dir.path().join("disk_a.img"), "a").unwrap();

        let live = LiveFileSystem;
        assert_eq!(live.list_dir(dir.path()).unwrap(), vec!["disk_a.img", "disk_b.img"]);

        live.rename(&dir.path().join("disk_a.img"), &dir.path().join("disk_c.img")).unwrap();
        assert!(!live.exists(&dir.path().join("disk_a.img")));
        assert_eq!(live.read_to_string(&dir.path().join("disk_c.img")).unwrap(), "a");
    }

    #[test]
    fn modified_is_recent_and_mode_is_set() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("disk_a.img");
        fs::write(&path, "a").unwrap();

        let live = LiveFileSystem;
        let age = Utc::now() - live.modified(&path).unwrap();
        assert!(age.num_seconds() < 60);

        live.make_world_readable(&path).unwrap();
        let mode = fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o644);

        live.remove_file(&path).unwrap();
        assert!(live.modified(&path).is_err());
    }
}
