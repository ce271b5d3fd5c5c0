//! Replaying adapter for the `DiskImager` port.

use std::error::Error;
use std::path::Path;
use std::sync::Mutex;

use super::replay_result;
use crate::cassette::replayer::CassetteReplayer;
use crate::catalog::PartitionKind;
use crate::ports::imager::{AddedPartition, DiskImager};

/// Serves recorded imaging results without touching any disk.
pub struct ReplayingDiskImager {
    replayer: Mutex<CassetteReplayer>,
}

impl ReplayingDiskImager {
    /// Creates a replaying imager.
    #[must_use]
    pub fn new(replayer: CassetteReplayer) -> Self {
        Self { replayer: Mutex::new(replayer) }
    }

    fn replay<T: serde::de::DeserializeOwned>(
        &self,
        method: &str,
    ) -> Result<T, Box<dyn Error + Send + Sync>> {
        replay_result(&self.replayer, "imager", method)
    }
}

impl DiskImager for ReplayingDiskImager {
    fn create_disk(&self, _path: &Path, _size: u64) -> Result<(), Box<dyn Error + Send + Sync>> {
        self.replay("create_disk")
    }

    fn launch(&self, _path: &Path) -> Result<String, Box<dyn Error + Send + Sync>> {
        self.replay("launch")
    }

    fn part_init(&self, _device: &str, _label: &str) -> Result<(), Box<dyn Error + Send + Sync>> {
        self.replay("part_init")
    }

    fn part_add(
        &self,
        _device: &str,
        _kind: PartitionKind,
        _start: i64,
        _end: i64,
    ) -> Result<AddedPartition, Box<dyn Error + Send + Sync>> {
        self.replay("part_add")
    }

    fn part_set_gpt_type(
        &self,
        _device: &str,
        _number: u32,
        _guid: &str,
    ) -> Result<(), Box<dyn Error + Send + Sync>> {
        self.replay("part_set_gpt_type")
    }

    fn mkfs(
        &self,
        _fstype: &str,
        _partition: &str,
        _label: Option<&str>,
    ) -> Result<(), Box<dyn Error + Send + Sync>> {
        self.replay("mkfs")
    }

    fn list_partitions(&self) -> Result<Vec<String>, Box<dyn Error + Send + Sync>> {
        self.replay("list_partitions")
    }

    fn mount(&self, _partition: &str) -> Result<(), Box<dyn Error + Send + Sync>> {
        self.replay("mount")
    }

    fn write(&self, _path: &str, _content: &str) -> Result<(), Box<dyn Error + Send + Sync>> {
        self.replay("write")
    }

    fn upload(&self, _local: &Path, _target: &str) -> Result<(), Box<dyn Error + Send + Sync>> {
        self.replay("upload")
    }

    fn umount(&self) -> Result<(), Box<dyn Error + Send + Sync>> {
        self.replay("umount")
    }

    fn shutdown(&self) -> Result<(), Box<dyn Error + Send + Sync>> {
        self.replay("shutdown")
    }
}
