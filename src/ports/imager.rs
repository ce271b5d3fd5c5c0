//! Disk imaging port: partitions, formats and populates a raw disk image.

use std::error::Error;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::catalog::PartitionKind;

/// A partition just created by [`DiskImager::part_add`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddedPartition {
    /// Device name inside the imaging appliance, e.g. `/dev/sda1`.
    pub device: String,
    /// Partition number in the table.
    pub number: u32,
}

/// A stateful session against one disk image.
///
/// The call order is `create_disk`, `launch`, then any number of
/// structural operations, then `shutdown`. Only one disk is attached per
/// session; `mount` always mounts at the root of the appliance.
pub trait DiskImager: Send + Sync {
    /// Allocates a raw image file of `size` bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be created.
    fn create_disk(&self, path: &Path, size: u64) -> Result<(), Box<dyn Error + Send + Sync>>;

    /// Attaches the image read-write, starts the appliance and returns the
    /// device name of the attached disk.
    ///
    /// # Errors
    ///
    /// Returns an error if the appliance fails to start.
    fn launch(&self, path: &Path) -> Result<String, Box<dyn Error + Send + Sync>>;

    /// Writes an empty partition table of the given label type (`mbr`, `gpt`).
    ///
    /// # Errors
    ///
    /// Returns an error if the label type is invalid or the write fails.
    fn part_init(&self, device: &str, label: &str) -> Result<(), Box<dyn Error + Send + Sync>>;

    /// Adds a partition spanning `start..=end` sectors.
    ///
    /// # Errors
    ///
    /// Returns an error if the partition cannot be created.
    fn part_add(
        &self,
        device: &str,
        kind: PartitionKind,
        start: i64,
        end: i64,
    ) -> Result<AddedPartition, Box<dyn Error + Send + Sync>>;

    /// Sets the GPT type GUID of a partition.
    ///
    /// # Errors
    ///
    /// Returns an error if the disk is not GPT or the GUID is invalid.
    fn part_set_gpt_type(
        &self,
        device: &str,
        number: u32,
        guid: &str,
    ) -> Result<(), Box<dyn Error + Send + Sync>>;

    /// Creates a filesystem on a partition, optionally with a volume label.
    ///
    /// # Errors
    ///
    /// Returns an error if the filesystem type is unsupported or mkfs fails.
    fn mkfs(
        &self,
        fstype: &str,
        partition: &str,
        label: Option<&str>,
    ) -> Result<(), Box<dyn Error + Send + Sync>>;

    /// Lists partition devices in creation order.
    ///
    /// # Errors
    ///
    /// Returns an error if the appliance cannot be queried.
    fn list_partitions(&self) -> Result<Vec<String>, Box<dyn Error + Send + Sync>>;

    /// Mounts a partition at `/`.
    ///
    /// # Errors
    ///
    /// Returns an error if the partition cannot be mounted.
    fn mount(&self, partition: &str) -> Result<(), Box<dyn Error + Send + Sync>>;

    /// Writes `content` to `path` on the mounted filesystem and syncs.
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails.
    fn write(&self, path: &str, content: &str) -> Result<(), Box<dyn Error + Send + Sync>>;

    /// Copies a host file to `target` on the mounted filesystem and syncs.
    ///
    /// # Errors
    ///
    /// Returns an error if the source is unreadable or the copy fails.
    fn upload(&self, local: &Path, target: &str) -> Result<(), Box<dyn Error + Send + Sync>>;

    /// Unmounts `/`.
    ///
    /// # Errors
    ///
    /// Returns an error if nothing is mounted or the unmount fails.
    fn umount(&self) -> Result<(), Box<dyn Error + Send + Sync>>;

    /// Stops the appliance and releases the disk. Safe to call when the
    /// session never launched.
    ///
    /// # Errors
    ///
    /// Returns an error if the appliance does not shut down cleanly.
    fn shutdown(&self) -> Result<(), Box<dyn Error + Send + Sync>>;
}
