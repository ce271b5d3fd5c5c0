//! Recording adapter for the `DiskImager` port.

use std::error::Error;
use std::path::Path;

use serde::Serialize;
use serde_json::json;

use super::record_result;
use crate::cassette::session::SharedRecorder;
use crate::catalog::PartitionKind;
use crate::ports::{AddedPartition, DiskImager};

/// Records every imaging step while delegating to an inner imager.
pub struct RecordingDiskImager {
    inner: Box<dyn DiskImager>,
    recorder: SharedRecorder,
}

impl RecordingDiskImager {
    /// Wraps `inner`.
    pub fn new(inner: Box<dyn DiskImager>, recorder: SharedRecorder) -> Self {
        Self { inner, recorder }
    }

    fn record<T: Serialize, I: Serialize>(
        &self,
        method: &str,
        input: &I,
        result: &Result<T, Box<dyn Error + Send + Sync>>,
    ) {
        record_result(&self.recorder, "imager", method, input, result);
    }
}

impl DiskImager for RecordingDiskImager {
    fn create_disk(&self, path: &Path, size: u64) -> Result<(), Box<dyn Error + Send + Sync>> {
        let result = self.inner.create_disk(path, size);
        self.record("create_disk", &json!({"path": path.display().to_string(), "size": size}), &result);
        result
    }

    fn launch(&self, path: &Path) -> Result<String, Box<dyn Error + Send + Sync>> {
        let result = self.inner.launch(path);
        self.record("launch", &json!({"path": path.display().to_string()}), &result);
        result
    }

    fn part_init(&self, device: &str, label: &str) -> Result<(), Box<dyn Error + Send + Sync>> {
        let result = self.inner.part_init(device, label);
        self.record("part_init", &json!({"device": device, "label": label}), &result);
        result
    }

    fn part_add(
        &self,
        device: &str,
        kind: PartitionKind,
        start: i64,
        end: i64,
    ) -> Result<AddedPartition, Box<dyn Error + Send + Sync>> {
        let result = self.inner.part_add(device, kind, start, end);
        let input = json!({"device": device, "kind": kind, "start": start, "end": end});
        self.record("part_add", &input, &result);
        result
    }

    fn part_set_gpt_type(
        &self,
        device: &str,
        number: u32,
        guid: &str,
    ) -> Result<(), Box<dyn Error + Send + Sync>> {
        let result = self.inner.part_set_gpt_type(device, number, guid);
        let input = json!({"device": device, "number": number, "guid": guid});
        self.record("part_set_gpt_type", &input, &result);
        result
    }

    fn mkfs(
        &self,
        fstype: &str,
        partition: &str,
        label: Option<&str>,
    ) -> Result<(), Box<dyn Error + Send + Sync>> {
        let result = self.inner.mkfs(fstype, partition, label);
        let input = json!({"fstype": fstype, "partition": partition, "label": label});
        self.record("mkfs", &input, &result);
        result
    }

    fn list_partitions(&self) -> Result<Vec<String>, Box<dyn Error + Send + Sync>> {
        let result = self.inner.list_partitions();
        self.record("list_partitions", &(), &result);
        result
    }

    fn mount(&self, partition: &str) -> Result<(), Box<dyn Error + Send + Sync>> {
        let result = self.inner.mount(partition);
        self.record("mount", &json!({"partition": partition}), &result);
        result
    }

    fn write(&self, path: &str, content: &str) -> Result<(), Box<dyn Error + Send + Sync>> {
        let result = self.inner.write(path, content);
        self.record("write", &json!({"path": path, "content": content}), &result);
        result
    }

    fn upload(&self, local: &Path, target: &str) -> Result<(), Box<dyn Error + Send + Sync>> {
        let result = self.inner.upload(local, target);
        let input = json!({"local": local.display().to_string(), "target": target});
        self.record("upload", &input, &result);
        result
    }

    fn umount(&self) -> Result<(), Box<dyn Error + Send + Sync>> {
        let result = self.inner.umount();
        self.record("umount", &(), &result);
        result
    }

    fn shutdown(&self) -> Result<(), Box<dyn Error + Send + Sync>> {
        let result = self.inner.shutdown();
        self.record("shutdown", &(), &result);
        result
    }
}
