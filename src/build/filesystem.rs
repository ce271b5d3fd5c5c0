//! Filesystem builder: structural images built by issuing partition,
//! format, write and upload directives to the disk imager.

use std::error::Error;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use super::{discard, BuildOutcome};
use crate::catalog::{AssetSource, UploadDirective};
use crate::config::EngineConfig;
use crate::context::ServiceContext;
use crate::error::BuildError;
use crate::image::naming::temp_filename;
use crate::image::StructuralImage;

/// Builds structural images through `ctx.imager`.
pub struct FilesystemBuilder<'a> {
    ctx: &'a ServiceContext,
    config: &'a EngineConfig,
}

fn failed<'e>(
    image: &'e StructuralImage,
    step: &'e str,
) -> impl FnOnce(Box<dyn Error + Send + Sync>) -> BuildError + 'e {
    move |e| BuildError::Imaging {
        image: image.filename.clone(),
        step: step.to_string(),
        reason: e.to_string(),
    }
}

impl<'a> FilesystemBuilder<'a> {
    /// Creates a builder.
    #[must_use]
    pub fn new(ctx: &'a ServiceContext, config: &'a EngineConfig) -> Self {
        Self { ctx, config }
    }

    /// Builds `image` into the work directory.
    ///
    /// The imager session is shut down whether or not the build succeeds.
    ///
    /// # Errors
    ///
    /// Returns a [`BuildError`] if any step fails; the temporary file is
    /// removed first.
    pub fn build(&self, image: &StructuralImage) -> Result<BuildOutcome, BuildError> {
        let tmp = self.config.work_path(&temp_filename(&image.filename));
        let target = self.config.work_path(&image.filename);
        info!("Creating {}", image.filename);

        let populated = self.populate(image, &tmp);
        let shutdown = self.ctx.imager.shutdown().map_err(failed(image, "shutdown"));
        if let (Err(_), Err(e)) = (&populated, &shutdown) {
            warn!(error = %e, "imager shutdown failed after an earlier error");
        }

        let result = populated.and(shutdown).and_then(|()| {
            self.ctx.fs.rename(&tmp, &target).map_err(|e| BuildError::port("rename image", &*e))
        });
        if let Err(e) = result {
            discard(&*self.ctx.fs, &tmp);
            return Err(e);
        }
        info!("Created {}", image.filename);
        Ok(BuildOutcome::Built)
    }

    fn populate(&self, image: &StructuralImage, tmp: &Path) -> Result<(), BuildError> {
        let imager = &*self.ctx.imager;
        imager.create_disk(tmp, image.size).map_err(failed(image, "create disk"))?;
        let device = imager.launch(tmp).map_err(failed(image, "launch"))?;
        imager.part_init(&device, &image.label).map_err(failed(image, "partition table"))?;

        for part in &image.parts {
            let fstype = part.filesystem.as_deref().unwrap_or(&image.filesystem);
            let added = imager
                .part_add(&device, part.kind, part.start, part.end)
                .map_err(failed(image, "add partition"))?;
            debug!(partition = %added.device, number = added.number, fstype, "added partition");
            if let Some(guid) = &part.gpt_type {
                imager
                    .part_set_gpt_type(&device, added.number, guid)
                    .map_err(failed(image, "set GPT type"))?;
            }
            imager
                .mkfs(fstype, &added.device, part.label.as_deref())
                .map_err(failed(image, "mkfs"))?;
        }

        for write in &image.writes {
            self.on_partition(image, write.part, || {
                imager.write(&write.path, &write.content).map_err(failed(image, "write"))
            })?;
        }

        for upload in &image.uploads {
            let staged = self.stage(image, upload)?;
            self.on_partition(image, upload.part, || {
                imager.upload(staged.path(), &upload.target).map_err(failed(image, "upload"))
            })?;
        }
        Ok(())
    }

    /// Mounts partition `index` (1-based, creation order), runs `op`, and
    /// unmounts even when `op` fails.
    fn on_partition(
        &self,
        image: &StructuralImage,
        index: usize,
        op: impl FnOnce() -> Result<(), BuildError>,
    ) -> Result<(), BuildError> {
        let imager = &*self.ctx.imager;
        let partitions = imager.list_partitions().map_err(failed(image, "list partitions"))?;
        let partition = index.checked_sub(1).and_then(|i| partitions.get(i)).ok_or_else(|| {
            BuildError::NoSuchPartition {
                image: image.filename.clone(),
                index,
                count: partitions.len(),
            }
        })?;
        imager.mount(partition).map_err(failed(image, "mount"))?;
        let done = op();
        let unmounted = imager.umount().map_err(failed(image, "umount"));
        done.and(unmounted)
    }

    /// Resolves an upload source to a local file, downloading remote ones.
    fn stage(&self, image: &StructuralImage, upload: &UploadDirective) -> Result<Staged, BuildError> {
        match &upload.source {
            AssetSource::Local(name) => Ok(Staged::Local(self.config.upload_path(name))),
            AssetSource::Remote(url) => {
                let file = tempfile::Builder::new().prefix("hddkit-upload-").tempfile().map_err(
                    |source| BuildError::Io { context: "create download staging file".into(), source },
                )?;
                debug!(url = %url, staged = %file.path().display(), "downloading upload asset");
                self.ctx.fetcher.download(url, file.path()).map_err(failed(image, "download"))?;
                Ok(Staged::Downloaded(file))
            }
        }
    }
}

/// A local file ready to upload. Downloads are deleted on drop.
enum Staged {
    Local(PathBuf),
    Downloaded(tempfile::NamedTempFile),
}

impl Staged {
    fn path(&self) -> &Path {
        match self {
            Self::Local(path) => path,
            Self::Downloaded(file) => file.path(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{PartitionDirective, PartitionKind, WriteDirective};
    use crate::testing::TestPorts;

    const ESP: &str = "C12A7328-F81F-11D2-BA4B-00A0C93EC93B";

    fn part(filesystem: Option<&str>, label: Option<&str>, gpt_type: Option<&str>) -> PartitionDirective {
        PartitionDirective {
            kind: PartitionKind::Primary,
            start: 2048,
            end: -1,
            filesystem: filesystem.map(str::to_string),
            label: label.map(str::to_string),
            gpt_type: gpt_type.map(str::to_string),
        }
    }

    fn image() -> StructuralImage {
        StructuralImage {
            group: "shrink".into(),
            filename: "disk_shrink_gpt.img".into(),
            size: 11 << 30,
            label: "gpt".into(),
            filesystem: "ext4".into(),
            parts: vec![part(None, None, Some(ESP)), part(Some("ntfs"), Some("SHRINK"), None)],
            writes: vec![WriteDirective { part: 2, path: "/testfile".into(), content: "hi".into() }],
            uploads: vec![UploadDirective {
                part: 1,
                source: AssetSource::Local("local.bin".into()),
                target: "/local.bin".into(),
            }],
        }
    }

    fn config() -> EngineConfig {
        EngineConfig::new("/srv", "/work")
    }

    #[test]
    fn issues_directives_in_order_and_renames() {
        let ports = TestPorts::new();
        ports.fs.add("/srv/uploads/local.bin", "data");
        let ctx = ports.context();
        let config = config();

        let outcome = FilesystemBuilder::new(&ctx, &config).build(&image()).unwrap();
        assert_eq!(outcome, BuildOutcome::Built);
        assert_eq!(
            ports.imager.ops(),
            vec![
                format!("create_disk /work/disk_shrink_gpt.img.tmp {}", 11u64 << 30),
                "launch /work/disk_shrink_gpt.img.tmp".to_string(),
                "part_init /dev/sda gpt".to_string(),
                "part_add /dev/sda p 2048 -1".to_string(),
                format!("part_set_gpt_type /dev/sda 1 {ESP}"),
                "mkfs ext4 /dev/sda1".to_string(),
                "part_add /dev/sda p 2048 -1".to_string(),
                "mkfs ntfs /dev/sda2 label=SHRINK".to_string(),
                "mount /dev/sda2".to_string(),
                "write /testfile hi".to_string(),
                "umount".to_string(),
                "mount /dev/sda1".to_string(),
                "upload local.bin /local.bin".to_string(),
                "umount".to_string(),
                "shutdown".to_string(),
            ]
        );
        assert!(ports.fs.contains("/work/disk_shrink_gpt.img"));
        assert!(!ports.fs.contains("/work/disk_shrink_gpt.img.tmp"));
    }

    #[test]
    fn failure_removes_temp_and_still_shuts_down() {
        let ports = TestPorts::new();
        ports.imager.fail_on("mkfs");
        let ctx = ports.context();
        let config = config();

        let err = FilesystemBuilder::new(&ctx, &config).build(&image()).unwrap_err();
        assert!(matches!(err, BuildError::Imaging { ref step, .. } if step == "mkfs"), "{err}");
        assert_eq!(ports.imager.ops().last().map(String::as_str), Some("shutdown"));
        assert!(!ports.fs.contains("/work/disk_shrink_gpt.img.tmp"));
        assert!(!ports.fs.contains("/work/disk_shrink_gpt.img"));
    }

    #[test]
    fn failed_write_still_unmounts() {
        let ports = TestPorts::new();
        ports.imager.fail_on("write");
        let ctx = ports.context();
        let config = config();

        let err = FilesystemBuilder::new(&ctx, &config).build(&image()).unwrap_err();
        assert!(matches!(err, BuildError::Imaging { ref step, .. } if step == "write"), "{err}");
        let ops = ports.imager.ops();
        let tail: Vec<&str> = ops.iter().rev().take(4).rev().map(String::as_str).collect();
        assert_eq!(tail, vec!["mount /dev/sda2", "write /testfile hi", "umount", "shutdown"]);
    }

    #[test]
    fn directive_past_last_partition_fails() {
        let ports = TestPorts::new();
        let ctx = ports.context();
        let config = config();
        let mut img = image();
        img.uploads.clear();
        img.writes[0].part = 3;

        let err = FilesystemBuilder::new(&ctx, &config).build(&img).unwrap_err();
        assert!(matches!(err, BuildError::NoSuchPartition { index: 3, count: 2, .. }), "{err}");
        assert!(!ports.fs.contains("/work/disk_shrink_gpt.img.tmp"));
    }

    #[test]
    fn remote_upload_is_staged_through_a_download() {
        let ports = TestPorts::new();
        let ctx = ports.context();
        let config = config();
        let mut img = image();
        img.uploads[0].source = AssetSource::Remote("https://example.com/a.bin".into());

        FilesystemBuilder::new(&ctx, &config).build(&img).unwrap();
        assert_eq!(ports.fetcher.urls(), vec!["https://example.com/a.bin"]);
        let upload = ports.imager.ops().into_iter().find(|op| op.starts_with("upload")).unwrap();
        assert!(upload.starts_with("upload hddkit-upload-"), "{upload}");
        assert!(upload.ends_with(" /local.bin"), "{upload}");
    }

    #[test]
    fn failed_download_leaves_nothing_behind() {
        let ports = TestPorts::new();
        let ctx = ports.context();
        let config = config();
        let mut img = image();
        img.uploads[0].source = AssetSource::Remote("https://example.com/404".into());

        let err = FilesystemBuilder::new(&ctx, &config).build(&img).unwrap_err();
        assert!(matches!(err, BuildError::Imaging { ref step, .. } if step == "download"), "{err}");
        assert!(ports.fs.names_in("/work").is_empty());
        assert_eq!(ports.imager.ops().last().map(String::as_str), Some("shutdown"));
    }
}
