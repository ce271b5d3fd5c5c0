//! Reconciliation engine: the three-way diff between the resolved catalog
//! and the image files present in the work directory.
//!
//! Identity is the filename and nothing else. An expected image is
//! `missing` when its filename is not on disk, `outdated` when it is on
//! disk but older than its staleness budget, and `current` otherwise. Any
//! engine-owned file on disk that no expected image names is `unknown`.

mod housekeeping;

pub use housekeeping::{apply_renames, delete_files, list_engine_files, remove_temp_files};

use std::collections::{BTreeSet, HashSet};

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::config::EngineConfig;
use crate::context::ServiceContext;
use crate::error::WorkDirError;
use crate::image::ConcreteImage;

/// Seconds in one day of staleness budget.
pub const SECONDS_PER_DAY: i64 = 86_400;

/// The four-way classification of expected and on-disk images.
///
/// `current`, `missing` and `outdated` keep the order the images were
/// resolved in, one entry per filename.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconciliationResult {
    /// Expected, present, not stale.
    pub current: Vec<ConcreteImage>,
    /// Expected, absent.
    pub missing: Vec<ConcreteImage>,
    /// Expected, present, stale.
    pub outdated: Vec<ConcreteImage>,
    /// Present, not expected.
    pub unknown: BTreeSet<String>,
}

impl ReconciliationResult {
    /// Missing images followed by outdated ones: the build queue for `all`.
    #[must_use]
    pub fn to_build(&self) -> Vec<&ConcreteImage> {
        self.missing.iter().chain(&self.outdated).collect()
    }
}

/// Whether an image last modified at `modified` has outlived `maxage` days.
///
/// Ages are counted in whole seconds, with sub-second parts of both
/// timestamps dropped. The boundary is inclusive: an image exactly `maxage`
/// days old is still fresh.
#[must_use]
pub fn is_stale(now: DateTime<Utc>, modified: DateTime<Utc>, maxage: u32) -> bool {
    let age = now.timestamp() - modified.timestamp();
    age > i64::from(maxage) * SECONDS_PER_DAY
}

/// Classifies `expected` against the engine-owned filenames in `on_disk`.
///
/// Modification times are read only for installer images that are present
/// and carry a staleness budget.
///
/// # Errors
///
/// Returns [`WorkDirError::Stat`] if a present image's modification time
/// cannot be read.
pub fn reconcile(
    ctx: &ServiceContext,
    config: &EngineConfig,
    expected: &[ConcreteImage],
    on_disk: &BTreeSet<String>,
) -> Result<ReconciliationResult, WorkDirError> {
    let now = ctx.clock.now();
    let mut result = ReconciliationResult::default();
    let mut seen = HashSet::new();

    for image in expected {
        let filename = image.filename();
        if !seen.insert(filename) {
            continue;
        }
        if !on_disk.contains(filename) {
            result.missing.push(image.clone());
            continue;
        }
        let stale = match image.max_age_days() {
            None => false,
            Some(maxage) => {
                let path = config.work_path(filename);
                let modified = ctx
                    .fs
                    .modified(&path)
                    .map_err(|e| WorkDirError::Stat { path, reason: e.to_string() })?;
                is_stale(now, modified, maxage)
            }
        };
        if stale {
            debug!(image = filename, "image is outdated");
            result.outdated.push(image.clone());
        } else {
            result.current.push(image.clone());
        }
    }

    result.unknown =
        on_disk.iter().filter(|name| !seen.contains(name.as_str())).cloned().collect();
    Ok(result)
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;
    use crate::image::{InstallerImage, Release, StructuralImage};
    use crate::testing::{ts, TestPorts};

    fn installer(filename: &str, maxage: u32) -> ConcreteImage {
        ConcreteImage::Installer(InstallerImage {
            group: "minimal".into(),
            filename: filename.into(),
            release: Release::Number(39),
            arch: "x86_64".into(),
            size: 10 << 30,
            variant: None,
            maxage,
            bootopts: None,
        })
    }

    fn structural(filename: &str) -> ConcreteImage {
        ConcreteImage::Structural(StructuralImage {
            group: "simple".into(),
            filename: filename.into(),
            size: 1 << 30,
            label: "mbr".into(),
            filesystem: "ext4".into(),
            parts: Vec::new(),
            writes: Vec::new(),
            uploads: Vec::new(),
        })
    }

    fn names(images: &[ConcreteImage]) -> Vec<&str> {
        images.iter().map(ConcreteImage::filename).collect()
    }

    fn set(names: &[&str]) -> BTreeSet<String> {
        names.iter().map(|n| (*n).to_string()).collect()
    }

    #[test]
    fn staleness_boundary_is_inclusive() {
        let now = ts("2024-06-15T12:00:00Z");
        let exactly = now - Duration::seconds(14 * SECONDS_PER_DAY);
        assert!(!is_stale(now, exactly, 14));
        assert!(is_stale(now, exactly - Duration::seconds(1), 14));
    }

    #[test]
    fn age_is_counted_in_whole_seconds() {
        let now = ts("2024-06-15T12:00:00.100Z");
        assert!(!is_stale(now, ts("2024-06-01T12:00:00.900Z"), 14));
        // Only 0.2s past the boundary, but a whole second by the clock.
        assert!(is_stale(now, ts("2024-06-01T11:59:59.900Z"), 14));
    }

    #[test]
    fn classifies_every_image_once() {
        let ports = TestPorts::new();
        let config = EngineConfig::new("/srv", "/work");
        let now = ports.clock.now_value();
        ports.fs.add_with_mtime("/work/disk_f39_fresh_x86_64.img", "", now - Duration::days(3));
        ports.fs.add_with_mtime("/work/disk_f39_old_x86_64.img", "", now - Duration::days(30));
        ports.fs.add_with_mtime("/work/disk_simple.img", "", now - Duration::days(3650));
        ports.fs.add_with_mtime("/work/disk_f39_nomax_x86_64.img", "", now - Duration::days(3650));

        let expected = vec![
            installer("disk_f39_fresh_x86_64.img", 7),
            installer("disk_f39_old_x86_64.img", 7),
            installer("disk_f39_nomax_x86_64.img", 0),
            installer("disk_f39_gone_x86_64.img", 7),
            structural("disk_simple.img"),
            structural("disk_simple.img"),
        ];
        let on_disk = set(&[
            "disk_f39_fresh_x86_64.img",
            "disk_f39_old_x86_64.img",
            "disk_f39_nomax_x86_64.img",
            "disk_simple.img",
            "disk_leftover.img",
        ]);

        let result = reconcile(&ports.context(), &config, &expected, &on_disk).unwrap();
        assert_eq!(
            names(&result.current),
            vec!["disk_f39_fresh_x86_64.img", "disk_f39_nomax_x86_64.img", "disk_simple.img"]
        );
        assert_eq!(names(&result.missing), vec!["disk_f39_gone_x86_64.img"]);
        assert_eq!(names(&result.outdated), vec!["disk_f39_old_x86_64.img"]);
        assert_eq!(result.unknown, set(&["disk_leftover.img"]));
    }

    #[test]
    fn partitions_hold_for_empty_inputs() {
        let ports = TestPorts::new();
        let config = EngineConfig::new("/srv", "/work");
        let ctx = ports.context();

        let result = reconcile(&ctx, &config, &[], &BTreeSet::new()).unwrap();
        assert_eq!(result, ReconciliationResult::default());

        let result = reconcile(&ctx, &config, &[], &set(&["disk_a.img"])).unwrap();
        assert_eq!(result.unknown, set(&["disk_a.img"]));
        assert!(result.to_build().is_empty());

        let expected = vec![structural("disk_a.img"), installer("disk_f39_b_x86_64.img", 14)];
        let result = reconcile(&ctx, &config, &expected, &BTreeSet::new()).unwrap();
        assert_eq!(names(&result.missing), vec!["disk_a.img", "disk_f39_b_x86_64.img"]);
        assert!(result.unknown.is_empty());
    }

    #[test]
    fn structural_images_never_go_stale() {
        let ports = TestPorts::new();
        let config = EngineConfig::new("/srv", "/work");
        ports.fs.add_with_mtime("/work/disk_a.img", "", ts("1999-01-01T00:00:00Z"));
        let result =
            reconcile(&ports.context(), &config, &[structural("disk_a.img")], &set(&["disk_a.img"]))
                .unwrap();
        assert_eq!(names(&result.current), vec!["disk_a.img"]);
    }

    #[test]
    fn build_queue_puts_missing_before_outdated() {
        let result = ReconciliationResult {
            missing: vec![structural("disk_m.img")],
            outdated: vec![installer("disk_f39_o_x86_64.img", 1)],
            ..ReconciliationResult::default()
        };
        let queue: Vec<&str> = result.to_build().into_iter().map(ConcreteImage::filename).collect();
        assert_eq!(queue, vec!["disk_m.img", "disk_f39_o_x86_64.img"]);
    }
}
