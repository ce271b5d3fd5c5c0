//! The image catalog: typed image group specs validated once at load time.
//!
//! The catalog file has three top-level keys:
//!
//! ```text
//! {
//!   "structural": [ { "name", "size", "parts", "writes"?, "uploads"?,
//!                     "labels"?, "filesystems"?, "imgver"? } ],
//!   "installer":  [ { "name", "releases", "size"?, "variant"?, "imgver"?,
//!                     "maxage"?, "bootopts"? } ],
//!   "renames":    [ ["old filename", "new filename"] ]
//! }
//! ```
//!
//! `guestfs` and `virtinstall` are accepted as aliases of the first two.

mod raw;
pub mod size;

use std::collections::HashSet;
use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::context::ServiceContext;
use crate::error::CatalogError;
use raw::{RawCatalog, RawInstallerGroup, RawPartition, RawStructuralGroup, Scalar};

/// Default staleness budget for installer images, in days.
pub const DEFAULT_MAX_AGE_DAYS: u32 = 14;

/// Default disk size for installer images when the group gives none.
pub const DEFAULT_INSTALLER_SIZE: u64 = 10 * 1024 * 1024 * 1024;

/// Partition table entry type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PartitionKind {
    /// Primary partition.
    Primary,
    /// Logical partition inside an extended one.
    Logical,
    /// Extended partition.
    Extended,
}

impl PartitionKind {
    fn parse(raw: &str) -> Option<Self> {
        match raw {
            "p" | "primary" => Some(Self::Primary),
            "l" | "logical" => Some(Self::Logical),
            "e" | "extended" => Some(Self::Extended),
            _ => None,
        }
    }

    /// The single-letter code the imaging appliance expects.
    #[must_use]
    pub fn code(self) -> &'static str {
        match self {
            Self::Primary => "p",
            Self::Logical => "l",
            Self::Extended => "e",
        }
    }
}

/// One partition to create, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartitionDirective {
    /// Table entry type.
    pub kind: PartitionKind,
    /// First sector.
    pub start: i64,
    /// Last sector; negative values count back from the end of the disk.
    pub end: i64,
    /// Filesystem override; the image's filesystem is used when `None`.
    pub filesystem: Option<String>,
    /// Volume label.
    pub label: Option<String>,
    /// GPT partition type GUID.
    pub gpt_type: Option<String>,
}

/// Write literal content to a file on a partition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteDirective {
    /// 1-based index into the partitions in creation order.
    pub part: usize,
    /// Destination path on the partition.
    pub path: String,
    /// File content.
    pub content: String,
}

/// Where an uploaded asset comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssetSource {
    /// A file under `<script_dir>/uploads/`.
    Local(String),
    /// An `http://` or `https://` URL, downloaded before upload.
    Remote(String),
}

impl AssetSource {
    fn parse(raw: String) -> Self {
        if raw.starts_with("http://") || raw.starts_with("https://") {
            Self::Remote(raw)
        } else {
            Self::Local(raw)
        }
    }
}

/// Copy an asset onto a partition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadDirective {
    /// 1-based index into the partitions in creation order.
    pub part: usize,
    /// Asset to copy.
    pub source: AssetSource,
    /// Destination path on the partition.
    pub target: String,
}

/// An image group built directly from partition/format/write/upload directives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StructuralGroup {
    /// Group name.
    pub name: String,
    /// Disk size in bytes.
    pub size: u64,
    /// Partitions to create.
    pub parts: Vec<PartitionDirective>,
    /// Literal file writes.
    pub writes: Vec<WriteDirective>,
    /// Asset uploads.
    pub uploads: Vec<UploadDirective>,
    /// Declared disk labels; empty means "not declared".
    pub labels: Vec<String>,
    /// Declared default filesystems; empty means "not declared".
    pub filesystems: Vec<String>,
    /// Version tag appended to filenames.
    pub imgver: Option<String>,
}

/// A release key from an installer group's `releases` map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReleaseKey {
    /// A literal release number.
    Number(u32),
    /// The current branched release, if any.
    Branched,
    /// The rolling development release.
    Rawhide,
    /// `next release + n`, with `n < 0`.
    Relative(i64),
}

impl ReleaseKey {
    fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        if raw.eq_ignore_ascii_case("branched") {
            return Some(Self::Branched);
        }
        if raw.eq_ignore_ascii_case("rawhide") {
            return Some(Self::Rawhide);
        }
        let n: i64 = raw.parse().ok()?;
        if n < 0 {
            Some(Self::Relative(n))
        } else {
            u32::try_from(n).ok().filter(|n| *n > 0).map(Self::Number)
        }
    }

    /// Parses a release given on the command line.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::InvalidReleaseKey`] if the value is not a
    /// release key.
    pub fn parse_for(group: &str, raw: &str) -> Result<Self, CatalogError> {
        Self::parse(raw).ok_or_else(|| CatalogError::InvalidReleaseKey {
            group: group.to_string(),
            key: raw.to_string(),
        })
    }
}

impl fmt::Display for ReleaseKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{n}"),
            Self::Branched => f.write_str("branched"),
            Self::Rawhide => f.write_str("rawhide"),
            Self::Relative(n) => write!(f, "{n}"),
        }
    }
}

/// An image group built by running the OS installer in a throwaway VM.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallerGroup {
    /// Group name.
    pub name: String,
    /// Release keys and the arches to build for each, in catalog order.
    pub releases: Vec<(ReleaseKey, Vec<String>)>,
    /// Disk size in bytes.
    pub size: u64,
    /// Installation tree variant override (default `Everything`).
    pub variant: Option<String>,
    /// Version tag appended to filenames.
    pub imgver: Option<String>,
    /// Staleness budget in days; `0` disables staleness.
    pub maxage: u32,
    /// Boot options handed to the installer tool.
    pub bootopts: Option<String>,
}

/// A filename migration applied before reconciliation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rename {
    /// Old filename.
    pub from: String,
    /// New filename.
    pub to: String,
}

/// A borrowed reference to either kind of group.
#[derive(Debug, Clone, Copy)]
pub enum GroupRef<'a> {
    /// Structural group.
    Structural(&'a StructuralGroup),
    /// Installer group.
    Installer(&'a InstallerGroup),
}

/// The validated catalog.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Catalog {
    /// Structural image groups.
    pub structural: Vec<StructuralGroup>,
    /// Installer image groups.
    pub installer: Vec<InstallerGroup>,
    /// Rename pairs.
    pub renames: Vec<Rename>,
}

impl Catalog {
    /// Reads and validates the catalog at `path` through the filesystem port.
    ///
    /// `.yaml` and `.yml` files are parsed as YAML, everything else as JSON.
    ///
    /// # Errors
    ///
    /// Returns a [`CatalogError`] if the file cannot be read, parsed, or
    /// fails validation.
    pub fn load(ctx: &ServiceContext, path: &Path) -> Result<Self, CatalogError> {
        let contents = ctx
            .fs
            .read_to_string(path)
            .map_err(|e| CatalogError::Read { path: path.to_path_buf(), reason: e.to_string() })?;
        let is_yaml = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("yaml") || e.eq_ignore_ascii_case("yml"));
        let raw: RawCatalog = if is_yaml {
            serde_yaml::from_str(&contents).map_err(|e| CatalogError::Parse {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?
        } else {
            serde_json::from_str(&contents).map_err(|e| CatalogError::Parse {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?
        };
        Self::from_raw(raw)
    }

    /// Parses and validates a JSON catalog held in memory.
    ///
    /// # Errors
    ///
    /// Returns a [`CatalogError`] if the text is not a valid catalog.
    pub fn from_json(text: &str) -> Result<Self, CatalogError> {
        let raw: RawCatalog = serde_json::from_str(text).map_err(|e| CatalogError::Parse {
            path: "<inline>".into(),
            reason: e.to_string(),
        })?;
        Self::from_raw(raw)
    }

    fn from_raw(raw: RawCatalog) -> Result<Self, CatalogError> {
        let structural =
            raw.structural.into_iter().map(validate_structural).collect::<Result<Vec<_>, _>>()?;
        let installer =
            raw.installer.into_iter().map(validate_installer).collect::<Result<Vec<_>, _>>()?;

        let mut seen = HashSet::new();
        for name in structural.iter().map(|g| &g.name).chain(installer.iter().map(|g| &g.name)) {
            if !seen.insert(name.as_str()) {
                return Err(CatalogError::DuplicateGroup(name.clone()));
            }
        }

        let renames = raw.renames.into_iter().map(|(from, to)| Rename { from, to }).collect();
        Ok(Self { structural, installer, renames })
    }

    /// Finds a group by name.
    #[must_use]
    pub fn group(&self, name: &str) -> Option<GroupRef<'_>> {
        self.structural
            .iter()
            .find(|g| g.name == name)
            .map(GroupRef::Structural)
            .or_else(|| self.installer.iter().find(|g| g.name == name).map(GroupRef::Installer))
    }

    /// All group names, structural first.
    #[must_use]
    pub fn group_names(&self) -> Vec<&str> {
        self.structural
            .iter()
            .map(|g| g.name.as_str())
            .chain(self.installer.iter().map(|g| g.name.as_str()))
            .collect()
    }
}

fn invalid(group: &str, reason: impl Into<String>) -> CatalogError {
    CatalogError::InvalidGroup { group: group.to_string(), reason: reason.into() }
}

fn validate_name(name: &str) -> Result<(), CatalogError> {
    if name.is_empty() || name.contains(['/', '\\']) || name.starts_with('-') {
        return Err(invalid(name, "name must be non-empty, without slashes or a leading dash"));
    }
    Ok(())
}

fn validate_dimension(
    group: &str,
    field: &str,
    values: Option<Vec<String>>,
) -> Result<Vec<String>, CatalogError> {
    match values {
        None => Ok(Vec::new()),
        Some(v) if v.is_empty() => Err(invalid(group, format!("{field} is empty"))),
        Some(v) => Ok(v),
    }
}

fn validate_structural(raw: RawStructuralGroup) -> Result<StructuralGroup, CatalogError> {
    let name = raw.name;
    validate_name(&name)?;

    let size_literal = raw.size.into_text();
    let size = size::parse_size(&size_literal)
        .ok_or_else(|| CatalogError::InvalidSize { group: name.clone(), literal: size_literal })?;

    if raw.parts.is_empty() {
        return Err(invalid(&name, "parts is empty"));
    }
    let parts = raw
        .parts
        .into_iter()
        .map(|p| validate_partition(&name, p))
        .collect::<Result<Vec<_>, _>>()?;

    let part_count = parts.len();
    let check_index = |part: usize, what: &str| {
        if part == 0 || part > part_count {
            Err(invalid(
                &name,
                format!("{what} targets partition {part}, valid range is 1..={part_count}"),
            ))
        } else {
            Ok(())
        }
    };

    let mut writes = Vec::with_capacity(raw.writes.len());
    for w in raw.writes {
        check_index(w.part, "write")?;
        writes.push(WriteDirective { part: w.part, path: w.path, content: w.content });
    }
    let mut uploads = Vec::with_capacity(raw.uploads.len());
    for u in raw.uploads {
        check_index(u.part, "upload")?;
        uploads.push(UploadDirective {
            part: u.part,
            source: AssetSource::parse(u.source),
            target: u.target,
        });
    }

    let labels = validate_dimension(&name, "labels", raw.labels)?;
    let filesystems = validate_dimension(&name, "filesystems", raw.filesystems)?;

    Ok(StructuralGroup {
        size,
        parts,
        writes,
        uploads,
        labels,
        filesystems,
        imgver: raw.imgver.map(Scalar::into_text).filter(|v| !v.is_empty()),
        name,
    })
}

fn validate_partition(group: &str, raw: RawPartition) -> Result<PartitionDirective, CatalogError> {
    let kind = PartitionKind::parse(&raw.kind)
        .ok_or_else(|| invalid(group, format!("unknown partition type {:?}", raw.kind)))?;
    if raw.start < 0 {
        return Err(invalid(group, format!("partition start {} is negative", raw.start)));
    }
    Ok(PartitionDirective {
        kind,
        start: raw.start,
        end: raw.end,
        filesystem: raw.filesystem,
        label: raw.label,
        gpt_type: raw.gpt_type,
    })
}

fn validate_installer(raw: RawInstallerGroup) -> Result<InstallerGroup, CatalogError> {
    let name = raw.name;
    validate_name(&name)?;

    let size = match raw.size {
        None => DEFAULT_INSTALLER_SIZE,
        Some(literal) => installer_size(&literal).ok_or_else(|| CatalogError::InvalidSize {
            group: name.clone(),
            literal: literal.into_text(),
        })?,
    };

    if raw.releases.is_empty() {
        return Err(invalid(&name, "releases is empty"));
    }
    let mut releases = Vec::with_capacity(raw.releases.len());
    for (key, arches) in raw.releases {
        let key_text = key.into_text();
        let parsed = ReleaseKey::parse(&key_text).ok_or_else(|| CatalogError::InvalidReleaseKey {
            group: name.clone(),
            key: key_text.clone(),
        })?;
        if arches.is_empty() {
            return Err(invalid(&name, format!("release {key_text} lists no arches")));
        }
        releases.push((parsed, arches));
    }

    Ok(InstallerGroup {
        releases,
        size,
        variant: raw.variant.filter(|v| !v.is_empty()),
        imgver: raw.imgver.map(Scalar::into_text).filter(|v| !v.is_empty()),
        maxage: raw.maxage.unwrap_or(DEFAULT_MAX_AGE_DAYS),
        bootopts: raw.bootopts,
        name,
    })
}

/// Installer sizes given as a JSON/YAML number are whole GiB; strings are
/// size literals, the same as for structural groups.
fn installer_size(literal: &Scalar) -> Option<u64> {
    match literal {
        Scalar::Int(n) => u64::try_from(*n).ok().filter(|n| *n > 0)?.checked_mul(size::GIB),
        Scalar::Text(s) => size::parse_size(s),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "guestfs": [
            {"name": "simple", "size": "10G",
             "parts": [{"type": "p", "start": 2048, "end": -1}],
             "labels": ["mbr", "gpt"], "filesystems": ["ext4"]},
            {"name": "shrink", "size": "11G", "imgver": 2,
             "parts": [{"type": "primary", "start": 2048, "end": -1, "filesystem": "ntfs",
                        "label": "SHRINK"}],
             "writes": [{"part": 1, "path": "/testfile", "content": "hello"}],
             "uploads": [{"part": 1, "source": "https://example.com/a.bin", "target": "/a.bin"},
                         {"part": 1, "source": "local.bin", "target": "/b.bin"}]}
        ],
        "virtinstall": [
            {"name": "minimal", "releases": {"-1": ["x86_64"], "branched": ["x86_64", "i686"]},
             "maxage": 7, "size": 15}
        ],
        "renames": [["disk_old.img", "disk_new.img"]]
    }"#;

    #[test]
    fn parses_sample_catalog_with_aliases() {
        let catalog = Catalog::from_json(SAMPLE).unwrap();
        assert_eq!(catalog.structural.len(), 2);
        assert_eq!(catalog.installer.len(), 1);
        assert_eq!(
            catalog.renames,
            vec![Rename { from: "disk_old.img".into(), to: "disk_new.img".into() }]
        );

        let simple = &catalog.structural[0];
        assert_eq!(simple.size, 10 * 1024 * 1024 * 1024);
        assert_eq!(simple.labels, vec!["mbr", "gpt"]);
        assert_eq!(simple.parts[0].kind, PartitionKind::Primary);
        assert_eq!(simple.parts[0].end, -1);

        let shrink = &catalog.structural[1];
        assert_eq!(shrink.imgver.as_deref(), Some("2"));
        assert!(shrink.labels.is_empty());
        assert_eq!(shrink.uploads[0].source, AssetSource::Remote("https://example.com/a.bin".into()));
        assert_eq!(shrink.uploads[1].source, AssetSource::Local("local.bin".into()));
    }

    #[test]
    fn installer_keys_keep_catalog_order() {
        let catalog = Catalog::from_json(SAMPLE).unwrap();
        let minimal = &catalog.installer[0];
        let keys: Vec<ReleaseKey> = minimal.releases.iter().map(|(k, _)| *k).collect();
        assert_eq!(keys, vec![ReleaseKey::Relative(-1), ReleaseKey::Branched]);
        assert_eq!(minimal.maxage, 7);
        assert_eq!(minimal.size, 15 * 1024 * 1024 * 1024);
    }

    #[test]
    fn installer_defaults() {
        let catalog =
            Catalog::from_json(r#"{"installer": [{"name": "x", "releases": {"39": ["x86_64"]}}]}"#)
                .unwrap();
        let group = &catalog.installer[0];
        assert_eq!(group.maxage, DEFAULT_MAX_AGE_DAYS);
        assert_eq!(group.size, DEFAULT_INSTALLER_SIZE);
        assert_eq!(group.releases[0].0, ReleaseKey::Number(39));
    }

    #[test]
    fn size_strings_mean_the_same_in_both_group_kinds() {
        let catalog = Catalog::from_json(
            r#"{"structural": [{"name": "s", "size": "4096",
                 "parts": [{"type": "p", "start": 2048, "end": -1}]}],
                "installer": [{"name": "i", "size": "4096", "releases": {"39": ["x86_64"]}},
                              {"name": "n", "size": 4, "releases": {"39": ["x86_64"]}}]}"#,
        )
        .unwrap();
        assert_eq!(catalog.structural[0].size, 4096);
        assert_eq!(catalog.installer[0].size, 4096);
        assert_eq!(catalog.installer[1].size, 4 * size::GIB);
    }

    #[test]
    fn rejects_bad_size() {
        let err = Catalog::from_json(
            r#"{"structural": [{"name": "a", "size": "10T",
                "parts": [{"type": "p", "start": 2048, "end": -1}]}]}"#,
        )
        .unwrap_err();
        assert!(matches!(err, CatalogError::InvalidSize { .. }), "{err}");
    }

    #[test]
    fn rejects_missing_parts() {
        let err = Catalog::from_json(r#"{"structural": [{"name": "a", "size": "1G"}]}"#).unwrap_err();
        assert!(matches!(err, CatalogError::Parse { .. }), "{err}");
    }

    #[test]
    fn rejects_write_to_missing_partition() {
        let err = Catalog::from_json(
            r#"{"structural": [{"name": "a", "size": "1G",
                "parts": [{"type": "p", "start": 2048, "end": -1}],
                "writes": [{"part": 2, "path": "/x", "content": "y"}]}]}"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("partition 2"), "{err}");
    }

    #[test]
    fn rejects_bad_release_key() {
        let err = Catalog::from_json(
            r#"{"installer": [{"name": "x", "releases": {"stable": ["x86_64"]}}]}"#,
        )
        .unwrap_err();
        assert!(matches!(err, CatalogError::InvalidReleaseKey { .. }), "{err}");
    }

    #[test]
    fn rejects_duplicate_group_names() {
        let err = Catalog::from_json(
            r#"{"structural": [{"name": "dup", "size": "1G",
                "parts": [{"type": "p", "start": 2048, "end": -1}]}],
                "installer": [{"name": "dup", "releases": {"39": ["x86_64"]}}]}"#,
        )
        .unwrap_err();
        assert!(matches!(err, CatalogError::DuplicateGroup(ref n) if n == "dup"));
    }

    #[test]
    fn release_key_parsing() {
        assert_eq!(ReleaseKey::parse("38"), Some(ReleaseKey::Number(38)));
        assert_eq!(ReleaseKey::parse("-2"), Some(ReleaseKey::Relative(-2)));
        assert_eq!(ReleaseKey::parse("Branched"), Some(ReleaseKey::Branched));
        assert_eq!(ReleaseKey::parse("rawhide"), Some(ReleaseKey::Rawhide));
        assert_eq!(ReleaseKey::parse("0"), None);
        assert_eq!(ReleaseKey::parse("f38"), None);
    }

    #[test]
    fn finds_groups_by_name() {
        let catalog = Catalog::from_json(SAMPLE).unwrap();
        assert!(matches!(catalog.group("simple"), Some(GroupRef::Structural(_))));
        assert!(matches!(catalog.group("minimal"), Some(GroupRef::Installer(_))));
        assert!(catalog.group("nope").is_none());
        assert_eq!(catalog.group_names(), vec!["simple", "shrink", "minimal"]);
    }
}
