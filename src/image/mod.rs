//! Concrete image descriptors produced by the resolver.

pub mod naming;

use std::fmt;

use crate::catalog::{PartitionDirective, UploadDirective, WriteDirective};

/// A resolved release: a number, or the rolling development release.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Release {
    /// Numbered release.
    Number(u32),
    /// Rolling development release.
    Rawhide,
}

impl fmt::Display for Release {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{n}"),
            Self::Rawhide => f.write_str("rawhide"),
        }
    }
}

/// One structural image to build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StructuralImage {
    /// Group the image came from.
    pub group: String,
    /// Final filename.
    pub filename: String,
    /// Disk size in bytes.
    pub size: u64,
    /// Disk label type.
    pub label: String,
    /// Default filesystem for partitions without their own.
    pub filesystem: String,
    /// Partitions to create.
    pub parts: Vec<PartitionDirective>,
    /// Literal file writes.
    pub writes: Vec<WriteDirective>,
    /// Asset uploads.
    pub uploads: Vec<UploadDirective>,
}

/// One installer image to build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallerImage {
    /// Group the image came from.
    pub group: String,
    /// Final filename.
    pub filename: String,
    /// Target release.
    pub release: Release,
    /// Target architecture, as used in the filename.
    pub arch: String,
    /// Disk size in bytes.
    pub size: u64,
    /// Installation tree variant override.
    pub variant: Option<String>,
    /// Staleness budget in days; `0` disables staleness.
    pub maxage: u32,
    /// Boot options for the installer tool.
    pub bootopts: Option<String>,
}

/// A concrete, uniquely named build unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConcreteImage {
    /// Built by the filesystem builder.
    Structural(StructuralImage),
    /// Built by the installer builder.
    Installer(InstallerImage),
}

impl ConcreteImage {
    /// Final filename.
    #[must_use]
    pub fn filename(&self) -> &str {
        match self {
            Self::Structural(img) => &img.filename,
            Self::Installer(img) => &img.filename,
        }
    }

    /// Group the image came from.
    #[must_use]
    pub fn group(&self) -> &str {
        match self {
            Self::Structural(img) => &img.group,
            Self::Installer(img) => &img.group,
        }
    }

    /// Staleness budget in days, if the image can go stale at all.
    #[must_use]
    pub fn max_age_days(&self) -> Option<u32> {
        match self {
            Self::Structural(_) => None,
            Self::Installer(img) => Some(img.maxage).filter(|days| *days > 0),
        }
    }
}

impl fmt::Display for ConcreteImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.filename())
    }
}
