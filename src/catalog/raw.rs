//! Wire shape of the catalog file, before validation.

use indexmap::IndexMap;
use serde::Deserialize;

/// A scalar that may be written as a number or a string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize)]
#[serde(untagged)]
pub(crate) enum Scalar {
    Int(i64),
    Text(String),
}

impl Scalar {
    pub(crate) fn into_text(self) -> String {
        match self {
            Self::Int(n) => n.to_string(),
            Self::Text(s) => s,
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawCatalog {
    #[serde(default, alias = "guestfs")]
    pub structural: Vec<RawStructuralGroup>,
    #[serde(default, alias = "virtinstall")]
    pub installer: Vec<RawInstallerGroup>,
    #[serde(default)]
    pub renames: Vec<(String, String)>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawStructuralGroup {
    pub name: String,
    pub size: Scalar,
    pub parts: Vec<RawPartition>,
    #[serde(default)]
    pub writes: Vec<RawWrite>,
    #[serde(default)]
    pub uploads: Vec<RawUpload>,
    pub labels: Option<Vec<String>>,
    pub filesystems: Option<Vec<String>>,
    pub imgver: Option<Scalar>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawPartition {
    #[serde(rename = "type")]
    pub kind: String,
    pub start: i64,
    pub end: i64,
    pub filesystem: Option<String>,
    pub label: Option<String>,
    pub gpt_type: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawWrite {
    pub part: usize,
    pub path: String,
    pub content: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawUpload {
    pub part: usize,
    pub source: String,
    pub target: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawInstallerGroup {
    pub name: String,
    pub releases: IndexMap<Scalar, Vec<String>>,
    pub size: Option<Scalar>,
    pub variant: Option<String>,
    pub imgver: Option<Scalar>,
    pub maxage: Option<u32>,
    pub bootopts: Option<String>,
}
