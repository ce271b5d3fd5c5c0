//! Typed errors for catalog validation and image builds.

use std::path::PathBuf;

use thiserror::Error;

/// A problem with the catalog itself. Always reported before any build.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// The catalog file could not be read.
    #[error("failed to read catalog {path}: {reason}")]
    Read {
        /// Catalog path.
        path: PathBuf,
        /// Underlying error text.
        reason: String,
    },
    /// The catalog file is not valid JSON/YAML or does not match the schema.
    #[error("failed to parse catalog {path}: {reason}")]
    Parse {
        /// Catalog path.
        path: PathBuf,
        /// Underlying error text.
        reason: String,
    },
    /// A size literal such as `10G` could not be parsed.
    #[error("invalid size {literal:?} in group {group}")]
    InvalidSize {
        /// Group name.
        group: String,
        /// The offending literal.
        literal: String,
    },
    /// A release key is neither a number, `branched`, nor `rawhide`.
    #[error("invalid release key {key:?} in group {group}")]
    InvalidReleaseKey {
        /// Group name.
        group: String,
        /// The offending key.
        key: String,
    },
    /// A group is structurally invalid.
    #[error("group {group}: {reason}")]
    InvalidGroup {
        /// Group name.
        group: String,
        /// What is wrong.
        reason: String,
    },
    /// Two groups share a name.
    #[error("duplicate group name {0}")]
    DuplicateGroup(String),
    /// A group name was requested that the catalog does not define.
    #[error("no image group named {0}")]
    UnknownGroup(String),
    /// An override names a value the group does not declare.
    #[error("group {group} has no {dimension} {value:?} (choose from: {choices})")]
    InvalidOverride {
        /// Group name.
        group: String,
        /// `label` or `filesystem`.
        dimension: &'static str,
        /// Requested value.
        value: String,
        /// Comma-separated allowed values.
        choices: String,
    },
    /// Release discovery failed while a symbolic release had to be resolved.
    #[error("could not resolve release for group {group}: {reason}")]
    ReleaseDiscovery {
        /// Group name.
        group: String,
        /// Underlying error text.
        reason: String,
    },
    /// A negative release key would resolve to a release below 1.
    #[error("release key {key} in group {group} resolves below 1 (next release is {next})")]
    ReleaseOutOfRange {
        /// Group name.
        group: String,
        /// The negative key.
        key: i64,
        /// Next release used for the computation.
        next: u32,
    },
}

/// A failed image build. No final image file is left behind.
#[derive(Debug, Error)]
pub enum BuildError {
    /// Every installer attempt hit the wall-clock timeout.
    #[error("image creation for {image} timed out {attempts} times")]
    TimedOutTooManyTimes {
        /// Final image filename.
        image: String,
        /// Attempts made, including the first.
        attempts: u32,
    },
    /// The installer tool exited nonzero.
    #[error("installer command `{command}` failed with exit code {code}")]
    InstallerFailed {
        /// Rendered command line.
        command: String,
        /// Exit code.
        code: i32,
    },
    /// The installer exited cleanly but the domain is not shut off.
    #[error("domain {domain} is {state}, not shut off; this is unexpected, aborting")]
    DomainNotShutOff {
        /// Domain name.
        domain: String,
        /// Observed state, or `undefined`.
        state: String,
    },
    /// No kickstart file matched the image.
    #[error("no kickstart found for {image} in {dir}")]
    MissingKickstart {
        /// Final image filename.
        image: String,
        /// Directory searched.
        dir: PathBuf,
    },
    /// A write/upload directive names a partition that does not exist.
    #[error("{image}: directive targets partition {index}, but only {count} exist")]
    NoSuchPartition {
        /// Final image filename.
        image: String,
        /// 1-based index from the directive.
        index: usize,
        /// Partitions actually created.
        count: usize,
    },
    /// A step of the structural build failed.
    #[error("{image}: {step} failed: {reason}")]
    Imaging {
        /// Final image filename.
        image: String,
        /// Which step failed.
        step: String,
        /// Underlying error text.
        reason: String,
    },
    /// A port (filesystem, hypervisor, runner, fetcher) failed.
    #[error("{context}: {reason}")]
    Port {
        /// What was being attempted.
        context: String,
        /// Underlying error text.
        reason: String,
    },
    /// Local I/O failed.
    #[error("{context}: {source}")]
    Io {
        /// What was being attempted.
        context: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}

impl BuildError {
    /// Wraps a port error with context.
    pub fn port(context: impl Into<String>, err: &(dyn std::error::Error + Send + Sync)) -> Self {
        Self::Port { context: context.into(), reason: err.to_string() }
    }
}

/// A failed operation on the work directory outside of a build.
#[derive(Debug, Error)]
pub enum WorkDirError {
    /// The directory could not be listed.
    #[error("failed to list {dir}: {reason}")]
    List {
        /// Directory.
        dir: PathBuf,
        /// Underlying error text.
        reason: String,
    },
    /// A file's modification time could not be read.
    #[error("failed to stat {path}: {reason}")]
    Stat {
        /// File.
        path: PathBuf,
        /// Underlying error text.
        reason: String,
    },
    /// A rename failed.
    #[error("failed to rename {from} to {to}: {reason}")]
    Rename {
        /// Old filename.
        from: String,
        /// New filename.
        to: String,
        /// Underlying error text.
        reason: String,
    },
}
