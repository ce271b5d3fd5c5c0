//! CLI argument definitions.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::config::{executable_dir, EngineConfig};
use crate::logging::LogLevel;

/// Top-level CLI parser for `hddkit`.
#[derive(Debug, Parser)]
#[command(
    name = "hddkit",
    version,
    about = "Create and maintain the disk images used by installation tests",
    after_help = "Any other subcommand is taken as an image group name and rebuilds that \
                  group's images: hddkit <group> [--label L] [--filesystem F] [--release R] \
                  [--arch A] [--nextrel N]\n\n\
                  Global options such as --workdir or --loglevel go before the group \
                  name: hddkit --workdir DIR <group> ..."
)]
pub struct Cli {
    /// Log level.
    #[arg(long, global = true, value_enum)]
    pub loglevel: Option<LogLevel>,

    /// Run the installer on a serial console attached to this terminal.
    #[arg(long, global = true)]
    pub textinst: bool,

    /// Directory holding the catalog, kickstarts and uploads.
    #[arg(long, global = true, env = "HDDKIT_SCRIPT_DIR")]
    pub script_dir: Option<PathBuf>,

    /// Directory where images are checked and created.
    #[arg(long, global = true, env = "HDDKIT_WORKDIR")]
    pub workdir: Option<PathBuf>,

    /// Catalog file (default: <script-dir>/hdds.json).
    #[arg(long, global = true, env = "HDDKIT_CATALOG")]
    pub catalog: Option<PathBuf>,

    /// Hypervisor connection URI.
    #[arg(long, global = true, env = "HDDKIT_LIBVIRT_URI")]
    pub libvirt_uri: Option<String>,

    /// Release metadata document URL.
    #[arg(long, global = true, env = "HDDKIT_RELEASE_URL")]
    pub release_url: Option<String>,

    /// Mirror root for installation trees.
    #[arg(long, global = true, env = "HDDKIT_MIRROR")]
    pub mirror: Option<String>,

    /// The command to execute.
    #[command(subcommand)]
    pub command: Command,
}

/// Supported top-level subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Build every missing or outdated image.
    All {
        /// Delete every existing image first and rebuild everything.
        #[arg(long)]
        delete: bool,
        /// Remove unknown images.
        #[arg(long)]
        clean: bool,
        /// Next release number, instead of asking release metadata.
        #[arg(long)]
        nextrel: Option<u32>,
    },
    /// Report missing, outdated and unknown images.
    ///
    /// Exits 2 when images are missing, 1 when some are only outdated.
    Check {
        /// Apply catalog renames before checking.
        #[arg(long)]
        rename: bool,
        /// Remove unknown images.
        #[arg(long)]
        clean: bool,
        /// Next release number, instead of asking release metadata.
        #[arg(long)]
        nextrel: Option<u32>,
    },
    /// Rebuild one group's images.
    #[command(external_subcommand)]
    Group(Vec<String>),
}

/// Options of a group rebuild, parsed from the words after the group name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Parser)]
pub struct GroupArgs {
    /// Group name.
    #[arg(skip)]
    pub name: String,
    #[command(flatten)]
    pub narrow: Narrow,
}

/// Narrowing of a group rebuild.
#[derive(Debug, Clone, Default, PartialEq, Eq, Args)]
pub struct Narrow {
    /// Build only this disk label.
    #[arg(long)]
    pub label: Option<String>,
    /// Build only this filesystem.
    #[arg(long)]
    pub filesystem: Option<String>,
    /// Build only this release (arch defaults to x86_64).
    #[arg(long)]
    pub release: Option<String>,
    /// Build only this arch.
    #[arg(long)]
    pub arch: Option<String>,
    /// Next release number, instead of asking release metadata.
    #[arg(long)]
    pub nextrel: Option<u32>,
}

impl GroupArgs {
    /// Parses `[<group>, options...]` as captured by [`Command::Group`].
    ///
    /// # Errors
    ///
    /// Returns clap's rendered error for unknown or malformed options.
    pub fn parse_words(words: &[String]) -> Result<Self, String> {
        let Some(name) = words.first() else {
            return Err("missing group name".to_string());
        };
        let mut args = Self::try_parse_from(words).map_err(|e| e.to_string())?;
        args.name.clone_from(name);
        Ok(args)
    }
}

impl Cli {
    /// Builds the engine configuration from flags, environment and defaults.
    #[must_use]
    pub fn engine_config(&self) -> EngineConfig {
        let script_dir = self.script_dir.clone().unwrap_or_else(executable_dir);
        let work_dir = self
            .workdir
            .clone()
            .or_else(|| std::env::current_dir().ok())
            .unwrap_or_else(|| PathBuf::from("."));
        let mut config = EngineConfig::new(script_dir, work_dir);
        if let Some(catalog) = &self.catalog {
            config.catalog.clone_from(catalog);
        }
        config.libvirt_uri.clone_from(&self.libvirt_uri);
        if let Some(url) = &self.release_url {
            config.release_metadata_url.clone_from(url);
        }
        if let Some(mirror) = &self.mirror {
            config.mirror.clone_from(mirror);
        }
        config.interactive = self.textinst;
        config
    }
}
