//! Core library entry for the `hddkit` CLI.
//!
//! `hddkit` keeps a directory of disk image fixtures in step with a
//! declarative catalog: it resolves catalog groups into concrete images,
//! reconciles them against what is on disk, and builds whatever is missing
//! or outdated, either directly through a disk imager or by running an
//! unattended OS installer in a throwaway virtual machine.

pub mod adapters;
pub mod build;
pub mod cassette;
pub mod catalog;
pub mod cli;
pub mod commands;
pub mod config;
pub mod context;
pub mod error;
pub mod image;
pub mod interrupt;
pub mod logging;
pub mod ports;
pub mod reconcile;
pub mod resolve;

#[cfg(test)]
pub(crate) mod testing;

use clap::Parser;

use crate::commands::ExitStatus;

/// Run the CLI with the provided arguments.
///
/// A `.env` file in the working directory is loaded before the arguments
/// are parsed, so it can supply any `HDDKIT_*` setting.
///
/// # Errors
///
/// Returns an error string when argument parsing fails or command execution fails.
pub fn run<I, T>(args: I) -> Result<ExitStatus, String>
where
    I: IntoIterator<Item = T>,
    T: Into<std::ffi::OsString> + Clone,
{
    let _ = dotenvy::dotenv();
    let cli = match cli::Cli::try_parse_from(args) {
        Ok(cli) => cli,
        // --help and --version
        Err(err) if !err.use_stderr() => {
            let _ = err.print();
            return Ok(ExitStatus::Success);
        }
        Err(err) => return Err(err.to_string()),
    };
    logging::init(cli.loglevel);
    commands::dispatch(&cli)
}
