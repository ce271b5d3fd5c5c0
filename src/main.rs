//! Binary entrypoint for the `hddkit` CLI.

use std::process::ExitCode;

fn main() -> ExitCode {
    // Recording is handled in commands::dispatch via HDDKIT_RECORD=<dir>.
    match hddkit::run(std::env::args()) {
        Ok(status) => status.into(),
        Err(err) => {
            eprintln!("{err}");
            ExitCode::FAILURE
        }
    }
}
