//! Ctrl-C handling: remove in-progress images, then exit.
//!
//! An interrupted build is treated as a crash. Nothing inside the build is
//! told to stop; the handler only makes sure no `disk*.tmp` outlives the
//! process.

use std::path::PathBuf;

use tracing::info;

use crate::adapters::live::LiveFileSystem;
use crate::reconcile::remove_temp_files;

/// Spawns the watcher thread for `work_dir`.
///
/// # Errors
///
/// Returns an error if the signal runtime or thread cannot be started.
pub fn install(work_dir: PathBuf) -> Result<(), String> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|e| format!("Failed to start signal runtime: {e}"))?;
    std::thread::Builder::new()
        .name("interrupt".into())
        .spawn(move || {
            if runtime.block_on(tokio::signal::ctrl_c()).is_err() {
                return;
            }
            for name in remove_temp_files(&LiveFileSystem, &work_dir) {
                info!("Removed {name}");
            }
            eprintln!("Interrupted, exiting...");
            std::process::exit(1);
        })
        .map_err(|e| format!("Failed to spawn interrupt handler: {e}"))?;
    Ok(())
}
