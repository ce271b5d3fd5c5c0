//! Log setup: a `tracing-subscriber` formatter on stderr.

use clap::ValueEnum;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

/// Environment variable consulted when `--loglevel` is not given.
pub const LOG_ENV: &str = "HDDKIT_LOG";

/// Log levels accepted by `--loglevel`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogLevel {
    /// Everything, including installer debug output.
    Debug,
    /// Progress messages.
    Info,
    /// Problems that do not stop the run.
    Warning,
    /// Failures.
    Error,
    /// Same as `error`.
    Critical,
}

impl LogLevel {
    fn directive(self) -> &'static str {
        match self {
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warning => "warn",
            Self::Error | Self::Critical => "error",
        }
    }
}

fn env_filter(level: Option<LogLevel>) -> EnvFilter {
    match level {
        Some(level) => EnvFilter::new(level.directive()),
        None => EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("info")),
    }
}

/// Installs the global subscriber. Later calls are no-ops.
pub fn init(level: Option<LogLevel>) {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter(level))
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .try_init();
}

/// Whether debug events are enabled anywhere.
#[must_use]
pub fn debug_enabled() -> bool {
    LevelFilter::current() >= LevelFilter::DEBUG
}
