//! Command runner port for invoking external tools.

use std::error::Error;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// An external program invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandSpec {
    /// Program name or path.
    pub program: String,
    /// Arguments, passed without shell interpretation.
    pub args: Vec<String>,
    /// When `true` the child writes straight to our stdout/stderr instead
    /// of being captured. Interactive installs use this.
    #[serde(default)]
    pub inherit_output: bool,
}

impl CommandSpec {
    /// Creates a captured invocation of `program` with no arguments.
    #[must_use]
    pub fn new(program: impl Into<String>) -> Self {
        Self { program: program.into(), args: Vec::new(), inherit_output: false }
    }

    /// Appends one argument.
    #[must_use]
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Appends several arguments.
    #[must_use]
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Lets the child write to the terminal directly.
    #[must_use]
    pub fn inherit_output(mut self, inherit: bool) -> Self {
        self.inherit_output = inherit;
        self
    }

    /// Renders the invocation as a single line for logs and error messages.
    #[must_use]
    pub fn display(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// How an invocation ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommandOutcome {
    /// The process exited on its own.
    Exited {
        /// Exit code, `-1` when the process was killed by a signal.
        code: i32,
        /// Captured standard output (empty when inherited).
        stdout: String,
        /// Captured standard error (empty when inherited).
        stderr: String,
    },
    /// The wall-clock timeout expired and the process was killed.
    TimedOut,
}

impl CommandOutcome {
    /// Returns `true` for a zero exit.
    #[must_use]
    pub fn success(&self) -> bool {
        matches!(self, Self::Exited { code: 0, .. })
    }
}

/// Runs external programs.
pub trait CommandRunner: Send + Sync {
    /// Runs the command, killing it if `timeout` elapses first.
    ///
    /// # Errors
    ///
    /// Returns an error if the program cannot be spawned or waited on.
    fn run(
        &self,
        command: &CommandSpec,
        timeout: Option<Duration>,
    ) -> Result<CommandOutcome, Box<dyn Error + Send + Sync>>;
}
