use derive_builder::Builder;
use serde::{Deserialize, Serialize};

/// The most console lines a single run can report in its verdict.
pub const MAX_CONSOLE_LINES: usize = 50;

// Used internally to pass options to the sandbox
#[derive(Clone, Deserialize, Debug, Serialize, Builder, Eq, PartialEq)]
pub struct SandboxOptions {
    /// The number of console lines the harness keeps. Lines past this bound are dropped.
    pub max_console_lines: usize,
    /// Whether console lines are forwarded to the host's log as they are produced.
    pub log_console: bool,
}

impl Default for SandboxOptions {
    fn default() -> Self {
        Self {
            max_console_lines: MAX_CONSOLE_LINES,
            log_console: true,
        }
    }
}
