//! Error types shared by every registry operation.
//!
//! A key or value that does not exist is not an error: read verbs return
//! `Ok(None)`, existence checks return `false`, and deletes become no-ops.

use thiserror::Error;

/// Result type for registry operations.
pub type RegResult<T> = Result<T, RegError>;

/// Errors that can occur while talking to the registry through `reg.exe`.
#[derive(Debug, Error)]
pub enum RegError {
    /// The caller asked for something the registry can never accept
    /// (unknown root, unknown value type, malformed option).
    #[error("Configuration error: {message}")]
    Configuration {
        /// Description of the problem.
        message: String,
    },

    /// `reg.exe` ran and reported a real failure.
    #[error("{message} - Command '{command}'")]
    ExternalTool {
        /// First error line printed by the tool.
        message: String,
        /// The full command line that was attempted.
        command: String,
    },

    /// The tool could not be launched, crashed or timed out.
    #[error("Process error: {message}")]
    Process {
        /// Description of the failure.
        message: String,
    },

    /// Filesystem error in the configuration or logging layers.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl RegError {
    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Create a process error.
    pub fn process(message: impl Into<String>) -> Self {
        Self::Process {
            message: message.into(),
        }
    }

    /// Create an external tool error from the tool's error line and the
    /// attempted command line.
    pub fn external(message: impl Into<String>, command: impl Into<String>) -> Self {
        Self::ExternalTool {
            message: message.into(),
            command: command.into(),
        }
    }

    /// Whether this error was raised before any process was spawned.
    pub fn is_configuration(&self) -> bool {
        matches!(self, Self::Configuration { .. })
    }
}
