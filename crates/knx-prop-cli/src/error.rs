//! Error types for knx-prop CLI.
//!
//! CliError wraps CoreError from the shared library and maps it to exit codes.

use knx_prop_core::error::CoreError;
use thiserror::Error;

pub use knx_prop_core::error::{ConfigError, TransportError};

/// Exit codes for the CLI
pub mod exit_codes {
    pub const SUCCESS: i32 = 0;
    pub const GENERAL_ERROR: i32 = 1;
    pub const NETWORK_ERROR: i32 = 2;
    pub const DEVICE_ERROR: i32 = 3;
    pub const INVALID_ARGS: i32 = 4;
}

/// Main error type for the CLI
#[derive(Error, Debug)]
pub enum CliError {
    #[error("{0}")]
    Core(#[from] CoreError),

    /// Already shown to the user through the completion report
    #[error("{0}")]
    Reported(CoreError),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

impl CliError {
    /// Get the exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::Core(e) | CliError::Reported(e) => match e {
                CoreError::Config(_) => exit_codes::INVALID_ARGS,
                CoreError::Transport(_) => exit_codes::NETWORK_ERROR,
                CoreError::Protocol(_) | CoreError::SessionClosed => exit_codes::DEVICE_ERROR,
                CoreError::Parse(_) => exit_codes::INVALID_ARGS,
                CoreError::Load(_) | CoreError::Io(_) => exit_codes::GENERAL_ERROR,
            },
            CliError::InvalidArgument(_) => exit_codes::INVALID_ARGS,
        }
    }

    /// Whether the message still has to be printed.
    pub fn needs_report(&self) -> bool {
        !matches!(self, CliError::Reported(_))
    }
}

impl From<ConfigError> for CliError {
    fn from(e: ConfigError) -> Self {
        CliError::Core(CoreError::Config(e))
    }
}

impl From<TransportError> for CliError {
    fn from(e: TransportError) -> Self {
        CliError::Core(CoreError::Transport(e))
    }
}

/// Result type for CLI operations
pub type Result<T> = std::result::Result<T, CliError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes() {
        assert_eq!(
            CliError::from(ConfigError::NoConnectionCategory).exit_code(),
            exit_codes::INVALID_ARGS
        );
        assert_eq!(
            CliError::from(TransportError::NoDriver("FT1.2 serial port 0".into())).exit_code(),
            exit_codes::NETWORK_ERROR
        );
        assert_eq!(
            CliError::Reported(CoreError::SessionClosed).exit_code(),
            exit_codes::DEVICE_ERROR
        );
    }

    #[test]
    fn test_reported_errors_are_not_printed_twice() {
        assert!(!CliError::Reported(CoreError::SessionClosed).needs_report());
        assert!(CliError::from(ConfigError::NoEndpoint).needs_report());
        assert_eq!(
            CliError::from(ConfigError::NoEndpoint).to_string(),
            "Configuration error: no host or serial port specified"
        );
    }
}
