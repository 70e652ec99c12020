// Consistent exit codes for the influxboot CLI.
//
//   0   = success
//   1   = general error
//   2   = usage/config file error
//   10  = daemon failed to start
//   11  = daemon not ready before the deadline
//   12  = credentials file error
//   13  = setup failed / instance already initialized
//   14  = no token found for the user
//   130 = cancelled (Ctrl-C)

use std::process;

use crate::config::ConfigError;
use crate::error::BootstrapError;

/// Named exit codes for the CLI.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ExitCode {
    Success = 0,
    Error = 1,
    Usage = 2,
    DaemonStart = 10,
    NotReady = 11,
    Credentials = 12,
    Setup = 13,
    TokenNotFound = 14,
    Cancelled = 130,
}

impl ExitCode {
    pub fn code(self) -> i32 {
        self as i32
    }

    /// The byte handed to the OS as the process status.
    pub fn status_byte(self) -> u8 {
        u8::try_from(self.code()).unwrap_or(1)
    }

    /// Map an anyhow error to an exit code by inspecting the error chain.
    pub fn from_error(err: &anyhow::Error) -> Self {
        for cause in err.chain() {
            if let Some(bootstrap_err) = cause.downcast_ref::<BootstrapError>() {
                return Self::from_bootstrap_error(bootstrap_err);
            }
            if cause.downcast_ref::<ConfigError>().is_some() {
                return Self::Usage;
            }
        }
        Self::Error
    }

    pub fn from_bootstrap_error(err: &BootstrapError) -> Self {
        match err {
            BootstrapError::DaemonStart { .. } => Self::DaemonStart,
            BootstrapError::ReadinessTimeout { .. } => Self::NotReady,
            BootstrapError::Cancelled => Self::Cancelled,
            BootstrapError::CredentialsUnreadable { .. } | BootstrapError::Credentials { .. } => {
                Self::Credentials
            }
            BootstrapError::Setup { .. } | BootstrapError::AlreadyInitialized => Self::Setup,
            BootstrapError::Listing(_) | BootstrapError::TokenNotFound { .. } => {
                Self::TokenNotFound
            }
            BootstrapError::CliInvocation { .. }
            | BootstrapError::CliTimeout { .. }
            | BootstrapError::CommandFailed { .. }
            | BootstrapError::Io { .. } => Self::Error,
        }
    }
}

impl From<ExitCode> for process::ExitCode {
    fn from(code: ExitCode) -> Self {
        process::ExitCode::from(code.status_byte())
    }
}
