// Failure categories of a bootstrap run.

use std::io;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use influxboot_common::auth_list::ListingError;
use influxboot_common::credentials::RecordError;

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error("failed to start daemon `{binary}`: {source}")]
    DaemonStart { binary: String, source: io::Error },

    #[error("daemon was not ready after {}ms; last ping error: {last_error}", waited.as_millis())]
    ReadinessTimeout { waited: Duration, last_error: String },

    #[error("bootstrap cancelled")]
    Cancelled,

    #[error("failed to read credentials file `{}`: {source}", path.display())]
    CredentialsUnreadable { path: PathBuf, source: io::Error },

    #[error("credentials file `{}` is invalid: {source}", path.display())]
    Credentials { path: PathBuf, source: RecordError },

    #[error("`influx setup` failed ({status}): {stderr}")]
    Setup { status: String, stderr: String },

    #[error("instance has already been set up and on_already_initialized = \"fail\"")]
    AlreadyInitialized,

    #[error("failed to run `{command}`: {source}")]
    CliInvocation { command: String, source: io::Error },

    #[error("`{command}` did not finish within {}s", after.as_secs())]
    CliTimeout { command: String, after: Duration },

    #[error("`{command}` failed ({status}): {stderr}")]
    CommandFailed { command: String, status: String, stderr: String },

    #[error("token listing could not be parsed: {0}")]
    Listing(#[from] ListingError),

    #[error("no token found for user `{user}` in `influx auth list` output")]
    TokenNotFound { user: String },

    #[error("{context}: {source}")]
    Io { context: String, source: io::Error },
}

impl BootstrapError {
    pub fn io(context: impl Into<String>, source: io::Error) -> Self {
        Self::Io { context: context.into(), source }
    }

    /// Stable machine-readable code for JSON error output.
    pub fn code(&self) -> &'static str {
        match self {
            Self::DaemonStart { .. } => "DAEMON_START_FAILED",
            Self::ReadinessTimeout { .. } => "DAEMON_NOT_READY",
            Self::Cancelled => "CANCELLED",
            Self::CredentialsUnreadable { .. } | Self::Credentials { .. } => "CREDENTIALS_INVALID",
            Self::Setup { .. } => "SETUP_FAILED",
            Self::AlreadyInitialized => "ALREADY_INITIALIZED",
            Self::CliInvocation { .. } | Self::CliTimeout { .. } | Self::CommandFailed { .. } => {
                "INFLUX_CLI_ERROR"
            }
            Self::Listing(_) | Self::TokenNotFound { .. } => "TOKEN_NOT_FOUND",
            Self::Io { .. } => "IO_ERROR",
        }
    }

    /// Actionable follow-up printed alongside the error, if any.
    pub fn hint(&self) -> Option<String> {
        match self {
            Self::DaemonStart { binary, .. } => {
                Some(format!("Is `{binary}` installed and on PATH? Set [daemon] binary in the config."))
            }
            Self::ReadinessTimeout { .. } => Some(
                "Check the daemon log (influxd.log by default) or raise [readiness] timeout_secs."
                    .to_string(),
            ),
            Self::Credentials { .. } => {
                Some("Fill in user, password, org, bucket and retention as `name = \"value\"`.".to_string())
            }
            Self::AlreadyInitialized => Some(
                "Set on_already_initialized = \"skip\" to reuse an initialized instance.".to_string(),
            ),
            Self::TokenNotFound { user } => {
                Some(format!("Run `influx auth list` and check that a token exists for `{user}`."))
            }
            _ => None,
        }
    }
}
