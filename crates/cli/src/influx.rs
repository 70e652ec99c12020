// Adapter over the `influx` command-line client.

use std::ffi::OsString;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use tokio::process::Command;
use tokio::time::timeout;
use tracing::debug;

use influxboot_common::types::BootstrapSettings;

use crate::config::BootstrapConfig;
use crate::error::BootstrapError;

/// Captured result of one `influx` invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    pub success: bool,
    pub status: String,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn ok(stdout: impl Into<String>) -> Self {
        Self {
            success: true,
            status: "exit status: 0".into(),
            stdout: stdout.into(),
            stderr: String::new(),
        }
    }

    pub fn failed(status: impl Into<String>, stderr: impl Into<String>) -> Self {
        Self {
            success: false,
            status: status.into(),
            stdout: String::new(),
            stderr: stderr.into(),
        }
    }
}

/// The three `influx` operations the bootstrap needs.
pub trait InfluxCli {
    /// Succeeds once the daemon answers its health endpoint.
    async fn ping(&self) -> Result<(), BootstrapError>;

    /// `influx setup ... --force`. A non-zero exit is returned as output, not
    /// as an error, so the caller can classify it.
    async fn setup(&self, settings: &BootstrapSettings) -> Result<CommandOutput, BootstrapError>;

    async fn auth_list(&self) -> Result<CommandOutput, BootstrapError>;
}

#[derive(Debug, Clone)]
pub struct ProcessInfluxCli {
    binary: PathBuf,
    host: String,
    timeout: Duration,
}

impl ProcessInfluxCli {
    pub fn new(binary: impl Into<PathBuf>, host: impl Into<String>) -> Self {
        Self { binary: binary.into(), host: host.into(), timeout: Duration::from_secs(30) }
    }

    pub fn from_config(config: &BootstrapConfig) -> Self {
        Self::new(&config.cli.binary, &config.host).with_timeout(config.cli.timeout())
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    async fn run(&self, label: &str, args: Vec<OsString>) -> Result<CommandOutput, BootstrapError> {
        let command_name = format!("{} {label}", self.binary.display());
        debug!(command = %command_name, "invoking influx cli");

        let mut command = Command::new(&self.binary);
        command
            .args(args)
            .arg("--host")
            .arg(&self.host)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let output = timeout(self.timeout, command.output())
            .await
            .map_err(|_| BootstrapError::CliTimeout {
                command: command_name.clone(),
                after: self.timeout,
            })?
            .map_err(|source| BootstrapError::CliInvocation { command: command_name, source })?;

        Ok(CommandOutput {
            success: output.status.success(),
            status: output.status.to_string(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        })
    }
}

impl InfluxCli for ProcessInfluxCli {
    async fn ping(&self) -> Result<(), BootstrapError> {
        let output = self.run("ping", vec!["ping".into()]).await?;
        if output.success {
            Ok(())
        } else {
            Err(BootstrapError::CommandFailed {
                command: "influx ping".into(),
                status: output.status,
                stderr: output.stderr,
            })
        }
    }

    async fn setup(&self, settings: &BootstrapSettings) -> Result<CommandOutput, BootstrapError> {
        self.run("setup", setup_args(settings)).await
    }

    async fn auth_list(&self) -> Result<CommandOutput, BootstrapError> {
        self.run("auth list", auth_list_args()).await
    }
}

pub fn setup_args(settings: &BootstrapSettings) -> Vec<OsString> {
    [
        "setup",
        "--username",
        settings.user.as_str(),
        "--password",
        settings.password.as_str(),
        "--org",
        settings.org.as_str(),
        "--bucket",
        settings.bucket.as_str(),
        "--retention",
        settings.retention.as_str(),
        "--force",
    ]
    .into_iter()
    .map(OsString::from)
    .collect()
}

/// Table output from CLI builds without `--json` is still accepted by
/// `TokenListing::parse`.
pub fn auth_list_args() -> Vec<OsString> {
    ["auth", "list", "--json"].into_iter().map(OsString::from).collect()
}

/// Whether a failed `influx setup` means the instance was initialized earlier.
pub fn is_already_set_up(stderr: &str) -> bool {
    let lower = stderr.to_ascii_lowercase();
    lower.contains("already been set up") || lower.contains("already set up")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings() -> BootstrapSettings {
        BootstrapSettings {
            user: "rctrl".into(),
            password: "pw".into(),
            org: "o".into(),
            bucket: "b".into(),
            retention: "30d".into(),
            token: "PLACEHOLDER".into(),
        }
    }

    #[test]
    fn setup_args_pass_all_values_and_force() {
        let args: Vec<String> =
            setup_args(&settings()).into_iter().map(|a| a.into_string().unwrap()).collect();
        assert_eq!(
            args,
            vec![
                "setup", "--username", "rctrl", "--password", "pw", "--org", "o", "--bucket", "b",
                "--retention", "30d", "--force",
            ]
        );
    }

    #[test]
    fn classifies_already_set_up_errors() {
        assert!(is_already_set_up(
            "Error: instance at \"http://localhost:8086\" has already been set up"
        ));
        assert!(is_already_set_up("onboarding: instance already set up"));
        assert!(!is_already_set_up("Error: failed to connect: connection refused"));
    }

    #[tokio::test]
    async fn missing_binary_is_an_invocation_error() {
        let tmp = tempfile::tempdir().unwrap();
        let cli = ProcessInfluxCli::new(tmp.path().join("no-such-influx"), "http://localhost:8086");

        let error = cli.ping().await.unwrap_err();
        assert!(matches!(error, BootstrapError::CliInvocation { .. }), "{error:?}");
        assert!(error.to_string().contains("ping"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn non_zero_exit_is_returned_as_output() {
        // `false` ignores its arguments and exits 1.
        let cli = ProcessInfluxCli::new("false", "http://localhost:8086");
        let output = cli.auth_list().await.unwrap();
        assert!(!output.success);

        let error = cli.ping().await.unwrap_err();
        assert!(matches!(error, BootstrapError::CommandFailed { .. }));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn auth_list_requests_json_output() {
        let cli = ProcessInfluxCli::new("echo", "http://localhost:8086");
        let output = cli.auth_list().await.unwrap();
        assert!(output.success);
        assert_eq!(output.stdout, "auth list --json --host http://localhost:8086\n");
    }
}
