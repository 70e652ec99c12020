// The bootstrap sequence: start daemon, wait, read credentials, setup, find
// token, store token, retire installer. Each step runs only if the previous
// one succeeded.

use std::future::Future;
use std::path::PathBuf;

use serde::Serialize;
use tracing::{info, warn};

use influxboot_common::auth_list::TokenListing;
use influxboot_common::types::BootstrapSettings;

use crate::config::{AlreadyInitializedPolicy, BootstrapConfig};
use crate::credentials_file::{self, RewriteOutcome};
use crate::daemon_launcher::{self, DaemonLauncher, DaemonStart};
use crate::error::BootstrapError;
use crate::influx::{self, InfluxCli};
use crate::marker::{self, BootstrapMarker};

#[derive(Debug, Clone, Copy, Default)]
pub struct RunOptions {
    /// Run even if the run-once marker exists.
    pub force: bool,
    /// Do not launch the daemon; only wait for an externally started one.
    pub skip_daemon: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Completed,
    AlreadyBootstrapped,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SetupOutcome {
    Completed,
    AlreadySetUp,
}

/// What a run did, step by step. Steps that did not run are `None`.
#[derive(Debug, Clone, Serialize)]
pub struct BootstrapReport {
    pub status: RunStatus,
    pub credentials_file: PathBuf,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub daemon: Option<DaemonStart>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ready_after_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub setup: Option<SetupOutcome>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rewrite: Option<RewriteOutcome>,
    pub marker: PathBuf,
    pub installer_removed: bool,
}

impl BootstrapReport {
    fn new(config: &BootstrapConfig, status: RunStatus) -> Self {
        Self {
            status,
            credentials_file: config.credentials_file.clone(),
            user: None,
            daemon: None,
            ready_after_ms: None,
            setup: None,
            token: None,
            rewrite: None,
            marker: config.marker_path(),
            installer_removed: false,
        }
    }
}

pub struct Sequencer<'a, C, L> {
    config: &'a BootstrapConfig,
    cli: C,
    launcher: L,
    options: RunOptions,
}

impl<'a, C, L> Sequencer<'a, C, L>
where
    C: InfluxCli,
    L: DaemonLauncher,
{
    pub fn new(config: &'a BootstrapConfig, cli: C, launcher: L, options: RunOptions) -> Self {
        Self { config, cli, launcher, options }
    }

    /// Run the whole sequence. `cancel` aborts the readiness wait when it resolves.
    pub async fn run<F>(&self, cancel: F) -> Result<BootstrapReport, BootstrapError>
    where
        F: Future<Output = ()>,
    {
        let config = self.config;

        if !self.options.force {
            let existing = marker::read_marker(&config.state_dir)
                .map_err(|source| BootstrapError::io("failed to read bootstrap marker", source))?;
            if let Some(existing) = existing {
                info!(
                    completed_at = %existing.completed_at,
                    marker = %config.marker_path().display(),
                    "already bootstrapped; pass --force to run again"
                );
                let mut report = BootstrapReport::new(config, RunStatus::AlreadyBootstrapped);
                report.user = Some(existing.user);
                return Ok(report);
            }
        }

        let mut report = BootstrapReport::new(config, RunStatus::Completed);

        // 1. start daemon
        let daemon = if self.options.skip_daemon {
            DaemonStart::NotLaunched
        } else {
            daemon_launcher::ensure_daemon_running(&self.cli, &self.launcher).await?
        };
        report.daemon = Some(daemon);

        // 2. wait for readiness
        let waited =
            daemon_launcher::wait_until_ready(&self.cli, &config.readiness, cancel).await?;
        report.ready_after_ms = Some(u64::try_from(waited.as_millis()).unwrap_or(u64::MAX));

        // 3. load configuration values
        let settings = credentials_file::load_settings(&config.credentials_file)?;
        info!(
            user = %settings.user,
            org = %settings.org,
            bucket = %settings.bucket,
            "loaded credentials"
        );
        report.user = Some(settings.user.clone());

        // 4. run setup
        report.setup = Some(self.setup(&settings).await?);

        // 5. discover issued token
        let token = self.discover_token(&settings.user).await?;

        // 6. persist token
        let rewrite =
            credentials_file::rewrite_token(&config.credentials_file, &settings.token, &token)?;
        report.token = Some(token);
        report.rewrite = Some(rewrite);

        // 7. retire installer
        marker::write_marker(
            &config.state_dir,
            &BootstrapMarker::now(&settings.user, &config.credentials_file),
        )
        .map_err(|source| BootstrapError::io("failed to write bootstrap marker", source))?;
        if let Some(script) = &config.installer_script {
            report.installer_removed = marker::remove_installer_script(script).map_err(|source| {
                BootstrapError::io(
                    format!("failed to remove installer script `{}`", script.display()),
                    source,
                )
            })?;
        }

        info!("bootstrap complete");
        Ok(report)
    }

    async fn setup(&self, settings: &BootstrapSettings) -> Result<SetupOutcome, BootstrapError> {
        let output = self.cli.setup(settings).await?;
        if output.success {
            info!(org = %settings.org, bucket = %settings.bucket, "influx setup complete");
            return Ok(SetupOutcome::Completed);
        }

        if !influx::is_already_set_up(&output.stderr) {
            return Err(BootstrapError::Setup { status: output.status, stderr: output.stderr });
        }

        match self.config.on_already_initialized {
            AlreadyInitializedPolicy::Skip => {
                warn!("instance was already set up; continuing with existing setup");
                Ok(SetupOutcome::AlreadySetUp)
            }
            AlreadyInitializedPolicy::Fail => Err(BootstrapError::AlreadyInitialized),
        }
    }

    async fn discover_token(&self, user: &str) -> Result<String, BootstrapError> {
        let output = self.cli.auth_list().await?;
        if !output.success {
            return Err(BootstrapError::CommandFailed {
                command: "influx auth list".into(),
                status: output.status,
                stderr: output.stderr,
            });
        }

        let listing = TokenListing::parse(&output.stdout)?;
        let mut matches = listing.tokens_for_user(user);
        let token = matches
            .next()
            .ok_or_else(|| BootstrapError::TokenNotFound { user: user.to_string() })?
            .to_string();

        let extra = matches.count();
        if extra > 0 {
            warn!(user, extra, "several tokens issued to user; using the first listed");
        }
        Ok(token)
    }
}

/// Shorten a token for human display.
pub fn redact_token(token: &str) -> String {
    let prefix: String = token.chars().take(6).collect();
    if prefix.len() == token.len() {
        "*".repeat(token.chars().count())
    } else {
        format!("{prefix}…")
    }
}
