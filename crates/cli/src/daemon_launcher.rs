use std::fs::{self, File};
use std::future::Future;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::time::Duration;

use serde::Serialize;
use tokio::time::{sleep, timeout, Instant};
use tracing::{debug, info};

use crate::config::{DaemonConfig, ReadinessConfig};
use crate::error::BootstrapError;
use crate::influx::InfluxCli;

/// Starts the database daemon in the background.
pub trait DaemonLauncher {
    fn spawn(&self) -> Result<SpawnedDaemon, BootstrapError>;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SpawnedDaemon {
    pub pid: u32,
    pub log_file: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DaemonStart {
    /// The daemon already answered a ping; nothing was launched.
    AlreadyRunning,
    Spawned { pid: u32, log_file: PathBuf },
    /// Launching was disabled for this run.
    NotLaunched,
}

#[derive(Debug, Clone)]
pub struct ProcessLauncher {
    binary: PathBuf,
    args: Vec<String>,
    log_file: PathBuf,
}

impl ProcessLauncher {
    pub fn from_config(config: &DaemonConfig) -> Self {
        Self {
            binary: config.binary.clone(),
            args: config.args.clone(),
            log_file: config.log_file.clone(),
        }
    }
}

impl DaemonLauncher for ProcessLauncher {
    fn spawn(&self) -> Result<SpawnedDaemon, BootstrapError> {
        let daemon_start_error = |source| BootstrapError::DaemonStart {
            binary: self.binary.display().to_string(),
            source,
        };

        let log = open_log_file(&self.log_file).map_err(daemon_start_error)?;
        let log_err = log.try_clone().map_err(daemon_start_error)?;

        let mut command = Command::new(&self.binary);
        command.args(&self.args);
        command.stdin(Stdio::null());
        command.stdout(Stdio::from(log));
        command.stderr(Stdio::from(log_err));

        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt;
            // Own process group so terminal signals aimed at us skip the daemon.
            command.process_group(0);
        }

        // The child is never waited on; it outlives this process.
        let child = command.spawn().map_err(daemon_start_error)?;
        let pid = child.id();
        info!(
            pid,
            binary = %self.binary.display(),
            log_file = %self.log_file.display(),
            "spawned daemon"
        );

        Ok(SpawnedDaemon { pid, log_file: self.log_file.clone() })
    }
}

/// Create or truncate the daemon log, creating its parent directory if needed.
fn open_log_file(path: &Path) -> std::io::Result<File> {
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    File::create(path)
}

/// Launch the daemon unless it already answers a ping.
pub async fn ensure_daemon_running<C, L>(cli: &C, launcher: &L) -> Result<DaemonStart, BootstrapError>
where
    C: InfluxCli,
    L: DaemonLauncher,
{
    match cli.ping().await {
        Ok(()) => {
            info!("daemon already running; not launching another");
            Ok(DaemonStart::AlreadyRunning)
        }
        Err(error) => {
            debug!(error = %error, "daemon not reachable; launching");
            let spawned = launcher.spawn()?;
            Ok(DaemonStart::Spawned { pid: spawned.pid, log_file: spawned.log_file })
        }
    }
}

/// Poll `ping` until it succeeds, the readiness timeout elapses, or `cancel`
/// resolves. Returns how long the daemon took to become ready.
pub async fn wait_until_ready<C, F>(
    cli: &C,
    readiness: &ReadinessConfig,
    cancel: F,
) -> Result<Duration, BootstrapError>
where
    C: InfluxCli,
    F: Future<Output = ()>,
{
    tokio::select! {
        result = poll_until_ready(cli, readiness.timeout(), readiness.poll_interval()) => result,
        () = cancel => {
            info!("readiness wait cancelled");
            Err(BootstrapError::Cancelled)
        }
    }
}

async fn poll_until_ready<C: InfluxCli>(
    cli: &C,
    limit: Duration,
    interval: Duration,
) -> Result<Duration, BootstrapError> {
    let started = Instant::now();
    let deadline = started + limit;
    let mut attempts: u32 = 0;
    let mut last_error = String::from("no ping attempted");

    loop {
        attempts += 1;
        let remaining = deadline.saturating_duration_since(Instant::now());
        match timeout(remaining, cli.ping()).await {
            Ok(Ok(())) => {
                let waited = started.elapsed();
                info!(attempts, waited_ms = waited.as_millis() as u64, "daemon is ready");
                return Ok(waited);
            }
            Ok(Err(error)) => {
                debug!(attempts, error = %error, "daemon not ready yet");
                last_error = error.to_string();
            }
            Err(_) => {
                last_error = "ping did not answer before the readiness deadline".to_string();
            }
        }

        let now = Instant::now();
        if now >= deadline {
            return Err(BootstrapError::ReadinessTimeout { waited: now - started, last_error });
        }
        sleep(interval.min(deadline - now)).await;
    }
}

/// Resolves on Ctrl-C. If the signal handler cannot be installed the wait is
/// simply not cancellable.
pub async fn ctrl_c() {
    if tokio::signal::ctrl_c().await.is_err() {
        std::future::pending::<()>().await;
    }
}
