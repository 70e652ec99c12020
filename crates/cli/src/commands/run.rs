// `influxboot run`: the bootstrap sequence.

use anyhow::Context;
use clap::Args;

use crate::config::BootstrapConfig;
use crate::credentials_file::RewriteOutcome;
use crate::daemon_launcher::{self, DaemonStart, ProcessLauncher};
use crate::influx::ProcessInfluxCli;
use crate::output::{self, OutputFormat};
use crate::sequencer::{
    redact_token, BootstrapReport, RunOptions, RunStatus, Sequencer, SetupOutcome,
};

#[derive(Debug, Default, Args)]
pub struct RunArgs {
    /// Run even if a previous bootstrap completed.
    #[arg(long)]
    pub force: bool,

    /// Do not launch the daemon; only wait for it to become ready.
    #[arg(long)]
    pub no_daemon: bool,

    /// Force JSON output.
    #[arg(long)]
    pub json: bool,
}

pub fn run(args: RunArgs, config: &BootstrapConfig) -> anyhow::Result<()> {
    let format = OutputFormat::detect(args.json);
    let options = RunOptions { force: args.force, skip_daemon: args.no_daemon };
    let sequencer = Sequencer::new(
        config,
        ProcessInfluxCli::from_config(config),
        ProcessLauncher::from_config(&config.daemon),
        options,
    );

    let mut report = super::block_on(sequencer.run(daemon_launcher::ctrl_c()))?
        .context("bootstrap failed")?;
    report.token = report.token.as_deref().map(redact_token);

    output::print_output(format, &report, format_human)?;
    Ok(())
}

fn format_human(report: &BootstrapReport) -> String {
    let mut lines = Vec::new();

    if report.status == RunStatus::AlreadyBootstrapped {
        lines.push(format!("Already bootstrapped (marker: {}).", report.marker.display()));
        lines.push("Run with --force to bootstrap again.".to_string());
        return lines.join("\n");
    }

    match &report.daemon {
        Some(DaemonStart::AlreadyRunning) => lines.push("daemon: already running".to_string()),
        Some(DaemonStart::Spawned { pid, log_file }) => {
            lines.push(format!("daemon: started (pid {pid}, log {})", log_file.display()))
        }
        Some(DaemonStart::NotLaunched) => lines.push("daemon: not launched".to_string()),
        None => {}
    }
    if let Some(ms) = report.ready_after_ms {
        lines.push(format!("ready: after {ms}ms"));
    }
    match report.setup {
        Some(SetupOutcome::Completed) => lines.push("setup: completed".to_string()),
        Some(SetupOutcome::AlreadySetUp) => {
            lines.push("setup: instance was already set up".to_string())
        }
        None => {}
    }
    if let (Some(user), Some(token)) = (&report.user, &report.token) {
        lines.push(format!("token: {token} (user {user})"));
    }

    let credentials = report.credentials_file.display();
    match report.rewrite {
        Some(RewriteOutcome::Rewritten) => {
            lines.push(format!("credentials: token stored in {credentials}"))
        }
        Some(RewriteOutcome::Unchanged) => {
            lines.push(format!("credentials: {credentials} already up to date"))
        }
        Some(RewriteOutcome::SkippedFieldMissing) => {
            lines.push(format!("credentials: {credentials} has no token field; not rewritten"))
        }
        Some(RewriteOutcome::SkippedValueChanged) => lines
            .push(format!("credentials: {credentials} changed during the run; not rewritten")),
        None => {}
    }

    lines.push(format!("marker: {}", report.marker.display()));
    if report.installer_removed {
        lines.push("installer: removed".to_string());
    }
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;

    fn completed_report() -> BootstrapReport {
        BootstrapReport {
            status: RunStatus::Completed,
            credentials_file: PathBuf::from("/home/dev/credentials.toml"),
            user: Some("rctrl".into()),
            daemon: Some(DaemonStart::Spawned { pid: 77, log_file: PathBuf::from("influxd.log") }),
            ready_after_ms: Some(1500),
            setup: Some(SetupOutcome::Completed),
            token: Some("abc…".into()),
            rewrite: Some(RewriteOutcome::Rewritten),
            marker: PathBuf::from("/home/dev/.influxboot/bootstrap.json"),
            installer_removed: true,
        }
    }

    #[test]
    fn format_human_lists_each_step() {
        let rendered = format_human(&completed_report());
        assert!(rendered.contains("daemon: started (pid 77, log influxd.log)"));
        assert!(rendered.contains("ready: after 1500ms"));
        assert!(rendered.contains("setup: completed"));
        assert!(rendered.contains("token: abc… (user rctrl)"));
        assert!(rendered.contains("token stored in /home/dev/credentials.toml"));
        assert!(rendered.contains("installer: removed"));
    }

    #[test]
    fn format_human_already_bootstrapped_points_at_force() {
        let mut report = completed_report();
        report.status = RunStatus::AlreadyBootstrapped;
        let rendered = format_human(&report);
        assert!(rendered.starts_with("Already bootstrapped"));
        assert!(rendered.contains("--force"));
        assert!(!rendered.contains("setup:"));
    }

    #[test]
    fn report_json_uses_snake_case_tags() {
        let value = serde_json::to_value(completed_report()).unwrap();
        assert_eq!(value["status"], "completed");
        assert_eq!(value["daemon"]["status"], "spawned");
        assert_eq!(value["daemon"]["pid"], 77);
        assert_eq!(value["setup"], "completed");
        assert_eq!(value["rewrite"], "rewritten");
    }
}
