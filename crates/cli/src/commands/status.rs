// `influxboot status`: read-only bootstrap diagnostics.

use std::io::IsTerminal;

use clap::Args;
use serde::Serialize;

use influxboot_common::types::BootstrapSettings;

use crate::config::BootstrapConfig;
use crate::credentials_file;
use crate::influx::{InfluxCli, ProcessInfluxCli};
use crate::marker;
use crate::output::{self, OutputFormat};
use crate::sequencer::redact_token;

const ANSI_GREEN: &str = "\x1b[32m";
const ANSI_YELLOW: &str = "\x1b[33m";
const ANSI_RED: &str = "\x1b[31m";
const ANSI_RESET: &str = "\x1b[0m";

#[derive(Debug, Args)]
pub struct StatusArgs {
    /// Force JSON output.
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
enum CheckStatus {
    Pass,
    Warning,
    Fail,
}

#[derive(Debug, Clone, Serialize)]
pub struct StatusCheck {
    name: String,
    status: CheckStatus,
    detail: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    hint: Option<String>,
}

impl StatusCheck {
    fn pass(name: &str, detail: impl Into<String>) -> Self {
        Self { name: name.to_string(), status: CheckStatus::Pass, detail: detail.into(), hint: None }
    }

    fn warning(name: &str, detail: impl Into<String>, hint: impl Into<String>) -> Self {
        Self {
            name: name.to_string(),
            status: CheckStatus::Warning,
            detail: detail.into(),
            hint: Some(hint.into()),
        }
    }

    fn fail(name: &str, detail: impl Into<String>, hint: Option<String>) -> Self {
        Self { name: name.to_string(), status: CheckStatus::Fail, detail: detail.into(), hint }
    }
}

pub fn run(args: StatusArgs, config: &BootstrapConfig) -> anyhow::Result<()> {
    let format = OutputFormat::detect(args.json);
    let cli = ProcessInfluxCli::from_config(config);
    let checks = super::block_on(collect_checks(config, &cli))?;

    output::print_output(format, &checks, |items| format_human(items))?;
    if checks.iter().any(|check| check.status == CheckStatus::Fail) {
        anyhow::bail!("status checks failed");
    }
    Ok(())
}

async fn collect_checks<C: InfluxCli>(config: &BootstrapConfig, cli: &C) -> Vec<StatusCheck> {
    let mut checks = Vec::new();

    let settings = match credentials_file::load_settings(&config.credentials_file) {
        Ok(settings) => {
            checks.push(StatusCheck::pass(
                "credentials",
                format!(
                    "`{}` has user `{}`, org `{}`, bucket `{}`",
                    config.credentials_file.display(),
                    settings.user,
                    settings.org,
                    settings.bucket
                ),
            ));
            Some(settings)
        }
        Err(error) => {
            checks.push(StatusCheck::fail("credentials", error.to_string(), error.hint()));
            None
        }
    };

    if let Some(settings) = &settings {
        checks.push(check_token(settings));
    }

    checks.push(match cli.ping().await {
        Ok(()) => StatusCheck::pass("daemon", format!("answering at {}", config.host)),
        Err(error) => StatusCheck::fail(
            "daemon",
            error.to_string(),
            Some(format!(
                "Start it with `influxboot run`, or check {}.",
                config.daemon.log_file.display()
            )),
        ),
    });

    checks.push(match marker::read_marker(&config.state_dir) {
        Ok(Some(existing)) => StatusCheck::pass(
            "bootstrap",
            format!("completed at {} for user `{}`", existing.completed_at, existing.user),
        ),
        Ok(None) => StatusCheck::warning(
            "bootstrap",
            format!("no marker at `{}`", config.marker_path().display()),
            "Run `influxboot run`.",
        ),
        Err(error) => StatusCheck::fail(
            "bootstrap",
            format!("marker at `{}` is unreadable: {error}", config.marker_path().display()),
            Some("Remove the marker file and run `influxboot run --force`.".to_string()),
        ),
    });

    checks
}

fn check_token(settings: &BootstrapSettings) -> StatusCheck {
    if settings.has_placeholder_token() {
        StatusCheck::warning(
            "token",
            "token is still a placeholder",
            "Run `influxboot run` to store the issued token.",
        )
    } else {
        StatusCheck::pass("token", format!("token set ({})", redact_token(&settings.token)))
    }
}

fn format_human(checks: &[StatusCheck]) -> String {
    let use_color = std::io::stdout().is_terminal();
    let mut lines = Vec::new();

    for check in checks {
        let (symbol, color) = match check.status {
            CheckStatus::Pass => ("✓", ANSI_GREEN),
            CheckStatus::Warning => ("⚠", ANSI_YELLOW),
            CheckStatus::Fail => ("✗", ANSI_RED),
        };
        let rendered_symbol =
            if use_color { format!("{color}{symbol}{ANSI_RESET}") } else { symbol.to_string() };
        lines.push(format!("{rendered_symbol} {}: {}", check.name, check.detail));
        if let Some(hint) = &check.hint {
            lines.push(format!("  hint: {hint}"));
        }
    }

    let passed = checks.iter().filter(|check| check.status == CheckStatus::Pass).count();
    let warnings = checks.iter().filter(|check| check.status == CheckStatus::Warning).count();
    let failed = checks.iter().filter(|check| check.status == CheckStatus::Fail).count();
    lines.push(String::new());
    lines.push(format!("Summary: {passed} passed, {warnings} warning(s), {failed} failed"));
    lines.join("\n")
}
