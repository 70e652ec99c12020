// influxboot CLI entry point.

use std::path::PathBuf;
use std::process;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::config::ConfigOverrides;
use crate::exit_code::ExitCode;

mod commands;
mod config;
mod credentials_file;
mod daemon_launcher;
mod error;
mod exit_code;
mod influx;
mod marker;
mod output;
mod sequencer;

const DEFAULT_LOG_FILTER: &str = "influxboot=info";

#[derive(Parser)]
#[command(
    name = "influxboot",
    version,
    about = "Bootstrap a local InfluxDB instance from a credentials file"
)]
struct Cli {
    /// Bootstrap config TOML (defaults to ~/.influxboot/config.toml).
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Credentials file; overrides the config file and CREDENTIALS_FILE.
    #[arg(long, global = true, value_name = "PATH")]
    credentials: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<commands::Command>,
}

fn main() -> process::ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER)),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let command = cli.command.unwrap_or_default();
    let format = command.output_format();
    let overrides = ConfigOverrides { config_path: cli.config, credentials_file: cli.credentials };

    match commands::run(command, &overrides) {
        Ok(()) => ExitCode::Success.into(),
        Err(error) => {
            output::print_anyhow_error(format, &error);
            ExitCode::from_error(&error).into()
        }
    }
}
