// CLI subcommand dispatch.

use std::future::Future;

use anyhow::Context;
use clap::Subcommand;

use crate::config::{BootstrapConfig, ConfigOverrides};
use crate::output::OutputFormat;

pub mod env;
pub mod run;
pub mod status;

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Start the daemon, run setup and store the issued token (default)
    Run(run::RunArgs),
    /// Print shell exports for the credentials file values
    Env(env::EnvArgs),
    /// Check credentials, daemon and bootstrap state
    Status(status::StatusArgs),
}

impl Default for Command {
    fn default() -> Self {
        Self::Run(run::RunArgs::default())
    }
}

impl Command {
    /// Format used for this command's output, including errors.
    pub fn output_format(&self) -> OutputFormat {
        match self {
            Self::Run(args) => OutputFormat::detect(args.json),
            Self::Env(args) => env::output_format(args),
            Self::Status(args) => OutputFormat::detect(args.json),
        }
    }
}

pub fn run(cmd: Command, overrides: &ConfigOverrides) -> anyhow::Result<()> {
    let config = BootstrapConfig::resolve(overrides)?;
    match cmd {
        Command::Run(args) => run::run(args, &config),
        Command::Env(args) => env::run(args, &config),
        Command::Status(args) => status::run(args, &config),
    }
}

/// Drive `future` to completion on a fresh current-thread runtime.
pub(crate) fn block_on<F: Future>(future: F) -> anyhow::Result<F::Output> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to build tokio runtime")?;
    Ok(runtime.block_on(future))
}
