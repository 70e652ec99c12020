// `influxboot env`: shell exports for `eval "$(influxboot env)"`.

use clap::Args;
use serde_json::{Map, Value};

use influxboot_common::env::{bootstrap_vars, render_exports, EnvVar};

use crate::config::BootstrapConfig;
use crate::credentials_file;
use crate::output::{self, OutputFormat};

#[derive(Debug, Args)]
pub struct EnvArgs {
    /// Print a JSON object instead of export lines.
    #[arg(long)]
    pub json: bool,
}

/// Exports are usually captured by `$(...)`, so a pipe alone does not switch to JSON.
pub fn output_format(args: &EnvArgs) -> OutputFormat {
    if args.json {
        OutputFormat::Json
    } else {
        OutputFormat::Human
    }
}

pub fn run(args: EnvArgs, config: &BootstrapConfig) -> anyhow::Result<()> {
    let settings = credentials_file::load_settings(&config.credentials_file)?;
    let credentials = config.credentials_file.display().to_string();
    let vars = bootstrap_vars(&credentials, &settings);

    output::print_output(output_format(&args), &vars_object(&vars), |_| {
        render_exports(&vars).trim_end().to_string()
    })?;
    Ok(())
}

fn vars_object(vars: &[EnvVar]) -> Map<String, Value> {
    vars.iter().map(|var| (var.name.to_string(), Value::from(var.value.as_str()))).collect()
}
