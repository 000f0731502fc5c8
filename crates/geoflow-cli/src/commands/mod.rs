//! Command implementations

mod config;
mod describe;
mod run;
mod tools;

use crate::cli::{Cli, Commands};
use crate::output::OutputWriter;
use anyhow::{Context, Result};
use geoflow_core::config::{CliConfigOverrides, LayeredConfig};
use std::path::{Path, PathBuf};

/// Looked up in the working directory when `--config` is not given
const DEFAULT_CONFIG_FILE: &str = "geoflow.toml";

/// Execute a CLI command
pub async fn execute(cli: Cli) -> Result<()> {
    let output = OutputWriter::new(cli.json);

    let mut overrides = CliConfigOverrides {
        user_tier: cli.tier,
        ..Default::default()
    };
    if let Commands::Run(args) = &cli.command {
        overrides.progress_interval_ms = args.progress_interval_ms;
        overrides.job_timeout_secs = args.timeout_secs;
    }
    let config = load_config(cli.config.as_deref(), overrides)?;

    match cli.command {
        Commands::Tools(args) => tools::execute(args, &config, &output),
        Commands::Describe(args) => describe::execute(args, &config, &output),
        Commands::Run(args) => run::execute(args, &config, &output).await,
        Commands::Config => config::execute(&config, &output),
    }
}

/// Resolve configuration: defaults < file < environment < CLI
fn load_config(path: Option<&Path>, overrides: CliConfigOverrides) -> Result<LayeredConfig> {
    let mut config = LayeredConfig::with_defaults();

    let file = match path {
        Some(path) => Some(path.to_path_buf()),
        None => Some(PathBuf::from(DEFAULT_CONFIG_FILE)).filter(|p| p.is_file()),
    };
    if let Some(file) = file {
        config = config
            .load_from_file(&file)
            .with_context(|| format!("Failed to load configuration from {}", file.display()))?;
    }

    let mut config = config.load_from_env();
    config.update_from_cli(overrides);
    config.validate()?;

    tracing::debug!(tier = %config.user_tier.value, "Configuration resolved");
    Ok(config)
}
