use anyhow::Result;
use tracing_subscriber::EnvFilter;

use crate::cli::{Cli, Command, ConfigAction};
use crate::{export, inspect, preview};

pub fn run(cli: Cli) -> Result<()> {
    initialise_tracing();

    match cli.command {
        Command::Export(args) => export::run_export(&args),
        Command::Preview(args) => preview::run_preview(&args),
        Command::Plan(args) => inspect::run_plan(&args),
        Command::Uniforms => inspect::run_uniforms(),
        Command::Config(config) => match config.action {
            ConfigAction::Check { file } => inspect::check_config(&file),
            ConfigAction::Show { file } => inspect::show_config(file.as_deref()),
        },
    }
}

/// Logs go to stderr so the JSON printed by `plan` and `uniforms` stays clean.
fn initialise_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}
