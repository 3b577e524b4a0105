use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use renderer::{AdjustmentKind, Dimensions};
use toneconfig::PowerSetting;

#[derive(Parser, Debug)]
#[command(
    name = "tonelab",
    author,
    version,
    about = "GPU tone and colour adjustments for photos"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Render an image at full resolution and write the result.
    Export(ExportArgs),
    /// Open an interactive preview window.
    Preview(PreviewArgs),
    /// Print the preview/export surface sizes for a source image as JSON.
    Plan(PlanArgs),
    /// Print the uniforms the shader program exposes as JSON.
    Uniforms,
    /// Inspect configuration files.
    Config(ConfigCommand),
}

/// Adjustment sources shared by commands that render.
#[derive(Args, Debug, Default)]
pub struct EditArgs {
    /// TOML configuration with `[adjustments]`, `[transform]`, `[preview]` and `[gpu]`.
    #[arg(long, value_name = "FILE", env = "TONELAB_CONFIG")]
    pub config: Option<PathBuf>,

    /// Override one adjustment, e.g. `--set exposure=0.5`. May be repeated.
    #[arg(long = "set", value_name = "NAME=VALUE", value_parser = parse_assignment)]
    pub set: Vec<(AdjustmentKind, f32)>,

    /// GPU power preference: `low` or `high`.
    #[arg(long, value_name = "POWER", value_parser = parse_power)]
    pub power: Option<PowerSetting>,
}

#[derive(Args, Debug)]
pub struct ExportArgs {
    /// Image to read.
    #[arg(value_name = "INPUT")]
    pub input: PathBuf,

    /// Where to write the rendered image; the format follows the extension.
    #[arg(short, long, value_name = "OUTPUT")]
    pub output: PathBuf,

    #[command(flatten)]
    pub edit: EditArgs,
}

#[derive(Args, Debug)]
pub struct PreviewArgs {
    /// Image to open.
    #[arg(value_name = "INPUT")]
    pub input: PathBuf,

    /// Logical size of the preview area (e.g. `1280x800`).
    #[arg(long, value_name = "WIDTHxHEIGHT")]
    pub size: Option<Dimensions>,

    /// Device pixels per logical pixel; defaults to the display scale factor.
    #[arg(long, value_name = "RATIO")]
    pub pixel_ratio: Option<f32>,

    #[command(flatten)]
    pub edit: EditArgs,
}

#[derive(Args, Debug)]
pub struct PlanArgs {
    /// Source image size (e.g. `4000x3000`).
    #[arg(long, value_name = "WIDTHxHEIGHT")]
    pub source: Dimensions,

    /// Logical size of the preview area.
    #[arg(long, value_name = "WIDTHxHEIGHT", default_value = "1280x800")]
    pub preview: Dimensions,

    #[arg(long, value_name = "RATIO", default_value_t = 1.0)]
    pub pixel_ratio: f32,

    /// Horizontal crop scale.
    #[arg(long, value_name = "SCALE", default_value_t = 1.0)]
    pub dx: f32,

    /// Vertical crop scale.
    #[arg(long, value_name = "SCALE", default_value_t = 1.0)]
    pub dy: f32,

    /// Plan a full-resolution export instead of a preview.
    #[arg(long)]
    pub export: bool,
}

#[derive(Args, Debug)]
pub struct ConfigCommand {
    #[command(subcommand)]
    pub action: ConfigAction,
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Validate a configuration file.
    Check {
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },
    /// Print the effective configuration (defaults when no file is given).
    Show {
        #[arg(value_name = "FILE")]
        file: Option<PathBuf>,
    },
}

pub fn parse() -> Cli {
    Cli::parse()
}

pub fn parse_assignment(value: &str) -> Result<(AdjustmentKind, f32), String> {
    let (name, raw) = value
        .split_once('=')
        .ok_or_else(|| format!("expected NAME=VALUE, got '{value}'"))?;
    let kind: AdjustmentKind = name.trim().parse().map_err(|err| format!("{err}"))?;
    let amount: f32 = raw
        .trim()
        .parse()
        .map_err(|_| format!("invalid value '{}' for {kind}", raw.trim()))?;
    if !amount.is_finite() {
        return Err(format!("{kind} must be a finite number"));
    }
    Ok((kind, amount))
}

pub fn parse_power(value: &str) -> Result<PowerSetting, String> {
    match value.trim().to_ascii_lowercase().as_str() {
        "low" | "low-power" | "integrated" => Ok(PowerSetting::Low),
        "high" | "high-performance" | "discrete" => Ok(PowerSetting::High),
        other => Err(format!("unknown power preference '{other}'; expected low or high")),
    }
}
