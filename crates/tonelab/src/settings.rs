use anyhow::{Context, Result};
use renderer::GpuOptions;
use scheduler::{AdjustmentStore, SessionConfig};
use toneconfig::ToneConfig;
use tracing::debug;

use crate::cli::EditArgs;

/// Loads the configuration named on the command line (or the defaults) and
/// applies `--set` and `--power` on top.
pub fn resolve(args: &EditArgs) -> Result<ToneConfig> {
    let mut config = match args.config.as_deref() {
        Some(path) => {
            let config = ToneConfig::from_path(path)
                .with_context(|| format!("failed to load config {}", path.display()))?;
            debug!(path = %path.display(), "loaded configuration");
            config
        }
        None => ToneConfig::default(),
    };

    for &(kind, value) in &args.set {
        config.adjustments = config.adjustments.with(kind, value);
        debug!(adjustment = %kind, value, "applied command-line override");
    }
    if let Some(power) = args.power {
        config.gpu.power = power;
    }

    Ok(config)
}

pub fn gpu_options(config: &ToneConfig) -> GpuOptions {
    GpuOptions {
        power: config.gpu.power.into(),
        ..GpuOptions::default()
    }
}

pub fn store(config: &ToneConfig) -> AdjustmentStore {
    AdjustmentStore::new(config.adjustments, config.transform)
}

/// Session sizing; `pixel_ratio` is used when neither the command line nor
/// the config file names one.
pub fn session_config(config: &ToneConfig, pixel_ratio: f32) -> SessionConfig {
    SessionConfig {
        preview_surface: config.preview.surface(),
        pixel_ratio: config.preview.pixel_ratio.unwrap_or(pixel_ratio),
        frame_budget: config.preview.frame_budget,
    }
}
