use std::path::Path;

use anyhow::{Context, Result};
use renderer::{
    plan_export, plan_preview, reflect_program, DimensionPlan, TransformParameters, UniformTable,
};
use serde::Serialize;
use toneconfig::ToneConfig;
use tracing::info;

use crate::cli::PlanArgs;

pub fn run_plan(args: &PlanArgs) -> Result<()> {
    let plan = plan_for(args)?;
    println!("{}", serde_json::to_string_pretty(&plan)?);
    Ok(())
}

fn plan_for(args: &PlanArgs) -> Result<DimensionPlan> {
    let transform = TransformParameters {
        dx: args.dx,
        dy: args.dy,
        ..TransformParameters::identity()
    };
    let plan = if args.export {
        plan_export(args.source, &transform)
    } else {
        plan_preview(args.source, &transform, args.preview, args.pixel_ratio)
    };
    plan.with_context(|| format!("cannot plan surfaces for a {} source", args.source))
}

#[derive(Debug, Serialize)]
struct UniformListing {
    block_size: u32,
    uniforms: Vec<UniformEntry>,
}

#[derive(Debug, Serialize)]
struct UniformEntry {
    name: String,
    #[serde(rename = "type")]
    ty: String,
    offset: u32,
}

impl From<&UniformTable> for UniformListing {
    fn from(table: &UniformTable) -> Self {
        let mut uniforms: Vec<_> = table
            .iter()
            .map(|descriptor| UniformEntry {
                name: descriptor.name.clone(),
                ty: descriptor.ty.to_string(),
                offset: descriptor.handle.offset,
            })
            .collect();
        uniforms.sort_by_key(|entry| entry.offset);
        Self {
            block_size: table.block_size(),
            uniforms,
        }
    }
}

pub fn run_uniforms() -> Result<()> {
    let table = reflect_program().context("failed to reflect the shader program")?;
    let listing = UniformListing::from(&table);
    println!("{}", serde_json::to_string_pretty(&listing)?);
    Ok(())
}

pub fn check_config(path: &Path) -> Result<()> {
    let config = ToneConfig::from_path(path)
        .with_context(|| format!("failed to load config {}", path.display()))?;
    config
        .validate()
        .with_context(|| format!("invalid config {}", path.display()))?;
    let changed = renderer::AdjustmentKind::ALL
        .iter()
        .filter(|kind| config.adjustments.get(**kind) != 0.0)
        .count();
    info!(
        path = %path.display(),
        preview = %config.preview.surface(),
        adjustments = changed,
        "configuration is valid"
    );
    Ok(())
}

pub fn show_config(path: Option<&Path>) -> Result<()> {
    let config = match path {
        Some(path) => ToneConfig::from_path(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => ToneConfig::default(),
    };
    print!("{}", toml::to_string_pretty(&config)?);
    Ok(())
}
