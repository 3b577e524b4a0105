//! Surface sizing for preview and export draws.
//!
//! Preview draws are rendered at the resolution the screen can actually show
//! (`canvas * pixel_ratio`) instead of the full source resolution, which keeps
//! GPU work bounded for large photos. Export reuses the same arithmetic with
//! the canvas scale pinned to `1`, so the render surface equals the output.

use serde::Serialize;

use crate::types::{Dimensions, TransformParameters};

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DimensionPlan {
    /// Full-resolution size of the cropped result.
    pub output: Dimensions,
    /// Size of the GPU surface that is drawn into.
    pub render: Dimensions,
    /// Display size of the preview in logical pixels.
    pub canvas: Dimensions,
    pub canvas_scale_factor: f64,
    pub subsampling_ratio: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, thiserror::Error)]
pub enum PlanError {
    #[error("source image has no pixels")]
    EmptySource,
    #[error("preview surface {0} has no area")]
    EmptyPreviewSurface(Dimensions),
    #[error("pixel ratio must be a positive finite number (got {0})")]
    InvalidPixelRatio(f32),
    #[error("crop scale must be positive and finite (got {dx}, {dy})")]
    InvalidScale { dx: f32, dy: f32 },
}

/// Sizes an interactive preview draw for a surface of `preview_surface`
/// logical pixels at `pixel_ratio` device pixels per logical pixel.
pub fn plan_preview(
    source: Dimensions,
    transform: &TransformParameters,
    preview_surface: Dimensions,
    pixel_ratio: f32,
) -> Result<DimensionPlan, PlanError> {
    if preview_surface.is_empty() {
        return Err(PlanError::EmptyPreviewSurface(preview_surface));
    }
    if !pixel_ratio.is_finite() || pixel_ratio <= 0.0 {
        return Err(PlanError::InvalidPixelRatio(pixel_ratio));
    }
    let output = output_dimensions(source, transform)?;
    let height_ratio = f64::from(preview_surface.height) / f64::from(output.height);
    let width_ratio = f64::from(preview_surface.width) / f64::from(output.width);
    let canvas_scale_factor = 1.0_f64.min(height_ratio).min(width_ratio);
    let plan = build_plan(
        source,
        transform,
        output,
        canvas_scale_factor,
        f64::from(pixel_ratio),
    );
    tracing::debug!(
        output = %plan.output,
        render = %plan.render,
        canvas = %plan.canvas,
        scale = plan.canvas_scale_factor,
        subsampling = plan.subsampling_ratio,
        "planned preview surface"
    );
    Ok(plan)
}

/// Sizes a full-resolution export draw: no subsampling, `render == output`.
pub fn plan_export(
    source: Dimensions,
    transform: &TransformParameters,
) -> Result<DimensionPlan, PlanError> {
    let output = output_dimensions(source, transform)?;
    Ok(build_plan(source, transform, output, 1.0, 1.0))
}

fn output_dimensions(
    source: Dimensions,
    transform: &TransformParameters,
) -> Result<Dimensions, PlanError> {
    if source.is_empty() {
        return Err(PlanError::EmptySource);
    }
    let (dx, dy) = (transform.dx, transform.dy);
    if !(dx.is_finite() && dy.is_finite()) || dx <= 0.0 || dy <= 0.0 {
        return Err(PlanError::InvalidScale { dx, dy });
    }
    Ok(Dimensions::new(
        round_extent(f64::from(source.width) * f64::from(dx)),
        round_extent(f64::from(source.height) * f64::from(dy)),
    ))
}

fn build_plan(
    source: Dimensions,
    transform: &TransformParameters,
    output: Dimensions,
    canvas_scale_factor: f64,
    pixel_ratio: f64,
) -> DimensionPlan {
    let subsampling_ratio = 1.0 / canvas_scale_factor / pixel_ratio;
    let scaled_width = f64::from(source.width) * f64::from(transform.dx);
    let scaled_height = f64::from(source.height) * f64::from(transform.dy);
    DimensionPlan {
        output,
        render: Dimensions::new(
            round_extent(scaled_width / subsampling_ratio),
            round_extent(scaled_height / subsampling_ratio),
        ),
        canvas: Dimensions::new(
            round_extent(f64::from(output.width) * canvas_scale_factor),
            round_extent(f64::from(output.height) * canvas_scale_factor),
        ),
        canvas_scale_factor,
        subsampling_ratio,
    }
}

fn round_extent(value: f64) -> u32 {
    value.round().clamp(1.0, f64::from(u32::MAX)) as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scaled(dx: f32, dy: f32) -> TransformParameters {
        TransformParameters {
            dx,
            dy,
            ..TransformParameters::identity()
        }
    }

    #[test]
    fn large_source_is_subsampled_for_preview() {
        let plan = plan_preview(
            Dimensions::new(4000, 3000),
            &TransformParameters::identity(),
            Dimensions::new(480, 360),
            2.0,
        )
        .unwrap();

        assert_eq!(plan.output, Dimensions::new(4000, 3000));
        assert!((plan.canvas_scale_factor - 0.12).abs() < 1e-9);
        assert!((plan.subsampling_ratio - 4.166_666).abs() < 1e-3);
        assert_eq!(plan.render, Dimensions::new(960, 720));
        assert_eq!(plan.canvas, Dimensions::new(480, 360));
    }

    #[test]
    fn small_source_is_never_upscaled() {
        let plan = plan_preview(
            Dimensions::new(200, 100),
            &TransformParameters::identity(),
            Dimensions::new(1280, 800),
            1.0,
        )
        .unwrap();

        assert_eq!(plan.canvas_scale_factor, 1.0);
        assert_eq!(plan.canvas, plan.output);
        assert_eq!(plan.render, plan.output);
    }

    #[test]
    fn canvas_scale_never_exceeds_one() {
        let sizes = [1, 3, 17, 480, 1080, 4096, 12000];
        for &sw in &sizes {
            for &sh in &sizes {
                for &pw in &sizes {
                    let plan = plan_preview(
                        Dimensions::new(sw, sh),
                        &scaled(0.5, 0.75),
                        Dimensions::new(pw, 360),
                        1.5,
                    )
                    .unwrap();
                    assert!(plan.canvas_scale_factor <= 1.0);
                    assert!(plan.canvas_scale_factor > 0.0);
                }
            }
        }
    }

    #[test]
    fn planning_is_deterministic() {
        let transform = scaled(0.8, 0.6);
        let first = plan_preview(
            Dimensions::new(6000, 4000),
            &transform,
            Dimensions::new(1024, 768),
            1.25,
        );
        let second = plan_preview(
            Dimensions::new(6000, 4000),
            &transform,
            Dimensions::new(1024, 768),
            1.25,
        );
        assert_eq!(first, second);
    }

    #[test]
    fn crop_scale_shrinks_output() {
        let plan = plan_export(Dimensions::new(4000, 3000), &scaled(0.5, 0.25)).unwrap();
        assert_eq!(plan.output, Dimensions::new(2000, 750));
    }

    #[test]
    fn export_renders_at_output_size() {
        let transform = scaled(0.9, 0.7);
        let plan = plan_export(Dimensions::new(5472, 3648), &transform).unwrap();

        assert_eq!(plan.canvas_scale_factor, 1.0);
        assert_eq!(plan.subsampling_ratio, 1.0);
        assert_eq!(plan.render, plan.output);
        assert_eq!(plan.canvas, plan.output);
    }

    #[test]
    fn rejects_degenerate_inputs() {
        let identity = TransformParameters::identity();
        assert_eq!(
            plan_preview(Dimensions::new(0, 10), &identity, Dimensions::new(10, 10), 1.0),
            Err(PlanError::EmptySource)
        );
        assert!(matches!(
            plan_preview(Dimensions::new(10, 10), &identity, Dimensions::new(0, 10), 1.0),
            Err(PlanError::EmptyPreviewSurface(_))
        ));
        assert!(matches!(
            plan_preview(Dimensions::new(10, 10), &identity, Dimensions::new(10, 10), 0.0),
            Err(PlanError::InvalidPixelRatio(_))
        ));
        assert!(matches!(
            plan_export(Dimensions::new(10, 10), &scaled(f32::NAN, 1.0)),
            Err(PlanError::InvalidScale { .. })
        ));
    }

    #[test]
    fn tiny_outputs_round_to_at_least_one_pixel() {
        let plan = plan_preview(
            Dimensions::new(10_000, 1),
            &TransformParameters::identity(),
            Dimensions::new(100, 100),
            1.0,
        )
        .unwrap();
        assert!(plan.canvas.height >= 1);
        assert!(plan.render.height >= 1);
    }
}
