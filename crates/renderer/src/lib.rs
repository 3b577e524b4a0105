//! GPU tone renderer for tonelab.
//!
//! The crate turns a decoded photo plus an adjustment record into pixels:
//!
//! ```text
//!   RgbaImage ──▶ RendererCore::set_image ──▶ source texture
//!                                                   │
//!   (transform, adjustments) ──▶ uniform_plan ──▶ ToneParams block
//!                                                   │
//!   plan_preview / plan_export ──▶ render size ──▶ RendererCore::render ──▶ surface
//! ```
//!
//! Sizing is pure and lives in [`planner`]; scheduling of draws is left to
//! callers through the [`RenderBackend`] seam.

mod backend;
mod compile;
mod error;
mod gpu;
pub mod planner;
mod types;

pub use backend::{RenderBackend, RenderRequest};
pub use compile::{parse_stage, reflect_program, ShaderStageKind};
pub use error::{InitError, RenderError};
pub use gpu::{
    uniform_plan, GpuOptions, GpuPowerPreference, RendererCore, UniformDescriptor, UniformHandle,
    UniformTable, UniformType, UniformUpdate, UniformValue,
};
pub use planner::{plan_export, plan_preview, DimensionPlan, PlanError};
pub use types::{
    AdjustmentKind, AdjustmentParameters, Dimensions, ParseAdjustmentError, ParseDimensionsError,
    RendererState, Rotation, TransformParameters,
};
