use image::RgbaImage;

use crate::error::RenderError;
use crate::types::{AdjustmentParameters, Dimensions, RendererState, TransformParameters};

/// Everything one draw needs. `render` is the drawing-surface size chosen by
/// the planner; `source` is the bound image's intrinsic size.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderRequest {
    pub source: Dimensions,
    pub render: Dimensions,
    pub transform: TransformParameters,
    pub adjustments: AdjustmentParameters,
}

/// Drawing operations the scheduling layer relies on.
pub trait RenderBackend {
    fn state(&self) -> RendererState;

    /// Binds `image` as the single source texture, replacing any previous one.
    fn set_image(&mut self, image: &RgbaImage) -> Result<(), RenderError>;

    fn render(&mut self, request: &RenderRequest) -> Result<(), RenderError>;
}
