use crate::compile::ShaderStageKind;
use crate::types::Dimensions;

/// Failures while building a renderer. None of these are recoverable: the
/// caller discards the instance and starts over on a fresh surface.
#[derive(Debug, thiserror::Error)]
pub enum InitError {
    #[error("failed to acquire GPU context: {0}")]
    Context(String),
    #[error("failed to compile {stage} shader:\n{message}")]
    Compile {
        stage: ShaderStageKind,
        message: String,
    },
    #[error("failed to link shader program: {0}")]
    Link(String),
}

#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("renderer is not initialised; bind an image before rendering")]
    NotReady,
    #[error("image of {size} is empty")]
    EmptyImage { size: Dimensions },
    #[error("image of {size} exceeds the GPU texture limit of {limit}px")]
    ImageTooLarge { size: Dimensions, limit: u32 },
    #[error("render surface of {size} exceeds the GPU texture limit of {limit}px")]
    SurfaceTooLarge { size: Dimensions, limit: u32 },
    #[error("surface error: {0}")]
    Surface(#[from] wgpu::SurfaceError),
    #[error("readback is only available for offscreen surfaces")]
    ReadbackUnsupported,
    #[error("failed to read back the drawing surface: {0}")]
    Readback(String),
}

impl RenderError {
    /// Surface hiccups a later frame can recover from.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            RenderError::Surface(
                wgpu::SurfaceError::Lost
                    | wgpu::SurfaceError::Outdated
                    | wgpu::SurfaceError::Timeout
                    | wgpu::SurfaceError::Other
            )
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_surface_hiccups_are_transient() {
        assert!(RenderError::Surface(wgpu::SurfaceError::Outdated).is_transient());
        assert!(RenderError::Surface(wgpu::SurfaceError::Lost).is_transient());
        assert!(!RenderError::Surface(wgpu::SurfaceError::OutOfMemory).is_transient());
        assert!(!RenderError::NotReady.is_transient());
    }
}
