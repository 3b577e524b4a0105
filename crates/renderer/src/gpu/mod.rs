//! GPU side of the tone renderer.
//!
//! - `context` acquires the adapter/device and owns the drawing surface,
//!   either an offscreen texture or a window swapchain.
//! - `pipeline` links the fixed tone program and builds the resources every
//!   draw binds: parameter buffer, sampler and the full-viewport quad.
//! - `uniforms` reflects the parameter block into a [`UniformTable`] and
//!   mirrors it host-side so each draw uploads the block once.
//! - `readback` copies an offscreen surface back into an image.
//! - `state` glues everything together as [`RendererCore`].

mod context;
mod pipeline;
mod readback;
mod state;
mod uniforms;

pub use context::{GpuOptions, GpuPowerPreference};
pub use state::RendererCore;
pub use uniforms::{
    uniform_plan, UniformDescriptor, UniformHandle, UniformTable, UniformType, UniformUpdate,
    UniformValue,
};
