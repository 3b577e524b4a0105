use image::RgbaImage;
use raw_window_handle::{HasDisplayHandle, HasWindowHandle};
use tracing::{debug, trace};
use wgpu::util::{DeviceExt, TextureDataOrder};

use crate::backend::{RenderBackend, RenderRequest};
use crate::error::{InitError, RenderError};
use crate::types::{Dimensions, RendererState};

use super::context::{DrawSurface, GpuContext, GpuOptions, OFFSCREEN_FORMAT};
use super::pipeline::{ShaderProgram, QUAD_VERTEX_COUNT};
use super::readback;
use super::uniforms::{uniform_plan, UniformBlock, UniformTable, UniformUpdate, UniformValue};

/// The one live source texture and the bind group that samples it.
struct SourceTexture {
    _texture: wgpu::Texture,
    bind_group: wgpu::BindGroup,
    size: Dimensions,
}

/// Owns the GPU context, the linked tone program, the bound source image and
/// the uniform staging block.
///
/// Construction is all-or-nothing: any failure returns an [`InitError`] and
/// the caller builds a fresh instance on a fresh surface. A renderer starts
/// [`RendererState::Idle`] and becomes `Ready` on the first successful
/// [`set_image`](Self::set_image); it never goes back.
pub struct RendererCore {
    context: GpuContext,
    surface: DrawSurface,
    program: ShaderProgram,
    uniforms: UniformBlock,
    source: Option<SourceTexture>,
    state: RendererState,
}

impl RendererCore {
    /// Renders into an owned offscreen texture that can be read back.
    pub fn headless(options: &GpuOptions) -> Result<Self, InitError> {
        let (context, surface) = GpuContext::headless(options)?;
        Self::from_parts(context, surface)
    }

    /// Renders into a window swapchain, presenting after every draw.
    ///
    /// `target` must outlive the renderer.
    pub fn with_window<T>(
        target: &T,
        size: Dimensions,
        options: &GpuOptions,
    ) -> Result<Self, InitError>
    where
        T: HasDisplayHandle + HasWindowHandle,
    {
        let (context, surface) = GpuContext::windowed(target, size, options)?;
        Self::from_parts(context, surface)
    }

    fn from_parts(context: GpuContext, surface: DrawSurface) -> Result<Self, InitError> {
        let program = ShaderProgram::new(&context.device, surface.format())?;
        let uniforms = UniformBlock::new(program.uniforms.clone());
        debug!(
            uniforms = uniforms.table().len(),
            format = ?surface.format(),
            "renderer ready for an image"
        );
        Ok(Self {
            context,
            surface,
            program,
            uniforms,
            source: None,
            state: RendererState::Idle,
        })
    }

    pub fn state(&self) -> RendererState {
        self.state
    }

    pub fn uniforms(&self) -> &UniformTable {
        self.uniforms.table()
    }

    pub fn surface_size(&self) -> Dimensions {
        self.surface.size()
    }

    pub fn source_size(&self) -> Option<Dimensions> {
        self.source.as_ref().map(|source| source.size)
    }

    pub fn max_texture_dimension(&self) -> u32 {
        self.context.max_texture_dimension
    }

    /// Uploads `image` as the source texture (clamp-to-edge, linear
    /// filtering) and drops the previous one.
    pub fn set_image(&mut self, image: &RgbaImage) -> Result<(), RenderError> {
        let size = Dimensions::new(image.width(), image.height());
        if size.is_empty() {
            return Err(RenderError::EmptyImage { size });
        }
        let limit = self.context.max_texture_dimension;
        if size.width > limit || size.height > limit {
            return Err(RenderError::ImageTooLarge { size, limit });
        }

        let texture = self.context.device.create_texture_with_data(
            &self.context.queue,
            &wgpu::TextureDescriptor {
                label: Some("source image"),
                size: wgpu::Extent3d {
                    width: size.width,
                    height: size.height,
                    depth_or_array_layers: 1,
                },
                mip_level_count: 1,
                sample_count: 1,
                dimension: wgpu::TextureDimension::D2,
                format: OFFSCREEN_FORMAT,
                usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
                view_formats: &[],
            },
            TextureDataOrder::LayerMajor,
            image.as_raw(),
        );
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let bind_group = self.program.source_bind_group(&self.context.device, &view);

        let replaced = self.source.replace(SourceTexture {
            _texture: texture,
            bind_group,
            size,
        });
        self.state = RendererState::Ready;
        debug!(
            width = size.width,
            height = size.height,
            replaced = replaced.is_some(),
            "bound source image"
        );
        Ok(())
    }

    /// Stages a single uniform for the next draw.
    pub fn set_uniform(&mut self, name: &str, value: UniformValue) -> UniformUpdate {
        self.uniforms.set(name, value)
    }

    /// Draws the bound image once into a surface of `request.render` pixels.
    pub fn render(&mut self, request: &RenderRequest) -> Result<(), RenderError> {
        self.state.ensure_ready()?;
        let Some(source) = self.source.as_ref() else {
            return Err(RenderError::NotReady);
        };
        let limit = self.context.max_texture_dimension;
        if request.render.width > limit || request.render.height > limit {
            return Err(RenderError::SurfaceTooLarge {
                size: request.render,
                limit,
            });
        }

        self.surface.resize(&self.context.device, request.render);
        for (name, value) in uniform_plan(request.source, &request.transform, &request.adjustments)
        {
            self.uniforms.set(name, value);
        }
        self.context
            .queue
            .write_buffer(&self.program.params_buffer, 0, self.uniforms.bytes());

        let frame = self.surface.acquire(&self.context.device)?;
        let mut encoder =
            self.context
                .device
                .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                    label: Some("tone encoder"),
                });
        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("tone pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: frame.view(),
                    depth_slice: None,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color::TRANSPARENT),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                occlusion_query_set: None,
                timestamp_writes: None,
            });
            pass.set_pipeline(&self.program.pipeline);
            pass.set_bind_group(0, &self.program.params_bind_group, &[]);
            pass.set_bind_group(1, &source.bind_group, &[]);
            pass.set_vertex_buffer(0, self.program.quad_buffer.slice(..));
            pass.draw(0..QUAD_VERTEX_COUNT, 0..1);
        }
        self.context.queue.submit(std::iter::once(encoder.finish()));
        frame.present();

        trace!(
            source = %request.source,
            render = %request.render,
            "drew frame"
        );
        Ok(())
    }

    /// Synchronously reads back the last draw. Only offscreen renderers
    /// support this.
    pub fn read_pixels(&self) -> Result<RgbaImage, RenderError> {
        let target = self
            .surface
            .offscreen()
            .ok_or(RenderError::ReadbackUnsupported)?;
        readback::read_offscreen(&self.context.device, &self.context.queue, target)
    }
}

impl RenderBackend for RendererCore {
    fn state(&self) -> RendererState {
        RendererCore::state(self)
    }

    fn set_image(&mut self, image: &RgbaImage) -> Result<(), RenderError> {
        RendererCore::set_image(self, image)
    }

    fn render(&mut self, request: &RenderRequest) -> Result<(), RenderError> {
        RendererCore::render(self, request)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{AdjustmentKind, AdjustmentParameters, TransformParameters};

    fn headless() -> Option<RendererCore> {
        match RendererCore::headless(&GpuOptions::default()) {
            Ok(renderer) => Some(renderer),
            Err(err) => {
                eprintln!("skipping GPU test: {err}");
                None
            }
        }
    }

    fn checker() -> RgbaImage {
        RgbaImage::from_fn(4, 4, |x, y| {
            if (x + y) % 2 == 0 {
                image::Rgba([200, 40, 90, 255])
            } else {
                image::Rgba([30, 160, 220, 255])
            }
        })
    }

    fn request(size: Dimensions, adjustments: AdjustmentParameters) -> RenderRequest {
        RenderRequest {
            source: size,
            render: size,
            transform: TransformParameters::identity(),
            adjustments,
        }
    }

    #[test]
    fn render_requires_an_image() {
        let Some(mut renderer) = headless() else {
            return;
        };
        assert_eq!(renderer.state(), RendererState::Idle);
        let err = renderer
            .render(&request(Dimensions::new(4, 4), AdjustmentParameters::identity()))
            .unwrap_err();
        assert!(matches!(err, RenderError::NotReady));
    }

    #[test]
    fn empty_images_are_rejected() {
        let Some(mut renderer) = headless() else {
            return;
        };
        let err = renderer.set_image(&RgbaImage::new(0, 3)).unwrap_err();
        assert!(matches!(err, RenderError::EmptyImage { .. }));
        assert_eq!(renderer.state(), RendererState::Idle);
    }

    #[test]
    fn identity_adjustments_reproduce_the_source() {
        let Some(mut renderer) = headless() else {
            return;
        };
        let image = checker();
        renderer.set_image(&image).unwrap();
        assert_eq!(renderer.state(), RendererState::Ready);

        renderer
            .render(&request(Dimensions::new(4, 4), AdjustmentParameters::identity()))
            .unwrap();
        let pixels = renderer.read_pixels().unwrap();

        assert_eq!(pixels.dimensions(), (4, 4));
        for (out, expected) in pixels.pixels().zip(image.pixels()) {
            for channel in 0..4 {
                let delta = i16::from(out.0[channel]) - i16::from(expected.0[channel]);
                assert!(delta.abs() <= 2, "{out:?} vs {expected:?}");
            }
        }
    }

    #[test]
    fn surface_follows_render_dimensions() {
        let Some(mut renderer) = headless() else {
            return;
        };
        renderer.set_image(&checker()).unwrap();
        let request = RenderRequest {
            render: Dimensions::new(2, 2),
            ..request(Dimensions::new(4, 4), AdjustmentParameters::identity())
        };
        renderer.render(&request).unwrap();
        assert_eq!(renderer.surface_size(), Dimensions::new(2, 2));
        assert_eq!(renderer.read_pixels().unwrap().dimensions(), (2, 2));
    }

    #[test]
    fn brightness_lifts_every_channel() {
        let Some(mut renderer) = headless() else {
            return;
        };
        let image = RgbaImage::from_pixel(2, 2, image::Rgba([64, 64, 64, 255]));
        renderer.set_image(&image).unwrap();
        let brighter = AdjustmentParameters::identity().with(AdjustmentKind::Brightness, 0.25);
        renderer
            .render(&request(Dimensions::new(2, 2), brighter))
            .unwrap();
        let pixels = renderer.read_pixels().unwrap();
        for pixel in pixels.pixels() {
            assert!(pixel.0[0] > 100, "{pixel:?}");
            assert!(pixel.0[1] > 100, "{pixel:?}");
            assert!(pixel.0[2] > 100, "{pixel:?}");
        }
    }

    #[test]
    fn rebinding_keeps_the_renderer_ready() {
        let Some(mut renderer) = headless() else {
            return;
        };
        renderer.set_image(&checker()).unwrap();
        renderer
            .set_image(&RgbaImage::from_pixel(3, 2, image::Rgba([1, 2, 3, 255])))
            .unwrap();
        assert_eq!(renderer.state(), RendererState::Ready);
        assert_eq!(renderer.source_size(), Some(Dimensions::new(3, 2)));
    }

    #[test]
    fn oversized_images_are_rejected() {
        let Some(mut renderer) = headless() else {
            return;
        };
        let limit = renderer.max_texture_dimension();
        let err = renderer
            .set_image(&RgbaImage::new(limit + 1, 1))
            .unwrap_err();
        assert!(matches!(err, RenderError::ImageTooLarge { limit: l, .. } if l == limit));
        assert_eq!(renderer.state(), RendererState::Idle);
    }

    #[test]
    fn oversized_render_surfaces_are_rejected() {
        let Some(mut renderer) = headless() else {
            return;
        };
        let limit = renderer.max_texture_dimension();
        let source = Dimensions::new(limit / 2 + 8, 4);
        renderer
            .set_image(&RgbaImage::new(source.width, source.height))
            .unwrap();
        let transform = TransformParameters {
            dx: 2.0,
            ..TransformParameters::identity()
        };
        let plan = crate::planner::plan_export(source, &transform).unwrap();
        assert!(plan.render.width > limit);

        let err = renderer
            .render(&RenderRequest {
                source,
                render: plan.render,
                transform,
                adjustments: AdjustmentParameters::identity(),
            })
            .unwrap_err();
        assert!(matches!(err, RenderError::SurfaceTooLarge { .. }));
        assert_ne!(renderer.surface_size(), plan.render);
    }

    #[test]
    fn unknown_uniforms_are_reported_not_fatal() {
        let Some(mut renderer) = headless() else {
            return;
        };
        assert_eq!(
            renderer.set_uniform("vignette", UniformValue::Scalar(1.0)),
            UniformUpdate::Unknown
        );
        assert_eq!(
            renderer.set_uniform("translation", UniformValue::Scalar(1.0)),
            UniformUpdate::Mismatch
        );
        assert_eq!(
            renderer.set_uniform("contrast", UniformValue::Scalar(0.3)),
            UniformUpdate::Applied
        );
    }
}
