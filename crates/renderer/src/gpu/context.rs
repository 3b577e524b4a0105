use raw_window_handle::{HasDisplayHandle, HasWindowHandle};

use crate::error::{InitError, RenderError};
use crate::types::Dimensions;

/// Colour format of offscreen drawing surfaces and the source texture.
pub(crate) const OFFSCREEN_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GpuPowerPreference {
    Low,
    #[default]
    High,
}

#[derive(Debug, Clone)]
pub struct GpuOptions {
    pub power: GpuPowerPreference,
    pub label: String,
}

impl Default for GpuOptions {
    fn default() -> Self {
        Self {
            power: GpuPowerPreference::default(),
            label: "tonelab device".to_string(),
        }
    }
}

pub(crate) struct GpuContext {
    pub _instance: wgpu::Instance,
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
    pub max_texture_dimension: u32,
}

impl GpuContext {
    fn new(
        instance: wgpu::Instance,
        compatible_surface: Option<&wgpu::Surface<'static>>,
        options: &GpuOptions,
    ) -> Result<(Self, wgpu::Adapter), InitError> {
        let power_preference = match options.power {
            GpuPowerPreference::Low => wgpu::PowerPreference::LowPower,
            GpuPowerPreference::High => wgpu::PowerPreference::HighPerformance,
        };
        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference,
            compatible_surface,
            force_fallback_adapter: false,
        }))
        .map_err(|err| InitError::Context(format!("no suitable GPU adapter: {err}")))?;

        let info = adapter.get_info();
        let limits = adapter.limits();
        tracing::debug!(
            name = %info.name,
            backend = ?info.backend,
            device_type = ?info.device_type,
            max_texture_dimension = limits.max_texture_dimension_2d,
            "selected GPU adapter"
        );

        let (device, queue) = pollster::block_on(adapter.request_device(&wgpu::DeviceDescriptor {
            label: Some(options.label.as_str()),
            required_features: wgpu::Features::empty(),
            required_limits: limits.clone(),
            memory_hints: wgpu::MemoryHints::MemoryUsage,
            trace: wgpu::Trace::default(),
        }))
        .map_err(|err| InitError::Context(format!("failed to create GPU device: {err}")))?;

        let context = Self {
            _instance: instance,
            device,
            queue,
            max_texture_dimension: limits.max_texture_dimension_2d,
        };
        Ok((context, adapter))
    }

    fn instance() -> wgpu::Instance {
        wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            flags: wgpu::InstanceFlags::default(),
            memory_budget_thresholds: wgpu::MemoryBudgetThresholds::default(),
            backend_options: wgpu::BackendOptions::default(),
        })
    }

    pub(crate) fn headless(options: &GpuOptions) -> Result<(Self, DrawSurface), InitError> {
        let (context, _) = Self::new(Self::instance(), None, options)?;
        let surface = DrawSurface::Offscreen(OffscreenTarget::new(
            &context.device,
            Dimensions::new(1, 1),
        ));
        Ok((context, surface))
    }

    pub(crate) fn windowed<T>(
        target: &T,
        initial_size: Dimensions,
        options: &GpuOptions,
    ) -> Result<(Self, DrawSurface), InitError>
    where
        T: HasDisplayHandle + HasWindowHandle,
    {
        let instance = Self::instance();
        let window_handle = target
            .window_handle()
            .map_err(|err| InitError::Context(format!("failed to acquire window handle: {err}")))?;
        let display_handle = target
            .display_handle()
            .map_err(|err| InitError::Context(format!("failed to acquire display handle: {err}")))?;

        // The caller keeps the window alive for as long as the renderer.
        let surface = unsafe {
            instance.create_surface_unsafe(wgpu::SurfaceTargetUnsafe::RawHandle {
                raw_display_handle: display_handle.as_raw(),
                raw_window_handle: window_handle.as_raw(),
            })
        }
        .map_err(|err| InitError::Context(format!("failed to create rendering surface: {err}")))?;

        let (context, adapter) = Self::new(instance, Some(&surface), options)?;
        let adapter_caps = surface.get_capabilities(&adapter);

        let format = adapter_caps
            .formats
            .iter()
            .copied()
            .find(|format| !format.is_srgb())
            .or_else(|| adapter_caps.formats.first().copied())
            .ok_or_else(|| InitError::Context("surface reports no texture formats".into()))?;
        if format.is_srgb() {
            tracing::warn!(
                ?format,
                "no non-sRGB surface format available; preview colours will be re-encoded"
            );
        }
        let present_mode = adapter_caps
            .present_modes
            .iter()
            .copied()
            .find(|mode| *mode == wgpu::PresentMode::Fifo)
            .or_else(|| adapter_caps.present_modes.first().copied())
            .unwrap_or(wgpu::PresentMode::Fifo);
        let alpha_mode = adapter_caps
            .alpha_modes
            .first()
            .copied()
            .unwrap_or(wgpu::CompositeAlphaMode::Auto);

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format,
            width: initial_size.width.max(1),
            height: initial_size.height.max(1),
            present_mode,
            alpha_mode,
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&context.device, &config);
        tracing::debug!(?format, ?present_mode, size = %initial_size, "configured window surface");

        Ok((context, DrawSurface::Window { surface, config }))
    }
}

/// Owned render target used for headless draws and export readback.
pub(crate) struct OffscreenTarget {
    pub texture: wgpu::Texture,
    pub view: wgpu::TextureView,
    pub size: Dimensions,
}

impl OffscreenTarget {
    fn new(device: &wgpu::Device, size: Dimensions) -> Self {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("offscreen drawing surface"),
            size: wgpu::Extent3d {
                width: size.width.max(1),
                height: size.height.max(1),
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: OFFSCREEN_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::COPY_SRC,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        Self {
            texture,
            view,
            size,
        }
    }
}

/// Where draws land: an owned texture or a window swapchain.
pub(crate) enum DrawSurface {
    Offscreen(OffscreenTarget),
    Window {
        surface: wgpu::Surface<'static>,
        config: wgpu::SurfaceConfiguration,
    },
}

/// A target acquired for one draw.
pub(crate) enum DrawFrame<'a> {
    Offscreen(&'a wgpu::TextureView),
    Window {
        frame: wgpu::SurfaceTexture,
        view: wgpu::TextureView,
    },
}

impl DrawFrame<'_> {
    pub fn view(&self) -> &wgpu::TextureView {
        match self {
            DrawFrame::Offscreen(view) => view,
            DrawFrame::Window { view, .. } => view,
        }
    }

    pub fn present(self) {
        if let DrawFrame::Window { frame, .. } = self {
            frame.present();
        }
    }
}

impl DrawSurface {
    pub fn format(&self) -> wgpu::TextureFormat {
        match self {
            DrawSurface::Offscreen(_) => OFFSCREEN_FORMAT,
            DrawSurface::Window { config, .. } => config.format,
        }
    }

    pub fn size(&self) -> Dimensions {
        match self {
            DrawSurface::Offscreen(target) => target.size,
            DrawSurface::Window { config, .. } => Dimensions::new(config.width, config.height),
        }
    }

    /// Resizes the surface, recreating resources only when the size changes.
    pub fn resize(&mut self, device: &wgpu::Device, size: Dimensions) {
        if size.is_empty() || size == self.size() {
            return;
        }
        match self {
            DrawSurface::Offscreen(target) => *target = OffscreenTarget::new(device, size),
            DrawSurface::Window { surface, config } => {
                config.width = size.width;
                config.height = size.height;
                surface.configure(device, config);
            }
        }
        tracing::debug!(size = %size, "resized drawing surface");
    }

    pub fn acquire(&mut self, device: &wgpu::Device) -> Result<DrawFrame<'_>, RenderError> {
        match self {
            DrawSurface::Offscreen(target) => Ok(DrawFrame::Offscreen(&target.view)),
            DrawSurface::Window { surface, config } => match surface.get_current_texture() {
                Ok(frame) => {
                    let view = frame
                        .texture
                        .create_view(&wgpu::TextureViewDescriptor::default());
                    Ok(DrawFrame::Window { frame, view })
                }
                Err(err @ (wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated)) => {
                    tracing::warn!(error = %err, "surface lost; reconfiguring for the next frame");
                    surface.configure(device, config);
                    Err(RenderError::Surface(err))
                }
                Err(err) => Err(RenderError::Surface(err)),
            },
        }
    }

    pub fn offscreen(&self) -> Option<&OffscreenTarget> {
        match self {
            DrawSurface::Offscreen(target) => Some(target),
            DrawSurface::Window { .. } => None,
        }
    }
}
