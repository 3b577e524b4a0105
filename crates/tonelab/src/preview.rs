use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use renderer::{plan_preview, Dimensions, RendererCore};
use scheduler::{EditorSession, SessionError};
use tracing::{debug, error, info, warn};
use winit::dpi::{LogicalSize, PhysicalSize};
use winit::event::{ElementState, Event, WindowEvent};
use winit::event_loop::{ControlFlow, EventLoop};
use winit::keyboard::{Key, NamedKey};
use winit::window::WindowBuilder;

use crate::cli::PreviewArgs;
use crate::controls::{AdjustmentControls, ControlKey};
use crate::export::load_image;
use crate::settings;

pub fn run_preview(args: &PreviewArgs) -> Result<()> {
    let mut config = settings::resolve(&args.edit)?;
    if let Some(size) = args.size {
        config.preview.width = size.width;
        config.preview.height = size.height;
    }
    if let Some(ratio) = args.pixel_ratio {
        config.preview.pixel_ratio = Some(ratio);
    }
    config.validate().context("invalid preview settings")?;

    let image = load_image(&args.input)?;
    let source = Dimensions::new(image.width(), image.height());

    let event_loop =
        EventLoop::new().map_err(|err| anyhow!("failed to create event loop: {err}"))?;
    let window = WindowBuilder::new()
        .with_title(format!("tonelab - {}", args.input.display()))
        .with_inner_size(LogicalSize::new(config.preview.width, config.preview.height))
        .build(&event_loop)
        .map_err(|err| anyhow!("failed to create preview window: {err}"))?;
    let window = Arc::new(window);

    let session_config = settings::session_config(&config, window.scale_factor() as f32);
    let initial = plan_preview(
        source,
        &config.transform,
        session_config.preview_surface,
        session_config.pixel_ratio,
    )
    .context("failed to size the preview")?;
    let _ = window.request_inner_size(logical(initial.canvas));

    let renderer = RendererCore::with_window(
        window.as_ref(),
        initial.render,
        &settings::gpu_options(&config),
    )
    .context("failed to initialise window renderer")?;

    let requester = {
        let window = Arc::clone(&window);
        move || window.request_redraw()
    };
    let mut session = EditorSession::with_store(
        renderer,
        requester,
        session_config,
        settings::store(&config),
    );
    session
        .set_image(&image)
        .with_context(|| format!("failed to upload {}", args.input.display()))?;

    info!(
        "preview ready: 1-9/0 or Tab select an adjustment, arrows nudge it, R resets, Esc quits"
    );

    let mut controls = AdjustmentControls::default();
    let mut result = Ok(());
    event_loop
        .run(|event, elwt| {
            elwt.set_control_flow(ControlFlow::Wait);
            let Event::WindowEvent { window_id, event } = event else {
                return;
            };
            if window_id != window.id() {
                return;
            }
            match event {
                WindowEvent::CloseRequested | WindowEvent::Destroyed => elwt.exit(),
                WindowEvent::KeyboardInput { event, .. }
                    if event.state == ElementState::Pressed =>
                {
                    if matches!(event.logical_key, Key::Named(NamedKey::Escape)) {
                        elwt.exit();
                        return;
                    }
                    let Some(key) = control_key(&event.logical_key) else {
                        return;
                    };
                    if let Some(adjustments) = controls.handle(key, session.adjustments()) {
                        session.set_adjustments(adjustments);
                    }
                }
                WindowEvent::Resized(size) => {
                    let surface = logical_dimensions(size, window.scale_factor());
                    let current = session.config();
                    if surface != current.preview_surface && !surface.is_empty() {
                        debug!(surface = %surface, "preview area resized");
                        let ratio = current.pixel_ratio;
                        session.set_preview_surface(surface, ratio);
                    }
                }
                WindowEvent::ScaleFactorChanged { scale_factor, .. } => {
                    if args.pixel_ratio.is_none() && config.preview.pixel_ratio.is_none() {
                        let surface = session.config().preview_surface;
                        session.set_preview_surface(surface, scale_factor as f32);
                    }
                }
                WindowEvent::RedrawRequested => match session.on_frame() {
                    Ok(Some(plan)) => {
                        let size = logical_dimensions(window.inner_size(), window.scale_factor());
                        if size != plan.canvas {
                            let _ = window.request_inner_size(logical(plan.canvas));
                        }
                    }
                    Ok(None) => {}
                    Err(SessionError::Render(err)) if err.is_transient() => {
                        warn!(error = %err, "surface unavailable; retrying next frame");
                        session.invalidate();
                    }
                    Err(err) => {
                        error!(error = %err, "failed to draw preview");
                        result = Err(err.into());
                        elwt.exit();
                    }
                },
                _ => {}
            }
        })
        .map_err(|err| anyhow!("window event loop error: {err}"))?;

    result
}

fn control_key(key: &Key) -> Option<ControlKey> {
    match key {
        Key::Named(NamedKey::ArrowUp | NamedKey::ArrowRight) => Some(ControlKey::Increase),
        Key::Named(NamedKey::ArrowDown | NamedKey::ArrowLeft) => Some(ControlKey::Decrease),
        Key::Named(NamedKey::Tab) => Some(ControlKey::Next),
        Key::Character(text) => match text.as_str() {
            "r" | "R" => Some(ControlKey::Reset),
            other => other
                .parse::<u8>()
                .ok()
                .filter(|digit| *digit <= 9)
                .map(ControlKey::Digit),
        },
        _ => None,
    }
}

fn logical(size: Dimensions) -> LogicalSize<u32> {
    LogicalSize::new(size.width, size.height)
}

fn logical_dimensions(size: PhysicalSize<u32>, scale_factor: f64) -> Dimensions {
    let logical: LogicalSize<u32> = size.to_logical(scale_factor);
    Dimensions::new(logical.width, logical.height)
}
