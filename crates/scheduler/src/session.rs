use std::time::{Duration, Instant};

use image::RgbaImage;
use renderer::{
    plan_export, plan_preview, AdjustmentParameters, Dimensions, DimensionPlan, PlanError,
    RenderBackend, RenderError, RenderRequest, TransformParameters,
};

use crate::{AdjustmentStore, FrameRequester, RenderScheduler};

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("no image has been loaded")]
    NoImage,
    #[error(transparent)]
    Plan(#[from] PlanError),
    #[error(transparent)]
    Render(#[from] RenderError),
}

/// Preview sizing and pacing for a session.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SessionConfig {
    /// Logical size of the area the preview is shown in.
    pub preview_surface: Dimensions,
    pub pixel_ratio: f32,
    /// Draws slower than this are reported.
    pub frame_budget: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            preview_surface: Dimensions::new(1280, 800),
            pixel_ratio: 1.0,
            frame_budget: Duration::from_millis(16),
        }
    }
}

/// One photo being edited: the backend it draws with, its adjustment store
/// and the scheduler that paces preview draws.
pub struct EditorSession<B, R> {
    backend: B,
    requester: R,
    store: AdjustmentStore,
    scheduler: RenderScheduler,
    source: Option<Dimensions>,
    config: SessionConfig,
    canvas: Option<Dimensions>,
}

impl<B, R> EditorSession<B, R>
where
    B: RenderBackend,
    R: FrameRequester,
{
    pub fn new(backend: B, requester: R, config: SessionConfig) -> Self {
        Self::with_store(backend, requester, config, AdjustmentStore::default())
    }

    /// Starts from existing adjustments and transform, e.g. loaded from a
    /// config file.
    pub fn with_store(
        backend: B,
        requester: R,
        config: SessionConfig,
        store: AdjustmentStore,
    ) -> Self {
        Self {
            backend,
            requester,
            store,
            scheduler: RenderScheduler::new(),
            source: None,
            config,
            canvas: None,
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    pub fn scheduler(&self) -> &RenderScheduler {
        &self.scheduler
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn adjustments(&self) -> &AdjustmentParameters {
        self.store.adjustments()
    }

    pub fn transform(&self) -> &TransformParameters {
        self.store.transform()
    }

    pub fn source_dimensions(&self) -> Option<Dimensions> {
        self.source
    }

    /// Display size of the preview from the most recent draw.
    pub fn canvas_dimensions(&self) -> Option<Dimensions> {
        self.canvas
    }

    /// Binds a new source image and schedules a draw of it with the current
    /// adjustments and transform.
    pub fn set_image(&mut self, image: &RgbaImage) -> Result<(), SessionError> {
        self.backend.set_image(image)?;
        let size = Dimensions::new(image.width(), image.height());
        self.source = Some(size);
        tracing::info!(width = size.width, height = size.height, "loaded image");
        self.scheduler.submit(self.store.snapshot(), &mut self.requester);
        Ok(())
    }

    pub fn set_adjustments(&mut self, adjustments: AdjustmentParameters) {
        self.store
            .set_adjustments(adjustments, &mut self.scheduler, &mut self.requester);
    }

    pub fn set_transform(&mut self, transform: TransformParameters) {
        self.store
            .set_transform(transform, &mut self.scheduler, &mut self.requester);
    }

    /// Updates the preview area, e.g. after a window resize, and schedules a
    /// redraw at the new size.
    pub fn set_preview_surface(&mut self, preview_surface: Dimensions, pixel_ratio: f32) {
        self.config.preview_surface = preview_surface;
        self.config.pixel_ratio = pixel_ratio;
        self.scheduler.submit(self.store.snapshot(), &mut self.requester);
    }

    /// Schedules a redraw of the current state, e.g. after the surface was
    /// lost.
    pub fn invalidate(&mut self) {
        self.scheduler.submit(self.store.snapshot(), &mut self.requester);
    }

    /// Frame callback. Draws the pending snapshot at preview size and returns
    /// its plan; returns `Ok(None)` when nothing was pending or no image is
    /// bound yet.
    pub fn on_frame(&mut self) -> Result<Option<DimensionPlan>, SessionError> {
        let backend = &mut self.backend;
        let source = self.source;
        let config = self.config;
        let canvas = &mut self.canvas;

        let outcome = self.scheduler.on_frame(|snapshot| -> Result<_, SessionError> {
            let Some(source) = source.filter(|_| backend.state().is_ready()) else {
                tracing::trace!("skipping frame; renderer has no image yet");
                return Ok(None);
            };
            let plan = plan_preview(
                source,
                &snapshot.transform,
                config.preview_surface,
                config.pixel_ratio,
            )?;
            let started = Instant::now();
            backend.render(&RenderRequest {
                source,
                render: plan.render,
                transform: snapshot.transform,
                adjustments: snapshot.adjustments,
            })?;
            let elapsed = started.elapsed();
            if elapsed > config.frame_budget {
                tracing::warn!(
                    elapsed_ms = elapsed.as_secs_f64() * 1000.0,
                    budget_ms = config.frame_budget.as_secs_f64() * 1000.0,
                    render = %plan.render,
                    "draw exceeded the frame budget"
                );
            }
            *canvas = Some(plan.canvas);
            Ok(Some(plan))
        });

        outcome.unwrap_or(Ok(None))
    }

    /// Draws the current state at full output resolution, bypassing the
    /// scheduler. The caller reads the result back from the backend.
    pub fn render_export(&mut self) -> Result<DimensionPlan, SessionError> {
        let source = self.source.ok_or(SessionError::NoImage)?;
        let snapshot = self.store.snapshot();
        let plan = plan_export(source, &snapshot.transform)?;
        self.backend.render(&RenderRequest {
            source,
            render: plan.render,
            transform: snapshot.transform,
            adjustments: snapshot.adjustments,
        })?;
        tracing::info!(output = %plan.output, "rendered export");
        Ok(plan)
    }
}
