//! Frame-coalescing draw scheduling for the tone renderer.
//!
//! Edits arrive far more often than the display refreshes. The
//! [`RenderScheduler`] keeps exactly one pending [`RenderSnapshot`] and asks
//! for at most one frame callback at a time; whatever snapshot is current
//! when the callback fires is what gets drawn.

mod session;
mod store;

use renderer::{AdjustmentParameters, TransformParameters};

pub use session::{EditorSession, SessionConfig, SessionError};
pub use store::AdjustmentStore;

/// The state a draw is made from.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct RenderSnapshot {
    pub adjustments: AdjustmentParameters,
    pub transform: TransformParameters,
}

/// Something that can arrange for a frame-aligned callback, e.g. a window's
/// redraw request.
pub trait FrameRequester {
    fn request_frame(&mut self);
}

impl<F: FnMut()> FrameRequester for F {
    fn request_frame(&mut self) {
        self()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SchedulerState {
    #[default]
    Idle,
    FramePending,
}

/// Diagnostics counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SchedulerStats {
    pub submitted: u64,
    pub frames_requested: u64,
    pub draws: u64,
}

impl SchedulerStats {
    /// Submissions that were folded into an already pending frame.
    pub fn coalesced(&self) -> u64 {
        self.submitted.saturating_sub(self.frames_requested)
    }
}

#[derive(Debug, Default)]
pub struct RenderScheduler {
    state: SchedulerState,
    pending: Option<RenderSnapshot>,
    stats: SchedulerStats,
}

impl RenderScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> SchedulerState {
        self.state
    }

    pub fn pending(&self) -> Option<&RenderSnapshot> {
        self.pending.as_ref()
    }

    pub fn stats(&self) -> SchedulerStats {
        self.stats
    }

    /// Replaces the pending snapshot. A frame is requested only when none is
    /// outstanding; returns whether this call requested one.
    pub fn submit<R>(&mut self, snapshot: RenderSnapshot, requester: &mut R) -> bool
    where
        R: FrameRequester + ?Sized,
    {
        self.pending = Some(snapshot);
        self.stats.submitted += 1;
        match self.state {
            SchedulerState::FramePending => {
                tracing::trace!("coalesced update into pending frame");
                false
            }
            SchedulerState::Idle => {
                self.state = SchedulerState::FramePending;
                self.stats.frames_requested += 1;
                requester.request_frame();
                tracing::trace!("requested frame");
                true
            }
        }
    }

    /// Runs `draw` with the snapshot current at fire time, then returns to
    /// idle whatever `draw` produced. Firing while idle does nothing.
    pub fn on_frame<T, F>(&mut self, draw: F) -> Option<T>
    where
        F: FnOnce(&RenderSnapshot) -> T,
    {
        if self.state == SchedulerState::Idle {
            tracing::trace!("frame fired with nothing pending");
            return None;
        }
        let snapshot = self.pending.take()?;
        let output = draw(&snapshot);
        self.stats.draws += 1;
        self.state = SchedulerState::Idle;
        Some(output)
    }
}
