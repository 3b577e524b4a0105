use renderer::{AdjustmentParameters, TransformParameters};

use crate::{FrameRequester, RenderScheduler, RenderSnapshot};

/// Canonical adjustment record and transform for one editing session.
///
/// Records are replaced wholesale; merging a single changed field is the
/// caller's job (see [`AdjustmentParameters::with`]).
#[derive(Debug, Clone, Default)]
pub struct AdjustmentStore {
    adjustments: AdjustmentParameters,
    transform: TransformParameters,
}

impl AdjustmentStore {
    pub fn new(adjustments: AdjustmentParameters, transform: TransformParameters) -> Self {
        Self {
            adjustments,
            transform,
        }
    }

    pub fn adjustments(&self) -> &AdjustmentParameters {
        &self.adjustments
    }

    pub fn transform(&self) -> &TransformParameters {
        &self.transform
    }

    pub fn snapshot(&self) -> RenderSnapshot {
        RenderSnapshot {
            adjustments: self.adjustments,
            transform: self.transform,
        }
    }

    pub fn set_adjustments<R>(
        &mut self,
        adjustments: AdjustmentParameters,
        scheduler: &mut RenderScheduler,
        requester: &mut R,
    ) where
        R: FrameRequester + ?Sized,
    {
        self.adjustments = adjustments;
        scheduler.submit(self.snapshot(), requester);
    }

    pub fn set_transform<R>(
        &mut self,
        transform: TransformParameters,
        scheduler: &mut RenderScheduler,
        requester: &mut R,
    ) where
        R: FrameRequester + ?Sized,
    {
        self.transform = transform;
        scheduler.submit(self.snapshot(), requester);
    }
}
