// Copyright 2025 the Vello Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The stage abstraction and the chain primitives travel through.

use crate::clip::ClipStage;
use crate::cull::CullStage;
use crate::state::DrawState;
use crate::stats::PipelineStatistics;
use draw_common::prim::PrimHeader;

/// The backend receiving the primitives that made it through all stages.
///
/// Implementations must not hold on to the vertices, they are only valid during the call.
pub trait Rasterizer {
    /// Rasterize a point.
    fn point(&mut self, header: &PrimHeader<'_>);
    /// Rasterize a line.
    fn line(&mut self, header: &PrimHeader<'_>);
    /// Rasterize a triangle.
    fn tri(&mut self, header: &PrimHeader<'_>);
    /// Finish all pending work.
    fn flush(&mut self) {}
    /// Restart the line stipple pattern.
    fn reset_stipple_counter(&mut self) {}
}

/// A pipeline stage.
///
/// A stage forwards zero or more primitives to the rest of the chain for every primitive
/// it receives.
pub(crate) trait Stage {
    fn point(&mut self, header: &PrimHeader<'_>, next: &mut StageChain<'_>);
    fn line(&mut self, header: &PrimHeader<'_>, next: &mut StageChain<'_>);
    fn tri(&mut self, header: &PrimHeader<'_>, next: &mut StageChain<'_>);

    /// Drop per-batch state and flush the rest of the chain.
    fn flush(&mut self, next: &mut StageChain<'_>) {
        next.flush();
    }

    fn reset_stipple_counter(&mut self, next: &mut StageChain<'_>) {
        next.reset_stipple_counter();
    }
}

#[derive(Debug)]
pub(crate) enum PipeStage {
    Clip(ClipStage),
    Cull(CullStage),
}

impl PipeStage {
    fn as_stage(&mut self) -> &mut dyn Stage {
        match self {
            Self::Clip(s) => s,
            Self::Cull(s) => s,
        }
    }
}

/// The remainder of the pipeline, as seen from one stage.
pub(crate) struct StageChain<'a> {
    stages: &'a mut [PipeStage],
    backend: &'a mut dyn Rasterizer,
    state: &'a DrawState,
    stats: &'a mut PipelineStatistics,
}

impl<'a> StageChain<'a> {
    pub(crate) fn new(
        stages: &'a mut [PipeStage],
        backend: &'a mut dyn Rasterizer,
        state: &'a DrawState,
        stats: &'a mut PipelineStatistics,
    ) -> Self {
        Self {
            stages,
            backend,
            state,
            stats,
        }
    }

    #[inline]
    pub(crate) fn state(&self) -> &'a DrawState {
        self.state
    }

    #[inline]
    pub(crate) fn stats(&mut self) -> &mut PipelineStatistics {
        self.stats
    }

    /// Split off the first stage, returning it together with the chain behind it.
    #[inline]
    fn split(&mut self) -> Option<(&mut dyn Stage, StageChain<'_>)> {
        let (first, rest) = self.stages.split_first_mut()?;
        let next = StageChain {
            stages: rest,
            backend: &mut *self.backend,
            state: self.state,
            stats: &mut *self.stats,
        };
        Some((first.as_stage(), next))
    }

    pub(crate) fn point(&mut self, header: &PrimHeader<'_>) {
        match self.split() {
            Some((stage, mut next)) => stage.point(header, &mut next),
            None => self.backend.point(header),
        }
    }

    pub(crate) fn line(&mut self, header: &PrimHeader<'_>) {
        match self.split() {
            Some((stage, mut next)) => stage.line(header, &mut next),
            None => self.backend.line(header),
        }
    }

    pub(crate) fn tri(&mut self, header: &PrimHeader<'_>) {
        match self.split() {
            Some((stage, mut next)) => stage.tri(header, &mut next),
            None => self.backend.tri(header),
        }
    }

    pub(crate) fn flush(&mut self) {
        match self.split() {
            Some((stage, mut next)) => stage.flush(&mut next),
            None => self.backend.flush(),
        }
    }

    pub(crate) fn reset_stipple_counter(&mut self) {
        match self.split() {
            Some((stage, mut next)) => stage.reset_stipple_counter(&mut next),
            None => self.backend.reset_stipple_counter(),
        }
    }
}
