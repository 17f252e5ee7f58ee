// Copyright 2025 the Vello Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Building the stage chain and feeding primitive streams through it.

use crate::clip::ClipStage;
use crate::cull::CullStage;
use crate::error::DrawError;
use crate::stage::{PipeStage, Rasterizer, StageChain};
use crate::state::{CullFace, DrawState};
use crate::stats::PipelineStatistics;
use draw_common::decompose::{decompose, PrimSink};
use draw_common::prim::{PrimHeader, PrimInfo};
use draw_common::vertex::{ShadedVertex, VertexInfo};
use log::debug;

/// The chain of stages between the clip test and the rasterizer.
#[derive(Debug, Default)]
pub(crate) struct Pipeline {
    stages: Vec<PipeStage>,
    valid: bool,
}

impl Pipeline {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Rebuild the chain before the next primitive.
    pub(crate) fn invalidate(&mut self) {
        self.valid = false;
    }

    fn validate(&mut self, state: &DrawState) {
        if self.valid {
            return;
        }

        self.stages.clear();
        if state.clip_flags().any() {
            self.stages.push(PipeStage::Clip(ClipStage::new()));
        }
        if state.rasterizer.cull_face != CullFace::None {
            self.stages.push(PipeStage::Cull(CullStage::new()));
        }
        debug!("pipeline: validated with stages {:?}", self.stage_names());
        self.valid = true;
    }

    fn stage_names(&self) -> Vec<&'static str> {
        self.stages
            .iter()
            .map(|s| match s {
                PipeStage::Clip(_) => "clip",
                PipeStage::Cull(_) => "cull",
            })
            .collect()
    }

    /// Decompose the primitive stream and send every primitive down the chain.
    ///
    /// Primitives with adjacency are reduced to their base primitive. All indices are
    /// checked before the first primitive is sent.
    pub(crate) fn run(
        &mut self,
        state: &DrawState,
        prim: &PrimInfo,
        verts: &VertexInfo,
        backend: &mut dyn Rasterizer,
        stats: &mut PipelineStatistics,
    ) -> Result<(), DrawError> {
        check_bounds(prim, verts.count())?;
        self.validate(state);

        let mut chain = StageChain::new(&mut self.stages, backend, state, stats);
        let mut sink = ChainSink {
            chain: &mut chain,
            verts: &verts.verts,
        };

        let mut offset = 0;
        for &len in &prim.primitive_lengths {
            let len = len as usize;
            decompose(
                prim.kind,
                prim.flags,
                len,
                state.rasterizer.flatshade_first,
                |i| prim.elt(offset + i).unwrap_or(u32::MAX),
                &mut sink,
            )?;
            offset += len;
        }

        Ok(())
    }

    /// Flush all stages and the backend.
    pub(crate) fn flush(
        &mut self,
        state: &DrawState,
        backend: &mut dyn Rasterizer,
        stats: &mut PipelineStatistics,
    ) {
        debug!("pipeline: flush");
        StageChain::new(&mut self.stages, backend, state, stats).flush();
    }

    pub(crate) fn reset_stipple_counter(
        &mut self,
        state: &DrawState,
        backend: &mut dyn Rasterizer,
        stats: &mut PipelineStatistics,
    ) {
        StageChain::new(&mut self.stages, backend, state, stats).reset_stipple_counter();
    }
}

/// Check that every element of the stream addresses one of `count` vertices.
pub(crate) fn check_bounds(prim: &PrimInfo, count: usize) -> Result<(), DrawError> {
    let total: usize = prim.primitive_lengths.iter().map(|&l| l as usize).sum();
    for i in 0..total {
        match prim.elt(i) {
            Some(index) if (index as usize) < count => {}
            Some(index) => return Err(DrawError::IndexOutOfBounds { index, count }),
            None => {
                return Err(DrawError::IndexOutOfBounds {
                    index: prim.start.saturating_add(i as u32),
                    count: prim.elts.as_ref().map_or(0, Vec::len),
                })
            }
        }
    }
    Ok(())
}

struct ChainSink<'c, 'a, 'v> {
    chain: &'c mut StageChain<'a>,
    verts: &'v [ShadedVertex],
}

impl<'v> ChainSink<'_, '_, 'v> {
    fn vert(&self, index: u32) -> Result<&'v ShadedVertex, DrawError> {
        self.verts
            .get(index as usize)
            .ok_or(DrawError::IndexOutOfBounds {
                index,
                count: self.verts.len(),
            })
    }
}

impl PrimSink for ChainSink<'_, '_, '_> {
    type Error = DrawError;

    fn point(&mut self, i0: u32) -> Result<(), DrawError> {
        let v0 = self.vert(i0)?;
        self.chain.point(&PrimHeader::point(0, v0));
        Ok(())
    }

    fn line(&mut self, flags: u16, i0: u32, i1: u32) -> Result<(), DrawError> {
        let (v0, v1) = (self.vert(i0)?, self.vert(i1)?);
        self.chain.line(&PrimHeader::line(flags, v0, v1));
        Ok(())
    }

    fn tri(&mut self, flags: u16, i0: u32, i1: u32, i2: u32) -> Result<(), DrawError> {
        let (v0, v1, v2) = (self.vert(i0)?, self.vert(i1)?, self.vert(i2)?);
        self.chain.tri(&PrimHeader::tri(flags, v0, v1, v2));
        Ok(())
    }
}
