// Copyright 2025 the Vello Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The primitive assembler.
//!
//! Rewrites a primitive stream into a plain list of independent points, lines or
//! triangles so that per-primitive values can be stored in the vertices: the primitive id
//! and the front-facing flag, when the fragment shader reads them and no earlier stage
//! wrote them. Adjacency vertices are dropped on the way.

use crate::cull::window_det;
use crate::error::DrawError;
use crate::pipeline::check_bounds;
use crate::state::DrawState;
use draw_common::decompose::{decompose, PrimSink};
use draw_common::prim::{PrimInfo, PrimKind};
use draw_common::shader::{Semantic, ShaderInfo, ShaderSlot};
use draw_common::vertex::{ShadedVertex, VertexInfo};
use draw_common::viewport::viewport_index_from_bits;
use log::debug;

/// The output of the assembler.
#[derive(Clone, Debug)]
pub(crate) struct Assembled {
    pub(crate) prim: PrimInfo,
    pub(crate) verts: VertexInfo,
    pub(crate) outputs: ShaderInfo,
}

fn needs_primid(state: &DrawState, outputs: &ShaderInfo) -> bool {
    state.fragment.as_ref().is_some_and(|fs| fs.uses_primid())
        && outputs.find(Semantic::PrimitiveId, 0).is_none()
}

fn needs_front_face(state: &DrawState, outputs: &ShaderInfo) -> bool {
    state
        .fragment
        .as_ref()
        .is_some_and(|fs| fs.uses_front_face())
        && outputs.find(Semantic::FrontFace, 0).is_none()
}

/// Whether a stream of the given kind has to go through the assembler.
pub(crate) fn is_required(state: &DrawState, kind: PrimKind, outputs: &ShaderInfo) -> bool {
    kind.is_adjacency() || needs_primid(state, outputs) || needs_front_face(state, outputs)
}

/// Assigns primitive ids and materializes facing.
#[derive(Debug, Default)]
pub(crate) struct PrimAssembler {
    prim_id: u32,
}

impl PrimAssembler {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Assemble the stream.
    ///
    /// `outputs` describes `verts`. The extra slots are appended to the returned
    /// outputs, primitive ids count from zero for every run.
    pub(crate) fn run(
        &mut self,
        state: &DrawState,
        prim: &PrimInfo,
        verts: &VertexInfo,
        outputs: &ShaderInfo,
    ) -> Result<Assembled, DrawError> {
        check_bounds(prim, verts.count())?;

        let mut assembled_outputs = outputs.clone();
        let primid_slot = needs_primid(state, outputs)
            .then(|| assembled_outputs.push(ShaderSlot::new(Semantic::PrimitiveId, 0)));
        let front_face_slot = needs_front_face(state, outputs)
            .then(|| assembled_outputs.push(ShaderSlot::new(Semantic::FrontFace, 0)));
        let num_attribs = assembled_outputs.num_outputs();

        let reduced = prim.kind.reduced();
        let max_verts: usize = prim
            .primitive_lengths
            .iter()
            .map(|&len| prim.kind.decomposed_prims_for_vertices(len as usize))
            .sum::<usize>()
            * reduced.vertices_per_prim();
        let mut out = Vec::new();
        out.try_reserve_exact(max_verts)?;

        self.prim_id = 0;
        let mut sink = AssemblerSink {
            state,
            verts: &verts.verts,
            out: &mut out,
            prim_id: &mut self.prim_id,
            primid_slot,
            front_face_slot,
            position: outputs.position(),
            viewport_index: outputs.viewport_index(),
            num_attribs,
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

        debug!(
            "assembler: {} {:?} primitives into {} vertices",
            self.prim_id,
            reduced,
            out.len()
        );

        let count = out.len() as u32;
        Ok(Assembled {
            prim: PrimInfo::linear(reduced, 0, count),
            verts: VertexInfo {
                verts: out,
                num_attribs,
            },
            outputs: assembled_outputs,
        })
    }
}

struct AssemblerSink<'a> {
    state: &'a DrawState,
    verts: &'a [ShadedVertex],
    out: &'a mut Vec<ShadedVertex>,
    prim_id: &'a mut u32,
    primid_slot: Option<usize>,
    front_face_slot: Option<usize>,
    position: Option<usize>,
    viewport_index: Option<usize>,
    num_attribs: usize,
}

impl<'a> AssemblerSink<'a> {
    fn vert(&self, index: u32) -> Result<&'a ShadedVertex, DrawError> {
        self.verts
            .get(index as usize)
            .ok_or(DrawError::IndexOutOfBounds {
                index,
                count: self.verts.len(),
            })
    }

    /// Whether the triangle is front facing, judged from normalized device coordinates.
    ///
    /// Triangles crossing `w = 0` and degenerate triangles count as front facing.
    fn is_front_facing(&self, v: [&ShadedVertex; 3]) -> bool {
        let Some(pos) = self.position else {
            return true;
        };
        let mut ndc = [[0.0_f32; 4]; 3];
        for (dst, vert) in ndc.iter_mut().zip(v) {
            let Some(p) = vert.data.get(pos) else {
                return true;
            };
            if p[3].is_nan() || p[3] <= 0.0 {
                return true;
            }
            *dst = [p[0] / p[3], p[1] / p[3], 0.0, 1.0];
        }

        // The viewport can mirror the triangle on its way to window space.
        let provoking = v[self.state.provoking_vertex(3)];
        let vp = self
            .viewport_index
            .and_then(|vi| provoking.data.get(vi))
            .map_or(0, |vi| viewport_index_from_bits(vi[0].to_bits()));
        let scale = self.state.viewports[vp].scale;

        let det = window_det(&ndc[0], &ndc[1], &ndc[2]) * scale[0] * scale[1];
        if det == 0.0 || det.is_nan() {
            return true;
        }
        (det < 0.0) == self.state.rasterizer.front_ccw
    }

    fn emit(&mut self, src: &[&ShadedVertex], front_face: bool) {
        let id = *self.prim_id;
        *self.prim_id += 1;

        for &v in src {
            let mut vert = v.clone();
            vert.data.resize(self.num_attribs, [0.0; 4]);
            if let Some(slot) = self.primid_slot {
                vert.data[slot] = [f32::from_bits(id); 4];
            }
            if let Some(slot) = self.front_face_slot {
                let value = if front_face { 1.0 } else { 0.0 };
                vert.data[slot] = [value, 0.0, 0.0, 0.0];
            }
            self.out.push(vert);
        }
    }
}

impl PrimSink for AssemblerSink<'_> {
    type Error = DrawError;

    fn point(&mut self, i0: u32) -> Result<(), DrawError> {
        let v0 = self.vert(i0)?;
        self.emit(&[v0], true);
        Ok(())
    }

    fn line(&mut self, _: u16, i0: u32, i1: u32) -> Result<(), DrawError> {
        let v0 = self.vert(i0)?;
        let v1 = self.vert(i1)?;
        self.emit(&[v0, v1], true);
        Ok(())
    }

    fn tri(&mut self, _: u16, i0: u32, i1: u32, i2: u32) -> Result<(), DrawError> {
        let v0 = self.vert(i0)?;
        let v1 = self.vert(i1)?;
        let v2 = self.vert(i2)?;
        let front_face = self.front_face_slot.is_some() && self.is_front_facing([v0, v1, v2]);
        self.emit(&[v0, v1, v2], front_face);
        Ok(())
    }
}
