// Copyright 2025 the Vello Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Running a geometry shader over a primitive stream.
//!
//! The input stream is decomposed into primitives of the shader's input kind. Their
//! vertices are gathered into the lanes of a [`GsInputBatch`], one primitive per lane,
//! and the backend is invoked whenever the batch is full, and once more for a partial
//! batch at the end. Whatever the backend emits through the [`GsEmitter`] is appended to
//! the output in lane order, so the output never depends on the vector width.

use crate::error::DrawError;
use crate::pipeline::check_bounds;
use draw_common::decompose::{decompose, PrimSink};
use draw_common::math::align;
use draw_common::prim::{PrimInfo, PrimKind};
use draw_common::shader::{Semantic, ShaderInfo, ShaderSlot};
use draw_common::vertex::{ShadedVertex, VertexInfo};
use log::{debug, warn};
use smallvec::SmallVec;
use std::fmt;

/// The maximum number of vertices a geometry shader may emit per input primitive.
pub const MAX_GS_OUTPUT_VERTICES: usize = 1024;

/// The maximum number of input primitives batched into one invocation.
pub const MAX_GS_VECTOR_WIDTH: usize = 16;

/// The static interface of a geometry shader.
#[derive(Clone, Debug, PartialEq)]
pub struct GsInfo {
    /// The kind of primitive the shader consumes.
    pub input_prim: PrimKind,
    /// The kind of primitive the shader emits: points, line strips or triangle strips.
    pub output_prim: PrimKind,
    /// The maximum number of vertices emitted per input primitive.
    pub max_output_vertices: usize,
    /// The inputs, linked to the outputs of the previous stage by semantic.
    pub inputs: SmallVec<[ShaderSlot; 16]>,
    /// The outputs of every emitted vertex.
    pub outputs: ShaderInfo,
}

/// A geometry shader implementation, e.g. an interpreter or compiled code.
pub trait GeometryShaderBackend {
    /// The static interface of the shader.
    fn info(&self) -> &GsInfo;

    /// How many input primitives the backend processes per invocation.
    fn vector_width(&self) -> usize {
        1
    }

    /// Bind the constant buffers for the next draw.
    fn prepare(&mut self, _constants: &[Vec<[f32; 4]>]) {}

    /// Run the shader for every lane of `inputs`.
    ///
    /// Vertices and primitive ends are reported to `emitter` per lane.
    fn run(&mut self, inputs: &GsInputBatch, emitter: &mut GsEmitter) -> Result<(), DrawError>;
}

/// The inputs of one input primitive.
#[derive(Clone, Debug, Default)]
pub struct GsLane {
    prim_id: u32,
    num_vertices: usize,
    num_inputs: usize,
    data: Vec<[f32; 4]>,
}

impl GsLane {
    /// The index of the primitive in the input stream.
    #[inline]
    pub fn prim_id(&self) -> u32 {
        self.prim_id
    }

    /// The number of vertices of the primitive.
    #[inline]
    pub fn num_vertices(&self) -> usize {
        self.num_vertices
    }

    /// All inputs of a vertex, in shader input order.
    pub fn vertex(&self, vertex: usize) -> &[[f32; 4]] {
        let start = vertex * self.num_inputs;
        self.data.get(start..start + self.num_inputs).unwrap_or(&[])
    }

    /// A single input of a vertex, zero if it doesn't exist.
    pub fn input(&self, vertex: usize, input: usize) -> [f32; 4] {
        self.vertex(vertex).get(input).copied().unwrap_or_default()
    }
}

/// A batch of input primitives.
#[derive(Clone, Debug, Default)]
pub struct GsInputBatch {
    lanes: Vec<GsLane>,
    active: usize,
}

impl GsInputBatch {
    fn new(width: usize) -> Self {
        Self {
            lanes: vec![GsLane::default(); width],
            active: 0,
        }
    }

    /// The lanes holding a primitive. Partial batches have fewer lanes than the vector width.
    #[inline]
    pub fn lanes(&self) -> &[GsLane] {
        &self.lanes[..self.active]
    }

    /// The number of lanes holding a primitive.
    #[inline]
    pub fn len(&self) -> usize {
        self.active
    }

    /// Whether no lane holds a primitive.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.active == 0
    }
}

#[derive(Clone, Debug, Default)]
struct LaneOutput {
    verts: Vec<ShadedVertex>,
    prim_lengths: Vec<u32>,
    open: u32,
}

impl LaneOutput {
    fn close(&mut self) {
        if self.open > 0 {
            self.prim_lengths.push(self.open);
            self.open = 0;
        }
    }
}

/// Collects the vertices and primitives emitted by the backend.
#[derive(Clone, Debug)]
pub struct GsEmitter {
    max_vertices: usize,
    num_outputs: usize,
    active: usize,
    lanes: Vec<LaneOutput>,
}

impl GsEmitter {
    fn new(width: usize, max_vertices: usize, num_outputs: usize) -> Self {
        Self {
            max_vertices,
            num_outputs,
            active: 0,
            lanes: vec![LaneOutput::default(); width],
        }
    }

    /// The maximum number of vertices a lane may emit.
    #[inline]
    pub fn max_vertices(&self) -> usize {
        self.max_vertices
    }

    /// Emit a vertex for a lane, adding it to the lane's current primitive.
    ///
    /// Missing outputs are zero, extra ones are ignored. Returns `false` if the vertex was
    /// dropped because the lane already emitted the maximum number of vertices.
    pub fn emit_vertex(&mut self, lane: usize, outputs: &[[f32; 4]]) -> bool {
        let (max, n) = (self.max_vertices, self.num_outputs);
        let Some(out) = self.lanes[..self.active].get_mut(lane) else {
            return false;
        };
        if out.verts.len() >= max {
            return false;
        }

        let mut data = Vec::with_capacity(n);
        data.extend(outputs.iter().take(n).copied());
        data.resize(n, [0.0; 4]);
        out.verts.push(ShadedVertex::from_attributes(data));
        out.open += 1;
        true
    }

    /// End the current primitive of a lane. Empty primitives are skipped.
    pub fn end_primitive(&mut self, lane: usize) {
        if let Some(out) = self.lanes[..self.active].get_mut(lane) {
            out.close();
        }
    }

    fn begin(&mut self, active: usize) {
        self.active = active;
        for lane in &mut self.lanes[..active] {
            lane.verts.clear();
            lane.prim_lengths.clear();
            lane.open = 0;
        }
    }

    /// Move everything emitted into the output, in lane order.
    fn drain_into(
        &mut self,
        verts: &mut Vec<ShadedVertex>,
        prim_lengths: &mut Vec<u32>,
    ) -> Result<usize, DrawError> {
        let mut num_prims = 0;
        for lane in &mut self.lanes[..self.active] {
            lane.close();
            verts.try_reserve(lane.verts.len())?;
            verts.append(&mut lane.verts);
            prim_lengths.try_reserve(lane.prim_lengths.len())?;
            num_prims += lane.prim_lengths.len();
            prim_lengths.append(&mut lane.prim_lengths);
        }
        self.active = 0;
        Ok(num_prims)
    }
}

/// The result of running a geometry shader over a stream.
#[derive(Clone, Debug)]
pub(crate) struct GsOutput {
    pub(crate) prim: PrimInfo,
    pub(crate) verts: VertexInfo,
    pub(crate) invocations: u64,
    pub(crate) primitives: u64,
}

/// Where a shader input is read from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum InputLink {
    Output(usize),
    PrimitiveId,
    Zero,
}

fn link_inputs(inputs: &[ShaderSlot], outputs: &ShaderInfo) -> SmallVec<[InputLink; 16]> {
    inputs
        .iter()
        .map(|slot| {
            if slot.semantic == Semantic::PrimitiveId {
                return InputLink::PrimitiveId;
            }
            match outputs.find(slot.semantic, slot.index) {
                Some(i) => InputLink::Output(i),
                None => {
                    warn!(
                        "gs: input {:?}[{}] has no matching output, reading zero",
                        slot.semantic, slot.index
                    );
                    InputLink::Zero
                }
            }
        })
        .collect()
}

/// A validated geometry shader.
pub struct GeometryShader {
    backend: Box<dyn GeometryShaderBackend>,
    info: GsInfo,
    vector_width: usize,
    batch: GsInputBatch,
    emitter: GsEmitter,
}

impl fmt::Debug for GeometryShader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GeometryShader")
            .field("info", &self.info)
            .field("vector_width", &self.vector_width)
            .finish_non_exhaustive()
    }
}

impl GeometryShader {
    /// Validate a backend and wrap it.
    pub fn new(backend: Box<dyn GeometryShaderBackend>) -> Result<Self, DrawError> {
        let info = backend.info().clone();
        let vector_width = backend.vector_width();

        if !matches!(
            info.input_prim,
            PrimKind::Points
                | PrimKind::Lines
                | PrimKind::Triangles
                | PrimKind::LinesAdjacency
                | PrimKind::TrianglesAdjacency
        ) {
            return Err(DrawError::InvalidGeometryShader(
                "the input must be points, lines or triangles, optionally with adjacency",
            ));
        }
        if !matches!(
            info.output_prim,
            PrimKind::Points | PrimKind::LineStrip | PrimKind::TriangleStrip
        ) {
            return Err(DrawError::InvalidGeometryShader(
                "the output must be points, line strips or triangle strips",
            ));
        }
        if info.max_output_vertices > MAX_GS_OUTPUT_VERTICES {
            return Err(DrawError::InvalidGeometryShader("too many output vertices"));
        }
        if !(1..=MAX_GS_VECTOR_WIDTH).contains(&vector_width) {
            return Err(DrawError::InvalidGeometryShader(
                "the vector width is out of range",
            ));
        }
        if info.outputs.position().is_none() {
            return Err(DrawError::NoPositionOutput);
        }

        let batch = GsInputBatch::new(vector_width);
        let emitter = GsEmitter::new(
            vector_width,
            info.max_output_vertices,
            info.outputs.num_outputs(),
        );
        Ok(Self {
            backend,
            info,
            vector_width,
            batch,
            emitter,
        })
    }

    /// The static interface of the shader.
    pub fn info(&self) -> &GsInfo {
        &self.info
    }

    /// The number of input primitives per invocation.
    pub fn vector_width(&self) -> usize {
        self.vector_width
    }

    /// Run the shader over a stream whose vertices have the given outputs.
    pub(crate) fn run(
        &mut self,
        constants: &[Vec<[f32; 4]>],
        prim: &PrimInfo,
        verts: &VertexInfo,
        vs_outputs: &ShaderInfo,
        flatshade_first: bool,
    ) -> Result<GsOutput, DrawError> {
        let input_prim = self.info.input_prim;
        match prim.kind.gs_input_kind() {
            None => return Err(DrawError::UnsupportedPrimitive(prim.kind)),
            Some(kind) if kind != input_prim => {
                return Err(DrawError::PrimitiveMismatch {
                    draw: prim.kind,
                    shader: input_prim,
                })
            }
            Some(_) => {}
        }
        check_bounds(prim, verts.count())?;

        let num_input_verts = if prim.is_linear() {
            verts.count()
        } else {
            prim.count as usize
        };
        let num_in_prims = align(
            prim.kind
                .decomposed_prims_for_vertices(num_input_verts)
                .max(input_prim.decomposed_prims_for_vertices(num_input_verts)),
            self.vector_width,
        );
        let max_out_prims = self
            .info
            .output_prim
            .decomposed_prims_for_vertices(self.info.max_output_vertices)
            .saturating_mul(num_in_prims)
            .max(1);
        let max_out_verts = num_in_prims
            .checked_mul(self.info.max_output_vertices)
            .ok_or(DrawError::OutOfMemory)?;

        let mut out_verts = Vec::new();
        out_verts.try_reserve(max_out_verts)?;
        let mut prim_lengths = Vec::new();
        prim_lengths.try_reserve(max_out_prims)?;

        self.backend.prepare(constants);
        let links = link_inputs(&self.info.inputs, vs_outputs);

        let mut run = GsRun {
            backend: &mut *self.backend,
            batch: &mut self.batch,
            emitter: &mut self.emitter,
            verts: &verts.verts,
            links: &links,
            vector_width: self.vector_width,
            in_prim_idx: 0,
            invocations: 0,
            primitives: 0,
            out_verts: &mut out_verts,
            prim_lengths: &mut prim_lengths,
        };
        run.batch.active = 0;

        let mut offset = 0;
        for &len in &prim.primitive_lengths {
            let len = len as usize;
            decompose(
                prim.kind,
                prim.flags,
                len,
                flatshade_first,
                |i| prim.elt(offset + i).unwrap_or(u32::MAX),
                &mut run,
            )?;
            offset += len;
        }
        run.flush()?;

        let (invocations, primitives) = (run.invocations, run.primitives);
        debug!(
            "gs: {} input primitives, {} vertices in {} output primitives",
            invocations,
            out_verts.len(),
            primitives
        );

        let count = out_verts.len() as u32;
        Ok(GsOutput {
            prim: PrimInfo {
                kind: self.info.output_prim,
                elts: None,
                start: 0,
                count,
                flags: 0,
                primitive_lengths: prim_lengths,
            },
            verts: VertexInfo {
                verts: out_verts,
                num_attribs: self.info.outputs.num_outputs(),
            },
            invocations,
            primitives,
        })
    }
}

/// The state of one run, consuming decomposed input primitives.
struct GsRun<'a> {
    backend: &'a mut dyn GeometryShaderBackend,
    batch: &'a mut GsInputBatch,
    emitter: &'a mut GsEmitter,
    verts: &'a [ShadedVertex],
    links: &'a [InputLink],
    vector_width: usize,
    in_prim_idx: u32,
    invocations: u64,
    primitives: u64,
    out_verts: &'a mut Vec<ShadedVertex>,
    prim_lengths: &'a mut Vec<u32>,
}

impl GsRun<'_> {
    fn fetch(&mut self, indices: &[u32]) -> Result<(), DrawError> {
        let prim_id = self.in_prim_idx;
        let lane = &mut self.batch.lanes[self.batch.active];
        lane.prim_id = prim_id;
        lane.num_vertices = indices.len();
        lane.num_inputs = self.links.len();
        lane.data.clear();

        for &index in indices {
            let vert = self
                .verts
                .get(index as usize)
                .ok_or(DrawError::IndexOutOfBounds {
                    index,
                    count: self.verts.len(),
                })?;
            for link in self.links {
                let value = match *link {
                    InputLink::Output(slot) => vert.data.get(slot).copied().unwrap_or_default(),
                    InputLink::PrimitiveId => [f32::from_bits(prim_id); 4],
                    InputLink::Zero => [0.0; 4],
                };
                lane.data.push(value);
            }
        }

        self.batch.active += 1;
        self.in_prim_idx += 1;
        if self.batch.active == self.vector_width {
            self.flush()?;
        }
        Ok(())
    }

    /// Invoke the backend for the primitives gathered so far.
    fn flush(&mut self) -> Result<(), DrawError> {
        let active = self.batch.active;
        if active == 0 {
            return Ok(());
        }

        self.emitter.begin(active);
        self.backend.run(self.batch, self.emitter)?;
        let num_prims = self.emitter.drain_into(self.out_verts, self.prim_lengths)?;

        self.invocations += active as u64;
        self.primitives += num_prims as u64;
        self.batch.active = 0;
        Ok(())
    }
}

impl PrimSink for GsRun<'_> {
    type Error = DrawError;

    fn point(&mut self, i0: u32) -> Result<(), DrawError> {
        self.fetch(&[i0])
    }

    fn line(&mut self, _: u16, i0: u32, i1: u32) -> Result<(), DrawError> {
        self.fetch(&[i0, i1])
    }

    fn tri(&mut self, _: u16, i0: u32, i1: u32, i2: u32) -> Result<(), DrawError> {
        self.fetch(&[i0, i1, i2])
    }

    fn line_adj(&mut self, _: u16, i: [u32; 4]) -> Result<(), DrawError> {
        self.fetch(&i)
    }

    fn tri_adj(&mut self, _: u16, i: [u32; 6]) -> Result<(), DrawError> {
        self.fetch(&i)
    }
}
