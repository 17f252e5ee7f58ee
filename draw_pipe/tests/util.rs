// Copyright 2025 the Vello Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use draw_pipe::draw_common::prim::{PrimHeader, PrimInfo, PrimKind};
use draw_pipe::draw_common::shader::{Semantic, ShaderInfo, ShaderSlot};
use draw_pipe::draw_common::vertex::{ShadedVertex, VertexInfo};
use draw_pipe::{DrawContext, DrawSettings, Rasterizer, RasterizerState};

/// A primitive that reached the rasterizer.
#[derive(Clone, Debug)]
pub(crate) struct Recorded {
    pub(crate) kind: PrimKind,
    pub(crate) flags: u16,
    pub(crate) det: f32,
    pub(crate) verts: Vec<ShadedVertex>,
}

impl Recorded {
    /// The clip-space area of a triangle.
    pub(crate) fn clip_area(&self) -> f32 {
        let p: Vec<[f32; 2]> = self
            .verts
            .iter()
            .map(|v| {
                let c = v.pre_clip_pos;
                [c[0] / c[3], c[1] / c[3]]
            })
            .collect();
        0.5 * ((p[1][0] - p[0][0]) * (p[2][1] - p[0][1])
            - (p[2][0] - p[0][0]) * (p[1][1] - p[0][1]))
            .abs()
    }
}

/// A rasterizer recording everything it receives.
#[derive(Debug, Default)]
pub(crate) struct Recorder {
    pub(crate) prims: Vec<Recorded>,
    pub(crate) flushes: usize,
    pub(crate) stipple_resets: usize,
}

impl Recorder {
    fn record(&mut self, kind: PrimKind, header: &PrimHeader<'_>, n: usize) {
        self.prims.push(Recorded {
            kind,
            flags: header.flags,
            det: header.det,
            verts: header.v[..n].iter().map(|v| (*v).clone()).collect(),
        });
    }

    pub(crate) fn tris(&self) -> Vec<&Recorded> {
        self.of_kind(PrimKind::Triangles)
    }

    pub(crate) fn lines(&self) -> Vec<&Recorded> {
        self.of_kind(PrimKind::Lines)
    }

    pub(crate) fn points(&self) -> Vec<&Recorded> {
        self.of_kind(PrimKind::Points)
    }

    fn of_kind(&self, kind: PrimKind) -> Vec<&Recorded> {
        self.prims.iter().filter(|p| p.kind == kind).collect()
    }
}

impl Rasterizer for Recorder {
    fn point(&mut self, header: &PrimHeader<'_>) {
        self.record(PrimKind::Points, header, 1);
    }

    fn line(&mut self, header: &PrimHeader<'_>) {
        self.record(PrimKind::Lines, header, 2);
    }

    fn tri(&mut self, header: &PrimHeader<'_>) {
        self.record(PrimKind::Triangles, header, 3);
    }

    fn flush(&mut self) {
        self.flushes += 1;
    }

    fn reset_stipple_counter(&mut self) {
        self.stipple_resets += 1;
    }
}

/// Position in slot 0, a generic varying in slot 1.
pub(crate) fn outputs() -> ShaderInfo {
    ShaderInfo::from_slots([
        ShaderSlot::new(Semantic::Position, 0),
        ShaderSlot::new(Semantic::Generic, 0),
    ])
}

/// A vertex with the layout of [`outputs`].
pub(crate) fn vertex(id: u32, pos: [f32; 4], generic: [f32; 4]) -> ShadedVertex {
    let mut v = ShadedVertex::from_attributes([pos, generic]);
    v.vertex_id = id;
    v
}

/// Vertices with the layout of [`outputs`], the generic varying holding the vertex index.
pub(crate) fn vertices(positions: &[[f32; 4]]) -> VertexInfo {
    VertexInfo::from_vertices(
        positions
            .iter()
            .enumerate()
            .map(|(i, p)| vertex(i as u32, *p, [i as f32; 4]))
            .collect(),
    )
}

/// A context with the vertex layout of [`outputs`].
pub(crate) fn context() -> DrawContext<Recorder> {
    let mut ctx = DrawContext::new(Recorder::default());
    ctx.set_vertex_shader_outputs(outputs());
    ctx
}

/// A context clipping only against the near and far planes.
pub(crate) fn context_z_only() -> DrawContext<Recorder> {
    let mut ctx = context();
    ctx.set_settings(DrawSettings {
        bypass_clip_xy: true,
        ..DrawSettings::default()
    });
    ctx
}

pub(crate) fn flatshade_first(first: bool) -> RasterizerState {
    RasterizerState {
        flatshade_first: first,
        ..RasterizerState::default()
    }
}

/// Draw a linear stream over all vertices.
pub(crate) fn draw(ctx: &mut DrawContext<Recorder>, kind: PrimKind, positions: &[[f32; 4]]) {
    let verts = vertices(positions);
    let prim = PrimInfo::linear(kind, 0, positions.len() as u32);
    ctx.draw(&prim, &verts).unwrap();
}

pub(crate) fn approx_eq(a: f32, b: f32) -> bool {
    (a - b).abs() < 1e-5
}
