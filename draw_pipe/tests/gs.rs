// Copyright 2025 the Vello Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Tests for the geometry shader runner.

use crate::util::{context, vertices, Recorder};
use draw_pipe::draw_common::prim::{PrimInfo, PrimKind};
use draw_pipe::draw_common::shader::{Semantic, ShaderInfo, ShaderSlot};
use draw_pipe::draw_common::smallvec::SmallVec;
use draw_pipe::{
    DrawContext, DrawError, DrawSettings, GeometryShader, GeometryShaderBackend, GsEmitter,
    GsInfo, GsInputBatch, MAX_GS_OUTPUT_VERTICES,
};

/// Re-emits every input vertex, with the primitive id in a generic output.
struct Passthrough {
    info: GsInfo,
    width: usize,
}

impl Passthrough {
    fn new(input_prim: PrimKind, output_prim: PrimKind, max_output_vertices: usize) -> Self {
        Self {
            info: GsInfo {
                input_prim,
                output_prim,
                max_output_vertices,
                inputs: SmallVec::from_slice(&[
                    ShaderSlot::new(Semantic::Position, 0),
                    ShaderSlot::new(Semantic::PrimitiveId, 0),
                    ShaderSlot::new(Semantic::Generic, 7),
                ]),
                outputs: ShaderInfo::from_slots([
                    ShaderSlot::new(Semantic::Position, 0),
                    ShaderSlot::new(Semantic::Generic, 0),
                ]),
            },
            width: 1,
        }
    }

    fn with_width(mut self, width: usize) -> Self {
        self.width = width;
        self
    }

    fn bind(self) -> GeometryShader {
        GeometryShader::new(Box::new(self)).unwrap()
    }
}

impl GeometryShaderBackend for Passthrough {
    fn info(&self) -> &GsInfo {
        &self.info
    }

    fn vector_width(&self) -> usize {
        self.width
    }

    fn run(&mut self, inputs: &GsInputBatch, emitter: &mut GsEmitter) -> Result<(), DrawError> {
        assert!(inputs.len() <= self.width);
        for (lane, prim) in inputs.lanes().iter().enumerate() {
            for v in 0..prim.num_vertices() {
                let prim_id = prim.input(v, 1)[0].to_bits();
                assert_eq!(prim_id, prim.prim_id());
                // Unlinked inputs read zero.
                assert_eq!(prim.input(v, 2), [0.0; 4]);
                emitter.emit_vertex(lane, &[prim.input(v, 0), [prim_id as f32; 4]]);
            }
            emitter.end_primitive(lane);
        }
        Ok(())
    }
}

/// Small triangles in a row, all inside of the view volume.
fn triangles(n: usize) -> Vec<[f32; 4]> {
    (0..n)
        .flat_map(|i| {
            let x = -0.9 + 0.15 * i as f32;
            [
                [x, 0.0, 0.0, 1.0],
                [x + 0.1, 0.0, 0.0, 1.0],
                [x, 0.1, 0.0, 1.0],
            ]
        })
        .collect()
}

fn draw_with(gs: GeometryShader, kind: PrimKind, positions: &[[f32; 4]]) -> DrawContext<Recorder> {
    let mut ctx = context();
    ctx.set_settings(DrawSettings {
        collect_statistics: true,
        ..DrawSettings::default()
    });
    ctx.bind_geometry_shader(Some(gs));
    let prim = PrimInfo::linear(kind, 0, positions.len() as u32);
    ctx.draw(&prim, &vertices(positions)).unwrap();
    ctx
}

#[test]
fn gs_batching_is_deterministic() {
    let positions = triangles(7);
    let mut streams = vec![];
    for width in [1, 4, 16] {
        let gs = Passthrough::new(PrimKind::Triangles, PrimKind::TriangleStrip, 3)
            .with_width(width)
            .bind();
        let ctx = draw_with(gs, PrimKind::Triangles, &positions);
        let stats = ctx.statistics();
        assert_eq!(stats.gs_invocations, 7);
        assert_eq!(stats.gs_primitives, 7);

        let rec = ctx.into_backend();
        let stream: Vec<Vec<Vec<[f32; 4]>>> = rec
            .tris()
            .iter()
            .map(|t| t.verts.iter().map(|v| v.data.clone()).collect())
            .collect();
        streams.push(stream);
    }

    assert_eq!(streams[0].len(), 7);
    assert_eq!(streams[0], streams[1]);
    assert_eq!(streams[0], streams[2]);
}

#[test]
fn gs_primitive_ids_count_input_primitives() {
    let gs = Passthrough::new(PrimKind::Triangles, PrimKind::TriangleStrip, 3)
        .with_width(4)
        .bind();
    // A strip of five vertices is three triangles.
    let positions = &triangles(2)[..5];
    let rec = draw_with(gs, PrimKind::TriangleStrip, positions).into_backend();

    let ids: Vec<f32> = rec.tris().iter().map(|t| t.verts[0].data[1][0]).collect();
    assert_eq!(ids, vec![0.0, 1.0, 2.0]);
}

#[test]
fn gs_zero_output_vertices() {
    let gs = Passthrough::new(PrimKind::Triangles, PrimKind::TriangleStrip, 0).bind();
    let ctx = draw_with(gs, PrimKind::Triangles, &triangles(3));
    assert_eq!(ctx.statistics().gs_invocations, 3);
    assert_eq!(ctx.statistics().gs_primitives, 0);
    assert!(ctx.into_backend().prims.is_empty());
}

#[test]
fn gs_output_vertices_are_limited() {
    let gs = Passthrough::new(PrimKind::Triangles, PrimKind::Points, 2).bind();
    let rec = draw_with(gs, PrimKind::Triangles, &triangles(2)).into_backend();
    assert_eq!(rec.points().len(), 4);
}

#[test]
fn gs_lines_to_line_strips() {
    let gs = Passthrough::new(PrimKind::Lines, PrimKind::LineStrip, 2).bind();
    let rec = draw_with(
        gs,
        PrimKind::LineStrip,
        &[
            [0.0, 0.0, 0.0, 1.0],
            [0.5, 0.0, 0.0, 1.0],
            [0.5, 0.5, 0.0, 1.0],
        ],
    )
    .into_backend();
    assert_eq!(rec.lines().len(), 2);
}

#[test]
fn gs_adjacency_input() {
    let gs = Passthrough::new(PrimKind::TrianglesAdjacency, PrimKind::Points, 6).bind();
    let positions = [[0.0, 0.0, 0.0, 1.0]; 6];
    let rec = draw_with(gs, PrimKind::TrianglesAdjacency, &positions).into_backend();
    assert_eq!(rec.points().len(), 6);
}

#[test]
fn gs_validation() {
    let bind = |gs: Passthrough| GeometryShader::new(Box::new(gs)).map(|_| ());

    assert!(matches!(
        bind(Passthrough::new(PrimKind::TriangleStrip, PrimKind::Points, 1)),
        Err(DrawError::InvalidGeometryShader(_))
    ));
    assert!(matches!(
        bind(Passthrough::new(PrimKind::Triangles, PrimKind::Triangles, 1)),
        Err(DrawError::InvalidGeometryShader(_))
    ));
    assert!(matches!(
        bind(Passthrough::new(
            PrimKind::Triangles,
            PrimKind::Points,
            MAX_GS_OUTPUT_VERTICES + 1
        )),
        Err(DrawError::InvalidGeometryShader(_))
    ));
    assert!(matches!(
        bind(Passthrough::new(PrimKind::Triangles, PrimKind::Points, 1).with_width(0)),
        Err(DrawError::InvalidGeometryShader(_))
    ));
    assert!(matches!(
        bind(Passthrough::new(PrimKind::Triangles, PrimKind::Points, 1).with_width(17)),
        Err(DrawError::InvalidGeometryShader(_))
    ));

    let mut no_position = Passthrough::new(PrimKind::Triangles, PrimKind::Points, 1);
    no_position.info.outputs = ShaderInfo::from_slots([ShaderSlot::new(Semantic::Generic, 0)]);
    assert_eq!(bind(no_position), Err(DrawError::NoPositionOutput));

    assert!(bind(Passthrough::new(PrimKind::Points, PrimKind::TriangleStrip, 4)).is_ok());
}

#[test]
fn gs_primitive_kind_mismatch() {
    let mut ctx = context();
    ctx.bind_geometry_shader(Some(
        Passthrough::new(PrimKind::Triangles, PrimKind::Points, 3).bind(),
    ));
    let verts = vertices(&triangles(2));

    assert_eq!(
        ctx.draw(&PrimInfo::linear(PrimKind::Lines, 0, 6), &verts),
        Err(DrawError::PrimitiveMismatch {
            draw: PrimKind::Lines,
            shader: PrimKind::Triangles,
        })
    );
    assert_eq!(
        ctx.draw(&PrimInfo::linear(PrimKind::Quads, 0, 4), &verts),
        Err(DrawError::UnsupportedPrimitive(PrimKind::Quads))
    );
    assert!(ctx
        .draw(&PrimInfo::linear(PrimKind::TriangleFan, 0, 6), &verts)
        .is_ok());
}

#[test]
fn gs_backend_errors_abort_the_draw() {
    struct Failing(GsInfo);

    impl GeometryShaderBackend for Failing {
        fn info(&self) -> &GsInfo {
            &self.0
        }

        fn run(&mut self, _: &GsInputBatch, _: &mut GsEmitter) -> Result<(), DrawError> {
            Err(DrawError::ShaderInvocation("trap".into()))
        }
    }

    let info = Passthrough::new(PrimKind::Triangles, PrimKind::Points, 3).info;
    let mut ctx = context();
    ctx.bind_geometry_shader(Some(GeometryShader::new(Box::new(Failing(info))).unwrap()));
    assert_eq!(
        ctx.draw(
            &PrimInfo::linear(PrimKind::Triangles, 0, 3),
            &vertices(&triangles(1))
        ),
        Err(DrawError::ShaderInvocation("trap".into()))
    );
    assert!(ctx.into_backend().prims.is_empty());
}
