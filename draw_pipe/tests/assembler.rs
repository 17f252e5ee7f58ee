// Copyright 2025 the Vello Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Tests for the primitive assembler.

use crate::util::{context, draw, vertices};
use draw_pipe::draw_common::prim::{PrimInfo, PrimKind};
use draw_pipe::draw_common::shader::{
    FragmentInput, FragmentShaderInfo, Interpolation, Semantic, ShaderInfo, ShaderSlot,
};
use draw_pipe::RasterizerState;

fn fs_reading(semantic: Semantic) -> FragmentShaderInfo {
    FragmentShaderInfo::new([
        FragmentInput {
            slot: ShaderSlot::new(Semantic::Generic, 0),
            interpolation: Interpolation::Perspective,
        },
        FragmentInput {
            slot: ShaderSlot::new(semantic, 0),
            interpolation: Interpolation::Constant,
        },
    ])
}

const CCW: [[f32; 4]; 3] = [
    [-0.5, -0.5, 0.0, 1.0],
    [0.5, -0.5, 0.0, 1.0],
    [0.0, 0.5, 0.0, 1.0],
];

const CW: [[f32; 4]; 3] = [CCW[0], CCW[2], CCW[1]];

#[test]
fn assembler_injects_primitive_ids() {
    let mut ctx = context();
    ctx.set_fragment_shader(Some(fs_reading(Semantic::PrimitiveId)));
    draw(
        &mut ctx,
        PrimKind::TriangleStrip,
        &[
            [-0.5, -0.5, 0.0, 1.0],
            [0.5, -0.5, 0.0, 1.0],
            [-0.5, 0.0, 0.0, 1.0],
            [0.5, 0.0, 0.0, 1.0],
            [-0.5, 0.5, 0.0, 1.0],
        ],
    );

    assert_eq!(
        ctx.state().outputs.find(Semantic::PrimitiveId, 0),
        Some(2)
    );
    let rec = ctx.into_backend();
    let tris = rec.tris();
    assert_eq!(tris.len(), 3);
    for (id, tri) in tris.iter().enumerate() {
        for v in &tri.verts {
            assert_eq!(v.data[2], [f32::from_bits(id as u32); 4]);
            assert_eq!(v.data[2][0].to_bits(), id as u32);
        }
    }
}

#[test]
fn assembler_primitive_ids_restart_every_draw() {
    let mut ctx = context();
    ctx.set_fragment_shader(Some(fs_reading(Semantic::PrimitiveId)));
    draw(&mut ctx, PrimKind::Triangles, &CCW);
    draw(&mut ctx, PrimKind::Triangles, &CCW);

    let rec = ctx.into_backend();
    let ids: Vec<u32> = rec.tris().iter().map(|t| t.verts[0].data[2][0].to_bits()).collect();
    assert_eq!(ids, vec![0, 0]);
}

#[test]
fn assembler_keeps_written_primitive_ids() {
    let mut ctx = context();
    ctx.set_vertex_shader_outputs(ShaderInfo::from_slots([
        ShaderSlot::new(Semantic::Position, 0),
        ShaderSlot::new(Semantic::PrimitiveId, 0),
    ]));
    ctx.set_fragment_shader(Some(fs_reading(Semantic::PrimitiveId)));
    draw(&mut ctx, PrimKind::Triangles, &CCW);

    let rec = ctx.into_backend();
    let tri = &rec.tris()[0];
    // The vertex shader wrote the vertex index there.
    assert_eq!(tri.verts[1].data.len(), 2);
    assert_eq!(tri.verts[1].data[1], [1.0; 4]);
}

#[test]
fn assembler_front_face() {
    let mut ctx = context();
    ctx.set_fragment_shader(Some(fs_reading(Semantic::FrontFace)));
    draw(&mut ctx, PrimKind::Triangles, &CCW);
    draw(&mut ctx, PrimKind::Triangles, &CW);

    let rec = ctx.into_backend();
    let faces: Vec<f32> = rec.tris().iter().map(|t| t.verts[0].data[2][0]).collect();
    // With the default viewport, y points down in window space.
    assert_eq!(faces, vec![0.0, 1.0]);
}

#[test]
fn assembler_front_face_follows_winding_convention() {
    let mut ctx = context();
    ctx.set_rasterizer_state(RasterizerState {
        front_ccw: false,
        ..RasterizerState::default()
    });
    ctx.set_fragment_shader(Some(fs_reading(Semantic::FrontFace)));
    draw(&mut ctx, PrimKind::Triangles, &CCW);

    let rec = ctx.into_backend();
    assert_eq!(rec.tris()[0].verts[0].data[2][0], 1.0);
}

#[test]
fn assembler_drops_adjacency() {
    let mut ctx = context();
    let positions: Vec<[f32; 4]> = (0..6)
        .map(|i| {
            let a = i as f32 * core::f32::consts::PI / 3.0;
            [0.5 * a.cos(), 0.5 * a.sin(), 0.0, 1.0]
        })
        .collect();
    draw(&mut ctx, PrimKind::TrianglesAdjacency, &positions);

    let rec = ctx.into_backend();
    let tris = rec.tris();
    assert_eq!(tris.len(), 1);
    let ids: Vec<u32> = tris[0].verts.iter().map(|v| v.vertex_id).collect();
    assert_eq!(ids, vec![0, 2, 4]);
}

#[test]
fn assembler_line_strip_adjacency() {
    let mut ctx = context();
    let verts = vertices(&[
        [-0.5, 0.0, 0.0, 1.0],
        [-0.25, 0.0, 0.0, 1.0],
        [0.0, 0.0, 0.0, 1.0],
        [0.25, 0.0, 0.0, 1.0],
        [0.5, 0.0, 0.0, 1.0],
    ]);
    ctx.draw(&PrimInfo::linear(PrimKind::LineStripAdjacency, 0, 5), &verts)
        .unwrap();

    let rec = ctx.into_backend();
    let ids: Vec<Vec<u32>> = rec
        .lines()
        .iter()
        .map(|l| l.verts.iter().map(|v| v.vertex_id).collect())
        .collect();
    assert_eq!(ids, vec![vec![1, 2], vec![2, 3]]);
}

#[test]
fn assembler_not_needed_without_fragment_reads() {
    let mut ctx = context();
    draw(&mut ctx, PrimKind::Triangles, &CCW);
    assert_eq!(ctx.state().outputs.num_outputs(), 2);
    let rec = ctx.into_backend();
    assert_eq!(rec.tris()[0].verts[0].data.len(), 2);
}
