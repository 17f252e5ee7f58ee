// Copyright 2025 the Vello Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! This crate implements a software geometry pipeline: everything that happens to shaded
//! vertices between the last shader stage and the rasterizer.
//!
//! A [`DrawContext`] takes a primitive stream over the outputs of a vertex shader, runs the
//! optional [geometry shader][GeometryShader] over it, assembles per-primitive values the
//! fragment shader needs, clips the primitives against the view volume and the user clip
//! planes, culls them by facing, and hands the survivors to a [`Rasterizer`] one at a time.
//!
//! # Usage
//!
//! Implement [`Rasterizer`] for your backend, describe the vertex shader outputs with a
//! [`ShaderInfo`](draw_common::shader::ShaderInfo), then draw:
//!
//! ```
//! use draw_pipe::draw_common::prim::{PrimHeader, PrimInfo, PrimKind};
//! use draw_pipe::draw_common::shader::{Semantic, ShaderInfo, ShaderSlot};
//! use draw_pipe::draw_common::vertex::{ShadedVertex, VertexInfo};
//! use draw_pipe::{DrawContext, Rasterizer};
//!
//! #[derive(Default)]
//! struct Counter(usize);
//!
//! impl Rasterizer for Counter {
//!     fn point(&mut self, _: &PrimHeader<'_>) {}
//!     fn line(&mut self, _: &PrimHeader<'_>) {}
//!     fn tri(&mut self, _: &PrimHeader<'_>) {
//!         self.0 += 1;
//!     }
//! }
//!
//! let mut ctx = DrawContext::new(Counter::default());
//! ctx.set_vertex_shader_outputs(ShaderInfo::from_slots([ShaderSlot::new(
//!     Semantic::Position,
//!     0,
//! )]));
//!
//! let verts = VertexInfo::from_vertices(vec![
//!     ShadedVertex::from_attributes([[-0.5, -0.5, 0.0, 1.0]]),
//!     ShadedVertex::from_attributes([[0.5, -0.5, 0.0, 1.0]]),
//!     ShadedVertex::from_attributes([[0.0, 0.5, 0.0, 1.0]]),
//! ]);
//! ctx.draw(&PrimInfo::linear(PrimKind::Triangles, 0, 3), &verts)
//!     .unwrap();
//! assert_eq!(ctx.into_backend().0, 1);
//! ```
//!
//! Primitives that become degenerate or non-finite while clipping are dropped silently,
//! only structural problems with a draw are reported as a [`DrawError`].

// LINEBENDER LINT SET - lib.rs - v3
// See https://linebender.org/wiki/canonical-lints/
// These lints shouldn't apply to examples or tests.
#![cfg_attr(not(test), warn(unused_crate_dependencies))]
// These lints shouldn't apply to examples.
#![warn(clippy::print_stdout, clippy::print_stderr)]
// Targeting e.g. 32-bit means structs containing usize can give false positives for 64-bit.
#![cfg_attr(target_pointer_width = "64", warn(clippy::trivially_copy_pass_by_ref))]
// END LINEBENDER LINT SET
#![cfg_attr(docsrs, feature(doc_cfg))]
#![forbid(unsafe_code)]

mod assembler;
mod clip;
mod context;
mod cull;
mod error;
mod gs;
mod pipeline;
mod stage;
mod state;
mod stats;

pub use context::DrawContext;
pub use error::DrawError;
pub use gs::{
    GeometryShader, GeometryShaderBackend, GsEmitter, GsInfo, GsInputBatch, GsLane,
    MAX_GS_OUTPUT_VERTICES, MAX_GS_VECTOR_WIDTH,
};
pub use stage::Rasterizer;
pub use state::{CullFace, DrawSettings, DrawState, RasterizerState};
pub use stats::PipelineStatistics;

pub use draw_common;
