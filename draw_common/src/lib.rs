// Copyright 2025 the Vello Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! This crate includes the data model and the pure tables shared by every stage of the
//! [draw pipeline][draw_pipe]: shaded vertices, clip planes, primitive kinds and their
//! decomposition, shader reflection records and viewports.
//!
//! # Usage
//!
//! This crate should not be used on its own, and you should instead use the pipeline which
//! uses it. The types are public so that rasterizer backends and shader backends plugged into
//! [draw_pipe] can consume and produce them.
//!
//! # Features
//!
//! - `std` (enabled by default): Use the standard library.
//!   Without it the crate only needs `core` and `alloc`.
//!
//! # Contents
//!
//! - [`ShadedVertex`][vertex::ShadedVertex], the vertex record that flows through the pipeline.
//! - Frustum and user [clip planes][plane] and the per-vertex [clip test][cliptest].
//! - [Primitive kinds][prim::PrimKind], [primitive headers][prim::PrimHeader] and the
//!   [decomposition table][decompose] that splits strips, fans and loops into
//!   points, lines and triangles.
//! - [Shader reflection][shader] records for the stages feeding the pipeline.
//!
//! [draw_pipe]: https://docs.rs/draw_pipe
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
#![no_std]

extern crate alloc;
#[cfg(feature = "std")]
extern crate std;

pub mod cliptest;
pub mod decompose;
pub mod math;
pub mod plane;
pub mod prim;
pub mod shader;
pub mod vertex;
pub mod viewport;

pub use smallvec;
