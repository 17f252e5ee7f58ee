// Copyright 2025 the Vello Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! This crate contains the test harness for `draw_pipe`.
//! - The `util` module contains the recording rasterizer and vertex builders shared by the
//!   different test modules.
//! - We do not use the default Rust test harness, but instead use this `mod.rs` file as the
//!   entry point to run all other tests, so that the utilities only need to be defined once.
//! - If you want to add new tests, put them into the module of the stage they exercise, and
//!   start the test name with the topic, e.g. `clip_near_plane` instead of `near_plane_clip`.

#![allow(missing_docs)]
#![allow(clippy::cast_possible_truncation)]

mod assembler;
mod gs;
mod util;
