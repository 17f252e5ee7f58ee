// Copyright 2025 the Vello Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use core::ops::AddAssign;

/// Counters of the work done by the pipeline.
///
/// Only accumulated while [`DrawSettings::collect_statistics`](crate::DrawSettings) is set.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PipelineStatistics {
    /// Vertices read by the input assembler.
    pub ia_vertices: u64,
    /// Primitives read by the input assembler.
    pub ia_primitives: u64,
    /// Geometry shader invocations, one per input primitive.
    pub gs_invocations: u64,
    /// Primitives emitted by the geometry shader.
    pub gs_primitives: u64,
    /// Primitives entering the clipper.
    pub c_invocations: u64,
    /// Primitives leaving the clipper.
    pub c_primitives: u64,
}

impl AddAssign for PipelineStatistics {
    fn add_assign(&mut self, rhs: Self) {
        self.ia_vertices += rhs.ia_vertices;
        self.ia_primitives += rhs.ia_primitives;
        self.gs_invocations += rhs.gs_invocations;
        self.gs_primitives += rhs.gs_primitives;
        self.c_invocations += rhs.c_invocations;
        self.c_primitives += rhs.c_primitives;
    }
}
