// Copyright 2025 the Vello Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The face culling stage.

use crate::stage::{Stage, StageChain};
use crate::state::CullFace;
use draw_common::prim::PrimHeader;
use log::trace;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Dispatch {
    First,
    Ready {
        position: usize,
        cull_face: CullFace,
        front_ccw: bool,
    },
}

/// Drops triangles by facing, and records the determinant of the ones it keeps.
#[derive(Debug)]
pub(crate) struct CullStage {
    dispatch: Dispatch,
}

impl CullStage {
    pub(crate) fn new() -> Self {
        Self {
            dispatch: Dispatch::First,
        }
    }
}

/// The signed area of a triangle in window coordinates.
///
/// Negative for counter-clockwise triangles.
pub(crate) fn window_det(p0: &[f32; 4], p1: &[f32; 4], p2: &[f32; 4]) -> f32 {
    let ex = p0[0] - p2[0];
    let ey = p0[1] - p2[1];
    let fx = p1[0] - p2[0];
    let fy = p1[1] - p2[1];
    ex * fy - ey * fx
}

impl Stage for CullStage {
    fn point(&mut self, header: &PrimHeader<'_>, next: &mut StageChain<'_>) {
        next.point(header);
    }

    fn line(&mut self, header: &PrimHeader<'_>, next: &mut StageChain<'_>) {
        next.line(header);
    }

    fn tri(&mut self, header: &PrimHeader<'_>, next: &mut StageChain<'_>) {
        let (position, cull_face, front_ccw) = match self.dispatch {
            Dispatch::Ready {
                position,
                cull_face,
                front_ccw,
            } => (position, cull_face, front_ccw),
            Dispatch::First => {
                let state = next.state();
                // Without a position there is nothing to rasterize either.
                let Some(position) = state.outputs.position() else {
                    return;
                };
                let cull_face = state.rasterizer.cull_face;
                let front_ccw = state.rasterizer.front_ccw;
                self.dispatch = Dispatch::Ready {
                    position,
                    cull_face,
                    front_ccw,
                };
                (position, cull_face, front_ccw)
            }
        };

        let [v0, v1, v2] = header.v;
        let (Some(p0), Some(p1), Some(p2)) = (
            v0.data.get(position),
            v1.data.get(position),
            v2.data.get(position),
        ) else {
            return;
        };

        let det = window_det(p0, p1, p2);
        if det == 0.0 || det.is_nan() {
            trace!("cull: dropping zero-area triangle");
            return;
        }

        let ccw = det < 0.0;
        let front = ccw == front_ccw;
        if !cull_face.culls(front) {
            let mut tri = *header;
            tri.det = det;
            next.tri(&tri);
        }
    }

    fn flush(&mut self, next: &mut StageChain<'_>) {
        self.dispatch = Dispatch::First;
        next.flush();
    }
}
