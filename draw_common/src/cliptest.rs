// Copyright 2025 the Vello Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The per-vertex clip test run on the output of the last shader stage.
//!
//! The test fills in the vertex header (clip mask, clip-space positions, edge flag) and
//! replaces the position output of every vertex that doesn't need clipping by its window
//! coordinates. Vertices that do need clipping keep their clip-space position, the clip
//! stage reprojects the vertices it synthesizes from `pre_clip_pos`.

use crate::plane::{
    user_plane_bit, PlaneSet, CLIP_XY_MASK, FRUSTUM_PLANES, MAX_USER_PLANES, NUM_FRUSTUM_PLANES,
    PLANE_FAR, PLANE_NEAR,
};
use crate::shader::ShaderInfo;
use crate::vertex::{ShadedVertex, VertexInfo};
use crate::viewport::{viewport_index_from_bits, Viewport};

/// Which planes the clip test checks.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ClipTestFlags {
    /// Test against the four X/Y frustum planes.
    pub clip_xy: bool,
    /// Test against the near and far planes.
    pub clip_z: bool,
    /// Bit `i` enables user plane `i`.
    pub clip_user: u32,
    /// Vertices that are only outside of X/Y planes still get window coordinates, so that
    /// points can be scissored by the rasterizer instead.
    pub guard_band_xy: bool,
}

impl ClipTestFlags {
    /// Whether any plane is tested at all.
    pub fn any(self) -> bool {
        self.clip_xy || self.clip_z || self.enabled_user_planes() != 0
    }

    /// The enabled user planes, restricted to the planes that exist.
    #[inline]
    pub fn enabled_user_planes(self) -> u32 {
        self.clip_user & ((1 << MAX_USER_PLANES) - 1)
    }
}

/// Run the clip test over all vertices.
///
/// Returns whether any vertex is outside of an enabled plane. Does nothing and returns
/// `false` if `outputs` has no position.
pub fn clip_test(
    verts: &mut VertexInfo,
    outputs: &ShaderInfo,
    planes: &PlaneSet,
    viewports: &[Viewport],
    flags: ClipTestFlags,
) -> bool {
    let Some(pos) = outputs.position() else {
        return false;
    };

    let mut need_pipeline = false;
    for vert in &mut verts.verts {
        test_vertex(vert, pos, outputs, planes, viewports, flags);
        need_pipeline |= vert.clipmask != 0;
    }
    need_pipeline
}

fn test_vertex(
    vert: &mut ShadedVertex,
    pos: usize,
    outputs: &ShaderInfo,
    planes: &PlaneSet,
    viewports: &[Viewport],
    flags: ClipTestFlags,
) {
    let Some(&position) = vert.data.get(pos) else {
        // Nothing to test against, and whatever mask the caller left must not reach the
        // clipper.
        vert.clipmask = 0;
        return;
    };
    vert.clip = position;
    vert.pre_clip_pos = position;
    vert.have_clipdist = outputs.has_clip_distance();
    vert.edgeflag = outputs
        .edgeflag()
        .and_then(|ef| vert.data.get(ef))
        .map_or(true, |ef| ef[0] != 0.0);

    let mut mask = 0;

    if flags.clip_xy {
        for (bit, plane) in FRUSTUM_PLANES[..4].iter().enumerate() {
            if plane.distance(&position) < 0.0 {
                mask |= 1 << bit;
            }
        }
    }

    if flags.clip_z {
        if planes.get(4).distance(&position) < 0.0 {
            mask |= PLANE_NEAR;
        }
        if planes.get(5).distance(&position) < 0.0 {
            mask |= PLANE_FAR;
        }
    }

    let clip_vertex = outputs
        .clip_vertex()
        .and_then(|cv| vert.data.get(cv))
        .copied()
        .unwrap_or(position);

    let mut user = flags.enabled_user_planes();
    while user != 0 {
        let i = user.trailing_zeros() as usize;
        user &= user - 1;

        let outside = if vert.have_clipdist {
            let dist = outputs
                .clip_distance(i / 4)
                .and_then(|cd| vert.data.get(cd))
                .map_or(0.0, |cd| cd[i % 4]);
            dist.is_nan() || dist < 0.0
        } else {
            planes.get(NUM_FRUSTUM_PLANES + i).distance(&clip_vertex) < 0.0
        };
        if outside {
            mask |= user_plane_bit(i);
        }
    }

    vert.clipmask = mask;

    let w = position[3];
    let guard_band_only = flags.guard_band_xy && mask & !CLIP_XY_MASK == 0 && w > 0.0;
    if mask == 0 || guard_band_only {
        let vp = outputs
            .viewport_index()
            .and_then(|vi| vert.data.get(vi))
            .map_or(0, |vi| viewport_index_from_bits(vi[0].to_bits()));
        let viewport = viewports
            .get(vp)
            .or_else(|| viewports.first())
            .copied()
            .unwrap_or_default();
        vert.data[pos] = viewport.map(&position);
    }
}
