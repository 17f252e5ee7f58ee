// Copyright 2025 the Vello Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The clip stage.
//!
//! Triangles are clipped with a Sutherland-Hodgman pass per plane the primitive crosses,
//! the resulting convex polygon is fanned back into triangles. Lines are clipped
//! parametrically and points are either kept or dropped.
//!
//! Problems with single primitives (NaN distances, running out of scratch vertices) are
//! never reported, the primitive is dropped instead.

use crate::stage::{Stage, StageChain};
use crate::state::DrawState;
use draw_common::math::{different_signs, interp_attr, is_inf_or_nan};
use draw_common::plane::{
    is_user_plane, CLIP_ALL_MASK, CLIP_XY_MASK, MAX_PLANES, NUM_FRUSTUM_PLANES,
};
use draw_common::prim::PrimHeader;
use draw_common::shader::{Interpolation, Semantic};
use draw_common::vertex::{ShadedVertex, UNDEFINED_VERTEX_ID};
use draw_common::viewport::Viewport;
use log::{debug, trace, warn};
use smallvec::SmallVec;
use static_assertions::const_assert;
use std::mem;

/// The maximum number of vertices a polygon can have while it is being clipped.
///
/// Every plane adds at most one vertex to a convex polygon, plus room for closing it.
pub(crate) const MAX_CLIPPED_VERTICES: usize = 2 * MAX_PLANES + 1;

/// One extra scratch vertex for the provoking vertex copy.
const NUM_TMP_VERTICES: usize = MAX_CLIPPED_VERTICES + 1;

// Scratch vertices are addressed with `u8`.
const_assert!(NUM_TMP_VERTICES <= u8::MAX as usize);

/// A vertex of the polygon being clipped.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum PolyVert {
    /// A vertex of the incoming primitive.
    Orig(u8),
    /// A scratch vertex produced by the clipper.
    Tmp(u8),
}

#[inline]
fn resolve<'a>(
    orig: &[&'a ShadedVertex; 3],
    tmp: &'a [ShadedVertex],
    v: PolyVert,
) -> &'a ShadedVertex {
    match v {
        PolyVert::Orig(i) => orig[i as usize],
        PolyVert::Tmp(i) => &tmp[i as usize],
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum AttribMode {
    Position,
    Perspective,
    NoPerspective,
    Flat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum PointClip {
    Plain,
    GuardBandXy,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Dispatch {
    /// The interpolation state has to be derived before the next primitive.
    First,
    Ready(PointClip),
}

/// How every attribute is carried over to synthesized vertices.
#[derive(Debug, Default)]
struct InterpState {
    modes: SmallVec<[AttribMode; 32]>,
    flat: SmallVec<[usize; 16]>,
    has_noperspective: bool,
    position: Option<usize>,
    clip_vertex: Option<usize>,
    clip_distance: [Option<usize>; 2],
}

impl InterpState {
    fn init(&mut self, state: &DrawState) {
        let outputs = &state.outputs;
        let fs = state.fragment.as_ref();

        let default_color = if state.rasterizer.flatshade {
            Interpolation::Constant
        } else {
            Interpolation::Perspective
        };
        let mut colors = [default_color; 2];
        for input in fs.iter().flat_map(|fs| fs.inputs.iter()) {
            if input.slot.semantic == Semantic::Color && input.interpolation != Interpolation::Color
            {
                if let Some(c) = colors.get_mut(input.slot.index as usize) {
                    *c = input.interpolation;
                }
            }
        }

        self.modes.clear();
        self.flat.clear();
        self.position = outputs.position();
        self.clip_vertex = outputs.clip_vertex();
        self.clip_distance = [outputs.clip_distance(0), outputs.clip_distance(1)];

        for (i, slot) in outputs.slots().iter().enumerate() {
            if Some(i) == self.position {
                self.modes.push(AttribMode::Position);
                continue;
            }
            let interpolation = match slot.semantic {
                Semantic::Color | Semantic::BackColor => colors
                    .get(slot.index as usize)
                    .copied()
                    .unwrap_or(default_color),
                // Integer bits, interpolating them would select a layer or viewport that
                // no input vertex has.
                Semantic::Layer | Semantic::ViewportIndex => Interpolation::Constant,
                _ => match fs.and_then(|fs| fs.find(slot.semantic, slot.index)) {
                    Some(input) if input.interpolation == Interpolation::Color => default_color,
                    Some(input) => input.interpolation,
                    None => Interpolation::Perspective,
                },
            };
            let mode = match interpolation {
                Interpolation::Constant => {
                    self.flat.push(i);
                    AttribMode::Flat
                }
                Interpolation::Linear => AttribMode::NoPerspective,
                Interpolation::Perspective | Interpolation::Color => AttribMode::Perspective,
            };
            self.modes.push(mode);
        }
        self.has_noperspective = self.modes.contains(&AttribMode::NoPerspective);

        debug!(
            "clip: {} flat and {} noperspective attributes",
            self.flat.len(),
            self.modes
                .iter()
                .filter(|m| **m == AttribMode::NoPerspective)
                .count()
        );
    }

    /// The signed distance of `vert` to the plane with the given index.
    fn clip_dist(&self, state: &DrawState, vert: &ShadedVertex, plane_idx: usize) -> f32 {
        if !is_user_plane(plane_idx) {
            return state.planes.get(plane_idx).distance(&vert.clip);
        }

        let i = plane_idx - NUM_FRUSTUM_PLANES;
        if vert.have_clipdist {
            return self.clip_distance[i / 4]
                .and_then(|cd| vert.data.get(cd))
                .map_or(0.0, |cd| cd[i % 4]);
        }
        let pos = self
            .clip_vertex
            .and_then(|cv| vert.data.get(cv))
            .unwrap_or(&vert.clip);
        state.planes.get(plane_idx).distance(pos)
    }

    /// Fill `dst` with the vertex at `t` on the way from `out` to `in_`.
    fn interp(
        &self,
        dst: &mut ShadedVertex,
        t: f32,
        out: &ShadedVertex,
        in_: &ShadedVertex,
        viewport: &Viewport,
    ) {
        dst.clipmask = 0;
        dst.edgeflag = false;
        dst.have_clipdist = in_.have_clipdist;
        dst.vertex_id = UNDEFINED_VERTEX_ID;

        interp_attr(&mut dst.clip, t, &in_.clip, &out.clip);
        interp_attr(&mut dst.pre_clip_pos, t, &in_.pre_clip_pos, &out.pre_clip_pos);

        let t_nopersp = if self.has_noperspective {
            noperspective_t(t, &dst.clip, &out.clip, &in_.clip)
        } else {
            t
        };

        dst.data.clear();
        dst.data.resize(in_.data.len(), [0.0; 4]);
        for (j, attr) in dst.data.iter_mut().enumerate() {
            let (Some(i), Some(o)) = (in_.data.get(j), out.data.get(j)) else {
                continue;
            };
            match self.modes.get(j).copied().unwrap_or(AttribMode::Perspective) {
                AttribMode::Position => {}
                AttribMode::Flat => *attr = *i,
                AttribMode::NoPerspective => interp_attr(attr, t_nopersp, i, o),
                AttribMode::Perspective => interp_attr(attr, t, i, o),
            }
        }

        if let Some(attr) = self.position.and_then(|pos| dst.data.get_mut(pos)) {
            *attr = viewport.map(&dst.pre_clip_pos);
        }
    }

    fn copy_flat(&self, dst: &mut ShadedVertex, src: &ShadedVertex) {
        for &i in &self.flat {
            if let (Some(d), Some(s)) = (dst.data.get_mut(i), src.data.get(i)) {
                *d = *s;
            }
        }
    }

    /// Whether the triangle has exactly zero area in window space.
    fn is_tri_null(&self, v: &[&ShadedVertex; 3]) -> bool {
        let Some(pos) = self.position else {
            return false;
        };
        let (Some(p0), Some(p1), Some(p2)) = (
            v[0].data.get(pos),
            v[1].data.get(pos),
            v[2].data.get(pos),
        ) else {
            return false;
        };

        let x1 = p1[0] - p0[0];
        let y1 = p1[1] - p0[1];
        let z1 = p1[2] - p0[2];
        let x2 = p2[0] - p0[0];
        let y2 = p2[1] - p0[1];
        let z2 = p2[2] - p0[2];

        let vx = y1 * z2 - z1 * y2;
        let vy = x1 * z2 - z1 * x2;
        let vz = x1 * y2 - y1 * x2;

        vx * vx + vy * vy + vz * vz == 0.0
    }
}

/// The interpolation parameter in screen space, for attributes that are interpolated
/// without perspective correction.
///
/// Falls back to `t` if both vertices have the same X and Y.
fn noperspective_t(t: f32, dst: &[f32; 4], out: &[f32; 4], in_: &[f32; 4]) -> f32 {
    for k in 0..2 {
        if in_[k] != out[k] {
            let in_coord = in_[k] / in_[3];
            let out_coord = out[k] / out[3];
            let dst_coord = dst[k] / dst[3];
            return (dst_coord - out_coord) / (in_coord - out_coord);
        }
    }
    t
}

/// The guard band test for points: only X/Y planes may be crossed, and the point must
/// have a usable position.
fn guard_band_keeps(v: &ShadedVertex) -> bool {
    let mask = v.clipmask;
    if mask == 0 {
        return true;
    }
    if mask & !CLIP_XY_MASK != 0 {
        return false;
    }
    v.clip[3] > 0.0 && !is_inf_or_nan(v.clip[0]) && !is_inf_or_nan(v.clip[1])
}

/// The clip stage.
#[derive(Debug)]
pub(crate) struct ClipStage {
    dispatch: Dispatch,
    interp: InterpState,
    tmp: Vec<ShadedVertex>,
}

impl ClipStage {
    pub(crate) fn new() -> Self {
        Self {
            dispatch: Dispatch::First,
            interp: InterpState::default(),
            tmp: (0..NUM_TMP_VERTICES)
                .map(|_| ShadedVertex::default())
                .collect(),
        }
    }

    fn ensure_ready(&mut self, state: &DrawState) -> PointClip {
        match self.dispatch {
            Dispatch::Ready(points) => points,
            Dispatch::First => {
                self.interp.init(state);
                let points = if state.settings.guard_band_points_xy {
                    PointClip::GuardBandXy
                } else {
                    PointClip::Plain
                };
                self.dispatch = Dispatch::Ready(points);
                points
            }
        }
    }

    fn do_clip_tri(&mut self, header: &PrimHeader<'_>, clipmask: u32, next: &mut StageChain<'_>) {
        let state = next.state();
        let provoking = state.provoking_vertex(3);
        let viewport = state.viewport_for(header.v[provoking]);

        let mut a = [PolyVert::Orig(0); MAX_CLIPPED_VERTICES];
        let mut b = a;
        let mut a_edges = [false; MAX_CLIPPED_VERTICES];
        let mut b_edges = a_edges;
        let (mut inlist, mut outlist) = (&mut a, &mut b);
        let (mut in_edges, mut out_edges) = (&mut a_edges, &mut b_edges);

        inlist[0] = PolyVert::Orig(0);
        inlist[1] = PolyVert::Orig(1);
        inlist[2] = PolyVert::Orig(2);
        // Per-vertex edge flags are applied by the backend, here only the boundary edges
        // of the decomposed primitive matter.
        in_edges[0] = header.flags & PrimHeader::EDGE_FLAG_0 != 0;
        in_edges[1] = header.flags & PrimHeader::EDGE_FLAG_1 != 0;
        in_edges[2] = header.flags & PrimHeader::EDGE_FLAG_2 != 0;

        let mut n = 3;
        let mut tmpnr = 0;
        let mut planes = clipmask;

        while planes != 0 && n >= 3 {
            let plane_idx = planes.trailing_zeros() as usize;
            planes &= planes - 1;
            let is_user = is_user_plane(plane_idx);

            if n >= MAX_CLIPPED_VERTICES {
                warn!("clip: polygon exceeds {MAX_CLIPPED_VERTICES} vertices, dropping triangle");
                return;
            }
            inlist[n] = inlist[0];
            in_edges[n] = in_edges[0];

            let mut vert_prev = inlist[0];
            let mut edge_prev = in_edges[0];
            let mut dp_prev = self.interp.clip_dist(
                state,
                resolve(&header.v, &self.tmp, vert_prev),
                plane_idx,
            );
            if is_inf_or_nan(dp_prev) {
                trace!("clip: non-finite distance to plane {plane_idx}, dropping triangle");
                return;
            }

            let mut outcount = 0;
            for i in 1..=n {
                let vert = inlist[i];
                let edge = in_edges[i];
                let dp = self
                    .interp
                    .clip_dist(state, resolve(&header.v, &self.tmp, vert), plane_idx);
                if is_inf_or_nan(dp) {
                    trace!("clip: non-finite distance to plane {plane_idx}, dropping triangle");
                    return;
                }

                if dp_prev >= 0.0 {
                    if outcount + 1 >= MAX_CLIPPED_VERTICES {
                        warn!("clip: out of polygon vertices, dropping triangle");
                        return;
                    }
                    out_edges[outcount] = edge_prev;
                    outlist[outcount] = vert_prev;
                    outcount += 1;
                }

                if different_signs(dp, dp_prev) {
                    if tmpnr >= NUM_TMP_VERTICES || outcount + 1 >= MAX_CLIPPED_VERTICES {
                        warn!("clip: out of scratch vertices, dropping triangle");
                        return;
                    }
                    let slot = tmpnr;
                    tmpnr += 1;

                    let mut new_vert = mem::take(&mut self.tmp[slot]);
                    let new_edge;
                    if dp < 0.0 {
                        // Going out. `dp != dp_prev`, so the division is safe.
                        let t = dp / (dp - dp_prev);
                        self.interp.interp(
                            &mut new_vert,
                            t,
                            resolve(&header.v, &self.tmp, vert),
                            resolve(&header.v, &self.tmp, vert_prev),
                            viewport,
                        );
                        // Cuts along user planes are visible edges, cuts along the
                        // frustum are not.
                        if is_user {
                            new_edge = true;
                            new_vert.edgeflag = true;
                        } else {
                            new_edge = edge_prev;
                            new_vert.edgeflag = false;
                        }
                    } else {
                        // Coming back in.
                        let t = dp_prev / (dp_prev - dp);
                        let prev = resolve(&header.v, &self.tmp, vert_prev);
                        self.interp.interp(
                            &mut new_vert,
                            t,
                            prev,
                            resolve(&header.v, &self.tmp, vert),
                            viewport,
                        );
                        new_vert.edgeflag = prev.edgeflag;
                        new_edge = edge_prev;
                    }
                    self.tmp[slot] = new_vert;

                    out_edges[outcount] = new_edge;
                    outlist[outcount] = PolyVert::Tmp(slot as u8);
                    outcount += 1;
                }

                vert_prev = vert;
                edge_prev = edge;
                dp_prev = dp;
            }

            mem::swap(&mut inlist, &mut outlist);
            mem::swap(&mut in_edges, &mut out_edges);
            n = outcount;
        }

        if n < 3 {
            return;
        }

        // The fan below provokes with the first polygon vertex, which has to carry the
        // flat attributes of the original provoking vertex.
        if !self.interp.flat.is_empty() && inlist[0] != PolyVert::Orig(provoking as u8) {
            if tmpnr >= NUM_TMP_VERTICES {
                warn!("clip: out of scratch vertices, dropping triangle");
                return;
            }
            let slot = tmpnr;
            let mut dup = mem::take(&mut self.tmp[slot]);
            dup.copy_from(resolve(&header.v, &self.tmp, inlist[0]));
            dup.vertex_id = UNDEFINED_VERTEX_ID;
            self.interp.copy_flat(&mut dup, header.v[provoking]);
            self.tmp[slot] = dup;
            inlist[0] = PolyVert::Tmp(slot as u8);
        }

        self.emit_poly(header, &inlist[..n], &in_edges[..n], next);
    }

    /// Fan the clipped polygon into triangles.
    fn emit_poly(
        &self,
        header: &PrimHeader<'_>,
        inlist: &[PolyVert],
        edgeflags: &[bool],
        next: &mut StageChain<'_>,
    ) {
        let n = inlist.len();
        let flatshade_first = next.state().rasterizer.flatshade_first;

        let (mut edge_first, edge_middle, edge_last) = if flatshade_first {
            (
                PrimHeader::EDGE_FLAG_0,
                PrimHeader::EDGE_FLAG_1,
                PrimHeader::EDGE_FLAG_2,
            )
        } else {
            (
                PrimHeader::EDGE_FLAG_2,
                PrimHeader::EDGE_FLAG_0,
                PrimHeader::EDGE_FLAG_1,
            )
        };
        if !edgeflags[0] {
            edge_first = 0;
        }

        let v = |i: usize| resolve(&header.v, &self.tmp, inlist[i]);
        let mut tri_was_not_null = false;
        let mut last_tri_was_null = false;

        for i in 2..n {
            let mut flags = if i == 2 {
                PrimHeader::RESET_STIPPLE | edge_first | edge_middle
            } else {
                edge_middle
            };

            // Keep the provoking vertex where the convention expects it.
            let verts = if flatshade_first {
                [v(0), v(i - 1), v(i)]
            } else {
                [v(i - 1), v(i), v(0)]
            };

            // Only the first of a run of zero-area triangles is emitted, and none after a
            // triangle with an area.
            let tri_null = self.interp.is_tri_null(&verts);
            if (tri_was_not_null || last_tri_was_null) && tri_null {
                last_tri_was_null = tri_null;
                continue;
            }
            last_tri_was_null = tri_null;
            if !tri_null {
                tri_was_not_null = true;
            }

            if !edgeflags[i - 1] {
                flags &= !edge_middle;
            }
            if i == n - 1 && edgeflags[i] {
                flags |= edge_last;
            }

            let tri = PrimHeader {
                flags,
                det: header.det,
                v: verts,
            };
            next.stats().c_primitives += 1;
            next.tri(&tri);
        }
    }

    fn do_clip_line(&mut self, header: &PrimHeader<'_>, clipmask: u32, next: &mut StageChain<'_>) {
        let state = next.state();
        let v0 = header.v[0];
        let v1 = header.v[1];
        let provoking = header.v[state.provoking_vertex(2)];
        let viewport = state.viewport_for(provoking);

        let mut t0 = 0.0_f32;
        let mut t1 = 0.0_f32;
        let mut planes = clipmask;
        while planes != 0 {
            let plane_idx = planes.trailing_zeros() as usize;
            planes &= planes - 1;

            let dp0 = self.interp.clip_dist(state, v0, plane_idx);
            let dp1 = self.interp.clip_dist(state, v1, plane_idx);
            if is_inf_or_nan(dp0) || is_inf_or_nan(dp1) {
                trace!("clip: non-finite distance to plane {plane_idx}, dropping line");
                return;
            }

            if dp1 < 0.0 {
                t1 = t1.max(dp1 / (dp1 - dp0));
            }
            if dp0 < 0.0 {
                t0 = t0.max(dp0 / (dp0 - dp1));
            }
            if t0 + t1 >= 1.0 {
                return;
            }
        }

        let clipped0 = v0.clipmask & CLIP_ALL_MASK != 0;
        let clipped1 = v1.clipmask & CLIP_ALL_MASK != 0;
        let mut tmp0 = mem::take(&mut self.tmp[0]);
        let mut tmp1 = mem::take(&mut self.tmp[1]);

        if clipped0 {
            self.interp.interp(&mut tmp0, t0, v0, v1, viewport);
            self.interp.copy_flat(&mut tmp0, provoking);
        }
        if clipped1 {
            self.interp.interp(&mut tmp1, t1, v1, v0, viewport);
            self.interp.copy_flat(&mut tmp1, provoking);
        }

        {
            let new0 = if clipped0 { &tmp0 } else { v0 };
            let new1 = if clipped1 { &tmp1 } else { v1 };
            let mut line = PrimHeader::line(header.flags, new0, new1);
            line.det = header.det;
            next.stats().c_primitives += 1;
            next.line(&line);
        }

        self.tmp[0] = tmp0;
        self.tmp[1] = tmp1;
    }
}

impl Stage for ClipStage {
    fn point(&mut self, header: &PrimHeader<'_>, next: &mut StageChain<'_>) {
        let points = self.ensure_ready(next.state());
        next.stats().c_invocations += 1;

        let v0 = header.v[0];
        let keep = match points {
            PointClip::Plain => v0.clipmask == 0,
            PointClip::GuardBandXy => guard_band_keeps(v0),
        };
        if keep {
            next.stats().c_primitives += 1;
            next.point(header);
        }
    }

    fn line(&mut self, header: &PrimHeader<'_>, next: &mut StageChain<'_>) {
        self.ensure_ready(next.state());
        next.stats().c_invocations += 1;

        let (m0, m1) = (
            header.v[0].clipmask & CLIP_ALL_MASK,
            header.v[1].clipmask & CLIP_ALL_MASK,
        );
        let clipmask = m0 | m1;
        if clipmask == 0 {
            next.stats().c_primitives += 1;
            next.line(header);
        } else if m0 & m1 == 0 {
            self.do_clip_line(header, clipmask, next);
        }
    }

    fn tri(&mut self, header: &PrimHeader<'_>, next: &mut StageChain<'_>) {
        self.ensure_ready(next.state());
        next.stats().c_invocations += 1;

        let [m0, m1, m2] = header.v.map(|v| v.clipmask & CLIP_ALL_MASK);
        let clipmask = m0 | m1 | m2;
        if clipmask == 0 {
            next.stats().c_primitives += 1;
            next.tri(header);
        } else if m0 & m1 & m2 == 0 {
            self.do_clip_tri(header, clipmask, next);
        }
    }

    fn flush(&mut self, next: &mut StageChain<'_>) {
        self.dispatch = Dispatch::First;
        next.flush();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn noperspective_t_falls_back() {
        let p = [1.0, 2.0, 0.0, 1.0];
        assert_eq!(noperspective_t(0.25, &p, &p, &p), 0.25);
    }

    #[test]
    fn noperspective_t_uses_screen_space() {
        // Halfway in clip space, but w differs so screen space is not halfway.
        let out = [-2.0, 0.0, 0.0, 1.0];
        let in_ = [2.0, 0.0, 0.0, 3.0];
        let dst = [0.0, 0.0, 0.0, 2.0];
        let t = noperspective_t(0.5, &dst, &out, &in_);
        // (0 - -2) / (2/3 - -2)
        assert!((t - 0.75).abs() < 1e-6);
    }

    #[test]
    fn guard_band_points() {
        let mut v = ShadedVertex::default();
        v.clip = [5.0, 0.0, 0.0, 1.0];
        v.clipmask = 1;
        assert!(guard_band_keeps(&v));

        v.clip[3] = -1.0;
        assert!(!guard_band_keeps(&v));

        v.clip = [5.0, 0.0, 0.0, 1.0];
        v.clipmask = 1 << 4;
        assert!(!guard_band_keeps(&v));
    }

    #[test]
    fn scratch_pool_holds_worst_case() {
        assert_eq!(MAX_CLIPPED_VERTICES, 29);
        assert_eq!(ClipStage::new().tmp.len(), MAX_CLIPPED_VERTICES + 1);
    }
}
