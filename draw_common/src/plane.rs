// Copyright 2025 the Vello Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Frustum and user clip planes.
//!
//! A vertex `p` is inside a plane `(a, b, c, d)` if `a*x + b*y + c*z + d*w >= 0`.
//! Planes are identified by their bit in a vertex's clip mask.

use crate::math::dot4;
use bytemuck::{Pod, Zeroable};
use static_assertions::const_assert;

/// The number of fixed view-frustum planes.
pub const NUM_FRUSTUM_PLANES: usize = 6;

/// The maximum number of user clip planes (and of clip-distance channels).
pub const MAX_USER_PLANES: usize = 8;

/// The maximum number of planes a primitive can be clipped against.
pub const MAX_PLANES: usize = NUM_FRUSTUM_PLANES + MAX_USER_PLANES;

// Every plane needs a bit in the `u32` clip mask.
const_assert!(MAX_PLANES <= 32);

/// `x <= w`.
pub const PLANE_RIGHT: u32 = 1 << 0;
/// `x >= -w`.
pub const PLANE_LEFT: u32 = 1 << 1;
/// `y <= w`.
pub const PLANE_TOP: u32 = 1 << 2;
/// `y >= -w`.
pub const PLANE_BOTTOM: u32 = 1 << 3;
/// `z >= -w`, or `z >= 0` with half-z clip space.
pub const PLANE_NEAR: u32 = 1 << 4;
/// `z <= w`.
pub const PLANE_FAR: u32 = 1 << 5;

/// The clip mask bits of the four X/Y frustum planes.
pub const CLIP_XY_MASK: u32 = PLANE_RIGHT | PLANE_LEFT | PLANE_TOP | PLANE_BOTTOM;
/// The clip mask bits of the near and far planes.
pub const CLIP_Z_MASK: u32 = PLANE_NEAR | PLANE_FAR;
/// The clip mask bits of all user planes.
pub const CLIP_USER_MASK: u32 = ((1 << MAX_USER_PLANES) - 1) << NUM_FRUSTUM_PLANES;

/// The clip mask bits of every plane.
pub const CLIP_ALL_MASK: u32 = CLIP_XY_MASK | CLIP_Z_MASK | CLIP_USER_MASK;

/// The clip mask bit of user plane `i`.
#[inline]
pub const fn user_plane_bit(i: usize) -> u32 {
    1 << (NUM_FRUSTUM_PLANES + i)
}

/// Whether the plane with the given index is a user plane.
#[inline]
pub const fn is_user_plane(plane_idx: usize) -> bool {
    plane_idx >= NUM_FRUSTUM_PLANES
}

/// A plane in homogeneous clip space.
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
#[repr(C)]
pub struct Plane(pub [f32; 4]);

impl Plane {
    /// Create a new plane from its coefficients.
    pub const fn new(a: f32, b: f32, c: f32, d: f32) -> Self {
        Self([a, b, c, d])
    }

    /// The signed distance of `p` to the plane, negative when `p` is outside.
    #[inline(always)]
    pub fn distance(&self, p: &[f32; 4]) -> f32 {
        dot4(p, &self.0)
    }
}

/// The frustum planes in clip mask bit order, with a full `[-w, w]` depth range.
pub const FRUSTUM_PLANES: [Plane; NUM_FRUSTUM_PLANES] = [
    Plane::new(-1.0, 0.0, 0.0, 1.0),
    Plane::new(1.0, 0.0, 0.0, 1.0),
    Plane::new(0.0, -1.0, 0.0, 1.0),
    Plane::new(0.0, 1.0, 0.0, 1.0),
    Plane::new(0.0, 0.0, 1.0, 1.0),
    Plane::new(0.0, 0.0, -1.0, 1.0),
];

/// The near plane of a `[0, w]` depth range.
pub const NEAR_PLANE_HALF_Z: Plane = Plane::new(0.0, 0.0, 1.0, 0.0);

/// The full set of planes, indexed by clip mask bit.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PlaneSet {
    planes: [Plane; MAX_PLANES],
    num_user_planes: usize,
}

impl Default for PlaneSet {
    fn default() -> Self {
        Self::new(false)
    }
}

impl PlaneSet {
    /// Create a plane set with the frustum planes and no user planes.
    ///
    /// With `half_z`, the near plane is `z >= 0` instead of `z >= -w`.
    pub fn new(half_z: bool) -> Self {
        let mut planes = [Plane::default(); MAX_PLANES];
        planes[..NUM_FRUSTUM_PLANES].copy_from_slice(&FRUSTUM_PLANES);

        let mut set = Self {
            planes,
            num_user_planes: 0,
        };
        set.set_half_z(half_z);
        set
    }

    /// Switch between a `[-w, w]` and a `[0, w]` depth range.
    pub fn set_half_z(&mut self, half_z: bool) {
        self.planes[4] = if half_z {
            NEAR_PLANE_HALF_Z
        } else {
            FRUSTUM_PLANES[4]
        };
    }

    /// Replace the user planes.
    ///
    /// Returns the number of planes that were stored, which is smaller than `planes.len()`
    /// if more than [`MAX_USER_PLANES`] are supplied.
    pub fn set_user_planes(&mut self, planes: &[Plane]) -> usize {
        let n = planes.len().min(MAX_USER_PLANES);
        self.planes[NUM_FRUSTUM_PLANES..NUM_FRUSTUM_PLANES + n].copy_from_slice(&planes[..n]);
        for plane in &mut self.planes[NUM_FRUSTUM_PLANES + n..] {
            *plane = Plane::default();
        }
        self.num_user_planes = n;
        n
    }

    /// The number of user planes.
    #[inline]
    pub fn num_user_planes(&self) -> usize {
        self.num_user_planes
    }

    /// The plane for the given clip mask bit index.
    ///
    /// # Panics
    ///
    /// Panics if `plane_idx` is [`MAX_PLANES`] or more.
    #[inline(always)]
    pub fn get(&self, plane_idx: usize) -> &Plane {
        &self.planes[plane_idx]
    }

    /// All planes, frustum planes first.
    #[inline]
    pub fn as_slice(&self) -> &[Plane] {
        &self.planes
    }
}
