// Copyright 2025 the Vello Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Mathematical helper functions.

/// The dot product of two homogeneous vectors.
#[inline(always)]
pub fn dot4(a: &[f32; 4], b: &[f32; 4]) -> f32 {
    a[0] * b[0] + a[1] * b[1] + a[2] * b[2] + a[3] * b[3]
}

/// Whether `x` is infinite or NaN.
#[inline(always)]
pub fn is_inf_or_nan(x: f32) -> bool {
    !x.is_finite()
}

/// Linear interpolation from `out` (at `t = 0`) to `in_` (at `t = 1`).
#[inline(always)]
pub fn lerp(t: f32, out: f32, in_: f32) -> f32 {
    out + t * (in_ - out)
}

/// Interpolate all four channels of an attribute, see [`lerp`].
#[inline(always)]
pub fn interp_attr(dst: &mut [f32; 4], t: f32, in_: &[f32; 4], out: &[f32; 4]) {
    dst[0] = lerp(t, out[0], in_[0]);
    dst[1] = lerp(t, out[1], in_[1]);
    dst[2] = lerp(t, out[2], in_[2]);
    dst[3] = lerp(t, out[3], in_[3]);
}

/// Whether `x` and `y` lie on different sides of zero.
///
/// A zero on one side only counts when the other side is non-zero, so that two
/// vertices lying exactly on a plane never produce an intersection.
#[inline(always)]
pub fn different_signs(x: f32, y: f32) -> bool {
    x * y <= 0.0 && x - y != 0.0
}

/// Round `value` up to the next multiple of `alignment`.
///
/// An `alignment` of 0 leaves `value` unchanged.
#[inline]
pub fn align(value: usize, alignment: usize) -> usize {
    if alignment == 0 {
        value
    } else {
        value.div_ceil(alignment) * alignment
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn different_signs_on_plane() {
        assert!(different_signs(-1.0, 1.0));
        assert!(different_signs(0.0, -1.0));
        assert!(different_signs(1.5, 0.0));
        assert!(!different_signs(0.0, 0.0));
        assert!(!different_signs(2.0, 1.0));
    }

    #[test]
    fn lerp_endpoints_are_exact() {
        assert_eq!(lerp(0.0, -2.0, 0.5), -2.0);
        assert_eq!(lerp(1.0, -2.0, -1.0), -1.0);
    }

    #[test]
    fn align_rounds_up() {
        assert_eq!(align(0, 4), 0);
        assert_eq!(align(5, 4), 8);
        assert_eq!(align(8, 4), 8);
        assert_eq!(align(3, 1), 3);
    }
}
