// Copyright 2025 the Vello Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Viewport transforms from clip space to window space.

use bytemuck::{Pod, Zeroable};

/// The maximum number of viewports a shader can select from.
pub const MAX_VIEWPORTS: usize = 16;

/// A scale and translation applied to normalized device coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
#[repr(C)]
pub struct Viewport {
    /// The scale of x, y and z.
    pub scale: [f32; 3],
    /// The translation of x, y and z.
    pub translate: [f32; 3],
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            scale: [1.0; 3],
            translate: [0.0; 3],
        }
    }
}

impl Viewport {
    /// A viewport covering the given window rectangle with a `[0, 1]` depth range.
    ///
    /// With `half_z`, normalized depth is expected to be in `[0, 1]` already, otherwise
    /// it is mapped from `[-1, 1]`.
    pub fn from_rect(x: f32, y: f32, width: f32, height: f32, half_z: bool) -> Self {
        let (sz, tz) = if half_z { (1.0, 0.0) } else { (0.5, 0.5) };
        Self {
            scale: [width * 0.5, height * 0.5, sz],
            translate: [x + width * 0.5, y + height * 0.5, tz],
        }
    }

    /// Map a clip-space position to window space.
    ///
    /// The fourth component of the result holds `1 / w`.
    #[inline]
    pub fn map(&self, clip: &[f32; 4]) -> [f32; 4] {
        let oow = 1.0 / clip[3];
        [
            clip[0] * oow * self.scale[0] + self.translate[0],
            clip[1] * oow * self.scale[1] + self.translate[1],
            clip[2] * oow * self.scale[2] + self.translate[2],
            oow,
        ]
    }
}

/// Turn the raw bits of a viewport index output into a viewport index.
///
/// Out of range indices select the first viewport.
#[inline]
pub fn viewport_index_from_bits(bits: u32) -> usize {
    let idx = bits as usize;
    if idx < MAX_VIEWPORTS {
        idx
    } else {
        0
    }
}
