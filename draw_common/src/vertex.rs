// Copyright 2025 the Vello Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Shaded vertices and vertex buffers.

use alloc::vec;
use alloc::vec::Vec;

/// The vertex id of vertices which were not produced by a vertex fetch,
/// for example vertices synthesized by the clipper.
pub const UNDEFINED_VERTEX_ID: u32 = 0xffff;

/// The size in bytes of the fixed part of a vertex, i.e. everything except the attributes.
///
/// This is the bit-packed clip mask/edge flag/vertex id word plus the clip-space and
/// pre-clip positions.
pub const VERTEX_HEADER_SIZE: usize = 4 + 2 * 16;

/// A vertex after shading, as it flows through the pipeline stages.
#[derive(Clone, Debug, PartialEq)]
pub struct ShadedVertex {
    /// One bit per clip plane, set when the vertex is outside of that plane.
    pub clipmask: u32,
    /// Whether the edge starting at this vertex should be drawn in unfilled modes.
    pub edgeflag: bool,
    /// Whether the vertex carries shader-computed clip distances.
    pub have_clipdist: bool,
    /// The id assigned by the vertex fetch, or [`UNDEFINED_VERTEX_ID`].
    pub vertex_id: u32,
    /// Homogeneous clip-space position used for the frustum plane tests.
    pub clip: [f32; 4],
    /// Clip-space position kept for re-projecting interpolated vertices.
    pub pre_clip_pos: [f32; 4],
    /// The shader outputs, one float4 per slot.
    pub data: Vec<[f32; 4]>,
}

impl Default for ShadedVertex {
    fn default() -> Self {
        Self {
            clipmask: 0,
            edgeflag: true,
            have_clipdist: false,
            vertex_id: UNDEFINED_VERTEX_ID,
            clip: [0.0; 4],
            pre_clip_pos: [0.0; 4],
            data: Vec::new(),
        }
    }
}

impl ShadedVertex {
    /// Create a new vertex with `num_attribs` zeroed attribute slots.
    pub fn new(num_attribs: usize) -> Self {
        Self {
            data: vec![[0.0; 4]; num_attribs],
            ..Self::default()
        }
    }

    /// Create a new vertex from its shader outputs.
    pub fn from_attributes(data: impl Into<Vec<[f32; 4]>>) -> Self {
        Self {
            data: data.into(),
            ..Self::default()
        }
    }

    /// The number of attribute slots.
    #[inline]
    pub fn num_attribs(&self) -> usize {
        self.data.len()
    }

    /// Overwrite `self` with the contents of `src`, reusing the attribute allocation.
    pub fn copy_from(&mut self, src: &Self) {
        self.clipmask = src.clipmask;
        self.edgeflag = src.edgeflag;
        self.have_clipdist = src.have_clipdist;
        self.vertex_id = src.vertex_id;
        self.clip = src.clip;
        self.pre_clip_pos = src.pre_clip_pos;
        self.data.clear();
        self.data.extend_from_slice(&src.data);
    }
}

/// A buffer of shaded vertices which all have the same number of attributes.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct VertexInfo {
    /// The vertices.
    pub verts: Vec<ShadedVertex>,
    /// The number of attribute slots of every vertex.
    pub num_attribs: usize,
}

impl VertexInfo {
    /// Create an empty buffer for vertices with `num_attribs` attributes.
    pub fn new(num_attribs: usize) -> Self {
        Self {
            verts: Vec::new(),
            num_attribs,
        }
    }

    /// Create a buffer from existing vertices.
    ///
    /// The attribute count is taken from the first vertex.
    pub fn from_vertices(verts: Vec<ShadedVertex>) -> Self {
        let num_attribs = verts.first().map(ShadedVertex::num_attribs).unwrap_or(0);
        Self { verts, num_attribs }
    }

    /// The number of vertices.
    #[inline]
    pub fn count(&self) -> usize {
        self.verts.len()
    }

    /// The size in bytes of one vertex: the vertex header plus one float4 per attribute.
    #[inline]
    pub fn stride(&self) -> usize {
        VERTEX_HEADER_SIZE + self.num_attribs * 16
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn copy_from_reuses_allocation() {
        let mut src = ShadedVertex::new(3);
        src.clipmask = 0b101;
        src.vertex_id = 7;
        src.data[2] = [1.0, 2.0, 3.0, 4.0];

        let mut dst = ShadedVertex::new(3);
        let ptr = dst.data.as_ptr();
        dst.copy_from(&src);

        assert_eq!(dst, src);
        assert_eq!(dst.data.as_ptr(), ptr);
    }

    #[test]
    fn stride_includes_header() {
        let info = VertexInfo::new(2);
        assert_eq!(info.stride(), VERTEX_HEADER_SIZE + 32);
    }
}
