// Copyright 2025 the Vello Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Primitive kinds, primitive headers and descriptions of primitive streams.

use crate::vertex::ShadedVertex;
use alloc::vec;
use alloc::vec::Vec;

/// The kind of primitive a vertex stream describes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PrimKind {
    /// Independent points.
    Points,
    /// Independent lines, two vertices each.
    Lines,
    /// A closed line strip.
    LineLoop,
    /// Connected lines.
    LineStrip,
    /// Independent triangles, three vertices each.
    Triangles,
    /// Connected triangles sharing an edge with the previous one.
    TriangleStrip,
    /// Connected triangles sharing the first vertex.
    TriangleFan,
    /// Independent quads, four vertices each.
    Quads,
    /// Connected quads.
    QuadStrip,
    /// A single convex polygon.
    Polygon,
    /// Independent lines with adjacency, four vertices each.
    LinesAdjacency,
    /// A line strip with adjacency.
    LineStripAdjacency,
    /// Independent triangles with adjacency, six vertices each.
    TrianglesAdjacency,
    /// A triangle strip with adjacency.
    TriangleStripAdjacency,
}

impl PrimKind {
    /// The basic kind every primitive of this kind is decomposed into.
    pub const fn reduced(self) -> Self {
        match self {
            Self::Points => Self::Points,
            Self::Lines
            | Self::LineLoop
            | Self::LineStrip
            | Self::LinesAdjacency
            | Self::LineStripAdjacency => Self::Lines,
            Self::Triangles
            | Self::TriangleStrip
            | Self::TriangleFan
            | Self::Quads
            | Self::QuadStrip
            | Self::Polygon
            | Self::TrianglesAdjacency
            | Self::TriangleStripAdjacency => Self::Triangles,
        }
    }

    /// The primitive kind a geometry shader sees when this kind is drawn, keeping adjacency.
    ///
    /// Returns `None` for kinds that can't be fed to a geometry shader.
    pub const fn gs_input_kind(self) -> Option<Self> {
        match self {
            Self::Points => Some(Self::Points),
            Self::Lines | Self::LineLoop | Self::LineStrip => Some(Self::Lines),
            Self::Triangles | Self::TriangleStrip | Self::TriangleFan => Some(Self::Triangles),
            Self::LinesAdjacency | Self::LineStripAdjacency => Some(Self::LinesAdjacency),
            Self::TrianglesAdjacency | Self::TriangleStripAdjacency => {
                Some(Self::TrianglesAdjacency)
            }
            Self::Quads | Self::QuadStrip | Self::Polygon => None,
        }
    }

    /// Whether this kind carries adjacency vertices.
    pub const fn is_adjacency(self) -> bool {
        matches!(
            self,
            Self::LinesAdjacency
                | Self::LineStripAdjacency
                | Self::TrianglesAdjacency
                | Self::TriangleStripAdjacency
        )
    }

    /// The number of vertices of one decomposed primitive of this kind.
    pub const fn vertices_per_prim(self) -> usize {
        match self {
            Self::Points => 1,
            Self::Lines | Self::LineLoop | Self::LineStrip => 2,
            Self::Triangles | Self::TriangleStrip | Self::TriangleFan | Self::Polygon => 3,
            Self::Quads | Self::QuadStrip | Self::LinesAdjacency | Self::LineStripAdjacency => 4,
            Self::TrianglesAdjacency | Self::TriangleStripAdjacency => 6,
        }
    }

    /// The number of primitives `num_vertices` vertices of this kind decompose into.
    pub const fn decomposed_prims_for_vertices(self, num_vertices: usize) -> usize {
        let n = num_vertices;
        match self {
            Self::Points => n,
            Self::Lines => n / 2,
            Self::LineLoop => {
                if n >= 2 {
                    n
                } else {
                    0
                }
            }
            Self::LineStrip => n.saturating_sub(1),
            Self::Triangles => n / 3,
            Self::TriangleStrip | Self::TriangleFan => n.saturating_sub(2),
            Self::Quads => n / 4,
            Self::QuadStrip => {
                if n >= 4 {
                    (n - 2) / 2
                } else {
                    0
                }
            }
            Self::Polygon => {
                if n >= 3 {
                    1
                } else {
                    0
                }
            }
            Self::LinesAdjacency => n / 4,
            Self::LineStripAdjacency => n.saturating_sub(3),
            Self::TrianglesAdjacency => n / 6,
            Self::TriangleStripAdjacency => {
                if n >= 6 {
                    1 + (n - 6) / 2
                } else {
                    0
                }
            }
        }
    }
}

/// A point, line or triangle on its way through the pipeline stages.
///
/// The vertices are borrowed from the vertex buffer of the current draw or from the
/// scratch pool of a stage. Unused vertex slots repeat the first vertex.
#[derive(Clone, Copy, Debug)]
pub struct PrimHeader<'a> {
    /// Edge flag and stipple bits.
    pub flags: u16,
    /// The signed area of the primitive. Only the sign is meaningful.
    pub det: f32,
    /// The vertices.
    pub v: [&'a ShadedVertex; 3],
}

impl<'a> PrimHeader<'a> {
    /// The edge from vertex 0 to vertex 1 is a boundary edge.
    pub const EDGE_FLAG_0: u16 = 0x1;
    /// The edge from vertex 1 to vertex 2 is a boundary edge.
    pub const EDGE_FLAG_1: u16 = 0x2;
    /// The edge from vertex 2 to vertex 0 is a boundary edge.
    pub const EDGE_FLAG_2: u16 = 0x4;
    /// All three edges are boundary edges.
    pub const EDGE_FLAG_ALL: u16 = 0x7;
    /// Restart the line stipple pattern with this primitive.
    pub const RESET_STIPPLE: u16 = 0x8;

    /// A point.
    pub fn point(flags: u16, v0: &'a ShadedVertex) -> Self {
        Self {
            flags,
            det: 0.0,
            v: [v0; 3],
        }
    }

    /// A line.
    pub fn line(flags: u16, v0: &'a ShadedVertex, v1: &'a ShadedVertex) -> Self {
        Self {
            flags,
            det: 0.0,
            v: [v0, v1, v0],
        }
    }

    /// A triangle.
    pub fn tri(
        flags: u16,
        v0: &'a ShadedVertex,
        v1: &'a ShadedVertex,
        v2: &'a ShadedVertex,
    ) -> Self {
        Self {
            flags,
            det: 0.0,
            v: [v0, v1, v2],
        }
    }
}

/// The primitive stream is the continuation of a split draw.
pub const SPLIT_BEFORE: u16 = 0x1;
/// The primitive stream continues in a further draw.
pub const SPLIT_AFTER: u16 = 0x2;

/// A description of a stream of primitives over a vertex buffer.
///
/// The stream is made of [`primitive_lengths`](Self::primitive_lengths)`.len()`
/// consecutive primitives of the same kind, each consuming its length in vertices
/// (or indices) starting at [`start`](Self::start).
#[derive(Clone, Debug, PartialEq)]
pub struct PrimInfo {
    /// The kind of every primitive in the stream.
    pub kind: PrimKind,
    /// The index list, or `None` for a linear range of vertices.
    pub elts: Option<Vec<u32>>,
    /// The first vertex (or index) of the stream.
    pub start: u32,
    /// The total number of vertices (or indices).
    pub count: u32,
    /// [`SPLIT_BEFORE`] and [`SPLIT_AFTER`].
    pub flags: u16,
    /// The number of vertices of every primitive.
    pub primitive_lengths: Vec<u32>,
}

impl PrimInfo {
    /// A single primitive over a linear range of vertices.
    pub fn linear(kind: PrimKind, start: u32, count: u32) -> Self {
        Self {
            kind,
            elts: None,
            start,
            count,
            flags: 0,
            primitive_lengths: vec![count],
        }
    }

    /// A single primitive over an index list.
    pub fn indexed(kind: PrimKind, elts: Vec<u32>) -> Self {
        let count = elts.len() as u32;
        Self {
            kind,
            elts: Some(elts),
            start: 0,
            count,
            flags: 0,
            primitive_lengths: vec![count],
        }
    }

    /// Whether the stream addresses the vertex buffer directly.
    #[inline]
    pub fn is_linear(&self) -> bool {
        self.elts.is_none()
    }

    /// The number of primitives in the stream.
    #[inline]
    pub fn primitive_count(&self) -> usize {
        self.primitive_lengths.len()
    }

    /// The vertex index of the `i`-th element of the stream.
    ///
    /// Returns `None` if the index list is too short.
    #[inline]
    pub fn elt(&self, i: usize) -> Option<u32> {
        let i = self.start as usize + i;
        match &self.elts {
            Some(elts) => elts.get(i).copied(),
            None => u32::try_from(i).ok(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decomposed_counts() {
        assert_eq!(PrimKind::Points.decomposed_prims_for_vertices(5), 5);
        assert_eq!(PrimKind::Lines.decomposed_prims_for_vertices(5), 2);
        assert_eq!(PrimKind::LineLoop.decomposed_prims_for_vertices(1), 0);
        assert_eq!(PrimKind::LineLoop.decomposed_prims_for_vertices(3), 3);
        assert_eq!(PrimKind::TriangleStrip.decomposed_prims_for_vertices(2), 0);
        assert_eq!(PrimKind::TriangleFan.decomposed_prims_for_vertices(6), 4);
        assert_eq!(PrimKind::QuadStrip.decomposed_prims_for_vertices(8), 3);
        assert_eq!(PrimKind::LineStripAdjacency.decomposed_prims_for_vertices(6), 3);
        assert_eq!(
            PrimKind::TriangleStripAdjacency.decomposed_prims_for_vertices(10),
            3
        );
        assert_eq!(
            PrimKind::TriangleStripAdjacency.decomposed_prims_for_vertices(5),
            0
        );
    }

    #[test]
    fn reduced_kinds() {
        assert_eq!(PrimKind::Polygon.reduced(), PrimKind::Triangles);
        assert_eq!(PrimKind::LineStripAdjacency.reduced(), PrimKind::Lines);
        assert_eq!(PrimKind::Points.reduced(), PrimKind::Points);
    }

    #[test]
    fn gs_input_kinds() {
        assert_eq!(
            PrimKind::TriangleFan.gs_input_kind(),
            Some(PrimKind::Triangles)
        );
        assert_eq!(
            PrimKind::LineStripAdjacency.gs_input_kind(),
            Some(PrimKind::LinesAdjacency)
        );
        assert_eq!(PrimKind::Quads.gs_input_kind(), None);
    }

    #[test]
    fn elt_lookup() {
        let linear = PrimInfo::linear(PrimKind::Triangles, 4, 3);
        assert_eq!(linear.elt(1), Some(5));

        let indexed = PrimInfo::indexed(PrimKind::Triangles, vec![9, 8, 7]);
        assert_eq!(indexed.elt(2), Some(7));
        assert_eq!(indexed.elt(3), None);
    }
}
