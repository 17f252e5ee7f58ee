// Copyright 2025 the Vello Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Decomposing strips, fans, loops and polygons into independent primitives.
//!
//! Every consumer of a primitive stream (the stage pipeline, the primitive assembler and
//! the geometry shader) walks it through [`decompose`], so the order in which primitives
//! are produced and the vertex order within each primitive are the same everywhere.
//!
//! With `flatshade_first`, the provoking vertex of every produced primitive is its first
//! vertex, otherwise it is its last one. Winding is preserved in both modes.

use crate::prim::{PrimHeader, PrimKind, SPLIT_AFTER, SPLIT_BEFORE};

const EDGE_0: u16 = PrimHeader::EDGE_FLAG_0;
const EDGE_1: u16 = PrimHeader::EDGE_FLAG_1;
const EDGE_2: u16 = PrimHeader::EDGE_FLAG_2;
const EDGE_ALL: u16 = PrimHeader::EDGE_FLAG_ALL;
const RESET_STIPPLE: u16 = PrimHeader::RESET_STIPPLE;

/// A consumer of decomposed primitives.
///
/// The arguments are vertex indices as returned by the `elt` function given to
/// [`decompose`].
pub trait PrimSink {
    /// The error that aborts the decomposition.
    type Error;

    /// Consume a point.
    fn point(&mut self, i0: u32) -> Result<(), Self::Error>;

    /// Consume a line.
    fn line(&mut self, flags: u16, i0: u32, i1: u32) -> Result<(), Self::Error>;

    /// Consume a triangle.
    fn tri(&mut self, flags: u16, i0: u32, i1: u32, i2: u32) -> Result<(), Self::Error>;

    /// Consume a line with adjacency, in the order `[adj, v0, v1, adj]`.
    ///
    /// By default the adjacency vertices are dropped.
    fn line_adj(&mut self, flags: u16, i: [u32; 4]) -> Result<(), Self::Error> {
        self.line(flags, i[1], i[2])
    }

    /// Consume a triangle with adjacency, in the order `[v0, adj, v1, adj, v2, adj]`.
    ///
    /// By default the adjacency vertices are dropped.
    fn tri_adj(&mut self, flags: u16, i: [u32; 6]) -> Result<(), Self::Error> {
        self.tri(flags, i[0], i[2], i[4])
    }
}

/// Decompose `count` elements of a primitive of the given kind.
///
/// `prim_flags` carries [`SPLIT_BEFORE`]/[`SPLIT_AFTER`] for streams that are part of a
/// larger primitive. `elt` maps the position in the stream to a vertex index.
pub fn decompose<S: PrimSink>(
    kind: PrimKind,
    prim_flags: u16,
    count: usize,
    flatshade_first: bool,
    elt: impl Fn(usize) -> u32,
    sink: &mut S,
) -> Result<(), S::Error> {
    let last_vertex_last = !flatshade_first;

    match kind {
        PrimKind::Points => {
            for i in 0..count {
                sink.point(elt(i))?;
            }
        }
        PrimKind::Lines => {
            let mut i = 0;
            while i + 1 < count {
                sink.line(RESET_STIPPLE, elt(i), elt(i + 1))?;
                i += 2;
            }
        }
        PrimKind::LineLoop | PrimKind::LineStrip => {
            if count >= 2 {
                let mut flags = if prim_flags & SPLIT_BEFORE != 0 {
                    0
                } else {
                    RESET_STIPPLE
                };
                let first = elt(0);
                let mut prev = first;
                for i in 1..count {
                    let cur = elt(i);
                    sink.line(flags, prev, cur)?;
                    prev = cur;
                    flags = 0;
                }
                // A loop split over several streams is closed by the splitter.
                if kind == PrimKind::LineLoop && prim_flags & (SPLIT_BEFORE | SPLIT_AFTER) == 0 {
                    sink.line(flags, prev, first)?;
                }
            }
        }
        PrimKind::Triangles => {
            let mut i = 0;
            while i + 2 < count {
                sink.tri(RESET_STIPPLE | EDGE_ALL, elt(i), elt(i + 1), elt(i + 2))?;
                i += 3;
            }
        }
        PrimKind::TriangleStrip => {
            let flags = RESET_STIPPLE | EDGE_ALL;
            let mut i = 0;
            while i + 2 < count {
                let (i0, i1, i2) = (elt(i), elt(i + 1), elt(i + 2));
                if i & 1 == 0 {
                    sink.tri(flags, i0, i1, i2)?;
                } else if last_vertex_last {
                    // Always emit the newest vertex last.
                    sink.tri(flags, i1, i0, i2)?;
                } else {
                    // Always emit the oldest vertex first.
                    sink.tri(flags, i0, i2, i1)?;
                }
                i += 1;
            }
        }
        PrimKind::TriangleFan => {
            if count >= 3 {
                let flags = RESET_STIPPLE | EDGE_ALL;
                let center = elt(0);
                let mut i = 0;
                while i + 2 < count {
                    let (i1, i2) = (elt(i + 1), elt(i + 2));
                    // The center never provokes: it comes first when the last vertex
                    // provokes, last otherwise.
                    if last_vertex_last {
                        sink.tri(flags, center, i1, i2)?;
                    } else {
                        sink.tri(flags, i1, i2, center)?;
                    }
                    i += 1;
                }
            }
        }
        PrimKind::Quads => {
            let mut i = 0;
            while i + 3 < count {
                let (i0, i1, i2, i3) = (elt(i), elt(i + 1), elt(i + 2), elt(i + 3));
                if last_vertex_last {
                    sink.tri(RESET_STIPPLE | EDGE_0 | EDGE_2, i0, i1, i3)?;
                    sink.tri(EDGE_0 | EDGE_1, i1, i2, i3)?;
                } else {
                    sink.tri(RESET_STIPPLE | EDGE_0 | EDGE_1, i0, i1, i2)?;
                    sink.tri(EDGE_1 | EDGE_2, i0, i2, i3)?;
                }
                i += 4;
            }
        }
        PrimKind::QuadStrip => {
            let mut i = 0;
            while i + 3 < count {
                let (i0, i1, i2, i3) = (elt(i), elt(i + 1), elt(i + 2), elt(i + 3));
                if last_vertex_last {
                    sink.tri(RESET_STIPPLE | EDGE_0 | EDGE_2, i2, i0, i3)?;
                    sink.tri(EDGE_0 | EDGE_1, i0, i1, i3)?;
                } else {
                    sink.tri(RESET_STIPPLE | EDGE_0 | EDGE_1, i3, i2, i0)?;
                    sink.tri(EDGE_1 | EDGE_2, i3, i0, i1)?;
                }
                i += 2;
            }
        }
        PrimKind::Polygon => {
            if count >= 3 {
                // The first vertex provokes. Edges from and to it are only boundary edges
                // for the first and last triangle, unless the polygon was split there.
                let first = elt(0);
                let last_tri = count - 2;
                for k in 1..count - 1 {
                    let (ik, ik1) = (elt(k), elt(k + 1));
                    let opens = k == 1 && prim_flags & SPLIT_BEFORE == 0;
                    let closes = k == last_tri && prim_flags & SPLIT_AFTER == 0;
                    let stipple = if k == 1 { RESET_STIPPLE } else { 0 };
                    if last_vertex_last {
                        let mut flags = stipple | EDGE_0;
                        if closes {
                            flags |= EDGE_1;
                        }
                        if opens {
                            flags |= EDGE_2;
                        }
                        sink.tri(flags, ik, ik1, first)?;
                    } else {
                        let mut flags = stipple | EDGE_1;
                        if opens {
                            flags |= EDGE_0;
                        }
                        if closes {
                            flags |= EDGE_2;
                        }
                        sink.tri(flags, first, ik, ik1)?;
                    }
                }
            }
        }
        PrimKind::LinesAdjacency => {
            let mut i = 0;
            while i + 3 < count {
                sink.line_adj(
                    RESET_STIPPLE,
                    [elt(i), elt(i + 1), elt(i + 2), elt(i + 3)],
                )?;
                i += 4;
            }
        }
        PrimKind::LineStripAdjacency => {
            if count >= 4 {
                let mut flags = if prim_flags & SPLIT_BEFORE != 0 {
                    0
                } else {
                    RESET_STIPPLE
                };
                let mut i = 0;
                while i + 3 < count {
                    sink.line_adj(flags, [elt(i), elt(i + 1), elt(i + 2), elt(i + 3)])?;
                    flags = 0;
                    i += 1;
                }
            }
        }
        PrimKind::TrianglesAdjacency => {
            let mut i = 0;
            while i + 5 < count {
                sink.tri_adj(
                    RESET_STIPPLE | EDGE_ALL,
                    [
                        elt(i),
                        elt(i + 1),
                        elt(i + 2),
                        elt(i + 3),
                        elt(i + 4),
                        elt(i + 5),
                    ],
                )?;
                i += 6;
            }
        }
        PrimKind::TriangleStripAdjacency => {
            let num_tris = kind.decomposed_prims_for_vertices(count);
            for t in 0..num_tris {
                let idx = tri_strip_adj_indices(t, num_tris, last_vertex_last);
                sink.tri_adj(RESET_STIPPLE | EDGE_ALL, idx.map(&elt))?;
            }
        }
    }

    Ok(())
}

/// The stream positions of triangle `t` of a triangle strip with adjacency made of
/// `num_tris` triangles, in the order `[v0, adj, v1, adj, v2, adj]`.
fn tri_strip_adj_indices(t: usize, num_tris: usize, last_vertex_last: bool) -> [usize; 6] {
    let base = 2 * t;
    let is_last = t + 1 == num_tris;
    let adj_first = if t == 0 { 1 } else { base - 2 };

    if t & 1 == 0 {
        let adj_second = if is_last { base + 5 } else { base + 6 };
        [base, adj_first, base + 2, adj_second, base + 4, base + 3]
    } else {
        let adj_third = if is_last { base + 5 } else { base + 6 };
        if last_vertex_last {
            [base + 2, adj_first, base, base + 3, base + 4, adj_third]
        } else {
            // Rotate so that the oldest vertex comes first.
            [base, base + 3, base + 4, adj_third, base + 2, adj_first]
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec;
    use alloc::vec::Vec;
    use core::convert::Infallible;

    #[derive(Debug, Default)]
    struct Collect {
        points: Vec<u32>,
        lines: Vec<(u16, [u32; 2])>,
        tris: Vec<(u16, [u32; 3])>,
        tris_adj: Vec<[u32; 6]>,
    }

    impl PrimSink for Collect {
        type Error = Infallible;

        fn point(&mut self, i0: u32) -> Result<(), Infallible> {
            self.points.push(i0);
            Ok(())
        }

        fn line(&mut self, flags: u16, i0: u32, i1: u32) -> Result<(), Infallible> {
            self.lines.push((flags, [i0, i1]));
            Ok(())
        }

        fn tri(&mut self, flags: u16, i0: u32, i1: u32, i2: u32) -> Result<(), Infallible> {
            self.tris.push((flags, [i0, i1, i2]));
            Ok(())
        }

        fn tri_adj(&mut self, _: u16, i: [u32; 6]) -> Result<(), Infallible> {
            self.tris_adj.push(i);
            Ok(())
        }
    }

    fn run(kind: PrimKind, prim_flags: u16, count: usize, flatshade_first: bool) -> Collect {
        let mut sink = Collect::default();
        let result = decompose(
            kind,
            prim_flags,
            count,
            flatshade_first,
            |i| i as u32,
            &mut sink,
        );
        match result {
            Ok(()) => sink,
            Err(never) => match never {},
        }
    }

    fn indices<const N: usize>(prims: &[(u16, [u32; N])]) -> Vec<[u32; N]> {
        prims.iter().map(|(_, i)| *i).collect()
    }

    #[test]
    fn triangle_strip_keeps_provoking_vertex() {
        let last = run(PrimKind::TriangleStrip, 0, 5, false);
        assert_eq!(indices(&last.tris), vec![[0, 1, 2], [2, 1, 3], [2, 3, 4]]);

        let first = run(PrimKind::TriangleStrip, 0, 5, true);
        assert_eq!(indices(&first.tris), vec![[0, 1, 2], [1, 3, 2], [2, 3, 4]]);
    }

    #[test]
    fn triangle_fan_orders() {
        let last = run(PrimKind::TriangleFan, 0, 4, false);
        assert_eq!(indices(&last.tris), vec![[0, 1, 2], [0, 2, 3]]);

        let first = run(PrimKind::TriangleFan, 0, 4, true);
        assert_eq!(indices(&first.tris), vec![[1, 2, 0], [2, 3, 0]]);
    }

    #[test]
    fn incomplete_primitives_are_dropped() {
        assert!(run(PrimKind::Triangles, 0, 5, false).tris.len() == 1);
        assert!(run(PrimKind::Lines, 0, 3, false).lines.len() == 1);
        assert!(run(PrimKind::TriangleStrip, 0, 2, false).tris.is_empty());
    }

    #[test]
    fn line_loop_is_closed() {
        let lp = run(PrimKind::LineLoop, 0, 3, false);
        assert_eq!(indices(&lp.lines), vec![[0, 1], [1, 2], [2, 0]]);
        assert_eq!(lp.lines[0].0, RESET_STIPPLE);
        assert_eq!(lp.lines[1].0, 0);

        let split = run(PrimKind::LineLoop, SPLIT_AFTER, 3, false);
        assert_eq!(split.lines.len(), 2);

        let cont = run(PrimKind::LineStrip, SPLIT_BEFORE, 3, false);
        assert_eq!(cont.lines[0].0, 0);
    }

    #[test]
    fn quads_split_into_two_triangles() {
        let q = run(PrimKind::Quads, 0, 4, false);
        assert_eq!(indices(&q.tris), vec![[0, 1, 3], [1, 2, 3]]);
        // The diagonal is never a boundary edge.
        assert_eq!(q.tris[0].0 & EDGE_ALL, EDGE_0 | EDGE_2);
        assert_eq!(q.tris[1].0 & EDGE_ALL, EDGE_0 | EDGE_1);
    }

    #[test]
    fn polygon_boundary_edges() {
        let p = run(PrimKind::Polygon, 0, 5, true);
        assert_eq!(indices(&p.tris), vec![[0, 1, 2], [0, 2, 3], [0, 3, 4]]);
        assert_eq!(p.tris[0].0 & EDGE_ALL, EDGE_0 | EDGE_1);
        assert_eq!(p.tris[1].0 & EDGE_ALL, EDGE_1);
        assert_eq!(p.tris[2].0 & EDGE_ALL, EDGE_1 | EDGE_2);

        let single = run(PrimKind::Polygon, 0, 3, false);
        assert_eq!(indices(&single.tris), vec![[1, 2, 0]]);
        assert_eq!(single.tris[0].0 & EDGE_ALL, EDGE_ALL);
    }

    #[test]
    fn line_strip_adjacency_drops_adjacent_vertices() {
        let l = run(PrimKind::LineStripAdjacency, 0, 5, false);
        assert_eq!(indices(&l.lines), vec![[1, 2], [2, 3]]);
    }

    #[test]
    fn triangle_strip_adjacency_single() {
        let t = run(PrimKind::TriangleStripAdjacency, 0, 6, false);
        assert_eq!(t.tris_adj, vec![[0, 1, 2, 5, 4, 3]]);
    }

    #[test]
    fn triangle_strip_adjacency_multiple() {
        let last = run(PrimKind::TriangleStripAdjacency, 0, 10, false);
        assert_eq!(
            last.tris_adj,
            vec![[0, 1, 2, 6, 4, 3], [4, 0, 2, 5, 6, 8], [4, 2, 6, 9, 8, 7]]
        );

        let first = run(PrimKind::TriangleStripAdjacency, 0, 10, true);
        assert_eq!(first.tris_adj[1], [2, 5, 6, 8, 4, 0]);
    }
}
