// Copyright 2025 the Vello Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Reflection records for the shader stages around the pipeline.
//!
//! The pipeline never looks at shader code. It only needs to know which output slot
//! carries which value, and how the fragment stage wants each of its inputs to be
//! interpolated.

use smallvec::SmallVec;

/// The meaning of a shader input or output slot.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Semantic {
    /// The clip-space position.
    Position,
    /// A front-facing color.
    Color,
    /// A back-facing color.
    BackColor,
    /// A user-defined varying.
    Generic,
    /// A texture coordinate.
    TexCoord,
    /// The fog coordinate.
    Fog,
    /// The point size.
    PointSize,
    /// The position user clip planes are tested against.
    ClipVertex,
    /// Four shader-computed clip distances per slot.
    ClipDistance,
    /// The edge flag, non-zero in the first channel when set.
    EdgeFlag,
    /// The primitive id, stored as `u32` bits.
    PrimitiveId,
    /// The viewport index, stored as `u32` bits.
    ViewportIndex,
    /// The render target layer, stored as `u32` bits.
    Layer,
    /// Whether the primitive is front facing, `1.0` or `0.0`.
    FrontFace,
}

/// How a fragment input is interpolated across a primitive.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Interpolation {
    /// The value of the provoking vertex is used for the whole primitive.
    Constant,
    /// Linear interpolation in screen space.
    Linear,
    /// Perspective-correct interpolation.
    #[default]
    Perspective,
    /// Colors follow the flat shading state of the rasterizer.
    Color,
}

/// A semantic together with its index, e.g. the third generic varying.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ShaderSlot {
    /// The meaning of the slot.
    pub semantic: Semantic,
    /// The index among slots of the same semantic.
    pub index: u32,
}

impl ShaderSlot {
    /// Create a new slot.
    pub const fn new(semantic: Semantic, index: u32) -> Self {
        Self { semantic, index }
    }
}

/// The outputs written by a vertex or geometry shader, in vertex attribute order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ShaderInfo {
    slots: SmallVec<[ShaderSlot; 16]>,
    position: Option<usize>,
    clip_vertex: Option<usize>,
    clip_distance: [Option<usize>; 2],
    edgeflag: Option<usize>,
    viewport_index: Option<usize>,
}

impl ShaderInfo {
    /// Create an empty output record.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an output record from a list of slots.
    pub fn from_slots(slots: impl IntoIterator<Item = ShaderSlot>) -> Self {
        let mut info = Self::new();
        for slot in slots {
            info.push(slot);
        }
        info
    }

    /// Append a slot, returning its attribute index.
    pub fn push(&mut self, slot: ShaderSlot) -> usize {
        let idx = self.slots.len();
        // The first slot of a semantic wins.
        let first = |cached: &mut Option<usize>| {
            if cached.is_none() {
                *cached = Some(idx);
            }
        };
        match (slot.semantic, slot.index) {
            (Semantic::Position, 0) => first(&mut self.position),
            (Semantic::ClipVertex, 0) => first(&mut self.clip_vertex),
            (Semantic::ClipDistance, i @ 0..=1) => first(&mut self.clip_distance[i as usize]),
            (Semantic::EdgeFlag, 0) => first(&mut self.edgeflag),
            (Semantic::ViewportIndex, 0) => first(&mut self.viewport_index),
            _ => {}
        }
        self.slots.push(slot);
        idx
    }

    /// The attribute index of the slot with the given semantic and index.
    pub fn find(&self, semantic: Semantic, index: u32) -> Option<usize> {
        self.slots
            .iter()
            .position(|s| s.semantic == semantic && s.index == index)
    }

    /// All slots.
    #[inline]
    pub fn slots(&self) -> &[ShaderSlot] {
        &self.slots
    }

    /// The number of output slots.
    #[inline]
    pub fn num_outputs(&self) -> usize {
        self.slots.len()
    }

    /// The position output.
    #[inline]
    pub fn position(&self) -> Option<usize> {
        self.position
    }

    /// The clip vertex output.
    #[inline]
    pub fn clip_vertex(&self) -> Option<usize> {
        self.clip_vertex
    }

    /// The clip distance output holding distances `4 * i..4 * i + 4`.
    #[inline]
    pub fn clip_distance(&self, i: usize) -> Option<usize> {
        self.clip_distance.get(i).copied().flatten()
    }

    /// Whether the shader writes clip distances.
    #[inline]
    pub fn has_clip_distance(&self) -> bool {
        self.clip_distance.iter().any(Option::is_some)
    }

    /// The edge flag output.
    #[inline]
    pub fn edgeflag(&self) -> Option<usize> {
        self.edgeflag
    }

    /// The viewport index output.
    #[inline]
    pub fn viewport_index(&self) -> Option<usize> {
        self.viewport_index
    }
}

/// An input read by the fragment shader.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct FragmentInput {
    /// The slot the input is linked to.
    pub slot: ShaderSlot,
    /// How the input is interpolated.
    pub interpolation: Interpolation,
}

/// The inputs read by the fragment shader.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FragmentShaderInfo {
    /// The inputs.
    pub inputs: SmallVec<[FragmentInput; 16]>,
}

impl FragmentShaderInfo {
    /// Create a record from a list of inputs.
    pub fn new(inputs: impl IntoIterator<Item = FragmentInput>) -> Self {
        Self {
            inputs: inputs.into_iter().collect(),
        }
    }

    /// The input linked to the given semantic and index.
    pub fn find(&self, semantic: Semantic, index: u32) -> Option<&FragmentInput> {
        self.inputs
            .iter()
            .find(|i| i.slot.semantic == semantic && i.slot.index == index)
    }

    /// Whether any input has the given semantic.
    pub fn uses(&self, semantic: Semantic) -> bool {
        self.inputs.iter().any(|i| i.slot.semantic == semantic)
    }

    /// Whether the fragment shader reads the primitive id.
    #[inline]
    pub fn uses_primid(&self) -> bool {
        self.uses(Semantic::PrimitiveId)
    }

    /// Whether the fragment shader reads the front-facing flag.
    #[inline]
    pub fn uses_front_face(&self) -> bool {
        self.uses(Semantic::FrontFace)
    }
}
