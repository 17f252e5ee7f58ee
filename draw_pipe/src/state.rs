// Copyright 2025 the Vello Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! State shared by all pipeline stages during a draw.

use draw_common::cliptest::ClipTestFlags;
use draw_common::plane::PlaneSet;
use draw_common::shader::{FragmentShaderInfo, ShaderInfo};
use draw_common::vertex::ShadedVertex;
use draw_common::viewport::{viewport_index_from_bits, Viewport, MAX_VIEWPORTS};

/// Which faces of a triangle are culled.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum CullFace {
    /// Nothing is culled.
    #[default]
    None,
    /// Front-facing triangles are culled.
    Front,
    /// Back-facing triangles are culled.
    Back,
    /// All triangles are culled.
    FrontAndBack,
}

impl CullFace {
    /// Whether triangles with the given facing are culled.
    pub fn culls(self, front: bool) -> bool {
        match self {
            Self::None => false,
            Self::Front => front,
            Self::Back => !front,
            Self::FrontAndBack => true,
        }
    }
}

/// The rasterizer state that affects geometry processing.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RasterizerState {
    /// Colors use the value of the provoking vertex.
    pub flatshade: bool,
    /// The first vertex of a primitive is its provoking vertex, instead of the last one.
    pub flatshade_first: bool,
    /// Counter-clockwise triangles are front facing.
    pub front_ccw: bool,
    /// Which faces are culled.
    pub cull_face: CullFace,
    /// Clip-space depth is `[0, w]` instead of `[-w, w]`.
    pub clip_halfz: bool,
    /// Clip against the near and far planes.
    pub depth_clip: bool,
    /// Bit `i` enables user clip plane `i`.
    pub clip_plane_enable: u32,
}

impl Default for RasterizerState {
    fn default() -> Self {
        Self {
            flatshade: false,
            flatshade_first: false,
            front_ccw: true,
            cull_face: CullFace::None,
            clip_halfz: false,
            depth_clip: true,
            clip_plane_enable: 0,
        }
    }
}

/// Settings describing what the rasterizer backend handles on its own.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DrawSettings {
    /// Points outside of the X/Y planes are kept and left to the scissor of the backend.
    pub guard_band_points_xy: bool,
    /// The backend clips against the X/Y planes.
    pub bypass_clip_xy: bool,
    /// The backend clips against the near and far planes.
    pub bypass_clip_z: bool,
    /// Count pipeline statistics.
    pub collect_statistics: bool,
}

/// Everything a stage may look at while processing a primitive.
#[derive(Clone, Debug)]
pub struct DrawState {
    /// The rasterizer state.
    pub rasterizer: RasterizerState,
    /// The backend settings.
    pub settings: DrawSettings,
    /// The frustum and user planes.
    pub planes: PlaneSet,
    /// The viewports, selected by the viewport index output.
    pub viewports: [Viewport; MAX_VIEWPORTS],
    /// The outputs of the vertices entering the stages.
    pub outputs: ShaderInfo,
    /// The inputs of the fragment shader, if one is bound.
    pub fragment: Option<FragmentShaderInfo>,
}

impl Default for DrawState {
    fn default() -> Self {
        Self {
            rasterizer: RasterizerState::default(),
            settings: DrawSettings::default(),
            planes: PlaneSet::default(),
            viewports: [Viewport::default(); MAX_VIEWPORTS],
            outputs: ShaderInfo::default(),
            fragment: None,
        }
    }
}

impl DrawState {
    /// The planes vertices are tested against.
    pub fn clip_flags(&self) -> ClipTestFlags {
        ClipTestFlags {
            clip_xy: !self.settings.bypass_clip_xy,
            clip_z: self.rasterizer.depth_clip && !self.settings.bypass_clip_z,
            clip_user: self.rasterizer.clip_plane_enable,
            guard_band_xy: self.settings.guard_band_points_xy,
        }
    }

    /// The viewport selected by the given (provoking) vertex.
    pub fn viewport_for(&self, vertex: &ShadedVertex) -> &Viewport {
        let idx = self
            .outputs
            .viewport_index()
            .and_then(|vi| vertex.data.get(vi))
            .map_or(0, |vi| viewport_index_from_bits(vi[0].to_bits()));
        &self.viewports[idx]
    }

    /// The index of the provoking vertex of a primitive with `num_vertices` vertices.
    #[inline]
    pub fn provoking_vertex(&self, num_vertices: usize) -> usize {
        if self.rasterizer.flatshade_first {
            0
        } else {
            num_vertices.saturating_sub(1)
        }
    }
}
