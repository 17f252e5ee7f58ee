// Copyright 2025 the Vello Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The draw context.

use crate::assembler::{self, PrimAssembler};
use crate::error::DrawError;
use crate::gs::GeometryShader;
use crate::pipeline::{check_bounds, Pipeline};
use crate::stage::Rasterizer;
use crate::state::{DrawSettings, DrawState, RasterizerState};
use crate::stats::PipelineStatistics;
use draw_common::cliptest::clip_test;
use draw_common::plane::{Plane, MAX_USER_PLANES};
use draw_common::prim::PrimInfo;
use draw_common::shader::{FragmentShaderInfo, ShaderInfo};
use draw_common::vertex::VertexInfo;
use draw_common::viewport::{Viewport, MAX_VIEWPORTS};
use log::{debug, trace, warn};

/// A draw context.
///
/// Owns the stage chain and the state of the draws, and feeds shaded vertices through the
/// optional geometry shader, the primitive assembler, the clip test and the stages into the
/// rasterizer backend.
///
/// Every state change flushes the primitives queued in the stages.
#[derive(Debug)]
pub struct DrawContext<R: Rasterizer> {
    backend: R,
    state: DrawState,
    pipeline: Pipeline,
    gs: Option<GeometryShader>,
    vs_outputs: ShaderInfo,
    assembler: PrimAssembler,
    stats: PipelineStatistics,
    constants: Vec<Vec<[f32; 4]>>,
}

impl<R: Rasterizer> DrawContext<R> {
    /// Create a new draw context in front of the given backend.
    pub fn new(backend: R) -> Self {
        Self {
            backend,
            state: DrawState::default(),
            pipeline: Pipeline::new(),
            gs: None,
            vs_outputs: ShaderInfo::new(),
            assembler: PrimAssembler::new(),
            stats: PipelineStatistics::default(),
            constants: vec![],
        }
    }

    /// The current state.
    pub fn state(&self) -> &DrawState {
        &self.state
    }

    /// Set the rasterizer state.
    pub fn set_rasterizer_state(&mut self, rasterizer: RasterizerState) {
        self.flush();
        self.state.planes.set_half_z(rasterizer.clip_halfz);
        self.state.rasterizer = rasterizer;
        self.pipeline.invalidate();
    }

    /// Set the backend settings.
    pub fn set_settings(&mut self, settings: DrawSettings) {
        self.flush();
        self.state.settings = settings;
        self.pipeline.invalidate();
    }

    /// Set a single viewport.
    ///
    /// Indices of [`MAX_VIEWPORTS`] and above are ignored.
    pub fn set_viewport(&mut self, index: usize, viewport: Viewport) {
        if index >= MAX_VIEWPORTS {
            warn!("ignoring viewport {index}, at most {MAX_VIEWPORTS} are supported");
            return;
        }
        self.flush();
        self.state.viewports[index] = viewport;
        self.pipeline.invalidate();
    }

    /// Set the viewports, starting at index 0.
    pub fn set_viewports(&mut self, viewports: &[Viewport]) {
        if viewports.len() > MAX_VIEWPORTS {
            warn!(
                "ignoring {} viewports, at most {MAX_VIEWPORTS} are supported",
                viewports.len() - MAX_VIEWPORTS
            );
        }
        self.flush();
        for (dst, src) in self.state.viewports.iter_mut().zip(viewports) {
            *dst = *src;
        }
        self.pipeline.invalidate();
    }

    /// Set the user clip planes.
    ///
    /// Planes are enabled separately by [`RasterizerState::clip_plane_enable`].
    pub fn set_clip_planes(&mut self, planes: &[Plane]) -> Result<(), DrawError> {
        if planes.len() > MAX_USER_PLANES {
            return Err(DrawError::TooManyUserPlanes(planes.len()));
        }
        self.flush();
        self.state.planes.set_user_planes(planes);
        self.pipeline.invalidate();
        Ok(())
    }

    /// Describe the outputs of the vertex shader.
    pub fn set_vertex_shader_outputs(&mut self, outputs: ShaderInfo) {
        self.flush();
        self.vs_outputs = outputs;
        self.pipeline.invalidate();
    }

    /// Describe the inputs of the fragment shader, or unbind it.
    pub fn set_fragment_shader(&mut self, fragment: Option<FragmentShaderInfo>) {
        self.flush();
        self.state.fragment = fragment;
        self.pipeline.invalidate();
    }

    /// Bind a geometry shader, or unbind the current one.
    pub fn bind_geometry_shader(&mut self, gs: Option<GeometryShader>) {
        self.flush();
        self.gs = gs;
        self.pipeline.invalidate();
    }

    /// The bound geometry shader.
    pub fn geometry_shader(&self) -> Option<&GeometryShader> {
        self.gs.as_ref()
    }

    /// Set the constant buffers of the geometry shader.
    pub fn set_constants(&mut self, constants: Vec<Vec<[f32; 4]>>) {
        self.flush();
        self.constants = constants;
    }

    /// Draw a primitive stream over shaded vertices.
    ///
    /// `verts` holds the outputs of the vertex shader, as described by
    /// [`set_vertex_shader_outputs`](Self::set_vertex_shader_outputs).
    pub fn draw(&mut self, prim: &PrimInfo, verts: &VertexInfo) -> Result<(), DrawError> {
        let mut stats = PipelineStatistics::default();
        for &len in &prim.primitive_lengths {
            stats.ia_vertices += u64::from(len);
            stats.ia_primitives += prim.kind.decomposed_prims_for_vertices(len as usize) as u64;
        }

        let (mut prim, mut verts, mut outputs) = match &mut self.gs {
            Some(gs) => {
                let out = gs.run(
                    &self.constants,
                    prim,
                    verts,
                    &self.vs_outputs,
                    self.state.rasterizer.flatshade_first,
                )?;
                stats.gs_invocations += out.invocations;
                stats.gs_primitives += out.primitives;
                (out.prim, out.verts, gs.info().outputs.clone())
            }
            None => {
                check_bounds(prim, verts.count())?;
                (prim.clone(), verts.clone(), self.vs_outputs.clone())
            }
        };

        if assembler::is_required(&self.state, prim.kind, &outputs) {
            let assembled = self.assembler.run(&self.state, &prim, &verts, &outputs)?;
            prim = assembled.prim;
            verts = assembled.verts;
            outputs = assembled.outputs;
        }

        if outputs.position().is_none() {
            return Err(DrawError::NoPositionOutput);
        }
        if outputs != self.state.outputs {
            debug!("draw: vertex outputs changed");
            self.flush();
            self.state.outputs = outputs;
            self.pipeline.invalidate();
        }

        let flags = self.state.clip_flags();
        let need_clip = clip_test(
            &mut verts,
            &self.state.outputs,
            &self.state.planes,
            &self.state.viewports,
            flags,
        );
        trace!(
            "draw: {} {:?} primitives over {} vertices, clipping needed: {need_clip}",
            prim.primitive_count(),
            prim.kind,
            verts.count()
        );

        self.pipeline
            .run(&self.state, &prim, &verts, &mut self.backend, &mut stats)?;

        if self.state.settings.collect_statistics {
            self.stats += stats;
        }
        Ok(())
    }

    /// Flush the primitives queued in the stages and the backend.
    pub fn flush(&mut self) {
        self.pipeline
            .flush(&self.state, &mut self.backend, &mut self.stats);
    }

    /// Restart the line stipple pattern.
    pub fn reset_stipple_counter(&mut self) {
        self.pipeline
            .reset_stipple_counter(&self.state, &mut self.backend, &mut self.stats);
    }

    /// The statistics collected since the last reset.
    pub fn statistics(&self) -> PipelineStatistics {
        self.stats
    }

    /// Reset the statistics to zero.
    pub fn reset_statistics(&mut self) {
        self.stats = PipelineStatistics::default();
    }

    /// The backend.
    pub fn backend(&self) -> &R {
        &self.backend
    }

    /// The backend, mutably.
    pub fn backend_mut(&mut self) -> &mut R {
        &mut self.backend
    }

    /// Flush and return the backend.
    pub fn into_backend(mut self) -> R {
        self.flush();
        self.backend
    }
}
