// Copyright 2025 the Vello Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use draw_common::prim::PrimKind;
use thiserror::Error;

/// Errors that abort a draw or the binding of a shader.
///
/// Numeric problems with single primitives are never reported, such primitives are
/// dropped instead.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum DrawError {
    /// The last shader stage doesn't write a position.
    #[error("The last shader stage has no position output")]
    NoPositionOutput,
    /// The geometry shader can't be used.
    #[error("Invalid geometry shader: {0}")]
    InvalidGeometryShader(&'static str),
    /// The primitive kind can't be drawn in the current configuration.
    #[error("Unsupported primitive kind {0:?}")]
    UnsupportedPrimitive(PrimKind),
    /// The primitive kind doesn't match the input of the bound geometry shader.
    #[error("Primitive kind {draw:?} doesn't match the geometry shader input {shader:?}")]
    PrimitiveMismatch {
        /// The drawn primitive kind.
        draw: PrimKind,
        /// The input primitive kind of the shader.
        shader: PrimKind,
    },
    /// A primitive stream references a vertex that doesn't exist.
    #[error("Vertex index {index} out of bounds for {count} vertices")]
    IndexOutOfBounds {
        /// The offending index.
        index: u32,
        /// The number of vertices.
        count: usize,
    },
    /// More user clip planes were supplied than supported.
    #[error("{0} user clip planes supplied, at most 8 are supported")]
    TooManyUserPlanes(usize),
    /// The geometry shader backend failed.
    #[error("Shader invocation failed: {0}")]
    ShaderInvocation(String),
    /// A worst-case output buffer couldn't be allocated.
    #[error("Out of memory")]
    OutOfMemory,
}

impl From<std::collections::TryReserveError> for DrawError {
    fn from(_: std::collections::TryReserveError) -> Self {
        Self::OutOfMemory
    }
}
