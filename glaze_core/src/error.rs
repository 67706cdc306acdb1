// Copyright 2026 the Glaze Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Error taxonomy shared by the core and its backends.

use alloc::string::String;

use crate::scale::PixelSize;

/// Errors surfaced by texture, canvas and registry operations.
///
/// Allocation and upload failures are returned synchronously to the caller of
/// [`CanvasLayer::end`](crate::canvas_layer::CanvasLayer::end) or the
/// relevant constructor and are never retried internally.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum GraphicsError {
    /// A caller-supplied value was rejected.
    #[error("invalid argument: {0}")]
    InvalidArgument(&'static str),
    /// A texture or canvas could not be allocated.
    #[error("texture allocation of {size} failed: {reason}")]
    AllocationFailure {
        /// Requested pixel size.
        size: PixelSize,
        /// Backend-provided explanation.
        reason: String,
    },
    /// Raster content does not match the texture's pixel size.
    #[error("size mismatch: texture is {expected}, raster is {actual}")]
    SizeMismatch {
        /// Pixel size of the texture.
        expected: PixelSize,
        /// Pixel size of the offered raster content.
        actual: PixelSize,
    },
    /// The texture has been disposed.
    #[error("texture used after dispose")]
    UseAfterDispose,
    /// The platform could not decode image bytes.
    #[error("image decode failed: {0}")]
    Decode(String),
}

/// Shorthand for results carrying a [`GraphicsError`].
pub type Result<T, E = GraphicsError> = core::result::Result<T, E>;
