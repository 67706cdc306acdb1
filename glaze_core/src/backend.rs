// Copyright 2026 the Glaze Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Backend contract for platform integrations.
//!
//! Glaze splits platform-specific work into two collaborators:
//!
//! - **GPU** — [`GpuBackend`] allocates texture ids, uploads raw pixels into
//!   them and releases them. It lives on the rendering thread, owned by a
//!   [`Graphics`](crate::graphics::Graphics) context.
//!
//! - **Raster** — [`RasterBackend`] decodes encoded images into
//!   [`Bitmap`]s and blits one bitmap onto another through an affine
//!   transform. It holds no GPU state and may be used from any thread that
//!   owns the bitmaps involved.
//!
//! Backends report failures as [`GraphicsError`](crate::error::GraphicsError)
//! and never retry; retry policy, if any, belongs to the platform glue that
//! calls into the core.
//!
//! All pixel data crossing these traits is row-major, tightly packed,
//! premultiplied RGBA8.

use core::fmt;

use kurbo::{Affine, Rect};

use crate::error::Result;
use crate::raster::Bitmap;
use crate::scale::PixelSize;

/// An opaque GPU texture identifier assigned by a [`GpuBackend`].
///
/// An id is valid from [`allocate_texture`](GpuBackend::allocate_texture)
/// until it is released or the GPU context is lost. The core never reuses an
/// id across a context loss.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TextureId(pub u64);

impl fmt::Debug for TextureId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TextureId({})", self.0)
    }
}

/// GPU texture services used by the core.
///
/// Every method runs on the rendering thread and completes synchronously.
pub trait GpuBackend {
    /// Largest width or height the backend can allocate.
    fn max_texture_size(&self) -> u32;

    /// Allocates a texture of the given pixel size.
    ///
    /// # Errors
    ///
    /// Returns [`GraphicsError::AllocationFailure`](crate::error::GraphicsError::AllocationFailure)
    /// if the platform cannot allocate the texture.
    fn allocate_texture(&mut self, size: PixelSize) -> Result<TextureId>;

    /// Replaces the full contents of `id` with `pixels`.
    ///
    /// `pixels` holds exactly `size.area() * 4` bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if `id` is unknown to the backend or the upload is
    /// rejected.
    fn upload_pixels(&mut self, id: TextureId, size: PixelSize, pixels: &[u8]) -> Result<()>;

    /// Releases a live texture.
    fn release_texture(&mut self, id: TextureId);

    /// Called when the GPU context has been destroyed.
    ///
    /// Backends forget every id they handed out without attempting to free
    /// it; the context already did.
    fn context_lost(&mut self) {}

    /// Called when a fresh GPU context is available.
    fn context_restored(&mut self) {}
}

/// CPU raster services used by the core.
pub trait RasterBackend {
    /// Decodes encoded image bytes into a premultiplied bitmap.
    ///
    /// # Errors
    ///
    /// Returns [`GraphicsError::Decode`](crate::error::GraphicsError::Decode)
    /// if the bytes are not a supported image.
    fn decode_bitmap(&self, bytes: &[u8]) -> Result<Bitmap>;

    /// Creates a blank bitmap.
    fn create_bitmap(&self, size: PixelSize) -> Bitmap {
        Bitmap::new(size)
    }

    /// Draws the `src` region of `source` (in source pixels) onto `target`.
    ///
    /// `src` is first mapped onto `dst`, then `transform` maps `dst`'s
    /// coordinate space into target pixels. Pixels outside the target are
    /// discarded; drawing composites source-over.
    fn draw_bitmap(
        &self,
        target: &mut Bitmap,
        source: &Bitmap,
        transform: Affine,
        src: Rect,
        dst: Rect,
    );
}
