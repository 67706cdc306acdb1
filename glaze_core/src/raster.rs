// Copyright 2026 the Glaze Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! CPU-side pixel storage: bitmaps, scaled images and drawable surfaces.
//!
//! These types are plain owned data with no GPU or context references, so a
//! [`RasterSurface`] can be filled on a worker thread and handed back to the
//! rendering thread before the owning
//! [`CanvasLayer`](crate::canvas_layer::CanvasLayer) ends its transaction.

use alloc::format;
use alloc::vec;
use alloc::vec::Vec;

use bytemuck::{Pod, Zeroable};
use kurbo::{Affine, Rect, Size};

use crate::backend::RasterBackend;
use crate::error::{GraphicsError, Result};
use crate::scale::{PixelSize, Scale};

/// One premultiplied RGBA8 pixel.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Pod, Zeroable)]
pub struct Rgba8 {
    /// Red, premultiplied by alpha.
    pub r: u8,
    /// Green, premultiplied by alpha.
    pub g: u8,
    /// Blue, premultiplied by alpha.
    pub b: u8,
    /// Alpha.
    pub a: u8,
}

impl Rgba8 {
    /// Fully transparent.
    pub const TRANSPARENT: Self = Self::new(0, 0, 0, 0);
    /// Opaque black.
    pub const BLACK: Self = Self::new(0, 0, 0, 255);
    /// Opaque white.
    pub const WHITE: Self = Self::new(255, 255, 255, 255);

    /// Creates a pixel from already-premultiplied components.
    #[inline]
    #[must_use]
    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// Creates a pixel from straight (non-premultiplied) components.
    #[must_use]
    pub const fn from_straight(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self {
            r: mul_div255(r, a),
            g: mul_div255(g, a),
            b: mul_div255(b, a),
            a,
        }
    }

    /// Composites `self` over `dst` (premultiplied source-over).
    #[must_use]
    pub const fn over(self, dst: Self) -> Self {
        let inv = 255 - self.a;
        Self {
            r: self.r.saturating_add(mul_div255(dst.r, inv)),
            g: self.g.saturating_add(mul_div255(dst.g, inv)),
            b: self.b.saturating_add(mul_div255(dst.b, inv)),
            a: self.a.saturating_add(mul_div255(dst.a, inv)),
        }
    }
}

/// `round(a * b / 255)` without floating point.
#[inline]
#[expect(clippy::cast_possible_truncation, reason = "result is at most 255")]
const fn mul_div255(a: u8, b: u8) -> u8 {
    let t = a as u16 * b as u16 + 128;
    ((t + (t >> 8)) >> 8) as u8
}

/// A row-major buffer of premultiplied pixels with fixed dimensions.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Bitmap {
    size: PixelSize,
    pixels: Vec<Rgba8>,
}

impl Bitmap {
    /// Allocates a transparent (zeroed) bitmap.
    #[must_use]
    pub fn new(size: PixelSize) -> Self {
        Self {
            size,
            pixels: vec![Rgba8::TRANSPARENT; size.area()],
        }
    }

    /// Allocates a transparent bitmap, reporting allocation failure instead
    /// of aborting.
    ///
    /// # Errors
    ///
    /// Returns [`GraphicsError::AllocationFailure`] if the pixel buffer size
    /// overflows or the allocator refuses it.
    pub fn try_new(size: PixelSize) -> Result<Self> {
        let fail = |reason| GraphicsError::AllocationFailure { size, reason };
        let len = size
            .checked_area()
            .filter(|&n| {
                n.checked_mul(size_of::<Rgba8>())
                    .is_some_and(|bytes| bytes <= isize::MAX.unsigned_abs())
            })
            .ok_or_else(|| fail(format!("{size} pixel buffer overflows")))?;
        let mut pixels = Vec::new();
        pixels
            .try_reserve_exact(len)
            .map_err(|err| fail(format!("{err}")))?;
        pixels.resize(len, Rgba8::TRANSPARENT);
        Ok(Self { size, pixels })
    }

    /// Wraps existing pixels.
    ///
    /// # Errors
    ///
    /// Returns [`GraphicsError::InvalidArgument`] if `pixels.len()` does not
    /// equal `size.area()`.
    pub fn from_pixels(size: PixelSize, pixels: Vec<Rgba8>) -> Result<Self> {
        if pixels.len() != size.area() {
            return Err(GraphicsError::InvalidArgument(
                "pixel buffer length does not match bitmap size",
            ));
        }
        Ok(Self { size, pixels })
    }

    /// Pixel dimensions.
    #[inline]
    #[must_use]
    pub const fn size(&self) -> PixelSize {
        self.size
    }

    /// Width in pixels.
    #[inline]
    #[must_use]
    pub const fn pixel_width(&self) -> u32 {
        self.size.width
    }

    /// Height in pixels.
    #[inline]
    #[must_use]
    pub const fn pixel_height(&self) -> u32 {
        self.size.height
    }

    /// All pixels, row-major.
    #[inline]
    #[must_use]
    pub fn pixels(&self) -> &[Rgba8] {
        &self.pixels
    }

    /// All pixels, row-major, mutable.
    #[inline]
    pub fn pixels_mut(&mut self) -> &mut [Rgba8] {
        &mut self.pixels
    }

    /// The pixel buffer as tightly packed RGBA8 bytes.
    #[inline]
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.pixels)
    }

    /// Returns the pixel at `(x, y)`, if in bounds.
    #[must_use]
    pub fn get(&self, x: u32, y: u32) -> Option<Rgba8> {
        self.index(x, y).map(|i| self.pixels[i])
    }

    /// Overwrites the pixel at `(x, y)`; out-of-bounds writes are ignored.
    pub fn put(&mut self, x: u32, y: u32, color: Rgba8) {
        if let Some(i) = self.index(x, y) {
            self.pixels[i] = color;
        }
    }

    /// Overwrites every pixel.
    pub fn fill(&mut self, color: Rgba8) {
        self.pixels.fill(color);
    }

    fn index(&self, x: u32, y: u32) -> Option<usize> {
        (x < self.size.width && y < self.size.height)
            .then(|| y as usize * self.size.width as usize + x as usize)
    }
}

/// A bitmap together with the scale used to interpret it.
#[derive(Clone, Debug, PartialEq)]
pub struct Image {
    scale: Scale,
    bitmap: Bitmap,
}

impl Image {
    /// Wraps a bitmap at the given scale.
    #[must_use]
    pub const fn new(scale: Scale, bitmap: Bitmap) -> Self {
        Self { scale, bitmap }
    }

    /// The image's scale.
    #[inline]
    #[must_use]
    pub const fn scale(&self) -> Scale {
        self.scale
    }

    /// Logical width (pixel width / factor).
    #[must_use]
    pub fn width(&self) -> f64 {
        self.scale.to_logical(f64::from(self.bitmap.pixel_width()))
    }

    /// Logical height (pixel height / factor).
    #[must_use]
    pub fn height(&self) -> f64 {
        self.scale.to_logical(f64::from(self.bitmap.pixel_height()))
    }

    /// Logical size.
    #[must_use]
    pub fn size(&self) -> Size {
        self.scale.logical_size(self.bitmap.size())
    }

    /// Pixel dimensions.
    #[inline]
    #[must_use]
    pub const fn pixel_size(&self) -> PixelSize {
        self.bitmap.size()
    }

    /// The underlying pixels.
    #[inline]
    #[must_use]
    pub const fn bitmap(&self) -> &Bitmap {
        &self.bitmap
    }

    /// The underlying pixels, mutable.
    #[inline]
    pub fn bitmap_mut(&mut self) -> &mut Bitmap {
        &mut self.bitmap
    }

    /// Unwraps the bitmap.
    #[must_use]
    pub fn into_bitmap(self) -> Bitmap {
        self.bitmap
    }
}

/// A drawable CPU surface addressed in logical units.
///
/// The pixel size is fixed at creation. Content becomes visible on the GPU
/// only when an owning [`CanvasLayer`](crate::canvas_layer::CanvasLayer)
/// ends its transaction, or when passed to
/// [`TextureResource::upload_from`](crate::texture::TextureResource::upload_from).
#[derive(Clone, Debug, PartialEq)]
pub struct RasterSurface {
    image: Image,
}

impl RasterSurface {
    /// Allocates a transparent surface.
    #[must_use]
    pub fn new(scale: Scale, pixel_size: PixelSize) -> Self {
        Self {
            image: Image::new(scale, Bitmap::new(pixel_size)),
        }
    }

    /// Allocates a transparent surface, reporting allocation failure.
    ///
    /// # Errors
    ///
    /// See [`Bitmap::try_new`].
    pub fn try_new(scale: Scale, pixel_size: PixelSize) -> Result<Self> {
        Ok(Self {
            image: Image::new(scale, Bitmap::try_new(pixel_size)?),
        })
    }

    /// Logical width.
    #[must_use]
    pub fn width(&self) -> f64 {
        self.image.width()
    }

    /// Logical height.
    #[must_use]
    pub fn height(&self) -> f64 {
        self.image.height()
    }

    /// Logical size.
    #[must_use]
    pub fn size(&self) -> Size {
        self.image.size()
    }

    /// Pixel dimensions.
    #[inline]
    #[must_use]
    pub const fn pixel_size(&self) -> PixelSize {
        self.image.pixel_size()
    }

    /// The surface's scale.
    #[inline]
    #[must_use]
    pub const fn scale(&self) -> Scale {
        self.image.scale()
    }

    /// The surface's content as an image.
    #[inline]
    #[must_use]
    pub const fn image(&self) -> &Image {
        &self.image
    }

    /// The backing pixels.
    #[inline]
    #[must_use]
    pub const fn bitmap(&self) -> &Bitmap {
        self.image.bitmap()
    }

    /// The backing pixels, mutable, for platform raster code.
    #[inline]
    pub fn bitmap_mut(&mut self) -> &mut Bitmap {
        self.image.bitmap_mut()
    }

    /// Consumes the surface, keeping its content.
    #[must_use]
    pub fn into_image(self) -> Image {
        self.image
    }

    /// Reads back the pixel at `(x, y)` in pixel coordinates.
    #[must_use]
    pub fn pixel(&self, x: u32, y: u32) -> Option<Rgba8> {
        self.bitmap().get(x, y)
    }

    /// Resets every pixel to transparent.
    pub fn clear(&mut self) {
        self.bitmap_mut().fill(Rgba8::TRANSPARENT);
    }

    /// Composites `color` over the pixels whose centers fall inside `rect`
    /// (logical units).
    pub fn fill_rect(&mut self, rect: Rect, color: Rgba8) {
        let rect = rect.abs();
        let scale = self.scale();
        let PixelSize { width, height } = self.pixel_size();
        // A pixel is covered when its center lies in the scaled rect.
        let x0 = scale.scaled_floor(rect.x0 + 0.5 / scale.factor()).min(width);
        let x1 = scale.scaled_floor(rect.x1 + 0.5 / scale.factor()).min(width);
        let y0 = scale.scaled_floor(rect.y0 + 0.5 / scale.factor()).min(height);
        let y1 = scale.scaled_floor(rect.y1 + 0.5 / scale.factor()).min(height);
        let stride = width as usize;
        let pixels = self.bitmap_mut().pixels_mut();
        for y in y0..y1 {
            let row = &mut pixels[y as usize * stride..][x0 as usize..x1 as usize];
            for px in row {
                *px = color.over(*px);
            }
        }
    }

    /// Draws `image` through `transform`, which maps the image's logical
    /// space into this surface's logical space.
    pub fn draw_image<R: RasterBackend + ?Sized>(
        &mut self,
        raster: &R,
        image: &Image,
        transform: Affine,
    ) {
        let src = pixel_rect(image.pixel_size());
        let dst = Rect::from_origin_size((0.0, 0.0), image.size());
        let to_pixels = Affine::scale(self.scale().factor()) * transform;
        raster.draw_bitmap(self.bitmap_mut(), image.bitmap(), to_pixels, src, dst);
    }

    /// Draws the `src` region of `image` into `dst`, both in logical units.
    pub fn draw_image_region<R: RasterBackend + ?Sized>(
        &mut self,
        raster: &R,
        image: &Image,
        src: Rect,
        dst: Rect,
    ) {
        let src_px = src.scale_from_origin(image.scale().factor());
        let to_pixels = Affine::scale(self.scale().factor());
        raster.draw_bitmap(self.bitmap_mut(), image.bitmap(), to_pixels, src_px, dst);
    }
}

fn pixel_rect(size: PixelSize) -> Rect {
    Rect::new(0.0, 0.0, f64::from(size.width), f64::from(size.height))
}
