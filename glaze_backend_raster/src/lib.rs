// Copyright 2026 the Glaze Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! CPU raster backend for glaze.
//!
//! [`SoftwareRaster`] decodes PNG and JPEG bytes with the `image` crate and
//! draws bitmaps by inverse mapping: each target pixel centre inside the
//! transformed destination rectangle is mapped back into source space,
//! sampled, and composited source-over.
//!
//! ```
//! use glaze_backend_raster::{SoftwareRaster, SoftwareRasterConfig};
//! use glaze_core::raster::{RasterSurface, Rgba8};
//! use glaze_core::scale::{PixelSize, Scale};
//! use kurbo::Affine;
//!
//! let raster = SoftwareRaster::new(SoftwareRasterConfig::default());
//! let mut tile = RasterSurface::new(Scale::ONE, PixelSize::new(2, 2));
//! tile.bitmap_mut().fill(Rgba8::WHITE);
//!
//! let mut canvas = RasterSurface::new(Scale::ONE, PixelSize::new(8, 8));
//! canvas.draw_image(&raster, tile.image(), Affine::translate((3.0, 3.0)));
//! assert_eq!(canvas.pixel(3, 3), Some(Rgba8::WHITE));
//! assert_eq!(canvas.pixel(0, 0), Some(Rgba8::TRANSPARENT));
//! ```

use glaze_core::backend::RasterBackend;
use glaze_core::error::{GraphicsError, Result};
use glaze_core::raster::{Bitmap, Rgba8};
use glaze_core::scale::PixelSize;
use kurbo::{Affine, Point, Rect};

/// Configuration for a [`SoftwareRaster`].
#[derive(Clone, Copy, Debug)]
pub struct SoftwareRasterConfig {
    /// Sample bitmaps bilinearly instead of taking the nearest pixel.
    pub filter_bitmaps: bool,
}

impl Default for SoftwareRasterConfig {
    fn default() -> Self {
        Self {
            filter_bitmaps: true,
        }
    }
}

/// A [`RasterBackend`] that decodes and draws on the CPU.
#[derive(Clone, Debug, Default)]
pub struct SoftwareRaster {
    config: SoftwareRasterConfig,
}

impl SoftwareRaster {
    /// Creates a raster backend.
    #[must_use]
    pub const fn new(config: SoftwareRasterConfig) -> Self {
        Self { config }
    }

    /// The active configuration.
    #[must_use]
    pub const fn config(&self) -> SoftwareRasterConfig {
        self.config
    }
}

impl RasterBackend for SoftwareRaster {
    fn decode_bitmap(&self, bytes: &[u8]) -> Result<Bitmap> {
        let decoded = image::load_from_memory(bytes)
            .map_err(|e| GraphicsError::Decode(e.to_string()))?
            .to_rgba8();
        let (width, height) = decoded.dimensions();
        let pixels = decoded
            .as_raw()
            .chunks_exact(4)
            .map(|p| Rgba8::from_straight(p[0], p[1], p[2], p[3]))
            .collect();
        log::debug!("decoded {width}x{height} image");
        Bitmap::from_pixels(PixelSize::new(width, height), pixels)
    }

    fn draw_bitmap(
        &self,
        target: &mut Bitmap,
        source: &Bitmap,
        transform: Affine,
        src: Rect,
        dst: Rect,
    ) {
        let src = src.intersect(Rect::new(
            0.0,
            0.0,
            f64::from(source.pixel_width()),
            f64::from(source.pixel_height()),
        ));
        if src.is_zero_area() || dst.is_zero_area() || transform.determinant() == 0.0 {
            return;
        }
        let to_src = Affine::translate(src.origin().to_vec2())
            * Affine::scale_non_uniform(src.width() / dst.width(), src.height() / dst.height())
            * Affine::translate(-dst.origin().to_vec2());
        let inverse = to_src * transform.inverse();

        let covered = transform.transform_rect_bbox(dst).intersect(Rect::new(
            0.0,
            0.0,
            f64::from(target.pixel_width()),
            f64::from(target.pixel_height()),
        ));
        if covered.is_zero_area() {
            return;
        }
        let bounds = SampleBounds::new(src);
        let (x0, x1) = (pixel_index(covered.x0.floor()), pixel_index(covered.x1.ceil()));
        let (y0, y1) = (pixel_index(covered.y0.floor()), pixel_index(covered.y1.ceil()));

        for y in y0..y1 {
            for x in x0..x1 {
                let p = inverse * Point::new(f64::from(x) + 0.5, f64::from(y) + 0.5);
                if !src.contains(p) {
                    continue;
                }
                let color = if self.config.filter_bitmaps {
                    sample_bilinear(source, &bounds, p)
                } else {
                    source.get(pixel_index(p.x), pixel_index(p.y))
                };
                if let Some(color) = color {
                    let under = target.get(x, y).unwrap_or_default();
                    target.put(x, y, color.over(under));
                }
            }
        }
    }
}

/// Inclusive pixel range a filter may read from.
struct SampleBounds {
    x: (i64, i64),
    y: (i64, i64),
}

impl SampleBounds {
    fn new(src: Rect) -> Self {
        Self {
            x: (to_i64(src.x0.floor()), to_i64(src.x1.ceil()) - 1),
            y: (to_i64(src.y0.floor()), to_i64(src.y1.ceil()) - 1),
        }
    }
}

fn sample_bilinear(source: &Bitmap, bounds: &SampleBounds, p: Point) -> Option<Rgba8> {
    let fx = p.x - 0.5;
    let fy = p.y - 0.5;
    let (bx, by) = (fx.floor(), fy.floor());
    let (tx, ty) = (fx - bx, fy - by);
    let clamp_x = |v: i64| u32::try_from(v.clamp(bounds.x.0, bounds.x.1)).unwrap_or(0);
    let clamp_y = |v: i64| u32::try_from(v.clamp(bounds.y.0, bounds.y.1)).unwrap_or(0);
    let (xa, xb) = (clamp_x(to_i64(bx)), clamp_x(to_i64(bx) + 1));
    let (ya, yb) = (clamp_y(to_i64(by)), clamp_y(to_i64(by) + 1));

    let top = lerp(source.get(xa, ya)?, source.get(xb, ya)?, tx);
    let bottom = lerp(source.get(xa, yb)?, source.get(xb, yb)?, tx);
    Some(to_rgba8(lerp4(top, bottom, ty)))
}

fn lerp(a: Rgba8, b: Rgba8, t: f64) -> [f64; 4] {
    lerp4(channels(a), channels(b), t)
}

fn lerp4(a: [f64; 4], b: [f64; 4], t: f64) -> [f64; 4] {
    core::array::from_fn(|i| a[i] + (b[i] - a[i]) * t)
}

fn channels(c: Rgba8) -> [f64; 4] {
    [c.r, c.g, c.b, c.a].map(f64::from)
}

#[expect(
    clippy::cast_possible_truncation,
    reason = "channels are interpolated between u8 values and clamped"
)]
fn to_rgba8(c: [f64; 4]) -> Rgba8 {
    let [r, g, b, a] = c.map(|v| v.round().clamp(0.0, 255.0) as u8);
    Rgba8::new(r, g, b, a)
}

/// Converts a non-negative coordinate to a pixel index; negatives give 0.
#[expect(
    clippy::cast_possible_truncation,
    reason = "float-to-int `as` saturates, which is the clamping wanted here"
)]
fn pixel_index(v: f64) -> u32 {
    v as u32
}

#[expect(
    clippy::cast_possible_truncation,
    reason = "coordinates are bounded by bitmap dimensions"
)]
fn to_i64(v: f64) -> i64 {
    v as i64
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;

    const RED: Rgba8 = Rgba8::new(255, 0, 0, 255);
    const GREEN: Rgba8 = Rgba8::new(0, 255, 0, 255);
    const BLUE: Rgba8 = Rgba8::new(0, 0, 255, 255);

    fn nearest() -> SoftwareRaster {
        SoftwareRaster::new(SoftwareRasterConfig {
            filter_bitmaps: false,
        })
    }

    fn quad() -> Bitmap {
        Bitmap::from_pixels(
            PixelSize::new(2, 2),
            vec![RED, GREEN, BLUE, Rgba8::WHITE],
        )
        .unwrap()
    }

    fn full(bitmap: &Bitmap) -> Rect {
        Rect::new(
            0.0,
            0.0,
            f64::from(bitmap.pixel_width()),
            f64::from(bitmap.pixel_height()),
        )
    }

    #[test]
    fn decodes_png_premultiplied() {
        let png = image::RgbaImage::from_raw(2, 1, vec![255, 0, 0, 128, 10, 20, 30, 255]).unwrap();
        let mut bytes = Vec::new();
        png.write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png)
            .unwrap();

        let bitmap = nearest().decode_bitmap(&bytes).unwrap();
        assert_eq!(bitmap.size(), PixelSize::new(2, 1));
        assert_eq!(bitmap.get(0, 0), Some(Rgba8::new(128, 0, 0, 128)));
        assert_eq!(bitmap.get(1, 0), Some(Rgba8::new(10, 20, 30, 255)));
    }

    #[test]
    fn garbage_is_a_decode_error() {
        let err = nearest().decode_bitmap(b"not an image").unwrap_err();
        assert!(matches!(err, GraphicsError::Decode(_)), "got {err:?}");
    }

    #[test]
    fn identity_copy() {
        let source = quad();
        let mut target = Bitmap::new(source.size());
        for raster in [nearest(), SoftwareRaster::default()] {
            target.fill(Rgba8::TRANSPARENT);
            raster.draw_bitmap(
                &mut target,
                &source,
                Affine::IDENTITY,
                full(&source),
                full(&source),
            );
            assert_eq!(target, source, "filter: {}", raster.config().filter_bitmaps);
        }
    }

    #[test]
    fn nearest_upscale_doubles_pixels() {
        let source = quad();
        let mut target = Bitmap::new(PixelSize::new(4, 4));
        nearest().draw_bitmap(
            &mut target,
            &source,
            Affine::scale(2.0),
            full(&source),
            full(&source),
        );
        for y in 0..4 {
            for x in 0..4 {
                assert_eq!(target.get(x, y), source.get(x / 2, y / 2), "at ({x}, {y})");
            }
        }
    }

    #[test]
    fn translation_and_clipping() {
        let source = quad();
        let mut target = Bitmap::new(PixelSize::new(3, 3));
        nearest().draw_bitmap(
            &mut target,
            &source,
            Affine::translate((1.0, 1.0)),
            full(&source),
            full(&source),
        );
        assert_eq!(target.get(0, 0), Some(Rgba8::TRANSPARENT));
        assert_eq!(target.get(1, 1), Some(RED));
        assert_eq!(target.get(2, 2), Some(Rgba8::WHITE));

        let mut target = Bitmap::new(PixelSize::new(2, 2));
        nearest().draw_bitmap(
            &mut target,
            &source,
            Affine::translate((-1.0, 0.0)),
            full(&source),
            full(&source),
        );
        assert_eq!(target.get(0, 0), Some(GREEN));
        assert_eq!(target.get(0, 1), Some(Rgba8::WHITE));
        assert_eq!(target.get(1, 0), Some(Rgba8::TRANSPARENT));
    }

    #[test]
    fn source_region_is_respected() {
        let source = quad();
        let mut target = Bitmap::new(PixelSize::new(2, 2));
        nearest().draw_bitmap(
            &mut target,
            &source,
            Affine::IDENTITY,
            Rect::new(1.0, 1.0, 2.0, 2.0),
            Rect::new(0.0, 0.0, 2.0, 2.0),
        );
        assert!(target.pixels().iter().all(|&p| p == Rgba8::WHITE));
    }

    #[test]
    fn composites_source_over() {
        let half = Rgba8::from_straight(0, 0, 255, 128);
        let source = Bitmap::from_pixels(PixelSize::new(1, 1), vec![half]).unwrap();
        let mut target = Bitmap::new(PixelSize::new(1, 1));
        target.fill(RED);
        nearest().draw_bitmap(
            &mut target,
            &source,
            Affine::IDENTITY,
            full(&source),
            full(&source),
        );
        assert_eq!(target.get(0, 0), Some(half.over(RED)));
    }

    #[test]
    fn bilinear_blends_neighbours() {
        let source =
            Bitmap::from_pixels(PixelSize::new(2, 1), vec![Rgba8::BLACK, Rgba8::WHITE]).unwrap();
        let mut target = Bitmap::new(PixelSize::new(4, 1));
        SoftwareRaster::default().draw_bitmap(
            &mut target,
            &source,
            Affine::scale(2.0),
            full(&source),
            full(&source),
        );
        let grey: Vec<u8> = target.pixels().iter().map(|p| p.r).collect();
        assert_eq!(grey, [0, 64, 191, 255]);
        assert!(target.pixels().iter().all(|p| p.a == 255));
    }

    #[test]
    fn degenerate_inputs_draw_nothing() {
        let source = quad();
        let mut target = Bitmap::new(PixelSize::new(2, 2));
        let raster = nearest();
        raster.draw_bitmap(&mut target, &source, Affine::scale(0.0), full(&source), full(&source));
        raster.draw_bitmap(&mut target, &source, Affine::IDENTITY, Rect::ZERO, full(&source));
        raster.draw_bitmap(&mut target, &source, Affine::IDENTITY, full(&source), Rect::ZERO);
        assert!(target.pixels().iter().all(|&p| p == Rgba8::TRANSPARENT));
    }
}
