// Copyright 2026 the Glaze Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Test doubles for the backend traits.

use alloc::collections::BTreeMap;
use alloc::rc::Rc;
use alloc::string::String;
use alloc::vec::Vec;
use core::cell::RefCell;

use kurbo::{Affine, Rect};

use crate::backend::{GpuBackend, RasterBackend, TextureId};
use crate::error::{GraphicsError, Result};
use crate::graphics::{Graphics, GraphicsConfig};
use crate::raster::Bitmap;
use crate::scale::{PixelSize, Scale};

/// Everything a [`RecordingGpu`] has been asked to do.
#[derive(Debug)]
pub(crate) struct GpuLog {
    pub(crate) live: BTreeMap<TextureId, (PixelSize, Vec<u8>)>,
    pub(crate) released: Vec<TextureId>,
    pub(crate) uploads: usize,
    pub(crate) allocations: usize,
    pub(crate) context_losses: usize,
    pub(crate) fail_allocations: bool,
    pub(crate) max_size: u32,
    next_id: u64,
}

impl GpuLog {
    pub(crate) fn contents(&self, id: TextureId) -> Option<&[u8]> {
        self.live.get(&id).map(|(_, bytes)| bytes.as_slice())
    }

    pub(crate) fn is_live(&self, id: TextureId) -> bool {
        self.live.contains_key(&id)
    }
}

impl Default for GpuLog {
    fn default() -> Self {
        Self {
            live: BTreeMap::new(),
            released: Vec::new(),
            uploads: 0,
            allocations: 0,
            context_losses: 0,
            fail_allocations: false,
            max_size: 4096,
            next_id: 1,
        }
    }
}

/// A [`GpuBackend`] that keeps texture contents in memory.
#[derive(Debug)]
pub(crate) struct RecordingGpu {
    log: Rc<RefCell<GpuLog>>,
}

impl GpuBackend for RecordingGpu {
    fn max_texture_size(&self) -> u32 {
        self.log.borrow().max_size
    }

    fn allocate_texture(&mut self, size: PixelSize) -> Result<TextureId> {
        let mut log = self.log.borrow_mut();
        if log.fail_allocations {
            return Err(GraphicsError::AllocationFailure {
                size,
                reason: String::from("out of memory"),
            });
        }
        let id = TextureId(log.next_id);
        log.next_id += 1;
        log.allocations += 1;
        log.live.insert(id, (size, Vec::new()));
        Ok(id)
    }

    fn upload_pixels(&mut self, id: TextureId, size: PixelSize, pixels: &[u8]) -> Result<()> {
        let mut log = self.log.borrow_mut();
        let Some((allocated, contents)) = log.live.get_mut(&id) else {
            return Err(GraphicsError::InvalidArgument("unknown texture id"));
        };
        assert_eq!(*allocated, size, "upload size differs from allocation");
        assert_eq!(pixels.len(), size.area() * 4, "upload byte count");
        *contents = pixels.to_vec();
        log.uploads += 1;
        Ok(())
    }

    fn release_texture(&mut self, id: TextureId) {
        let mut log = self.log.borrow_mut();
        assert!(log.live.remove(&id).is_some(), "released unknown {id:?}");
        log.released.push(id);
    }

    fn context_lost(&mut self) {
        let mut log = self.log.borrow_mut();
        log.live.clear();
        log.context_losses += 1;
    }
}

/// A [`RasterBackend`] that rejects every decode and never draws.
#[derive(Debug)]
pub(crate) struct FailingRaster;

impl RasterBackend for FailingRaster {
    fn decode_bitmap(&self, _bytes: &[u8]) -> Result<Bitmap> {
        Err(GraphicsError::Decode(String::from("unsupported")))
    }

    fn draw_bitmap(&self, _: &mut Bitmap, _: &Bitmap, _: Affine, _: Rect, _: Rect) {}
}

/// A [`RasterBackend`] that blits with nearest sampling at integer offsets.
///
/// Only handles axis-aligned scale-and-translate transforms, which is all the
/// core's callers produce.
#[derive(Debug)]
pub(crate) struct NearestRaster;

impl RasterBackend for NearestRaster {
    fn decode_bitmap(&self, _bytes: &[u8]) -> Result<Bitmap> {
        Err(GraphicsError::Decode(String::from("unsupported")))
    }

    #[expect(
        clippy::cast_possible_truncation,
        reason = "test blitter works on small in-range coordinates"
    )]
    fn draw_bitmap(
        &self,
        target: &mut Bitmap,
        source: &Bitmap,
        transform: Affine,
        src: Rect,
        dst: Rect,
    ) {
        let to_src = Affine::translate(src.origin().to_vec2())
            * Affine::scale_non_uniform(src.width() / dst.width(), src.height() / dst.height())
            * Affine::translate(-dst.origin().to_vec2());
        let inverse = to_src * transform.inverse();
        for y in 0..target.pixel_height() {
            for x in 0..target.pixel_width() {
                let p = inverse * kurbo::Point::new(f64::from(x) + 0.5, f64::from(y) + 0.5);
                if !src.contains(p) {
                    continue;
                }
                if let Some(color) = source.get(p.x as u32, p.y as u32) {
                    let under = target.get(x, y).unwrap_or_default();
                    target.put(x, y, color.over(under));
                }
            }
        }
    }
}

/// Builds a context over a fresh [`RecordingGpu`].
pub(crate) fn graphics(factor: f64) -> (Graphics, Rc<RefCell<GpuLog>>) {
    let log = Rc::new(RefCell::new(GpuLog::default()));
    let gpu = RecordingGpu { log: log.clone() };
    let scale = Scale::new(factor).expect("valid test scale");
    (Graphics::new(GraphicsConfig::new(scale), gpu), log)
}
