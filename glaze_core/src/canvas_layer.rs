// Copyright 2026 the Glaze Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! A raster surface paired with the texture that displays it.
//!
//! Drawing happens between [`CanvasLayer::begin`] and [`CanvasLayer::end`].
//! Nothing reaches the GPU until `end`, which uploads the whole surface.
//!
//! ```text
//!   Empty ──end──► Ready ──resize──► Stale ──end──► Ready
//! ```

use alloc::rc::Rc;

use kurbo::Size;

use crate::error::Result;
use crate::graphics::Graphics;
use crate::raster::RasterSurface;
use crate::scene::SurfaceId;
use crate::texture::TextureResource;

/// Upload state of a [`CanvasLayer`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum LayerState {
    /// Nothing has been uploaded yet.
    Empty,
    /// The texture reflects the surface as of the last `end`.
    Ready,
    /// The surface was replaced; the texture shows old content until `end`.
    Stale,
}

/// A canvas whose content is presented through a GPU texture.
///
/// The layer's [`SurfaceId`] stays the same for its whole life; scene nodes
/// reference it and see whichever texture the last `end` produced.
#[derive(Debug)]
pub struct CanvasLayer {
    gfx: Graphics,
    canvas: RasterSurface,
    texture: Option<Rc<TextureResource>>,
    surface: SurfaceId,
    state: LayerState,
    size: Option<Size>,
}

impl CanvasLayer {
    /// Creates a layer with a blank canvas of the given logical size.
    ///
    /// # Errors
    ///
    /// See [`Graphics::create_canvas`].
    pub fn new(gfx: &Graphics, width: f64, height: f64) -> Result<Self> {
        let canvas = gfx.create_canvas(width, height)?;
        Ok(Self::from_parts(gfx, canvas))
    }

    /// Creates a layer over existing content and uploads it immediately.
    ///
    /// # Errors
    ///
    /// Returns allocation or upload failures.
    pub fn with_canvas(gfx: &Graphics, canvas: RasterSurface) -> Result<Self> {
        let mut layer = Self::from_parts(gfx, canvas);
        layer.end()?;
        Ok(layer)
    }

    fn from_parts(gfx: &Graphics, canvas: RasterSurface) -> Self {
        Self {
            gfx: gfx.clone(),
            canvas,
            texture: None,
            surface: gfx.allocate_surface_id(),
            state: LayerState::Empty,
            size: None,
        }
    }

    /// Replaces the canvas with a blank one of the new logical size.
    ///
    /// The current texture keeps showing the old content until the next
    /// [`end`](Self::end).
    ///
    /// # Errors
    ///
    /// See [`Graphics::create_canvas`]. The layer is unchanged on error.
    pub fn resize(&mut self, width: f64, height: f64) -> Result<()> {
        let canvas = self.gfx.create_canvas(width, height)?;
        self.replace_canvas(canvas);
        Ok(())
    }

    /// Swaps in content prepared elsewhere, for example on a worker thread.
    ///
    /// Returns the previous canvas.
    pub fn replace_canvas(&mut self, canvas: RasterSurface) -> RasterSurface {
        if self.state == LayerState::Ready {
            self.state = LayerState::Stale;
        }
        core::mem::replace(&mut self.canvas, canvas)
    }

    /// Opens a drawing transaction and returns the canvas to draw on.
    pub fn begin(&mut self) -> &mut RasterSurface {
        &mut self.canvas
    }

    /// Closes the transaction by uploading the full canvas.
    ///
    /// The existing texture is reused when its pixel size still matches;
    /// otherwise a new one replaces it. On error the layer keeps its previous
    /// texture and state.
    ///
    /// An empty canvas uploads nothing: the old texture is released and the
    /// surface is bound as empty.
    ///
    /// # Errors
    ///
    /// Returns allocation or upload failures.
    pub fn end(&mut self) -> Result<()> {
        let pixel_size = self.canvas.pixel_size();
        if pixel_size.is_empty() {
            log::debug!("ignoring texture update for empty {pixel_size} canvas");
            if let Some(old) = self.texture.take() {
                old.dispose();
            }
            self.gfx.bind_empty_surface(self.surface);
            self.state = LayerState::Ready;
            return Ok(());
        }
        match &self.texture {
            Some(texture) if !texture.is_disposed() && texture.pixel_size() == pixel_size => {
                texture.upload_from(&self.canvas)?;
            }
            _ => {
                let texture = TextureResource::create(&self.gfx, pixel_size)?;
                texture.upload_from(&self.canvas)?;
                if let Some(old) = self.texture.replace(texture) {
                    old.dispose();
                }
            }
        }
        if let Some(texture) = &self.texture {
            self.gfx.bind_surface(self.surface, texture);
        }
        self.state = LayerState::Ready;
        Ok(())
    }

    /// Logical width: the explicit size if set, else the canvas's.
    #[must_use]
    pub fn width(&self) -> f64 {
        self.size.map_or_else(|| self.canvas.width(), |s| s.width)
    }

    /// Logical height: the explicit size if set, else the canvas's.
    #[must_use]
    pub fn height(&self) -> f64 {
        self.size.map_or_else(|| self.canvas.height(), |s| s.height)
    }

    /// Overrides the drawing size without touching the canvas.
    pub fn set_size(&mut self, width: f64, height: f64) {
        self.size = Some(Size::new(width, height));
    }

    /// Falls back to the canvas's natural size.
    pub fn clear_size(&mut self) {
        self.size = None;
    }

    /// The current texture, if an `end` has uploaded non-empty content.
    #[must_use]
    pub fn texture(&self) -> Option<&Rc<TextureResource>> {
        self.texture.as_ref()
    }

    /// Current upload state.
    #[must_use]
    pub fn state(&self) -> LayerState {
        self.state
    }

    /// The id scene nodes use to reference this layer's texture.
    #[must_use]
    pub fn surface_id(&self) -> SurfaceId {
        self.surface
    }

    /// The canvas, read-only.
    #[must_use]
    pub fn canvas(&self) -> &RasterSurface {
        &self.canvas
    }
}

impl Drop for CanvasLayer {
    fn drop(&mut self) {
        self.gfx.unbind_surface(self.surface);
        if let Some(texture) = self.texture.take() {
            texture.dispose();
        }
    }
}

#[cfg(test)]
mod tests {
    use kurbo::Rect;

    use super::*;
    use crate::error::GraphicsError;
    use crate::raster::Rgba8;
    use crate::scale::{PixelSize, Scale};
    use crate::test_support::graphics;
    use crate::texture::TextureState;

    #[test]
    fn retina_layer_sizes() {
        let (gfx, _gpu) = graphics(2.0);
        let mut layer = CanvasLayer::new(&gfx, 100.0, 50.0).unwrap();
        assert_eq!(layer.canvas().pixel_size(), PixelSize::new(200, 100));
        assert_eq!(layer.width(), 100.0);
        assert_eq!(layer.height(), 50.0);
        assert_eq!(layer.state(), LayerState::Empty);
        assert!(layer.texture().is_none());

        layer.resize(40.0, 40.0).unwrap();
        assert_eq!(layer.width(), 40.0);
        assert_eq!(layer.canvas().pixel_size(), PixelSize::new(80, 80));
        assert_eq!(layer.state(), LayerState::Empty, "nothing to be stale yet");
    }

    #[test]
    fn resize_of_ready_layer_reports_new_size_at_once() {
        let (gfx, _gpu) = graphics(1.0);
        let mut layer = CanvasLayer::new(&gfx, 20.0, 20.0).unwrap();
        layer.end().unwrap();

        layer.resize(40.0, 40.0).unwrap();
        assert_eq!((layer.width(), layer.height()), (40.0, 40.0));
        assert_eq!(layer.state(), LayerState::Stale);
        assert_eq!(
            layer.texture().unwrap().pixel_size(),
            PixelSize::new(20, 20),
            "texture keeps the old content until end"
        );
    }

    #[test]
    fn failed_resize_leaves_layer_untouched() {
        let (gfx, _gpu) = graphics(1.0);
        let mut layer = CanvasLayer::new(&gfx, 4.0, 4.0).unwrap();
        layer.end().unwrap();
        let err = layer.resize(1e12, 1e12).unwrap_err();
        assert!(matches!(err, GraphicsError::AllocationFailure { .. }));
        assert_eq!(layer.state(), LayerState::Ready);
        assert_eq!(layer.width(), 4.0);
        assert!(CanvasLayer::new(&gfx, 1e12, 4.0).is_err());
    }

    #[test]
    fn empty_canvas_end_skips_upload() {
        let (gfx, gpu) = graphics(1.0);
        let mut layer = CanvasLayer::new(&gfx, 0.0, 12.0).unwrap();
        layer.end().unwrap();
        assert_eq!(layer.state(), LayerState::Ready);
        assert!(layer.texture().is_none());
        assert_eq!(gpu.borrow().allocations, 0);
        assert!(gfx.is_empty_surface(layer.surface_id()));

        layer.resize(5.0, 5.0).unwrap();
        layer.end().unwrap();
        let id = layer.texture().unwrap().id().unwrap();
        assert!(!gfx.is_empty_surface(layer.surface_id()));

        layer.resize(0.0, 5.0).unwrap();
        layer.end().unwrap();
        assert!(layer.texture().is_none());
        assert_eq!(gpu.borrow().released, [id]);
        assert_eq!(gpu.borrow().uploads, 1);
    }

    #[test]
    fn end_creates_and_uploads() {
        let (gfx, gpu) = graphics(2.0);
        let mut layer = CanvasLayer::new(&gfx, 2.0, 1.0).unwrap();
        layer
            .begin()
            .fill_rect(Rect::new(0.0, 0.0, 1.0, 1.0), Rgba8::WHITE);
        layer.end().unwrap();

        assert_eq!(layer.state(), LayerState::Ready);
        let texture = layer.texture().unwrap();
        assert_eq!(texture.pixel_size(), PixelSize::new(4, 2));
        let id = texture.id().unwrap();
        assert_eq!(
            gpu.borrow().contents(id),
            Some(layer.canvas().bitmap().as_bytes())
        );
        let resolved = gfx.resolve_surface(layer.surface_id()).unwrap();
        assert!(Rc::ptr_eq(&resolved, texture));
    }

    #[test]
    fn repeated_end_reuses_texture() {
        let (gfx, gpu) = graphics(1.0);
        let mut layer = CanvasLayer::new(&gfx, 3.0, 3.0).unwrap();
        layer.end().unwrap();
        let id = layer.texture().unwrap().id();
        layer.begin().clear();
        layer.end().unwrap();
        assert_eq!(layer.texture().unwrap().id(), id);
        assert_eq!(gpu.borrow().allocations, 1);
        assert_eq!(gpu.borrow().uploads, 2);
    }

    #[test]
    fn resize_goes_stale_until_end() {
        let (gfx, gpu) = graphics(1.0);
        let mut layer = CanvasLayer::new(&gfx, 4.0, 4.0).unwrap();
        layer.end().unwrap();
        let old = layer.texture().unwrap().id().unwrap();

        layer.resize(8.0, 2.0).unwrap();
        assert_eq!(layer.state(), LayerState::Stale);
        assert_eq!(layer.texture().unwrap().id(), Some(old), "old content still shown");

        layer.end().unwrap();
        assert_eq!(layer.state(), LayerState::Ready);
        let texture = layer.texture().unwrap();
        assert_eq!(texture.pixel_size(), PixelSize::new(8, 2));
        assert_eq!(gpu.borrow().released, [old]);
        assert!(Rc::ptr_eq(
            &gfx.resolve_surface(layer.surface_id()).unwrap(),
            texture
        ));
    }

    #[test]
    fn failed_end_keeps_previous_texture() {
        let (gfx, gpu) = graphics(1.0);
        let mut layer = CanvasLayer::new(&gfx, 2.0, 2.0).unwrap();
        layer.end().unwrap();
        let old = layer.texture().unwrap().id();

        layer.resize(5.0, 5.0).unwrap();
        gpu.borrow_mut().fail_allocations = true;
        let err = layer.end().unwrap_err();
        assert!(matches!(err, GraphicsError::AllocationFailure { .. }));
        assert_eq!(layer.state(), LayerState::Stale);
        assert_eq!(layer.texture().unwrap().id(), old);
        assert!(gpu.borrow().released.is_empty());
    }

    #[test]
    fn first_end_failure_stays_empty() {
        let (gfx, gpu) = graphics(1.0);
        let mut layer = CanvasLayer::new(&gfx, 9.0, 1.0).unwrap();
        gpu.borrow_mut().max_size = 8;
        assert!(layer.end().is_err());
        assert_eq!(layer.state(), LayerState::Empty);
        assert!(layer.texture().is_none());
        assert!(gfx.resolve_surface(layer.surface_id()).is_none());
    }

    #[test]
    fn end_after_context_loss_reuploads() {
        let (gfx, gpu) = graphics(1.0);
        let mut layer = CanvasLayer::new(&gfx, 2.0, 2.0).unwrap();
        layer.begin().fill_rect(Rect::new(0.0, 0.0, 2.0, 2.0), Rgba8::BLACK);
        layer.end().unwrap();
        let old = layer.texture().unwrap().id().unwrap();

        gfx.notify_context_lost();
        assert_eq!(layer.texture().unwrap().state(), TextureState::Lost);
        gfx.notify_context_restored();
        assert!(layer.texture().unwrap().needs_upload());

        layer.end().unwrap();
        let texture = layer.texture().unwrap();
        let new = texture.id().unwrap();
        assert_ne!(old, new);
        assert_eq!(
            gpu.borrow().contents(new),
            Some(layer.canvas().bitmap().as_bytes())
        );
        assert!(gpu.borrow().released.is_empty(), "lost id must not be released");
    }

    #[test]
    fn with_canvas_is_ready() {
        let (gfx, gpu) = graphics(1.0);
        let canvas = RasterSurface::new(Scale::ONE, PixelSize::new(3, 2));
        let layer = CanvasLayer::with_canvas(&gfx, canvas).unwrap();
        assert_eq!(layer.state(), LayerState::Ready);
        assert_eq!(gpu.borrow().uploads, 1);
        assert_eq!(layer.width(), 3.0);
    }

    #[test]
    fn explicit_size_overrides_canvas() {
        let (gfx, _gpu) = graphics(1.0);
        let mut layer = CanvasLayer::new(&gfx, 10.0, 20.0).unwrap();
        layer.set_size(30.0, 5.0);
        assert_eq!((layer.width(), layer.height()), (30.0, 5.0));
        layer.resize(1.0, 1.0).unwrap();
        assert_eq!(layer.width(), 30.0, "explicit size survives resize");
        layer.clear_size();
        assert_eq!((layer.width(), layer.height()), (1.0, 1.0));
    }

    #[test]
    fn replace_canvas_hands_back_old_content() {
        let (gfx, _gpu) = graphics(1.0);
        let mut layer = CanvasLayer::new(&gfx, 1.0, 1.0).unwrap();
        layer.begin().fill_rect(Rect::new(0.0, 0.0, 1.0, 1.0), Rgba8::WHITE);
        layer.end().unwrap();

        let prepared = RasterSurface::new(Scale::ONE, PixelSize::new(1, 1));
        let old = layer.replace_canvas(prepared);
        assert_eq!(old.pixel(0, 0), Some(Rgba8::WHITE));
        assert_eq!(layer.state(), LayerState::Stale);
    }

    #[test]
    fn drop_releases_texture_and_binding() {
        let (gfx, gpu) = graphics(1.0);
        let mut layer = CanvasLayer::new(&gfx, 1.0, 1.0).unwrap();
        layer.end().unwrap();
        let id = layer.texture().unwrap().id().unwrap();
        let surface = layer.surface_id();
        drop(layer);
        assert_eq!(gpu.borrow().released, [id]);
        assert!(gfx.resolve_surface(surface).is_none());
        assert!(gfx.registry().is_empty());
    }
}
