// Copyright 2026 the Glaze Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The per-context graphics handle.
//!
//! A [`Graphics`] owns the [`GpuBackend`], the context's
//! [`RefreshRegistry`], the display [`Scale`] and the surface table that
//! scene nodes resolve textures through. It is a cheap, clonable handle
//! (`Rc`) and, like everything holding GPU state, stays on the rendering
//! thread.

use alloc::boxed::Box;
use alloc::format;
use alloc::rc::{Rc, Weak};
use alloc::string::String;
use core::cell::{Cell, RefCell};
use core::fmt;

use hashbrown::HashMap;
use kurbo::Size;

use crate::backend::{GpuBackend, RasterBackend, TextureId};
use crate::error::{GraphicsError, Result};
use crate::raster::{Image, RasterSurface};
use crate::refresh::{RefreshRegistry, RefreshReport};
use crate::scale::{PixelSize, Scale};
use crate::scene::SurfaceId;
use crate::texture::TextureResource;

/// Chooses the scale of newly created canvases.
///
/// Memory-constrained apps can lower the resolution of especially large
/// canvases by picking a smaller scale than the display's.
#[derive(Clone, Copy, Debug, Default)]
pub enum CanvasScale {
    /// Use the graphics scale (maximum resolution).
    #[default]
    Graphics,
    /// Always use this scale.
    Fixed(Scale),
    /// Compute the scale from the canvas's logical size and the graphics
    /// scale.
    Custom(fn(Size, Scale) -> Scale),
}

impl CanvasScale {
    /// Resolves the scale for a canvas of the given logical size.
    #[must_use]
    pub fn resolve(self, logical: Size, graphics: Scale) -> Scale {
        match self {
            Self::Graphics => graphics,
            Self::Fixed(scale) => scale,
            Self::Custom(func) => func(logical, graphics),
        }
    }
}

/// Configuration for a [`Graphics`] context.
#[derive(Clone, Copy, Debug, Default)]
pub struct GraphicsConfig {
    /// Display scale factor (device pixels per logical unit).
    pub scale: Scale,
    /// Scale policy for canvases created by [`Graphics::create_canvas`].
    pub canvas_scale: CanvasScale,
}

impl GraphicsConfig {
    /// Configuration for a display with the given scale.
    #[must_use]
    pub const fn new(scale: Scale) -> Self {
        Self {
            scale,
            canvas_scale: CanvasScale::Graphics,
        }
    }
}

struct Inner {
    scale: Scale,
    canvas_scale: Cell<CanvasScale>,
    screen_size: Cell<Size>,
    gpu: RefCell<Box<dyn GpuBackend>>,
    registry: RefreshRegistry,
    epoch: Cell<u64>,
    /// `None` marks a surface whose content is currently empty.
    surfaces: RefCell<HashMap<SurfaceId, Option<Weak<TextureResource>>>>,
    next_surface: Cell<u32>,
}

/// Handle to one GPU context and its resources.
#[derive(Clone)]
pub struct Graphics {
    inner: Rc<Inner>,
}

impl fmt::Debug for Graphics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Graphics")
            .field("scale", &self.inner.scale)
            .field("epoch", &self.inner.epoch.get())
            .field("registry", &self.inner.registry)
            .finish_non_exhaustive()
    }
}

impl Graphics {
    /// Creates a context over the given GPU backend.
    pub fn new(config: GraphicsConfig, gpu: impl GpuBackend + 'static) -> Self {
        Self {
            inner: Rc::new(Inner {
                scale: config.scale,
                canvas_scale: Cell::new(config.canvas_scale),
                screen_size: Cell::new(Size::ZERO),
                gpu: RefCell::new(Box::new(gpu)),
                registry: RefreshRegistry::new(),
                epoch: Cell::new(0),
                surfaces: RefCell::new(HashMap::new()),
                next_surface: Cell::new(0),
            }),
        }
    }

    /// The display scale.
    #[must_use]
    pub fn scale(&self) -> Scale {
        self.inner.scale
    }

    /// The current canvas scale policy.
    #[must_use]
    pub fn canvas_scale(&self) -> CanvasScale {
        self.inner.canvas_scale.get()
    }

    /// Replaces the canvas scale policy for subsequently created canvases.
    pub fn set_canvas_scale(&self, policy: CanvasScale) {
        self.inner.canvas_scale.set(policy);
    }

    /// Logical size of the screen, as of the last
    /// [`on_size_changed`](Self::on_size_changed).
    #[must_use]
    pub fn screen_size(&self) -> Size {
        self.inner.screen_size.get()
    }

    /// Records a new view size in device pixels.
    pub fn on_size_changed(&self, view_width: u32, view_height: u32) {
        let scale = self.scale();
        let size = scale.logical_size(PixelSize::new(view_width, view_height));
        log::info!(
            "updating size {view_width}x{view_height} / {} -> {size:?}",
            scale.factor()
        );
        self.inner.screen_size.set(size);
    }

    /// Context generation, bumped on every restore.
    #[must_use]
    pub fn epoch(&self) -> u64 {
        self.inner.epoch.get()
    }

    /// The context's registry of refreshable resources.
    #[must_use]
    pub fn registry(&self) -> &RefreshRegistry {
        &self.inner.registry
    }

    /// Largest texture dimension the backend accepts.
    #[must_use]
    pub fn max_texture_size(&self) -> u32 {
        self.inner.gpu.borrow().max_texture_size()
    }

    /// Creates a blank canvas of the given logical size.
    ///
    /// The scale comes from the [`CanvasScale`] policy; the pixel size is
    /// `scaled_ceil` of each dimension. Zero dimensions are allowed.
    ///
    /// # Errors
    ///
    /// Returns [`GraphicsError::AllocationFailure`] if either pixel dimension
    /// exceeds [`max_texture_size`](Self::max_texture_size), since such a
    /// canvas could never be uploaded, or if the pixels cannot be allocated.
    pub fn create_canvas(&self, width: f64, height: f64) -> Result<RasterSurface> {
        let logical = Size::new(width, height);
        let scale = self.canvas_scale().resolve(logical, self.scale());
        let size = scale.pixel_size(logical);
        if let Err(err) = check_max_size(size, self.max_texture_size()) {
            log::warn!("refusing canvas of {width}x{height} at {}: {err}", scale.factor());
            return Err(err);
        }
        RasterSurface::try_new(scale, size)
    }

    /// Decodes image bytes at the display scale.
    ///
    /// # Errors
    ///
    /// Passes through the raster backend's decode failure.
    pub fn decode_image<R: RasterBackend + ?Sized>(&self, raster: &R, bytes: &[u8]) -> Result<Image> {
        Ok(Image::new(self.scale(), raster.decode_bitmap(bytes)?))
    }

    /// Creates a texture holding `image`.
    ///
    /// # Errors
    ///
    /// Returns allocation or upload failures from the backend.
    pub fn create_texture(&self, image: &Image) -> Result<Rc<TextureResource>> {
        let texture = TextureResource::create(self, image.pixel_size())?;
        texture.upload_image(image)?;
        Ok(texture)
    }

    /// Broadcasts GPU context loss to the backend and every refreshable.
    pub fn notify_context_lost(&self) -> RefreshReport {
        log::info!("GPU context lost (epoch {})", self.epoch());
        let report = self.inner.registry.notify_context_lost();
        self.inner.gpu.borrow_mut().context_lost();
        report
    }

    /// Starts a new context epoch and broadcasts the restore.
    pub fn notify_context_restored(&self) -> RefreshReport {
        let epoch = self.inner.epoch.get() + 1;
        self.inner.epoch.set(epoch);
        self.inner.gpu.borrow_mut().context_restored();
        let report = self.inner.registry.notify_context_restored();
        log::info!(
            "GPU context restored (epoch {epoch}): {} notified, {} failed",
            report.notified,
            report.failed
        );
        report
    }

    // -- Surface table --

    /// Allocates a fresh surface id for a scene-visible texture slot.
    #[must_use]
    pub fn allocate_surface_id(&self) -> SurfaceId {
        let id = self.inner.next_surface.get();
        self.inner.next_surface.set(id.wrapping_add(1));
        SurfaceId(id)
    }

    /// Points `surface` at `texture`. The table holds a weak reference.
    pub fn bind_surface(&self, surface: SurfaceId, texture: &Rc<TextureResource>) {
        self.inner
            .surfaces
            .borrow_mut()
            .insert(surface, Some(Rc::downgrade(texture)));
    }

    /// Marks `surface` as showing empty content: nothing to draw, and
    /// nothing missing.
    pub fn bind_empty_surface(&self, surface: SurfaceId) {
        self.inner.surfaces.borrow_mut().insert(surface, None);
    }

    /// Whether `surface` was bound with [`bind_empty_surface`](Self::bind_empty_surface).
    #[must_use]
    pub fn is_empty_surface(&self, surface: SurfaceId) -> bool {
        matches!(self.inner.surfaces.borrow().get(&surface), Some(None))
    }

    /// Removes the binding for `surface`, if any.
    pub fn unbind_surface(&self, surface: SurfaceId) {
        self.inner.surfaces.borrow_mut().remove(&surface);
    }

    /// Returns the texture currently bound to `surface`, if it still exists.
    #[must_use]
    pub fn resolve_surface(&self, surface: SurfaceId) -> Option<Rc<TextureResource>> {
        self.inner.surfaces.borrow().get(&surface)?.as_ref()?.upgrade()
    }

    // -- Backend access for textures --

    pub(crate) fn allocate_texture(&self, size: PixelSize) -> Result<TextureId> {
        let mut gpu = self.inner.gpu.borrow_mut();
        let checked = if size.is_empty() {
            Err(GraphicsError::AllocationFailure {
                size,
                reason: String::from("zero-sized texture"),
            })
        } else {
            check_max_size(size, gpu.max_texture_size())
        };
        if let Err(err) = checked {
            log::warn!("refusing texture allocation: {err}");
            return Err(err);
        }
        let id = gpu.allocate_texture(size)?;
        log::debug!("allocated {id:?} ({size})");
        Ok(id)
    }

    pub(crate) fn upload_pixels(&self, id: TextureId, size: PixelSize, pixels: &[u8]) -> Result<()> {
        log::debug!("uploading {size} to {id:?}");
        self.inner.gpu.borrow_mut().upload_pixels(id, size, pixels)
    }

    pub(crate) fn release_texture(&self, id: TextureId) {
        log::debug!("releasing {id:?}");
        self.inner.gpu.borrow_mut().release_texture(id);
    }
}

fn check_max_size(size: PixelSize, max: u32) -> Result<()> {
    if size.width > max || size.height > max {
        return Err(GraphicsError::AllocationFailure {
            size,
            reason: format!("exceeds maximum texture size {max}"),
        });
    }
    Ok(())
}
