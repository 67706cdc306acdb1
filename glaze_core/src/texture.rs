// Copyright 2026 the Glaze Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! GPU textures with a fixed pixel size.
//!
//! A [`TextureResource`] owns at most one backend [`TextureId`] at a time.
//! Its lifecycle:
//!
//! ```text
//!            create                    context lost
//!   ──────────────────► Live ─────────────────────────► Lost
//!                        ▲  │                            │
//!                        │  │ dispose / drop             │ upload (re-allocates)
//!                        │  ▼                            │
//!                        │ Disposed ◄────────────────────┤ dispose / drop
//!                        └───────────────────────────────┘
//! ```
//!
//! Context loss never touches the GPU: the old context already freed the
//! id. Restoring a context does not re-upload anything either; the next
//! upload allocates a fresh id in the new epoch.

use alloc::rc::{Rc, Weak};
use core::cell::Cell;
use core::fmt;

use kurbo::Size;

use crate::backend::TextureId;
use crate::error::{GraphicsError, Result};
use crate::graphics::Graphics;
use crate::raster::{Bitmap, Image, RasterSurface};
use crate::refresh::{RefreshKey, Refreshable};
use crate::scale::{PixelSize, Scale};

/// Lifecycle state of a [`TextureResource`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TextureState {
    /// Holds an id allocated in some context epoch.
    Live,
    /// The context was lost; the next upload allocates a fresh id.
    Lost,
    /// Released. Every further upload fails.
    Disposed,
}

/// One GPU texture and the bookkeeping around it.
pub struct TextureResource {
    gfx: Graphics,
    size: PixelSize,
    scale: Cell<Scale>,
    id: Cell<Option<TextureId>>,
    state: Cell<TextureState>,
    epoch: Cell<u64>,
    uploaded: Cell<bool>,
    key: Cell<Option<RefreshKey>>,
}

impl fmt::Debug for TextureResource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TextureResource")
            .field("size", &self.size)
            .field("scale", &self.scale.get().factor())
            .field("id", &self.id.get())
            .field("state", &self.state.get())
            .field("epoch", &self.epoch.get())
            .finish_non_exhaustive()
    }
}

impl TextureResource {
    /// Allocates a texture and registers it for context-loss notifications.
    ///
    /// # Errors
    ///
    /// Returns [`GraphicsError::AllocationFailure`] for zero sizes, sizes
    /// beyond the backend's maximum, or a backend refusal.
    pub fn create(gfx: &Graphics, size: PixelSize) -> Result<Rc<Self>> {
        let id = gfx.allocate_texture(size)?;
        let texture = Rc::new(Self {
            gfx: gfx.clone(),
            size,
            scale: Cell::new(gfx.scale()),
            id: Cell::new(Some(id)),
            state: Cell::new(TextureState::Live),
            epoch: Cell::new(gfx.epoch()),
            uploaded: Cell::new(false),
            key: Cell::new(None),
        });
        let weak: Weak<Self> = Rc::downgrade(&texture);
        let key = gfx.registry().register(weak)?;
        texture.key.set(Some(key));
        Ok(texture)
    }

    /// Replaces the texture's contents with the surface's pixels.
    ///
    /// # Errors
    ///
    /// See [`upload_image`](Self::upload_image).
    pub fn upload_from(&self, surface: &RasterSurface) -> Result<()> {
        self.upload_bitmap(surface.scale(), surface.bitmap())
    }

    /// Replaces the texture's contents with the image's pixels.
    ///
    /// A texture whose context was lost gets a fresh id first. On success
    /// the texture takes on the content's scale.
    ///
    /// # Errors
    ///
    /// - [`GraphicsError::UseAfterDispose`] once disposed.
    /// - [`GraphicsError::SizeMismatch`] if the pixel sizes differ; nothing
    ///   reaches the backend.
    /// - Allocation or upload failures from the backend.
    pub fn upload_image(&self, image: &Image) -> Result<()> {
        self.upload_bitmap(image.scale(), image.bitmap())
    }

    fn upload_bitmap(&self, scale: Scale, bitmap: &Bitmap) -> Result<()> {
        if self.state.get() == TextureState::Disposed {
            return Err(GraphicsError::UseAfterDispose);
        }
        if bitmap.size() != self.size {
            return Err(GraphicsError::SizeMismatch {
                expected: self.size,
                actual: bitmap.size(),
            });
        }
        let id = match self.id() {
            Some(id) => id,
            None => self.reallocate()?,
        };
        self.uploaded.set(false);
        self.gfx.upload_pixels(id, self.size, bitmap.as_bytes())?;
        self.scale.set(scale);
        self.uploaded.set(true);
        Ok(())
    }

    fn reallocate(&self) -> Result<TextureId> {
        // An id from an older epoch died with its context; never release it.
        self.id.set(None);
        self.state.set(TextureState::Lost);
        let id = self.gfx.allocate_texture(self.size)?;
        self.id.set(Some(id));
        self.state.set(TextureState::Live);
        self.epoch.set(self.gfx.epoch());
        log::debug!("re-created texture {id:?} ({}) after context loss", self.size);
        Ok(id)
    }

    /// Releases the GPU texture and leaves the registry. Idempotent.
    pub fn dispose(&self) {
        if self.state.get() == TextureState::Disposed {
            return;
        }
        if let Some(id) = self.id() {
            self.gfx.release_texture(id);
        }
        self.id.set(None);
        if let Some(key) = self.key.take() {
            self.gfx.registry().unregister(key);
        }
        self.state.set(TextureState::Disposed);
        self.uploaded.set(false);
        log::debug!("disposed texture ({})", self.size);
    }

    /// The backend id, if the texture is live in the current context.
    #[must_use]
    pub fn id(&self) -> Option<TextureId> {
        if self.state.get() == TextureState::Live && self.epoch.get() == self.gfx.epoch() {
            self.id.get()
        } else {
            None
        }
    }

    /// Pixel dimensions, fixed at creation.
    #[inline]
    #[must_use]
    pub fn pixel_size(&self) -> PixelSize {
        self.size
    }

    /// Scale of the last uploaded content; the display scale before any
    /// upload.
    #[must_use]
    pub fn scale(&self) -> Scale {
        self.scale.get()
    }

    /// Logical size of the content, in the texture's own scale.
    #[must_use]
    pub fn logical_size(&self) -> Size {
        self.scale.get().logical_size(self.size)
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> TextureState {
        self.state.get()
    }

    /// Whether the GPU copy is missing or out of date.
    ///
    /// Always `false` once disposed.
    #[must_use]
    pub fn needs_upload(&self) -> bool {
        !self.is_disposed() && !(self.uploaded.get() && self.id().is_some())
    }

    /// Whether [`dispose`](Self::dispose) has run.
    #[must_use]
    pub fn is_disposed(&self) -> bool {
        self.state.get() == TextureState::Disposed
    }
}

impl Refreshable for TextureResource {
    fn on_context_lost(&self) {
        if self.is_disposed() {
            return;
        }
        self.id.set(None);
        self.uploaded.set(false);
        self.state.set(TextureState::Lost);
    }

    fn on_context_restored(&self) -> Result<()> {
        // Re-upload happens lazily on the owner's next transaction.
        Ok(())
    }

    fn is_disposed(&self) -> bool {
        Self::is_disposed(self)
    }
}

impl Drop for TextureResource {
    fn drop(&mut self) {
        self.dispose();
    }
}
