// Copyright 2026 the Glaze Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! wgpu texture backend for glaze.
//!
//! [`WgpuBackend`] implements [`GpuBackend`] on a `wgpu::Device` and
//! `wgpu::Queue`. Each [`TextureId`] maps to one 2D texture with
//! `TEXTURE_BINDING | COPY_DST` usage; uploads replace the whole texture via
//! `Queue::write_texture`.
//!
//! The backend is a shared handle. Hand one clone to
//! [`Graphics`](glaze_core::graphics::Graphics) and keep another in the
//! renderer to look textures up by id:
//!
//! ```no_run
//! # fn demo(device: wgpu::Device, queue: wgpu::Queue) -> glaze_core::error::Result<()> {
//! use glaze_backend_wgpu::{WgpuBackend, WgpuBackendConfig};
//! use glaze_core::graphics::{Graphics, GraphicsConfig};
//!
//! let backend = WgpuBackend::new(device, queue, WgpuBackendConfig::default())?;
//! let gfx = Graphics::new(GraphicsConfig::default(), backend.clone());
//! // ... build a render plan, then for each item:
//! // let view = backend.create_view(item_texture_id);
//! # Ok(())
//! # }
//! ```
//!
//! # Device loss
//!
//! When wgpu reports the device lost, [`WgpuBackend::is_device_lost`] turns
//! true and allocation fails. The platform glue should then call
//! [`Graphics::notify_context_lost`](glaze_core::graphics::Graphics::notify_context_lost),
//! create a new device, pass it to [`WgpuBackend::replace_device`] and call
//! [`Graphics::notify_context_restored`](glaze_core::graphics::Graphics::notify_context_restored).

mod slab;

use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use glaze_core::backend::{GpuBackend, TextureId};
use glaze_core::error::{GraphicsError, Result};
use glaze_core::scale::PixelSize;

use crate::slab::Slab;

/// Configuration for a [`WgpuBackend`].
#[derive(Clone, Copy, Debug)]
pub struct WgpuBackendConfig {
    /// Debug label attached to every texture.
    pub label: &'static str,
    /// Texture format. Must be `Rgba8Unorm` or `Rgba8UnormSrgb`.
    pub format: wgpu::TextureFormat,
}

impl Default for WgpuBackendConfig {
    fn default() -> Self {
        Self {
            label: "glaze texture",
            format: wgpu::TextureFormat::Rgba8Unorm,
        }
    }
}

#[derive(Debug)]
struct State {
    device: wgpu::Device,
    queue: wgpu::Queue,
    config: WgpuBackendConfig,
    textures: Slab<(wgpu::Texture, PixelSize)>,
    lost: Arc<AtomicBool>,
}

/// A [`GpuBackend`] backed by wgpu textures.
///
/// Clones share the same device and texture table.
#[derive(Clone, Debug)]
pub struct WgpuBackend {
    state: Rc<RefCell<State>>,
}

impl WgpuBackend {
    /// Creates a backend on `device` and `queue`.
    ///
    /// # Errors
    ///
    /// Returns [`GraphicsError::InvalidArgument`] if `config.format` is not
    /// an 8-bit RGBA format.
    pub fn new(device: wgpu::Device, queue: wgpu::Queue, config: WgpuBackendConfig) -> Result<Self> {
        if !matches!(
            config.format,
            wgpu::TextureFormat::Rgba8Unorm | wgpu::TextureFormat::Rgba8UnormSrgb
        ) {
            return Err(GraphicsError::InvalidArgument(
                "texture format must be Rgba8Unorm or Rgba8UnormSrgb",
            ));
        }
        let lost = watch_device(&device);
        Ok(Self {
            state: Rc::new(RefCell::new(State {
                device,
                queue,
                config,
                textures: Slab::default(),
                lost,
            })),
        })
    }

    /// Whether wgpu has reported the current device lost.
    #[must_use]
    pub fn is_device_lost(&self) -> bool {
        self.state.borrow().lost.load(Ordering::Acquire)
    }

    /// Switches to a freshly created device.
    ///
    /// Textures from the old device are forgotten, not destroyed.
    pub fn replace_device(&self, device: wgpu::Device, queue: wgpu::Queue) {
        let mut state = self.state.borrow_mut();
        let dropped = state.textures.clear();
        state.lost = watch_device(&device);
        state.device = device;
        state.queue = queue;
        log::info!("wgpu device replaced; forgot {dropped} textures");
    }

    /// The wgpu texture behind `id`, if it is live.
    #[must_use]
    pub fn texture(&self, id: TextureId) -> Option<wgpu::Texture> {
        self.state.borrow().textures.get(id).map(|(t, _)| t.clone())
    }

    /// Creates a default view of the texture behind `id`.
    #[must_use]
    pub fn create_view(&self, id: TextureId) -> Option<wgpu::TextureView> {
        self.state
            .borrow()
            .textures
            .get(id)
            .map(|(t, _)| t.create_view(&wgpu::TextureViewDescriptor::default()))
    }

    /// Number of live textures.
    #[must_use]
    pub fn live_textures(&self) -> usize {
        self.state.borrow().textures.len()
    }
}

fn watch_device(device: &wgpu::Device) -> Arc<AtomicBool> {
    let lost = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&lost);
    device.set_device_lost_callback(move |reason, message| {
        log::warn!("wgpu device lost ({reason:?}): {message}");
        flag.store(true, Ordering::Release);
    });
    lost
}

/// Validates an upload against the texture it targets.
fn check_upload(texture: PixelSize, size: PixelSize, len: usize) -> Result<()> {
    if size != texture {
        return Err(GraphicsError::SizeMismatch {
            expected: texture,
            actual: size,
        });
    }
    if len != size.area() * 4 {
        return Err(GraphicsError::InvalidArgument(
            "pixel buffer length does not match texture size",
        ));
    }
    Ok(())
}

impl GpuBackend for WgpuBackend {
    fn max_texture_size(&self) -> u32 {
        self.state.borrow().device.limits().max_texture_dimension_2d
    }

    fn allocate_texture(&mut self, size: PixelSize) -> Result<TextureId> {
        let mut state = self.state.borrow_mut();
        if state.lost.load(Ordering::Acquire) {
            return Err(GraphicsError::AllocationFailure {
                size,
                reason: String::from("device lost"),
            });
        }
        let texture = state.device.create_texture(&wgpu::TextureDescriptor {
            label: Some(state.config.label),
            size: wgpu::Extent3d {
                width: size.width,
                height: size.height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: state.config.format,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });
        let id = state.textures.insert((texture, size));
        log::trace!("allocated {id:?} ({size})");
        Ok(id)
    }

    fn upload_pixels(&mut self, id: TextureId, size: PixelSize, pixels: &[u8]) -> Result<()> {
        let state = self.state.borrow();
        let Some((texture, texture_size)) = state.textures.get(id) else {
            return Err(GraphicsError::InvalidArgument("unknown texture id"));
        };
        check_upload(*texture_size, size, pixels.len())?;
        state.queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            pixels,
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(4 * size.width),
                rows_per_image: Some(size.height),
            },
            wgpu::Extent3d {
                width: size.width,
                height: size.height,
                depth_or_array_layers: 1,
            },
        );
        Ok(())
    }

    fn release_texture(&mut self, id: TextureId) {
        if let Some((texture, _)) = self.state.borrow_mut().textures.remove(id) {
            texture.destroy();
        }
    }

    fn context_lost(&mut self) {
        let dropped = self.state.borrow_mut().textures.clear();
        log::debug!("context lost; forgot {dropped} wgpu textures");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upload_must_match_texture() {
        let size = PixelSize::new(4, 2);
        assert_eq!(check_upload(size, size, 32), Ok(()));
        assert_eq!(
            check_upload(size, PixelSize::new(2, 4), 32),
            Err(GraphicsError::SizeMismatch {
                expected: size,
                actual: PixelSize::new(2, 4),
            })
        );
        assert!(matches!(
            check_upload(size, size, 31),
            Err(GraphicsError::InvalidArgument(_))
        ));
    }

    #[test]
    fn default_config_is_linear_rgba8() {
        let config = WgpuBackendConfig::default();
        assert_eq!(config.format, wgpu::TextureFormat::Rgba8Unorm);
    }
}
