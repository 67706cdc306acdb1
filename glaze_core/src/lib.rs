// Copyright 2026 the Glaze Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Texture lifecycle, canvas layers and scene tree for cross-platform 2D
//! graphics.
//!
//! `glaze_core` turns CPU-rendered raster content into GPU-resident textures,
//! keeps those textures consistent across GPU context loss, and exposes a
//! retained scene tree that references them for composition. It is `no_std`
//! compatible (with `alloc`); platform work is delegated to the traits in
//! [`backend`].
//!
//! # Architecture
//!
//! ```text
//!   Graphics::create_canvas ──► RasterSurface (CPU pixels, logical coords)
//!                                    │
//!   CanvasLayer::begin() ◄───────────┘
//!        │  draw …
//!        ▼
//!   CanvasLayer::end() ──► TextureResource::upload_from ──► GpuBackend
//!        │
//!        └──► Graphics surface table (SurfaceId ─weak─► TextureResource)
//!                                    ▲
//!   SceneTree node content ──────────┘
//!
//!   platform surface lost/created ──► Graphics::notify_context_* ──►
//!       RefreshRegistry ──► every live Refreshable
//! ```
//!
//! **[`scale`]** — [`Scale`](scale::Scale) converts between logical units,
//! device pixels and texture pixels.
//!
//! **[`refresh`]** — [`RefreshRegistry`](refresh::RefreshRegistry), the
//! weakly-held broadcast list of GPU-state owners.
//!
//! **[`texture`]** — [`TextureResource`](texture::TextureResource), one GPU
//! texture id bound to a fixed pixel size.
//!
//! **[`raster`]** — CPU-side [`Bitmap`](raster::Bitmap),
//! [`Image`](raster::Image) and [`RasterSurface`](raster::RasterSurface).
//!
//! **[`canvas_layer`]** — [`CanvasLayer`](canvas_layer::CanvasLayer), the
//! begin/end transaction boundary between a raster surface and its texture.
//!
//! **[`scene`]** — struct-of-arrays scene tree with generational handles and
//! multi-channel dirty tracking.
//!
//! **[`graphics`]** — the per-context [`Graphics`](graphics::Graphics) handle
//! tying the above together.
//!
//! # Crate features
//!
//! - `std` (disabled by default): Enables `std` support in dependencies.

#![no_std]
#![cfg_attr(docsrs, feature(doc_auto_cfg))]

extern crate alloc;

pub mod backend;
pub mod canvas_layer;
pub mod dirty;
pub mod error;
pub mod font;
pub mod graphics;
pub mod raster;
pub mod refresh;
pub mod scale;
pub mod scene;
pub mod texture;

#[cfg(test)]
pub(crate) mod test_support;
