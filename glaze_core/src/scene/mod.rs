// Copyright 2026 the Glaze Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Retained scene tree.
//!
//! A *node* carries a local [`Affine`](kurbo::Affine) transform, an opacity,
//! a hidden flag, an optional [`SurfaceId`] naming the texture it displays
//! and the logical size to draw that texture at. Nodes without content only
//! group their children.
//!
//! Setters mark [`dirty`](crate::dirty) channels; [`SceneTree::evaluate`]
//! turns those into world transforms, effective opacities and effective
//! hidden state, and returns the [`SceneChanges`] for the frame.
//!
//! The tree never owns textures. A `SurfaceId` is resolved through
//! [`Graphics::resolve_surface`](crate::graphics::Graphics::resolve_surface)
//! when a frame is composed, so a node whose texture was dropped simply has
//! nothing to show.

mod evaluate;
mod id;
mod tree;

pub use evaluate::SceneChanges;
pub use id::{INVALID, NodeId, SurfaceId};
pub use tree::{Children, SceneTree};
