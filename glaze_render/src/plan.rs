// Copyright 2026 the Glaze Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Render plan: the ordered textured quads for one frame.

use alloc::vec::Vec;

use glaze_core::backend::TextureId;
use glaze_core::graphics::Graphics;
use glaze_core::scale::{PixelSize, Scale};
use glaze_core::scene::{NodeId, SceneTree, SurfaceId};
use kurbo::{Affine, Size};

/// The GPU texture an item samples.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TextureBinding {
    /// Backend texture id, live in the current context.
    pub id: TextureId,
    /// Pixel size of the texture.
    pub pixel_size: PixelSize,
    /// Scale of the content, which may differ from the display scale.
    pub scale: Scale,
}

impl TextureBinding {
    /// Logical size of the texture's content.
    #[must_use]
    pub fn logical_size(&self) -> Size {
        self.scale.logical_size(self.pixel_size)
    }
}

/// One textured quad.
///
/// The quad covers `(0, 0)..size` in the node's local space;
/// `world_transform` maps it to device pixels.
#[derive(Clone, Debug, PartialEq)]
pub struct RenderItem {
    /// The node this item was produced from.
    pub node: NodeId,
    /// The surface the node displays.
    pub surface: SurfaceId,
    /// The texture to sample, or `None` if the surface has no live texture.
    pub texture: Option<TextureBinding>,
    /// Local-to-device affine coefficients `[a, b, c, d, e, f]`, already
    /// multiplied by the display scale.
    pub world_transform: [f32; 6],
    /// Product of the opacities from the root down to this node.
    pub effective_opacity: f32,
    /// Logical size of the quad.
    pub size: Size,
}

/// Draw items for one frame, back to front.
#[derive(Clone, Debug, Default)]
pub struct RenderPlan {
    /// Items in painting order.
    pub items: Vec<RenderItem>,
    /// How many items have no live texture.
    pub missing_textures: usize,
}

impl RenderPlan {
    /// Builds the plan for an evaluated tree.
    ///
    /// Call after [`SceneTree::evaluate`]; the traversal order and computed
    /// properties are read as of that call.
    #[must_use]
    pub fn build(tree: &SceneTree, gfx: &Graphics) -> Self {
        let mut plan = Self::default();
        plan.build_into(tree, gfx);
        plan
    }

    /// Like [`build`](Self::build), reusing this plan's buffer.
    ///
    /// Hidden subtrees, fully transparent nodes and nodes without content
    /// produce no items, and neither do surfaces bound as empty. A node with
    /// an explicit zero size is drawn at its texture's logical size.
    pub fn build_into(&mut self, tree: &SceneTree, gfx: &Graphics) {
        self.clear();
        let scale = gfx.scale();
        let to_device = Affine::scale(scale.factor());
        for &idx in tree.traversal_order() {
            if tree.effective_hidden_at(idx) {
                continue;
            }
            let opacity = tree.effective_opacity_at(idx);
            if opacity <= 0.0 {
                continue;
            }
            let Some(surface) = tree.content_at(idx) else {
                continue;
            };
            if gfx.is_empty_surface(surface) {
                continue;
            }

            let texture = gfx.resolve_surface(surface).and_then(|texture| {
                texture.id().map(|id| TextureBinding {
                    id,
                    pixel_size: texture.pixel_size(),
                    scale: texture.scale(),
                })
            });
            let mut size = tree.size_at(idx);
            if size.is_zero_area()
                && let Some(binding) = texture
            {
                size = binding.logical_size();
            }
            if texture.is_none() {
                self.missing_textures += 1;
            }

            self.items.push(RenderItem {
                node: tree.id_at(idx),
                surface,
                texture,
                world_transform: affine_to_f32(to_device * tree.world_transform_at(idx)),
                effective_opacity: opacity,
                size,
            });
        }
        if self.missing_textures > 0 {
            log::debug!(
                "render plan: {} of {} items have no live texture",
                self.missing_textures,
                self.items.len()
            );
        }
    }

    /// Whether every item has a texture to draw.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.missing_textures == 0
    }

    /// Empties the plan for reuse.
    pub fn clear(&mut self) {
        self.items.clear();
        self.missing_textures = 0;
    }
}

#[expect(
    clippy::cast_possible_truncation,
    reason = "GPU vertex transforms are single precision"
)]
fn affine_to_f32(affine: Affine) -> [f32; 6] {
    affine.as_coeffs().map(|c| c as f32)
}
