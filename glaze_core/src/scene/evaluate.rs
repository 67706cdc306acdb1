// Copyright 2026 the Glaze Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Per-frame evaluation.
//!
//! [`SceneTree::evaluate`] rebuilds the traversal order if the structure
//! changed, then drains each dirty channel in parent-before-child order:
//! world transforms and effective hidden state from [`TRANSFORM`], effective
//! opacity from [`OPACITY`]. [`CONTENT`] is only reported.
//!
//! [`SceneChanges`] lists raw slot indices so consumers can read the
//! `*_at` accessors without a generation check per node.
//!
//! [`TRANSFORM`]: crate::dirty::TRANSFORM
//! [`OPACITY`]: crate::dirty::OPACITY
//! [`CONTENT`]: crate::dirty::CONTENT

use alloc::vec::Vec;

use kurbo::Affine;

use super::id::INVALID;
use super::tree::SceneTree;
use crate::dirty;

/// What one [`SceneTree::evaluate`] call changed.
#[derive(Clone, Debug, Default)]
pub struct SceneChanges {
    /// Nodes whose world transform was recomputed.
    pub transforms: Vec<u32>,
    /// Nodes whose effective opacity was recomputed.
    pub opacities: Vec<u32>,
    /// Nodes whose content or drawing size changed.
    pub content: Vec<u32>,
    /// Nodes that became effectively hidden.
    pub hidden: Vec<u32>,
    /// Nodes that became effectively visible.
    pub unhidden: Vec<u32>,
    /// Nodes created since the last evaluate.
    pub added: Vec<u32>,
    /// Nodes destroyed since the last evaluate.
    pub removed: Vec<u32>,
    /// Whether the traversal order was rebuilt.
    pub topology_changed: bool,
}

impl SceneChanges {
    /// Empties every list.
    pub fn clear(&mut self) {
        self.transforms.clear();
        self.opacities.clear();
        self.content.clear();
        self.hidden.clear();
        self.unhidden.clear();
        self.added.clear();
        self.removed.clear();
        self.topology_changed = false;
    }

    /// Whether nothing changed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.transforms.is_empty()
            && self.opacities.is_empty()
            && self.content.is_empty()
            && self.hidden.is_empty()
            && self.unhidden.is_empty()
            && self.added.is_empty()
            && self.removed.is_empty()
            && !self.topology_changed
    }
}

impl SceneTree {
    /// Recomputes dirty properties and reports what changed.
    pub fn evaluate(&mut self) -> SceneChanges {
        let mut changes = SceneChanges::default();
        self.evaluate_into(&mut changes);
        changes
    }

    /// Like [`evaluate`](Self::evaluate), reusing `changes`' buffers.
    pub fn evaluate_into(&mut self, changes: &mut SceneChanges) {
        changes.clear();

        if self.traversal_dirty {
            self.rebuild_traversal_order();
            self.traversal_dirty = false;
            changes.topology_changed = true;
        }

        changes.transforms.extend(
            self.dirty
                .drain(dirty::TRANSFORM)
                .affected()
                .deterministic()
                .run()
                .filter(|&idx| self.alive[idx as usize]),
        );
        for &idx in &changes.transforms {
            let i = idx as usize;
            let p = self.parent[i];
            let (parent_world, parent_hidden) = if p == INVALID {
                (Affine::IDENTITY, false)
            } else {
                (self.world_transform[p as usize], self.effective_hidden[p as usize])
            };
            self.world_transform[i] = parent_world * self.transform[i];

            let hidden = parent_hidden || self.hidden[i];
            if hidden != self.effective_hidden[i] {
                self.effective_hidden[i] = hidden;
                if hidden {
                    changes.hidden.push(idx);
                } else {
                    changes.unhidden.push(idx);
                }
            }
        }

        changes.opacities.extend(
            self.dirty
                .drain(dirty::OPACITY)
                .affected()
                .deterministic()
                .run()
                .filter(|&idx| self.alive[idx as usize]),
        );
        for &idx in &changes.opacities {
            let i = idx as usize;
            let p = self.parent[i];
            let parent_opacity = if p == INVALID {
                1.0
            } else {
                self.effective_opacity[p as usize]
            };
            self.effective_opacity[i] = parent_opacity * self.opacity[i];
        }

        changes.content.extend(
            self.dirty
                .drain(dirty::CONTENT)
                .deterministic()
                .run()
                .filter(|&idx| self.alive[idx as usize]),
        );

        // Structure is already captured by the traversal rebuild above.
        self.dirty
            .drain(dirty::TOPOLOGY)
            .deterministic()
            .run()
            .for_each(drop);

        core::mem::swap(&mut self.pending_added, &mut changes.added);
        core::mem::swap(&mut self.pending_removed, &mut changes.removed);
    }

    /// Live nodes in depth-first pre-order: parents before children,
    /// siblings back to front. Up to date after [`evaluate`](Self::evaluate).
    #[must_use]
    pub fn traversal_order(&self) -> &[u32] {
        &self.traversal_order
    }

    fn rebuild_traversal_order(&mut self) {
        let mut order = core::mem::take(&mut self.traversal_order);
        order.clear();
        let mut stack: Vec<u32> = Vec::new();
        for root in (0..self.slot_count()).rev() {
            if self.alive[root as usize] && self.parent[root as usize] == INVALID {
                stack.push(root);
            }
        }
        while let Some(idx) = stack.pop() {
            order.push(idx);
            stack.extend(self.children[idx as usize].iter().rev());
        }
        self.traversal_order = order;
    }
}
