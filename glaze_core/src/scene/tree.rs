// Copyright 2026 the Glaze Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Struct-of-arrays node storage, topology and properties.

use alloc::vec::Vec;
use core::slice;

use kurbo::{Affine, Size};
use understory_dirty::{CycleHandling, DirtyTracker, EagerPolicy};

use super::id::{INVALID, NodeId, SurfaceId};
use crate::dirty;

/// All nodes of one scene.
///
/// Every node occupies a slot in a set of parallel arrays. Freed slots are
/// reused; the per-slot generation makes old [`NodeId`]s fail validation.
/// Methods taking a `NodeId` panic on stale handles.
#[derive(Debug)]
pub struct SceneTree {
    // -- Topology --
    pub(crate) parent: Vec<u32>,
    pub(crate) children: Vec<Vec<u32>>,

    // -- Local properties --
    pub(crate) transform: Vec<Affine>,
    pub(crate) opacity: Vec<f32>,
    pub(crate) hidden: Vec<bool>,
    pub(crate) content: Vec<Option<SurfaceId>>,
    pub(crate) size: Vec<Size>,

    // -- Computed by evaluate --
    pub(crate) world_transform: Vec<Affine>,
    pub(crate) effective_opacity: Vec<f32>,
    pub(crate) effective_hidden: Vec<bool>,

    // -- Allocation --
    pub(crate) generation: Vec<u32>,
    pub(crate) alive: Vec<bool>,
    pub(crate) free_list: Vec<u32>,

    pub(crate) dirty: DirtyTracker<u32>,

    pub(crate) traversal_order: Vec<u32>,
    pub(crate) traversal_dirty: bool,

    pub(crate) pending_added: Vec<u32>,
    pub(crate) pending_removed: Vec<u32>,
}

impl Default for SceneTree {
    fn default() -> Self {
        Self::new()
    }
}

impl SceneTree {
    /// Creates an empty tree.
    #[must_use]
    pub fn new() -> Self {
        Self {
            parent: Vec::new(),
            children: Vec::new(),
            transform: Vec::new(),
            opacity: Vec::new(),
            hidden: Vec::new(),
            content: Vec::new(),
            size: Vec::new(),
            world_transform: Vec::new(),
            effective_opacity: Vec::new(),
            effective_hidden: Vec::new(),
            generation: Vec::new(),
            alive: Vec::new(),
            free_list: Vec::new(),
            dirty: DirtyTracker::with_cycle_handling(CycleHandling::Error),
            traversal_order: Vec::new(),
            traversal_dirty: true,
            pending_added: Vec::new(),
            pending_removed: Vec::new(),
        }
    }

    /// Number of live nodes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.alive.len() - self.free_list.len()
    }

    /// Whether the tree has no live nodes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of slots, live or free. Raw indices are below this.
    #[must_use]
    pub fn slot_count(&self) -> u32 {
        slot_index(self.alive.len())
    }

    /// Creates a detached node: identity transform, opaque, visible, no
    /// content, zero size.
    pub fn create_node(&mut self) -> NodeId {
        let idx = if let Some(idx) = self.free_list.pop() {
            let i = idx as usize;
            self.parent[i] = INVALID;
            self.children[i].clear();
            self.transform[i] = Affine::IDENTITY;
            self.opacity[i] = 1.0;
            self.hidden[i] = false;
            self.content[i] = None;
            self.size[i] = Size::ZERO;
            self.world_transform[i] = Affine::IDENTITY;
            self.effective_opacity[i] = 1.0;
            self.effective_hidden[i] = false;
            self.alive[i] = true;
            idx
        } else {
            let idx = slot_index(self.alive.len());
            self.parent.push(INVALID);
            self.children.push(Vec::new());
            self.transform.push(Affine::IDENTITY);
            self.opacity.push(1.0);
            self.hidden.push(false);
            self.content.push(None);
            self.size.push(Size::ZERO);
            self.world_transform.push(Affine::IDENTITY);
            self.effective_opacity.push(1.0);
            self.effective_hidden.push(false);
            self.generation.push(0);
            self.alive.push(true);
            idx
        };

        self.traversal_dirty = true;
        self.pending_added.push(idx);
        self.dirty.mark(idx, dirty::TOPOLOGY);
        self.dirty.mark(idx, dirty::TRANSFORM);
        self.dirty.mark(idx, dirty::OPACITY);

        NodeId {
            idx,
            generation: self.generation[idx as usize],
        }
    }

    /// Destroys a node and frees its slot.
    ///
    /// # Panics
    ///
    /// Panics if the handle is stale or the node still has children.
    pub fn destroy_node(&mut self, id: NodeId) {
        self.validate(id);
        let idx = id.idx;
        assert!(
            self.children[idx as usize].is_empty(),
            "cannot destroy node with children"
        );
        if self.parent[idx as usize] != INVALID {
            self.detach(idx);
        }
        self.dirty.remove_key(idx);
        self.generation[idx as usize] = self.generation[idx as usize].wrapping_add(1);
        self.alive[idx as usize] = false;
        self.content[idx as usize] = None;
        self.free_list.push(idx);
        self.traversal_dirty = true;
        // A node created and destroyed between evaluations is never reported.
        if let Some(pos) = self.pending_added.iter().position(|&added| added == idx) {
            self.pending_added.swap_remove(pos);
        } else {
            self.pending_removed.push(idx);
        }
    }

    /// Whether `id` refers to a live node.
    #[must_use]
    pub fn is_alive(&self, id: NodeId) -> bool {
        let i = id.idx as usize;
        i < self.alive.len() && self.alive[i] && self.generation[i] == id.generation
    }

    // -- Topology --

    /// Appends `child` as the last (front-most) child of `parent`.
    ///
    /// # Panics
    ///
    /// Panics on stale handles, if `child` already has a parent, or if
    /// `child` is `parent` or one of its ancestors.
    pub fn add_child(&mut self, parent: NodeId, child: NodeId) {
        let len = self.children[self.checked(parent) as usize].len();
        self.insert_child(parent, len, child);
    }

    /// Inserts `child` at position `index` among `parent`'s children.
    ///
    /// Lower positions draw first (further back).
    ///
    /// # Panics
    ///
    /// As [`add_child`](Self::add_child), plus if `index` exceeds the child
    /// count.
    pub fn insert_child(&mut self, parent: NodeId, index: usize, child: NodeId) {
        self.validate(parent);
        self.validate(child);
        let (p, c) = (parent.idx, child.idx);
        assert!(
            self.parent[c as usize] == INVALID,
            "child already has a parent"
        );
        assert!(!self.is_ancestor_or_self(c, p), "cannot create a cycle");

        self.children[p as usize].insert(index, c);
        self.parent[c as usize] = p;
        let _ = self.dirty.add_dependency(c, p, dirty::TRANSFORM);
        let _ = self.dirty.add_dependency(c, p, dirty::OPACITY);

        self.mark_inherited(c);
        self.traversal_dirty = true;
        self.dirty.mark(p, dirty::TOPOLOGY);
    }

    /// Detaches `child` from its parent, making it a root.
    ///
    /// # Panics
    ///
    /// Panics if the handle is stale or the node has no parent.
    pub fn remove_from_parent(&mut self, child: NodeId) {
        self.validate(child);
        let c = child.idx;
        assert!(self.parent[c as usize] != INVALID, "node has no parent");
        self.detach(c);
        self.mark_inherited(c);
        self.traversal_dirty = true;
    }

    /// Moves `child` to the end of `new_parent`'s children.
    ///
    /// # Panics
    ///
    /// Panics on stale handles or if the move would create a cycle.
    pub fn reparent(&mut self, child: NodeId, new_parent: NodeId) {
        self.validate(child);
        if self.parent[child.idx as usize] != INVALID {
            self.detach(child.idx);
        }
        self.add_child(new_parent, child);
    }

    /// The parent of a node, if any.
    #[must_use]
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        let p = self.parent[self.checked(id) as usize];
        (p != INVALID).then(|| self.id_at(p))
    }

    /// The children of a node, back to front.
    #[must_use]
    pub fn children(&self, id: NodeId) -> Children<'_> {
        let idx = self.checked(id);
        Children {
            tree: self,
            inner: self.children[idx as usize].iter(),
        }
    }

    /// Live nodes without a parent, in slot order.
    #[must_use]
    pub fn roots(&self) -> Vec<NodeId> {
        (0..self.slot_count())
            .filter(|&idx| self.alive[idx as usize] && self.parent[idx as usize] == INVALID)
            .map(|idx| self.id_at(idx))
            .collect()
    }

    // -- Getters --

    /// Local transform (node space to parent space).
    #[must_use]
    pub fn transform(&self, id: NodeId) -> Affine {
        self.transform[self.checked(id) as usize]
    }

    /// Local opacity.
    #[must_use]
    pub fn opacity(&self, id: NodeId) -> f32 {
        self.opacity[self.checked(id) as usize]
    }

    /// Whether the node itself is flagged hidden.
    #[must_use]
    pub fn is_hidden(&self, id: NodeId) -> bool {
        self.hidden[self.checked(id) as usize]
    }

    /// The surface the node displays.
    #[must_use]
    pub fn content(&self, id: NodeId) -> Option<SurfaceId> {
        self.content[self.checked(id) as usize]
    }

    /// Logical size the node's content is drawn at.
    #[must_use]
    pub fn size(&self, id: NodeId) -> Size {
        self.size[self.checked(id) as usize]
    }

    /// World transform as of the last [`evaluate`](Self::evaluate).
    #[must_use]
    pub fn world_transform(&self, id: NodeId) -> Affine {
        self.world_transform[self.checked(id) as usize]
    }

    /// Product of ancestor opacities as of the last evaluate.
    #[must_use]
    pub fn effective_opacity(&self, id: NodeId) -> f32 {
        self.effective_opacity[self.checked(id) as usize]
    }

    /// Whether the node or an ancestor is hidden, as of the last evaluate.
    #[must_use]
    pub fn effective_hidden(&self, id: NodeId) -> bool {
        self.effective_hidden[self.checked(id) as usize]
    }

    // -- Setters (mark dirty) --

    /// Sets the local transform. Descendants are re-evaluated.
    pub fn set_transform(&mut self, id: NodeId, transform: Affine) {
        let idx = self.checked(id);
        self.transform[idx as usize] = transform;
        self.dirty.mark_with(idx, dirty::TRANSFORM, &EagerPolicy);
    }

    /// Sets the local opacity, clamped to `0.0..=1.0`.
    pub fn set_opacity(&mut self, id: NodeId, opacity: f32) {
        let idx = self.checked(id);
        self.opacity[idx as usize] = if opacity.is_nan() {
            0.0
        } else {
            opacity.clamp(0.0, 1.0)
        };
        self.dirty.mark_with(idx, dirty::OPACITY, &EagerPolicy);
    }

    /// Hides or shows the node and its subtree.
    pub fn set_hidden(&mut self, id: NodeId, hidden: bool) {
        let idx = self.checked(id);
        self.hidden[idx as usize] = hidden;
        self.dirty.mark_with(idx, dirty::TRANSFORM, &EagerPolicy);
    }

    /// Points the node at a surface, or clears it.
    pub fn set_content(&mut self, id: NodeId, content: Option<SurfaceId>) {
        let idx = self.checked(id);
        self.content[idx as usize] = content;
        self.dirty.mark(idx, dirty::CONTENT);
    }

    /// Sets the logical size the content is drawn at.
    pub fn set_size(&mut self, id: NodeId, size: Size) {
        let idx = self.checked(id);
        self.size[idx as usize] = size;
        self.dirty.mark(idx, dirty::CONTENT);
    }

    // -- Raw-index accessors --
    //
    // For indices taken from `SceneChanges` or `traversal_order()`; no
    // generation check.

    /// The current handle for slot `idx`.
    #[must_use]
    pub fn id_at(&self, idx: u32) -> NodeId {
        self.check_slot(idx);
        NodeId {
            idx,
            generation: self.generation[idx as usize],
        }
    }

    /// World transform at slot `idx`.
    #[must_use]
    pub fn world_transform_at(&self, idx: u32) -> Affine {
        self.check_slot(idx);
        self.world_transform[idx as usize]
    }

    /// Effective opacity at slot `idx`.
    #[must_use]
    pub fn effective_opacity_at(&self, idx: u32) -> f32 {
        self.check_slot(idx);
        self.effective_opacity[idx as usize]
    }

    /// Effective hidden state at slot `idx`.
    #[must_use]
    pub fn effective_hidden_at(&self, idx: u32) -> bool {
        self.check_slot(idx);
        self.effective_hidden[idx as usize]
    }

    /// Content at slot `idx`.
    #[must_use]
    pub fn content_at(&self, idx: u32) -> Option<SurfaceId> {
        self.check_slot(idx);
        self.content[idx as usize]
    }

    /// Drawing size at slot `idx`.
    #[must_use]
    pub fn size_at(&self, idx: u32) -> Size {
        self.check_slot(idx);
        self.size[idx as usize]
    }

    // -- Internal helpers --

    fn validate(&self, id: NodeId) {
        assert!(
            self.is_alive(id),
            "stale NodeId: {id:?} (current gen: {})",
            self.generation
                .get(id.idx as usize)
                .copied()
                .unwrap_or(u32::MAX)
        );
    }

    fn checked(&self, id: NodeId) -> u32 {
        self.validate(id);
        id.idx
    }

    fn check_slot(&self, idx: u32) {
        assert!(
            (idx as usize) < self.alive.len(),
            "slot index {idx} out of range (len {})",
            self.alive.len()
        );
    }

    fn is_ancestor_or_self(&self, candidate: u32, mut idx: u32) -> bool {
        while idx != INVALID {
            if idx == candidate {
                return true;
            }
            idx = self.parent[idx as usize];
        }
        false
    }

    /// Unlinks `idx` from its parent and drops the dependency edges.
    fn detach(&mut self, idx: u32) {
        let p = self.parent[idx as usize];
        self.children[p as usize].retain(|&c| c != idx);
        self.parent[idx as usize] = INVALID;
        self.dirty.remove_dependency(idx, p, dirty::TRANSFORM);
        self.dirty.remove_dependency(idx, p, dirty::OPACITY);
        self.dirty.mark(p, dirty::TOPOLOGY);
    }

    fn mark_inherited(&mut self, idx: u32) {
        self.dirty.mark_with(idx, dirty::TRANSFORM, &EagerPolicy);
        self.dirty.mark_with(idx, dirty::OPACITY, &EagerPolicy);
    }
}

#[expect(
    clippy::cast_possible_truncation,
    reason = "slot counts are bounded by the u32 index space"
)]
fn slot_index(len: usize) -> u32 {
    len as u32
}

/// Iterator over a node's children, back to front.
///
/// Created by [`SceneTree::children`].
#[derive(Debug)]
pub struct Children<'a> {
    tree: &'a SceneTree,
    inner: slice::Iter<'a, u32>,
}

impl Iterator for Children<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        self.inner.next().map(|&idx| self.tree.id_at(idx))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl ExactSizeIterator for Children<'_> {}
