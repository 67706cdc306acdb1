// Copyright 2026 the Glaze Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Node and surface identity.

use core::fmt;

/// Marks "no node" in the tree's index arrays.
pub const INVALID: u32 = u32::MAX;

/// A generational handle to a node in a [`SceneTree`](super::SceneTree).
///
/// Destroying a node bumps its slot's generation, so handles to it go stale
/// even after the slot is reused.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId {
    pub(crate) idx: u32,
    pub(crate) generation: u32,
}

impl NodeId {
    /// Raw slot index, as used by the `*_at` accessors.
    #[inline]
    #[must_use]
    pub const fn index(self) -> u32 {
        self.idx
    }

    /// Generation counter.
    #[inline]
    #[must_use]
    pub const fn generation(self) -> u32 {
        self.generation
    }
}

impl fmt::Debug for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NodeId({}@gen{})", self.idx, self.generation)
    }
}

/// Names the texture a node displays.
///
/// Ids are handed out by
/// [`Graphics::allocate_surface_id`](crate::graphics::Graphics::allocate_surface_id)
/// and resolved through the context's surface table, which only holds the
/// texture weakly.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SurfaceId(pub u32);

impl fmt::Debug for SurfaceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SurfaceId({})", self.0)
    }
}
