// Copyright 2026 the Glaze Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Dirty-tracking channels for the scene tree.
//!
//! The scene tree records invalidation with [`understory_dirty`], one channel
//! per category of change:
//!
//! - [`TRANSFORM`] and [`OPACITY`] propagate to descendants through
//!   child-to-parent dependency edges, since world transforms and effective
//!   opacities are inherited. Hidden-flag changes ride on [`TRANSFORM`] so a
//!   single pass recomputes both.
//! - [`CONTENT`] is local: only the node whose surface binding changed is
//!   reported.
//! - [`TOPOLOGY`] is marked on structural edits and forces a rebuild of the
//!   traversal order.
//!
//! [`SceneTree::evaluate`](crate::scene::SceneTree::evaluate) drains every
//! channel and reports the result as
//! [`SceneChanges`](crate::scene::SceneChanges).

use understory_dirty::Channel;

/// Local transform or hidden flag changed.
pub const TRANSFORM: Channel = Channel::new(0);

/// Opacity changed.
pub const OPACITY: Channel = Channel::new(1);

/// Surface content or drawing size changed.
pub const CONTENT: Channel = Channel::new(2);

/// Tree structure changed.
pub const TOPOLOGY: Channel = Channel::new(3);
