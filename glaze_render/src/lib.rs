// Copyright 2026 the Glaze Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Render plans for glaze scene trees.
//!
//! This crate sits between [`glaze_core`]'s scene evaluation and whatever
//! submits draws to the GPU:
//!
//! - [`RenderPlan`] — the ordered draw list for one frame
//! - [`RenderItem`] — one textured quad in that list
//! - [`TextureBinding`] — the live GPU texture an item samples

#![no_std]
#![cfg_attr(docsrs, feature(doc_cfg))]

extern crate alloc;

mod plan;

pub use plan::{RenderItem, RenderPlan, TextureBinding};
