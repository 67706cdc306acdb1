// Copyright 2026 the Glaze Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Context-loss broadcast for GPU-state owners.
//!
//! Anything that owns GPU state implements [`Refreshable`] and registers
//! with the context's [`RefreshRegistry`] when it is created. When the
//! platform destroys or recreates the GPU surface, the registry broadcasts
//! [`on_context_lost`](Refreshable::on_context_lost) or
//! [`on_context_restored`](Refreshable::on_context_restored) to every live
//! registration.
//!
//! # Membership
//!
//! The registry stores only [`Weak`] references, so registering never keeps
//! a resource alive. Registrations are addressed by [`RefreshKey`], a slot
//! index plus generation counter: a key held past its
//! [`unregister`](RefreshRegistry::unregister) can never address a later
//! registration that reuses the slot.
//!
//! # Broadcast
//!
//! Each broadcast snapshots the live set before calling out, and never holds
//! an internal borrow across a callback. Callbacks may therefore register,
//! unregister or drop resources (including themselves). A registration
//! removed during a broadcast is skipped for the rest of that broadcast.
//! Delivery order is unspecified.

use alloc::rc::{Rc, Weak};
use alloc::vec::Vec;
use core::cell::RefCell;
use core::fmt;

use hashbrown::HashMap;

use crate::error::{GraphicsError, Result};

/// An owner of GPU state that must react to context loss.
pub trait Refreshable {
    /// The GPU context is gone. Forget every GPU handle without freeing it.
    fn on_context_lost(&self);

    /// A fresh GPU context is available.
    ///
    /// # Errors
    ///
    /// A failure is logged by the registry and does not stop the broadcast.
    fn on_context_restored(&self) -> Result<()>;

    /// Whether the resource has been disposed and must not be registered.
    fn is_disposed(&self) -> bool {
        false
    }
}

/// A handle to one registration in a [`RefreshRegistry`].
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct RefreshKey {
    idx: u32,
    generation: u32,
}

impl RefreshKey {
    /// Returns the raw slot index (for diagnostics only).
    #[inline]
    #[must_use]
    pub const fn index(self) -> u32 {
        self.idx
    }

    /// Returns the generation counter.
    #[inline]
    #[must_use]
    pub const fn generation(self) -> u32 {
        self.generation
    }
}

impl fmt::Debug for RefreshKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RefreshKey({}@gen{})", self.idx, self.generation)
    }
}

/// Outcome of one broadcast.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RefreshReport {
    /// Resources that received the notification.
    pub notified: usize,
    /// Resources whose handler returned an error.
    pub failed: usize,
    /// Registrations dropped because their resource no longer exists.
    pub pruned: usize,
}

#[derive(Default)]
struct Slots {
    entries: Vec<Option<Weak<dyn Refreshable>>>,
    generation: Vec<u32>,
    free_list: Vec<u32>,
    /// Slot of each registered allocation, keyed by its address.
    by_addr: HashMap<*const (), u32>,
}

/// Identity of the allocation behind a weak reference.
///
/// A registered `Weak` keeps its allocation reserved, so the address cannot
/// be reused while it is in the table.
fn addr(weak: &Weak<dyn Refreshable>) -> *const () {
    weak.as_ptr().cast::<()>()
}

impl Slots {
    fn is_current(&self, key: RefreshKey) -> bool {
        let idx = key.idx as usize;
        idx < self.entries.len()
            && self.generation[idx] == key.generation
            && self.entries[idx].is_some()
    }

    fn release(&mut self, idx: u32) {
        if let Some(weak) = self.entries[idx as usize].take() {
            self.by_addr.remove(&addr(&weak));
        }
        self.generation[idx as usize] = self.generation[idx as usize].wrapping_add(1);
        self.free_list.push(idx);
    }

    fn key(&self, idx: u32) -> RefreshKey {
        RefreshKey {
            idx,
            generation: self.generation[idx as usize],
        }
    }
}

/// Weakly-held set of [`Refreshable`] resources for one GPU context.
///
/// All methods take `&self`; the registry is meant to be shared by the
/// context and every resource it creates on the rendering thread.
#[derive(Default)]
pub struct RefreshRegistry {
    slots: RefCell<Slots>,
}

impl fmt::Debug for RefreshRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RefreshRegistry")
            .field("len", &self.len())
            .finish_non_exhaustive()
    }
}

impl RefreshRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a resource.
    ///
    /// Registering the same resource twice returns the existing key.
    ///
    /// # Errors
    ///
    /// Returns [`GraphicsError::InvalidArgument`] if the resource has already
    /// been dropped or reports itself disposed.
    pub fn register(&self, resource: Weak<dyn Refreshable>) -> Result<RefreshKey> {
        match resource.upgrade() {
            None => {
                return Err(GraphicsError::InvalidArgument(
                    "cannot register a dropped resource",
                ));
            }
            Some(strong) if strong.is_disposed() => {
                return Err(GraphicsError::InvalidArgument(
                    "cannot register a disposed resource",
                ));
            }
            // Dropped before borrowing: this may be the last strong ref and
            // its destructor may unregister.
            Some(_) => {}
        }

        let mut slots = self.slots.borrow_mut();
        let ptr = addr(&resource);
        if let Some(&idx) = slots.by_addr.get(&ptr) {
            return Ok(slots.key(idx));
        }

        let idx = if let Some(idx) = slots.free_list.pop() {
            slots.entries[idx as usize] = Some(resource);
            idx
        } else {
            let idx = u32_index(slots.entries.len());
            slots.entries.push(Some(resource));
            slots.generation.push(0);
            idx
        };
        slots.by_addr.insert(ptr, idx);
        Ok(slots.key(idx))
    }

    /// Removes a registration.
    ///
    /// Returns `false` (and does nothing) if the key is stale or was never
    /// registered.
    pub fn unregister(&self, key: RefreshKey) -> bool {
        let mut slots = self.slots.borrow_mut();
        if !slots.is_current(key) {
            return false;
        }
        slots.release(key.idx);
        true
    }

    /// Returns whether `key` is a current registration.
    #[must_use]
    pub fn contains(&self, key: RefreshKey) -> bool {
        self.slots.borrow().is_current(key)
    }

    /// Number of registrations whose resource is still alive.
    #[must_use]
    pub fn len(&self) -> usize {
        self.slots
            .borrow()
            .entries
            .iter()
            .flatten()
            .filter(|weak| weak.strong_count() > 0)
            .count()
    }

    /// Whether no live resource is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Tells every registered resource that the GPU context was lost.
    pub fn notify_context_lost(&self) -> RefreshReport {
        let (snapshot, pruned) = self.snapshot();
        let mut report = RefreshReport {
            pruned,
            ..RefreshReport::default()
        };
        for (key, resource) in &snapshot {
            if !self.contains(*key) {
                continue;
            }
            resource.on_context_lost();
            report.notified += 1;
        }
        report
    }

    /// Tells every registered resource that a new GPU context exists.
    ///
    /// A resource that fails to restore is logged and counted; the remaining
    /// resources are still notified.
    pub fn notify_context_restored(&self) -> RefreshReport {
        let (snapshot, pruned) = self.snapshot();
        let mut report = RefreshReport {
            pruned,
            ..RefreshReport::default()
        };
        for (key, resource) in &snapshot {
            if !self.contains(*key) {
                continue;
            }
            report.notified += 1;
            if let Err(err) = resource.on_context_restored() {
                log::warn!("refreshable {key:?} failed to restore: {err}");
                report.failed += 1;
            }
        }
        report
    }

    /// Upgrades every live registration and prunes the dead ones.
    fn snapshot(&self) -> (Vec<(RefreshKey, Rc<dyn Refreshable>)>, usize) {
        let mut dead = Vec::new();
        let mut live = Vec::new();
        {
            let mut slots = self.slots.borrow_mut();
            for idx in 0..slots.entries.len() {
                let Some(weak) = &slots.entries[idx] else {
                    continue;
                };
                let idx = u32_index(idx);
                match weak.upgrade() {
                    Some(strong) => live.push((slots.key(idx), strong)),
                    None => dead.push(idx),
                }
            }
            for &idx in &dead {
                slots.release(idx);
            }
        }
        if !dead.is_empty() {
            log::debug!("pruned {} dropped refreshables", dead.len());
        }
        (live, dead.len())
    }
}

#[expect(
    clippy::cast_possible_truncation,
    reason = "registries never approach u32::MAX slots"
)]
fn u32_index(idx: usize) -> u32 {
    idx as u32
}
