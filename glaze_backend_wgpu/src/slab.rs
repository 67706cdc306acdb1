// Copyright 2026 the Glaze Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Generation-checked storage addressed by [`TextureId`].
//!
//! An id packs the slot generation into the high 32 bits and the slot index
//! into the low 32 bits. Generations start at 1, so `TextureId(0)` is never
//! handed out.

use glaze_core::backend::TextureId;

#[derive(Debug)]
struct Slot<T> {
    generation: u32,
    value: Option<T>,
}

/// A slab whose keys go stale when their slot is freed.
#[derive(Debug)]
pub(crate) struct Slab<T> {
    slots: Vec<Slot<T>>,
    free_list: Vec<u32>,
    len: usize,
}

impl<T> Default for Slab<T> {
    fn default() -> Self {
        Self {
            slots: Vec::new(),
            free_list: Vec::new(),
            len: 0,
        }
    }
}

pub(crate) fn pack_id(idx: u32, generation: u32) -> TextureId {
    TextureId((u64::from(generation) << 32) | u64::from(idx))
}

#[expect(
    clippy::cast_possible_truncation,
    reason = "splitting a u64 into its two u32 halves"
)]
pub(crate) fn unpack_id(id: TextureId) -> (u32, u32) {
    (id.0 as u32, (id.0 >> 32) as u32)
}

impl<T> Slab<T> {
    pub(crate) fn insert(&mut self, value: T) -> TextureId {
        self.len += 1;
        if let Some(idx) = self.free_list.pop() {
            let slot = &mut self.slots[idx as usize];
            slot.value = Some(value);
            return pack_id(idx, slot.generation);
        }
        let idx = u32::try_from(self.slots.len()).unwrap_or(u32::MAX);
        self.slots.push(Slot {
            generation: 1,
            value: Some(value),
        });
        pack_id(idx, 1)
    }

    pub(crate) fn get(&self, id: TextureId) -> Option<&T> {
        let (idx, generation) = unpack_id(id);
        let slot = self.slots.get(idx as usize)?;
        if slot.generation == generation {
            slot.value.as_ref()
        } else {
            None
        }
    }

    pub(crate) fn remove(&mut self, id: TextureId) -> Option<T> {
        let (idx, generation) = unpack_id(id);
        let slot = self.slots.get_mut(idx as usize)?;
        if slot.generation != generation {
            return None;
        }
        let value = slot.value.take()?;
        slot.generation = slot.generation.wrapping_add(1).max(1);
        self.free_list.push(idx);
        self.len -= 1;
        Some(value)
    }

    /// Empties every slot, invalidating all outstanding ids.
    pub(crate) fn clear(&mut self) -> usize {
        let dropped = self.len;
        for (idx, slot) in self.slots.iter_mut().enumerate() {
            if slot.value.take().is_some() {
                slot.generation = slot.generation.wrapping_add(1).max(1);
                self.free_list.push(u32::try_from(idx).unwrap_or(u32::MAX));
            }
        }
        self.len = 0;
        dropped
    }

    pub(crate) fn len(&self) -> usize {
        self.len
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_pack_index_and_generation() {
        let id = pack_id(7, 3);
        assert_eq!(id, TextureId((3 << 32) | 7));
        assert_eq!(unpack_id(id), (7, 3));
    }

    #[test]
    fn removed_ids_go_stale() {
        let mut slab = Slab::default();
        let a = slab.insert("a");
        assert_eq!(slab.get(a), Some(&"a"));
        assert_eq!(slab.remove(a), Some("a"));
        assert_eq!(slab.get(a), None);
        assert_eq!(slab.remove(a), None, "double remove is a no-op");

        let b = slab.insert("b");
        assert_eq!(unpack_id(a).0, unpack_id(b).0, "slot is reused");
        assert_ne!(a, b);
        assert_eq!(slab.get(a), None);
        assert_eq!(slab.get(b), Some(&"b"));
    }

    #[test]
    fn clear_invalidates_everything() {
        let mut slab = Slab::default();
        let ids: Vec<_> = (0..4).map(|i| slab.insert(i)).collect();
        slab.remove(ids[1]);
        assert_eq!(slab.clear(), 3);
        assert_eq!(slab.len(), 0);
        assert!(ids.iter().all(|&id| slab.get(id).is_none()));

        let fresh = slab.insert(9);
        assert!(!ids.contains(&fresh));
        assert_eq!(slab.len(), 1);
    }

    #[test]
    fn zero_is_never_an_id() {
        let mut slab = Slab::default();
        assert_ne!(slab.insert(()), TextureId(0));
        assert_eq!(slab.get(TextureId(0)), None);
    }
}
