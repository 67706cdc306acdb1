// Copyright 2026 the Glaze Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Typeface registration and lookup.
//!
//! [`TypefaceCache`] maps a family name and [`FontStyle`] to a
//! platform typeface `F`, plus the text sequences the face renders as a
//! single ligature glyph (platform text measurement gets those wrong, so
//! layout code splits them out). Entries are never evicted.

use alloc::string::String;
use alloc::vec::Vec;

use hashbrown::HashMap;

/// Style variant of a font family.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum FontStyle {
    /// Regular weight, upright.
    #[default]
    Plain,
    /// Bold weight.
    Bold,
    /// Italic.
    Italic,
    /// Bold and italic.
    BoldItalic,
}

impl FontStyle {
    const COUNT: usize = 4;

    const fn slot(self) -> usize {
        match self {
            Self::Plain => 0,
            Self::Bold => 1,
            Self::Italic => 2,
            Self::BoldItalic => 3,
        }
    }
}

#[derive(Debug)]
struct Entry<F> {
    face: F,
    ligatures: Vec<String>,
}

/// A registered or lazily created typeface.
#[derive(Debug)]
pub struct Typeface<'a, F> {
    /// The platform face.
    pub face: &'a F,
    /// Sequences rendered as one ligature glyph by this face.
    pub ligatures: &'a [String],
}

impl<F> Clone for Typeface<'_, F> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<F> Copy for Typeface<'_, F> {}

/// Typefaces keyed by family name and style.
#[derive(Debug)]
pub struct TypefaceCache<F> {
    families: HashMap<String, [Option<Entry<F>>; FontStyle::COUNT]>,
    len: usize,
}

impl<F> Default for TypefaceCache<F> {
    fn default() -> Self {
        Self::new()
    }
}

impl<F> TypefaceCache<F> {
    /// Creates an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self {
            families: HashMap::new(),
            len: 0,
        }
    }

    /// Registers `face` as the `style` variant of `name`, replacing any
    /// earlier registration.
    pub fn register<I, S>(&mut self, name: &str, style: FontStyle, face: F, ligatures: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let entry = Entry {
            face,
            ligatures: ligatures.into_iter().map(Into::into).collect(),
        };
        if family_slot(&mut self.families, name, style)
            .replace(entry)
            .is_none()
        {
            self.len += 1;
        }
        log::debug!("registered typeface {name:?} ({style:?})");
    }

    /// Looks up a registered face.
    #[must_use]
    pub fn resolve(&self, name: &str, style: FontStyle) -> Option<Typeface<'_, F>> {
        let entry = self.families.get(name)?[style.slot()].as_ref()?;
        Some(Typeface {
            face: &entry.face,
            ligatures: &entry.ligatures,
        })
    }

    /// Looks up a face, creating and caching it with `create` on a miss.
    ///
    /// Faces created this way have no ligature list.
    pub fn resolve_or_insert_with(
        &mut self,
        name: &str,
        style: FontStyle,
        create: impl FnOnce(&str, FontStyle) -> F,
    ) -> Typeface<'_, F> {
        let mut inserted = false;
        let entry = family_slot(&mut self.families, name, style).get_or_insert_with(|| {
            inserted = true;
            Entry {
                face: create(name, style),
                ligatures: Vec::new(),
            }
        });
        if inserted {
            self.len += 1;
        }
        Typeface {
            face: &entry.face,
            ligatures: &entry.ligatures,
        }
    }

    /// Number of cached faces.
    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether no face is cached.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

fn family_slot<'a, F>(
    families: &'a mut HashMap<String, [Option<Entry<F>>; FontStyle::COUNT]>,
    name: &str,
    style: FontStyle,
) -> &'a mut Option<Entry<F>> {
    let styles = families
        .entry_ref(name)
        .or_insert_with(|| core::array::from_fn(|_| None));
    &mut styles[style.slot()]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_and_resolve_by_style() {
        let mut cache = TypefaceCache::new();
        cache.register("Sans", FontStyle::Plain, 1_u32, ["fi", "fl"]);
        cache.register("Sans", FontStyle::Bold, 2_u32, core::iter::empty::<&str>());

        let plain = cache.resolve("Sans", FontStyle::Plain).unwrap();
        assert_eq!(*plain.face, 1);
        assert_eq!(plain.ligatures, ["fi", "fl"]);
        assert_eq!(*cache.resolve("Sans", FontStyle::Bold).unwrap().face, 2);
        assert!(cache.resolve("Sans", FontStyle::Italic).is_none());
        assert!(cache.resolve("Serif", FontStyle::Plain).is_none());
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn re_register_replaces() {
        let mut cache = TypefaceCache::new();
        cache.register("Mono", FontStyle::Plain, 'a', ["ae"]);
        cache.register("Mono", FontStyle::Plain, 'b', core::iter::empty::<String>());
        let face = cache.resolve("Mono", FontStyle::Plain).unwrap();
        assert_eq!(*face.face, 'b');
        assert!(face.ligatures.is_empty());
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn resolve_or_insert_creates_once() {
        let mut cache = TypefaceCache::new();
        let mut created = 0;
        for _ in 0..3 {
            let face = cache.resolve_or_insert_with("Display", FontStyle::Italic, |name, style| {
                created += 1;
                alloc::format!("{name}/{style:?}")
            });
            assert_eq!(face.face, "Display/Italic");
        }
        assert_eq!(created, 1);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn registered_face_wins_over_factory() {
        let mut cache = TypefaceCache::new();
        cache.register("Sans", FontStyle::Plain, 7, ["ffi"]);
        let face = cache.resolve_or_insert_with("Sans", FontStyle::Plain, |_, _| 0);
        assert_eq!(*face.face, 7);
        assert_eq!(face.ligatures, ["ffi"]);
    }
}
