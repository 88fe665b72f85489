//! Codepoint to slot resolution for donor fonts.
//!
//! Flat fonts answer through their own encoding. CID-keyed fonts with several subfonts have no
//! usable encoding, so each subfont is scanned once and the resulting codepoint map is cached
//! for the lifetime of the handle.

use std::collections::hash_map::Entry;

use log::debug;
use rustc_hash::{FxHashMap, FxHashSet};

use crate::error::FontError;
use crate::font::{EditableFont, FontId, Slot};

type CacheKey = (FontId, usize);

/// Maps codepoints to slots, caching per (font, subfont).
///
/// Entries are never invalidated while a handle is open: donors are read-only during a build.
/// Call [`SlotResolver::forget`] when a handle is closed.
#[derive(Debug, Default)]
pub struct SlotResolver {
    maps: FxHashMap<CacheKey, FxHashMap<u32, Slot>>,
    present: FxHashMap<CacheKey, FxHashSet<Slot>>,
}

impl SlotResolver {
    pub fn new() -> SlotResolver {
        SlotResolver::default()
    }

    /// The slot answering `codepoint` in the active slot space of `font`, if any.
    ///
    /// Engine faults are reported as not found.
    pub fn resolve<F: EditableFont + ?Sized>(&mut self, font: &F, codepoint: u32) -> Option<Slot> {
        if font.subfont_count() <= 1 {
            return swallow("find_slot", font.find_slot(codepoint)).flatten();
        }

        let key = (font.id(), font.active_subfont());
        let map = match self.maps.entry(key) {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => {
                debug!("building codepoint map for {} subfont {}", key.0, key.1);
                entry.insert(scan_subfont(font))
            }
        };
        map.get(&codepoint).copied()
    }

    /// True if `codepoint` resolves to a drawable glyph in `font`.
    pub fn has_glyph<F: EditableFont + ?Sized>(&mut self, font: &F, codepoint: u32) -> bool {
        self.resolve(font, codepoint)
            .and_then(|slot| font.glyph(slot))
            .map_or(false, |glyph| glyph.is_drawable())
    }

    /// True if `slot` holds a glyph in the active slot space of `font`.
    pub fn slot_present<F: EditableFont + ?Sized>(&mut self, font: &F, slot: Slot) -> bool {
        let key = (font.id(), font.active_subfont());
        self.present
            .entry(key)
            .or_insert_with(|| font.slots().into_iter().collect())
            .contains(&slot)
    }

    /// Discard everything cached for the font `id`.
    pub fn forget(&mut self, id: FontId) {
        self.maps.retain(|&(font, _), _| font != id);
        self.present.retain(|&(font, _), _| font != id);
    }

    /// Number of (font, subfont) codepoint maps built so far.
    pub fn cached_maps(&self) -> usize {
        self.maps.len()
    }
}

// Earlier slots win, and a primary mapping wins over alternates of the same slot.
fn scan_subfont<F: EditableFont + ?Sized>(font: &F) -> FxHashMap<u32, Slot> {
    let mut map = FxHashMap::default();
    for slot in 0..font.slot_count() {
        let Some(glyph) = font.glyph(slot) else {
            continue;
        };
        for codepoint in glyph.unicode.into_iter().chain(glyph.alt_unicodes.iter().copied()) {
            map.entry(codepoint).or_insert(slot);
        }
    }
    map
}

/// Treat a font engine fault as absence, recording it at debug level.
pub(crate) fn swallow<T>(operation: &str, result: Result<T, FontError>) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(err) => {
            debug!("{} failed: {}", operation, err);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::font::Glyph;
    use crate::memory::MemoryFontBuilder;
    use crate::tests::square;

    fn drawn(name: &str, unicode: u32) -> Glyph {
        let mut glyph = Glyph::new(name, Some(unicode));
        glyph.outline.contours.push(square(0.0, 0.0, 100.0));
        glyph.width = 1000;
        glyph
    }

    #[test]
    fn test_flat_font_uses_encoding() {
        let font = MemoryFontBuilder::new("Flat", 1000)
            .glyph(drawn("a", 0x61))
            .glyph(Glyph::new("space", Some(0x20)))
            .build();
        let mut resolver = SlotResolver::new();
        assert_eq!(resolver.resolve(&font, 0x61), Some(1));
        assert_eq!(resolver.resolve(&font, 0x62), None);
        assert!(resolver.has_glyph(&font, 0x61));
        assert!(!resolver.has_glyph(&font, 0x20));
        assert_eq!(resolver.cached_maps(), 0);
    }

    #[test]
    fn test_cid_font_first_writer_wins() {
        let mut alias = drawn("cid3", 0x3043);
        alias.alt_unicodes.push(0x3042);
        let mut font = MemoryFontBuilder::cid("CID", 1000, &["A", "B"])
            .cid_glyph(0, 3, alias)
            .cid_glyph(0, 5, drawn("cid5", 0x3042))
            .cid_glyph(1, 2, drawn("cid2", 0x3042))
            .build();
        let mut resolver = SlotResolver::new();

        assert_eq!(resolver.resolve(&font, 0x3042), Some(3));
        assert_eq!(resolver.resolve(&font, 0x3043), Some(3));
        assert_eq!(font.active_subfont(), 0);

        font.set_active_subfont(1).unwrap();
        assert_eq!(resolver.resolve(&font, 0x3042), Some(2));
        assert_eq!(resolver.cached_maps(), 2);
        assert!(resolver.slot_present(&font, 2));
        assert!(!resolver.slot_present(&font, 3));

        resolver.forget(font.id());
        assert_eq!(resolver.cached_maps(), 0);
    }
}
