//! Picking the subfont of a CID-keyed donor that should supply a codepoint.
//!
//! Large Japanese fonts carry the same codepoint in several subfonts (proportional, halfwidth,
//! vertical kana and so on). Subfonts are ranked by name according to the script of the
//! codepoint and searched in that order, followed by every other subfont in index order.

use std::collections::BTreeMap;

use log::debug;

use crate::diagnostics::{kind, MapLog};
use crate::feature_table::FeatureTableFile;
use crate::font::{EditableFont, SelectionGuard, Slot, SubfontGuard};
use crate::ranges::{CJK_IDEOGRAPHS, HALFWIDTH_KANA, KANA};
use crate::resolve::{swallow, SlotResolver};

/// Subfont display names to subfont indices, in subfont order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubfontNameIndex {
    entries: Vec<(String, usize)>,
}

impl SubfontNameIndex {
    /// Index the subfonts of `font`. The active subfont and the selection are left as they were.
    ///
    /// Subfonts are named by their font name, then their full name, then `subfont#N`. A repeated
    /// name refers to the last subfont carrying it.
    pub fn build<F: EditableFont + ?Sized>(font: &mut F) -> SubfontNameIndex {
        let mut index = SubfontNameIndex::default();
        // Switching subfonts clears the selection, so the subfont is restored first.
        let mut font = SelectionGuard::new(font);
        let mut font = SubfontGuard::new(&mut *font);
        for subfont in 0..font.subfont_count() {
            if swallow("set_active_subfont", font.set_active_subfont(subfont)).is_none() {
                continue;
            }
            let name = font
                .font_name()
                .or_else(|| font.full_name())
                .map(str::to_owned)
                .unwrap_or_else(|| format!("subfont#{}", subfont));
            index.insert(name, subfont);
        }
        index
    }

    fn insert(&mut self, name: String, subfont: usize) {
        match self.entries.iter_mut().find(|(existing, _)| *existing == name) {
            Some(entry) => entry.1 = subfont,
            None => self.entries.push((name, subfont)),
        }
    }

    pub fn entries(&self) -> &[(String, usize)] {
        &self.entries
    }

    pub fn get(&self, name: &str) -> Option<usize> {
        self.entries
            .iter()
            .find(|(candidate, _)| candidate == name)
            .map(|&(_, subfont)| subfont)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<'a> FromIterator<(&'a str, usize)> for SubfontNameIndex {
    fn from_iter<I: IntoIterator<Item = (&'a str, usize)>>(iter: I) -> Self {
        let mut index = SubfontNameIndex::default();
        for (name, subfont) in iter {
            index.insert(name.to_owned(), subfont);
        }
        index
    }
}

/// Script classes that steer the subfont preference.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ScriptCategory {
    HalfwidthKana,
    Kana,
    Ideograph,
    Other,
}

impl ScriptCategory {
    pub fn of(codepoint: u32) -> ScriptCategory {
        if HALFWIDTH_KANA.contains(codepoint) {
            ScriptCategory::HalfwidthKana
        } else if KANA.contains(codepoint) {
            ScriptCategory::Kana
        } else if CJK_IDEOGRAPHS.contains(codepoint) {
            ScriptCategory::Ideograph
        } else {
            ScriptCategory::Other
        }
    }

    /// Subfont name fragments in priority order.
    pub fn patterns(self) -> &'static [&'static str] {
        match self {
            ScriptCategory::HalfwidthKana => &["HWidth", "HKana", "Kana", "Generic"],
            ScriptCategory::Kana => &["HKana", "Kana", "VKana", "Generic"],
            ScriptCategory::Ideograph => {
                &["Ideographs", "ProportionalCJK", "HWidthCJK", "Generic"]
            }
            ScriptCategory::Other => &["Generic"],
        }
    }
}

/// Subfonts whose names suit the script of `codepoint`, best first, without repeats.
pub fn preferred_subfonts(names: &SubfontNameIndex, codepoint: u32) -> Vec<usize> {
    let mut preferred = Vec::new();
    for pattern in ScriptCategory::of(codepoint).patterns() {
        for (name, subfont) in names.entries() {
            if name.contains(pattern) && !preferred.contains(subfont) {
                preferred.push(*subfont);
            }
        }
    }
    preferred
}

/// Codepoint to CID, taken from the cmap of a donor's binary font file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CidHintMap {
    cids: BTreeMap<u32, Slot>,
}

impl CidHintMap {
    /// Parse the glyph names the cmap of `file` points at as CIDs.
    ///
    /// Names that are not CIDs are logged as `cid_name_unparsed` and skipped.
    pub fn from_feature_table(file: &FeatureTableFile, log: &mut MapLog) -> CidHintMap {
        let mut cids = BTreeMap::new();
        for (&codepoint, name) in file.cmap() {
            match cid_from_glyph_name(name) {
                Some(cid) => {
                    cids.insert(codepoint, cid);
                }
                None => log.log_issue(
                    kind::CID_NAME_UNPARSED,
                    Some(codepoint),
                    &format!("name={}", name),
                ),
            }
        }
        debug!("cid hint map has {} entries", cids.len());
        CidHintMap { cids }
    }

    pub fn get(&self, codepoint: u32) -> Option<Slot> {
        self.cids.get(&codepoint).copied()
    }

    pub fn len(&self) -> usize {
        self.cids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cids.is_empty()
    }
}

impl FromIterator<(u32, Slot)> for CidHintMap {
    fn from_iter<I: IntoIterator<Item = (u32, Slot)>>(iter: I) -> Self {
        CidHintMap {
            cids: iter.into_iter().collect(),
        }
    }
}

/// Parse `cid12345`, `CID+12345` or `Identity.12345` into a CID.
pub fn cid_from_glyph_name(name: &str) -> Option<Slot> {
    let digits = ["cid", "CID+", "Identity."]
        .iter()
        .find_map(|prefix| name.strip_prefix(prefix))?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

/// What is known about the subfonts of a CID-keyed donor.
#[derive(Debug, Copy, Clone)]
pub struct CidLookup<'a> {
    pub names: &'a SubfontNameIndex,
    pub hints: Option<&'a CidHintMap>,
}

/// Find a drawable glyph for `codepoint` in `font`.
///
/// Returns the subfont it was found in (`None` for fonts without several subfonts) and its
/// slot. Preferred subfonts are tried first and the first drawable hit wins. The active
/// subfont and the selection of `font` are restored on return.
pub fn resolve_in_cid<F: EditableFont + ?Sized>(
    resolver: &mut SlotResolver,
    log: &mut MapLog,
    font: &mut F,
    codepoint: u32,
    lookup: CidLookup<'_>,
) -> Option<(Option<usize>, Slot)> {
    let subfont_count = font.subfont_count();
    if subfont_count <= 1 {
        let slot = lookup
            .hints
            .and_then(|hints| hints.get(codepoint))
            .or_else(|| resolver.resolve(&*font, codepoint));
        let found = slot.filter(|&slot| font.glyph(slot).map_or(false, |g| g.is_drawable()));
        if found.is_none() && lookup.hints.is_some() {
            log.log_issue(kind::CID_MAP_MISSING, Some(codepoint), "");
        }
        return found.map(|slot| (None, slot));
    }

    let preferred = preferred_subfonts(lookup.names, codepoint);
    let rest = (0..subfont_count).filter(|subfont| !preferred.contains(subfont));
    let order = preferred.iter().copied().chain(rest).collect::<Vec<_>>();

    let mut font = SelectionGuard::new(font);
    let mut font = SubfontGuard::new(&mut *font);
    let mut missing_slot = None;
    for subfont in order {
        if swallow("set_active_subfont", font.set_active_subfont(subfont)).is_none() {
            continue;
        }
        let slot = match lookup.hints {
            Some(hints) => hints.get(codepoint),
            None => resolver.resolve(&*font, codepoint),
        };
        let Some(slot) = slot else {
            continue;
        };
        if lookup.hints.is_some() && !resolver.slot_present(&*font, slot) {
            missing_slot = Some(slot);
            continue;
        }
        if font.glyph(slot).map_or(false, |glyph| glyph.is_drawable()) {
            return Some((Some(subfont), slot));
        }
    }

    if lookup.hints.is_some() {
        if let Some(slot) = missing_slot {
            log.log_issue(
                kind::CID_SLOT_MISSING_SUBFONT,
                Some(codepoint),
                &format!("slot={}", slot),
            );
        }
        log.log_issue(kind::CID_SLOT_NOT_FOUND, Some(codepoint), "");
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::font::Glyph;
    use crate::memory::{MemoryFont, MemoryFontBuilder};
    use crate::tests::square;

    fn drawn(name: &str, unicode: u32) -> Glyph {
        let mut glyph = Glyph::new(name, Some(unicode));
        glyph.outline.contours.push(square(0.0, 0.0, 100.0));
        glyph.width = 1000;
        glyph
    }

    fn japanese_donor() -> MemoryFont {
        MemoryFontBuilder::cid(
            "Donor",
            1000,
            &["Donor-Generic", "Donor-Ideographs", "Donor-Kana", "Donor-HKana"],
        )
        .cid_glyph(0, 10, drawn("cid10", 0x3042))
        .cid_glyph(2, 11, drawn("cid11", 0x3042))
        .cid_glyph(3, 12, Glyph::new("cid12", Some(0x3042)))
        .cid_glyph(0, 20, drawn("cid20", 0x41))
        .cid_glyph(1, 30, drawn("cid30", 0x6F22))
        .cid_glyph(2, 40, drawn("cid40", 0x2460))
        .build()
    }

    #[test]
    fn test_cid_from_glyph_name() {
        assert_eq!(cid_from_glyph_name("cid12345"), Some(12345));
        assert_eq!(cid_from_glyph_name("CID+7"), Some(7));
        assert_eq!(cid_from_glyph_name("Identity.0042"), Some(42));
        assert_eq!(cid_from_glyph_name("cid"), None);
        assert_eq!(cid_from_glyph_name("cid12a"), None);
        assert_eq!(cid_from_glyph_name("uni3042"), None);
    }

    #[test]
    fn test_name_index_restores_subfont() {
        let mut font = japanese_donor();
        font.set_active_subfont(2).unwrap();
        font.select(40).unwrap();
        let names = SubfontNameIndex::build(&mut font);
        assert_eq!(font.active_subfont(), 2);
        assert_eq!(font.selection(), vec![40]);
        assert_eq!(names.len(), 4);
        assert_eq!(names.get("Donor-Kana"), Some(2));
    }

    #[test]
    fn test_preferred_subfonts() {
        let names = ["X-HKana", "X-Kana", "X-Generic", "X-Ideographs", "X-HWidth"]
            .iter()
            .enumerate()
            .map(|(index, &name)| (name, index))
            .collect::<SubfontNameIndex>();

        // "X-HKana" also contains "Kana" but appears once
        assert_eq!(preferred_subfonts(&names, 0x3042), vec![0, 1, 2]);
        assert_eq!(preferred_subfonts(&names, 0xFF71), vec![4, 0, 1, 2]);
        assert_eq!(preferred_subfonts(&names, 0x6F22), vec![3, 2]);
        assert_eq!(preferred_subfonts(&names, 0x41), vec![2]);
        assert_eq!(
            preferred_subfonts(&names, 0x3042),
            preferred_subfonts(&names, 0x3042)
        );
    }

    #[test]
    fn test_resolve_prefers_by_name() {
        let mut font = japanese_donor();
        let names = SubfontNameIndex::build(&mut font);
        let lookup = CidLookup {
            names: &names,
            hints: None,
        };
        let mut resolver = SlotResolver::new();
        let mut log = MapLog::disabled();

        // HKana is preferred but not drawable, Kana is next
        let found = resolve_in_cid(&mut resolver, &mut log, &mut font, 0x3042, lookup);
        assert_eq!(found, Some((Some(2), 11)));
        assert_eq!(font.active_subfont(), 0);

        font.set_active_subfont(3).unwrap();
        let found = resolve_in_cid(&mut resolver, &mut log, &mut font, 0x6F22, lookup);
        assert_eq!(found, Some((Some(1), 30)));
        assert_eq!(font.active_subfont(), 3);

        // only Generic is preferred, the rest are scanned in index order
        let found = resolve_in_cid(&mut resolver, &mut log, &mut font, 0x2460, lookup);
        assert_eq!(found, Some((Some(2), 40)));
        assert_eq!(font.active_subfont(), 3);

        let found = resolve_in_cid(&mut resolver, &mut log, &mut font, 0x3044, lookup);
        assert_eq!(found, None);
        assert_eq!(font.active_subfont(), 3);
        assert!(log.counts().is_empty());
    }

    #[test]
    fn test_resolve_with_hints() {
        let mut font = japanese_donor();
        let names = SubfontNameIndex::build(&mut font);
        let hints = [(0x3042, 11), (0x3044, 99)].into_iter().collect::<CidHintMap>();
        let lookup = CidLookup {
            names: &names,
            hints: Some(&hints),
        };
        let mut resolver = SlotResolver::new();
        let mut log = MapLog::disabled();

        let found = resolve_in_cid(&mut resolver, &mut log, &mut font, 0x3042, lookup);
        assert_eq!(found, Some((Some(2), 11)));

        let found = resolve_in_cid(&mut resolver, &mut log, &mut font, 0x3044, lookup);
        assert_eq!(found, None);
        assert_eq!(log.count(kind::CID_SLOT_MISSING_SUBFONT), 1);
        assert_eq!(log.count(kind::CID_SLOT_NOT_FOUND), 1);
        assert_eq!(font.active_subfont(), 0);
    }

    #[test]
    fn test_flat_font_bypasses_subfonts() {
        let mut font = MemoryFontBuilder::new("Flat", 1000)
            .glyph(drawn("a", 0x61))
            .build();
        let names = SubfontNameIndex::build(&mut font);
        assert!(names.is_empty());
        let hints = CidHintMap::default();
        let lookup = CidLookup {
            names: &names,
            hints: Some(&hints),
        };
        let mut resolver = SlotResolver::new();
        let mut log = MapLog::disabled();

        let found = resolve_in_cid(&mut resolver, &mut log, &mut font, 0x61, lookup);
        assert_eq!(found, Some((None, 1)));
        let found = resolve_in_cid(&mut resolver, &mut log, &mut font, 0x62, lookup);
        assert_eq!(found, None);
        assert_eq!(log.count(kind::CID_MAP_MISSING), 1);
    }
}
