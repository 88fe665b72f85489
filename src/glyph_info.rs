//! Glyph naming for binary fonts.
//!
//! Names are taken from the `post` table, then from the charset of a `CFF ` table, then derived
//! from the codepoint a glyph is mapped to in the `cmap` table. Glyphs without any of these get
//! `gN`.

use rustc_hash::FxHashMap;

use crate::cff::CFF;
use crate::post::PostTable;
use crate::tables::cmap::{CmapEncoding, CmapSubtable};

/// Structure for looking up glyph names.
pub struct GlyphNames<'a, 'b> {
    post: Option<&'b PostTable<'a>>,
    cff: Option<&'b CFF<'a>>,
    cmap: Option<CmapMappings>,
}

struct CmapMappings {
    encoding: CmapEncoding,
    mappings: FxHashMap<u16, u32>,
}

impl<'a, 'b> GlyphNames<'a, 'b> {
    /// Construct a new `GlyphNames` instance.
    pub fn new(
        cmap_subtable: Option<&(CmapEncoding, CmapSubtable<'_>)>,
        post: Option<&'b PostTable<'a>>,
        cff: Option<&'b CFF<'a>>,
    ) -> Self {
        let cmap = cmap_subtable
            .and_then(|(encoding, subtable)| CmapMappings::new(*encoding, subtable));
        GlyphNames { post, cff, cmap }
    }

    /// Look up the name of `gid`.
    pub fn glyph_name(&self, gid: u16) -> String {
        // Glyph 0 is always .notdef
        if gid == 0 {
            return String::from(".notdef");
        }

        self.glyph_name_from_post(gid)
            .or_else(|| self.glyph_name_from_cff(gid))
            .or_else(|| self.glyph_name_from_cmap(gid))
            .unwrap_or_else(|| format!("g{}", gid))
    }

    /// Determine the set of unique glyph names for glyphs `0..num_glyphs`.
    pub fn unique_glyph_names(&self, num_glyphs: u16) -> Vec<String> {
        unique_glyph_names((0..num_glyphs).map(|gid| self.glyph_name(gid)))
    }

    fn glyph_name_from_post(&self, gid: u16) -> Option<String> {
        match self.post?.glyph_name(gid) {
            Ok(Some(glyph_name)) if glyph_name != ".notdef" => Some(glyph_name.to_owned()),
            _ => None,
        }
    }

    fn glyph_name_from_cff(&self, gid: u16) -> Option<String> {
        self.cff?
            .glyph_name(0, gid)
            .filter(|name| name != ".notdef")
    }

    fn glyph_name_from_cmap(&self, gid: u16) -> Option<String> {
        let cmap = self.cmap.as_ref()?;
        let &ch = cmap.mappings.get(&gid)?;
        let name = match cmap.encoding {
            CmapEncoding::Unicode => glyph_names::glyph_name(ch)?,
            // The lower half of Mac Roman is ASCII.
            CmapEncoding::AppleRoman if ch < 0x80 => glyph_names::glyph_name(ch)?,
            CmapEncoding::AppleRoman | CmapEncoding::Symbol => return None,
        };
        Some(name.into_owned())
    }
}

impl CmapMappings {
    fn new(encoding: CmapEncoding, subtable: &CmapSubtable<'_>) -> Option<CmapMappings> {
        let mut mappings = FxHashMap::default();
        // The lowest codepoint names a glyph that several codepoints map to.
        for (ch, gid) in subtable.mappings().ok()? {
            mappings
                .entry(gid)
                .and_modify(|existing: &mut u32| *existing = (*existing).min(ch))
                .or_insert(ch);
        }

        Some(CmapMappings { encoding, mappings })
    }
}

/// Make `names` unique by suffixing repeats with `.altNN`.
pub fn unique_glyph_names(names: impl Iterator<Item = String>) -> Vec<String> {
    let mut seen: FxHashMap<String, usize> = FxHashMap::default();
    names
        .map(|name| {
            let alt = seen
                .entry(name.clone())
                .and_modify(|alt| *alt += 1)
                .or_insert(0);
            if *alt == 0 {
                name
            } else {
                // name is not unique, generate a new name for it
                format!("{}.alt{:02}", name, alt)
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binary::read::ReadScope;
    use crate::tests::writer::{self, TtfType::*};

    #[test]
    fn test_unique_glyph_names() {
        let names = vec!["A"; 3].into_iter().map(String::from);
        let unique_names = unique_glyph_names(names);
        assert_eq!(unique_names, &["A", "A.alt01", "A.alt02"]);
    }

    #[test]
    fn test_names_from_cmap_fallback() {
        // format 6: codepoints 0x41..=0x42 map to glyphs 1 and 2
        let data = writer::convert(&[
            UInt16(6),
            UInt16(14),
            UInt16(0),
            UInt16(0x41),
            UInt16(2),
            UInt16(1),
            UInt16(2),
        ]);
        let subtable = ReadScope::new(&data).read::<CmapSubtable<'_>>().unwrap();
        let cmap = (CmapEncoding::Unicode, subtable);
        let names = GlyphNames::new(Some(&cmap), None, None);
        assert_eq!(names.unique_glyph_names(4), &[".notdef", "A", "B", "g3"]);
    }
}
