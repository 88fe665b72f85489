//! Reading of the `GSUB` table.
//!
//! Only what is needed to resolve substitutions statically is read: the feature list, and the
//! single (type 1) and alternate (type 3) lookups, including those wrapped in extension (type 7)
//! subtables. Other lookup types are kept as opaque entries so that lookup indices line up with
//! the feature records that refer to them.
//!
//! <https://docs.microsoft.com/en-us/typography/opentype/spec/gsub>

use log::warn;

use crate::binary::read::{
    ReadArray, ReadBinary, ReadBinaryDep, ReadCtxt, ReadFixedSizeDep, ReadFrom, ReadScope,
};
use crate::binary::U16Be;
use crate::error::ParseError;
use crate::size;
use crate::tag::DisplayTag;

const SINGLE_SUBST: u16 = 1;
const ALTERNATE_SUBST: u16 = 3;
const EXTENSION_SUBST: u16 = 7;

/// A `GSUB` table: its features and lookups.
pub struct LayoutTable {
    pub feature_list: FeatureList,
    pub lookup_list: LookupList,
}

pub struct FeatureList {
    pub feature_records: Vec<FeatureRecord>,
}

pub struct FeatureRecord {
    pub feature_tag: u32,
    pub lookup_indices: Vec<u16>,
}

pub struct LookupList {
    pub lookups: Vec<Lookup>,
}

pub struct Lookup {
    pub lookup_type: u16,
    pub lookup_flag: u16,
    pub subtables: Vec<SubstSubtable>,
}

pub enum SubstSubtable {
    Single(SingleSubst),
    Alternate(AlternateSubst),
    /// A subtable of a lookup type that is not resolved statically.
    Other,
}

pub enum SingleSubst {
    Format1 {
        coverage: Coverage,
        delta_glyph_index: i16,
    },
    Format2 {
        coverage: Coverage,
        substitute_glyph_array: Vec<u16>,
    },
}

pub struct AlternateSubst {
    coverage: Coverage,
    alternatesets: Vec<AlternateSet>,
}

pub struct AlternateSet {
    pub alternate_glyphs: Vec<u16>,
}

pub enum Coverage {
    Format1 {
        glyph_array: Vec<u16>,
    },
    Format2 {
        coverage_range_array: Vec<CoverageRangeRecord>,
    },
}

#[derive(Debug, Copy, Clone)]
pub struct CoverageRangeRecord {
    start_glyph: u16,
    end_glyph: u16,
    start_coverage_index: u16,
}

impl ReadBinary for LayoutTable {
    type HostType<'a> = Self;

    fn read<'a>(ctxt: &mut ReadCtxt<'a>) -> Result<Self, ParseError> {
        let table = ctxt.scope();

        let major_version = ctxt.read_u16be()?;
        let _minor_version = ctxt.read_u16be()?;
        let _script_list_offset = usize::from(ctxt.read_u16be()?);
        let feature_list_offset = usize::from(ctxt.read_u16be()?);
        let lookup_list_offset = usize::from(ctxt.read_u16be()?);

        // We handle versions 1.x
        if major_version != 1 {
            return Err(ParseError::BadVersion);
        }

        let feature_list = if feature_list_offset >= table.data().len() {
            return Err(ParseError::BadOffset);
        } else if feature_list_offset == 0 {
            FeatureList {
                feature_records: Vec::new(),
            }
        } else {
            table.offset(feature_list_offset).read::<FeatureList>()?
        };

        let lookup_list = if lookup_list_offset >= table.data().len() {
            return Err(ParseError::BadOffset);
        } else if lookup_list_offset == 0 {
            LookupList {
                lookups: Vec::new(),
            }
        } else {
            table.offset(lookup_list_offset).read::<LookupList>()?
        };

        Ok(LayoutTable {
            feature_list,
            lookup_list,
        })
    }
}

impl LayoutTable {
    /// The tags of every feature that refers to the lookup at `lookup_index`, in feature order
    /// without duplicates.
    pub fn lookup_feature_tags(&self, lookup_index: usize) -> Vec<u32> {
        let mut tags = Vec::new();
        for record in &self.feature_list.feature_records {
            let refers = record
                .lookup_indices
                .iter()
                .any(|&index| usize::from(index) == lookup_index);
            if refers && !tags.contains(&record.feature_tag) {
                tags.push(record.feature_tag);
            }
        }
        tags
    }

    /// The distinct feature tags present in the table, in feature order.
    pub fn feature_tags(&self) -> Vec<u32> {
        let mut tags = Vec::new();
        for record in &self.feature_list.feature_records {
            if !tags.contains(&record.feature_tag) {
                tags.push(record.feature_tag);
            }
        }
        tags
    }

    /// The lookup indices referenced by features tagged `tag`, in feature order.
    pub fn lookups_for_tag(&self, tag: u32) -> Vec<usize> {
        let mut indices = Vec::new();
        for record in &self.feature_list.feature_records {
            if record.feature_tag != tag {
                continue;
            }
            for &index in &record.lookup_indices {
                if !indices.contains(&usize::from(index)) {
                    indices.push(usize::from(index));
                }
            }
        }
        indices
    }
}

impl ReadBinary for FeatureList {
    type HostType<'a> = Self;

    fn read<'a>(ctxt: &mut ReadCtxt<'a>) -> Result<Self, ParseError> {
        let scope = ctxt.scope();
        let feature_count = usize::from(ctxt.read_u16be()?);
        let feature_records = ctxt
            .read_array_dep::<FeatureRecord>(feature_count, scope)?
            .read_to_vec()?;
        Ok(FeatureList { feature_records })
    }
}

impl ReadBinaryDep for FeatureRecord {
    type Args<'a> = ReadScope<'a>;
    type HostType<'a> = FeatureRecord;

    fn read_dep<'a>(ctxt: &mut ReadCtxt<'a>, scope: Self::Args<'a>) -> Result<Self, ParseError> {
        let feature_tag = ctxt.read_u32be()?;
        let feature_offset = ctxt.read_u16be()?;
        let mut feature = scope.offset(usize::from(feature_offset)).ctxt();
        let _feature_params = feature.read_u16be()?;
        let lookup_index_count = usize::from(feature.read_u16be()?);
        let lookup_indices = feature.read_array::<U16Be>(lookup_index_count)?.to_vec();
        Ok(FeatureRecord {
            feature_tag,
            lookup_indices,
        })
    }
}

impl ReadFixedSizeDep for FeatureRecord {
    fn size(_scope: Self::Args<'_>) -> usize {
        size::U32 + size::U16
    }
}

impl ReadBinary for LookupList {
    type HostType<'a> = Self;

    fn read<'a>(ctxt: &mut ReadCtxt<'a>) -> Result<Self, ParseError> {
        let scope = ctxt.scope();
        let lookup_count = usize::from(ctxt.read_u16be()?);
        let lookup_offsets = ctxt.read_array::<U16Be>(lookup_count)?;
        let lookups = lookup_offsets
            .iter()
            .map(|offset| scope.offset(usize::from(offset)).read::<Lookup>())
            .collect::<Result<Vec<_>, _>>()?;
        Ok(LookupList { lookups })
    }
}

impl ReadBinary for Lookup {
    type HostType<'a> = Self;

    fn read<'a>(ctxt: &mut ReadCtxt<'a>) -> Result<Self, ParseError> {
        let scope = ctxt.scope();
        let lookup_type = ctxt.read_u16be()?;
        let lookup_flag = ctxt.read_u16be()?;
        let subtable_count = usize::from(ctxt.read_u16be()?);
        let subtable_offsets = ctxt.read_array::<U16Be>(subtable_count)?;
        let subtables = read_subtables(&scope, lookup_type, &subtable_offsets);
        Ok(Lookup {
            lookup_type,
            lookup_flag,
            subtables,
        })
    }
}

/// Read the subtables of a lookup. Malformed subtables are skipped with a warning.
fn read_subtables(
    scope: &ReadScope<'_>,
    lookup_type: u16,
    offsets: &ReadArray<'_, U16Be>,
) -> Vec<SubstSubtable> {
    offsets
        .iter()
        .filter_map(|offset| {
            let subtable = scope.offset(usize::from(offset));
            match read_subtable(subtable, lookup_type) {
                Ok(subtable) => Some(subtable),
                Err(err) => {
                    warn!("skipping malformed GSUB subtable (type {}): {}", lookup_type, err);
                    None
                }
            }
        })
        .collect()
}

fn read_subtable(scope: ReadScope<'_>, lookup_type: u16) -> Result<SubstSubtable, ParseError> {
    match lookup_type {
        SINGLE_SUBST => scope.read::<SingleSubst>().map(SubstSubtable::Single),
        ALTERNATE_SUBST => scope.read::<AlternateSubst>().map(SubstSubtable::Alternate),
        EXTENSION_SUBST => {
            let mut ctxt = scope.ctxt();
            match ctxt.read_u16be()? {
                1 => {
                    let extension_lookup_type = ctxt.read_u16be()?;
                    let extension_offset = usize::try_from(ctxt.read_u32be()?)?;
                    ctxt.check(extension_lookup_type != EXTENSION_SUBST)?;
                    read_subtable(scope.offset(extension_offset), extension_lookup_type)
                }
                _ => Err(ParseError::BadVersion),
            }
        }
        _ => Ok(SubstSubtable::Other),
    }
}

impl SubstSubtable {
    /// The statically resolvable `(glyph, replacement)` pairs of this subtable.
    ///
    /// Alternate sets contribute their first alternate.
    pub fn pairs(&self) -> Vec<(u16, u16)> {
        match self {
            SubstSubtable::Single(single) => single.pairs(),
            SubstSubtable::Alternate(alternate) => alternate.pairs(),
            SubstSubtable::Other => Vec::new(),
        }
    }
}

impl Lookup {
    /// The pairs of every subtable in this lookup, in subtable order.
    pub fn pairs(&self) -> Vec<(u16, u16)> {
        self.subtables
            .iter()
            .flat_map(SubstSubtable::pairs)
            .collect()
    }
}

impl ReadBinary for SingleSubst {
    type HostType<'a> = Self;

    fn read<'a>(ctxt: &mut ReadCtxt<'a>) -> Result<Self, ParseError> {
        let subtable = ctxt.scope();
        match ctxt.read_u16be()? {
            1 => {
                let coverage_offset = usize::from(ctxt.read_u16be()?);
                let coverage = subtable.offset(coverage_offset).read::<Coverage>()?;
                let delta_glyph_index = ctxt.read_i16be()?;
                Ok(SingleSubst::Format1 {
                    coverage,
                    delta_glyph_index,
                })
            }
            2 => {
                let coverage_offset = usize::from(ctxt.read_u16be()?);
                let coverage = subtable.offset(coverage_offset).read::<Coverage>()?;
                let glyph_count = ctxt.read_u16be()?;
                let substitute_glyph_array =
                    ctxt.read_array::<U16Be>(usize::from(glyph_count))?.to_vec();
                Ok(SingleSubst::Format2 {
                    coverage,
                    substitute_glyph_array,
                })
            }
            _ => Err(ParseError::BadVersion),
        }
    }
}

impl SingleSubst {
    pub fn pairs(&self) -> Vec<(u16, u16)> {
        match self {
            SingleSubst::Format1 {
                coverage,
                delta_glyph_index,
            } => coverage
                .glyphs()
                .into_iter()
                .map(|glyph| {
                    // Addition of deltaGlyphID is modulo 65536.
                    (glyph, glyph.wrapping_add(*delta_glyph_index as u16))
                })
                .collect(),
            SingleSubst::Format2 {
                coverage,
                substitute_glyph_array,
            } => coverage
                .glyphs()
                .into_iter()
                .zip(substitute_glyph_array.iter().copied())
                .collect(),
        }
    }
}

impl ReadBinary for AlternateSubst {
    type HostType<'a> = Self;

    fn read<'a>(ctxt: &mut ReadCtxt<'a>) -> Result<Self, ParseError> {
        let scope = ctxt.scope();
        match ctxt.read_u16be()? {
            1 => {
                let coverage_offset = usize::from(ctxt.read_u16be()?);
                let coverage = scope.offset(coverage_offset).read::<Coverage>()?;
                let alternateset_count = usize::from(ctxt.read_u16be()?);
                let alternateset_offsets = ctxt.read_array::<U16Be>(alternateset_count)?;
                let alternatesets = alternateset_offsets
                    .iter()
                    .map(|offset| scope.offset(usize::from(offset)).read::<AlternateSet>())
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(AlternateSubst {
                    coverage,
                    alternatesets,
                })
            }
            _ => Err(ParseError::BadVersion),
        }
    }
}

impl AlternateSubst {
    pub fn pairs(&self) -> Vec<(u16, u16)> {
        self.coverage
            .glyphs()
            .into_iter()
            .zip(&self.alternatesets)
            .filter_map(|(glyph, set)| {
                set.alternate_glyphs
                    .first()
                    .map(|&alternate| (glyph, alternate))
            })
            .collect()
    }
}

impl ReadBinary for AlternateSet {
    type HostType<'a> = Self;

    fn read<'a>(ctxt: &mut ReadCtxt<'a>) -> Result<Self, ParseError> {
        let glyph_count = usize::from(ctxt.read_u16be()?);
        ctxt.check(glyph_count > 0)?;
        let alternate_glyphs = ctxt.read_array::<U16Be>(glyph_count)?.to_vec();
        Ok(AlternateSet { alternate_glyphs })
    }
}

impl ReadFrom for CoverageRangeRecord {
    type ReadType = (U16Be, U16Be, U16Be);
    fn read_from((start_glyph, end_glyph, start_coverage_index): (u16, u16, u16)) -> Self {
        CoverageRangeRecord {
            start_glyph,
            end_glyph,
            start_coverage_index,
        }
    }
}

impl ReadBinary for Coverage {
    type HostType<'a> = Self;

    fn read<'a>(ctxt: &mut ReadCtxt<'a>) -> Result<Self, ParseError> {
        match ctxt.read_u16be()? {
            1 => {
                let glyph_count = ctxt.read_u16be()?;
                let glyph_array = ctxt.read_array::<U16Be>(usize::from(glyph_count))?;
                Ok(Coverage::Format1 {
                    glyph_array: glyph_array.to_vec(),
                })
            }
            2 => {
                let coverage_range_count = ctxt.read_u16be()?;
                let coverage_range_array =
                    ctxt.read_array::<CoverageRangeRecord>(usize::from(coverage_range_count))?;
                let coverage_range_vec = coverage_range_array.to_vec();
                for coverage_range_record in &coverage_range_vec {
                    ctxt.check(
                        coverage_range_record.start_glyph <= coverage_range_record.end_glyph,
                    )?
                }
                Ok(Coverage::Format2 {
                    coverage_range_array: coverage_range_vec,
                })
            }
            _ => Err(ParseError::BadVersion),
        }
    }
}

impl Coverage {
    /// The covered glyphs in coverage index order.
    pub fn glyphs(&self) -> Vec<u16> {
        match self {
            Coverage::Format1 { glyph_array } => glyph_array.clone(),
            Coverage::Format2 {
                coverage_range_array,
            } => {
                let mut ranges = coverage_range_array.clone();
                ranges.sort_by_key(|record| record.start_coverage_index);
                ranges
                    .iter()
                    .flat_map(|record| record.start_glyph..=record.end_glyph)
                    .collect()
            }
        }
    }
}

impl std::fmt::Debug for FeatureRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FeatureRecord")
            .field("feature_tag", &DisplayTag(self.feature_tag))
            .field("lookup_indices", &self.lookup_indices)
            .finish()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::tag;
    use crate::tests::writer::{self, TtfType::*};

    /// A GSUB table with one `ss01` feature over a single substitution lookup (3 -> 7) and one
    /// `salt` feature over an alternate lookup (4 -> [9, 10]) wrapped in an extension.
    pub(crate) fn gsub_table() -> Vec<u8> {
        writer::convert(&[
            // header
            UInt16(1),
            UInt16(0),
            UInt16(0),  // script list
            UInt16(10), // feature list
            UInt16(38), // lookup list
            // feature list @10
            UInt16(2),
            UInt32(tag::SS01),
            UInt16(14),
            UInt32(u32::from_be_bytes(*b"salt")),
            UInt16(20),
            // feature @24 (10 + 14)
            UInt16(0),
            UInt16(1),
            UInt16(0),
            // feature @30 (10 + 20)
            UInt16(0),
            UInt16(1),
            UInt16(1),
            Raw(&[0, 0]), // padding to @38
            // lookup list @38
            UInt16(2),
            UInt16(6),
            UInt16(28),
            // lookup 0 @44: single subst
            UInt16(1),
            UInt16(0),
            UInt16(1),
            UInt16(8),
            // single subst format 2 @52
            UInt16(2),
            UInt16(8),
            UInt16(1),
            UInt16(7),
            // coverage @60
            UInt16(1),
            UInt16(1),
            UInt16(3),
            // lookup 1 @66: extension
            UInt16(7),
            UInt16(0),
            UInt16(1),
            UInt16(8),
            // extension @74
            UInt16(1),
            UInt16(3),
            UInt32(8),
            // alternate subst @82
            UInt16(1),
            UInt16(8),
            UInt16(1),
            UInt16(14),
            // coverage @90
            UInt16(1),
            UInt16(1),
            UInt16(4),
            // alternate set @96
            UInt16(2),
            UInt16(9),
            UInt16(10),
        ])
    }

    #[test]
    fn test_read_gsub() {
        let data = gsub_table();
        let gsub = ReadScope::new(&data).read::<LayoutTable>().unwrap();
        assert_eq!(gsub.feature_tags(), vec![tag::SS01, tag::from_string("salt").unwrap()]);
        assert_eq!(gsub.lookup_feature_tags(1), vec![tag::from_string("salt").unwrap()]);
        assert_eq!(gsub.lookups_for_tag(tag::SS01), vec![0]);
        assert_eq!(gsub.lookup_list.lookups[0].pairs(), vec![(3, 7)]);
        assert_eq!(gsub.lookup_list.lookups[1].pairs(), vec![(4, 9)]);
    }

    #[test]
    fn test_coverage_format2_glyphs() {
        let data = writer::convert(&[
            UInt16(2),
            UInt16(2),
            UInt16(20),
            UInt16(21),
            UInt16(2),
            UInt16(5),
            UInt16(6),
            UInt16(0),
        ]);
        let coverage = ReadScope::new(&data).read::<Coverage>().unwrap();
        assert_eq!(coverage.glyphs(), vec![5, 6, 20, 21]);
    }
}
