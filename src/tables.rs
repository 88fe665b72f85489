//! OpenType font table parsing.
//!
//! Only the tables the merge engine reads are parsed here: the offset table, `head`, `hhea`,
//! `hmtx` and `maxp`. Larger tables live in the submodules.

pub mod cmap;
pub mod glyf;
pub mod kern;
pub mod loca;

use crate::binary::read::{
    CheckIndex, ReadArray, ReadBinary, ReadBinaryDep, ReadCtxt, ReadFrom, ReadScope,
};
use crate::binary::{I16Be, U16Be, U32Be};
use crate::error::ParseError;
use crate::size;
use crate::tag;

/// Magic value identifying a CFF font (`OTTO`)
pub const CFF_MAGIC: u32 = tag::OTTO;

/// Magic number identifying TrueType 1.0
///
/// The version number 1.0 as a 16.16 fixed-point value, indicating TrueType glyph data.
pub const TTF_MAGIC: u32 = 0x00010000;

/// Magic value identifying a TrueType font collection `ttcf`
pub const TTCF_MAGIC: u32 = tag::TTCF;

/// Access to the raw data of the tables of a single font.
pub trait FontTableProvider<'a> {
    /// Return data for the specified table if present
    fn table_data(&self, tag: u32) -> Result<Option<&'a [u8]>, ParseError>;

    fn has_table(&self, tag: u32) -> bool;

    fn read_table_data(&self, tag: u32) -> Result<&'a [u8], ParseError> {
        self.table_data(tag)?.ok_or(ParseError::MissingTable(tag))
    }
}

/// The F2DOT14 format consists of a signed, 2’s complement integer and an unsigned fraction.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct F2Dot14(u16);

/// The size of the offsets in the `loca` table
///
/// <https://docs.microsoft.com/en-us/typography/opentype/spec/loca>
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum IndexToLocFormat {
    /// Offsets are 16-bit. The actual local offset divided by 2 is stored.
    Short,
    /// Offsets are 32-bit. The actual local offset is stored.
    Long,
}

pub struct OpenTypeFont<'a> {
    pub scope: ReadScope<'a>,
    pub data: OpenTypeData<'a>,
}

/// An OpenTypeFont containing a single font or a collection of fonts
pub enum OpenTypeData<'a> {
    Single(OffsetTable<'a>),
    Collection(ReadArray<'a, U32Be>),
}

/// OpenType Offset Table
///
/// <https://docs.microsoft.com/en-us/typography/opentype/spec/otff#organization-of-an-opentype-font>
#[derive(Clone)]
pub struct OffsetTable<'a> {
    pub sfnt_version: u32,
    pub table_records: ReadArray<'a, TableRecord>,
}

pub struct OffsetTableFontProvider<'a> {
    scope: ReadScope<'a>,
    offset_table: OffsetTable<'a>,
}

/// An entry in the Offset Table
#[derive(Debug, Copy, Clone, PartialEq, PartialOrd, Hash)]
pub struct TableRecord {
    pub table_tag: u32,
    pub checksum: u32,
    pub offset: u32,
    pub length: u32,
}

/// The fields of the `head` table the merge engine needs.
///
/// <https://docs.microsoft.com/en-us/typography/opentype/spec/head>
#[derive(Debug, Clone, PartialEq)]
pub struct HeadTable {
    pub units_per_em: u16,
    pub index_to_loc_format: IndexToLocFormat,
}

/// `hhea` horizontal header table
#[derive(Debug, Clone, PartialEq)]
pub struct HheaTable {
    pub ascender: i16,
    pub descender: i16,
    pub line_gap: i16,
    pub num_h_metrics: u16,
}

/// `hmtx` horizontal metrics table
#[derive(Debug)]
pub struct HmtxTable<'a> {
    pub h_metrics: ReadArray<'a, LongHorMetric>,
    pub left_side_bearings: ReadArray<'a, I16Be>,
}

/// A `longHorMetric` record in the `hmtx` table.
#[derive(Debug, PartialEq, Copy, Clone)]
pub struct LongHorMetric {
    pub advance_width: u16,
    pub lsb: i16,
}

/// `maxp` maximum profile. Only the glyph count is retained.
#[derive(Debug, Clone, PartialEq)]
pub struct MaxpTable {
    pub num_glyphs: u16,
}

impl<'a> OpenTypeFont<'a> {
    pub fn table_provider(&self, index: usize) -> Result<OffsetTableFontProvider<'a>, ParseError> {
        match &self.data {
            OpenTypeData::Single(offset_table) => Ok(OffsetTableFontProvider {
                offset_table: offset_table.clone(),
                scope: self.scope,
            }),
            OpenTypeData::Collection(offset_tables) => {
                offset_tables.check_index(index)?;
                let offset = usize::try_from(offset_tables.read_item(index)?)?;
                let offset_table = self.scope.offset(offset).read::<OffsetTable<'_>>()?;
                Ok(OffsetTableFontProvider {
                    offset_table,
                    scope: self.scope,
                })
            }
        }
    }
}

impl ReadBinary for OpenTypeFont<'_> {
    type HostType<'a> = OpenTypeFont<'a>;

    fn read<'a>(ctxt: &mut ReadCtxt<'a>) -> Result<Self::HostType<'a>, ParseError> {
        let scope = ctxt.scope();
        let mut peek = ctxt.clone();
        let magic = peek.read_u32be()?;
        match magic {
            TTF_MAGIC | CFF_MAGIC => {
                let offset_table = ctxt.read::<OffsetTable<'_>>()?;
                Ok(OpenTypeFont {
                    scope,
                    data: OpenTypeData::Single(offset_table),
                })
            }
            TTCF_MAGIC => {
                let _ttc_tag = ctxt.read_u32be()?;
                let major_version = ctxt.read_u16be()?;
                let _minor_version = ctxt.read_u16be()?;
                ctxt.check(major_version == 1 || major_version == 2)?;
                let num_fonts = usize::try_from(ctxt.read_u32be()?)?;
                let offset_tables = ctxt.read_array::<U32Be>(num_fonts)?;
                Ok(OpenTypeFont {
                    scope,
                    data: OpenTypeData::Collection(offset_tables),
                })
            }
            _ => Err(ParseError::BadVersion),
        }
    }
}

impl ReadBinary for OffsetTable<'_> {
    type HostType<'a> = OffsetTable<'a>;

    fn read<'a>(ctxt: &mut ReadCtxt<'a>) -> Result<Self::HostType<'a>, ParseError> {
        let sfnt_version = ctxt.read_u32be()?;
        match sfnt_version {
            TTF_MAGIC | CFF_MAGIC => {
                let num_tables = ctxt.read_u16be()?;
                let _search_range = ctxt.read_u16be()?;
                let _entry_selector = ctxt.read_u16be()?;
                let _range_shift = ctxt.read_u16be()?;
                let table_records = ctxt.read_array::<TableRecord>(usize::from(num_tables))?;
                Ok(OffsetTable {
                    sfnt_version,
                    table_records,
                })
            }
            _ => Err(ParseError::BadVersion),
        }
    }
}

impl<'a> FontTableProvider<'a> for OffsetTableFontProvider<'a> {
    fn table_data(&self, tag: u32) -> Result<Option<&'a [u8]>, ParseError> {
        self.offset_table
            .read_table(&self.scope, tag)
            .map(|scope| scope.map(|scope| scope.data()))
    }

    fn has_table(&self, tag: u32) -> bool {
        self.offset_table.find_table_record(tag).is_some()
    }
}

impl<'a> OffsetTableFontProvider<'a> {
    /// Whether the glyph outlines are stored in a `CFF ` table.
    pub fn is_cff(&self) -> bool {
        self.offset_table.sfnt_version == CFF_MAGIC || self.has_table(tag::CFF)
    }
}

impl ReadFrom for TableRecord {
    type ReadType = ((U32Be, U32Be), (U32Be, U32Be));

    fn read_from(((table_tag, checksum), (offset, length)): ((u32, u32), (u32, u32))) -> Self {
        TableRecord {
            table_tag,
            checksum,
            offset,
            length,
        }
    }
}

impl<'a> OffsetTable<'a> {
    pub fn find_table_record(&self, tag: u32) -> Option<TableRecord> {
        self.table_records
            .iter()
            .find(|table_record| table_record.table_tag == tag)
    }

    pub fn read_table(
        &self,
        scope: &ReadScope<'a>,
        tag: u32,
    ) -> Result<Option<ReadScope<'a>>, ParseError> {
        match self.find_table_record(tag) {
            Some(table_record) => table_record.read_table(scope).map(Some),
            None => Ok(None),
        }
    }
}

impl TableRecord {
    pub const SIZE: usize = 4 * size::U32;

    pub fn read_table<'a>(&self, scope: &ReadScope<'a>) -> Result<ReadScope<'a>, ParseError> {
        let offset = usize::try_from(self.offset)?;
        let length = usize::try_from(self.length)?;
        scope.offset_length(offset, length)
    }
}

impl ReadBinary for HeadTable {
    type HostType<'a> = Self;

    fn read<'a>(ctxt: &mut ReadCtxt<'a>) -> Result<Self, ParseError> {
        let major_version = ctxt.read_u16be()?;
        ctxt.check_version(major_version == 1)?;
        let _minor_version = ctxt.read_u16be()?;
        let _font_revision = ctxt.read_u32be()?;
        let _check_sum_adjustment = ctxt.read_u32be()?;
        let magic_number = ctxt.read_u32be()?;
        ctxt.check(magic_number == 0x5F0F3CF5)?;
        let _flags = ctxt.read_u16be()?;
        let units_per_em = ctxt.read_u16be()?;
        // created, modified, bounding box, mac_style, lowest_rec_ppem, font_direction_hint
        let _ = ctxt.read_slice(8 + 8 + 4 * 2 + 2 + 2 + 2)?;
        let index_to_loc_format = ctxt.read::<IndexToLocFormat>()?;
        let _glyph_data_format = ctxt.read_i16be()?;

        Ok(HeadTable {
            units_per_em,
            index_to_loc_format,
        })
    }
}

impl ReadFrom for IndexToLocFormat {
    type ReadType = I16Be;

    fn read_from(index_to_loc_format: i16) -> Self {
        match index_to_loc_format {
            0 => IndexToLocFormat::Short,
            _ => IndexToLocFormat::Long,
        }
    }
}

impl ReadBinary for HheaTable {
    type HostType<'a> = Self;

    fn read<'a>(ctxt: &mut ReadCtxt<'a>) -> Result<Self, ParseError> {
        let major_version = ctxt.read_u16be()?;
        let _minor_version = ctxt.read_u16be()?;
        ctxt.check(major_version == 1)?;
        let ascender = ctxt.read_i16be()?;
        let descender = ctxt.read_i16be()?;
        let line_gap = ctxt.read_i16be()?;
        // advance_width_max through the reserved fields
        let _ = ctxt.read_slice(2 * 11)?;
        let metric_data_format = ctxt.read_i16be()?;
        ctxt.check(metric_data_format == 0)?;
        let num_h_metrics = ctxt.read_u16be()?;

        Ok(HheaTable {
            ascender,
            descender,
            line_gap,
            num_h_metrics,
        })
    }
}

impl ReadBinaryDep for HmtxTable<'_> {
    type Args<'a> = (usize, usize); // num_glyphs, num_h_metrics
    type HostType<'a> = HmtxTable<'a>;

    fn read_dep<'a>(
        ctxt: &mut ReadCtxt<'a>,
        (num_glyphs, num_h_metrics): (usize, usize),
    ) -> Result<Self::HostType<'a>, ParseError> {
        let h_metrics = ctxt.read_array::<LongHorMetric>(num_h_metrics)?;
        let left_side_bearings =
            ctxt.read_array::<I16Be>(num_glyphs.saturating_sub(num_h_metrics))?;
        Ok(HmtxTable {
            h_metrics,
            left_side_bearings,
        })
    }
}

impl HmtxTable<'_> {
    pub fn horizontal_advance(&self, glyph_id: u16) -> Result<u16, ParseError> {
        // As an optimization, the number of records can be less than the number of glyphs, in
        // which case the advance width value of the last record applies to all remaining glyph
        // IDs.
        let num_h_metrics = self.h_metrics.len();
        let last = num_h_metrics.checked_sub(1).ok_or(ParseError::BadIndex)?;
        let index = usize::from(glyph_id).min(last);
        self.h_metrics
            .read_item(index)
            .map(|long_hor_metric| long_hor_metric.advance_width)
    }
}

impl ReadFrom for LongHorMetric {
    type ReadType = (U16Be, I16Be);

    fn read_from((advance_width, lsb): (u16, i16)) -> Self {
        LongHorMetric { advance_width, lsb }
    }
}

impl ReadBinary for MaxpTable {
    type HostType<'a> = Self;

    fn read<'a>(ctxt: &mut ReadCtxt<'a>) -> Result<Self, ParseError> {
        let version = ctxt.read_u32be()?;
        ctxt.check_version(version == 0x00005000 || version == 0x00010000)?;
        let num_glyphs = ctxt.read_u16be()?;
        Ok(MaxpTable { num_glyphs })
    }
}

impl ReadFrom for F2Dot14 {
    type ReadType = U16Be;

    fn read_from(value: u16) -> Self {
        F2Dot14(value)
    }
}

impl From<F2Dot14> for f64 {
    fn from(value: F2Dot14) -> Self {
        f64::from(value.0 as i16) / 16384.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::writer::{self, TtfType::*};

    #[test]
    fn test_f2dot14() {
        assert_eq!(f64::from(F2Dot14(0x4000)), 1.0);
        assert_eq!(f64::from(F2Dot14(0xC000)), -1.0);
        assert_eq!(f64::from(F2Dot14(0x2000)), 0.5);
    }

    #[test]
    fn test_horizontal_advance_repeats_last_metric() {
        let data = writer::convert(&[UInt16(500), Int16(10), UInt16(600), Int16(20), Int16(30)]);
        let hmtx = ReadScope::new(&data)
            .read_dep::<HmtxTable<'_>>((3, 2))
            .unwrap();
        assert_eq!(hmtx.horizontal_advance(0).unwrap(), 500);
        assert_eq!(hmtx.horizontal_advance(1).unwrap(), 600);
        assert_eq!(hmtx.horizontal_advance(2).unwrap(), 600);
    }

    #[test]
    fn test_read_maxp() {
        let data = writer::convert(&[UInt32(0x00005000), UInt16(42)]);
        let maxp = ReadScope::new(&data).read::<MaxpTable>().unwrap();
        assert_eq!(maxp.num_glyphs, 42);
    }
}
