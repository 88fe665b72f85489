//! `cmap` character to glyph mapping.
//!
//! <https://learn.microsoft.com/en-us/typography/opentype/spec/cmap>

use log::warn;

use crate::binary::read::{ReadArray, ReadBinary, ReadCtxt, ReadFrom, ReadScope};
use crate::binary::{I16Be, U16Be, U32Be, U8};
use crate::error::ParseError;
use crate::size;

/// Upper bound on the number of code points a single format 12 group may span.
const MAX_GROUP_SPAN: u32 = 0x11_0000;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct PlatformId(pub u16);

impl PlatformId {
    pub const UNICODE: PlatformId = PlatformId(0);
    pub const MACINTOSH: PlatformId = PlatformId(1);
    pub const WINDOWS: PlatformId = PlatformId(3);
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct EncodingId(pub u16);

impl EncodingId {
    pub const WINDOWS_SYMBOL: EncodingId = EncodingId(0);
    pub const WINDOWS_UNICODE_BMP_UCS2: EncodingId = EncodingId(1);
    pub const WINDOWS_UNICODE_UCS4: EncodingId = EncodingId(10);

    pub const MACINTOSH_APPLE_ROMAN: EncodingId = EncodingId(0);

    pub const UNICODE_FULL: EncodingId = EncodingId(4);
}

pub struct Cmap<'a> {
    pub scope: ReadScope<'a>,
    encoding_records: ReadArray<'a, EncodingRecord>,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct EncodingRecord {
    pub platform_id: u16,
    pub encoding_id: u16,
    pub offset: u32,
}

pub enum CmapSubtable<'a> {
    Format0 {
        glyph_id_array: ReadArray<'a, U8>,
    },
    Format4 {
        end_codes: ReadArray<'a, U16Be>,
        start_codes: ReadArray<'a, U16Be>,
        id_deltas: ReadArray<'a, I16Be>,
        id_range_offsets: ReadArray<'a, U16Be>,
        glyph_id_array: ReadArray<'a, U16Be>,
    },
    Format6 {
        first_code: u16,
        glyph_id_array: ReadArray<'a, U16Be>,
    },
    Format10 {
        start_char_code: u32,
        glyph_id_array: ReadArray<'a, U16Be>,
    },
    Format12 {
        groups: ReadArray<'a, SequentialMapGroup>,
    },
}

pub struct SequentialMapGroup {
    start_char_code: u32,
    end_char_code: u32,
    start_glyph_id: u32,
}

/// How the code points of a subtable should be interpreted.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum CmapEncoding {
    Unicode,
    Symbol,
    AppleRoman,
}

impl ReadBinary for Cmap<'_> {
    type HostType<'a> = Cmap<'a>;

    fn read<'a>(ctxt: &mut ReadCtxt<'a>) -> Result<Self::HostType<'a>, ParseError> {
        let scope = ctxt.scope();
        let version = ctxt.read_u16be()?;
        ctxt.check(version == 0)?;
        let num_tables = usize::from(ctxt.read_u16be()?);
        let encoding_records = ctxt.read_array::<EncodingRecord>(num_tables)?;
        Ok(Cmap {
            scope,
            encoding_records,
        })
    }
}

impl ReadFrom for EncodingRecord {
    type ReadType = (U16Be, U16Be, U32Be);

    fn read_from((platform_id, encoding_id, offset): (u16, u16, u32)) -> Self {
        EncodingRecord {
            platform_id,
            encoding_id,
            offset,
        }
    }
}

impl ReadFrom for SequentialMapGroup {
    type ReadType = (U32Be, U32Be, U32Be);

    fn read_from((start_char_code, end_char_code, start_glyph_id): (u32, u32, u32)) -> Self {
        SequentialMapGroup {
            start_char_code,
            end_char_code,
            start_glyph_id,
        }
    }
}

impl ReadBinary for CmapSubtable<'_> {
    type HostType<'a> = CmapSubtable<'a>;

    fn read<'a>(ctxt: &mut ReadCtxt<'a>) -> Result<Self::HostType<'a>, ParseError> {
        let subtable_format = ctxt.read_u16be()?;
        match subtable_format {
            0 => {
                let length = usize::from(ctxt.read_u16be()?);
                ctxt.check(length >= 3 * size::U16 + 256)?;
                let _language = ctxt.read_u16be()?;
                let glyph_id_array = ctxt.read_array::<U8>(256)?;
                Ok(CmapSubtable::Format0 { glyph_id_array })
            }
            4 => {
                let length = usize::from(ctxt.read_u16be()?);
                let _language = ctxt.read_u16be()?;
                let seg_count_x2 = usize::from(ctxt.read_u16be()?);
                ctxt.check((seg_count_x2 & 1) == 0)?;
                let seg_count = seg_count_x2 >> 1;
                let _search_range = ctxt.read_u16be()?;
                let _entry_selector = ctxt.read_u16be()?;
                let _range_shift = ctxt.read_u16be()?;
                let end_codes = ctxt.read_array::<U16Be>(seg_count)?;
                let _reserved_pad = ctxt.read_u16be()?;
                let start_codes = ctxt.read_array::<U16Be>(seg_count)?;
                let id_deltas = ctxt.read_array::<I16Be>(seg_count)?;
                let id_range_offsets = ctxt.read_array::<U16Be>(seg_count)?;
                let header_len = (8 + (4 * seg_count)) * size::U16;
                // Some fonts under-report the length, so read whatever glyph ids are present.
                let remaining = length.saturating_sub(header_len);
                let num_indices = remaining >> 1;
                let glyph_id_array = match ctxt.clone().read_array::<U16Be>(num_indices) {
                    Ok(array) => array,
                    Err(_) => ReadArray::empty(),
                };
                Ok(CmapSubtable::Format4 {
                    end_codes,
                    start_codes,
                    id_deltas,
                    id_range_offsets,
                    glyph_id_array,
                })
            }
            6 => {
                let _length = ctxt.read_u16be()?;
                let _language = ctxt.read_u16be()?;
                let first_code = ctxt.read_u16be()?;
                let entry_count = usize::from(ctxt.read_u16be()?);
                let glyph_id_array = ctxt.read_array::<U16Be>(entry_count)?;
                Ok(CmapSubtable::Format6 {
                    first_code,
                    glyph_id_array,
                })
            }
            10 => {
                let reserved = ctxt.read_u16be()?;
                ctxt.check(reserved == 0)?;
                let _length = ctxt.read_u32be()?;
                let _language = ctxt.read_u32be()?;
                let start_char_code = ctxt.read_u32be()?;
                let num_chars = usize::try_from(ctxt.read_u32be()?)?;
                let glyph_id_array = ctxt.read_array::<U16Be>(num_chars)?;
                Ok(CmapSubtable::Format10 {
                    start_char_code,
                    glyph_id_array,
                })
            }
            12 => {
                let reserved = ctxt.read_u16be()?;
                ctxt.check(reserved == 0)?;
                let _length = ctxt.read_u32be()?;
                let _language = ctxt.read_u32be()?;
                let num_groups = usize::try_from(ctxt.read_u32be()?)?;
                let groups = ctxt.read_array::<SequentialMapGroup>(num_groups)?;
                Ok(CmapSubtable::Format12 { groups })
            }
            _ => Err(ParseError::NotImplemented),
        }
    }
}

impl<'a> Cmap<'a> {
    /// Find the first encoding record for the given `platform_id` and `encoding_id`
    pub fn find_subtable(
        &self,
        platform_id: PlatformId,
        encoding_id: EncodingId,
    ) -> Option<EncodingRecord> {
        self.encoding_records.iter().find(|record| {
            record.platform_id == platform_id.0 && record.encoding_id == encoding_id.0
        })
    }

    /// Find the first encoding record for the given `platform_id`
    pub fn find_subtable_for_platform(&self, platform_id: PlatformId) -> Option<EncodingRecord> {
        self.encoding_records
            .iter()
            .find(|record| record.platform_id == platform_id.0)
    }

    /// Pick the subtable that best describes the font's Unicode coverage.
    ///
    /// Preference is Windows UCS-4, Windows BMP, Unicode full repertoire, any other Unicode
    /// platform subtable, Windows symbol, and finally Mac Roman. Subtables in formats this
    /// module does not read are passed over.
    pub fn best_subtable(&self) -> Option<(CmapEncoding, CmapSubtable<'a>)> {
        let candidates = [
            (
                self.find_subtable(PlatformId::WINDOWS, EncodingId::WINDOWS_UNICODE_UCS4),
                CmapEncoding::Unicode,
            ),
            (
                self.find_subtable(PlatformId::WINDOWS, EncodingId::WINDOWS_UNICODE_BMP_UCS2),
                CmapEncoding::Unicode,
            ),
            (
                self.find_subtable(PlatformId::UNICODE, EncodingId::UNICODE_FULL),
                CmapEncoding::Unicode,
            ),
            (
                self.find_subtable_for_platform(PlatformId::UNICODE),
                CmapEncoding::Unicode,
            ),
            (
                self.find_subtable(PlatformId::WINDOWS, EncodingId::WINDOWS_SYMBOL),
                CmapEncoding::Symbol,
            ),
            (
                self.find_subtable(PlatformId::MACINTOSH, EncodingId::MACINTOSH_APPLE_ROMAN),
                CmapEncoding::AppleRoman,
            ),
        ];

        candidates
            .into_iter()
            .filter_map(|(record, encoding)| record.map(|record| (record, encoding)))
            .find_map(|(record, encoding)| {
                let offset = usize::try_from(record.offset).ok()?;
                match self.scope.offset(offset).read::<CmapSubtable<'_>>() {
                    Ok(subtable) => Some((encoding, subtable)),
                    Err(err) => {
                        warn!(
                            "skipping cmap subtable ({}, {}): {}",
                            record.platform_id, record.encoding_id, err
                        );
                        None
                    }
                }
            })
    }
}

impl CmapSubtable<'_> {
    /// Every `(character code, glyph id)` pair this subtable maps, skipping `.notdef`.
    ///
    /// Pairs are produced in subtable order, which is ascending character code for well formed
    /// fonts.
    pub fn mappings(&self) -> Result<Vec<(u32, u16)>, ParseError> {
        let mut out = Vec::new();
        match self {
            CmapSubtable::Format0 { glyph_id_array } => {
                for (ch, glyph_id) in glyph_id_array.iter().enumerate() {
                    push_mapping(&mut out, u32::try_from(ch)?, u16::from(glyph_id));
                }
            }
            CmapSubtable::Format4 {
                end_codes,
                start_codes,
                id_deltas,
                id_range_offsets,
                glyph_id_array,
            } => {
                let seg_count = end_codes.len();
                for i in 0..seg_count {
                    let (Some(start_code), Some(end_code), Some(id_delta), Some(id_range_offset)) = (
                        start_codes.get_item(i),
                        end_codes.get_item(i),
                        id_deltas.get_item(i),
                        id_range_offsets.get_item(i),
                    ) else {
                        return Err(ParseError::BadIndex);
                    };
                    if start_code > end_code || start_code == 0xFFFF {
                        continue;
                    }
                    let id_delta = i32::from(id_delta);
                    let id_range_offset = usize::from(id_range_offset);
                    for ch in start_code..=end_code {
                        let glyph_id = if id_range_offset == 0 {
                            ((i32::from(ch) + id_delta) as u32) & 0xFFFF
                        } else {
                            // The offset is relative to the id_range_offset entry itself.
                            let glyph_id_offset =
                                id_range_offset + i * 2 + usize::from(ch - start_code) * 2;
                            let index = (glyph_id_offset >> 1).checked_sub(seg_count);
                            match index.and_then(|index| glyph_id_array.get_item(index)) {
                                Some(0) | None => 0,
                                Some(glyph_id) => ((i32::from(glyph_id) + id_delta) as u32) & 0xFFFF,
                            }
                        };
                        push_mapping(&mut out, u32::from(ch), glyph_id as u16);
                    }
                }
            }
            CmapSubtable::Format6 {
                first_code,
                glyph_id_array,
            } => {
                for (i, glyph_id) in glyph_id_array.iter().enumerate() {
                    let ch = u32::from(*first_code) + u32::try_from(i)?;
                    push_mapping(&mut out, ch, glyph_id);
                }
            }
            CmapSubtable::Format10 {
                start_char_code,
                glyph_id_array,
            } => {
                for (i, glyph_id) in glyph_id_array.iter().enumerate() {
                    let ch = start_char_code
                        .checked_add(u32::try_from(i)?)
                        .ok_or(ParseError::BadValue)?;
                    push_mapping(&mut out, ch, glyph_id);
                }
            }
            CmapSubtable::Format12 { groups } => {
                for group in groups {
                    if group.end_char_code < group.start_char_code
                        || group.end_char_code - group.start_char_code >= MAX_GROUP_SPAN
                    {
                        return Err(ParseError::LimitExceeded);
                    }
                    for ch in group.start_char_code..=group.end_char_code {
                        let glyph_id = group.start_glyph_id + (ch - group.start_char_code);
                        push_mapping(&mut out, ch, u16::try_from(glyph_id)?);
                    }
                }
            }
        }
        Ok(out)
    }
}

fn push_mapping(out: &mut Vec<(u32, u16)>, ch: u32, glyph_id: u16) {
    if glyph_id != 0 {
        out.push((ch, glyph_id));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::writer::{self, TtfType::*};

    fn format4_table() -> Vec<u8> {
        // Two segments: 0x41..=0x43 via delta, then the terminating 0xFFFF segment.
        writer::convert(&[
            UInt16(4),
            UInt16(32), // length
            UInt16(0),  // language
            UInt16(4),  // seg_count_x2
            UInt16(4),
            UInt16(1),
            UInt16(0),
            UInt16(0x43), // end codes
            UInt16(0xFFFF),
            UInt16(0), // reserved pad
            UInt16(0x41), // start codes
            UInt16(0xFFFF),
            Int16(-0x40), // deltas
            Int16(1),
            UInt16(0), // range offsets
            UInt16(0),
        ])
    }

    #[test]
    fn test_format4_mappings() {
        let data = format4_table();
        let subtable = ReadScope::new(&data).read::<CmapSubtable<'_>>().unwrap();
        assert_eq!(
            subtable.mappings().unwrap(),
            vec![(0x41, 1), (0x42, 2), (0x43, 3)]
        );
    }

    #[test]
    fn test_format12_mappings() {
        let data = writer::convert(&[
            UInt16(12),
            UInt16(0),
            UInt32(28),
            UInt32(0),
            UInt32(1), // num groups
            UInt32(0x3042),
            UInt32(0x3044),
            UInt32(10),
        ]);
        let subtable = ReadScope::new(&data).read::<CmapSubtable<'_>>().unwrap();
        assert_eq!(
            subtable.mappings().unwrap(),
            vec![(0x3042, 10), (0x3043, 11), (0x3044, 12)]
        );
    }

    #[test]
    fn test_best_subtable_prefers_windows_bmp() {
        let subtable = format4_table();
        let mut data = writer::convert(&[
            UInt16(0), // version
            UInt16(2), // num tables
            UInt16(1), // Mac Roman first in the record list
            UInt16(0),
            UInt32(20),
            UInt16(3),
            UInt16(1),
            UInt32(20),
        ]);
        data.extend_from_slice(&subtable);
        let cmap = ReadScope::new(&data).read::<Cmap<'_>>().unwrap();
        let (encoding, _) = cmap.best_subtable().unwrap();
        assert_eq!(encoding, CmapEncoding::Unicode);
    }
}
