//! `kern` table parsing.
//!
//! Only the horizontal format 0 (pairs) subtables are read. These are what the font container
//! keeps as its kerning data so that combined-mode transforms can scale it.
//!
//! <https://learn.microsoft.com/en-us/typography/opentype/spec/kern>

use log::debug;

use crate::binary::read::{ReadArray, ReadBinary, ReadCtxt, ReadFrom, ReadScope};
use crate::binary::{I16Be, U16Be};
use crate::error::ParseError;

/// `kern` Kerning Table.
pub struct KernTable<'a> {
    /// Number of subtables in the kerning table.
    table_count: u16,
    data: &'a [u8],
}

/// Sub-table within `kern` table.
pub struct KernSubtable<'a> {
    coverage: u16,
    /// Format 0 pairs; `None` for any other format.
    pairs: Option<ReadArray<'a, KernPair>>,
}

/// Kerning value for glyph pair.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct KernPair {
    /// The glyph index for the left-hand glyph in the kerning pair.
    pub left: u16,
    /// The glyph index for the right-hand glyph in the kerning pair.
    pub right: u16,
    /// The kerning value for the above pair, in font design units.
    pub value: i16,
}

impl ReadBinary for KernTable<'_> {
    type HostType<'a> = KernTable<'a>;

    fn read<'a>(ctxt: &mut ReadCtxt<'a>) -> Result<Self::HostType<'a>, ParseError> {
        let version = ctxt.read_u16be()?;
        ctxt.check_version(version == 0)?;
        let table_count = ctxt.read_u16be()?;

        // Do a pass to validate that there is enough data present to read all the subtables,
        // and determine a length to read.
        let start = ctxt.scope();
        let mut len = 0;
        for _ in 0..table_count {
            let version = ctxt.read_u16be()?;
            ctxt.check_version(version == 0)?;
            let subtable_length = ctxt.read_u16be().map(usize::from)?;
            // The length includes the four bytes just read.
            let _ = ctxt.read_slice(subtable_length.saturating_sub(4))?;
            len += subtable_length.max(4);
        }

        let data = start.ctxt().read_slice(len)?;

        Ok(KernTable { table_count, data })
    }
}

impl<'a> KernTable<'a> {
    /// Interate of the sub-tables of this `kern` table.
    pub fn sub_tables(&self) -> impl Iterator<Item = Result<KernSubtable<'a>, ParseError>> + 'a {
        let mut ctxt = ReadScope::new(self.data).ctxt();
        (0..self.table_count).map(move |_| {
            let start = ctxt.scope();
            let _version = ctxt.read_u16be()?;
            let length = ctxt.read_u16be().map(usize::from)?;
            let coverage = ctxt.read_u16be()?;
            let format = coverage >> 8;
            let pairs = if format == 0 {
                let mut sub = start.offset_length(6, length.saturating_sub(6))?.ctxt();
                let n_pairs = sub.read_u16be()?;
                let _search_range = sub.read_u16be()?;
                let _entry_selector = sub.read_u16be()?;
                let _range_shift = sub.read_u16be()?;
                Some(sub.read_array::<KernPair>(usize::from(n_pairs))?)
            } else {
                debug!("skipping kern subtable format {}", format);
                None
            };
            let _ = ctxt.read_slice(length.saturating_sub(6))?;

            Ok(KernSubtable { coverage, pairs })
        })
    }

    /// All horizontal format 0 pairs in table order.
    pub fn horizontal_pairs(&self) -> Result<Vec<KernPair>, ParseError> {
        let mut pairs = Vec::new();
        for sub_table in self.sub_tables() {
            let sub_table = sub_table?;
            if !sub_table.is_horizontal() || sub_table.is_cross_stream() {
                continue;
            }
            if let Some(array) = &sub_table.pairs {
                pairs.extend(array.iter());
            }
        }
        Ok(pairs)
    }
}

impl KernSubtable<'_> {
    /// True if table has horizontal data, false if vertical.
    pub fn is_horizontal(&self) -> bool {
        self.coverage & 1 != 0
    }

    /// Is kerning is perpendicular to the flow of the text.
    pub fn is_cross_stream(&self) -> bool {
        self.coverage & (1 << 2) != 0
    }
}

impl ReadFrom for KernPair {
    type ReadType = (U16Be, U16Be, I16Be);

    fn read_from((left, right, value): (u16, u16, i16)) -> Self {
        KernPair { left, right, value }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::writer::{self, TtfType::*};

    #[test]
    fn test_read_format0_pairs() {
        let data = writer::convert(&[
            UInt16(0), // version
            UInt16(1), // nTables
            UInt16(0), // subtable version
            UInt16(14 + 2 * 6),
            UInt16(0x0001), // horizontal, format 0
            UInt16(2),      // nPairs
            UInt16(12),
            UInt16(1),
            UInt16(0),
            UInt16(3),
            UInt16(4),
            Int16(-40),
            UInt16(3),
            UInt16(5),
            Int16(25),
        ]);
        let kern = ReadScope::new(&data).read::<KernTable<'_>>().unwrap();
        assert_eq!(
            kern.horizontal_pairs().unwrap(),
            vec![
                KernPair {
                    left: 3,
                    right: 4,
                    value: -40
                },
                KernPair {
                    left: 3,
                    right: 5,
                    value: 25
                }
            ]
        );
    }
}
