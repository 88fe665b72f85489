//! Parsing of the `glyf` table.
//!
//! > This table contains information that describes the glyphs in the font in the TrueType outline
//! > format.
//!
//! <https://docs.microsoft.com/en-us/typography/opentype/spec/glyf>
//!
//! Glyphs are located with the `loca` table up front but only decoded on request, since a merge
//! touches a small fraction of a donor's glyphs.

use std::iter;

use bitflags::bitflags;
use itertools::Itertools;
use log::warn;

use crate::binary::read::{ReadBinary, ReadBinaryDep, ReadCtxt, ReadFrom, ReadScope};
use crate::binary::{I16Be, U16Be, U8};
use crate::error::ParseError;
use crate::tables::loca::LocaTable;
use crate::tables::F2Dot14;

bitflags! {
    #[derive(Debug, Copy, Clone, PartialEq, Eq)]
    pub struct SimpleGlyphFlag: u8 {
        const ON_CURVE_POINT                       = 0b00000001;
        const X_SHORT_VECTOR                       = 0b00000010;
        const Y_SHORT_VECTOR                       = 0b00000100;
        const REPEAT_FLAG                          = 0b00001000;
        const X_IS_SAME_OR_POSITIVE_X_SHORT_VECTOR = 0b00010000;
        const Y_IS_SAME_OR_POSITIVE_Y_SHORT_VECTOR = 0b00100000;
    }
}

bitflags! {
    #[derive(Debug, Copy, Clone, PartialEq, Eq)]
    pub struct CompositeGlyphFlag: u16 {
        /// The arguments are 16-bit; otherwise they are bytes.
        const ARG_1_AND_2_ARE_WORDS = 0x0001;
        /// The arguments are signed xy values; otherwise they are unsigned point numbers.
        const ARGS_ARE_XY_VALUES = 0x0002;
        const ROUND_XY_TO_GRID = 0x0004;
        /// There is a simple scale for the component.
        const WE_HAVE_A_SCALE = 0x0008;
        /// At least one more glyph follows this one.
        const MORE_COMPONENTS = 0x0020;
        /// The x direction will use a different scale from the y direction.
        const WE_HAVE_AN_X_AND_Y_SCALE = 0x0040;
        /// There is a 2 by 2 transformation that will be used to scale the component.
        const WE_HAVE_A_TWO_BY_TWO = 0x0080;
        const WE_HAVE_INSTRUCTIONS = 0x0100;
        const USE_MY_METRICS = 0x0200;
        const OVERLAP_COMPOUND = 0x0400;
    }
}

/// `glyf` table
#[derive(Debug)]
pub struct GlyfTable<'a> {
    records: Vec<GlyfRecord<'a>>,
}

#[derive(Debug, Clone)]
enum GlyfRecord<'a> {
    Empty,
    Present(ReadScope<'a>),
}

#[derive(Debug, PartialEq, Clone)]
pub enum Glyph {
    Simple(SimpleGlyph),
    Composite(Vec<CompositeGlyph>),
}

#[derive(Debug, PartialEq, Clone)]
pub struct SimpleGlyph {
    pub end_pts_of_contours: Vec<u16>,
    pub flags: Vec<SimpleGlyphFlag>,
    pub coordinates: Vec<Point>,
}

#[derive(Debug, PartialEq, Clone)]
pub struct CompositeGlyph {
    pub flags: CompositeGlyphFlag,
    pub glyph_index: u16,
    pub argument1: i32,
    pub argument2: i32,
    pub scale: Option<CompositeGlyphScale>,
}

#[derive(Debug, PartialEq, Copy, Clone)]
pub enum CompositeGlyphScale {
    Scale(F2Dot14),
    XY { x_scale: F2Dot14, y_scale: F2Dot14 },
    Matrix([[F2Dot14; 2]; 2]),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Point(pub i16, pub i16);

impl ReadBinaryDep for GlyfTable<'_> {
    type Args<'a> = &'a LocaTable<'a>;
    type HostType<'a> = GlyfTable<'a>;

    fn read_dep<'a>(
        ctxt: &mut ReadCtxt<'a>,
        loca: &'a LocaTable<'a>,
    ) -> Result<Self::HostType<'a>, ParseError> {
        if loca.offsets.len() < 2 {
            return Err(ParseError::BadIndex);
        }

        let scope = ctxt.scope();
        let records = loca
            .offsets
            .iter()
            .tuple_windows()
            .map(|(start, end)| match end.checked_sub(start) {
                Some(0) => Ok(GlyfRecord::Empty),
                Some(length) => {
                    let offset = usize::try_from(start)?;
                    match scope.offset_length(offset, usize::try_from(length)?) {
                        Ok(glyph_scope) => Ok(GlyfRecord::Present(glyph_scope)),
                        Err(ParseError::BadEof) => {
                            // Tolerate a final `loca` entry that runs past the end of `glyf`.
                            warn!("glyph length out of bounds, reading without a limit");
                            Ok(GlyfRecord::Present(scope.offset(offset)))
                        }
                        Err(err) => Err(err),
                    }
                }
                None => Err(ParseError::BadOffset),
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(GlyfTable { records })
    }
}

impl GlyfTable<'_> {
    pub fn num_glyphs(&self) -> usize {
        self.records.len()
    }

    /// Decode the glyph at `glyph_index`. Empty glyphs yield `None`.
    pub fn glyph(&self, glyph_index: usize) -> Result<Option<Glyph>, ParseError> {
        match self.records.get(glyph_index) {
            Some(GlyfRecord::Empty) => Ok(None),
            Some(GlyfRecord::Present(scope)) => scope.read::<Glyph>().map(Some),
            None => Err(ParseError::BadIndex),
        }
    }
}

impl ReadBinary for Glyph {
    type HostType<'a> = Self;

    fn read<'a>(ctxt: &mut ReadCtxt<'a>) -> Result<Self, ParseError> {
        let number_of_contours = ctxt.read_i16be()?;
        let _bounding_box = ctxt.read_slice(4 * 2)?;

        if number_of_contours >= 0 {
            // Cast is safe as we've checked value is positive above
            let glyph = ctxt.read_dep::<SimpleGlyph>(number_of_contours as u16)?;
            Ok(Glyph::Simple(glyph))
        } else {
            let mut components = Vec::new();
            loop {
                let flags = ctxt.read::<CompositeGlyphFlag>()?;
                components.push(ctxt.read_dep::<CompositeGlyph>(flags)?);
                if !flags.contains(CompositeGlyphFlag::MORE_COMPONENTS) {
                    break;
                }
            }
            Ok(Glyph::Composite(components))
        }
    }
}

impl SimpleGlyph {
    /// Iterate the contours of this glyph as `(point, on_curve)` slices.
    pub fn contours(&self) -> impl Iterator<Item = Vec<(Point, bool)>> + '_ {
        self.end_pts_of_contours.iter().scan(0, move |i, &end| {
            let start = *i;
            let end = usize::from(end);
            *i = end + 1;
            let points = self.coordinates.get(start..=end)?;
            let flags = self.flags.get(start..=end)?;
            Some(
                points
                    .iter()
                    .zip(flags)
                    .map(|(point, flag)| (*point, flag.is_on_curve()))
                    .collect(),
            )
        })
    }
}

impl ReadBinaryDep for SimpleGlyph {
    type Args<'a> = u16;
    type HostType<'a> = Self;

    fn read_dep<'a>(ctxt: &mut ReadCtxt<'a>, number_of_contours: u16) -> Result<Self, ParseError> {
        let number_of_contours = usize::from(number_of_contours);
        let end_pts_of_contours = ctxt.read_array::<U16Be>(number_of_contours)?.to_vec();
        let instruction_length = ctxt.read::<U16Be>()?;
        let _instructions = ctxt.read_slice(usize::from(instruction_length))?;
        // end_pts_of_contours stores the index of the end points.
        // Therefore the number of coordinates is the last index + 1
        let number_of_coordinates = end_pts_of_contours
            .last()
            .map_or(0, |&last| usize::from(last) + 1);

        let mut flags = Vec::with_capacity(number_of_coordinates);
        while flags.len() < number_of_coordinates {
            let flag = ctxt.read::<SimpleGlyphFlag>()?;
            if flag.is_repeated() {
                let count = usize::from(ctxt.read::<U8>()?) + 1; // + 1 to include the current entry
                flags.extend(iter::repeat(flag).take(count))
            } else {
                flags.push(flag);
            }
        }
        flags.truncate(number_of_coordinates);

        let mut coordinates = Vec::with_capacity(number_of_coordinates);
        let mut x = 0i16;
        for flag in &flags {
            let dx = if flag.x_is_short() {
                i16::from(ctxt.read::<U8>()?) * flag.x_short_sign()
            } else if flag.x_is_same_or_positive() {
                0
            } else {
                ctxt.read::<I16Be>()?
            };
            x = x.wrapping_add(dx);
            coordinates.push(Point(x, 0));
        }

        // Coordinates are deltas against the previous point, starting from (0, 0).
        let mut y = 0i16;
        for (flag, point) in flags.iter().zip(coordinates.iter_mut()) {
            let dy = if flag.y_is_short() {
                i16::from(ctxt.read::<U8>()?) * flag.y_short_sign()
            } else if flag.y_is_same_or_positive() {
                0
            } else {
                ctxt.read::<I16Be>()?
            };
            y = y.wrapping_add(dy);
            point.1 = y;
        }

        Ok(SimpleGlyph {
            end_pts_of_contours,
            flags,
            coordinates,
        })
    }
}

impl ReadFrom for SimpleGlyphFlag {
    type ReadType = U8;

    fn read_from(flag: u8) -> Self {
        SimpleGlyphFlag::from_bits_truncate(flag)
    }
}

impl SimpleGlyphFlag {
    pub fn is_on_curve(self) -> bool {
        self.contains(Self::ON_CURVE_POINT)
    }

    pub fn x_is_short(self) -> bool {
        self.contains(Self::X_SHORT_VECTOR)
    }

    pub fn y_is_short(self) -> bool {
        self.contains(Self::Y_SHORT_VECTOR)
    }

    pub fn is_repeated(self) -> bool {
        self.contains(Self::REPEAT_FLAG)
    }

    pub fn x_short_sign(self) -> i16 {
        if self.x_is_same_or_positive() {
            1
        } else {
            -1
        }
    }

    pub fn y_short_sign(self) -> i16 {
        if self.y_is_same_or_positive() {
            1
        } else {
            -1
        }
    }

    pub fn x_is_same_or_positive(self) -> bool {
        self.contains(Self::X_IS_SAME_OR_POSITIVE_X_SHORT_VECTOR)
    }

    pub fn y_is_same_or_positive(self) -> bool {
        self.contains(Self::Y_IS_SAME_OR_POSITIVE_Y_SHORT_VECTOR)
    }
}

impl ReadFrom for CompositeGlyphFlag {
    type ReadType = U16Be;

    fn read_from(flag: u16) -> Self {
        CompositeGlyphFlag::from_bits_truncate(flag)
    }
}

impl ReadBinaryDep for CompositeGlyph {
    type Args<'a> = CompositeGlyphFlag;
    type HostType<'a> = Self;

    fn read_dep<'a>(ctxt: &mut ReadCtxt<'a>, flags: CompositeGlyphFlag) -> Result<Self, ParseError> {
        let glyph_index = ctxt.read_u16be()?;
        let (argument1, argument2) = match (
            flags.contains(CompositeGlyphFlag::ARG_1_AND_2_ARE_WORDS),
            flags.contains(CompositeGlyphFlag::ARGS_ARE_XY_VALUES),
        ) {
            (true, true) => (i32::from(ctxt.read_i16be()?), i32::from(ctxt.read_i16be()?)),
            (true, false) => (i32::from(ctxt.read_u16be()?), i32::from(ctxt.read_u16be()?)),
            (false, true) => (i32::from(ctxt.read_i8()?), i32::from(ctxt.read_i8()?)),
            (false, false) => (i32::from(ctxt.read_u8()?), i32::from(ctxt.read_u8()?)),
        };

        let scale = if flags.contains(CompositeGlyphFlag::WE_HAVE_A_SCALE) {
            Some(CompositeGlyphScale::Scale(ctxt.read::<F2Dot14>()?))
        } else if flags.contains(CompositeGlyphFlag::WE_HAVE_AN_X_AND_Y_SCALE) {
            Some(CompositeGlyphScale::XY {
                x_scale: ctxt.read::<F2Dot14>()?,
                y_scale: ctxt.read::<F2Dot14>()?,
            })
        } else if flags.contains(CompositeGlyphFlag::WE_HAVE_A_TWO_BY_TWO) {
            Some(CompositeGlyphScale::Matrix([
                [ctxt.read::<F2Dot14>()?, ctxt.read::<F2Dot14>()?],
                [ctxt.read::<F2Dot14>()?, ctxt.read::<F2Dot14>()?],
            ]))
        } else {
            None
        };

        Ok(CompositeGlyph {
            flags,
            glyph_index,
            argument1,
            argument2,
            scale,
        })
    }
}

impl CompositeGlyph {
    /// The component transform as `[xx, xy, yx, yy, dx, dy]`.
    ///
    /// Point-matched placement is not resolved; such components are placed at the origin.
    pub fn matrix(&self) -> [f64; 6] {
        let (xx, xy, yx, yy) = match self.scale {
            None => (1.0, 0.0, 0.0, 1.0),
            Some(CompositeGlyphScale::Scale(s)) => {
                let s = f64::from(s);
                (s, 0.0, 0.0, s)
            }
            Some(CompositeGlyphScale::XY { x_scale, y_scale }) => {
                (f64::from(x_scale), 0.0, 0.0, f64::from(y_scale))
            }
            Some(CompositeGlyphScale::Matrix([[a, b], [c, d]])) => {
                (f64::from(a), f64::from(b), f64::from(c), f64::from(d))
            }
        };
        let (dx, dy) = if self.flags.contains(CompositeGlyphFlag::ARGS_ARE_XY_VALUES) {
            (f64::from(self.argument1), f64::from(self.argument2))
        } else {
            (0.0, 0.0)
        };
        [xx, xy, yx, yy, dx, dy]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::writer::{self, TtfType::*};

    fn triangle() -> Vec<u8> {
        writer::convert(&[
            Int16(1), // number of contours
            Int16(0),
            Int16(0),
            Int16(100),
            Int16(100),
            UInt16(2), // end point of contour
            UInt16(0), // instruction length
            UInt8(0x01),
            UInt8(0x01),
            UInt8(0x00),
            Int16(0), // x deltas
            Int16(100),
            Int16(-50),
            Int16(0), // y deltas
            Int16(0),
            Int16(100),
        ])
    }

    #[test]
    fn test_read_simple_glyph() {
        let data = triangle();
        let glyph = ReadScope::new(&data).read::<Glyph>().unwrap();
        let Glyph::Simple(simple) = glyph else {
            panic!("expected simple glyph");
        };
        let contours = simple.contours().collect::<Vec<_>>();
        assert_eq!(
            contours,
            vec![vec![
                (Point(0, 0), true),
                (Point(100, 0), true),
                (Point(50, 100), false)
            ]]
        );
    }

    #[test]
    fn test_read_composite_glyph() {
        let data = writer::convert(&[
            Int16(-1),
            Int16(0),
            Int16(0),
            Int16(0),
            Int16(0),
            UInt16(0x0003 | 0x0008), // words, xy values, scale
            UInt16(4),
            Int16(10),
            Int16(-20),
            UInt16(0x2000), // 0.5
        ]);
        let glyph = ReadScope::new(&data).read::<Glyph>().unwrap();
        let Glyph::Composite(components) = glyph else {
            panic!("expected composite glyph");
        };
        assert_eq!(components.len(), 1);
        assert_eq!(components[0].glyph_index, 4);
        assert_eq!(components[0].matrix(), [0.5, 0.0, 0.0, 0.5, 10.0, -20.0]);
    }
}
