//! CFF font handling.
//!
//! Refer to [Technical Note #5176](http://wwwimages.adobe.com/content/dam/Adobe/en/devnet/font/pdfs/5176.CFF.pdf)
//! for more information.
//!
//! Only the parts needed to enumerate glyphs are read: the charset (glyph names or CIDs), the
//! CharStrings INDEX, and for CID-keyed fonts the FDSelect and Font DICT names that divide the
//! glyphs into subfonts. Charstrings themselves are kept as opaque bytes.

use std::iter;

use byteorder::{BigEndian, ByteOrder};
use itertools::Itertools;
use tinyvec::TinyVec;

use crate::binary::read::{ReadBinary, ReadBinaryDep, ReadCtxt, ReadFrom, ReadScope};
use crate::binary::{U16Be, U8};
use crate::error::ParseError;

const MAX_OPERANDS: usize = 48;
const END_OF_FLOAT_FLAG: u8 = 0xf;
const ISO_ADOBE_LAST_SID: u16 = 228;

/// Top DICT and Font DICT operators read by this module.
pub mod operator {
    pub const FULL_NAME: u16 = 2;
    pub const CHARSET: u16 = 15;
    pub const CHAR_STRINGS: u16 = 17;
    pub const ROS: u16 = super::op2(30);
    pub const FD_ARRAY: u16 = super::op2(36);
    pub const FD_SELECT: u16 = super::op2(37);
    pub const FONT_NAME: u16 = super::op2(38);
}

/// String identifier
pub type SID = u16;

/// Top level representation of a CFF font file, typically read from a CFF OpenType table.
pub struct CFF<'a> {
    pub header: Header,
    pub name_index: Index<'a>,
    pub string_index: Index<'a>,
    pub fonts: Vec<Font<'a>>,
}

/// CFF Font Header described in Section 6 of Technical Note #5176
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Header {
    pub major: u8,
    pub minor: u8,
    pub hdr_size: u8,
    pub off_size: u8,
}

/// A CFF INDEX described in Section 5 of Technical Note #5176
#[derive(Clone)]
pub struct Index<'a> {
    pub count: usize,
    off_size: u8,
    offset_array: &'a [u8],
    data_array: &'a [u8],
}

/// A single font within a CFF file
pub struct Font<'a> {
    pub top_dict: Dict,
    pub char_strings_index: Index<'a>,
    /// SID (name-keyed) or CID (CID-keyed) for each glyph.
    pub charset: Vec<u16>,
    pub cid: Option<CIDData>,
}

/// The parts of a CID-keyed font that divide its glyphs between Font DICTs.
pub struct CIDData {
    /// The Font DICT index of each glyph.
    pub fd_select: Vec<u8>,
    /// The `FontName` of each Font DICT, if present.
    pub font_names: Vec<Option<SID>>,
}

/// A Top DICT or Font DICT: operators in file order with their operands.
#[derive(Debug, PartialEq, Clone, Default)]
pub struct Dict {
    dict: Vec<(u16, Vec<Operand>)>,
}

enum Op {
    Operator(u16),
    Operand(Operand),
}

#[derive(Debug, PartialEq, Clone)]
pub enum Operand {
    Integer(i32),
    /// Real number operand. The packed BCD nibbles are kept unparsed.
    Real(TinyVec<[u8; 7]>),
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
struct Range3 {
    first: u16,
    fd: u8,
}

const fn op2(value: u8) -> u16 {
    (12 << 8) | (value as u16)
}

impl ReadBinary for CFF<'_> {
    type HostType<'a> = CFF<'a>;

    fn read<'a>(ctxt: &mut ReadCtxt<'a>) -> Result<Self::HostType<'a>, ParseError> {
        // Get a scope that starts at the beginning of the CFF data. This is needed for reading
        // data that is specified as an offset from the start of the data later.
        let scope = ctxt.scope();

        let header = ctxt.read::<Header>()?;
        let name_index = ctxt.read::<Index<'_>>()?;
        let top_dict_index = ctxt.read::<Index<'_>>()?;
        let string_index = ctxt.read::<Index<'_>>()?;
        let _global_subr_index = ctxt.read::<Index<'_>>()?;

        let mut fonts = Vec::with_capacity(name_index.count);
        for font_index in 0..name_index.count {
            let top_dict = top_dict_index.read::<Dict>(font_index)?;

            // CharStrings index
            let offset = top_dict
                .get_i32(operator::CHAR_STRINGS)
                .ok_or(ParseError::MissingValue)?;
            let char_strings_index = scope.offset(usize::try_from(offset)?).read::<Index<'_>>()?;
            let n_glyphs = char_strings_index.count;

            // The Top DICT begins with the ROS operator for CIDFonts.
            let cid = match top_dict.first_operator() {
                Some(operator::ROS) => Some(read_cid_data(&scope, &top_dict, n_glyphs)?),
                Some(_) => None,
                None => return Err(ParseError::MissingValue),
            };
            let charset = read_charset(&scope, &top_dict, n_glyphs)?;

            fonts.push(Font {
                top_dict,
                char_strings_index,
                charset,
                cid,
            });
        }

        Ok(CFF {
            header,
            name_index,
            string_index,
            fonts,
        })
    }
}

impl CFF<'_> {
    /// Read a string with the given SID from the String INDEX
    pub fn read_string(&self, sid: SID) -> Result<&str, ParseError> {
        let sid = usize::from(sid);
        // Test if SID is in standard range then fetch from internal table, otherwise fetch
        // string from the String INDEX using a value of (SID – nStdStrings) as the index
        if let Some(string) = STANDARD_STRINGS.get(sid) {
            Ok(string)
        } else {
            let bytes = self
                .string_index
                .read_object(sid - STANDARD_STRINGS.len())
                .ok_or(ParseError::BadIndex)?;

            std::str::from_utf8(bytes).map_err(|_utf8_err| ParseError::BadValue)
        }
    }

    /// The display name of each Font DICT of a CID-keyed font, in index order.
    ///
    /// Dicts without a `FontName` yield `None`.
    pub fn subfont_names(&self, font_index: usize) -> Vec<Option<String>> {
        let Some(cid) = self.fonts.get(font_index).and_then(|font| font.cid.as_ref()) else {
            return Vec::new();
        };
        cid.font_names
            .iter()
            .map(|sid| sid.and_then(|sid| self.read_string(sid).ok().map(String::from)))
            .collect()
    }

    /// The PostScript name of the font at `font_index`, from the Name INDEX.
    pub fn font_name(&self, font_index: usize) -> Option<&str> {
        self.name_index
            .read_object(font_index)
            .and_then(|bytes| std::str::from_utf8(bytes).ok())
    }

    /// The glyph name of `glyph_id`: the charset string for name-keyed fonts, or `cidNNNNN` for
    /// CID-keyed fonts.
    pub fn glyph_name(&self, font_index: usize, glyph_id: u16) -> Option<String> {
        let font = self.fonts.get(font_index)?;
        let id = *font.charset.get(usize::from(glyph_id))?;
        if font.cid.is_some() {
            Some(format!("cid{:05}", id))
        } else {
            self.read_string(id).ok().map(String::from)
        }
    }
}

impl Font<'_> {
    pub fn is_cid_keyed(&self) -> bool {
        self.cid.is_some()
    }

    /// The Font DICT index for `glyph_id`, or 0 for name-keyed fonts.
    pub fn font_dict_index(&self, glyph_id: u16) -> Option<u8> {
        match &self.cid {
            Some(cid) => cid.fd_select.get(usize::from(glyph_id)).copied(),
            None => Some(0),
        }
    }

    /// The CID of `glyph_id` in a CID-keyed font.
    pub fn cid_for_glyph(&self, glyph_id: u16) -> Option<u16> {
        self.cid
            .as_ref()
            .and(self.charset.get(usize::from(glyph_id)).copied())
    }
}

impl ReadBinary for Header {
    type HostType<'b> = Self;

    fn read<'a>(ctxt: &mut ReadCtxt<'a>) -> Result<Self, ParseError> {
        // If the major version number is understood by an implementation it can safely proceed
        // with reading the font.
        let major = ctxt.read_u8()?;
        ctxt.check(major == 1)?;
        let minor = ctxt.read_u8()?;
        let hdr_size = ctxt.read_u8()?;
        let off_size = ctxt.read_u8()?;

        if hdr_size < 4 {
            return Err(ParseError::BadValue);
        }

        if !(1..=4).contains(&off_size) {
            return Err(ParseError::BadValue);
        }

        let _unknown = ctxt.read_slice(usize::from(hdr_size - 4))?;

        Ok(Header {
            major,
            minor,
            hdr_size,
            off_size,
        })
    }
}

impl ReadBinary for Index<'_> {
    type HostType<'a> = Index<'a>;

    fn read<'a>(ctxt: &mut ReadCtxt<'a>) -> Result<Self::HostType<'a>, ParseError> {
        let count = usize::from(ctxt.read_u16be()?);

        if count > 0 {
            let off_size = ctxt.read_u8()?;
            if !(1..=4).contains(&off_size) {
                return Err(ParseError::BadValue);
            }

            let offset_array_size = (count + 1) * usize::from(off_size);
            let offset_array = ctxt.read_slice(offset_array_size)?;

            let last_offset_index = lookup_offset_index(off_size, offset_array, count)
                .filter(|&last| last >= 1)
                .ok_or(ParseError::BadValue)?;

            let data_array_size = last_offset_index - 1;
            let data_array = ctxt.read_slice(data_array_size)?;

            Ok(Index {
                count,
                off_size,
                offset_array,
                data_array,
            })
        } else {
            // count == 0
            Ok(Index {
                count,
                off_size: 1,
                offset_array: &[],
                data_array: &[],
            })
        }
    }
}

impl<'a> Index<'a> {
    pub fn read_object(&self, index: usize) -> Option<&'a [u8]> {
        if index < self.count {
            let start_index = lookup_offset_index(self.off_size, self.offset_array, index)?;
            let end_index = lookup_offset_index(self.off_size, self.offset_array, index + 1)?;
            self.data_array
                .get(start_index.checked_sub(1)?..end_index.checked_sub(1)?)
        } else {
            None
        }
    }

    pub fn read<T: ReadBinaryDep<Args<'a> = ()>>(
        &self,
        index: usize,
    ) -> Result<T::HostType<'a>, ParseError> {
        let data = self.read_object(index).ok_or(ParseError::BadIndex)?;
        ReadScope::new(data).read_dep::<T>(())
    }

    pub fn iter(&self) -> impl Iterator<Item = &'a [u8]> + '_ {
        (0..self.count).map_while(move |i| self.read_object(i))
    }
}

impl ReadBinary for Dict {
    type HostType<'b> = Self;

    fn read<'a>(ctxt: &mut ReadCtxt<'a>) -> Result<Self::HostType<'a>, ParseError> {
        let mut dict = Vec::new();
        let mut operands = Vec::new();

        while ctxt.bytes_available() {
            match Op::read(ctxt)? {
                Op::Operator(operator) => {
                    dict.push((operator, operands.clone()));
                    operands.clear();
                }
                Op::Operand(operand) => {
                    operands.push(operand);
                    if operands.len() > MAX_OPERANDS {
                        return Err(ParseError::LimitExceeded);
                    }
                }
            }
        }

        Ok(Dict { dict })
    }
}

impl Dict {
    pub fn first_operator(&self) -> Option<u16> {
        self.dict.first().map(|(operator, _)| *operator)
    }

    pub fn get(&self, key: u16) -> Option<&[Operand]> {
        self.dict
            .iter()
            .find(|(operator, _)| *operator == key)
            .map(|(_, operands)| operands.as_slice())
    }

    /// The integer operand of `key`, when present and a single integer.
    pub fn get_i32(&self, key: u16) -> Option<i32> {
        match self.get(key)? {
            [Operand::Integer(number)] => Some(*number),
            _ => None,
        }
    }
}

impl ReadBinary for Op {
    type HostType<'b> = Self;

    fn read<'a>(ctxt: &mut ReadCtxt<'a>) -> Result<Self, ParseError> {
        let b0 = ctxt.read_u8()?;

        match b0 {
            0..=11 | 13..=21 => Ok(Op::Operator(u16::from(b0))),
            12 => Ok(Op::Operator(op2(ctxt.read_u8()?))),
            28 => {
                let num = ctxt.read_i16be()?;
                Ok(Op::Operand(Operand::Integer(i32::from(num))))
            }
            29 => ok_int(ctxt.read_i32be()?),
            30 => {
                let nibbles = ctxt.read_until_nibble(END_OF_FLOAT_FLAG)?;
                Ok(Op::Operand(Operand::Real(nibbles.iter().copied().collect())))
            }
            32..=246 => ok_int(i32::from(b0) - 139),
            247..=250 => {
                let b1 = ctxt.read_u8()?;
                ok_int((i32::from(b0) - 247) * 256 + i32::from(b1) + 108)
            }
            251..=254 => {
                let b1 = ctxt.read_u8()?;
                ok_int(-(i32::from(b0) - 251) * 256 - i32::from(b1) - 108)
            }
            22..=27 | 31 | 255 => Err(ParseError::BadValue), // reserved
        }
    }
}

fn ok_int(num: i32) -> Result<Op, ParseError> {
    Ok(Op::Operand(Operand::Integer(num)))
}

impl ReadFrom for Range3 {
    type ReadType = (U16Be, U8);

    fn read_from((first, fd): (u16, u8)) -> Self {
        Range3 { first, fd }
    }
}

fn lookup_offset_index(off_size: u8, offset_array: &[u8], index: usize) -> Option<usize> {
    let start = index * usize::from(off_size);
    let buf = offset_array.get(start..start + usize::from(off_size))?;
    match off_size {
        1 => Some(usize::from(buf[0])),
        2 => Some(usize::from(BigEndian::read_u16(buf))),
        3 => usize::try_from(BigEndian::read_u24(buf)).ok(),
        4 => usize::try_from(BigEndian::read_u32(buf)).ok(),
        _ => None,
    }
}

fn read_cid_data(
    scope: &ReadScope<'_>,
    top_dict: &Dict,
    n_glyphs: usize,
) -> Result<CIDData, ParseError> {
    // The FDArray operator is expected to be present, with a single argument specifying an
    // offset to the Font DICT INDEX.
    let offset = top_dict
        .get_i32(operator::FD_ARRAY)
        .ok_or(ParseError::MissingValue)?;
    let font_dict_index = scope.offset(usize::try_from(offset)?).read::<Index<'_>>()?;
    let font_names = font_dict_index
        .iter()
        .map(|object| {
            let font_dict = ReadScope::new(object).read::<Dict>()?;
            Ok(font_dict
                .get_i32(operator::FONT_NAME)
                .and_then(|sid| u16::try_from(sid).ok()))
        })
        .collect::<Result<Vec<_>, ParseError>>()?;

    let offset = top_dict
        .get_i32(operator::FD_SELECT)
        .ok_or(ParseError::MissingValue)?;
    let fd_select = read_fd_select(&mut scope.offset(usize::try_from(offset)?).ctxt(), n_glyphs)?;

    Ok(CIDData {
        fd_select,
        font_names,
    })
}

fn read_fd_select(ctxt: &mut ReadCtxt<'_>, n_glyphs: usize) -> Result<Vec<u8>, ParseError> {
    match ctxt.read::<U8>()? {
        0 => Ok(ctxt.read_array::<U8>(n_glyphs)?.to_vec()),
        3 => {
            let nranges = usize::from(ctxt.read::<U16Be>()?);
            let ranges = ctxt.read_array::<Range3>(nranges)?;
            let sentinel = ctxt.read::<U16Be>()?;
            let mut fd_select = vec![0; n_glyphs];
            let range_windows = ranges
                .iter()
                .map(|Range3 { first, fd }| (first, Some(fd)))
                .chain(iter::once((sentinel, None)))
                .tuple_windows();
            for ((first, fd), (last, _)) in range_windows {
                let fd = fd.ok_or(ParseError::BadValue)?;
                let end = usize::from(last).min(n_glyphs);
                for entry in fd_select.get_mut(usize::from(first)..end).unwrap_or_default() {
                    *entry = fd;
                }
            }
            Ok(fd_select)
        }
        _ => Err(ParseError::BadValue),
    }
}

fn read_charset(
    scope: &ReadScope<'_>,
    top_dict: &Dict,
    n_glyphs: usize,
) -> Result<Vec<u16>, ParseError> {
    let offset = top_dict.get_i32(operator::CHARSET).unwrap_or(0);
    match offset {
        // ISOAdobe glyph ID maps to SID
        0 => Ok((0..n_glyphs)
            .map_while(|glyph_id| u16::try_from(glyph_id).ok())
            .map(|glyph_id| if glyph_id <= ISO_ADOBE_LAST_SID { glyph_id } else { 0 })
            .collect()),
        // Expert charsets name nothing a merge is interested in.
        1 | 2 => Ok(vec![0; n_glyphs]),
        _ => read_custom_charset(&mut scope.offset(usize::try_from(offset)?).ctxt(), n_glyphs),
    }
}

fn read_custom_charset(ctxt: &mut ReadCtxt<'_>, n_glyphs: usize) -> Result<Vec<u16>, ParseError> {
    // By definition the first glyph (GID 0) is “.notdef” and is not represented in the charset.
    let mut ids = Vec::with_capacity(n_glyphs);
    ids.push(0);
    match ctxt.read_u8()? {
        0 => ids.extend(ctxt.read_array::<U16Be>(n_glyphs.saturating_sub(1))?.iter()),
        format @ (1 | 2) => {
            while ids.len() < n_glyphs {
                let first = ctxt.read_u16be()?;
                let n_left = if format == 1 {
                    u16::from(ctxt.read_u8()?)
                } else {
                    ctxt.read_u16be()?
                };
                let last = first.checked_add(n_left).ok_or(ParseError::BadValue)?;
                ids.extend((first..=last).take(n_glyphs - ids.len()));
            }
        }
        _ => return Err(ParseError::BadValue),
    }
    Ok(ids)
}

/// Returns true when a Type 2 charstring draws at least one contour.
///
/// Charstrings that call subroutines are assumed to draw.
pub fn charstring_has_contours(data: &[u8]) -> bool {
    let mut i = 0;
    let mut stack = 0usize;
    let mut stems = 0usize;
    while let Some(&b0) = data.get(i) {
        i += 1;
        match b0 {
            28 => {
                i += 2;
                stack += 1;
            }
            32..=246 => stack += 1,
            247..=254 => {
                i += 1;
                stack += 1;
            }
            255 => {
                i += 4;
                stack += 1;
            }
            // hstem vstem hstemhm vstemhm
            1 | 3 | 18 | 23 => {
                stems += stack / 2;
                stack = 0;
            }
            // hintmask cntrmask
            19 | 20 => {
                stems += stack / 2;
                stack = 0;
                i += (stems + 7) / 8;
            }
            // rmoveto hmoveto vmoveto callsubr callgsubr
            4 | 21 | 22 | 10 | 29 => return true,
            14 => return false,
            12 => {
                i += 1;
                stack = 0;
            }
            _ => stack = 0,
        }
    }
    false
}

const STANDARD_STRINGS: [&str; 391] = [
    ".notdef",
    "space",
    "exclam",
    "quotedbl",
    "numbersign",
    "dollar",
    "percent",
    "ampersand",
    "quoteright",
    "parenleft",
    "parenright",
    "asterisk",
    "plus",
    "comma",
    "hyphen",
    "period",
    "slash",
    "zero",
    "one",
    "two",
    "three",
    "four",
    "five",
    "six",
    "seven",
    "eight",
    "nine",
    "colon",
    "semicolon",
    "less",
    "equal",
    "greater",
    "question",
    "at",
    "A",
    "B",
    "C",
    "D",
    "E",
    "F",
    "G",
    "H",
    "I",
    "J",
    "K",
    "L",
    "M",
    "N",
    "O",
    "P",
    "Q",
    "R",
    "S",
    "T",
    "U",
    "V",
    "W",
    "X",
    "Y",
    "Z",
    "bracketleft",
    "backslash",
    "bracketright",
    "asciicircum",
    "underscore",
    "quoteleft",
    "a",
    "b",
    "c",
    "d",
    "e",
    "f",
    "g",
    "h",
    "i",
    "j",
    "k",
    "l",
    "m",
    "n",
    "o",
    "p",
    "q",
    "r",
    "s",
    "t",
    "u",
    "v",
    "w",
    "x",
    "y",
    "z",
    "braceleft",
    "bar",
    "braceright",
    "asciitilde",
    "exclamdown",
    "cent",
    "sterling",
    "fraction",
    "yen",
    "florin",
    "section",
    "currency",
    "quotesingle",
    "quotedblleft",
    "guillemotleft",
    "guilsinglleft",
    "guilsinglright",
    "fi",
    "fl",
    "endash",
    "dagger",
    "daggerdbl",
    "periodcentered",
    "paragraph",
    "bullet",
    "quotesinglbase",
    "quotedblbase",
    "quotedblright",
    "guillemotright",
    "ellipsis",
    "perthousand",
    "questiondown",
    "grave",
    "acute",
    "circumflex",
    "tilde",
    "macron",
    "breve",
    "dotaccent",
    "dieresis",
    "ring",
    "cedilla",
    "hungarumlaut",
    "ogonek",
    "caron",
    "emdash",
    "AE",
    "ordfeminine",
    "Lslash",
    "Oslash",
    "OE",
    "ordmasculine",
    "ae",
    "dotlessi",
    "lslash",
    "oslash",
    "oe",
    "germandbls",
    "onesuperior",
    "logicalnot",
    "mu",
    "trademark",
    "Eth",
    "onehalf",
    "plusminus",
    "Thorn",
    "onequarter",
    "divide",
    "brokenbar",
    "degree",
    "thorn",
    "threequarters",
    "twosuperior",
    "registered",
    "minus",
    "eth",
    "multiply",
    "threesuperior",
    "copyright",
    "Aacute",
    "Acircumflex",
    "Adieresis",
    "Agrave",
    "Aring",
    "Atilde",
    "Ccedilla",
    "Eacute",
    "Ecircumflex",
    "Edieresis",
    "Egrave",
    "Iacute",
    "Icircumflex",
    "Idieresis",
    "Igrave",
    "Ntilde",
    "Oacute",
    "Ocircumflex",
    "Odieresis",
    "Ograve",
    "Otilde",
    "Scaron",
    "Uacute",
    "Ucircumflex",
    "Udieresis",
    "Ugrave",
    "Yacute",
    "Ydieresis",
    "Zcaron",
    "aacute",
    "acircumflex",
    "adieresis",
    "agrave",
    "aring",
    "atilde",
    "ccedilla",
    "eacute",
    "ecircumflex",
    "edieresis",
    "egrave",
    "iacute",
    "icircumflex",
    "idieresis",
    "igrave",
    "ntilde",
    "oacute",
    "ocircumflex",
    "odieresis",
    "ograve",
    "otilde",
    "scaron",
    "uacute",
    "ucircumflex",
    "udieresis",
    "ugrave",
    "yacute",
    "ydieresis",
    "zcaron",
    "exclamsmall",
    "Hungarumlautsmall",
    "dollaroldstyle",
    "dollarsuperior",
    "ampersandsmall",
    "Acutesmall",
    "parenleftsuperior",
    "parenrightsuperior",
    "twodotenleader",
    "onedotenleader",
    "zerooldstyle",
    "oneoldstyle",
    "twooldstyle",
    "threeoldstyle",
    "fouroldstyle",
    "fiveoldstyle",
    "sixoldstyle",
    "sevenoldstyle",
    "eightoldstyle",
    "nineoldstyle",
    "commasuperior",
    "threequartersemdash",
    "periodsuperior",
    "questionsmall",
    "asuperior",
    "bsuperior",
    "centsuperior",
    "dsuperior",
    "esuperior",
    "isuperior",
    "lsuperior",
    "msuperior",
    "nsuperior",
    "osuperior",
    "rsuperior",
    "ssuperior",
    "tsuperior",
    "ff",
    "ffi",
    "ffl",
    "parenleftinferior",
    "parenrightinferior",
    "Circumflexsmall",
    "hyphensuperior",
    "Gravesmall",
    "Asmall",
    "Bsmall",
    "Csmall",
    "Dsmall",
    "Esmall",
    "Fsmall",
    "Gsmall",
    "Hsmall",
    "Ismall",
    "Jsmall",
    "Ksmall",
    "Lsmall",
    "Msmall",
    "Nsmall",
    "Osmall",
    "Psmall",
    "Qsmall",
    "Rsmall",
    "Ssmall",
    "Tsmall",
    "Usmall",
    "Vsmall",
    "Wsmall",
    "Xsmall",
    "Ysmall",
    "Zsmall",
    "colonmonetary",
    "onefitted",
    "rupiah",
    "Tildesmall",
    "exclamdownsmall",
    "centoldstyle",
    "Lslashsmall",
    "Scaronsmall",
    "Zcaronsmall",
    "Dieresissmall",
    "Brevesmall",
    "Caronsmall",
    "Dotaccentsmall",
    "Macronsmall",
    "figuredash",
    "hypheninferior",
    "Ogoneksmall",
    "Ringsmall",
    "Cedillasmall",
    "questiondownsmall",
    "oneeighth",
    "threeeighths",
    "fiveeighths",
    "seveneighths",
    "onethird",
    "twothirds",
    "zerosuperior",
    "foursuperior",
    "fivesuperior",
    "sixsuperior",
    "sevensuperior",
    "eightsuperior",
    "ninesuperior",
    "zeroinferior",
    "oneinferior",
    "twoinferior",
    "threeinferior",
    "fourinferior",
    "fiveinferior",
    "sixinferior",
    "seveninferior",
    "eightinferior",
    "nineinferior",
    "centinferior",
    "dollarinferior",
    "periodinferior",
    "commainferior",
    "Agravesmall",
    "Aacutesmall",
    "Acircumflexsmall",
    "Atildesmall",
    "Adieresissmall",
    "Aringsmall",
    "AEsmall",
    "Ccedillasmall",
    "Egravesmall",
    "Eacutesmall",
    "Ecircumflexsmall",
    "Edieresissmall",
    "Igravesmall",
    "Iacutesmall",
    "Icircumflexsmall",
    "Idieresissmall",
    "Ethsmall",
    "Ntildesmall",
    "Ogravesmall",
    "Oacutesmall",
    "Ocircumflexsmall",
    "Otildesmall",
    "Odieresissmall",
    "OEsmall",
    "Oslashsmall",
    "Ugravesmall",
    "Uacutesmall",
    "Ucircumflexsmall",
    "Udieresissmall",
    "Yacutesmall",
    "Thornsmall",
    "Ydieresissmall",
    "001.000",
    "001.001",
    "001.002",
    "001.003",
    "Black",
    "Bold",
    "Book",
    "Light",
    "Medium",
    "Regular",
    "Roman",
    "Semibold",
];

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::writer::{self, TtfType::*};

    #[test]
    fn test_read_index() {
        let data = writer::convert(&[
            UInt16(2), // count
            UInt8(1),  // off_size
            UInt8(1),
            UInt8(3),
            UInt8(4),
            Raw(b"abc"),
        ]);
        let index = ReadScope::new(&data).read::<Index<'_>>().unwrap();
        assert_eq!(index.read_object(0), Some(&b"ab"[..]));
        assert_eq!(index.read_object(1), Some(&b"c"[..]));
        assert_eq!(index.read_object(2), None);
    }

    #[test]
    fn test_read_dict_integers() {
        let data = writer::convert(&[CFFInt(1234), UInt8(17), CFFInt(-5), UInt8(12), UInt8(38)]);
        let dict = ReadScope::new(&data).read::<Dict>().unwrap();
        assert_eq!(dict.get_i32(operator::CHAR_STRINGS), Some(1234));
        assert_eq!(dict.get_i32(operator::FONT_NAME), Some(-5));
        assert_eq!(dict.first_operator(), Some(operator::CHAR_STRINGS));
    }

    #[test]
    fn test_fd_select_format3() {
        let data = writer::convert(&[
            UInt8(3),
            UInt16(2),
            UInt16(0),
            UInt8(0),
            UInt16(2),
            UInt8(1),
            UInt16(5), // sentinel
        ]);
        let fd_select = read_fd_select(&mut ReadScope::new(&data).ctxt(), 5).unwrap();
        assert_eq!(fd_select, vec![0, 0, 1, 1, 1]);
    }

    #[test]
    fn test_charset_format1() {
        let data = writer::convert(&[UInt8(1), UInt16(100), UInt8(2)]);
        let charset = read_custom_charset(&mut ReadScope::new(&data).ctxt(), 4).unwrap();
        assert_eq!(charset, vec![0, 100, 101, 102]);
    }

    #[test]
    fn test_charstring_has_contours() {
        // width endchar
        assert!(!charstring_has_contours(&[139 + 50, 14]));
        // 0 0 rmoveto 100 hlineto endchar
        assert!(charstring_has_contours(&[139, 139, 21, 239, 6, 14]));
        // hstem with hintmask ahead of the moveto
        assert!(charstring_has_contours(&[139, 149, 1, 19, 0xff, 139, 139, 21, 14]));
    }
}
