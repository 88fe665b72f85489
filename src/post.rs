//! `post` table parsing.
//!
//! Only the glyph names are of interest here; they seed the names of copied glyphs.

use std::str;

use crate::binary::read::{ReadArray, ReadBinary, ReadCtxt};
use crate::binary::U16Be;
use crate::error::ParseError;

pub struct PostTable<'a> {
    pub version: i32,
    pub opt_sub_table: Option<SubTable<'a>>,
}

pub struct SubTable<'a> {
    pub num_glyphs: u16,
    pub glyph_name_index: ReadArray<'a, U16Be>,
    pub names: Vec<PascalString<'a>>,
}

pub struct PascalString<'a> {
    pub bytes: &'a [u8],
}

impl ReadBinary for PostTable<'_> {
    type HostType<'a> = PostTable<'a>;

    fn read<'a>(ctxt: &mut ReadCtxt<'a>) -> Result<Self::HostType<'a>, ParseError> {
        let version = ctxt.read_i32be()?;
        // italicAngle through maxMemType1
        let _header = ctxt.read_slice(28)?;
        let opt_sub_table = match version {
            0x00020000 => {
                // May include some Format 1 glyphs
                let num_glyphs = ctxt.read_u16be()?;
                let glyph_name_index = ctxt.read_array::<U16Be>(usize::from(num_glyphs))?;

                let num_names = glyph_name_index
                    .iter()
                    .filter(|&index| usize::from(index) >= FORMAT_1_NAMES.len())
                    .count();
                let mut names = Vec::with_capacity(num_names);

                for _ in 0..num_names {
                    let length = ctxt.read_u8()?;
                    let bytes = ctxt.read_slice(usize::from(length))?;
                    names.push(PascalString { bytes });
                }

                Some(SubTable {
                    num_glyphs,
                    glyph_name_index,
                    names,
                })
            }
            0x00010000 | 0x00025000 | 0x00030000 => None,
            _ => return Err(ParseError::BadVersion),
        };

        Ok(PostTable {
            version,
            opt_sub_table,
        })
    }
}

impl<'a> PostTable<'a> {
    pub fn glyph_name(&self, glyph_index: u16) -> Result<Option<&'a str>, ParseError> {
        match (self.version, &self.opt_sub_table) {
            (0x00010000, _) => Ok(FORMAT_1_NAMES.get(usize::from(glyph_index)).copied()),
            (0x00020000, Some(sub_table)) => {
                if glyph_index >= sub_table.num_glyphs {
                    return Ok(None);
                }
                let name_index = usize::from(
                    sub_table
                        .glyph_name_index
                        .get_item(usize::from(glyph_index))
                        .ok_or(ParseError::BadIndex)?,
                );

                match FORMAT_1_NAMES.get(name_index) {
                    Some(name) => Ok(Some(*name)),
                    None => {
                        let pascal_string = sub_table
                            .names
                            .get(name_index - FORMAT_1_NAMES.len())
                            .ok_or(ParseError::BadIndex)?;
                        str::from_utf8(pascal_string.bytes)
                            .map(Some)
                            .map_err(|_| ParseError::BadValue)
                    }
                }
            }
            // If the table is version 2, the sub-table should exist
            (0x00020000, None) => Err(ParseError::BadValue),
            _ => Ok(None),
        }
    }
}

pub(crate) static FORMAT_1_NAMES: &[&str; 258] = &[
    ".notdef",
    ".null",
    "nonmarkingreturn",
    "space",
    "exclam",
    "quotedbl",
    "numbersign",
    "dollar",
    "percent",
    "ampersand",
    "quotesingle",
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
    "grave",
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
    "Adieresis",
    "Aring",
    "Ccedilla",
    "Eacute",
    "Ntilde",
    "Odieresis",
    "Udieresis",
    "aacute",
    "agrave",
    "acircumflex",
    "adieresis",
    "atilde",
    "aring",
    "ccedilla",
    "eacute",
    "egrave",
    "ecircumflex",
    "edieresis",
    "iacute",
    "igrave",
    "icircumflex",
    "idieresis",
    "ntilde",
    "oacute",
    "ograve",
    "ocircumflex",
    "odieresis",
    "otilde",
    "uacute",
    "ugrave",
    "ucircumflex",
    "udieresis",
    "dagger",
    "degree",
    "cent",
    "sterling",
    "section",
    "bullet",
    "paragraph",
    "germandbls",
    "registered",
    "copyright",
    "trademark",
    "acute",
    "dieresis",
    "notequal",
    "AE",
    "Oslash",
    "infinity",
    "plusminus",
    "lessequal",
    "greaterequal",
    "yen",
    "mu",
    "partialdiff",
    "summation",
    "product",
    "pi",
    "integral",
    "ordfeminine",
    "ordmasculine",
    "Omega",
    "ae",
    "oslash",
    "questiondown",
    "exclamdown",
    "logicalnot",
    "radical",
    "florin",
    "approxequal",
    "Delta",
    "guillemotleft",
    "guillemotright",
    "ellipsis",
    "nonbreakingspace",
    "Agrave",
    "Atilde",
    "Otilde",
    "OE",
    "oe",
    "endash",
    "emdash",
    "quotedblleft",
    "quotedblright",
    "quoteleft",
    "quoteright",
    "divide",
    "lozenge",
    "ydieresis",
    "Ydieresis",
    "fraction",
    "currency",
    "guilsinglleft",
    "guilsinglright",
    "fi",
    "fl",
    "daggerdbl",
    "periodcentered",
    "quotesinglbase",
    "quotedblbase",
    "perthousand",
    "Acircumflex",
    "Ecircumflex",
    "Aacute",
    "Edieresis",
    "Egrave",
    "Iacute",
    "Icircumflex",
    "Idieresis",
    "Igrave",
    "Oacute",
    "Ocircumflex",
    "apple",
    "Ograve",
    "Uacute",
    "Ucircumflex",
    "Ugrave",
    "dotlessi",
    "circumflex",
    "tilde",
    "macron",
    "breve",
    "dotaccent",
    "ring",
    "cedilla",
    "hungarumlaut",
    "ogonek",
    "caron",
    "Lslash",
    "lslash",
    "Scaron",
    "scaron",
    "Zcaron",
    "zcaron",
    "brokenbar",
    "Eth",
    "eth",
    "Yacute",
    "yacute",
    "Thorn",
    "thorn",
    "minus",
    "multiply",
    "onesuperior",
    "twosuperior",
    "threesuperior",
    "onehalf",
    "onequarter",
    "threequarters",
    "franc",
    "Gbreve",
    "gbreve",
    "Idotaccent",
    "Scedilla",
    "scedilla",
    "Cacute",
    "cacute",
    "Ccaron",
    "ccaron",
    "dcroat",
];

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binary::read::ReadScope;
    use crate::tests::writer::{self, TtfType::*};

    fn post_v2() -> Vec<u8> {
        let mut data = writer::convert(&[
            Int32(0x00020000),
            Int32(0),
            Int16(-100),
            Int16(50),
            UInt32(0),
            UInt32(0),
            UInt32(0),
            UInt32(0),
            UInt32(0),
            UInt16(3), // numGlyphs
            UInt16(0),
            UInt16(19), // zero
            UInt16(258),
            UInt8(10),
        ]);
        data.extend_from_slice(b"zero.slash");
        data
    }

    #[test]
    fn test_glyph_names_v2() {
        let data = post_v2();
        let post = ReadScope::new(&data).read::<PostTable<'_>>().unwrap();
        assert_eq!(post.glyph_name(0).unwrap(), Some(".notdef"));
        assert_eq!(post.glyph_name(1).unwrap(), Some("zero"));
        assert_eq!(post.glyph_name(2).unwrap(), Some("zero.slash"));
        assert_eq!(post.glyph_name(3).unwrap(), None);
    }
}
