//! Shared test code.

include!("../tests/common.rs");

use crate::font::{Contour, OutlinePoint};

/// An axis aligned square contour with its lower left corner at `(x, y)`.
pub(crate) fn square(x: f64, y: f64, size: f64) -> Contour {
    [(x, y), (x + size, y), (x + size, y + size), (x, y + size)]
        .iter()
        .map(|&(x, y)| OutlinePoint {
            x,
            y,
            on_curve: true,
        })
        .collect()
}

pub(crate) mod writer {
    //! Testing utilities.
    //!
    #![allow(dead_code)]

    // The writer module is derived from ttf-parser, licenced under Apache-2.0.
    // https://github.com/RazrFalcon/ttf-parser/blob/439aaaebd50eb8aed66302e3c1b51fae047f85b2/src/writer.rs

    #[allow(missing_debug_implementations)]
    #[derive(Clone, Copy)]
    pub enum TtfType {
        Raw(&'static [u8]),
        TrueTypeMagic,
        OpenTypeMagic,
        FontCollectionMagic,
        Int8(i8),
        UInt8(u8),
        Int16(i16),
        UInt16(u16),
        Int32(i32),
        UInt32(u32),
        CFFInt(i32),
    }

    pub fn convert(values: &[TtfType]) -> Vec<u8> {
        let mut data = Vec::with_capacity(256);
        for v in values {
            convert_type(*v, &mut data);
        }

        data
    }

    pub fn convert_type(value: TtfType, data: &mut Vec<u8>) {
        match value {
            TtfType::Raw(bytes) => {
                data.extend_from_slice(bytes);
            }
            TtfType::TrueTypeMagic => {
                data.extend_from_slice(&[0x00, 0x01, 0x00, 0x00]);
            }
            TtfType::OpenTypeMagic => {
                data.extend_from_slice(&[0x4F, 0x54, 0x54, 0x4F]);
            }
            TtfType::FontCollectionMagic => {
                data.extend_from_slice(&[0x74, 0x74, 0x63, 0x66]);
            }
            TtfType::Int8(n) => {
                data.extend_from_slice(&i8::to_be_bytes(n));
            }
            TtfType::UInt8(n) => {
                data.extend_from_slice(&u8::to_be_bytes(n));
            }
            TtfType::Int16(n) => {
                data.extend_from_slice(&i16::to_be_bytes(n));
            }
            TtfType::UInt16(n) => {
                data.extend_from_slice(&u16::to_be_bytes(n));
            }
            TtfType::Int32(n) => {
                data.extend_from_slice(&i32::to_be_bytes(n));
            }
            TtfType::UInt32(n) => {
                data.extend_from_slice(&u32::to_be_bytes(n));
            }
            TtfType::CFFInt(n) => match n {
                -107..=107 => {
                    data.push((n as i16 + 139) as u8);
                }
                108..=1131 => {
                    let n = n - 108;
                    data.push(((n >> 8) + 247) as u8);
                    data.push((n & 0xFF) as u8);
                }
                -1131..=-108 => {
                    let n = -n - 108;
                    data.push(((n >> 8) + 251) as u8);
                    data.push((n & 0xFF) as u8);
                }
                -32768..=32767 => {
                    data.push(28);
                    data.extend_from_slice(&i16::to_be_bytes(n as i16));
                }
                _ => {
                    data.push(29);
                    data.extend_from_slice(&i32::to_be_bytes(n));
                }
            },
        }
    }

    #[derive(Debug)]
    pub struct Writer {
        pub data: Vec<u8>,
    }

    impl Writer {
        pub fn new() -> Self {
            Writer {
                data: Vec::with_capacity(256),
            }
        }

        pub fn offset(&self) -> usize {
            self.data.len()
        }

        pub fn write(&mut self, value: TtfType) {
            convert_type(value, &mut self.data);
        }
    }

    /// Assemble an sfnt from `(tag, table data)` pairs.
    ///
    /// Tables are laid out in the order given, each padded to a four byte boundary. Checksums
    /// are left as zero since nothing in this crate verifies them.
    pub fn sfnt(magic: TtfType, tables: &[(u32, Vec<u8>)]) -> Vec<u8> {
        let mut w = Writer::new();
        w.write(magic);
        w.write(TtfType::UInt16(tables.len() as u16));
        w.write(TtfType::UInt16(0)); // search_range
        w.write(TtfType::UInt16(0)); // entry_selector
        w.write(TtfType::UInt16(0)); // range_shift

        let mut offset = 12 + 16 * tables.len();
        for (tag, data) in tables {
            w.write(TtfType::UInt32(*tag));
            w.write(TtfType::UInt32(0));
            w.write(TtfType::UInt32(offset as u32));
            w.write(TtfType::UInt32(data.len() as u32));
            offset += (data.len() + 3) / 4 * 4;
        }
        for (_, data) in tables {
            w.data.extend_from_slice(data);
            while w.data.len() % 4 != 0 {
                w.data.push(0);
            }
        }
        w.data
    }
}
