#![warn(rust_2018_idioms)]

//! Merging of donor fonts into a composite CJK font.
//!
//! [`build::build_variant`] takes a base font and overlays digits, Hangul and Japanese glyphs
//! from donor fonts, bakes selected alternates into the default glyphs and writes the result.
//! Fonts are edited through the [`font::EditableFont`] trait, implemented in memory by
//! [`memory::MemoryFont`].

/// Baking of alternates and case offsets.
pub mod bake;
/// Reading of binary data.
pub mod binary;
pub mod build;
pub mod cff;
/// Picking glyphs from the subfonts of CID-keyed donors.
pub mod cid;
pub mod config;
pub mod copy;
pub mod coverage;
pub mod diagnostics;
pub mod error;
pub mod feature_table;
pub mod font;
pub mod glyph_info;
pub mod layout;
pub mod memory;
pub mod post;
pub mod ranges;
pub mod resolve;
pub mod size;
pub mod tables;
pub mod tag;
/// Shared test code.
#[cfg(test)]
pub mod tests;
pub mod transform;
