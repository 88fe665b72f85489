//! Read-only view of a binary font's glyph names, cmap and `GSUB` substitutions.
//!
//! This is independent of any in-memory font: it is used to discover substitutions that an
//! editable font does not expose, and to map donor glyph names back to codepoints.

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::Path;

use log::warn;
use ouroboros::self_referencing;
use rustc_hash::FxHashMap;

use crate::binary::read::ReadScope;
use crate::cff::CFF;
use crate::error::{FontError, ParseError};
use crate::glyph_info::GlyphNames;
use crate::layout::LayoutTable;
use crate::post::PostTable;
use crate::tables::cmap::Cmap;
use crate::tables::{FontTableProvider, MaxpTable, OffsetTableFontProvider, OpenTypeFont};
use crate::tag::{self, DisplayTag};

/// A substitution found in a `GSUB` lookup, by glyph name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Substitution {
    pub source: String,
    pub target: String,
    pub tag: u32,
}

/// Substitutions for a set of feature tags.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Substitutions {
    pub pairs: Vec<Substitution>,
    /// Number of pairs found for each tag.
    pub per_tag: BTreeMap<u32, usize>,
}

#[self_referencing]
struct Sfnt {
    data: Box<[u8]>,
    #[borrows(data)]
    #[not_covariant]
    provider: OffsetTableFontProvider<'this>,
}

/// A parsed font file.
pub struct FeatureTableFile {
    sfnt: Sfnt,
    glyph_order: Vec<String>,
    name_index: FxHashMap<String, usize>,
    cmap: BTreeMap<u32, String>,
    name_to_codepoint: FxHashMap<String, u32>,
}

impl FeatureTableFile {
    /// Read and parse the font at `path`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, FontError> {
        let data = fs::read(path)?;
        Ok(Self::from_bytes(data)?)
    }

    /// Parse the first font in `data`.
    pub fn from_bytes(data: Vec<u8>) -> Result<Self, ParseError> {
        let sfnt = SfntTryBuilder {
            data: data.into_boxed_slice(),
            provider_builder: |data| {
                ReadScope::new(data)
                    .read::<OpenTypeFont<'_>>()?
                    .table_provider(0)
            },
        }
        .try_build()?;

        let (glyph_order, cmap) = sfnt.with_provider(|provider| read_names(provider))?;

        let mut name_index = FxHashMap::default();
        for (index, name) in glyph_order.iter().enumerate() {
            name_index.entry(name.clone()).or_insert(index);
        }
        let mut name_to_codepoint = FxHashMap::default();
        for (&ch, name) in &cmap {
            name_to_codepoint.entry(name.clone()).or_insert(ch);
        }

        Ok(FeatureTableFile {
            sfnt,
            glyph_order,
            name_index,
            cmap,
            name_to_codepoint,
        })
    }

    /// Glyph names in glyph id order.
    pub fn glyph_order(&self) -> &[String] {
        &self.glyph_order
    }

    /// Position of `name` in the glyph order.
    pub fn glyph_index(&self, name: &str) -> Option<usize> {
        self.name_index.get(name).copied()
    }

    /// Codepoint to glyph name, from the best cmap subtable.
    pub fn cmap(&self) -> &BTreeMap<u32, String> {
        &self.cmap
    }

    /// The lowest codepoint mapped to `name`.
    pub fn codepoint_for_name(&self, name: &str) -> Option<u32> {
        self.name_to_codepoint.get(name).copied()
    }

    /// Every feature tag present in the `GSUB` table.
    pub fn feature_tags(&self) -> BTreeSet<u32> {
        match self.read_gsub() {
            Some(gsub) => gsub.feature_tags().into_iter().collect(),
            None => BTreeSet::new(),
        }
    }

    /// Single and first-alternate substitutions of the lookups of features tagged with any of
    /// `tags`, by glyph name.
    pub fn substitutions(&self, tags: &BTreeSet<u32>) -> Substitutions {
        let mut substitutions = Substitutions::default();
        let Some(gsub) = self.read_gsub() else {
            return substitutions;
        };

        for &tag in tags {
            for lookup_index in gsub.lookups_for_tag(tag) {
                let Some(lookup) = gsub.lookup_list.lookups.get(lookup_index) else {
                    warn!(
                        "feature '{}' refers to missing lookup {}",
                        DisplayTag(tag),
                        lookup_index
                    );
                    continue;
                };
                for (source, target) in lookup.pairs() {
                    let (Some(source), Some(target)) = (
                        self.glyph_order.get(usize::from(source)),
                        self.glyph_order.get(usize::from(target)),
                    ) else {
                        continue;
                    };
                    substitutions.pairs.push(Substitution {
                        source: source.clone(),
                        target: target.clone(),
                        tag,
                    });
                    *substitutions.per_tag.entry(tag).or_insert(0) += 1;
                }
            }
        }

        substitutions
    }

    fn read_gsub(&self) -> Option<LayoutTable> {
        let result = self.sfnt.with_provider(|provider| {
            provider
                .table_data(tag::GSUB)?
                .map(|data| ReadScope::new(data).read::<LayoutTable>())
                .transpose()
        });
        match result {
            Ok(gsub) => gsub,
            Err(err) => {
                warn!("unable to read GSUB table: {}", err);
                None
            }
        }
    }
}

type Names = (Vec<String>, BTreeMap<u32, String>);

fn read_names(provider: &OffsetTableFontProvider<'_>) -> Result<Names, ParseError> {
    let maxp = ReadScope::new(provider.read_table_data(tag::MAXP)?).read::<MaxpTable>()?;

    let post = match provider.table_data(tag::POST)? {
        Some(data) => ReadScope::new(data)
            .read::<PostTable<'_>>()
            .map_err(|err| warn!("unable to read post table: {}", err))
            .ok(),
        None => None,
    };
    let cff = match provider.table_data(tag::CFF)? {
        Some(data) => ReadScope::new(data)
            .read::<CFF<'_>>()
            .map_err(|err| warn!("unable to read CFF table: {}", err))
            .ok(),
        None => None,
    };
    let cmap_subtable = match provider.table_data(tag::CMAP)? {
        Some(data) => ReadScope::new(data).read::<Cmap<'_>>()?.best_subtable(),
        None => None,
    };

    let names = GlyphNames::new(cmap_subtable.as_ref(), post.as_ref(), cff.as_ref());
    let glyph_order = names.unique_glyph_names(maxp.num_glyphs);

    let mut cmap = BTreeMap::new();
    if let Some((_encoding, subtable)) = &cmap_subtable {
        match subtable.mappings() {
            Ok(mappings) => {
                for (ch, gid) in mappings {
                    if let Some(name) = glyph_order.get(usize::from(gid)) {
                        cmap.insert(ch, name.clone());
                    }
                }
            }
            Err(err) => warn!("unable to read cmap mappings: {}", err),
        }
    }

    Ok((glyph_order, cmap))
}
