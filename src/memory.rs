//! An in-memory font engine.
//!
//! Fonts are loaded from TrueType or CFF flavoured OpenType files, or assembled with
//! [`MemoryFontBuilder`]. Glyph outlines from `glyf` are decoded into contours. CFF charstrings
//! are kept opaque and only track the transforms applied to them. CID-keyed CFF fonts get one
//! slot space per Font DICT, addressed by CID.
//!
//! `generate` writes a plain text description of the font rather than a binary font file.

use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

use log::{debug, warn};
use rustc_hash::{FxHashMap, FxHashSet};
use tinyvec::TinyVec;

use crate::binary::read::ReadScope;
use crate::cff::{self, CFF};
use crate::error::{FontError, ParseError};
use crate::font::{
    Affine, Charstring, Clipboard, Contour, EditableFont, FontEngine, FontId, Glyph, Outline,
    OutlinePoint, Reference, Slot, TransformOptions,
};
use crate::glyph_info::GlyphNames;
use crate::layout::LayoutTable;
use crate::post::PostTable;
use crate::tables::cmap::Cmap;
use crate::tables::glyf::{self, GlyfTable};
use crate::tables::kern::KernTable;
use crate::tables::loca::LocaTable;
use crate::tables::{
    FontTableProvider, HeadTable, HheaTable, HmtxTable, MaxpTable, OffsetTableFontProvider,
    OpenTypeFont,
};
use crate::tag::{self, DisplayTag};

/// Composite glyphs nested deeper than this are not resolved.
const MAX_COMPONENT_DEPTH: usize = 8;

/// A kerning pair by glyph name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KernValue {
    pub left: String,
    pub right: String,
    pub value: i32,
}

#[derive(Debug, Clone)]
struct Subfont {
    font_name: Option<String>,
    full_name: Option<String>,
    glyphs: Vec<Option<Glyph>>,
    names: FxHashMap<String, Slot>,
}

#[derive(Debug, Clone)]
struct Lookup {
    name: String,
    feature_tags: Vec<u32>,
    pairs: Vec<(String, String)>,
}

/// A font held entirely in memory.
#[derive(Debug, Clone)]
pub struct MemoryFont {
    id: FontId,
    family_name: String,
    full_name: String,
    font_name: String,
    name_records: BTreeMap<u16, String>,
    units_per_em: u16,
    cid_keyed: bool,
    subfonts: Vec<Subfont>,
    active: usize,
    /// Codepoint to slot for flat fonts. Entries outlive changes to a glyph's mapping.
    encoding: BTreeMap<u32, Slot>,
    selection: Vec<Slot>,
    lookups: Vec<Lookup>,
    kerning: Vec<KernValue>,
    combined_transforms: bool,
}

impl Subfont {
    fn new(font_name: Option<String>, full_name: Option<String>) -> Subfont {
        Subfont {
            font_name,
            full_name,
            glyphs: Vec::new(),
            names: FxHashMap::default(),
        }
    }

    fn insert(&mut self, slot: Slot, glyph: Glyph) {
        if self.glyphs.len() <= slot {
            self.glyphs.resize(slot + 1, None);
        }
        self.names.insert(glyph.name.clone(), slot);
        self.glyphs[slot] = Some(glyph);
    }

    fn slot_by_name(&self, name: &str) -> Option<Slot> {
        match self.names.get(name) {
            Some(&slot) if self.glyph_named(slot, name) => Some(slot),
            // A glyph may have been renamed through `glyph_mut`
            _ => (0..self.glyphs.len()).find(|&slot| self.glyph_named(slot, name)),
        }
    }

    fn glyph_named(&self, slot: Slot, name: &str) -> bool {
        matches!(self.glyphs.get(slot), Some(Some(glyph)) if glyph.name == name)
    }
}

impl MemoryFont {
    fn empty(family: &str, units_per_em: u16) -> MemoryFont {
        MemoryFont {
            id: FontId::next(),
            family_name: family.to_owned(),
            full_name: family.to_owned(),
            font_name: family.replace(' ', ""),
            name_records: BTreeMap::new(),
            units_per_em,
            cid_keyed: false,
            subfonts: vec![Subfont::new(None, None)],
            active: 0,
            encoding: BTreeMap::new(),
            selection: Vec::new(),
            lookups: Vec::new(),
            kerning: Vec::new(),
            combined_transforms: true,
        }
    }

    /// Read and load the font at `path`.
    pub fn open(path: impl AsRef<Path>) -> Result<MemoryFont, FontError> {
        let data = fs::read(path)?;
        Ok(MemoryFont::from_bytes(&data)?)
    }

    /// Load the first font in `data`.
    pub fn from_bytes(data: &[u8]) -> Result<MemoryFont, ParseError> {
        let otf = ReadScope::new(data).read::<OpenTypeFont<'_>>()?;
        let provider = otf.table_provider(0)?;
        load(&provider)
    }

    /// A copy of this font with a new identity.
    pub fn reopen(&self) -> MemoryFont {
        let mut font = self.clone();
        font.id = FontId::next();
        font.selection.clear();
        font
    }

    pub fn family_name(&self) -> &str {
        &self.family_name
    }

    pub fn is_cid_keyed(&self) -> bool {
        self.cid_keyed
    }

    pub fn name_record(&self, name_id: u16) -> Option<&str> {
        self.name_records.get(&name_id).map(String::as_str)
    }

    pub fn kerning(&self) -> &[KernValue] {
        &self.kerning
    }

    /// Allow or refuse transforms that adjust kerning and anchors.
    pub fn set_combined_transforms(&mut self, enabled: bool) {
        self.combined_transforms = enabled;
    }

    /// Find a glyph by name in the active slot space.
    pub fn glyph_by_name(&self, name: &str) -> Option<&Glyph> {
        self.slot_by_name(name).and_then(|slot| self.glyph(slot))
    }

    /// Add a glyph to the active slot space of a flat font, encoding its codepoints.
    pub fn push_glyph(&mut self, glyph: Glyph) -> Slot {
        let subfont = &mut self.subfonts[self.active];
        let slot = subfont.glyphs.len();
        if !self.cid_keyed {
            for &codepoint in glyph.unicode.iter().chain(glyph.alt_unicodes.iter()) {
                self.encoding.entry(codepoint).or_insert(slot);
            }
        }
        subfont.insert(slot, glyph);
        slot
    }

    fn active_subfont_ref(&self) -> &Subfont {
        &self.subfonts[self.active]
    }

    fn unused_name(&self, codepoint: u32) -> String {
        let subfont = self.active_subfont_ref();
        let candidates = [
            glyph_names::glyph_name(codepoint).map(|name| name.into_owned()),
            Some(uni_name(codepoint)),
        ];
        candidates
            .into_iter()
            .flatten()
            .find(|name| subfont.slot_by_name(name).is_none())
            .unwrap_or_else(|| format!("{}.{}", uni_name(codepoint), subfont.glyphs.len()))
    }

    fn lookup(&self, name: &str) -> Result<&Lookup, FontError> {
        self.lookups
            .iter()
            .find(|lookup| lookup.name == name)
            .ok_or_else(|| FontError::BadLookup(name.to_owned()))
    }

    fn dump(&self) -> String {
        let mut out = String::new();
        // Writing to a String cannot fail
        let _ = self.write_dump(&mut out);
        out
    }

    fn write_dump(&self, out: &mut String) -> std::fmt::Result {
        writeln!(out, "family {}", self.family_name)?;
        writeln!(out, "fullname {}", self.full_name)?;
        writeln!(out, "fontname {}", self.font_name)?;
        writeln!(out, "upm {}", self.units_per_em)?;
        for (name_id, value) in &self.name_records {
            writeln!(out, "name {} {}", name_id, value)?;
        }
        for (index, subfont) in self.subfonts.iter().enumerate() {
            if self.cid_keyed {
                writeln!(
                    out,
                    "subfont {} {}",
                    index,
                    subfont.font_name.as_deref().unwrap_or("-")
                )?;
            }
            for (slot, glyph) in subfont.glyphs.iter().enumerate() {
                if let Some(glyph) = glyph {
                    write_glyph(out, slot, glyph)?;
                }
            }
        }
        for lookup in &self.lookups {
            let tags = lookup
                .feature_tags
                .iter()
                .map(|&tag| DisplayTag(tag).to_string())
                .collect::<Vec<_>>();
            writeln!(
                out,
                "lookup '{}' tags={} pairs={}",
                lookup.name,
                tags.join(","),
                lookup.pairs.len()
            )?;
        }
        for kern in &self.kerning {
            writeln!(out, "kern {} {} {}", kern.left, kern.right, kern.value)?;
        }
        Ok(())
    }
}

fn uni_name(codepoint: u32) -> String {
    if codepoint <= 0xFFFF {
        format!("uni{:04X}", codepoint)
    } else {
        format!("u{:05X}", codepoint)
    }
}

fn write_glyph(out: &mut String, slot: Slot, glyph: &Glyph) -> std::fmt::Result {
    write!(out, "glyph {} {} ", slot, glyph.name)?;
    match glyph.unicode {
        Some(codepoint) => write!(out, "U+{:04X}", codepoint)?,
        None => write!(out, "-")?,
    }
    for alt in &glyph.alt_unicodes {
        write!(out, " alt=U+{:04X}", alt)?;
    }
    writeln!(out, " width={}", glyph.width)?;
    for contour in &glyph.outline.contours {
        write!(out, "  contour")?;
        for point in contour {
            let marker = if point.on_curve { "" } else { "*" };
            write!(out, " {},{}{}", point.x, point.y, marker)?;
        }
        writeln!(out)?;
    }
    for reference in &glyph.outline.references {
        let m = &reference.transform;
        writeln!(
            out,
            "  ref {} [{} {} {} {} {} {}]",
            reference.glyph, m.xx, m.xy, m.yx, m.yy, m.dx, m.dy
        )?;
    }
    if let Some(charstring) = &glyph.outline.charstring {
        let m = &charstring.matrix;
        writeln!(
            out,
            "  charstring {} bytes [{} {} {} {} {} {}]",
            charstring.data.len(),
            m.xx,
            m.xy,
            m.yx,
            m.yy,
            m.dx,
            m.dy
        )?;
    }
    for anchor in &glyph.outline.anchors {
        writeln!(out, "  anchor {} {},{}", anchor.name, anchor.x, anchor.y)?;
    }
    Ok(())
}

impl EditableFont for MemoryFont {
    fn id(&self) -> FontId {
        self.id
    }

    fn units_per_em(&self) -> u16 {
        self.units_per_em
    }

    fn subfont_count(&self) -> usize {
        if self.cid_keyed {
            self.subfonts.len()
        } else {
            0
        }
    }

    fn active_subfont(&self) -> usize {
        self.active
    }

    fn set_active_subfont(&mut self, index: usize) -> Result<(), FontError> {
        if index >= self.subfonts.len() {
            return Err(FontError::BadSubfont(index));
        }
        if index != self.active {
            self.active = index;
            self.selection.clear();
        }
        Ok(())
    }

    fn font_name(&self) -> Option<&str> {
        if self.cid_keyed {
            self.active_subfont_ref().font_name.as_deref()
        } else {
            Some(&self.font_name)
        }
    }

    fn full_name(&self) -> Option<&str> {
        if self.cid_keyed {
            self.active_subfont_ref().full_name.as_deref()
        } else {
            Some(&self.full_name)
        }
    }

    fn slot_count(&self) -> usize {
        self.active_subfont_ref().glyphs.len()
    }

    fn glyph(&self, slot: Slot) -> Option<&Glyph> {
        self.active_subfont_ref().glyphs.get(slot)?.as_ref()
    }

    fn glyph_mut(&mut self, slot: Slot) -> Option<&mut Glyph> {
        self.subfonts[self.active].glyphs.get_mut(slot)?.as_mut()
    }

    fn find_slot(&self, codepoint: u32) -> Result<Option<Slot>, FontError> {
        if !self.cid_keyed {
            let slot = self.encoding.get(&codepoint).copied();
            return Ok(slot.filter(|&slot| self.glyph(slot).is_some()));
        }

        // CID fonts have no encoding, search the active subfont instead
        let glyphs = &self.active_subfont_ref().glyphs;
        let primary = glyphs.iter().position(|glyph| {
            matches!(glyph, Some(glyph) if glyph.unicode == Some(codepoint))
        });
        Ok(primary.or_else(|| {
            glyphs.iter().position(|glyph| {
                matches!(glyph, Some(glyph) if glyph.alt_unicodes.contains(&codepoint))
            })
        }))
    }

    fn slot_by_name(&self, name: &str) -> Option<Slot> {
        self.active_subfont_ref().slot_by_name(name)
    }

    fn create_glyph_for_codepoint(&mut self, codepoint: u32) -> Result<Slot, FontError> {
        if self.cid_keyed {
            return Err(FontError::Unsupported("creating glyphs in a CID-keyed font"));
        }
        if let Some(&slot) = self.encoding.get(&codepoint) {
            if self.glyph(slot).is_none() {
                let name = self.unused_name(codepoint);
                self.subfonts[self.active].insert(slot, Glyph::new(name, Some(codepoint)));
            }
            return Ok(slot);
        }

        let name = self.unused_name(codepoint);
        Ok(self.push_glyph(Glyph::new(name, Some(codepoint))))
    }

    fn select_none(&mut self) {
        self.selection.clear();
    }

    fn select(&mut self, slot: Slot) -> Result<(), FontError> {
        if slot >= self.slot_count() {
            return Err(FontError::BadSlot(slot));
        }
        if !self.selection.contains(&slot) {
            self.selection.push(slot);
        }
        Ok(())
    }

    fn select_all(&mut self) {
        self.selection = self.slots();
    }

    fn selection(&self) -> Vec<Slot> {
        self.selection.clone()
    }

    fn set_selection(&mut self, slots: Vec<Slot>) -> Result<(), FontError> {
        if let Some(&slot) = slots.iter().find(|&&slot| slot >= self.slot_count()) {
            return Err(FontError::BadSlot(slot));
        }
        self.selection = slots;
        Ok(())
    }

    fn copy_selection(&self) -> Result<Clipboard, FontError> {
        let entries = self
            .selection
            .iter()
            .map(|&slot| {
                self.glyph(slot)
                    .map(|glyph| (glyph.outline.clone(), glyph.width))
                    .ok_or(FontError::BadSlot(slot))
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Clipboard::new(entries))
    }

    fn paste_into_selection(&mut self, clipboard: &Clipboard) -> Result<(), FontError> {
        if clipboard.is_empty() {
            return Err(FontError::EmptyClipboard);
        }
        for (index, slot) in self.selection.clone().into_iter().enumerate() {
            let Some((outline, width)) = clipboard.entry(index) else {
                break;
            };
            let glyph = self.glyph_mut(slot).ok_or(FontError::BadSlot(slot))?;
            glyph.outline = outline.clone();
            glyph.width = *width;
        }
        Ok(())
    }

    fn transform_selection(
        &mut self,
        matrix: &Affine,
        options: TransformOptions,
    ) -> Result<(), FontError> {
        let combined = TransformOptions::KERNING | TransformOptions::POSITIONING;
        if options.intersects(combined) && !self.combined_transforms {
            return Err(FontError::Unsupported("combined transform"));
        }

        let mut transformed = FxHashSet::default();
        for slot in self.selection.clone() {
            if let Some(glyph) = self.glyph_mut(slot) {
                glyph.transform_with_options(matrix, options);
                transformed.insert(glyph.name.clone());
            }
        }

        if options.contains(TransformOptions::KERNING) {
            for kern in &mut self.kerning {
                if transformed.contains(&kern.left) {
                    kern.value = (f64::from(kern.value) * matrix.xx).round_ties_even() as i32;
                }
            }
        }
        Ok(())
    }

    fn gsub_lookups(&self) -> Vec<String> {
        self.lookups.iter().map(|lookup| lookup.name.clone()).collect()
    }

    fn lookup_feature_tags(&self, lookup: &str) -> Result<Vec<u32>, FontError> {
        self.lookup(lookup).map(|lookup| lookup.feature_tags.clone())
    }

    fn lookup_coverage(&self, lookup: &str) -> Result<Vec<(String, String)>, FontError> {
        self.lookup(lookup).map(|lookup| lookup.pairs.clone())
    }

    fn remove_lookup(&mut self, lookup: &str) -> Result<(), FontError> {
        let index = self
            .lookups
            .iter()
            .position(|candidate| candidate.name == lookup)
            .ok_or_else(|| FontError::BadLookup(lookup.to_owned()))?;
        self.lookups.remove(index);
        Ok(())
    }

    fn set_font_names(&mut self, family: &str, full: &str, postscript: &str) {
        self.family_name = family.to_owned();
        self.full_name = full.to_owned();
        self.font_name = postscript.to_owned();
    }

    fn clear_name_records(&mut self) {
        self.name_records.clear();
    }

    fn set_name_record(&mut self, name_id: u16, value: &str) {
        self.name_records.insert(name_id, value.to_owned());
    }

    fn generate(&self, path: &Path) -> Result<(), FontError> {
        fs::write(path, self.dump())?;
        Ok(())
    }
}

/// Assembles a [`MemoryFont`] glyph by glyph.
pub struct MemoryFontBuilder {
    font: MemoryFont,
}

impl MemoryFontBuilder {
    /// A flat font containing only `.notdef`.
    pub fn new(family: &str, units_per_em: u16) -> MemoryFontBuilder {
        let mut font = MemoryFont::empty(family, units_per_em);
        font.push_glyph(Glyph::new(".notdef", None));
        MemoryFontBuilder { font }
    }

    /// An empty CID-keyed font with one subfont per name.
    pub fn cid(family: &str, units_per_em: u16, subfont_names: &[&str]) -> MemoryFontBuilder {
        let mut font = MemoryFont::empty(family, units_per_em);
        font.cid_keyed = true;
        font.subfonts = subfont_names
            .iter()
            .map(|&name| Subfont::new(Some(name.to_owned()), Some(name.to_owned())))
            .collect();
        MemoryFontBuilder { font }
    }

    /// Add a glyph to a flat font.
    pub fn glyph(mut self, glyph: Glyph) -> Self {
        self.font.push_glyph(glyph);
        self
    }

    /// Add a glyph to a subfont of a CID-keyed font.
    pub fn cid_glyph(mut self, subfont: usize, cid: Slot, glyph: Glyph) -> Self {
        match self.font.subfonts.get_mut(subfont) {
            Some(subfont) => subfont.insert(cid, glyph),
            None => warn!("no subfont {} for glyph {}", subfont, glyph.name),
        }
        self
    }

    pub fn lookup(mut self, name: &str, feature_tags: &[u32], pairs: &[(&str, &str)]) -> Self {
        self.font.lookups.push(Lookup {
            name: name.to_owned(),
            feature_tags: feature_tags.to_vec(),
            pairs: pairs
                .iter()
                .map(|&(source, target)| (source.to_owned(), target.to_owned()))
                .collect(),
        });
        self
    }

    pub fn kern(mut self, left: &str, right: &str, value: i32) -> Self {
        self.font.kerning.push(KernValue {
            left: left.to_owned(),
            right: right.to_owned(),
            value,
        });
        self
    }

    pub fn combined_transforms(mut self, enabled: bool) -> Self {
        self.font.combined_transforms = enabled;
        self
    }

    pub fn build(self) -> MemoryFont {
        self.font
    }
}

/// Opens [`MemoryFont`]s from files, or from fonts registered under a path.
#[derive(Default)]
pub struct MemoryEngine {
    registered: FxHashMap<PathBuf, MemoryFont>,
    open_fonts: usize,
    peak_open_fonts: usize,
    garbage_collections: usize,
}

impl MemoryEngine {
    pub fn new() -> MemoryEngine {
        MemoryEngine::default()
    }

    /// Serve a copy of `font` whenever `path` is opened.
    pub fn register(&mut self, path: impl Into<PathBuf>, font: MemoryFont) {
        self.registered.insert(path.into(), font);
    }

    /// The most fonts that were open at the same time.
    pub fn peak_open_fonts(&self) -> usize {
        self.peak_open_fonts
    }

    pub fn open_fonts(&self) -> usize {
        self.open_fonts
    }

    pub fn garbage_collections(&self) -> usize {
        self.garbage_collections
    }
}

impl FontEngine for MemoryEngine {
    type Font = MemoryFont;

    fn open(&mut self, path: &Path) -> Result<MemoryFont, FontError> {
        let font = match self.registered.get(path) {
            Some(font) => font.reopen(),
            None => MemoryFont::open(path)?,
        };
        self.open_fonts += 1;
        self.peak_open_fonts = self.peak_open_fonts.max(self.open_fonts);
        debug!("opened {} as {}", path.display(), font.id());
        Ok(font)
    }

    fn close(&mut self, font: MemoryFont) {
        self.open_fonts = self.open_fonts.saturating_sub(1);
        debug!("closed {}", font.id());
    }

    fn collect_garbage(&mut self) {
        self.garbage_collections += 1;
    }
}

fn load(provider: &OffsetTableFontProvider<'_>) -> Result<MemoryFont, ParseError> {
    let head = ReadScope::new(provider.read_table_data(tag::HEAD)?).read::<HeadTable>()?;
    let maxp = ReadScope::new(provider.read_table_data(tag::MAXP)?).read::<MaxpTable>()?;
    let num_glyphs = maxp.num_glyphs;

    let post = match provider.table_data(tag::POST)? {
        Some(data) => ReadScope::new(data)
            .read::<PostTable<'_>>()
            .map_err(|err| warn!("unable to read post table: {}", err))
            .ok(),
        None => None,
    };
    let cff = match provider.table_data(tag::CFF)? {
        Some(data) => Some(ReadScope::new(data).read::<CFF<'_>>()?),
        None => None,
    };
    let cmap_subtable = match provider.table_data(tag::CMAP)? {
        Some(data) => ReadScope::new(data).read::<Cmap<'_>>()?.best_subtable(),
        None => None,
    };

    let names = GlyphNames::new(cmap_subtable.as_ref(), post.as_ref(), cff.as_ref())
        .unique_glyph_names(num_glyphs);
    let widths = read_widths(provider, num_glyphs)?;
    let outlines = match &cff {
        Some(cff) => read_charstrings(cff, num_glyphs),
        None => read_glyf_outlines(provider, &head, num_glyphs, &names)?,
    };

    let mut codepoints: Vec<TinyVec<[u32; 2]>> = vec![TinyVec::new(); usize::from(num_glyphs)];
    let mut encoding = BTreeMap::new();
    if let Some((_encoding, subtable)) = &cmap_subtable {
        for (ch, glyph_id) in subtable.mappings()? {
            if let Some(list) = codepoints.get_mut(usize::from(glyph_id)) {
                list.push(ch);
                encoding.entry(ch).or_insert(usize::from(glyph_id));
            }
        }
    }

    let glyphs = names
        .iter()
        .zip(widths)
        .zip(outlines)
        .zip(codepoints)
        .map(|(((name, width), outline), mut codepoints)| {
            codepoints.sort_unstable();
            let unicode = codepoints.first().copied();
            Glyph {
                name: name.clone(),
                unicode,
                alt_unicodes: codepoints.iter().skip(1).copied().collect(),
                width,
                outline,
            }
        });

    let family = cff
        .as_ref()
        .and_then(|cff| cff.font_name(0))
        .unwrap_or("Untitled")
        .to_owned();
    let mut font = MemoryFont::empty(&family, head.units_per_em);
    font.font_name = family;

    match cff.as_ref().and_then(|cff| cff.fonts.first().map(|top| (cff, top))) {
        Some((cff, top)) if top.is_cid_keyed() => {
            font.cid_keyed = true;
            font.subfonts = cff
                .subfont_names(0)
                .into_iter()
                .map(|name| Subfont::new(name.clone(), name))
                .collect();
            for (glyph_id, glyph) in (0..num_glyphs).zip(glyphs) {
                let fd = top.font_dict_index(glyph_id);
                let (Some(fd), Some(cid)) = (fd, top.cid_for_glyph(glyph_id)) else {
                    continue;
                };
                match font.subfonts.get_mut(usize::from(fd)) {
                    Some(subfont) => subfont.insert(usize::from(cid), glyph),
                    None => warn!("glyph {} refers to missing Font DICT {}", glyph_id, fd),
                }
            }
        }
        _ => {
            for (slot, glyph) in glyphs.enumerate() {
                font.subfonts[0].insert(slot, glyph);
            }
            font.encoding = encoding;
        }
    }

    font.lookups = read_lookups(provider, &names)?;
    font.kerning = read_kerning(provider, &names)?;
    Ok(font)
}

fn read_widths(
    provider: &OffsetTableFontProvider<'_>,
    num_glyphs: u16,
) -> Result<Vec<i32>, ParseError> {
    let (Some(hhea_data), Some(hmtx_data)) = (
        provider.table_data(tag::HHEA)?,
        provider.table_data(tag::HMTX)?,
    ) else {
        return Ok(vec![0; usize::from(num_glyphs)]);
    };
    let hhea = ReadScope::new(hhea_data).read::<HheaTable>()?;
    let hmtx = ReadScope::new(hmtx_data).read_dep::<HmtxTable<'_>>((
        usize::from(num_glyphs),
        usize::from(hhea.num_h_metrics),
    ))?;
    (0..num_glyphs)
        .map(|glyph_id| hmtx.horizontal_advance(glyph_id).map(i32::from))
        .collect()
}

fn read_charstrings(cff: &CFF<'_>, num_glyphs: u16) -> Vec<Outline> {
    let Some(top) = cff.fonts.first() else {
        return vec![Outline::default(); usize::from(num_glyphs)];
    };
    (0..usize::from(num_glyphs))
        .map(|glyph_id| match top.char_strings_index.read_object(glyph_id) {
            Some(data) => Outline {
                charstring: Some(Charstring {
                    data: data.to_vec(),
                    matrix: Affine::IDENTITY,
                    draws: cff::charstring_has_contours(data),
                }),
                ..Outline::default()
            },
            None => Outline::default(),
        })
        .collect()
}

fn read_glyf_outlines(
    provider: &OffsetTableFontProvider<'_>,
    head: &HeadTable,
    num_glyphs: u16,
    names: &[String],
) -> Result<Vec<Outline>, ParseError> {
    let (Some(loca_data), Some(glyf_data)) = (
        provider.table_data(tag::LOCA)?,
        provider.table_data(tag::GLYF)?,
    ) else {
        return Ok(vec![Outline::default(); usize::from(num_glyphs)]);
    };
    let loca = ReadScope::new(loca_data)
        .read_dep::<LocaTable<'_>>((num_glyphs, head.index_to_loc_format))?;
    let glyf = ReadScope::new(glyf_data).read_dep::<GlyfTable<'_>>(&loca)?;

    let outlines = (0..glyf.num_glyphs())
        .map(|glyph_index| {
            let glyph = match glyf.glyph(glyph_index) {
                Ok(glyph) => glyph,
                Err(err) => {
                    warn!("unable to read glyph {}: {}", glyph_index, err);
                    None
                }
            };
            match glyph {
                Some(glyf::Glyph::Simple(simple)) => Outline {
                    contours: simple_contours(&simple),
                    ..Outline::default()
                },
                Some(glyf::Glyph::Composite(components)) => Outline {
                    references: components
                        .iter()
                        .map(|component| {
                            let glyph_index = usize::from(component.glyph_index);
                            Reference {
                                glyph: names.get(glyph_index).cloned().unwrap_or_default(),
                                transform: Affine::from_array(component.matrix()),
                                contours: resolve_contours(&glyf, glyph_index, 1),
                            }
                        })
                        .collect(),
                    ..Outline::default()
                },
                None => Outline::default(),
            }
        })
        .collect();
    Ok(outlines)
}

fn simple_contours(glyph: &glyf::SimpleGlyph) -> Vec<Contour> {
    glyph
        .contours()
        .map(|contour| {
            contour
                .into_iter()
                .map(|(glyf::Point(x, y), on_curve)| OutlinePoint {
                    x: f64::from(x),
                    y: f64::from(y),
                    on_curve,
                })
                .collect()
        })
        .collect()
}

/// The contours of `glyph_index` with all components flattened.
fn resolve_contours(glyf: &GlyfTable<'_>, glyph_index: usize, depth: usize) -> Vec<Contour> {
    if depth > MAX_COMPONENT_DEPTH {
        warn!("composite glyph nesting too deep at glyph {}", glyph_index);
        return Vec::new();
    }
    match glyf.glyph(glyph_index) {
        Ok(Some(glyf::Glyph::Simple(simple))) => simple_contours(&simple),
        Ok(Some(glyf::Glyph::Composite(components))) => components
            .iter()
            .flat_map(|component| {
                let matrix = Affine::from_array(component.matrix());
                resolve_contours(glyf, usize::from(component.glyph_index), depth + 1)
                    .into_iter()
                    .map(move |contour| {
                        contour
                            .into_iter()
                            .map(|point| {
                                let (x, y) = matrix.apply(point.x, point.y);
                                OutlinePoint { x, y, ..point }
                            })
                            .collect()
                    })
            })
            .collect(),
        Ok(None) => Vec::new(),
        Err(err) => {
            warn!("unable to read component glyph {}: {}", glyph_index, err);
            Vec::new()
        }
    }
}

fn read_lookups(
    provider: &OffsetTableFontProvider<'_>,
    names: &[String],
) -> Result<Vec<Lookup>, ParseError> {
    let Some(data) = provider.table_data(tag::GSUB)? else {
        return Ok(Vec::new());
    };
    let gsub = match ReadScope::new(data).read::<LayoutTable>() {
        Ok(gsub) => gsub,
        Err(err) => {
            warn!("unable to read GSUB table: {}", err);
            return Ok(Vec::new());
        }
    };

    let lookups = gsub
        .lookup_list
        .lookups
        .iter()
        .enumerate()
        .map(|(index, lookup)| {
            let feature_tags = gsub.lookup_feature_tags(index);
            let name = match feature_tags.first() {
                Some(&tag) => format!("'{}' lookup {}", DisplayTag(tag), index),
                None => format!("lookup {}", index),
            };
            let pairs = lookup
                .pairs()
                .into_iter()
                .filter_map(|(source, target)| {
                    let source = names.get(usize::from(source))?;
                    let target = names.get(usize::from(target))?;
                    Some((source.clone(), target.clone()))
                })
                .collect();
            Lookup {
                name,
                feature_tags,
                pairs,
            }
        })
        .collect();
    Ok(lookups)
}

fn read_kerning(
    provider: &OffsetTableFontProvider<'_>,
    names: &[String],
) -> Result<Vec<KernValue>, ParseError> {
    let Some(data) = provider.table_data(tag::KERN)? else {
        return Ok(Vec::new());
    };
    let kern = ReadScope::new(data).read::<KernTable<'_>>()?;
    let pairs = kern
        .horizontal_pairs()?
        .into_iter()
        .filter_map(|pair| {
            Some(KernValue {
                left: names.get(usize::from(pair.left))?.clone(),
                right: names.get(usize::from(pair.right))?.clone(),
                value: i32::from(pair.value),
            })
        })
        .collect();
    Ok(pairs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::square;
    use crate::tests::writer::{self, sfnt, TtfType::*};

    fn flat_font() -> MemoryFont {
        let mut a = Glyph::new("A", Some(0x41));
        a.width = 600;
        a.outline.contours.push(square(0.0, 0.0, 100.0));
        let mut alt = Glyph::new("A.ss01", None);
        alt.outline.contours.push(square(10.0, 10.0, 50.0));
        MemoryFontBuilder::new("Test Sans", 1000)
            .glyph(a)
            .glyph(alt)
            .lookup("'ss01' lookup 0", &[tag::SS01], &[("A", "A.ss01")])
            .kern("A", "A", -40)
            .build()
    }

    #[test]
    fn test_create_glyph_reuses_encoding_slot() {
        let mut font = flat_font();
        assert_eq!(font.find_slot(0x41).unwrap(), Some(1));

        font.glyph_mut(1).unwrap().unicode = None;
        // The encoding still places U+0041 in slot 1
        assert_eq!(font.create_glyph_for_codepoint(0x41).unwrap(), 1);

        let slot = font.create_glyph_for_codepoint(0x3042).unwrap();
        assert_eq!(slot, 3);
        assert_eq!(font.glyph(slot).unwrap().unicode, Some(0x3042));
        assert_eq!(font.find_slot(0x3042).unwrap(), Some(3));
    }

    #[test]
    fn test_copy_paste_between_fonts() {
        let source = flat_font();
        let mut dest = MemoryFontBuilder::new("Dest", 1000).build();
        let slot = dest.create_glyph_for_codepoint(0x41).unwrap();

        let mut source = source;
        source.select(2).unwrap();
        let clipboard = source.copy_selection().unwrap();
        dest.select_none();
        dest.select(slot).unwrap();
        dest.paste_into_selection(&clipboard).unwrap();

        let glyph = dest.glyph(slot).unwrap();
        assert_eq!(glyph.outline.contours, vec![square(10.0, 10.0, 50.0)]);
        assert_eq!(glyph.unicode, Some(0x41));
    }

    #[test]
    fn test_paste_empty_clipboard() {
        let mut font = flat_font();
        font.select(1).unwrap();
        assert!(matches!(
            font.paste_into_selection(&Clipboard::default()),
            Err(FontError::EmptyClipboard)
        ));
    }

    #[test]
    fn test_combined_transform_unsupported() {
        let mut font = flat_font();
        font.set_combined_transforms(false);
        font.select_all();
        let matrix = Affine::scale(0.5, 1.0);
        assert!(matches!(
            font.transform_selection(&matrix, TransformOptions::combined()),
            Err(FontError::Unsupported(_))
        ));
        font.transform_selection(&matrix, TransformOptions::empty())
            .unwrap();
        assert_eq!(font.glyph_by_name("A").unwrap().width, 300);
        assert_eq!(font.kerning()[0].value, -40);
    }

    #[test]
    fn test_kerning_scaled_only_for_transformed_glyphs() {
        let mut font = flat_font();
        font.kerning.push(KernValue {
            left: String::from("A.ss01"),
            right: String::from("A"),
            value: -30,
        });
        font.select(1).unwrap();
        font.transform_selection(&Affine::scale(0.5, 0.5), TransformOptions::combined())
            .unwrap();
        let values = font.kerning().iter().map(|kern| kern.value).collect::<Vec<_>>();
        assert_eq!(values, vec![-20, -30]);
    }

    #[test]
    fn test_lookups() {
        let mut font = flat_font();
        let lookups = font.gsub_lookups();
        assert_eq!(lookups, vec![String::from("'ss01' lookup 0")]);
        assert_eq!(
            font.lookup_coverage(&lookups[0]).unwrap(),
            vec![(String::from("A"), String::from("A.ss01"))]
        );
        font.remove_lookup(&lookups[0]).unwrap();
        assert!(font.gsub_lookups().is_empty());
        assert!(matches!(
            font.remove_lookup(&lookups[0]),
            Err(FontError::BadLookup(_))
        ));
    }

    #[test]
    fn test_cid_subfonts() {
        let mut glyph = Glyph::new("cid00843", Some(0x3042));
        glyph.outline.contours.push(square(0.0, 0.0, 10.0));
        let mut font = MemoryFontBuilder::cid("Test CID", 1000, &["Test-Generic", "Test-Kana"])
            .cid_glyph(1, 843, glyph)
            .build();

        assert_eq!(font.subfont_count(), 2);
        assert_eq!(font.font_name(), Some("Test-Generic"));
        assert_eq!(font.find_slot(0x3042).unwrap(), None);
        font.set_active_subfont(1).unwrap();
        assert_eq!(font.find_slot(0x3042).unwrap(), Some(843));
        assert!(font.set_active_subfont(2).is_err());
        assert!(font.create_glyph_for_codepoint(0x3043).is_err());
    }

    #[test]
    fn test_load_truetype() {
        let head = writer::convert(&[
            UInt32(0x00010000),
            UInt32(0),
            UInt32(0),
            UInt32(0x5F0F3CF5),
            UInt16(0),
            UInt16(1000), // unitsPerEm
            Raw(&[0; 16]),
            Int16(0),
            Int16(0),
            Int16(0),
            Int16(0),
            UInt16(0),
            UInt16(8),
            Int16(2),
            Int16(0), // indexToLocFormat
            Int16(0),
        ]);
        let maxp = writer::convert(&[UInt32(0x00005000), UInt16(2)]);
        let hhea = writer::convert(&[
            UInt32(0x00010000),
            Int16(800),
            Int16(-200),
            Int16(0),
            UInt16(600),
            Raw(&[0; 20]),
            Int16(0),
            UInt16(2), // numberOfHMetrics
        ]);
        let hmtx = writer::convert(&[UInt16(500), Int16(0), UInt16(600), Int16(0)]);
        // glyph 1: a triangle
        let glyf = writer::convert(&[
            Int16(1),
            Int16(0),
            Int16(0),
            Int16(100),
            Int16(100),
            UInt16(2), // endPtsOfContours
            UInt16(0), // instructionLength
            UInt8(0x31), // (0, 0)
            UInt8(0x33), // (100, 0)
            UInt8(0x27), // (50, 100)
            UInt8(100),
            UInt8(50),
            UInt8(100),
        ]);
        let loca = writer::convert(&[UInt16(0), UInt16(0), UInt16(10)]);
        // format 6: 'A' -> 1
        let cmap = writer::convert(&[
            UInt16(0),
            UInt16(1),
            UInt16(3),
            UInt16(1),
            UInt32(12),
            UInt16(6),
            UInt16(12),
            UInt16(0),
            UInt16(0x41),
            UInt16(1),
            UInt16(1),
        ]);
        let data = sfnt(
            TrueTypeMagic,
            &[
                (tag::CMAP, cmap),
                (tag::GLYF, glyf),
                (tag::HEAD, head),
                (tag::HHEA, hhea),
                (tag::HMTX, hmtx),
                (tag::LOCA, loca),
                (tag::MAXP, maxp),
            ],
        );

        let font = MemoryFont::from_bytes(&data).unwrap();
        assert_eq!(font.units_per_em(), 1000);
        assert!(!font.is_cid_keyed());
        let slot = font.find_slot(0x41).unwrap().unwrap();
        let glyph = font.glyph(slot).unwrap();
        assert_eq!(glyph.name, "A");
        assert_eq!(glyph.width, 600);
        assert!(glyph.is_drawable());
        assert_eq!(glyph.outline.contours[0].len(), 3);
        assert_eq!((glyph.outline.contours[0][2].x, glyph.outline.contours[0][2].y), (50.0, 100.0));
    }
}
