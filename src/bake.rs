//! Baking stylistic alternates into their base glyphs.
//!
//! Substitutions come from three places: the `GSUB` table of the binary font file, the lookups of
//! the editable font, and glyphs named `<base>.<suffix>`. They are collected into one list of
//! candidates and baked with the same primitive. The lookups for baked features are removed
//! afterwards.

use std::collections::{BTreeMap, BTreeSet};

use itertools::Itertools;
use lazy_static::lazy_static;
use log::{debug, info, warn};
use rustc_hash::FxHashSet;

use crate::cid::cid_from_glyph_name;
use crate::error::FontError;
use crate::feature_table::FeatureTableFile;
use crate::font::{Affine, EditableFont, SelectionGuard, Slot};
use crate::ranges::{RangeSet, DIGIT};
use crate::resolve::{swallow, SlotResolver};
use crate::tag::DisplayTag;
use crate::transform::round_width;

/// Math symbols raised by the case baseline offset.
pub const MATH_CASE: [u32; 13] = [
    0x2212, 0x002B, 0x00F7, 0x00B1, 0x00D7, 0x003D, 0x2260, 0x2248, 0x007E, 0x003C, 0x003E,
    0x2264, 0x2265,
];

/// Brackets and guillemets raised by the case baseline offset.
pub const BRACKET_CASE: [u32; 12] = [
    0x0028, 0x0029, 0x003C, 0x003E, 0x007B, 0x007D, 0x005B, 0x005D, 0x00AB, 0x00BB, 0x2039,
    0x203A,
];

/// Dashes and arrows raised by the case baseline offset.
pub const DASH_CASE: [u32; 8] = [
    0x002D, 0x2013, 0x2014, 0x2192, 0x2190, 0x27F6, 0x27F5, 0x27FA,
];

/// Name of the glyph baked into both zeros when slashed zero is on.
pub const SLASHED_ZERO: &str = "zero.slash";

lazy_static! {
    /// Codepoints with their own baseline handling, never replaced by an alternate.
    static ref CASE_PROTECT: FxHashSet<u32> =
        BRACKET_CASE.iter().chain(DASH_CASE.iter()).copied().collect();
}

/// True if alternates must not replace the glyph for `codepoint`.
pub fn is_protected(protect: &RangeSet, codepoint: u32) -> bool {
    protect.contains(codepoint) || CASE_PROTECT.contains(&codepoint) || DIGIT.contains(codepoint)
}

/// Where a substitution was found.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CandidateSource {
    /// The `GSUB` table of the binary font file.
    Direct,
    /// A lookup of the editable font.
    Coverage,
    /// A glyph named after its base glyph plus a suffix.
    Suffix,
}

/// A base glyph and the alternate to bake over it, by name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubstitutionCandidate {
    pub base: String,
    pub alternate: String,
    /// Feature tag or suffix the pair was found under.
    pub tag: String,
    pub source: CandidateSource,
}

/// What to bake.
#[derive(Debug, Clone, Copy)]
pub struct BakeRequest<'a> {
    /// Features whose substitutions are baked.
    pub target_tags: &'a BTreeSet<u32>,
    /// Suffixes probed on every mapped glyph.
    pub suffixes: &'a [String],
    /// Codepoint ranges whose glyphs keep their default form.
    pub protect: &'a RangeSet,
    pub slashed_zero: bool,
}

/// Outcome of [`bake_alternates`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BakeReport {
    pub direct: usize,
    pub coverage: usize,
    pub suffix: usize,
    pub slashed_zero: usize,
    /// Candidates skipped because their base glyph is protected.
    pub protected: usize,
    /// Baked glyphs by feature tag or suffix.
    pub per_tag: BTreeMap<String, usize>,
    /// Pairs found in the binary font file by feature tag.
    pub binary_pairs: BTreeMap<u32, usize>,
    /// Feature tags present in the binary font file or the editable font.
    pub tags_seen: BTreeSet<u32>,
    /// Requested tags that were present in neither.
    pub missing_tags: BTreeSet<u32>,
}

impl BakeReport {
    fn record(&mut self, candidate: &SubstitutionCandidate) {
        match candidate.source {
            CandidateSource::Direct => self.direct += 1,
            CandidateSource::Coverage => self.coverage += 1,
            CandidateSource::Suffix => self.suffix += 1,
        }
        *self.per_tag.entry(candidate.tag.clone()).or_insert(0) += 1;
    }
}

/// Substitutions of `tags` in the `GSUB` table of `file`.
pub fn direct_candidates(
    file: &FeatureTableFile,
    tags: &BTreeSet<u32>,
) -> (Vec<SubstitutionCandidate>, BTreeMap<u32, usize>) {
    let substitutions = file.substitutions(tags);
    let candidates = substitutions
        .pairs
        .into_iter()
        .map(|pair| SubstitutionCandidate {
            base: pair.source,
            alternate: pair.target,
            tag: DisplayTag(pair.tag).to_string(),
            source: CandidateSource::Direct,
        })
        .collect();
    (candidates, substitutions.per_tag)
}

/// Coverage of the lookups of `font` that belong to any of `tags`.
pub fn coverage_candidates<F: EditableFont + ?Sized>(
    font: &F,
    tags: &BTreeSet<u32>,
) -> Vec<SubstitutionCandidate> {
    let mut candidates = Vec::new();
    for lookup in font.gsub_lookups() {
        let lookup_tags = swallow("lookup_feature_tags", font.lookup_feature_tags(&lookup))
            .unwrap_or_default();
        let Some(&tag) = lookup_tags.iter().find(|tag| tags.contains(tag)) else {
            continue;
        };
        let coverage =
            swallow("lookup_coverage", font.lookup_coverage(&lookup)).unwrap_or_default();
        candidates.extend(coverage.into_iter().map(|(base, alternate)| {
            SubstitutionCandidate {
                base,
                alternate,
                tag: DisplayTag(tag).to_string(),
                source: CandidateSource::Coverage,
            }
        }));
    }
    candidates
}

/// Pairs of mapped drawable glyphs and existing glyphs named `<name>.<suffix>`. Digits are
/// skipped.
pub fn suffix_candidates<F: EditableFont + ?Sized>(
    font: &F,
    suffixes: &[String],
) -> Vec<SubstitutionCandidate> {
    let mut candidates = Vec::new();
    for slot in font.slots() {
        let Some(glyph) = font.glyph(slot) else {
            continue;
        };
        let mapped = glyph.unicode.map_or(false, |u| !DIGIT.contains(u));
        if !mapped || !glyph.is_drawable() || glyph.name.is_empty() {
            continue;
        }
        for suffix in suffixes {
            let alternate = format!("{}.{}", glyph.name, suffix);
            if font.slot_by_name(&alternate).is_some() {
                candidates.push(SubstitutionCandidate {
                    base: glyph.name.clone(),
                    alternate,
                    tag: suffix.clone(),
                    source: CandidateSource::Suffix,
                });
            }
        }
    }
    candidates
}

/// Find the glyph called `name`.
///
/// Names from a binary font file may not exist in the editable font, so the glyph order index,
/// a CID parsed from the name, and the codepoint the binary cmap maps to the name are tried in
/// turn.
fn pick<F: EditableFont + ?Sized>(
    resolver: &mut SlotResolver,
    font: &F,
    file: Option<&FeatureTableFile>,
    name: &str,
) -> Option<Slot> {
    if let Some(slot) = font.slot_by_name(name) {
        return Some(slot);
    }
    let file = file?;
    let index = file
        .glyph_index(name)
        .or_else(|| cid_from_glyph_name(name))
        .filter(|&index| font.glyph(index).is_some());
    if index.is_some() {
        return index;
    }
    let codepoint = file.codepoint_for_name(name)?;
    resolver.resolve(font, codepoint)
}

/// Replace the outline of `dst` with the outline of `src`, keeping the mapping and width of
/// `dst`. Alternate codepoints of `dst` are dropped.
pub fn overwrite_outline<F: EditableFont + ?Sized>(
    font: &mut F,
    dst: Slot,
    src: Slot,
) -> Result<(), FontError> {
    let glyph = font.glyph_mut(dst).ok_or(FontError::BadSlot(dst))?;
    let (unicode, width) = (glyph.unicode, glyph.width);
    glyph.clear();

    let mut font = SelectionGuard::new(font);
    font.select_none();
    font.select(src)?;
    let clipboard = font.copy_selection()?;
    font.select_none();
    font.select(dst)?;
    font.paste_into_selection(&clipboard)?;

    let glyph = font.glyph_mut(dst).ok_or(FontError::BadSlot(dst))?;
    glyph.unicode = unicode;
    glyph.width = width;
    glyph.alt_unicodes.clear();
    Ok(())
}

/// Bake each candidate whose base glyph is not protected and whose alternate is drawable.
pub fn bake_candidates<F: EditableFont + ?Sized>(
    resolver: &mut SlotResolver,
    font: &mut F,
    file: Option<&FeatureTableFile>,
    candidates: &[SubstitutionCandidate],
    protect: &RangeSet,
    report: &mut BakeReport,
) {
    for candidate in candidates {
        let (Some(base), Some(alternate)) = (
            pick(resolver, &*font, file, &candidate.base),
            pick(resolver, &*font, file, &candidate.alternate),
        ) else {
            continue;
        };
        if base == alternate {
            continue;
        }
        let unicode = font.glyph(base).and_then(|glyph| glyph.unicode);
        if unicode.map_or(false, |u| is_protected(protect, u)) {
            report.protected += 1;
            continue;
        }
        if !font.glyph(alternate).map_or(false, |glyph| glyph.is_drawable()) {
            continue;
        }
        if swallow("overwrite", overwrite_outline(font, base, alternate)).is_some() {
            debug!(
                "baked {} over {} ({:?} {})",
                candidate.alternate, candidate.base, candidate.source, candidate.tag
            );
            report.record(candidate);
        }
    }
}

/// Bake the glyph named `zero.slash` over both zeros. Returns the number of zeros changed.
pub fn bake_slashed_zero<F: EditableFont + ?Sized>(
    resolver: &mut SlotResolver,
    font: &mut F,
) -> usize {
    let Some(slashed) = font
        .slot_by_name(SLASHED_ZERO)
        .filter(|&slot| font.glyph(slot).map_or(false, |glyph| glyph.is_drawable()))
    else {
        return 0;
    };
    let mut baked = 0;
    for zero in [0x0030, 0xFF10] {
        if !resolver.has_glyph(&*font, zero) {
            continue;
        }
        let Some(slot) = resolver.resolve(&*font, zero) else {
            continue;
        };
        if swallow("overwrite", overwrite_outline(font, slot, slashed)).is_some() {
            baked += 1;
        }
    }
    baked
}

/// Feature tags of every lookup of `font`.
pub fn lookup_tags<F: EditableFont + ?Sized>(font: &F) -> BTreeSet<u32> {
    font.gsub_lookups()
        .iter()
        .filter_map(|lookup| swallow("lookup_feature_tags", font.lookup_feature_tags(lookup)))
        .flatten()
        .collect()
}

/// Bake the alternates requested by `request` into `font`.
///
/// `file` is the binary font `font` was opened from, if it could be parsed.
pub fn bake_alternates<F: EditableFont + ?Sized>(
    resolver: &mut SlotResolver,
    font: &mut F,
    file: Option<&FeatureTableFile>,
    request: BakeRequest<'_>,
) -> BakeReport {
    let mut report = BakeReport::default();

    let mut candidates = Vec::new();
    if let Some(file) = file {
        let (direct, binary_pairs) = direct_candidates(file, request.target_tags);
        candidates.extend(direct);
        report.binary_pairs = binary_pairs;
    }
    candidates.extend(coverage_candidates(&*font, request.target_tags));
    candidates.extend(suffix_candidates(&*font, request.suffixes));
    bake_candidates(resolver, font, file, &candidates, request.protect, &mut report);

    if request.slashed_zero {
        report.slashed_zero = bake_slashed_zero(resolver, font);
    }

    report.tags_seen = lookup_tags(&*font);
    if let Some(file) = file {
        report.tags_seen.extend(file.feature_tags());
    }
    report.missing_tags = request
        .target_tags
        .difference(&report.tags_seen)
        .copied()
        .collect();
    if !report.missing_tags.is_empty() {
        warn!(
            "feature tags not found to bake: {}",
            report.missing_tags.iter().map(|&tag| DisplayTag(tag)).join(", ")
        );
    }
    report
}

/// Remove every lookup of `font` that belongs to any of `tags`. Returns the number removed.
pub fn strip_lookups<F: EditableFont + ?Sized>(font: &mut F, tags: &BTreeSet<u32>) -> usize {
    let mut removed = 0;
    for lookup in font.gsub_lookups() {
        let lookup_tags = swallow("lookup_feature_tags", font.lookup_feature_tags(&lookup))
            .unwrap_or_default();
        if !lookup_tags.iter().any(|tag| tags.contains(tag)) {
            continue;
        }
        if swallow("remove_lookup", font.remove_lookup(&lookup)).is_some() {
            debug!("removed lookup {}", lookup);
            removed += 1;
        }
    }
    removed
}

/// Baseline offsets for the case categories, in percent of the em.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct CaseOffsets {
    pub math: f64,
    pub bracket: f64,
    pub dash: f64,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum CaseCategory {
    Math,
    Bracket,
    Dash,
}

/// Glyphs raised per category by [`apply_case_offsets`].
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct CaseReport {
    pub math: usize,
    pub bracket: usize,
    pub dash: usize,
}

/// Raise the math, bracket and dash glyphs of `font`.
///
/// Offsets are rounded to font units. A codepoint in several categories takes the offset of the
/// last one in the order math, bracket, dash. Categories with a zero offset are left alone.
pub fn apply_case_offsets<F: EditableFont + ?Sized>(
    resolver: &mut SlotResolver,
    font: &mut F,
    offsets: CaseOffsets,
) -> CaseReport {
    let upm = f64::from(font.units_per_em());
    let units = |pct: f64| round_width(pct / 100.0 * upm);

    let mut targets = BTreeMap::new();
    let categories = [
        (CaseCategory::Math, &MATH_CASE[..], units(offsets.math)),
        (CaseCategory::Bracket, &BRACKET_CASE[..], units(offsets.bracket)),
        (CaseCategory::Dash, &DASH_CASE[..], units(offsets.dash)),
    ];
    for (category, codepoints, dy) in categories {
        if dy == 0 {
            continue;
        }
        for &codepoint in codepoints {
            targets.insert(codepoint, (category, dy));
        }
    }

    let mut report = CaseReport::default();
    for (codepoint, (category, dy)) in targets {
        let Some(slot) = resolver.resolve(&*font, codepoint) else {
            continue;
        };
        let Some(glyph) = font.glyph_mut(slot).filter(|glyph| glyph.is_drawable()) else {
            continue;
        };
        glyph.transform(&Affine::translate(0.0, f64::from(dy)));
        match category {
            CaseCategory::Math => report.math += 1,
            CaseCategory::Bracket => report.bracket += 1,
            CaseCategory::Dash => report.dash += 1,
        }
    }
    info!(
        "case offsets: math={} bracket={} dash={}",
        report.math, report.bracket, report.dash
    );
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::font::{Glyph, Outline};
    use crate::memory::{MemoryFont, MemoryFontBuilder};
    use crate::tag;
    use crate::tests::square;

    fn drawn(name: &str, unicode: Option<u32>, size: f64) -> Glyph {
        let mut glyph = Glyph::new(name, unicode);
        glyph.outline.contours.push(square(0.0, 0.0, size));
        glyph.width = 600;
        glyph
    }

    fn outline_of(font: &MemoryFont, name: &str) -> Outline {
        font.glyph_by_name(name).unwrap().outline.clone()
    }

    fn font_with_alternates() -> MemoryFont {
        MemoryFontBuilder::new("Base", 1000)
            .glyph(drawn("A", Some(0x41), 100.0))
            .glyph(drawn("A.ss01", None, 110.0))
            .glyph(drawn("B", Some(0x42), 100.0))
            .glyph(drawn("B.ss02", None, 120.0))
            .glyph(drawn("parenleft", Some(0x28), 100.0))
            .glyph(drawn("parenleft.ss01", None, 130.0))
            .glyph(drawn("zero", Some(0x30), 100.0))
            .glyph(drawn("zero.ss01", None, 140.0))
            .glyph(drawn("zero.slash", None, 150.0))
            .lookup(
                "'ss01' single",
                &[tag::SS01],
                &[("A", "A.ss01"), ("parenleft", "parenleft.ss01")],
            )
            .lookup("'liga' ligatures", &[tag::from_string("liga").unwrap()], &[])
            .build()
    }

    #[test]
    fn test_bake_coverage_and_suffix() {
        let mut font = font_with_alternates();
        let alternate_a = outline_of(&font, "A.ss01");
        let alternate_b = outline_of(&font, "B.ss02");
        let paren = outline_of(&font, "parenleft");
        let tags = [tag::SS01, tag::SS02].into_iter().collect::<BTreeSet<_>>();
        let suffixes = vec![String::from("ss02")];
        let protect = RangeSet::from(vec![(0x2000, 0x206F)]);
        let request = BakeRequest {
            target_tags: &tags,
            suffixes: &suffixes,
            protect: &protect,
            slashed_zero: true,
        };
        let mut resolver = SlotResolver::new();

        let report = bake_alternates(&mut resolver, &mut font, None, request);
        assert_eq!(report.coverage, 1);
        assert_eq!(report.suffix, 1);
        assert_eq!(report.slashed_zero, 1);
        assert_eq!(report.protected, 1);
        assert_eq!(report.per_tag.get("ss01"), Some(&1));
        assert_eq!(report.per_tag.get("ss02"), Some(&1));
        assert_eq!(
            report.missing_tags,
            [tag::SS02].into_iter().collect::<BTreeSet<_>>()
        );

        let a = font.glyph_by_name("A").unwrap();
        assert_eq!(a.outline, alternate_a);
        assert_eq!((a.unicode, a.width), (Some(0x41), 600));
        assert_eq!(outline_of(&font, "B"), alternate_b);
        assert_eq!(outline_of(&font, "parenleft"), paren);
        assert_eq!(outline_of(&font, "zero"), outline_of(&font, "zero.slash"));

        assert_eq!(strip_lookups(&mut font, &tags), 1);
        assert_eq!(font.gsub_lookups(), vec![String::from("'liga' ligatures")]);
    }

    #[test]
    fn test_protect_ranges_block_baking() {
        let mut font = font_with_alternates();
        let before = outline_of(&font, "A");
        let tags = [tag::SS01].into_iter().collect::<BTreeSet<_>>();
        let suffixes = vec![String::from("ss01")];
        let protect = RangeSet::from(vec![(0x20, 0x7E)]);
        let request = BakeRequest {
            target_tags: &tags,
            suffixes: &suffixes,
            protect: &protect,
            slashed_zero: false,
        };
        let mut resolver = SlotResolver::new();

        let report = bake_alternates(&mut resolver, &mut font, None, request);
        assert_eq!(report.coverage + report.suffix, 0);
        assert_eq!(outline_of(&font, "A"), before);
        assert_ne!(outline_of(&font, "zero"), outline_of(&font, "zero.ss01"));
    }

    #[test]
    fn test_overwrite_outline_keeps_mapping() {
        let mut base = drawn("a", Some(0x61), 100.0);
        base.alt_unicodes.push(0x251);
        let mut font = MemoryFontBuilder::new("Base", 1000)
            .glyph(base)
            .glyph(drawn("a.alt", None, 50.0))
            .build();
        font.glyph_mut(2).unwrap().width = 480;

        overwrite_outline(&mut font, 1, 2).unwrap();
        let glyph = font.glyph(1).unwrap();
        assert_eq!(glyph.unicode, Some(0x61));
        assert_eq!(glyph.width, 600);
        assert!(glyph.alt_unicodes.is_empty());
        assert_eq!(glyph.outline, font.glyph(2).unwrap().outline);
    }

    #[test]
    fn test_case_offsets() {
        let mut font = MemoryFontBuilder::new("Base", 1000)
            .glyph(drawn("less", Some(0x3C), 100.0))
            .glyph(drawn("plus", Some(0x2B), 100.0))
            .glyph(drawn("hyphen", Some(0x2D), 100.0))
            .glyph(Glyph::new("endash", Some(0x2013)))
            .build();
        let mut resolver = SlotResolver::new();
        let offsets = CaseOffsets {
            math: 7.78,
            bracket: 7.0,
            dash: 0.0,
        };

        let report = apply_case_offsets(&mut resolver, &mut font, offsets);
        assert_eq!(
            report,
            CaseReport {
                math: 1,
                bracket: 1,
                dash: 0
            }
        );
        // '<' is both math and bracket, the bracket offset wins
        assert_eq!(font.glyph(1).unwrap().bbox().unwrap().y_min, 70.0);
        assert_eq!(font.glyph(2).unwrap().bbox().unwrap().y_min, 78.0);
        assert_eq!(font.glyph(3).unwrap().bbox().unwrap().y_min, 0.0);
    }
}
