//! Build settings and the per-variant descriptors.

use std::collections::BTreeSet;
use std::path::PathBuf;

use log::warn;

use crate::bake::CaseOffsets;
use crate::ranges::RangeSet;
use crate::tag;
use crate::transform::Scale;

/// Characters the Japanese donor may supply outside its target ranges. Whitespace is ignored.
pub const JP_EXTRA_GLYPHS: &str = concat!(
    "㈱㈲㍿㍑㌔㌢㌦㌧㌫",
    "｡｢｣､",
    "♠♣♦",
    "∇∈∉⊂⊃⊆⊇∧∨¬",
    "々〻〆〇",
    "〰〽〒〠〓",
    "⓵⓶⓷⓸⓹",
    "㊀㊁㊂㊃㊄",
    "㈠㈡㈢㈣㈤",
    "─━│┃┌┏┐┓└┗┘┛├┣┤┫┬┳┴┻┼╋",
    "░▒▓█▁▂▃▄▅▆▇▉▊▋▌▍▎▏",
    "⤴⤵",
    "∓≡",
    "⇄⇆⇋⇌",
    "∩∪∴∵∝∟∠∃∀",
    "▫♤♧♢♡",
    "⊕⊗⊙⊠⊥⊖⊘",
    "┌┍┎┏┐┑┒┓└┕┖┗┘┙┚┛├┝┞┟┤┥┦┧",
    "┬┭┮┯┰┱┲┳┴┵┶┷┸┹┺┻┼┽┾┿╀╁╂╃╄╅╆╇╈╉╊╋",
    "▣▤▥▦▧▨▩▱✂",
    "ᆞᆢ",
);

/// Ranges whose glyphs are never replaced by baked alternates.
pub const GSUB_PROTECT: RangeSet = RangeSet::new(&[
    (0x0020, 0x007E), // Basic Latin
    (0x00A0, 0x00FF), // Latin-1 Supplement
    (0x0100, 0x017F), // Latin Extended-A
    (0x0180, 0x024F), // Latin Extended-B
    (0x1E00, 0x1EFF), // Latin Extended Additional
    (0x2000, 0x206F), // General Punctuation
    (0x20A0, 0x20CF), // Currency Symbols
    (0x2100, 0x214F), // Letterlike Symbols
    (0x2150, 0x218F), // Number Forms
]);

/// Donor fonts and names for one output font.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Variant {
    pub base_font: PathBuf,
    pub korean_font: PathBuf,
    pub japanese_font: PathBuf,
    pub digit_font: PathBuf,
    /// File name of the output. The version is inserted before the extension.
    pub output_filename: String,
    pub style_name: String,
    /// Style name for the legacy (name ID 2) record.
    pub legacy_style_name: String,
    /// PostScript name before sanitizing.
    pub postscript_name: String,
}

impl Variant {
    /// The Medium, Bold and Light builds.
    pub fn defaults() -> Vec<Variant> {
        // style, legacy style, base, korean, japanese, digit weights
        [
            ("Medium", "Regular", "Medium", "Medium", "Medium", "Semibold"),
            ("Bold", "Bold", "ExtraBold", "Bold", "Black", "Black"),
            ("Light", "Light", "ExtraLight", "Light", "Light", "Light"),
        ]
        .iter()
        .map(|&(style, legacy, base, korean, japanese, digit)| {
            Variant {
                base_font: PathBuf::from(format!("./src/font/Pretendard-{}.otf", base)),
                korean_font: PathBuf::from(format!("./src/font/GmarketSansTTF{}.ttf", korean)),
                japanese_font: PathBuf::from(format!("./src/font/NotoSansCJKjp-{}.otf", japanese)),
                digit_font: PathBuf::from(format!("./src/font/Lato-{}.ttf", digit)),
                output_filename: format!("YonhwaMagazineSans-{}.ttf", style),
                style_name: style.to_owned(),
                legacy_style_name: legacy.to_owned(),
                postscript_name: format!("Yonhwa Magazine Sans {}", style),
            }
        })
        .collect()
    }
}

/// Mapping issue log settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MapLogConfig {
    pub enabled: bool,
    pub path: PathBuf,
    /// Write a line per issue. Counts are always kept.
    pub verbose: bool,
    /// Most lines written, 0 for no limit.
    pub max_entries: usize,
}

/// Settings shared by every variant.
#[derive(Debug, Clone, PartialEq)]
pub struct BuildConfig {
    pub output_dir: PathBuf,
    pub family_name: String,
    pub version: String,
    pub variants: Vec<Variant>,

    /// Scale applied once to the whole font after merging.
    pub base_scale: Scale,
    pub digit_scale: Scale,
    pub korean_scale: Scale,
    /// Baseline shift of Hangul syllables, percent of the em.
    pub korean_baseline: f64,
    pub enclosed_scale: Scale,
    /// Baseline shift of enclosed alphanumerics, percent of the em.
    pub enclosed_baseline: f64,
    pub japanese_scale: Scale,

    /// Keep the base font's digits.
    pub preserve_digits: bool,
    /// Drop anchors from copied glyphs.
    pub normalize_anchors: bool,
    /// Look Japanese glyphs up by the CIDs named in the donor's cmap.
    pub cid_hint_map: bool,

    pub jp_extra_glyphs: String,
    /// Replace existing base glyphs with Japanese extras, rather than only filling gaps.
    pub jp_extra_overwrite: bool,

    pub stylistic_sets: Vec<String>,
    pub swash: bool,
    pub slashed_zero: bool,
    /// Further glyph name suffixes to bake.
    pub extra_suffixes: Vec<String>,
    /// Further feature tags to bake.
    pub feature_tags: Vec<String>,
    pub gsub_protect: RangeSet,

    pub case_offsets: CaseOffsets,
    /// Codepoints recopied from the base font after baking.
    pub quote_refresh: Vec<u32>,

    pub progress_every: usize,
    /// Collect garbage every this many codepoints, 0 to never.
    pub gc_every: usize,

    pub map_log: MapLogConfig,
}

impl Default for BuildConfig {
    fn default() -> Self {
        let korean_scale = Scale::new(0.94 * 0.94, 0.94);
        BuildConfig {
            output_dir: PathBuf::from("dist"),
            family_name: String::from("Yonhwa Magazine Sans"),
            version: String::from("25w51e"),
            variants: Variant::defaults(),
            base_scale: Scale::new(0.96, 1.0),
            digit_scale: Scale::new(0.96, 1.0),
            korean_scale,
            korean_baseline: 5.5,
            enclosed_scale: korean_scale.times(0.8957),
            enclosed_baseline: 10.0,
            japanese_scale: Scale::new(0.9375 * 0.96, 0.9375),
            preserve_digits: false,
            normalize_anchors: true,
            cid_hint_map: false,
            jp_extra_glyphs: String::from(JP_EXTRA_GLYPHS),
            jp_extra_overwrite: false,
            stylistic_sets: ["ss01", "ss02", "ss03", "ss06", "ss08"]
                .iter()
                .map(|&tag| String::from(tag))
                .collect(),
            swash: false,
            slashed_zero: true,
            extra_suffixes: Vec::new(),
            feature_tags: vec![String::from("case")],
            gsub_protect: GSUB_PROTECT,
            case_offsets: CaseOffsets {
                math: 7.78,
                bracket: 7.78,
                dash: 5.8,
            },
            quote_refresh: vec![0x2018, 0x2019, 0x201C, 0x201D],
            progress_every: 100,
            gc_every: 4000,
            map_log: MapLogConfig {
                enabled: true,
                path: PathBuf::from("dist/mapping_issues.log"),
                verbose: true,
                max_entries: 0,
            },
        }
    }
}

impl BuildConfig {
    /// Glyph name suffixes probed when baking: the stylistic sets, the extra suffixes and
    /// `swsh` when swashes are on.
    pub fn suffixes(&self) -> Vec<String> {
        let mut suffixes = self.stylistic_sets.clone();
        suffixes.extend(self.extra_suffixes.iter().cloned());
        if self.swash {
            suffixes.push(String::from("swsh"));
        }
        suffixes
    }

    /// Feature tags whose substitutions are baked.
    pub fn target_tags(&self) -> BTreeSet<u32> {
        self.suffixes()
            .iter()
            .chain(self.feature_tags.iter())
            .filter_map(|name| match tag::from_string(name) {
                Ok(tag) => Some(tag),
                Err(_) => {
                    warn!("'{}' is not a feature tag", name);
                    None
                }
            })
            .collect()
    }

    /// Feature tags whose lookups are removed once baked.
    pub fn remove_tags(&self) -> BTreeSet<u32> {
        self.target_tags()
    }

    pub fn scale_plan(&self) -> ScalePlan {
        ScalePlan {
            digit: self.digit_scale.pre_scale(self.base_scale),
            korean: self.korean_scale.pre_scale(self.base_scale),
            enclosed: self.enclosed_scale.pre_scale(self.base_scale),
            japanese: self.japanese_scale.pre_scale(self.base_scale),
        }
    }
}

/// Per script scales applied while merging. The base scale is applied afterwards to the whole
/// font.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct ScalePlan {
    pub digit: Scale,
    pub korean: Scale,
    pub enclosed: Scale,
    pub japanese: Scale,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_variants() {
        let variants = Variant::defaults();
        assert_eq!(variants.len(), 3);
        let bold = &variants[1];
        assert_eq!(bold.base_font, PathBuf::from("./src/font/Pretendard-ExtraBold.otf"));
        assert_eq!(bold.korean_font, PathBuf::from("./src/font/GmarketSansTTFBold.ttf"));
        assert_eq!(bold.japanese_font, PathBuf::from("./src/font/NotoSansCJKjp-Black.otf"));
        assert_eq!(bold.digit_font, PathBuf::from("./src/font/Lato-Black.ttf"));
        assert_eq!(bold.legacy_style_name, "Bold");
        let medium = &variants[0];
        assert_eq!(medium.japanese_font, PathBuf::from("./src/font/NotoSansCJKjp-Medium.otf"));
        assert_eq!(medium.digit_font, PathBuf::from("./src/font/Lato-Semibold.ttf"));
        assert_eq!(medium.legacy_style_name, "Regular");
        assert_eq!(variants[2].base_font, PathBuf::from("./src/font/Pretendard-ExtraLight.otf"));
        assert_eq!(variants[2].postscript_name, "Yonhwa Magazine Sans Light");
    }

    #[test]
    fn test_tags() {
        let mut config = BuildConfig::default();
        assert_eq!(config.suffixes(), &["ss01", "ss02", "ss03", "ss06", "ss08"]);
        let tags = config.target_tags();
        assert_eq!(tags.len(), 6);
        assert!(tags.contains(&tag::CASE));
        assert!(!tags.contains(&tag::SWSH));

        config.swash = true;
        config.extra_suffixes.push(String::from("alternate"));
        assert!(config.remove_tags().contains(&tag::SWSH));
        assert_eq!(config.suffixes().last().map(String::as_str), Some("swsh"));
    }

    #[test]
    fn test_scale_plan() {
        let config = BuildConfig::default();
        let plan = config.scale_plan();
        assert!(plan.digit.is_identity());
        assert!((plan.japanese.x - 0.9375).abs() < 1e-12);
        assert!((plan.enclosed.y - 0.94 * 0.8957).abs() < 1e-12);
    }
}
