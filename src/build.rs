//! Building the merged fonts.
//!
//! A variant is built in stages on the opened base font:
//!
//! 0. Japanese coverage is stripped from the base font.
//! 1. Digits are taken from the digit donor and mirrored to the fullwidth forms.
//! 2. Hangul and enclosed alphanumerics are taken from the Korean donor.
//! 3. Kana, ideographs and the Japanese extras are taken from the Japanese donor.
//! 4. Alternates are baked and their lookups removed.
//! 5. Case-sensitive punctuation is raised.
//! 6. Quotes are recopied from the original base font.
//! 7. The base scale is applied to the whole font.
//!
//! Only the base font and at most one donor are open at a time. The output is written to a
//! temporary file and renamed into place.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use log::{info, warn};

use crate::bake::{
    apply_case_offsets, bake_alternates, strip_lookups, BakeReport, BakeRequest, CaseReport,
};
use crate::cid::{CidHintMap, CidLookup, SubfontNameIndex};
use crate::config::{BuildConfig, Variant};
use crate::copy::GlyphCopier;
use crate::coverage::{strip, StripReport};
use crate::diagnostics::{kind, MapLog};
use crate::error::{BuildError, FontError};
use crate::feature_table::FeatureTableFile;
use crate::font::{EditableFont, FontEngine, SelectionGuard};
use crate::ranges::{jp_allowed, jp_extras, jp_targets, DIGIT, ENCLOSED, HANGUL, HANGUL_SYLLABLES};
use crate::resolve::{swallow, SlotResolver};
use crate::tag::DisplayTag;
use crate::transform::{bake, global_scale, round_width, GlobalScale, Scale};

/// Codepoints checked after a build: hiragana ko, halfwidth katakana a, the ideograph 漢 and
/// circled hangul kiyeok.
pub const AUDIT_CODEPOINTS: [u32; 4] = [0x3053, 0xFF71, 0x6F22, 0x3260];

/// What a variant build did.
#[derive(Debug, Clone, PartialEq)]
pub struct BuildReport {
    /// Where the font was written.
    pub output: PathBuf,
    pub strip: StripReport,
    /// Digits copied from the digit donor. Zero when digits are preserved.
    pub digits: usize,
    pub fullwidth_digits: usize,
    pub hangul: usize,
    pub enclosed: usize,
    pub japanese: usize,
    /// Japanese target codepoints considered.
    pub japanese_total: usize,
    pub jp_extras: usize,
    pub alternates: BakeReport,
    pub lookups_removed: usize,
    pub case: CaseReport,
    pub quotes: usize,
    /// `None` when the engine failed to scale the font.
    pub global_scale: Option<GlobalScale>,
    /// Whether each of [`AUDIT_CODEPOINTS`] has a drawable glyph.
    pub audit: Vec<(u32, bool)>,
}

/// State shared by the stages of one variant build.
struct Context<'a> {
    config: &'a BuildConfig,
    resolver: SlotResolver,
    log: &'a mut MapLog,
    copier: GlyphCopier,
}

impl<'a> Context<'a> {
    /// Copy `codepoint` from `donor` into `base` and bake it with `scale`, after normalising the
    /// donor's units per em. Returns whether a glyph was copied.
    fn transplant<S, D>(
        &mut self,
        donor: &mut S,
        base: &mut D,
        codepoint: u32,
        cid: Option<CidLookup<'_>>,
        scale: Scale,
        dy: f64,
    ) -> bool
    where
        S: EditableFont + ?Sized,
        D: EditableFont + ?Sized,
    {
        let Some(width) =
            self.copier
                .copy(&mut self.resolver, &mut *self.log, donor, base, codepoint, cid)
        else {
            return false;
        };
        let scale = scale.times(upm_ratio(base.units_per_em(), donor.units_per_em()));
        bake(
            &mut self.resolver,
            base,
            codepoint,
            scale,
            dy,
            f64::from(width) * scale.x,
        );
        true
    }

    fn progress(&self, stage: &str, i: usize, total: usize, extra: fmt::Arguments<'_>) {
        if total == 0 {
            return;
        }
        let every = self.config.progress_every;
        if i == total || (every > 0 && i % every == 0) {
            let pct = i as f64 * 100.0 / total as f64;
            info!("[{}] {}/{} ({:.1}%){}", stage, i, total, pct, extra);
        }
    }

    fn maybe_gc<E: FontEngine>(&self, engine: &mut E, i: usize) {
        let every = self.config.gc_every;
        if every > 0 && i % every == 0 {
            engine.collect_garbage();
        }
    }

    /// Close a donor and drop everything cached for it.
    fn release<E: FontEngine>(&mut self, engine: &mut E, donor: E::Font) {
        self.resolver.forget(donor.id());
        engine.close(donor);
    }
}

/// `dst_upm / src_upm`, or 1 when the source has no units per em.
fn upm_ratio(dst_upm: u16, src_upm: u16) -> f64 {
    if src_upm == 0 {
        1.0
    } else {
        f64::from(dst_upm) / f64::from(src_upm)
    }
}

fn open<E: FontEngine>(engine: &mut E, path: &Path) -> Result<E::Font, BuildError> {
    engine.open(path).map_err(|source| BuildError::Open {
        path: path.to_owned(),
        source,
    })
}

/// Open the mapping log configured in `config`, or a log that only counts.
pub fn open_map_log(config: &BuildConfig) -> Result<MapLog, BuildError> {
    let settings = &config.map_log;
    if !settings.enabled {
        return Ok(MapLog::disabled());
    }
    if let Some(dir) = settings.path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
        fs::create_dir_all(dir).map_err(|source| BuildError::OutputDir {
            path: dir.to_owned(),
            source,
        })?;
    }
    MapLog::create(
        &settings.path,
        &config.version,
        settings.verbose,
        settings.max_entries,
    )
    .map_err(BuildError::Log)
}

/// Build every variant of `config` in order, stopping at the first fatal error.
pub fn build_all<E: FontEngine>(
    engine: &mut E,
    config: &BuildConfig,
) -> Result<Vec<BuildReport>, BuildError> {
    let mut log = open_map_log(config)?;
    let mut reports = Vec::with_capacity(config.variants.len());
    for variant in &config.variants {
        match build_variant(engine, config, variant, &mut log) {
            Ok(report) => reports.push(report),
            Err(err) => {
                // the summary is still worth having
                if let Err(log_err) = log.finish() {
                    warn!("unable to finish mapping log: {}", log_err);
                }
                return Err(err);
            }
        }
    }

    let counts = log.finish().map_err(BuildError::Log)?;
    for (kind, count) in &counts {
        info!("[map log] {}={}", kind, count);
    }
    Ok(reports)
}

/// Build one variant and write it to the output directory.
pub fn build_variant<E: FontEngine>(
    engine: &mut E,
    config: &BuildConfig,
    variant: &Variant,
    log: &mut MapLog,
) -> Result<BuildReport, BuildError> {
    let started = Instant::now();
    let mut base = open(engine, &variant.base_font)?;
    let mut cx = Context {
        config,
        resolver: SlotResolver::new(),
        log,
        copier: GlyphCopier::new(config.normalize_anchors),
    };
    let result = merge(engine, &mut cx, variant, &mut base);
    cx.release(engine, base);
    let report = result?;
    info!(
        "DONE: {} total={:.2}s",
        report.output.display(),
        started.elapsed().as_secs_f64()
    );
    Ok(report)
}

fn merge<E: FontEngine>(
    engine: &mut E,
    cx: &mut Context<'_>,
    variant: &Variant,
    base: &mut E::Font,
) -> Result<BuildReport, BuildError> {
    let config = cx.config;
    set_names(base, &config.family_name, &config.version, variant);

    let plan = config.scale_plan();
    let upm = f64::from(base.units_per_em());
    let korean_dy = f64::from(round_width(config.korean_baseline / 100.0 * upm));
    let enclosed_dy = f64::from(round_width(config.enclosed_baseline / 100.0 * upm));

    let started = Instant::now();
    let strip = strip(base, &jp_targets(), jp_allowed, None);
    info!(
        "[0 base JP] removed_map={} cleared_slots={} elapsed={:.2}s",
        strip.unmapped,
        strip.cleared,
        started.elapsed().as_secs_f64()
    );

    let (digits, fullwidth_digits) = if config.preserve_digits {
        info!("[1 digits] skipped");
        (0, 0)
    } else {
        let started = Instant::now();
        let mut donor = open(engine, &variant.digit_font)?;
        let targets = DIGIT.iter().collect::<Vec<_>>();
        let mut copied = 0;
        for (i, codepoint) in targets.iter().copied().enumerate() {
            let i = i + 1;
            if cx.transplant(&mut donor, base, codepoint, None, plan.digit, 0.0) {
                copied += 1;
            }
            cx.progress("1 digits", i, targets.len(), format_args!(""));
            cx.maybe_gc(engine, i);
        }
        cx.release(engine, donor);
        let mirrored = mirror_fullwidth_digits(&mut cx.resolver, base);
        info!(
            "[1 digits] copied={} fullwidth={} elapsed={:.2}s",
            copied,
            mirrored,
            started.elapsed().as_secs_f64()
        );
        (copied, mirrored)
    };

    let started = Instant::now();
    let mut donor = open(engine, &variant.korean_font)?;
    let hangul_targets = HANGUL.iter().collect::<Vec<_>>();
    let enclosed_targets = ENCLOSED.iter().collect::<Vec<_>>();
    let total = hangul_targets.len() + enclosed_targets.len();
    let (mut hangul, mut enclosed) = (0, 0);
    let mut i = 0;
    for &codepoint in &hangul_targets {
        i += 1;
        let dy = if HANGUL_SYLLABLES.contains(codepoint) {
            korean_dy
        } else {
            0.0
        };
        if cx.transplant(&mut donor, base, codepoint, None, plan.korean, dy) {
            hangul += 1;
        }
        cx.progress("2 korean", i, total, format_args!(""));
        cx.maybe_gc(engine, i);
    }
    for &codepoint in &enclosed_targets {
        i += 1;
        if cx.transplant(&mut donor, base, codepoint, None, plan.enclosed, enclosed_dy) {
            enclosed += 1;
        }
        cx.progress("2 korean", i, total, format_args!(""));
        cx.maybe_gc(engine, i);
    }
    cx.release(engine, donor);
    info!(
        "[2 korean] hangul={} enclosed={} elapsed={:.2}s",
        hangul,
        enclosed,
        started.elapsed().as_secs_f64()
    );

    let started = Instant::now();
    let mut donor = open(engine, &variant.japanese_font)?;
    let names = SubfontNameIndex::build(&mut donor);
    let hints = if config.cid_hint_map {
        load_hint_map(&variant.japanese_font, cx.log)
    } else {
        None
    };
    let lookup = CidLookup {
        names: &names,
        hints: hints.as_ref(),
    };
    let targets = jp_targets()
        .iter()
        .filter(|&codepoint| !DIGIT.contains(codepoint))
        .collect::<Vec<_>>();
    let mut japanese = 0;
    for (i, codepoint) in targets.iter().copied().enumerate() {
        let i = i + 1;
        if HANGUL.contains(codepoint) {
            cx.progress("3 japanese", i, targets.len(), format_args!(" replaced={}", japanese));
            continue;
        }
        if cx.transplant(&mut donor, base, codepoint, Some(lookup), plan.japanese, 0.0) {
            japanese += 1;
        } else {
            cx.log.count_event(kind::JP_NO_SOURCE);
        }
        cx.progress("3 japanese", i, targets.len(), format_args!(" replaced={}", japanese));
        cx.maybe_gc(engine, i);
    }
    info!(
        "[3 japanese] replaced={}/{} elapsed={:.2}s",
        japanese,
        targets.len(),
        started.elapsed().as_secs_f64()
    );

    let mut extras = 0;
    for codepoint in jp_extras(&config.jp_extra_glyphs) {
        if DIGIT.contains(codepoint) || HANGUL.contains(codepoint) {
            continue;
        }
        if !config.jp_extra_overwrite && cx.resolver.has_glyph(&*base, codepoint) {
            continue;
        }
        if cx.transplant(&mut donor, base, codepoint, Some(lookup), plan.japanese, 0.0) {
            extras += 1;
        }
    }
    cx.release(engine, donor);
    info!("[3 jp extra] filled={} (whitelist)", extras);

    let started = Instant::now();
    let target_tags = config.target_tags();
    let suffixes = config.suffixes();
    let file = match FeatureTableFile::open(&variant.base_font) {
        Ok(file) => Some(file),
        Err(err) => {
            warn!(
                "unable to read substitutions from {}: {}",
                variant.base_font.display(),
                err
            );
            None
        }
    };
    let request = BakeRequest {
        target_tags: &target_tags,
        suffixes: &suffixes,
        protect: &config.gsub_protect,
        slashed_zero: config.slashed_zero,
    };
    let alternates = bake_alternates(&mut cx.resolver, base, file.as_ref(), request);
    for &tag in &alternates.missing_tags {
        cx.log
            .log_issue(kind::FEATURE_TAG_MISSING, None, &format!("tag={}", DisplayTag(tag)));
    }
    let lookups_removed = strip_lookups(base, &config.remove_tags());
    info!(
        "[4 alternates] GSUB removed={} baked direct={} via coverage={} via suffix={} \
         slashed zero={} protected={} elapsed={:.2}s",
        lookups_removed,
        alternates.direct,
        alternates.coverage,
        alternates.suffix,
        alternates.slashed_zero,
        alternates.protected,
        started.elapsed().as_secs_f64()
    );
    info!("[4 alternates] GSUB tags baked per-tag={:?}", alternates.per_tag);

    let case = apply_case_offsets(&mut cx.resolver, base, config.case_offsets);
    info!(
        "[5 baseline] math={} bracket={} dash={}",
        case.math, case.bracket, case.dash
    );

    let started = Instant::now();
    let quotes = refresh_quotes(engine, cx, &variant.base_font, base)?;
    info!(
        "[6 quotes] refreshed={} elapsed={:.2}s",
        quotes,
        started.elapsed().as_secs_f64()
    );

    let started = Instant::now();
    let global_scale = match global_scale(base, config.base_scale) {
        Ok(outcome) => Some(outcome),
        Err(err) => {
            warn!("unable to apply the global scale: {}", err);
            None
        }
    };
    info!(
        "[7 global scale] {:?} elapsed={:.2}s",
        global_scale,
        started.elapsed().as_secs_f64()
    );

    let audit = audit(&mut cx.resolver, &*base);
    let output = output_path(&config.output_dir, &variant.output_filename, &config.version);
    let started = Instant::now();
    publish(base, &config.output_dir, &output)?;
    info!(
        "[8 generate] elapsed={:.2}s",
        started.elapsed().as_secs_f64()
    );

    Ok(BuildReport {
        output,
        strip,
        digits,
        fullwidth_digits,
        hangul,
        enclosed,
        japanese,
        japanese_total: targets.len(),
        jp_extras: extras,
        alternates,
        lookups_removed,
        case,
        quotes,
        global_scale,
        audit,
    })
}

fn load_hint_map(path: &Path, log: &mut MapLog) -> Option<CidHintMap> {
    match FeatureTableFile::open(path) {
        Ok(file) => Some(CidHintMap::from_feature_table(&file, log)),
        Err(err) => {
            warn!("unable to read the cmap of {}: {}", path.display(), err);
            None
        }
    }
}

/// Copy the glyphs of the ASCII digits to the fullwidth digits of `font`. Returns the number
/// of digits mirrored.
pub fn mirror_fullwidth_digits<F: EditableFont + ?Sized>(
    resolver: &mut SlotResolver,
    font: &mut F,
) -> usize {
    (0..10)
        .filter(|digit| mirror_glyph(resolver, font, 0x30 + digit, 0xFF10 + digit).is_some())
        .count()
}

fn mirror_glyph<F: EditableFont + ?Sized>(
    resolver: &mut SlotResolver,
    font: &mut F,
    from: u32,
    to: u32,
) -> Option<()> {
    let src = resolver.resolve(&*font, from)?;
    let width = font.glyph(src)?.width;
    let dst = swallow("create_glyph", font.create_glyph_for_codepoint(to))?;
    if dst == src {
        return None;
    }

    let mut font = SelectionGuard::new(font);
    font.glyph_mut(dst)?.clear();
    font.select_none();
    swallow("select", font.select(src))?;
    let clipboard = swallow("copy", font.copy_selection())?;
    font.select_none();
    swallow("select", font.select(dst))?;
    swallow("paste", font.paste_into_selection(&clipboard))?;

    let glyph = font.glyph_mut(dst)?;
    glyph.unicode = Some(to);
    glyph.width = width;
    Some(())
}

/// Recopy the quotes of `config.quote_refresh` from the font at `path`, undoing any baking
/// done to them.
fn refresh_quotes<E: FontEngine>(
    engine: &mut E,
    cx: &mut Context<'_>,
    path: &Path,
    base: &mut E::Font,
) -> Result<usize, BuildError> {
    let config = cx.config;
    if config.quote_refresh.is_empty() {
        return Ok(0);
    }
    let mut original = open(engine, path)?;
    let mut refreshed = 0;
    for &codepoint in &config.quote_refresh {
        if cx.transplant(&mut original, base, codepoint, None, Scale::IDENTITY, 0.0) {
            refreshed += 1;
        }
    }
    cx.release(engine, original);
    Ok(refreshed)
}

/// Whether each of [`AUDIT_CODEPOINTS`] has a drawable glyph in `font`.
pub fn audit<F: EditableFont + ?Sized>(resolver: &mut SlotResolver, font: &F) -> Vec<(u32, bool)> {
    AUDIT_CODEPOINTS
        .iter()
        .map(|&codepoint| {
            let present = resolver.has_glyph(font, codepoint);
            info!("[AUDIT] U+{:04X}: {}", codepoint, present);
            (codepoint, present)
        })
        .collect()
}

/// Install the names of `variant` in `font`, replacing all name records.
pub fn set_names<F: EditableFont + ?Sized>(
    font: &mut F,
    family: &str,
    version: &str,
    variant: &Variant,
) {
    let postscript = postscript_name(&variant.postscript_name);
    let full = format!("{} {}", family, variant.style_name);
    let version = format!("Version {}", version);

    font.set_font_names(family, &full, &postscript);
    font.clear_name_records();
    font.set_name_record(1, family);
    font.set_name_record(2, &variant.legacy_style_name);
    font.set_name_record(3, &format!("{};{}", postscript, version));
    font.set_name_record(4, &full);
    font.set_name_record(5, &version);
    font.set_name_record(6, &postscript);
    font.set_name_record(16, family);
    font.set_name_record(17, &variant.style_name);
}

/// `name` reduced to the characters allowed in a PostScript name, or `Font` if none remain.
pub fn postscript_name(name: &str) -> String {
    let sanitized = name
        .chars()
        .filter(|ch| ch.is_ascii_alphanumeric() || *ch == '-')
        .collect::<String>();
    if sanitized.is_empty() {
        String::from("Font")
    } else {
        sanitized
    }
}

/// `<dir>/<stem>-<version><ext>`, where the extension defaults to `.ttf`.
pub fn output_path(dir: &Path, filename: &str, version: &str) -> PathBuf {
    let filename = Path::new(filename);
    let stem = filename
        .file_stem()
        .map(|stem| stem.to_string_lossy())
        .unwrap_or_default();
    let ext = filename
        .extension()
        .map(|ext| ext.to_string_lossy())
        .unwrap_or_else(|| "ttf".into());
    dir.join(format!("{}-{}.{}", stem, version, ext))
}

/// Generate `font` into a temporary file in `dir` and rename it to `output`.
///
/// `output` is either left untouched or replaced by a complete font.
fn publish<F: EditableFont + ?Sized>(font: &F, dir: &Path, output: &Path) -> Result<(), BuildError> {
    fs::create_dir_all(dir).map_err(|source| BuildError::OutputDir {
        path: dir.to_owned(),
        source,
    })?;
    let generate_error = |source: FontError| BuildError::Generate {
        path: output.to_owned(),
        source,
    };
    let temp = tempfile::Builder::new()
        .prefix(".fontmerge-")
        .suffix(".tmp")
        .tempfile_in(dir)
        .map_err(|err| generate_error(FontError::Io(err)))?;
    font.generate(temp.path()).map_err(generate_error)?;
    temp.persist(output)
        .map_err(|err| generate_error(FontError::Io(err.error)))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::font::Glyph;
    use crate::memory::MemoryFontBuilder;
    use crate::tests::square;

    #[test]
    fn test_postscript_name() {
        assert_eq!(
            postscript_name("Yonhwa Magazine Sans Medium"),
            "YonhwaMagazineSansMedium"
        );
        assert_eq!(postscript_name("Sans-Bold (v2)"), "Sans-Boldv2");
        assert_eq!(postscript_name(" ()"), "Font");
    }

    #[test]
    fn test_output_path() {
        let dir = Path::new("dist");
        assert_eq!(
            output_path(dir, "YonhwaMagazineSans-Medium.ttf", "25w51e"),
            PathBuf::from("dist/YonhwaMagazineSans-Medium-25w51e.ttf")
        );
        assert_eq!(
            output_path(dir, "Merged.otf", "1"),
            PathBuf::from("dist/Merged-1.otf")
        );
        assert_eq!(
            output_path(dir, "Merged", "1"),
            PathBuf::from("dist/Merged-1.ttf")
        );
    }

    #[test]
    fn test_set_names() {
        let mut font = MemoryFontBuilder::new("Base", 1000).build();
        font.set_name_record(13, "license");
        let variant = &Variant::defaults()[0];
        set_names(&mut font, "Yonhwa Magazine Sans", "25w51e", variant);

        assert_eq!(font.family_name(), "Yonhwa Magazine Sans");
        assert_eq!(font.name_record(13), None);
        assert_eq!(font.name_record(2), Some("Regular"));
        assert_eq!(
            font.name_record(3),
            Some("YonhwaMagazineSansMedium;Version 25w51e")
        );
        assert_eq!(font.name_record(4), Some("Yonhwa Magazine Sans Medium"));
        assert_eq!(font.name_record(5), Some("Version 25w51e"));
        assert_eq!(font.name_record(17), Some("Medium"));
    }

    #[test]
    fn test_mirror_fullwidth_digits() {
        let mut builder = MemoryFontBuilder::new("Base", 1000);
        for digit in 0..10u32 {
            let mut glyph = Glyph::new(format!("digit{}", digit), Some(0x30 + digit));
            glyph.outline.contours.push(square(0.0, 0.0, 100.0 + f64::from(digit)));
            glyph.width = 560;
            builder = builder.glyph(glyph);
        }
        let mut font = builder.build();
        let mut resolver = SlotResolver::new();

        assert_eq!(mirror_fullwidth_digits(&mut resolver, &mut font), 10);
        let seven = resolver.resolve(&font, 0xFF17).unwrap();
        let glyph = font.glyph(seven).unwrap();
        assert_eq!(glyph.unicode, Some(0xFF17));
        assert_eq!(glyph.width, 560);
        assert_eq!(glyph.bbox().unwrap().x_max, 107.0);
        assert_eq!(resolver.resolve(&font, 0x37), Some(8));
        assert!(font.selection().is_empty());
    }

    #[test]
    fn test_upm_ratio() {
        assert_eq!(upm_ratio(1000, 2048), 1000.0 / 2048.0);
        assert_eq!(upm_ratio(1000, 0), 1.0);
    }
}
