//! Removing a script's existing coverage from the destination before a donor is overlaid.

use log::debug;
use rustc_hash::FxHashSet;

use crate::font::EditableFont;
use crate::ranges::RangeSet;
use crate::resolve::swallow;

/// Outcome of [`strip`].
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct StripReport {
    /// Glyphs whose primary mapping was removed.
    pub unmapped: usize,
    /// Glyphs whose outline was cleared.
    pub cleared: usize,
}

/// Unmap and clear every drawable glyph of `font` covering a codepoint in `targets`.
///
/// A codepoint is removed when it lies in `targets`, `allowed` accepts it and, if `available` is
/// given, it is in `available`. The first pass unmaps glyphs whose primary codepoint is removed
/// and drops removed codepoints from the alternates of all other glyphs. The second pass clears
/// the outline of every glyph still reachable through a removed codepoint, unless its primary
/// codepoint is one that stays.
///
/// Running it again on the same font changes nothing.
pub fn strip<F, P>(
    font: &mut F,
    targets: &RangeSet,
    allowed: P,
    available: Option<&FxHashSet<u32>>,
) -> StripReport
where
    F: EditableFont + ?Sized,
    P: Fn(u32) -> bool,
{
    let removable = |codepoint: u32| {
        targets.contains(codepoint)
            && allowed(codepoint)
            && available.map_or(true, |set| set.contains(&codepoint))
    };
    let mut report = StripReport::default();

    for slot in font.slots() {
        let Some(glyph) = font.glyph_mut(slot) else {
            continue;
        };
        if !glyph.is_drawable() {
            continue;
        }
        match glyph.unicode {
            Some(codepoint) if removable(codepoint) => {
                glyph.unicode = None;
                glyph.alt_unicodes.clear();
                report.unmapped += 1;
            }
            _ => glyph.alt_unicodes.retain(|codepoint| !removable(*codepoint)),
        }
    }

    for codepoint in targets.iter().filter(|&codepoint| removable(codepoint)) {
        let Some(slot) = swallow("find_slot", font.find_slot(codepoint)).flatten() else {
            continue;
        };
        let Some(glyph) = font.glyph_mut(slot).filter(|glyph| glyph.is_drawable()) else {
            continue;
        };
        if glyph.unicode.map_or(true, |primary| removable(primary)) {
            glyph.clear();
            report.cleared += 1;
        }
    }

    debug!(
        "stripped coverage: {} unmapped, {} cleared",
        report.unmapped, report.cleared
    );
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::font::Glyph;
    use crate::memory::MemoryFontBuilder;
    use crate::ranges::{jp_allowed, jp_targets};
    use crate::tests::square;

    fn drawn(name: &str, unicode: u32) -> Glyph {
        let mut glyph = Glyph::new(name, Some(unicode));
        glyph.outline.contours.push(square(0.0, 0.0, 100.0));
        glyph.width = 1000;
        glyph
    }

    #[test]
    fn test_strip_unmaps_and_clears() {
        let mut a = drawn("a-hira", 0x3042);
        a.alt_unicodes.push(0x3043);
        let mut latin = drawn("A", 0x41);
        latin.alt_unicodes.push(0x3044);
        latin.alt_unicodes.push(0x391);
        let mut font = MemoryFontBuilder::new("Base", 1000)
            .glyph(a)
            .glyph(latin)
            .glyph(drawn("kan", 0x6F22))
            .glyph(drawn("ideographic-stop", 0x3002))
            .build();

        let report = strip(&mut font, &jp_targets(), jp_allowed, None);
        assert_eq!(report, StripReport { unmapped: 2, cleared: 2 });

        let a = font.glyph(1).unwrap();
        assert_eq!(a.unicode, None);
        assert!(a.alt_unicodes.is_empty());
        assert!(!a.is_drawable());
        let latin = font.glyph(2).unwrap();
        assert_eq!(latin.unicode, Some(0x41));
        assert_eq!(latin.alt_unicodes.as_slice(), &[0x391]);
        assert!(latin.is_drawable());
        // punctuation is not a Japanese target
        assert!(font.glyph(4).unwrap().is_drawable());

        let again = strip(&mut font, &jp_targets(), jp_allowed, None);
        assert_eq!(again, StripReport::default());
    }

    #[test]
    fn test_strip_respects_availability() {
        let mut font = MemoryFontBuilder::new("Base", 1000)
            .glyph(drawn("a", 0x3042))
            .glyph(drawn("i", 0x3044))
            .build();
        let available = [0x3044].into_iter().collect::<FxHashSet<_>>();
        let hiragana = RangeSet::from(vec![(0x3040, 0x309F)]);

        let report = strip(&mut font, &hiragana, |_| true, Some(&available));
        assert_eq!(report, StripReport { unmapped: 1, cleared: 1 });
        assert_eq!(font.glyph(1).unwrap().unicode, Some(0x3042));
        assert!(font.glyph(1).unwrap().is_drawable());
        assert!(!font.glyph(2).unwrap().is_drawable());
    }
}
