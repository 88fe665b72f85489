//! Inclusive codepoint ranges and the range tables that drive the build.

use std::borrow::Cow;

use unicode_general_category::{get_general_category, GeneralCategory};

/// A list of inclusive `(start, end)` codepoint ranges.
///
/// Membership is a linear scan. Tables are short so nothing cleverer is needed.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RangeSet {
    ranges: Cow<'static, [(u32, u32)]>,
}

impl RangeSet {
    pub const fn new(ranges: &'static [(u32, u32)]) -> RangeSet {
        RangeSet {
            ranges: Cow::Borrowed(ranges),
        }
    }

    pub fn contains(&self, codepoint: u32) -> bool {
        self.ranges
            .iter()
            .any(|&(start, end)| (start..=end).contains(&codepoint))
    }

    pub fn ranges(&self) -> &[(u32, u32)] {
        &self.ranges
    }

    /// Every codepoint of every range, range by range in table order.
    pub fn iter(&self) -> impl Iterator<Item = u32> + '_ {
        self.ranges.iter().flat_map(|&(start, end)| start..=end)
    }

    /// Total number of codepoints produced by `iter`.
    pub fn len(&self) -> usize {
        self.ranges
            .iter()
            .map(|&(start, end)| end.saturating_sub(start) as usize + usize::from(start <= end))
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The ranges of `self` followed by the ranges of `other`.
    pub fn union(&self, other: &RangeSet) -> RangeSet {
        let mut ranges = self.ranges.to_vec();
        ranges.extend_from_slice(&other.ranges);
        RangeSet::from(ranges)
    }
}

impl From<Vec<(u32, u32)>> for RangeSet {
    fn from(ranges: Vec<(u32, u32)>) -> RangeSet {
        RangeSet {
            ranges: Cow::Owned(ranges),
        }
    }
}

pub const DIGIT: RangeSet = RangeSet::new(&[
    (0x0030, 0x0039),
    (0xFF10, 0xFF19),
    (0x2070, 0x2079),
    (0x2080, 0x2089),
]);

pub const HANGUL: RangeSet = RangeSet::new(&[
    (0xAC00, 0xD7A3),
    (0x3130, 0x318F),
    (0x1100, 0x11FF),
    (0xA960, 0xA97F),
    (0xD7B0, 0xD7FF),
]);

/// Precomposed Hangul syllables, the only part of Hangul that takes the baseline shift.
pub const HANGUL_SYLLABLES: RangeSet = RangeSet::new(&[(0xAC00, 0xD7A3)]);

pub const ENCLOSED: RangeSet = RangeSet::new(&[
    (0x2460, 0x24FF),
    (0x3200, 0x32FF),
    (0x2776, 0x2793),
    (0x1F100, 0x1F1FF),
    (0x1F200, 0x1F2FF),
]);

pub const HALFWIDTH_KANA: RangeSet = RangeSet::new(&[(0xFF65, 0xFF9F)]);

pub const KANA: RangeSet = RangeSet::new(&[
    (0x3040, 0x309F),
    (0x30A0, 0x30FF),
    (0x31F0, 0x31FF),
    (0xFF65, 0xFF9F),
    (0x1B000, 0x1B0FF),
    (0x1B100, 0x1B12F),
    (0x1B130, 0x1B16F),
]);

pub const CJK_IDEOGRAPHS: RangeSet = RangeSet::new(&[
    (0x3400, 0x4DBF),   // Extension A
    (0x4E00, 0x9FFF),   // Unified Ideographs
    (0xF900, 0xFAFF),   // Compatibility Ideographs
    (0x2F800, 0x2FA1F), // Compatibility Ideographs Supplement
    (0x20000, 0x2A6DF), // Extension B
    (0x2A700, 0x2B73F), // Extension C
    (0x2B740, 0x2B81F), // Extension D
    (0x2B820, 0x2CEAF), // Extension E
    (0x2CEB0, 0x2EBEF), // Extension F
    (0x30000, 0x3134F), // Extension G
    (0x31350, 0x323AF), // Extension H
    (0x2EBF0, 0x2EE5F), // Extension I
]);

/// Punctuation and symbols the Japanese donor must not replace.
pub const EXCLUDED_PUNCTUATION: RangeSet = RangeSet::new(&[
    (0x2000, 0x206F),
    (0x3000, 0x303F),
    (0xFE10, 0xFE1F),
    (0xFE30, 0xFE4F),
    (0xFF00, 0xFF0F),
    (0xFF1A, 0xFF60),
]);

/// Kana followed by CJK ideographs.
pub fn jp_targets() -> RangeSet {
    KANA.union(&CJK_IDEOGRAPHS)
}

/// Whether the Japanese donor may supply `codepoint`.
pub fn jp_allowed(codepoint: u32) -> bool {
    !EXCLUDED_PUNCTUATION.contains(codepoint) || DIGIT.contains(codepoint)
}

/// The Japanese extras whitelist: the characters of `exact` (whitespace ignored) and every
/// assigned codepoint in the CJK enclosed and compatibility blocks.
pub fn jp_extras(exact: &str) -> Vec<u32> {
    let mut extras = exact
        .chars()
        .filter(|ch| !ch.is_whitespace())
        .map(u32::from)
        .chain((0x3200..=0x33FF).filter(|&codepoint| is_assigned(codepoint)))
        .collect::<Vec<_>>();
    extras.sort_unstable();
    extras.dedup();
    extras
}

fn is_assigned(codepoint: u32) -> bool {
    char::from_u32(codepoint)
        .map_or(false, |ch| get_general_category(ch) != GeneralCategory::Unassigned)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_contains() {
        assert!(DIGIT.contains(0x30));
        assert!(DIGIT.contains(0xFF19));
        assert!(!DIGIT.contains(0x3A));
        assert!(HANGUL.contains(0xD7A3));
        assert!(!RangeSet::default().contains(0));
    }

    #[test]
    fn test_iter_and_len() {
        let set = RangeSet::from(vec![(0x41, 0x43), (0x30, 0x30)]);
        assert_eq!(set.iter().collect::<Vec<_>>(), vec![0x41, 0x42, 0x43, 0x30]);
        assert_eq!(set.len(), 4);
        assert_eq!(DIGIT.len(), 40);
        assert_eq!(HANGUL_SYLLABLES.len(), 11172);
    }

    #[test]
    fn test_jp_targets_order() {
        let targets = jp_targets();
        assert_eq!(targets.iter().next(), Some(0x3040));
        assert!(targets.contains(0x6F22));
        assert!(targets.contains(0x20000));
    }

    #[test]
    fn test_jp_allowed() {
        assert!(jp_allowed(0x3042));
        // ideographic full stop
        assert!(!jp_allowed(0x3002));
        // fullwidth colon
        assert!(!jp_allowed(0xFF1A));
        assert!(jp_allowed(0xFF10));
    }

    #[test]
    fn test_jp_extras() {
        let extras = jp_extras("㈱ ㍿\n♠");
        assert!(extras.contains(&0x2660));
        assert!(extras.contains(&0x3231));
        assert!(extras.contains(&0x337F));
        // unassigned
        assert!(!extras.contains(&0x321F));
        assert!(extras.windows(2).all(|pair| pair[0] < pair[1]));
    }
}
