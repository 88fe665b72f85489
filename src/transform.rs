//! Per glyph and font wide geometric transforms.
//!
//! Each script is scaled in two steps. While merging, a glyph gets its script's pre-scale (the
//! script scale divided by the shared base scale) times the units-per-em ratio of its donor.
//! Once everything is merged the base scale is applied once to the whole font, together with
//! its kerning and anchors, so positioning data computed against the pre-scaled glyphs stays
//! consistent.

use log::{debug, warn};

use crate::error::FontError;
use crate::font::{Affine, EditableFont, SelectionGuard, TransformOptions};
use crate::resolve::SlotResolver;

/// Horizontal and vertical scale factors.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Scale {
    pub x: f64,
    pub y: f64,
}

impl Scale {
    pub const IDENTITY: Scale = Scale { x: 1.0, y: 1.0 };

    pub const fn new(x: f64, y: f64) -> Scale {
        Scale { x, y }
    }

    /// The same factor in both directions.
    pub const fn uniform(factor: f64) -> Scale {
        Scale {
            x: factor,
            y: factor,
        }
    }

    pub fn is_identity(self) -> bool {
        self == Scale::IDENTITY
    }

    /// The factor left to apply before `base` is applied to the whole font.
    pub fn pre_scale(self, base: Scale) -> Scale {
        Scale {
            x: self.x / base.x,
            y: self.y / base.y,
        }
    }

    /// Both factors multiplied by `factor`.
    pub fn times(self, factor: f64) -> Scale {
        Scale {
            x: self.x * factor,
            y: self.y * factor,
        }
    }
}

/// Round a computed advance width to font units, ties to even.
pub fn round_width(width: f64) -> i32 {
    width.round_ties_even() as i32
}

/// Scale and shift the glyph for `codepoint` in `font` and set its width.
///
/// `width` is the final advance before rounding; callers multiply the donor width by the same
/// horizontal factor. Nothing happens when `font` has no drawable glyph for `codepoint`.
/// Returns whether the glyph was changed.
pub fn bake<F: EditableFont + ?Sized>(
    resolver: &mut SlotResolver,
    font: &mut F,
    codepoint: u32,
    scale: Scale,
    dy: f64,
    width: f64,
) -> bool {
    let Some(slot) = resolver.resolve(&*font, codepoint) else {
        return false;
    };
    let Some(glyph) = font.glyph_mut(slot).filter(|glyph| glyph.is_drawable()) else {
        return false;
    };

    if !scale.is_identity() {
        glyph.transform(&Affine::scale(scale.x, scale.y));
    }
    if dy != 0.0 {
        glyph.transform(&Affine::translate(0.0, dy));
    }
    glyph.width = round_width(width);
    true
}

/// How a font wide scale was carried out.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum GlobalScale {
    /// Both factors were 1, nothing was done.
    Identity,
    /// Outlines, anchors and kerning were scaled together, with rounding.
    Combined,
    /// Only outlines and widths were scaled. Positioning data is stale.
    Plain,
}

/// Scale every glyph of `font`.
///
/// Kerning and anchors are scaled with the outlines when the font supports it. Otherwise a plain
/// scale is applied and positioning data is left as it was.
pub fn global_scale<F: EditableFont + ?Sized>(
    font: &mut F,
    scale: Scale,
) -> Result<GlobalScale, FontError> {
    if scale.is_identity() {
        return Ok(GlobalScale::Identity);
    }

    let matrix = Affine::scale(scale.x, scale.y);
    let mut font = SelectionGuard::new(font);
    font.select_all();
    match font.transform_selection(&matrix, TransformOptions::combined()) {
        Ok(()) => {
            debug!("scaled font by {}x{} with positioning", scale.x, scale.y);
            Ok(GlobalScale::Combined)
        }
        Err(FontError::Unsupported(what)) => {
            warn!(
                "{} unavailable, scaling outlines only; kerning and anchors are not scaled",
                what
            );
            font.transform_selection(&matrix, TransformOptions::empty())?;
            Ok(GlobalScale::Plain)
        }
        Err(err) => Err(err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::font::Glyph;
    use crate::memory::MemoryFontBuilder;
    use crate::tests::square;

    fn drawn(name: &str, unicode: u32, width: i32) -> Glyph {
        let mut glyph = Glyph::new(name, Some(unicode));
        glyph.outline.contours.push(square(0.0, 0.0, 100.0));
        glyph.width = width;
        glyph
    }

    #[test]
    fn test_round_width_ties_to_even() {
        assert_eq!(round_width(100.5), 100);
        assert_eq!(round_width(101.5), 102);
        assert_eq!(round_width(100.49), 100);
        assert_eq!(round_width(939.6), 940);
    }

    #[test]
    fn test_pre_scale() {
        let base = Scale::new(0.96, 1.0);
        let korean = Scale::new(0.94 * 0.94, 0.94);
        let pre = korean.pre_scale(base);
        assert!((pre.x * base.x - korean.x).abs() < 1e-12);
        assert_eq!(pre.y, 0.94);
        assert!(base.pre_scale(base).is_identity());
    }

    #[test]
    fn test_bake() {
        let mut font = MemoryFontBuilder::new("Base", 1000)
            .glyph(drawn("ga", 0xAC00, 1000))
            .glyph(Glyph::new("space", Some(0x20)))
            .build();
        let mut resolver = SlotResolver::new();

        assert!(bake(&mut resolver, &mut font, 0xAC00, Scale::new(0.5, 2.0), 55.0, 500.5));
        let glyph = font.glyph(1).unwrap();
        assert_eq!(glyph.width, 500);
        let bbox = glyph.bbox().unwrap();
        assert_eq!((bbox.x_max, bbox.y_min, bbox.y_max), (50.0, 55.0, 255.0));

        assert!(!bake(&mut resolver, &mut font, 0x20, Scale::IDENTITY, 0.0, 10.0));
        assert_eq!(font.glyph(2).unwrap().width, 0);
        assert!(!bake(&mut resolver, &mut font, 0xAC01, Scale::IDENTITY, 0.0, 10.0));
    }

    #[test]
    fn test_identity_bake_keeps_geometry() {
        let mut font = MemoryFontBuilder::new("Base", 1000)
            .glyph(drawn("a", 0x61, 612))
            .build();
        let before = font.glyph(1).unwrap().clone();
        let mut resolver = SlotResolver::new();

        assert!(bake(&mut resolver, &mut font, 0x61, Scale::IDENTITY, 0.0, 612.0));
        assert_eq!(font.glyph(1), Some(&before));
    }

    #[test]
    fn test_global_scale_falls_back_to_plain() {
        let mut font = MemoryFontBuilder::new("Base", 1000)
            .glyph(drawn("a", 0x61, 1000))
            .combined_transforms(false)
            .build();
        let outcome = global_scale(&mut font, Scale::new(0.96, 1.0)).unwrap();
        assert_eq!(outcome, GlobalScale::Plain);
        assert_eq!(font.glyph(1).unwrap().width, 960);
        let outcome = global_scale(&mut font, Scale::IDENTITY).unwrap();
        assert_eq!(outcome, GlobalScale::Identity);
        assert!(font.selection().is_empty());
    }
}
