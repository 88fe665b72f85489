//! The editable font model that the merge operations work against.
//!
//! A font is a sequence of glyph slots. Flat fonts have a single slot space addressed through
//! their encoding. CID-keyed fonts have one slot space per subfont, and the active subfont is
//! state on the font that every slot query reads. Callers that change it must put it back; see
//! [`SubfontGuard`].

use std::fmt;
use std::ops::{Deref, DerefMut};
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};

use bitflags::bitflags;
use log::warn;
use tinyvec::TinyVec;

use crate::error::FontError;

/// Index into the active slot space of a font.
pub type Slot = usize;

/// Identity of an open font.
///
/// Ids come from a process wide counter and are never reused, so they remain unique after the
/// font they were issued to is closed.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FontId(u64);

impl FontId {
    pub fn next() -> FontId {
        static NEXT_ID: AtomicU64 = AtomicU64::new(1);
        FontId(NEXT_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for FontId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "font#{}", self.0)
    }
}

/// A 2x3 affine matrix in PostScript order.
///
/// A point `(x, y)` maps to `(xx * x + yx * y + dx, xy * x + yy * y + dy)`.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Affine {
    pub xx: f64,
    pub xy: f64,
    pub yx: f64,
    pub yy: f64,
    pub dx: f64,
    pub dy: f64,
}

impl Affine {
    pub const IDENTITY: Affine = Affine {
        xx: 1.0,
        xy: 0.0,
        yx: 0.0,
        yy: 1.0,
        dx: 0.0,
        dy: 0.0,
    };

    pub fn scale(sx: f64, sy: f64) -> Affine {
        Affine {
            xx: sx,
            yy: sy,
            ..Affine::IDENTITY
        }
    }

    pub fn translate(dx: f64, dy: f64) -> Affine {
        Affine {
            dx,
            dy,
            ..Affine::IDENTITY
        }
    }

    pub fn from_array([xx, xy, yx, yy, dx, dy]: [f64; 6]) -> Affine {
        Affine {
            xx,
            xy,
            yx,
            yy,
            dx,
            dy,
        }
    }

    pub fn is_identity(&self) -> bool {
        *self == Affine::IDENTITY
    }

    /// The transform that applies `self` followed by `next`.
    pub fn then(&self, next: &Affine) -> Affine {
        Affine {
            xx: self.xx * next.xx + self.xy * next.yx,
            xy: self.xx * next.xy + self.xy * next.yy,
            yx: self.yx * next.xx + self.yy * next.yx,
            yy: self.yx * next.xy + self.yy * next.yy,
            dx: self.dx * next.xx + self.dy * next.yx + next.dx,
            dy: self.dx * next.xy + self.dy * next.yy + next.dy,
        }
    }

    pub fn apply(&self, x: f64, y: f64) -> (f64, f64) {
        (
            self.xx * x + self.yx * y + self.dx,
            self.xy * x + self.yy * y + self.dy,
        )
    }
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct OutlinePoint {
    pub x: f64,
    pub y: f64,
    pub on_curve: bool,
}

pub type Contour = Vec<OutlinePoint>;

/// A component reference to another glyph.
///
/// The referenced contours are captured when the reference is made so that unlinking does not
/// need the font the reference points into.
#[derive(Debug, Clone, PartialEq)]
pub struct Reference {
    pub glyph: String,
    pub transform: Affine,
    pub contours: Vec<Contour>,
}

/// An attachment point used by mark positioning.
#[derive(Debug, Clone, PartialEq)]
pub struct Anchor {
    pub name: String,
    pub x: f64,
    pub y: f64,
}

/// Type 2 charstring data, kept as is. Transforms accumulate in `matrix`.
#[derive(Debug, Clone, PartialEq)]
pub struct Charstring {
    pub data: Vec<u8>,
    pub matrix: Affine,
    /// Whether the charstring draws any contours.
    pub draws: bool,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Outline {
    pub contours: Vec<Contour>,
    pub references: Vec<Reference>,
    pub anchors: Vec<Anchor>,
    pub charstring: Option<Charstring>,
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct BoundingBox {
    pub x_min: f64,
    pub y_min: f64,
    pub x_max: f64,
    pub y_max: f64,
}

impl BoundingBox {
    fn add_point(bbox: &mut Option<BoundingBox>, x: f64, y: f64) {
        match bbox {
            Some(bbox) => {
                bbox.x_min = bbox.x_min.min(x);
                bbox.y_min = bbox.y_min.min(y);
                bbox.x_max = bbox.x_max.max(x);
                bbox.y_max = bbox.y_max.max(y);
            }
            None => {
                *bbox = Some(BoundingBox {
                    x_min: x,
                    y_min: y,
                    x_max: x,
                    y_max: y,
                })
            }
        }
    }
}

impl Outline {
    pub fn is_empty(&self) -> bool {
        self.contours.iter().all(|contour| contour.is_empty())
            && self.references.is_empty()
            && self.charstring.as_ref().map_or(true, |cs| !cs.draws)
    }

    fn transform(&mut self, matrix: &Affine, move_anchors: bool) {
        for point in self.contours.iter_mut().flatten() {
            let (x, y) = matrix.apply(point.x, point.y);
            point.x = x;
            point.y = y;
        }
        for reference in &mut self.references {
            reference.transform = reference.transform.then(matrix);
        }
        if let Some(charstring) = &mut self.charstring {
            charstring.matrix = charstring.matrix.then(matrix);
        }
        if move_anchors {
            for anchor in &mut self.anchors {
                let (x, y) = matrix.apply(anchor.x, anchor.y);
                anchor.x = x;
                anchor.y = y;
            }
        }
    }

    fn round(&mut self) {
        for point in self.contours.iter_mut().flatten() {
            point.x = point.x.round_ties_even();
            point.y = point.y.round_ties_even();
        }
        for anchor in &mut self.anchors {
            anchor.x = anchor.x.round_ties_even();
            anchor.y = anchor.y.round_ties_even();
        }
    }
}

/// A glyph in an editable font.
#[derive(Debug, Clone, PartialEq)]
pub struct Glyph {
    pub name: String,
    /// Primary codepoint, `None` when unmapped.
    pub unicode: Option<u32>,
    /// Additional codepoints this glyph answers.
    pub alt_unicodes: TinyVec<[u32; 2]>,
    pub width: i32,
    pub outline: Outline,
}

impl Glyph {
    pub fn new(name: impl Into<String>, unicode: Option<u32>) -> Glyph {
        Glyph {
            name: name.into(),
            unicode,
            alt_unicodes: TinyVec::new(),
            width: 0,
            outline: Outline::default(),
        }
    }

    /// True if the glyph has contents worth writing to a font file.
    pub fn is_drawable(&self) -> bool {
        !self.outline.is_empty()
    }

    /// Remove the outline, references and anchors. The mapping and width are kept.
    pub fn clear(&mut self) {
        self.outline = Outline::default();
    }

    /// Apply `matrix` to the outline and anchors. The advance width is not changed.
    pub fn transform(&mut self, matrix: &Affine) {
        self.outline.transform(matrix, true);
    }

    /// Replace component references with the contours they stand for.
    pub fn unlink_references(&mut self) {
        for reference in std::mem::take(&mut self.outline.references) {
            for contour in reference.contours {
                let contour = contour
                    .into_iter()
                    .map(|point| {
                        let (x, y) = reference.transform.apply(point.x, point.y);
                        OutlinePoint {
                            x,
                            y,
                            on_curve: point.on_curve,
                        }
                    })
                    .collect();
                self.outline.contours.push(contour);
            }
        }
    }

    pub fn clear_anchors(&mut self) {
        self.outline.anchors.clear();
    }

    /// Bounds of the contours and references. Opaque charstrings do not contribute.
    pub fn bbox(&self) -> Option<BoundingBox> {
        let mut bbox = None;
        for point in self.outline.contours.iter().flatten() {
            BoundingBox::add_point(&mut bbox, point.x, point.y);
        }
        for reference in &self.outline.references {
            for point in reference.contours.iter().flatten() {
                let (x, y) = reference.transform.apply(point.x, point.y);
                BoundingBox::add_point(&mut bbox, x, y);
            }
        }
        bbox
    }

    /// Apply a font wide transform to this glyph.
    pub(crate) fn transform_with_options(&mut self, matrix: &Affine, options: TransformOptions) {
        self.outline
            .transform(matrix, options.contains(TransformOptions::POSITIONING));
        if options.contains(TransformOptions::ROUND) {
            self.outline.round();
        }
        self.width = (f64::from(self.width) * matrix.xx).round_ties_even() as i32;
    }
}

/// Copied glyph outlines and widths, in selection order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Clipboard {
    entries: Vec<(Outline, i32)>,
}

impl Clipboard {
    pub fn new(entries: Vec<(Outline, i32)>) -> Clipboard {
        Clipboard { entries }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The entry to paste into the `index`th selected glyph. A single entry pastes into every
    /// selected glyph.
    pub fn entry(&self, index: usize) -> Option<&(Outline, i32)> {
        match self.entries.as_slice() {
            [single] => Some(single),
            entries => entries.get(index),
        }
    }
}

bitflags! {
    /// Extra work done by a font wide transform.
    #[derive(Debug, Copy, Clone, PartialEq, Eq)]
    pub struct TransformOptions: u8 {
        /// Round outline coordinates to integers afterwards.
        const ROUND = 0b001;
        /// Scale kerning values with the horizontal factor.
        const KERNING = 0b010;
        /// Move anchor points with the outlines.
        const POSITIONING = 0b100;
    }
}

impl TransformOptions {
    /// The options that keep positioning data in step with the outlines.
    pub fn combined() -> TransformOptions {
        TransformOptions::ROUND | TransformOptions::KERNING | TransformOptions::POSITIONING
    }
}

/// The font container interface used by the merge operations.
pub trait EditableFont {
    fn id(&self) -> FontId;

    fn units_per_em(&self) -> u16;

    /// Number of CID subfonts, 0 for a flat font.
    fn subfont_count(&self) -> usize;

    fn active_subfont(&self) -> usize;

    fn set_active_subfont(&mut self, index: usize) -> Result<(), FontError>;

    /// PostScript name of the active subfont, or of the font when flat.
    fn font_name(&self) -> Option<&str>;

    /// Full name of the active subfont, or of the font when flat.
    fn full_name(&self) -> Option<&str>;

    /// Size of the active slot space.
    fn slot_count(&self) -> usize;

    fn glyph(&self, slot: Slot) -> Option<&Glyph>;

    fn glyph_mut(&mut self, slot: Slot) -> Option<&mut Glyph>;

    /// The engine's own lookup of the slot encoding `codepoint`.
    fn find_slot(&self, codepoint: u32) -> Result<Option<Slot>, FontError>;

    fn slot_by_name(&self, name: &str) -> Option<Slot>;

    /// Occupied slots of the active slot space in encoding order.
    fn slots(&self) -> Vec<Slot> {
        (0..self.slot_count())
            .filter(|&slot| self.glyph(slot).is_some())
            .collect()
    }

    /// Return the slot encoding `codepoint`, creating an empty glyph for it if needed.
    fn create_glyph_for_codepoint(&mut self, codepoint: u32) -> Result<Slot, FontError>;

    fn select_none(&mut self);

    fn select(&mut self, slot: Slot) -> Result<(), FontError>;

    fn select_all(&mut self);

    fn selection(&self) -> Vec<Slot>;

    fn set_selection(&mut self, slots: Vec<Slot>) -> Result<(), FontError>;

    fn copy_selection(&self) -> Result<Clipboard, FontError>;

    /// Replace the outline and width of every selected glyph from `clipboard`.
    fn paste_into_selection(&mut self, clipboard: &Clipboard) -> Result<(), FontError>;

    /// Transform every selected glyph, scaling advance widths by the horizontal factor.
    ///
    /// Fonts that cannot keep positioning data in step return `FontError::Unsupported` when
    /// `options` asks for it.
    fn transform_selection(
        &mut self,
        matrix: &Affine,
        options: TransformOptions,
    ) -> Result<(), FontError>;

    /// Names of the `GSUB` lookups.
    fn gsub_lookups(&self) -> Vec<String>;

    fn lookup_feature_tags(&self, lookup: &str) -> Result<Vec<u32>, FontError>;

    /// Source to target glyph names for a single or alternate lookup.
    fn lookup_coverage(&self, lookup: &str) -> Result<Vec<(String, String)>, FontError>;

    fn remove_lookup(&mut self, lookup: &str) -> Result<(), FontError>;

    fn set_font_names(&mut self, family: &str, full: &str, postscript: &str);

    fn clear_name_records(&mut self);

    fn set_name_record(&mut self, name_id: u16, value: &str);

    /// Write the font to `path`.
    fn generate(&self, path: &Path) -> Result<(), FontError>;
}

/// Opens and releases fonts.
pub trait FontEngine {
    type Font: EditableFont;

    fn open(&mut self, path: &Path) -> Result<Self::Font, FontError>;

    fn close(&mut self, font: Self::Font);

    /// Release memory held for fonts that are no longer open.
    fn collect_garbage(&mut self);
}

/// Restores the active subfont of a font when dropped.
pub struct SubfontGuard<'a, F: EditableFont + ?Sized> {
    font: &'a mut F,
    saved: usize,
}

impl<'a, F: EditableFont + ?Sized> SubfontGuard<'a, F> {
    pub fn new(font: &'a mut F) -> Self {
        let saved = font.active_subfont();
        SubfontGuard { font, saved }
    }

    pub fn saved(&self) -> usize {
        self.saved
    }
}

impl<F: EditableFont + ?Sized> Deref for SubfontGuard<'_, F> {
    type Target = F;

    fn deref(&self) -> &F {
        self.font
    }
}

impl<F: EditableFont + ?Sized> DerefMut for SubfontGuard<'_, F> {
    fn deref_mut(&mut self) -> &mut F {
        self.font
    }
}

impl<F: EditableFont + ?Sized> Drop for SubfontGuard<'_, F> {
    fn drop(&mut self) {
        if self.font.active_subfont() != self.saved {
            if let Err(err) = self.font.set_active_subfont(self.saved) {
                warn!("unable to restore subfont {}: {}", self.saved, err);
            }
        }
    }
}

/// Restores the selection of a font when dropped.
pub struct SelectionGuard<'a, F: EditableFont + ?Sized> {
    font: &'a mut F,
    saved: Vec<Slot>,
}

impl<'a, F: EditableFont + ?Sized> SelectionGuard<'a, F> {
    pub fn new(font: &'a mut F) -> Self {
        let saved = font.selection();
        SelectionGuard { font, saved }
    }
}

impl<F: EditableFont + ?Sized> Deref for SelectionGuard<'_, F> {
    type Target = F;

    fn deref(&self) -> &F {
        self.font
    }
}

impl<F: EditableFont + ?Sized> DerefMut for SelectionGuard<'_, F> {
    fn deref_mut(&mut self) -> &mut F {
        self.font
    }
}

impl<F: EditableFont + ?Sized> Drop for SelectionGuard<'_, F> {
    fn drop(&mut self) {
        let saved = std::mem::take(&mut self.saved);
        if let Err(err) = self.font.set_selection(saved) {
            warn!("unable to restore selection: {}", err);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::square;

    #[test]
    fn test_affine_then() {
        let m = Affine::scale(2.0, 3.0).then(&Affine::translate(10.0, -5.0));
        assert_eq!(m.apply(1.0, 1.0), (12.0, -2.0));

        let m = Affine::translate(10.0, -5.0).then(&Affine::scale(2.0, 3.0));
        assert_eq!(m.apply(1.0, 1.0), (22.0, -12.0));
    }

    #[test]
    fn test_font_ids_are_unique() {
        let a = FontId::next();
        let b = FontId::next();
        assert_ne!(a, b);
    }

    #[test]
    fn test_unlink_references() {
        let mut glyph = Glyph::new("Aring", Some(0xC5));
        glyph.outline.references.push(Reference {
            glyph: String::from("A"),
            transform: Affine::translate(100.0, 0.0),
            contours: vec![square(0.0, 0.0, 10.0)],
        });
        assert!(glyph.is_drawable());

        glyph.transform(&Affine::scale(2.0, 1.0));
        let before = glyph.bbox();
        glyph.unlink_references();

        assert!(glyph.outline.references.is_empty());
        assert_eq!(glyph.outline.contours.len(), 1);
        assert_eq!(glyph.bbox(), before);
        assert_eq!(
            before,
            Some(BoundingBox {
                x_min: 200.0,
                y_min: 0.0,
                x_max: 220.0,
                y_max: 10.0
            })
        );
    }

    #[test]
    fn test_clear_keeps_mapping_and_width() {
        let mut glyph = Glyph::new("a", Some(0x61));
        glyph.width = 500;
        glyph.outline.contours.push(square(0.0, 0.0, 100.0));
        glyph.clear();
        assert!(!glyph.is_drawable());
        assert_eq!(glyph.unicode, Some(0x61));
        assert_eq!(glyph.width, 500);
    }

    #[test]
    fn test_font_transform_rounds_and_scales_width() {
        let mut glyph = Glyph::new("a", Some(0x61));
        glyph.width = 1001;
        glyph.outline.contours.push(square(0.0, 0.0, 125.0));
        glyph.outline.anchors.push(Anchor {
            name: String::from("top"),
            x: 50.0,
            y: 700.0,
        });

        glyph.transform_with_options(&Affine::scale(0.5, 1.0), TransformOptions::ROUND);
        assert_eq!(glyph.width, 500);
        assert_eq!(glyph.outline.contours[0][1].x, 62.0);
        // Anchors only move with positioning
        assert_eq!(glyph.outline.anchors[0].x, 50.0);

        glyph.transform_with_options(&Affine::scale(0.5, 1.0), TransformOptions::combined());
        assert_eq!(glyph.outline.anchors[0].x, 25.0);
    }

    #[test]
    fn test_single_entry_clipboard_repeats() {
        let clipboard = Clipboard::new(vec![(Outline::default(), 10)]);
        assert_eq!(clipboard.entry(3).map(|(_, width)| *width), Some(10));
        let empty = Clipboard::default();
        assert!(empty.entry(0).is_none());
    }
}
