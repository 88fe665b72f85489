//! Copying single glyphs from a donor font into the destination.

use log::debug;

use crate::cid::{resolve_in_cid, CidLookup};
use crate::diagnostics::MapLog;
use crate::font::{Clipboard, EditableFont, SelectionGuard, Slot, SubfontGuard};
use crate::resolve::{swallow, SlotResolver};

/// Copies donor glyphs into a destination font.
#[derive(Debug, Copy, Clone)]
pub struct GlyphCopier {
    /// Drop anchors from copied glyphs.
    pub normalize_anchors: bool,
}

impl GlyphCopier {
    pub fn new(normalize_anchors: bool) -> GlyphCopier {
        GlyphCopier { normalize_anchors }
    }

    /// Copy the glyph for `codepoint` from `src` over the glyph for `codepoint` in `dst`.
    ///
    /// Returns the width of the donor glyph, or `None` when the donor has no drawable glyph for
    /// `codepoint`. CID-keyed donors are searched with `cid`. The destination glyph ends up
    /// mapped to `codepoint` alone, with references unlinked. The active subfont and selection
    /// of `src` are restored.
    pub fn copy<S, D>(
        &self,
        resolver: &mut SlotResolver,
        log: &mut MapLog,
        src: &mut S,
        dst: &mut D,
        codepoint: u32,
        cid: Option<CidLookup<'_>>,
    ) -> Option<i32>
    where
        S: EditableFont + ?Sized,
        D: EditableFont + ?Sized,
    {
        let (subfont, src_slot) = match cid {
            Some(lookup) => resolve_in_cid(resolver, log, src, codepoint, lookup)?,
            None => (None, resolver.resolve(&*src, codepoint)?),
        };

        let mut src = SelectionGuard::new(src);
        let mut src = SubfontGuard::new(&mut *src);
        if let Some(subfont) = subfont {
            swallow("set_active_subfont", src.set_active_subfont(subfont))?;
        }
        let width = match src.glyph(src_slot) {
            Some(glyph) if glyph.is_drawable() => glyph.width,
            _ => return None,
        };

        src.select_none();
        swallow("select", src.select(src_slot))?;
        let clipboard = swallow("copy", src.copy_selection())?;

        let dst_slot = swallow("create_glyph", dst.create_glyph_for_codepoint(codepoint))?;
        self.paste(dst, dst_slot, &clipboard)?;
        self.normalize(dst, dst_slot, codepoint);
        debug!("copied U+{:04X} from slot {}", codepoint, src_slot);
        Some(width)
    }

    fn paste<D: EditableFont + ?Sized>(
        &self,
        dst: &mut D,
        slot: Slot,
        clipboard: &Clipboard,
    ) -> Option<()> {
        dst.glyph_mut(slot)?.clear();
        let mut dst = SelectionGuard::new(dst);
        dst.select_none();
        swallow("select", dst.select(slot))?;
        swallow("paste", dst.paste_into_selection(clipboard))
    }

    fn normalize<D: EditableFont + ?Sized>(&self, dst: &mut D, slot: Slot, codepoint: u32) {
        let Some(glyph) = dst.glyph_mut(slot) else {
            return;
        };
        glyph.unicode = Some(codepoint);
        glyph.alt_unicodes.clear();
        if self.normalize_anchors {
            glyph.clear_anchors();
        }
        glyph.unlink_references();
    }
}
