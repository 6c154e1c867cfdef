//! Shared application state for the GSUB and GPOS engines: the lookup
//! properties in effect, glyph-class filtering, and the skip-marker
//! cache that keeps matching loops O(1) per step.

use ttf_parser::GlyphId;

use crate::buffer::{Buffer, GlyphInfo};
use crate::common::Mask;
use crate::face::Face;
use crate::ot::map::TableIndex;
use crate::tables::gdef::GlyphClass;
use crate::tables::gsubgpos::LookupFlags;

/// Nested lookups and composite expansion stop at this depth.
pub(crate) const MAX_NESTING_LEVEL: usize = 32;
/// Longest context rule the matcher will consider.
pub(crate) const MAX_CONTEXT_LENGTH: usize = 64;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub(crate) enum Skip {
    No,
    Yes,
    /// Default ignorables: skipped unless a rule matches them
    /// explicitly.
    Maybe,
}

pub(crate) struct ApplyContext<'a> {
    pub table_index: TableIndex,
    pub face: &'a Face,
    pub buffer: &'a mut Buffer,

    pub lookup_mask: Mask,
    pub lookup_flags: LookupFlags,
    pub mark_filtering_set: Option<u16>,
    pub auto_zwnj: bool,
    pub auto_zwj: bool,
    pub nesting_level_left: usize,

    // Definite-skip markers over the input side. `next_non_skip[i]`
    // holds the next index at or after `i` that is not skipped, or -1.
    skip: Vec<u8>,
    next_non_skip: Vec<i32>,
    skip_valid: bool,
}

impl<'a> ApplyContext<'a> {
    pub fn new(table_index: TableIndex, face: &'a Face, buffer: &'a mut Buffer) -> Self {
        ApplyContext {
            table_index,
            face,
            buffer,
            lookup_mask: 1,
            lookup_flags: LookupFlags::empty(),
            mark_filtering_set: None,
            auto_zwnj: true,
            auto_zwj: true,
            nesting_level_left: MAX_NESTING_LEVEL,
            skip: Vec::new(),
            next_non_skip: Vec::new(),
            skip_valid: false,
        }
    }

    pub fn set_lookup_props(
        &mut self,
        flags: LookupFlags,
        mark_filtering_set: Option<u16>,
        mask: Mask,
        auto_zwnj: bool,
        auto_zwj: bool,
    ) {
        self.lookup_flags = flags;
        self.mark_filtering_set = mark_filtering_set;
        self.lookup_mask = mask;
        self.auto_zwnj = auto_zwnj;
        self.auto_zwj = auto_zwj;
        self.skip_valid = false;
    }

    /// Whether the glyph survives the lookup-flag class filter.
    pub fn check_glyph_property(&self, info: &GlyphInfo) -> bool {
        let glyph = info.as_glyph();
        let class = self.face.glyph_class(glyph);

        if class == Some(GlyphClass::Mark) {
            if self.lookup_flags.contains(LookupFlags::IGNORE_MARKS) {
                return false;
            }

            if self.lookup_flags.contains(LookupFlags::USE_MARK_FILTERING_SET) {
                return match self.mark_filtering_set {
                    Some(set) => self.face.mark_set_covers(set, glyph),
                    None => false,
                };
            }

            let attach_type = self.lookup_flags.mark_attachment_type();
            if attach_type != 0 {
                return self.face.mark_attach_class(glyph) == attach_type;
            }

            return true;
        }

        if class == Some(GlyphClass::Base)
            && self.lookup_flags.contains(LookupFlags::IGNORE_BASE_GLYPHS)
        {
            return false;
        }
        if class == Some(GlyphClass::Ligature)
            && self.lookup_flags.contains(LookupFlags::IGNORE_LIGATURES)
        {
            return false;
        }

        true
    }

    pub fn may_skip(&self, info: &GlyphInfo) -> Skip {
        if !self.check_glyph_property(info) {
            return Skip::Yes;
        }

        // GPOS always ignores joiners; GSUB lets the feature decide.
        let ignore_zwnj = self.table_index == TableIndex::Gpos || self.auto_zwnj;
        let ignore_zwj = self.table_index == TableIndex::Gpos || self.auto_zwj;

        if info.is_default_ignorable()
            && (ignore_zwnj || !info.is_zwnj())
            && (ignore_zwj || !info.is_zwj())
        {
            return Skip::Maybe;
        }

        Skip::No
    }

    /// Rebuilds the definite-skip arrays over the input side. Runs in
    /// O(n) and amortizes `check_glyph_property` out of the matching
    /// inner loops.
    fn build_skip_cache(&mut self) {
        let n = self.buffer.info.len();
        self.skip.clear();
        self.skip.resize(n, 0);
        self.next_non_skip.clear();
        self.next_non_skip.resize(n, -1);

        for i in 0..n {
            let info = self.buffer.info[i];
            let skipped = (self.may_skip(&info) == Skip::Yes) as u8;
            self.skip[i] = skipped;
        }

        let mut next = -1i32;
        for i in (0..n).rev() {
            if self.skip[i] == 0 {
                next = i as i32;
            }
            self.next_non_skip[i] = next;
        }

        self.skip_valid = true;
    }

    /// Any buffer rewrite moves indices; the cache rebuilds lazily on
    /// the next query.
    #[inline]
    pub fn invalidate_skip_cache(&mut self) {
        self.skip_valid = false;
    }

    /// The next input-side index at or after `from` that is not
    /// definitely skipped.
    pub fn next_non_skipped(&mut self, from: usize) -> Option<usize> {
        if !self.skip_valid {
            self.build_skip_cache();
        }

        if from >= self.next_non_skip.len() {
            return None;
        }

        match self.next_non_skip[from] {
            -1 => None,
            i => Some(i as usize),
        }
    }

    /// Top-of-loop gate: mask, digest and glyph property for the
    /// current position.
    pub fn accepts_current(&mut self, digest: &crate::set_digest::SetDigest) -> bool {
        let info = self.buffer.info[self.buffer.idx];
        if info.mask & self.lookup_mask == 0 {
            return false;
        }
        if !digest.may_contain(info.as_glyph()) {
            return false;
        }
        self.check_glyph_property(&info)
    }

    #[inline]
    pub fn cur_glyph(&self) -> GlyphId {
        self.buffer.info[self.buffer.idx].as_glyph()
    }
}

