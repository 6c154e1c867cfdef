//! The glyph buffer: two parallel vectors of glyph infos and glyph
//! positions, plus the in-place rewrite machinery every engine stage
//! mutates.
//!
//! Substitution passes write through an output buffer: `next_glyph`
//! copies the current entry over, `replace_*` consume input entries and
//! emit replacements, and `swap_buffers` makes the output the new
//! input. Cluster values merge to the minimum of everything consumed.

use ttf_parser::GlyphId;

use crate::common::{Direction, Language, Mask, Script};
use crate::unicode::{gc_from_u8, gc_to_u8, CharExt, GeneralCategory, GeneralCategoryExt};

/// The size of the pre/post context arrays.
pub(crate) const CONTEXT_LENGTH: usize = 5;

/// Growth cap: a single shape call may not expand the buffer beyond
/// this factor of the input, no matter what the font's tables ask for.
pub(crate) const MAX_LEN_FACTOR: usize = 64;
pub(crate) const MAX_LEN_MIN: usize = 16384;

/// Work cap for pathological fonts; decremented per lookup match step.
pub(crate) const MAX_OPS_FACTOR: i32 = 1024;
pub(crate) const MAX_OPS_MIN: i32 = 16384;

bitflags::bitflags! {
    /// Flags the caller sets on the input buffer.
    pub struct BufferFlags: u32 {
        /// The buffer starts at the beginning of its paragraph.
        const BEGINNING_OF_TEXT           = 0x01;
        /// The buffer ends at the end of its paragraph.
        const END_OF_TEXT                 = 0x02;
        const PRESERVE_DEFAULT_IGNORABLES = 0x04;
        const REMOVE_DEFAULT_IGNORABLES   = 0x08;
        const DO_NOT_INSERT_DOTTED_CIRCLE = 0x10;
    }
}

impl Default for BufferFlags {
    fn default() -> Self {
        BufferFlags::empty()
    }
}

bitflags::bitflags! {
    #[derive(Default)]
    pub(crate) struct BufferScratchFlags: u32 {
        const HAS_NON_ASCII          = 0x01;
        const HAS_DEFAULT_IGNORABLES = 0x02;
        const HAS_SPACE_FALLBACK     = 0x04;
        const HAS_GPOS_ATTACHMENT    = 0x08;
        const HAS_BROKEN_SYLLABLE    = 0x10;
        const HAS_CGJ                = 0x20;
    }
}

/// Controls how much clusters are allowed to merge.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum BufferClusterLevel {
    /// Extended grapheme clusters share one cluster value and cluster
    /// values stay monotone.
    MonotoneGraphemes,
    /// Each character keeps its own cluster value, merged only as
    /// required to keep the sequence monotone.
    MonotoneCharacters,
    /// No merging beyond what glyph fusion itself forces.
    Characters,
}

impl Default for BufferClusterLevel {
    fn default() -> Self {
        BufferClusterLevel::MonotoneGraphemes
    }
}

// Per-glyph diagnostic flags (the out-of-band side channel).
pub(crate) mod glyph_flag {
    /// Breaking the line before this cluster would change shaping.
    pub const UNSAFE_TO_BREAK: u8 = 0x01;
    /// A substitution lookup rewrote this entry.
    pub const SUBSTITUTED: u8 = 0x02;
    /// Ligated with the following entry.
    pub const LIGATED: u8 = 0x04;
    /// Produced by a multiple substitution.
    pub const MULTIPLIED: u8 = 0x08;
}

const IS_LIG_BASE: u8 = 0x10;

/// A single buffer entry.
#[derive(Clone, Copy, Default, Debug)]
pub struct GlyphInfo {
    /// The original scalar value; zero for glyphs the engines inserted.
    pub codepoint: u32,
    /// The glyph index; zero until the cmap pass runs.
    pub glyph_id: u16,
    /// Index of the first input scalar this entry derives from.
    pub cluster: u32,
    /// Feature and shaper mask bits applicable at this position.
    pub mask: Mask,
    pub(crate) unicode_props: u16,
    pub(crate) lig_props: u8,
    pub(crate) syllable: u8,
    /// Shaper-private category byte.
    pub(crate) complex_cat: u8,
    /// Second shaper-private byte (e.g. the Indic position class).
    pub(crate) complex_aux: u8,
    pub(crate) flags: u8,
}

impl GlyphInfo {
    #[inline]
    pub(crate) fn as_char(&self) -> char {
        char::from_u32(self.codepoint).unwrap_or('\u{FFFD}')
    }

    #[inline]
    pub(crate) fn as_glyph(&self) -> GlyphId {
        GlyphId(self.glyph_id)
    }

    #[inline]
    pub(crate) fn general_category(&self) -> GeneralCategory {
        gc_from_u8((self.unicode_props & 0xFF) as u8)
    }

    #[inline]
    pub(crate) fn set_general_category(&mut self, gc: GeneralCategory) {
        self.unicode_props = (self.unicode_props & 0xFF00) | u16::from(gc_to_u8(gc));
    }

    #[inline]
    pub(crate) fn modified_combining_class(&self) -> u8 {
        (self.unicode_props >> 8) as u8
    }

    #[inline]
    pub(crate) fn set_modified_combining_class(&mut self, mcc: u8) {
        self.unicode_props = (self.unicode_props & 0x00FF) | (u16::from(mcc) << 8);
    }

    pub(crate) fn init_unicode_props(&mut self, scratch: &mut BufferScratchFlags) {
        let c = self.as_char();
        self.set_general_category(c.general_category());
        self.set_modified_combining_class(c.modified_combining_class());

        if self.codepoint >= 0x80 {
            *scratch |= BufferScratchFlags::HAS_NON_ASCII;
        }
        if c.is_default_ignorable() {
            *scratch |= BufferScratchFlags::HAS_DEFAULT_IGNORABLES;
        }
        if self.codepoint == crate::unicode::CGJ {
            *scratch |= BufferScratchFlags::HAS_CGJ;
        }
    }

    #[inline]
    pub(crate) fn is_unicode_mark(&self) -> bool {
        self.general_category().is_mark()
    }

    #[inline]
    pub(crate) fn is_default_ignorable(&self) -> bool {
        self.as_char().is_default_ignorable()
    }

    #[inline]
    pub(crate) fn is_zwnj(&self) -> bool {
        self.codepoint == crate::unicode::ZWNJ
    }

    #[inline]
    pub(crate) fn is_zwj(&self) -> bool {
        self.codepoint == crate::unicode::ZWJ
    }

    // Ligature bookkeeping. The id lives in the top three bits, the low
    // nibble is either the component count (for the ligature itself) or
    // the 1-based component a trailing mark attaches to.

    #[inline]
    pub(crate) fn lig_id(&self) -> u8 {
        self.lig_props >> 5
    }

    #[inline]
    pub(crate) fn lig_comp(&self) -> u8 {
        if self.lig_props & IS_LIG_BASE != 0 {
            0
        } else {
            self.lig_props & 0x0F
        }
    }

    #[inline]
    pub(crate) fn lig_num_comps(&self) -> u8 {
        if self.lig_props & IS_LIG_BASE != 0 {
            self.lig_props & 0x0F
        } else {
            1
        }
    }

    #[inline]
    pub(crate) fn set_lig_props_for_ligature(&mut self, lig_id: u8, num_comps: u8) {
        self.lig_props = (lig_id << 5) | IS_LIG_BASE | num_comps.min(0x0F);
    }

    #[inline]
    pub(crate) fn set_lig_props_for_mark(&mut self, lig_id: u8, lig_comp: u8) {
        self.lig_props = (lig_id << 5) | lig_comp.min(0x0F);
    }

    #[inline]
    pub(crate) fn is_substituted(&self) -> bool {
        self.flags & glyph_flag::SUBSTITUTED != 0
    }

    /// Whether a line break before this entry's cluster may change the
    /// shaping result.
    #[inline]
    pub fn unsafe_to_break(&self) -> bool {
        self.flags & glyph_flag::UNSAFE_TO_BREAK != 0
    }
}

/// A positioned-glyph record, parallel to [`GlyphInfo`].
#[derive(Clone, Copy, Default, Debug, PartialEq)]
pub struct GlyphPosition {
    pub x_advance: i32,
    pub y_advance: i32,
    pub x_offset: i32,
    pub y_offset: i32,
    /// Relative index of the entry this one is attached to; zero when
    /// detached. Resolved by the attachment post-pass.
    pub(crate) attach_chain: i16,
    pub(crate) attach_type: u8,
}

pub(crate) mod attach_type {
    pub const MARK: u8 = 1;
    pub const CURSIVE: u8 = 2;
}

/// The shaping buffer.
pub struct Buffer {
    pub info: Vec<GlyphInfo>,
    pub pos: Vec<GlyphPosition>,
    pub(crate) out_info: Vec<GlyphInfo>,
    have_output: bool,
    /// Read head of the input side during a substitution pass.
    pub(crate) idx: usize,

    pub direction: Direction,
    pub script: Option<Script>,
    pub language: Option<Language>,
    pub flags: BufferFlags,
    pub cluster_level: BufferClusterLevel,
    pub(crate) scratch_flags: BufferScratchFlags,

    pub(crate) context: [[u32; CONTEXT_LENGTH]; 2],
    pub(crate) context_len: [usize; 2],

    pub(crate) max_len: usize,
    pub(crate) max_ops: i32,
    serial: u8,
}

impl Buffer {
    pub fn new() -> Self {
        Buffer {
            info: Vec::new(),
            pos: Vec::new(),
            out_info: Vec::new(),
            have_output: false,
            idx: 0,
            direction: Direction::LeftToRight,
            script: None,
            language: None,
            flags: BufferFlags::empty(),
            cluster_level: BufferClusterLevel::default(),
            scratch_flags: BufferScratchFlags::empty(),
            context: [[0; CONTEXT_LENGTH]; 2],
            context_len: [0, 0],
            max_len: MAX_LEN_MIN,
            max_ops: MAX_OPS_MIN,
            serial: 0,
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.info.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.info.is_empty()
    }

    /// Resets content but keeps allocations for the next shape call.
    pub fn clear(&mut self) {
        self.info.clear();
        self.pos.clear();
        self.out_info.clear();
        self.have_output = false;
        self.idx = 0;
        self.direction = Direction::LeftToRight;
        self.script = None;
        self.language = None;
        self.flags = BufferFlags::empty();
        self.scratch_flags = BufferScratchFlags::empty();
        self.context_len = [0, 0];
        self.serial = 0;
    }

    pub fn push(&mut self, c: char, cluster: u32) {
        self.info.push(GlyphInfo {
            codepoint: c as u32,
            cluster,
            ..GlyphInfo::default()
        });
    }

    pub(crate) fn reserve(&mut self, n: usize) {
        self.info.reserve(n);
    }

    pub(crate) fn sync_positions(&mut self) {
        self.pos.clear();
        self.pos.resize(self.info.len(), GlyphPosition::default());
    }

    pub(crate) fn set_pre_context(&mut self, chars: impl Iterator<Item = char>) {
        // Stored nearest-first.
        self.context_len[0] = 0;
        for c in chars.take(CONTEXT_LENGTH) {
            self.context[0][self.context_len[0]] = c as u32;
            self.context_len[0] += 1;
        }
    }

    pub(crate) fn set_post_context(&mut self, chars: impl Iterator<Item = char>) {
        self.context_len[1] = 0;
        for c in chars.take(CONTEXT_LENGTH) {
            self.context[1][self.context_len[1]] = c as u32;
            self.context_len[1] += 1;
        }
    }

    #[inline]
    pub(crate) fn context_len(&self, side: usize) -> usize {
        self.context_len[side]
    }

    #[inline]
    pub(crate) fn context(&self, side: usize, i: usize) -> char {
        char::from_u32(self.context[side][i]).unwrap_or('\u{FFFD}')
    }

    pub(crate) fn allocate_lig_id(&mut self) -> u8 {
        self.serial = self.serial.wrapping_add(1) & 0x07;
        if self.serial == 0 {
            self.serial = 1;
        }
        self.serial
    }

    // --- output-buffer machinery -------------------------------------

    #[inline]
    pub(crate) fn out_len(&self) -> usize {
        if self.have_output {
            self.out_info.len()
        } else {
            self.idx
        }
    }

    /// Positions already written to the output side, visible to
    /// backtrack matching.
    #[inline]
    pub(crate) fn backtrack_len(&self) -> usize {
        self.out_len()
    }

    #[inline]
    pub(crate) fn out_info(&self) -> &[GlyphInfo] {
        if self.have_output {
            &self.out_info
        } else {
            &self.info
        }
    }

    pub(crate) fn clear_output(&mut self) {
        self.have_output = true;
        self.out_info.clear();
        self.idx = 0;
    }

    /// Installs the output side as the new input side.
    pub(crate) fn swap_buffers(&mut self) {
        debug_assert!(self.have_output);
        // Anything not yet consumed tags along unchanged.
        while self.idx < self.info.len() {
            let info = self.info[self.idx];
            self.out_info.push(info);
            self.idx += 1;
        }
        core::mem::swap(&mut self.info, &mut self.out_info);
        self.out_info.clear();
        self.have_output = false;
        self.idx = 0;
    }

    /// Copies the current entry to the output unchanged.
    #[inline]
    pub(crate) fn next_glyph(&mut self) {
        if self.have_output {
            let info = self.info[self.idx];
            self.out_info.push(info);
        }
        self.idx += 1;
    }

    /// Consumes one entry, emitting it with a new glyph id.
    pub(crate) fn replace_glyph(&mut self, glyph: GlyphId) {
        let mut info = self.info[self.idx];
        info.glyph_id = glyph.0;
        info.flags |= glyph_flag::SUBSTITUTED;
        if self.have_output {
            self.out_info.push(info);
        } else {
            self.info[self.idx] = info;
        }
        self.idx += 1;
    }

    /// Emits a copy of the current entry with a different scalar,
    /// without consuming it. Normalization builds decompositions with
    /// this.
    pub(crate) fn output_char(&mut self, c: char) {
        debug_assert!(self.have_output);
        let mut info = self.info[self.idx];
        info.codepoint = c as u32;
        info.glyph_id = 0;
        info.init_unicode_props(&mut self.scratch_flags);
        self.out_info.push(info);
    }

    /// Consumes the current entry without emitting it.
    #[inline]
    pub(crate) fn skip_char(&mut self) {
        self.idx += 1;
    }

    /// Moves the input/output boundary so exactly `pos` entries sit on
    /// the output side. Nested-lookup application repositions with
    /// this between records.
    pub(crate) fn move_to(&mut self, pos: usize) {
        if !self.have_output {
            self.idx = pos.min(self.info.len());
            return;
        }

        let out_len = self.out_info.len();
        if pos > out_len {
            for _ in 0..(pos - out_len) {
                if self.idx >= self.info.len() {
                    break;
                }
                self.next_glyph();
            }
        } else if pos < out_len {
            // Pull entries back in front of the read head, preserving
            // order.
            let drained: Vec<_> = self.out_info.drain(pos..).collect();
            let idx = self.idx;
            for (i, info) in drained.into_iter().enumerate() {
                self.info.insert(idx + i, info);
            }
        }
    }

    /// Entries not yet consumed on the input side.
    #[inline]
    pub(crate) fn lookahead_len(&self) -> usize {
        self.info.len() - self.idx
    }

    /// Consumes `num_in` entries and emits `glyphs`, merging clusters
    /// across everything consumed. Inserted entries carry no codepoint.
    pub(crate) fn replace_glyphs(&mut self, num_in: usize, glyphs: &[GlyphId]) {
        debug_assert!(self.have_output);
        self.merge_clusters(self.idx, self.idx + num_in);

        let orig = self.info[self.idx];
        for (i, &glyph) in glyphs.iter().enumerate() {
            let mut info = orig;
            info.glyph_id = glyph.0;
            info.flags |= glyph_flag::SUBSTITUTED;
            if i > 0 || glyphs.len() > 1 {
                info.codepoint = 0;
                info.flags |= glyph_flag::MULTIPLIED;
            }
            self.out_info.push(info);
        }

        self.idx += num_in;
    }

    /// Consumes one entry without emitting it. The deleted entry's
    /// cluster folds backward into the output side when no neighbor
    /// carries it already.
    pub(crate) fn delete_glyph(&mut self) {
        let cluster = self.info[self.idx].cluster;

        let next_same =
            self.idx + 1 < self.info.len() && self.info[self.idx + 1].cluster == cluster;
        let prev_same = self
            .out_info
            .last()
            .map_or(false, |info| info.cluster == cluster);

        if !next_same && !prev_same {
            if let Some(last) = self.out_info.last() {
                if cluster < last.cluster {
                    let old = last.cluster;
                    for info in self.out_info.iter_mut().rev() {
                        if info.cluster != old {
                            break;
                        }
                        info.cluster = cluster;
                    }
                }
            }
        }

        self.idx += 1;
    }

    // --- clusters ----------------------------------------------------

    /// Merges cluster values over `[start, end)` of the input side to
    /// their minimum.
    pub(crate) fn merge_clusters(&mut self, start: usize, end: usize) {
        if end - start < 2 {
            return;
        }

        if self.cluster_level == BufferClusterLevel::Characters {
            self.unsafe_to_break(start, end);
            return;
        }

        let mut cluster = self.info[start].cluster;
        for info in &self.info[start..end] {
            cluster = cluster.min(info.cluster);
        }

        // Extend over neighbors that already share an endpoint cluster,
        // so the sequence stays monotone. Leftward extension stops at
        // the read head; anything before it lives on the output side.
        let mut start = start;
        let mut end = end;
        while end < self.info.len() && self.info[end - 1].cluster == self.info[end].cluster {
            end += 1;
        }
        while self.idx < start && self.info[start - 1].cluster == self.info[start].cluster {
            start -= 1;
        }

        // If we hit the read head, continue into the output side.
        if self.idx == start {
            let old = self.info[start].cluster;
            for info in self.out_info.iter_mut().rev() {
                if info.cluster != old {
                    break;
                }
                info.cluster = cluster;
            }
        }

        for info in &mut self.info[start..end] {
            info.cluster = cluster;
        }
    }

    pub(crate) fn merge_out_clusters(&mut self, start: usize, end: usize) {
        if self.cluster_level == BufferClusterLevel::Characters || end - start < 2 {
            return;
        }

        let mut cluster = self.out_info[start].cluster;
        for info in &self.out_info[start..end] {
            cluster = cluster.min(info.cluster);
        }

        for info in &mut self.out_info[start..end] {
            info.cluster = cluster;
        }
    }

    /// Marks `[start, end)` of the input side as unsafe to break.
    pub(crate) fn unsafe_to_break(&mut self, start: usize, end: usize) {
        let end = end.min(self.info.len());
        for info in &mut self.info[start..end] {
            info.flags |= glyph_flag::UNSAFE_TO_BREAK;
        }
    }

    /// Variant for passes that already moved entries to the output
    /// side: `start` indexes the output, `end` the input.
    pub(crate) fn unsafe_to_break_from_outbuffer(&mut self, start: usize, end: usize) {
        for info in &mut self.out_info[start..] {
            info.flags |= glyph_flag::UNSAFE_TO_BREAK;
        }
        let end = end.min(self.info.len());
        for info in &mut self.info[self.idx..end] {
            info.flags |= glyph_flag::UNSAFE_TO_BREAK;
        }
    }

    // --- reversal ----------------------------------------------------

    pub(crate) fn reverse(&mut self) {
        if self.is_empty() {
            return;
        }
        let len = self.len();
        self.reverse_range(0, len);
    }

    pub(crate) fn reverse_range(&mut self, start: usize, end: usize) {
        self.info[start..end].reverse();
        if !self.pos.is_empty() {
            self.pos[start..end].reverse();
        }
    }

    /// Reverses the buffer while keeping each cluster's entries in
    /// order.
    pub(crate) fn reverse_clusters(&mut self) {
        if self.is_empty() {
            return;
        }

        let mut start = 0;
        for i in 1..=self.len() {
            if i == self.len() || self.info[i].cluster != self.info[start].cluster {
                self.reverse_range(start, i);
                start = i;
            }
        }
        self.reverse();
    }

    // --- masks -------------------------------------------------------

    pub(crate) fn reset_masks(&mut self, mask: Mask) {
        for info in &mut self.info {
            info.mask = mask;
        }
    }

    /// The final monotone pass: cluster values become their running
    /// minimum from the right or from the left, following whichever
    /// orientation the buffer content already leans toward. It runs
    /// before the visual-order reversal, so the endpoints, not the
    /// direction flag, tell ascending from descending content.
    pub(crate) fn make_clusters_monotone(&mut self) {
        if self.cluster_level == BufferClusterLevel::Characters || self.is_empty() {
            return;
        }

        let ascending = self.info[0].cluster <= self.info[self.info.len() - 1].cluster;
        if ascending {
            // Non-decreasing: running minimum from the right.
            let mut min = self.info[self.info.len() - 1].cluster;
            for info in self.info.iter_mut().rev() {
                min = min.min(info.cluster);
                info.cluster = min;
            }
        } else {
            // Non-increasing: running minimum from the left.
            let mut min = self.info[0].cluster;
            for info in self.info.iter_mut() {
                min = min.min(info.cluster);
                info.cluster = min;
            }
        }
    }
}

impl Default for Buffer {
    fn default() -> Self {
        Buffer::new()
    }
}

/// A buffer being filled with Unicode text, before shaping.
pub struct UnicodeBuffer(pub(crate) Buffer);

impl UnicodeBuffer {
    pub fn new() -> Self {
        UnicodeBuffer(Buffer::new())
    }

    /// Appends text; cluster values are character indices continuing
    /// from what the buffer already holds.
    pub fn push_str(&mut self, text: &str) {
        let base = self.0.len() as u32;
        self.0.reserve(text.chars().count());
        for (i, c) in text.chars().enumerate() {
            self.0.push(c, base + i as u32);
        }
    }

    /// Appends a single scalar with an explicit cluster value.
    pub fn add(&mut self, c: char, cluster: u32) {
        self.0.push(c, cluster);
    }

    pub fn set_direction(&mut self, direction: Direction) {
        self.0.direction = direction;
    }

    pub fn set_script(&mut self, script: Script) {
        self.0.script = Some(script);
    }

    pub fn set_language(&mut self, language: Language) {
        self.0.language = Some(language);
    }

    pub fn set_flags(&mut self, flags: BufferFlags) {
        self.0.flags = flags;
    }

    pub fn set_cluster_level(&mut self, level: BufferClusterLevel) {
        self.0.cluster_level = level;
    }

    /// Codepoints preceding the buffer, nearest first; used when rules
    /// match at the left edge.
    pub fn set_pre_context(&mut self, text: &str) {
        self.0.set_pre_context(text.chars().rev());
    }

    pub fn set_post_context(&mut self, text: &str) {
        self.0.set_post_context(text.chars());
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn clear(&mut self) {
        self.0.clear();
    }
}

impl Default for UnicodeBuffer {
    fn default() -> Self {
        UnicodeBuffer::new()
    }
}

/// The result of shaping: glyphs in visual order with positions.
pub struct GlyphBuffer(pub(crate) Buffer);

impl GlyphBuffer {
    #[inline]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[inline]
    pub fn glyph_infos(&self) -> &[GlyphInfo] {
        &self.0.info
    }

    #[inline]
    pub fn glyph_positions(&self) -> &[GlyphPosition] {
        &self.0.pos
    }

    /// Recycles the allocation into a fresh input buffer.
    pub fn clear(mut self) -> UnicodeBuffer {
        self.0.clear();
        UnicodeBuffer(self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filled(text: &str) -> Buffer {
        let mut b = UnicodeBuffer::new();
        b.push_str(text);
        b.0
    }

    #[test]
    fn push_str_assigns_char_clusters() {
        let b = filled("a\u{0301}b");
        let clusters: Vec<_> = b.info.iter().map(|i| i.cluster).collect();
        assert_eq!(clusters, [0, 1, 2]);
    }

    #[test]
    fn merge_clusters_takes_minimum() {
        let mut b = filled("abcd");
        b.info[0].cluster = 3;
        b.info[1].cluster = 1;
        b.info[2].cluster = 2;
        b.merge_clusters(0, 3);
        assert_eq!(b.info[0].cluster, 1);
        assert_eq!(b.info[1].cluster, 1);
        assert_eq!(b.info[2].cluster, 1);
        assert_eq!(b.info[3].cluster, 3);
    }

    #[test]
    fn replace_glyphs_expands() {
        let mut b = filled("ab");
        b.clear_output();
        b.replace_glyphs(1, &[GlyphId(10), GlyphId(11), GlyphId(12)]);
        b.next_glyph();
        b.swap_buffers();

        assert_eq!(b.len(), 4);
        assert_eq!(b.info[0].glyph_id, 10);
        assert_eq!(b.info[2].glyph_id, 12);
        // Expanded entries inherit the source cluster and lose their
        // codepoint.
        assert_eq!(b.info[1].cluster, 0);
        assert_eq!(b.info[1].codepoint, 0);
        assert_eq!(b.info[3].codepoint, 'b' as u32);
    }

    #[test]
    fn ligature_collapse_keeps_min_cluster() {
        let mut b = filled("fi");
        b.clear_output();
        b.replace_glyphs(2, &[GlyphId(77)]);
        b.swap_buffers();
        assert_eq!(b.len(), 1);
        assert_eq!(b.info[0].cluster, 0);
        assert_eq!(b.info[0].glyph_id, 77);
    }

    #[test]
    fn reverse_clusters_keeps_cluster_runs() {
        let mut b = filled("abc");
        b.info[1].cluster = 0; // a+b one cluster
        b.reverse_clusters();
        let clusters: Vec<_> = b.info.iter().map(|i| i.cluster).collect();
        assert_eq!(clusters, [2, 0, 0]);
        let chars: Vec<_> = b.info.iter().map(|i| i.codepoint).collect();
        assert_eq!(chars, ['c' as u32, 'a' as u32, 'b' as u32]);
    }

    #[test]
    fn monotone_pass_is_non_decreasing() {
        let mut b = filled("abcd");
        b.info[0].cluster = 2;
        b.info[1].cluster = 0;
        b.info[2].cluster = 1;
        b.info[3].cluster = 3;
        b.make_clusters_monotone();
        let clusters: Vec<_> = b.info.iter().map(|i| i.cluster).collect();
        assert_eq!(clusters, [0, 0, 1, 3]);
        assert!(clusters.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn monotone_pass_keeps_descending_runs() {
        let mut b = filled("abc");
        b.info[0].cluster = 2;
        b.info[1].cluster = 2;
        b.info[2].cluster = 0;
        b.make_clusters_monotone();
        let clusters: Vec<_> = b.info.iter().map(|i| i.cluster).collect();
        assert_eq!(clusters, [2, 2, 0]);
    }

    #[test]
    fn lig_props_round_trip() {
        let mut info = GlyphInfo::default();
        info.set_lig_props_for_ligature(3, 2);
        assert_eq!(info.lig_id(), 3);
        assert_eq!(info.lig_comp(), 0);
        assert_eq!(info.lig_num_comps(), 2);

        info.set_lig_props_for_mark(3, 1);
        assert_eq!(info.lig_id(), 3);
        assert_eq!(info.lig_comp(), 1);
    }
}
