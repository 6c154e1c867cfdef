//! Normalizes the codepoint stream to what the shapers expect.
//!
//! Three steps: decompose (always for scripts whose shaper wants a
//! decomposed stream, otherwise only where the font lacks a composed
//! glyph), stable-sort runs of non-starters by modified combining
//! class, then recompose pairs when the shaper prefers composed
//! diacritics and the font has the composite.

use crate::buffer::Buffer;
use crate::complex::ComplexShaper;
use crate::face::Face;
use crate::unicode::CharExt;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum ShapeNormalizationMode {
    /// Leave everything maximally decomposed.
    Decomposed,
    /// Recompose diacritics onto their starters where possible.
    ComposedDiacritics,
}

pub(crate) struct NormalizeContext<'a> {
    pub face: &'a Face,
    pub shaper: &'a ComplexShaper,
}

impl<'a> NormalizeContext<'a> {
    fn decompose(&self, ab: char) -> Option<(char, Option<char>)> {
        if let Some(hook) = self.shaper.decompose {
            if let Some(result) = hook(ab) {
                return Some(result);
            }
        }

        let parts = unic_ucd_normal::canonical_decomposition(ab)?;
        match parts {
            [a] => Some((*a, None)),
            [a, b] => Some((*a, Some(*b))),
            _ => None,
        }
    }

    fn compose(&self, a: char, b: char) -> Option<char> {
        if let Some(hook) = self.shaper.compose {
            if let Some(result) = hook(a, b) {
                return Some(result);
            }
        }

        unic_ucd_normal::compose(a, b)
    }

    fn has_glyph(&self, c: char) -> bool {
        self.face.glyph_index(c as u32).is_some()
    }
}

pub(crate) fn normalize(shaper: &ComplexShaper, face: &Face, buffer: &mut Buffer) {
    if buffer.is_empty() {
        return;
    }

    let ctx = NormalizeContext { face, shaper };
    let mode = shaper.normalization_mode;

    // Step 1: decompose. In composed mode, characters the font can
    // render stay untouched (the short-circuit); in decomposed mode
    // everything with a decomposition comes apart.
    let shortest = mode == ShapeNormalizationMode::ComposedDiacritics;
    buffer.clear_output();
    while buffer.idx < buffer.info.len() {
        decompose_current_character(&ctx, buffer, shortest);
    }
    buffer.swap_buffers();

    // Step 2: reorder non-starter runs by modified combining class.
    let len = buffer.len();
    let mut i = 0;
    while i < len {
        if buffer.info[i].modified_combining_class() == 0 {
            i += 1;
            continue;
        }

        let mut end = i + 1;
        while end < len && buffer.info[end].modified_combining_class() != 0 {
            end += 1;
        }

        sort_marks(buffer, i, end);

        if let Some(reorder) = shaper.reorder_marks {
            reorder(buffer, i, end);
        }

        i = end;
    }

    // Step 3: recompose.
    if mode != ShapeNormalizationMode::ComposedDiacritics {
        return;
    }

    let count = buffer.len();
    buffer.clear_output();
    let mut starter = 0;
    buffer.next_glyph();
    while buffer.idx < count {
        let cur = buffer.info[buffer.idx];
        let cur_cc = cur.modified_combining_class();
        let prev_cc = buffer.out_info[buffer.out_len() - 1].modified_combining_class();

        // A non-starter composes with its starter only when nothing in
        // between has an equal or higher class (the blocking rule).
        if cur_cc != 0 && (starter == buffer.out_len() - 1 || prev_cc < cur_cc) {
            let a = char::from_u32(buffer.out_info[starter].codepoint).unwrap_or('\u{FFFD}');
            if let Some(composed) = ctx.compose(a, cur.as_char()) {
                if ctx.has_glyph(composed) {
                    buffer.next_glyph();
                    let out_len = buffer.out_len();
                    buffer.merge_out_clusters(starter, out_len);
                    buffer.out_info.pop();
                    buffer.out_info[starter].codepoint = composed as u32;
                    buffer.out_info[starter].glyph_id = 0;
                    let mut scratch = buffer.scratch_flags;
                    buffer.out_info[starter].init_unicode_props(&mut scratch);
                    buffer.scratch_flags = scratch;
                    continue;
                }
            }
        }

        buffer.next_glyph();
        if buffer.out_info[buffer.out_len() - 1].modified_combining_class() == 0 {
            starter = buffer.out_len() - 1;
        }
    }
    buffer.swap_buffers();
}

fn decompose_current_character(ctx: &NormalizeContext, buffer: &mut Buffer, shortest: bool) {
    let c = buffer.info[buffer.idx].as_char();

    if shortest && ctx.has_glyph(c) {
        buffer.next_glyph();
        return;
    }

    if decompose(ctx, buffer, shortest, c) {
        buffer.skip_char();
        return;
    }

    if !shortest && ctx.has_glyph(c) {
        buffer.next_glyph();
        return;
    }

    // Default ignorables without a glyph become zero-width no-ops
    // rather than .notdef boxes; mapping them to space lets the hide
    // pass zero them out.
    if c.is_default_ignorable() && ctx.has_glyph(' ') {
        buffer.output_char(' ');
        buffer.skip_char();
        return;
    }

    buffer.next_glyph();
}

/// Writes the deepest decomposition of `ab` the font can render.
/// Returns false without touching the buffer when there is none.
fn decompose(ctx: &NormalizeContext, buffer: &mut Buffer, shortest: bool, ab: char) -> bool {
    let (a, b) = match ctx.decompose(ab) {
        Some(v) => v,
        None => return false,
    };

    if let Some(b) = b {
        if !ctx.has_glyph(b) {
            return false;
        }
    }

    let has_a = ctx.has_glyph(a);
    if shortest && has_a {
        buffer.output_char(a);
        if let Some(b) = b {
            buffer.output_char(b);
        }
        return true;
    }

    if decompose(ctx, buffer, shortest, a) {
        if let Some(b) = b {
            buffer.output_char(b);
        }
        return true;
    }

    if has_a {
        buffer.output_char(a);
        if let Some(b) = b {
            buffer.output_char(b);
        }
        return true;
    }

    false
}

/// Stable insertion sort; mark runs are short and mostly sorted.
fn sort_marks(buffer: &mut Buffer, start: usize, end: usize) {
    let info = &mut buffer.info[start..end];
    let mut i = 1;
    while i < info.len() {
        let mut j = i;
        while j > 0
            && info[j - 1].modified_combining_class() > info[j].modified_combining_class()
        {
            info.swap(j - 1, j);
            j -= 1;
        }
        i += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::UnicodeBuffer;
    use crate::complex::DEFAULT_SHAPER;

    fn face_with(chars: &[char]) -> Face {
        Face::builder()
            .cmap(chars.iter().enumerate().map(|(i, c)| (*c as u32, i as u16 + 1)))
            .build()
    }

    fn codepoints(buffer: &Buffer) -> Vec<u32> {
        buffer.info.iter().map(|i| i.codepoint).collect()
    }

    #[test]
    fn composes_when_font_has_composite() {
        let face = face_with(&['e', '\u{0301}', '\u{00E9}']);
        let mut b = UnicodeBuffer::new();
        b.push_str("e\u{0301}");
        let mut buffer = b.0;
        for i in 0..buffer.len() {
            let mut scratch = buffer.scratch_flags;
            buffer.info[i].init_unicode_props(&mut scratch);
            buffer.scratch_flags = scratch;
        }

        normalize(&DEFAULT_SHAPER, &face, &mut buffer);
        assert_eq!(codepoints(&buffer), [0x00E9]);
        assert_eq!(buffer.info[0].cluster, 0);
    }

    #[test]
    fn decomposes_when_font_lacks_composite() {
        let face = face_with(&['e', '\u{0301}']);
        let mut b = UnicodeBuffer::new();
        b.push_str("\u{00E9}");
        let mut buffer = b.0;
        for i in 0..buffer.len() {
            let mut scratch = buffer.scratch_flags;
            buffer.info[i].init_unicode_props(&mut scratch);
            buffer.scratch_flags = scratch;
        }

        normalize(&DEFAULT_SHAPER, &face, &mut buffer);
        assert_eq!(codepoints(&buffer), ['e' as u32, 0x0301]);
        // Both halves keep the source cluster.
        assert_eq!(buffer.info[0].cluster, 0);
        assert_eq!(buffer.info[1].cluster, 0);
    }

    #[test]
    fn marks_sort_by_modified_class() {
        // acute (230) + dot below (220): the below mark must move first.
        let face = face_with(&['a', '\u{0301}', '\u{0323}']);
        let mut b = UnicodeBuffer::new();
        b.push_str("a\u{0301}\u{0323}");
        let mut buffer = b.0;
        for i in 0..buffer.len() {
            let mut scratch = buffer.scratch_flags;
            buffer.info[i].init_unicode_props(&mut scratch);
            buffer.scratch_flags = scratch;
        }

        normalize(&DEFAULT_SHAPER, &face, &mut buffer);
        assert_eq!(codepoints(&buffer), ['a' as u32, 0x0323, 0x0301]);
    }
}
