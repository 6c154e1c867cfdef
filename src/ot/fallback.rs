//! Heuristic mark positioning for fonts without usable GPOS: combining
//! marks are placed by canonical combining class relative to the glyph
//! they follow.

use crate::buffer::Buffer;
use crate::face::Face;
use crate::tables::gdef::GlyphClass;

/// Re-sorts runs of non-starters by modified combining class, so both
/// `ccmp` lookups and the placement below see canonical order.
pub(crate) fn recategorize_combining_marks(buffer: &mut Buffer) {
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

        // Stable insertion sort; runs are short.
        let info = &mut buffer.info[i..end];
        let mut a = 1;
        while a < info.len() {
            let mut b = a;
            while b > 0
                && info[b - 1].modified_combining_class() > info[b].modified_combining_class()
            {
                info.swap(b - 1, b);
                b -= 1;
            }
            a += 1;
        }

        i = end;
    }
}

fn is_mark(face: &Face, buffer: &Buffer, i: usize) -> bool {
    face.glyph_class(buffer.info[i].as_glyph()) == Some(GlyphClass::Mark)
        || buffer.info[i].is_unicode_mark()
}

/// Where a mark sits relative to its base, derived from the raw
/// combining class of its source character.
#[derive(Clone, Copy, PartialEq)]
enum MarkPlacement {
    Above,
    Below,
    /// Overlays, nuktas and the Hebrew vowel points stay close to the
    /// baseline.
    Attached,
    None,
}

fn classify(c: char) -> MarkPlacement {
    let cc = unicode_ccc::get_canonical_combining_class(c) as u8;
    match cc {
        230 | 27..=33 | 35 | 36 => MarkPlacement::Above,
        220 | 202 | 34 => MarkPlacement::Below,
        1 | 7 | 9 => MarkPlacement::Attached,
        10..=26 => MarkPlacement::Attached,
        214 | 216 | 218 | 222 | 224 | 226 | 228 | 232 | 233 | 234 => MarkPlacement::Above,
        _ => MarkPlacement::None,
    }
}

/// Positions combining marks over the previous base glyph by CCC
/// category. Only used when GPOS contributed nothing.
pub(crate) fn apply_fallback_mark_positioning(face: &Face, buffer: &mut Buffer) {
    let len = buffer.len();
    let unit = i32::from(face.units_per_em.max(16));

    let mut base: Option<usize> = None;
    for i in 0..len {
        if !is_mark(face, buffer, i) {
            base = Some(i);
            continue;
        }

        let base_idx = match base {
            Some(b) => b,
            None => continue,
        };

        let placement = classify(buffer.info[i].as_char());
        if placement == MarkPlacement::None {
            continue;
        }

        let base_advance = buffer.pos[base_idx].x_advance;
        let mark_advance = i32::from(face.glyph_h_advance(buffer.info[i].as_glyph()));

        // Center horizontally over the base, undoing the pen movement
        // of everything since the base started.
        let mut pen = 0;
        for k in base_idx..i {
            pen += buffer.pos[k].x_advance;
        }
        buffer.pos[i].x_offset = -pen + (base_advance - mark_advance) / 2;
        buffer.pos[i].x_advance = 0;
        buffer.pos[i].y_advance = 0;

        match placement {
            MarkPlacement::Above => buffer.pos[i].y_offset += unit / 8,
            MarkPlacement::Below => buffer.pos[i].y_offset -= unit / 8,
            MarkPlacement::Attached => buffer.pos[i].y_offset -= unit / 16,
            MarkPlacement::None => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::UnicodeBuffer;

    fn mark_face() -> Face {
        Face::builder()
            .units_per_em(1000)
            .cmap(vec![('a' as u32, 1), (0x0301, 2), (0x0323, 3)])
            .advances(vec![0, 500, 200, 200])
            .build()
    }

    fn shaped_buffer(text: &str) -> Buffer {
        let mut b = UnicodeBuffer::new();
        b.push_str(text);
        let mut buffer = b.0;
        for i in 0..buffer.len() {
            let mut scratch = buffer.scratch_flags;
            buffer.info[i].init_unicode_props(&mut scratch);
            buffer.scratch_flags = scratch;
        }
        buffer
    }

    #[test]
    fn above_mark_raises_below_mark_lowers() {
        let face = mark_face();
        let mut buffer = shaped_buffer("a\u{0301}\u{0323}");
        for (i, g) in [1u16, 2, 3].iter().enumerate() {
            buffer.info[i].glyph_id = *g;
        }
        buffer.sync_positions();
        buffer.pos[0].x_advance = 500;
        buffer.pos[1].x_advance = 200;
        buffer.pos[2].x_advance = 200;

        apply_fallback_mark_positioning(&face, &mut buffer);

        // Acute above: positive y, zero advance.
        assert!(buffer.pos[1].y_offset > 0);
        assert_eq!(buffer.pos[1].x_advance, 0);
        // Dot below: negative y.
        assert!(buffer.pos[2].y_offset < 0);
        // Both center over the base.
        assert!(buffer.pos[1].x_offset < 0);
    }

    #[test]
    fn recategorize_sorts_marks() {
        let mut buffer = shaped_buffer("a\u{0301}\u{0323}");
        recategorize_combining_marks(&mut buffer);
        assert_eq!(buffer.info[1].codepoint, 0x0323);
        assert_eq!(buffer.info[2].codepoint, 0x0301);
    }
}
