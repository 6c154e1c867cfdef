//! The Thai/Lao shaper. Thai is stored in visual order, but the
//! substitution rules expect logical order: preposed vowels swap
//! behind their consonant for the GSUB passes and swap back at the
//! end. SARA AM splits into its nikhahit and SARA AA halves.

use crate::buffer::Buffer;
use crate::complex::{ComplexShaper, ZeroWidthMarks};
use crate::face::Face;
use crate::normalize::ShapeNormalizationMode;
use crate::plan::ShapePlan;

pub const THAI_SHAPER: ComplexShaper = ComplexShaper {
    collect_features: None,
    data_create: None,
    preprocess_text: Some(preprocess_text),
    postprocess_glyphs: Some(postprocess_glyphs),
    normalization_mode: ShapeNormalizationMode::Decomposed,
    decompose: Some(decompose),
    compose: None,
    setup_masks: None,
    reorder_marks: None,
    zero_width_marks: ZeroWidthMarks::ByGdefLate,
    fallback_position: true,
};

/// Vowels written before their consonant: Thai SARA E..SARA AI
/// MAIMALAI, and their Lao equivalents.
fn is_preposed_vowel(u: u32) -> bool {
    matches!(u, 0x0E40..=0x0E44 | 0x0EC0..=0x0EC4)
}

fn is_consonant(u: u32) -> bool {
    matches!(u, 0x0E01..=0x0E2E | 0x0E81..=0x0EAE)
}

/// SARA AM and its Lao sibling split into the nasal mark plus the AA
/// vowel, which is what fonts carry lookups for.
fn decompose(ab: char) -> Option<(char, Option<char>)> {
    match ab as u32 {
        0x0E33 => Some(('\u{0E4D}', Some('\u{0E32}'))),
        0x0EB3 => Some(('\u{0ECD}', Some('\u{0EB2}'))),
        _ => None,
    }
}

/// Swaps each preposed vowel behind its consonant so lookups see
/// logical order. The pair merges into one cluster.
fn preprocess_text(_plan: &ShapePlan, _face: &Face, buffer: &mut Buffer) {
    let len = buffer.len();
    let mut i = 0;
    while i + 1 < len {
        if is_preposed_vowel(buffer.info[i].codepoint)
            && is_consonant(buffer.info[i + 1].codepoint)
        {
            buffer.merge_clusters(i, i + 2);
            buffer.info.swap(i, i + 1);
            i += 2;
            continue;
        }
        i += 1;
    }
}

/// Restores visual order: the vowel goes back to the left of its
/// consonant.
fn postprocess_glyphs(_plan: &ShapePlan, _face: &Face, buffer: &mut Buffer) {
    let len = buffer.len();
    let mut i = 0;
    while i + 1 < len {
        if is_consonant(buffer.info[i].codepoint)
            && is_preposed_vowel(buffer.info[i + 1].codepoint)
            && buffer.info[i].cluster == buffer.info[i + 1].cluster
        {
            buffer.info.swap(i, i + 1);
            if !buffer.pos.is_empty() {
                buffer.pos.swap(i, i + 1);
            }
            i += 2;
            continue;
        }
        i += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::UnicodeBuffer;
    use crate::common::{script, Direction};

    fn plan(face: &Face) -> ShapePlan {
        ShapePlan::new(face, Direction::LeftToRight, Some(script::THAI), None, &[])
    }

    #[test]
    fn preposed_vowel_round_trip() {
        let face = Face::builder().build();
        let plan = plan(&face);

        let mut b = UnicodeBuffer::new();
        b.push_str("\u{0E40}\u{0E01}"); // SARA E + KO KAI
        let mut buffer = b.0;

        preprocess_text(&plan, &face, &mut buffer);
        // Logical order for the lookups: consonant first.
        assert_eq!(buffer.info[0].codepoint, 0x0E01);
        assert_eq!(buffer.info[1].codepoint, 0x0E40);
        assert_eq!(buffer.info[0].cluster, buffer.info[1].cluster);

        postprocess_glyphs(&plan, &face, &mut buffer);
        // Visual order restored.
        assert_eq!(buffer.info[0].codepoint, 0x0E40);
        assert_eq!(buffer.info[1].codepoint, 0x0E01);
    }

    #[test]
    fn sara_am_splits() {
        assert_eq!(decompose('\u{0E33}'), Some(('\u{0E4D}', Some('\u{0E32}'))));
        assert_eq!(decompose('\u{0E01}'), None);
    }
}
