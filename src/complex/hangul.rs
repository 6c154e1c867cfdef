//! The Hangul shaper. Precomposed syllables decompose into L+V(+T)
//! jamo so the jamo-form features can fire; sequences no lookup
//! touched recompose at the end of the substitution pass.

use crate::buffer::{Buffer, GlyphInfo};
use crate::common::{Mask, Script};
use crate::complex::{ComplexShaper, ShaperData, ZeroWidthMarks};
use crate::face::Face;
use crate::normalize::ShapeNormalizationMode;
use crate::ot::feature;
use crate::ot::map::{FeatureFlags, Map, MapBuilder};
use crate::plan::ShapePlan;

pub const HANGUL_SHAPER: ComplexShaper = ComplexShaper {
    collect_features: Some(collect_features),
    data_create: Some(data_create),
    preprocess_text: None,
    postprocess_glyphs: None,
    normalization_mode: ShapeNormalizationMode::Decomposed,
    decompose: Some(decompose_syllable),
    compose: None,
    setup_masks: Some(setup_masks),
    reorder_marks: None,
    zero_width_marks: ZeroWidthMarks::None,
    fallback_position: false,
};

const S_BASE: u32 = 0xAC00;
const L_BASE: u32 = 0x1100;
const V_BASE: u32 = 0x1161;
const T_BASE: u32 = 0x11A7;
const L_COUNT: u32 = 19;
const V_COUNT: u32 = 21;
const T_COUNT: u32 = 28;
const N_COUNT: u32 = V_COUNT * T_COUNT;
const S_COUNT: u32 = L_COUNT * N_COUNT;

fn is_l(u: u32) -> bool {
    (L_BASE..L_BASE + L_COUNT).contains(&u)
}
fn is_v(u: u32) -> bool {
    (V_BASE..V_BASE + V_COUNT).contains(&u)
}
fn is_t(u: u32) -> bool {
    (T_BASE + 1..T_BASE + T_COUNT).contains(&u)
}
fn is_syllable(u: u32) -> bool {
    (S_BASE..S_BASE + S_COUNT).contains(&u)
}

/// Arithmetic decomposition: LVT -> (LV, T), LV -> (L, V).
fn decompose_syllable(ab: char) -> Option<(char, Option<char>)> {
    let u = ab as u32;
    if !is_syllable(u) {
        return None;
    }

    let s_index = u - S_BASE;
    if s_index % T_COUNT != 0 {
        let lv = S_BASE + (s_index / T_COUNT) * T_COUNT;
        let t = T_BASE + s_index % T_COUNT;
        Some((char::from_u32(lv)?, Some(char::from_u32(t)?)))
    } else {
        let l = L_BASE + s_index / N_COUNT;
        let v = V_BASE + (s_index % N_COUNT) / T_COUNT;
        Some((char::from_u32(l)?, Some(char::from_u32(v)?)))
    }
}

fn compose_jamo(a: u32, b: u32) -> Option<u32> {
    if is_l(a) && is_v(b) {
        return Some(S_BASE + ((a - L_BASE) * V_COUNT + (b - V_BASE)) * T_COUNT);
    }
    if is_syllable(a) && (a - S_BASE) % T_COUNT == 0 && is_t(b) {
        return Some(a + (b - T_BASE));
    }
    None
}

pub struct HangulShapePlan {
    mask_array: [Mask; 3],
}

pub fn collect_features(planner: &mut MapBuilder) {
    planner.add_feature(feature::LEADING_JAMO_FORMS, FeatureFlags::NONE, 1);
    planner.add_feature(feature::VOWEL_JAMO_FORMS, FeatureFlags::NONE, 1);
    planner.add_feature(feature::TRAILING_JAMO_FORMS, FeatureFlags::NONE, 1);

    // Recompose untouched jamo once the substitution features are
    // done.
    planner.add_gsub_pause(Some(recompose));
}

pub fn data_create(map: &Map, _script: Option<Script>) -> ShaperData {
    ShaperData::Hangul(HangulShapePlan {
        mask_array: [
            map.get_1_mask(feature::LEADING_JAMO_FORMS),
            map.get_1_mask(feature::VOWEL_JAMO_FORMS),
            map.get_1_mask(feature::TRAILING_JAMO_FORMS),
        ],
    })
}

fn jamo_class(info: &GlyphInfo) -> Option<usize> {
    let u = info.codepoint;
    if is_l(u) {
        Some(0)
    } else if is_v(u) {
        Some(1)
    } else if is_t(u) {
        Some(2)
    } else {
        None
    }
}

fn setup_masks(plan: &ShapePlan, _face: &Face, buffer: &mut Buffer) {
    let hangul_plan = match &plan.data {
        ShaperData::Hangul(p) => p,
        _ => return,
    };

    for info in &mut buffer.info {
        if let Some(class) = jamo_class(info) {
            info.mask |= hangul_plan.mask_array[class];
        }
    }
}

/// End-of-substitution pause: L+V(+T) runs nothing substituted merge
/// back into the precomposed syllable when the font can draw it.
fn recompose(_plan: &ShapePlan, face: &Face, buffer: &mut Buffer) {
    let mut i = 0;
    while i + 1 < buffer.len() {
        let a = &buffer.info[i];
        let b = &buffer.info[i + 1];

        if a.is_substituted() || b.is_substituted() {
            i += 1;
            continue;
        }

        let composed = match compose_jamo(a.codepoint, b.codepoint) {
            Some(c) => c,
            None => {
                i += 1;
                continue;
            }
        };

        let glyph = match face.glyph_index(composed) {
            Some(g) => g,
            None => {
                i += 1;
                continue;
            }
        };

        buffer.merge_clusters(i, i + 2);
        buffer.info[i].codepoint = composed;
        buffer.info[i].glyph_id = glyph.0;
        buffer.info.remove(i + 1);
        // Try the same position again: LV may still pick up a T.
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn syllable_decomposition_arithmetic() {
        // U+AC00 GA = L(0x1100) + V(0x1161)
        assert_eq!(
            decompose_syllable('\u{AC00}'),
            Some(('\u{1100}', Some('\u{1161}')))
        );
        // U+AC01 GAG = LV(0xAC00) + T(0x11A8)
        assert_eq!(
            decompose_syllable('\u{AC01}'),
            Some(('\u{AC00}', Some('\u{11A8}')))
        );
        assert_eq!(decompose_syllable('a'), None);
    }

    #[test]
    fn composition_round_trips() {
        for &s in &[0xAC00u32, 0xAC01, 0xD7A3, 0xB098] {
            let (a, b) = decompose_syllable(char::from_u32(s).unwrap()).unwrap();
            let b = b.unwrap();
            let (a, b) = match decompose_syllable(a) {
                // LVT decomposed twice: recompose inner pair first.
                Some((l, Some(v))) => {
                    let lv = compose_jamo(l as u32, v as u32).unwrap();
                    (char::from_u32(lv).unwrap(), b)
                }
                _ => (a, b),
            };
            assert_eq!(compose_jamo(a as u32, b as u32), Some(s));
        }
    }

    #[test]
    fn recompose_merges_untouched_jamo() {
        let face = Face::builder()
            .cmap(vec![(0xAC00, 7), (0x1100, 1), (0x1161, 2)])
            .build();
        let plan = ShapePlan::new(
            &face,
            crate::common::Direction::LeftToRight,
            Some(crate::common::script::HANGUL),
            None,
            &[],
        );

        let mut b = crate::buffer::UnicodeBuffer::new();
        b.push_str("\u{1100}\u{1161}");
        let mut buffer = b.0;
        recompose(&plan, &face, &mut buffer);

        assert_eq!(buffer.len(), 1);
        assert_eq!(buffer.info[0].codepoint, 0xAC00);
        assert_eq!(buffer.info[0].glyph_id, 7);
        assert_eq!(buffer.info[0].cluster, 0);
    }
}
