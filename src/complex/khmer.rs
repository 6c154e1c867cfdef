//! The Khmer shaper: coeng-consonant clusters take subscript form
//! masks, and the left-drawn dependent vowels (U+17C1..U+17C3) move in
//! front of the base consonant.

use crate::buffer::{Buffer, BufferFlags, BufferScratchFlags};
use crate::common::{Mask, Script};
use crate::complex::{ComplexShaper, ShaperData, ZeroWidthMarks};
use crate::face::Face;
use crate::normalize::ShapeNormalizationMode;
use crate::ot::feature;
use crate::ot::map::{FeatureFlags, Map, MapBuilder};
use crate::plan::ShapePlan;
use crate::unicode::DOTTED_CIRCLE;

pub const KHMER_SHAPER: ComplexShaper = ComplexShaper {
    collect_features: Some(collect_features),
    data_create: Some(data_create),
    preprocess_text: None,
    postprocess_glyphs: None,
    normalization_mode: ShapeNormalizationMode::Decomposed,
    decompose: None,
    compose: None,
    setup_masks: Some(setup_masks),
    reorder_marks: None,
    zero_width_marks: ZeroWidthMarks::None,
    fallback_position: false,
};

/// U+17D2 KHMER SIGN COENG: subscripts the following consonant.
const COENG: u32 = 0x17D2;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
enum Category {
    Other,
    Consonant,
    IndependentVowel,
    Coeng,
    /// E, AE, AI: drawn left of the base.
    PreVowel,
    Vowel,
    Sign,
    Zwj,
    Zwnj,
}

fn categorize(u: u32) -> Category {
    match u {
        0x1780..=0x17A2 => Category::Consonant,
        0x17A3..=0x17B3 => Category::IndependentVowel,
        COENG => Category::Coeng,
        0x17C1..=0x17C3 => Category::PreVowel,
        0x17B6..=0x17C0 | 0x17C4..=0x17C5 => Category::Vowel,
        0x17C6..=0x17D1 | 0x17DD => Category::Sign,
        0x200C => Category::Zwnj,
        0x200D => Category::Zwj,
        _ => Category::Other,
    }
}

pub struct KhmerShapePlan {
    blwf_mask: Mask,
    abvf_mask: Mask,
    pref_mask: Mask,
    pstf_mask: Mask,
}

pub fn collect_features(planner: &mut MapBuilder) {
    planner.enable_feature(feature::LOCALIZED_FORMS, FeatureFlags::NONE, 1);
    planner.enable_feature(feature::GLYPH_COMPOSITION_DECOMPOSITION, FeatureFlags::NONE, 1);

    planner.add_gsub_pause(Some(reorder));

    planner.add_feature(feature::PRE_BASE_FORMS, FeatureFlags::MANUAL_JOINERS, 1);
    planner.add_feature(feature::BELOW_BASE_FORMS, FeatureFlags::MANUAL_JOINERS, 1);
    planner.add_feature(feature::ABOVE_BASE_FORMS, FeatureFlags::MANUAL_JOINERS, 1);
    planner.add_feature(feature::POST_BASE_FORMS, FeatureFlags::MANUAL_JOINERS, 1);
    planner.add_gsub_pause(None);

    planner.enable_feature(feature::PRE_BASE_SUBSTITUTIONS, FeatureFlags::NONE, 1);
    planner.enable_feature(feature::ABOVE_BASE_SUBSTITUTIONS, FeatureFlags::NONE, 1);
    planner.enable_feature(feature::BELOW_BASE_SUBSTITUTIONS, FeatureFlags::NONE, 1);
    planner.enable_feature(feature::POST_BASE_SUBSTITUTIONS, FeatureFlags::NONE, 1);
}

pub fn data_create(map: &Map, _script: Option<Script>) -> ShaperData {
    ShaperData::Khmer(KhmerShapePlan {
        blwf_mask: map.get_1_mask(feature::BELOW_BASE_FORMS),
        abvf_mask: map.get_1_mask(feature::ABOVE_BASE_FORMS),
        pref_mask: map.get_1_mask(feature::PRE_BASE_FORMS),
        pstf_mask: map.get_1_mask(feature::POST_BASE_FORMS),
    })
}

fn setup_masks(plan: &ShapePlan, _face: &Face, buffer: &mut Buffer) {
    let khmer_plan = match &plan.data {
        ShaperData::Khmer(p) => p,
        _ => return,
    };

    for info in &mut buffer.info {
        info.complex_cat = categorize(info.codepoint) as u8;
    }

    find_syllables(buffer);

    // Every coeng + consonant pair takes the below-base form mask;
    // vowels and signs get their positional masks.
    let len = buffer.len();
    for i in 0..len {
        match categorize(buffer.info[i].codepoint) {
            Category::Coeng => {
                buffer.info[i].mask |= khmer_plan.blwf_mask;
                if i + 1 < len
                    && matches!(
                        categorize(buffer.info[i + 1].codepoint),
                        Category::Consonant | Category::IndependentVowel
                    )
                {
                    buffer.info[i + 1].mask |= khmer_plan.blwf_mask;
                }
            }
            Category::PreVowel => buffer.info[i].mask |= khmer_plan.pref_mask,
            Category::Vowel => {
                buffer.info[i].mask |= khmer_plan.abvf_mask | khmer_plan.pstf_mask
            }
            Category::Sign => buffer.info[i].mask |= khmer_plan.abvf_mask,
            _ => {}
        }
    }
}

/// One syllable: `(C | IV) (Coeng (C | IV))* vowels* signs*`.
fn find_syllables(buffer: &mut Buffer) {
    let len = buffer.len();
    let mut serial: u8 = 1;
    let mut i = 0;

    while i < len {
        let start = i;
        let cat = categorize(buffer.info[i].codepoint);

        let mut broken = false;
        match cat {
            Category::Consonant | Category::IndependentVowel => {
                i += 1;
                while i + 1 < len
                    && categorize(buffer.info[i].codepoint) == Category::Coeng
                    && matches!(
                        categorize(buffer.info[i + 1].codepoint),
                        Category::Consonant | Category::IndependentVowel
                    )
                {
                    i += 2;
                }
                while i < len {
                    match categorize(buffer.info[i].codepoint) {
                        Category::PreVowel
                        | Category::Vowel
                        | Category::Sign
                        | Category::Coeng
                        | Category::Zwj
                        | Category::Zwnj => i += 1,
                        _ => break,
                    }
                }
            }
            Category::Coeng | Category::PreVowel | Category::Vowel | Category::Sign => {
                broken = true;
                while i < len
                    && matches!(
                        categorize(buffer.info[i].codepoint),
                        Category::Coeng
                            | Category::PreVowel
                            | Category::Vowel
                            | Category::Sign
                    )
                {
                    i += 1;
                }
                buffer.scratch_flags |= BufferScratchFlags::HAS_BROKEN_SYLLABLE;
            }
            _ => i += 1,
        }

        let ty: u8 = if broken { 4 } else { 1 };
        let value = (serial << 4) | ty;
        for info in &mut buffer.info[start..i] {
            info.syllable = value;
        }
        serial = serial.wrapping_add(1);
        if serial == 0 {
            serial = 1;
        }
    }
}

/// Pause: dotted circles, then the pre-base vowels move to the front
/// of their syllable.
fn reorder(_plan: &ShapePlan, face: &Face, buffer: &mut Buffer) {
    insert_dotted_circles(face, buffer);

    let mut start = 0;
    while start < buffer.len() {
        let syllable = buffer.info[start].syllable;
        let mut end = start + 1;
        while end < buffer.len() && buffer.info[end].syllable == syllable {
            end += 1;
        }

        // The whole syllable is one cluster.
        buffer.merge_clusters(start, end);

        let mut i = start + 1;
        while i < end {
            if categorize(buffer.info[i].codepoint) == Category::PreVowel {
                let info = buffer.info[i];
                buffer.merge_clusters(start, i + 1);
                buffer.info.copy_within(start..i, start + 1);
                buffer.info[start] = info;
            }
            i += 1;
        }

        start = end;
    }
}

fn insert_dotted_circles(face: &Face, buffer: &mut Buffer) {
    if buffer.flags.contains(BufferFlags::DO_NOT_INSERT_DOTTED_CIRCLE)
        || !buffer
            .scratch_flags
            .contains(BufferScratchFlags::HAS_BROKEN_SYLLABLE)
    {
        return;
    }

    let dotted_circle = match face.glyph_index(DOTTED_CIRCLE) {
        Some(g) => g,
        None => return,
    };

    let mut i = 0;
    while i < buffer.len() {
        let syllable = buffer.info[i].syllable;
        if syllable & 0x0F == 4 && (i == 0 || buffer.info[i - 1].syllable != syllable) {
            let mut info = buffer.info[i];
            info.codepoint = DOTTED_CIRCLE;
            info.glyph_id = dotted_circle.0;
            info.complex_cat = Category::Consonant as u8;
            buffer.info.insert(i, info);
            i += 1;
        }
        i += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::UnicodeBuffer;
    use crate::common::{script, Direction};

    fn shape_plan(face: &Face) -> ShapePlan {
        ShapePlan::new(face, Direction::LeftToRight, Some(script::KHMER), None, &[])
    }

    fn prepared(text: &str) -> (Face, ShapePlan, Buffer) {
        let face = Face::builder().build();
        let plan = shape_plan(&face);
        let mut b = UnicodeBuffer::new();
        b.push_str(text);
        let mut buffer = b.0;
        setup_masks(&plan, &face, &mut buffer);
        (face, plan, buffer)
    }

    #[test]
    fn coeng_cluster_is_one_syllable() {
        // SA + COENG + RO + COENG + TA + II
        let (_, _, buffer) =
            prepared("\u{179F}\u{17D2}\u{179A}\u{17D2}\u{178F}\u{17B8}");
        let s = buffer.info[0].syllable;
        assert!(buffer.info.iter().all(|i| i.syllable == s));
    }

    #[test]
    fn pre_vowel_moves_to_front() {
        let (face, plan, mut buffer) = prepared("\u{1780}\u{17C1}"); // KA + E
        reorder(&plan, &face, &mut buffer);
        let cps: Vec<_> = buffer.info.iter().map(|i| i.codepoint).collect();
        assert_eq!(cps, vec![0x17C1, 0x1780]);
        assert_eq!(buffer.info[0].cluster, 0);
        assert_eq!(buffer.info[1].cluster, 0);
    }

    #[test]
    fn orphan_vowel_is_broken_cluster() {
        let (_, _, buffer) = prepared("\u{17C1}");
        assert_eq!(buffer.info[0].syllable & 0x0F, 4);
        assert!(buffer
            .scratch_flags
            .contains(BufferScratchFlags::HAS_BROKEN_SYLLABLE));
    }
}
