//! The Myanmar shaper: syllable segmentation over the Myanmar block,
//! pre-base reordering of the vowel sign E (U+1031) and medial Ra
//! (U+103C), and the subjoined-consonant masks.

use crate::buffer::{Buffer, BufferFlags, BufferScratchFlags};
use crate::common::{Mask, Script};
use crate::complex::{ComplexShaper, ShaperData, ZeroWidthMarks};
use crate::face::Face;
use crate::normalize::ShapeNormalizationMode;
use crate::ot::feature;
use crate::ot::map::{FeatureFlags, Map, MapBuilder};
use crate::plan::ShapePlan;
use crate::unicode::DOTTED_CIRCLE;

pub const MYANMAR_SHAPER: ComplexShaper = ComplexShaper {
    collect_features: Some(collect_features),
    data_create: Some(data_create),
    preprocess_text: None,
    postprocess_glyphs: None,
    normalization_mode: ShapeNormalizationMode::Decomposed,
    decompose: None,
    compose: None,
    setup_masks: Some(setup_masks),
    reorder_marks: None,
    zero_width_marks: ZeroWidthMarks::ByGdefEarly,
    fallback_position: false,
};

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
enum Category {
    Other,
    Consonant,
    /// U+1039, joins the following consonant under the previous one.
    Virama,
    /// U+103A killer.
    Asat,
    MedialYa,  // 0x103B
    MedialRa,  // 0x103C, drawn around/left of the base
    MedialWa,  // 0x103D
    MedialHa,  // 0x103E
    VowelE,    // 0x1031, drawn left of the base
    VowelAbove,
    VowelBelow,
    VowelPost,
    Anusvara,
    Sign,
    Zwj,
    Zwnj,
}

fn categorize(u: u32) -> Category {
    match u {
        0x1000..=0x1020 | 0x103F | 0x104E | 0x1050..=0x1055 | 0x105A..=0x105D | 0x1061
        | 0x1065..=0x1066 | 0x106E..=0x1070 | 0x1075..=0x1081 | 0x108E => Category::Consonant,
        0x1039 => Category::Virama,
        0x103A => Category::Asat,
        0x103B => Category::MedialYa,
        0x103C => Category::MedialRa,
        0x103D => Category::MedialWa,
        0x103E => Category::MedialHa,
        0x1031 => Category::VowelE,
        0x102D | 0x102E | 0x1032..=0x1035 | 0x1071..=0x1074 | 0x1085 => Category::VowelAbove,
        0x102F | 0x1030 | 0x1058..=0x1059 => Category::VowelBelow,
        0x102B | 0x102C | 0x1056..=0x1057 | 0x1062..=0x1064 | 0x1067..=0x106D
        | 0x1083..=0x1084 => Category::VowelPost,
        0x1036 => Category::Anusvara,
        0x1037 | 0x1038 | 0x1086..=0x108D | 0x108F | 0x109A..=0x109D => Category::Sign,
        0x200C => Category::Zwnj,
        0x200D => Category::Zwj,
        _ => Category::Other,
    }
}

pub struct MyanmarShapePlan {
    blwf_mask: Mask,
    pref_mask: Mask,
    pstf_mask: Mask,
}

pub fn collect_features(planner: &mut MapBuilder) {
    planner.enable_feature(feature::LOCALIZED_FORMS, FeatureFlags::NONE, 1);
    planner.enable_feature(feature::GLYPH_COMPOSITION_DECOMPOSITION, FeatureFlags::NONE, 1);

    planner.add_gsub_pause(Some(reorder));

    planner.add_feature(feature::REPH_FORMS, FeatureFlags::MANUAL_JOINERS, 1);
    planner.add_gsub_pause(None);
    planner.add_feature(feature::PRE_BASE_FORMS, FeatureFlags::MANUAL_JOINERS, 1);
    planner.add_gsub_pause(None);
    planner.add_feature(feature::BELOW_BASE_FORMS, FeatureFlags::MANUAL_JOINERS, 1);
    planner.add_gsub_pause(None);
    planner.add_feature(feature::POST_BASE_FORMS, FeatureFlags::MANUAL_JOINERS, 1);
    planner.add_gsub_pause(None);

    planner.enable_feature(feature::PRE_BASE_SUBSTITUTIONS, FeatureFlags::NONE, 1);
    planner.enable_feature(feature::ABOVE_BASE_SUBSTITUTIONS, FeatureFlags::NONE, 1);
    planner.enable_feature(feature::BELOW_BASE_SUBSTITUTIONS, FeatureFlags::NONE, 1);
    planner.enable_feature(feature::POST_BASE_SUBSTITUTIONS, FeatureFlags::NONE, 1);
}

pub fn data_create(map: &Map, _script: Option<Script>) -> ShaperData {
    ShaperData::Myanmar(MyanmarShapePlan {
        blwf_mask: map.get_1_mask(feature::BELOW_BASE_FORMS),
        pref_mask: map.get_1_mask(feature::PRE_BASE_FORMS),
        pstf_mask: map.get_1_mask(feature::POST_BASE_FORMS),
    })
}

fn setup_masks(plan: &ShapePlan, _face: &Face, buffer: &mut Buffer) {
    let myanmar_plan = match &plan.data {
        ShaperData::Myanmar(p) => p,
        _ => return,
    };

    for info in &mut buffer.info {
        info.complex_cat = categorize(info.codepoint) as u8;
    }

    find_syllables(buffer);

    // Subjoined consonants (virama + C) take below-base forms; the
    // medials get their positional form masks.
    let len = buffer.len();
    for i in 0..len {
        match categorize(buffer.info[i].codepoint) {
            Category::Virama => {
                buffer.info[i].mask |= myanmar_plan.blwf_mask;
                if i + 1 < len
                    && categorize(buffer.info[i + 1].codepoint) == Category::Consonant
                {
                    buffer.info[i + 1].mask |= myanmar_plan.blwf_mask;
                }
            }
            Category::MedialRa => buffer.info[i].mask |= myanmar_plan.pref_mask,
            Category::MedialWa | Category::MedialHa => {
                buffer.info[i].mask |= myanmar_plan.blwf_mask
            }
            Category::MedialYa | Category::VowelPost => {
                buffer.info[i].mask |= myanmar_plan.pstf_mask
            }
            _ => {}
        }
    }
}

/// One syllable: `C (Virama C)* Asat? medials* vowels* signs*`, or a
/// lone cluster of combining pieces (broken).
fn find_syllables(buffer: &mut Buffer) {
    let len = buffer.len();
    let mut serial: u8 = 1;
    let mut i = 0;

    while i < len {
        let start = i;
        let cat = categorize(buffer.info[i].codepoint);

        let broken = !matches!(cat, Category::Consonant | Category::Other);
        if cat == Category::Consonant {
            i += 1;
            // Conjunct chain.
            while i + 1 < len
                && categorize(buffer.info[i].codepoint) == Category::Virama
                && categorize(buffer.info[i + 1].codepoint) == Category::Consonant
            {
                i += 2;
            }
            // Trailing killer, medials, vowels, signs.
            while i < len {
                match categorize(buffer.info[i].codepoint) {
                    Category::Asat
                    | Category::MedialYa
                    | Category::MedialRa
                    | Category::MedialWa
                    | Category::MedialHa
                    | Category::VowelE
                    | Category::VowelAbove
                    | Category::VowelBelow
                    | Category::VowelPost
                    | Category::Anusvara
                    | Category::Sign
                    | Category::Zwj
                    | Category::Zwnj => i += 1,
                    _ => break,
                }
            }
        } else if broken {
            while i < len
                && !matches!(
                    categorize(buffer.info[i].codepoint),
                    Category::Consonant | Category::Other
                )
            {
                i += 1;
            }
            buffer.scratch_flags |= BufferScratchFlags::HAS_BROKEN_SYLLABLE;
        } else {
            i += 1;
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

/// Pause: dotted circles for broken clusters, then move the
/// left-drawn pieces (vowel E, medial Ra) in front of the base.
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

        reorder_syllable(buffer, start, end);
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

fn reorder_syllable(buffer: &mut Buffer, start: usize, end: usize) {
    // The base is the first consonant of the syllable.
    let base = match (start..end)
        .find(|&i| categorize(buffer.info[i].codepoint) == Category::Consonant)
    {
        Some(b) => b,
        None => return,
    };

    // Medial Ra first (it wraps outermost), then vowel E in front of
    // it: visual order is E, Ra, base.
    for &cat in &[Category::MedialRa, Category::VowelE] {
        let mut i = base + 1;
        while i < end {
            if categorize(buffer.info[i].codepoint) == cat {
                let info = buffer.info[i];
                buffer.merge_clusters(start, i + 1);
                buffer.info.copy_within(start..i, start + 1);
                buffer.info[start] = info;
            }
            i += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::UnicodeBuffer;

    fn reordered(text: &str) -> Vec<u32> {
        let face = Face::builder().build();
        let mut b = UnicodeBuffer::new();
        b.push_str(text);
        let mut buffer = b.0;
        for info in &mut buffer.info {
            info.complex_cat = categorize(info.codepoint) as u8;
        }
        find_syllables(&mut buffer);
        reorder(
            // The reorder pause ignores the plan.
            &crate::plan::ShapePlan::new(
                &face,
                crate::common::Direction::LeftToRight,
                Some(crate::common::script::MYANMAR),
                None,
                &[],
            ),
            &face,
            &mut buffer,
        );
        buffer.info.iter().map(|i| i.codepoint).collect()
    }

    #[test]
    fn vowel_e_moves_before_base() {
        // KA + E (stored base-first, drawn vowel-first).
        assert_eq!(reordered("\u{1000}\u{1031}"), vec![0x1031, 0x1000]);
    }

    #[test]
    fn medial_ra_and_e_order() {
        // KA + MEDIAL RA + E renders as E, RA, KA.
        assert_eq!(
            reordered("\u{1000}\u{103C}\u{1031}"),
            vec![0x1031, 0x103C, 0x1000]
        );
    }

    #[test]
    fn conjunct_stays_one_syllable() {
        let mut b = UnicodeBuffer::new();
        // KA + VIRAMA + KHA + E
        b.push_str("\u{1000}\u{1039}\u{1001}\u{1031}");
        let mut buffer = b.0;
        for info in &mut buffer.info {
            info.complex_cat = categorize(info.codepoint) as u8;
        }
        find_syllables(&mut buffer);
        let s = buffer.info[0].syllable;
        assert!(buffer.info.iter().all(|i| i.syllable == s));
    }
}
