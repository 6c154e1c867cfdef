//! The Arabic shaper, also covering Syriac, N'Ko and Mongolian: a
//! joining-type state machine assigns the `isol`/`init`/`medi`/`fina`
//! family of masks per position, and modifier combining marks are
//! reordered per UTR#53.

use crate::buffer::Buffer;
use crate::common::{script, Mask, Script, Tag};
use crate::complex::{ComplexShaper, ShaperData, ZeroWidthMarks};
use crate::face::Face;
use crate::normalize::ShapeNormalizationMode;
use crate::ot::feature;
use crate::ot::map::{FeatureFlags, Map, MapBuilder};
use crate::plan::ShapePlan;
use crate::unicode::{CharExt, GeneralCategory};

pub const ARABIC_SHAPER: ComplexShaper = ComplexShaper {
    collect_features: Some(collect_features),
    data_create: Some(data_create),
    preprocess_text: None,
    postprocess_glyphs: None,
    normalization_mode: ShapeNormalizationMode::ComposedDiacritics,
    decompose: None,
    compose: None,
    setup_masks: Some(setup_masks),
    reorder_marks: Some(reorder_marks),
    zero_width_marks: ZeroWidthMarks::ByGdefLate,
    fallback_position: true,
};

const ARABIC_FEATURES: &[Tag] = &[
    feature::ISOLATED_FORMS,
    Tag::from_bytes(b"fina"),
    Tag::from_bytes(b"fin2"),
    Tag::from_bytes(b"fin3"),
    feature::MEDIAL_FORMS_1,
    feature::MEDIAL_FORMS_2,
    feature::INITIAL_FORMS,
];

fn feature_is_syriac(tag: Tag) -> bool {
    matches!(tag.to_bytes()[3], b'2' | b'3')
}

#[allow(dead_code)]
#[repr(u8)]
#[derive(Clone, Copy, PartialEq, Debug)]
enum Action {
    Isol = 0,
    Fina = 1,
    Fin2 = 2,
    Fin3 = 3,
    Medi = 4,
    Med2 = 5,
    Init = 6,
    None = 7,
}

// The joining state machine. Rows are states, columns joining types;
// each cell is (action for prev, action for current, next state).
//
// States:
// 0: prev was U, not willing to join
// 1: prev was R or ISOL/ALAPH, not willing to join
// 2: prev was D/L in ISOL form, willing to join
// 3: prev was D in FINA form, willing to join
// 4: prev was FINA ALAPH, not willing to join
// 5: prev was FIN2/FIN3 ALAPH, not willing to join
// 6: prev was DALATH/RISH, not willing to join
const STATE_TABLE: &[[(Action, Action, u16); 6]] = &[
    // jt_U,                    jt_L,                     jt_R,
    // jt_D,                    jg_ALAPH,                 jg_DALATH_RISH
    [
        (Action::None, Action::None, 0), (Action::None, Action::Isol, 2), (Action::None, Action::Isol, 1),
        (Action::None, Action::Isol, 2), (Action::None, Action::Isol, 1), (Action::None, Action::Isol, 6),
    ],
    [
        (Action::None, Action::None, 0), (Action::None, Action::Isol, 2), (Action::None, Action::Isol, 1),
        (Action::None, Action::Isol, 2), (Action::None, Action::Fin2, 5), (Action::None, Action::Isol, 6),
    ],
    [
        (Action::None, Action::None, 0), (Action::None, Action::Isol, 2), (Action::Init, Action::Fina, 1),
        (Action::Init, Action::Fina, 3), (Action::Init, Action::Fina, 4), (Action::Init, Action::Fina, 6),
    ],
    [
        (Action::None, Action::None, 0), (Action::None, Action::Isol, 2), (Action::Medi, Action::Fina, 1),
        (Action::Medi, Action::Fina, 3), (Action::Medi, Action::Fina, 4), (Action::Medi, Action::Fina, 6),
    ],
    [
        (Action::None, Action::None, 0), (Action::None, Action::Isol, 2), (Action::Med2, Action::Isol, 1),
        (Action::Med2, Action::Isol, 2), (Action::Med2, Action::Fin2, 5), (Action::Med2, Action::Isol, 6),
    ],
    [
        (Action::None, Action::None, 0), (Action::None, Action::Isol, 2), (Action::Isol, Action::Isol, 1),
        (Action::Isol, Action::Isol, 2), (Action::Isol, Action::Fin2, 5), (Action::Isol, Action::Isol, 6),
    ],
    [
        (Action::None, Action::None, 0), (Action::None, Action::Isol, 2), (Action::None, Action::Isol, 1),
        (Action::None, Action::Isol, 2), (Action::None, Action::Fin3, 5), (Action::None, Action::Isol, 6),
    ],
];

#[derive(Clone, Copy, PartialEq, Debug)]
pub enum JoiningType {
    U = 0,
    L = 1,
    R = 2,
    D = 3,
    GroupAlaph = 4,
    GroupDalathRish = 5,
    T = 7,
}

pub struct ArabicShapePlan {
    // The extra slot belongs to Action::None, which is not a real
    // feature; mask_array[None] stays zero so the apply loop needs no
    // branch.
    mask_array: [Mask; ARABIC_FEATURES.len() + 1],
}

pub fn collect_features(planner: &mut MapBuilder) {
    // Features apply in spec order with pauses in between: the pause
    // between init/medi/fina/isol and rlig is what keeps contextual
    // substitutions from seeing half-assigned forms.

    planner.enable_feature(feature::GLYPH_COMPOSITION_DECOMPOSITION, FeatureFlags::NONE, 1);
    planner.enable_feature(feature::LOCALIZED_FORMS, FeatureFlags::NONE, 1);

    planner.add_gsub_pause(None);

    for &tag in ARABIC_FEATURES {
        let has_fallback = planner.script() == Some(script::ARABIC) && !feature_is_syriac(tag);
        let flags = if has_fallback {
            FeatureFlags::HAS_FALLBACK
        } else {
            FeatureFlags::NONE
        };
        planner.add_feature(tag, flags, 1);
        planner.add_gsub_pause(None);
    }

    // In Arabic script a ZWJ, like a ZWNJ, means "don't ligate", so
    // the ligating features run with manual-ZWJ skipping.
    planner.enable_feature(
        feature::REQUIRED_LIGATURES,
        FeatureFlags::MANUAL_ZWJ | FeatureFlags::HAS_FALLBACK,
        1,
    );
    planner.add_gsub_pause(None);

    planner.enable_feature(
        feature::REQUIRED_CONTEXTUAL_ALTERNATES,
        FeatureFlags::MANUAL_ZWJ,
        1,
    );
    planner.enable_feature(feature::CONTEXTUAL_ALTERNATES, FeatureFlags::MANUAL_ZWJ, 1);
    planner.add_gsub_pause(None);

    planner.enable_feature(feature::MARK_POSITIONING_VIA_SUBSTITUTION, FeatureFlags::NONE, 1);
}

pub fn data_create(map: &Map, _script: Option<Script>) -> ShaperData {
    let mut plan = ArabicShapePlan {
        mask_array: [0; ARABIC_FEATURES.len() + 1],
    };

    for (i, &tag) in ARABIC_FEATURES.iter().enumerate() {
        plan.mask_array[i] = map.get_1_mask(tag);
    }

    ShaperData::Arabic(plan)
}

impl crate::buffer::GlyphInfo {
    fn arabic_shaping_action(&self) -> Action {
        match self.complex_cat {
            0 => Action::Isol,
            1 => Action::Fina,
            2 => Action::Fin2,
            3 => Action::Fin3,
            4 => Action::Medi,
            5 => Action::Med2,
            6 => Action::Init,
            _ => Action::None,
        }
    }

    fn set_arabic_shaping_action(&mut self, action: Action) {
        self.complex_cat = action as u8;
    }
}

fn setup_masks(plan: &ShapePlan, _face: &Face, buffer: &mut Buffer) {
    let arabic_plan = match &plan.data {
        ShaperData::Arabic(p) => p,
        _ => return,
    };

    arabic_joining(buffer);
    if plan.script == Some(script::MONGOLIAN) {
        mongolian_variation_selectors(buffer);
    }

    for info in &mut buffer.info {
        info.mask |= arabic_plan.mask_array[info.arabic_shaping_action() as usize];
    }
}

fn arabic_joining(buffer: &mut Buffer) {
    let mut prev: Option<usize> = None;
    let mut state = 0usize;

    // Pre-context counts toward the joining state.
    for i in 0..buffer.context_len(0) {
        let c = buffer.context(0, i);
        let this_type = get_joining_type(c, c.general_category());
        if this_type == JoiningType::T {
            continue;
        }

        state = usize::from(STATE_TABLE[state][this_type as usize].2);
        break;
    }

    for i in 0..buffer.len() {
        let this_type = get_joining_type(
            buffer.info[i].as_char(),
            buffer.info[i].general_category(),
        );

        if this_type == JoiningType::T {
            buffer.info[i].set_arabic_shaping_action(Action::None);
            continue;
        }

        let entry = &STATE_TABLE[state][this_type as usize];
        if entry.0 != Action::None {
            if let Some(prev) = prev {
                buffer.info[prev].set_arabic_shaping_action(entry.0);
                buffer.unsafe_to_break(prev, i + 1);
            }
        }

        buffer.info[i].set_arabic_shaping_action(entry.1);

        prev = Some(i);
        state = usize::from(entry.2);
    }

    for i in 0..buffer.context_len(1) {
        let c = buffer.context(1, i);
        let this_type = get_joining_type(c, c.general_category());
        if this_type == JoiningType::T {
            continue;
        }

        let entry = &STATE_TABLE[state][this_type as usize];
        if entry.0 != Action::None {
            if let Some(prev) = prev {
                buffer.info[prev].set_arabic_shaping_action(entry.0);
            }
        }

        break;
    }
}

fn mongolian_variation_selectors(buffer: &mut Buffer) {
    // Variation selectors inherit the shaping action of their base.
    for i in 1..buffer.len() {
        if (0x180B..=0x180D).contains(&buffer.info[i].codepoint) {
            let action = buffer.info[i - 1].arabic_shaping_action();
            buffer.info[i].set_arabic_shaping_action(action);
        }
    }
}

fn get_joining_type(u: char, gc: GeneralCategory) -> JoiningType {
    // The Syriac joining groups the state machine cares about.
    match u as u32 {
        0x0710 => return JoiningType::GroupAlaph,
        0x0715 | 0x0716 | 0x072A | 0x072F => return JoiningType::GroupDalathRish,
        _ => {}
    }

    use unicode_joining_type::{get_joining_type as jt, JoiningType as Jt};
    match jt(u) {
        Jt::RightJoining => JoiningType::R,
        Jt::LeftJoining => JoiningType::L,
        Jt::DualJoining | Jt::JoinCausing => JoiningType::D,
        Jt::Transparent => JoiningType::T,
        Jt::NonJoining => {
            // Unassigned marks and format controls are transparent.
            match gc {
                GeneralCategory::NonspacingMark
                | GeneralCategory::EnclosingMark
                | GeneralCategory::Format => JoiningType::T,
                _ => JoiningType::U,
            }
        }
    }
}

// http://www.unicode.org/reports/tr53/
const MODIFIER_COMBINING_MARKS: &[u32] = &[
    0x0654, // ARABIC HAMZA ABOVE
    0x0655, // ARABIC HAMZA BELOW
    0x0658, // ARABIC MARK NOON GHUNNA
    0x06DC, // ARABIC SMALL HIGH SEEN
    0x06E3, // ARABIC SMALL LOW SEEN
    0x06E7, // ARABIC SMALL HIGH YEH
    0x06E8, // ARABIC SMALL HIGH NOON
    0x08D3, // ARABIC SMALL LOW WAW
    0x08F3, // ARABIC SMALL HIGH WAW
];

pub(crate) fn reorder_marks(buffer: &mut Buffer, mut start: usize, end: usize) {
    use crate::unicode::modified_combining_class as mcc;

    let mut i = start;
    for cc in [220u8, 230].iter().copied() {
        while i < end && buffer.info[i].modified_combining_class() < cc {
            i += 1;
        }

        if i == end {
            break;
        }

        if buffer.info[i].modified_combining_class() > cc {
            continue;
        }

        let mut j = i;
        while j < end
            && buffer.info[j].modified_combining_class() == cc
            && MODIFIER_COMBINING_MARKS.contains(&buffer.info[j].codepoint)
        {
            j += 1;
        }

        if i == j {
            continue;
        }

        // Rotate the modifier marks to the front of the run.
        buffer.merge_clusters(start, j);
        buffer.info[start..j].rotate_right(j - i);

        // Renumber the moved marks below every Arabic class so the
        // sequence stays sorted for the normalizer; fallback mark
        // positioning folds these back to 220/230.
        let moved = j - i;
        let new_cc = if cc == 220 { mcc::CCC22 } else { mcc::CCC26 };
        for info in &mut buffer.info[start..start + moved] {
            info.set_modified_combining_class(new_cc);
        }

        start += moved;
        i = j;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::UnicodeBuffer;

    fn joined_actions(text: &str) -> Vec<Action> {
        let mut b = UnicodeBuffer::new();
        b.push_str(text);
        let mut buffer = b.0;
        for i in 0..buffer.len() {
            let mut scratch = buffer.scratch_flags;
            buffer.info[i].init_unicode_props(&mut scratch);
            buffer.scratch_flags = scratch;
        }
        arabic_joining(&mut buffer);
        buffer.info.iter().map(|i| i.arabic_shaping_action()).collect()
    }

    #[test]
    fn lam_alef_joins() {
        // Lam is dual-joining, alef right-joining: lam takes the
        // initial form, alef the final form.
        let actions = joined_actions("\u{0644}\u{0627}");
        assert_eq!(actions, [Action::Init, Action::Fina]);
    }

    #[test]
    fn lone_letter_is_isolated() {
        let actions = joined_actions("\u{0627}");
        assert_eq!(actions, [Action::Isol]);
    }

    #[test]
    fn three_dual_joiners_form_init_medi_fina() {
        // beh + beh + beh
        let actions = joined_actions("\u{0628}\u{0628}\u{0628}");
        assert_eq!(actions, [Action::Init, Action::Medi, Action::Fina]);
    }

    #[test]
    fn marks_are_transparent_to_joining() {
        // beh + fatha + beh: the mark must not break the join.
        let actions = joined_actions("\u{0628}\u{064E}\u{0628}");
        assert_eq!(actions[0], Action::Init);
        assert_eq!(actions[1], Action::None);
        assert_eq!(actions[2], Action::Fina);
    }
}
