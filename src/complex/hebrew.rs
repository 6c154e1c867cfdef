//! The Hebrew shaper: mostly plain GSUB plus a composition fallback
//! onto the presentation-forms block for fonts that only carry
//! precomposed dagesh letters.

use crate::complex::{ComplexShaper, ZeroWidthMarks};
use crate::normalize::ShapeNormalizationMode;
use crate::ot::feature;
use crate::ot::map::{FeatureFlags, MapBuilder};

pub const HEBREW_SHAPER: ComplexShaper = ComplexShaper {
    collect_features: Some(collect_features),
    data_create: None,
    preprocess_text: None,
    postprocess_glyphs: None,
    normalization_mode: ShapeNormalizationMode::ComposedDiacritics,
    decompose: None,
    compose: Some(compose),
    setup_masks: None,
    reorder_marks: None,
    zero_width_marks: ZeroWidthMarks::ByGdefLate,
    fallback_position: true,
};

fn collect_features(planner: &mut MapBuilder) {
    planner.enable_feature(feature::DISCRETIONARY_LIGATURES, FeatureFlags::NONE, 1);
}

/// Canonical composition excludes the presentation forms; map the
/// dagesh, shin/sin-dot and rafe combinations onto U+FBxx anyway, the
/// way legacy Hebrew fonts expect.
fn compose(a: char, b: char) -> Option<char> {
    let base = a as u32;
    match b as u32 {
        // Dagesh.
        0x05BC if (0x05D0..=0x05EA).contains(&base) => {
            const DAGESH_FORMS: [u32; 27] = [
                0xFB30, 0xFB31, 0xFB32, 0xFB33, 0xFB34, 0xFB35, 0xFB36, 0x0000, 0xFB38,
                0xFB39, 0xFB3A, 0xFB3B, 0xFB3C, 0x0000, 0xFB3E, 0x0000, 0xFB40, 0xFB41,
                0x0000, 0xFB43, 0xFB44, 0x0000, 0xFB46, 0xFB47, 0xFB48, 0xFB49, 0xFB4A,
            ];
            let form = DAGESH_FORMS[(base - 0x05D0) as usize];
            if form == 0 {
                None
            } else {
                char::from_u32(form)
            }
        }

        // Shin dot / sin dot on shin.
        0x05C1 if base == 0x05E9 => Some('\u{FB2A}'),
        0x05C2 if base == 0x05E9 => Some('\u{FB2B}'),
        0x05C1 if base == 0xFB49 => Some('\u{FB2C}'),
        0x05C2 if base == 0xFB49 => Some('\u{FB2D}'),

        // Rafe.
        0x05BF if base == 0x05D1 => Some('\u{FB4C}'),
        0x05BF if base == 0x05DB => Some('\u{FB4D}'),
        0x05BF if base == 0x05E4 => Some('\u{FB4E}'),

        // Holam on vav.
        0x05B9 if base == 0x05D5 => Some('\u{FB4B}'),
        // Patah on yod.
        0x05B7 if base == 0x05D9 => Some('\u{FB1F}'),

        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dagesh_composes_to_presentation_form() {
        assert_eq!(compose('\u{05D0}', '\u{05BC}'), Some('\u{FB30}')); // alef
        assert_eq!(compose('\u{05D1}', '\u{05BC}'), Some('\u{FB31}')); // bet
        // He + dagesh has no presentation form at the gap slot.
        assert_eq!(compose('\u{05D7}', '\u{05BC}'), None);
    }

    #[test]
    fn shin_dots() {
        assert_eq!(compose('\u{05E9}', '\u{05C1}'), Some('\u{FB2A}'));
        assert_eq!(compose('\u{05E9}', '\u{05C2}'), Some('\u{FB2B}'));
    }
}
