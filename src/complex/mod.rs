//! Complex-script shapers.
//!
//! Each script family gets a static descriptor of hooks the pipeline
//! calls at fixed points: feature collection at plan-build time,
//! per-plan data, text preprocessing, normalization overrides, mask
//! setup, and post-GSUB fixups. Dispatch is a flat match on the
//! script; the hot path never goes through a trait object.

pub(crate) mod arabic;
pub(crate) mod hangul;
pub(crate) mod hebrew;
pub(crate) mod indic;
pub(crate) mod khmer;
pub(crate) mod myanmar;
pub(crate) mod thai;

use crate::buffer::Buffer;
use crate::common::{script, Script};
use crate::face::Face;
use crate::normalize::ShapeNormalizationMode;
use crate::ot::map::{Map, MapBuilder};
use crate::plan::ShapePlan;

/// How mark advance widths are zeroed when GPOS does not attach them.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum ZeroWidthMarks {
    None,
    ByGdefEarly,
    ByGdefLate,
}

pub struct ComplexShaper {
    pub collect_features: Option<fn(&mut MapBuilder)>,
    pub data_create: Option<fn(&Map, Option<Script>) -> ShaperData>,
    pub preprocess_text: Option<fn(&ShapePlan, &Face, &mut Buffer)>,
    pub postprocess_glyphs: Option<fn(&ShapePlan, &Face, &mut Buffer)>,
    pub normalization_mode: ShapeNormalizationMode,
    pub decompose: Option<fn(char) -> Option<(char, Option<char>)>>,
    pub compose: Option<fn(char, char) -> Option<char>>,
    pub setup_masks: Option<fn(&ShapePlan, &Face, &mut Buffer)>,
    pub reorder_marks: Option<fn(&mut Buffer, usize, usize)>,
    pub zero_width_marks: ZeroWidthMarks,
    pub fallback_position: bool,
}

/// Per-plan data a shaper derives from the compiled map.
pub enum ShaperData {
    None,
    Arabic(arabic::ArabicShapePlan),
    Hangul(hangul::HangulShapePlan),
    Indic(indic::IndicShapePlan),
    Khmer(khmer::KhmerShapePlan),
    Myanmar(myanmar::MyanmarShapePlan),
}

pub const DEFAULT_SHAPER: ComplexShaper = ComplexShaper {
    collect_features: None,
    data_create: None,
    preprocess_text: None,
    postprocess_glyphs: None,
    normalization_mode: ShapeNormalizationMode::ComposedDiacritics,
    decompose: None,
    compose: None,
    setup_masks: None,
    reorder_marks: None,
    zero_width_marks: ZeroWidthMarks::ByGdefLate,
    fallback_position: true,
};

/// Picks the shaper for a script.
pub fn shaper_for_script(script: Option<Script>) -> &'static ComplexShaper {
    let script = match script {
        Some(s) => s,
        None => return &DEFAULT_SHAPER,
    };

    match script {
        script::ARABIC | script::SYRIAC | script::NKO | script::MONGOLIAN | script::MANDAIC => {
            &arabic::ARABIC_SHAPER
        }

        script::HEBREW => &hebrew::HEBREW_SHAPER,

        script::HANGUL => &hangul::HANGUL_SHAPER,

        script::DEVANAGARI
        | script::BENGALI
        | script::GURMUKHI
        | script::GUJARATI
        | script::ORIYA
        | script::TAMIL
        | script::TELUGU
        | script::KANNADA
        | script::MALAYALAM
        | script::SINHALA => &indic::INDIC_SHAPER,

        script::KHMER => &khmer::KHMER_SHAPER,

        script::MYANMAR => &myanmar::MYANMAR_SHAPER,

        script::THAI | script::LAO => &thai::THAI_SHAPER,

        _ => &DEFAULT_SHAPER,
    }
}
