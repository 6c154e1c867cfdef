//! The OpenType layout engines: feature mapping, GSUB substitution,
//! GPOS positioning, and the legacy-kern and heuristic-mark fallbacks.

pub(crate) mod apply;
pub(crate) mod contextual;
pub(crate) mod fallback;
pub(crate) mod kerning;
pub(crate) mod map;
pub(crate) mod matching;
pub(crate) mod position;
pub(crate) mod substitute;

use crate::common::Tag;

/// Registered feature tags the planner and shapers refer to by name.
pub mod feature {
    #![allow(missing_docs)]

    use super::Tag;

    macro_rules! features {
        ($($name:ident => $tag:expr,)+) => {
            $(pub const $name: Tag = Tag::from_bytes($tag);)+
        }
    }

    features! {
        ABOVE_BASE_FORMS => b"abvf",
        ABOVE_BASE_MARK_POSITIONING => b"abvm",
        ABOVE_BASE_SUBSTITUTIONS => b"abvs",
        AKHANDS => b"akhn",
        BELOW_BASE_FORMS => b"blwf",
        BELOW_BASE_MARK_POSITIONING => b"blwm",
        BELOW_BASE_SUBSTITUTIONS => b"blws",
        CONJUNCT_FORMS => b"cjct",
        CONTEXTUAL_ALTERNATES => b"calt",
        CONTEXTUAL_LIGATURES => b"clig",
        CURSIVE_POSITIONING => b"curs",
        DISCRETIONARY_LIGATURES => b"dlig",
        DISTANCES => b"dist",
        GLYPH_COMPOSITION_DECOMPOSITION => b"ccmp",
        HALANT_FORMS => b"haln",
        HALF_FORMS => b"half",
        INITIAL_FORMS => b"init",
        ISOLATED_FORMS => b"isol",
        KERNING => b"kern",
        LEADING_JAMO_FORMS => b"ljmo",
        LOCALIZED_FORMS => b"locl",
        MARK_POSITIONING => b"mark",
        MARK_POSITIONING_VIA_SUBSTITUTION => b"mset",
        MARK_TO_MARK_POSITIONING => b"mkmk",
        MEDIAL_FORMS_1 => b"medi",
        MEDIAL_FORMS_2 => b"med2",
        NUKTA_FORMS => b"nukt",
        POST_BASE_FORMS => b"pstf",
        POST_BASE_SUBSTITUTIONS => b"psts",
        PRE_BASE_FORMS => b"pref",
        PRE_BASE_SUBSTITUTIONS => b"pres",
        RAKAR_FORMS => b"rkrf",
        REPH_FORMS => b"rphf",
        REQUIRED_CONTEXTUAL_ALTERNATES => b"rclt",
        REQUIRED_LIGATURES => b"rlig",
        STANDARD_LIGATURES => b"liga",
        TRAILING_JAMO_FORMS => b"tjmo",
        VATTU_VARIANTS => b"vatu",
        VOWEL_JAMO_FORMS => b"vjmo",
    }
}
