//! The generic Indic shaper: Devanagari, Bengali, Gurmukhi, Gujarati,
//! Oriya, Tamil, Telugu, Kannada, Malayalam and Sinhala.
//!
//! Work splits across two GSUB pauses: the first segments syllables,
//! inserts dotted circles for broken ones, finds the base consonant,
//! assigns the positional feature masks and moves pre-base matras; the
//! second puts the reph in its final place once the basic features
//! have run.

use crate::buffer::{Buffer, BufferFlags, BufferScratchFlags, GlyphInfo};
use crate::common::{Mask, Script};
use crate::complex::{ComplexShaper, ShaperData, ZeroWidthMarks};
use crate::face::Face;
use crate::normalize::ShapeNormalizationMode;
use crate::ot::feature;
use crate::ot::map::{FeatureFlags, Map, MapBuilder};
use crate::plan::ShapePlan;
use crate::unicode::DOTTED_CIRCLE;

pub const INDIC_SHAPER: ComplexShaper = ComplexShaper {
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

#[repr(u8)]
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub(crate) enum Category {
    X = 0,
    C,
    Ra,
    V,
    N,
    H,
    M,
    Sm,
    Zwnj,
    Zwj,
    DottedCircle,
    Symbol,
}

#[repr(u8)]
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Debug)]
pub(crate) enum Position {
    Start = 0,
    RaToBecomeReph,
    PreM,
    PreC,
    BaseC,
    AboveC,
    BelowC,
    PostC,
    Smvd,
    End,
}

#[derive(Clone, Copy, PartialEq, Debug)]
enum SyllableType {
    Consonant = 1,
    Vowel = 2,
    Standalone = 3,
    Broken = 4,
    NonIndic = 5,
}

pub struct IndicShapePlan {
    rphf_mask: Mask,
    pref_mask: Mask,
    blwf_mask: Mask,
    half_mask: Mask,
    pstf_mask: Mask,
    abvf_mask: Mask,
    init_mask: Mask,
}

pub fn collect_features(planner: &mut MapBuilder) {
    planner.enable_feature(feature::LOCALIZED_FORMS, FeatureFlags::NONE, 1);
    planner.enable_feature(feature::GLYPH_COMPOSITION_DECOMPOSITION, FeatureFlags::NONE, 1);

    planner.add_gsub_pause(Some(initial_reordering));

    planner.enable_feature(feature::NUKTA_FORMS, FeatureFlags::MANUAL_JOINERS, 1);
    planner.enable_feature(feature::AKHANDS, FeatureFlags::MANUAL_JOINERS, 1);
    planner.add_gsub_pause(None);

    planner.add_feature(feature::REPH_FORMS, FeatureFlags::MANUAL_JOINERS, 1);
    planner.add_gsub_pause(None);
    planner.enable_feature(feature::RAKAR_FORMS, FeatureFlags::MANUAL_JOINERS, 1);
    planner.add_gsub_pause(None);
    planner.add_feature(feature::PRE_BASE_FORMS, FeatureFlags::MANUAL_JOINERS, 1);
    planner.add_gsub_pause(None);
    planner.add_feature(feature::BELOW_BASE_FORMS, FeatureFlags::MANUAL_JOINERS, 1);
    planner.add_gsub_pause(None);
    planner.add_feature(feature::ABOVE_BASE_FORMS, FeatureFlags::MANUAL_JOINERS, 1);
    planner.add_gsub_pause(None);
    planner.add_feature(feature::HALF_FORMS, FeatureFlags::MANUAL_JOINERS, 1);
    planner.add_gsub_pause(None);
    planner.add_feature(feature::POST_BASE_FORMS, FeatureFlags::MANUAL_JOINERS, 1);
    planner.add_gsub_pause(None);
    planner.enable_feature(feature::VATTU_VARIANTS, FeatureFlags::MANUAL_JOINERS, 1);
    planner.add_gsub_pause(None);
    planner.enable_feature(feature::CONJUNCT_FORMS, FeatureFlags::MANUAL_JOINERS, 1);

    planner.add_gsub_pause(Some(final_reordering));

    planner.add_feature(feature::INITIAL_FORMS, FeatureFlags::MANUAL_JOINERS, 1);
    planner.enable_feature(feature::PRE_BASE_SUBSTITUTIONS, FeatureFlags::NONE, 1);
    planner.enable_feature(feature::ABOVE_BASE_SUBSTITUTIONS, FeatureFlags::NONE, 1);
    planner.enable_feature(feature::BELOW_BASE_SUBSTITUTIONS, FeatureFlags::NONE, 1);
    planner.enable_feature(feature::POST_BASE_SUBSTITUTIONS, FeatureFlags::NONE, 1);
    planner.enable_feature(feature::HALANT_FORMS, FeatureFlags::NONE, 1);
}

pub fn data_create(map: &Map, _script: Option<Script>) -> ShaperData {
    ShaperData::Indic(IndicShapePlan {
        rphf_mask: map.get_1_mask(feature::REPH_FORMS),
        pref_mask: map.get_1_mask(feature::PRE_BASE_FORMS),
        blwf_mask: map.get_1_mask(feature::BELOW_BASE_FORMS),
        half_mask: map.get_1_mask(feature::HALF_FORMS),
        pstf_mask: map.get_1_mask(feature::POST_BASE_FORMS),
        abvf_mask: map.get_1_mask(feature::ABOVE_BASE_FORMS),
        init_mask: map.get_1_mask(feature::INITIAL_FORMS),
    })
}

impl GlyphInfo {
    pub(crate) fn indic_category(&self) -> Category {
        match self.complex_cat {
            1 => Category::C,
            2 => Category::Ra,
            3 => Category::V,
            4 => Category::N,
            5 => Category::H,
            6 => Category::M,
            7 => Category::Sm,
            8 => Category::Zwnj,
            9 => Category::Zwj,
            10 => Category::DottedCircle,
            11 => Category::Symbol,
            _ => Category::X,
        }
    }

    pub(crate) fn set_indic_category(&mut self, cat: Category) {
        self.complex_cat = cat as u8;
    }

    pub(crate) fn indic_position(&self) -> Position {
        match self.complex_aux {
            1 => Position::RaToBecomeReph,
            2 => Position::PreM,
            3 => Position::PreC,
            4 => Position::BaseC,
            5 => Position::AboveC,
            6 => Position::BelowC,
            7 => Position::PostC,
            8 => Position::Smvd,
            9 => Position::End,
            _ => Position::Start,
        }
    }

    pub(crate) fn set_indic_position(&mut self, pos: Position) {
        self.complex_aux = pos as u8;
    }
}

/// The Ra consonant of each supported script; a syllable-initial
/// Ra+halant becomes a reph.
fn is_ra(u: u32) -> bool {
    matches!(
        u,
        0x0930 | 0x09B0 | 0x09F0 | 0x0A30 | 0x0AB0 | 0x0B30 | 0x0BB0 | 0x0C30 | 0x0CB0
            | 0x0D30 | 0x0DBB
    )
}

/// Matras drawn to the left of their base. Everything else stays put.
fn is_pre_base_matra(u: u32) -> bool {
    matches!(
        u,
        0x093F                      // Devanagari I
        | 0x094E                    // Devanagari prishthamatra E
        | 0x09BF | 0x09C7 | 0x09C8  // Bengali I, E, AI
        | 0x0A3F                    // Gurmukhi I
        | 0x0ABF                    // Gujarati I
        | 0x0B47                    // Oriya E
        | 0x0BC6 | 0x0BC7 | 0x0BC8  // Tamil E, EE, AI
        | 0x0D46 | 0x0D47 | 0x0D48  // Malayalam E, EE, AI
        | 0x0DD9 | 0x0DDB           // Sinhala E, AI
    )
}

fn is_below_base_matra(u: u32) -> bool {
    matches!(
        u,
        0x0941..=0x0944 | 0x09C1..=0x09C4 | 0x0A41..=0x0A42 | 0x0AC1..=0x0AC5
            | 0x0B41..=0x0B44 | 0x0C56 | 0x0CC6 | 0x0D43..=0x0D44
    )
}

/// Classifies one scalar into (category, position). The Indic blocks
/// share their layout at 0x80-sized offsets, which keeps this a
/// computed mapping instead of a generated table.
fn categorize(u: u32) -> (Category, Position) {
    match u {
        0x200C => return (Category::Zwnj, Position::End),
        0x200D => return (Category::Zwj, Position::End),
        DOTTED_CIRCLE => return (Category::DottedCircle, Position::BaseC),
        _ => {}
    }

    // Sinhala's block differs from the shared layout.
    if (0x0D80..=0x0DFF).contains(&u) {
        return match u {
            0x0D82..=0x0D83 => (Category::Sm, Position::Smvd),
            0x0D85..=0x0D96 => (Category::V, Position::BaseC),
            0x0D9A..=0x0DC6 => {
                if is_ra(u) {
                    (Category::Ra, Position::BaseC)
                } else {
                    (Category::C, Position::BaseC)
                }
            }
            0x0DCA => (Category::H, Position::End),
            0x0DCF..=0x0DDF | 0x0DF2..=0x0DF3 => {
                let pos = if is_pre_base_matra(u) {
                    Position::PreM
                } else {
                    Position::PostC
                };
                (Category::M, pos)
            }
            _ => (Category::X, Position::End),
        };
    }

    if !(0x0900..=0x0D7F).contains(&u) {
        return (Category::X, Position::End);
    }

    let offset = u & 0x7F;
    match offset {
        0x00..=0x03 => (Category::Sm, Position::Smvd),
        0x04..=0x14 => (Category::V, Position::BaseC),
        0x15..=0x39 => {
            if is_ra(u) {
                (Category::Ra, Position::BaseC)
            } else {
                (Category::C, Position::BaseC)
            }
        }
        0x3A..=0x3B => (Category::M, Position::PostC),
        0x3C => (Category::N, Position::End),
        0x3D => (Category::Symbol, Position::BaseC),
        0x3E..=0x4C => {
            let pos = if is_pre_base_matra(u) {
                Position::PreM
            } else if is_below_base_matra(u) {
                Position::BelowC
            } else {
                Position::PostC
            };
            (Category::M, pos)
        }
        0x4D => (Category::H, Position::End),
        0x51..=0x57 => (Category::Sm, Position::Smvd),
        0x58..=0x5F => (Category::C, Position::BaseC),
        0x60..=0x61 => (Category::V, Position::BaseC),
        0x62..=0x63 => (Category::M, Position::BelowC),
        0x70..=0x7F => (Category::C, Position::BaseC),
        _ => (Category::X, Position::End),
    }
}

fn setup_masks(_plan: &ShapePlan, _face: &Face, buffer: &mut Buffer) {
    for info in &mut buffer.info {
        let (cat, pos) = categorize(info.codepoint);
        info.set_indic_category(cat);
        info.set_indic_position(pos);
    }

    find_syllables(buffer);
}

fn is_consonantish(cat: Category) -> bool {
    matches!(cat, Category::C | Category::Ra)
}

/// Hand-rolled syllable scanner. `consonant := (C | Ra) N?`;
/// a consonant syllable is `consonant (H (ZWJ|ZWNJ)? consonant)*`
/// followed by an optional dead-consonant halant, matras with their
/// nuktas, and syllable modifiers.
fn find_syllables(buffer: &mut Buffer) {
    let len = buffer.len();
    let mut serial: u8 = 1;
    let mut i = 0;

    while i < len {
        let start = i;
        let ty = scan_syllable(&buffer.info[i..], &mut i, start);

        if ty == SyllableType::Broken {
            buffer.scratch_flags |= BufferScratchFlags::HAS_BROKEN_SYLLABLE;
        }

        let value = (serial << 4) | ty as u8;
        for info in &mut buffer.info[start..i] {
            info.syllable = value;
        }
        serial = serial.wrapping_add(1);
        if serial == 0 {
            serial = 1;
        }
    }
}

fn scan_syllable(infos: &[GlyphInfo], i: &mut usize, start: usize) -> SyllableType {
    let mut k = 0usize;
    let cat = |k: usize| -> Category {
        infos.get(k).map(|g| g.indic_category()).unwrap_or(Category::X)
    };

    let consume_consonant = |k: &mut usize| -> bool {
        if is_consonantish(cat(*k)) {
            *k += 1;
            if cat(*k) == Category::N {
                *k += 1;
            }
            true
        } else {
            false
        }
    };

    let consume_matras_and_signs = |k: &mut usize| {
        while cat(*k) == Category::M {
            *k += 1;
            if cat(*k) == Category::N {
                *k += 1;
            }
        }
        while cat(*k) == Category::Sm {
            *k += 1;
        }
    };

    if consume_consonant(&mut k) {
        // Conjunct chain.
        loop {
            let save = k;
            if cat(k) == Category::H {
                k += 1;
                if matches!(cat(k), Category::Zwj | Category::Zwnj) {
                    k += 1;
                }
                if !consume_consonant(&mut k) {
                    // Trailing dead-consonant halant; joiners stay in.
                    k = save + 1;
                    if matches!(cat(k), Category::Zwj | Category::Zwnj) {
                        k += 1;
                    }
                    break;
                }
            } else {
                break;
            }
        }

        consume_matras_and_signs(&mut k);
        *i = start + k;
        return SyllableType::Consonant;
    }

    if cat(k) == Category::V || cat(k) == Category::Symbol || cat(k) == Category::DottedCircle {
        let standalone = cat(k) != Category::V;
        k += 1;
        if cat(k) == Category::N {
            k += 1;
        }
        if cat(k) == Category::H && is_consonantish(cat(k + 1)) {
            k += 2;
            if cat(k) == Category::N {
                k += 1;
            }
        }
        consume_matras_and_signs(&mut k);
        *i = start + k;
        return if standalone {
            SyllableType::Standalone
        } else {
            SyllableType::Vowel
        };
    }

    // Orphan combining pieces form a broken cluster around a dotted
    // circle to come.
    if matches!(cat(k), Category::M | Category::N | Category::H | Category::Sm) {
        while matches!(cat(k), Category::M | Category::N | Category::H | Category::Sm) {
            k += 1;
        }
        *i = start + k;
        return SyllableType::Broken;
    }

    *i = start + k + 1;
    SyllableType::NonIndic
}

/// First pause: dotted circles, base detection, positional masks,
/// pre-base matra movement.
fn initial_reordering(plan: &ShapePlan, face: &Face, buffer: &mut Buffer) {
    insert_dotted_circles(face, buffer);

    let indic_plan = match &plan.data {
        ShaperData::Indic(p) => p,
        _ => return,
    };

    let mut start = 0;
    while start < buffer.len() {
        let end = syllable_end(buffer, start);
        reorder_syllable_initial(indic_plan, buffer, start, end);
        start = end;
    }
}

fn syllable_end(buffer: &Buffer, start: usize) -> usize {
    let syllable = buffer.info[start].syllable;
    let mut end = start + 1;
    while end < buffer.len() && buffer.info[end].syllable == syllable {
        end += 1;
    }
    end
}

pub(crate) fn insert_dotted_circles(face: &Face, buffer: &mut Buffer) {
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
        if syllable & 0x0F == SyllableType::Broken as u8 && (i == 0 || buffer.info[i - 1].syllable != syllable)
        {
            let mut info = buffer.info[i];
            info.codepoint = DOTTED_CIRCLE;
            info.glyph_id = dotted_circle.0;
            info.set_indic_category(Category::DottedCircle);
            info.set_indic_position(Position::BaseC);
            buffer.info.insert(i, info);
            i += 1;
        }
        i += 1;
    }
}

fn reorder_syllable_initial(
    plan: &IndicShapePlan,
    buffer: &mut Buffer,
    start: usize,
    end: usize,
) {
    let ty = buffer.info[start].syllable & 0x0F;
    if ty == SyllableType::NonIndic as u8 {
        return;
    }

    // Reph: a syllable-initial Ra+H followed by more material.
    let mut base_search_start = start;
    let has_reph = plan.rphf_mask != 0
        && end - start > 2
        && buffer.info[start].indic_category() == Category::Ra
        && buffer.info[start + 1].indic_category() == Category::H
        && is_consonantish(buffer.info[start + 2].indic_category());

    if has_reph {
        buffer.info[start].set_indic_position(Position::RaToBecomeReph);
        buffer.info[start + 1].set_indic_position(Position::RaToBecomeReph);
        buffer.info[start].mask |= plan.rphf_mask;
        buffer.info[start + 1].mask |= plan.rphf_mask;
        base_search_start = start + 2;
    }

    // Base: the last consonant of the conjunct chain.
    let mut base = None;
    for i in (base_search_start..end).rev() {
        if is_consonantish(buffer.info[i].indic_category())
            || buffer.info[i].indic_category() == Category::V
            || buffer.info[i].indic_category() == Category::DottedCircle
        {
            base = Some(i);
            break;
        }
    }
    let base = match base {
        Some(b) => b,
        None => return,
    };

    buffer.info[base].set_indic_position(Position::BaseC);

    // Everything consonantish before the base takes pre-base form
    // masks; after the base, below/post-base ones.
    for i in base_search_start..base {
        let cat = buffer.info[i].indic_category();
        if is_consonantish(cat) || cat == Category::H || cat == Category::N {
            buffer.info[i].set_indic_position(Position::PreC);
            buffer.info[i].mask |= plan.half_mask;
        }
    }
    for i in base + 1..end {
        let cat = buffer.info[i].indic_category();
        if is_consonantish(cat) || cat == Category::H || cat == Category::N {
            buffer.info[i].mask |= plan.blwf_mask | plan.pstf_mask | plan.abvf_mask;
        }
    }

    if plan.pref_mask != 0 {
        // Pre-base-reordering Ra: the last H+Ra pair after the base.
        let mut i = base + 1;
        while i + 1 < end {
            if buffer.info[i].indic_category() == Category::H
                && buffer.info[i + 1].indic_category() == Category::Ra
            {
                buffer.info[i].mask |= plan.pref_mask;
                buffer.info[i + 1].mask |= plan.pref_mask;
                break;
            }
            i += 1;
        }
    }

    // Move pre-base matras to the front of the syllable (past a reph
    // pair); pre-base consonants keep their order after the matra.
    let matra_target = start + if has_reph { 2 } else { 0 };

    let mut i = base + 1;
    while i < end {
        if buffer.info[i].indic_category() == Category::M
            && buffer.info[i].indic_position() == Position::PreM
        {
            let info = buffer.info[i];
            buffer.merge_clusters(matra_target, i + 1);
            buffer.info.copy_within(matra_target..i, matra_target + 1);
            buffer.info[matra_target] = info;
        }
        i += 1;
    }
}

/// Second pause: the reph, now a single glyph, moves to its final
/// position after the base and any post-base matras.
fn final_reordering(plan: &ShapePlan, _face: &Face, buffer: &mut Buffer) {
    let indic_plan = match &plan.data {
        ShaperData::Indic(p) => p,
        _ => return,
    };

    let mut start = 0;
    while start < buffer.len() {
        let end = syllable_end(buffer, start);
        finalize_syllable(indic_plan, buffer, start, end);
        start = end;
    }
}

fn finalize_syllable(plan: &IndicShapePlan, buffer: &mut Buffer, start: usize, end: usize) {
    // Word-initial syllables starting with a moved pre-base matra take
    // `init` forms.
    if plan.init_mask != 0
        && buffer.info[start].indic_position() == Position::PreM
        && (start == 0 || !is_indic_scalar(buffer.info[start - 1].codepoint))
    {
        buffer.info[start].mask |= plan.init_mask;
    }

    // Find the reph: it kept its position class through substitution.
    let reph = (start..end)
        .find(|&i| buffer.info[i].indic_position() == Position::RaToBecomeReph);
    let reph = match reph {
        Some(r) => r,
        None => return,
    };

    // One glyph when rphf ligated the pair, still two otherwise.
    let reph_len = if reph + 1 < end
        && buffer.info[reph + 1].indic_position() == Position::RaToBecomeReph
    {
        2
    } else {
        1
    };

    // Target: after the last matra/base, before syllable modifiers.
    let mut target = end;
    while target > reph + reph_len {
        let pos = buffer.info[target - 1].indic_position();
        if pos == Position::Smvd {
            target -= 1;
        } else {
            break;
        }
    }

    if target <= reph + reph_len {
        return;
    }

    buffer.merge_clusters(reph, target);
    buffer.info[reph..target].rotate_left(reph_len);
}

fn is_indic_scalar(u: u32) -> bool {
    (0x0900..=0x0D7F).contains(&u) || (0x0D80..=0x0DFF).contains(&u)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::UnicodeBuffer;

    fn categorized(text: &str) -> Buffer {
        let mut b = UnicodeBuffer::new();
        b.push_str(text);
        let mut buffer = b.0;
        for info in &mut buffer.info {
            let (cat, pos) = categorize(info.codepoint);
            info.set_indic_category(cat);
            info.set_indic_position(pos);
        }
        find_syllables(&mut buffer);
        buffer
    }

    #[test]
    fn devanagari_categories() {
        assert_eq!(categorize(0x0915).0, Category::C); // KA
        assert_eq!(categorize(0x0930).0, Category::Ra); // RA
        assert_eq!(categorize(0x093F).0, Category::M); // I matra
        assert_eq!(categorize(0x093F).1, Position::PreM);
        assert_eq!(categorize(0x094D).0, Category::H); // virama
        assert_eq!(categorize(0x0902).0, Category::Sm); // anusvara
        assert_eq!(categorize(0x093C).0, Category::N); // nukta
    }

    #[test]
    fn ka_i_is_one_syllable() {
        let buffer = categorized("\u{0915}\u{093F}");
        assert_eq!(buffer.info[0].syllable, buffer.info[1].syllable);
        assert_eq!(
            buffer.info[0].syllable & 0x0F,
            SyllableType::Consonant as u8
        );
    }

    #[test]
    fn conjunct_is_one_syllable() {
        // ka + virama + ka + i-matra
        let buffer = categorized("\u{0915}\u{094D}\u{0915}\u{093F}");
        let s = buffer.info[0].syllable;
        assert!(buffer.info.iter().all(|i| i.syllable == s));
    }

    #[test]
    fn orphan_matra_is_broken() {
        let buffer = categorized("\u{093F}");
        assert_eq!(buffer.info[0].syllable & 0x0F, SyllableType::Broken as u8);
    }

    #[test]
    fn syllables_split_between_bases() {
        // ka + i-matra, ka
        let buffer = categorized("\u{0915}\u{093F}\u{0915}");
        assert_eq!(buffer.info[0].syllable, buffer.info[1].syllable);
        assert_ne!(buffer.info[1].syllable, buffer.info[2].syllable);
    }

    #[test]
    fn pre_base_matra_moves_before_base() {
        let face = Face::builder()
            .cmap(vec![(0x0915, 10), (0x093F, 20), (DOTTED_CIRCLE, 99)])
            .build();
        let plan = crate::plan::ShapePlan::new(
            &face,
            crate::common::Direction::LeftToRight,
            Some(crate::common::script::DEVANAGARI),
            None,
            &[],
        );

        let mut b = UnicodeBuffer::new();
        b.push_str("\u{0915}\u{093F}");
        let mut buffer = b.0;
        setup_masks(&plan, &face, &mut buffer);
        initial_reordering(&plan, &face, &mut buffer);

        assert_eq!(buffer.info[0].codepoint, 0x093F);
        assert_eq!(buffer.info[1].codepoint, 0x0915);
        // Both halves of the syllable share one cluster.
        assert_eq!(buffer.info[0].cluster, buffer.info[1].cluster);
    }
}
