//! The top-level shaping driver: buffer preparation, the substitution
//! and positioning phases, and the output post-passes.

use unicode_segmentation::UnicodeSegmentation;

use crate::buffer::{Buffer, BufferClusterLevel, BufferFlags, BufferScratchFlags};
use crate::common::{Direction, Feature, Script};
use crate::complex::ZeroWidthMarks;
use crate::face::Face;
use crate::normalize;
use crate::ot;
use crate::plan::{cached_plan, ShapePlan};
use crate::tables::gdef::GlyphClass;
use crate::unicode::{CharExt, GeneralCategoryExt, DOTTED_CIRCLE};

pub(crate) fn shape_impl(face: &Face, features: &[Feature], buffer: &mut Buffer) {
    if buffer.is_empty() {
        return;
    }

    if buffer.script.is_none() {
        buffer.script = guess_script(buffer);
    }

    let plan = cached_plan(face, buffer.direction, buffer.script, buffer.language, features);

    initialize_buffer(&plan, face, buffer);

    substitute(&plan, face, buffer);
    position(&plan, face, buffer);

    finish(&plan, face, buffer);
}

fn guess_script(buffer: &Buffer) -> Option<Script> {
    for info in &buffer.info {
        let script = Script::from_char(info.as_char());
        if script != crate::common::script::UNKNOWN {
            return Some(script);
        }
    }
    None
}

fn initialize_buffer(plan: &ShapePlan, face: &Face, buffer: &mut Buffer) {
    buffer.scratch_flags = BufferScratchFlags::empty();
    buffer.max_len = (buffer.len() * crate::buffer::MAX_LEN_FACTOR).max(crate::buffer::MAX_LEN_MIN);
    buffer.max_ops =
        (buffer.len() as i32).saturating_mul(crate::buffer::MAX_OPS_FACTOR).max(crate::buffer::MAX_OPS_MIN);

    for i in 0..buffer.len() {
        let mut scratch = buffer.scratch_flags;
        buffer.info[i].init_unicode_props(&mut scratch);
        buffer.scratch_flags = scratch;
    }

    form_clusters(buffer);
    insert_dotted_circle_for_leading_mark(face, buffer);
    ensure_native_direction(buffer);

    if let Some(preprocess) = plan.shaper.preprocess_text {
        preprocess(plan, face, buffer);
    }

    // RTL runs mirror brackets and friends before glyph mapping.
    if buffer.direction == Direction::RightToLeft {
        for info in &mut buffer.info {
            if let Some(mirrored) = info.as_char().mirrored() {
                info.codepoint = mirrored as u32;
            }
        }
    }

    normalize::normalize(plan.shaper, face, buffer);

    buffer.reset_masks(plan.ot_map.global_mask());
    if let Some(setup_masks) = plan.shaper.setup_masks {
        setup_masks(plan, face, buffer);
    }

    map_glyphs(face, buffer);
}

/// Monotone-graphemes cluster level: every scalar of an extended
/// grapheme cluster shares the cluster value of its first scalar.
fn form_clusters(buffer: &mut Buffer) {
    if buffer.cluster_level != BufferClusterLevel::MonotoneGraphemes || buffer.len() < 2 {
        return;
    }

    let text: String = buffer.info.iter().map(|i| i.as_char()).collect();

    let mut scalar_index = 0;
    for grapheme in text.graphemes(true) {
        let scalar_count = grapheme.chars().count();
        let cluster = buffer.info[scalar_index].cluster;
        for info in &mut buffer.info[scalar_index..scalar_index + scalar_count] {
            info.cluster = cluster;
        }
        scalar_index += scalar_count;
    }
}

/// A run starting with a combining mark gets a dotted circle to sit
/// on when the buffer claims to start its paragraph.
fn insert_dotted_circle_for_leading_mark(face: &Face, buffer: &mut Buffer) {
    if !buffer.flags.contains(BufferFlags::BEGINNING_OF_TEXT)
        || buffer.flags.contains(BufferFlags::DO_NOT_INSERT_DOTTED_CIRCLE)
        || buffer.context_len(0) != 0
    {
        return;
    }

    if !buffer.info[0].general_category().is_mark() {
        return;
    }

    if face.glyph_index(DOTTED_CIRCLE).is_none() {
        return;
    }

    let mut info = buffer.info[0];
    info.codepoint = DOTTED_CIRCLE;
    let mut scratch = buffer.scratch_flags;
    info.init_unicode_props(&mut scratch);
    buffer.scratch_flags = scratch;
    buffer.info.insert(0, info);
}

/// Shaping happens in the script's native direction; a mismatched
/// request flips the run here and the final reversal restores it.
fn ensure_native_direction(buffer: &mut Buffer) {
    let script = match buffer.script {
        Some(s) => s,
        None => return,
    };

    let native = match Direction::from_script(script) {
        Some(d) => d,
        None => return,
    };

    if buffer.direction.is_horizontal() && buffer.direction != native {
        buffer.reverse_clusters();
        buffer.direction = buffer.direction.reverse();
    }
}

fn map_glyphs(face: &Face, buffer: &mut Buffer) {
    for info in &mut buffer.info {
        // Unmapped codepoints fall through to .notdef and shaping
        // carries on.
        info.glyph_id = face
            .glyph_index(info.codepoint)
            .map(|g| g.0)
            .unwrap_or(0);
    }
}

fn substitute(plan: &ShapePlan, face: &Face, buffer: &mut Buffer) {
    ot::fallback::recategorize_combining_marks(buffer);

    if plan.apply_morx {
        crate::aat::apply_morx(face, buffer);
    } else {
        // Runs the stage pauses even when the font has no GSUB; the
        // complex shapers reorder and recompose there.
        ot::substitute::substitute(plan, face, buffer);
    }
}

fn position(plan: &ShapePlan, face: &Face, buffer: &mut Buffer) {
    buffer.sync_positions();

    // Nominal advances first; everything else is a delta on top.
    let horizontal = buffer.direction.is_horizontal();
    for i in 0..buffer.len() {
        let glyph = buffer.info[i].as_glyph();
        if horizontal {
            buffer.pos[i].x_advance = i32::from(face.glyph_h_advance(glyph));
        } else {
            // Vertical runs advance downward.
            buffer.pos[i].y_advance = -i32::from(face.glyph_v_advance(glyph));
        }
    }

    if plan.shaper.zero_width_marks == ZeroWidthMarks::ByGdefEarly {
        zero_mark_advances(face, buffer);
    }

    if plan.apply_gpos {
        ot::position::position(plan, face, buffer);
    }

    if plan.shaper.zero_width_marks == ZeroWidthMarks::ByGdefLate {
        zero_mark_advances(face, buffer);
    }

    ot::position::position_finish(buffer);

    if plan.fallback_mark_positioning && plan.shaper.fallback_position {
        ot::fallback::apply_fallback_mark_positioning(face, buffer);
    }

    if plan.apply_kern {
        ot::kerning::apply_fallback_kerning(plan, face, buffer);
    }
}

fn zero_mark_advances(face: &Face, buffer: &mut Buffer) {
    if face.gdef.is_none() {
        return;
    }

    for i in 0..buffer.len() {
        if face.glyph_class(buffer.info[i].as_glyph()) == Some(GlyphClass::Mark) {
            buffer.pos[i].x_advance = 0;
            buffer.pos[i].y_advance = 0;
        }
    }
}

fn finish(plan: &ShapePlan, face: &Face, buffer: &mut Buffer) {
    if let Some(postprocess) = plan.shaper.postprocess_glyphs {
        postprocess(plan, face, buffer);
    }

    handle_default_ignorables(face, buffer);

    buffer.make_clusters_monotone();

    // Visual order for backward runs.
    if buffer.direction.is_backward() {
        buffer.reverse();
    }
}

/// Default ignorables either vanish or collapse to invisible
/// zero-width glyphs, depending on the buffer flags.
fn handle_default_ignorables(face: &Face, buffer: &mut Buffer) {
    if buffer.flags.contains(BufferFlags::PRESERVE_DEFAULT_IGNORABLES) {
        return;
    }
    if !buffer
        .scratch_flags
        .contains(BufferScratchFlags::HAS_DEFAULT_IGNORABLES)
    {
        return;
    }

    let remove = buffer.flags.contains(BufferFlags::REMOVE_DEFAULT_IGNORABLES);

    if remove {
        let mut kept = 0;
        for i in 0..buffer.len() {
            if buffer.info[i].is_default_ignorable() {
                // Its cluster survives on a neighbor by the monotone
                // pass.
                continue;
            }
            buffer.info[kept] = buffer.info[i];
            buffer.pos[kept] = buffer.pos[i];
            kept += 1;
        }
        buffer.info.truncate(kept);
        buffer.pos.truncate(kept);
        return;
    }

    // Hide: swap in the space glyph with no advance.
    let space = face.glyph_index(' ' as u32);
    for i in 0..buffer.len() {
        if buffer.info[i].is_default_ignorable() {
            if let Some(space) = space {
                buffer.info[i].glyph_id = space.0;
            }
            buffer.pos[i].x_advance = 0;
            buffer.pos[i].y_advance = 0;
            buffer.pos[i].x_offset = 0;
            buffer.pos[i].y_offset = 0;
        }
    }
}
