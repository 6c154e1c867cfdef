//! The GSUB engine: runs the plan's substitution stages over the
//! buffer, lookup by lookup, with digest-filtered dispatch and nested
//! lookup support.

use ttf_parser::GlyphId;

use super::apply::ApplyContext;
use super::contextual::{apply_chain_context, apply_context};
use super::map::TableIndex;
use super::matching::{ligate_input, match_backtrack, match_input, match_lookahead, MatchFunc};
use crate::buffer::Buffer;
use crate::face::Face;
use crate::plan::ShapePlan;
use crate::tables::gsub::{SingleSubst, SubstSubtable};
use crate::tables::gsubgpos::Lookup;

/// Runs every GSUB stage of the plan, calling stage pauses in between.
/// Stages run even for fonts without GSUB: the complex shapers hang
/// reordering and recomposition off the pauses.
pub(crate) fn substitute(plan: &ShapePlan, face: &Face, buffer: &mut Buffer) {
    for stage in 0..plan.ot_map.stage_count(TableIndex::Gsub) {
        for lookup_map in plan.ot_map.stage_lookups(TableIndex::Gsub, stage) {
            apply_string(face, buffer, lookup_map);
        }

        if let Some(pause) = plan.ot_map.stages[TableIndex::Gsub.idx()][stage].pause_func {
            pause(plan, face, buffer);
        }
    }
}

fn apply_string(face: &Face, buffer: &mut Buffer, lookup_map: &super::map::LookupMap) {
    let table = match face.gsub.as_ref() {
        Some(t) => t,
        None => return,
    };
    let lookup = match table.lookups.get(usize::from(lookup_map.index)) {
        Some(l) => l,
        None => return,
    };

    if buffer.is_empty() || lookup.subtables.is_empty() {
        return;
    }

    let reverse = lookup
        .subtables
        .iter()
        .all(|s| s.is_reverse());

    if reverse {
        apply_backward(face, buffer, lookup, lookup_map);
    } else {
        apply_forward(face, buffer, lookup, lookup_map);
    }
}

fn apply_forward(
    face: &Face,
    buffer: &mut Buffer,
    lookup: &Lookup<SubstSubtable>,
    lookup_map: &super::map::LookupMap,
) {
    buffer.clear_output();

    let mut ctx = ApplyContext::new(TableIndex::Gsub, face, buffer);
    ctx.set_lookup_props(
        lookup.flags,
        lookup.mark_filtering_set,
        lookup_map.mask,
        lookup_map.auto_zwnj,
        lookup_map.auto_zwj,
    );

    while ctx.buffer.idx < ctx.buffer.info.len() {
        if ctx.buffer.max_ops <= 0 {
            // Pathological font: stream the rest through untouched.
            ctx.buffer.next_glyph();
            continue;
        }

        let applied = ctx.accepts_current(&lookup.digest)
            && apply_subtables(&mut ctx, lookup).is_some();

        if applied {
            ctx.invalidate_skip_cache();
        } else {
            ctx.buffer.next_glyph();
        }
        ctx.buffer.max_ops -= 1;
    }

    buffer.swap_buffers();
}

/// Reverse chaining single substitution walks the buffer back to front
/// and rewrites in place; one-to-one, so no output buffer.
fn apply_backward(
    face: &Face,
    buffer: &mut Buffer,
    lookup: &Lookup<SubstSubtable>,
    lookup_map: &super::map::LookupMap,
) {
    let mut ctx = ApplyContext::new(TableIndex::Gsub, face, buffer);
    ctx.set_lookup_props(
        lookup.flags,
        lookup.mark_filtering_set,
        lookup_map.mask,
        lookup_map.auto_zwnj,
        lookup_map.auto_zwj,
    );

    let mut i = ctx.buffer.info.len();
    while i > 0 {
        i -= 1;
        ctx.buffer.idx = i;
        if ctx.accepts_current(&lookup.digest) {
            if apply_subtables(&mut ctx, lookup).is_some() {
                ctx.invalidate_skip_cache();
            }
        }
    }
    ctx.buffer.idx = 0;
}

fn apply_subtables(ctx: &mut ApplyContext, lookup: &Lookup<SubstSubtable>) -> Option<()> {
    for subtable in &lookup.subtables {
        if apply_subtable(ctx, subtable).is_some() {
            return Some(());
        }
    }
    None
}

fn apply_subtable(ctx: &mut ApplyContext, subtable: &SubstSubtable) -> Option<()> {
    match subtable {
        SubstSubtable::Single(single) => apply_single(ctx, single),
        SubstSubtable::Multiple(multiple) => {
            let index = multiple.coverage.get(ctx.cur_glyph())?;
            let sequence = multiple.sequences.get(usize::from(index))?;

            if sequence.is_empty() {
                // An empty sequence deletes the glyph.
                ctx.buffer.delete_glyph();
                return Some(());
            }

            if ctx.buffer.info.len() + sequence.len() > ctx.buffer.max_len {
                return None;
            }

            ctx.buffer.replace_glyphs(1, sequence);
            Some(())
        }
        SubstSubtable::Alternate(alternate) => {
            let index = alternate.coverage.get(ctx.cur_glyph())?;
            let set = alternate.alternates.get(usize::from(index))?;
            // No chooser is exposed; the first alternate wins.
            let glyph = *set.first()?;
            ctx.buffer.replace_glyph(glyph);
            Some(())
        }
        SubstSubtable::Ligature(ligature) => {
            let index = ligature.coverage.get(ctx.cur_glyph())?;
            let set = ligature.ligature_sets.get(usize::from(index))?;

            for lig in set {
                if lig.components.is_empty() {
                    // Single-component ligature: a plain replacement.
                    ctx.buffer.replace_glyph(lig.glyph);
                    return Some(());
                }

                if let Some(matched) = match_input(ctx, MatchFunc::Glyphs(&lig.components)) {
                    ligate_input(ctx, &matched, lig.glyph);
                    return Some(());
                }
            }
            None
        }
        SubstSubtable::Context(context) => apply_context(ctx, context, recurse),
        SubstSubtable::ChainContext(chain) => apply_chain_context(ctx, chain, recurse),
        SubstSubtable::ReverseChainSingle(reverse) => {
            let index = reverse.coverage.get(ctx.cur_glyph())?;

            if !match_backtrack(ctx, MatchFunc::Coverages(&reverse.backtrack_coverages)) {
                return None;
            }
            if !match_lookahead(
                ctx,
                MatchFunc::Coverages(&reverse.lookahead_coverages),
                ctx.buffer.idx + 1,
            ) {
                return None;
            }

            let glyph = *reverse.substitutes.get(usize::from(index))?;
            let idx = ctx.buffer.idx;
            ctx.buffer.info[idx].glyph_id = glyph.0;
            ctx.buffer.info[idx].flags |= crate::buffer::glyph_flag::SUBSTITUTED;
            Some(())
        }
    }
}

fn apply_single(ctx: &mut ApplyContext, single: &SingleSubst) -> Option<()> {
    let glyph = ctx.cur_glyph();
    let new_glyph = match single {
        SingleSubst::Format1 { coverage, delta } => {
            coverage.get(glyph)?;
            GlyphId((i32::from(glyph.0) + i32::from(*delta)) as u16)
        }
        SingleSubst::Format2 { coverage, substitutes } => {
            let index = coverage.get(glyph)?;
            *substitutes.get(usize::from(index))?
        }
    };

    ctx.buffer.replace_glyph(new_glyph);
    Some(())
}

/// Applies a nested lookup at the current position.
pub(crate) fn recurse(ctx: &mut ApplyContext, lookup_index: u16) -> Option<()> {
    if ctx.nesting_level_left == 0 {
        return None;
    }

    let table = ctx.face.gsub.as_ref()?;
    let lookup = table.lookups.get(usize::from(lookup_index))?;

    let saved_flags = ctx.lookup_flags;
    let saved_set = ctx.mark_filtering_set;

    ctx.nesting_level_left -= 1;
    ctx.set_lookup_props(
        lookup.flags,
        lookup.mark_filtering_set,
        ctx.lookup_mask,
        ctx.auto_zwnj,
        ctx.auto_zwj,
    );

    let applied = apply_subtables(ctx, lookup);

    ctx.set_lookup_props(saved_flags, saved_set, ctx.lookup_mask, ctx.auto_zwnj, ctx.auto_zwj);
    ctx.nesting_level_left += 1;

    applied
}
