//! The GPOS engine: value records, pair adjustment, cursive chaining
//! and mark attachment, plus the post-pass that resolves attachment
//! chains into absolute offsets.

use super::apply::{ApplyContext, Skip};
use super::contextual::{apply_chain_context, apply_context};
use super::map::TableIndex;
use crate::buffer::{attach_type, Buffer, BufferScratchFlags, GlyphPosition};
use crate::common::Direction;
use crate::face::Face;
use crate::plan::ShapePlan;
use crate::tables::gdef::GlyphClass;
use crate::tables::gpos::{PairPos, PosSubtable, SinglePos};
use crate::tables::gsubgpos::{Lookup, LookupFlags, ValueRecord};

/// Runs every GPOS stage of the plan, in place.
pub(crate) fn position(plan: &ShapePlan, face: &Face, buffer: &mut Buffer) {
    if face.gpos.is_none() {
        return;
    }

    for stage in 0..plan.ot_map.stage_count(TableIndex::Gpos) {
        for lookup_map in plan.ot_map.stage_lookups(TableIndex::Gpos, stage) {
            apply_string(face, buffer, lookup_map);
        }

        if let Some(pause) = plan.ot_map.stages[TableIndex::Gpos.idx()][stage].pause_func {
            pause(plan, face, buffer);
        }
    }
}

fn apply_string(face: &Face, buffer: &mut Buffer, lookup_map: &super::map::LookupMap) {
    let table = match face.gpos.as_ref() {
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

    let mut ctx = ApplyContext::new(TableIndex::Gpos, face, buffer);
    ctx.set_lookup_props(
        lookup.flags,
        lookup.mark_filtering_set,
        lookup_map.mask,
        lookup_map.auto_zwnj,
        lookup_map.auto_zwj,
    );

    ctx.buffer.idx = 0;
    while ctx.buffer.idx < ctx.buffer.info.len() {
        if ctx.buffer.max_ops <= 0 {
            break;
        }
        ctx.buffer.max_ops -= 1;

        let applied = ctx.accepts_current(&lookup.digest)
            && apply_subtables(&mut ctx, lookup).is_some();

        if !applied {
            ctx.buffer.idx += 1;
        }
    }
    ctx.buffer.idx = 0;
}

fn apply_subtables(ctx: &mut ApplyContext, lookup: &Lookup<PosSubtable>) -> Option<()> {
    for subtable in &lookup.subtables {
        if apply_subtable(ctx, subtable).is_some() {
            return Some(());
        }
    }
    None
}

fn apply_subtable(ctx: &mut ApplyContext, subtable: &PosSubtable) -> Option<()> {
    match subtable {
        PosSubtable::Single(single) => apply_single(ctx, single),
        PosSubtable::Pair(pair) => apply_pair(ctx, pair),
        PosSubtable::Cursive(cursive) => apply_cursive(ctx, cursive),
        PosSubtable::MarkToBase(mark_base) => apply_mark_to_base(ctx, mark_base),
        PosSubtable::MarkToLigature(mark_lig) => apply_mark_to_ligature(ctx, mark_lig),
        PosSubtable::MarkToMark(mark_mark) => apply_mark_to_mark(ctx, mark_mark),
        // The record applier leaves the read head one past the matched
        // span.
        PosSubtable::Context(context) => apply_context(ctx, context, recurse),
        PosSubtable::ChainContext(chain) => apply_chain_context(ctx, chain, recurse),
    }
}

fn apply_value(face: &Face, value: &ValueRecord, pos: &mut GlyphPosition) {
    let ppem = face.ppem;

    pos.x_offset += i32::from(value.x_placement);
    pos.y_offset += i32::from(value.y_placement);
    pos.x_advance += i32::from(value.x_advance);
    pos.y_advance += i32::from(value.y_advance);

    if let Some(dev) = &value.x_placement_device {
        pos.x_offset += dev.get_delta(ppem);
    }
    if let Some(dev) = &value.y_placement_device {
        pos.y_offset += dev.get_delta(ppem);
    }
    if let Some(dev) = &value.x_advance_device {
        pos.x_advance += dev.get_delta(ppem);
    }
    if let Some(dev) = &value.y_advance_device {
        pos.y_advance += dev.get_delta(ppem);
    }
}

fn apply_single(ctx: &mut ApplyContext, single: &SinglePos) -> Option<()> {
    let glyph = ctx.cur_glyph();
    let value = match single {
        SinglePos::Format1 { coverage, value } => {
            coverage.get(glyph)?;
            value
        }
        SinglePos::Format2 { coverage, values } => {
            let index = coverage.get(glyph)?;
            values.get(usize::from(index))?
        }
    };

    let idx = ctx.buffer.idx;
    apply_value(ctx.face, value, &mut ctx.buffer.pos[idx]);
    ctx.buffer.idx += 1;
    Some(())
}

/// The next position a pair or cursive lookup pairs with: definite and
/// ignorable skips both step over.
fn next_paired(ctx: &mut ApplyContext, from: usize) -> Option<usize> {
    let mut i = from;
    loop {
        i = ctx.next_non_skipped(i)?;
        let info = ctx.buffer.info[i];
        if ctx.may_skip(&info) == Skip::Maybe {
            i += 1;
            continue;
        }
        return Some(i);
    }
}

fn prev_paired(ctx: &ApplyContext, from: usize) -> Option<usize> {
    let mut i = from as i64;
    while i >= 0 {
        let info = ctx.buffer.info[i as usize];
        if ctx.may_skip(&info) == Skip::No {
            return Some(i as usize);
        }
        i -= 1;
    }
    None
}

fn apply_pair(ctx: &mut ApplyContext, pair: &PairPos) -> Option<()> {
    let first_idx = ctx.buffer.idx;
    let first = ctx.cur_glyph();
    let second_idx = next_paired(ctx, first_idx + 1)?;
    let second = ctx.buffer.info[second_idx].as_glyph();

    let (value1, value2) = match pair {
        PairPos::Format1 { coverage, sets } => {
            let index = coverage.get(first)?;
            let set = sets.get(usize::from(index))?;
            let record = set
                .binary_search_by(|r| r.second.cmp(&second))
                .ok()
                .map(|i| &set[i])?;
            (&record.value1, &record.value2)
        }
        PairPos::Format2 {
            coverage,
            classes1,
            classes2,
            class2_count,
            matrix,
        } => {
            coverage.get(first)?;
            let c1 = classes1.get(first);
            let c2 = classes2.get(second);
            let cell = matrix
                .get(usize::from(c1) * usize::from(*class2_count) + usize::from(c2))?;
            (&cell.0, &cell.1)
        }
    };

    apply_value(ctx.face, value1, &mut ctx.buffer.pos[first_idx]);
    let second_has_value = !value2.is_empty();
    if second_has_value {
        apply_value(ctx.face, value2, &mut ctx.buffer.pos[second_idx]);
    }

    ctx.buffer.unsafe_to_break(first_idx, second_idx + 1);

    // Per pair-positioning semantics the loop resumes at the second
    // glyph, or past it when it carried its own value record.
    ctx.buffer.idx = if second_has_value {
        second_idx + 1
    } else {
        second_idx
    };
    Some(())
}

fn apply_cursive(ctx: &mut ApplyContext, cursive: &crate::tables::gpos::CursivePos) -> Option<()> {
    let cur = ctx.buffer.idx;
    let this_index = cursive.coverage.get(ctx.cur_glyph())?;
    let this_entry = cursive.entry_exits.get(usize::from(this_index))?.entry.as_ref()?;

    let prev = prev_paired(ctx, cur.checked_sub(1)?)?;
    let prev_index = cursive.coverage.get(ctx.buffer.info[prev].as_glyph())?;
    let prev_exit = cursive.entry_exits.get(usize::from(prev_index))?.exit.as_ref()?;

    let ppem = ctx.face.ppem;
    let (exit_x, exit_y) = prev_exit.get(ppem);
    let (entry_x, entry_y) = this_entry.get(ppem);

    let direction = ctx.buffer.direction;
    let pos = &mut ctx.buffer.pos;

    match direction {
        Direction::LeftToRight => {
            pos[prev].x_advance = exit_x + pos[prev].x_offset;
            let d = entry_x + pos[cur].x_offset;
            pos[cur].x_advance -= d;
            pos[cur].x_offset -= d;
        }
        Direction::RightToLeft => {
            let d = exit_x + pos[prev].x_offset;
            pos[prev].x_advance -= d;
            pos[prev].x_offset -= d;
            pos[cur].x_advance = entry_x + pos[cur].x_offset;
        }
        Direction::TopToBottom => {
            pos[prev].y_advance = exit_y + pos[prev].y_offset;
            let d = entry_y + pos[cur].y_offset;
            pos[cur].y_advance -= d;
            pos[cur].y_offset -= d;
        }
        Direction::BottomToTop => {
            let d = exit_y + pos[prev].y_offset;
            pos[prev].y_advance -= d;
            pos[prev].y_offset -= d;
            pos[cur].y_advance = entry_y + pos[cur].y_offset;
        }
    }

    // The cross-stream offset rides the attachment chain; which glyph
    // is the child depends on the lookup's direction flag.
    let (child, parent, x_delta, y_delta) =
        if ctx.lookup_flags.contains(LookupFlags::RIGHT_TO_LEFT) {
            (cur, prev, entry_x - exit_x, entry_y - exit_y)
        } else {
            (prev, cur, exit_x - entry_x, exit_y - entry_y)
        };

    pos[child].attach_type = attach_type::CURSIVE;
    pos[child].attach_chain = (parent as i64 - child as i64) as i16;
    if direction.is_horizontal() {
        pos[child].y_offset = y_delta;
    } else {
        pos[child].x_offset = x_delta;
    }

    ctx.buffer.scratch_flags |= BufferScratchFlags::HAS_GPOS_ATTACHMENT;
    ctx.buffer.unsafe_to_break(prev, cur + 1);
    ctx.buffer.idx += 1;
    Some(())
}

/// Scans backward for the glyph a mark attaches to, stepping over
/// other marks. The caller's coverage check decides whether what we
/// found is actually usable.
fn find_attach_base(ctx: &ApplyContext, from: usize) -> Option<usize> {
    let mut i = from as i64;
    while i >= 0 {
        let info = ctx.buffer.info[i as usize];
        if ctx.face.glyph_class(info.as_glyph()) != Some(GlyphClass::Mark) {
            return Some(i as usize);
        }
        i -= 1;
    }
    None
}

fn attach_mark(
    ctx: &mut ApplyContext,
    mark_idx: usize,
    base_idx: usize,
    mark_anchor: &crate::tables::gsubgpos::Anchor,
    base_anchor: &crate::tables::gsubgpos::Anchor,
) {
    let ppem = ctx.face.ppem;
    let (base_x, base_y) = base_anchor.get(ppem);
    let (mark_x, mark_y) = mark_anchor.get(ppem);

    let pos = &mut ctx.buffer.pos[mark_idx];
    pos.x_offset = base_x - mark_x;
    pos.y_offset = base_y - mark_y;
    pos.x_advance = 0;
    pos.y_advance = 0;
    pos.attach_type = attach_type::MARK;
    pos.attach_chain = (base_idx as i64 - mark_idx as i64) as i16;

    ctx.buffer.scratch_flags |= BufferScratchFlags::HAS_GPOS_ATTACHMENT;
    ctx.buffer.unsafe_to_break(base_idx, mark_idx + 1);
}

fn apply_mark_to_base(
    ctx: &mut ApplyContext,
    table: &crate::tables::gpos::MarkBasePos,
) -> Option<()> {
    let mark_idx = ctx.buffer.idx;
    let mark_index = table.mark_coverage.get(ctx.cur_glyph())?;

    let base_idx = find_attach_base(ctx, mark_idx.checked_sub(1)?)?;
    let base_index = table.base_coverage.get(ctx.buffer.info[base_idx].as_glyph())?;

    let mark_record = table.marks.get(usize::from(mark_index))?;
    let base_anchor = table
        .base_anchors
        .get(usize::from(base_index))?
        .get(usize::from(mark_record.class))?
        .as_ref()?;

    let mark_anchor = mark_record.anchor.clone();
    attach_mark(ctx, mark_idx, base_idx, &mark_anchor, base_anchor);
    ctx.buffer.idx += 1;
    Some(())
}

fn apply_mark_to_ligature(
    ctx: &mut ApplyContext,
    table: &crate::tables::gpos::MarkLigPos,
) -> Option<()> {
    let mark_idx = ctx.buffer.idx;
    let mark_index = table.mark_coverage.get(ctx.cur_glyph())?;

    let lig_idx = find_attach_base(ctx, mark_idx.checked_sub(1)?)?;
    let lig_index = table
        .ligature_coverage
        .get(ctx.buffer.info[lig_idx].as_glyph())?;

    let mark_record = table.marks.get(usize::from(mark_index))?;
    let components = table.ligature_anchors.get(usize::from(lig_index))?;
    if components.is_empty() {
        return None;
    }

    // The mark remembers which component it sat on when the ligature
    // formed; unrelated marks land on the last component.
    let mark_info = ctx.buffer.info[mark_idx];
    let lig_info = ctx.buffer.info[lig_idx];
    let comp_count = components.len();
    let comp_index = if lig_info.lig_id() != 0
        && lig_info.lig_id() == mark_info.lig_id()
        && mark_info.lig_comp() > 0
    {
        usize::from(mark_info.lig_comp()).min(comp_count) - 1
    } else {
        comp_count - 1
    };

    let lig_anchor = components
        .get(comp_index)?
        .get(usize::from(mark_record.class))?
        .as_ref()?;

    let mark_anchor = mark_record.anchor.clone();
    attach_mark(ctx, mark_idx, lig_idx, &mark_anchor, lig_anchor);
    ctx.buffer.idx += 1;
    Some(())
}

fn apply_mark_to_mark(
    ctx: &mut ApplyContext,
    table: &crate::tables::gpos::MarkMarkPos,
) -> Option<()> {
    let mark1_idx = ctx.buffer.idx;
    let mark1_index = table.mark1_coverage.get(ctx.cur_glyph())?;

    // The attachment target is the closest preceding glyph the lookup
    // flags do not filter out; it must itself be covered as a mark2.
    let mut i = mark1_idx.checked_sub(1)? as i64;
    let mark2_idx = loop {
        if i < 0 {
            return None;
        }
        let info = ctx.buffer.info[i as usize];
        if ctx.may_skip(&info) == Skip::No {
            break i as usize;
        }
        i -= 1;
    };

    // Both marks must belong to the same base or the same ligature
    // component.
    let info1 = ctx.buffer.info[mark1_idx];
    let info2 = ctx.buffer.info[mark2_idx];
    let same_lig = if info1.lig_id() == info2.lig_id() {
        info1.lig_id() == 0 || info1.lig_comp() == info2.lig_comp()
    } else {
        // One of them may itself be a ligature.
        (info1.lig_id() > 0 && info1.lig_comp() == 0)
            || (info2.lig_id() > 0 && info2.lig_comp() == 0)
    };
    if !same_lig {
        return None;
    }

    let mark2_index = table.mark2_coverage.get(info2.as_glyph())?;

    let mark_record = table.marks.get(usize::from(mark1_index))?;
    let mark2_anchor = table
        .mark2_anchors
        .get(usize::from(mark2_index))?
        .get(usize::from(mark_record.class))?
        .as_ref()?;

    let mark_anchor = mark_record.anchor.clone();
    attach_mark(ctx, mark1_idx, mark2_idx, &mark_anchor, mark2_anchor);
    ctx.buffer.idx += 1;
    Some(())
}

/// Applies a nested GPOS lookup at the current position.
pub(crate) fn recurse(ctx: &mut ApplyContext, lookup_index: u16) -> Option<()> {
    if ctx.nesting_level_left == 0 {
        return None;
    }

    let table = ctx.face.gpos.as_ref()?;
    let lookup = table.lookups.get(usize::from(lookup_index))?;

    let saved_flags = ctx.lookup_flags;
    let saved_set = ctx.mark_filtering_set;
    let saved_idx = ctx.buffer.idx;

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
    ctx.buffer.idx = saved_idx;

    applied
}

/// Resolves attachment chains into absolute offsets. The chain array
/// is a forest; clearing each link as it is walked doubles as the
/// cycle breaker, so a malformed font cannot loop.
pub(crate) fn position_finish(buffer: &mut Buffer) {
    if !buffer
        .scratch_flags
        .contains(BufferScratchFlags::HAS_GPOS_ATTACHMENT)
    {
        return;
    }

    let direction = buffer.direction;
    let len = buffer.pos.len();
    for i in 0..len {
        propagate_attachment_offsets(&mut buffer.pos, len, i, direction);
    }
}

fn propagate_attachment_offsets(
    pos: &mut [GlyphPosition],
    len: usize,
    i: usize,
    direction: Direction,
) {
    let chain = pos[i].attach_chain;
    if chain == 0 {
        return;
    }
    pos[i].attach_chain = 0;

    let j = (i as i64 + i64::from(chain)) as usize;
    if j >= len {
        return;
    }

    propagate_attachment_offsets(pos, len, j, direction);

    match pos[i].attach_type {
        attach_type::MARK => {
            pos[i].x_offset += pos[j].x_offset;
            pos[i].y_offset += pos[j].y_offset;

            // The anchor math was in the base's coordinate space; the
            // advances in between move the pen, so undo them.
            if direction.is_forward() {
                debug_assert!(j <= i);
                for k in j..i {
                    pos[i].x_offset -= pos[k].x_advance;
                    pos[i].y_offset -= pos[k].y_advance;
                }
            } else {
                for k in (j + 1)..(i + 1) {
                    pos[i].x_offset += pos[k].x_advance;
                    pos[i].y_offset += pos[k].y_advance;
                }
            }
        }
        attach_type::CURSIVE => {
            if direction.is_horizontal() {
                pos[i].y_offset += pos[j].y_offset;
            } else {
                pos[i].x_offset += pos[j].x_offset;
            }
        }
        _ => {}
    }
}
