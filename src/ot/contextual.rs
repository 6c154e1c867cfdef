//! Context and chain-context rule application, shared by GSUB and
//! GPOS. Nested lookup records re-enter the owning engine through a
//! recursion callback so this module stays table-agnostic.

use super::apply::ApplyContext;
use super::matching::{match_backtrack, match_input, match_lookahead, MatchFunc, MatchedInput};
use crate::tables::gsubgpos::{ChainContextLookup, ContextLookup, LookupRecord};

/// Applies one nested lookup at the current buffer position.
pub(crate) type RecurseFunc = fn(&mut ApplyContext, u16) -> Option<()>;

pub(crate) fn apply_context(
    ctx: &mut ApplyContext,
    lookup: &ContextLookup,
    recurse: RecurseFunc,
) -> Option<()> {
    let glyph = ctx.cur_glyph();

    match lookup {
        ContextLookup::Format1 { coverage, rule_sets } => {
            let index = coverage.get(glyph)?;
            let rules = rule_sets.get(usize::from(index))?;
            for rule in rules {
                if let Some(matched) = match_input(ctx, MatchFunc::Glyphs(&rule.input)) {
                    apply_lookup_records(ctx, &matched, &rule.lookups, recurse);
                    return Some(());
                }
            }
            None
        }
        ContextLookup::Format2 {
            coverage,
            classes,
            rule_sets,
        } => {
            coverage.get(glyph)?;
            let class = classes.get(glyph);
            let rules = rule_sets.get(usize::from(class))?;
            for rule in rules {
                if let Some(matched) =
                    match_input(ctx, MatchFunc::Classes(classes, &rule.input))
                {
                    apply_lookup_records(ctx, &matched, &rule.lookups, recurse);
                    return Some(());
                }
            }
            None
        }
        ContextLookup::Format3 { coverages, lookups } => {
            let first = coverages.first()?;
            first.get(glyph)?;
            let matched = match_input(ctx, MatchFunc::Coverages(&coverages[1..]))?;
            apply_lookup_records(ctx, &matched, lookups, recurse);
            Some(())
        }
    }
}

pub(crate) fn apply_chain_context(
    ctx: &mut ApplyContext,
    lookup: &ChainContextLookup,
    recurse: RecurseFunc,
) -> Option<()> {
    let glyph = ctx.cur_glyph();

    match lookup {
        ChainContextLookup::Format1 { coverage, rule_sets } => {
            let index = coverage.get(glyph)?;
            let rules = rule_sets.get(usize::from(index))?;
            for rule in rules {
                let matched = match match_input(ctx, MatchFunc::Glyphs(&rule.input)) {
                    Some(m) => m,
                    None => continue,
                };
                if !match_backtrack(ctx, MatchFunc::Glyphs(&rule.backtrack)) {
                    continue;
                }
                if !match_lookahead(ctx, MatchFunc::Glyphs(&rule.lookahead), matched.end) {
                    continue;
                }
                apply_lookup_records(ctx, &matched, &rule.lookups, recurse);
                return Some(());
            }
            None
        }
        ChainContextLookup::Format2 {
            coverage,
            backtrack_classes,
            input_classes,
            lookahead_classes,
            rule_sets,
        } => {
            coverage.get(glyph)?;
            let class = input_classes.get(glyph);
            let rules = rule_sets.get(usize::from(class))?;
            for rule in rules {
                let matched =
                    match match_input(ctx, MatchFunc::Classes(input_classes, &rule.input)) {
                        Some(m) => m,
                        None => continue,
                    };
                if !match_backtrack(ctx, MatchFunc::Classes(backtrack_classes, &rule.backtrack)) {
                    continue;
                }
                if !match_lookahead(
                    ctx,
                    MatchFunc::Classes(lookahead_classes, &rule.lookahead),
                    matched.end,
                ) {
                    continue;
                }
                apply_lookup_records(ctx, &matched, &rule.lookups, recurse);
                return Some(());
            }
            None
        }
        ChainContextLookup::Format3 {
            backtrack_coverages,
            input_coverages,
            lookahead_coverages,
            lookups,
        } => {
            let first = input_coverages.first()?;
            first.get(glyph)?;

            let matched = match_input(ctx, MatchFunc::Coverages(&input_coverages[1..]))?;
            if !match_backtrack(ctx, MatchFunc::Coverages(backtrack_coverages)) {
                return None;
            }
            if !match_lookahead(
                ctx,
                MatchFunc::Coverages(lookahead_coverages),
                matched.end,
            ) {
                return None;
            }
            apply_lookup_records(ctx, &matched, lookups, recurse);
            Some(())
        }
    }
}

/// Fires the rule's nested lookups in record order.
///
/// Record sequence indices count matched input elements, resolved
/// through the same skip view the matcher used. A nested lookup may
/// grow or shrink the buffer; later positions shift along so the
/// remaining records land where the rule meant them to.
pub(crate) fn apply_lookup_records(
    ctx: &mut ApplyContext,
    matched: &MatchedInput,
    records: &[LookupRecord],
    recurse: RecurseFunc,
) {
    let match_length = matched.end - ctx.buffer.idx;

    // Rebase matched positions onto the output side, where they stay
    // stable while nested lookups consume input.
    let backtrack = ctx.buffer.backtrack_len() as i64;
    let delta = backtrack - ctx.buffer.idx as i64;
    let mut positions = matched.positions;
    for p in positions[..matched.count].iter_mut() {
        *p = (*p as i64 + delta) as usize;
    }
    let mut end = (backtrack + match_length as i64) as usize;

    for record in records {
        let seq = usize::from(record.sequence_index);
        if seq >= matched.count {
            continue;
        }

        if ctx.buffer.max_ops <= 0 {
            break;
        }
        ctx.buffer.max_ops -= 1;

        let orig_len = ctx.buffer.backtrack_len() + ctx.buffer.lookahead_len();
        ctx.buffer.move_to(positions[seq]);
        ctx.invalidate_skip_cache();

        if recurse(ctx, record.lookup_index).is_none() {
            continue;
        }

        let new_len = ctx.buffer.backtrack_len() + ctx.buffer.lookahead_len();
        let growth = new_len as i64 - orig_len as i64;
        if growth == 0 {
            continue;
        }

        let seq_pos = positions[seq] as i64;
        end = ((end as i64 + growth).max(seq_pos)) as usize;
        for p in positions[seq + 1..matched.count].iter_mut() {
            *p = ((*p as i64 + growth).max(seq_pos)) as usize;
        }
    }

    ctx.buffer.move_to(end);
    ctx.invalidate_skip_cache();
}
