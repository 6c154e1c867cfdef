//! Sequence matching for ligature and (chain-)context lookups.
//!
//! All routines see the buffer through the skip view: definitely
//! skipped glyphs are invisible, default ignorables match only when a
//! rule names them explicitly, and matched input stays inside one
//! syllable once a syllable serial is set.

use ttf_parser::GlyphId;

use super::apply::{ApplyContext, Skip, MAX_CONTEXT_LENGTH};
use crate::buffer::glyph_flag;
use crate::tables::gsubgpos::{ClassDef, Coverage};

/// One element matcher for the three context-rule formats.
#[derive(Clone, Copy)]
pub(crate) enum MatchFunc<'a> {
    Glyphs(&'a [GlyphId]),
    Classes(&'a ClassDef, &'a [u16]),
    Coverages(&'a [Coverage]),
}

impl MatchFunc<'_> {
    /// Whether element `index` of the sequence matches `glyph`.
    pub fn matches(&self, glyph: GlyphId, index: usize) -> bool {
        match self {
            MatchFunc::Glyphs(glyphs) => glyphs.get(index) == Some(&glyph),
            MatchFunc::Classes(class_def, classes) => {
                classes.get(index).map_or(false, |&c| class_def.get(glyph) == c)
            }
            MatchFunc::Coverages(coverages) => coverages
                .get(index)
                .map_or(false, |coverage| coverage.contains(glyph)),
        }
    }

    pub fn len(&self) -> usize {
        match self {
            MatchFunc::Glyphs(glyphs) => glyphs.len(),
            MatchFunc::Classes(_, classes) => classes.len(),
            MatchFunc::Coverages(coverages) => coverages.len(),
        }
    }
}

pub(crate) struct MatchedInput {
    /// Buffer indices of the matched input elements; `[0]` is the
    /// current position. Only the first `count` entries are valid.
    pub positions: [usize; MAX_CONTEXT_LENGTH],
    pub count: usize,
    /// One past the last matched buffer index.
    pub end: usize,
}

/// Matches `1 + rest.len()` input elements starting at the current
/// position, where element 0 is the already-accepted current glyph.
pub(crate) fn match_input(ctx: &mut ApplyContext, rest: MatchFunc) -> Option<MatchedInput> {
    let count = 1 + rest.len();
    if count > MAX_CONTEXT_LENGTH {
        return None;
    }

    let mut positions = [0usize; MAX_CONTEXT_LENGTH];
    positions[0] = ctx.buffer.idx;

    let syllable = ctx.buffer.info[ctx.buffer.idx].syllable;

    let mut pos = ctx.buffer.idx;
    for i in 1..count {
        let mut candidate = pos + 1;
        loop {
            // The cache jumps over definite skips in O(1).
            candidate = ctx.next_non_skipped(candidate)?;

            let info = ctx.buffer.info[candidate];
            if syllable != 0 && info.syllable != syllable {
                return None;
            }

            if rest.matches(info.as_glyph(), i - 1) {
                break;
            }

            // A default ignorable that the rule does not name stays
            // invisible; anything else is a hard mismatch.
            if ctx.may_skip(&info) == Skip::Maybe {
                candidate += 1;
                continue;
            }

            return None;
        }

        positions[i] = candidate;
        pos = candidate;
    }

    Some(MatchedInput {
        positions,
        count,
        end: pos + 1,
    })
}

/// Matches `backtrack` against the output side, walking backwards from
/// the last written entry.
pub(crate) fn match_backtrack(ctx: &ApplyContext, backtrack: MatchFunc) -> bool {
    let mut pos = ctx.buffer.backtrack_len() as i64 - 1;
    for i in 0..backtrack.len() {
        loop {
            if pos < 0 {
                // Ran out of glyphs: the pre-context picks up.
                return match_context_chars(ctx, 0, backtrack, i);
            }

            let info = ctx.buffer.out_info()[pos as usize];
            pos -= 1;

            match ctx.may_skip(&info) {
                Skip::Yes => continue,
                Skip::No => {
                    if !backtrack.matches(info.as_glyph(), i) {
                        return false;
                    }
                    break;
                }
                Skip::Maybe => {
                    if backtrack.matches(info.as_glyph(), i) {
                        break;
                    }
                    continue;
                }
            }
        }
    }
    true
}

/// Matches `lookahead` on the input side starting at buffer index
/// `start` (one past the matched input).
pub(crate) fn match_lookahead(ctx: &mut ApplyContext, lookahead: MatchFunc, start: usize) -> bool {
    let mut pos = start;
    for i in 0..lookahead.len() {
        loop {
            if pos >= ctx.buffer.info.len() {
                return match_context_chars(ctx, 1, lookahead, i);
            }

            pos = match ctx.next_non_skipped(pos) {
                Some(p) => p,
                None => return match_context_chars(ctx, 1, lookahead, i),
            };

            let info = ctx.buffer.info[pos];
            pos += 1;

            if lookahead.matches(info.as_glyph(), i) {
                break;
            }

            if ctx.may_skip(&info) == Skip::Maybe {
                continue;
            }

            return false;
        }
    }
    true
}

/// Edge rules fall back to the pre/post context codepoints, matched
/// through the cmap.
fn match_context_chars(ctx: &ApplyContext, side: usize, matcher: MatchFunc, from: usize) -> bool {
    let available = ctx.buffer.context_len(side);
    let needed = matcher.len() - from;
    if needed > available {
        return false;
    }

    for (offset, i) in (from..matcher.len()).enumerate() {
        let c = ctx.buffer.context(side, offset);
        let glyph = match ctx.face.glyph_index(c as u32) {
            Some(g) => g,
            None => return false,
        };
        if !matcher.matches(glyph, i) {
            return false;
        }
    }
    true
}

/// Replaces a matched component sequence with a ligature glyph.
///
/// Consumed components vanish; glyphs skipped in between stay, marked
/// as attached to the component they followed so mark-to-ligature can
/// find its anchor later.
pub(crate) fn ligate_input(ctx: &mut ApplyContext, matched: &MatchedInput, lig_glyph: GlyphId) {
    let face = ctx.face;
    let buffer = &mut *ctx.buffer;

    buffer.merge_clusters(matched.positions[0], matched.end);

    // A ligature of marks stays a mark; attaching other marks to it
    // needs no fresh ligature id.
    let is_mark_ligature = {
        let gdef = face.gdef.as_ref();
        matched.positions[..matched.count]
            .iter()
            .all(|&p| gdef.map_or(false, |g| g.is_mark_glyph(buffer.info[p].as_glyph())))
    };

    let lig_id = if is_mark_ligature {
        0
    } else {
        buffer.allocate_lig_id()
    };

    let mut total_components = 0u8;
    for &p in &matched.positions[..matched.count] {
        total_components = total_components.saturating_add(buffer.info[p].lig_num_comps());
    }

    let mut last_num_comps = buffer.info[buffer.idx].lig_num_comps();
    let mut comps_so_far = last_num_comps;

    // First component becomes the ligature glyph.
    {
        let info = &mut buffer.info[buffer.idx];
        info.set_lig_props_for_ligature(lig_id, total_components);
        info.flags |= glyph_flag::LIGATED;
    }
    buffer.replace_glyph(lig_glyph);

    // Walk the rest: skipped glyphs are carried over, renumbered onto
    // the ligature component they sit on; matched components die.
    for i in 1..matched.count {
        let target = matched.positions[i];
        while buffer.idx < target {
            if !is_mark_ligature {
                let this_comp = match buffer.info[buffer.idx].lig_comp() {
                    0 => last_num_comps,
                    c => c,
                };
                let new_comp =
                    comps_so_far - last_num_comps + this_comp.min(last_num_comps);
                buffer.info[buffer.idx].set_lig_props_for_mark(lig_id, new_comp);
            }
            buffer.next_glyph();
        }

        last_num_comps = buffer.info[buffer.idx].lig_num_comps();
        comps_so_far = comps_so_far.saturating_add(last_num_comps);
        buffer.delete_glyph();
    }

    ctx.invalidate_skip_cache();
}
