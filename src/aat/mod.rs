//! The AAT `morx` engine. When a font has no GSUB, each metamorphosis
//! chain's subtables run in order, driving per-subtable state machines
//! over the glyph stream.

use std::convert::TryFrom;

use smallvec::SmallVec;
use ttf_parser::GlyphId;

use crate::buffer::Buffer;
use crate::face::Face;
use crate::tables::morx::{
    class, contextual_flags, insertion_flags, ligature_action, ligature_flags, rearrangement,
    state, ContextualSubtable, InsertionSubtable, LigatureSubtable, MorxTable, StateTable,
    Subtable, SubtableKind, DELETED_GLYPH_ID, NO_SUBSTITUTION,
};

/// Replaces the whole GSUB pass.
pub(crate) fn apply_morx(face: &Face, buffer: &mut Buffer) {
    let morx = match face.morx.as_ref() {
        Some(m) => m,
        None => return,
    };

    apply_table(morx, buffer);
    remove_deleted_glyphs(buffer);
}

fn apply_table(morx: &MorxTable, buffer: &mut Buffer) {
    for chain in &morx.chains {
        let flags = chain.default_flags;

        for subtable in &chain.subtables {
            if subtable.sub_feature_flags & flags == 0 {
                continue;
            }

            if !applies_to_direction(subtable, buffer) {
                continue;
            }

            // Glyph-order subtables run against the stream as the
            // direction laid it out; logical-order ones ignore it.
            let reverse = if subtable.is_logical() {
                subtable.is_backwards()
            } else {
                subtable.is_backwards() != buffer.direction.is_backward()
            };

            if reverse {
                buffer.reverse();
            }

            apply_subtable(subtable, buffer);

            if reverse {
                buffer.reverse();
            }
        }
    }
}

fn applies_to_direction(subtable: &Subtable, buffer: &Buffer) -> bool {
    subtable.is_all_directions() || subtable.is_vertical() == buffer.direction.is_vertical()
}

fn apply_subtable(subtable: &Subtable, buffer: &mut Buffer) {
    match &subtable.kind {
        SubtableKind::Rearrangement(machine) => apply_rearrangement(machine, buffer),
        SubtableKind::Contextual(table) => apply_contextual(table, buffer),
        SubtableKind::Ligature(table) => apply_ligature(table, buffer),
        SubtableKind::NonContextual(lookup) => {
            for info in &mut buffer.info {
                if let Some(replacement) = lookup.get(info.as_glyph()) {
                    info.glyph_id = replacement;
                    info.flags |= crate::buffer::glyph_flag::SUBSTITUTED;
                }
            }
        }
        SubtableKind::Insertion(table) => apply_insertion(table, buffer),
    }
}

/// Shared machine stepping: feeds glyph classes, hands each entry to
/// `process`, and advances unless the entry says not to. A work cap
/// bounds don't-advance loops from malformed fonts.
fn drive<P, F>(machine: &StateTable<P>, buffer: &mut Buffer, dont_advance_flag: u16, mut process: F)
where
    P: Copy,
    F: FnMut(&mut Buffer, usize, &crate::tables::morx::StateEntry<P>),
{
    let mut state_ = state::START_OF_TEXT;
    let mut i = 0;
    let mut budget = (buffer.len() as i32 + 8) * 8;

    loop {
        let class_ = if i < buffer.len() {
            machine.class(buffer.info[i].as_glyph())
        } else {
            class::END_OF_TEXT
        };

        let entry = match machine.entry(state_, class_) {
            Some(e) => *e,
            None => break,
        };

        process(buffer, i, &entry);

        state_ = entry.new_state;

        budget -= 1;
        if entry.flags & dont_advance_flag == 0 || budget <= 0 {
            if i >= buffer.len() {
                break;
            }
            i += 1;
        }

        if i > buffer.len() {
            break;
        }
    }
}

fn apply_rearrangement(machine: &StateTable<()>, buffer: &mut Buffer) {
    let mut start = 0usize;
    let mut end = 0usize;

    drive(machine, buffer, rearrangement::DONT_ADVANCE, |buffer, i, entry| {
        let flags = entry.flags;

        if flags & rearrangement::MARK_FIRST != 0 {
            start = i;
        }
        if flags & rearrangement::MARK_LAST != 0 {
            end = (i + 1).min(buffer.len());
        }

        let verb = flags & rearrangement::VERB_MASK;
        if verb != 0 && start < end {
            rearrange(buffer, verb, start, end);
        }
    });
}

/// The sixteen rearrangement verbs, encoded as (left count, right
/// count, reverse flags) like the reference engines do: left glyphs
/// move to the end of the span, right glyphs to the front.
fn rearrange(buffer: &mut Buffer, verb: u16, start: usize, end: usize) {
    const MAP: [u8; 16] = [
        0x00, 0x10, 0x01, 0x11, 0x20, 0x30, 0x02, 0x03, 0x12, 0x13, 0x21, 0x31, 0x22, 0x32,
        0x23, 0x33,
    ];

    let m = MAP[usize::from(verb & 0x0F)];
    let l = usize::from((m >> 4) & 0x0F).min(2).min(end - start);
    let r = usize::from(m & 0x0F).min(2).min(end - start);
    let reverse_l = (m >> 4) == 3;
    let reverse_r = (m & 0x0F) == 3;

    if l + r > end - start {
        return;
    }

    buffer.merge_clusters(start, end);

    let mut span: Vec<_> = buffer.info[start..end].to_vec();
    let left: Vec<_> = span[..l].to_vec();
    let right: Vec<_> = span[span.len() - r..].to_vec();
    let middle: Vec<_> = span[l..span.len() - r].to_vec();

    span.clear();
    if reverse_r {
        span.extend(right.iter().rev().copied());
    } else {
        span.extend(right.iter().copied());
    }
    span.extend(middle);
    if reverse_l {
        span.extend(left.iter().rev().copied());
    } else {
        span.extend(left.iter().copied());
    }

    buffer.info[start..end].copy_from_slice(&span);
}

fn apply_contextual(table: &ContextualSubtable, buffer: &mut Buffer) {
    let mut marked: Option<usize> = None;

    drive(
        &table.machine,
        buffer,
        contextual_flags::DONT_ADVANCE,
        |buffer, i, entry| {
            // Substitute at the marked position first, then at the
            // current one.
            if entry.payload.mark_index != NO_SUBSTITUTION {
                if let Some(mark) = marked {
                    if mark < buffer.len() {
                        substitute_from_lookup(
                            table,
                            buffer,
                            mark,
                            entry.payload.mark_index,
                        );
                    }
                }
            }

            if entry.payload.current_index != NO_SUBSTITUTION && i < buffer.len() {
                substitute_from_lookup(table, buffer, i, entry.payload.current_index);
            }

            if entry.flags & contextual_flags::SET_MARK != 0 {
                marked = Some(i);
            }
        },
    );
}

fn substitute_from_lookup(
    table: &ContextualSubtable,
    buffer: &mut Buffer,
    pos: usize,
    lookup_index: u16,
) {
    if let Some(lookup) = table.lookups.get(usize::from(lookup_index)) {
        if let Some(replacement) = lookup.get(buffer.info[pos].as_glyph()) {
            buffer.info[pos].glyph_id = replacement;
            buffer.info[pos].flags |= crate::buffer::glyph_flag::SUBSTITUTED;
        }
    }
}

fn apply_ligature(table: &LigatureSubtable, buffer: &mut Buffer) {
    // Component stack; depth can never exceed the input length.
    let mut stack: SmallVec<[usize; 16]> = SmallVec::new();
    let input_len = buffer.len();

    drive(
        &table.machine,
        buffer,
        ligature_flags::DONT_ADVANCE,
        |buffer, i, entry| {
            if entry.flags & ligature_flags::SET_COMPONENT != 0 && i < buffer.len() {
                if stack.len() >= input_len {
                    stack.clear();
                }
                stack.push(i);
            }

            if entry.flags & ligature_flags::PERFORM_ACTION != 0 {
                perform_ligature_actions(table, buffer, &mut stack, entry.payload.action_index);
            }
        },
    );
}

fn perform_ligature_actions(
    table: &LigatureSubtable,
    buffer: &mut Buffer,
    stack: &mut SmallVec<[usize; 16]>,
    action_start: u16,
) {
    let mut lig_index = 0usize;
    let mut action_idx = usize::from(action_start);
    let mut popped: SmallVec<[usize; 16]> = SmallVec::new();

    loop {
        let action = match table.actions.get(action_idx) {
            Some(a) => *a,
            None => return,
        };
        action_idx += 1;

        let pos = match stack.pop() {
            Some(p) => p,
            None => return,
        };
        popped.push(pos);

        // The 30-bit offset is signed.
        let mut offset = (action & ligature_action::OFFSET_MASK) as i32;
        if offset & 0x2000_0000 != 0 {
            offset -= 0x4000_0000;
        }

        let glyph = buffer.info[pos].glyph_id;
        let component_idx = i64::from(glyph) + i64::from(offset);
        let component = match usize::try_from(component_idx)
            .ok()
            .and_then(|idx| table.components.get(idx))
        {
            Some(c) => usize::from(*c),
            None => return,
        };
        lig_index += component;

        if action & (ligature_action::STORE | ligature_action::LAST) != 0 {
            let lig = match table.ligatures.get(lig_index) {
                Some(l) => *l,
                None => return,
            };

            // The last popped position is the first component in
            // stream order: it receives the ligature, the rest die.
            let first = match popped.last() {
                Some(&p) => p,
                None => return,
            };
            let min_cluster = popped
                .iter()
                .map(|&p| buffer.info[p].cluster)
                .min()
                .unwrap_or(buffer.info[first].cluster);

            buffer.info[first].glyph_id = lig.0;
            buffer.info[first].cluster = min_cluster;
            buffer.info[first].flags |= crate::buffer::glyph_flag::SUBSTITUTED;
            for &p in popped.iter().filter(|&&p| p != first) {
                buffer.info[p].glyph_id = DELETED_GLYPH_ID;
            }

            // The ligature itself becomes a component for chained
            // actions.
            stack.push(first);
            popped.clear();
            lig_index = 0;
        }

        if action & ligature_action::LAST != 0 {
            return;
        }
    }
}

fn apply_insertion(table: &InsertionSubtable, buffer: &mut Buffer) {
    let mut marked: Option<usize> = None;

    // Insertions splice the vector, so positions after the splice
    // shift; the driver's index is kept in step by inserting through
    // this closure-local state.
    let mut pending: Vec<(usize, Vec<GlyphId>)> = Vec::new();

    drive(
        &table.machine,
        buffer,
        insertion_flags::DONT_ADVANCE,
        |buffer, i, entry| {
            let flags = entry.flags;

            if entry.payload.marked_insert_index != NO_SUBSTITUTION {
                if let Some(mark) = marked {
                    let count = usize::from(flags & insertion_flags::MARKED_INSERT_COUNT);
                    let before = flags & insertion_flags::MARKED_INSERT_BEFORE != 0;
                    let glyphs =
                        insertion_glyphs(table, entry.payload.marked_insert_index, count);
                    let at = if before { mark } else { (mark + 1).min(buffer.len()) };
                    pending.push((at, glyphs));
                }
            }

            if entry.payload.current_insert_index != NO_SUBSTITUTION && i < buffer.len() {
                let count =
                    usize::from((flags & insertion_flags::CURRENT_INSERT_COUNT) >> 5);
                let before = flags & insertion_flags::CURRENT_INSERT_BEFORE != 0;
                let glyphs = insertion_glyphs(table, entry.payload.current_insert_index, count);
                let at = if before { i } else { (i + 1).min(buffer.len()) };
                pending.push((at, glyphs));
            }

            if flags & insertion_flags::SET_MARK != 0 {
                marked = Some(i);
            }
        },
    );

    // Apply insertions back to front so recorded positions stay valid.
    pending.sort_by(|a, b| b.0.cmp(&a.0));
    for (at, glyphs) in pending {
        insert_glyphs(buffer, at, &glyphs);
    }
}

fn insertion_glyphs(table: &InsertionSubtable, start: u16, count: usize) -> Vec<GlyphId> {
    let start = usize::from(start);
    table
        .glyphs
        .get(start..start + count)
        .map(|s| s.to_vec())
        .unwrap_or_default()
}

fn insert_glyphs(buffer: &mut Buffer, at: usize, glyphs: &[GlyphId]) {
    if glyphs.is_empty() {
        return;
    }

    // Inserted glyphs take the cluster of their anchor neighbor and
    // carry no codepoint.
    let template = if at < buffer.len() {
        buffer.info[at]
    } else if at > 0 {
        buffer.info[at - 1]
    } else {
        return;
    };

    let mut new_infos = Vec::with_capacity(glyphs.len());
    for &glyph in glyphs {
        let mut info = template;
        info.glyph_id = glyph.0;
        info.codepoint = 0;
        new_infos.push(info);
    }

    buffer.info.splice(at..at, new_infos);
}

/// Drops entries the machines marked with the deleted-glyph id,
/// folding their clusters into a neighbor.
fn remove_deleted_glyphs(buffer: &mut Buffer) {
    buffer.info.retain(|info| info.glyph_id != DELETED_GLYPH_ID);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::UnicodeBuffer;
    use crate::tables::morx::*;

    fn run(buffer_text: &str, glyphs: &[u16], morx: MorxTable) -> Vec<u16> {
        let face = Face::builder()
            .cmap(
                buffer_text
                    .chars()
                    .zip(glyphs.iter())
                    .map(|(c, &g)| (c as u32, g)),
            )
            .morx(morx)
            .build();

        let mut b = UnicodeBuffer::new();
        b.push_str(buffer_text);
        let mut buffer = b.0;
        for (info, &g) in buffer.info.iter_mut().zip(glyphs.iter()) {
            info.glyph_id = g;
        }

        apply_morx(&face, &mut buffer);
        buffer.info.iter().map(|i| i.glyph_id).collect()
    }

    fn single_chain(kind: SubtableKind) -> MorxTable {
        MorxTable {
            chains: vec![Chain {
                default_flags: 1,
                features: vec![],
                subtables: vec![Subtable {
                    coverage: 0x2000_0000, // all directions
                    sub_feature_flags: 1,
                    kind,
                }],
            }],
        }
    }

    #[test]
    fn noncontextual_replaces_glyphs() {
        let morx = single_chain(SubtableKind::NonContextual(AatLookup::Format6(vec![(
            5, 50,
        )])));
        assert_eq!(run("ab", &[5, 6], morx), vec![50, 6]);
    }

    #[test]
    fn disabled_feature_flags_skip_subtables() {
        let mut morx = single_chain(SubtableKind::NonContextual(AatLookup::Format6(vec![(
            5, 50,
        )])));
        morx.chains[0].subtables[0].sub_feature_flags = 2; // not in default flags
        assert_eq!(run("ab", &[5, 6], morx), vec![5, 6]);
    }

    #[test]
    fn ligature_machine_forms_ligature() {
        // Classes: glyph 10 -> class 4, glyph 11 -> class 5.
        // State 0/1: on class 4 go to state 2 pushing component;
        // state 2: on class 5 push and fire the action.
        let class_table = AatLookup::Format6(vec![(10, 4), (11, 5)]);
        let entries = vec![
            StateEntry { new_state: 0, flags: 0, payload: LigaturePayload { action_index: 0 } },
            StateEntry {
                new_state: 2,
                flags: ligature_flags::SET_COMPONENT,
                payload: LigaturePayload { action_index: 0 },
            },
            StateEntry {
                new_state: 0,
                flags: ligature_flags::SET_COMPONENT | ligature_flags::PERFORM_ACTION,
                payload: LigaturePayload { action_index: 0 },
            },
        ];
        // 3 states x 6 classes.
        let state_array = vec![
            0, 0, 0, 0, 1, 0, // start of text
            0, 0, 0, 0, 1, 0, // start of line
            0, 0, 0, 0, 1, 2, // seen first component
        ];
        let machine = StateTable::new_capped(6, class_table, state_array, entries);

        // Action stream: pop second (offset -11 + glyph 11 = 0 ->
        // component 0), then pop first, LAST, store.
        let table = LigatureSubtable {
            machine,
            actions: vec![
                0x0000_0000u32.wrapping_sub(11) & ligature_action::OFFSET_MASK,
                (ligature_action::LAST | ligature_action::STORE)
                    | (0x0000_0000u32.wrapping_sub(10) & ligature_action::OFFSET_MASK),
            ],
            components: vec![0, 0],
            ligatures: vec![GlyphId(99)],
        };

        let morx = single_chain(SubtableKind::Ligature(table));
        assert_eq!(run("fi", &[10, 11], morx), vec![99]);
    }

    #[test]
    fn contextual_substitutes_marked_position() {
        // Seeing glyph 31 rewrites the previously marked glyph 30.
        let class_table = AatLookup::Format6(vec![(30, 4), (31, 5)]);
        let entries = vec![
            StateEntry {
                new_state: 0,
                flags: 0,
                payload: ContextualPayload {
                    mark_index: NO_SUBSTITUTION,
                    current_index: NO_SUBSTITUTION,
                },
            },
            StateEntry {
                new_state: 2,
                flags: contextual_flags::SET_MARK,
                payload: ContextualPayload {
                    mark_index: NO_SUBSTITUTION,
                    current_index: NO_SUBSTITUTION,
                },
            },
            StateEntry {
                new_state: 0,
                flags: 0,
                payload: ContextualPayload {
                    mark_index: 0,
                    current_index: NO_SUBSTITUTION,
                },
            },
        ];
        let state_array = vec![
            0, 0, 0, 0, 1, 0, //
            0, 0, 0, 0, 1, 0, //
            0, 0, 0, 0, 1, 2, //
        ];
        let machine = StateTable::new_capped(6, class_table, state_array, entries);

        let table = ContextualSubtable {
            machine,
            lookups: vec![AatLookup::Format6(vec![(30, 60)])],
        };

        let morx = single_chain(SubtableKind::Contextual(table));
        assert_eq!(run("ab", &[30, 31], morx), vec![60, 31]);
    }

    #[test]
    fn insertion_adds_glyphs_after_current() {
        let class_table = AatLookup::Format6(vec![(40, 4)]);
        let entries = vec![
            StateEntry {
                new_state: 0,
                flags: 0,
                payload: InsertionPayload {
                    current_insert_index: NO_SUBSTITUTION,
                    marked_insert_index: NO_SUBSTITUTION,
                },
            },
            StateEntry {
                new_state: 0,
                // Two glyphs, inserted after the current position.
                flags: 2 << 5,
                payload: InsertionPayload {
                    current_insert_index: 0,
                    marked_insert_index: NO_SUBSTITUTION,
                },
            },
        ];
        let state_array = vec![
            0, 0, 0, 0, 1, //
            0, 0, 0, 0, 1, //
        ];
        let machine = StateTable::new(5, class_table, state_array, entries);

        let table = InsertionSubtable {
            machine,
            glyphs: vec![GlyphId(70), GlyphId(71)],
        };

        let morx = single_chain(SubtableKind::Insertion(table));
        assert_eq!(run("a", &[40], morx), vec![40, 70, 71]);
    }

    #[test]
    fn rearrangement_swaps_span() {
        // Verb 1: Ax => xA. Glyph 20 marks first and starts the span;
        // glyph 21 marks last and fires the verb.
        let class_table = AatLookup::Format6(vec![(20, 4), (21, 5)]);
        let entries = vec![
            StateEntry { new_state: 0, flags: 0, payload: () },
            StateEntry { new_state: 2, flags: rearrangement::MARK_FIRST, payload: () },
            StateEntry {
                new_state: 0,
                flags: rearrangement::MARK_LAST | 1,
                payload: (),
            },
        ];
        let state_array = vec![
            0, 0, 0, 0, 1, 0, //
            0, 0, 0, 0, 1, 0, //
            0, 0, 0, 0, 1, 2, //
        ];
        let machine = StateTable::new(6, class_table, state_array, entries);

        let morx = single_chain(SubtableKind::Rearrangement(machine));
        assert_eq!(run("ab", &[20, 21], morx), vec![21, 20]);
    }
}
