//! Typed AAT `morx` (extended glyph metamorphosis) data.
//!
//! The engine in `crate::aat` walks each chain's subtables in order,
//! driving the per-subtable state machines. Classes 0..=3 are reserved:
//! end-of-text, out-of-bounds, deleted glyph, end-of-line.

use ttf_parser::GlyphId;

pub mod class {
    pub const END_OF_TEXT: u16 = 0;
    pub const OUT_OF_BOUNDS: u16 = 1;
    pub const DELETED_GLYPH: u16 = 2;
    pub const END_OF_LINE: u16 = 3;
}

pub mod state {
    pub const START_OF_TEXT: u16 = 0;
}

/// The glyph id a deleted-glyph slot carries until the cleanup pass.
pub const DELETED_GLYPH_ID: u16 = 0xFFFF;

/// Contextual and ligature state tables clamp their entry arrays to
/// this many entries. Larger tables lose entries past the cap, which is
/// wrong but load-bearing: the outputs downstream were produced against
/// this behavior.
pub const STATE_ENTRY_CAP: usize = 256;

#[derive(Clone, Debug)]
pub struct MorxTable {
    pub chains: Vec<Chain>,
}

#[derive(Clone, Debug)]
pub struct Chain {
    pub default_flags: u32,
    pub features: Vec<FeatureEntry>,
    pub subtables: Vec<Subtable>,
}

/// Maps an (AAT feature type, setting) pair onto the chain's flag word.
#[derive(Clone, Copy, Debug)]
pub struct FeatureEntry {
    pub feature_type: u16,
    pub feature_setting: u16,
    pub enable_flags: u32,
    pub disable_flags: u32,
}

#[derive(Clone, Debug)]
pub struct Subtable {
    /// The high byte carries orientation flags; the low byte repeats
    /// the subtable format.
    pub coverage: u32,
    /// The chain runs this subtable only when
    /// `chain_flags & sub_feature_flags != 0`.
    pub sub_feature_flags: u32,
    pub kind: SubtableKind,
}

impl Subtable {
    #[inline]
    pub fn is_vertical(&self) -> bool {
        self.coverage & 0x8000_0000 != 0
    }

    #[inline]
    pub fn is_backwards(&self) -> bool {
        self.coverage & 0x4000_0000 != 0
    }

    #[inline]
    pub fn is_all_directions(&self) -> bool {
        self.coverage & 0x2000_0000 != 0
    }

    #[inline]
    pub fn is_logical(&self) -> bool {
        self.coverage & 0x1000_0000 != 0
    }
}

#[derive(Clone, Debug)]
pub enum SubtableKind {
    Rearrangement(StateTable<()>),
    Contextual(ContextualSubtable),
    Ligature(LigatureSubtable),
    NonContextual(AatLookup),
    Insertion(InsertionSubtable),
}

/// An AAT lookup table: glyph id to u16 value, five storage formats.
#[derive(Clone, Debug)]
pub enum AatLookup {
    /// Format 0: dense array indexed by glyph id.
    Format0(Vec<u16>),
    /// Format 2: binary-searchable segments, one value per segment.
    Format2(Vec<LookupSegment>),
    /// Format 4: segments pointing at per-glyph value runs.
    Format4(Vec<LookupSegment4>),
    /// Format 6: sorted single-glyph entries.
    Format6(Vec<(u16, u16)>),
    /// Format 8: trimmed array.
    Format8 { first_glyph: u16, values: Vec<u16> },
}

#[derive(Clone, Copy, Debug)]
pub struct LookupSegment {
    pub first: u16,
    pub last: u16,
    pub value: u16,
}

#[derive(Clone, Debug)]
pub struct LookupSegment4 {
    pub first: u16,
    pub last: u16,
    pub values: Vec<u16>,
}

impl AatLookup {
    pub fn get(&self, glyph: GlyphId) -> Option<u16> {
        let g = glyph.0;
        match self {
            AatLookup::Format0(values) => values.get(usize::from(g)).copied(),
            AatLookup::Format2(segments) => segments
                .binary_search_by(|s| {
                    if s.last < g {
                        core::cmp::Ordering::Less
                    } else if s.first > g {
                        core::cmp::Ordering::Greater
                    } else {
                        core::cmp::Ordering::Equal
                    }
                })
                .ok()
                .map(|i| segments[i].value),
            AatLookup::Format4(segments) => segments
                .iter()
                .find(|s| s.first <= g && g <= s.last)
                .and_then(|s| s.values.get(usize::from(g - s.first)).copied()),
            AatLookup::Format6(entries) => entries
                .binary_search_by(|(glyph, _)| glyph.cmp(&g))
                .ok()
                .map(|i| entries[i].1),
            AatLookup::Format8 { first_glyph, values } => {
                if g < *first_glyph {
                    return None;
                }
                values.get(usize::from(g - first_glyph)).copied()
            }
        }
    }
}

/// An extended state table: glyph class lookup plus a
/// `states x n_classes` matrix of entry indices.
#[derive(Clone, Debug)]
pub struct StateTable<P> {
    pub n_classes: u16,
    pub class_table: AatLookup,
    /// Row-major; row `s` holds the entry indices for state `s`.
    pub state_array: Vec<u16>,
    pub entries: Vec<StateEntry<P>>,
}

#[derive(Clone, Copy, Debug)]
pub struct StateEntry<P> {
    pub new_state: u16,
    pub flags: u16,
    pub payload: P,
}

impl<P> StateTable<P> {
    pub fn new(
        n_classes: u16,
        class_table: AatLookup,
        state_array: Vec<u16>,
        entries: Vec<StateEntry<P>>,
    ) -> Self {
        StateTable {
            n_classes,
            class_table,
            state_array,
            entries,
        }
    }

    /// Like `new`, but clamps the entry array to [`STATE_ENTRY_CAP`].
    /// Used by the contextual and ligature constructors.
    pub fn new_capped(
        n_classes: u16,
        class_table: AatLookup,
        state_array: Vec<u16>,
        mut entries: Vec<StateEntry<P>>,
    ) -> Self {
        entries.truncate(STATE_ENTRY_CAP);
        StateTable::new(n_classes, class_table, state_array, entries)
    }

    pub fn class(&self, glyph: GlyphId) -> u16 {
        if glyph.0 == DELETED_GLYPH_ID {
            return class::DELETED_GLYPH;
        }
        self.class_table
            .get(glyph)
            .unwrap_or(class::OUT_OF_BOUNDS)
    }

    pub fn entry(&self, state: u16, class: u16) -> Option<&StateEntry<P>> {
        let class = if class >= self.n_classes {
            class::OUT_OF_BOUNDS
        } else {
            class
        };

        let index = self
            .state_array
            .get(usize::from(state) * usize::from(self.n_classes) + usize::from(class))?;
        self.entries.get(usize::from(*index))
    }
}

pub mod rearrangement {
    pub const MARK_FIRST: u16 = 0x8000;
    pub const DONT_ADVANCE: u16 = 0x4000;
    pub const MARK_LAST: u16 = 0x2000;
    pub const VERB_MASK: u16 = 0x000F;
}

pub mod contextual_flags {
    pub const SET_MARK: u16 = 0x8000;
    pub const DONT_ADVANCE: u16 = 0x4000;
}

/// Contextual entry payload: lookup indices for the marked and current
/// positions; `0xFFFF` means no substitution.
#[derive(Clone, Copy, Debug)]
pub struct ContextualPayload {
    pub mark_index: u16,
    pub current_index: u16,
}

pub const NO_SUBSTITUTION: u16 = 0xFFFF;

#[derive(Clone, Debug)]
pub struct ContextualSubtable {
    pub machine: StateTable<ContextualPayload>,
    pub lookups: Vec<AatLookup>,
}

pub mod ligature_flags {
    pub const SET_COMPONENT: u16 = 0x8000;
    pub const DONT_ADVANCE: u16 = 0x4000;
    pub const PERFORM_ACTION: u16 = 0x2000;
}

pub mod ligature_action {
    pub const LAST: u32 = 0x8000_0000;
    pub const STORE: u32 = 0x4000_0000;
    pub const OFFSET_MASK: u32 = 0x3FFF_FFFF;
}

/// Ligature entry payload: index of the first action in the action
/// stream.
#[derive(Clone, Copy, Debug)]
pub struct LigaturePayload {
    pub action_index: u16,
}

#[derive(Clone, Debug)]
pub struct LigatureSubtable {
    pub machine: StateTable<LigaturePayload>,
    pub actions: Vec<u32>,
    pub components: Vec<u16>,
    pub ligatures: Vec<GlyphId>,
}

pub mod insertion_flags {
    pub const SET_MARK: u16 = 0x8000;
    pub const DONT_ADVANCE: u16 = 0x4000;
    pub const CURRENT_IS_KASHIDA_LIKE: u16 = 0x2000;
    pub const MARKED_IS_KASHIDA_LIKE: u16 = 0x1000;
    pub const CURRENT_INSERT_BEFORE: u16 = 0x0800;
    pub const MARKED_INSERT_BEFORE: u16 = 0x0400;
    pub const CURRENT_INSERT_COUNT: u16 = 0x03E0;
    pub const MARKED_INSERT_COUNT: u16 = 0x001F;
}

/// Insertion entry payload: start indices into the insertion glyph
/// array; `0xFFFF` means nothing to insert.
#[derive(Clone, Copy, Debug)]
pub struct InsertionPayload {
    pub current_insert_index: u16,
    pub marked_insert_index: u16,
}

#[derive(Clone, Debug)]
pub struct InsertionSubtable {
    pub machine: StateTable<InsertionPayload>,
    pub glyphs: Vec<GlyphId>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_formats_agree() {
        let segments = AatLookup::Format2(vec![
            LookupSegment { first: 5, last: 9, value: 7 },
            LookupSegment { first: 12, last: 12, value: 9 },
        ]);
        assert_eq!(segments.get(GlyphId(7)), Some(7));
        assert_eq!(segments.get(GlyphId(12)), Some(9));
        assert_eq!(segments.get(GlyphId(10)), None);

        let trimmed = AatLookup::Format8 {
            first_glyph: 5,
            values: vec![7, 7, 7, 7, 7],
        };
        assert_eq!(trimmed.get(GlyphId(7)), Some(7));
        assert_eq!(trimmed.get(GlyphId(4)), None);
    }

    #[test]
    fn deleted_glyphs_get_the_reserved_class() {
        let table: StateTable<()> = StateTable::new(
            4,
            AatLookup::Format6(vec![(10, 4)]),
            vec![0, 0, 0, 0],
            vec![StateEntry { new_state: 0, flags: 0, payload: () }],
        );
        assert_eq!(table.class(GlyphId(DELETED_GLYPH_ID)), class::DELETED_GLYPH);
        assert_eq!(table.class(GlyphId(11)), class::OUT_OF_BOUNDS);
    }

    #[test]
    fn entry_cap_is_enforced() {
        let entries: Vec<StateEntry<()>> = (0..300)
            .map(|_| StateEntry { new_state: 0, flags: 0, payload: () })
            .collect();
        let table = StateTable::new_capped(4, AatLookup::Format0(vec![]), vec![], entries);
        assert_eq!(table.entries.len(), STATE_ENTRY_CAP);
    }
}
