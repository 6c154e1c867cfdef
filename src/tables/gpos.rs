//! Typed GPOS subtables.
//!
//! One variant per (lookup type, format) pair; extension (type 9) is
//! unwrapped at lookup construction. Anchor matrices are stored fully
//! indexed: `[base][class]`, `[ligature][component][class]` and
//! `[mark2][class]`, with `None` for null anchor offsets.

use ttf_parser::GlyphId;

use super::gsubgpos::{
    Anchor, ChainContextLookup, ContextLookup, Coverage, LayoutSubtable, LayoutTable,
    ValueRecord,
};
use crate::set_digest::SetDigest;

pub type PosTable = LayoutTable<PosSubtable>;

#[derive(Clone, Debug)]
pub enum PosSubtable {
    Single(SinglePos),
    Pair(PairPos),
    Cursive(CursivePos),
    MarkToBase(MarkBasePos),
    MarkToLigature(MarkLigPos),
    MarkToMark(MarkMarkPos),
    Context(ContextLookup),
    ChainContext(ChainContextLookup),
}

impl PosSubtable {
    /// The coverage of the glyph a subtable triggers on.
    pub fn coverage(&self) -> Option<&Coverage> {
        match self {
            PosSubtable::Single(SinglePos::Format1 { coverage, .. }) => Some(coverage),
            PosSubtable::Single(SinglePos::Format2 { coverage, .. }) => Some(coverage),
            PosSubtable::Pair(PairPos::Format1 { coverage, .. }) => Some(coverage),
            PosSubtable::Pair(PairPos::Format2 { coverage, .. }) => Some(coverage),
            PosSubtable::Cursive(t) => Some(&t.coverage),
            PosSubtable::MarkToBase(t) => Some(&t.mark_coverage),
            PosSubtable::MarkToLigature(t) => Some(&t.mark_coverage),
            PosSubtable::MarkToMark(t) => Some(&t.mark1_coverage),
            PosSubtable::Context(t) => t.coverage(),
            PosSubtable::ChainContext(t) => t.coverage(),
        }
    }
}

impl LayoutSubtable for PosSubtable {
    fn collect_digest(&self, digest: &mut SetDigest) {
        if let Some(coverage) = self.coverage() {
            coverage.collect_digest(digest);
        }
    }
}

/// Lookup type 1.
#[derive(Clone, Debug)]
pub enum SinglePos {
    Format1 {
        coverage: Coverage,
        value: ValueRecord,
    },
    Format2 {
        coverage: Coverage,
        values: Vec<ValueRecord>,
    },
}

/// One entry of a format-1 pair set, keyed by the second glyph.
#[derive(Clone, Debug)]
pub struct PairValueRecord {
    pub second: GlyphId,
    pub value1: ValueRecord,
    pub value2: ValueRecord,
}

/// Lookup type 2.
#[derive(Clone, Debug)]
pub enum PairPos {
    Format1 {
        coverage: Coverage,
        /// Indexed by the first glyph's coverage ordinal; each set is
        /// sorted by second glyph for binary search.
        sets: Vec<Vec<PairValueRecord>>,
    },
    Format2 {
        coverage: Coverage,
        classes1: super::gsubgpos::ClassDef,
        classes2: super::gsubgpos::ClassDef,
        class2_count: u16,
        /// Row-major `[class1][class2]`.
        matrix: Vec<(ValueRecord, ValueRecord)>,
    },
}

#[derive(Clone, Debug, Default)]
pub struct EntryExit {
    pub entry: Option<Anchor>,
    pub exit: Option<Anchor>,
}

/// Lookup type 3.
#[derive(Clone, Debug)]
pub struct CursivePos {
    pub coverage: Coverage,
    /// Indexed by coverage ordinal.
    pub entry_exits: Vec<EntryExit>,
}

#[derive(Clone, Debug)]
pub struct MarkRecord {
    pub class: u16,
    pub anchor: Anchor,
}

/// Lookup type 4.
#[derive(Clone, Debug)]
pub struct MarkBasePos {
    pub mark_coverage: Coverage,
    pub base_coverage: Coverage,
    pub marks: Vec<MarkRecord>,
    /// `[base coverage ordinal][mark class]`.
    pub base_anchors: Vec<Vec<Option<Anchor>>>,
}

/// Lookup type 5.
#[derive(Clone, Debug)]
pub struct MarkLigPos {
    pub mark_coverage: Coverage,
    pub ligature_coverage: Coverage,
    pub marks: Vec<MarkRecord>,
    /// `[ligature coverage ordinal][component][mark class]`.
    pub ligature_anchors: Vec<Vec<Vec<Option<Anchor>>>>,
}

/// Lookup type 6.
#[derive(Clone, Debug)]
pub struct MarkMarkPos {
    pub mark1_coverage: Coverage,
    pub mark2_coverage: Coverage,
    pub marks: Vec<MarkRecord>,
    /// `[mark2 coverage ordinal][mark class]`.
    pub mark2_anchors: Vec<Vec<Option<Anchor>>>,
}
