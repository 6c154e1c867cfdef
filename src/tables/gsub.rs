//! Typed GSUB subtables.
//!
//! One variant per (lookup type, format) pair. Extension (type 8) is
//! unwrapped when a lookup is built, so it has no variant here.

use ttf_parser::GlyphId;

use super::gsubgpos::{
    ChainContextLookup, ContextLookup, Coverage, LayoutSubtable, LayoutTable,
};
use crate::set_digest::SetDigest;

pub type SubstTable = LayoutTable<SubstSubtable>;

#[derive(Clone, Debug)]
pub enum SubstSubtable {
    Single(SingleSubst),
    Multiple(MultipleSubst),
    Alternate(AlternateSubst),
    Ligature(LigatureSubst),
    Context(ContextLookup),
    ChainContext(ChainContextLookup),
    ReverseChainSingle(ReverseChainSingleSubst),
}

impl SubstSubtable {
    pub fn coverage(&self) -> Option<&Coverage> {
        match self {
            SubstSubtable::Single(SingleSubst::Format1 { coverage, .. }) => Some(coverage),
            SubstSubtable::Single(SingleSubst::Format2 { coverage, .. }) => Some(coverage),
            SubstSubtable::Multiple(t) => Some(&t.coverage),
            SubstSubtable::Alternate(t) => Some(&t.coverage),
            SubstSubtable::Ligature(t) => Some(&t.coverage),
            SubstSubtable::Context(t) => t.coverage(),
            SubstSubtable::ChainContext(t) => t.coverage(),
            SubstSubtable::ReverseChainSingle(t) => Some(&t.coverage),
        }
    }

    /// Reverse-chaining lookups walk the buffer back to front and are
    /// dispatched outside the forward per-position loop.
    pub fn is_reverse(&self) -> bool {
        matches!(self, SubstSubtable::ReverseChainSingle(_))
    }
}

impl LayoutSubtable for SubstSubtable {
    fn collect_digest(&self, digest: &mut SetDigest) {
        if let Some(coverage) = self.coverage() {
            coverage.collect_digest(digest);
        }
    }
}

/// Lookup type 1.
#[derive(Clone, Debug)]
pub enum SingleSubst {
    Format1 { coverage: Coverage, delta: i16 },
    Format2 {
        coverage: Coverage,
        substitutes: Vec<GlyphId>,
    },
}

/// Lookup type 2. `sequences[coverage_index]` replaces one glyph.
#[derive(Clone, Debug)]
pub struct MultipleSubst {
    pub coverage: Coverage,
    pub sequences: Vec<Vec<GlyphId>>,
}

/// Lookup type 3. The engine always picks alternate 0.
#[derive(Clone, Debug)]
pub struct AlternateSubst {
    pub coverage: Coverage,
    pub alternates: Vec<Vec<GlyphId>>,
}

#[derive(Clone, Debug)]
pub struct Ligature {
    pub glyph: GlyphId,
    /// Component glyphs after the first (covered) one.
    pub components: Vec<GlyphId>,
}

/// Lookup type 4. Within a set, the first ligature whose components
/// match wins, so longer ligatures must come first.
#[derive(Clone, Debug)]
pub struct LigatureSubst {
    pub coverage: Coverage,
    pub ligature_sets: Vec<Vec<Ligature>>,
}

/// Lookup type 8 (reverse chaining single).
#[derive(Clone, Debug)]
pub struct ReverseChainSingleSubst {
    pub coverage: Coverage,
    pub backtrack_coverages: Vec<Coverage>,
    pub lookahead_coverages: Vec<Coverage>,
    pub substitutes: Vec<GlyphId>,
}
