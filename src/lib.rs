/*!
`textshape` is a complex-text shaping engine: given a sequence of
Unicode scalar values, a parsed font, a script/language/direction and a
feature set, it produces positioned glyphs.

It implements the OpenType GSUB/GPOS pipeline with nested lookups and
mark attachment, falls back to the AAT `morx` state machines when a
font has no GSUB, runs complex-script shapers for Arabic-family
scripts, Indic scripts, Myanmar, Khmer, Hangul, Thai/Lao and Hebrew,
and accelerates lookup dispatch with set digests and coverage hashing.

The binary font parser is out of scope: a [`Face`] is assembled from
tables already parsed into the typed model under [`tables`], which is
also what makes synthetic test fonts cheap to build.

```
use textshape::{shape, Face, UnicodeBuffer};

let face = Face::builder()
    .cmap(vec![('a' as u32, 1)])
    .advances(vec![0, 500])
    .build();

let mut buffer = UnicodeBuffer::new();
buffer.push_str("a");

let output = shape(&face, &[], buffer);
assert_eq!(output.len(), 1);
assert_eq!(output.glyph_infos()[0].glyph_id, 1);
assert_eq!(output.glyph_positions()[0].x_advance, 500);
```

Shaping never fails: malformed input degrades to `.notdef` glyphs,
dotted circles and unchanged runs, never to an error or a panic.
*/

#![allow(clippy::collapsible_if)]

mod aat;
mod buffer;
mod common;
mod complex;
mod face;
mod normalize;
mod ot;
mod plan;
mod set_digest;
mod shape;
mod tables;
mod unicode;

pub use buffer::{
    BufferClusterLevel, BufferFlags, GlyphBuffer, GlyphInfo, GlyphPosition, UnicodeBuffer,
};
pub use common::{script, Direction, Feature, Language, Mask, Script, Tag};
pub use face::{Face, FaceBuilder};
pub use set_digest::SetDigest;

pub use ttf_parser::GlyphId;

// The typed table model is public so faces can be assembled by
// external parsers (and by tests).
pub mod table {
    pub use crate::tables::gdef::{GdefTable, GlyphClass};
    pub use crate::tables::gpos::{
        CursivePos, EntryExit, MarkBasePos, MarkLigPos, MarkMarkPos, MarkRecord, PairPos,
        PairValueRecord, PosSubtable, PosTable, SinglePos,
    };
    pub use crate::tables::gsub::{
        AlternateSubst, Ligature, LigatureSubst, MultipleSubst, ReverseChainSingleSubst,
        SingleSubst, SubstSubtable, SubstTable,
    };
    pub use crate::tables::gsubgpos::{
        Anchor, ChainClassRule, ChainContextLookup, ChainRule, ClassDef, ClassRangeRecord,
        ClassRule, ContextLookup, Coverage, Device, FeatureRecord, LangSys, LayoutTable, Lookup,
        LookupFlags, LookupRecord, RangeRecord, ScriptRecord, SequenceRule, ValueRecord,
    };
    pub use crate::tables::kern::{
        KernClassTable, KernFormat, KernPair, KernSubtable, KernTable,
    };
    pub use crate::tables::morx::{
        class as morx_class, contextual_flags, insertion_flags, ligature_action, ligature_flags,
        rearrangement, AatLookup, Chain, ContextualPayload, ContextualSubtable, FeatureEntry,
        InsertionPayload, InsertionSubtable, LigaturePayload, LigatureSubtable, LookupSegment,
        LookupSegment4, MorxTable, StateEntry, StateTable, Subtable, SubtableKind,
    };
}

/// Shapes `buffer` with `face`, consuming it and returning the glyphs
/// in visual order.
///
/// `features` are user requests on top of the shaping plan's defaults;
/// a value of zero disables a feature, anything else enables it.
pub fn shape(face: &Face, features: &[Feature], mut buffer: UnicodeBuffer) -> GlyphBuffer {
    shape::shape_impl(face, features, &mut buffer.0);
    GlyphBuffer(buffer.0)
}
