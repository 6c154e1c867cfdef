//! Typed GDEF data: glyph classes, mark-attachment classes and mark
//! glyph sets.

use ttf_parser::GlyphId;

use super::gsubgpos::{ClassDef, Coverage};

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum GlyphClass {
    Base = 1,
    Ligature = 2,
    Mark = 3,
    Component = 4,
}

#[derive(Clone, Debug, Default)]
pub struct GdefTable {
    pub glyph_classes: ClassDef,
    pub mark_attach_classes: ClassDef,
    /// Mark-filtering sets are plain glyph sets, not class defs; they
    /// resolve through the coverage path.
    pub mark_glyph_sets: Vec<Coverage>,
}

impl GdefTable {
    pub fn glyph_class(&self, glyph: GlyphId) -> Option<GlyphClass> {
        match self.glyph_classes.get(glyph) {
            1 => Some(GlyphClass::Base),
            2 => Some(GlyphClass::Ligature),
            3 => Some(GlyphClass::Mark),
            4 => Some(GlyphClass::Component),
            _ => None,
        }
    }

    #[inline]
    pub fn is_mark_glyph(&self, glyph: GlyphId) -> bool {
        self.glyph_class(glyph) == Some(GlyphClass::Mark)
    }

    #[inline]
    pub fn mark_attach_class(&self, glyph: GlyphId) -> u16 {
        self.mark_attach_classes.get(glyph)
    }

    pub fn mark_set_covers(&self, set_index: u16, glyph: GlyphId) -> bool {
        self.mark_glyph_sets
            .get(usize::from(set_index))
            .map_or(false, |set| set.contains(glyph))
    }
}
