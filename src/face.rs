//! The font collaborator.
//!
//! A `Face` owns tables already parsed into the typed model under
//! `crate::tables`; the binary parser lives outside this crate. All
//! accessors are read-only, so a `Face` can be shared across threads
//! and reused by any number of shape calls.

use core::sync::atomic::{AtomicU64, Ordering};

use rustc_hash::FxHashMap;
use ttf_parser::GlyphId;

use crate::tables::gdef::{GdefTable, GlyphClass};
use crate::tables::gpos::PosTable;
use crate::tables::gsub::SubstTable;
use crate::tables::kern::KernTable;
use crate::tables::morx::MorxTable;

static FACE_ID: AtomicU64 = AtomicU64::new(1);

pub struct Face {
    /// Distinguishes faces in the shape-plan cache.
    pub(crate) id: u64,

    pub units_per_em: u16,
    /// Pixels per em, when the caller rasterizes at a fixed size.
    /// Device-table deltas resolve against it; zero disables them.
    pub ppem: u16,

    cmap: FxHashMap<u32, u16>,
    advances: Vec<u16>,
    default_advance: u16,

    pub gdef: Option<GdefTable>,
    pub gsub: Option<SubstTable>,
    pub gpos: Option<PosTable>,
    pub kern: Option<KernTable>,
    pub morx: Option<MorxTable>,
}

impl Face {
    pub fn builder() -> FaceBuilder {
        FaceBuilder::default()
    }

    /// Maps a scalar to its glyph. Unmapped codepoints land on glyph 0
    /// (`.notdef`) at the caller's discretion via `unwrap_or_default`.
    #[inline]
    pub fn glyph_index(&self, c: u32) -> Option<GlyphId> {
        self.cmap.get(&c).map(|&g| GlyphId(g))
    }

    /// Variation-selector cmap lookups are not modeled; the base
    /// mapping answers for all selectors.
    #[inline]
    pub fn glyph_variation_index(&self, c: u32, _variation: u32) -> Option<GlyphId> {
        self.glyph_index(c)
    }

    #[inline]
    pub fn glyph_h_advance(&self, glyph: GlyphId) -> u16 {
        self.advances
            .get(usize::from(glyph.0))
            .copied()
            .unwrap_or(self.default_advance)
    }

    /// Vertical advance defaults to the em size when the font carries
    /// no vertical metrics.
    #[inline]
    pub fn glyph_v_advance(&self, _glyph: GlyphId) -> u16 {
        self.units_per_em
    }

    #[inline]
    pub fn glyph_class(&self, glyph: GlyphId) -> Option<GlyphClass> {
        self.gdef.as_ref().and_then(|gdef| gdef.glyph_class(glyph))
    }

    #[inline]
    pub fn mark_attach_class(&self, glyph: GlyphId) -> u16 {
        self.gdef
            .as_ref()
            .map_or(0, |gdef| gdef.mark_attach_class(glyph))
    }

    #[inline]
    pub fn mark_set_covers(&self, set_index: u16, glyph: GlyphId) -> bool {
        self.gdef
            .as_ref()
            .map_or(false, |gdef| gdef.mark_set_covers(set_index, glyph))
    }

    pub fn has_gsub(&self) -> bool {
        self.gsub.as_ref().map_or(false, |t| !t.lookups.is_empty())
    }

    pub fn has_gpos(&self) -> bool {
        self.gpos.as_ref().map_or(false, |t| !t.lookups.is_empty())
    }

    pub fn has_morx(&self) -> bool {
        self.morx.as_ref().map_or(false, |t| !t.chains.is_empty())
    }

    pub fn has_kern(&self) -> bool {
        self.kern.as_ref().map_or(false, |t| !t.subtables.is_empty())
    }
}

/// Assembles a `Face` from parsed tables.
#[derive(Default)]
pub struct FaceBuilder {
    units_per_em: Option<u16>,
    ppem: u16,
    cmap: FxHashMap<u32, u16>,
    advances: Vec<u16>,
    default_advance: Option<u16>,
    gdef: Option<GdefTable>,
    gsub: Option<SubstTable>,
    gpos: Option<PosTable>,
    kern: Option<KernTable>,
    morx: Option<MorxTable>,
}

impl FaceBuilder {
    pub fn units_per_em(mut self, upem: u16) -> Self {
        self.units_per_em = Some(upem);
        self
    }

    pub fn ppem(mut self, ppem: u16) -> Self {
        self.ppem = ppem;
        self
    }

    pub fn cmap(mut self, entries: impl IntoIterator<Item = (u32, u16)>) -> Self {
        self.cmap.extend(entries);
        self
    }

    /// Advance widths indexed by glyph id.
    pub fn advances(mut self, advances: Vec<u16>) -> Self {
        self.advances = advances;
        self
    }

    /// Advance for glyphs past the end of the advance array.
    pub fn default_advance(mut self, advance: u16) -> Self {
        self.default_advance = Some(advance);
        self
    }

    pub fn gdef(mut self, gdef: GdefTable) -> Self {
        self.gdef = Some(gdef);
        self
    }

    pub fn gsub(mut self, gsub: SubstTable) -> Self {
        self.gsub = Some(gsub);
        self
    }

    pub fn gpos(mut self, gpos: PosTable) -> Self {
        self.gpos = Some(gpos);
        self
    }

    pub fn kern(mut self, kern: KernTable) -> Self {
        self.kern = Some(kern);
        self
    }

    pub fn morx(mut self, morx: MorxTable) -> Self {
        self.morx = Some(morx);
        self
    }

    pub fn build(self) -> Face {
        let default_advance = self
            .default_advance
            .unwrap_or_else(|| self.advances.last().copied().unwrap_or(0));
        Face {
            id: FACE_ID.fetch_add(1, Ordering::Relaxed),
            units_per_em: self.units_per_em.unwrap_or(1000),
            ppem: self.ppem,
            cmap: self.cmap,
            default_advance,
            advances: self.advances,
            gdef: self.gdef,
            gsub: self.gsub,
            gpos: self.gpos,
            kern: self.kern,
            morx: self.morx,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unmapped_codepoints_have_no_glyph() {
        let face = Face::builder()
            .cmap(vec![('a' as u32, 4)])
            .advances(vec![500, 510, 520, 530, 540])
            .build();

        assert_eq!(face.glyph_index('a' as u32), Some(GlyphId(4)));
        assert_eq!(face.glyph_index('b' as u32), None);
        assert_eq!(face.glyph_h_advance(GlyphId(4)), 540);
    }

    #[test]
    fn face_ids_are_unique() {
        let a = Face::builder().build();
        let b = Face::builder().build();
        assert_ne!(a.id, b.id);
    }
}
