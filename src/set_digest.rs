//! An approximate glyph-set membership filter.
//!
//! Three 32-bit masks probe different slices of the glyph id. A `false`
//! answer is definite; a `true` answer means the set may contain the
//! glyph. Lookups use it to reject whole subtable lists in O(1) before
//! touching any coverage table.

use ttf_parser::GlyphId;

const SHIFTS: [u32; 3] = [0, 4, 9];

/// Ranges wider than this saturate the corresponding mask instead of
/// being added bit by bit.
const RANGE_LIMIT: u32 = 1024;

#[derive(Clone, Copy, Default, Debug)]
pub struct SetDigest {
    masks: [u32; 3],
}

impl SetDigest {
    #[inline]
    pub fn add(&mut self, glyph: GlyphId) {
        let g = u32::from(glyph.0);
        for (mask, shift) in self.masks.iter_mut().zip(&SHIFTS) {
            *mask |= 1 << ((g >> shift) & 31);
        }
    }

    pub fn add_range(&mut self, first: GlyphId, last: GlyphId) {
        let (first, last) = (u32::from(first.0), u32::from(last.0));
        if last.saturating_sub(first) >= RANGE_LIMIT {
            self.masks = [u32::MAX; 3];
            return;
        }

        for (mask, shift) in self.masks.iter_mut().zip(&SHIFTS) {
            if (last >> shift) - (first >> shift) >= 31 {
                *mask = u32::MAX;
            } else {
                for g in (first >> shift)..=(last >> shift) {
                    *mask |= 1 << (g & 31);
                }
            }
        }
    }

    pub fn extend(&mut self, other: &SetDigest) {
        for (mask, other) in self.masks.iter_mut().zip(&other.masks) {
            *mask |= other;
        }
    }

    #[inline]
    pub fn may_contain(&self, glyph: GlyphId) -> bool {
        let g = u32::from(glyph.0);
        self.masks
            .iter()
            .zip(&SHIFTS)
            .all(|(mask, shift)| mask & (1 << ((g >> shift) & 31)) != 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn never_rejects_members() {
        let mut digest = SetDigest::default();
        let members = [1u16, 17, 500, 5000, 65535];
        for &g in &members {
            digest.add(GlyphId(g));
        }

        for &g in &members {
            assert!(digest.may_contain(GlyphId(g)));
        }
    }

    #[test]
    fn rejects_most_non_members() {
        let mut digest = SetDigest::default();
        digest.add(GlyphId(1));

        // Glyph 2 differs in the low probe.
        assert!(!digest.may_contain(GlyphId(2)));
    }

    #[test]
    fn range_members_are_kept() {
        let mut digest = SetDigest::default();
        digest.add_range(GlyphId(100), GlyphId(200));
        for g in 100..=200 {
            assert!(digest.may_contain(GlyphId(g)));
        }
    }

    #[test]
    fn huge_range_saturates() {
        let mut digest = SetDigest::default();
        digest.add_range(GlyphId(0), GlyphId(30000));
        assert!(digest.may_contain(GlyphId(12345)));
    }
}
