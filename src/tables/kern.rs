//! The legacy `kern` table, formats 0 and 2.
//!
//! Only horizontal kerning subtables are modeled; the fallback pass
//! runs them when GPOS has no `kern` feature to offer.

use ttf_parser::GlyphId;

#[derive(Clone, Debug)]
pub struct KernTable {
    pub subtables: Vec<KernSubtable>,
}

#[derive(Clone, Debug)]
pub struct KernSubtable {
    pub horizontal: bool,
    pub has_cross_stream: bool,
    pub format: KernFormat,
}

impl KernSubtable {
    pub fn glyphs_kerning(&self, left: GlyphId, right: GlyphId) -> Option<i16> {
        match &self.format {
            KernFormat::Format0(pairs) => {
                let key = (u32::from(left.0) << 16) | u32::from(right.0);
                pairs
                    .binary_search_by(|p| p.key().cmp(&key))
                    .ok()
                    .map(|i| pairs[i].value)
            }
            KernFormat::Format2 {
                left_classes,
                right_classes,
                row_length,
                values,
            } => {
                // The class values stored in a format-2 table are byte
                // offsets; this engine indexes with `class / 2`, folding
                // both the left and right values independently. That is
                // not what the OpenType spec describes, but it matches
                // the packing the rest of the pipeline was built
                // against, so it stays.
                let row = usize::from(left_classes.get(left) / 2);
                let col = usize::from(right_classes.get(right) / 2);
                let value = *values.get(row * usize::from(*row_length) + col)?;
                if value != 0 {
                    Some(value)
                } else {
                    None
                }
            }
        }
    }
}

#[derive(Clone, Copy, Debug)]
pub struct KernPair {
    pub left: u16,
    pub right: u16,
    pub value: i16,
}

impl KernPair {
    #[inline]
    fn key(&self) -> u32 {
        (u32::from(self.left) << 16) | u32::from(self.right)
    }
}

/// Maps glyphs to raw class values for kern format 2.
#[derive(Clone, Debug)]
pub struct KernClassTable {
    pub first_glyph: u16,
    pub classes: Vec<u16>,
}

impl KernClassTable {
    pub fn get(&self, glyph: GlyphId) -> u16 {
        if glyph.0 < self.first_glyph {
            return 0;
        }
        self.classes
            .get(usize::from(glyph.0 - self.first_glyph))
            .copied()
            .unwrap_or(0)
    }
}

#[derive(Clone, Debug)]
pub enum KernFormat {
    /// Sorted (left, right) pairs.
    Format0(Vec<KernPair>),
    Format2 {
        left_classes: KernClassTable,
        right_classes: KernClassTable,
        /// Number of columns in the value matrix.
        row_length: u16,
        values: Vec<i16>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    fn format0() -> KernSubtable {
        KernSubtable {
            horizontal: true,
            has_cross_stream: false,
            format: KernFormat::Format0(vec![
                KernPair { left: 36, right: 57, value: -80 },
                KernPair { left: 36, right: 58, value: -60 },
                KernPair { left: 55, right: 36, value: -70 },
            ]),
        }
    }

    #[test]
    fn format0_pairs() {
        let sub = format0();
        assert_eq!(sub.glyphs_kerning(GlyphId(36), GlyphId(57)), Some(-80));
        assert_eq!(sub.glyphs_kerning(GlyphId(55), GlyphId(36)), Some(-70));
        assert_eq!(sub.glyphs_kerning(GlyphId(57), GlyphId(36)), None);
    }

    #[test]
    fn format2_class_matrix() {
        let sub = KernSubtable {
            horizontal: true,
            has_cross_stream: false,
            format: KernFormat::Format2 {
                left_classes: KernClassTable {
                    first_glyph: 10,
                    classes: vec![2, 4],
                },
                right_classes: KernClassTable {
                    first_glyph: 20,
                    classes: vec![2],
                },
                row_length: 2,
                // 3 rows x 2 columns.
                values: vec![0, 0, 0, -50, 0, -90],
            },
        };

        // left 10 -> class 2 -> row 1; right 20 -> class 2 -> col 1.
        assert_eq!(sub.glyphs_kerning(GlyphId(10), GlyphId(20)), Some(-50));
        // left 11 -> class 4 -> row 2.
        assert_eq!(sub.glyphs_kerning(GlyphId(11), GlyphId(20)), Some(-90));
        // Unassigned glyphs land in class 0 and a zero cell.
        assert_eq!(sub.glyphs_kerning(GlyphId(9), GlyphId(20)), None);
    }
}
