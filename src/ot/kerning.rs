//! Legacy `kern`-table kerning, applied when GPOS has no `kern`
//! lookups to offer.

use ttf_parser::GlyphId;

use crate::buffer::Buffer;
use crate::face::Face;
use crate::plan::ShapePlan;
use crate::tables::gdef::GlyphClass;

pub(crate) fn apply_fallback_kerning(plan: &ShapePlan, face: &Face, buffer: &mut Buffer) {
    if !plan.requested_kerning || !buffer.direction.is_horizontal() {
        return;
    }

    let kern = match face.kern.as_ref() {
        Some(k) => k,
        None => return,
    };

    for subtable in &kern.subtables {
        if !subtable.horizontal || subtable.has_cross_stream {
            continue;
        }

        apply_subtable(plan, face, buffer, subtable);
    }
}

fn apply_subtable(
    plan: &ShapePlan,
    face: &Face,
    buffer: &mut Buffer,
    subtable: &crate::tables::kern::KernSubtable,
) {
    let kern_mask = plan.kern_mask;
    let len = buffer.len();

    let mut i = 0;
    while i < len {
        if kern_mask != 0 && buffer.info[i].mask & kern_mask == 0 {
            i += 1;
            continue;
        }

        // Marks are invisible to pair kerning.
        let mut j = i + 1;
        while j < len && is_mark(face, buffer.info[j].as_glyph()) {
            j += 1;
        }
        if j >= len {
            break;
        }

        let left = buffer.info[i].as_glyph();
        let right = buffer.info[j].as_glyph();
        if let Some(value) = subtable.glyphs_kerning(left, right) {
            if value != 0 {
                // The whole adjustment lands on the first glyph of the
                // pair.
                buffer.pos[i].x_advance += i32::from(value);
                buffer.unsafe_to_break(i, j + 1);
            }
        }

        i = j;
    }
}

fn is_mark(face: &Face, glyph: GlyphId) -> bool {
    face.glyph_class(glyph) == Some(GlyphClass::Mark)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::UnicodeBuffer;
    use crate::common::Direction;
    use crate::plan::ShapePlan;
    use crate::tables::kern::{KernFormat, KernPair, KernSubtable, KernTable};

    fn kern_face() -> Face {
        Face::builder()
            .cmap(vec![('A' as u32, 1), ('V' as u32, 2)])
            .advances(vec![0, 600, 580])
            .kern(KernTable {
                subtables: vec![KernSubtable {
                    horizontal: true,
                    has_cross_stream: false,
                    format: KernFormat::Format0(vec![KernPair {
                        left: 1,
                        right: 2,
                        value: -110,
                    }]),
                }],
            })
            .build()
    }

    #[test]
    fn av_pair_tightens_first_advance() {
        let face = kern_face();
        let plan = ShapePlan::new(&face, Direction::LeftToRight, None, None, &[]);

        let mut b = UnicodeBuffer::new();
        b.push_str("AV");
        let mut buffer = b.0;
        buffer.direction = Direction::LeftToRight;
        for (i, info) in buffer.info.iter_mut().enumerate() {
            info.glyph_id = (i + 1) as u16;
        }
        buffer.sync_positions();
        buffer.pos[0].x_advance = 600;
        buffer.pos[1].x_advance = 580;

        apply_fallback_kerning(&plan, &face, &mut buffer);
        assert_eq!(buffer.pos[0].x_advance, 490);
        assert_eq!(buffer.pos[1].x_advance, 580);
        assert!(buffer.info[0].unsafe_to_break());
    }
}
