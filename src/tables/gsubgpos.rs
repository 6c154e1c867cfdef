//! Types shared by the GSUB and GPOS tables.
//!
//! Everything here is the owned, typed form of the binary layout
//! tables; the binary parser lives outside this crate and hands a
//! `Face` the finished values. `Coverage` and `ClassDef` keep the
//! spec's two storage formats and add hash acceleration on top.

use rustc_hash::FxHashMap;
use ttf_parser::GlyphId;

use crate::common::Tag;
use crate::set_digest::SetDigest;

/// Coverage arrays at least this long get a hash index.
const COVERAGE_HASH_THRESHOLD: usize = 16;

/// Class definitions spanning more glyphs than this stay on the
/// binary-search path; smaller ones trade memory for O(1) lookup.
const CLASS_DEF_HASH_LIMIT: u32 = 10_000;

#[derive(Clone, Copy, PartialEq, Debug)]
pub struct RangeRecord {
    pub start: u16,
    pub end: u16,
    pub start_coverage_index: u16,
}

/// A set of glyph ids with an ordinal per member.
#[derive(Clone, Debug)]
pub enum Coverage {
    /// Format 1: a sorted glyph array, optionally hash-indexed.
    Glyphs {
        glyphs: Vec<GlyphId>,
        map: Option<FxHashMap<u16, u16>>,
    },
    /// Format 2: sorted, non-overlapping ranges with running ordinals.
    Ranges(Vec<RangeRecord>),
}

impl Coverage {
    pub fn from_glyphs(mut glyphs: Vec<GlyphId>) -> Self {
        glyphs.sort_unstable();
        glyphs.dedup();

        let map = if glyphs.len() >= COVERAGE_HASH_THRESHOLD {
            Some(
                glyphs
                    .iter()
                    .enumerate()
                    .map(|(i, g)| (g.0, i as u16))
                    .collect(),
            )
        } else {
            None
        };

        Coverage::Glyphs { glyphs, map }
    }

    /// Builds a format-2 coverage from inclusive glyph ranges.
    /// Ranges must be sorted and non-overlapping.
    pub fn from_ranges(ranges: Vec<(GlyphId, GlyphId)>) -> Self {
        let mut records = Vec::with_capacity(ranges.len());
        let mut ordinal = 0u16;
        for (start, end) in ranges {
            records.push(RangeRecord {
                start: start.0,
                end: end.0,
                start_coverage_index: ordinal,
            });
            ordinal = ordinal.saturating_add(end.0 - start.0 + 1);
        }

        Coverage::Ranges(records)
    }

    /// Returns the ordinal assigned to `glyph`.
    pub fn get(&self, glyph: GlyphId) -> Option<u16> {
        match self {
            Coverage::Glyphs { glyphs, map } => {
                if let Some(map) = map {
                    map.get(&glyph.0).copied()
                } else {
                    glyphs.binary_search(&glyph).ok().map(|i| i as u16)
                }
            }
            Coverage::Ranges(records) => {
                let i = records
                    .binary_search_by(|r| {
                        if r.end < glyph.0 {
                            core::cmp::Ordering::Less
                        } else if r.start > glyph.0 {
                            core::cmp::Ordering::Greater
                        } else {
                            core::cmp::Ordering::Equal
                        }
                    })
                    .ok()?;

                let record = &records[i];
                Some(record.start_coverage_index + (glyph.0 - record.start))
            }
        }
    }

    #[inline]
    pub fn contains(&self, glyph: GlyphId) -> bool {
        self.get(glyph).is_some()
    }

    pub fn len(&self) -> usize {
        match self {
            Coverage::Glyphs { glyphs, .. } => glyphs.len(),
            Coverage::Ranges(records) => records
                .iter()
                .map(|r| usize::from(r.end - r.start) + 1)
                .sum(),
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            Coverage::Glyphs { glyphs, .. } => glyphs.is_empty(),
            Coverage::Ranges(records) => records.is_empty(),
        }
    }

    /// Iterates members in ordinal order.
    pub fn iter<'a>(&'a self) -> Box<dyn Iterator<Item = GlyphId> + 'a> {
        match self {
            Coverage::Glyphs { glyphs, .. } => Box::new(glyphs.iter().copied()),
            Coverage::Ranges(records) => Box::new(
                records
                    .iter()
                    .flat_map(|r| (r.start..=r.end).map(GlyphId)),
            ),
        }
    }

    pub fn collect_digest(&self, digest: &mut SetDigest) {
        match self {
            Coverage::Glyphs { glyphs, .. } => {
                for &g in glyphs {
                    digest.add(g);
                }
            }
            Coverage::Ranges(records) => {
                for r in records {
                    digest.add_range(GlyphId(r.start), GlyphId(r.end));
                }
            }
        }
    }
}

#[derive(Clone, Copy, PartialEq, Debug)]
pub struct ClassRangeRecord {
    pub start: u16,
    pub end: u16,
    pub class: u16,
}

/// Maps glyph ids to classes. Class 0 means "not assigned".
#[derive(Clone, Debug)]
pub enum ClassDef {
    Format1 {
        first: GlyphId,
        classes: Vec<u16>,
    },
    Format2 {
        ranges: Vec<ClassRangeRecord>,
        map: Option<FxHashMap<u16, u16>>,
    },
    Empty,
}

impl ClassDef {
    pub fn from_array(first: GlyphId, classes: Vec<u16>) -> Self {
        ClassDef::Format1 { first, classes }
    }

    /// Ranges must be sorted and non-overlapping. Small tables are
    /// additionally materialized into a hash map.
    pub fn from_ranges(ranges: Vec<ClassRangeRecord>) -> Self {
        let span = match (ranges.first(), ranges.last()) {
            (Some(first), Some(last)) => u32::from(last.end) - u32::from(first.start) + 1,
            _ => 0,
        };

        let glyph_count: u32 = ranges
            .iter()
            .map(|r| u32::from(r.end - r.start) + 1)
            .sum();

        let map = if span > 0 && glyph_count < CLASS_DEF_HASH_LIMIT {
            let mut map = FxHashMap::default();
            for r in &ranges {
                for g in r.start..=r.end {
                    map.insert(g, r.class);
                }
            }
            Some(map)
        } else {
            None
        };

        ClassDef::Format2 { ranges, map }
    }

    /// Returns the glyph's class; unassigned glyphs get class 0.
    pub fn get(&self, glyph: GlyphId) -> u16 {
        match self {
            ClassDef::Format1 { first, classes } => {
                if glyph.0 < first.0 {
                    return 0;
                }
                classes
                    .get(usize::from(glyph.0 - first.0))
                    .copied()
                    .unwrap_or(0)
            }
            ClassDef::Format2 { ranges, map } => {
                if let Some(map) = map {
                    return map.get(&glyph.0).copied().unwrap_or(0);
                }

                ranges
                    .binary_search_by(|r| {
                        if r.end < glyph.0 {
                            core::cmp::Ordering::Less
                        } else if r.start > glyph.0 {
                            core::cmp::Ordering::Greater
                        } else {
                            core::cmp::Ordering::Equal
                        }
                    })
                    .map(|i| ranges[i].class)
                    .unwrap_or(0)
            }
            ClassDef::Empty => 0,
        }
    }
}

impl Default for ClassDef {
    fn default() -> Self {
        ClassDef::Empty
    }
}

bitflags::bitflags! {
    /// The lookup flag word shared by all GSUB/GPOS lookups.
    pub struct LookupFlags: u16 {
        const RIGHT_TO_LEFT          = 0x0001;
        const IGNORE_BASE_GLYPHS     = 0x0002;
        const IGNORE_LIGATURES       = 0x0004;
        const IGNORE_MARKS           = 0x0008;
        const IGNORE_FLAGS           = 0x000E;
        const USE_MARK_FILTERING_SET = 0x0010;
        const MARK_ATTACHMENT_TYPE   = 0xFF00;
    }
}

impl LookupFlags {
    #[inline]
    pub fn mark_attachment_type(self) -> u16 {
        (self.bits & Self::MARK_ATTACHMENT_TYPE.bits) >> 8
    }
}

/// A list of subtables sharing one flag word.
///
/// Extension lookups are unwrapped before construction, so `T` never
/// contains an extension variant; the digest summarizes the first-glyph
/// coverages of every subtable.
#[derive(Clone, Debug)]
pub struct Lookup<T> {
    pub flags: LookupFlags,
    pub mark_filtering_set: Option<u16>,
    pub digest: SetDigest,
    pub subtables: Vec<T>,
}

impl<T: LayoutSubtable> Lookup<T> {
    pub fn new(flags: LookupFlags, mark_filtering_set: Option<u16>, subtables: Vec<T>) -> Self {
        let mut digest = SetDigest::default();
        for subtable in &subtables {
            subtable.collect_digest(&mut digest);
        }

        Lookup {
            flags,
            mark_filtering_set,
            digest,
            subtables,
        }
    }
}

/// Implemented by GSUB/GPOS subtable unions so lookups can build their
/// set digests without knowing the concrete table.
pub trait LayoutSubtable {
    /// Adds every glyph the subtable could possibly trigger on.
    fn collect_digest(&self, digest: &mut SetDigest);
}

/// A language system: the features active for one script/language pair.
#[derive(Clone, Debug)]
pub struct LangSys {
    pub tag: Tag,
    pub required_feature: Option<u16>,
    pub feature_indices: Vec<u16>,
}

#[derive(Clone, Debug)]
pub struct ScriptRecord {
    pub tag: Tag,
    pub default_lang_sys: Option<LangSys>,
    /// Sorted by tag.
    pub lang_sys: Vec<LangSys>,
}

impl ScriptRecord {
    pub fn lang_sys_by_tag(&self, tag: Tag) -> Option<&LangSys> {
        self.lang_sys
            .binary_search_by(|ls| ls.tag.cmp(&tag))
            .ok()
            .map(|i| &self.lang_sys[i])
    }
}

#[derive(Clone, Debug)]
pub struct FeatureRecord {
    pub tag: Tag,
    pub lookup_indices: Vec<u16>,
}

/// The common shell of GSUB and GPOS: script list, feature list,
/// lookup list.
#[derive(Clone, Debug, Default)]
pub struct LayoutTable<T> {
    /// Sorted by tag.
    pub scripts: Vec<ScriptRecord>,
    pub features: Vec<FeatureRecord>,
    pub lookups: Vec<Lookup<T>>,
}

impl<T> LayoutTable<T> {
    pub fn script_by_tag(&self, tag: Tag) -> Option<&ScriptRecord> {
        self.scripts
            .binary_search_by(|s| s.tag.cmp(&tag))
            .ok()
            .map(|i| &self.scripts[i])
    }

    pub fn feature_at(&self, index: u16) -> Option<&FeatureRecord> {
        self.features.get(usize::from(index))
    }
}

/// A device table: per-ppem hinting deltas, or a variation index.
#[derive(Clone, Debug)]
pub enum Device {
    /// Unpacked hinting deltas, one per pixel size in
    /// `start_size..=end_size`.
    Hinting {
        start_size: u16,
        end_size: u16,
        deltas: Vec<i8>,
    },
    /// Resolving a variation index needs an item variation store, which
    /// the positioning engine does not carry; the delta stays zero.
    Variation { outer: u16, inner: u16 },
}

impl Device {
    pub fn get_delta(&self, ppem: u16) -> i32 {
        match self {
            Device::Hinting {
                start_size,
                end_size,
                deltas,
            } => {
                if ppem == 0 || ppem < *start_size || ppem > *end_size {
                    return 0;
                }
                deltas
                    .get(usize::from(ppem - start_size))
                    .map(|d| i32::from(*d))
                    .unwrap_or(0)
            }
            Device::Variation { .. } => 0,
        }
    }
}

/// An attachment point on a glyph.
#[derive(Clone, Debug, Default)]
pub struct Anchor {
    pub x: i16,
    pub y: i16,
    pub x_device: Option<Device>,
    pub y_device: Option<Device>,
}

impl Anchor {
    pub fn new(x: i16, y: i16) -> Self {
        Anchor {
            x,
            y,
            x_device: None,
            y_device: None,
        }
    }

    pub fn get(&self, ppem: u16) -> (i32, i32) {
        let mut x = i32::from(self.x);
        let mut y = i32::from(self.y);
        if let Some(dev) = &self.x_device {
            x += dev.get_delta(ppem);
        }
        if let Some(dev) = &self.y_device {
            y += dev.get_delta(ppem);
        }
        (x, y)
    }
}

/// A GPOS value record. Absent fields are zero.
#[derive(Clone, Debug, Default)]
pub struct ValueRecord {
    pub x_placement: i16,
    pub y_placement: i16,
    pub x_advance: i16,
    pub y_advance: i16,
    pub x_placement_device: Option<Device>,
    pub y_placement_device: Option<Device>,
    pub x_advance_device: Option<Device>,
    pub y_advance_device: Option<Device>,
}

impl ValueRecord {
    pub fn advance(x_advance: i16) -> Self {
        ValueRecord {
            x_advance,
            ..ValueRecord::default()
        }
    }

    pub fn placement(x_placement: i16, y_placement: i16) -> Self {
        ValueRecord {
            x_placement,
            y_placement,
            ..ValueRecord::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.x_placement == 0
            && self.y_placement == 0
            && self.x_advance == 0
            && self.y_advance == 0
            && self.x_placement_device.is_none()
            && self.y_placement_device.is_none()
            && self.x_advance_device.is_none()
            && self.y_advance_device.is_none()
    }
}

/// A nested-lookup record inside context/chain-context rules. The
/// sequence index counts matched input positions, not buffer positions.
#[derive(Clone, Copy, Debug)]
pub struct LookupRecord {
    pub sequence_index: u16,
    pub lookup_index: u16,
}

#[derive(Clone, Debug)]
pub struct SequenceRule {
    /// Input glyphs after the first (covered) one.
    pub input: Vec<GlyphId>,
    pub lookups: Vec<LookupRecord>,
}

#[derive(Clone, Debug)]
pub struct ClassRule {
    /// Input classes after the first one.
    pub input: Vec<u16>,
    pub lookups: Vec<LookupRecord>,
}

/// GSUB/GPOS lookup type 5/7: contextual rules in three formats.
#[derive(Clone, Debug)]
pub enum ContextLookup {
    Format1 {
        coverage: Coverage,
        rule_sets: Vec<Vec<SequenceRule>>,
    },
    Format2 {
        coverage: Coverage,
        classes: ClassDef,
        rule_sets: Vec<Vec<ClassRule>>,
    },
    Format3 {
        coverages: Vec<Coverage>,
        lookups: Vec<LookupRecord>,
    },
}

impl ContextLookup {
    pub fn coverage(&self) -> Option<&Coverage> {
        match self {
            ContextLookup::Format1 { coverage, .. } => Some(coverage),
            ContextLookup::Format2 { coverage, .. } => Some(coverage),
            ContextLookup::Format3 { coverages, .. } => coverages.first(),
        }
    }
}

impl LayoutSubtable for ContextLookup {
    fn collect_digest(&self, digest: &mut SetDigest) {
        if let Some(coverage) = self.coverage() {
            coverage.collect_digest(digest);
        }
    }
}

#[derive(Clone, Debug)]
pub struct ChainRule {
    /// In matching order: closest-first away from the input.
    pub backtrack: Vec<GlyphId>,
    /// Input glyphs after the first (covered) one.
    pub input: Vec<GlyphId>,
    pub lookahead: Vec<GlyphId>,
    pub lookups: Vec<LookupRecord>,
}

#[derive(Clone, Debug)]
pub struct ChainClassRule {
    pub backtrack: Vec<u16>,
    pub input: Vec<u16>,
    pub lookahead: Vec<u16>,
    pub lookups: Vec<LookupRecord>,
}

/// GSUB/GPOS lookup type 6/8: chaining contextual rules.
#[derive(Clone, Debug)]
pub enum ChainContextLookup {
    Format1 {
        coverage: Coverage,
        rule_sets: Vec<Vec<ChainRule>>,
    },
    Format2 {
        coverage: Coverage,
        backtrack_classes: ClassDef,
        input_classes: ClassDef,
        lookahead_classes: ClassDef,
        rule_sets: Vec<Vec<ChainClassRule>>,
    },
    Format3 {
        backtrack_coverages: Vec<Coverage>,
        input_coverages: Vec<Coverage>,
        lookahead_coverages: Vec<Coverage>,
        lookups: Vec<LookupRecord>,
    },
}

impl ChainContextLookup {
    pub fn coverage(&self) -> Option<&Coverage> {
        match self {
            ChainContextLookup::Format1 { coverage, .. } => Some(coverage),
            ChainContextLookup::Format2 { coverage, .. } => Some(coverage),
            ChainContextLookup::Format3 {
                input_coverages, ..
            } => input_coverages.first(),
        }
    }
}

impl LayoutSubtable for ChainContextLookup {
    fn collect_digest(&self, digest: &mut SetDigest) {
        if let Some(coverage) = self.coverage() {
            coverage.collect_digest(digest);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn coverage_ordinals_are_stable() {
        let cov = Coverage::from_glyphs(vec![GlyphId(7), GlyphId(3), GlyphId(12)]);
        assert_eq!(cov.get(GlyphId(3)), Some(0));
        assert_eq!(cov.get(GlyphId(7)), Some(1));
        assert_eq!(cov.get(GlyphId(12)), Some(2));
        assert_eq!(cov.get(GlyphId(4)), None);

        let members: Vec<_> = cov.iter().collect();
        for (i, g) in members.iter().enumerate() {
            assert_eq!(cov.get(*g), Some(i as u16));
        }
    }

    #[test]
    fn coverage_hash_path_matches_binary_search() {
        let glyphs: Vec<_> = (0..100).map(|i| GlyphId(i * 3)).collect();
        let hashed = Coverage::from_glyphs(glyphs.clone());
        assert!(matches!(hashed, Coverage::Glyphs { map: Some(_), .. }));

        for (i, g) in glyphs.iter().enumerate() {
            assert_eq!(hashed.get(*g), Some(i as u16));
        }
        assert_eq!(hashed.get(GlyphId(1)), None);
    }

    #[test]
    fn coverage_ranges() {
        let cov = Coverage::from_ranges(vec![
            (GlyphId(10), GlyphId(12)),
            (GlyphId(20), GlyphId(20)),
        ]);
        assert_eq!(cov.get(GlyphId(10)), Some(0));
        assert_eq!(cov.get(GlyphId(11)), Some(1));
        assert_eq!(cov.get(GlyphId(12)), Some(2));
        assert_eq!(cov.get(GlyphId(20)), Some(3));
        assert_eq!(cov.get(GlyphId(15)), None);
        assert_eq!(cov.len(), 4);
    }

    #[test]
    fn class_def_defaults_to_zero() {
        let cd = ClassDef::from_ranges(vec![ClassRangeRecord {
            start: 5,
            end: 9,
            class: 2,
        }]);
        assert_eq!(cd.get(GlyphId(7)), 2);
        assert_eq!(cd.get(GlyphId(4)), 0);
        assert_eq!(cd.get(GlyphId(100)), 0);
        assert_eq!(ClassDef::Empty.get(GlyphId(7)), 0);
    }

    #[test]
    fn class_def_array() {
        let cd = ClassDef::from_array(GlyphId(10), vec![1, 0, 3]);
        assert_eq!(cd.get(GlyphId(10)), 1);
        assert_eq!(cd.get(GlyphId(11)), 0);
        assert_eq!(cd.get(GlyphId(12)), 3);
        assert_eq!(cd.get(GlyphId(9)), 0);
        assert_eq!(cd.get(GlyphId(13)), 0);
    }

    #[test]
    fn mark_attachment_type_extraction() {
        let flags = LookupFlags::from_bits_truncate(0x0300 | 0x0008);
        assert_eq!(flags.mark_attachment_type(), 3);
        assert!(flags.contains(LookupFlags::IGNORE_MARKS));
    }

    #[test]
    fn device_deltas() {
        let dev = Device::Hinting {
            start_size: 9,
            end_size: 12,
            deltas: vec![1, 0, -1, 2],
        };
        assert_eq!(dev.get_delta(9), 1);
        assert_eq!(dev.get_delta(11), -1);
        assert_eq!(dev.get_delta(8), 0);
        assert_eq!(dev.get_delta(13), 0);

        let var = Device::Variation { outer: 0, inner: 0 };
        assert_eq!(var.get_delta(12), 0);
    }
}
