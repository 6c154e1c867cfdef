//! The feature map: resolves the requested feature set against the
//! font's script/language systems, allocates mask bits, and compiles
//! the per-table stage schedule the engines execute.

use log::debug;
use rustc_hash::FxHashMap;

use crate::common::{script, Language, Mask, Script, Tag};
use crate::face::Face;
use crate::tables::gsubgpos::{FeatureRecord, LangSys, LayoutTable, ScriptRecord};

pub const TABLE_COUNT: usize = 2;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum TableIndex {
    Gsub = 0,
    Gpos = 1,
}

impl TableIndex {
    #[inline]
    pub fn idx(self) -> usize {
        self as usize
    }
}

/// The mask bit every globally-enabled feature shares.
pub const GLOBAL_BIT: u32 = 0;
pub const GLOBAL_MASK: Mask = 1 << GLOBAL_BIT;

bitflags::bitflags! {
    pub struct FeatureFlags: u32 {
        const NONE           = 0x00;
        /// The feature applies to every position; it shares the global
        /// mask bit instead of getting its own.
        const GLOBAL         = 0x01;
        /// A heuristic fallback exists when the font has no lookups
        /// for it.
        const HAS_FALLBACK   = 0x02;
        /// The shaper manages ZWNJ skipping for this feature itself.
        const MANUAL_ZWNJ    = 0x04;
        /// The shaper manages ZWJ skipping for this feature itself.
        const MANUAL_ZWJ     = 0x08;
        const MANUAL_JOINERS = 0x04 | 0x08;
    }
}

/// A pause runs between lookup groups of one table, with the buffer in
/// a consistent state; the complex shapers hang their reordering off
/// these.
pub type PauseFunc = fn(&crate::plan::ShapePlan, &Face, &mut crate::buffer::Buffer);

struct FeatureInfo {
    tag: Tag,
    // Ordering seed so equal tags resolve deterministically.
    seq: usize,
    max_value: u32,
    flags: FeatureFlags,
    default_value: u32,
    stage: [usize; TABLE_COUNT],
}

struct StageInfo {
    index: usize,
    pause_func: Option<PauseFunc>,
}

/// Collects features and pauses, then compiles a [`Map`].
pub struct MapBuilder<'a> {
    face: &'a Face,
    script: Option<Script>,
    language: Option<Language>,
    current_stage: [usize; TABLE_COUNT],
    feature_infos: Vec<FeatureInfo>,
    stages: [Vec<StageInfo>; TABLE_COUNT],
}

impl<'a> MapBuilder<'a> {
    pub fn new(face: &'a Face, script: Option<Script>, language: Option<Language>) -> Self {
        MapBuilder {
            face,
            script,
            language,
            current_stage: [0; TABLE_COUNT],
            feature_infos: Vec::new(),
            stages: [Vec::new(), Vec::new()],
        }
    }

    #[inline]
    pub fn script(&self) -> Option<Script> {
        self.script
    }

    pub fn add_feature(&mut self, tag: Tag, flags: FeatureFlags, value: u32) {
        let seq = self.feature_infos.len();
        self.feature_infos.push(FeatureInfo {
            tag,
            seq,
            max_value: value,
            flags,
            default_value: if flags.contains(FeatureFlags::GLOBAL) {
                value
            } else {
                0
            },
            stage: self.current_stage,
        });
    }

    #[inline]
    pub fn enable_feature(&mut self, tag: Tag, flags: FeatureFlags, value: u32) {
        self.add_feature(tag, flags | FeatureFlags::GLOBAL, value);
    }

    pub fn add_gsub_pause(&mut self, pause: Option<PauseFunc>) {
        let t = TableIndex::Gsub.idx();
        self.stages[t].push(StageInfo {
            index: self.current_stage[t],
            pause_func: pause,
        });
        self.current_stage[t] += 1;
    }

    pub fn compile(mut self) -> Map {
        let mut map = Map::default();

        // Resolve the script and language system per table.
        let selections: Vec<Option<LangSysSelection>> = [TableIndex::Gsub, TableIndex::Gpos]
            .iter()
            .map(|&table| select_lang_sys(self.layout_table(table), self.script, self.language))
            .collect();

        for (t, selection) in selections.iter().enumerate() {
            map.chosen_script[t] = selection.as_ref().map(|s| s.script_tag);
        }

        // Merge duplicate feature requests: value takes the max, flags
        // union, except a later explicit zero wins (disable).
        self.feature_infos.sort_by_key(|f| (f.tag, f.seq));
        let mut merged: Vec<FeatureInfo> = Vec::with_capacity(self.feature_infos.len());
        for info in self.feature_infos.drain(..) {
            match merged.last_mut() {
                Some(last) if last.tag == info.tag => {
                    if info.flags.contains(FeatureFlags::GLOBAL) && info.max_value == 0 {
                        // Explicit disable overrides everything before.
                        last.flags = info.flags;
                        last.max_value = 0;
                        last.default_value = 0;
                    } else {
                        last.max_value = last.max_value.max(info.max_value);
                        last.default_value = last.default_value.max(info.default_value);
                        last.flags |= info.flags;
                    }
                    // The earliest request decides the stage; later
                    // duplicates must not push a feature past a pause.
                    last.stage[0] = last.stage[0].min(info.stage[0]);
                    last.stage[1] = last.stage[1].min(info.stage[1]);
                }
                _ => merged.push(info),
            }
        }

        // Required features of the selected language systems apply
        // unconditionally, with an all-ones mask.
        for (t, selection) in selections.iter().enumerate() {
            if let Some(selection) = selection {
                map.required_feature_index[t] = selection.lang_sys.required_feature;
            }
        }

        // Allocate mask bits. Bit 0 is the shared global bit; a
        // feature that would not fit degrades to it rather than being
        // dropped.
        let mut next_bit = GLOBAL_BIT + 1;
        for info in &merged {
            if info.max_value == 0 {
                continue; // Disabled.
            }

            let global = info.flags.contains(FeatureFlags::GLOBAL) && info.max_value == 1;
            let bits_needed = if global {
                0
            } else {
                (32 - (info.max_value.max(1)).leading_zeros()) as u32
            };

            let feature_indices: [Option<u16>; TABLE_COUNT] = {
                let mut out = [None, None];
                for (t, selection) in selections.iter().enumerate() {
                    if let Some(selection) = selection {
                        out[t] = find_feature_index(
                            self.layout_table_by_idx(t),
                            &selection.lang_sys,
                            info.tag,
                        );
                    }
                }
                out
            };

            let has_fallback = info.flags.contains(FeatureFlags::HAS_FALLBACK);
            if feature_indices.iter().all(|i| i.is_none()) && !has_fallback {
                continue;
            }

            let (shift, mask) = if global || next_bit + bits_needed > 32 {
                // Global, or out of bits: the feature runs on the
                // shared global bit instead of being dropped.
                (GLOBAL_BIT, GLOBAL_MASK)
            } else {
                let shift = next_bit;
                let mask = (((1u64 << bits_needed) - 1) as u32) << shift;
                next_bit += bits_needed;
                (shift, mask)
            };

            map.global_mask |= (info.default_value << shift) & mask;
            map.features.push(FeatureMap {
                tag: info.tag,
                index: feature_indices,
                stage: info.stage,
                shift,
                mask,
                one_mask: (1 << shift) & mask,
                auto_zwnj: !info.flags.contains(FeatureFlags::MANUAL_ZWNJ),
                auto_zwj: !info.flags.contains(FeatureFlags::MANUAL_ZWJ),
                needs_fallback: has_fallback && feature_indices.iter().all(|i| i.is_none()),
            });
        }

        debug!(
            "compiled map: {} features, global mask {:#x}",
            map.features.len(),
            map.global_mask
        );

        // Collect lookups per table and stage.
        for t in 0..TABLE_COUNT {
            // Close the trailing stage.
            self.stages[t].push(StageInfo {
                index: self.current_stage[t],
                pause_func: None,
            });

            let mut raw: Vec<LookupMap> = Vec::new();

            if let Some(required) = map.required_feature_index[t] {
                add_lookups(self.layout_table_by_idx(t), &mut raw, required, 0, !0, true, true);
            }

            for feature in &map.features {
                if let Some(index) = feature.index[t] {
                    add_lookups(
                        self.layout_table_by_idx(t),
                        &mut raw,
                        index,
                        feature.stage[t],
                        feature.mask,
                        feature.auto_zwnj,
                        feature.auto_zwj,
                    );
                }
            }

            // Within a stage, lookups run in LookupList order, not
            // feature order; duplicates merge their masks.
            for stage in &self.stages[t] {
                let mut stage_lookups: Vec<LookupMap> = raw
                    .iter()
                    .filter(|l| l.stage <= stage.index)
                    .cloned()
                    .collect();
                raw.retain(|l| l.stage > stage.index);

                stage_lookups.sort_by_key(|l| l.index);
                stage_lookups.dedup_by(|a, b| {
                    if a.index == b.index {
                        b.mask |= a.mask;
                        b.auto_zwnj &= a.auto_zwnj;
                        b.auto_zwj &= a.auto_zwj;
                        true
                    } else {
                        false
                    }
                });

                map.compiled_lookups[t].extend(stage_lookups);
                map.stages[t].push(StageMap {
                    last_lookup: map.compiled_lookups[t].len(),
                    pause_func: stage.pause_func,
                });
            }
        }

        map.feature_map = map
            .features
            .iter()
            .enumerate()
            .map(|(i, f)| (f.tag, i))
            .collect();

        map
    }

    fn layout_table(&self, table: TableIndex) -> Option<LayoutShell<'a>> {
        self.layout_table_by_idx(table.idx())
    }

    fn layout_table_by_idx(&self, t: usize) -> Option<LayoutShell<'a>> {
        match t {
            0 => self.face.gsub.as_ref().map(LayoutShell::from_table),
            _ => self.face.gpos.as_ref().map(LayoutShell::from_table),
        }
    }
}

/// A type-erased view of a layout table's script/feature lists; lookup
/// content stays behind the concrete table.
#[derive(Clone, Copy)]
pub struct LayoutShell<'a> {
    pub scripts: &'a [ScriptRecord],
    pub features: &'a [FeatureRecord],
}

impl<'a> LayoutShell<'a> {
    fn from_table<T>(table: &'a LayoutTable<T>) -> Self {
        LayoutShell {
            scripts: &table.scripts,
            features: &table.features,
        }
    }

    fn script_by_tag(&self, tag: Tag) -> Option<&'a ScriptRecord> {
        self.scripts
            .binary_search_by(|s| s.tag.cmp(&tag))
            .ok()
            .map(|i| &self.scripts[i])
    }
}

#[derive(Clone)]
pub struct FeatureMap {
    pub tag: Tag,
    pub index: [Option<u16>; TABLE_COUNT],
    pub stage: [usize; TABLE_COUNT],
    pub shift: u32,
    pub mask: Mask,
    /// Mask for a binary feature: the lowest bit of its slice.
    pub one_mask: Mask,
    pub auto_zwnj: bool,
    pub auto_zwj: bool,
    pub needs_fallback: bool,
}

#[derive(Clone)]
pub struct LookupMap {
    pub index: u16,
    pub stage: usize,
    pub mask: Mask,
    pub auto_zwnj: bool,
    pub auto_zwj: bool,
}

pub struct StageMap {
    /// One past the last lookup of this stage in `compiled_lookups`.
    pub last_lookup: usize,
    pub pause_func: Option<PauseFunc>,
}

/// The compiled feature map.
#[derive(Default)]
pub struct Map {
    pub(crate) chosen_script: [Option<Tag>; TABLE_COUNT],
    pub(crate) global_mask: Mask,
    features: Vec<FeatureMap>,
    feature_map: FxHashMap<Tag, usize>,
    required_feature_index: [Option<u16>; TABLE_COUNT],
    pub(crate) compiled_lookups: [Vec<LookupMap>; TABLE_COUNT],
    pub(crate) stages: [Vec<StageMap>; TABLE_COUNT],
}

impl Map {
    #[inline]
    pub fn global_mask(&self) -> Mask {
        self.global_mask
    }

    pub fn feature(&self, tag: Tag) -> Option<&FeatureMap> {
        self.feature_map.get(&tag).map(|&i| &self.features[i])
    }

    /// The feature's full mask, zero when unmapped.
    pub fn get_mask(&self, tag: Tag) -> Mask {
        self.feature(tag).map_or(0, |f| f.mask)
    }

    /// The mask for a binary on/off feature.
    pub fn get_1_mask(&self, tag: Tag) -> Mask {
        self.feature(tag).map_or(0, |f| f.one_mask)
    }

    pub fn stage_lookups(&self, table: TableIndex, stage: usize) -> &[LookupMap] {
        let t = table.idx();
        let end = self.stages[t][stage].last_lookup;
        let start = if stage == 0 {
            0
        } else {
            self.stages[t][stage - 1].last_lookup
        };
        &self.compiled_lookups[t][start..end]
    }

    pub fn stage_count(&self, table: TableIndex) -> usize {
        self.stages[table.idx()].len()
    }

    pub fn has_lookups(&self, table: TableIndex) -> bool {
        !self.compiled_lookups[table.idx()].is_empty()
    }
}

struct LangSysSelection {
    script_tag: Tag,
    lang_sys: LangSys,
}

fn tag_dflt() -> Tag {
    Tag::from_bytes(b"DFLT")
}

/// OpenType script tag candidates for a text script, most specific
/// first. Indic scripts carry a v2 tag next to the original one.
fn script_tag_candidates(script: Script) -> Vec<Tag> {
    let new_indic = |v2: &[u8; 4], v1: &[u8; 4]| vec![Tag::from_bytes(v2), Tag::from_bytes(v1)];

    match script {
        script::DEVANAGARI => new_indic(b"dev2", b"deva"),
        script::BENGALI => new_indic(b"bng2", b"beng"),
        script::GURMUKHI => new_indic(b"gur2", b"guru"),
        script::GUJARATI => new_indic(b"gjr2", b"gujr"),
        script::ORIYA => new_indic(b"ory2", b"orya"),
        script::TAMIL => new_indic(b"tml2", b"taml"),
        script::TELUGU => new_indic(b"tel2", b"telu"),
        script::KANNADA => new_indic(b"knd2", b"knda"),
        script::MALAYALAM => new_indic(b"mlm2", b"mlym"),
        script::MYANMAR => new_indic(b"mym2", b"mymr"),
        script::KHMER => vec![Tag::from_bytes(b"khmr")],
        _ => {
            // The OT tag is the lowercased ISO tag.
            let mut bytes = script.tag().to_bytes();
            for b in &mut bytes {
                *b = b.to_ascii_lowercase();
            }
            vec![Tag::from_bytes(&bytes)]
        }
    }
}

fn select_lang_sys(
    table: Option<LayoutShell>,
    script: Option<Script>,
    language: Option<Language>,
) -> Option<LangSysSelection> {
    let table = table?;

    let mut chosen: Option<(&ScriptRecord, Tag)> = None;
    if let Some(script) = script {
        for tag in script_tag_candidates(script) {
            if let Some(record) = table.script_by_tag(tag) {
                chosen = Some((record, tag));
                break;
            }
        }
    }

    // Fall back through DFLT and latn, the way every shaper does.
    if chosen.is_none() {
        for tag in [tag_dflt(), Tag::from_bytes(b"latn")].iter() {
            if let Some(record) = table.script_by_tag(*tag) {
                chosen = Some((record, *tag));
                break;
            }
        }
    }

    let (record, script_tag) = chosen?;

    let lang_sys = language
        .and_then(|lang| record.lang_sys_by_tag(lang.tag()))
        .or(record.default_lang_sys.as_ref())
        .or_else(|| record.lang_sys.first())?;

    Some(LangSysSelection {
        script_tag,
        lang_sys: lang_sys.clone(),
    })
}

fn find_feature_index(
    table: Option<LayoutShell>,
    lang_sys: &LangSys,
    tag: Tag,
) -> Option<u16> {
    let table = table?;
    lang_sys
        .feature_indices
        .iter()
        .copied()
        .find(|&i| table.features.get(usize::from(i)).map(|f| f.tag) == Some(tag))
}

fn add_lookups(
    table: Option<LayoutShell>,
    out: &mut Vec<LookupMap>,
    feature_index: u16,
    stage: usize,
    mask: Mask,
    auto_zwnj: bool,
    auto_zwj: bool,
) {
    let table = match table {
        Some(t) => t,
        None => return,
    };

    let feature = match table.features.get(usize::from(feature_index)) {
        Some(f) => f,
        None => return,
    };

    for &lookup_index in &feature.lookup_indices {
        out.push(LookupMap {
            index: lookup_index,
            stage,
            mask,
            auto_zwnj,
            auto_zwj,
        });
    }
}
