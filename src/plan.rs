//! The shape plan: everything derivable from (face, direction, script,
//! language, features) without looking at the text. Plans are immutable
//! once built and cached in a process-wide LRU keyed by those inputs.

use std::hash::{Hash, Hasher};
use std::sync::{Arc, Mutex};

use log::debug;
use lru::LruCache;
use rustc_hash::FxHasher;

use crate::common::{Direction, Feature, Language, Mask, Script, Tag};
use crate::complex::{shaper_for_script, ComplexShaper, ShaperData};
use crate::face::Face;
use crate::ot::feature;
use crate::ot::map::{FeatureFlags, Map, MapBuilder, TableIndex};

/// Process-wide plan cache capacity.
const PLAN_CACHE_SIZE: usize = 32;

pub struct ShapePlan {
    pub(crate) direction: Direction,
    pub(crate) script: Option<Script>,
    pub(crate) shaper: &'static ComplexShaper,
    pub(crate) ot_map: Map,
    pub(crate) data: ShaperData,

    pub(crate) kern_mask: Mask,
    pub(crate) requested_kerning: bool,

    /// `morx` replaces the whole GSUB pass when set.
    pub(crate) apply_morx: bool,
    pub(crate) apply_gpos: bool,
    /// Run the legacy `kern` table after positioning.
    pub(crate) apply_kern: bool,
    /// Heuristic mark placement when GPOS gave us nothing.
    pub(crate) fallback_mark_positioning: bool,
}

impl ShapePlan {
    pub fn new(
        face: &Face,
        direction: Direction,
        script: Option<Script>,
        language: Option<Language>,
        user_features: &[Feature],
    ) -> Self {
        let shaper = shaper_for_script(script);
        let mut planner = MapBuilder::new(face, script, language);

        collect_features(&mut planner, shaper, direction, user_features);

        let ot_map = planner.compile();
        let data = match shaper.data_create {
            Some(create) => create(&ot_map, script),
            None => ShaperData::None,
        };

        let kern_mask = ot_map.get_mask(feature::KERNING);
        let requested_kerning = user_features
            .iter()
            .find(|f| f.tag == feature::KERNING)
            .map_or(true, |f| f.value != 0);

        let apply_morx = !face.has_gsub() && face.has_morx();
        let apply_gpos = ot_map.has_lookups(TableIndex::Gpos);

        // GPOS kerning wins over the legacy table; the legacy table
        // wins over nothing.
        let gpos_has_kerning = apply_gpos && kern_mask != 0;
        let apply_kern = requested_kerning && !gpos_has_kerning && face.has_kern();

        debug!(
            "plan: script={:?} chosen={:?}/{:?} morx={} gpos={} kern={}",
            script,
            ot_map.chosen_script[0],
            ot_map.chosen_script[1],
            apply_morx,
            apply_gpos,
            apply_kern
        );

        ShapePlan {
            direction,
            script,
            shaper,
            ot_map,
            data,
            kern_mask,
            requested_kerning,
            apply_morx,
            apply_gpos,
            apply_kern,
            fallback_mark_positioning: !apply_gpos,
        }
    }
}

fn collect_features(
    planner: &mut MapBuilder,
    shaper: &ComplexShaper,
    direction: Direction,
    user_features: &[Feature],
) {
    // Direction features first; most fonts have no lookups for them
    // but the ones that do expect them globally enabled.
    match direction {
        Direction::LeftToRight => {
            planner.enable_feature(Tag::from_bytes(b"ltra"), FeatureFlags::NONE, 1);
            planner.enable_feature(Tag::from_bytes(b"ltrm"), FeatureFlags::NONE, 1);
        }
        Direction::RightToLeft => {
            planner.enable_feature(Tag::from_bytes(b"rtla"), FeatureFlags::NONE, 1);
            planner.add_feature(Tag::from_bytes(b"rtlm"), FeatureFlags::NONE, 1);
        }
        _ => {}
    }

    if let Some(collect) = shaper.collect_features {
        collect(planner);
    }

    // Features every script gets.
    for tag in &[
        feature::GLYPH_COMPOSITION_DECOMPOSITION,
        feature::LOCALIZED_FORMS,
        feature::MARK_POSITIONING,
        feature::MARK_TO_MARK_POSITIONING,
        feature::REQUIRED_LIGATURES,
        feature::ABOVE_BASE_MARK_POSITIONING,
        feature::BELOW_BASE_MARK_POSITIONING,
    ] {
        planner.enable_feature(*tag, FeatureFlags::NONE, 1);
    }

    if direction.is_horizontal() {
        for tag in &[
            feature::CONTEXTUAL_ALTERNATES,
            feature::CONTEXTUAL_LIGATURES,
            feature::CURSIVE_POSITIONING,
            feature::DISTANCES,
            feature::KERNING,
            feature::STANDARD_LIGATURES,
            feature::REQUIRED_CONTEXTUAL_ALTERNATES,
        ] {
            planner.enable_feature(*tag, FeatureFlags::NONE, 1);
        }
    } else {
        planner.enable_feature(Tag::from_bytes(b"vert"), FeatureFlags::NONE, 1);
    }

    for feature in user_features {
        planner.add_feature(feature.tag, FeatureFlags::GLOBAL, feature.value);
    }
}

// --- plan cache ------------------------------------------------------

#[derive(PartialEq, Eq, Hash)]
struct PlanKey {
    face_id: u64,
    direction: Direction,
    script: Option<u32>,
    language: Option<u32>,
    features_hash: u64,
}

fn features_hash(features: &[Feature]) -> u64 {
    let mut sorted: Vec<_> = features.iter().map(|f| (f.tag.0, f.value)).collect();
    sorted.sort_unstable();

    let mut hasher = FxHasher::default();
    sorted.hash(&mut hasher);
    hasher.finish()
}

static PLAN_CACHE: Mutex<Option<LruCache<PlanKey, Arc<ShapePlan>>>> = Mutex::new(None);

/// Fetches or builds the plan for this shaping configuration.
pub(crate) fn cached_plan(
    face: &Face,
    direction: Direction,
    script: Option<Script>,
    language: Option<Language>,
    user_features: &[Feature],
) -> Arc<ShapePlan> {
    let key = PlanKey {
        face_id: face.id,
        direction,
        script: script.map(|s| s.tag().0),
        language: language.map(|l| l.tag().0),
        features_hash: features_hash(user_features),
    };

    let mut guard = match PLAN_CACHE.lock() {
        Ok(g) => g,
        // A panic mid-insert only loses cached plans.
        Err(poisoned) => poisoned.into_inner(),
    };
    let cache = guard.get_or_insert_with(|| LruCache::new(PLAN_CACHE_SIZE));

    if let Some(plan) = cache.get(&key) {
        return plan.clone();
    }

    let plan = Arc::new(ShapePlan::new(
        face,
        direction,
        script,
        language,
        user_features,
    ));
    cache.put(key, plan.clone());
    plan
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plans_are_cached_per_face() {
        let face = Face::builder().build();
        let a = cached_plan(&face, Direction::LeftToRight, None, None, &[]);
        let b = cached_plan(&face, Direction::LeftToRight, None, None, &[]);
        assert!(Arc::ptr_eq(&a, &b));

        let other = Face::builder().build();
        let c = cached_plan(&other, Direction::LeftToRight, None, None, &[]);
        assert!(!Arc::ptr_eq(&a, &c));
    }

    #[test]
    fn feature_order_does_not_split_cache_entries() {
        let face = Face::builder().build();
        let f1 = [
            Feature::new(Tag::from_bytes(b"liga"), 0),
            Feature::new(Tag::from_bytes(b"kern"), 1),
        ];
        let f2 = [
            Feature::new(Tag::from_bytes(b"kern"), 1),
            Feature::new(Tag::from_bytes(b"liga"), 0),
        ];
        let a = cached_plan(&face, Direction::LeftToRight, None, None, &f1);
        let b = cached_plan(&face, Direction::LeftToRight, None, None, &f2);
        assert!(Arc::ptr_eq(&a, &b));
    }
}
