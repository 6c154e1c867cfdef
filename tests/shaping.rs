//! End-to-end shaping tests over synthetic faces.

use textshape::table::*;
use textshape::{
    script, shape, Direction, Face, Feature, GlyphBuffer, GlyphId, Tag, UnicodeBuffer,
};

fn buffer(text: &str, direction: Direction, script: textshape::Script) -> UnicodeBuffer {
    // RUST_LOG=debug surfaces the plan-build logging in test output.
    let _ = env_logger::builder().is_test(true).try_init();

    let mut b = UnicodeBuffer::new();
    b.push_str(text);
    b.set_direction(direction);
    b.set_script(script);
    b
}

fn glyphs(out: &GlyphBuffer) -> Vec<u16> {
    out.glyph_infos().iter().map(|i| i.glyph_id).collect()
}

fn clusters(out: &GlyphBuffer) -> Vec<u32> {
    out.glyph_infos().iter().map(|i| i.cluster).collect()
}

/// One-script GSUB shell: DFLT script, one language system listing
/// every feature.
fn gsub_table(features: Vec<FeatureRecord>, lookups: Vec<Lookup<SubstSubtable>>) -> SubstTable {
    layout_table(features, lookups)
}

fn gpos_table(features: Vec<FeatureRecord>, lookups: Vec<Lookup<PosSubtable>>) -> PosTable {
    layout_table(features, lookups)
}

fn layout_table<T>(features: Vec<FeatureRecord>, lookups: Vec<Lookup<T>>) -> LayoutTable<T> {
    let indices: Vec<u16> = (0..features.len() as u16).collect();
    LayoutTable {
        scripts: vec![ScriptRecord {
            tag: Tag::from_bytes(b"DFLT"),
            default_lang_sys: Some(LangSys {
                tag: Tag::from_bytes(b"dflt"),
                required_feature: None,
                feature_indices: indices,
            }),
            lang_sys: vec![],
        }],
        features,
        lookups,
    }
}

/// Same shell under an explicit script tag.
fn layout_table_for_script<T>(
    script_tag: &[u8; 4],
    features: Vec<FeatureRecord>,
    lookups: Vec<Lookup<T>>,
) -> LayoutTable<T> {
    let mut table = layout_table(features, lookups);
    table.scripts[0].tag = Tag::from_bytes(script_tag);
    table
}

fn simple_feature(tag: &[u8; 4], lookup_indices: Vec<u16>) -> FeatureRecord {
    FeatureRecord {
        tag: Tag::from_bytes(tag),
        lookup_indices,
    }
}

// --- Latin ligatures -------------------------------------------------

/// f=1, i=2, fi-ligature=3.
fn latin_liga_face() -> Face {
    let liga = SubstSubtable::Ligature(LigatureSubst {
        coverage: Coverage::from_glyphs(vec![GlyphId(1)]),
        ligature_sets: vec![vec![Ligature {
            glyph: GlyphId(3),
            components: vec![GlyphId(2)],
        }]],
    });

    Face::builder()
        .cmap(vec![('f' as u32, 1), ('i' as u32, 2)])
        .advances(vec![500, 300, 250, 480])
        .gsub(gsub_table(
            vec![simple_feature(b"liga", vec![0])],
            vec![Lookup::new(LookupFlags::empty(), None, vec![liga])],
        ))
        .build()
}

#[test]
fn fi_ligature_forms() {
    let out = shape(
        &latin_liga_face(),
        &[],
        buffer("fi", Direction::LeftToRight, script::LATIN),
    );

    assert_eq!(glyphs(&out), vec![3]);
    assert_eq!(clusters(&out), vec![0]);
    assert_eq!(out.glyph_positions()[0].x_advance, 480);
}

#[test]
fn fi_ligature_disabled_by_feature_value_zero() {
    let out = shape(
        &latin_liga_face(),
        &[Feature::new(Tag::from_bytes(b"liga"), 0)],
        buffer("fi", Direction::LeftToRight, script::LATIN),
    );

    assert_eq!(glyphs(&out), vec![1, 2]);
    assert_eq!(clusters(&out), vec![0, 1]);
}

#[test]
fn infos_and_positions_stay_parallel() {
    for text in &["fi", "ffi", "if", "f", ""] {
        let out = shape(
            &latin_liga_face(),
            &[],
            buffer(text, Direction::LeftToRight, script::LATIN),
        );
        assert_eq!(out.glyph_infos().len(), out.glyph_positions().len());
    }
}

#[test]
fn clusters_are_monotone_ltr() {
    let out = shape(
        &latin_liga_face(),
        &[],
        buffer("fifi", Direction::LeftToRight, script::LATIN),
    );
    let c = clusters(&out);
    assert!(c.windows(2).all(|w| w[0] <= w[1]), "{:?}", c);
}

// --- Arabic ----------------------------------------------------------

/// lam=1, alef=2, lam-alef ligature=3.
fn arabic_face() -> Face {
    let rlig = SubstSubtable::Ligature(LigatureSubst {
        coverage: Coverage::from_glyphs(vec![GlyphId(1)]),
        ligature_sets: vec![vec![Ligature {
            glyph: GlyphId(3),
            components: vec![GlyphId(2)],
        }]],
    });

    Face::builder()
        .cmap(vec![(0x0644, 1), (0x0627, 2)])
        .advances(vec![500, 400, 350, 420])
        .gsub(layout_table_for_script(
            b"arab",
            vec![simple_feature(b"rlig", vec![0])],
            vec![Lookup::new(LookupFlags::empty(), None, vec![rlig])],
        ))
        .build()
}

#[test]
fn lam_alef_ligates_rtl() {
    let out = shape(
        &arabic_face(),
        &[],
        buffer("\u{0644}\u{0627}", Direction::RightToLeft, script::ARABIC),
    );

    assert_eq!(glyphs(&out), vec![3]);
    assert_eq!(clusters(&out), vec![0]);
}

#[test]
fn rtl_output_is_reversed() {
    // Without ligation (distinct letters), RTL output runs backwards.
    let face = Face::builder()
        .cmap(vec![(0x0628, 5), (0x0627, 6)])
        .advances(vec![0, 0, 0, 0, 0, 450, 300])
        .build();

    let out = shape(
        &face,
        &[],
        buffer("\u{0628}\u{0627}", Direction::RightToLeft, script::ARABIC),
    );

    assert_eq!(glyphs(&out), vec![6, 5]);
    assert_eq!(clusters(&out), vec![1, 0]);
}

// --- Devanagari ------------------------------------------------------

#[test]
fn devanagari_matra_reorders_before_consonant() {
    // ka=1, i-matra=2.
    let face = Face::builder()
        .cmap(vec![(0x0915, 1), (0x093F, 2), (0x25CC, 9)])
        .advances(vec![0, 520, 260, 0, 0, 0, 0, 0, 0, 300])
        .build();

    let out = shape(
        &face,
        &[],
        buffer("\u{0915}\u{093F}", Direction::LeftToRight, script::DEVANAGARI),
    );

    // Visual order: matra first, both in cluster 0, advances intact.
    assert_eq!(glyphs(&out), vec![2, 1]);
    assert_eq!(clusters(&out), vec![0, 0]);
    let advance: i32 = out.glyph_positions().iter().map(|p| p.x_advance).sum();
    assert_eq!(advance, 520 + 260);
}

#[test]
fn orphan_matra_gets_dotted_circle() {
    let face = Face::builder()
        .cmap(vec![(0x093F, 2), (0x25CC, 9)])
        .advances(vec![0, 0, 260, 0, 0, 0, 0, 0, 0, 300])
        .build();

    let out = shape(
        &face,
        &[],
        buffer("\u{093F}", Direction::LeftToRight, script::DEVANAGARI),
    );

    assert_eq!(glyphs(&out), vec![2, 9]);
    assert_eq!(clusters(&out), vec![0, 0]);
}

// --- Thai ------------------------------------------------------------

#[test]
fn thai_preposed_vowel_stays_left_with_merged_cluster() {
    // SARA E = 11, KO KAI = 12.
    let face = Face::builder()
        .cmap(vec![(0x0E40, 11), (0x0E01, 12)])
        .default_advance(500)
        .build();

    let out = shape(
        &face,
        &[],
        buffer("\u{0E40}\u{0E01}", Direction::LeftToRight, script::THAI),
    );

    assert_eq!(glyphs(&out), vec![11, 12]);
    assert_eq!(clusters(&out), vec![0, 0]);
}

// --- Hangul ----------------------------------------------------------

#[test]
fn hangul_round_trips_through_jamo() {
    let face = Face::builder()
        .cmap(vec![(0xAC00, 7), (0x1100, 1), (0x1161, 2)])
        .advances(vec![0, 500, 500, 0, 0, 0, 0, 920])
        .build();

    let out = shape(
        &face,
        &[],
        buffer("\u{AC00}", Direction::LeftToRight, script::HANGUL),
    );

    assert_eq!(glyphs(&out), vec![7]);
    assert_eq!(clusters(&out), vec![0]);
}

// --- Khmer -----------------------------------------------------------

#[test]
fn khmer_coeng_cluster_shares_cluster_zero() {
    let face = Face::builder()
        .cmap(vec![
            (0x179F, 1),
            (0x17D2, 2),
            (0x179A, 3),
            (0x178F, 4),
            (0x17B8, 5),
        ])
        .default_advance(400)
        .build();

    let out = shape(
        &face,
        &[],
        buffer(
            "\u{179F}\u{17D2}\u{179A}\u{17D2}\u{178F}\u{17B8}",
            Direction::LeftToRight,
            script::KHMER,
        ),
    );

    assert!(clusters(&out).iter().all(|&c| c == 0), "{:?}", clusters(&out));
}

// --- GPOS ------------------------------------------------------------

/// a=1 (base), acute=2 (mark).
fn mark_face() -> Face {
    let mark_base = PosSubtable::MarkToBase(MarkBasePos {
        mark_coverage: Coverage::from_glyphs(vec![GlyphId(2)]),
        base_coverage: Coverage::from_glyphs(vec![GlyphId(1)]),
        marks: vec![MarkRecord {
            class: 0,
            anchor: Anchor::new(50, 0),
        }],
        base_anchors: vec![vec![Some(Anchor::new(250, 600))]],
    });

    Face::builder()
        .cmap(vec![('a' as u32, 1), (0x0301, 2)])
        .advances(vec![0, 500, 100])
        .gdef(GdefTable {
            glyph_classes: ClassDef::from_array(GlyphId(1), vec![1, 3]),
            mark_attach_classes: ClassDef::Empty,
            mark_glyph_sets: vec![],
        })
        .gpos(gpos_table(
            vec![simple_feature(b"mark", vec![0])],
            vec![Lookup::new(LookupFlags::empty(), None, vec![mark_base])],
        ))
        .build()
}

#[test]
fn mark_attaches_to_base_anchor() {
    let out = shape(
        &mark_face(),
        &[],
        buffer("a\u{0301}", Direction::LeftToRight, script::LATIN),
    );

    assert_eq!(out.len(), 2);
    let mark = &out.glyph_positions()[1];

    // Anchor delta (250-50, 600-0), then the propagation pass undoes
    // the base advance on x.
    assert_eq!(mark.x_offset, 200 - 500);
    assert_eq!(mark.y_offset, 600);
    assert_eq!(mark.x_advance, 0);
}

#[test]
fn ignore_marks_lookup_never_touches_marks() {
    // A single-positioning lookup moving every covered glyph, flagged
    // to ignore marks; the mark must keep zero offsets.
    let single = PosSubtable::Single(SinglePos::Format1 {
        coverage: Coverage::from_glyphs(vec![GlyphId(1), GlyphId(2)]),
        value: ValueRecord::placement(0, 77),
    });

    let face = Face::builder()
        .cmap(vec![('a' as u32, 1), (0x0301, 2)])
        .advances(vec![0, 500, 100])
        .gdef(GdefTable {
            glyph_classes: ClassDef::from_array(GlyphId(1), vec![1, 3]),
            mark_attach_classes: ClassDef::Empty,
            mark_glyph_sets: vec![],
        })
        .gpos(gpos_table(
            vec![simple_feature(b"kern", vec![0])],
            vec![Lookup::new(LookupFlags::IGNORE_MARKS, None, vec![single])],
        ))
        .build();

    let out = shape(
        &face,
        &[],
        buffer("a\u{0301}", Direction::LeftToRight, script::LATIN),
    );

    assert_eq!(out.glyph_positions()[0].y_offset, 77);
    assert_eq!(out.glyph_positions()[1].y_offset, 0);
}

#[test]
fn pair_positioning_kerns_pair() {
    let pair = PosSubtable::Pair(PairPos::Format1 {
        coverage: Coverage::from_glyphs(vec![GlyphId(1)]),
        sets: vec![vec![PairValueRecord {
            second: GlyphId(2),
            value1: ValueRecord::advance(-120),
            value2: ValueRecord::default(),
        }]],
    });

    let face = Face::builder()
        .cmap(vec![('A' as u32, 1), ('V' as u32, 2)])
        .advances(vec![0, 600, 580])
        .gpos(gpos_table(
            vec![simple_feature(b"kern", vec![0])],
            vec![Lookup::new(LookupFlags::empty(), None, vec![pair])],
        ))
        .build();

    let out = shape(
        &face,
        &[],
        buffer("AV", Direction::LeftToRight, script::LATIN),
    );

    assert_eq!(out.glyph_positions()[0].x_advance, 600 - 120);
    assert_eq!(out.glyph_positions()[1].x_advance, 580);
}

#[test]
fn cursive_attachment_aligns_exit_to_entry() {
    let cursive = PosSubtable::Cursive(CursivePos {
        coverage: Coverage::from_glyphs(vec![GlyphId(1), GlyphId(2)]),
        entry_exits: vec![
            EntryExit {
                entry: None,
                exit: Some(Anchor::new(450, 100)),
            },
            EntryExit {
                entry: Some(Anchor::new(20, 40)),
                exit: None,
            },
        ],
    });

    let face = Face::builder()
        .cmap(vec![('b' as u32, 1), ('c' as u32, 2)])
        .advances(vec![0, 500, 500])
        .gpos(gpos_table(
            vec![simple_feature(b"curs", vec![0])],
            vec![Lookup::new(LookupFlags::empty(), None, vec![cursive])],
        ))
        .build();

    let out = shape(
        &face,
        &[],
        buffer("bc", Direction::LeftToRight, script::LATIN),
    );

    // First glyph's advance snaps to its exit anchor.
    assert_eq!(out.glyph_positions()[0].x_advance, 450);
    // Second glyph shifts left by its entry x.
    assert_eq!(out.glyph_positions()[1].x_advance, 500 - 20);
    assert_eq!(out.glyph_positions()[1].x_offset, -20);
}

// --- GSUB lookup types ----------------------------------------------

#[test]
fn multiple_substitution_expands_with_shared_cluster() {
    let multiple = SubstSubtable::Multiple(MultipleSubst {
        coverage: Coverage::from_glyphs(vec![GlyphId(1)]),
        sequences: vec![vec![GlyphId(4), GlyphId(5)]],
    });

    let face = Face::builder()
        .cmap(vec![('x' as u32, 1)])
        .default_advance(400)
        .gsub(gsub_table(
            vec![simple_feature(b"ccmp", vec![0])],
            vec![Lookup::new(LookupFlags::empty(), None, vec![multiple])],
        ))
        .build();

    let out = shape(
        &face,
        &[],
        buffer("x", Direction::LeftToRight, script::LATIN),
    );

    assert_eq!(glyphs(&out), vec![4, 5]);
    assert_eq!(clusters(&out), vec![0, 0]);
    // Expanded entries carry no codepoint.
    assert_eq!(out.glyph_infos()[1].codepoint, 0);
}

#[test]
fn single_substitution_delta() {
    let single = SubstSubtable::Single(SingleSubst::Format1 {
        coverage: Coverage::from_glyphs(vec![GlyphId(1)]),
        delta: 10,
    });

    let face = Face::builder()
        .cmap(vec![('x' as u32, 1)])
        .default_advance(400)
        .gsub(gsub_table(
            vec![simple_feature(b"ccmp", vec![0])],
            vec![Lookup::new(LookupFlags::empty(), None, vec![single])],
        ))
        .build();

    let out = shape(&face, &[], buffer("x", Direction::LeftToRight, script::LATIN));
    assert_eq!(glyphs(&out), vec![11]);
}

#[test]
fn chain_context_fires_nested_lookup() {
    // "abc" with a chain rule: b with a before and c after becomes B.
    let nested = SubstSubtable::Single(SingleSubst::Format2 {
        coverage: Coverage::from_glyphs(vec![GlyphId(2)]),
        substitutes: vec![GlyphId(20)],
    });
    let chain = SubstSubtable::ChainContext(ChainContextLookup::Format3 {
        backtrack_coverages: vec![Coverage::from_glyphs(vec![GlyphId(1)])],
        input_coverages: vec![Coverage::from_glyphs(vec![GlyphId(2)])],
        lookahead_coverages: vec![Coverage::from_glyphs(vec![GlyphId(3)])],
        lookups: vec![LookupRecord {
            sequence_index: 0,
            lookup_index: 1,
        }],
    });

    let face = Face::builder()
        .cmap(vec![('a' as u32, 1), ('b' as u32, 2), ('c' as u32, 3)])
        .default_advance(400)
        .gsub(gsub_table(
            vec![simple_feature(b"calt", vec![0])],
            vec![
                Lookup::new(LookupFlags::empty(), None, vec![chain]),
                Lookup::new(LookupFlags::empty(), None, vec![nested]),
            ],
        ))
        .build();

    let out = shape(&face, &[], buffer("abc", Direction::LeftToRight, script::LATIN));
    assert_eq!(glyphs(&out), vec![1, 20, 3]);

    let out = shape(&face, &[], buffer("bc", Direction::LeftToRight, script::LATIN));
    assert_eq!(glyphs(&out), vec![2, 3]);
}

#[test]
fn reverse_chain_substitutes_backwards() {
    // x before y becomes X, scanned from the end.
    let reverse = SubstSubtable::ReverseChainSingle(ReverseChainSingleSubst {
        coverage: Coverage::from_glyphs(vec![GlyphId(1)]),
        backtrack_coverages: vec![],
        lookahead_coverages: vec![Coverage::from_glyphs(vec![GlyphId(2)])],
        substitutes: vec![GlyphId(10)],
    });

    let face = Face::builder()
        .cmap(vec![('x' as u32, 1), ('y' as u32, 2)])
        .default_advance(400)
        .gsub(gsub_table(
            vec![simple_feature(b"calt", vec![0])],
            vec![Lookup::new(LookupFlags::empty(), None, vec![reverse])],
        ))
        .build();

    let out = shape(&face, &[], buffer("xxy", Direction::LeftToRight, script::LATIN));
    // Only the x directly before y matches its lookahead.
    assert_eq!(glyphs(&out), vec![1, 10, 2]);
}

// --- morx fallback ---------------------------------------------------

#[test]
fn morx_replaces_gsub_when_absent() {
    let morx = MorxTable {
        chains: vec![Chain {
            default_flags: 1,
            features: vec![],
            subtables: vec![Subtable {
                coverage: 0x2000_0000,
                sub_feature_flags: 1,
                kind: SubtableKind::NonContextual(AatLookup::Format6(vec![(1, 42)])),
            }],
        }],
    };

    let face = Face::builder()
        .cmap(vec![('x' as u32, 1)])
        .default_advance(400)
        .morx(morx)
        .build();

    let out = shape(&face, &[], buffer("x", Direction::LeftToRight, script::LATIN));
    assert_eq!(glyphs(&out), vec![42]);
}

// --- default ignorables ----------------------------------------------

#[test]
fn default_ignorables_are_hidden() {
    let face = Face::builder()
        .cmap(vec![('a' as u32, 1), (' ' as u32, 3), (0x200D, 4)])
        .advances(vec![0, 500, 0, 250, 111])
        .build();

    let out = shape(
        &face,
        &[],
        buffer("a\u{200D}a", Direction::LeftToRight, script::LATIN),
    );

    assert_eq!(out.len(), 3);
    // The ZWJ is replaced by a zero-width space glyph.
    assert_eq!(out.glyph_infos()[1].glyph_id, 3);
    assert_eq!(out.glyph_positions()[1].x_advance, 0);
}

#[test]
fn default_ignorables_can_be_removed() {
    use textshape::BufferFlags;

    let face = Face::builder()
        .cmap(vec![('a' as u32, 1), (0x200D, 4)])
        .advances(vec![0, 500, 0, 0, 111])
        .build();

    let mut b = buffer("a\u{200D}a", Direction::LeftToRight, script::LATIN);
    b.set_flags(BufferFlags::REMOVE_DEFAULT_IGNORABLES);

    let out = shape(&face, &[], b);
    assert_eq!(glyphs(&out), vec![1, 1]);
    assert_eq!(clusters(&out), vec![0, 2]);
}

// --- missing glyphs --------------------------------------------------

#[test]
fn unmapped_codepoints_become_notdef() {
    let face = Face::builder()
        .cmap(vec![('a' as u32, 1)])
        .default_advance(500)
        .build();

    let out = shape(&face, &[], buffer("aQ", Direction::LeftToRight, script::LATIN));
    assert_eq!(glyphs(&out), vec![1, 0]);
}
