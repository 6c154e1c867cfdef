//! Unicode property helpers shared by the normalizer, the complex
//! shapers and the fallback positioning pass.

pub use unicode_general_category::GeneralCategory;

/// U+25CC DOTTED CIRCLE, inserted in front of broken syllables.
pub const DOTTED_CIRCLE: u32 = 0x25CC;
pub const ZWNJ: u32 = 0x200C;
pub const ZWJ: u32 = 0x200D;
pub const CGJ: u32 = 0x034F;

pub trait CharExt {
    fn general_category(self) -> GeneralCategory;
    fn combining_class(self) -> u8;
    fn modified_combining_class(self) -> u8;
    fn is_default_ignorable(self) -> bool;
    fn mirrored(self) -> Option<char>;
}

impl CharExt for char {
    #[inline]
    fn general_category(self) -> GeneralCategory {
        unicode_general_category::get_general_category(self)
    }

    #[inline]
    fn combining_class(self) -> u8 {
        unicode_ccc::get_canonical_combining_class(self) as u8
    }

    #[inline]
    fn modified_combining_class(self) -> u8 {
        modified_combining_class::remap(self.combining_class())
    }

    fn is_default_ignorable(self) -> bool {
        let c = self as u32;
        match c {
            0x00AD
            | 0x034F
            | 0x061C
            | 0x115F..=0x1160
            | 0x17B4..=0x17B5
            | 0x180B..=0x180E
            | 0x200B..=0x200F
            | 0x202A..=0x202E
            | 0x2060..=0x206F
            | 0x3164
            | 0xFE00..=0xFE0F
            | 0xFEFF
            | 0xFFA0
            | 0x1BCA0..=0x1BCA3
            | 0x1D173..=0x1D17A
            | 0xE0000..=0xE0FFF => true,
            _ => false,
        }
    }

    #[inline]
    fn mirrored(self) -> Option<char> {
        unicode_bidi_mirroring::get_mirrored(self)
    }
}

pub trait GeneralCategoryExt {
    fn is_mark(&self) -> bool;
    fn is_non_spacing_mark(&self) -> bool;
    fn is_letter(&self) -> bool;
}

impl GeneralCategoryExt for GeneralCategory {
    #[inline]
    fn is_mark(&self) -> bool {
        matches!(
            self,
            GeneralCategory::NonspacingMark
                | GeneralCategory::SpacingMark
                | GeneralCategory::EnclosingMark
        )
    }

    #[inline]
    fn is_non_spacing_mark(&self) -> bool {
        matches!(self, GeneralCategory::NonspacingMark)
    }

    #[inline]
    fn is_letter(&self) -> bool {
        matches!(
            self,
            GeneralCategory::LowercaseLetter
                | GeneralCategory::ModifierLetter
                | GeneralCategory::OtherLetter
                | GeneralCategory::TitlecaseLetter
                | GeneralCategory::UppercaseLetter
        )
    }
}

/// Modified combining classes.
///
/// Canonical combining classes of several scripts are permuted so that
/// sorting by the modified value yields the order the shapers expect.
/// The fixed-position Hebrew classes follow the SBL Hebrew manual, the
/// Arabic ones move shadda before the vowel signs, and the Thai/Lao
/// below-base vowels sort with the low marks.
pub mod modified_combining_class {
    // Renumber targets used by the Arabic mark reordering (UTR#53).
    pub const CCC22: u8 = 25;
    pub const CCC26: u8 = 26;

    pub fn remap(cc: u8) -> u8 {
        match cc {
            // Hebrew
            10 => 22, // sheva
            11 => 15, // hataf segol
            12 => 16, // hataf patah
            13 => 17, // hataf qamats
            14 => 18, // hiriq
            15 => 19, // tsere
            16 => 20, // segol
            17 => 21, // patah
            18 => 14, // qamats
            19 => 24, // holam
            20 => 23, // qubuts
            21 => 12, // dagesh
            22 => 25, // meteg
            23 => 13, // rafe
            24 => 10, // shin dot
            25 => 11, // sin dot
            26 => 26, // point varika

            // Arabic: shadda goes before the vowel signs.
            27 => 28, // fathatan
            28 => 29, // dammatan
            29 => 30, // kasratan
            30 => 31, // fatha
            31 => 32, // damma
            32 => 33, // kasra
            33 => 27, // shadda
            34 => 34, // sukun
            35 => 35, // superscript alef

            // Syriac
            36 => 36, // superscript alaph

            // Telugu
            84 => 88, // length mark
            91 => 89, // ai length mark

            // Thai
            103 => 3, // sara u / sara uu

            // Lao
            118 => 118, // sign u / sign uu

            // Tibetan
            130 => 132, // sign i
            132 => 131, // sign u

            _ => cc,
        }
    }
}

// GlyphInfo packs the general category into one byte of its per-glyph
// scratch; these two stay in sync by construction.

pub(crate) fn gc_to_u8(gc: GeneralCategory) -> u8 {
    use GeneralCategory::*;
    match gc {
        ClosePunctuation => 0,
        ConnectorPunctuation => 1,
        Control => 2,
        CurrencySymbol => 3,
        DashPunctuation => 4,
        DecimalNumber => 5,
        EnclosingMark => 6,
        FinalPunctuation => 7,
        Format => 8,
        InitialPunctuation => 9,
        LetterNumber => 10,
        LineSeparator => 11,
        LowercaseLetter => 12,
        MathSymbol => 13,
        ModifierLetter => 14,
        ModifierSymbol => 15,
        NonspacingMark => 16,
        OpenPunctuation => 17,
        OtherLetter => 18,
        OtherNumber => 19,
        OtherPunctuation => 20,
        OtherSymbol => 21,
        ParagraphSeparator => 22,
        PrivateUse => 23,
        SpaceSeparator => 24,
        SpacingMark => 25,
        Surrogate => 26,
        TitlecaseLetter => 27,
        Unassigned => 28,
        UppercaseLetter => 29,
    }
}

pub(crate) fn gc_from_u8(v: u8) -> GeneralCategory {
    use GeneralCategory::*;
    match v {
        0 => ClosePunctuation,
        1 => ConnectorPunctuation,
        2 => Control,
        3 => CurrencySymbol,
        4 => DashPunctuation,
        5 => DecimalNumber,
        6 => EnclosingMark,
        7 => FinalPunctuation,
        8 => Format,
        9 => InitialPunctuation,
        10 => LetterNumber,
        11 => LineSeparator,
        12 => LowercaseLetter,
        13 => MathSymbol,
        14 => ModifierLetter,
        15 => ModifierSymbol,
        16 => NonspacingMark,
        17 => OpenPunctuation,
        18 => OtherLetter,
        19 => OtherNumber,
        20 => OtherPunctuation,
        21 => OtherSymbol,
        22 => ParagraphSeparator,
        23 => PrivateUse,
        24 => SpaceSeparator,
        25 => SpacingMark,
        26 => Surrogate,
        27 => TitlecaseLetter,
        29 => UppercaseLetter,
        _ => Unassigned,
    }
}

/// Returns `true` for scalars the variation-selector ranges cover.
pub fn is_variation_selector(c: u32) -> bool {
    matches!(c, 0x180B..=0x180D | 0xFE00..=0xFE0F | 0xE0100..=0xE01EF)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_ignorables() {
        assert!(CharExt::is_default_ignorable('\u{200D}')); // ZWJ
        assert!(CharExt::is_default_ignorable('\u{00AD}')); // SOFT HYPHEN
        assert!(!CharExt::is_default_ignorable('a'));
        assert!(!CharExt::is_default_ignorable('\u{0301}'));
    }

    #[test]
    fn combining_classes() {
        assert_eq!('\u{0301}'.combining_class(), 230); // COMBINING ACUTE
        assert_eq!('\u{0316}'.combining_class(), 220); // COMBINING GRAVE BELOW
        assert_eq!('a'.combining_class(), 0);
    }

    #[test]
    fn shadda_sorts_before_vowels() {
        // U+0651 SHADDA (ccc 33) must sort before U+064E FATHA (ccc 30)
        // in modified order.
        assert!(
            '\u{0651}'.modified_combining_class() < '\u{064E}'.modified_combining_class()
        );
    }

    #[test]
    fn mirroring() {
        assert_eq!('('.mirrored(), Some(')'));
        assert_eq!('a'.mirrored(), None);
    }
}
