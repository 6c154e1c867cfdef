use core::fmt;
use core::str::FromStr;

/// A feature/script mask type.
pub type Mask = u32;

/// A four-byte table/feature/script tag.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Tag(pub u32);

impl Tag {
    #[inline]
    pub const fn from_bytes(bytes: &[u8; 4]) -> Self {
        Tag(((bytes[0] as u32) << 24)
            | ((bytes[1] as u32) << 16)
            | ((bytes[2] as u32) << 8)
            | (bytes[3] as u32))
    }

    /// Parses a tag from a string, padding with spaces when shorter than
    /// four bytes. Returns `None` for an empty string.
    pub fn from_bytes_lossy(bytes: &[u8]) -> Option<Self> {
        if bytes.is_empty() {
            return None;
        }

        let mut array = [b' '; 4];
        for (i, c) in bytes.iter().take(4).enumerate() {
            array[i] = *c;
        }

        Some(Tag::from_bytes(&array))
    }

    #[inline]
    pub fn to_bytes(self) -> [u8; 4] {
        [
            (self.0 >> 24 & 0xff) as u8,
            (self.0 >> 16 & 0xff) as u8,
            (self.0 >> 8 & 0xff) as u8,
            (self.0 & 0xff) as u8,
        ]
    }

    #[inline]
    pub const fn as_u32(self) -> u32 {
        self.0
    }
}

impl fmt::Debug for Tag {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let b = self.to_bytes();
        write!(
            f,
            "Tag({}{}{}{})",
            b[0] as char, b[1] as char, b[2] as char, b[3] as char
        )
    }
}

impl FromStr for Tag {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Tag::from_bytes_lossy(s.as_bytes()).ok_or("tag is empty")
    }
}

/// Direction of a text run.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum Direction {
    LeftToRight,
    RightToLeft,
    TopToBottom,
    BottomToTop,
}

impl Direction {
    #[inline]
    pub fn is_horizontal(self) -> bool {
        matches!(self, Direction::LeftToRight | Direction::RightToLeft)
    }

    #[inline]
    pub fn is_vertical(self) -> bool {
        !self.is_horizontal()
    }

    #[inline]
    pub fn is_forward(self) -> bool {
        matches!(self, Direction::LeftToRight | Direction::TopToBottom)
    }

    #[inline]
    pub fn is_backward(self) -> bool {
        !self.is_forward()
    }

    #[inline]
    pub fn reverse(self) -> Self {
        match self {
            Direction::LeftToRight => Direction::RightToLeft,
            Direction::RightToLeft => Direction::LeftToRight,
            Direction::TopToBottom => Direction::BottomToTop,
            Direction::BottomToTop => Direction::TopToBottom,
        }
    }

    /// The horizontal direction a script is natively written in.
    ///
    /// Vertical-only scripts (e.g. Mongolian) return `None`.
    pub fn from_script(script: Script) -> Option<Self> {
        match script {
            script::ARABIC
            | script::HEBREW
            | script::SYRIAC
            | script::THAANA
            | script::NKO
            | script::SAMARITAN
            | script::MANDAIC
            | script::ADLAM
            | script::HANIFI_ROHINGYA
            | script::YEZIDI => Some(Direction::RightToLeft),

            script::MONGOLIAN | script::PHAGS_PA => None,

            _ => Some(Direction::LeftToRight),
        }
    }
}

/// A text script, named by its ISO 15924 tag.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct Script(pub(crate) Tag);

impl Script {
    #[inline]
    pub const fn from_tag(tag: Tag) -> Self {
        Script(tag)
    }

    #[inline]
    pub fn tag(self) -> Tag {
        self.0
    }

    /// Detects the script of a character.
    pub fn from_char(c: char) -> Self {
        use unicode_script::{self as us, UnicodeScript};

        match c.script() {
            us::Script::Arabic => script::ARABIC,
            us::Script::Bengali => script::BENGALI,
            us::Script::Devanagari => script::DEVANAGARI,
            us::Script::Gujarati => script::GUJARATI,
            us::Script::Gurmukhi => script::GURMUKHI,
            us::Script::Hangul => script::HANGUL,
            us::Script::Hebrew => script::HEBREW,
            us::Script::Kannada => script::KANNADA,
            us::Script::Khmer => script::KHMER,
            us::Script::Lao => script::LAO,
            us::Script::Malayalam => script::MALAYALAM,
            us::Script::Mongolian => script::MONGOLIAN,
            us::Script::Myanmar => script::MYANMAR,
            us::Script::Nko => script::NKO,
            us::Script::Oriya => script::ORIYA,
            us::Script::Sinhala => script::SINHALA,
            us::Script::Syriac => script::SYRIAC,
            us::Script::Tamil => script::TAMIL,
            us::Script::Telugu => script::TELUGU,
            us::Script::Thai => script::THAI,
            us::Script::Latin => script::LATIN,
            us::Script::Greek => script::GREEK,
            us::Script::Cyrillic => script::CYRILLIC,
            _ => script::UNKNOWN,
        }
    }
}

impl FromStr for Script {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let tag = Tag::from_bytes_lossy(s.as_bytes()).ok_or("script is empty")?;
        Ok(Script(tag))
    }
}

/// Script constants, named by ISO 15924.
pub mod script {
    #![allow(missing_docs)]

    use super::{Script, Tag};

    macro_rules! scripts {
        ($($name:ident => $tag:expr,)+) => {
            $(pub const $name: Script = Script(Tag::from_bytes($tag));)+
        }
    }

    scripts! {
        ADLAM => b"Adlm",
        ARABIC => b"Arab",
        BENGALI => b"Beng",
        CYRILLIC => b"Cyrl",
        DEVANAGARI => b"Deva",
        GREEK => b"Grek",
        GUJARATI => b"Gujr",
        GURMUKHI => b"Guru",
        HANGUL => b"Hang",
        HANIFI_ROHINGYA => b"Rohg",
        HEBREW => b"Hebr",
        KANNADA => b"Knda",
        KHMER => b"Khmr",
        LAO => b"Laoo",
        LATIN => b"Latn",
        MALAYALAM => b"Mlym",
        MANDAIC => b"Mand",
        MONGOLIAN => b"Mong",
        MYANMAR => b"Mymr",
        NKO => b"Nkoo",
        ORIYA => b"Orya",
        PHAGS_PA => b"Phag",
        SAMARITAN => b"Samr",
        SINHALA => b"Sinh",
        SYRIAC => b"Syrc",
        TAMIL => b"Taml",
        TELUGU => b"Telu",
        THAANA => b"Thaa",
        THAI => b"Thai",
        UNKNOWN => b"Zzzz",
        YEZIDI => b"Yezi",
    }
}

/// An opaque language tag.
///
/// Only the first four bytes take part in OpenType language-system
/// matching; anything after a `-` subtag separator is ignored.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct Language(pub(crate) Tag);

impl Language {
    #[inline]
    pub fn tag(self) -> Tag {
        self.0
    }
}

impl FromStr for Language {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let primary = s.split('-').next().unwrap_or(s);
        let mut bytes = [b' '; 4];
        if primary.is_empty() || primary.len() > 4 {
            return Err("unsupported language tag");
        }

        for (i, c) in primary.bytes().enumerate() {
            bytes[i] = c.to_ascii_uppercase();
        }

        Ok(Language(Tag::from_bytes(&bytes)))
    }
}

/// A user-requested feature setting. A value of zero disables the feature.
#[derive(Clone, Copy, PartialEq, Debug)]
pub struct Feature {
    pub tag: Tag,
    pub value: u32,
}

impl Feature {
    #[inline]
    pub fn new(tag: Tag, value: u32) -> Self {
        Feature { tag, value }
    }
}

impl FromStr for Feature {
    type Err = &'static str;

    /// Supports `kern`, `+kern`, `-kern` and `kern=0` / `kern=1` forms.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err("feature is empty");
        }

        let (s, mut value) = match s.as_bytes()[0] {
            b'-' => (&s[1..], 0),
            b'+' => (&s[1..], 1),
            _ => (s, 1),
        };

        let (name, eq_value) = match s.find('=') {
            Some(idx) => (&s[..idx], Some(&s[idx + 1..])),
            None => (s, None),
        };

        if let Some(v) = eq_value {
            value = v.parse::<u32>().map_err(|_| "invalid feature value")?;
        }

        let tag = Tag::from_bytes_lossy(name.as_bytes()).ok_or("feature is empty")?;
        Ok(Feature { tag, value })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tag_round_trip() {
        let tag = Tag::from_bytes(b"liga");
        assert_eq!(tag.to_bytes(), *b"liga");
        assert_eq!("liga".parse::<Tag>().unwrap(), tag);
        assert_eq!("ab".parse::<Tag>().unwrap(), Tag::from_bytes(b"ab  "));
    }

    #[test]
    fn feature_parsing() {
        assert_eq!("kern".parse::<Feature>().unwrap().value, 1);
        assert_eq!("-kern".parse::<Feature>().unwrap().value, 0);
        assert_eq!("+kern".parse::<Feature>().unwrap().value, 1);
        assert_eq!("kern=0".parse::<Feature>().unwrap().value, 0);
        assert_eq!("aalt=3".parse::<Feature>().unwrap().value, 3);
        assert!("".parse::<Feature>().is_err());
    }

    #[test]
    fn script_direction() {
        assert_eq!(
            Direction::from_script(script::ARABIC),
            Some(Direction::RightToLeft)
        );
        assert_eq!(
            Direction::from_script(script::DEVANAGARI),
            Some(Direction::LeftToRight)
        );
        assert_eq!(Direction::from_script(script::MONGOLIAN), None);
    }

    #[test]
    fn language_subtags() {
        let l: Language = "tr-TR".parse().unwrap();
        assert_eq!(l.tag(), Tag::from_bytes(b"TR  "));
    }
}
