//! Filesystem-safe tokens from entity identifiers.
//!
//! Three schemes have been used to name entity folders over time. All of them
//! remain resolvable, so each is kept as a pure, total function.

use regex::Regex;
use std::sync::LazyLock;

/// A folder/file naming scheme.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Scheme {
    /// Lower-case, Cyrillic spelled out in Latin letters.
    Current,
    /// Lower-case, every non-ASCII letter replaced with `_`.
    LegacyAscii,
    /// Case preserved, Cyrillic kept as-is.
    LegacyUnicode,
}

impl Scheme {
    /// All schemes in resolution order.
    pub const ALL: [Scheme; 3] = [Scheme::Current, Scheme::LegacyAscii, Scheme::LegacyUnicode];

    pub fn as_str(&self) -> &'static str {
        match self {
            Scheme::Current => "current",
            Scheme::LegacyAscii => "legacy_ascii",
            Scheme::LegacyUnicode => "legacy_unicode",
        }
    }
}

static DISALLOWED_CURRENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^a-z0-9_-]+").unwrap());

static DISALLOWED_UNICODE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^A-Za-z0-9\x{0400}-\x{04FF}_-]+").unwrap());

static REPEATED_UNDERSCORES: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"_{2,}").unwrap());

/// Latin spelling of a lower-case Cyrillic letter.
fn latin_for(c: char) -> Option<&'static str> {
    let latin = match c {
        'а' => "a",
        'б' => "b",
        'в' => "v",
        'г' => "g",
        'д' => "d",
        'е' => "e",
        'ё' => "yo",
        'ж' => "zh",
        'з' => "z",
        'и' => "i",
        'й' => "y",
        'к' => "k",
        'л' => "l",
        'м' => "m",
        'н' => "n",
        'о' => "o",
        'п' => "p",
        'р' => "r",
        'с' => "s",
        'т' => "t",
        'у' => "u",
        'ф' => "f",
        'х' => "kh",
        'ц' => "ts",
        'ч' => "ch",
        'ш' => "sh",
        'щ' => "shch",
        'ъ' | 'ь' => "",
        'ы' => "y",
        'э' => "e",
        'ю' => "yu",
        'я' => "ya",
        'і' => "i",
        'ї' => "yi",
        'є' => "ye",
        'ґ' => "g",
        'ў' => "u",
        _ => return None,
    };
    Some(latin)
}

/// Map a raw identifier to a filesystem-safe token under `scheme`.
///
/// Never fails. Empty input yields an empty string, and applying the same
/// scheme to its own output changes nothing.
///
/// # Examples
///
/// ```
/// use catalog_media::naming::{transliterate, Scheme};
///
/// assert_eq!(transliterate("Шкаф-1", Scheme::Current), "shkaf-1");
/// assert_eq!(transliterate("Шкаф-1", Scheme::LegacyAscii), "_-1");
/// assert_eq!(transliterate("Шкаф 1", Scheme::LegacyUnicode), "Шкаф_1");
/// ```
pub fn transliterate(raw: &str, scheme: Scheme) -> String {
    if raw.is_empty() {
        return String::new();
    }
    match scheme {
        Scheme::Current => current(raw),
        Scheme::LegacyAscii => {
            let lower = raw.to_lowercase();
            DISALLOWED_CURRENT.replace_all(&lower, "_").into_owned()
        }
        Scheme::LegacyUnicode => DISALLOWED_UNICODE.replace_all(raw, "_").into_owned(),
    }
}

fn current(raw: &str) -> String {
    let mut spelled = String::with_capacity(raw.len());
    for c in raw.to_lowercase().chars() {
        match latin_for(c) {
            Some(latin) => spelled.push_str(latin),
            None => spelled.push(c),
        }
    }

    let replaced = DISALLOWED_CURRENT.replace_all(&spelled, "_");
    REPEATED_UNDERSCORES.replace_all(&replaced, "_").into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLES: &[&str] = &[
        "",
        "Шкаф-1",
        "ШКАФ купе 2000",
        "Стол_обеденный",
        "Ёлка",
        "ґанок їжак",
        "SKU-001/B",
        "  spaced  out  ",
        "mixed Кириллица and Latin",
        "__already__safe__",
        "Ünïcödé café",
        "тест!!!@@@###",
        "a\tb\nc",
    ];

    #[test]
    fn test_current_scheme() {
        assert_eq!(transliterate("Шкаф-1", Scheme::Current), "shkaf-1");
        assert_eq!(transliterate("ШКАФ купе 2000", Scheme::Current), "shkaf_kupe_2000");
        assert_eq!(transliterate("Щука Ёж", Scheme::Current), "shchuka_yozh");
        assert_eq!(transliterate("объект", Scheme::Current), "obekt");
        assert_eq!(transliterate("SKU-001/B", Scheme::Current), "sku-001_b");
        assert_eq!(transliterate("  spaced  out  ", Scheme::Current), "_spaced_out_");
        assert_eq!(transliterate(" Шкаф 1 ", Scheme::Current), "_shkaf_1_");
    }

    #[test]
    fn test_current_scheme_is_total() {
        // Nothing outside Latin and Cyrillic has a spelling; it still yields a name.
        assert_eq!(transliterate("日本", Scheme::Current), "_");
        assert_eq!(transliterate("№", Scheme::Current), "_");
        assert_eq!(transliterate("№5", Scheme::Current), "_5");
        for raw in SAMPLES.iter().filter(|r| !r.is_empty()) {
            assert!(!transliterate(raw, Scheme::Current).is_empty(), "{raw:?}");
        }
    }

    #[test]
    fn test_legacy_ascii_drops_script() {
        assert_eq!(transliterate("Шкаф-1", Scheme::LegacyAscii), "_-1");
        assert_eq!(transliterate("SKU 001", Scheme::LegacyAscii), "sku_001");
        assert_eq!(transliterate("Стол Т1", Scheme::LegacyAscii), "_1");
    }

    #[test]
    fn test_legacy_unicode_preserves_case_and_script() {
        assert_eq!(transliterate("Шкаф-1", Scheme::LegacyUnicode), "Шкаф-1");
        assert_eq!(transliterate("Шкаф  Купе", Scheme::LegacyUnicode), "Шкаф_Купе");
        assert_eq!(transliterate("SKU/001", Scheme::LegacyUnicode), "SKU_001");
    }

    #[test]
    fn test_empty_input() {
        for scheme in Scheme::ALL {
            assert_eq!(transliterate("", scheme), "");
        }
    }

    #[test]
    fn test_idempotent_for_every_scheme() {
        for scheme in Scheme::ALL {
            for raw in SAMPLES {
                let once = transliterate(raw, scheme);
                assert_eq!(transliterate(raw, scheme), once, "{raw:?} under {scheme:?}");
                assert_eq!(transliterate(&once, scheme), once, "{raw:?} under {scheme:?}");
            }
        }
    }

    #[test]
    fn test_output_character_sets() {
        for raw in SAMPLES {
            let current = transliterate(raw, Scheme::Current);
            assert!(current
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_' || c == '-'));
            assert!(!current.contains("__"));

            let ascii = transliterate(raw, Scheme::LegacyAscii);
            assert!(ascii
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_' || c == '-'));

            let unicode = transliterate(raw, Scheme::LegacyUnicode);
            assert!(unicode.chars().all(|c| c.is_ascii_alphanumeric()
                || ('\u{0400}'..='\u{04FF}').contains(&c)
                || c == '_'
                || c == '-'));
        }
    }
}
