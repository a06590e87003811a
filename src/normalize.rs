//! Kazakh Cyrillic case folding.
//!
//! One finite table maps every uppercase code unit of the Kazakh alphabet
//! (the basic Cyrillic block plus Ғ Қ Ө Ү Ә І Ң Һ) to its lowercase form.
//! Normalization is the single source of truth for word equality: every
//! user-dictionary key is normalized, and prefix searches normalize their
//! argument before lookup.

use crate::unicode::{decode_utf8, encode_utf16, EncodingError};

/// Lowercase a single UTF-16 code unit; non-table units pass through.
pub fn normalize_unit(unit: u16) -> u16 {
    match unit {
        // А..Я → а..я (U+0410..U+042F → U+0430..U+044F).
        0x0410..=0x042F => unit + 0x20,
        0x0492 => 0x0493, // Ғ → ғ
        0x049A => 0x049B, // Қ → қ
        0x04E8 => 0x04E9, // Ө → ө
        0x04AE => 0x04AF, // Ү → ү
        0x04D8 => 0x04D9, // Ә → ә
        0x0406 => 0x0456, // І → і
        0x04A2 => 0x04A3, // Ң → ң
        0x04B0 => 0x04B1, // Һ → һ
        _ => unit,
    }
}

/// Lowercase a UTF-16 sequence in place-order.
pub fn normalize_units(units: &[u16]) -> Vec<u16> {
    units.iter().map(|&u| normalize_unit(u)).collect()
}

/// Kazakh-lowercase a UTF-8 string.
pub fn normalize(s: &str) -> String {
    // A &str is already valid UTF-8, so the codec cannot fail here.
    normalize_bytes(s.as_bytes()).unwrap_or_default()
}

/// Kazakh-lowercase raw UTF-8 bytes, validating them on the way.
pub fn normalize_bytes(bytes: &[u8]) -> Result<String, EncodingError> {
    let units = decode_utf8(bytes)?;
    encode_utf16(&normalize_units(&units))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lowercases_basic_block() {
        assert_eq!(normalize("АЛМА"), "алма");
        assert_eq!(normalize("Сәлем ЖҮР"), "сәлем жүр");
    }

    #[test]
    fn lowercases_kazakh_letters() {
        assert_eq!(normalize("ҒҚӨҮӘІҢҺ"), "ғқөүәіңһ");
    }

    #[test]
    fn passes_through_non_table_units() {
        assert_eq!(normalize("abc 123 қ!"), "abc 123 қ!");
        assert_eq!(normalize("мәтін"), "мәтін");
    }

    #[test]
    fn idempotent() {
        for s in ["АЛМА", "Ғарыш", "сөз", "Qazaq Іс"] {
            let once = normalize(s);
            assert_eq!(normalize(&once), once);
        }
    }

    #[test]
    fn empty() {
        assert_eq!(normalize(""), "");
    }
}
