//! Strict UTF-8 ↔ UTF-16 / UTF-32 conversion.
//!
//! Keyboard input crosses the host boundary as raw bytes, and the
//! user-dictionary file stores length-prefixed byte fields, so every
//! conversion here validates in full: malformed lead bytes, truncated
//! sequences, bad continuation bytes, overlong encodings, code points above
//! U+10FFFF and lone surrogates all fail with [`EncodingError`] and produce
//! no partial output.

/// A byte or code-unit sequence that is not valid in the claimed encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum EncodingError {
    #[error("malformed text at offset {offset}")]
    BadEncoding { offset: usize },
}

fn bad(offset: usize) -> EncodingError {
    EncodingError::BadEncoding { offset }
}

/// Decode strict UTF-8 into UTF-16 code units (surrogate pairs above U+FFFF).
pub fn decode_utf8(bytes: &[u8]) -> Result<Vec<u16>, EncodingError> {
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        let (cp, len) = next_code_point(bytes, i)?;
        if cp >= 0x10000 {
            let v = cp - 0x10000;
            out.push(0xD800 + (v >> 10) as u16);
            out.push(0xDC00 + (v & 0x3FF) as u16);
        } else {
            out.push(cp as u16);
        }
        i += len;
    }
    Ok(out)
}

/// Decode strict UTF-8 into code points, for edit-distance and candidate work.
pub fn decode_utf32(bytes: &[u8]) -> Result<Vec<char>, EncodingError> {
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        let (cp, len) = next_code_point(bytes, i)?;
        out.push(char::from_u32(cp).ok_or_else(|| bad(i))?);
        i += len;
    }
    Ok(out)
}

/// Encode UTF-16 code units as UTF-8. Unpaired surrogates are rejected.
pub fn encode_utf16(units: &[u16]) -> Result<String, EncodingError> {
    let mut out = String::with_capacity(units.len() * 3);
    let mut i = 0;
    while i < units.len() {
        let c = units[i];
        if (0xD800..=0xDBFF).contains(&c) {
            let low = *units.get(i + 1).ok_or_else(|| bad(i))?;
            if !(0xDC00..=0xDFFF).contains(&low) {
                return Err(bad(i));
            }
            let cp = 0x10000 + (((c as u32 - 0xD800) << 10) | (low as u32 - 0xDC00));
            out.push(char::from_u32(cp).ok_or_else(|| bad(i))?);
            i += 2;
        } else if (0xDC00..=0xDFFF).contains(&c) {
            return Err(bad(i));
        } else {
            out.push(char::from_u32(c as u32).ok_or_else(|| bad(i))?);
            i += 1;
        }
    }
    Ok(out)
}

/// Decode one scalar value starting at `i`, returning `(code_point, byte_len)`.
///
/// Overlong forms are treated as invalid, matching the "shortest form only"
/// rule, so `C0 80` is a hard error rather than an alias for NUL.
fn next_code_point(bytes: &[u8], i: usize) -> Result<(u32, usize), EncodingError> {
    let b0 = bytes[i];
    match b0 {
        0x00..=0x7F => Ok((b0 as u32, 1)),
        0xC0..=0xDF => {
            let b1 = continuation(bytes, i, 1)?;
            let cp = ((b0 as u32 & 0x1F) << 6) | b1;
            if cp < 0x80 {
                return Err(bad(i));
            }
            Ok((cp, 2))
        }
        0xE0..=0xEF => {
            let b1 = continuation(bytes, i, 1)?;
            let b2 = continuation(bytes, i, 2)?;
            let cp = ((b0 as u32 & 0x0F) << 12) | (b1 << 6) | b2;
            if cp < 0x800 || (0xD800..=0xDFFF).contains(&cp) {
                return Err(bad(i));
            }
            Ok((cp, 3))
        }
        0xF0..=0xF7 => {
            let b1 = continuation(bytes, i, 1)?;
            let b2 = continuation(bytes, i, 2)?;
            let b3 = continuation(bytes, i, 3)?;
            let cp = ((b0 as u32 & 0x07) << 18) | (b1 << 12) | (b2 << 6) | b3;
            if !(0x10000..=0x10FFFF).contains(&cp) {
                return Err(bad(i));
            }
            Ok((cp, 4))
        }
        // Stray continuation byte or the always-invalid 0xF8..=0xFF range.
        _ => Err(bad(i)),
    }
}

fn continuation(bytes: &[u8], start: usize, offset: usize) -> Result<u32, EncodingError> {
    let b = *bytes.get(start + offset).ok_or_else(|| bad(start))?;
    if b & 0xC0 != 0x80 {
        return Err(bad(start));
    }
    Ok((b & 0x3F) as u32)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrip_ascii_and_cyrillic() {
        for s in ["", "hello", "сәлем", "қазақша мәтін", "I і"] {
            let units = decode_utf8(s.as_bytes()).unwrap();
            assert_eq!(encode_utf16(&units).unwrap(), s);
        }
    }

    #[test]
    fn roundtrip_astral() {
        let s = "😀𐍈";
        let units = decode_utf8(s.as_bytes()).unwrap();
        assert_eq!(units.len(), 4); // two surrogate pairs
        assert_eq!(encode_utf16(&units).unwrap(), s);
    }

    #[test]
    fn utf32_matches_chars() {
        let s = "сөз😀";
        let cps = decode_utf32(s.as_bytes()).unwrap();
        assert_eq!(cps, s.chars().collect::<Vec<_>>());
    }

    #[test]
    fn rejects_overlong() {
        // Overlong NUL and overlong '/'.
        assert!(decode_utf8(&[0xC0, 0x80]).is_err());
        assert!(decode_utf8(&[0xE0, 0x80, 0xAF]).is_err());
    }

    #[test]
    fn rejects_truncated_sequences() {
        assert!(decode_utf8(&[0xD2]).is_err()); // lead of "ғ" alone
        assert!(decode_utf8(&[0xE2, 0x82]).is_err()); // 3-byte lead, 1 continuation
        assert!(decode_utf8(&[0xF0, 0x9F, 0x98]).is_err());
    }

    #[test]
    fn rejects_bad_continuation_and_stray_bytes() {
        assert!(decode_utf8(&[0xD2, 0x00]).is_err());
        assert!(decode_utf8(&[0x80]).is_err());
        assert!(decode_utf8(&[0xFF]).is_err());
    }

    #[test]
    fn rejects_surrogates_and_out_of_range() {
        // U+D800 encoded directly.
        assert!(decode_utf8(&[0xED, 0xA0, 0x80]).is_err());
        // U+110000.
        assert!(decode_utf8(&[0xF4, 0x90, 0x80, 0x80]).is_err());
    }

    #[test]
    fn rejects_lone_surrogate_units() {
        assert!(encode_utf16(&[0xD800]).is_err());
        assert!(encode_utf16(&[0xDC00]).is_err());
        assert!(encode_utf16(&[0xD800, 0x0041]).is_err());
    }

    #[test]
    fn empty_input_is_empty_output() {
        assert!(decode_utf8(b"").unwrap().is_empty());
        assert!(decode_utf32(b"").unwrap().is_empty());
        assert_eq!(encode_utf16(&[]).unwrap(), "");
    }
}
