//! Text encodings used by the client: base-37 names and packed chat text.

use crate::error::ProtocolError;

pub const MAX_NAME_LENGTH: usize = 12;

/// Longest chat line, in characters, before compression truncates it.
pub const MAX_CHAT_LENGTH: usize = 80;

/// Characters ordered by frequency; the first 13 pack into a single nibble.
pub const FREQUENCY_ORDERED_CHARS: [char; 61] = [
    ' ', 'e', 't', 'a', 'o', 'i', 'h', 'n', 's', 'r', 'd', 'l', 'u', 'm', 'w', 'c', 'y', 'f', 'g',
    'p', 'b', 'v', 'k', 'x', 'j', 'q', 'z', '0', '1', '2', '3', '4', '5', '6', '7', '8', '9', ' ',
    '!', '?', '.', ',', ':', ';', '(', ')', '-', '&', '*', '\\', '\'', '@', '#', '+', '=', '\u{a3}',
    '$', '%', '"', '[', ']',
];

/// Encodes a player name as a base-37 number.
///
/// Letters are case-insensitive, `_` encodes as zero and trailing zero digits
/// are dropped, so `"bob_"` and `"bob"` encode identically.
pub fn encode_base37(name: &str) -> Result<u64, ProtocolError> {
    if name.is_empty() || name.chars().count() > MAX_NAME_LENGTH {
        return Err(ProtocolError::InvalidName(name.to_owned()));
    }

    let mut encoded: u64 = 0;
    for c in name.chars() {
        encoded *= 37;
        encoded += match c {
            'A'..='Z' => c as u64 - 'A' as u64 + 1,
            'a'..='z' => c as u64 - 'a' as u64 + 1,
            '0'..='9' => c as u64 - '0' as u64 + 27,
            '_' => 0,
            _ => return Err(ProtocolError::InvalidName(name.to_owned())),
        };
    }

    while encoded % 37 == 0 && encoded != 0 {
        encoded /= 37;
    }
    Ok(encoded)
}

pub fn decode_base37(mut value: u64) -> String {
    let mut chars = Vec::with_capacity(MAX_NAME_LENGTH);
    while value != 0 {
        let remainder = (value % 37) as u8;
        value /= 37;
        chars.push(match remainder {
            1..=26 => (b'a' + remainder - 1) as char,
            27..=36 => (b'0' + remainder - 27) as char,
            _ => '_',
        });
    }
    chars.iter().rev().collect()
}

fn table_position(c: char) -> usize {
    FREQUENCY_ORDERED_CHARS
        .iter()
        .position(|&candidate| candidate == c)
        .unwrap_or(0)
}

/// Packs chat text into the client's nibble encoding.
pub fn compress(text: &str) -> Vec<u8> {
    let text: String = text.chars().take(MAX_CHAT_LENGTH).collect::<String>().to_lowercase();
    let mut out = Vec::with_capacity(text.len());
    let mut carry: Option<usize> = None;

    for c in text.chars() {
        let mut position = table_position(c);
        if position > 12 {
            position += 195;
        }
        match carry {
            None if position < 13 => carry = Some(position),
            None => out.push(position as u8),
            Some(high) if position < 13 => {
                out.push(((high << 4) + position) as u8);
                carry = None;
            }
            Some(high) => {
                out.push(((high << 4) + (position >> 4)) as u8);
                carry = Some(position & 0xF);
            }
        }
    }
    if let Some(high) = carry {
        out.push((high << 4) as u8);
    }
    out
}

/// Unpacks chat text. Nibble pairs that point outside the table are skipped.
pub fn decompress(data: &[u8]) -> String {
    let mut out = String::with_capacity(data.len() * 2);
    let mut carry: Option<usize> = None;

    for i in 0..data.len() * 2 {
        let nibble = ((data[i / 2] >> (4 - 4 * (i % 2))) & 0xF) as usize;
        match carry {
            None if nibble < 13 => out.push(FREQUENCY_ORDERED_CHARS[nibble]),
            None => carry = Some(nibble),
            Some(high) => {
                let position = ((high << 4) + nibble).checked_sub(195);
                if let Some(&c) = position.and_then(|p| FREQUENCY_ORDERED_CHARS.get(p)) {
                    out.push(c);
                }
                carry = None;
            }
        }
    }
    out
}

/// Lower-cases `text` and drops every character the chat table cannot encode.
pub fn filter_invalid_characters(text: &str) -> String {
    text.to_lowercase()
        .chars()
        .filter(|c| FREQUENCY_ORDERED_CHARS.contains(c))
        .collect()
}

/// Upper-cases the first non-whitespace character of every sentence.
pub fn capitalize(text: &str) -> String {
    let mut capitalize = true;
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(c, '.' | '!' | '?') {
            capitalize = true;
            out.push(c);
        } else if capitalize && !c.is_whitespace() {
            out.extend(c.to_uppercase());
            capitalize = false;
        } else {
            out.push(c);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base37_known_values() {
        assert_eq!(encode_base37("a").unwrap(), 1);
        assert_eq!(encode_base37("A").unwrap(), 1);
        assert_eq!(encode_base37("ba").unwrap(), 2 * 37 + 1);
        assert_eq!(encode_base37("9").unwrap(), 36);
    }

    #[test]
    fn base37_strips_trailing_underscores() {
        assert_eq!(encode_base37("bob_").unwrap(), encode_base37("bob").unwrap());
        assert_eq!(decode_base37(encode_base37("Mod_Ash").unwrap()), "mod_ash");
    }

    #[test]
    fn base37_rejects_bad_names() {
        assert!(encode_base37("").is_err());
        assert!(encode_base37("has space").is_err());
        assert!(encode_base37("thirteenchars").is_err());
        assert!(encode_base37("twelve_chars").is_ok());
    }

    #[test]
    fn chat_roundtrip() {
        let packed = compress("hello world!");
        assert_eq!(decompress(&packed), "hello world!");
    }

    #[test]
    fn chat_compression_lowercases_and_truncates() {
        let long = "A".repeat(100);
        assert_eq!(decompress(&compress(&long)), "a".repeat(80));
    }

    #[test]
    fn common_letters_share_a_byte() {
        assert_eq!(compress("ee"), vec![0x11]);
        assert_eq!(compress("e").len(), 1);
    }

    #[test]
    fn filter_drops_unknown_characters() {
        assert_eq!(filter_invalid_characters("Hi~ there^"), "hi there");
    }

    #[test]
    fn capitalize_sentences() {
        assert_eq!(capitalize("hello. how are you? fine"), "Hello. How are you? Fine");
    }
}
