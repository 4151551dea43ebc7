//! Character map: in-image text alphabet ⇄ Unicode text.
//!
//! # Alphabet
//! Three arithmetic ranges cover the bulk of the alphabet:
//!
//! | Text      | Image bytes      |
//! |-----------|------------------|
//! | `A`..=`Z` | `0x80`..=`0x99`  |
//! | `a`..=`z` | `0xA0`..=`0xB9`  |
//! | `0`..=`9` | `0xF6`..=`0xFF`  |
//!
//! Everything else is a sparse table of special glyphs.  Some glyphs decode
//! to more than one character (`0xE1` is `PK`, `0xD4` is `'s`); those can be
//! decoded but never produced by [`encode`], which works one character at a
//! time.
//!
//! # Terminators
//! `0x50` ends a string.  `0x00` also stops decoding, because unused name
//! bytes in real saves are zero-filled.  Fixed-width fields are padded with
//! [`PADDING`] after the terminator.
//!
//! # Reverse lookup
//! The text → byte table for special glyphs is built once, on first use.
//! When several bytes decode to the same glyph the first one declared in
//! [`SPECIAL_GLYPHS`] wins.  Bytes that [`decode`] can never emit (the
//! terminator and `0x00`) are left out of it.

use std::collections::HashMap;
use std::sync::OnceLock;

use thiserror::Error;

// ── Frozen alphabet constants ───────────────────────────────────────────────

/// End-of-string marker.
pub const TERMINATOR: u8 = 0x50;
/// Filler written after the terminator in fixed-width fields.
pub const PADDING:    u8 = 0x00;
/// Emitted by [`decode`] for bytes with no mapping.
pub const PLACEHOLDER: char = '~';

pub const UPPER_START: u8 = 0x80;
pub const LOWER_START: u8 = 0xA0;
pub const DIGIT_START: u8 = 0xF6;

/// Special glyphs, in declaration order.
///
/// Order is significant: [`encode`] resolves a character to the first byte
/// listed here whose glyph equals it.
pub const SPECIAL_GLYPHS: &[(u8, &str)] = &[
    // Unown glyph; unreachable through decode since 0x00 stops the string.
    (0x00, "?"),

    (0xBA, " "),
    (0xBB, " "),
    (0xBC, " "),
    (0xBD, " "),
    (0xBE, " "),
    (0xBF, " "),

    (0x60, "       "),
    (0x61, "▲"),
    (0x6E, "ぃ"),
    (0x6F, "ぅ"),

    (0x70, "PO"),
    (0x71, "Ké"),
    (0x72, "“"),
    (0x73, "”"),
    (0x74, "・"),
    (0x75, "…"),
    (0x76, "ぁ"),
    (0x77, "ぇ"),
    (0x78, "ぉ"),

    (0x9A, "("),
    (0x9B, ")"),
    (0x9C, ":"),
    (0x9D, ";"),
    (0x9E, "["),
    (0x9F, "]"),

    (0xC0, "Ä"),
    (0xC1, "Ö"),
    (0xC2, "Ü"),
    (0xC3, "ä"),
    (0xC4, "ö"),
    (0xC5, "ü"),

    (0xD0, "'d"),
    (0xD1, "'l"),
    (0xD2, "'m"),
    (0xD3, "'r"),
    (0xD4, "'s"),
    (0xD5, "'t"),
    (0xD6, "'v"),

    (0xE1, "PK"),
    (0xE2, "MN"),
    (0xE3, "-"),
    (0xE6, "?"),
    (0xE7, "!"),
    (0xE8, "."),
    (0xE9, "&"),
    (0xEA, "é"),
    (0xEC, "▷"),
    (0xED, "▶"),
    (0xEE, "▼"),
    (0xEF, "♂"),

    (0xF1, "×"),
    (0xF3, "/"),
    (0xF5, "♀"),
];

// ── Error type ───────────────────────────────────────────────────────────────

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CharsetError {
    #[error("Character {ch:?} at position {position} has no in-image encoding")]
    UnsupportedCharacter { ch: char, position: usize },
    /// The encoded text plus terminator does not fit.  `truncated` holds the
    /// field-sized encoding that would result from cutting the text short, so
    /// the caller can decide whether to accept it.
    #[error("Encoded text needs {needed} bytes but the field holds {capacity}")]
    TextTooLong { needed: usize, capacity: usize, truncated: Vec<u8> },
}

// ── Lookup tables ────────────────────────────────────────────────────────────

struct Tables {
    glyphs:  [Option<&'static str>; 256],
    reverse: HashMap<char, u8>,
}

fn tables() -> &'static Tables {
    static TABLES: OnceLock<Tables> = OnceLock::new();
    TABLES.get_or_init(|| {
        let mut glyphs = [None; 256];
        let mut reverse = HashMap::new();
        for &(byte, glyph) in SPECIAL_GLYPHS {
            if glyphs[byte as usize].is_none() {
                glyphs[byte as usize] = Some(glyph);
            }
            if is_stop_byte(byte) {
                continue;
            }
            let mut chars = glyph.chars();
            if let (Some(ch), None) = (chars.next(), chars.next()) {
                reverse.entry(ch).or_insert(byte);
            }
        }
        Tables { glyphs, reverse }
    })
}

#[inline]
fn is_stop_byte(byte: u8) -> bool {
    byte == TERMINATOR || byte == 0x00
}

/// Glyph for a special byte, if it has one.
pub fn glyph(byte: u8) -> Option<&'static str> {
    tables().glyphs[byte as usize]
}

// ── Decode / encode ─────────────────────────────────────────────────────────

/// Decode in-image bytes up to the first terminator (or `0x00`).
///
/// Never fails: unmapped bytes become [`PLACEHOLDER`].
pub fn decode(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len());
    for &b in bytes {
        match b {
            0x80..=0x99 => out.push((b - UPPER_START + b'A') as char),
            0xA0..=0xB9 => out.push((b - LOWER_START + b'a') as char),
            0xF6..=0xFF => out.push((b - DIGIT_START + b'0') as char),
            b if is_stop_byte(b) => break,
            b => match glyph(b) {
                Some(g) => out.push_str(g),
                None    => out.push(PLACEHOLDER),
            },
        }
    }
    out
}

/// Encode text to in-image bytes.  No terminator is appended.
pub fn encode(text: &str) -> Result<Vec<u8>, CharsetError> {
    let reverse = &tables().reverse;
    text.chars()
        .enumerate()
        .map(|(position, ch)| match ch {
            'A'..='Z' => Ok(ch as u8 - b'A' + UPPER_START),
            'a'..='z' => Ok(ch as u8 - b'a' + LOWER_START),
            '0'..='9' => Ok(ch as u8 - b'0' + DIGIT_START),
            _ => reverse
                .get(&ch)
                .copied()
                .ok_or(CharsetError::UnsupportedCharacter { ch, position }),
        })
        .collect()
}

/// Encode text into a field of exactly `size` bytes: text, terminator, then
/// [`PADDING`].
pub fn encode_fixed(text: &str, size: usize) -> Result<Vec<u8>, CharsetError> {
    let mut bytes = encode(text)?;
    let needed = bytes.len() + 1;
    if needed > size {
        let mut truncated = bytes;
        truncated.truncate(size.saturating_sub(1));
        if size > 0 {
            truncated.push(TERMINATOR);
        }
        return Err(CharsetError::TextTooLong { needed, capacity: size, truncated });
    }
    bytes.push(TERMINATOR);
    bytes.resize(size, PADDING);
    Ok(bytes)
}
