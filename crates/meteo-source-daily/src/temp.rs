//! Temperature cell parsing
//!
//! The daily page renders temperatures with a trailing degree marker
//! and a typographic minus (U+2212), and its feed occasionally swaps
//! plain digits for lookalike glyphs from other Unicode blocks. The
//! primary path is ordinary numeric parsing after normalization; the
//! secondary path recovers swapped digits one-by-one from their Unicode
//! character names and is reported distinctly so callers can tell the
//! two apart.

use meteo_core::error::{Error, Result};

use crate::FEED;

/// Which parse path produced a temperature value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TempParse {
    /// Ordinary numeric parse after normalization.
    Direct,
    /// Best-effort glyph-name recovery; callers log when this happens.
    Recovered,
}

/// Parse a raw temperature cell.
///
/// Strips a trailing degree marker, normalizes U+2212 to the ASCII
/// minus, and falls back to digit-name inference when the normalized
/// text still fails to parse. A cell neither path can read is a fatal
/// temperature error.
pub fn parse_temperature(raw: &str) -> Result<(f64, TempParse)> {
    let cleaned = raw
        .trim()
        .trim_end_matches('°')
        .trim_end()
        .replace('\u{2212}', "-");
    if let Ok(value) = cleaned.parse() {
        return Ok((value, TempParse::Direct));
    }
    let rebuilt =
        recover_digits(&cleaned).ok_or_else(|| Error::temperature(FEED, raw))?;
    let value = rebuilt
        .parse()
        .map_err(|_| Error::temperature(FEED, raw))?;
    Ok((value, TempParse::Recovered))
}

/// Replace every non-ASCII character by the digit its Unicode name
/// spells, or give up.
fn recover_digits(text: &str) -> Option<String> {
    let mut rebuilt = String::with_capacity(text.len());
    for ch in text.chars() {
        if ch.is_ascii() {
            rebuilt.push(ch);
        } else {
            rebuilt.push(digit_from_name(ch)?);
        }
    }
    Some(rebuilt)
}

const DIGIT_TOKENS: [&str; 10] = [
    "ZERO", "ONE", "TWO", "THREE", "FOUR", "FIVE", "SIX", "SEVEN", "EIGHT", "NINE",
];

/// The digit whose name appears as a token in `ch`'s Unicode name
/// (`MATHEMATICAL BOLD DIGIT FIVE` → `5`).
fn digit_from_name(ch: char) -> Option<char> {
    let name = unicode_names2::name(ch)?.to_string();
    name.split([' ', '-'])
        .find_map(|token| DIGIT_TOKENS.iter().position(|t| *t == token))
        .and_then(|digit| char::from_digit(digit as u32, 10))
}
