//! Morse symbols and their textual form.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Separator placed between letters in the textual form.
pub const LETTER_SEPARATOR: &str = "/";

/// Separator placed between words in the textual form.
pub const WORD_SEPARATOR: &str = "///";

/// One element of a Morse stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MorseSymbol {
    Dot,
    Dash,
    LetterGap,
    WordGap,
    Unknown,
}

impl MorseSymbol {
    /// Textual form used by the codec (`.`, `-`, `/`, `///`, `?`).
    pub fn as_str(self) -> &'static str {
        match self {
            MorseSymbol::Dot => ".",
            MorseSymbol::Dash => "-",
            MorseSymbol::LetterGap => LETTER_SEPARATOR,
            MorseSymbol::WordGap => WORD_SEPARATOR,
            MorseSymbol::Unknown => "?",
        }
    }

    /// True for the keyed elements (dot and dash).
    pub fn is_element(self) -> bool {
        matches!(self, MorseSymbol::Dot | MorseSymbol::Dash)
    }

    /// Tokenizes the textual form into symbols.
    ///
    /// `///` is read greedily as a word gap, a lone `/` (or `//`) as letter
    /// gaps. Whitespace is ignored and any other character becomes
    /// [`MorseSymbol::Unknown`].
    pub fn parse_sequence(code: &str) -> Vec<MorseSymbol> {
        let mut symbols = Vec::with_capacity(code.len());
        let mut rest = code;
        while let Some(ch) = rest.chars().next() {
            if rest.starts_with(WORD_SEPARATOR) {
                symbols.push(MorseSymbol::WordGap);
                rest = &rest[WORD_SEPARATOR.len()..];
                continue;
            }
            match ch {
                '.' => symbols.push(MorseSymbol::Dot),
                '-' => symbols.push(MorseSymbol::Dash),
                '/' => symbols.push(MorseSymbol::LetterGap),
                c if c.is_whitespace() => {}
                _ => symbols.push(MorseSymbol::Unknown),
            }
            rest = &rest[ch.len_utf8()..];
        }
        symbols
    }

    /// Joins symbols back into the textual form.
    pub fn to_code_string(symbols: &[MorseSymbol]) -> String {
        symbols.iter().map(|s| s.as_str()).collect()
    }
}

impl fmt::Display for MorseSymbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
