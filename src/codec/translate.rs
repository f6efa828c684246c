//! Text to Morse and back.

use crate::codec::symbol::{LETTER_SEPARATOR, MorseSymbol, WORD_SEPARATOR};
use crate::codec::table::{Glyph, MorseCodeTable, Prosign};
use crate::defaults::UNKNOWN_PLACEHOLDER;

/// One encoded glyph and its code group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EncodedGlyph {
    pub glyph: Glyph,
    pub code: &'static str,
}

/// Result of [`MorseCodec::encode_text`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EncodedText {
    /// Encoded words, each a list of glyphs.
    pub words: Vec<Vec<EncodedGlyph>>,
    /// Input characters with no table entry, in input order.
    pub skipped: Vec<char>,
}

impl EncodedText {
    /// Textual code: letters joined by `/`, words by `///`.
    pub fn code(&self) -> String {
        self.words
            .iter()
            .map(|word| {
                word.iter()
                    .map(|g| g.code)
                    .collect::<Vec<_>>()
                    .join(LETTER_SEPARATOR)
            })
            .collect::<Vec<_>>()
            .join(WORD_SEPARATOR)
    }

    /// Symbol stream with explicit letter and word gaps.
    pub fn symbols(&self) -> Vec<MorseSymbol> {
        let mut symbols = Vec::new();
        for (w, word) in self.words.iter().enumerate() {
            if w > 0 {
                symbols.push(MorseSymbol::WordGap);
            }
            for (l, glyph) in word.iter().enumerate() {
                if l > 0 {
                    symbols.push(MorseSymbol::LetterGap);
                }
                symbols.extend(MorseSymbol::parse_sequence(glyph.code));
            }
        }
        symbols
    }

    /// The text that was actually encoded (uppercased, unknowns dropped).
    pub fn text(&self) -> String {
        self.words
            .iter()
            .map(|word| word.iter().map(|g| g.glyph.to_string()).collect::<String>())
            .collect::<Vec<_>>()
            .join(" ")
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }
}

/// Bidirectional text/Morse translator backed by the shared table.
#[derive(Debug, Clone, Copy)]
pub struct MorseCodec {
    table: &'static MorseCodeTable,
}

impl Default for MorseCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl MorseCodec {
    pub fn new() -> Self {
        Self {
            table: MorseCodeTable::global(),
        }
    }

    pub fn table(&self) -> &'static MorseCodeTable {
        self.table
    }

    /// Encodes text, uppercasing it and splitting words on whitespace.
    ///
    /// `[START]` and `[END]` inside a word encode as their prosigns.
    /// Characters without a table entry are skipped and reported in
    /// [`EncodedText::skipped`]; words that end up empty are dropped.
    pub fn encode_text(&self, text: &str) -> EncodedText {
        let upper = text.to_uppercase();
        let mut encoded = EncodedText::default();

        for word in upper.split_whitespace() {
            let mut glyphs = Vec::new();
            let mut rest = word;
            'chars: while let Some(ch) = rest.chars().next() {
                if ch == '[' {
                    for prosign in Prosign::ALL {
                        if let Some(after) = rest.strip_prefix(prosign.token()) {
                            glyphs.push(EncodedGlyph {
                                glyph: Glyph::Control(prosign),
                                code: self.table.code_for_prosign(prosign),
                            });
                            rest = after;
                            continue 'chars;
                        }
                    }
                }

                match self.table.code_for_char(ch) {
                    Some(code) => glyphs.push(EncodedGlyph {
                        glyph: Glyph::Char(ch),
                        code,
                    }),
                    None => {
                        log::debug!("no morse code for {:?}, skipping", ch);
                        encoded.skipped.push(ch);
                    }
                }
                rest = &rest[ch.len_utf8()..];
            }

            if !glyphs.is_empty() {
                encoded.words.push(glyphs);
            }
        }

        encoded
    }

    /// Decodes the textual form (`/` between letters, `///` between words).
    ///
    /// Groups missing from the table decode to [`UNKNOWN_PLACEHOLDER`], so
    /// a partial result is always returned.
    pub fn decode(&self, code: &str) -> String {
        let code = code.trim();
        let code = code.strip_suffix(WORD_SEPARATOR).unwrap_or(code);

        code.split(WORD_SEPARATOR)
            .filter(|word| !word.is_empty())
            .map(|word| {
                word.split(LETTER_SEPARATOR)
                    .map(str::trim)
                    .filter(|group| !group.is_empty())
                    .map(|group| match self.table.glyph(group) {
                        Some(glyph) => glyph.to_string(),
                        None => UNKNOWN_PLACEHOLDER.to_string(),
                    })
                    .collect::<String>()
            })
            .filter(|word| !word.is_empty())
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Decodes a symbol stream such as classifier output.
    pub fn decode_symbols(&self, symbols: &[MorseSymbol]) -> String {
        self.decode(&MorseSymbol::to_code_string(symbols))
    }

    /// Code group for one character, if it has one.
    pub fn lookup_code(&self, ch: char) -> Option<&'static str> {
        self.table.code_for_char(ch)
    }

    /// Glyph for one code group, if it has one.
    pub fn lookup_glyph(&self, code: &str) -> Option<Glyph> {
        self.table.glyph(code)
    }
}
