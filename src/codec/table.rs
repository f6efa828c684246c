//! The Morse code table.
//!
//! A bijective mapping between code groups (`.`/`-` strings) and glyphs,
//! built once and shared read-only for the life of the process.

use std::collections::HashMap;
use std::fmt;
use std::sync::LazyLock;

/// Framing markers sent as a single run-together code group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Prosign {
    /// Start of message (`-.-.-`).
    MessageStart,
    /// End of work (`...-.-`).
    MessageEnd,
}

impl Prosign {
    /// Bracketed token used for the prosign in plain text.
    pub fn token(self) -> &'static str {
        match self {
            Prosign::MessageStart => "[START]",
            Prosign::MessageEnd => "[END]",
        }
    }

    pub const ALL: [Prosign; 2] = [Prosign::MessageStart, Prosign::MessageEnd];
}

/// What a code group stands for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Glyph {
    Char(char),
    Control(Prosign),
}

impl fmt::Display for Glyph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Glyph::Char(c) => write!(f, "{}", c),
            Glyph::Control(p) => f.write_str(p.token()),
        }
    }
}

const ENTRIES: &[(&str, Glyph)] = &[
    // Letters
    (".-", Glyph::Char('A')),
    ("-...", Glyph::Char('B')),
    ("-.-.", Glyph::Char('C')),
    ("-..", Glyph::Char('D')),
    (".", Glyph::Char('E')),
    ("..-.", Glyph::Char('F')),
    ("--.", Glyph::Char('G')),
    ("....", Glyph::Char('H')),
    ("..", Glyph::Char('I')),
    (".---", Glyph::Char('J')),
    ("-.-", Glyph::Char('K')),
    (".-..", Glyph::Char('L')),
    ("--", Glyph::Char('M')),
    ("-.", Glyph::Char('N')),
    ("---", Glyph::Char('O')),
    (".--.", Glyph::Char('P')),
    ("--.-", Glyph::Char('Q')),
    (".-.", Glyph::Char('R')),
    ("...", Glyph::Char('S')),
    ("-", Glyph::Char('T')),
    ("..-", Glyph::Char('U')),
    ("...-", Glyph::Char('V')),
    (".--", Glyph::Char('W')),
    ("-..-", Glyph::Char('X')),
    ("-.--", Glyph::Char('Y')),
    ("--..", Glyph::Char('Z')),
    // Digits
    ("-----", Glyph::Char('0')),
    (".----", Glyph::Char('1')),
    ("..---", Glyph::Char('2')),
    ("...--", Glyph::Char('3')),
    ("....-", Glyph::Char('4')),
    (".....", Glyph::Char('5')),
    ("-....", Glyph::Char('6')),
    ("--...", Glyph::Char('7')),
    ("---..", Glyph::Char('8')),
    ("----.", Glyph::Char('9')),
    // Punctuation
    (".-.-.-", Glyph::Char('.')),
    ("--..--", Glyph::Char(',')),
    ("..--..", Glyph::Char('?')),
    (".----.", Glyph::Char('\'')),
    ("-.-.--", Glyph::Char('!')),
    ("-..-.", Glyph::Char('/')),
    ("-.--.", Glyph::Char('(')),
    ("-.--.-", Glyph::Char(')')),
    (".-...", Glyph::Char('&')),
    ("---...", Glyph::Char(':')),
    ("-.-.-.", Glyph::Char(';')),
    ("-...-", Glyph::Char('=')),
    (".-..-.", Glyph::Char('"')),
    ("...-..-", Glyph::Char('$')),
    (".--.-.", Glyph::Char('@')),
    ("..--.-", Glyph::Char('_')),
    ("-....-", Glyph::Char('-')),
    // Framing
    ("-.-.-", Glyph::Control(Prosign::MessageStart)),
    ("...-.-", Glyph::Control(Prosign::MessageEnd)),
    // Non-standard extensions, kept as literal mappings
    (".-.-..", Glyph::Char('¶')),
    ("........", Glyph::Char('\u{FFFD}')),
    ("-.-..", Glyph::Char('¿')),
    ("--.-.", Glyph::Char('¡')),
];

/// Two-way lookup between code groups and glyphs.
#[derive(Debug)]
pub struct MorseCodeTable {
    by_code: HashMap<&'static str, Glyph>,
    by_glyph: HashMap<Glyph, &'static str>,
}

static TABLE: LazyLock<MorseCodeTable> = LazyLock::new(MorseCodeTable::build);

impl MorseCodeTable {
    /// The process-wide table.
    pub fn global() -> &'static MorseCodeTable {
        &TABLE
    }

    fn build() -> Self {
        let mut by_code = HashMap::with_capacity(ENTRIES.len());
        let mut by_glyph = HashMap::with_capacity(ENTRIES.len());
        for &(code, glyph) in ENTRIES {
            let previous_glyph = by_code.insert(code, glyph);
            let previous_code = by_glyph.insert(glyph, code);
            assert!(
                previous_glyph.is_none() && previous_code.is_none(),
                "duplicate morse table entry {code} <-> {glyph:?}"
            );
        }
        Self { by_code, by_glyph }
    }

    /// Glyph for a code group, if the group is in the table.
    pub fn glyph(&self, code: &str) -> Option<Glyph> {
        self.by_code.get(code).copied()
    }

    /// Code group for a character. Letters are matched case-insensitively.
    pub fn code_for_char(&self, ch: char) -> Option<&'static str> {
        let upper = ch.to_uppercase().next().unwrap_or(ch);
        self.by_glyph.get(&Glyph::Char(upper)).copied()
    }

    /// Code group for a prosign.
    pub fn code_for_prosign(&self, prosign: Prosign) -> &'static str {
        // Every prosign is listed in ENTRIES.
        self.by_glyph
            .get(&Glyph::Control(prosign))
            .copied()
            .unwrap_or_default()
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.by_code.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_code.is_empty()
    }

    /// All entries in table order.
    pub fn entries(&self) -> impl Iterator<Item = (&'static str, Glyph)> {
        ENTRIES.iter().copied()
    }
}
