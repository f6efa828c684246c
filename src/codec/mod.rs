//! Morse code table and text translation.

pub mod symbol;
pub mod table;
pub mod translate;

pub use symbol::{LETTER_SEPARATOR, MorseSymbol, WORD_SEPARATOR};
pub use table::{Glyph, MorseCodeTable, Prosign};
pub use translate::{EncodedGlyph, EncodedText, MorseCodec};
