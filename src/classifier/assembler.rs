//! Turns keyed `(press, gap)` pairs into decoded text.

use crate::classifier::adaptive::{AdaptiveClassifier, Classification};
use crate::codec::{LETTER_SEPARATOR, MorseCodec, MorseSymbol, WORD_SEPARATOR};
use crate::defaults;

/// Text and code completed by one [`ReceiveAssembler`] call.
///
/// Concatenating every increment yields the full received code and text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AssembledOutput {
    pub code: String,
    pub text: String,
}

impl AssembledOutput {
    pub fn is_empty(&self) -> bool {
        self.code.is_empty() && self.text.is_empty()
    }

    fn push(&mut self, other: AssembledOutput) {
        self.code.push_str(&other.code);
        self.text.push_str(&other.text);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Boundary {
    None,
    Letter,
    Word,
}

/// Classifies presses and groups them into letters and words by the gap
/// that precedes each press.
#[derive(Debug, Clone)]
pub struct ReceiveAssembler {
    classifier: AdaptiveClassifier,
    codec: MorseCodec,
    letter_gap_ms: f64,
    word_gap_ms: f64,
    pending: Vec<MorseSymbol>,
    boundary: Boundary,
    last: Option<Classification>,
}

impl ReceiveAssembler {
    pub fn new(classifier: AdaptiveClassifier) -> Self {
        Self {
            classifier,
            codec: MorseCodec::new(),
            letter_gap_ms: defaults::LETTER_GAP_MS as f64,
            word_gap_ms: defaults::WORD_GAP_MS as f64,
            pending: Vec::new(),
            boundary: Boundary::None,
            last: None,
        }
    }

    /// Sets the gaps (ms) at or above which a letter or word is closed.
    pub fn with_gaps(mut self, letter_gap_ms: f64, word_gap_ms: f64) -> Self {
        self.letter_gap_ms = letter_gap_ms;
        self.word_gap_ms = word_gap_ms.max(letter_gap_ms);
        self
    }

    /// Feeds one press and the silence that preceded it.
    ///
    /// Returns whatever letter the gap completed; the press itself stays
    /// pending until the next gap or [`flush`](Self::flush).
    pub fn push(&mut self, press_ms: f64, gap_before_ms: f64) -> AssembledOutput {
        let mut out = AssembledOutput::default();

        if gap_before_ms >= self.word_gap_ms {
            out.push(self.close_letter());
            if self.boundary != Boundary::None {
                self.boundary = Boundary::Word;
            }
        } else if gap_before_ms >= self.letter_gap_ms {
            out.push(self.close_letter());
        }

        let classification = self.classifier.classify(press_ms);
        self.pending.push(classification.symbol);
        self.last = Some(classification);
        out
    }

    /// Closes the pending letter, e.g. when the sender goes idle.
    pub fn flush(&mut self) -> AssembledOutput {
        self.close_letter()
    }

    fn close_letter(&mut self) -> AssembledOutput {
        let mut out = AssembledOutput::default();
        if self.pending.is_empty() {
            return out;
        }

        let group = MorseSymbol::to_code_string(&self.pending);
        self.pending.clear();
        let letter = match self.codec.lookup_glyph(&group) {
            Some(glyph) => glyph.to_string(),
            None => {
                log::debug!("received unknown group {group}");
                defaults::UNKNOWN_PLACEHOLDER.to_string()
            }
        };

        match self.boundary {
            Boundary::Word => {
                out.code.push_str(WORD_SEPARATOR);
                out.text.push(' ');
            }
            Boundary::Letter => out.code.push_str(LETTER_SEPARATOR),
            Boundary::None => {}
        }
        out.code.push_str(&group);
        out.text.push_str(&letter);
        self.boundary = Boundary::Letter;
        out
    }

    /// Drops pending symbols and resets the classifier.
    pub fn reset(&mut self) {
        self.pending.clear();
        self.boundary = Boundary::None;
        self.last = None;
        self.classifier.reset();
    }

    /// Symbols of the letter still being keyed.
    pub fn pending(&self) -> &[MorseSymbol] {
        &self.pending
    }

    /// Classification of the most recent press.
    pub fn last_classification(&self) -> Option<Classification> {
        self.last
    }

    pub fn classifier(&self) -> &AdaptiveClassifier {
        &self.classifier
    }
}
