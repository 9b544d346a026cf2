//! Sentence and word representation.
//!
//! A `Sentence` owns its text and the words tagged over it. It is never
//! edited in place: `with_replacement` returns a new sentence with the later
//! spans shifted, so the original is always available for comparison.

use serde::{Deserialize, Serialize};

use crate::error::{FlowError, Result};
use crate::inference::{Morphology, Pos, Span, TaggedToken};

/// What a word is, as far as editing is concerned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WordKind {
    /// Ordinary word, eligible for flagging and replacement
    Word,
    Punctuation,
    ProperNoun,
    Numeral,
}

/// One linguistic token with its byte span in the sentence text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Word {
    pub text: String,
    pub span: Span,
    pub pos: Pos,
    pub morph: Morphology,
    pub kind: WordKind,
}

impl Word {
    /// Only ordinary words are edit targets.
    pub fn is_editable(&self) -> bool {
        self.kind == WordKind::Word
    }

    pub fn is_punctuation(&self) -> bool {
        self.kind == WordKind::Punctuation
    }

    fn kind_of(token: &TaggedToken) -> WordKind {
        if token.is_punct || token.pos == Pos::Punct {
            WordKind::Punctuation
        } else if token.like_num || token.pos == Pos::Num {
            WordKind::Numeral
        } else if token.pos == Pos::Propn {
            WordKind::ProperNoun
        } else {
            WordKind::Word
        }
    }
}

/// Immutable tagged sentence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sentence {
    text: String,
    words: Vec<Word>,
}

impl Sentence {
    /// Build a sentence from tagger output.
    ///
    /// Tokens with empty or out-of-bounds spans, whitespace tokens and tokens
    /// overlapping an earlier one are dropped; word text is always the slice
    /// of `text` under the span.
    pub fn from_tagged(text: impl Into<String>, mut tokens: Vec<TaggedToken>) -> Self {
        let text = text.into();
        tokens.sort_by_key(|t| t.span.start);

        let mut words: Vec<Word> = Vec::with_capacity(tokens.len());
        for token in tokens {
            let span = token.span;
            let Some(surface) = text.get(span.start..span.end) else {
                log::warn!("Dropping token {:?} with span {}..{} outside text", token.text, span.start, span.end);
                continue;
            };
            if span.is_empty() || token.pos == Pos::Space || surface.chars().all(char::is_whitespace) {
                continue;
            }
            if words.last().is_some_and(|w| w.span.overlaps(&span)) {
                log::warn!("Dropping token {:?} overlapping previous word", token.text);
                continue;
            }

            words.push(Word {
                text: surface.to_string(),
                span,
                pos: token.pos,
                kind: Word::kind_of(&token),
                morph: token.morph,
            });
        }

        Self { text, words }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn words(&self) -> &[Word] {
        &self.words
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    pub fn word(&self, index: usize) -> Result<&Word> {
        self.words.get(index).ok_or(FlowError::WordOutOfRange {
            index,
            len: self.words.len(),
        })
    }

    /// New sentence with word `index` replaced by `replacement`.
    ///
    /// Tag and morphology of the replaced word are kept; every later span is
    /// shifted by the length difference.
    pub fn with_replacement(&self, index: usize, replacement: &str) -> Result<Sentence> {
        let target = self.word(index)?.span;
        let delta = replacement.len() as isize - target.len() as isize;

        let mut text = String::with_capacity(self.text.len() + replacement.len());
        text.push_str(&self.text[..target.start]);
        text.push_str(replacement);
        text.push_str(&self.text[target.end..]);

        let words = self
            .words
            .iter()
            .enumerate()
            .map(|(i, word)| match i.cmp(&index) {
                std::cmp::Ordering::Less => word.clone(),
                std::cmp::Ordering::Equal => Word {
                    text: replacement.to_string(),
                    span: Span::new(target.start, target.start + replacement.len()),
                    ..word.clone()
                },
                std::cmp::Ordering::Greater => Word {
                    span: word.span.shifted(delta),
                    ..word.clone()
                },
            })
            .collect();

        Ok(Sentence { text, words })
    }

    /// Words joined with the original gaps between them.
    pub fn reconstruct(&self) -> String {
        let mut out = String::with_capacity(self.text.len());
        let mut cursor = 0;
        for word in &self.words {
            out.push_str(&self.text[cursor..word.span.start]);
            out.push_str(&word.text);
            cursor = word.span.end;
        }
        out.push_str(&self.text[cursor..]);
        out
    }
}
