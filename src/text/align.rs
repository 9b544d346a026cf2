//! Word ↔ subword-piece alignment.

use std::ops::Range;

use super::sentence::Sentence;
use crate::inference::Encoding;

/// Contiguous run of piece indices (into the encoding) covering one word.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubwordSpan {
    pub start: usize,
    pub end: usize,
}

impl SubwordSpan {
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.end <= self.start
    }

    pub fn positions(&self) -> Range<usize> {
        self.start..self.end
    }
}

/// Piece spans for every word of a sentence.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Alignment {
    spans: Vec<Option<SubwordSpan>>,
    /// Words with no subword piece; never scored or edited
    pub excluded: Vec<usize>,
}

impl Alignment {
    pub fn span(&self, word: usize) -> Option<SubwordSpan> {
        self.spans.get(word).copied().flatten()
    }

    pub fn is_aligned(&self, word: usize) -> bool {
        self.span(word).is_some()
    }

    pub fn len(&self) -> usize {
        self.spans.len()
    }

    pub fn is_empty(&self) -> bool {
        self.spans.is_empty()
    }
}

/// Map each word to the pieces whose byte span overlaps it.
///
/// A piece belongs to the first word it overlaps, so a piece straddling two
/// words is never masked twice. Pieces without spans (special tokens) are
/// skipped.
pub fn align(sentence: &Sentence, encoding: &Encoding) -> Alignment {
    let words = sentence.words();
    let mut spans: Vec<Option<SubwordSpan>> = vec![None; words.len()];
    let mut cursor = 0;

    for (piece_index, piece) in encoding.pieces.iter().enumerate() {
        let Some(piece_span) = piece.span else {
            continue;
        };
        if piece_span.is_empty() {
            continue;
        }

        while cursor < words.len() && words[cursor].span.end <= piece_span.start {
            cursor += 1;
        }
        let Some(word) = words.get(cursor) else {
            break;
        };
        if !word.span.overlaps(&piece_span) {
            continue;
        }

        match &mut spans[cursor] {
            Some(span) if span.end == piece_index => span.end += 1,
            Some(_) => {
                log::debug!("Non-contiguous piece {} for word {:?}, ignored", piece_index, word.text);
            }
            slot @ None => {
                *slot = Some(SubwordSpan {
                    start: piece_index,
                    end: piece_index + 1,
                });
            }
        }

        // A piece running past this word's end belongs to it alone
        if piece_span.end > word.span.end {
            cursor += 1;
        }
    }

    let excluded: Vec<usize> = spans
        .iter()
        .enumerate()
        .filter(|(_, span)| span.is_none())
        .map(|(i, _)| i)
        .collect();
    for &index in &excluded {
        let word = &words[index];
        log::warn!(
            "Excluding word {:?} at {}..{}: no subword pieces",
            word.text,
            word.span.start,
            word.span.end
        );
    }

    Alignment { spans, excluded }
}
