//! Request/response types exchanged with the inference services

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Full-vocabulary logits at one position.
pub type Logits = Vec<f32>;

/// Byte range within a text, end exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.end <= self.start
    }

    /// True when the two spans share at least one byte.
    pub fn overlaps(&self, other: &Span) -> bool {
        self.start < other.end && other.start < self.end
    }

    /// Shift both ends by `delta` bytes.
    pub fn shifted(&self, delta: isize) -> Self {
        Self {
            start: self.start.saturating_add_signed(delta),
            end: self.end.saturating_add_signed(delta),
        }
    }
}

/// One subword piece produced by the masked-LM tokenizer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Piece {
    pub id: u32,
    /// Source bytes covered by the piece; `None` for special tokens.
    pub span: Option<Span>,
}

/// Tokenizer output for one text, special tokens included.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Encoding {
    pub pieces: Vec<Piece>,
}

impl Encoding {
    pub fn ids(&self) -> Vec<u32> {
        self.pieces.iter().map(|p| p.id).collect()
    }

    pub fn len(&self) -> usize {
        self.pieces.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pieces.is_empty()
    }
}

/// A masked input plus the positions whose distributions are wanted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaskedQuery {
    pub input_ids: Vec<u32>,
    pub positions: Vec<usize>,
}

impl MaskedQuery {
    pub fn single(input_ids: Vec<u32>, position: usize) -> Self {
        Self {
            input_ids,
            positions: vec![position],
        }
    }
}

/// Vocabulary entry as seen by the candidate generator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VocabToken {
    /// Surface text with tokenizer markers stripped
    pub text: String,
    /// False for subword continuation pieces
    pub starts_word: bool,
}

/// Entailment label, premise → hypothesis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntailmentLabel {
    Entailment,
    Neutral,
    Contradiction,
}

impl EntailmentLabel {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntailmentLabel::Entailment => "entailment",
            EntailmentLabel::Neutral => "neutral",
            EntailmentLabel::Contradiction => "contradiction",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EntailmentVerdict {
    pub label: EntailmentLabel,
    pub confidence: f32,
}

/// Universal POS tag (coarse category).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Pos {
    Adj,
    Adp,
    Adv,
    Aux,
    Cconj,
    Det,
    Intj,
    Noun,
    Num,
    Part,
    Pron,
    Propn,
    Punct,
    Sconj,
    Sym,
    Verb,
    Space,
    #[serde(other)]
    X,
}

impl Pos {
    pub fn as_str(&self) -> &'static str {
        match self {
            Pos::Adj => "ADJ",
            Pos::Adp => "ADP",
            Pos::Adv => "ADV",
            Pos::Aux => "AUX",
            Pos::Cconj => "CCONJ",
            Pos::Det => "DET",
            Pos::Intj => "INTJ",
            Pos::Noun => "NOUN",
            Pos::Num => "NUM",
            Pos::Part => "PART",
            Pos::Pron => "PRON",
            Pos::Propn => "PROPN",
            Pos::Punct => "PUNCT",
            Pos::Sconj => "SCONJ",
            Pos::Sym => "SYM",
            Pos::Verb => "VERB",
            Pos::Space => "SPACE",
            Pos::X => "X",
        }
    }
}

impl fmt::Display for Pos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Morphological features, e.g. `Number=Sing`, `Tense=Past`.
pub type Morphology = BTreeMap<String, String>;

/// One token from the POS/morphology tagger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaggedToken {
    pub text: String,
    pub span: Span,
    pub pos: Pos,
    #[serde(default)]
    pub morph: Morphology,
    #[serde(default)]
    pub is_punct: bool,
    #[serde(default)]
    pub like_num: bool,
}
