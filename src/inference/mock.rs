//! Deterministic in-process models for tests and offline demos.
//!
//! - `MockMaskedLm` predicts from a small weighted corpus: a masked position
//!   receives the weight of every corpus sentence of the same length that
//!   agrees with the query on all but `tolerance` unmasked positions.
//! - `MockTagger` tags from a lexicon.
//! - `MockEmbedder` embeds a bag of concepts, synonyms sharing one dimension.
//! - `MockEntailment` reports contradiction when an antonym pair is swapped.
//!
//! Every mock can be switched offline to simulate an unavailable service.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use sha2::{Digest, Sha256};
use unicode_segmentation::UnicodeSegmentation;

use super::client::{EntailmentModel, InferenceError, MaskedLanguageModel, PosTagger, SentenceEmbedder};
use super::types::{
    Encoding, EntailmentLabel, EntailmentVerdict, Logits, MaskedQuery, Morphology, Piece, Pos, Span, TaggedToken,
    VocabToken,
};

pub const BOS_ID: u32 = 0;
pub const EOS_ID: u32 = 1;
pub const MASK_ID: u32 = 2;
pub const UNK_ID: u32 = 3;

/// Continuation pieces padding the vocabulary so flat distributions are wide.
const FILLER_PIECES: usize = 100;

/// Logit given to special tokens so they never win a prediction.
const SPECIAL_LOGIT: f32 = -20.0;

/// Embedding width of `MockEmbedder`.
pub const EMBEDDING_DIM: usize = 1024;

/// Non-whitespace word-boundary segments with their byte offsets.
fn segments(text: &str) -> impl Iterator<Item = (usize, &str)> {
    text.split_word_bound_indices()
        .filter(|(_, s)| !s.chars().all(char::is_whitespace))
}

fn offline(service: &str) -> InferenceError {
    InferenceError::Unavailable(format!("{} is offline", service))
}

#[derive(Debug, Clone)]
struct CorpusSentence {
    ids: Vec<u32>,
    weight: f32,
}

/// Builder for `MockMaskedLm`.
#[derive(Debug, Default)]
pub struct MockMaskedLmBuilder {
    sentences: Vec<(String, f32)>,
    words: Vec<String>,
    splits: Vec<(String, Vec<String>)>,
    tolerance: usize,
}

impl MockMaskedLmBuilder {
    /// Add a fluent corpus sentence; `weight` is added to the logit of each
    /// of its tokens wherever the sentence matches a query.
    pub fn sentence(mut self, text: impl Into<String>, weight: f32) -> Self {
        self.sentences.push((text.into(), weight));
        self
    }

    /// Add vocabulary words that appear in no corpus sentence.
    pub fn words(mut self, words: &[&str]) -> Self {
        self.words.extend(words.iter().map(|w| w.to_string()));
        self
    }

    /// Tokenize `word` as several pieces; the first starts the word.
    pub fn split(mut self, word: impl Into<String>, pieces: &[&str]) -> Self {
        self.splits
            .push((word.into(), pieces.iter().map(|p| p.to_string()).collect()));
        self
    }

    /// Unmasked positions allowed to disagree with a matching corpus sentence.
    pub fn tolerance(mut self, tolerance: usize) -> Self {
        self.tolerance = tolerance;
        self
    }

    pub fn build(self) -> MockMaskedLm {
        let mut lm = MockMaskedLm {
            vocab: Vec::new(),
            index: HashMap::new(),
            continuation_index: HashMap::new(),
            splits: HashMap::new(),
            corpus: Vec::new(),
            tolerance: self.tolerance,
            online: AtomicBool::new(true),
            predict_calls: AtomicUsize::new(0),
        };

        for special in ["<s>", "</s>", "<mask>", "<unk>"] {
            lm.push_token(special, false);
        }
        for i in 0..FILLER_PIECES {
            lm.push_token(&format!("##f{:03}", i), false);
        }

        for (word, pieces) in &self.splits {
            let mut ids = Vec::with_capacity(pieces.len());
            for (i, piece) in pieces.iter().enumerate() {
                let id = if i == 0 {
                    lm.word_id(piece)
                } else {
                    lm.continuation_id(piece)
                };
                ids.push(id);
            }
            lm.splits.insert(word.clone(), (pieces.clone(), ids));
        }

        for word in &self.words {
            if !lm.splits.contains_key(word) {
                lm.word_id(word);
            }
        }
        for (text, _) in &self.sentences {
            for (_, segment) in segments(text) {
                if !lm.splits.contains_key(segment) {
                    lm.word_id(segment);
                }
            }
        }

        for (text, weight) in &self.sentences {
            let ids = lm.encode(text).ids();
            lm.corpus.push(CorpusSentence { ids, weight: *weight });
        }

        lm
    }
}

/// Corpus-driven masked language model.
#[derive(Debug)]
pub struct MockMaskedLm {
    vocab: Vec<VocabToken>,
    index: HashMap<String, u32>,
    continuation_index: HashMap<String, u32>,
    splits: HashMap<String, (Vec<String>, Vec<u32>)>,
    corpus: Vec<CorpusSentence>,
    tolerance: usize,
    online: AtomicBool,
    predict_calls: AtomicUsize,
}

impl MockMaskedLm {
    pub fn builder() -> MockMaskedLmBuilder {
        MockMaskedLmBuilder::default()
    }

    pub fn set_online(&self, online: bool) {
        self.online.store(online, Ordering::SeqCst);
    }

    /// Number of `predict` calls served so far.
    pub fn predict_calls(&self) -> usize {
        self.predict_calls.load(Ordering::SeqCst)
    }

    /// Id of a word-initial token, if the word is in the vocabulary.
    pub fn token_id(&self, word: &str) -> Option<u32> {
        self.index.get(word).copied()
    }

    fn push_token(&mut self, text: &str, starts_word: bool) -> u32 {
        let id = self.vocab.len() as u32;
        self.vocab.push(VocabToken {
            text: text.to_string(),
            starts_word,
        });
        id
    }

    fn word_id(&mut self, word: &str) -> u32 {
        if let Some(id) = self.index.get(word) {
            return *id;
        }
        let id = self.push_token(word, true);
        self.index.insert(word.to_string(), id);
        id
    }

    fn continuation_id(&mut self, piece: &str) -> u32 {
        if let Some(id) = self.continuation_index.get(piece) {
            return *id;
        }
        let id = self.push_token(piece, false);
        self.continuation_index.insert(piece.to_string(), id);
        id
    }

    fn encode(&self, text: &str) -> Encoding {
        let mut pieces = vec![Piece { id: BOS_ID, span: None }];

        for (start, segment) in segments(text) {
            if let Some((texts, ids)) = self.splits.get(segment) {
                let mut offset = start;
                let end = start + segment.len();
                for (piece_text, id) in texts.iter().zip(ids) {
                    let piece_end = (offset + piece_text.len()).min(end);
                    pieces.push(Piece {
                        id: *id,
                        span: Some(Span::new(offset, piece_end)),
                    });
                    offset = piece_end;
                }
                continue;
            }

            let id = self.index.get(segment).copied().unwrap_or(UNK_ID);
            pieces.push(Piece {
                id,
                span: Some(Span::new(start, start + segment.len())),
            });
        }

        pieces.push(Piece { id: EOS_ID, span: None });
        Encoding { pieces }
    }

    fn logits_at(&self, input_ids: &[u32], position: usize) -> Logits {
        let mut logits = vec![0.0f32; self.vocab.len()];
        for special in [BOS_ID, EOS_ID, MASK_ID, UNK_ID] {
            logits[special as usize] = SPECIAL_LOGIT;
        }

        for sentence in &self.corpus {
            if sentence.ids.len() != input_ids.len() {
                continue;
            }
            let mismatches = input_ids
                .iter()
                .zip(&sentence.ids)
                .filter(|(query, corpus)| **query != MASK_ID && query != corpus)
                .count();
            if mismatches <= self.tolerance {
                logits[sentence.ids[position] as usize] += sentence.weight;
            }
        }

        logits
    }
}

#[async_trait]
impl MaskedLanguageModel for MockMaskedLm {
    fn mask_token_id(&self) -> u32 {
        MASK_ID
    }

    fn vocab_size(&self) -> usize {
        self.vocab.len()
    }

    async fn tokenize(&self, text: &str) -> Result<Encoding, InferenceError> {
        if !self.online.load(Ordering::SeqCst) {
            return Err(offline("masked language model"));
        }
        Ok(self.encode(text))
    }

    async fn decode(&self, ids: &[u32]) -> Result<Vec<VocabToken>, InferenceError> {
        if !self.online.load(Ordering::SeqCst) {
            return Err(offline("masked language model"));
        }
        ids.iter()
            .map(|id| {
                self.vocab
                    .get(*id as usize)
                    .cloned()
                    .ok_or_else(|| InferenceError::InvalidResponse(format!("unknown token id {}", id)))
            })
            .collect()
    }

    async fn predict(&self, queries: &[MaskedQuery]) -> Result<Vec<Vec<Logits>>, InferenceError> {
        if !self.online.load(Ordering::SeqCst) {
            return Err(offline("masked language model"));
        }
        self.predict_calls.fetch_add(1, Ordering::SeqCst);

        queries
            .iter()
            .map(|query| {
                query
                    .positions
                    .iter()
                    .map(|&position| {
                        if position >= query.input_ids.len() {
                            return Err(InferenceError::InvalidResponse(format!(
                                "position {} beyond input of length {}",
                                position,
                                query.input_ids.len()
                            )));
                        }
                        Ok(self.logits_at(&query.input_ids, position))
                    })
                    .collect()
            })
            .collect()
    }
}

/// Lexicon-driven POS/morphology tagger.
#[derive(Debug)]
pub struct MockTagger {
    lexicon: HashMap<String, (Pos, Morphology)>,
    online: AtomicBool,
}

impl Default for MockTagger {
    fn default() -> Self {
        Self::new()
    }
}

impl MockTagger {
    pub fn new() -> Self {
        Self {
            lexicon: HashMap::new(),
            online: AtomicBool::new(true),
        }
    }

    /// Register a word (case-insensitive) with its tag and features.
    pub fn word(mut self, word: &str, pos: Pos, features: &[(&str, &str)]) -> Self {
        let morph = features
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        self.lexicon.insert(word.to_lowercase(), (pos, morph));
        self
    }

    /// Register several words sharing one tag and feature set.
    pub fn words(mut self, words: &[&str], pos: Pos, features: &[(&str, &str)]) -> Self {
        for word in words {
            self = self.word(word, pos, features);
        }
        self
    }

    pub fn set_online(&self, online: bool) {
        self.online.store(online, Ordering::SeqCst);
    }

    fn tag_segment(&self, start: usize, segment: &str) -> TaggedToken {
        let span = Span::new(start, start + segment.len());
        let is_punct = !segment.chars().any(char::is_alphanumeric);
        let like_num = !is_punct
            && segment
                .chars()
                .all(|c| c.is_ascii_digit() || c == '.' || c == ',');

        let (pos, morph) = if is_punct {
            (Pos::Punct, Morphology::new())
        } else if like_num {
            (Pos::Num, Morphology::new())
        } else {
            self.lexicon
                .get(&segment.to_lowercase())
                .cloned()
                .unwrap_or((Pos::X, Morphology::new()))
        };

        TaggedToken {
            text: segment.to_string(),
            span,
            pos,
            morph,
            is_punct,
            like_num,
        }
    }
}

#[async_trait]
impl PosTagger for MockTagger {
    async fn tag(&self, text: &str) -> Result<Vec<TaggedToken>, InferenceError> {
        if !self.online.load(Ordering::SeqCst) {
            return Err(offline("tagger"));
        }
        Ok(segments(text)
            .map(|(start, segment)| self.tag_segment(start, segment))
            .collect())
    }
}

/// Bag-of-concepts sentence embedder.
#[derive(Debug)]
pub struct MockEmbedder {
    canonical: HashMap<String, String>,
    online: AtomicBool,
}

impl Default for MockEmbedder {
    fn default() -> Self {
        Self::new()
    }
}

impl MockEmbedder {
    pub fn new() -> Self {
        Self {
            canonical: HashMap::new(),
            online: AtomicBool::new(true),
        }
    }

    /// Words in one group map to the same embedding dimension.
    pub fn synonyms(mut self, group: &[&str]) -> Self {
        if let Some(head) = group.first() {
            let head = head.to_lowercase();
            for word in group {
                self.canonical.insert(word.to_lowercase(), head.clone());
            }
        }
        self
    }

    pub fn set_online(&self, online: bool) {
        self.online.store(online, Ordering::SeqCst);
    }

    fn dimension(concept: &str) -> usize {
        let digest = Sha256::digest(concept.as_bytes());
        let value = u32::from_be_bytes([digest[0], digest[1], digest[2], digest[3]]);
        value as usize % EMBEDDING_DIM
    }

    fn embed_one(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; EMBEDDING_DIM];
        for (_, segment) in segments(text) {
            let lower = segment.to_lowercase();
            let concept = self.canonical.get(&lower).unwrap_or(&lower);
            vector[Self::dimension(concept)] += 1.0;
        }
        vector
    }
}

#[async_trait]
impl SentenceEmbedder for MockEmbedder {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, InferenceError> {
        if !self.online.load(Ordering::SeqCst) {
            return Err(offline("embedder"));
        }
        Ok(texts.iter().map(|t| self.embed_one(t)).collect())
    }
}

/// Antonym-driven entailment model.
#[derive(Debug)]
pub struct MockEntailment {
    antonyms: Vec<(String, String)>,
    online: AtomicBool,
}

impl Default for MockEntailment {
    fn default() -> Self {
        Self::new()
    }
}

impl MockEntailment {
    pub fn new() -> Self {
        Self {
            antonyms: Vec::new(),
            online: AtomicBool::new(true),
        }
    }

    pub fn antonyms(mut self, a: &str, b: &str) -> Self {
        self.antonyms.push((a.to_lowercase(), b.to_lowercase()));
        self
    }

    pub fn set_online(&self, online: bool) {
        self.online.store(online, Ordering::SeqCst);
    }

    fn bag(text: &str) -> HashSet<String> {
        segments(text).map(|(_, s)| s.to_lowercase()).collect()
    }
}

#[async_trait]
impl EntailmentModel for MockEntailment {
    async fn entail(&self, premise: &str, hypothesis: &str) -> Result<EntailmentVerdict, InferenceError> {
        if !self.online.load(Ordering::SeqCst) {
            return Err(offline("entailment model"));
        }
        let premise = Self::bag(premise);
        let hypothesis = Self::bag(hypothesis);

        let swapped = self.antonyms.iter().any(|(a, b)| {
            (premise.contains(a) && hypothesis.contains(b) && !hypothesis.contains(a))
                || (premise.contains(b) && hypothesis.contains(a) && !hypothesis.contains(b))
        });

        let verdict = if swapped {
            EntailmentVerdict {
                label: EntailmentLabel::Contradiction,
                confidence: 0.9,
            }
        } else {
            EntailmentVerdict {
                label: EntailmentLabel::Entailment,
                confidence: 0.9,
            }
        };
        Ok(verdict)
    }
}
