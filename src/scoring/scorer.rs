//! Bidirectional word scoring.
//!
//! Each word is scored by masking its subword pieces and reading the model's
//! distribution at each masked position. Multi-piece words use a
//! left-to-right pseudo-log-likelihood: piece `k` is predicted with pieces
//! `k..end` masked, so no piece sees a later piece of the same word.
//! All queries for one call are sent in a single batched `predict`.

use std::ops::Range;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::distribution::Distribution;
use crate::config::PllMethod;
use crate::error::Result;
use crate::inference::{Encoding, InferenceError, Logits, MaskedLanguageModel, MaskedQuery};
use crate::text::{Alignment, Sentence, SubwordSpan, align};

/// Scorer output for one word.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WordScore {
    /// Word index in the sentence
    pub index: usize,
    /// Entropy in bits at the first masked piece
    pub entropy: f64,
    /// 1-based rank of the original first piece
    pub rank: usize,
    /// Pseudo-log-likelihood of the whole word (natural log)
    pub log_prob: f64,
    /// Subword pieces the word spans
    pub pieces: usize,
}

/// A sentence together with its tokenization and word alignment.
#[derive(Debug, Clone)]
pub struct PreparedSentence {
    pub sentence: Sentence,
    pub encoding: Encoding,
    pub alignment: Alignment,
}

struct ScoreRequest<'a> {
    prepared: &'a PreparedSentence,
    word: usize,
    span: SubwordSpan,
}

/// Word scorer backed by a masked language model.
#[derive(Clone)]
pub struct Scorer {
    lm: Arc<dyn MaskedLanguageModel>,
    method: PllMethod,
}

impl Scorer {
    pub fn new(lm: Arc<dyn MaskedLanguageModel>, method: PllMethod) -> Self {
        Self { lm, method }
    }

    pub fn model(&self) -> &Arc<dyn MaskedLanguageModel> {
        &self.lm
    }

    /// Tokenize a sentence and align its words to pieces.
    pub async fn prepare(&self, sentence: Sentence) -> Result<PreparedSentence> {
        let encoding = self.lm.tokenize(sentence.text()).await?;
        let alignment = align(&sentence, &encoding);
        Ok(PreparedSentence {
            sentence,
            encoding,
            alignment,
        })
    }

    /// Distribution at the first piece of a word with all its pieces masked.
    ///
    /// Returns `None` for words without pieces.
    pub async fn masked_distribution(&self, prepared: &PreparedSentence, word: usize) -> Result<Option<Distribution>> {
        let Some(span) = prepared.alignment.span(word) else {
            return Ok(None);
        };
        let mut ids = prepared.encoding.ids();
        let mask = self.lm.mask_token_id();
        for position in span.positions() {
            ids[position] = mask;
        }

        let results = self.lm.predict(&[MaskedQuery::single(ids, span.start)]).await?;
        let logits = results
            .into_iter()
            .next()
            .ok_or_else(|| InferenceError::InvalidResponse("predict returned no results".to_string()))
            .and_then(single_position)?;
        Ok(Some(Distribution::from_logits(&logits)))
    }

    /// Score one word; `None` when the word has no pieces.
    pub async fn score_word(&self, prepared: &PreparedSentence, word: usize) -> Result<Option<WordScore>> {
        let Some(span) = prepared.alignment.span(word) else {
            return Ok(None);
        };
        let scores = self
            .score_requests(&[ScoreRequest { prepared, word, span }])
            .await?;
        Ok(scores.into_iter().next())
    }

    /// Score every aligned non-punctuation word in one batched call.
    pub async fn score_sentence(&self, prepared: &PreparedSentence) -> Result<Vec<WordScore>> {
        let requests: Vec<ScoreRequest> = prepared
            .sentence
            .words()
            .iter()
            .enumerate()
            .filter(|(_, w)| !w.is_punctuation())
            .filter_map(|(word, _)| {
                prepared
                    .alignment
                    .span(word)
                    .map(|span| ScoreRequest { prepared, word, span })
            })
            .collect();

        let scores = self.score_requests(&requests).await?;
        log::debug!("Scored {} words of {:?}", scores.len(), prepared.sentence.text());
        Ok(scores)
    }

    /// Sum of word PLLs within `radius` words of `center`.
    pub async fn windowed_pll(&self, prepared: &PreparedSentence, center: usize, radius: usize) -> Result<f64> {
        let plls = self.windowed_plls(&[(prepared, center)], radius).await?;
        Ok(plls.into_iter().next().unwrap_or(0.0))
    }

    /// Windowed PLL for several (sentence, center) pairs in one batched call.
    ///
    /// Every aligned word in the window counts, punctuation included, so the
    /// baseline and a substituted sentence cover the same words.
    pub async fn windowed_plls(&self, items: &[(&PreparedSentence, usize)], radius: usize) -> Result<Vec<f64>> {
        let mut requests = Vec::new();
        let mut counts = Vec::with_capacity(items.len());

        for &(prepared, center) in items {
            let before = requests.len();
            for word in window(center, radius, prepared.sentence.len()) {
                if let Some(span) = prepared.alignment.span(word) {
                    requests.push(ScoreRequest { prepared, word, span });
                }
            }
            counts.push(requests.len() - before);
        }

        let scores = self.score_requests(&requests).await?;
        let mut scores = scores.into_iter();
        Ok(counts
            .into_iter()
            .map(|n| scores.by_ref().take(n).map(|s| s.log_prob).sum::<f64>())
            .collect())
    }

    fn queries_for(&self, request: &ScoreRequest<'_>, mask: u32) -> Vec<MaskedQuery> {
        let ids = request.prepared.encoding.ids();
        request
            .span
            .positions()
            .map(|k| {
                let mut masked = ids.clone();
                match self.method {
                    PllMethod::WordL2r => {
                        for position in k..request.span.end {
                            masked[position] = mask;
                        }
                    }
                    PllMethod::Standard => masked[k] = mask,
                }
                MaskedQuery::single(masked, k)
            })
            .collect()
    }

    async fn score_requests(&self, requests: &[ScoreRequest<'_>]) -> Result<Vec<WordScore>> {
        if requests.is_empty() {
            return Ok(Vec::new());
        }

        let mask = self.lm.mask_token_id();
        let queries: Vec<MaskedQuery> = requests.iter().flat_map(|r| self.queries_for(r, mask)).collect();

        let results = self.lm.predict(&queries).await?;
        if results.len() != queries.len() {
            return Err(InferenceError::InvalidResponse(format!(
                "expected {} predictions, got {}",
                queries.len(),
                results.len()
            ))
            .into());
        }

        let mut results = results.into_iter();
        let mut scores = Vec::with_capacity(requests.len());
        for request in requests {
            let pieces = &request.prepared.encoding.pieces;
            let mut score = WordScore {
                index: request.word,
                entropy: 0.0,
                rank: 1,
                log_prob: 0.0,
                pieces: request.span.len(),
            };

            for (offset, position) in request.span.positions().enumerate() {
                let logits = results
                    .next()
                    .ok_or_else(|| InferenceError::InvalidResponse("missing prediction".to_string()))
                    .and_then(single_position)?;
                let dist = Distribution::from_logits(&logits);
                let id = pieces[position].id;
                score.log_prob += dist.log_prob(id);
                if offset == 0 {
                    score.entropy = dist.entropy_bits();
                    score.rank = dist.rank(id);
                }
            }
            scores.push(score);
        }

        Ok(scores)
    }
}

impl std::fmt::Debug for Scorer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scorer").field("method", &self.method).finish()
    }
}

fn single_position(mut positions: Vec<Logits>) -> std::result::Result<Logits, InferenceError> {
    if positions.len() != 1 {
        return Err(InferenceError::InvalidResponse(format!(
            "expected logits for 1 position, got {}",
            positions.len()
        )));
    }
    positions
        .pop()
        .ok_or_else(|| InferenceError::InvalidResponse("empty prediction".to_string()))
}

/// Word indices within `radius` of `center`, clamped to the sentence.
pub fn window(center: usize, radius: usize, len: usize) -> Range<usize> {
    let end = center.saturating_add(radius).saturating_add(1).min(len);
    center.saturating_sub(radius).min(end)..end
}
