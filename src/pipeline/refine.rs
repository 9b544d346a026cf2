//! Refinement pipeline.
//!
//! Per sentence: SCORING → FLAGGING → CANDIDATE_RANKING → EDIT_SELECTION → DONE.
//!
//! Candidate ranking runs its gates in order of cost, failing fast:
//! 1. Generation (one masked prediction)
//! 2. Linguistic filter (tagging)
//! 3. Windowed PLL gain (one batched prediction)
//! 4. Semantic gate (one batched embedding, optional entailment)
//!
//! Edit selection walks flagged words strictly left to right. Each accepted
//! edit produces a new sentence; later words are ranked against it.

use std::sync::Arc;

use futures::future::try_join_all;
use futures::stream::{self, StreamExt, TryStreamExt};

use super::approval::{Approval, AutoApprove, EditApprover, EditProposal};
use super::cancel::CancelFlag;
use super::policy::{edit_reason, flag_reasons, quality_score, rank_candidates, rank_modifications};
use super::types::{
    Alternative, Candidate, CandidateReport, Edit, FlaggedWord, HighlightReport, HighlightedWord, Modification,
    RefinementResult, SentenceCandidates, SentenceOutcome, SentenceStatus, StopReason, TextRefinement,
};
use crate::candidates::{CandidateGenerator, LinguisticFilter};
use crate::config::RefineConfig;
use crate::error::{FlowError, Result};
use crate::inference::{Models, PosTagger, Span};
use crate::scoring::{PreparedSentence, Scorer, WordScore};
use crate::semantic::SemanticChecker;
use crate::text::{Sentence, splice, split_sentences};

/// Alternatives kept on each edit.
const EDIT_ALTERNATIVES: usize = 3;

/// Candidates per word considered by the candidates report.
const REPORT_CANDIDATES_PER_WORD: usize = 10;

/// How edits are approved when refining a whole text.
pub enum RefineMode<'a> {
    /// Accept every passing proposal; sentences may run concurrently
    Automatic,
    /// Ask the approver for every proposal; sentences run in order
    Interactive(&'a mut dyn EditApprover),
}

/// Scores and flags for one sentence.
#[derive(Debug, Clone)]
struct Analysis {
    prepared: PreparedSentence,
    scores: Vec<WordScore>,
    flagged: Vec<FlaggedWord>,
}

/// Orchestrates scoring, candidate ranking and edit selection.
pub struct RefinementPipeline {
    tagger: Arc<dyn PosTagger>,
    scorer: Scorer,
    generator: CandidateGenerator,
    filter: LinguisticFilter,
    semantic: SemanticChecker,
    config: RefineConfig,
    concurrency: usize,
}

impl RefinementPipeline {
    /// Build a pipeline over shared models.
    ///
    /// Fails when the config is invalid or the entailment check is enabled
    /// without an entailment model.
    pub fn new(models: Models, config: RefineConfig) -> Result<Self> {
        config.validate()?;
        if config.use_nli_check && models.entailment.is_none() {
            return Err(FlowError::InvalidConfig(
                "use_nli_check requires an entailment model".to_string(),
            ));
        }

        let scorer = Scorer::new(models.masked_lm.clone(), config.pll_method);
        let generator = CandidateGenerator::new(scorer.clone(), config.top_k_candidates);
        let filter = LinguisticFilter::new(models.tagger.clone(), config.strict_morphology);
        let semantic = SemanticChecker::new(
            models.embedder.clone(),
            models.entailment.clone(),
            config.min_sbert_cosine,
            config.use_nli_check,
        );

        Ok(Self {
            tagger: models.tagger,
            scorer,
            generator,
            filter,
            semantic,
            config,
            concurrency: 1,
        })
    }

    /// Sentences processed concurrently by the text-level operations.
    pub fn with_concurrency(mut self, max_sentences: usize) -> Self {
        self.concurrency = max_sentences.max(1);
        self
    }

    pub fn config(&self) -> &RefineConfig {
        &self.config
    }

    /// SCORING and FLAGGING for one sentence.
    async fn analyze(&self, text: &str) -> Result<Analysis> {
        let tokens = self.tagger.tag(text).await?;
        let sentence = Sentence::from_tagged(text, tokens);
        let prepared = self.scorer.prepare(sentence).await?;
        let scores = self.scorer.score_sentence(&prepared).await?;

        let flagged: Vec<FlaggedWord> = scores
            .iter()
            .filter_map(|score| {
                let word = prepared.sentence.words().get(score.index)?;
                if !word.is_editable() {
                    return None;
                }
                let reasons = flag_reasons(score, &self.config);
                if reasons.is_empty() {
                    return None;
                }
                Some(FlaggedWord {
                    index: score.index,
                    text: word.text.clone(),
                    span: word.span,
                    score: score.clone(),
                    reasons,
                })
            })
            .collect();

        tracing::debug!(
            words = prepared.sentence.len(),
            scored = scores.len(),
            flagged = flagged.len(),
            excluded = prepared.alignment.excluded.len(),
            "Analyzed sentence"
        );

        Ok(Analysis {
            prepared,
            scores,
            flagged,
        })
    }

    /// CANDIDATE_RANKING for word `index` of `prepared`, best first.
    ///
    /// An empty list is not an error: the word is simply left alone.
    pub async fn rank_word_candidates(&self, prepared: &PreparedSentence, index: usize) -> Result<Vec<Candidate>> {
        let word = prepared.sentence.word(index)?.text.clone();

        let generated = self.generator.generate(prepared, index).await?;
        let generated_count = generated.len();
        let mut survivors = self.filter.filter(&prepared.sentence, index, generated).await?;
        survivors.truncate(self.config.max_scored_candidates);

        tracing::debug!(
            word = %word,
            generated = generated_count,
            survivors = survivors.len(),
            "Linguistic gate"
        );
        if survivors.is_empty() {
            log::debug!("No candidates survived for {:?}", word);
            return Ok(Vec::new());
        }

        let substituted = survivors
            .iter()
            .map(|c| prepared.sentence.with_replacement(index, &c.text))
            .collect::<Result<Vec<Sentence>>>()?;
        let substituted = try_join_all(substituted.into_iter().map(|s| self.scorer.prepare(s))).await?;

        // A candidate the tokenizer cannot align has no comparable PLL
        let (survivors, substituted): (Vec<_>, Vec<_>) = survivors
            .into_iter()
            .zip(substituted)
            .filter(|(c, p)| {
                let aligned = p.alignment.is_aligned(index);
                if !aligned {
                    log::debug!("Dropping unaligned candidate {:?}", c.text);
                }
                aligned
            })
            .unzip();
        if survivors.is_empty() {
            return Ok(Vec::new());
        }

        let radius = self.config.pll_window_size;
        let mut items: Vec<(&PreparedSentence, usize)> = Vec::with_capacity(substituted.len() + 1);
        items.push((prepared, index));
        items.extend(substituted.iter().map(|p| (p, index)));
        let plls = self.scorer.windowed_plls(&items, radius).await?;
        let Some((baseline, candidate_plls)) = plls.split_first() else {
            return Ok(Vec::new());
        };

        let texts: Vec<String> = substituted.iter().map(|p| p.sentence.text().to_string()).collect();
        let verdicts = self.semantic.check_batch(prepared.sentence.text(), &texts).await?;

        let mut candidates: Vec<Candidate> = survivors
            .into_iter()
            .zip(candidate_plls)
            .zip(verdicts)
            .map(|((generated, pll), verdict)| {
                Candidate::evaluate(generated, *pll - *baseline, verdict, self.config.min_pll_gain)
            })
            .collect();

        for candidate in &candidates {
            tracing::debug!(
                word = %word,
                candidate = %candidate.text,
                pll_gain = candidate.pll_gain,
                similarity = candidate.similarity,
                fluency_ok = candidate.fluency_ok,
                similarity_ok = candidate.similarity_ok,
                passes = candidate.passes_thresholds,
                "Scored candidate"
            );
        }

        rank_candidates(&mut candidates, &self.config);
        Ok(candidates)
    }

    /// Refine one sentence, asking `approver` about every passing proposal.
    ///
    /// Any inference failure aborts the sentence; no partial result escapes.
    pub async fn refine_sentence(
        &self,
        text: &str,
        approver: &mut dyn EditApprover,
        cancel: &CancelFlag,
    ) -> Result<RefinementResult> {
        let analysis = self.analyze(text).await?;
        let budget = self.config.max_edits_per_sentence;

        let mut current = analysis.prepared.clone();
        let mut edits: Vec<Edit> = Vec::new();
        let mut stop_reason = StopReason::Exhausted;

        for flagged in &analysis.flagged {
            if cancel.is_cancelled() {
                log::info!("Refinement cancelled after {} edit(s)", edits.len());
                return Err(FlowError::Cancelled {
                    edits_applied: edits.len(),
                });
            }
            if edits.len() >= budget {
                tracing::debug!(budget, "Edit budget exhausted");
                stop_reason = StopReason::BudgetExhausted;
                break;
            }

            let candidates = self.rank_word_candidates(&current, flagged.index).await?;
            let passing: Vec<Candidate> = candidates.iter().filter(|c| c.passes_thresholds).cloned().collect();
            let Some(proposed) = passing.first() else {
                log::debug!("No passing candidate for {:?}", flagged.text);
                continue;
            };

            let word = current.sentence.word(flagged.index)?;
            let original = word.text.clone();
            let start = word.span.start;
            let reason = edit_reason(&flagged.reasons, proposed);

            let proposal = EditProposal {
                sentence: current.sentence.text(),
                word_index: flagged.index,
                original: &original,
                span: word.span,
                alternatives: &passing,
                reason: &reason,
            };
            let approval = approver.approve(&proposal);
            // An interrupt during a blocking prompt lands here
            if cancel.is_cancelled() {
                log::info!("Refinement cancelled at prompt after {} edit(s)", edits.len());
                return Err(FlowError::Cancelled {
                    edits_applied: edits.len(),
                });
            }
            let chosen = match approval {
                Approval::Accept => proposed,
                Approval::Reject => {
                    log::debug!("Edit of {:?} rejected", original);
                    continue;
                }
                Approval::Select(i) => passing.get(i).ok_or(FlowError::InvalidApproval {
                    index: i,
                    available: passing.len(),
                })?,
            };

            let edit = Edit {
                word_index: flagged.index,
                original: original.clone(),
                replacement: chosen.text.clone(),
                span: Span::new(start, start + chosen.text.len()),
                reason: edit_reason(&flagged.reasons, chosen),
                pll_gain: chosen.pll_gain,
                similarity: chosen.similarity,
                alternatives: candidates
                    .iter()
                    .filter(|c| c.text != chosen.text)
                    .take(EDIT_ALTERNATIVES)
                    .map(Alternative::from)
                    .collect(),
            };
            log::info!("Edit {:?} -> {:?} ({})", edit.original, edit.replacement, edit.reason);

            let edited = current.sentence.with_replacement(flagged.index, &chosen.text)?;
            current = self.scorer.prepare(edited).await?;
            edits.push(edit);
            if edits.len() >= budget {
                tracing::debug!(budget, "Edit budget exhausted");
                stop_reason = StopReason::BudgetExhausted;
                break;
            }
        }

        Ok(RefinementResult {
            original: text.to_string(),
            refined: current.sentence.text().to_string(),
            edits,
            scores: analysis.scores,
            excluded: analysis.prepared.alignment.excluded.clone(),
            stop_reason,
        })
    }

    /// Flagged words of one sentence with their top `top_n` candidates.
    ///
    /// Never mutates; spans are relative to `text`.
    pub async fn highlight_sentence(&self, text: &str, top_n: usize) -> Result<Vec<HighlightedWord>> {
        let analysis = self.analyze(text).await?;

        let mut words = Vec::with_capacity(analysis.flagged.len());
        for flagged in &analysis.flagged {
            let mut suggestions = self.rank_word_candidates(&analysis.prepared, flagged.index).await?;
            suggestions.truncate(top_n);
            words.push(HighlightedWord {
                text: flagged.text.clone(),
                span: flagged.span,
                entropy: flagged.score.entropy,
                rank: flagged.score.rank,
                log_prob: flagged.score.log_prob,
                reasons: flagged.reasons.clone(),
                suggestions,
            });
        }
        Ok(words)
    }

    /// Highlight every sentence of `text`; spans are absolute.
    pub async fn highlight_text(&self, text: &str, top_n: usize) -> Result<HighlightReport> {
        let sentences = split_sentences(text);
        let sentence_count = sentences.len();

        let per_sentence: Vec<Vec<HighlightedWord>> = stream::iter(sentences)
            .map(|(span, sentence)| async move {
                let mut words = self.highlight_sentence(sentence, top_n).await?;
                for word in &mut words {
                    word.span = word.span.shifted(span.start as isize);
                }
                Ok::<_, FlowError>(words)
            })
            .buffered(self.concurrency)
            .try_collect()
            .await?;

        let words: Vec<HighlightedWord> = per_sentence.into_iter().flatten().collect();
        log::info!("Highlighted {} word(s) in {} sentence(s)", words.len(), sentence_count);

        Ok(HighlightReport {
            text: text.to_string(),
            sentence_count,
            total_highlighted: words.len(),
            words,
        })
    }

    /// The `top_n` most promising single-word changes across one sentence.
    ///
    /// Every editable word is considered, flagged or not, and changes are
    /// ordered by quality. Never mutates; spans are relative to `text`.
    pub async fn candidates_sentence(&self, text: &str, top_n: usize) -> Result<Vec<Modification>> {
        let analysis = self.analyze(text).await?;
        let prepared = &analysis.prepared;

        let mut modifications = Vec::new();
        for score in &analysis.scores {
            let word = prepared.sentence.word(score.index)?;
            if !word.is_editable() {
                continue;
            }
            let mut candidates = self.rank_word_candidates(prepared, score.index).await?;
            candidates.truncate(REPORT_CANDIDATES_PER_WORD);

            for candidate in candidates {
                let modified = prepared.sentence.with_replacement(score.index, &candidate.text)?;
                modifications.push(Modification {
                    word_index: score.index,
                    original: word.text.clone(),
                    replacement: candidate.text.clone(),
                    span: word.span,
                    modified: modified.text().to_string(),
                    entropy: score.entropy,
                    rank: score.rank,
                    log_prob: candidate.log_prob,
                    pll_gain: candidate.pll_gain,
                    similarity: candidate.similarity,
                    quality: quality_score(score, &candidate),
                    passes_thresholds: candidate.passes_thresholds,
                });
            }
        }

        tracing::debug!(considered = modifications.len(), top_n, "Ranked sentence modifications");
        rank_modifications(&mut modifications);
        modifications.truncate(top_n);
        Ok(modifications)
    }

    /// Candidates report for every sentence of `text`; spans are absolute.
    pub async fn candidates_text(&self, text: &str, top_n: usize) -> Result<CandidateReport> {
        let sentences: Vec<SentenceCandidates> = stream::iter(split_sentences(text))
            .map(|(span, sentence)| async move {
                let mut modifications = self.candidates_sentence(sentence, top_n).await?;
                for modification in &mut modifications {
                    modification.span = modification.span.shifted(span.start as isize);
                }
                Ok::<_, FlowError>(SentenceCandidates {
                    span,
                    sentence: sentence.to_string(),
                    modifications,
                })
            })
            .buffered(self.concurrency)
            .try_collect()
            .await?;

        let report = CandidateReport {
            text: text.to_string(),
            sentences,
        };
        log::info!(
            "Listed {} modification(s) in {} sentence(s)",
            report.total_modifications(),
            report.sentences.len()
        );
        Ok(report)
    }

    /// Refine every sentence of `text`.
    ///
    /// Inference failures are isolated per sentence: the failed sentence is
    /// kept verbatim and reported, the others are still refined. Any other
    /// error (cancellation, invalid approval) aborts the whole text.
    pub async fn refine_text(&self, text: &str, mode: RefineMode<'_>, cancel: &CancelFlag) -> Result<TextRefinement> {
        let sentences = split_sentences(text);

        let results: Vec<(Span, Result<RefinementResult>)> = match mode {
            RefineMode::Automatic => {
                stream::iter(sentences)
                    .map(|(span, sentence)| async move {
                        let mut approver = AutoApprove;
                        (span, self.refine_sentence(sentence, &mut approver, cancel).await)
                    })
                    .buffered(self.concurrency)
                    .collect()
                    .await
            }
            RefineMode::Interactive(approver) => {
                let mut results = Vec::with_capacity(sentences.len());
                for (span, sentence) in sentences {
                    let result = self.refine_sentence(sentence, &mut *approver, cancel).await;
                    results.push((span, result));
                }
                results
            }
        };

        let mut outcomes = Vec::with_capacity(results.len());
        for (span, result) in results {
            let status = match result {
                Ok(refined) => SentenceStatus::Refined(refined),
                Err(e) if e.is_inference() => {
                    log::warn!("Sentence at {}..{} failed: {}", span.start, span.end, e);
                    SentenceStatus::Failed { error: e.to_string() }
                }
                Err(e) => return Err(e),
            };
            outcomes.push(SentenceOutcome { span, status });
        }

        let replacements: Vec<(Span, &str)> = outcomes
            .iter()
            .map(|o| {
                let content = match &o.status {
                    SentenceStatus::Refined(result) => result.refined.as_str(),
                    SentenceStatus::Failed { .. } => &text[o.span.start..o.span.end],
                };
                (o.span, content)
            })
            .collect();
        let refined = splice(text, &replacements);

        Ok(TextRefinement {
            original: text.to_string(),
            refined,
            sentences: outcomes,
        })
    }
}

impl std::fmt::Debug for RefinementPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RefinementPipeline")
            .field("config", &self.config)
            .field("concurrency", &self.concurrency)
            .finish()
    }
}
