//! End-to-end refinement scenarios over the deterministic mock models.

use std::sync::Arc;

use async_trait::async_trait;

use flow_refine::FlowError;
use flow_refine::config::RefineConfig;
use flow_refine::inference::{
    InferenceError, MockEmbedder, MockEntailment, MockMaskedLm, MockTagger, Models, Pos, PosTagger, Span, TaggedToken,
};
use flow_refine::pipeline::{
    Approval, AutoApprove, CancelFlag, RefineMode, RefinementPipeline, ScriptedApprover, SentenceStatus, StopReason,
};

const FILLERS: [&str; 6] = ["role", "value", "power", "impact", "study", "growth"];
const VERBS: [&str; 8] = ["employ", "apply", "adopt", "need", "want", "like", "share", "sell"];
const GOALS: [&str; 8] = ["paint", "clean", "design", "repair", "inspect", "visit", "rent", "buy"];

const UTILIZE: &str = "The utilize of technology is important.";
const CAT: &str = "The cat sat on the mat.";
const TOOLS: &str = "We utilize the tools to construct the house.";

fn masked_lm() -> Arc<MockMaskedLm> {
    let mut builder = MockMaskedLm::builder()
        .sentence(CAT, 10.0)
        .sentence("The use of technology is important.", 3.0)
        .words(&["utilize"])
        .tolerance(1);
    for filler in FILLERS {
        builder = builder.sentence(format!("The {} of technology is important.", filler), 1.0);
    }
    Arc::new(builder.build())
}

fn tools_lm() -> Arc<MockMaskedLm> {
    let mut builder = MockMaskedLm::builder()
        .sentence("We use the tools to build the house.", 3.0)
        .words(&["utilize", "construct"])
        .tolerance(2);
    for (verb, goal) in VERBS.iter().zip(GOALS) {
        builder = builder.sentence(format!("We {} the tools to {} the house.", verb, goal), 1.0);
    }
    Arc::new(builder.build())
}

fn tagger() -> MockTagger {
    MockTagger::new()
        .words(&["the", "a"], Pos::Det, &[])
        .words(&["use", "utilize"], Pos::Noun, &[("Number", "Sing")])
        .words(&FILLERS, Pos::Noun, &[("Number", "Sing")])
        .words(&["cat", "mat", "technology", "tools", "house"], Pos::Noun, &[])
        .words(&["of", "on", "to"], Pos::Adp, &[])
        .word("is", Pos::Aux, &[("Tense", "Pres")])
        .word("sat", Pos::Verb, &[("Tense", "Past")])
        .word("important", Pos::Adj, &[])
        .word("we", Pos::Pron, &[])
}

fn tools_tagger() -> MockTagger {
    tagger()
        .words(&["use", "utilize", "build", "construct"], Pos::Verb, &[])
        .words(&VERBS, Pos::Verb, &[])
        .words(&GOALS, Pos::Verb, &[])
}

fn embedder() -> MockEmbedder {
    MockEmbedder::new()
        .synonyms(&["use", "utilize"])
        .synonyms(&["build", "construct"])
}

fn pipeline_with(models: Models, config: RefineConfig) -> RefinementPipeline {
    RefinementPipeline::new(models, config).unwrap()
}

fn pipeline() -> RefinementPipeline {
    let models = Models::new(masked_lm(), Arc::new(embedder()), Arc::new(tagger()));
    pipeline_with(models, RefineConfig::default())
}

fn tools_pipeline(config: RefineConfig) -> RefinementPipeline {
    let models = Models::new(tools_lm(), Arc::new(embedder()), Arc::new(tools_tagger()));
    pipeline_with(models, config)
}

/// Tagger that fails on any text containing "broken".
struct FlakyTagger {
    inner: MockTagger,
}

#[async_trait]
impl PosTagger for FlakyTagger {
    async fn tag(&self, text: &str) -> Result<Vec<TaggedToken>, InferenceError> {
        if text.contains("broken") {
            return Err(InferenceError::Unavailable("tagger crashed".to_string()));
        }
        self.inner.tag(text).await
    }
}

#[tokio::test]
async fn test_highlight_flags_awkward_word() {
    let pipeline = pipeline();
    let report = pipeline.highlight_text(UTILIZE, 3).await.unwrap();

    assert_eq!(report.sentence_count, 1);
    assert_eq!(report.total_highlighted, 1);
    let word = &report.words[0];
    assert_eq!(word.text, "utilize");
    assert_eq!(word.span, Span::new(4, 11));
    assert!(word.entropy >= 4.0);
    assert!(!word.reasons.is_empty());
    assert_eq!(word.suggestions.len(), 3);
    assert_eq!(word.suggestions[0].text, "use");
    assert!(word.suggestions[0].passes_thresholds);
    assert!(word.suggestions[0].pll_gain >= 2.0);
    assert!((word.suggestions[0].similarity - 1.0).abs() < 1e-6);
}

#[tokio::test]
async fn test_fluent_sentence_is_untouched() {
    let pipeline = pipeline();

    let report = pipeline.highlight_text(CAT, 3).await.unwrap();
    assert_eq!(report.total_highlighted, 0);

    let refinement = pipeline
        .refine_text(CAT, RefineMode::Automatic, &CancelFlag::new())
        .await
        .unwrap();
    assert_eq!(refinement.refined, CAT);
    assert_eq!(refinement.edits().count(), 0);
    let result = refinement.sentences[0].result().unwrap();
    assert!(result.is_unchanged());
    assert_eq!(result.stop_reason, StopReason::Exhausted);
}

#[tokio::test]
async fn test_scores_are_well_formed() {
    let pipeline = pipeline();
    let refinement = pipeline
        .refine_text(&format!("{} {}", CAT, UTILIZE), RefineMode::Automatic, &CancelFlag::new())
        .await
        .unwrap();

    for outcome in &refinement.sentences {
        let result = outcome.result().unwrap();
        assert!(!result.scores.is_empty());
        for score in &result.scores {
            assert!(score.rank >= 1);
            assert!(score.entropy >= 0.0);
            assert!(score.log_prob <= 0.0);
        }
    }
}

#[tokio::test]
async fn test_automatic_refinement_applies_edits_left_to_right() {
    let pipeline = tools_pipeline(RefineConfig::default());
    let refinement = pipeline
        .refine_text(TOOLS, RefineMode::Automatic, &CancelFlag::new())
        .await
        .unwrap();

    assert_eq!(refinement.refined, "We use the tools to build the house.");
    let result = refinement.sentences[0].result().unwrap();
    let replaced: Vec<(&str, &str)> = result
        .edits
        .iter()
        .map(|e| (e.original.as_str(), e.replacement.as_str()))
        .collect();
    assert_eq!(replaced, vec![("utilize", "use"), ("construct", "build")]);
    assert!(result.edits.len() <= RefineConfig::default().max_edits_per_sentence);

    // Every edit span points at its replacement in the refined sentence
    for edit in &result.edits {
        assert_eq!(&result.refined[edit.span.start..edit.span.end], edit.replacement);
    }
}

#[tokio::test]
async fn test_edit_budget_keeps_leftmost_edit() {
    let config = RefineConfig {
        max_edits_per_sentence: 1,
        ..Default::default()
    };
    let pipeline = tools_pipeline(config);
    let refinement = pipeline
        .refine_text(TOOLS, RefineMode::Automatic, &CancelFlag::new())
        .await
        .unwrap();

    assert_eq!(refinement.refined, "We use the tools to construct the house.");
    let result = refinement.sentences[0].result().unwrap();
    assert_eq!(result.edits.len(), 1);
    assert_eq!(result.edits[0].original, "utilize");
    assert_eq!(result.stop_reason, StopReason::BudgetExhausted);
}

#[tokio::test]
async fn test_dissimilar_candidates_are_never_applied() {
    let models = Models::new(masked_lm(), Arc::new(MockEmbedder::new()), Arc::new(tagger()));
    let pipeline = pipeline_with(models, RefineConfig::default());

    let report = pipeline.highlight_text(UTILIZE, 3).await.unwrap();
    let suggestions = &report.words[0].suggestions;
    assert!(!suggestions.is_empty());
    let use_candidate = suggestions.iter().find(|c| c.text == "use").unwrap();
    assert!(use_candidate.fluency_ok);
    assert!(!use_candidate.similarity_ok);
    assert!(suggestions.iter().all(|c| !c.passes_thresholds));

    let refinement = pipeline
        .refine_text(UTILIZE, RefineMode::Automatic, &CancelFlag::new())
        .await
        .unwrap();
    assert_eq!(refinement.refined, UTILIZE);
}

#[tokio::test]
async fn test_entailment_gate() {
    let config = RefineConfig {
        use_nli_check: true,
        ..Default::default()
    };

    let models = Models::new(masked_lm(), Arc::new(embedder()), Arc::new(tagger()))
        .with_entailment(Arc::new(MockEntailment::new()));
    let pipeline = pipeline_with(models, config.clone());
    let result = pipeline
        .refine_sentence(UTILIZE, &mut AutoApprove, &CancelFlag::new())
        .await
        .unwrap();
    assert_eq!(result.edits.len(), 1);
    assert!(result.edits[0].reason.contains("entailment preserved"));

    let models = Models::new(masked_lm(), Arc::new(embedder()), Arc::new(tagger()))
        .with_entailment(Arc::new(MockEntailment::new().antonyms("utilize", "use")));
    let pipeline = pipeline_with(models, config);
    let report = pipeline.highlight_text(UTILIZE, 3).await.unwrap();
    let use_candidate = report.words[0].suggestions.iter().find(|c| c.text == "use").unwrap();
    assert_eq!(use_candidate.entailment, Some(false));
    assert!(!use_candidate.passes_thresholds);
}

#[tokio::test]
async fn test_highlight_is_idempotent() {
    let pipeline = pipeline();
    let text = format!("{} {}", CAT, UTILIZE);
    let first = pipeline.highlight_text(&text, 3).await.unwrap();
    let second = pipeline.highlight_text(&text, 3).await.unwrap();
    assert_eq!(first, second);
    assert_eq!(first.text, text);
}

#[tokio::test]
async fn test_highlight_spans_are_absolute() {
    let pipeline = pipeline().with_concurrency(2);
    let text = format!("{} {}", CAT, UTILIZE);
    let report = pipeline.highlight_text(&text, 2).await.unwrap();

    assert_eq!(report.sentence_count, 2);
    assert_eq!(report.total_highlighted, 1);
    let span = report.words[0].span;
    assert_eq!(span, Span::new(28, 35));
    assert_eq!(&text[span.start..span.end], "utilize");
}

#[tokio::test]
async fn test_offline_model_is_reported() {
    let lm = masked_lm();
    let models = Models::new(lm.clone(), Arc::new(embedder()), Arc::new(tagger()));
    let pipeline = pipeline_with(models, RefineConfig::default());

    lm.set_online(false);
    let err = pipeline.highlight_text(UTILIZE, 3).await.unwrap_err();
    assert!(matches!(err, FlowError::InferenceUnavailable(_)));
    assert!(err.is_inference());

    lm.set_online(true);
    assert!(pipeline.highlight_text(UTILIZE, 3).await.is_ok());
}

#[tokio::test]
async fn test_failed_sentence_is_isolated() {
    let tagger = FlakyTagger { inner: tagger() };
    let models = Models::new(masked_lm(), Arc::new(embedder()), Arc::new(tagger));
    let pipeline = pipeline_with(models, RefineConfig::default());

    let text = format!("{} This one is broken. {}", UTILIZE, CAT);
    let refinement = pipeline
        .refine_text(&text, RefineMode::Automatic, &CancelFlag::new())
        .await
        .unwrap();

    assert_eq!(refinement.sentences.len(), 3);
    assert_eq!(refinement.failures(), 1);
    assert!(matches!(refinement.sentences[1].status, SentenceStatus::Failed { .. }));
    assert_eq!(
        refinement.refined,
        format!("The use of technology is important. This one is broken. {}", CAT)
    );
}

#[tokio::test]
async fn test_interactive_decisions_are_honoured() {
    let pipeline = tools_pipeline(RefineConfig::default());
    let mut approver = ScriptedApprover::new([Approval::Reject, Approval::Select(0)]);

    let refinement = pipeline
        .refine_text(TOOLS, RefineMode::Interactive(&mut approver), &CancelFlag::new())
        .await
        .unwrap();

    assert_eq!(refinement.refined, "We utilize the tools to build the house.");
    assert_eq!(approver.seen(), &["utilize", "construct"]);
}

#[tokio::test]
async fn test_interactive_runs_sentences_in_order() {
    let pipeline = pipeline().with_concurrency(4);
    let mut approver = ScriptedApprover::new([Approval::Accept, Approval::Reject]);
    let text = format!("{} {}", UTILIZE, UTILIZE);

    let refinement = pipeline
        .refine_text(&text, RefineMode::Interactive(&mut approver), &CancelFlag::new())
        .await
        .unwrap();

    assert_eq!(refinement.refined, format!("The use of technology is important. {}", UTILIZE));
    assert_eq!(approver.seen().len(), 2);
}

#[tokio::test]
async fn test_cancellation_aborts_refinement() {
    let pipeline = pipeline();
    let cancel = CancelFlag::new();
    cancel.cancel();

    let err = pipeline
        .refine_text(UTILIZE, RefineMode::Automatic, &cancel)
        .await
        .unwrap_err();
    assert!(matches!(err, FlowError::Cancelled { edits_applied: 0 }));
}
