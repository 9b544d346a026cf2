//! Flagging, ranking and edit-reason policy.

use super::types::{Candidate, FlagReason, Modification};
use crate::config::RefineConfig;
use crate::scoring::WordScore;

/// Reasons to flag a word; empty when it is not flag-worthy.
///
/// High entropy OR low rank is enough on its own.
pub fn flag_reasons(score: &WordScore, config: &RefineConfig) -> Vec<FlagReason> {
    let mut reasons = Vec::new();
    if score.entropy >= config.min_entropy {
        reasons.push(FlagReason::HighUncertainty { entropy: score.entropy });
    }
    if score.rank >= config.max_original_rank {
        reasons.push(FlagReason::LowRank { rank: score.rank });
    }
    reasons
}

/// Weighted combination of fluency gain and similarity.
pub fn composite_score(candidate: &Candidate, config: &RefineConfig) -> f64 {
    candidate.pll_gain * config.pll_gain_weight + candidate.similarity * config.similarity_weight
}

/// Sort best first: composite score, then similarity, then model rank.
pub fn rank_candidates(candidates: &mut [Candidate], config: &RefineConfig) {
    candidates.sort_by(|a, b| {
        composite_score(b, config)
            .total_cmp(&composite_score(a, config))
            .then_with(|| b.similarity.total_cmp(&a.similarity))
            .then_with(|| a.rank.cmp(&b.rank))
    });
}

/// Quality weights for the candidates report.
const QUALITY_ENTROPY_WEIGHT: f64 = 0.3;
const QUALITY_GAIN_WEIGHT: f64 = 2.0;
const QUALITY_SIMILARITY_WEIGHT: f64 = 10.0;
const QUALITY_LOG_PROB_WEIGHT: f64 = 0.1;

/// How promising a change is across the whole sentence.
///
/// Uncertain originals, fluency gains, preserved meaning and likely
/// replacements all raise the score.
pub fn quality_score(score: &WordScore, candidate: &Candidate) -> f64 {
    score.entropy * QUALITY_ENTROPY_WEIGHT
        + candidate.pll_gain * QUALITY_GAIN_WEIGHT
        + candidate.similarity * QUALITY_SIMILARITY_WEIGHT
        + candidate.log_prob * QUALITY_LOG_PROB_WEIGHT
}

/// Sort best first by quality, then by word position.
pub fn rank_modifications(modifications: &mut [Modification]) {
    modifications.sort_by(|a, b| {
        b.quality
            .total_cmp(&a.quality)
            .then_with(|| a.word_index.cmp(&b.word_index))
    });
}

/// Human-readable justification for an accepted edit.
pub fn edit_reason(flags: &[FlagReason], candidate: &Candidate) -> String {
    let mut parts: Vec<String> = flags.iter().map(|f| f.to_string()).collect();
    parts.push(format!("improves fluency ({:+.2} PLL)", candidate.pll_gain));
    parts.push(format!("preserves meaning ({:.3} sim)", candidate.similarity));
    if candidate.entailment == Some(true) {
        parts.push("entailment preserved".to_string());
    }
    parts.join("; ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inference::Span;

    fn score(entropy: f64, rank: usize) -> WordScore {
        WordScore {
            index: 0,
            entropy,
            rank,
            log_prob: -1.0,
            pieces: 1,
        }
    }

    fn candidate(text: &str, pll_gain: f64, similarity: f64, rank: usize) -> Candidate {
        Candidate {
            text: text.to_string(),
            log_prob: -1.0,
            rank,
            pll_gain,
            similarity,
            entailment: None,
            fluency_ok: true,
            similarity_ok: true,
            passes_thresholds: true,
        }
    }

    #[test]
    fn test_flagging_is_or() {
        let config = RefineConfig::default();
        assert_eq!(flag_reasons(&score(5.0, 1), &config).len(), 1);
        assert_eq!(flag_reasons(&score(0.5, 80), &config), vec![FlagReason::LowRank { rank: 80 }]);
        assert_eq!(flag_reasons(&score(4.0, 50), &config).len(), 2);
        assert!(flag_reasons(&score(3.9, 49), &config).is_empty());
    }

    #[test]
    fn test_confident_word_never_flagged() {
        let config = RefineConfig::default();
        assert!(flag_reasons(&score(0.0, 1), &config).is_empty());
    }

    #[test]
    fn test_loosest_valid_config_spares_confident_word() {
        let config = RefineConfig {
            min_entropy: 0.01,
            max_original_rank: 2,
            ..Default::default()
        };
        assert!(config.validate().is_ok());
        assert!(flag_reasons(&score(0.0, 1), &config).is_empty());
        assert_eq!(flag_reasons(&score(0.0, 2), &config), vec![FlagReason::LowRank { rank: 2 }]);
    }

    #[test]
    fn test_rank_by_gain_then_similarity() {
        let config = RefineConfig::default();
        let mut candidates = vec![
            candidate("a", 1.0, 0.99, 1),
            candidate("b", 3.0, 0.95, 4),
            candidate("c", 3.0, 0.98, 5),
            candidate("d", 3.0, 0.98, 2),
        ];
        rank_candidates(&mut candidates, &config);
        let texts: Vec<&str> = candidates.iter().map(|c| c.text.as_str()).collect();
        assert_eq!(texts, vec!["d", "c", "b", "a"]);
    }

    #[test]
    fn test_similarity_weight_changes_order() {
        let config = RefineConfig {
            pll_gain_weight: 0.0,
            similarity_weight: 1.0,
            ..Default::default()
        };
        let mut candidates = vec![candidate("a", 5.0, 0.90, 1), candidate("b", 2.0, 0.99, 2)];
        rank_candidates(&mut candidates, &config);
        assert_eq!(candidates[0].text, "b");
        assert!(composite_score(&candidates[0], &config) > composite_score(&candidates[1], &config));
    }

    fn modification(word_index: usize, quality: f64) -> Modification {
        Modification {
            word_index,
            original: "utilize".to_string(),
            replacement: "use".to_string(),
            span: Span::new(0, 7),
            modified: String::new(),
            entropy: 5.0,
            rank: 7,
            log_prob: -1.0,
            pll_gain: 3.0,
            similarity: 1.0,
            quality,
            passes_thresholds: true,
        }
    }

    #[test]
    fn test_quality_score_weights() {
        let mut c = candidate("use", 3.0, 0.9, 1);
        c.log_prob = -2.0;
        let quality = quality_score(&score(5.0, 7), &c);
        assert!((quality - (1.5 + 6.0 + 9.0 - 0.2)).abs() < 1e-9);

        // A fluency loss costs more than an uncertain original gains
        let worse = candidate("role", -1.0, 0.9, 1);
        assert!(quality_score(&score(5.0, 7), &worse) < quality_score(&score(0.5, 1), &c));
    }

    #[test]
    fn test_rank_modifications() {
        let mut mods = vec![modification(3, 8.0), modification(1, 12.5), modification(0, 8.0)];
        rank_modifications(&mut mods);
        let order: Vec<usize> = mods.iter().map(|m| m.word_index).collect();
        assert_eq!(order, vec![1, 0, 3]);
    }

    #[test]
    fn test_edit_reason() {
        let mut c = candidate("use", 2.314, 0.9812, 1);
        c.entailment = Some(true);
        let reason = edit_reason(&[FlagReason::HighUncertainty { entropy: 5.2 }], &c);
        assert_eq!(
            reason,
            "high uncertainty (H=5.2 bits); improves fluency (+2.31 PLL); preserves meaning (0.981 sim); entailment preserved"
        );
    }
}
