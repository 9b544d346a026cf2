//! Probability distribution over the vocabulary at one masked position.

use std::cmp::Ordering;

/// Log-probabilities (natural log) for every vocabulary entry.
#[derive(Debug, Clone, PartialEq)]
pub struct Distribution {
    log_probs: Vec<f64>,
}

impl Distribution {
    /// Numerically stable log-softmax of raw logits.
    pub fn from_logits(logits: &[f32]) -> Self {
        let max = logits
            .iter()
            .map(|&l| l as f64)
            .filter(|l| l.is_finite())
            .fold(f64::NEG_INFINITY, f64::max);
        if !max.is_finite() {
            return Self {
                log_probs: vec![f64::NEG_INFINITY; logits.len()],
            };
        }

        let sum: f64 = logits
            .iter()
            .map(|&l| l as f64)
            .filter(|l| l.is_finite())
            .map(|l| (l - max).exp())
            .sum();
        let log_z = max + sum.ln();

        let log_probs = logits
            .iter()
            .map(|&l| {
                let l = l as f64;
                if l.is_finite() { l - log_z } else { f64::NEG_INFINITY }
            })
            .collect();
        Self { log_probs }
    }

    pub fn len(&self) -> usize {
        self.log_probs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.log_probs.is_empty()
    }

    /// Natural-log probability of `id`; `-inf` outside the vocabulary.
    pub fn log_prob(&self, id: u32) -> f64 {
        self.log_probs
            .get(id as usize)
            .copied()
            .unwrap_or(f64::NEG_INFINITY)
    }

    pub fn prob(&self, id: u32) -> f64 {
        self.log_prob(id).exp()
    }

    /// Shannon entropy in bits.
    pub fn entropy_bits(&self) -> f64 {
        let nats: f64 = self
            .log_probs
            .iter()
            .filter(|lp| lp.is_finite())
            .map(|&lp| -lp.exp() * lp)
            .sum();
        (nats / std::f64::consts::LN_2).max(0.0)
    }

    /// 1-based rank of `id`, ties broken by vocabulary index.
    pub fn rank(&self, id: u32) -> usize {
        let target = self.log_prob(id);
        let index = id as usize;
        let ahead = self
            .log_probs
            .iter()
            .enumerate()
            .filter(|&(j, &lp)| lp > target || (lp == target && j < index))
            .count();
        ahead + 1
    }

    /// The `k` most probable ids, best first, ties by vocabulary index.
    pub fn top_k(&self, k: usize) -> Vec<(u32, f64)> {
        let mut ranked: Vec<(u32, f64)> = self
            .log_probs
            .iter()
            .enumerate()
            .map(|(i, &lp)| (i as u32, lp))
            .collect();
        ranked.sort_by(|a, b| match b.1.total_cmp(&a.1) {
            Ordering::Equal => a.0.cmp(&b.0),
            other => other,
        });
        ranked.truncate(k);
        ranked
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uniform_entropy() {
        let dist = Distribution::from_logits(&[0.0; 8]);
        assert!((dist.entropy_bits() - 3.0).abs() < 1e-9);
        assert!((dist.prob(3) - 0.125).abs() < 1e-12);
    }

    #[test]
    fn test_peaked_entropy_near_zero() {
        let mut logits = vec![0.0f32; 100];
        logits[7] = 60.0;
        let dist = Distribution::from_logits(&logits);
        assert!(dist.entropy_bits() >= 0.0);
        assert!(dist.entropy_bits() < 1e-6);
        assert_eq!(dist.rank(7), 1);
    }

    #[test]
    fn test_stable_with_large_logits() {
        let dist = Distribution::from_logits(&[1000.0, 1000.0]);
        assert!((dist.log_prob(0) - 0.5f64.ln()).abs() < 1e-9);
    }

    #[test]
    fn test_rank_ties_by_vocab_index() {
        let dist = Distribution::from_logits(&[1.0, 3.0, 1.0, 1.0]);
        assert_eq!(dist.rank(1), 1);
        assert_eq!(dist.rank(0), 2);
        assert_eq!(dist.rank(2), 3);
        assert_eq!(dist.rank(3), 4);
    }

    #[test]
    fn test_top_k_ordering() {
        let dist = Distribution::from_logits(&[1.0, 3.0, 1.0, 2.0]);
        let ids: Vec<u32> = dist.top_k(3).iter().map(|(id, _)| *id).collect();
        assert_eq!(ids, vec![1, 3, 0]);
        assert_eq!(dist.top_k(10).len(), 4);
    }

    #[test]
    fn test_out_of_vocab_id() {
        let dist = Distribution::from_logits(&[0.0, 0.0]);
        assert_eq!(dist.log_prob(5), f64::NEG_INFINITY);
        assert_eq!(dist.rank(5), 3);
    }

    #[test]
    fn test_empty_logits() {
        let dist = Distribution::from_logits(&[]);
        assert!(dist.is_empty());
        assert_eq!(dist.entropy_bits(), 0.0);
        assert_eq!(dist.rank(0), 1);
    }
}
