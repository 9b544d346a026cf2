//! Edit approval: the request/response exchange behind interactive mode.
//!
//! The pipeline proposes one edit at a time and waits for an `Approval`.
//! Automatic mode is simply an approver that always accepts.

use std::collections::VecDeque;

use super::types::Candidate;
use crate::inference::Span;

/// Response to an edit proposal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Approval {
    /// Apply the proposed candidate
    Accept,
    /// Leave the word as it is
    Reject,
    /// Apply the alternative at this 0-based index instead
    Select(usize),
}

/// One proposed edit awaiting approval.
#[derive(Debug, Clone)]
pub struct EditProposal<'a> {
    /// Current sentence text, earlier edits applied
    pub sentence: &'a str,
    pub word_index: usize,
    pub original: &'a str,
    pub span: Span,
    /// Every passing candidate, best first; index 0 is the proposal
    pub alternatives: &'a [Candidate],
    /// Reason string the edit will carry if the proposal is accepted
    pub reason: &'a str,
}

impl EditProposal<'_> {
    pub fn proposed(&self) -> Option<&Candidate> {
        self.alternatives.first()
    }
}

/// Decides whether proposed edits are applied.
pub trait EditApprover: Send {
    fn approve(&mut self, proposal: &EditProposal<'_>) -> Approval;
}

/// Accepts every proposal.
#[derive(Debug, Clone, Copy, Default)]
pub struct AutoApprove;

impl EditApprover for AutoApprove {
    fn approve(&mut self, _proposal: &EditProposal<'_>) -> Approval {
        Approval::Accept
    }
}

/// Replays a fixed list of decisions, rejecting once the list runs out.
#[derive(Debug, Clone, Default)]
pub struct ScriptedApprover {
    script: VecDeque<Approval>,
    seen: Vec<String>,
}

impl ScriptedApprover {
    pub fn new(script: impl IntoIterator<Item = Approval>) -> Self {
        Self {
            script: script.into_iter().collect(),
            seen: Vec::new(),
        }
    }

    /// Original words of every proposal received, in order.
    pub fn seen(&self) -> &[String] {
        &self.seen
    }
}

impl EditApprover for ScriptedApprover {
    fn approve(&mut self, proposal: &EditProposal<'_>) -> Approval {
        self.seen.push(proposal.original.to_string());
        self.script.pop_front().unwrap_or(Approval::Reject)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn proposal<'a>(alternatives: &'a [Candidate]) -> EditProposal<'a> {
        EditProposal {
            sentence: "We utilize tools.",
            word_index: 1,
            original: "utilize",
            span: Span::new(3, 10),
            alternatives,
            reason: "",
        }
    }

    #[test]
    fn test_auto_approve() {
        let mut approver = AutoApprove;
        assert_eq!(approver.approve(&proposal(&[])), Approval::Accept);
    }

    #[test]
    fn test_scripted_approver_replays_then_rejects() {
        let mut approver = ScriptedApprover::new([Approval::Select(1), Approval::Accept]);
        assert_eq!(approver.approve(&proposal(&[])), Approval::Select(1));
        assert_eq!(approver.approve(&proposal(&[])), Approval::Accept);
        assert_eq!(approver.approve(&proposal(&[])), Approval::Reject);
        assert_eq!(approver.seen(), &["utilize", "utilize", "utilize"]);
    }

    #[test]
    fn test_proposed_is_first_alternative() {
        assert!(proposal(&[]).proposed().is_none());
    }
}
