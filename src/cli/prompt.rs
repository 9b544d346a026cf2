//! Interactive approval at the terminal.

use std::io::{self, BufRead, BufReader, Stdin, Stdout, Write};

use colored::Colorize;

use flow_refine::pipeline::{Approval, EditApprover, EditProposal};

/// Parse one answer to an edit prompt.
///
/// `y`/empty accepts, `n` rejects, `1..=n` selects a numbered alternative.
pub fn parse_answer(input: &str, alternatives: usize) -> Option<Approval> {
    match input.trim().to_lowercase().as_str() {
        "" | "y" | "yes" => Some(Approval::Accept),
        "n" | "no" => Some(Approval::Reject),
        other => {
            let n: usize = other.parse().ok()?;
            (1..=alternatives).contains(&n).then(|| Approval::Select(n - 1))
        }
    }
}

/// Asks about each proposal on `output` and reads answers from `input`.
///
/// End of input rejects every remaining proposal.
pub struct PromptApprover<R, W> {
    input: R,
    output: W,
}

impl PromptApprover<BufReader<Stdin>, Stdout> {
    pub fn stdio() -> Self {
        Self::new(BufReader::new(io::stdin()), io::stdout())
    }
}

impl<R: BufRead, W: Write> PromptApprover<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    fn show(&mut self, proposal: &EditProposal<'_>) -> io::Result<()> {
        let span = proposal.span;
        let sentence = proposal.sentence;
        writeln!(
            self.output,
            "\n{}{}{}",
            &sentence[..span.start],
            sentence[span.start..span.end].yellow().bold().underline(),
            &sentence[span.end..]
        )?;
        writeln!(self.output, "  {}", proposal.reason.dimmed())?;
        for (n, candidate) in proposal.alternatives.iter().enumerate() {
            writeln!(
                self.output,
                "  {}. {} → {}  ({:+.2} PLL, {:.3} sim)",
                n + 1,
                proposal.original,
                candidate.text.green(),
                candidate.pll_gain,
                candidate.similarity
            )?;
        }
        write!(
            self.output,
            "Apply? [Y/n/1-{}] (Ctrl-C then Enter cancels) ",
            proposal.alternatives.len()
        )?;
        self.output.flush()
    }

    fn ask(&mut self, proposal: &EditProposal<'_>) -> io::Result<Approval> {
        loop {
            self.show(proposal)?;
            let mut line = String::new();
            if self.input.read_line(&mut line)? == 0 {
                return Ok(Approval::Reject);
            }
            if let Some(approval) = parse_answer(&line, proposal.alternatives.len()) {
                return Ok(approval);
            }
            writeln!(self.output, "{}", "Please answer y, n or a listed number".red())?;
        }
    }
}

impl<R: BufRead + Send, W: Write + Send> EditApprover for PromptApprover<R, W> {
    fn approve(&mut self, proposal: &EditProposal<'_>) -> Approval {
        match self.ask(proposal) {
            Ok(approval) => approval,
            Err(e) => {
                log::warn!("Prompt failed, rejecting edit: {}", e);
                Approval::Reject
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flow_refine::inference::Span;
    use flow_refine::pipeline::Candidate;
    use std::io::Cursor;

    fn candidate(text: &str) -> Candidate {
        Candidate {
            text: text.to_string(),
            log_prob: -1.0,
            rank: 1,
            pll_gain: 3.0,
            similarity: 1.0,
            entailment: None,
            fluency_ok: true,
            similarity_ok: true,
            passes_thresholds: true,
        }
    }

    fn proposal<'a>(alternatives: &'a [Candidate]) -> EditProposal<'a> {
        EditProposal {
            sentence: "We utilize tools.",
            word_index: 1,
            original: "utilize",
            span: Span::new(3, 10),
            alternatives,
            reason: "high uncertainty (H=6.4 bits)",
        }
    }

    #[test]
    fn test_parse_answer() {
        assert_eq!(parse_answer("y\n", 2), Some(Approval::Accept));
        assert_eq!(parse_answer("\n", 2), Some(Approval::Accept));
        assert_eq!(parse_answer("No", 2), Some(Approval::Reject));
        assert_eq!(parse_answer("2", 2), Some(Approval::Select(1)));
        assert_eq!(parse_answer("3", 2), None);
        assert_eq!(parse_answer("0", 2), None);
        assert_eq!(parse_answer("maybe", 2), None);
    }

    #[test]
    fn test_prompt_reprompts_on_bad_answer() {
        colored::control::set_override(false);
        let alternatives = [candidate("use"), candidate("employ")];
        let mut output = Vec::new();
        let mut approver = PromptApprover::new(Cursor::new("what\n2\n"), &mut output);

        assert_eq!(approver.approve(&proposal(&alternatives)), Approval::Select(1));
        let shown = String::from_utf8(output).unwrap();
        assert!(shown.contains("1. utilize → use"));
        assert!(shown.contains("2. utilize → employ"));
        assert!(shown.contains("Please answer"));
        assert!(shown.contains("Ctrl-C then Enter cancels"));
    }

    #[test]
    fn test_end_of_input_rejects() {
        let alternatives = [candidate("use")];
        let mut approver = PromptApprover::new(Cursor::new(""), Vec::new());
        assert_eq!(approver.approve(&proposal(&alternatives)), Approval::Reject);
    }
}
