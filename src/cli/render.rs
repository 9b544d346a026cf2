//! Terminal rendering for candidate reports, highlight reports and refinements.

use colored::Colorize;

use flow_refine::inference::Span;
use flow_refine::config::RefineConfig;
use flow_refine::pipeline::{Candidate, CandidateReport, HighlightReport, SentenceStatus, StopReason, TextRefinement};
use flow_refine::text::splice;

/// Render `text` with the words at `spans` emphasized.
fn emphasize(text: &str, spans: &[Span]) -> String {
    let painted: Vec<String> = spans
        .iter()
        .map(|s| text[s.start..s.end].yellow().bold().underline().to_string())
        .collect();
    let replacements: Vec<(Span, &str)> = spans.iter().copied().zip(painted.iter().map(String::as_str)).collect();
    splice(text, &replacements)
}

fn candidate_line(candidate: &Candidate) -> String {
    let mark = if candidate.passes_thresholds {
        "✓".green().to_string()
    } else {
        " ".to_string()
    };
    let mut line = format!(
        "{} {:<16} {:+.2} PLL  {:.3} sim",
        mark,
        candidate.text,
        candidate.pll_gain,
        candidate.similarity
    );
    match candidate.entailment {
        Some(true) => line.push_str("  entails"),
        Some(false) => line.push_str(&format!("  {}", "contradicts".red())),
        None => {}
    }
    line
}

/// Human-readable candidates report; `config` supplies the legend thresholds.
pub fn render_candidates(report: &CandidateReport, config: &RefineConfig) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "{}\n",
        format!(
            "✓ = passes thresholds (ΔLL ≥ {:.1}, sim ≥ {:.2})",
            config.min_pll_gain, config.min_sbert_cosine
        )
        .dimmed()
    ));

    let numbered = report.sentences.len() > 1;
    for (n, sentence) in report.sentences.iter().enumerate() {
        out.push('\n');
        if numbered {
            out.push_str(&format!("{} {}\n", format!("Sentence {}:", n + 1).bold(), sentence.sentence));
        }
        if sentence.modifications.is_empty() {
            out.push_str(&format!("{}\n", "No linguistically compatible modifications found.".dimmed()));
            continue;
        }
        for (i, m) in sentence.modifications.iter().enumerate() {
            let mark = if m.passes_thresholds {
                "✓".green().to_string()
            } else {
                " ".to_string()
            };
            out.push_str(&format!(
                "{} {}. {} → {}\n",
                mark,
                i + 1,
                m.original.yellow(),
                m.replacement.green().bold()
            ));
            out.push_str(&format!("     {}\n", m.modified));
            out.push_str(&format!(
                "     quality {:6.2} | ΔLL {:+6.2} | sim {:.3}\n",
                m.quality, m.pll_gain, m.similarity
            ));
            out.push_str(&format!(
                "     {}\n",
                format!("original entropy {:.2} bits | rank #{}", m.entropy, m.rank).dimmed()
            ));
        }
    }
    out
}

/// Human-readable highlight report.
pub fn render_highlight(report: &HighlightReport) -> String {
    let mut out = String::new();
    let spans: Vec<Span> = report.words.iter().map(|w| w.span).collect();
    out.push_str(&emphasize(report.text.trim_end(), &spans));
    out.push_str("\n\n");

    for word in &report.words {
        out.push_str(&format!(
            "{} at {}..{}\n",
            word.text.yellow().bold(),
            word.span.start,
            word.span.end
        ));
        let reasons: Vec<String> = word.reasons.iter().map(ToString::to_string).collect();
        out.push_str(&format!("    {}\n", reasons.join(", ").dimmed()));
        if word.suggestions.is_empty() {
            out.push_str(&format!("    {}\n", "no suggestions".dimmed()));
        }
        for candidate in &word.suggestions {
            out.push_str(&format!("    {}\n", candidate_line(candidate)));
        }
    }

    out.push_str(&format!(
        "{} word(s) highlighted in {} sentence(s)\n",
        report.total_highlighted, report.sentence_count
    ));
    out
}

/// Human-readable refinement summary.
pub fn render_refinement(refinement: &TextRefinement) -> String {
    let mut out = String::new();
    out.push_str(refinement.refined.trim_end());
    out.push('\n');

    let edits: Vec<_> = refinement.edits().collect();
    if !edits.is_empty() {
        out.push('\n');
    }
    for (n, edit) in edits.iter().enumerate() {
        out.push_str(&format!(
            "{}. {} → {}\n",
            n + 1,
            edit.original.red().strikethrough(),
            edit.replacement.green().bold()
        ));
        out.push_str(&format!("   {}\n", edit.reason.dimmed()));
        if !edit.alternatives.is_empty() {
            let alternatives: Vec<String> = edit
                .alternatives
                .iter()
                .map(|a| format!("{} ({:+.2})", a.text, a.pll_gain))
                .collect();
            out.push_str(&format!("   also: {}\n", alternatives.join(", ")));
        }
    }

    for outcome in &refinement.sentences {
        match &outcome.status {
            SentenceStatus::Failed { error } => {
                out.push_str(&format!(
                    "{} sentence at {}..{} left unchanged: {}\n",
                    "warning:".yellow().bold(),
                    outcome.span.start,
                    outcome.span.end,
                    error
                ));
            }
            SentenceStatus::Refined(result) if result.stop_reason == StopReason::BudgetExhausted => {
                out.push_str(&format!(
                    "{}\n",
                    format!("edit budget reached at {}..{}", outcome.span.start, outcome.span.end).dimmed()
                ));
            }
            SentenceStatus::Refined(_) => {}
        }
    }

    out.push_str(&format!(
        "{} edit(s) in {} sentence(s)\n",
        edits.len(),
        refinement.sentences.len()
    ));
    out
}
