//! Sentence segmentation and reassembly.

use unicode_segmentation::UnicodeSegmentation;

use crate::inference::Span;

/// Split text into sentences on Unicode sentence boundaries.
///
/// Surrounding whitespace is trimmed off each sentence; spans are byte
/// offsets into `text`. Whitespace-only segments are dropped.
pub fn split_sentences(text: &str) -> Vec<(Span, &str)> {
    text.split_sentence_bound_indices()
        .filter_map(|(start, raw)| {
            let leading = raw.len() - raw.trim_start().len();
            let trimmed = raw.trim();
            if trimmed.is_empty() {
                return None;
            }
            let begin = start + leading;
            Some((Span::new(begin, begin + trimmed.len()), trimmed))
        })
        .collect()
}

/// Replace each span of `text` with its new content, keeping everything
/// between spans as-is. Spans must be sorted and non-overlapping.
pub fn splice(text: &str, replacements: &[(Span, &str)]) -> String {
    let mut out = String::with_capacity(text.len());
    let mut cursor = 0;
    for (span, content) in replacements {
        out.push_str(&text[cursor..span.start]);
        out.push_str(content);
        cursor = span.end;
    }
    out.push_str(&text[cursor..]);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_sentences() {
        let text = "The cat sat. The dog ran!  Is it here?";
        let sentences = split_sentences(text);
        let texts: Vec<&str> = sentences.iter().map(|(_, s)| *s).collect();
        assert_eq!(texts, vec!["The cat sat.", "The dog ran!", "Is it here?"]);
        for (span, s) in &sentences {
            assert_eq!(&text[span.start..span.end], *s);
        }
    }

    #[test]
    fn test_split_sentences_leading_whitespace() {
        let text = "  Hello there.\n";
        let sentences = split_sentences(text);
        assert_eq!(sentences.len(), 1);
        assert_eq!(sentences[0].0, Span::new(2, 14));
        assert_eq!(sentences[0].1, "Hello there.");
    }

    #[test]
    fn test_split_sentences_empty() {
        assert!(split_sentences("").is_empty());
        assert!(split_sentences("   \n\t").is_empty());
    }

    #[test]
    fn test_splice_preserves_gaps() {
        let text = "One two.  Three four.";
        let out = splice(text, &[(Span::new(0, 8), "Uno dos."), (Span::new(10, 21), "Tres.")]);
        assert_eq!(out, "Uno dos.  Tres.");
    }
}
