use lazy_static::lazy_static;
use regex::Regex;
use refrain_corpus::{SegSpan, Segment};

lazy_static! {
    static ref WORD: Regex = Regex::new(r"[A-Za-z0-9']+").unwrap();
}

/// Lowercase word tokens: maximal runs of alphanumerics and apostrophes
/// over the lowercased text.
pub fn word_tokens(text: &str) -> Vec<String> {
    WORD.find_iter(&text.to_lowercase())
        .map(|m| m.as_str().to_string())
        .collect()
}

/// Parallel token / segment-id arrays over one transcript, in segment
/// order. `tok2seg[i]` is the id of the segment that produced `tokens[i]`.
#[derive(Debug, Clone, Default)]
pub struct TokenStream {
    pub tokens: Vec<String>,
    pub tok2seg: Vec<i64>,
}

impl TokenStream {
    pub fn from_segments(segments: &[Segment]) -> Self {
        let mut tokens = Vec::new();
        let mut tok2seg = Vec::new();
        for seg in segments {
            for word in word_tokens(&seg.text) {
                tokens.push(word);
                tok2seg.push(seg.id);
            }
        }
        Self { tokens, tok2seg }
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// Segment-id bounds covered by the inclusive token range `[lo, hi]`.
    pub fn seg_span(&self, lo: usize, hi: usize) -> SegSpan {
        let mut start = self.tok2seg[lo];
        let mut end = self.tok2seg[lo];
        for &sid in &self.tok2seg[lo..=hi] {
            start = start.min(sid);
            end = end.max(sid);
        }
        SegSpan::new(start, end)
    }

    pub fn phrase(&self, lo: usize, hi: usize) -> String {
        self.tokens[lo..=hi].join(" ")
    }
}

/// Locate the occurrence of `pattern` whose segment coverage overlaps the
/// target span best. The first best-scoring occurrence wins ties. Returns
/// inclusive token indices.
pub fn find_anchor(
    stream: &TokenStream,
    pattern: &[String],
    target: SegSpan,
) -> Option<(usize, usize)> {
    let m = pattern.len();
    if m == 0 || stream.len() < m {
        return None;
    }

    let mut best: Option<(usize, usize, i64)> = None;
    for i in 0..=(stream.len() - m) {
        if stream.tokens[i..i + m] == *pattern {
            let covered = stream.seg_span(i, i + m - 1);
            let overlap =
                covered.end_id.min(target.end_id) - covered.start_id.max(target.start_id) + 1;
            if best.is_none_or(|(_, _, b)| overlap > b) {
                best = Some((i, i + m - 1, overlap));
            }
        }
    }
    best.map(|(lo, hi, _)| (lo, hi))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stream(words: &[(&str, i64)]) -> TokenStream {
        TokenStream {
            tokens: words.iter().map(|(w, _)| w.to_string()).collect(),
            tok2seg: words.iter().map(|(_, s)| *s).collect(),
        }
    }

    fn pat(words: &[&str]) -> Vec<String> {
        words.iter().map(|w| w.to_string()).collect()
    }

    #[test]
    fn word_rule_lowercases_and_keeps_apostrophes() {
        assert_eq!(
            word_tokens("Don't stop -- believin', folks!"),
            vec!["don't", "stop", "believin'", "folks"]
        );
        assert_eq!(word_tokens("  ...  "), Vec::<String>::new());
        assert_eq!(word_tokens("A1 b2"), vec!["a1", "b2"]);
    }

    #[test]
    fn seg_span_covers_token_range() {
        let s = stream(&[("a", 10), ("b", 10), ("c", 11), ("d", 12)]);
        assert_eq!(s.seg_span(1, 2), SegSpan::new(10, 11));
        assert_eq!(s.seg_span(3, 3), SegSpan::new(12, 12));
    }

    #[test]
    fn anchor_prefers_best_overlap() {
        // the pattern occurs twice; the second occurrence sits in the
        // targeted segment range
        let s = stream(&[
            ("we", 1),
            ("hold", 1),
            ("x", 2),
            ("we", 5),
            ("hold", 6),
        ]);
        let found = find_anchor(&s, &pat(&["we", "hold"]), SegSpan::new(5, 6));
        assert_eq!(found, Some((3, 4)));

        let found = find_anchor(&s, &pat(&["we", "hold"]), SegSpan::new(1, 1));
        assert_eq!(found, Some((0, 1)));
    }

    #[test]
    fn anchor_missing_pattern_is_none() {
        let s = stream(&[("a", 1), ("b", 1)]);
        assert_eq!(find_anchor(&s, &pat(&["z"]), SegSpan::new(1, 1)), None);
        assert_eq!(find_anchor(&s, &[], SegSpan::new(1, 1)), None);
    }
}
