//! Lexical relevance filter for the reranker-off path.
//!
//! Cheap word-overlap heuristic: the fraction of query words that also occur
//! in a document. Not a ranking signal, only a coarse "is this about the same
//! thing" check used when the cross-encoder is disabled.

use std::collections::HashSet;

use regex::Regex;

/// Fraction of lowercase query words present in `document`, in `0.0..=1.0`.
///
/// An empty query yields `0.0`.
pub fn overlap_ratio(query: &str, document: &str) -> f32 {
    let word = word_pattern();
    let query_words: Vec<String> = word
        .find_iter(&query.to_lowercase())
        .map(|m| m.as_str().to_string())
        .collect();
    if query_words.is_empty() {
        return 0.0;
    }
    let doc_words: HashSet<String> = word
        .find_iter(&document.to_lowercase())
        .map(|m| m.as_str().to_string())
        .collect();
    let hits = query_words.iter().filter(|w| doc_words.contains(*w)).count();
    hits as f32 / query_words.len() as f32
}

/// Keep documents whose overlap with `query` clears `threshold`.
///
/// Returns the surviving indices in original order. If nothing clears the
/// threshold, all indices are returned: an overly strict lexical filter must
/// not silence retrieval entirely.
pub fn filter_by_overlap(query: &str, documents: &[String], threshold: f32) -> Vec<usize> {
    let kept: Vec<usize> = documents
        .iter()
        .enumerate()
        .filter(|(_, doc)| overlap_ratio(query, doc) >= threshold)
        .map(|(i, _)| i)
        .collect();
    if kept.is_empty() {
        (0..documents.len()).collect()
    } else {
        kept
    }
}

fn word_pattern() -> Regex {
    // Unicode word characters; panic-free because the pattern is a literal.
    #[allow(clippy::unwrap_used)]
    Regex::new(r"\w+").unwrap()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ratio_counts_query_word_coverage() {
        let r = overlap_ratio("cara retur barang", "panduan retur: barang bisa diretur");
        assert!((r - 2.0 / 3.0).abs() < 1e-6);
        assert_eq!(overlap_ratio("", "anything"), 0.0);
        assert_eq!(overlap_ratio("retur", "retur"), 1.0);
    }

    #[test]
    fn ratio_is_case_insensitive() {
        assert_eq!(overlap_ratio("RETUR Barang", "retur barang"), 1.0);
    }

    #[test]
    fn filter_keeps_everything_when_nothing_matches() {
        let docs = vec!["alpha".to_string(), "beta".to_string()];
        assert_eq!(filter_by_overlap("gamma delta", &docs, 0.8), vec![0, 1]);
    }

    #[test]
    fn filter_preserves_order_of_survivors() {
        let docs = vec![
            "cara retur barang rusak".to_string(),
            "promo bulan ini".to_string(),
            "retur barang lewat aplikasi".to_string(),
        ];
        assert_eq!(filter_by_overlap("retur barang", &docs, 0.8), vec![0, 2]);
    }
}
