//! Retrieval relevance scoring and admission.

use serde::Serialize;
use strictqa_knowledge::RetrievedSnippet;

/// Similarity given to the fallback snippet when nothing else is admitted.
pub const FALLBACK_SIMILARITY: f32 = 0.1;

const BOOST_PER_MATCH: f32 = 0.1;
const MAX_BOOST: f32 = 0.3;

/// A snippet after scoring.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoredSnippet {
    pub content: String,
    pub source_id: String,
    /// Always in `[0, 1]`
    pub similarity: f32,
    pub keyword_matches: usize,
}

/// Map a raw distance onto `[0, 1]` in three bands.
///
/// Negative and NaN distances count as 0.
pub fn distance_to_similarity(distance: f32) -> f32 {
    let d = if distance.is_nan() { 0.0 } else { distance.max(0.0) };
    let similarity = if d < 100.0 {
        1.0 - d / 100.0
    } else if d < 500.0 {
        0.8 - d / 1000.0
    } else {
        0.5 - d / 2000.0
    };
    similarity.clamp(0.0, 1.0)
}

/// Question tokens longer than three characters found in `content`.
pub fn keyword_matches(question: &str, content: &str) -> usize {
    let content = content.to_lowercase();
    question
        .to_lowercase()
        .split_whitespace()
        .filter(|word| word.chars().count() > 3 && content.contains(word))
        .count()
}

/// Score one snippet against the question.
pub fn score(snippet: &RetrievedSnippet, question: &str) -> ScoredSnippet {
    let matches = keyword_matches(question, &snippet.content);
    let boost = (BOOST_PER_MATCH * matches as f32).min(MAX_BOOST);

    ScoredSnippet {
        content: snippet.content.clone(),
        source_id: snippet.source_id.clone(),
        similarity: (distance_to_similarity(snippet.distance) + boost).min(1.0),
        keyword_matches: matches,
    }
}

/// Keep snippets at or above `min_similarity` or with any keyword match.
///
/// When candidates exist but none qualifies, the nearest one is kept with
/// [`FALLBACK_SIMILARITY`].
pub fn admit(snippets: &[RetrievedSnippet], question: &str, min_similarity: f32) -> Vec<ScoredSnippet> {
    let admitted: Vec<ScoredSnippet> = snippets
        .iter()
        .map(|s| score(s, question))
        .inspect(|s| {
            tracing::debug!(
                source = %s.source_id,
                similarity = s.similarity,
                keyword_matches = s.keyword_matches,
                "scored snippet"
            )
        })
        .filter(|s| s.similarity >= min_similarity || s.keyword_matches > 0)
        .collect();

    if !admitted.is_empty() {
        return admitted;
    }

    snippets
        .iter()
        .min_by(|a, b| a.distance.total_cmp(&b.distance))
        .map(|best| {
            tracing::debug!(source = %best.source_id, "no snippet admitted, keeping nearest");
            vec![ScoredSnippet {
                content: best.content.clone(),
                source_id: best.source_id.clone(),
                similarity: FALLBACK_SIMILARITY,
                keyword_matches: 0,
            }]
        })
        .unwrap_or_default()
}
