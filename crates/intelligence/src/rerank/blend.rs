//! Position-aware score blending for re-ranking
//!
//! Blends RRF scores with reranker relevance scores using position-aware weights:
//! - Ranks 1-3: 75% RRF + 25% reranker (trust established ranking)
//! - Ranks 4-10: 60% RRF + 40% reranker (moderate reranker influence)
//! - Ranks 11+: 40% RRF + 60% reranker (reranker dominates tail)

use super::RerankScore;
use strata_engine::search::SearchHit;

/// Blend RRF scores with reranker scores using position-aware weights.
///
/// Hits without a matching reranker score keep their normalized RRF score.
/// Results are re-sorted by blended score (descending) and ranks reassigned.
pub fn blend_scores(mut hits: Vec<SearchHit>, scores: &[RerankScore]) -> Vec<SearchHit> {
    if hits.is_empty() || scores.is_empty() {
        return hits;
    }

    // Normalize RRF scores to [0, 1]
    let max_rrf = hits
        .iter()
        .map(|h| h.score)
        .fold(f32::NEG_INFINITY, f32::max);
    let min_rrf = hits.iter().map(|h| h.score).fold(f32::INFINITY, f32::min);
    let rrf_range = max_rrf - min_rrf;

    for (pos, hit) in hits.iter_mut().enumerate() {
        let norm_rrf = if rrf_range > 0.0 {
            (hit.score - min_rrf) / rrf_range
        } else {
            1.0 // all same score → treat as 1.0
        };

        // Find matching reranker score by original index
        if let Some(rerank) = scores.iter().find(|s| s.index == pos) {
            let (w_rrf, w_rerank) = position_weights(pos);
            hit.score = w_rrf * norm_rrf + w_rerank * rerank.relevance_score;
        } else {
            hit.score = norm_rrf;
        }
    }

    // Re-sort by blended score (descending)
    hits.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    // Reassign ranks (1-indexed)
    for (i, hit) in hits.iter_mut().enumerate() {
        hit.rank = (i + 1) as u32;
    }

    hits
}

/// Position-aware weights: (rrf_weight, reranker_weight).
///
/// Lower-ranked results give more influence to the reranker.
fn position_weights(position: usize) -> (f32, f32) {
    match position {
        0..=2 => (0.75, 0.25), // ranks 1-3
        3..=9 => (0.60, 0.40), // ranks 4-10
        _ => (0.40, 0.60),     // ranks 11+
    }
}
