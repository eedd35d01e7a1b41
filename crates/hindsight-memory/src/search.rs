// SPDX-FileCopyrightText: 2026 Hindsight Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Brute-force cosine ranking.
//!
//! Stores are small (tens of thousands of rows at most), so every embedded
//! entry in scope is scored against the query.

use std::cmp::Ordering;

use tracing::trace;

use crate::types::{cosine_similarity, Candidate, SearchHit};

/// Rank `candidates` against `query`.
///
/// Entries whose dimensionality differs from the query are skipped. The
/// floor is inclusive: a similarity exactly equal to `floor` is kept. Ties
/// are broken by the most recent `updated_at`.
pub fn rank(query: &[f32], candidates: Vec<Candidate>, floor: f64, top_k: usize) -> Vec<SearchHit> {
    let mut hits: Vec<SearchHit> = candidates
        .into_iter()
        .filter_map(|c| {
            if c.embedding.len() != query.len() {
                trace!(id = %c.id, dims = c.embedding.len(), "skipping dimension mismatch");
                return None;
            }
            let similarity = cosine_similarity(query, &c.embedding);
            (similarity >= floor).then(|| SearchHit {
                id: c.id,
                content: c.content,
                category: c.category,
                similarity,
                updated_at: c.updated_at,
                via_link: false,
            })
        })
        .collect();

    hits.sort_by(compare_hits);
    hits.truncate(top_k);
    hits
}

/// Descending similarity, then descending `updated_at`, then id for stability.
pub(crate) fn compare_hits(a: &SearchHit, b: &SearchHit) -> Ordering {
    b.similarity
        .partial_cmp(&a.similarity)
        .unwrap_or(Ordering::Equal)
        .then_with(|| b.updated_at.cmp(&a.updated_at))
        .then_with(|| a.id.cmp(&b.id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::MemoryCategory;

    /// A unit vector whose cosine with `[1, 0]` is exactly `cos`.
    fn at_cosine(id: &str, cos: f64, updated_at: &str) -> Candidate {
        let sin = (1.0 - cos * cos).sqrt();
        Candidate {
            id: id.to_string(),
            content: format!("content {id}"),
            category: MemoryCategory::Learning,
            updated_at: updated_at.to_string(),
            embedding: vec![cos as f32, sin as f32],
        }
    }

    #[test]
    fn floor_keeps_only_entries_above_threshold_in_order() {
        let candidates = vec![
            at_cosine("c", 0.2, "2026-01-01"),
            at_cosine("a", 0.9, "2026-01-01"),
            at_cosine("d", 0.05, "2026-01-01"),
            at_cosine("b", 0.5, "2026-01-01"),
        ];
        let hits = rank(&[1.0, 0.0], candidates, 0.3, 5);
        let ids: Vec<&str> = hits.iter().map(|h| h.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b"]);
        assert!(hits[0].similarity > hits[1].similarity);
    }

    #[test]
    fn floor_is_inclusive() {
        let exact = Candidate {
            id: "edge".into(),
            content: "edge".into(),
            category: MemoryCategory::Pattern,
            updated_at: "2026-01-01".into(),
            embedding: vec![1.0, 1.0],
        };
        let floor = cosine_similarity(&[1.0, 0.0], &exact.embedding);
        let hits = rank(&[1.0, 0.0], vec![exact], floor, 5);
        assert_eq!(hits.len(), 1);
    }

    #[test]
    fn ties_prefer_most_recent_update() {
        let candidates = vec![
            at_cosine("old", 0.8, "2026-01-01T00:00:00.000Z"),
            at_cosine("new", 0.8, "2026-02-01T00:00:00.000Z"),
        ];
        let hits = rank(&[1.0, 0.0], candidates, 0.3, 5);
        assert_eq!(hits[0].id, "new");
        assert_eq!(hits[1].id, "old");
    }

    #[test]
    fn truncates_to_top_k_and_skips_mismatched_dimensions() {
        let mut candidates: Vec<Candidate> = (0..8)
            .map(|i| at_cosine(&format!("m{i}"), 0.95, "2026-01-01"))
            .collect();
        candidates.push(Candidate {
            id: "wide".into(),
            content: "wide".into(),
            category: MemoryCategory::Context,
            updated_at: "2026-01-01".into(),
            embedding: vec![1.0, 0.0, 0.0],
        });
        let hits = rank(&[1.0, 0.0], candidates, 0.3, 5);
        assert_eq!(hits.len(), 5);
        assert!(hits.iter().all(|h| h.id != "wide"));
    }

    #[test]
    fn zero_query_matches_nothing_above_positive_floor() {
        let hits = rank(&[0.0, 0.0], vec![at_cosine("a", 0.9, "2026-01-01")], 0.3, 5);
        assert!(hits.is_empty());
    }
}
