//! Similarity backends.
//!
//! A backend ranks stored vectors against a query. The query engine only
//! talks to [`SimilarityBackend`], so an approximate structure can replace
//! the exact [`FlatBackend`] without touching callers.

use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;
use std::fmt;

use serde::Serialize;
use sift_core::RowId;

use crate::index::Index;

/// A stored vector's score against a query.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ScoredRow {
    pub row_id: RowId,
    pub score: f32,
}

impl ScoredRow {
    /// Total order: higher score first, then lower row id.
    ///
    /// `Ordering::Greater` means `self` ranks ahead of `other`.
    fn rank_cmp(&self, other: &Self) -> Ordering {
        self.score
            .total_cmp(&other.score)
            .then_with(|| other.row_id.cmp(&self.row_id))
    }
}

/// Heap adapter so `BinaryHeap` can order scored rows.
#[derive(Debug, Clone, Copy)]
struct Ranked(ScoredRow);

impl PartialEq for Ranked {
    fn eq(&self, other: &Self) -> bool {
        self.0.rank_cmp(&other.0) == Ordering::Equal
    }
}

impl Eq for Ranked {}

impl PartialOrd for Ranked {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Ranked {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.rank_cmp(&other.0)
    }
}

/// Scored ranking over a fixed set of vectors.
pub trait SimilarityBackend: Send + Sync + fmt::Debug {
    /// Dimension every query must have.
    fn dimension(&self) -> usize;

    /// Number of stored vectors.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The `k` best matches for `query`, sorted by descending score with
    /// ties broken by ascending row id.
    ///
    /// Callers guarantee `query.len() == self.dimension()`.
    fn rank(&self, query: &[f32], k: usize) -> Vec<ScoredRow>;
}

/// Exact brute-force backend: scores every stored vector.
///
/// O(n * dim) per query.
#[derive(Debug, Clone)]
pub struct FlatBackend {
    index: Index,
}

impl FlatBackend {
    #[must_use]
    pub fn new(index: Index) -> Self {
        Self { index }
    }

    #[must_use]
    pub fn index(&self) -> &Index {
        &self.index
    }
}

impl SimilarityBackend for FlatBackend {
    fn dimension(&self) -> usize {
        self.index.dimension()
    }

    fn len(&self) -> usize {
        self.index.len()
    }

    fn rank(&self, query: &[f32], k: usize) -> Vec<ScoredRow> {
        let k = k.min(self.index.len());
        if k == 0 {
            return Vec::new();
        }

        // Min-heap of the best k seen so far; the root is the weakest.
        let mut heap: BinaryHeap<Reverse<Ranked>> = BinaryHeap::with_capacity(k + 1);
        for (row_id, vector) in self.index.entries() {
            // Adding 0.0 folds -0.0 into 0.0 so the tie-break sees equal scores.
            let candidate = Ranked(ScoredRow {
                row_id,
                score: dot(query, vector) + 0.0,
            });
            if heap.len() < k {
                heap.push(Reverse(candidate));
            } else if heap.peek().is_some_and(|weakest| candidate > weakest.0) {
                heap.pop();
                heap.push(Reverse(candidate));
            }
        }

        // Ascending `Reverse<Ranked>` is best-first.
        heap.into_sorted_vec()
            .into_iter()
            .map(|Reverse(Ranked(row))| row)
            .collect()
    }
}

/// Inner product of two equal-length vectors.
#[must_use]
pub fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize::normalize;

    fn backend(vectors: &[(u64, &[f32])]) -> FlatBackend {
        let dimension = vectors.first().map_or(2, |(_, v)| v.len());
        let index = Index::from_entries(
            dimension,
            vectors
                .iter()
                .map(|(id, v)| (RowId::new(*id), normalize(v).unwrap())),
        )
        .unwrap();
        FlatBackend::new(index)
    }

    fn ids(rows: &[ScoredRow]) -> Vec<u64> {
        rows.iter().map(|r| r.row_id.get()).collect()
    }

    #[test]
    fn test_dot() {
        assert_eq!(dot(&[1.0, 2.0, 3.0], &[4.0, 5.0, 6.0]), 32.0);
    }

    #[test]
    fn test_rank_orders_by_descending_score() {
        let backend = backend(&[(0, &[0.0, 1.0]), (1, &[1.0, 0.0]), (2, &[0.7, 0.7])]);
        let ranked = backend.rank(&[1.0, 0.0], 3);

        assert_eq!(ids(&ranked), vec![1, 2, 0]);
        assert!(ranked.windows(2).all(|w| w[0].score >= w[1].score));
    }

    #[test]
    fn test_rank_breaks_ties_by_row_id() {
        let backend = backend(&[
            (3, &[1.0, 0.0]),
            (1, &[1.0, 0.0]),
            (2, &[0.0, 1.0]),
            (0, &[1.0, 0.0]),
        ]);
        let ranked = backend.rank(&[1.0, 0.0], 4);
        assert_eq!(ids(&ranked), vec![0, 1, 3, 2]);
    }

    #[test]
    fn test_rank_ties_at_the_cutoff_keep_lowest_row_ids() {
        let backend = backend(&[(4, &[1.0, 0.0]), (2, &[1.0, 0.0]), (9, &[1.0, 0.0])]);
        let ranked = backend.rank(&[1.0, 0.0], 2);
        assert_eq!(ids(&ranked), vec![2, 4]);
    }

    #[test]
    fn test_rank_treats_signed_zero_scores_as_ties() {
        let backend = backend(&[(1, &[0.0, 1.0]), (0, &[0.0, -1.0])]);
        let ranked = backend.rank(&[-1.0, 0.0], 2);
        assert_eq!(ids(&ranked), vec![0, 1]);
    }

    #[test]
    fn test_rank_clamps_k_to_len() {
        let backend = backend(&[(0, &[1.0, 0.0]), (1, &[0.0, 1.0])]);
        assert_eq!(backend.rank(&[1.0, 0.0], 10).len(), 2);
        assert!(backend.rank(&[1.0, 0.0], 0).is_empty());
    }

    #[test]
    fn test_rank_matches_full_sort() {
        let vectors: Vec<(u64, Vec<f32>)> = (0..50_u64)
            .map(|i| {
                let x = i as f32;
                (i, vec![(x * 0.37).sin(), (x * 1.91).cos(), (x % 7.0) - 3.0])
            })
            .collect();
        let refs: Vec<(u64, &[f32])> = vectors.iter().map(|(i, v)| (*i, v.as_slice())).collect();
        let backend = backend(&refs);
        let query = normalize(&[0.3, -0.2, 0.9]).unwrap();

        let mut expected: Vec<ScoredRow> = backend
            .index()
            .entries()
            .map(|(row_id, v)| ScoredRow {
                row_id,
                score: dot(query.as_slice(), v) + 0.0,
            })
            .collect();
        expected.sort_by(|a, b| b.rank_cmp(a));
        expected.truncate(7);

        assert_eq!(backend.rank(query.as_slice(), 7), expected);
    }
}
