//! Vector similarity for in-process search.

use std::cmp::Reverse;

use ordered_float::OrderedFloat;
use serde::Serialize;

use crate::error::{EmbeddingError, Result};

/// Cosine similarity of two equal-length vectors, in `[-1.0, 1.0]`.
///
/// A zero vector is similar to nothing and scores `0.0`.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> Result<f32> {
    if a.len() != b.len() {
        return Err(EmbeddingError::DimensionMismatch {
            expected: a.len(),
            actual: b.len(),
        });
    }

    let (dot, norm_a, norm_b) = a
        .iter()
        .zip(b)
        .fold((0.0f32, 0.0f32, 0.0f32), |(dot, na, nb), (x, y)| {
            (dot + x * y, na + x * x, nb + y * y)
        });
    if norm_a == 0.0 || norm_b == 0.0 {
        return Ok(0.0);
    }
    Ok(dot / (norm_a.sqrt() * norm_b.sqrt()))
}

/// An id and its similarity to a query.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoredId {
    pub id: String,
    pub score: f32,
}

/// Rank `candidates` against `query`, best first.
///
/// Keeps at most `k` candidates scoring at least `min_score`. Equal scores
/// are ordered by id.
pub fn rank_by_similarity<'a, I>(
    query: &[f32],
    candidates: I,
    k: usize,
    min_score: f32,
) -> Result<Vec<ScoredId>>
where
    I: IntoIterator<Item = (&'a str, &'a [f32])>,
{
    let mut scored = Vec::new();
    for (id, vector) in candidates {
        let score = cosine_similarity(query, vector)?;
        if score >= min_score {
            scored.push((Reverse(OrderedFloat(score)), id));
        }
    }
    scored.sort_unstable();

    Ok(scored
        .into_iter()
        .take(k)
        .map(|(Reverse(score), id)| ScoredId {
            id: id.to_string(),
            score: score.into_inner(),
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn close(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-6
    }

    #[test]
    fn test_cosine_bounds() {
        assert!(close(cosine_similarity(&[1.0, 0.0], &[2.0, 0.0]).unwrap(), 1.0));
        assert!(close(cosine_similarity(&[1.0, 0.0], &[0.0, 3.0]).unwrap(), 0.0));
        assert!(close(cosine_similarity(&[1.0, 1.0], &[-1.0, -1.0]).unwrap(), -1.0));
    }

    #[test]
    fn test_zero_vector_and_mismatch() {
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 0.0]).unwrap(), 0.0);
        assert!(matches!(
            cosine_similarity(&[1.0], &[1.0, 0.0]),
            Err(EmbeddingError::DimensionMismatch {
                expected: 1,
                actual: 2
            })
        ));
    }

    #[test]
    fn test_rank_orders_and_truncates() {
        let candidates: Vec<(&str, Vec<f32>)> = vec![
            ("orthogonal", vec![0.0, 1.0]),
            ("exact", vec![1.0, 0.0]),
            ("close", vec![0.7, 0.7]),
            ("opposite", vec![-1.0, 0.0]),
        ];

        let ranked = rank_by_similarity(
            &[1.0, 0.0],
            candidates.iter().map(|(id, v)| (*id, v.as_slice())),
            2,
            f32::MIN,
        )
        .unwrap();

        let ids: Vec<&str> = ranked.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec!["exact", "close"]);
    }

    #[test]
    fn test_rank_min_score_and_ties() {
        let same = [1.0, 0.0];
        let far = [-1.0, 0.0];
        let candidates = [("b", &same[..]), ("a", &same[..]), ("far", &far[..])];

        let ranked = rank_by_similarity(&[1.0, 0.0], candidates, 10, 0.5).unwrap();

        let ids: Vec<&str> = ranked.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b"]);
    }
}
