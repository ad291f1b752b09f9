//! Cosine-similarity scoring and top-K selection.

use std::cmp::Ordering;

use super::IndexEntry;
use crate::document::Document;

pub(crate) fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

pub(crate) fn l2_norm(vector: &[f32]) -> f32 {
    vector.iter().map(|x| x * x).sum::<f32>().sqrt()
}

/// Score every entry against the query vector, descending, stable.
///
/// Zero-norm vectors score `0.0` instead of dividing to NaN, which keeps the
/// ordering total. The sort is stable, so equal scores keep their original
/// insertion order.
pub(crate) fn rank(entries: &[IndexEntry], query: &[f32]) -> Vec<(usize, f32)> {
    let query_norm = l2_norm(query);
    let mut scored: Vec<(usize, f32)> = entries
        .iter()
        .enumerate()
        .map(|(position, entry)| {
            let denominator = query_norm * entry.norm;
            let score = if denominator > 0.0 {
                dot(query, &entry.vector) / denominator
            } else {
                0.0
            };
            (position, score)
        })
        .collect();
    scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal));
    scored
}

/// The `top_k` best-scoring documents; `top_k` is clamped to the entry count
/// and `0` yields an empty result.
pub(crate) fn top_k(entries: &[IndexEntry], query: &[f32], top_k: usize) -> Vec<Document> {
    if top_k == 0 || entries.is_empty() {
        return Vec::new();
    }
    rank(entries, query)
        .into_iter()
        .take(top_k.min(entries.len()))
        .map(|(position, _)| entries[position].document.clone())
        .collect()
}
