//! Nearest-neighbor search over per-movie vectors
//!
//! Both stores answer "the K catalog vectors most similar to this query"
//! through [`SimilarityIndex`]. The implementations here are exact scans;
//! an approximate index can replace either one behind the same trait.
//!
//! Only positively similar movies are neighbors; orthogonal and
//! anti-correlated vectors are never returned by either index.
//!
//! Ordering is deterministic: score descending, then lower movie id, then
//! earlier catalog position.
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

use crate::models::{MovieId, Neighbor};

/// Query contract shared by the content and collaborative stores
pub trait SimilarityIndex {
    type Query: ?Sized;

    /// Returns at most `k` neighbors ordered best first
    fn nearest(&self, query: &Self::Query, k: usize) -> Vec<Neighbor>;

    /// Number of indexed movies
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Deterministic rank order used by every index and by aggregation
pub(crate) fn rank_order(a: &Neighbor, b: &Neighbor) -> Ordering {
    b.score
        .total_cmp(&a.score)
        .then_with(|| a.movie_id.cmp(&b.movie_id))
        .then_with(|| a.position.cmp(&b.position))
}

/// Keeps the best `k` candidates in rank order
pub(crate) fn top_k(mut candidates: Vec<Neighbor>, k: usize) -> Vec<Neighbor> {
    candidates.retain(|n| n.score.is_finite());
    if k == 0 {
        return Vec::new();
    }
    if candidates.len() > k {
        candidates.select_nth_unstable_by(k - 1, rank_order);
        candidates.truncate(k);
    }
    candidates.sort_by(rank_order);
    candidates
}

// ============================================================================
// Sparse vectors (content features)
// ============================================================================

/// Sparse weighted term vector, indices strictly increasing
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct SparseVector {
    indices: Vec<u32>,
    values: Vec<f32>,
}

impl SparseVector {
    /// Builds from unordered (term, weight) pairs; zero weights are dropped
    /// and repeated terms are summed.
    pub fn from_pairs(mut pairs: Vec<(u32, f32)>) -> Self {
        pairs.sort_by_key(|(i, _)| *i);
        let mut indices: Vec<u32> = Vec::with_capacity(pairs.len());
        let mut values: Vec<f32> = Vec::with_capacity(pairs.len());
        for (i, v) in pairs {
            if indices.last() == Some(&i) {
                if let Some(last) = values.last_mut() {
                    *last += v;
                }
            } else {
                indices.push(i);
                values.push(v);
            }
        }
        let mut vector = Self { indices, values };
        vector.prune_zeros();
        vector
    }

    fn prune_zeros(&mut self) {
        let mut keep_i = Vec::with_capacity(self.indices.len());
        let mut keep_v = Vec::with_capacity(self.values.len());
        for (&i, &v) in self.indices.iter().zip(&self.values) {
            if v != 0.0 {
                keep_i.push(i);
                keep_v.push(v);
            }
        }
        self.indices = keep_i;
        self.values = keep_v;
    }

    pub fn iter(&self) -> impl Iterator<Item = (u32, f32)> + '_ {
        self.indices.iter().copied().zip(self.values.iter().copied())
    }

    pub fn is_zero(&self) -> bool {
        self.indices.is_empty()
    }

    pub fn norm(&self) -> f32 {
        self.values.iter().map(|v| v * v).sum::<f32>().sqrt()
    }

    /// Unit-length copy; the zero vector stays zero
    pub fn normalized(&self) -> Self {
        let norm = self.norm();
        if norm == 0.0 {
            return Self::default();
        }
        Self {
            indices: self.indices.clone(),
            values: self.values.iter().map(|v| v / norm).collect(),
        }
    }

    pub fn dot(&self, other: &SparseVector) -> f32 {
        let (mut a, mut b) = (0usize, 0usize);
        let mut sum = 0.0;
        while a < self.indices.len() && b < other.indices.len() {
            match self.indices[a].cmp(&other.indices[b]) {
                Ordering::Less => a += 1,
                Ordering::Greater => b += 1,
                Ordering::Equal => {
                    sum += self.values[a] * other.values[b];
                    a += 1;
                    b += 1;
                }
            }
        }
        sum
    }

    /// Cosine similarity, 0.0 when either side is the zero vector
    pub fn cosine(&self, other: &SparseVector) -> f32 {
        let denom = self.norm() * other.norm();
        if denom == 0.0 {
            0.0
        } else {
            self.dot(other) / denom
        }
    }
}

/// Exact cosine search over sparse vectors through an inverted index
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SparseIndex {
    ids: Vec<MovieId>,
    /// term -> (catalog position, unit-normalized weight)
    postings: Vec<Vec<(u32, f32)>>,
}

impl SparseIndex {
    /// `vectors[p]` belongs to `ids[p]`; `dims` is the vocabulary size
    pub fn build(ids: Vec<MovieId>, vectors: &[SparseVector], dims: usize) -> Self {
        let mut postings: Vec<Vec<(u32, f32)>> = vec![Vec::new(); dims];
        for (position, vector) in vectors.iter().enumerate() {
            for (term, weight) in vector.normalized().iter() {
                if let Some(list) = postings.get_mut(term as usize) {
                    list.push((position as u32, weight));
                }
            }
        }
        Self { ids, postings }
    }

}

impl SimilarityIndex for SparseIndex {
    type Query = SparseVector;

    fn nearest(&self, query: &SparseVector, k: usize) -> Vec<Neighbor> {
        let query = query.normalized();
        if query.is_zero() || k == 0 {
            return Vec::new();
        }

        let mut scores = vec![0.0f32; self.ids.len()];
        let mut touched: Vec<u32> = Vec::new();
        let mut seen = vec![false; self.ids.len()];

        for (term, q) in query.iter() {
            let Some(list) = self.postings.get(term as usize) else {
                continue;
            };
            for &(position, weight) in list {
                let p = position as usize;
                if !seen[p] {
                    seen[p] = true;
                    touched.push(position);
                }
                scores[p] += q * weight;
            }
        }

        let candidates = touched
            .into_iter()
            .filter(|&p| scores[p as usize] > 0.0)
            .map(|p| Neighbor {
                movie_id: self.ids[p as usize],
                position: p,
                score: scores[p as usize],
            })
            .collect();

        top_k(candidates, k)
    }

    fn len(&self) -> usize {
        self.ids.len()
    }
}

// ============================================================================
// Dense vectors (latent factors)
// ============================================================================

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    Cosine,
    InnerProduct,
}

/// Exact scan over fixed-length dense vectors
///
/// Zero rows (movies with no learned factors) and rows scoring zero or
/// below against the query are never returned.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DenseIndex {
    ids: Vec<MovieId>,
    dim: usize,
    metric: Metric,
    /// Row-major, unit-normalized when the metric is cosine
    data: Vec<f32>,
    active: Vec<bool>,
}

impl DenseIndex {
    pub fn build(ids: Vec<MovieId>, rows: &[Vec<f32>], dim: usize, metric: Metric) -> Self {
        let mut data = Vec::with_capacity(rows.len() * dim);
        let mut active = Vec::with_capacity(rows.len());
        for row in rows {
            let norm = l2_norm(row);
            let usable = row.len() == dim && norm > 0.0;
            active.push(usable);
            if !usable {
                data.extend(std::iter::repeat(0.0).take(dim));
                continue;
            }
            match metric {
                Metric::Cosine => data.extend(row.iter().map(|v| v / norm)),
                Metric::InnerProduct => data.extend_from_slice(row),
            }
        }
        Self {
            ids,
            dim,
            metric,
            data,
            active,
        }
    }

    fn row(&self, position: usize) -> &[f32] {
        &self.data[position * self.dim..(position + 1) * self.dim]
    }
}

impl SimilarityIndex for DenseIndex {
    type Query = [f32];

    fn nearest(&self, query: &[f32], k: usize) -> Vec<Neighbor> {
        if query.len() != self.dim || k == 0 {
            return Vec::new();
        }
        let norm = l2_norm(query);
        if norm == 0.0 {
            return Vec::new();
        }
        let scale = match self.metric {
            Metric::Cosine => 1.0 / norm,
            Metric::InnerProduct => 1.0,
        };

        let candidates = (0..self.ids.len())
            .filter(|&p| self.active[p])
            .map(|p| Neighbor {
                movie_id: self.ids[p],
                position: p as u32,
                score: dot(self.row(p), query) * scale,
            })
            .filter(|n| n.score > 0.0)
            .collect();

        top_k(candidates, k)
    }

    fn len(&self) -> usize {
        self.ids.len()
    }
}

pub fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

pub fn l2_norm(v: &[f32]) -> f32 {
    dot(v, v).sqrt()
}
