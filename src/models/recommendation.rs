use serde::{Deserialize, Serialize};
use std::fmt::Display;

use super::MovieId;

/// Which engine produces the recommendations
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Algorithm {
    /// Genre/tag TF-IDF similarity
    Content,
    /// Latent-factor similarity learned from ratings
    Collaborative,
}

impl Display for Algorithm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Algorithm::Content => write!(f, "content"),
            Algorithm::Collaborative => write!(f, "collaborative"),
        }
    }
}

/// One nearest-neighbor hit returned by a similarity index
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Neighbor {
    pub movie_id: MovieId,
    /// Catalog insertion position, the last tie-breaker
    pub position: u32,
    pub score: f32,
}

/// A ranked recommendation
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ScoredMovie {
    pub movie_id: MovieId,
    pub title: String,
    /// Aggregate score: sum of the per-seed similarity scores
    pub score: f32,
}

/// Ordered result of a recommendation request
///
/// May be shorter than requested when the seeds have few neighbors. That is
/// the documented insufficient-candidates outcome, not an error.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Recommendations {
    pub items: Vec<ScoredMovie>,
    pub requested: usize,
}

impl Recommendations {
    pub fn titles(&self) -> Vec<String> {
        self.items.iter().map(|m| m.title.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// True when fewer than `requested` candidates were available
    pub fn is_short(&self) -> bool {
        self.items.len() < self.requested
    }
}
