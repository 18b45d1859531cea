use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::{
    error::{BuildError, BuildResult, RecommendError, RecommendResult},
    models::{Movie, MovieId},
};

/// In-memory movie catalog with id and exact-title lookups
///
/// Read-only after construction, so it is shared across requests behind an
/// `Arc` with no locking. Positions are catalog insertion order and index
/// the per-movie vectors held by the stores.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogIndex {
    movies: Vec<Movie>,
    by_id: HashMap<MovieId, u32>,
    by_title: HashMap<String, MovieId>,
}

impl CatalogIndex {
    /// Builds the index. Duplicate ids and duplicate titles keep the first
    /// occurrence.
    pub fn build(movies: Vec<Movie>) -> BuildResult<Self> {
        if movies.is_empty() {
            return Err(BuildError::EmptyCatalog);
        }

        let mut kept = Vec::with_capacity(movies.len());
        let mut by_id = HashMap::with_capacity(movies.len());
        let mut by_title = HashMap::with_capacity(movies.len());
        let mut dropped = 0usize;

        for movie in movies {
            if by_id.contains_key(&movie.id) || by_title.contains_key(&movie.title) {
                tracing::debug!(
                    movie_id = movie.id,
                    title = %movie.title,
                    "Skipping duplicate catalog entry"
                );
                dropped += 1;
                continue;
            }
            let position = kept.len() as u32;
            by_id.insert(movie.id, position);
            by_title.insert(movie.title.clone(), movie.id);
            kept.push(movie);
        }

        if dropped > 0 {
            tracing::warn!(dropped, "Duplicate movie ids or titles dropped from catalog");
        }

        tracing::info!(movies = kept.len(), "Catalog index built");

        Ok(Self {
            movies: kept,
            by_id,
            by_title,
        })
    }

    /// Resolves an exact title to its movie id
    pub fn resolve(&self, title: &str) -> RecommendResult<MovieId> {
        self.by_title
            .get(title)
            .copied()
            .ok_or_else(|| RecommendError::UnknownMovie(title.to_string()))
    }

    pub fn metadata(&self, id: MovieId) -> Option<&Movie> {
        self.position(id).map(|p| &self.movies[p as usize])
    }

    pub fn position(&self, id: MovieId) -> Option<u32> {
        self.by_id.get(&id).copied()
    }

    pub fn at(&self, position: u32) -> Option<&Movie> {
        self.movies.get(position as usize)
    }

    pub fn title(&self, id: MovieId) -> Option<&str> {
        self.metadata(id).map(|m| m.title.as_str())
    }

    pub fn movies(&self) -> &[Movie] {
        &self.movies
    }

    pub fn len(&self) -> usize {
        self.movies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.movies.is_empty()
    }

    /// Case-insensitive substring search over titles, in catalog order
    pub fn search(&self, query: &str, limit: usize) -> Vec<&Movie> {
        let needle = query.trim().to_lowercase();
        self.movies
            .iter()
            .filter(|m| needle.is_empty() || m.title.to_lowercase().contains(&needle))
            .take(limit)
            .collect()
    }
}
