use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::time::Instant;

use crate::{
    error::{BuildError, BuildResult},
    models::{Movie, Neighbor},
    services::{
        catalog::CatalogIndex,
        similarity::{SimilarityIndex, SparseIndex, SparseVector},
    },
};

const STOP_WORDS: &[&str] = &[
    "a", "an", "and", "are", "as", "at", "be", "by", "for", "from", "in", "is", "it", "of", "on",
    "or", "the", "to", "was", "with",
];

/// Splits free text into lowercase terms; hyphens inside a word are kept so
/// "sci-fi" stays one term.
pub fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| !(c.is_alphanumeric() || c == '-'))
        .map(|t| t.trim_matches('-').to_lowercase())
        .filter(|t| t.chars().count() > 1 && !STOP_WORDS.contains(&t.as_str()))
        .collect()
}

/// All terms of a movie: each genre as a single term, then its tag text
fn movie_terms(movie: &Movie) -> Vec<String> {
    let mut terms: Vec<String> = movie
        .genres
        .iter()
        .map(|g| g.trim().to_lowercase())
        .filter(|g| !g.is_empty())
        .collect();
    terms.extend(tokenize(&movie.tag_text));
    terms
}

/// TF-IDF vectors for every catalog movie plus a cosine index over them
///
/// Vectors share one vocabulary and are aligned with catalog positions.
/// Movies without any usable text keep a zero vector, which never matches.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentFeatureStore {
    vocabulary: Vec<String>,
    idf: Vec<f32>,
    vectors: Vec<SparseVector>,
    index: SparseIndex,
}

impl ContentFeatureStore {
    pub fn build(catalog: &CatalogIndex) -> BuildResult<Self> {
        let start = Instant::now();
        let movies = catalog.movies();

        let documents: Vec<Vec<String>> = movies.par_iter().map(movie_terms).collect();

        // Sorted vocabulary keeps term ids stable across rebuilds
        let mut doc_freq: BTreeMap<&str, usize> = BTreeMap::new();
        for terms in &documents {
            let mut unique: Vec<&str> = terms.iter().map(String::as_str).collect();
            unique.sort_unstable();
            unique.dedup();
            for term in unique {
                *doc_freq.entry(term).or_insert(0) += 1;
            }
        }

        if doc_freq.is_empty() {
            return Err(BuildError::DegenerateVectors);
        }

        let n_docs = documents.len() as f32;
        let vocabulary: Vec<String> = doc_freq.keys().map(|t| t.to_string()).collect();
        let idf: Vec<f32> = doc_freq
            .values()
            .map(|&df| ((1.0 + n_docs) / (1.0 + df as f32)).ln() + 1.0)
            .collect();
        let term_ids: HashMap<&str, u32> = vocabulary
            .iter()
            .enumerate()
            .map(|(i, t)| (t.as_str(), i as u32))
            .collect();

        let vectors: Vec<SparseVector> = documents
            .par_iter()
            .map(|terms| {
                let pairs = terms
                    .iter()
                    .filter_map(|t| term_ids.get(t.as_str()))
                    .map(|&id| (id, idf[id as usize]))
                    .collect();
                SparseVector::from_pairs(pairs).normalized()
            })
            .collect();

        let empty = vectors.iter().filter(|v| v.is_zero()).count();
        if empty == vectors.len() {
            return Err(BuildError::DegenerateVectors);
        }

        let ids = movies.iter().map(|m| m.id).collect();
        let index = SparseIndex::build(ids, &vectors, vocabulary.len());

        tracing::info!(
            movies = vectors.len(),
            vocabulary = vocabulary.len(),
            empty_vectors = empty,
            elapsed_ms = start.elapsed().as_millis(),
            "Content feature store built"
        );

        Ok(Self {
            vocabulary,
            idf,
            vectors,
            index,
        })
    }

    /// K nearest movies to the movie at `position`, the movie itself included
    pub fn neighbors(&self, position: u32, k: usize) -> Vec<Neighbor> {
        match self.vectors.get(position as usize) {
            Some(vector) => self.index.nearest(vector, k),
            None => Vec::new(),
        }
    }

    /// Cosine similarity between two catalog positions
    pub fn similarity(&self, a: u32, b: u32) -> f32 {
        match (self.vectors.get(a as usize), self.vectors.get(b as usize)) {
            (Some(x), Some(y)) => x.cosine(y),
            _ => 0.0,
        }
    }

    pub fn vector(&self, position: u32) -> Option<&SparseVector> {
        self.vectors.get(position as usize)
    }

    pub fn term_id(&self, term: &str) -> Option<u32> {
        self.vocabulary
            .binary_search_by(|t| t.as_str().cmp(term))
            .ok()
            .map(|i| i as u32)
    }

    pub fn idf(&self, term: &str) -> Option<f32> {
        self.term_id(term).map(|i| self.idf[i as usize])
    }

    pub fn vocabulary_size(&self) -> usize {
        self.vocabulary.len()
    }
}
