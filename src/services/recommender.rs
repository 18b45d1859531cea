use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;

use crate::{
    error::{RecommendError, RecommendResult},
    models::{Algorithm, MovieId, Neighbor, Recommendations},
    services::{
        catalog::CatalogIndex, collaborative::CollaborativeFactorStore,
        content::ContentFeatureStore, ranking,
    },
};

/// Number of seed titles the public entry points take
pub const SEED_COUNT: usize = 3;

/// Request-time tuning shared by both engines
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EngineConfig {
    /// Largest accepted N
    pub max_top_n: usize,
    /// Neighbors fetched per seed: K = N * oversampling + seed count
    pub oversampling: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_top_n: 100,
            oversampling: 3,
        }
    }
}

impl EngineConfig {
    /// Neighbors to fetch per seed for a request of `top_n`
    ///
    /// Each seed's list can contain every seed, itself included, and those
    /// are discarded during aggregation, so the seed count is added on top.
    pub fn neighbors_per_seed(&self, top_n: usize, seeds: usize) -> usize {
        top_n
            .saturating_mul(self.oversampling.max(1))
            .saturating_add(seeds)
    }
}

/// A recommendation engine over one store generation
///
/// Implementors provide the per-seed neighbor query; validation, title
/// resolution and aggregation are shared. Every call is a pure read.
pub trait Recommender: Send + Sync {
    fn algorithm(&self) -> Algorithm;

    fn catalog(&self) -> &CatalogIndex;

    fn config(&self) -> &EngineConfig;

    /// K nearest neighbors of the movie at catalog `position`
    fn seed_neighbors(&self, position: u32, k: usize) -> Vec<Neighbor>;

    /// Ranks up to `top_n` movies for one to [`SEED_COUNT`] seed titles
    fn recommend(&self, titles: &[String], top_n: usize) -> RecommendResult<Recommendations> {
        let start = Instant::now();
        validate_top_n(top_n, self.config())?;

        if titles.is_empty() || titles.len() > SEED_COUNT {
            return Err(RecommendError::InvalidRequest(format!(
                "Expected between 1 and {} seed titles, got {}",
                SEED_COUNT,
                titles.len()
            )));
        }

        let catalog = self.catalog();
        let mut seeds: Vec<MovieId> = Vec::with_capacity(titles.len());
        for title in titles {
            let id = catalog.resolve(title)?;
            if seeds.contains(&id) {
                return Err(RecommendError::InvalidRequest(format!(
                    "Seed title given more than once: {}",
                    title
                )));
            }
            seeds.push(id);
        }

        let k = self.config().neighbors_per_seed(top_n, seeds.len());
        let lists: Vec<Vec<Neighbor>> = seeds
            .iter()
            .filter_map(|id| catalog.position(*id))
            .map(|position| self.seed_neighbors(position, k))
            .collect();

        let ranked = ranking::aggregate(&lists, &seeds, top_n);
        let recommendations = ranking::to_recommendations(catalog, ranked, top_n);

        tracing::info!(
            algorithm = %self.algorithm(),
            seeds = seeds.len(),
            top_n,
            neighbors_per_seed = k,
            returned = recommendations.len(),
            elapsed_us = start.elapsed().as_micros(),
            "Recommendations computed"
        );

        if recommendations.is_short() {
            tracing::debug!(
                algorithm = %self.algorithm(),
                requested = top_n,
                available = recommendations.len(),
                "Insufficient candidates for requested count"
            );
        }

        Ok(recommendations)
    }
}

fn validate_top_n(top_n: usize, config: &EngineConfig) -> RecommendResult<()> {
    if top_n == 0 {
        return Err(RecommendError::InvalidRequest(
            "top_n must be positive".to_string(),
        ));
    }
    if top_n > config.max_top_n {
        return Err(RecommendError::InvalidRequest(format!(
            "top_n must be at most {}",
            config.max_top_n
        )));
    }
    Ok(())
}

/// Genre/tag similarity engine
#[derive(Clone)]
pub struct ContentRecommender {
    catalog: Arc<CatalogIndex>,
    store: Arc<ContentFeatureStore>,
    config: EngineConfig,
}

impl ContentRecommender {
    pub fn new(
        catalog: Arc<CatalogIndex>,
        store: Arc<ContentFeatureStore>,
        config: EngineConfig,
    ) -> Self {
        Self {
            catalog,
            store,
            config,
        }
    }

    pub fn store(&self) -> &ContentFeatureStore {
        &self.store
    }
}

impl Recommender for ContentRecommender {
    fn algorithm(&self) -> Algorithm {
        Algorithm::Content
    }

    fn catalog(&self) -> &CatalogIndex {
        &self.catalog
    }

    fn config(&self) -> &EngineConfig {
        &self.config
    }

    fn seed_neighbors(&self, position: u32, k: usize) -> Vec<Neighbor> {
        self.store.neighbors(position, k)
    }
}

/// Latent-factor engine: item neighbors in factor space
#[derive(Clone)]
pub struct CollaborativeRecommender {
    catalog: Arc<CatalogIndex>,
    store: Arc<CollaborativeFactorStore>,
    config: EngineConfig,
}

impl CollaborativeRecommender {
    pub fn new(
        catalog: Arc<CatalogIndex>,
        store: Arc<CollaborativeFactorStore>,
        config: EngineConfig,
    ) -> Self {
        Self {
            catalog,
            store,
            config,
        }
    }

    pub fn store(&self) -> &CollaborativeFactorStore {
        &self.store
    }
}

impl Recommender for CollaborativeRecommender {
    fn algorithm(&self) -> Algorithm {
        Algorithm::Collaborative
    }

    fn catalog(&self) -> &CatalogIndex {
        &self.catalog
    }

    fn config(&self) -> &EngineConfig {
        &self.config
    }

    fn seed_neighbors(&self, position: u32, k: usize) -> Vec<Neighbor> {
        self.store.neighbors(position, k)
    }
}
