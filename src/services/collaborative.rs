use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Instant;

use crate::{
    error::BuildResult,
    models::{Neighbor, Rating},
    services::{
        catalog::CatalogIndex,
        factorization::{factorize, FactorizationConfig, IndexedRating},
        similarity::{DenseIndex, SimilarityIndex},
    },
};

/// Item latent factors learned from the rating matrix, plus an index over them
///
/// Only item-side state is kept for serving: requests name movies, not
/// users. Movies with no training rating (never rated, or every rating
/// held out for validation) get a zero factor row and never surface as
/// neighbors.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollaborativeFactorStore {
    factors: usize,
    /// Row-major `catalog.len() x factors`
    item_factors: Vec<f32>,
    rated: Vec<bool>,
    index: DenseIndex,
    train_rmse: f32,
    validation_rmse: Option<f32>,
}

impl CollaborativeFactorStore {
    pub fn build(
        catalog: &CatalogIndex,
        ratings: &[Rating],
        config: &FactorizationConfig,
    ) -> BuildResult<Self> {
        let start = Instant::now();

        let mut users: HashMap<u32, u32> = HashMap::new();
        let mut indexed = Vec::with_capacity(ratings.len());
        let mut skipped_unknown = 0usize;
        let mut skipped_range = 0usize;

        for rating in ratings {
            if !rating.is_in_range() {
                skipped_range += 1;
                continue;
            }
            let Some(item) = catalog.position(rating.movie_id) else {
                skipped_unknown += 1;
                continue;
            };
            let next = users.len() as u32;
            let user = *users.entry(rating.user_id).or_insert(next);
            indexed.push(IndexedRating {
                user,
                item,
                value: rating.value,
            });
        }

        if skipped_unknown > 0 || skipped_range > 0 {
            tracing::warn!(
                skipped_unknown,
                skipped_range,
                "Ratings skipped during collaborative build"
            );
        }

        tracing::info!(
            ratings = indexed.len(),
            users = users.len(),
            items = catalog.len(),
            factors = config.factors,
            "Factorizing rating matrix"
        );

        let model = factorize(&indexed, users.len(), catalog.len(), config)?;

        let rated: Vec<bool> = model.item_train_counts.iter().map(|&c| c > 0).collect();

        let k = model.factors;
        let mut item_factors = Vec::with_capacity(catalog.len() * k);
        let mut rows = Vec::with_capacity(catalog.len());
        for position in 0..catalog.len() {
            let row = if rated[position] {
                model.item_factors(position as u32).to_vec()
            } else {
                vec![0.0; k]
            };
            item_factors.extend_from_slice(&row);
            rows.push(row);
        }

        let ids = catalog.movies().iter().map(|m| m.id).collect();
        let index = DenseIndex::build(ids, &rows, k, config.metric);

        tracing::info!(
            epochs = model.epochs_run,
            train_rmse = model.train_rmse,
            validation_rmse = ?model.validation_rmse,
            rated_items = rated.iter().filter(|r| **r).count(),
            elapsed_ms = start.elapsed().as_millis(),
            "Collaborative factor store built"
        );

        Ok(Self {
            factors: k,
            item_factors,
            rated,
            index,
            train_rmse: model.train_rmse,
            validation_rmse: model.validation_rmse,
        })
    }

    /// K nearest movies in factor space to the movie at `position`
    pub fn neighbors(&self, position: u32, k: usize) -> Vec<Neighbor> {
        match self.item_factors(position) {
            Some(row) => self.index.nearest(row, k),
            None => Vec::new(),
        }
    }

    pub fn item_factors(&self, position: u32) -> Option<&[f32]> {
        let start = position as usize * self.factors;
        self.item_factors.get(start..start + self.factors)
    }

    pub fn is_rated(&self, position: u32) -> bool {
        self.rated.get(position as usize).copied().unwrap_or(false)
    }

    pub fn rated_count(&self) -> usize {
        self.rated.iter().filter(|r| **r).count()
    }

    pub fn factors(&self) -> usize {
        self.factors
    }

    pub fn train_rmse(&self) -> f32 {
        self.train_rmse
    }

    pub fn validation_rmse(&self) -> Option<f32> {
        self.validation_rmse
    }
}
