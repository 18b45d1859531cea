//! Biased matrix factorization trained with stochastic gradient descent
//!
//! Minimizes squared reconstruction error with L2 regularization:
//!
//! ```text
//! r̂(u, i) = μ + b_u + b_i + p_u · q_i
//! ```
//!
//! Training order comes from a seeded RNG, so the same ratings and config
//! always produce the same factors.
use rand::{rngs::StdRng, seq::SliceRandom, Rng, SeedableRng};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::{
    error::{BuildError, BuildResult},
    models::{MAX_RATING, MIN_RATING},
    services::similarity::{dot, Metric},
};

/// Ratings per parallel chunk when measuring error. Fixed so that partial
/// sums are always added in the same order.
const RMSE_CHUNK: usize = 4096;

/// Hold-out is skipped below this many ratings
const MIN_RATINGS_FOR_HOLDOUT: usize = 20;

/// Factorization hyperparameters
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FactorizationConfig {
    /// Latent dimensionality shared by user and item factors
    pub factors: usize,
    pub epochs: usize,
    pub learning_rate: f32,
    pub regularization: f32,
    /// Factors start uniform in `[-init_scale, init_scale)`
    pub init_scale: f32,
    /// Share of ratings held out for validation RMSE
    pub holdout_fraction: f32,
    /// Smallest validation RMSE drop that counts as an improvement
    pub tolerance: f32,
    /// Epochs without improvement before training stops
    pub patience: usize,
    pub seed: u64,
    /// Similarity used by the item-factor index
    pub metric: Metric,
}

impl Default for FactorizationConfig {
    fn default() -> Self {
        Self {
            factors: 32,
            epochs: 30,
            learning_rate: 0.01,
            regularization: 0.05,
            init_scale: 0.1,
            holdout_fraction: 0.1,
            tolerance: 1e-4,
            patience: 10,
            seed: 42,
            metric: Metric::Cosine,
        }
    }
}

/// A rating re-indexed to dense user/item positions
#[derive(Debug, Clone, Copy)]
pub struct IndexedRating {
    pub user: u32,
    pub item: u32,
    pub value: f32,
}

/// Trained factors
#[derive(Debug, Clone)]
pub struct FactorModel {
    pub factors: usize,
    pub global_mean: f32,
    pub user_bias: Vec<f32>,
    pub item_bias: Vec<f32>,
    user_factors: Vec<f32>,
    item_factors: Vec<f32>,
    /// Training ratings seen per item; zero means the row is still noise
    pub item_train_counts: Vec<u32>,
    pub epochs_run: usize,
    /// Epoch whose parameters were kept, when a validation split exists
    pub best_epoch: Option<usize>,
    pub train_rmse: f32,
    pub validation_rmse: Option<f32>,
}

impl FactorModel {
    pub fn user_factors(&self, user: u32) -> &[f32] {
        let start = user as usize * self.factors;
        &self.user_factors[start..start + self.factors]
    }

    pub fn item_factors(&self, item: u32) -> &[f32] {
        let start = item as usize * self.factors;
        &self.item_factors[start..start + self.factors]
    }

    /// Rating estimate, clamped to the rating scale
    pub fn predict(&self, user: u32, item: u32) -> f32 {
        let raw = self.global_mean
            + self.user_bias[user as usize]
            + self.item_bias[item as usize]
            + dot(self.user_factors(user), self.item_factors(item));
        raw.clamp(MIN_RATING, MAX_RATING)
    }

    fn is_finite(&self) -> bool {
        self.user_bias
            .iter()
            .chain(&self.item_bias)
            .chain(&self.user_factors)
            .chain(&self.item_factors)
            .all(|v| v.is_finite())
    }

    fn rmse(&self, ratings: &[IndexedRating]) -> f32 {
        if ratings.is_empty() {
            return 0.0;
        }
        let partials: Vec<f64> = ratings
            .par_chunks(RMSE_CHUNK)
            .map(|chunk| {
                chunk
                    .iter()
                    .map(|r| {
                        let err = (r.value - self.predict(r.user, r.item)) as f64;
                        err * err
                    })
                    .sum::<f64>()
            })
            .collect();
        let total: f64 = partials.iter().sum();
        (total / ratings.len() as f64).sqrt() as f32
    }
}

/// Trains user and item factors over `n_users` x `n_items`
pub fn factorize(
    ratings: &[IndexedRating],
    n_users: usize,
    n_items: usize,
    config: &FactorizationConfig,
) -> BuildResult<FactorModel> {
    if ratings.is_empty() || n_users == 0 || n_items == 0 {
        return Err(BuildError::NoRatings);
    }

    let k = config.factors.max(1);
    let mut rng = StdRng::seed_from_u64(config.seed);

    let mut shuffled = ratings.to_vec();
    shuffled.shuffle(&mut rng);
    let holdout = if shuffled.len() >= MIN_RATINGS_FOR_HOLDOUT {
        ((shuffled.len() as f32) * config.holdout_fraction.clamp(0.0, 0.5)) as usize
    } else {
        0
    };
    let (validation, train) = shuffled.split_at(holdout);

    let global_mean =
        (train.iter().map(|r| r.value as f64).sum::<f64>() / train.len() as f64) as f32;

    let mut item_train_counts = vec![0u32; n_items];
    for r in train {
        item_train_counts[r.item as usize] += 1;
    }

    let scale = config.init_scale.abs();
    let mut init = |len: usize| -> Vec<f32> {
        (0..len)
            .map(|_| if scale > 0.0 { rng.gen_range(-scale..scale) } else { 0.0 })
            .collect()
    };
    let user_factors = init(n_users * k);
    let item_factors = init(n_items * k);

    let mut model = FactorModel {
        factors: k,
        global_mean,
        user_bias: vec![0.0; n_users],
        item_bias: vec![0.0; n_items],
        user_factors,
        item_factors,
        item_train_counts,
        epochs_run: 0,
        best_epoch: None,
        train_rmse: f32::NAN,
        validation_rmse: None,
    };

    let lr = config.learning_rate;
    let reg = config.regularization;
    let mut order: Vec<usize> = (0..train.len()).collect();
    let mut best_validation = f32::INFINITY;
    let mut best: Option<FactorModel> = None;
    let mut stale = 0usize;

    for epoch in 0..config.epochs {
        order.shuffle(&mut rng);

        for &idx in &order {
            let r = train[idx];
            let (u, i) = (r.user as usize, r.item as usize);
            let pred = model.global_mean
                + model.user_bias[u]
                + model.item_bias[i]
                + dot(
                    &model.user_factors[u * k..(u + 1) * k],
                    &model.item_factors[i * k..(i + 1) * k],
                );
            let err = r.value - pred;

            model.user_bias[u] += lr * (err - reg * model.user_bias[u]);
            model.item_bias[i] += lr * (err - reg * model.item_bias[i]);

            for f in 0..k {
                let pu = model.user_factors[u * k + f];
                let qi = model.item_factors[i * k + f];
                model.user_factors[u * k + f] += lr * (err * qi - reg * pu);
                model.item_factors[i * k + f] += lr * (err * pu - reg * qi);
            }
        }

        model.epochs_run = epoch + 1;
        model.train_rmse = model.rmse(train);
        if !model.train_rmse.is_finite() || !model.is_finite() {
            return Err(BuildError::Diverged { epoch });
        }

        if validation.is_empty() {
            tracing::debug!(epoch, train_rmse = model.train_rmse, "Factorization epoch");
            continue;
        }

        let validation_rmse = model.rmse(validation);
        if !validation_rmse.is_finite() {
            return Err(BuildError::Diverged { epoch });
        }
        model.validation_rmse = Some(validation_rmse);

        tracing::debug!(
            epoch,
            train_rmse = model.train_rmse,
            validation_rmse,
            "Factorization epoch"
        );

        if best_validation - validation_rmse > config.tolerance {
            best_validation = validation_rmse;
            stale = 0;
            model.best_epoch = Some(epoch);
            best = Some(model.clone());
        } else {
            stale += 1;
            if stale >= config.patience.max(1) {
                tracing::debug!(epoch, stale, "Validation RMSE stopped improving");
                break;
            }
        }
    }

    // Serve the parameters of the best validation epoch
    let epochs_run = model.epochs_run;
    let mut model = best.unwrap_or(model);
    model.epochs_run = epochs_run;
    Ok(model)
}
