use serde::Deserialize;
use std::path::PathBuf;

use crate::services::{EngineConfig, FactorizationConfig, Metric};

/// Application configuration loaded from environment variables
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// Server host address
    #[serde(default = "default_host")]
    pub host: String,

    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Directory holding movies.csv, train.csv/ratings.csv, tags.csv, imdb_data.csv
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Build artifacts written by `build` and loaded on start
    #[serde(default = "default_artifacts_path")]
    pub artifacts_path: PathBuf,

    /// Largest accepted top_n
    #[serde(default = "default_max_top_n")]
    pub max_top_n: usize,

    /// Neighbors fetched per seed = top_n * oversampling + seed count
    #[serde(default = "default_oversampling")]
    pub oversampling: usize,

    #[serde(default = "default_mf_factors")]
    pub mf_factors: usize,

    #[serde(default = "default_mf_epochs")]
    pub mf_epochs: usize,

    #[serde(default = "default_mf_learning_rate")]
    pub mf_learning_rate: f32,

    #[serde(default = "default_mf_regularization")]
    pub mf_regularization: f32,

    #[serde(default = "default_mf_init_scale")]
    pub mf_init_scale: f32,

    #[serde(default = "default_mf_holdout_fraction")]
    pub mf_holdout_fraction: f32,

    #[serde(default = "default_mf_tolerance")]
    pub mf_tolerance: f32,

    #[serde(default = "default_mf_patience")]
    pub mf_patience: usize,

    #[serde(default = "default_mf_seed")]
    pub mf_seed: u64,

    /// Item-factor similarity: `cosine` or `inner_product`
    #[serde(default = "default_mf_metric")]
    pub mf_metric: Metric,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("resources/data")
}

fn default_artifacts_path() -> PathBuf {
    PathBuf::from("resources/models/generation.bin")
}

fn default_max_top_n() -> usize {
    EngineConfig::default().max_top_n
}

fn default_oversampling() -> usize {
    EngineConfig::default().oversampling
}

fn default_mf_factors() -> usize {
    FactorizationConfig::default().factors
}

fn default_mf_epochs() -> usize {
    FactorizationConfig::default().epochs
}

fn default_mf_learning_rate() -> f32 {
    FactorizationConfig::default().learning_rate
}

fn default_mf_regularization() -> f32 {
    FactorizationConfig::default().regularization
}

fn default_mf_init_scale() -> f32 {
    FactorizationConfig::default().init_scale
}

fn default_mf_holdout_fraction() -> f32 {
    FactorizationConfig::default().holdout_fraction
}

fn default_mf_tolerance() -> f32 {
    FactorizationConfig::default().tolerance
}

fn default_mf_patience() -> usize {
    FactorizationConfig::default().patience
}

fn default_mf_seed() -> u64 {
    FactorizationConfig::default().seed
}

fn default_mf_metric() -> Metric {
    FactorizationConfig::default().metric
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_iter(std::env::vars())
    }

    /// Load configuration from explicit key/value pairs
    pub fn from_iter<I>(vars: I) -> anyhow::Result<Self>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        envy::from_iter::<_, Config>(vars)
            .map_err(|e| anyhow::anyhow!("Failed to load config: {}", e))
    }

    pub fn engine(&self) -> EngineConfig {
        EngineConfig {
            max_top_n: self.max_top_n,
            oversampling: self.oversampling,
        }
    }

    pub fn factorization(&self) -> FactorizationConfig {
        FactorizationConfig {
            factors: self.mf_factors,
            epochs: self.mf_epochs,
            learning_rate: self.mf_learning_rate,
            regularization: self.mf_regularization,
            init_scale: self.mf_init_scale,
            holdout_fraction: self.mf_holdout_fraction,
            tolerance: self.mf_tolerance,
            patience: self.mf_patience,
            seed: self.mf_seed,
            metric: self.mf_metric,
        }
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::from_iter(Vec::new()).unwrap();
        assert_eq!(config.port, 3000);
        assert_eq!(config.engine(), EngineConfig::default());
        assert_eq!(config.factorization(), FactorizationConfig::default());
        assert_eq!(config.bind_address(), "127.0.0.1:3000");
    }

    #[test]
    fn test_overrides() {
        let config = Config::from_iter(vec![
            ("PORT".to_string(), "8080".to_string()),
            ("MAX_TOP_N".to_string(), "25".to_string()),
            ("MF_FACTORS".to_string(), "8".to_string()),
            ("MF_METRIC".to_string(), "inner_product".to_string()),
            ("MF_PATIENCE".to_string(), "3".to_string()),
        ])
        .unwrap();
        assert_eq!(config.port, 8080);
        assert_eq!(config.engine().max_top_n, 25);
        assert_eq!(config.factorization().factors, 8);
        assert_eq!(config.factorization().metric, Metric::InnerProduct);
        assert_eq!(config.factorization().patience, 3);
    }

    #[test]
    fn test_invalid_value_fails() {
        assert!(Config::from_iter(vec![("PORT".to_string(), "nope".to_string())]).is_err());
    }
}
