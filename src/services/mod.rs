pub mod catalog;
pub mod collaborative;
pub mod content;
pub mod corpus;
pub mod factorization;
pub mod generation;
pub mod ranking;
pub mod recommender;
pub mod similarity;

pub use catalog::CatalogIndex;
pub use collaborative::CollaborativeFactorStore;
pub use content::ContentFeatureStore;
pub use corpus::Corpus;
pub use factorization::FactorizationConfig;
pub use generation::{Artifacts, Generation};
pub use recommender::{
    CollaborativeRecommender, ContentRecommender, EngineConfig, Recommender, SEED_COUNT,
};
pub use similarity::{Metric, SimilarityIndex};
