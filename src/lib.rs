pub mod api;
pub mod config;
pub mod error;
pub mod models;
pub mod services;

pub use config::Config;
pub use error::{AppError, BuildError, RecommendError};
pub use services::{Artifacts, Corpus, Generation};
