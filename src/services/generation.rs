use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use uuid::Uuid;

use crate::{
    error::{BuildResult, RecommendError, RecommendResult},
    models::{Algorithm, Recommendations},
    services::{
        catalog::CatalogIndex,
        collaborative::CollaborativeFactorStore,
        content::ContentFeatureStore,
        corpus::Corpus,
        factorization::FactorizationConfig,
        recommender::{
            CollaborativeRecommender, ContentRecommender, EngineConfig, Recommender, SEED_COUNT,
        },
    },
};

/// Everything a build produces, in its persisted form
///
/// Written once by the offline build and bulk-loaded at process start.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Artifacts {
    pub built_at: DateTime<Utc>,
    pub catalog: CatalogIndex,
    pub content: ContentFeatureStore,
    pub collaborative: CollaborativeFactorStore,
}

impl Artifacts {
    /// Runs the full offline build. Any failure aborts the whole build.
    pub fn build(corpus: &Corpus, factorization: &FactorizationConfig) -> BuildResult<Self> {
        let start = Instant::now();

        let catalog = CatalogIndex::build(corpus.movies.clone())?;
        let content = ContentFeatureStore::build(&catalog)?;
        let collaborative =
            CollaborativeFactorStore::build(&catalog, &corpus.ratings, factorization)?;

        tracing::info!(
            movies = catalog.len(),
            elapsed_ms = start.elapsed().as_millis(),
            "Build finished"
        );

        Ok(Self {
            built_at: Utc::now(),
            catalog,
            content,
            collaborative,
        })
    }

    pub fn save(&self, path: impl AsRef<Path>) -> BuildResult<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        // Write aside and rename so readers never see a half-written file
        let tmp = path.with_extension("tmp");
        let mut writer = BufWriter::new(File::create(&tmp)?);
        bincode::serialize_into(&mut writer, self)?;
        writer.flush()?;
        drop(writer);
        std::fs::rename(&tmp, path)?;

        tracing::info!(path = %path.display(), "Artifacts saved");
        Ok(())
    }

    pub fn load(path: impl AsRef<Path>) -> BuildResult<Self> {
        let path = path.as_ref();
        let start = Instant::now();
        let reader = BufReader::new(File::open(path)?);
        let artifacts: Self = bincode::deserialize_from(reader)?;

        tracing::info!(
            path = %path.display(),
            movies = artifacts.catalog.len(),
            built_at = %artifacts.built_at,
            elapsed_ms = start.elapsed().as_millis(),
            "Artifacts loaded"
        );
        Ok(artifacts)
    }
}

/// One immutable, servable set of catalog and stores
///
/// Shared read-only across requests; a rebuild produces a new generation
/// that replaces this one as a whole.
pub struct Generation {
    id: Uuid,
    built_at: DateTime<Utc>,
    catalog: Arc<CatalogIndex>,
    content: ContentRecommender,
    collaborative: CollaborativeRecommender,
}

impl Generation {
    pub fn from_artifacts(artifacts: Artifacts, config: EngineConfig) -> Self {
        let catalog = Arc::new(artifacts.catalog);
        let content = ContentRecommender::new(
            catalog.clone(),
            Arc::new(artifacts.content),
            config.clone(),
        );
        let collaborative = CollaborativeRecommender::new(
            catalog.clone(),
            Arc::new(artifacts.collaborative),
            config,
        );

        let generation = Self {
            id: Uuid::new_v4(),
            built_at: artifacts.built_at,
            catalog,
            content,
            collaborative,
        };
        tracing::info!(generation = %generation.id, "Store generation ready");
        generation
    }

    pub fn build(
        corpus: &Corpus,
        config: EngineConfig,
        factorization: &FactorizationConfig,
    ) -> BuildResult<Self> {
        Ok(Self::from_artifacts(
            Artifacts::build(corpus, factorization)?,
            config,
        ))
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn built_at(&self) -> DateTime<Utc> {
        self.built_at
    }

    pub fn catalog(&self) -> &CatalogIndex {
        &self.catalog
    }

    pub fn recommender(&self, algorithm: Algorithm) -> &dyn Recommender {
        match algorithm {
            Algorithm::Content => &self.content,
            Algorithm::Collaborative => &self.collaborative,
        }
    }

    pub fn content(&self) -> &ContentRecommender {
        &self.content
    }

    pub fn collaborative(&self) -> &CollaborativeRecommender {
        &self.collaborative
    }

    /// Three seed titles in, up to `top_n` ranked movies out
    pub fn recommend(
        &self,
        algorithm: Algorithm,
        movie_list: &[String],
        top_n: usize,
    ) -> RecommendResult<Recommendations> {
        if movie_list.len() != SEED_COUNT {
            return Err(RecommendError::InvalidRequest(format!(
                "Expected exactly {} movies, got {}",
                SEED_COUNT,
                movie_list.len()
            )));
        }
        self.recommender(algorithm).recommend(movie_list, top_n)
    }

    /// Content-based recommendations for three liked titles
    pub fn content_model(
        &self,
        movie_list: &[String],
        top_n: usize,
    ) -> RecommendResult<Vec<String>> {
        Ok(self.recommend(Algorithm::Content, movie_list, top_n)?.titles())
    }

    /// Collaborative recommendations for three liked titles
    pub fn collab_model(
        &self,
        movie_list: &[String],
        top_n: usize,
    ) -> RecommendResult<Vec<String>> {
        Ok(self
            .recommend(Algorithm::Collaborative, movie_list, top_n)?
            .titles())
    }
}
