use axum::{
    extract::{rejection::JsonRejection, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult, BuildResult, RecommendError},
    models::{Algorithm, MovieId, Recommendations},
    services::{Artifacts, Corpus, Generation},
};

use super::AppState;

const DEFAULT_TOP_N: i64 = 10;
const DEFAULT_SEARCH_LIMIT: usize = 20;
const MAX_SEARCH_LIMIT: usize = 100;

// Request/Response types

#[derive(Debug, Deserialize, Serialize)]
pub struct RecommendRequest {
    pub algorithm: Algorithm,
    pub movies: Vec<String>,
    /// Signed so that negative values reach validation instead of the JSON rejection
    #[serde(default = "default_top_n")]
    pub top_n: i64,
}

fn default_top_n() -> i64 {
    DEFAULT_TOP_N
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct RecommendationItem {
    pub rank: usize,
    pub movie_id: MovieId,
    pub title: String,
    pub score: f32,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RecommendResponse {
    pub algorithm: Algorithm,
    pub generation: Uuid,
    pub recommendations: Vec<RecommendationItem>,
    /// Fewer candidates than requested were available
    pub insufficient_candidates: bool,
}

impl RecommendResponse {
    fn new(algorithm: Algorithm, generation: Uuid, recommendations: Recommendations) -> Self {
        let insufficient_candidates = recommendations.is_short();
        let recommendations = recommendations
            .items
            .into_iter()
            .enumerate()
            .map(|(i, m)| RecommendationItem {
                rank: i + 1,
                movie_id: m.movie_id,
                title: m.title,
                score: m.score,
            })
            .collect();

        Self {
            algorithm,
            generation,
            recommendations,
            insufficient_candidates,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct MovieSearchParams {
    #[serde(default)]
    pub q: String,
    pub limit: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct MovieSummary {
    pub movie_id: MovieId,
    pub title: String,
    pub genres: Vec<String>,
}

#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ReloadSource {
    /// Deserialize the persisted artifacts
    Artifacts,
    /// Rebuild from the CSV corpus
    Corpus,
}

#[derive(Debug, Deserialize)]
pub struct ReloadParams {
    pub source: Option<ReloadSource>,
}

// Handlers

/// Health check endpoint
pub async fn health_check(State(state): State<AppState>) -> (StatusCode, Json<Value>) {
    let generation = state.current().await;
    let content = generation.content().store();
    let collaborative = generation.collaborative().store();
    (
        StatusCode::OK,
        Json(json!({
            "status": "healthy",
            "generation": generation.id(),
            "built_at": generation.built_at(),
            "movies": generation.catalog().len(),
            "content": {
                "vocabulary": content.vocabulary_size(),
            },
            "collaborative": {
                "factors": collaborative.factors(),
                "rated_movies": collaborative.rated_count(),
                "train_rmse": collaborative.train_rmse(),
                "validation_rmse": collaborative.validation_rmse(),
            },
        })),
    )
}

/// Lists catalog titles matching `q` for a selection UI
pub async fn list_movies(
    State(state): State<AppState>,
    Query(params): Query<MovieSearchParams>,
) -> Json<Vec<MovieSummary>> {
    let limit = params
        .limit
        .unwrap_or(DEFAULT_SEARCH_LIMIT)
        .min(MAX_SEARCH_LIMIT);
    let generation = state.current().await;

    let movies = generation
        .catalog()
        .search(&params.q, limit)
        .into_iter()
        .map(|m| MovieSummary {
            movie_id: m.id,
            title: m.title.clone(),
            genres: m.genres.clone(),
        })
        .collect();

    Json(movies)
}

/// Ranks movies for three liked titles with the requested engine
pub async fn recommend(
    State(state): State<AppState>,
    payload: Result<Json<RecommendRequest>, JsonRejection>,
) -> AppResult<Json<RecommendResponse>> {
    let Json(request) =
        payload.map_err(|e| RecommendError::InvalidRequest(e.body_text()))?;

    let top_n = usize::try_from(request.top_n).map_err(|_| {
        RecommendError::InvalidRequest("top_n must be positive".to_string())
    })?;

    let generation = state.current().await;
    let recommendations = generation.recommend(request.algorithm, &request.movies, top_n)?;

    Ok(Json(RecommendResponse::new(
        request.algorithm,
        generation.id(),
        recommendations,
    )))
}

/// Rebuilds or reloads the stores and swaps them in
///
/// The previous generation keeps serving if anything fails.
pub async fn reload(
    State(state): State<AppState>,
    Query(params): Query<ReloadParams>,
) -> AppResult<Json<Value>> {
    let _guard = state.reload_guard().await;
    let config = state.config().clone();

    let source = params.source.unwrap_or(if config.artifacts_path.exists() {
        ReloadSource::Artifacts
    } else {
        ReloadSource::Corpus
    });

    tracing::info!(?source, "Reload requested");

    let generation = tokio::task::spawn_blocking(move || -> BuildResult<Generation> {
        let engine = config.engine();
        match source {
            ReloadSource::Artifacts => {
                Artifacts::load(&config.artifacts_path)
                    .map(|a| Generation::from_artifacts(a, engine))
            }
            ReloadSource::Corpus => {
                let corpus = Corpus::load(&config.data_dir)?;
                Generation::build(&corpus, engine, &config.factorization())
            }
        }
    })
    .await
    .map_err(|e| AppError::Internal(format!("Reload task failed: {}", e)))?
    .map_err(|e| {
        tracing::error!(error = %e, "Reload failed, keeping current generation");
        AppError::from(e)
    })?;

    let id = generation.id();
    let movies = generation.catalog().len();
    let previous = state.swap(generation).await;

    tracing::info!(previous = %previous.id(), current = %id, "Generation swapped");

    Ok(Json(json!({
        "generation": id,
        "previous": previous.id(),
        "movies": movies,
    })))
}
