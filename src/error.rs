use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

/// Per-request failures. Local to the request, never touch shared stores.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum RecommendError {
    #[error("Unknown movie: {0}")]
    UnknownMovie(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

/// Offline build failures. Fatal to the build, a partial store is never served.
#[derive(thiserror::Error, Debug)]
pub enum BuildError {
    #[error("Catalog is empty")]
    EmptyCatalog,

    #[error("Every content vector is empty, vocabulary has no usable terms")]
    DegenerateVectors,

    #[error("No ratings reference catalog movies")]
    NoRatings,

    #[error("Factorization diverged at epoch {epoch}")]
    Diverged { epoch: usize },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Artifact error: {0}")]
    Artifact(#[from] bincode::Error),
}

/// Application-level errors
#[derive(thiserror::Error, Debug)]
pub enum AppError {
    #[error(transparent)]
    Recommend(#[from] RecommendError),

    #[error("Build failed: {0}")]
    Build(#[from] BuildError),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl AppError {
    /// Stable machine-readable error kind for clients
    pub fn kind(&self) -> &'static str {
        match self {
            AppError::Recommend(RecommendError::UnknownMovie(_)) => "unknown_movie",
            AppError::Recommend(RecommendError::InvalidRequest(_)) => "invalid_request",
            AppError::Build(_) => "build_failure",
            AppError::Internal(_) => "internal",
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::Recommend(RecommendError::UnknownMovie(_)) => StatusCode::NOT_FOUND,
            AppError::Recommend(RecommendError::InvalidRequest(_)) => StatusCode::BAD_REQUEST,
            AppError::Build(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = Json(json!({
            "error": self.to_string(),
            "kind": self.kind(),
        }));

        (status, body).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;
pub type RecommendResult<T> = Result<T, RecommendError>;
pub type BuildResult<T> = Result<T, BuildError>;
