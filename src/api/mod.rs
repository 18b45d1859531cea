mod handlers;
pub mod request_id;
mod routes;
mod state;

pub use handlers::{RecommendRequest, RecommendResponse, RecommendationItem};
pub use routes::create_router;
pub use state::AppState;
