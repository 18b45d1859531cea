pub mod movie;
pub mod recommendation;

pub use movie::{Movie, MovieId, Rating, MAX_RATING, MIN_RATING};
pub use recommendation::{Algorithm, Neighbor, Recommendations, ScoredMovie};
