use serde::{Deserialize, Serialize};

/// Stable movie identifier (MovieLens `movieId`)
pub type MovieId = u32;

/// Lowest and highest rating values accepted by the collaborative build
pub const MIN_RATING: f32 = 0.5;
pub const MAX_RATING: f32 = 5.0;

/// A catalog entry
///
/// Titles are the external key callers supply, so they must be unique within
/// a catalog. Immutable once the catalog is built.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Movie {
    pub id: MovieId,
    pub title: String,
    pub genres: Vec<String>,
    /// Free text: user tags, plot keywords, compacted people names
    pub tag_text: String,
}

impl Movie {
    pub fn new(id: MovieId, title: impl Into<String>) -> Self {
        Self {
            id,
            title: title.into(),
            genres: Vec::new(),
            tag_text: String::new(),
        }
    }

    pub fn with_genres<I, S>(mut self, genres: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.genres = genres.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_tags(mut self, tag_text: impl Into<String>) -> Self {
        self.tag_text = tag_text.into();
        self
    }

    /// Appends free text to the tag field, space separated
    pub fn push_tags(&mut self, text: &str) {
        let text = text.trim();
        if text.is_empty() {
            return;
        }
        if !self.tag_text.is_empty() {
            self.tag_text.push(' ');
        }
        self.tag_text.push_str(text);
    }
}

/// One historical rating, input to the collaborative build only
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Rating {
    pub user_id: u32,
    pub movie_id: MovieId,
    pub value: f32,
}

impl Rating {
    pub fn new(user_id: u32, movie_id: MovieId, value: f32) -> Self {
        Self {
            user_id,
            movie_id,
            value,
        }
    }

    /// Whether the value lies in the accepted rating range
    pub fn is_in_range(&self) -> bool {
        (MIN_RATING..=MAX_RATING).contains(&self.value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_tags_joins_with_space() {
        let mut movie = Movie::new(1, "Toy Story (1995)");
        movie.push_tags("pixar");
        movie.push_tags("  ");
        movie.push_tags("fun");
        assert_eq!(movie.tag_text, "pixar fun");
    }

    #[test]
    fn test_rating_range() {
        assert!(Rating::new(1, 1, 0.5).is_in_range());
        assert!(Rating::new(1, 1, 5.0).is_in_range());
        assert!(!Rating::new(1, 1, 0.0).is_in_range());
        assert!(!Rating::new(1, 1, 5.5).is_in_range());
    }
}
