use serde::{de::DeserializeOwned, Deserialize};
use std::collections::HashMap;
use std::path::Path;
use std::time::Instant;

use crate::{
    error::BuildResult,
    models::{Movie, MovieId, Rating},
};

const NO_GENRES: &str = "(no genres listed)";

/// Raw inputs to an offline build
#[derive(Debug, Clone, Default)]
pub struct Corpus {
    pub movies: Vec<Movie>,
    pub ratings: Vec<Rating>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MovieRecord {
    movie_id: MovieId,
    title: String,
    #[serde(default)]
    genres: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TagRecord {
    movie_id: MovieId,
    #[serde(default)]
    tag: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RatingRecord {
    user_id: u32,
    movie_id: MovieId,
    rating: f32,
}

#[derive(Debug, Deserialize)]
struct ImdbRecord {
    #[serde(rename = "movieId")]
    movie_id: MovieId,
    #[serde(default)]
    title_cast: Option<String>,
    #[serde(default)]
    director: Option<String>,
    #[serde(default)]
    plot_keywords: Option<String>,
}

impl Corpus {
    pub fn new(movies: Vec<Movie>, ratings: Vec<Rating>) -> Self {
        Self { movies, ratings }
    }

    /// Loads a MovieLens-style directory
    ///
    /// Required: `movies.csv` and one of `train.csv` / `ratings.csv`.
    /// Optional: `tags.csv`, `imdb_data.csv`.
    pub fn load(dir: impl AsRef<Path>) -> BuildResult<Self> {
        let dir = dir.as_ref();
        let start = Instant::now();

        let mut movies: Vec<Movie> = read_records::<MovieRecord>(&dir.join("movies.csv"))?
            .into_iter()
            .map(|r| {
                let genres = r
                    .genres
                    .as_deref()
                    .filter(|g| *g != NO_GENRES)
                    .map(split_pipes)
                    .unwrap_or_default();
                Movie::new(r.movie_id, r.title.trim()).with_genres(genres)
            })
            .collect();

        let positions: HashMap<MovieId, usize> =
            movies.iter().enumerate().map(|(i, m)| (m.id, i)).collect();

        let tags_path = dir.join("tags.csv");
        if tags_path.exists() {
            for record in read_records::<TagRecord>(&tags_path)? {
                if let (Some(&i), Some(tag)) = (positions.get(&record.movie_id), record.tag) {
                    movies[i].push_tags(&tag);
                }
            }
        }

        let imdb_path = dir.join("imdb_data.csv");
        if imdb_path.exists() {
            for record in read_records::<ImdbRecord>(&imdb_path)? {
                let Some(&i) = positions.get(&record.movie_id) else {
                    continue;
                };
                if let Some(keywords) = record.plot_keywords.as_deref() {
                    movies[i].push_tags(&split_pipes(keywords).join(" "));
                }
                for people in [record.director.as_deref(), record.title_cast.as_deref()]
                    .into_iter()
                    .flatten()
                {
                    movies[i].push_tags(&compact_names(people));
                }
            }
        }

        let ratings_path = ["train.csv", "ratings.csv"]
            .iter()
            .map(|name| dir.join(name))
            .find(|p| p.exists())
            .unwrap_or_else(|| dir.join("ratings.csv"));
        let ratings: Vec<Rating> = read_records::<RatingRecord>(&ratings_path)?
            .into_iter()
            .map(|r| Rating::new(r.user_id, r.movie_id, r.rating))
            .collect();

        tracing::info!(
            dir = %dir.display(),
            movies = movies.len(),
            ratings = ratings.len(),
            elapsed_ms = start.elapsed().as_millis(),
            "Corpus loaded"
        );

        Ok(Self { movies, ratings })
    }
}

/// Reads every row of a headed CSV file; malformed rows are counted and skipped
fn read_records<T: DeserializeOwned>(path: &Path) -> BuildResult<Vec<T>> {
    let mut reader = csv::ReaderBuilder::new().flexible(true).from_path(path)?;
    let mut records = Vec::new();
    let mut malformed = 0usize;

    for result in reader.deserialize::<T>() {
        match result {
            Ok(record) => records.push(record),
            Err(e) => {
                malformed += 1;
                tracing::debug!(path = %path.display(), error = %e, "Skipping malformed row");
            }
        }
    }

    if malformed > 0 {
        tracing::warn!(path = %path.display(), malformed, "Malformed rows skipped");
    }

    Ok(records)
}

fn split_pipes(value: &str) -> Vec<String> {
    value
        .split('|')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// "Tom Hanks|Tim Allen" -> "tomhanks timallen", one term per person
fn compact_names(value: &str) -> String {
    split_pipes(value)
        .iter()
        .map(|name| {
            name.chars()
                .filter(|c| c.is_alphanumeric())
                .collect::<String>()
                .to_lowercase()
        })
        .filter(|name| !name.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_compact_names() {
        assert_eq!(compact_names("Tom Hanks|Tim Allen| "), "tomhanks timallen");
        assert_eq!(compact_names("Jean-Luc Godard"), "jeanlucgodard");
    }

    #[test]
    fn test_load_movielens_directory() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("movies.csv"),
            "movieId,title,genres\n\
             1,Toy Story (1995),Adventure|Animation|Children\n\
             2,Jumanji (1995),Adventure|Fantasy\n\
             3,Unknown Film (1990),(no genres listed)\n",
        )
        .unwrap();
        fs::write(
            dir.path().join("tags.csv"),
            "userId,movieId,tag,timestamp\n5,1,pixar,1\n5,2,board game,2\n5,42,orphan,3\n",
        )
        .unwrap();
        fs::write(
            dir.path().join("imdb_data.csv"),
            "movieId,title_cast,director,runtime,budget,plot_keywords\n\
             1,Tom Hanks|Tim Allen,John Lasseter,81,\"$30,000,000\",toy|rivalry\n",
        )
        .unwrap();
        fs::write(
            dir.path().join("train.csv"),
            "userId,movieId,rating,timestamp\n1,1,4.0,1\n1,2,3.5,2\nbad,row,x,y\n",
        )
        .unwrap();

        let corpus = Corpus::load(dir.path()).unwrap();
        assert_eq!(corpus.movies.len(), 3);
        assert_eq!(corpus.movies[0].genres, vec!["Adventure", "Animation", "Children"]);
        assert!(corpus.movies[2].genres.is_empty());
        assert_eq!(
            corpus.movies[0].tag_text,
            "pixar toy rivalry johnlasseter tomhanks timallen"
        );
        assert_eq!(corpus.movies[1].tag_text, "board game");
        assert_eq!(corpus.ratings.len(), 2);
        assert_eq!(corpus.ratings[1], Rating::new(1, 2, 3.5));
    }

    #[test]
    fn test_missing_movies_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        assert!(Corpus::load(dir.path()).is_err());
    }
}
