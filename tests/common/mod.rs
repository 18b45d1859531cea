#![allow(dead_code)]

use std::fmt::Write as _;
use std::path::Path;

use cinematch::{
    models::{Movie, Rating},
    services::{EngineConfig, FactorizationConfig},
    Corpus, Generation,
};

pub const ACTION: [&str; 4] = [
    "Die Hard (1988)",
    "Speed (1994)",
    "Heat (1995)",
    "Point Break (1991)",
];

pub const ROMANCE: [&str; 4] = [
    "Notting Hill (1999)",
    "Sleepless in Seattle (1993)",
    "Pretty Woman (1990)",
    "The Notebook (2004)",
];

/// Never rated and shares no vocabulary with anything else
pub const LONER: &str = "Baraka (1992)";

pub fn movies() -> Vec<Movie> {
    vec![
        Movie::new(1, ACTION[0])
            .with_genres(["Action", "Thriller"])
            .with_tags("heist skyscraper christmas"),
        Movie::new(2, ACTION[1])
            .with_genres(["Action", "Thriller"])
            .with_tags("bus bomb"),
        Movie::new(3, ACTION[2])
            .with_genres(["Action", "Crime", "Thriller"])
            .with_tags("heist"),
        Movie::new(4, ACTION[3])
            .with_genres(["Action", "Crime"])
            .with_tags("surfing heist"),
        Movie::new(5, ROMANCE[0])
            .with_genres(["Comedy", "Romance"])
            .with_tags("london bookshop"),
        Movie::new(6, ROMANCE[1])
            .with_genres(["Comedy", "Romance"])
            .with_tags("radio"),
        Movie::new(7, ROMANCE[2]).with_genres(["Comedy", "Romance"]),
        Movie::new(8, ROMANCE[3])
            .with_genres(["Drama", "Romance"])
            .with_tags("letters"),
        Movie::new(9, LONER).with_genres(["Documentary"]),
    ]
}

/// Users 1..=10 love the action movies and dislike the romances,
/// users 11..=20 the reverse. Movie 9 is never rated.
pub fn ratings() -> Vec<Rating> {
    let mut ratings = Vec::new();
    for user in 1..=20u32 {
        for movie in 1..=8u32 {
            let likes = (movie <= 4) == (user <= 10);
            ratings.push(Rating::new(user, movie, if likes { 5.0 } else { 1.0 }));
        }
    }
    ratings
}

pub fn corpus() -> Corpus {
    Corpus::new(movies(), ratings())
}

pub fn factorization() -> FactorizationConfig {
    FactorizationConfig {
        factors: 4,
        epochs: 200,
        learning_rate: 0.02,
        regularization: 0.02,
        holdout_fraction: 0.0,
        tolerance: 0.0,
        ..FactorizationConfig::default()
    }
}

/// Hold-out, tolerance, patience and seed as shipped
pub fn factorization_with_holdout() -> FactorizationConfig {
    FactorizationConfig {
        factors: 4,
        epochs: 200,
        learning_rate: 0.02,
        ..FactorizationConfig::default()
    }
}

pub fn generation() -> Generation {
    Generation::build(&corpus(), EngineConfig::default(), &factorization()).unwrap()
}

pub fn titles(names: &[&str]) -> Vec<String> {
    names.iter().map(|s| s.to_string()).collect()
}

/// Writes the corpus as `movies.csv` + `train.csv`
pub fn write_corpus(dir: &Path) {
    let mut movies_csv = String::from("movieId,title,genres\n");
    let mut tags_csv = String::from("userId,movieId,tag,timestamp\n");
    for movie in movies() {
        let genres = movie.genres.join("|");
        writeln!(movies_csv, "{},\"{}\",{}", movie.id, movie.title, genres).unwrap();
        if !movie.tag_text.is_empty() {
            writeln!(tags_csv, "1,{},{},0", movie.id, movie.tag_text).unwrap();
        }
    }

    let mut ratings_csv = String::from("userId,movieId,rating,timestamp\n");
    for rating in ratings() {
        let (user, movie, value) = (rating.user_id, rating.movie_id, rating.value);
        writeln!(ratings_csv, "{},{},{},0", user, movie, value).unwrap();
    }

    std::fs::write(dir.join("movies.csv"), movies_csv).unwrap();
    std::fs::write(dir.join("tags.csv"), tags_csv).unwrap();
    std::fs::write(dir.join("train.csv"), ratings_csv).unwrap();
}
