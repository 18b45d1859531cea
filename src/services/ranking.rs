use std::collections::HashMap;

use crate::{
    models::{MovieId, Neighbor, Recommendations, ScoredMovie},
    services::{catalog::CatalogIndex, similarity::top_k},
};

/// Merges per-seed neighbor lists into one ranked list of at most `n`
///
/// Seeds are removed, a movie found through several seeds scores the sum of
/// its per-seed scores, and ordering is score descending then lower movie id.
/// Every seed weighs the same.
pub fn aggregate(lists: &[Vec<Neighbor>], seeds: &[MovieId], n: usize) -> Vec<Neighbor> {
    let mut merged: HashMap<MovieId, Neighbor> = HashMap::new();

    for list in lists {
        for neighbor in list {
            if seeds.contains(&neighbor.movie_id) {
                continue;
            }
            merged
                .entry(neighbor.movie_id)
                .and_modify(|m| m.score += neighbor.score)
                .or_insert(*neighbor);
        }
    }

    top_k(merged.into_values().collect(), n)
}

/// Maps ranked ids back to catalog titles
pub fn to_recommendations(
    catalog: &CatalogIndex,
    ranked: Vec<Neighbor>,
    requested: usize,
) -> Recommendations {
    let items = ranked
        .into_iter()
        .filter_map(|n| {
            catalog.title(n.movie_id).map(|title| ScoredMovie {
                movie_id: n.movie_id,
                title: title.to_string(),
                score: n.score,
            })
        })
        .collect();

    Recommendations { items, requested }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn n(movie_id: MovieId, score: f32) -> Neighbor {
        Neighbor {
            movie_id,
            position: movie_id,
            score,
        }
    }

    fn ids(ranked: &[Neighbor]) -> Vec<MovieId> {
        ranked.iter().map(|n| n.movie_id).collect()
    }

    #[test]
    fn test_seeds_are_excluded() {
        let lists = vec![
            vec![n(1, 1.0), n(4, 0.6)],
            vec![n(2, 1.0), n(1, 0.7)],
            vec![n(3, 1.0), n(5, 0.4)],
        ];
        let ranked = aggregate(&lists, &[1, 2, 3], 10);
        assert_eq!(ids(&ranked), vec![4, 5]);
    }

    #[test]
    fn test_shared_candidates_sum_scores() {
        // 10 is moderately similar to two seeds, 11 very similar to one
        let lists = vec![
            vec![n(10, 0.5), n(11, 0.9)],
            vec![n(10, 0.5)],
            vec![],
        ];
        let ranked = aggregate(&lists, &[1, 2, 3], 2);
        assert_eq!(ids(&ranked), vec![10, 11]);
        assert!((ranked[0].score - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_ties_break_on_lower_id() {
        let lists = vec![vec![n(9, 0.5), n(7, 0.5)], vec![n(8, 0.5)], vec![]];
        let ranked = aggregate(&lists, &[1, 2, 3], 3);
        assert_eq!(ids(&ranked), vec![7, 8, 9]);
    }

    #[test]
    fn test_truncates_and_never_pads() {
        let lists = vec![vec![n(4, 0.9), n(5, 0.8), n(6, 0.7)], vec![], vec![]];
        assert_eq!(aggregate(&lists, &[1, 2, 3], 2).len(), 2);
        assert_eq!(aggregate(&lists, &[1, 2, 3], 10).len(), 3);
    }

    #[test]
    fn test_no_duplicates() {
        let lists = vec![
            vec![n(4, 0.9), n(5, 0.8)],
            vec![n(5, 0.9), n(4, 0.1)],
            vec![n(4, 0.3), n(6, 0.2)],
        ];
        let ranked = aggregate(&lists, &[1, 2, 3], 10);
        let mut unique = ids(&ranked);
        unique.dedup();
        assert_eq!(unique.len(), ranked.len());
        assert_eq!(ids(&ranked), vec![5, 4, 6]);
    }
}
