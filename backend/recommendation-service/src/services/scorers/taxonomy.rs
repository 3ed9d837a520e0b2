// ============================================
// Taxonomy Scorer
// ============================================
//
// Popularity ranking inside the dominant genre of the query items.

use super::{validate_request, Scorer};
use crate::catalog::Catalog;
use crate::error::Result;
use crate::models::{EngineName, Query, RankedList};
use std::cmp::Reverse;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

pub struct TaxonomyScorer {
    catalog: Arc<Catalog>,
}

impl TaxonomyScorer {
    pub fn new(catalog: Arc<Catalog>) -> Self {
        Self { catalog }
    }

    /// Most frequent genre across the query items, first encountered on ties
    fn dominant_genre<'a>(&'a self, query: &Query) -> Result<Option<&'a str>> {
        let mut counts: HashMap<&str, (usize, usize)> = HashMap::new();
        let mut seen = 0usize;

        for id in query.ids() {
            for genre in &self.catalog.get_item(*id)?.genres {
                let entry = counts.entry(genre.as_str()).or_insert_with(|| {
                    seen += 1;
                    (0, seen)
                });
                entry.0 += 1;
            }
        }

        Ok(counts
            .into_iter()
            .max_by_key(|(_, (count, first_seen))| (*count, Reverse(*first_seen)))
            .map(|(genre, _)| genre))
    }
}

impl Scorer for TaxonomyScorer {
    fn engine(&self) -> EngineName {
        EngineName::Genre
    }

    fn score_or_rank(&self, query: &Query, limit: usize) -> Result<RankedList> {
        validate_request(&self.catalog, query, limit)?;

        let Some(genre) = self.dominant_genre(query)? else {
            debug!("Query items carry no genre");
            return Ok(Vec::new());
        };
        debug!(genre, "Dominant genre selected");

        let exclude = query.id_set();
        let mut candidates: Vec<(usize, u64, _)> = self
            .catalog
            .items()
            .iter()
            .enumerate()
            .filter(|(_, item)| !exclude.contains(&item.id))
            .filter(|(_, item)| item.genres.iter().any(|g| g == genre))
            .map(|(pos, item)| (pos, item.popularity, item.id))
            .collect();

        candidates.sort_by_key(|&(pos, popularity, _)| (Reverse(popularity), pos));

        Ok(candidates
            .into_iter()
            .take(limit)
            .map(|(_, _, id)| id)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_fixtures::sample_catalog;
    use super::*;
    use crate::error::AppError;
    use crate::models::{Item, ItemId};

    #[test]
    fn test_ranks_by_popularity_within_genre() {
        let scorer = TaxonomyScorer::new(sample_catalog());
        let ranked = scorer.score_or_rank(&Query::from(vec![1]), 10).unwrap();
        assert_eq!(ranked, vec![ItemId(2), ItemId(3)]);
    }

    #[test]
    fn test_genre_tie_goes_to_first_encountered() {
        let scorer = TaxonomyScorer::new(sample_catalog());

        let ranked = scorer.score_or_rank(&Query::from(vec![1, 4]), 10).unwrap();
        assert_eq!(ranked, vec![ItemId(2), ItemId(3)]);

        let ranked = scorer.score_or_rank(&Query::from(vec![4, 1]), 10).unwrap();
        assert_eq!(ranked, vec![ItemId(6), ItemId(5)]);
    }

    #[test]
    fn test_duplicate_query_items_count_twice() {
        let scorer = TaxonomyScorer::new(sample_catalog());
        // Action ×2 beats Simulation ×1
        let ranked = scorer.score_or_rank(&Query::from(vec![4, 1, 1]), 1).unwrap();
        assert_eq!(ranked, vec![ItemId(2)]);
    }

    #[test]
    fn test_popularity_ties_keep_catalog_order() {
        let game = |id: u64| Item {
            id: ItemId(id),
            genres: vec!["RPG".to_string()],
            popularity: 10,
            ..Default::default()
        };
        let catalog = Arc::new(Catalog::from_items(vec![game(3), game(1), game(2)]));
        let scorer = TaxonomyScorer::new(catalog);

        let ranked = scorer.score_or_rank(&Query::from(vec![2]), 5).unwrap();
        assert_eq!(ranked, vec![ItemId(3), ItemId(1)]);
    }

    #[test]
    fn test_unknown_item_is_not_found() {
        let scorer = TaxonomyScorer::new(sample_catalog());
        assert!(matches!(
            scorer.score_or_rank(&Query::from(vec![42]), 5),
            Err(AppError::NotFound(ItemId(42)))
        ));
    }
}
