use super::{validate_request, Scorer};
use crate::catalog::Catalog;
use crate::error::Result;
use crate::models::{EngineName, ItemId, Query, RankedList};
use rand::seq::SliceRandom;
use std::sync::Arc;

/// Uniform random baseline, sampled without replacement.
///
/// Query items are not excluded.
pub struct RandomScorer {
    catalog: Arc<Catalog>,
    choices: Vec<ItemId>,
}

impl RandomScorer {
    pub fn new(catalog: Arc<Catalog>) -> Self {
        let choices = catalog.ids();
        Self { catalog, choices }
    }
}

impl Scorer for RandomScorer {
    fn engine(&self) -> EngineName {
        EngineName::Random
    }

    fn score_or_rank(&self, query: &Query, limit: usize) -> Result<RankedList> {
        validate_request(&self.catalog, query, limit)?;

        let mut rng = rand::thread_rng();
        Ok(self
            .choices
            .choose_multiple(&mut rng, limit)
            .copied()
            .collect())
    }
}
