// ============================================
// Rank Fusion Engine
// ============================================
//
// Weighted reciprocal-rank merge of several scorer outputs:
//
//   fused(item) = Σ_a  w_a / rank_a(item)      (1-based rank, absent → 0)
//
// Each adapter is asked for 2 × limit items so that merging does not lose
// candidates ranked just below the cut in one list but high in another.
// Accumulation runs in adapter order and the final sort is stable, so equal
// scores keep first-seen order.

use crate::error::{AppError, Result};
use crate::models::{EngineName, ItemId, Query, RankedList};
use crate::services::scorers::{rank_with_timeout, Scorer};
use futures::future::try_join_all;
use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Over-fetch factor applied to the requested limit
const OVERFETCH: usize = 2;

/// Merge ranked lists into `(item, fused score)` pairs, best first.
pub fn fuse_ranked_lists(lists: &[(f64, &[ItemId])], limit: usize) -> Vec<(ItemId, f64)> {
    let mut accumulator: Vec<(ItemId, f64)> = Vec::new();
    let mut slots: HashMap<ItemId, usize> = HashMap::new();

    for (weight, ranked) in lists {
        for (rank, id) in ranked.iter().enumerate() {
            let contribution = weight / (rank + 1) as f64;
            let slot = *slots.entry(*id).or_insert_with(|| {
                accumulator.push((*id, 0.0));
                accumulator.len() - 1
            });
            accumulator[slot].1 += contribution;
        }
    }

    // stable sort keeps first-seen order among equal scores
    accumulator.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal));
    accumulator.truncate(limit);
    accumulator
}

struct WeightedAdapter {
    scorer: Arc<dyn Scorer>,
    weight: f64,
}

pub struct RankFusionEngine {
    adapters: Vec<WeightedAdapter>,
    adapter_timeout: Duration,
}

impl RankFusionEngine {
    /// Adapters are accumulated in the order given.
    pub fn new(adapters: Vec<(Arc<dyn Scorer>, f64)>, adapter_timeout: Duration) -> Result<Self> {
        if adapters.is_empty() {
            return Err(AppError::InvalidConfiguration(
                "fusion needs at least one adapter".to_string(),
            ));
        }
        if let Some((scorer, weight)) = adapters
            .iter()
            .find(|(_, weight)| !weight.is_finite() || *weight < 0.0)
        {
            return Err(AppError::InvalidConfiguration(format!(
                "fusion weight for {} must be a non-negative number, got {}",
                scorer.engine(),
                weight
            )));
        }

        Ok(Self {
            adapters: adapters
                .into_iter()
                .map(|(scorer, weight)| WeightedAdapter { scorer, weight })
                .collect(),
            adapter_timeout,
        })
    }

    pub fn engine(&self) -> EngineName {
        EngineName::Combined
    }

    pub fn weights(&self) -> Vec<(EngineName, f64)> {
        self.adapters
            .iter()
            .map(|a| (a.scorer.engine(), a.weight))
            .collect()
    }

    /// Query all adapters concurrently and fuse their rankings.
    ///
    /// Any adapter error fails the whole request.
    pub async fn rank(&self, query: Arc<Query>, limit: usize) -> Result<RankedList> {
        if limit == 0 {
            return Err(AppError::ValidationError(
                "limit must be at least 1".to_string(),
            ));
        }
        let fetch = limit.saturating_mul(OVERFETCH);

        let calls = self.adapters.iter().map(|adapter| {
            rank_with_timeout(
                Arc::clone(&adapter.scorer),
                Arc::clone(&query),
                fetch,
                self.adapter_timeout,
            )
        });
        // try_join_all preserves input order
        let outputs = try_join_all(calls).await?;

        let lists: Vec<(f64, &[ItemId])> = self
            .adapters
            .iter()
            .zip(outputs.iter())
            .map(|(adapter, ranked)| (adapter.weight, ranked.as_slice()))
            .collect();
        let fused = fuse_ranked_lists(&lists, limit);

        debug!(
            adapters = self.adapters.len(),
            fetched = fetch,
            returned = fused.len(),
            "Rank fusion complete"
        );

        Ok(fused.into_iter().map(|(id, _)| id).collect())
    }
}
