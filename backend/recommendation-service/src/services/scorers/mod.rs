// ============================================
// Scorer Adapters
// ============================================
//
// Uniform interface over every scoring strategy so the fusion engine and the
// router never care which algorithm produced a ranking.
//
// Contract shared by all variants:
// - limit >= 1
// - every query id exists in the catalog, otherwise NotFound(id)
// - output length <= limit, no query ids (random baseline exempt)
// - deterministic output (random baseline exempt)

mod neural;
mod random;
mod taxonomy;
mod text_retrieval;
mod tokenizer;
mod vector;

pub use neural::{NeuralModel, NeuralModelArtifact, NeuralScorer};
pub use random::RandomScorer;
pub use taxonomy::TaxonomyScorer;
pub use text_retrieval::{Bm25Params, TextRetrievalScorer};
pub use vector::VectorScorer;

use crate::catalog::Catalog;
use crate::error::{AppError, Result};
use crate::metrics;
use crate::models::{EngineName, ItemId, Query, RankedList};
use std::cmp::Ordering;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// A scoring strategy that turns a query into a ranked list of items
pub trait Scorer: Send + Sync {
    /// Engine tag attached to results produced by this scorer alone
    fn engine(&self) -> EngineName;

    fn score_or_rank(&self, query: &Query, limit: usize) -> Result<RankedList>;
}

/// Shared precondition check for every adapter
pub(crate) fn validate_request(catalog: &Catalog, query: &Query, limit: usize) -> Result<()> {
    if limit == 0 {
        return Err(AppError::ValidationError(
            "limit must be at least 1".to_string(),
        ));
    }
    catalog.ensure_known(query)
}

/// Order catalog positions by score descending, ties by catalog order, then
/// drop query items and truncate.
pub(crate) fn top_positions(
    catalog: &Catalog,
    scores: &[f64],
    exclude: &HashSet<ItemId>,
    limit: usize,
) -> RankedList {
    let mut positions: Vec<usize> = (0..scores.len()).collect();
    // sort_by is stable, so equal scores keep catalog order
    positions.sort_by(|&a, &b| {
        scores[b]
            .partial_cmp(&scores[a])
            .unwrap_or(Ordering::Equal)
    });

    let items = catalog.items();
    positions
        .into_iter()
        .map(|pos| items[pos].id)
        .filter(|id| !exclude.contains(id))
        .take(limit)
        .collect()
}

/// Run a scorer on the blocking pool, bounded by `timeout`.
///
/// Errors returned by the scorer propagate unchanged; a panic or an elapsed
/// budget surfaces as an adapter failure naming the engine. A timed-out
/// computation is left to finish in the background and its result dropped.
pub async fn rank_with_timeout(
    scorer: Arc<dyn Scorer>,
    query: Arc<Query>,
    limit: usize,
    timeout: Duration,
) -> Result<RankedList> {
    let engine = scorer.engine();
    let start = Instant::now();

    let task = tokio::task::spawn_blocking(move || scorer.score_or_rank(&query, limit));

    let outcome = match tokio::time::timeout(timeout, task).await {
        Ok(Ok(result)) => result,
        Ok(Err(join_err)) => {
            warn!(engine = %engine, error = %join_err, "Scorer task aborted");
            Err(AppError::AdapterFailure {
                engine,
                reason: join_err.to_string(),
            })
        }
        Err(_) => {
            warn!(
                engine = %engine,
                timeout_ms = timeout.as_millis() as u64,
                "Scorer exceeded its time budget"
            );
            Err(AppError::AdapterTimeout {
                engine,
                timeout_ms: timeout.as_millis() as u64,
            })
        }
    };

    let elapsed = start.elapsed();
    metrics::observe_adapter_latency(engine, outcome.is_ok(), elapsed);
    debug!(
        engine = %engine,
        elapsed_ms = elapsed.as_secs_f64() * 1000.0,
        ok = outcome.is_ok(),
        "Scorer call finished"
    );

    outcome
}
