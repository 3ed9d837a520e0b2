// ============================================
// Engine Router (A/B dispatcher)
// ============================================
//
// Draws one serving engine per request from a static weighted distribution
// and runs it. Draws are independent (no session affinity); the engine tag
// travels with every served list so click/rate signals can be compared
// across engines offline.
//
// There is no fallback: if the chosen engine fails, the request fails.

use crate::error::{AppError, Result};
use crate::models::{EngineName, Query, RankedList};
use crate::services::fusion::RankFusionEngine;
use crate::services::scorers::{
    rank_with_timeout, NeuralScorer, RandomScorer, Scorer, TaxonomyScorer, TextRetrievalScorer,
    VectorScorer,
};
use rand::distributions::{Distribution, WeightedIndex};
use rand::Rng;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// Serving strategy behind an engine name
#[derive(Clone)]
pub enum Strategy {
    Fusion(Arc<RankFusionEngine>),
    LearnedEmbedding(Arc<NeuralScorer>),
    TaxonomyOnly(Arc<TaxonomyScorer>),
    TextOnly(Arc<TextRetrievalScorer>),
    VectorOnly(Arc<VectorScorer>),
    Random(Arc<RandomScorer>),
}

impl Strategy {
    pub fn engine(&self) -> EngineName {
        match self {
            Strategy::Fusion(_) => EngineName::Combined,
            Strategy::LearnedEmbedding(_) => EngineName::Neural,
            Strategy::TaxonomyOnly(_) => EngineName::Genre,
            Strategy::TextOnly(_) => EngineName::Content,
            Strategy::VectorOnly(_) => EngineName::Vector,
            Strategy::Random(_) => EngineName::Random,
        }
    }

    async fn run(&self, query: Arc<Query>, limit: usize, timeout: Duration) -> Result<RankedList> {
        let scorer: Arc<dyn Scorer> = match self {
            Strategy::Fusion(fusion) => return fusion.rank(query, limit).await,
            Strategy::LearnedEmbedding(scorer) => scorer.clone(),
            Strategy::TaxonomyOnly(scorer) => scorer.clone(),
            Strategy::TextOnly(scorer) => scorer.clone(),
            Strategy::VectorOnly(scorer) => scorer.clone(),
            Strategy::Random(scorer) => scorer.clone(),
        };
        rank_with_timeout(scorer, query, limit, timeout).await
    }
}

pub struct EngineRouter {
    table: HashMap<EngineName, Strategy>,
    /// Engines with a positive weight, in configured order
    engines: Vec<EngineName>,
    probabilities: Vec<f64>,
    distribution: WeightedIndex<f64>,
    adapter_timeout: Duration,
}

impl EngineRouter {
    /// Build the dispatch table and the serving distribution.
    ///
    /// Weights need not sum to 1. Negative or non-finite weights, an
    /// all-zero set, duplicate engines, or a positive weight for an engine
    /// with no registered strategy are configuration errors.
    pub fn new(
        weights: Vec<(EngineName, f64)>,
        strategies: Vec<Strategy>,
        adapter_timeout: Duration,
    ) -> Result<Self> {
        if weights.is_empty() {
            return Err(AppError::InvalidConfiguration(
                "engine weights are empty".to_string(),
            ));
        }

        let table: HashMap<EngineName, Strategy> = strategies
            .into_iter()
            .map(|strategy| (strategy.engine(), strategy))
            .collect();

        let mut engines = Vec::new();
        let mut raw = Vec::new();
        let mut seen = Vec::new();
        for (engine, weight) in weights {
            if seen.contains(&engine) {
                return Err(AppError::InvalidConfiguration(format!(
                    "engine {} is weighted twice",
                    engine
                )));
            }
            seen.push(engine);

            if !weight.is_finite() || weight < 0.0 {
                return Err(AppError::InvalidConfiguration(format!(
                    "weight for engine {} must be a non-negative number, got {}",
                    engine, weight
                )));
            }
            if weight == 0.0 {
                continue;
            }
            if !table.contains_key(&engine) {
                return Err(AppError::InvalidConfiguration(format!(
                    "engine {} has weight {} but no strategy is registered",
                    engine, weight
                )));
            }
            engines.push(engine);
            raw.push(weight);
        }

        let total: f64 = raw.iter().sum();
        if engines.is_empty() || total <= 0.0 {
            return Err(AppError::InvalidConfiguration(
                "at least one engine weight must be positive".to_string(),
            ));
        }

        let probabilities: Vec<f64> = raw.iter().map(|w| w / total).collect();
        let distribution = WeightedIndex::new(&probabilities)
            .map_err(|e| AppError::InvalidConfiguration(e.to_string()))?;

        let summary: Vec<String> = engines
            .iter()
            .zip(probabilities.iter())
            .map(|(engine, p)| format!("{}={:.3}", engine, p))
            .collect();
        info!(
            engines = ?summary,
            registered = table.len(),
            "Engine router ready"
        );

        Ok(Self {
            table,
            engines,
            probabilities,
            distribution,
            adapter_timeout,
        })
    }

    /// Normalized serving probabilities
    pub fn weights(&self) -> Vec<(EngineName, f64)> {
        self.engines
            .iter()
            .copied()
            .zip(self.probabilities.iter().copied())
            .collect()
    }

    pub fn is_registered(&self, engine: EngineName) -> bool {
        self.table.contains_key(&engine)
    }

    pub fn select_engine(&self) -> EngineName {
        self.select_with(&mut rand::thread_rng())
    }

    pub fn select_with<R: Rng + ?Sized>(&self, rng: &mut R) -> EngineName {
        self.engines[self.distribution.sample(rng)]
    }

    /// Run one specific engine
    pub async fn run(
        &self,
        engine: EngineName,
        query: Arc<Query>,
        limit: usize,
    ) -> Result<RankedList> {
        let strategy = self.table.get(&engine).ok_or_else(|| {
            AppError::ValidationError(format!("engine {} is not available", engine))
        })?;
        strategy.run(query, limit, self.adapter_timeout).await
    }

    /// Select an engine and run it
    pub async fn dispatch(
        &self,
        query: Arc<Query>,
        limit: usize,
    ) -> Result<(EngineName, RankedList)> {
        let engine = self.select_engine();
        debug!(engine = %engine, query_len = query.len(), limit, "Engine selected");

        let ranked = self.run(engine, query, limit).await?;
        Ok((engine, ranked))
    }
}
