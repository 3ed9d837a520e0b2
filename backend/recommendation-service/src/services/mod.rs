//! Recommendation core
//!
//! `RecommendationService` is the single entry point used by the HTTP layer:
//! it validates a request against the catalog, lets the router pick and run
//! an engine, records the serve, and translates ids into summaries.

pub mod fusion;
pub mod recorder;
pub mod router;
pub mod scorers;

pub use fusion::{fuse_ranked_lists, RankFusionEngine};
pub use recorder::{InteractionRecorder, InteractionSink, JsonLinesSink};
pub use router::{EngineRouter, Strategy};

use crate::catalog::Catalog;
use crate::config::Config;
use crate::error::{AppError, Result};
use crate::metrics;
use crate::models::{Action, EngineName, InteractionEvent, ItemId, ItemSummary, Query};
use scorers::{
    NeuralModel, NeuralScorer, RandomScorer, Scorer, TaxonomyScorer, TextRetrievalScorer,
    VectorScorer,
};
use std::sync::Arc;
use tracing::info;

/// A served recommendation, ready for the response body
#[derive(Debug, Clone)]
pub struct Recommendation {
    pub engine: EngineName,
    pub queries: Vec<ItemSummary>,
    pub results: Vec<ItemSummary>,
}

/// User reaction to a served recommendation
#[derive(Debug, Clone)]
pub struct Feedback {
    pub engine: EngineName,
    pub queries: Vec<ItemId>,
    pub item: ItemId,
    pub action: Action,
    pub score: Option<i32>,
}

pub struct RecommendationService {
    catalog: Arc<Catalog>,
    router: Arc<EngineRouter>,
    recorder: InteractionRecorder,
}

impl RecommendationService {
    pub fn new(catalog: Arc<Catalog>, router: Arc<EngineRouter>, recorder: InteractionRecorder) -> Self {
        Self {
            catalog,
            router,
            recorder,
        }
    }

    /// Load every artifact named by the configuration and wire the engines.
    ///
    /// The neural model is only loaded when its engine carries weight.
    pub async fn from_config(config: &Config) -> Result<Self> {
        let catalog = Arc::new(Catalog::load(
            &config.data.games_path,
            &config.data.descriptions_path,
        )?);
        if catalog.is_empty() {
            return Err(AppError::CatalogLoadError(
                "catalog contains no games".to_string(),
            ));
        }
        let timeout = config.serving.adapter_timeout();

        let taxonomy = Arc::new(TaxonomyScorer::new(Arc::clone(&catalog)));
        let text = Arc::new(TextRetrievalScorer::new(Arc::clone(&catalog)));
        let vector = Arc::new(VectorScorer::new(Arc::clone(&catalog)));
        let fusion = RankFusionEngine::new(
            vec![
                (taxonomy.clone() as Arc<dyn Scorer>, config.fusion.genre_weight),
                (text.clone() as Arc<dyn Scorer>, config.fusion.content_weight),
                (vector.clone() as Arc<dyn Scorer>, config.fusion.vector_weight),
            ],
            timeout,
        )?;

        let mut strategies = vec![
            Strategy::Fusion(Arc::new(fusion)),
            Strategy::TaxonomyOnly(taxonomy),
            Strategy::TextOnly(text),
            Strategy::VectorOnly(vector),
            Strategy::Random(Arc::new(RandomScorer::new(Arc::clone(&catalog)))),
        ];
        if config.router.weight_of(EngineName::Neural) > 0.0 {
            let model = NeuralModel::load(&config.data.model_path)?;
            strategies.push(Strategy::LearnedEmbedding(Arc::new(NeuralScorer::new(
                Arc::clone(&catalog),
                Arc::new(model),
            ))));
        }

        let router = EngineRouter::new(config.router.engine_weights.clone(), strategies, timeout)?;
        let sink = JsonLinesSink::open(&config.data.records_path).await?;

        Ok(Self::new(
            catalog,
            Arc::new(router),
            InteractionRecorder::new(Arc::new(sink)),
        ))
    }

    pub fn catalog(&self) -> &Arc<Catalog> {
        &self.catalog
    }

    pub fn router(&self) -> &Arc<EngineRouter> {
        &self.router
    }

    /// Serve one recommendation request
    pub async fn recommend(&self, query: Query, limit: usize) -> Result<Recommendation> {
        if query.is_empty() {
            return Err(AppError::ValidationError(
                "at least one game is required".to_string(),
            ));
        }
        if limit == 0 {
            return Err(AppError::ValidationError(
                "limit must be at least 1".to_string(),
            ));
        }
        self.catalog.ensure_known(&query)?;

        let query = Arc::new(query);
        let (engine, ranked) = self.router.dispatch(Arc::clone(&query), limit).await?;

        metrics::record_engine_served(engine);
        info!(
            engine = %engine,
            queries = query.len(),
            results = ranked.len(),
            "Recommendation served"
        );

        self.recorder
            .record(InteractionEvent::recommend(engine, query.ids().to_vec()))
            .await;

        Ok(Recommendation {
            engine,
            queries: self.catalog.summaries(query.ids())?,
            results: self.catalog.summaries(&ranked)?,
        })
    }

    /// Validate and forward a click or rating to the recorder
    pub async fn record_feedback(&self, feedback: Feedback) -> Result<()> {
        match feedback.action {
            Action::Recommend => {
                return Err(AppError::ValidationError(
                    "action must be click or rate".to_string(),
                ));
            }
            Action::Rate if feedback.score.is_none() => {
                return Err(AppError::ValidationError(
                    "rate requires a score".to_string(),
                ));
            }
            _ => {}
        }

        self.catalog
            .ensure_known(&Query::new(feedback.queries.clone()))?;
        self.catalog.get_item(feedback.item)?;

        metrics::record_feedback(feedback.engine, feedback.action);
        self.recorder
            .record(InteractionEvent::feedback(
                feedback.engine,
                feedback.queries,
                feedback.item,
                feedback.action,
                feedback.score,
            ))
            .await;

        Ok(())
    }
}
