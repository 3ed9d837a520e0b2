/// Recommendation API Handlers
///
/// HTTP endpoints for serving recommendations, recording feedback and
/// searching the catalog
use actix_web::{get, post, web, HttpResponse};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, error};

use crate::config::ServingConfig;
use crate::error::Result;
use crate::models::{Action, EngineName, Item, ItemId, ItemSummary, Query};
use crate::services::{Feedback, RecommendationService};

/// Request body for POST /api/recommend
#[derive(Debug, Deserialize)]
pub struct RecommendRequest {
    /// App ids the user picked
    pub games: Vec<u64>,

    /// Number of results (default 30, clamped to 1..=100)
    #[serde(default)]
    pub limit: Option<i64>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RecommendResponse {
    pub engine: EngineName,
    pub queries: Vec<ItemSummary>,
    pub results: Vec<ItemSummary>,
}

/// Request body for POST /api/record
#[derive(Debug, Deserialize)]
pub struct RecordRequest {
    pub engine: EngineName,
    pub queries: Vec<u64>,
    pub game: u64,
    pub action: Action,
    #[serde(default)]
    pub score: Option<i32>,
}

/// Query parameters for GET /api/games
#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    pub q: String,
    pub limit: Option<usize>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SearchResponse {
    pub results: Vec<ItemSummary>,
}

/// Handler state for recommendation endpoints
pub struct RecommendationHandlerState {
    pub service: Arc<RecommendationService>,
    pub serving: ServingConfig,
}

/// POST /api/recommend
#[post("/api/recommend")]
pub async fn recommend_games(
    body: web::Json<RecommendRequest>,
    state: web::Data<RecommendationHandlerState>,
) -> Result<HttpResponse> {
    let request = body.into_inner();
    let limit = state.serving.clamp_limit(request.limit);
    debug!(games = ?request.games, limit, "Recommendation requested");

    match state
        .service
        .recommend(Query::from(request.games), limit)
        .await
    {
        Ok(served) => Ok(HttpResponse::Ok().json(RecommendResponse {
            engine: served.engine,
            queries: served.queries,
            results: served.results,
        })),
        Err(err) => {
            if err.is_adapter_failure() {
                error!(error = %err, "Recommendation engine failed");
            }
            Err(err)
        }
    }
}

/// POST /api/record
#[post("/api/record")]
pub async fn record_action(
    body: web::Json<RecordRequest>,
    state: web::Data<RecommendationHandlerState>,
) -> Result<HttpResponse> {
    let request = body.into_inner();
    debug!(
        engine = %request.engine,
        action = request.action.as_str(),
        game = request.game,
        "Feedback received"
    );

    state
        .service
        .record_feedback(Feedback {
            engine: request.engine,
            queries: request.queries.into_iter().map(ItemId).collect(),
            item: ItemId(request.game),
            action: request.action,
            score: request.score,
        })
        .await?;

    Ok(HttpResponse::Ok().json(serde_json::json!({})))
}

/// GET /api/games?q=&limit=
#[get("/api/games")]
pub async fn search_games(
    query: web::Query<SearchQuery>,
    state: web::Data<RecommendationHandlerState>,
) -> Result<HttpResponse> {
    let limit = query
        .limit
        .unwrap_or(state.serving.search_limit)
        .clamp(1, state.serving.max_limit);

    let results: Vec<ItemSummary> = state
        .service
        .catalog()
        .search(&query.q, limit)
        .into_iter()
        .map(Item::summary)
        .collect();

    debug!(q = %query.q, found = results.len(), "Catalog search");
    Ok(HttpResponse::Ok().json(SearchResponse { results }))
}
