pub mod health;
pub mod recommendation;

use actix_web::web;

// Re-export handlers for convenience
pub use health::{liveness, readiness};
pub use recommendation::{
    record_action, recommend_games, search_games, RecommendRequest, RecommendResponse,
    RecommendationHandlerState, RecordRequest, SearchQuery, SearchResponse,
};

/// Register every route; shared by the server and HTTP tests
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/health", web::get().to(liveness))
        .route("/api/v1/health/live", web::get().to(liveness))
        .route("/api/v1/health/ready", web::get().to(readiness))
        .route("/metrics", web::get().to(crate::metrics::serve_metrics))
        .service(recommend_games)
        .service(record_action)
        .service(search_games);
}
