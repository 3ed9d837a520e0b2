use actix_web::{web, HttpResponse, Responder};
use serde::Serialize;

use super::RecommendationHandlerState;

#[derive(Serialize)]
struct ReadinessResponse {
    ready: bool,
    games: usize,
    engines: Vec<EngineWeight>,
}

#[derive(Serialize)]
struct EngineWeight {
    engine: String,
    weight: f64,
}

/// Liveness: the process is serving HTTP
pub async fn liveness() -> impl Responder {
    HttpResponse::Ok().body("OK")
}

/// Readiness: catalog loaded and at least one engine servable
pub async fn readiness(state: web::Data<RecommendationHandlerState>) -> impl Responder {
    let games = state.service.catalog().len();
    let engines: Vec<EngineWeight> = state
        .service
        .router()
        .weights()
        .into_iter()
        .map(|(engine, weight)| EngineWeight {
            engine: engine.to_string(),
            weight,
        })
        .collect();
    let ready = games > 0 && !engines.is_empty();

    let body = ReadinessResponse {
        ready,
        games,
        engines,
    };
    if ready {
        HttpResponse::Ok().json(body)
    } else {
        HttpResponse::ServiceUnavailable().json(body)
    }
}
