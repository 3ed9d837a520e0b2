use actix_web::{http::StatusCode, test, web, App};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;

use recommendation_service::{
    handlers::{self, RecommendationHandlerState},
    AppError, Config, InteractionEvent, RecommendationService,
};

const GAMES_CSV: &str = "\
appid,name,release_date,english,developer,publisher,platforms,required_age,categories,genres,steamspy_tags,achievements,positive_ratings,negative_ratings,average_playtime,median_playtime,owners,price
10,Counter Strike,2000-11-01,1,Valve,Valve,windows,0,Multi-player;Online Multi-Player,Action,Action;FPS,1000,10,0,0,10000000-20000000,7.19
20,Strike Force Heroes,2014-01-01,1,Sky Vault,Armor Games,windows,0,Single-player,Action,Action;Shooter,500,50,0,0,20000-50000,3.99
30,Stardew Farm,2016-02-26,1,ConcernedApe,ConcernedApe,windows,0,Single-player,Simulation,Farming Sim;Simulation,800,20,0,0,1000000-2000000,10.99
40,Farm Together,2018-10-11,1,Milkstone,Milkstone,windows,0,Multi-player,Simulation,Farming Sim;Casual,300,30,0,0,200000-500000,19.99
50,Puzzle Quest,2007-10-10,1,Infinite,D3,windows,0,Single-player,Casual;RPG,Puzzle;RPG,100,5,0,0,50000-100000,6.99
";

const DESCRIPTIONS_CSV: &str = "\
steam_appid,detailed_description,about_the_game,short_description
10,\"<p>Tactical team shooter with bombs and hostages.</p>\",Tactical shooter,Team shooter
20,Run and gun shooter with heroes and bombs.,Run and gun,Shooter
30,Relaxing farm life with crops and animals.,Farm life,Farm
40,Cooperative farm with friends and crops.,Co-op farm,Farm
50,Match gems in puzzle battles.,Gem matching,Puzzle
";

const MODEL_JSON: &str = r#"{
    "num_games": 3,
    "embedding_size": 1,
    "steam_app_id_to_index": {"10": 1, "30": 2},
    "embeddings": [[0.0], [1.0], [1.0]],
    "linear_weight": [[0.0], [1.0], [2.0]],
    "linear_bias": [0.0, 0.0, 0.0]
}"#;

struct Fixture {
    dir: TempDir,
    config: Config,
}

impl Fixture {
    fn new(overrides: &[(&str, &str)]) -> Self {
        let dir = TempDir::new().expect("temp dir");
        std::fs::write(dir.path().join("steam.csv"), GAMES_CSV).expect("write games");
        std::fs::write(dir.path().join("descriptions.csv"), DESCRIPTIONS_CSV)
            .expect("write descriptions");
        std::fs::write(dir.path().join("model.json"), MODEL_JSON).expect("write model");

        let path = |name: &str| dir.path().join(name).to_string_lossy().to_string();
        let mut vars: HashMap<String, String> = HashMap::from([
            ("GAMES_CSV_PATH".to_string(), path("steam.csv")),
            ("DESCRIPTIONS_CSV_PATH".to_string(), path("descriptions.csv")),
            ("NEURAL_MODEL_PATH".to_string(), path("model.json")),
            ("RECORDS_PATH".to_string(), path("records.jsonl")),
            ("ENGINE_WEIGHTS".to_string(), "genre=1".to_string()),
        ]);
        for (key, value) in overrides {
            vars.insert(key.to_string(), value.to_string());
        }

        let config = Config::from_lookup(|key| vars.get(key).cloned()).expect("config");
        Self { dir, config }
    }

    fn records(&self) -> Vec<InteractionEvent> {
        read_records(&self.dir.path().join("records.jsonl"))
    }
}

fn read_records(path: &Path) -> Vec<InteractionEvent> {
    std::fs::read_to_string(path)
        .unwrap_or_default()
        .lines()
        .map(|line| serde_json::from_str(line).expect("valid record line"))
        .collect()
}

async fn state(fixture: &Fixture) -> web::Data<RecommendationHandlerState> {
    let service = RecommendationService::from_config(&fixture.config)
        .await
        .expect("service");
    web::Data::new(RecommendationHandlerState {
        service: Arc::new(service),
        serving: fixture.config.serving.clone(),
    })
}

fn result_ids(body: &Value) -> Vec<u64> {
    body["results"]
        .as_array()
        .expect("results array")
        .iter()
        .map(|summary| summary["appID"].as_u64().expect("appID"))
        .collect()
}

#[actix_web::test]
async fn test_recommend_serves_and_records() {
    let fixture = Fixture::new(&[]);
    let app = test::init_service(
        App::new()
            .app_data(state(&fixture).await)
            .configure(handlers::configure),
    )
    .await;

    let req = test::TestRequest::post()
        .uri("/api/recommend")
        .set_json(json!({"games": [10], "limit": 5}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["engine"], "genre");
    assert_eq!(body["queries"][0]["appID"], 10);
    assert_eq!(body["queries"][0]["name"], "Counter Strike");
    assert_eq!(result_ids(&body), vec![20]);

    let records = fixture.records();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].engine.as_str(), "genre");
    assert_eq!(records[0].queries.len(), 1);
}

#[actix_web::test]
async fn test_recommend_limit_is_clamped() {
    let fixture = Fixture::new(&[("ENGINE_WEIGHTS", "random=1")]);
    let app = test::init_service(
        App::new()
            .app_data(state(&fixture).await)
            .configure(handlers::configure),
    )
    .await;

    let req = test::TestRequest::post()
        .uri("/api/recommend")
        .set_json(json!({"games": [30], "limit": 0}))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["engine"], "random");
    assert_eq!(result_ids(&body).len(), 1);

    let req = test::TestRequest::post()
        .uri("/api/recommend")
        .set_json(json!({"games": [30]}))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    // default limit exceeds the catalog: everything comes back
    assert_eq!(result_ids(&body).len(), 5);
}

#[actix_web::test]
async fn test_recommend_rejects_unknown_and_empty_queries() {
    let fixture = Fixture::new(&[]);
    let app = test::init_service(
        App::new()
            .app_data(state(&fixture).await)
            .configure(handlers::configure),
    )
    .await;

    let req = test::TestRequest::post()
        .uri("/api/recommend")
        .set_json(json!({"games": [10, 999]}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["error"], "game 999 not found");
    assert_eq!(body["code"], 404);

    let req = test::TestRequest::post()
        .uri("/api/recommend")
        .set_json(json!({"games": []}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    assert!(fixture.records().is_empty());
}

#[actix_web::test]
async fn test_combined_engine_over_real_scorers() {
    let fixture = Fixture::new(&[("ENGINE_WEIGHTS", "combined=1")]);
    let app = test::init_service(
        App::new()
            .app_data(state(&fixture).await)
            .configure(handlers::configure),
    )
    .await;

    let req = test::TestRequest::post()
        .uri("/api/recommend")
        .set_json(json!({"games": [30], "limit": 2}))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;

    assert_eq!(body["engine"], "combined");
    let ids = result_ids(&body);
    assert_eq!(ids.len(), 2);
    assert!(!ids.contains(&30));
    // same genre, shared farm vocabulary on every signal
    assert_eq!(ids[0], 40);
}

#[actix_web::test]
async fn test_neural_engine_uses_model_bundle() {
    let fixture = Fixture::new(&[("ENGINE_WEIGHTS", "neural=1")]);
    let app = test::init_service(
        App::new()
            .app_data(state(&fixture).await)
            .configure(handlers::configure),
    )
    .await;

    let req = test::TestRequest::post()
        .uri("/api/recommend")
        .set_json(json!({"games": [10], "limit": 3}))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;

    assert_eq!(body["engine"], "neural");
    assert_eq!(result_ids(&body), vec![30]);
}

#[actix_web::test]
async fn test_missing_model_fails_startup_only_when_weighted() {
    let fixture = Fixture::new(&[
        ("ENGINE_WEIGHTS", "combined=0.5,neural=0.5"),
        ("NEURAL_MODEL_PATH", "/nonexistent/model.json"),
    ]);
    let result = RecommendationService::from_config(&fixture.config).await;
    assert!(matches!(result, Err(AppError::ModelLoadError(_))));

    let fixture = Fixture::new(&[
        ("ENGINE_WEIGHTS", "combined=1,neural=0"),
        ("NEURAL_MODEL_PATH", "/nonexistent/model.json"),
    ]);
    assert!(RecommendationService::from_config(&fixture.config).await.is_ok());
}

#[actix_web::test]
async fn test_record_feedback() {
    let fixture = Fixture::new(&[]);
    let app = test::init_service(
        App::new()
            .app_data(state(&fixture).await)
            .configure(handlers::configure),
    )
    .await;

    let req = test::TestRequest::post()
        .uri("/api/record")
        .set_json(json!({"engine": "neural", "queries": [10], "game": 20, "action": "click", "score": 0}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body, json!({}));

    let req = test::TestRequest::post()
        .uri("/api/record")
        .set_json(json!({"engine": "combined", "queries": [10, 20], "game": 30, "action": "rate", "score": 4}))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);

    let req = test::TestRequest::post()
        .uri("/api/record")
        .set_json(json!({"engine": "combined", "queries": [10], "game": 30, "action": "rate"}))
        .to_request();
    assert_eq!(
        test::call_service(&app, req).await.status(),
        StatusCode::BAD_REQUEST
    );

    let req = test::TestRequest::post()
        .uri("/api/record")
        .set_json(json!({"engine": "combined", "queries": [10], "game": 12345, "action": "click", "score": 1}))
        .to_request();
    assert_eq!(
        test::call_service(&app, req).await.status(),
        StatusCode::NOT_FOUND
    );

    let records = fixture.records();
    assert_eq!(records.len(), 2);
    assert_eq!(records[0].action.as_str(), "click");
    assert_eq!(records[1].action.as_str(), "rate");
    assert_eq!(records[1].score, Some(4));
}

#[actix_web::test]
async fn test_search_games() {
    let fixture = Fixture::new(&[]);
    let app = test::init_service(
        App::new()
            .app_data(state(&fixture).await)
            .configure(handlers::configure),
    )
    .await;

    let req = test::TestRequest::get()
        .uri("/api/games?q=STRIKE")
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(result_ids(&body), vec![10, 20]);

    let req = test::TestRequest::get()
        .uri("/api/games?q=crops&limit=1")
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(result_ids(&body), vec![30]);
}

#[actix_web::test]
async fn test_health_and_metrics_endpoints() {
    let fixture = Fixture::new(&[]);
    let app = test::init_service(
        App::new()
            .app_data(state(&fixture).await)
            .configure(handlers::configure),
    )
    .await;

    for uri in ["/health", "/api/v1/health/live"] {
        let resp = test::call_service(&app, test::TestRequest::get().uri(uri).to_request()).await;
        assert_eq!(resp.status(), StatusCode::OK, "{}", uri);
    }

    let req = test::TestRequest::get()
        .uri("/api/v1/health/ready")
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["ready"], true);
    assert_eq!(body["games"], 5);
    assert_eq!(body["engines"][0]["engine"], "genre");

    let req = test::TestRequest::post()
        .uri("/api/recommend")
        .set_json(json!({"games": [50]}))
        .to_request();
    test::call_service(&app, req).await;

    let req = test::TestRequest::get().uri("/metrics").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let text = String::from_utf8(test::read_body(resp).await.to_vec()).expect("utf8 metrics");
    assert!(text.contains("recommendation_service_recommendations_served_total"));
}
