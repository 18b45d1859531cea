mod common;

use axum::http::StatusCode;
use axum_test::TestServer;
use serde_json::{json, Value};
use std::path::Path;

use cinematch::{
    api::{create_router, AppState, RecommendResponse},
    Config,
};

use common::{ACTION, ROMANCE};

fn config_for(dir: &Path) -> Config {
    Config::from_iter(vec![
        ("DATA_DIR".to_string(), dir.join("data").display().to_string()),
        (
            "ARTIFACTS_PATH".to_string(),
            dir.join("models").join("generation.bin").display().to_string(),
        ),
        ("MF_FACTORS".to_string(), "4".to_string()),
        ("MF_EPOCHS".to_string(), "50".to_string()),
        ("MF_LEARNING_RATE".to_string(), "0.02".to_string()),
    ])
    .unwrap()
}

fn create_test_server(dir: &Path) -> TestServer {
    let state = AppState::new(common::generation(), config_for(dir));
    let app = create_router(state);
    TestServer::new(app).unwrap()
}

async fn current_generation(server: &TestServer) -> String {
    let health: Value = server.get("/health").await.json();
    health["generation"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn test_health_check() {
    let dir = tempfile::tempdir().unwrap();
    let server = create_test_server(dir.path());

    let response = server.get("/health").await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["movies"], 9);
    assert!(body["generation"].is_string());
    assert!(body["content"]["vocabulary"].as_u64().unwrap() > 0);
    assert_eq!(body["collaborative"]["factors"], 4);
    assert_eq!(body["collaborative"]["rated_movies"], 8);
    assert!(body["collaborative"]["train_rmse"].as_f64().unwrap() < 0.5);
}

#[tokio::test]
async fn test_request_id_is_echoed() {
    let dir = tempfile::tempdir().unwrap();
    let server = create_test_server(dir.path());

    let id = "6f9619ff-8b86-4011-b42d-00c04fc964ff";
    let response = server
        .get("/health")
        .add_header(
            "x-request-id".parse::<axum::http::HeaderName>().unwrap(),
            id.parse::<axum::http::HeaderValue>().unwrap(),
        )
        .await;
    assert_eq!(response.header("x-request-id"), id);

    let response = server.get("/health").await;
    assert!(response.headers().contains_key("x-request-id"));
}

#[tokio::test]
async fn test_movie_search() {
    let dir = tempfile::tempdir().unwrap();
    let server = create_test_server(dir.path());

    let response = server.get("/api/v1/movies").add_query_param("q", "HEAT").await;
    response.assert_status_ok();
    let movies: Vec<Value> = response.json();
    assert_eq!(movies.len(), 1);
    assert_eq!(movies[0]["title"], ACTION[2]);
    assert_eq!(movies[0]["movie_id"], 3);

    let response = server.get("/api/v1/movies").add_query_param("limit", "4").await;
    let movies: Vec<Value> = response.json();
    assert_eq!(movies.len(), 4);
}

#[tokio::test]
async fn test_content_recommendations() {
    let dir = tempfile::tempdir().unwrap();
    let server = create_test_server(dir.path());

    let response = server
        .post("/api/v1/recommendations")
        .json(&json!({
            "algorithm": "content",
            "movies": [ACTION[0], ACTION[1], ACTION[2]],
            "top_n": 5
        }))
        .await;

    response.assert_status_ok();
    let body: RecommendResponse = response.json();
    assert_eq!(body.recommendations.len(), 1);
    assert_eq!(body.recommendations[0].rank, 1);
    assert_eq!(body.recommendations[0].title, ACTION[3]);
    assert!(body.insufficient_candidates);
    assert_eq!(body.generation.to_string(), current_generation(&server).await);
}

#[tokio::test]
async fn test_collaborative_recommendations() {
    let dir = tempfile::tempdir().unwrap();
    let server = create_test_server(dir.path());

    let response = server
        .post("/api/v1/recommendations")
        .json(&json!({
            "algorithm": "collaborative",
            "movies": [ROMANCE[0], ROMANCE[1], ROMANCE[2]],
            "top_n": 3
        }))
        .await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["algorithm"], "collaborative");
    let recs = body["recommendations"].as_array().unwrap();
    assert_eq!(recs.len(), 1);
    assert_eq!(recs[0]["title"], ROMANCE[3]);
    assert_eq!(recs[0]["rank"], 1);
    assert_eq!(body["insufficient_candidates"], true);
}

#[tokio::test]
async fn test_unknown_movie_is_not_found() {
    let dir = tempfile::tempdir().unwrap();
    let server = create_test_server(dir.path());

    let response = server
        .post("/api/v1/recommendations")
        .json(&json!({
            "algorithm": "content",
            "movies": [ACTION[0], "Not A Real Movie (1900)", ACTION[1]],
        }))
        .await;

    response.assert_status(StatusCode::NOT_FOUND);
    let body: Value = response.json();
    assert_eq!(body["kind"], "unknown_movie");
    assert!(body["error"].as_str().unwrap().contains("Not A Real Movie (1900)"));
}

#[tokio::test]
async fn test_invalid_requests_are_bad_request() {
    let dir = tempfile::tempdir().unwrap();
    let server = create_test_server(dir.path());

    let seeds = json!([ACTION[0], ACTION[1], ACTION[2]]);
    let bodies = [
        json!({ "algorithm": "content", "movies": seeds, "top_n": 0 }),
        json!({ "algorithm": "content", "movies": seeds, "top_n": -3 }),
        json!({ "algorithm": "content", "movies": seeds, "top_n": 1000 }),
        json!({ "algorithm": "content", "movies": [ACTION[0], ACTION[1]] }),
        json!({ "algorithm": "content", "movies": [ACTION[0], ACTION[0], ACTION[1]] }),
        json!({ "algorithm": "popularity", "movies": seeds }),
    ];

    for body in bodies {
        let response = server.post("/api/v1/recommendations").json(&body).await;
        response.assert_status(StatusCode::BAD_REQUEST);
        let error: Value = response.json();
        assert_eq!(error["kind"], "invalid_request", "body: {}", body);
    }
}

#[tokio::test]
async fn test_failed_reload_keeps_current_generation() {
    let dir = tempfile::tempdir().unwrap();
    let server = create_test_server(dir.path());
    let before = current_generation(&server).await;

    // Neither artifacts nor a corpus exist under the temp dir
    let response = server.post("/api/v1/admin/reload").await;
    response.assert_status(StatusCode::SERVICE_UNAVAILABLE);
    let body: Value = response.json();
    assert_eq!(body["kind"], "build_failure");

    assert_eq!(current_generation(&server).await, before);
    server
        .post("/api/v1/recommendations")
        .json(&json!({ "algorithm": "content", "movies": [ACTION[0], ACTION[1], ACTION[2]] }))
        .await
        .assert_status_ok();
}

#[tokio::test]
async fn test_reload_from_corpus_swaps_generation() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::create_dir_all(dir.path().join("data")).unwrap();
    common::write_corpus(&dir.path().join("data"));

    let server = create_test_server(dir.path());
    let before = current_generation(&server).await;

    let response = server
        .post("/api/v1/admin/reload")
        .add_query_param("source", "corpus")
        .await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["previous"], before.as_str());
    assert_eq!(body["movies"], 9);

    let after = current_generation(&server).await;
    assert_ne!(after, before);
    assert_eq!(body["generation"], after.as_str());
}
