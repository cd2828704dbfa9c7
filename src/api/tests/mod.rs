use super::*;
use crate::{MangaDexClient, Pipeline};
use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::response::Response;
use serde_json::json;
use std::time::Duration;
use tower::ServiceExt;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};


/// Config whose upstream points at `upstream`
fn config_for(upstream: &MockServer) -> Config {
    let mut config = Config::default();
    config.upstream.base_url = upstream.uri();
    config.upstream.timeout = Duration::from_secs(5);
    config
}

/// Router wired to the real HTTP catalog client
fn app_for(config: Config) -> Router {
    let config = Arc::new(config);
    let catalog = Arc::new(MangaDexClient::new(&config.upstream).unwrap());
    let pipeline = Arc::new(Pipeline::new(catalog, &config));
    create_router(pipeline, config)
}

async fn get(app: &Router, uri: &str) -> Response {
    app.clone()
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap()
}

async fn body_json(response: Response) -> serde_json::Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}

/// Serve `files` of `chapter_id` through the at-home endpoint and the image host
///
/// Each page body is `<chapter_id>:<file>`.
async fn mount_chapter(upstream: &MockServer, chapter_id: &str, files: &[&str]) {
    let hash = format!("h-{chapter_id}");
    Mock::given(method("GET"))
        .and(path(format!("/at-home/server/{chapter_id}")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "result": "ok",
            "baseUrl": upstream.uri(),
            "chapter": { "hash": hash, "data": files, "dataSaver": [] }
        })))
        .mount(upstream)
        .await;

    for file in files {
        Mock::given(method("GET"))
            .and(path(format!("/data/{hash}/{file}")))
            .respond_with(
                ResponseTemplate::new(200).set_body_bytes(format!("{chapter_id}:{file}").into_bytes()),
            )
            .mount(upstream)
            .await;
    }
}

fn chapter_json(id: &str, chapter: Option<&str>, lang: &str) -> serde_json::Value {
    json!({
        "id": id,
        "type": "chapter",
        "attributes": { "chapter": chapter, "translatedLanguage": lang, "title": null }
    })
}

#[tokio::test]
async fn test_api_server_spawns_and_shuts_down() {
    let upstream = MockServer::start().await;
    let mut config = config_for(&upstream);
    config.server.api.bind_address = "127.0.0.1:0".parse().unwrap(); // Port 0 = OS assigns a free port
    let config = Arc::new(config);

    let catalog = Arc::new(MangaDexClient::new(&config.upstream).unwrap());
    let pipeline = Arc::new(Pipeline::new(catalog, &config));
    let (stop_tx, stop_rx) = tokio::sync::oneshot::channel::<()>();

    let api_handle = tokio::spawn(start_api_server_with_shutdown(pipeline, config, async {
        let _ = stop_rx.await;
    }));

    tokio::time::sleep(Duration::from_millis(100)).await;
    stop_tx.send(()).unwrap();

    let outcome = tokio::time::timeout(Duration::from_secs(5), api_handle)
        .await
        .expect("server did not stop after shutdown signal")
        .unwrap();
    assert!(outcome.is_ok());
}

#[tokio::test]
async fn test_cors_enabled() {
    let upstream = MockServer::start().await;
    let mut config = config_for(&upstream);
    config.server.api.cors_enabled = true;
    config.server.api.cors_origins = vec!["*".to_string()];
    let app = app_for(config);

    let request = Request::builder()
        .uri("/api/health")
        .header("Origin", "http://localhost:3000")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(
        response
            .headers()
            .contains_key("access-control-allow-origin"),
        "CORS header should be present when CORS is enabled"
    );
}

#[tokio::test]
async fn test_cors_disabled() {
    let upstream = MockServer::start().await;
    let mut config = config_for(&upstream);
    config.server.api.cors_enabled = false;
    let app = app_for(config);

    let request = Request::builder()
        .uri("/api/health")
        .header("Origin", "http://localhost:3000")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert!(
        !response
            .headers()
            .contains_key("access-control-allow-origin")
    );
}

#[tokio::test]
async fn test_cors_specific_origin() {
    let upstream = MockServer::start().await;
    let mut config = config_for(&upstream);
    config.server.api.cors_origins = vec!["http://reader.local".to_string()];
    let app = app_for(config);

    let request = Request::builder()
        .uri("/api/health")
        .header("Origin", "http://reader.local")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(
        response.headers()["access-control-allow-origin"],
        "http://reader.local"
    );
}

#[tokio::test]
async fn test_cors_exposes_archive_file_name() {
    let upstream = MockServer::start().await;
    let app = app_for(config_for(&upstream));

    let request = Request::builder()
        .uri("/api/health")
        .header("Origin", "http://reader.local")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    let exposed = response.headers()["access-control-expose-headers"]
        .to_str()
        .unwrap()
        .to_ascii_lowercase();
    assert!(exposed.contains("content-disposition"));
}

#[tokio::test]
async fn test_cors_preflight_allows_only_get() {
    let upstream = MockServer::start().await;
    let app = app_for(config_for(&upstream));

    let request = Request::builder()
        .method("OPTIONS")
        .uri("/api/manga/search")
        .header("Origin", "http://reader.local")
        .header("Access-Control-Request-Method", "GET")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.headers()["access-control-allow-methods"], "GET");
}

#[tokio::test]
async fn test_unknown_route_is_404() {
    let upstream = MockServer::start().await;
    let app = app_for(config_for(&upstream));

    let response = get(&app, "/api/v1/downloads").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
