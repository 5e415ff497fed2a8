use std::time::Duration;

use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use axum::Router;
use pawtrip_api::{build_router, ApiState, ClientRateLimiter};
use pawtrip_core::Category;
use pawtrip_tests::{place, sokcho_weather, MockWorld};
use serde_json::{json, Value};
use tower::ServiceExt;

const KEY: &str = "test-key";

fn app(world: &MockWorld) -> Router {
    build_router(ApiState::new(world.agent(), KEY))
}

fn post(uri: &str, key: Option<&str>, text: &str) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(key) = key {
        builder = builder.header("x-api-key", key);
    }
    builder
        .body(Body::from(json!({ "text": text }).to_string()))
        .unwrap()
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn health_is_public() {
    let world = MockWorld::default();
    let response = app(&world)
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let payload = body_json(response).await;
    assert_eq!(payload["status"], "ok");
    assert!(payload["metrics"]["queries_total"].is_u64());
}

#[tokio::test]
async fn chat_requires_api_key() {
    let world = MockWorld::default();
    let response = app(&world)
        .oneshot(post("/v1/chat", None, "속초 날씨"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(world.generation_calls(), 0);
}

#[tokio::test]
async fn chat_returns_structured_reply() {
    let world = MockWorld::default()
        .with_categories([Category::Attraction, Category::Weather])
        .with_vector_hits(vec![place("영금정", Category::Attraction)])
        .with_weather(sokcho_weather());

    let response = app(&world)
        .oneshot(post("/v1/chat", Some(KEY), "속초 관광지랑 날씨 알려줘"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().contains_key("x-request-id"));

    let payload = body_json(response).await;
    assert_eq!(payload["outcome"], "composed");
    assert!(payload["reply_text"]
        .as_str()
        .is_some_and(|text| text.contains("### 날씨 정보")));
    assert_eq!(payload["categories"], json!(["attraction", "weather"]));
    assert_eq!(
        payload["sections"],
        json!(["greeting", "weather", "travel_course", "travel_tips"])
    );
}

#[tokio::test]
async fn analyze_reports_categories_and_region() {
    let world = MockWorld::default();
    let response = app(&world)
        .oneshot(post("/v1/analyze", Some(KEY), "서울의 날씨 어때"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let payload = body_json(response).await;
    assert_eq!(payload["categories"], json!(["weather"]));
    assert_eq!(payload["weather_region"], "서울");
}

#[tokio::test]
async fn blank_text_is_rejected() {
    let world = MockWorld::default();
    let response = app(&world)
        .oneshot(post("/v1/chat", Some(KEY), "   "))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let payload = body_json(response).await;
    assert_eq!(payload["error"], "invalid_request");
}

#[tokio::test]
async fn overlong_text_is_rejected() {
    let world = MockWorld::default();
    let text = "가".repeat(501);
    let response = app(&world)
        .oneshot(post("/v1/chat", Some(KEY), &text))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn second_request_over_limit_is_throttled() {
    let world = MockWorld::default();
    let router = build_router(
        ApiState::new(world.agent(), KEY)
            .with_limiter(ClientRateLimiter::new(Duration::from_secs(60), 1)),
    );

    let first = router
        .clone()
        .oneshot(post("/v1/chat", Some(KEY), "안녕하세요"))
        .await
        .unwrap();
    assert_eq!(first.status(), StatusCode::OK);

    let second = router
        .oneshot(post("/v1/chat", Some(KEY), "안녕하세요"))
        .await
        .unwrap();
    assert_eq!(second.status(), StatusCode::TOO_MANY_REQUESTS);
    assert!(second.headers().contains_key(header::RETRY_AFTER));
}
