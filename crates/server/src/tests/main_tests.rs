use super::*;
use axum::{body, body::Body, http::Request};
use tower::ServiceExt;

const TEST_KEY: &str = "tajny-klucz";

fn test_state(pipeline: PipelineKind) -> AppState {
    AppState {
        terrain: TerrainMap::default(),
        access_key: TEST_KEY.to_string(),
        pipeline,
        llm: None,
    }
}

fn test_app() -> Router {
    build_router(Arc::new(test_state(PipelineKind::Local)))
}

fn map_request(path: &str, key: Option<&str>, body: &str) -> Request<Body> {
    let mut builder = Request::post(path).header("content-type", "application/json");
    if let Some(key) = key {
        builder = builder.header("apikey", key);
    }
    builder.body(Body::from(body.to_string())).expect("request")
}

fn instruction_body(instruction: &str) -> String {
    serde_json::json!({ "instruction": instruction }).to_string()
}

async fn read_json<T: serde::de::DeserializeOwned>(response: axum::response::Response) -> T {
    let bytes = body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    serde_json::from_slice(&bytes).expect("json")
}

#[tokio::test]
async fn root_reports_status_message() {
    let app = test_app();
    let response = app
        .oneshot(Request::get("/").body(Body::empty()).expect("request"))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::OK);

    let dto: StatusResponse = read_json(response).await;
    assert!(!dto.message.is_empty());
}

#[tokio::test]
async fn healthz_reports_ok() {
    let app = test_app();
    let response = app
        .oneshot(Request::get("/healthz").body(Body::empty()).expect("request"))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::OK);

    let bytes = body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    assert_eq!(bytes.as_ref(), b"ok");
}

#[tokio::test]
async fn map_rejects_missing_or_wrong_api_key_regardless_of_body() {
    let app = test_app();

    let missing = map_request("/map", None, &instruction_body("w prawo"));
    let response = app.clone().oneshot(missing).await.expect("response");
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    let dto: ApiError = read_json(response).await;
    assert!(matches!(dto.code, ErrorCode::Forbidden));

    let wrong = map_request("/map", Some("zly-klucz"), &instruction_body("w prawo"));
    let response = app.clone().oneshot(wrong).await.expect("response");
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let garbage_body = map_request("/map", Some("zly-klucz"), "to nie jest json");
    let response = app.oneshot(garbage_body).await.expect("response");
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn map_rejects_malformed_body_with_valid_key() {
    let app = test_app();
    let request = map_request("/map", Some(TEST_KEY), "to nie jest json");
    let response = app.oneshot(request).await.expect("response");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let dto: ApiError = read_json(response).await;
    assert!(matches!(dto.code, ErrorCode::Validation));
}

#[tokio::test]
async fn map_rejects_instruction_without_moves() {
    let app = test_app();
    let request = map_request("/map", Some(TEST_KEY), &instruction_body("leć przed siebie"));
    let response = app.oneshot(request).await.expect("response");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let dto: ApiError = read_json(response).await;
    assert!(matches!(dto.code, ErrorCode::Validation));
}

#[tokio::test]
async fn map_resolves_single_step() {
    let app = test_app();
    let request = map_request("/map", Some(TEST_KEY), &instruction_body("w prawo"));
    let response = app.oneshot(request).await.expect("response");
    assert_eq!(response.status(), StatusCode::OK);

    let dto: DescriptionResponse = read_json(response).await;
    assert_eq!(dto.description, "Trawa");
}

#[tokio::test]
async fn map_expands_counted_steps() {
    let app = test_app();
    let request = map_request("/map", Some(TEST_KEY), &instruction_body("3 razy w prawo"));
    let response = app.oneshot(request).await.expect("response");
    assert_eq!(response.status(), StatusCode::OK);

    let dto: DescriptionResponse = read_json(response).await;
    assert_eq!(dto.description, "Dom");
}

#[tokio::test]
async fn map_truncates_long_labels_to_two_words() {
    let app = test_app();
    let request = map_request(
        "/map",
        Some(TEST_KEY),
        &instruction_body("w dół w dół w prawo"),
    );
    let response = app.oneshot(request).await.expect("response");
    assert_eq!(response.status(), StatusCode::OK);

    let dto: DescriptionResponse = read_json(response).await;
    assert_eq!(dto.description, "Wóz pełen");
}

#[tokio::test]
async fn map_clamps_moves_at_the_edge() {
    let app = test_app();
    let request = map_request("/map", Some(TEST_KEY), &instruction_body("5 razy w górę"));
    let response = app.oneshot(request).await.expect("response");
    assert_eq!(response.status(), StatusCode::OK);

    let dto: DescriptionResponse = read_json(response).await;
    assert_eq!(dto.description, "Start");
}

#[tokio::test]
async fn map_trailing_slash_alias_works() {
    let app = test_app();
    let request = map_request("/map/", Some(TEST_KEY), &instruction_body("w prawo"));
    let response = app.oneshot(request).await.expect("response");
    assert_eq!(response.status(), StatusCode::OK);

    let dto: DescriptionResponse = read_json(response).await;
    assert_eq!(dto.description, "Trawa");
}

#[tokio::test]
async fn remote_pipeline_without_client_reports_internal_error() {
    let app = build_router(Arc::new(test_state(PipelineKind::Remote)));
    let request = map_request("/map", Some(TEST_KEY), &instruction_body("w prawo"));
    let response = app.oneshot(request).await.expect("response");
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

    let dto: ApiError = read_json(response).await;
    assert!(matches!(dto.code, ErrorCode::Internal));
}
