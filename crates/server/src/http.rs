//! HTTP Endpoints
//!
//! REST API for the call bot.

use axum::{
    extract::{Json, Path, Query, State},
    http::{header, HeaderValue, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use std::time::Duration;
use tower_http::cors::{Any, CorsLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use callbot_pipeline::SynthesisHints;

use crate::metrics::{metrics_handler, record_request};
use crate::state::AppState;
use crate::ServerError;

/// Create the application router
pub fn create_router(state: AppState) -> Router {
    let cors_layer = build_cors_layer(
        &state.config.server.cors_origins,
        state.config.server.cors_enabled,
    );
    let timeout = Duration::from_secs(state.config.server.timeout_seconds);

    let bounded = Router::new()
        .route("/health", get(health_check))
        .route("/metrics", get(metrics_handler))
        .route("/api/calls", get(list_calls))
        .route("/api/calls/:unique_id", get(get_call))
        .route("/play_audio/:unique_id", get(play_audio))
        .route("/tts", post(synthesize))
        .layer(TimeoutLayer::new(timeout));

    // call processing is bounded by the per-stage timeouts instead
    Router::new()
        .route("/process_asterisk", post(process_asterisk))
        .merge(bounded)
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer)
        .with_state(state)
}

/// Build CORS layer from configured origins
///
/// - If cors_enabled is false, returns permissive layer (for dev)
/// - If cors_origins is empty, defaults to localhost:3000
fn build_cors_layer(origins: &[String], enabled: bool) -> CorsLayer {
    if !enabled {
        tracing::warn!("CORS is disabled - allowing all origins");
        return CorsLayer::permissive();
    }

    let parsed_origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| {
            origin.parse::<HeaderValue>().ok().or_else(|| {
                tracing::warn!("Invalid CORS origin: {}", origin);
                None
            })
        })
        .collect();

    if parsed_origins.is_empty() {
        tracing::info!("No valid CORS origins configured, defaulting to localhost:3000");
        return CorsLayer::new()
            .allow_origin(HeaderValue::from_static("http://localhost:3000"))
            .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
            .allow_headers(Any);
    }

    tracing::info!("CORS configured with {} origins", parsed_origins.len());
    CorsLayer::new()
        .allow_origin(parsed_origins)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any)
}

/// Health check with dependency status
async fn health_check(State(state): State<AppState>) -> (StatusCode, Json<serde_json::Value>) {
    record_request("health");
    let mut checks = serde_json::Map::new();
    let mut all_healthy = true;

    let monitor_dir = state.monitor_dir();
    let monitor_ok = monitor_dir.is_dir();
    checks.insert(
        "monitor_dir".to_string(),
        serde_json::json!({
            "status": if monitor_ok { "ok" } else { "missing" },
            "path": monitor_dir.display().to_string(),
        }),
    );

    let llm_ok = state.config.llm.api_key.is_some();
    checks.insert(
        "llm_credential".to_string(),
        serde_json::json!({ "status": if llm_ok { "ok" } else { "missing" } }),
    );
    if !llm_ok {
        all_healthy = false;
    }

    match state.store.list_recent(1).await {
        Ok(_) => {
            checks.insert("store".to_string(), serde_json::json!({ "status": "ok" }));
        },
        Err(e) => {
            all_healthy = false;
            checks.insert(
                "store".to_string(),
                serde_json::json!({ "status": "error", "error": e.to_string() }),
            );
        },
    }

    checks.insert(
        "tts".to_string(),
        serde_json::json!({
            "status": if state.orchestrator.synthesizer().is_some() { "enabled" } else { "disabled" },
        }),
    );

    let status = if all_healthy { "healthy" } else { "degraded" };
    let status_code = if all_healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (
        status_code,
        Json(serde_json::json!({
            "status": status,
            "version": env!("CARGO_PKG_VERSION"),
            "checks": checks
        })),
    )
}

/// Accept a bare file name only; anything with a path component is rejected
fn validate_filename(filename: Option<&str>) -> Result<&str, ServerError> {
    let name = filename
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .ok_or_else(|| ServerError::InvalidRequest("filename is required".to_string()))?;

    let mut components = std::path::Path::new(name).components();
    match (components.next(), components.next()) {
        (Some(std::path::Component::Normal(_)), None) if !name.contains(['/', '\\']) => Ok(name),
        _ => Err(ServerError::InvalidRequest(format!("invalid filename: {}", name))),
    }
}

#[derive(Debug, Deserialize)]
struct ProcessRequest {
    filename: Option<String>,
}

/// Process a recording from the PBX monitor directory
async fn process_asterisk(
    State(state): State<AppState>,
    Json(request): Json<ProcessRequest>,
) -> Result<Response, ServerError> {
    record_request("process_asterisk");
    let name = validate_filename(request.filename.as_deref())?;
    let path = state.monitor_dir().join(name);

    if !tokio::fs::try_exists(&path).await.unwrap_or(false) {
        return Err(ServerError::NotFound(format!("recording not found: {}", name)));
    }

    tracing::info!(filename = %name, "Processing recording");
    // runs to completion even if the client disconnects
    let outcome = state.orchestrator.spawn_call(path).await.map_err(|e| {
        tracing::error!(filename = %name, error = %e, "Call task failed");
        ServerError::Internal(format!("call task failed: {}", e))
    })?;
    let response = match outcome {
        Ok(call) => (
            StatusCode::OK,
            Json(serde_json::json!({
                "success": true,
                "unique_id": call.record.unique_id,
                "call": call,
            })),
        )
            .into_response(),
        Err(failure) => (StatusCode::INTERNAL_SERVER_ERROR, Json(failure)).into_response(),
    };
    Ok(response)
}

#[derive(Debug, Deserialize)]
struct ListQuery {
    limit: Option<usize>,
}

/// Most recent calls first
///
/// The ScyllaDB store only lists calls from its lookback window (the last 31
/// UTC days); older records stay reachable through `/api/calls/:unique_id`.
async fn list_calls(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<serde_json::Value>, ServerError> {
    record_request("list_calls");
    let limit = query
        .limit
        .unwrap_or(state.config.server.list_limit)
        .min(state.config.server.list_limit.max(1));
    let calls = state.store.list_recent(limit).await?;
    Ok(Json(serde_json::json!({
        "total": calls.len(),
        "calls": calls,
    })))
}

async fn get_call(
    State(state): State<AppState>,
    Path(unique_id): Path<String>,
) -> Result<Json<serde_json::Value>, ServerError> {
    record_request("get_call");
    let record = state
        .store
        .get(&unique_id)
        .await?
        .ok_or_else(|| ServerError::NotFound(format!("call not found: {}", unique_id)))?;
    Ok(Json(serde_json::json!(record)))
}

/// Stream the synthesized reply of a call
async fn play_audio(
    State(state): State<AppState>,
    Path(unique_id): Path<String>,
) -> Result<Response, ServerError> {
    record_request("play_audio");
    let path = state
        .store
        .audio_path(&unique_id)
        .await?
        .ok_or_else(|| ServerError::NotFound(format!("no reply audio for call: {}", unique_id)))?;

    let bytes = tokio::fs::read(&path).await.map_err(|e| {
        tracing::warn!(path = %path.display(), error = %e, "Reply audio unreadable");
        ServerError::NotFound(format!("reply audio missing for call: {}", unique_id))
    })?;

    Ok(([(header::CONTENT_TYPE, "audio/wav")], bytes).into_response())
}

#[derive(Debug, Deserialize)]
struct TtsRequest {
    #[serde(default)]
    text: String,
    lang: Option<String>,
    voice: Option<String>,
    gender: Option<String>,
    server: Option<String>,
}

/// Synthesize arbitrary text
async fn synthesize(
    State(state): State<AppState>,
    Json(request): Json<TtsRequest>,
) -> Result<Response, ServerError> {
    record_request("tts");
    if request.text.trim().is_empty() {
        return Err(ServerError::InvalidRequest("text is required".to_string()));
    }

    let hints = SynthesisHints {
        voice: request.voice,
        lang: request.lang,
        gender: request.gender,
        server: request.server,
    };
    let result = state.synthesizer.synthesize(&request.text, &hints).await;
    let status = if result.is_success() {
        StatusCode::OK
    } else {
        StatusCode::BAD_GATEWAY
    };
    Ok((status, Json(result)).into_response())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use callbot_config::Settings;
    use callbot_core::{CallRecordStore, ClassificationResult, NewCallRecord, QualityScore};
    use callbot_persistence::InMemoryCallStore;
    use std::sync::Arc;
    use tower::ServiceExt;

    fn test_state(monitor_dir: &std::path::Path) -> (AppState, Arc<InMemoryCallStore>) {
        let mut settings = Settings::default();
        settings.recordings.monitor_dir = monitor_dir.to_path_buf();
        settings.llm.api_key = None;
        settings.tts.api_key = None;
        let store = Arc::new(InMemoryCallStore::new());
        let state = AppState::from_settings(settings, store.clone()).unwrap();
        (state, store)
    }

    async fn send(router: Router, request: Request<Body>) -> (StatusCode, serde_json::Value) {
        let response = router.oneshot(request).await.unwrap();
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json = serde_json::from_slice(&body).unwrap_or(serde_json::Value::Null);
        (status, json)
    }

    fn post_json(uri: &str, body: serde_json::Value) -> Request<Body> {
        Request::post(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[test]
    fn test_validate_filename() {
        assert_eq!(validate_filename(Some("call-123.wav")).unwrap(), "call-123.wav");
        assert_eq!(validate_filename(Some(" call.wav ")).unwrap(), "call.wav");
        assert!(validate_filename(None).is_err());
        assert!(validate_filename(Some("  ")).is_err());
        assert!(validate_filename(Some("../etc/passwd")).is_err());
        assert!(validate_filename(Some("sub/call.wav")).is_err());
        assert!(validate_filename(Some("/abs/call.wav")).is_err());
        assert!(validate_filename(Some("..")).is_err());
        assert!(validate_filename(Some("dir\\call.wav")).is_err());
    }

    #[tokio::test]
    async fn test_process_requires_filename() {
        let dir = tempfile::tempdir().unwrap();
        let (state, _) = test_state(dir.path());
        let (status, body) = send(
            create_router(state),
            post_json("/process_asterisk", serde_json::json!({})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().contains("filename"));
    }

    #[tokio::test]
    async fn test_process_unknown_recording_is_404() {
        let dir = tempfile::tempdir().unwrap();
        let (state, _) = test_state(dir.path());
        let (status, _) = send(
            create_router(state),
            post_json("/process_asterisk", serde_json::json!({"filename": "missing.wav"})),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_process_rejects_traversal() {
        let dir = tempfile::tempdir().unwrap();
        let (state, _) = test_state(dir.path());
        let (status, _) = send(
            create_router(state),
            post_json("/process_asterisk", serde_json::json!({"filename": "../secret.wav"})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_calls_listing_and_lookup() {
        let dir = tempfile::tempdir().unwrap();
        let (state, store) = test_state(dir.path());
        let stored = store
            .insert(NewCallRecord::new(
                ClassificationResult::default(),
                "سلام",
                "سلام، چطور می‌توانم کمک کنم؟",
                0.8,
                None,
                QualityScore::GOOD,
            ))
            .await
            .unwrap();
        let router = create_router(state);

        let (status, body) = send(
            router.clone(),
            Request::get("/api/calls").body(Body::empty()).unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["total"], 1);
        assert_eq!(body["calls"][0]["unique_id"], stored.unique_id.as_str());

        let (status, body) = send(
            router.clone(),
            Request::get(format!("/api/calls/{}", stored.unique_id))
                .body(Body::empty())
                .unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["transcript"], "سلام");

        let (status, _) = send(
            router.clone(),
            Request::get("/api/calls/unknown").body(Body::empty()).unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) = send(
            router,
            Request::get(format!("/play_audio/{}", stored.unique_id))
                .body(Body::empty())
                .unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_tts_without_key_reports_error() {
        let dir = tempfile::tempdir().unwrap();
        let (state, _) = test_state(dir.path());
        let router = create_router(state);

        let (status, _) = send(router.clone(), post_json("/tts", serde_json::json!({"text": ""}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, body) = send(router, post_json("/tts", serde_json::json!({"text": "سلام"}))).await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert!(body["error"].as_str().unwrap().contains("GEMINI_API_KEY"));
        assert_eq!(body["status_code"], 0);
    }
}
