use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::error::ApiError;
use crate::state::{AppState, Features};

#[derive(Debug, Deserialize)]
pub struct AskRequest {
    #[serde(default)]
    prompt: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct AskResponse {
    text: String,
}

#[derive(Debug, Deserialize)]
pub struct SpeechRequest {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SpeechResponse {
    audio_content: String,
    voice_used: String,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    status: &'static str,
    features: Features,
}

/// Create the API router with permissive CORS for browser-based callers.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/ask", post(ask))
        .route("/api/speech", post(speech))
        .route("/api/health", get(health))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}

async fn ask(
    State(state): State<AppState>,
    payload: Result<Json<AskRequest>, JsonRejection>,
) -> Result<Json<AskResponse>, ApiError> {
    let Json(request) = payload
        .map_err(|rejection| ApiError::bad_request(format!("invalid request body: {rejection}")))?;

    let prompt = request.prompt.unwrap_or_default();
    if prompt.trim().is_empty() {
        return Err(ApiError::bad_request("Prompt required"));
    }

    let pipeline = state
        .pipeline
        .as_ref()
        .map_err(|message| ApiError::internal(message.clone()))?;

    let text = pipeline.answer(&prompt).await?;
    Ok(Json(AskResponse { text }))
}

async fn speech(
    State(state): State<AppState>,
    payload: Result<Json<SpeechRequest>, JsonRejection>,
) -> Result<Json<SpeechResponse>, ApiError> {
    let Json(request) = payload
        .map_err(|rejection| ApiError::bad_request(format!("invalid request body: {rejection}")))?;

    let text = request.text.unwrap_or_default();
    if text.trim().is_empty() {
        return Err(ApiError::bad_request("Text required"));
    }

    let client = state
        .speech
        .as_ref()
        .ok_or_else(|| ApiError::internal("GOOGLE_TTS_API_KEY is not set"))?;

    let audio = client.synthesize(&text).await?;
    Ok(Json(SpeechResponse {
        audio_content: audio.audio_content,
        voice_used: audio.voice_used,
    }))
}

async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        features: state.features,
    })
}
