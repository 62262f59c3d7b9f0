use axum::{extract::State, Json};
use serde::Serialize;

use crate::services::CredentialPool;
use crate::startup::AppState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyStatusResponse {
    pub is_set: bool,
}

/// `GET /api/key-status`: whether a server-side Gemini key pool is configured.
pub async fn google_key_status(State(state): State<AppState>) -> Json<KeyStatusResponse> {
    Json(KeyStatusResponse {
        is_set: !CredentialPool::resolve(None, state.secrets.google_api_keys().as_ref())
            .is_empty(),
    })
}

/// `GET /api/modelscope-key-status`
pub async fn modelscope_key_status(State(state): State<AppState>) -> Json<KeyStatusResponse> {
    Json(KeyStatusResponse {
        is_set: state.secrets.modelscope_api_key().is_some(),
    })
}
