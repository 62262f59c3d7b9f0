use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use axum::Router;
use genai_relay::services::providers::gemini::{GeminiConfig, GeminiProvider};
use genai_relay::services::providers::modelscope::{ModelScopeConfig, ModelScopeProvider};
use genai_relay::services::{KeySelector, StaticSecretStore};
use genai_relay::startup::{build_router, AppState};
use http_body_util::BodyExt;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;
use wiremock::MockServer;

pub const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Always picks the same slot, so tests can assert which key went upstream.
pub struct FixedSelector(pub usize);

impl KeySelector for FixedSelector {
    fn select_index(&self, _pool_len: usize) -> usize {
        self.0
    }
}

pub struct TestApp {
    pub router: Router,
    pub gemini: MockServer,
    pub modelscope: MockServer,
}

impl TestApp {
    pub async fn spawn(google_api_keys: Option<&str>, modelscope_api_key: Option<&str>) -> Self {
        Self::spawn_with_selector(google_api_keys, modelscope_api_key, FixedSelector(0)).await
    }

    pub async fn spawn_with_selector(
        google_api_keys: Option<&str>,
        modelscope_api_key: Option<&str>,
        selector: impl KeySelector + 'static,
    ) -> Self {
        let gemini = MockServer::start().await;
        let modelscope = MockServer::start().await;

        let gemini_provider = GeminiProvider::new(GeminiConfig {
            api_base: format!("{}/v1beta", gemini.uri()),
            request_timeout: Duration::from_secs(5),
        })
        .expect("Failed to build Gemini provider");

        let modelscope_provider = ModelScopeProvider::new(ModelScopeConfig {
            api_base: modelscope.uri(),
            request_timeout: Duration::from_secs(5),
            poll_interval: POLL_INTERVAL,
            poll_jitter: Duration::ZERO,
        })
        .expect("Failed to build ModelScope provider");

        let state = AppState {
            secrets: Arc::new(StaticSecretStore::new(google_api_keys, modelscope_api_key)),
            key_selector: Arc::new(selector),
            gemini: Arc::new(gemini_provider),
            modelscope: Arc::new(modelscope_provider),
        };

        Self {
            router: build_router(state),
            gemini,
            modelscope,
        }
    }

    pub async fn post_generate(&self, body: impl Into<Body>) -> (StatusCode, Value) {
        let request = Request::builder()
            .method(Method::POST)
            .uri("/generate")
            .header("content-type", "application/json")
            .body(body.into())
            .unwrap();
        self.send(request).await
    }

    pub async fn get(&self, uri: &str) -> (StatusCode, Value) {
        let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
        self.send(request).await
    }

    async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, body)
    }
}
