//! ModelScope asynchronous image generation.
//!
//! Submitting returns a task id; the image URL only appears once polling sees the
//! task reach `SUCCEED`.

use super::{null_as_empty, ImageTaskProvider, ProviderError};
use crate::models::{Task, TaskStatus};
use crate::services::polling::{poll_task, PollError, PollPolicy, TaskStatusSource};
use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::{Map, Value};
use std::time::Duration;

const BACKEND: &str = "ModelScope";
const ASYNC_MODE_HEADER: &str = "X-ModelScope-Async-Mode";
const TASK_TYPE_HEADER: &str = "X-ModelScope-Task-Type";
const IMAGE_GENERATION_TASK: &str = "image_generation";

/// ModelScope provider configuration.
#[derive(Debug, Clone)]
pub struct ModelScopeConfig {
    pub api_base: String,
    pub request_timeout: Duration,
    pub poll_interval: Duration,
    pub poll_jitter: Duration,
}

/// ModelScope image task provider.
pub struct ModelScopeProvider {
    config: ModelScopeConfig,
    client: Client,
}

impl ModelScopeProvider {
    pub fn new(config: ModelScopeConfig) -> Result<Self, ProviderError> {
        let client = Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| ProviderError::Network(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { config, client })
    }

    fn api_url(&self, path: &str) -> String {
        format!("{}/{}", self.config.api_base.trim_end_matches('/'), path)
    }

    /// Submit a generation job and return its task id.
    pub async fn submit_task(
        &self,
        model: &str,
        api_key: &SecretString,
        parameters: &Map<String, Value>,
    ) -> Result<String, ProviderError> {
        let body = submission_body(model, parameters);

        tracing::info!(model = %model, "Submitting ModelScope task");

        let response = self
            .client
            .post(self.api_url("v1/images/generations"))
            .bearer_auth(api_key.expose_secret())
            .header(ASYNC_MODE_HEADER, "true")
            .json(&body)
            .send()
            .await
            .map_err(|e| ProviderError::Network(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(ProviderError::Upstream {
                backend: format!("{} (generation)", BACKEND),
                status,
                body: error_text,
            });
        }

        let submitted: SubmitResponse = response.json().await.map_err(|e| {
            ProviderError::Protocol(format!("Failed to parse ModelScope submission response: {}", e))
        })?;

        let task_id = submitted
            .task_id
            .filter(|id| !id.is_empty())
            .ok_or_else(|| {
                ProviderError::Protocol("ModelScope API did not return a task_id.".to_string())
            })?;

        tracing::info!(model = %model, task_id = %task_id, "ModelScope task submitted");
        Ok(task_id)
    }

    fn poll_policy(&self, timeout: Duration) -> PollPolicy {
        PollPolicy::for_timeout(timeout, self.config.poll_interval)
            .with_jitter(self.config.poll_jitter)
    }
}

/// `{ model, ...parameters }`: caller parameters win on key clashes.
fn submission_body(model: &str, parameters: &Map<String, Value>) -> Map<String, Value> {
    let mut body = Map::with_capacity(parameters.len() + 1);
    body.insert("model".to_string(), Value::String(model.to_string()));
    body.extend(parameters.iter().map(|(k, v)| (k.clone(), v.clone())));
    body
}

#[async_trait]
impl ImageTaskProvider for ModelScopeProvider {
    async fn generate_image(
        &self,
        model: &str,
        api_key: &SecretString,
        parameters: &Map<String, Value>,
        timeout: Duration,
    ) -> Result<String, ProviderError> {
        let task_id = self.submit_task(model, api_key, parameters).await?;
        let source = TaskStatusClient {
            provider: self,
            api_key,
        };

        poll_task(&source, BACKEND, &task_id, &self.poll_policy(timeout)).await
    }
}

/// Status lookups for one caller's tasks.
struct TaskStatusClient<'a> {
    provider: &'a ModelScopeProvider,
    api_key: &'a SecretString,
}

#[async_trait]
impl<'a> TaskStatusSource for TaskStatusClient<'a> {
    async fn fetch_task(&self, task_id: &str) -> Result<Task, PollError> {
        let response = self
            .provider
            .client
            .get(self.provider.api_url(&format!("v1/tasks/{}", task_id)))
            .bearer_auth(self.api_key.expose_secret())
            .header(TASK_TYPE_HEADER, IMAGE_GENERATION_TASK)
            .send()
            .await
            .map_err(|e| PollError::Transient(e.to_string()))?;

        if !response.status().is_success() {
            return Err(PollError::Transient(format!(
                "status endpoint returned {}",
                response.status()
            )));
        }

        let status: TaskStatusResponse = response.json().await.map_err(|e| {
            ProviderError::Protocol(format!("Failed to parse ModelScope task status: {}", e))
        })?;

        Ok(status.into_task(task_id))
    }
}

// ============================================================================
// ModelScope API Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
struct SubmitResponse {
    #[serde(default)]
    task_id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct TaskStatusResponse {
    #[serde(default)]
    task_status: Option<String>,
    #[serde(default)]
    output: Option<TaskOutput>,
    #[serde(default)]
    output_images: Option<Vec<String>>,
    #[serde(default)]
    message: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct TaskOutput {
    #[serde(default, deserialize_with = "null_as_empty")]
    images: Vec<OutputImage>,
}

#[derive(Debug, Default, Deserialize)]
struct OutputImage {
    #[serde(default)]
    url: Option<String>,
}

impl TaskStatusResponse {
    /// `output.images[0].url` first, then `output_images[0]`.
    fn image_url(&self) -> Option<String> {
        let primary = self
            .output
            .as_ref()
            .and_then(|o| o.images.first())
            .and_then(|img| img.url.as_deref())
            .filter(|url| !url.is_empty());

        let fallback = self
            .output_images
            .as_ref()
            .and_then(|images| images.first())
            .map(String::as_str)
            .filter(|url| !url.is_empty());

        primary.or(fallback).map(str::to_string)
    }

    fn into_task(self, task_id: &str) -> Task {
        let status = TaskStatus::from_upstream(self.task_status.as_deref());
        let result = match status {
            TaskStatus::Succeed => self.image_url(),
            _ => None,
        };
        Task {
            id: task_id.to_string(),
            status,
            result,
            message: self.message.filter(|m| !m.is_empty()),
        }
    }
}
