//! Upstream generative AI backends.
//!
//! Each backend sits behind a trait so the dispatcher can be exercised against
//! fakes, and so a new backend only has to implement one of these seams.

pub mod gemini;
pub mod modelscope;

use crate::services::data_url::{parse_data_url, InlineAttachment};
use async_trait::async_trait;
use reqwest::StatusCode;
use secrecy::SecretString;
use serde::{Deserialize, Deserializer};
use serde_json::{Map, Value};
use service_core::error::AppError;
use std::time::Duration;
use thiserror::Error;

/// Error type for provider operations.
#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("{backend} API error: {status} - {body}")]
    Upstream {
        backend: String,
        status: StatusCode,
        body: String,
    },

    /// The backend answered, but without a field its contract promises.
    #[error("{0}")]
    Protocol(String),

    #[error("{backend} task failed: {message}")]
    TaskFailed { backend: String, message: String },

    #[error("{backend} task timed out after {seconds} seconds.")]
    Timeout { backend: String, seconds: f64 },

    #[error("Network error: {0}")]
    Network(String),
}

impl From<ProviderError> for AppError {
    fn from(err: ProviderError) -> Self {
        match err {
            ProviderError::InvalidRequest(_) => AppError::BadRequest(anyhow::Error::new(err)),
            _ => AppError::InternalError(anyhow::Error::new(err)),
        }
    }
}

/// Reads a list field that upstreams sometimes send as `null`.
pub(crate) fn null_as_empty<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}

/// One entry of a Gemini `parts` array.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessagePart {
    Text(String),
    InlineData(InlineAttachment),
}

/// Prompt first, then one inline part per attachment, in order.
pub fn build_message_parts(
    prompt: &str,
    images: &[String],
) -> Result<Vec<MessagePart>, ProviderError> {
    let mut parts = Vec::with_capacity(images.len() + 1);
    parts.push(MessagePart::Text(prompt.to_string()));

    for (index, image) in images.iter().enumerate() {
        let attachment = parse_data_url(image).map_err(|e| {
            ProviderError::InvalidRequest(format!("image {} is not a valid data URL: {}", index, e))
        })?;
        parts.push(MessagePart::InlineData(attachment));
    }

    Ok(parts)
}

/// What a multimodal call produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MultimodalOutput {
    Text(String),
    /// Only binary parts came back; forwarding them is not supported yet.
    Unsupported { mime_type: String },
}

/// Synchronous text/image models (Gemini).
#[async_trait]
pub trait MultimodalProvider: Send + Sync {
    async fn generate(
        &self,
        model: &str,
        parts: Vec<MessagePart>,
        api_key: &SecretString,
    ) -> Result<MultimodalOutput, ProviderError>;
}

/// Task-based image generation (ModelScope). Returns the image URL.
#[async_trait]
pub trait ImageTaskProvider: Send + Sync {
    async fn generate_image(
        &self,
        model: &str,
        api_key: &SecretString,
        parameters: &Map<String, Value>,
        timeout: Duration,
    ) -> Result<String, ProviderError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompt_without_images_is_single_text_part() {
        let parts = build_message_parts("a cat", &[]).unwrap();
        assert_eq!(parts, vec![MessagePart::Text("a cat".to_string())]);
    }

    #[test]
    fn test_image_becomes_inline_part() {
        let parts =
            build_message_parts("describe", &["data:image/png;base64,AAAA".to_string()]).unwrap();
        assert_eq!(parts.len(), 2);
        assert_eq!(
            parts[1],
            MessagePart::InlineData(InlineAttachment {
                mime_type: "image/png".to_string(),
                data: "AAAA".to_string(),
            })
        );
    }

    #[test]
    fn test_malformed_image_is_invalid_request() {
        let err = build_message_parts(
            "describe",
            &[
                "data:image/png;base64,AAAA".to_string(),
                "not-a-data-url".to_string(),
            ],
        )
        .unwrap_err();
        assert!(matches!(err, ProviderError::InvalidRequest(ref msg) if msg.contains("image 1")));
    }

    #[test]
    fn test_app_error_mapping() {
        let err: AppError = ProviderError::InvalidRequest("x".to_string()).into();
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);

        let err: AppError = ProviderError::Timeout {
            backend: "ModelScope".to_string(),
            seconds: 12.0,
        }
        .into();
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.to_string(), "ModelScope task timed out after 12 seconds.");

        let err: AppError = ProviderError::Upstream {
            backend: "Google AI".to_string(),
            status: StatusCode::FORBIDDEN,
            body: "denied".to_string(),
        }
        .into();
        assert_eq!(err.to_string(), "Google AI API error: 403 Forbidden - denied");
    }
}
