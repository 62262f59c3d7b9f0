//! Gemini provider implementation.
//!
//! One `generateContent` call per request, no retries. The reply is mined for the
//! first text part; when the model answers with something else the relay falls
//! back to a placeholder or an explicit unsupported result instead of failing.

use super::{null_as_empty, MessagePart, MultimodalOutput, MultimodalProvider, ProviderError};
use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::time::Duration;

const BACKEND: &str = "Google AI";

/// Returned as text when Gemini answers without any usable part.
pub const EMPTY_RESPONSE_PLACEHOLDER: &str = "[The model returned no usable content]";

/// Gemini provider configuration.
#[derive(Debug, Clone)]
pub struct GeminiConfig {
    /// Base URL up to and including the API version, e.g. `.../v1beta`.
    pub api_base: String,
    pub request_timeout: Duration,
}

/// Gemini multimodal provider.
pub struct GeminiProvider {
    config: GeminiConfig,
    client: Client,
}

impl GeminiProvider {
    pub fn new(config: GeminiConfig) -> Result<Self, ProviderError> {
        let client = Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| ProviderError::Network(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { config, client })
    }

    /// Build the API URL for the given model and method.
    fn api_url(&self, model: &str, method: &str, api_key: &SecretString) -> String {
        format!(
            "{}/models/{}:{}?key={}",
            self.config.api_base.trim_end_matches('/'),
            model,
            method,
            api_key.expose_secret()
        )
    }
}

fn build_request(parts: Vec<MessagePart>) -> GenerateContentRequest {
    let parts = parts
        .into_iter()
        .map(|part| match part {
            MessagePart::Text(text) => ContentPart {
                text: Some(text),
                inline_data: None,
            },
            MessagePart::InlineData(attachment) => ContentPart {
                text: None,
                inline_data: Some(InlineData {
                    mime_type: attachment.mime_type,
                    data: attachment.data,
                }),
            },
        })
        .collect();

    GenerateContentRequest {
        contents: vec![Content {
            role: Some("user".to_string()),
            parts,
        }],
    }
}

fn extract_output(response: &GenerateContentResponse) -> MultimodalOutput {
    let parts = response
        .candidates
        .first()
        .and_then(|c| c.content.as_ref())
        .map(|content| content.parts.as_slice())
        .unwrap_or_default();

    if let Some(text) = parts
        .iter()
        .filter_map(|p| p.text.as_deref())
        .find(|t| !t.is_empty())
    {
        return MultimodalOutput::Text(text.to_string());
    }

    if let Some(inline) = parts.iter().find_map(|p| p.inline_data.as_ref()) {
        return MultimodalOutput::Unsupported {
            mime_type: inline.mime_type.clone(),
        };
    }

    MultimodalOutput::Text(EMPTY_RESPONSE_PLACEHOLDER.to_string())
}

#[async_trait]
impl MultimodalProvider for GeminiProvider {
    async fn generate(
        &self,
        model: &str,
        parts: Vec<MessagePart>,
        api_key: &SecretString,
    ) -> Result<MultimodalOutput, ProviderError> {
        let attachment_count = parts
            .iter()
            .filter(|p| matches!(p, MessagePart::InlineData(_)))
            .count();
        let request = build_request(parts);
        let url = self.api_url(model, "generateContent", api_key);

        tracing::debug!(
            model = %model,
            attachment_count,
            "Sending request to Gemini API"
        );

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| ProviderError::Network(e.without_url().to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();

            return Err(ProviderError::Upstream {
                backend: BACKEND.to_string(),
                status,
                body: error_text,
            });
        }

        let api_response: GenerateContentResponse = response.json().await.map_err(|e| {
            ProviderError::Protocol(format!(
                "Failed to parse Google AI response: {}",
                e.without_url()
            ))
        })?;

        if let Some(usage) = &api_response.usage_metadata {
            tracing::debug!(
                model = %model,
                input_tokens = usage.prompt_token_count.unwrap_or(0),
                output_tokens = usage.candidates_token_count.unwrap_or(0),
                "Gemini call completed"
            );
        }

        let output = extract_output(&api_response);
        if let MultimodalOutput::Unsupported { mime_type } = &output {
            tracing::warn!(model = %model, mime_type = %mime_type, "Gemini returned binary output only");
        }

        Ok(output)
    }
}

// ============================================================================
// Gemini API Request/Response Types
// ============================================================================

#[derive(Debug, Serialize)]
struct GenerateContentRequest {
    contents: Vec<Content>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Content {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default, deserialize_with = "null_as_empty")]
    parts: Vec<ContentPart>,
}

/// Text or inline data. Other part kinds (function calls, thoughts) deserialize
/// with both fields empty.
#[derive(Debug, Serialize, Deserialize)]
struct ContentPart {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    #[serde(
        default,
        rename = "inline_data",
        alias = "inlineData",
        skip_serializing_if = "Option::is_none"
    )]
    inline_data: Option<InlineData>,
}

#[derive(Debug, Serialize, Deserialize)]
struct InlineData {
    #[serde(rename = "mime_type", alias = "mimeType")]
    mime_type: String,
    data: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default, deserialize_with = "null_as_empty")]
    candidates: Vec<Candidate>,
    #[serde(default)]
    usage_metadata: Option<UsageMetadata>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<Content>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct UsageMetadata {
    prompt_token_count: Option<i32>,
    candidates_token_count: Option<i32>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::data_url::InlineAttachment;
    use serde_json::json;

    fn response(body: serde_json::Value) -> GenerateContentResponse {
        serde_json::from_value(body).unwrap()
    }

    #[test]
    fn test_text_only_request_shape() {
        let request = build_request(vec![MessagePart::Text("a cat".to_string())]);
        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            json!({ "contents": [{ "role": "user", "parts": [{ "text": "a cat" }] }] })
        );
    }

    #[test]
    fn test_inline_data_request_shape() {
        let request = build_request(vec![
            MessagePart::Text("what is this".to_string()),
            MessagePart::InlineData(InlineAttachment {
                mime_type: "image/png".to_string(),
                data: "AAAA".to_string(),
            }),
        ]);
        assert_eq!(
            serde_json::to_value(&request).unwrap()["contents"][0]["parts"],
            json!([
                { "text": "what is this" },
                { "inline_data": { "mime_type": "image/png", "data": "AAAA" } }
            ])
        );
    }

    #[test]
    fn test_extracts_first_text_part() {
        let output = extract_output(&response(json!({
            "candidates": [{ "content": { "role": "model", "parts": [{ "text": "hello" }] } }],
            "usageMetadata": { "promptTokenCount": 3, "candidatesTokenCount": 1 }
        })));
        assert_eq!(output, MultimodalOutput::Text("hello".to_string()));
    }

    #[test]
    fn test_skips_non_text_parts_before_text() {
        let output = extract_output(&response(json!({
            "candidates": [{ "content": { "parts": [
                { "thought": true },
                { "text": "answer" }
            ] } }]
        })));
        assert_eq!(output, MultimodalOutput::Text("answer".to_string()));
    }

    #[test]
    fn test_binary_only_output_is_unsupported() {
        let output = extract_output(&response(json!({
            "candidates": [{ "content": { "parts": [
                { "inlineData": { "mimeType": "image/png", "data": "iVBORw0KGgo=" } }
            ] } }]
        })));
        assert_eq!(
            output,
            MultimodalOutput::Unsupported {
                mime_type: "image/png".to_string()
            }
        );
    }

    #[test]
    fn test_missing_content_yields_placeholder() {
        for body in [
            json!({}),
            json!({ "candidates": [] }),
            json!({ "candidates": [{ "finishReason": "SAFETY" }] }),
            json!({ "candidates": [{ "content": { "parts": [] } }] }),
            json!({ "candidates": null }),
            json!({ "candidates": [{ "content": null }] }),
            json!({ "candidates": [{ "content": { "parts": null } }] }),
        ] {
            assert_eq!(
                extract_output(&response(body)),
                MultimodalOutput::Text(EMPTY_RESPONSE_PLACEHOLDER.to_string())
            );
        }
    }
}
