use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::time::Duration;

/// Models whose name starts with this prefix are served by Gemini.
pub const GEMINI_MODEL_PREFIX: &str = "gemini-";

/// Qwen image models finish faster and get a shorter polling budget.
const QWEN_MODEL_MARKER: &str = "Qwen";
const QWEN_DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);
const DEFAULT_IMAGE_TIMEOUT: Duration = Duration::from_secs(180);

/// Body of `POST /generate`.
#[derive(Debug, Clone, Deserialize)]
pub struct GenerationRequest {
    pub model: String,
    /// Caller-supplied credential. Overrides the server-side keys when non-empty.
    #[serde(default)]
    pub apikey: Option<SecretString>,
    #[serde(default)]
    pub prompt: Option<String>,
    /// Attachments as `data:<mime>;base64,<payload>` URLs (Gemini only).
    #[serde(default)]
    pub images: Option<Vec<String>>,
    /// Passed through to ModelScope; must be an object with a `prompt`.
    #[serde(default)]
    pub parameters: Option<Value>,
    /// Polling budget in seconds (ModelScope only). Numeric strings are accepted.
    #[serde(default)]
    pub timeout: Option<Value>,
}

/// Which upstream handles a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    Gemini,
    ModelScope,
}

impl GenerationRequest {
    pub fn backend(&self) -> Backend {
        if self.model.starts_with(GEMINI_MODEL_PREFIX) {
            Backend::Gemini
        } else {
            Backend::ModelScope
        }
    }

    pub fn client_api_key(&self) -> Option<&SecretString> {
        self.apikey
            .as_ref()
            .filter(|key| !key.expose_secret().trim().is_empty())
    }

    pub fn prompt_text(&self) -> Option<&str> {
        self.prompt.as_deref().filter(|p| !p.is_empty())
    }

    pub fn images(&self) -> &[String] {
        self.images.as_deref().unwrap_or_default()
    }

    /// Parameters for an image task, if they carry a usable positive prompt.
    pub fn image_parameters(&self) -> Option<&Map<String, Value>> {
        self.parameters
            .as_ref()
            .and_then(Value::as_object)
            .filter(|params| params.get("prompt").is_some_and(is_present))
    }

    /// Caller timeout when it is a positive number of seconds, otherwise the model default.
    pub fn effective_timeout(&self) -> Duration {
        self.timeout
            .as_ref()
            .and_then(timeout_seconds)
            .filter(|secs| secs.is_finite() && *secs > 0.0)
            .and_then(|secs| Duration::try_from_secs_f64(secs).ok())
            .unwrap_or_else(|| default_timeout_for(&self.model))
    }
}

pub fn default_timeout_for(model: &str) -> Duration {
    if model.contains(QWEN_MODEL_MARKER) {
        QWEN_DEFAULT_TIMEOUT
    } else {
        DEFAULT_IMAGE_TIMEOUT
    }
}

fn timeout_seconds(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn is_present(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::String(s) => !s.is_empty(),
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// Success body of `POST /generate`. The variant is picked by the backend that ran.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum GenerationResult {
    Text {
        #[serde(rename = "textResult")]
        text_result: String,
    },
    Image {
        #[serde(rename = "imageUrl")]
        image_url: String,
    },
    /// The model answered with something the relay cannot forward yet.
    Unsupported { unsupported: UnsupportedOutput },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UnsupportedOutput {
    pub model: String,
    pub reason: String,
}

impl GenerationResult {
    pub fn text(text: impl Into<String>) -> Self {
        GenerationResult::Text {
            text_result: text.into(),
        }
    }

    pub fn image(url: impl Into<String>) -> Self {
        GenerationResult::Image {
            image_url: url.into(),
        }
    }

    pub fn unsupported(model: impl Into<String>, reason: impl Into<String>) -> Self {
        GenerationResult::Unsupported {
            unsupported: UnsupportedOutput {
                model: model.into(),
                reason: reason.into(),
            },
        }
    }
}
