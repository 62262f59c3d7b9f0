use axum::{body::Bytes, extract::State, Json};
use service_core::error::AppError;

use crate::models::{Backend, GenerationRequest, GenerationResult};
use crate::services::providers::{build_message_parts, MultimodalOutput};
use crate::services::CredentialPool;
use crate::startup::AppState;

/// `POST /generate`: route to Gemini or ModelScope by model name.
///
/// The body is parsed by hand so that any malformed payload surfaces as the
/// uniform `{ "error" }` body instead of axum's extractor rejection.
#[tracing::instrument(skip(state, body), fields(model = tracing::field::Empty))]
pub async fn generate(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<GenerationResult>, AppError> {
    let request: GenerationRequest = serde_json::from_slice(&body)
        .map_err(|e| AppError::InternalError(anyhow::anyhow!("Invalid request body: {}", e)))?;
    tracing::Span::current().record("model", request.model.as_str());

    let result = match request.backend() {
        Backend::Gemini => generate_with_gemini(&state, &request).await?,
        Backend::ModelScope => generate_with_modelscope(&state, &request).await?,
    };

    Ok(Json(result))
}

async fn generate_with_gemini(
    state: &AppState,
    request: &GenerationRequest,
) -> Result<GenerationResult, AppError> {
    let server_keys = state.secrets.google_api_keys();
    let pool = CredentialPool::resolve(request.client_api_key(), server_keys.as_ref());
    if pool.is_empty() {
        return Err(AppError::ConfigError(anyhow::anyhow!(
            "Google AI API key is not set."
        )));
    }

    let prompt = request
        .prompt_text()
        .ok_or_else(|| AppError::BadRequest(anyhow::anyhow!("Prompt is required.")))?;

    let api_key = pool
        .select(state.key_selector.as_ref())
        .ok_or_else(|| AppError::ConfigError(anyhow::anyhow!("Google AI API key is not set.")))?;

    let parts = build_message_parts(prompt, request.images())?;

    tracing::info!(
        pool_size = pool.len(),
        attachments = request.images().len(),
        "Dispatching to Gemini"
    );

    let output = state.gemini.generate(&request.model, parts, api_key).await?;

    Ok(match output {
        MultimodalOutput::Text(text) => GenerationResult::text(text),
        MultimodalOutput::Unsupported { mime_type } => GenerationResult::unsupported(
            &request.model,
            format!("model returned {} output, which the relay cannot forward yet", mime_type),
        ),
    })
}

async fn generate_with_modelscope(
    state: &AppState,
    request: &GenerationRequest,
) -> Result<GenerationResult, AppError> {
    let api_key = request
        .client_api_key()
        .cloned()
        .or_else(|| state.secrets.modelscope_api_key())
        .ok_or_else(|| {
            AppError::Unauthorized(anyhow::anyhow!("ModelScope API key is not set."))
        })?;

    let parameters = request.image_parameters().ok_or_else(|| {
        AppError::BadRequest(anyhow::anyhow!(
            "Positive prompt is required for ModelScope models."
        ))
    })?;

    let timeout = request.effective_timeout();
    tracing::info!(
        timeout_secs = timeout.as_secs_f64(),
        "Dispatching to ModelScope"
    );

    let image_url = state
        .modelscope
        .generate_image(&request.model, &api_key, parameters, timeout)
        .await?;

    Ok(GenerationResult::image(image_url))
}
