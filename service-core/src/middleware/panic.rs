use crate::error::AppError;
use axum::response::{IntoResponse, Response};
use std::any::Any;

/// Render a handler panic as the usual `{ "error" }` 500 body.
///
/// Meant for `tower_http::catch_panic::CatchPanicLayer::custom`.
pub fn panic_response(err: Box<dyn Any + Send + 'static>) -> Response {
    let message = if let Some(s) = err.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = err.downcast_ref::<&str>() {
        (*s).to_string()
    } else {
        "Unexpected error".to_string()
    };

    AppError::InternalError(anyhow::anyhow!(message)).into_response()
}
