pub mod cors;
pub mod panic;
pub mod tracing;

pub use cors::permissive_cors_middleware;
pub use panic::panic_response;
pub use self::tracing::{REQUEST_ID_HEADER, http_request_span, request_id_middleware};
