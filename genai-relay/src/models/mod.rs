pub mod generation;
pub mod task;

pub use generation::{
    default_timeout_for, Backend, GenerationRequest, GenerationResult, UnsupportedOutput,
    GEMINI_MODEL_PREFIX,
};
pub use task::{Task, TaskStatus};
