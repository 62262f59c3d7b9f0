pub mod generate;
pub mod health;
pub mod key_status;

pub use generate::generate;
pub use health::health_check;
pub use key_status::{google_key_status, modelscope_key_status};
