pub mod credentials;
pub mod data_url;
pub mod polling;
pub mod providers;
pub mod secrets;

pub use credentials::{CredentialPool, KeySelector, RandomKeySelector};
pub use polling::{poll_task, PollError, PollPolicy, TaskStatusSource};
pub use secrets::{EnvSecretStore, SecretStore, StaticSecretStore};
