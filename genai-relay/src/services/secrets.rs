//! Server-side default credentials.
//!
//! Values are looked up on every call so that rotated keys take effect without a
//! restart; nothing here caches.

use secrecy::{ExposeSecret, SecretString};
use std::env;

/// Comma-separated pool of Gemini keys.
pub const GOOGLE_API_KEYS_ENV: &str = "GOOGLE_API_KEYS";
/// Single ModelScope key.
pub const MODELSCOPE_API_KEY_ENV: &str = "MODELSCOPE_API_KEY";

/// Read-only source of the relay's own API keys.
pub trait SecretStore: Send + Sync {
    /// Raw, still comma-separated Gemini key pool.
    fn google_api_keys(&self) -> Option<SecretString>;

    fn modelscope_api_key(&self) -> Option<SecretString>;
}

/// Reads keys from the process environment.
#[derive(Debug, Clone, Copy, Default)]
pub struct EnvSecretStore;

impl SecretStore for EnvSecretStore {
    fn google_api_keys(&self) -> Option<SecretString> {
        read_env(GOOGLE_API_KEYS_ENV)
    }

    fn modelscope_api_key(&self) -> Option<SecretString> {
        read_env(MODELSCOPE_API_KEY_ENV)
    }
}

fn read_env(key: &str) -> Option<SecretString> {
    env::var(key)
        .ok()
        .filter(|v| !v.is_empty())
        .map(SecretString::new)
}

/// Fixed keys, for embedding and tests.
#[derive(Debug, Clone, Default)]
pub struct StaticSecretStore {
    google_api_keys: Option<SecretString>,
    modelscope_api_key: Option<SecretString>,
}

impl StaticSecretStore {
    pub fn new(google_api_keys: Option<&str>, modelscope_api_key: Option<&str>) -> Self {
        Self {
            google_api_keys: google_api_keys.map(|k| SecretString::new(k.to_string())),
            modelscope_api_key: modelscope_api_key.map(|k| SecretString::new(k.to_string())),
        }
    }
}

impl SecretStore for StaticSecretStore {
    fn google_api_keys(&self) -> Option<SecretString> {
        self.google_api_keys
            .clone()
            .filter(|k| !k.expose_secret().is_empty())
    }

    fn modelscope_api_key(&self) -> Option<SecretString> {
        self.modelscope_api_key
            .clone()
            .filter(|k| !k.expose_secret().is_empty())
    }
}
