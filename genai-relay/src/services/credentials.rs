//! Gemini credential pool and key selection.

use rand::Rng;
use secrecy::{ExposeSecret, SecretString};

/// Picks which key of a non-empty pool serves a request.
pub trait KeySelector: Send + Sync {
    /// Must return an index in `0..pool_len`. Never called with an empty pool.
    fn select_index(&self, pool_len: usize) -> usize;
}

/// Uniform random choice, with no memory of earlier picks.
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomKeySelector;

impl KeySelector for RandomKeySelector {
    fn select_index(&self, pool_len: usize) -> usize {
        rand::thread_rng().gen_range(0..pool_len)
    }
}

/// Ordered set of API keys, built per request from a comma-separated string.
#[derive(Clone, Default)]
pub struct CredentialPool {
    keys: Vec<SecretString>,
}

impl CredentialPool {
    /// Split on commas, trim, drop empty tokens.
    pub fn parse(raw: &str) -> Self {
        let keys = raw
            .split(',')
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .map(|k| SecretString::new(k.to_string()))
            .collect();
        Self { keys }
    }

    /// The caller's key list when it has one, otherwise the server's.
    pub fn resolve(client: Option<&SecretString>, server: Option<&SecretString>) -> Self {
        client
            .or(server)
            .map(|raw| Self::parse(raw.expose_secret()))
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn select(&self, selector: &dyn KeySelector) -> Option<&SecretString> {
        if self.keys.is_empty() {
            return None;
        }
        let index = selector.select_index(self.keys.len()).min(self.keys.len() - 1);
        self.keys.get(index)
    }
}

impl std::fmt::Debug for CredentialPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialPool")
            .field("len", &self.keys.len())
            .finish()
    }
}
