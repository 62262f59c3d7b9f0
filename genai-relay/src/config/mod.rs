use serde::Deserialize;
use service_core::config as core_config;
use service_core::error::AppError;
use std::env;
use std::str::FromStr;
use std::time::Duration;

const DEFAULT_GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";
const DEFAULT_MODELSCOPE_API_BASE: &str = "https://api-inference.modelscope.cn";
const DEFAULT_POLL_INTERVAL_MS: u64 = 5_000;
const DEFAULT_UPSTREAM_TIMEOUT_SECS: u64 = 120;

#[derive(Debug, Clone, Deserialize)]
pub struct RelayConfig {
    #[serde(flatten)]
    pub common: core_config::Config,
    pub gemini: GeminiSettings,
    pub modelscope: ModelScopeSettings,
    pub upstream: UpstreamSettings,
    pub observability: ObservabilitySettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GeminiSettings {
    pub api_base: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ModelScopeSettings {
    pub api_base: String,
    /// Delay between two task status checks.
    pub poll_interval_ms: u64,
    /// Upper bound of the random delay added to each poll interval.
    pub poll_jitter_ms: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpstreamSettings {
    /// Per-call timeout on outbound HTTP requests.
    pub request_timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ObservabilitySettings {
    pub otlp_endpoint: Option<String>,
}

impl RelayConfig {
    pub fn load() -> Result<Self, AppError> {
        let common_config = core_config::Config::load()?;

        Ok(RelayConfig {
            common: common_config,
            gemini: GeminiSettings {
                api_base: get_env("GEMINI_API_BASE", DEFAULT_GEMINI_API_BASE),
            },
            modelscope: ModelScopeSettings {
                api_base: get_env("MODELSCOPE_API_BASE", DEFAULT_MODELSCOPE_API_BASE),
                poll_interval_ms: get_parsed_env(
                    "MODELSCOPE_POLL_INTERVAL_MS",
                    DEFAULT_POLL_INTERVAL_MS,
                )?,
                poll_jitter_ms: get_parsed_env("MODELSCOPE_POLL_JITTER_MS", 0)?,
            },
            upstream: UpstreamSettings {
                request_timeout_secs: get_parsed_env(
                    "UPSTREAM_REQUEST_TIMEOUT_SECS",
                    DEFAULT_UPSTREAM_TIMEOUT_SECS,
                )?,
            },
            observability: ObservabilitySettings {
                otlp_endpoint: env::var("OTLP_ENDPOINT").ok().filter(|v| !v.is_empty()),
            },
        })
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.modelscope.poll_interval_ms)
    }

    pub fn poll_jitter(&self) -> Duration {
        Duration::from_millis(self.modelscope.poll_jitter_ms)
    }

    pub fn upstream_timeout(&self) -> Duration {
        Duration::from_secs(self.upstream.request_timeout_secs)
    }
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            common: core_config::Config::default(),
            gemini: GeminiSettings {
                api_base: DEFAULT_GEMINI_API_BASE.to_string(),
            },
            modelscope: ModelScopeSettings {
                api_base: DEFAULT_MODELSCOPE_API_BASE.to_string(),
                poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
                poll_jitter_ms: 0,
            },
            upstream: UpstreamSettings {
                request_timeout_secs: DEFAULT_UPSTREAM_TIMEOUT_SECS,
            },
            observability: ObservabilitySettings {
                otlp_endpoint: None,
            },
        }
    }
}

fn get_env(key: &str, default: &str) -> String {
    env::var(key)
        .ok()
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| default.to_string())
}

fn get_parsed_env<T>(key: &str, default: T) -> Result<T, AppError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(raw) if !raw.trim().is_empty() => raw.trim().parse().map_err(|e| {
            AppError::ConfigError(anyhow::anyhow!("{} has an invalid value '{}': {}", key, raw, e))
        }),
        _ => Ok(default),
    }
}
