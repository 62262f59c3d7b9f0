//! Fixed-interval polling of asynchronous upstream tasks.
//!
//! The loop knows nothing about any particular backend: a [`TaskStatusSource`]
//! fetches snapshots, a [`PollPolicy`] decides how often and how many times.
//! Failures come back on two channels. A [`PollError::Transient`] from the source
//! is logged and costs one attempt; a terminal task state or a
//! [`PollError::Fatal`] ends the loop immediately.

use crate::models::{Task, TaskStatus};
use crate::services::providers::ProviderError;
use async_trait::async_trait;
use rand::Rng;
use std::time::Duration;
use thiserror::Error;
use tokio::time::sleep;
use tracing::{debug, info, warn};

/// Interval the ModelScope contract is tuned for.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// How often, and how many times, to check a task before giving up.
#[derive(Clone, Debug, PartialEq)]
pub struct PollPolicy {
    /// Delay before each status check.
    pub interval: Duration,
    /// Number of status checks, transient failures included.
    pub max_attempts: u32,
    /// Upper bound of extra random delay added to each interval.
    pub jitter: Duration,
    /// Budget the attempts were derived from; reported on timeout.
    pub timeout: Duration,
}

impl PollPolicy {
    /// `ceil(timeout / interval)` attempts at `interval`.
    pub fn for_timeout(timeout: Duration, interval: Duration) -> Self {
        let interval = interval.max(Duration::from_millis(1));
        let attempts = timeout.as_nanos().div_ceil(interval.as_nanos());
        Self {
            interval,
            max_attempts: u32::try_from(attempts).unwrap_or(u32::MAX),
            jitter: Duration::ZERO,
            timeout,
        }
    }

    pub fn with_jitter(mut self, jitter: Duration) -> Self {
        self.jitter = jitter;
        self
    }

    fn delay(&self) -> Duration {
        if self.jitter.is_zero() {
            return self.interval;
        }
        let jitter_ms = self.jitter.as_millis().min(u64::MAX as u128) as u64;
        self.interval + Duration::from_millis(rand::thread_rng().gen_range(0..=jitter_ms))
    }
}

#[derive(Debug, Error)]
pub enum PollError {
    /// The status check itself failed; the task may still be fine.
    #[error("status check failed: {0}")]
    Transient(String),

    /// The status check returned something that can never become valid.
    #[error(transparent)]
    Fatal(#[from] ProviderError),
}

/// Fetches the current state of a remote task.
#[async_trait]
pub trait TaskStatusSource: Send + Sync {
    async fn fetch_task(&self, task_id: &str) -> Result<Task, PollError>;
}

/// Poll `task_id` until it succeeds, fails, or the policy runs out of attempts.
///
/// Checks are strictly sequential. `backend` only labels logs and errors.
pub async fn poll_task<S>(
    source: &S,
    backend: &str,
    task_id: &str,
    policy: &PollPolicy,
) -> Result<String, ProviderError>
where
    S: TaskStatusSource + ?Sized,
{
    info!(
        backend,
        task_id,
        timeout_secs = policy.timeout.as_secs_f64(),
        max_attempts = policy.max_attempts,
        "Polling task status"
    );

    for attempt in 1..=policy.max_attempts {
        sleep(policy.delay()).await;
        debug!(backend, task_id, attempt, max_attempts = policy.max_attempts, "Checking task status");

        let task = match source.fetch_task(task_id).await {
            Ok(task) => task,
            Err(PollError::Transient(reason)) => {
                warn!(backend, task_id, attempt, reason = %reason, "Task status check failed, will retry");
                continue;
            }
            Err(PollError::Fatal(err)) => return Err(err),
        };

        match task.status {
            TaskStatus::Succeed => {
                info!(backend, task_id, attempt, "Task succeeded");
                return task.result.ok_or_else(|| {
                    ProviderError::Protocol(format!(
                        "{} task succeeded but returned no images.",
                        backend
                    ))
                });
            }
            TaskStatus::Failed => {
                let message = task.message.unwrap_or_else(|| "Unknown error".to_string());
                warn!(backend, task_id, attempt, message = %message, "Task failed");
                return Err(ProviderError::TaskFailed {
                    backend: backend.to_string(),
                    message,
                });
            }
            TaskStatus::Pending => {}
        }
    }

    warn!(backend, task_id, max_attempts = policy.max_attempts, "Task polling exhausted");
    Err(ProviderError::Timeout {
        backend: backend.to_string(),
        seconds: policy.timeout.as_secs_f64(),
    })
}
