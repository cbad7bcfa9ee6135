//! Transient-error retry policy for the chat client.
//!
//! Retry is the collaborator's responsibility, not the pipeline's: the
//! summarization controller issues each call exactly once, and
//! [`AzureChatClient::chat_with_retry`](crate::AzureChatClient::chat_with_retry)
//! absorbs 429/5xx/network hiccups underneath it with exponential backoff.
//! Permanent errors (400, 401, 403, 404) fail immediately.

use std::time::Duration;

/// Backoff configuration for chat-completion retries.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Retries after the initial attempt. 0 disables retrying.
    pub max_retries: u32,
    /// Delay before the first retry.
    pub initial_delay: Duration,
    /// Ceiling on any single delay.
    pub max_delay: Duration,
    /// Per-attempt backoff multiplier.
    pub multiplier: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 2,
            initial_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(8),
            multiplier: 2.0,
        }
    }
}

impl RetryConfig {
    /// Config with the given retry count and default backoff.
    pub fn with_retries(retries: u32) -> Self {
        Self {
            max_retries: retries,
            ..Default::default()
        }
    }

    /// Delay before retry `attempt` (0-indexed), capped at `max_delay`.
    ///
    /// A deterministic jitter factor keyed on the attempt number spreads
    /// concurrent fan-out calls without pulling in a random source.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let base = self.initial_delay.as_secs_f64() * self.multiplier.powi(attempt as i32);
        let capped = base.min(self.max_delay.as_secs_f64());
        let jitter = match attempt % 3 {
            0 => 0.8,
            1 => 0.65,
            _ => 0.9,
        };
        Duration::from_secs_f64(capped * jitter)
    }
}

/// Whether an error message indicates a transient, retryable failure.
pub fn is_transient_error(error: &str) -> bool {
    if ["429", "500", "502", "503", "504"]
        .iter()
        .any(|s| error.contains(&format!("HTTP {s}")))
    {
        return true;
    }
    let lower = error.to_lowercase();
    [
        "request failed",
        "connection reset",
        "connection refused",
        "timed out",
        "timeout",
        "broken pipe",
    ]
    .iter()
    .any(|p| lower.contains(p))
}
