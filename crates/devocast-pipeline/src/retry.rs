//! Stage-level retry with exponential backoff and jitter (§4.L).
//!
//! Distinct from devocast-store's low-level transport retry (100ms base,
//! 5s cap, fixed 3 attempts, no jitter): this one backs a whole stage
//! invocation, is parameterized per-stage via `StageName::max_attempts`, and
//! jitters the delay so a burst of stages hitting the same timeout don't all
//! retry in lockstep.

use std::time::Duration;

use rand::Rng;
use tracing::{debug, warn};

/// Backoff configuration for one stage's retry loop.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
    pub stage_name: &'static str,
}

impl RetryConfig {
    pub fn for_stage(stage: devocast_models::StageName) -> Self {
        Self {
            max_attempts: stage.max_attempts(),
            base_delay: Duration::from_secs(2),
            max_delay: Duration::from_secs(30),
            stage_name: stage.as_str(),
        }
    }

    /// Exponential backoff with up to 25% jitter, capped at `max_delay`.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let exp = self.base_delay.saturating_mul(2u32.saturating_pow(attempt)).min(self.max_delay);
        let jitter_frac: f64 = rand::rng().random_range(0.0..0.25);
        exp.mul_f64(1.0 + jitter_frac).min(self.max_delay.mul_f64(1.25))
    }
}

/// Outcome of a stage attempt, from the caller's retry loop's point of view.
pub enum AttemptOutcome<T, E> {
    Done(T),
    Retry(E),
    Fatal(E),
}

/// Run `operation` up to `config.max_attempts` times. `classify` decides
/// whether a given error is retryable; a non-retryable error or exhausted
/// attempts both return the last error (exhaustion promotes it to fatal, per
/// §4.L "on exhausting retries, the stage's last error is promoted to fatal").
pub async fn retry_stage<F, Fut, T, E>(
    config: &RetryConfig,
    is_retryable: impl Fn(&E) -> bool,
    mut operation: F,
) -> Result<T, E>
where
    F: FnMut(u32) -> Fut,
    Fut: std::future::Future<Output = Result<T, E>>,
    E: std::fmt::Display,
{
    let mut attempt = 0u32;
    loop {
        match operation(attempt).await {
            Ok(value) => return Ok(value),
            Err(e) if is_retryable(&e) && attempt + 1 < config.max_attempts => {
                let delay = config.delay_for_attempt(attempt);
                warn!(
                    stage = config.stage_name,
                    attempt = attempt + 1,
                    max_attempts = config.max_attempts,
                    delay_ms = delay.as_millis() as u64,
                    error = %e,
                    "stage attempt failed, retrying"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(e) => {
                debug!(stage = config.stage_name, attempt = attempt + 1, "stage attempts exhausted or error is fatal");
                return Err(e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use devocast_models::StageName;

    #[test]
    fn delay_grows_but_respects_the_cap() {
        let config = RetryConfig::for_stage(StageName::AcquireClips);
        assert!(config.delay_for_attempt(0) >= Duration::from_secs(2));
        assert!(config.delay_for_attempt(10) <= config.max_delay.mul_f64(1.25));
    }

    #[tokio::test]
    async fn retries_until_success_within_attempt_budget() {
        let config = RetryConfig { max_attempts: 3, base_delay: Duration::from_millis(1), max_delay: Duration::from_millis(5), stage_name: "test" };
        let calls = std::sync::atomic::AtomicU32::new(0);
        let result = retry_stage(
            &config,
            |_: &&str| true,
            |_attempt| {
                let n = calls.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
                async move { if n < 2 { Err("transient") } else { Ok(42) } }
            },
        )
        .await;
        assert_eq!(result, Ok(42));
    }

    #[tokio::test]
    async fn non_retryable_error_returns_immediately() {
        let config = RetryConfig { max_attempts: 5, base_delay: Duration::from_millis(1), max_delay: Duration::from_millis(5), stage_name: "test" };
        let calls = std::sync::atomic::AtomicU32::new(0);
        let result = retry_stage(
            &config,
            |_: &&str| false,
            |_attempt| {
                calls.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
                async { Err::<i32, _>("fatal") }
            },
        )
        .await;
        assert_eq!(result, Err("fatal"));
        assert_eq!(calls.load(std::sync::atomic::Ordering::SeqCst), 1);
    }
}
