// SPDX-License-Identifier: AGPL-3.0-or-later

//! Default step retry policy for the workflow runtime (`spec.md` §4.7:
//! "initial interval 500 ms, backoff coefficient 1.5, maximum interval
//! 5 s, maximum attempts 3").

use std::time::Duration;

use tracing::debug;

#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub initial_interval: Duration,
    pub backoff_coefficient: f64,
    pub max_interval: Duration,
    pub max_attempts: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            initial_interval: Duration::from_millis(500),
            backoff_coefficient: 1.5,
            max_interval: Duration::from_secs(5),
            max_attempts: 3,
        }
    }
}

impl RetryPolicy {
    fn interval_for_attempt(&self, attempt: u32) -> Duration {
        let scaled = self.initial_interval.as_secs_f64() * self.backoff_coefficient.powi(attempt as i32);
        Duration::from_secs_f64(scaled).min(self.max_interval)
    }

    /// Runs `op` until it succeeds or `max_attempts` is reached, sleeping
    /// between attempts per the backoff schedule. Returns the last error
    /// on exhaustion.
    pub async fn run<T, E, F, Fut>(&self, label: &str, op: F) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: std::future::Future<Output = Result<T, E>>,
    {
        self.run_if(label, |_err| true, op).await
    }

    /// Like `run`, but `retryable` decides whether a given error is worth
    /// another attempt. A non-retryable error returns immediately on its
    /// first occurrence, without sleeping or consuming the rest of the
    /// attempt budget.
    pub async fn run_if<T, E, F, Fut>(&self, label: &str, retryable: impl Fn(&E) -> bool, mut op: F) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: std::future::Future<Output = Result<T, E>>,
    {
        let mut attempt = 0;
        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(err) if attempt + 1 >= self.max_attempts || !retryable(&err) => return Err(err),
                Err(_) => {
                    let wait = self.interval_for_attempt(attempt);
                    debug!(label, attempt, wait_ms = wait.as_millis() as u64, "retrying");
                    tokio::time::sleep(wait).await;
                    attempt += 1;
                },
            }
        }
    }
}
