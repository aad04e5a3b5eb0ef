use std::time::Duration;

use tracing::warn;

/// Exponential backoff helper generalized from the teacher's ad hoc
/// `tokio::time::sleep`-based retry loops (`price_service::refresh_from_api`):
/// run `f` up to `max_attempts` times, sleeping `base · 2^(attempt-1)` between
/// tries, and return the last error if every attempt fails.
pub async fn with_backoff<T, E, F, Fut>(
    operation: &str,
    max_attempts: u32,
    base: Duration,
    mut f: F,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<T, E>>,
    E: std::fmt::Display,
{
    let mut attempt = 0;
    loop {
        attempt += 1;
        match f().await {
            Ok(value) => return Ok(value),
            Err(e) if attempt < max_attempts => {
                let delay = base * 2u32.saturating_pow(attempt - 1);
                warn!(operation, attempt, max_attempts, error = %e, "retrying after backoff");
                tokio::time::sleep(delay).await;
            }
            Err(e) => return Err(e),
        }
    }
}

/// Outbox-style schedule: `base_secs · 2^(retries-1)`, used both by the
/// Outbox Relay (C13) and Source Adapters (C3) for their own retry counters.
pub fn next_attempt_delay(base_secs: i64, retries: i32) -> chrono::Duration {
    let retries = retries.max(1);
    let secs = base_secs.saturating_mul(1i64 << (retries - 1).min(20));
    chrono::Duration::seconds(secs)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delay_doubles_per_retry() {
        assert_eq!(next_attempt_delay(60, 1), chrono::Duration::seconds(60));
        assert_eq!(next_attempt_delay(60, 2), chrono::Duration::seconds(120));
        assert_eq!(next_attempt_delay(60, 3), chrono::Duration::seconds(240));
    }

    #[tokio::test]
    async fn with_backoff_returns_first_success() {
        let result: Result<i32, String> =
            with_backoff("test", 3, Duration::from_millis(1), || async { Ok(42) }).await;
        assert_eq!(result.unwrap(), 42);
    }

    #[tokio::test]
    async fn with_backoff_exhausts_attempts() {
        let mut calls = 0;
        let result: Result<i32, String> = with_backoff("test", 2, Duration::from_millis(1), || {
            calls += 1;
            async move { Err("boom".to_string()) }
        })
        .await;
        assert!(result.is_err());
        assert_eq!(calls, 2);
    }
}
