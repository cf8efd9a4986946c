//! Exponential-backoff reconnection to the message broker.
//!
//! When the broker is unreachable at startup or the delivery stream ends,
//! the consumer calls [`reconnect_loop`] to keep retrying with increasing
//! delays until either a connection is established or the
//! [`CancellationToken`] is triggered.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

/// Tunable parameters for the exponential-backoff strategy.
#[derive(Debug, Clone)]
pub struct ReconnectConfig {
    /// Delay before the second attempt (the first is immediate).
    pub initial_delay: Duration,
    /// Upper bound on the delay between attempts.
    pub max_delay: Duration,
    /// Factor by which the delay grows after each failure.
    pub multiplier: f64,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
            multiplier: 2.0,
        }
    }
}

/// Calculate the next backoff delay from the current delay and config.
///
/// The result is clamped to [`ReconnectConfig::max_delay`].
pub fn next_delay(current: Duration, config: &ReconnectConfig) -> Duration {
    let next_ms = (current.as_millis() as f64 * config.multiplier) as u64;
    Duration::from_millis(next_ms).min(config.max_delay)
}

/// Call `connect` until it succeeds, sleeping with exponential backoff
/// between failures.
///
/// Returns `Some(value)` once a connection succeeds, or `None` if `cancel`
/// is triggered first.
pub async fn reconnect_loop<T, E, F, Fut>(
    endpoint: &str,
    config: &ReconnectConfig,
    cancel: &CancellationToken,
    mut connect: F,
) -> Option<T>
where
    E: Display,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let mut delay = config.initial_delay;
    let mut attempt = 0u32;

    loop {
        if cancel.is_cancelled() {
            tracing::info!(endpoint, "Reconnect cancelled");
            return None;
        }

        attempt += 1;
        tracing::info!(endpoint, attempt, "Connecting to RabbitMQ");

        tokio::select! {
            biased;

            _ = cancel.cancelled() => {
                tracing::info!(endpoint, "Reconnect cancelled");
                return None;
            }
            result = connect() => {
                match result {
                    Ok(value) => {
                        tracing::info!(endpoint, attempt, "Connected to RabbitMQ");
                        return Some(value);
                    }
                    Err(e) => {
                        tracing::warn!(
                            endpoint,
                            error = %e,
                            retry_in_ms = delay.as_millis() as u64,
                            "Connection attempt {attempt} failed",
                        );
                    }
                }
            }
        }

        tokio::select! {
            _ = cancel.cancelled() => return None,
            _ = tokio::time::sleep(delay) => {}
        }

        delay = next_delay(delay, config);
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use super::*;

    #[test]
    fn next_delay_doubles() {
        let config = ReconnectConfig::default();
        assert_eq!(next_delay(Duration::from_secs(1), &config), Duration::from_secs(2));
    }

    #[test]
    fn next_delay_clamps_at_max() {
        let config = ReconnectConfig {
            max_delay: Duration::from_secs(10),
            ..Default::default()
        };
        assert_eq!(next_delay(Duration::from_secs(8), &config), Duration::from_secs(10));
    }

    #[test]
    fn full_backoff_sequence() {
        let config = ReconnectConfig::default();
        let mut delay = config.initial_delay;

        for expected_secs in [1, 2, 4, 8, 16, 30, 30] {
            assert_eq!(delay.as_secs(), expected_secs);
            delay = next_delay(delay, &config);
        }
    }

    #[tokio::test]
    async fn cancelled_token_stops_before_connecting() {
        let cancel = CancellationToken::new();
        cancel.cancel();

        let attempts = AtomicU32::new(0);
        let result: Option<()> =
            reconnect_loop("localhost:5672", &ReconnectConfig::default(), &cancel, || {
                attempts.fetch_add(1, Ordering::SeqCst);
                std::future::pending::<Result<(), String>>()
            })
            .await;

        assert!(result.is_none());
        assert_eq!(attempts.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn cancel_during_attempt_abandons_it() {
        let cancel = CancellationToken::new();
        let attempts = AtomicU32::new(0);

        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            trigger.cancel();
        });

        let result: Option<()> =
            reconnect_loop("localhost:5672", &ReconnectConfig::default(), &cancel, || {
                attempts.fetch_add(1, Ordering::SeqCst);
                std::future::pending::<Result<(), String>>()
            })
            .await;

        assert!(result.is_none());
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn retries_until_connect_succeeds() {
        let config = ReconnectConfig {
            initial_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(4),
            multiplier: 2.0,
        };
        let cancel = CancellationToken::new();
        let attempts = AtomicU32::new(0);

        let result = reconnect_loop("localhost:5672", &config, &cancel, || {
            let n = attempts.fetch_add(1, Ordering::SeqCst) + 1;
            async move {
                if n < 3 {
                    Err("connection refused")
                } else {
                    Ok(n)
                }
            }
        })
        .await;

        assert_eq!(result, Some(3));
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }
}
