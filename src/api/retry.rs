use super::error::{Error, Failure};
use crate::events::{Event, EventKind, EventSink, Level};
use serde_json::Value;
use std::future::Future;
use std::time::Duration;

/// Exponential backoff around a single API call.
///
/// Attempt 0 is the initial try; attempts `1..=max_retries` are preceded by a sleep of
/// `base_delay * 2^(attempt - 1)`. The sleep blocks the polling cycle for its whole length.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy {
            max_retries: 5,
            base_delay: Duration::from_secs(10),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_retries: u32, base_delay: Duration) -> Self {
        RetryPolicy {
            max_retries,
            base_delay,
        }
    }

    /// Delay before `attempt` (1-based); zero for the initial try.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        if attempt == 0 {
            return Duration::ZERO;
        }
        2u32.checked_pow(attempt - 1)
            .and_then(|factor| self.base_delay.checked_mul(factor))
            .unwrap_or(Duration::MAX)
    }

    /// Run `call` until it succeeds, fails non-retryably, or attempts run out. The error side is
    /// the "no data" outcome and is always reported to `sink` before returning.
    pub async fn execute<F, Fut>(
        &self,
        operation: &'static str,
        sink: &dyn EventSink,
        mut call: F,
    ) -> Result<Value, Error>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<Value, Failure>>,
    {
        let mut last = Failure::Other(String::from("no attempt made"));

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                let delay = self.delay_for(attempt);
                sink.emit(
                    Event::warn(
                        EventKind::RetryScheduled,
                        format!("retrying {} in {:?}", operation, delay),
                    )
                    .with("attempt", attempt)
                    .with("max_retries", self.max_retries)
                    .with("delay_ms", delay.as_millis()),
                );
                tokio::time::sleep(delay).await;
            }

            match call().await {
                Ok(value) => return Ok(value),
                Err(failure) if failure.is_retryable() => {
                    sink.emit(
                        Event::warn(
                            EventKind::RequestFailed,
                            format!("{} failed: {}", operation, Error::Transient(failure.clone())),
                        )
                        .with("attempt", attempt),
                    );
                    last = failure;
                }
                Err(failure) => {
                    sink.emit(
                        Event::error(
                            EventKind::NonRetryable,
                            format!("{} failed, not retrying: {}", operation, failure),
                        )
                        .with("attempt", attempt),
                    );
                    return Err(Error::Client { operation, failure });
                }
            }
        }

        let attempts = self.max_retries + 1;
        sink.emit(
            Event::new(
                Level::Error,
                EventKind::RetriesExhausted,
                format!("giving up on {} after {} attempts: {}", operation, attempts, last),
            )
            .with("attempts", attempts),
        );
        Err(Error::Unavailable {
            operation,
            attempts,
            last,
        })
    }
}
