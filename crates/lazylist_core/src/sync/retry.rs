//! Bounded retry with exponential backoff.
//!
//! # Responsibility
//! - Re-run a fallible async operation up to `max_retries` extra times.
//! - Sleep `initial_delay * backoff_multiplier^attempt` between attempts.
//!
//! # Invariants
//! - The operation is invoked at most `max_retries + 1` times.
//! - The last failure is returned once attempts are exhausted.
//! - The executor performs no rollback; wrapped operations must be safe to
//!   repeat (full-document replacement).

use crate::sync::config::RetryConfig;
use log::{debug, info, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::future::Future;

/// All attempts failed; carries the last failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryExhausted<E> {
    pub attempts: u32,
    pub last_error: E,
}

impl<E: Display> Display for RetryExhausted<E> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "gave up after {} attempt(s): {}",
            self.attempts, self.last_error
        )
    }
}

impl<E: Error + 'static> Error for RetryExhausted<E> {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        Some(&self.last_error)
    }
}

/// Successful value together with the number of attempts it took.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Retried<T> {
    pub value: T,
    pub attempts: u32,
}

/// Runs `operation` under `config`, logging every attempt with `context`.
pub async fn run_with_retry<F, Fut, T, E>(
    mut operation: F,
    config: &RetryConfig,
    context: &str,
) -> Result<Retried<T>, RetryExhausted<E>>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Display,
{
    let mut attempt: u32 = 0;
    loop {
        debug!(
            "event=retry_attempt module=sync status=start context={} attempt={} max_retries={}",
            context, attempt, config.max_retries
        );
        match operation(attempt).await {
            Ok(value) => {
                if attempt > 0 {
                    info!(
                        "event=retry_attempt module=sync status=ok context={} attempt={}",
                        context, attempt
                    );
                }
                return Ok(Retried {
                    value,
                    attempts: attempt + 1,
                });
            }
            Err(err) if attempt < config.max_retries => {
                let delay = config.delay_for_attempt(attempt);
                warn!(
                    "event=retry_attempt module=sync status=retry context={} attempt={} delay_ms={} error={}",
                    context,
                    attempt,
                    delay.as_millis(),
                    err
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(err) => {
                warn!(
                    "event=retry_exhausted module=sync status=error context={} attempts={} error={}",
                    context,
                    attempt + 1,
                    err
                );
                return Err(RetryExhausted {
                    attempts: attempt + 1,
                    last_error: err,
                });
            }
        }
    }
}
