//! Polling utility for waiting on remote state transitions
//!
//! Repeats an async probe on a fixed interval until a predicate accepts the
//! value or the attempt budget runs out.

use std::time::Duration;
use tokio::time::sleep;

/// Configurable polling policy
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollPolicy {
    pub interval: Duration,
    pub max_attempts: usize,
}

impl Default for PollPolicy {
    fn default() -> Self {
        // One hour at ten second intervals
        Self {
            interval: Duration::from_secs(10),
            max_attempts: 360,
        }
    }
}

/// Why a poll loop stopped without an accepted value
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum PollError<E: std::fmt::Display> {
    #[error("probe failed: {0}")]
    Probe(E),

    #[error("gave up after {attempts} attempts")]
    Exhausted { attempts: usize },
}

/// Probe until `is_done` accepts the value
///
/// A probe error ends the loop immediately; retries of individual calls are
/// the probe's own business.
///
/// # Examples
/// ```rust
/// use scanwrap::core::poll::{poll_until, PollPolicy};
/// use std::time::Duration;
///
/// # async fn example() {
/// let policy = PollPolicy { interval: Duration::from_millis(1), max_attempts: 3 };
/// let value = poll_until(
///     "counter",
///     &policy,
///     || async { Ok::<u32, String>(7) },
///     |v| *v == 7,
/// )
/// .await;
/// assert_eq!(value.unwrap(), 7);
/// # }
/// ```
pub async fn poll_until<F, Fut, T, E, P>(
    operation_name: &str,
    policy: &PollPolicy,
    mut probe: F,
    is_done: P,
) -> Result<T, PollError<E>>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<T, E>>,
    E: std::fmt::Display,
    P: Fn(&T) -> bool,
{
    for attempt in 1..=policy.max_attempts {
        let value = probe().await.map_err(PollError::Probe)?;
        if is_done(&value) {
            log::trace!(
                "Poll '{}' settled on attempt {}/{}",
                operation_name,
                attempt,
                policy.max_attempts
            );
            return Ok(value);
        }
        if attempt < policy.max_attempts {
            log::trace!(
                "Poll '{}' not settled on attempt {}/{}, next probe in {:?}",
                operation_name,
                attempt,
                policy.max_attempts,
                policy.interval
            );
            sleep(policy.interval).await;
        }
    }

    Err(PollError::Exhausted {
        attempts: policy.max_attempts,
    })
}
