//! Bounded retry for operations refused while an entity is in flux.
//!
//! Endpoints reject power operations with an invalid-state error while
//! the machine is mid-transition. Initiation retries those with a
//! linearly growing backoff, checking each round whether the desired
//! end state was reached by other means.

use std::time::Duration;

use tracing::debug;

use crate::hypervisor::HypervisorError;
use crate::monitor::Sleep;

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_tries: u32,
    /// Backoff before try n is `base_sleep * n`.
    pub base_sleep: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_tries: 10,
            base_sleep: Duration::from_millis(500),
        }
    }
}

/// Outcome of initiating an operation.
#[derive(Debug)]
pub enum Initiation<T> {
    /// The desired end state already holds, no task was started.
    AlreadyDone,
    /// The operation was accepted and is running as this task.
    Task(T),
}

/// Try to start an operation, retrying on invalid-state refusals.
///
/// `satisfied` is checked before every attempt so a machine that
/// reached the target state on its own short-circuits to
/// [`Initiation::AlreadyDone`]. Any error other than invalid state
/// aborts immediately.
pub fn initiate_with_retry<T>(
    policy: &RetryPolicy,
    sleep: &dyn Sleep,
    mut satisfied: impl FnMut() -> Result<bool, HypervisorError>,
    mut attempt: impl FnMut() -> Result<T, HypervisorError>,
) -> Result<Initiation<T>, HypervisorError> {
    for tries in 1..=policy.max_tries {
        if satisfied()? {
            return Ok(Initiation::AlreadyDone);
        }
        match attempt() {
            Ok(task) => return Ok(Initiation::Task(task)),
            Err(err) if err.is_invalid_state() => {
                debug!(tries, error = %err, "operation refused, backing off");
                sleep.sleep(policy.base_sleep * tries);
            }
            Err(err) => return Err(err),
        }
    }
    Err(HypervisorError::Remote(format!(
        "still in an invalid state after {} attempts",
        policy.max_tries
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fake::RecordingSleep;

    fn fast_policy(max_tries: u32) -> RetryPolicy {
        RetryPolicy {
            max_tries,
            base_sleep: Duration::from_millis(500),
        }
    }

    #[test]
    fn backoff_grows_with_each_refusal() {
        let sleep = RecordingSleep::default();
        let mut refusals = 0;
        let result = initiate_with_retry(
            &fast_policy(10),
            &sleep,
            || Ok(false),
            || {
                if refusals < 2 {
                    refusals += 1;
                    Err(HypervisorError::InvalidState("busy".into()))
                } else {
                    Ok("task")
                }
            },
        );
        assert!(matches!(result, Ok(Initiation::Task("task"))));
        let sleeps = sleep.sleeps.borrow();
        assert_eq!(
            *sleeps,
            vec![Duration::from_millis(500), Duration::from_millis(1000)]
        );
    }

    #[test]
    fn satisfied_short_circuits_without_attempting() {
        let sleep = RecordingSleep::default();
        let result = initiate_with_retry(
            &fast_policy(10),
            &sleep,
            || Ok(true),
            || -> Result<(), _> { panic!("must not be attempted") },
        );
        assert!(matches!(result, Ok(Initiation::AlreadyDone)));
        assert!(sleep.sleeps.borrow().is_empty());
    }

    #[test]
    fn other_errors_abort_immediately() {
        let sleep = RecordingSleep::default();
        let result: Result<Initiation<()>, _> = initiate_with_retry(
            &fast_policy(10),
            &sleep,
            || Ok(false),
            || Err(HypervisorError::Remote("permission denied".into())),
        );
        assert!(matches!(result, Err(HypervisorError::Remote(_))));
        assert!(sleep.sleeps.borrow().is_empty());
    }

    #[test]
    fn exhausted_tries_report_the_bound() {
        let sleep = RecordingSleep::default();
        let result: Result<Initiation<()>, _> = initiate_with_retry(
            &fast_policy(3),
            &sleep,
            || Ok(false),
            || Err(HypervisorError::InvalidState("busy".into())),
        );
        let err = result.unwrap_err();
        assert!(err.to_string().contains("3 attempts"));
        assert_eq!(sleep.sleeps.borrow().len(), 3);
    }
}
