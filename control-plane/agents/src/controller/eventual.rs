//! Bounded confirmation polling for eventually-consistent remote operations.
//! A fire-and-forget mutation is confirmed by re-querying the watched resource
//! over a finite backoff sequence; running out of budget is a normal outcome
//! ("unconfirmed"), never an error.

use crate::errors::SvcError;
use console_port::transport_api::ClientError;
use std::{future::Future, time::Duration};

/// Number of confirmation queries attempted before giving up.
pub const POLL_STEPS: usize = 20;
/// Multiplier applied to the log2 backoff curve.
pub const POLL_MULTIPLIER: Duration = Duration::from_millis(2000);

/// Outcome of a bounded confirmation poll.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum PollMatch {
    /// The predicate matched the observed remote state.
    Matched,
    /// The budget was exhausted without a match.
    Unconfirmed,
}

/// The finite backoff sequence waited between confirmation queries.
/// Grows sub-linearly: frequent early checks, progressively sparser later
/// ones, with a hard upper bound on the total wait.
pub fn backoff_steps(count: usize, multiplier: Duration) -> Vec<Duration> {
    (2 ..= count + 1)
        .map(|step| {
            let millis = (step as f64).log2() * multiplier.as_millis() as f64;
            Duration::from_millis(millis.round() as u64)
        })
        .collect()
}

/// Poll the remote state of a resource until `test` matches, the resource goes
/// missing (a success when `can_be_missing`) or the backoff budget runs out.
/// Every intermediate observation is pushed through `observe` so the cache
/// sees partial progress while the operation is still pending.
/// Transport errors are propagated, not retried.
pub async fn poll_until<T, Query, Fut, Test, Observe>(
    mut query: Query,
    test: Test,
    can_be_missing: bool,
    mut observe: Observe,
) -> Result<PollMatch, SvcError>
where
    Query: FnMut() -> Fut,
    Fut: Future<Output = Result<Option<T>, ClientError>>,
    Test: Fn(&T) -> bool,
    Observe: FnMut(&T),
{
    for step in backoff_steps(POLL_STEPS, POLL_MULTIPLIER) {
        match query().await? {
            None if can_be_missing => return Ok(PollMatch::Matched),
            None => (),
            Some(state) => {
                if test(&state) {
                    return Ok(PollMatch::Matched);
                }
                observe(&state);
            }
        }
        tokio::time::sleep(step).await;
    }
    Ok(PollMatch::Unconfirmed)
}
