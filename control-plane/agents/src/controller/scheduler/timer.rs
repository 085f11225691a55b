//! Cancellable single-shot delay: a race between an elapsed-time timer and a
//! one-shot cancellation broadcast discriminated by signal kind. Exactly one
//! of the two participants resolves the race; the loser's effect is discarded.

use std::time::Duration;
use tokio::sync::broadcast;

/// Kind of cancellation signal carried on the broadcast bus.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub(crate) enum SignalKind {
    /// Cancels the refresh scheduler's waits.
    Refresh,
    /// Cancels a pending notification snooze.
    Snooze,
}

/// Outcome of a cancellable wait.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub(crate) enum Wait {
    /// The full duration elapsed.
    Elapsed,
    /// A matching cancellation signal won the race.
    Cancelled,
}

/// Wait for `duration` unless a cancellation signal of the given kind arrives
/// first. A zero duration means no delay is configured and elapses
/// immediately, before any pending signal is looked at.
pub(crate) async fn wait(
    duration: Duration,
    kind: SignalKind,
    cancel: &mut broadcast::Receiver<SignalKind>,
) -> Wait {
    if duration.is_zero() {
        return Wait::Elapsed;
    }
    tokio::select! {
        _ = tokio::time::sleep(duration) => Wait::Elapsed,
        _ = cancelled(kind, cancel) => Wait::Cancelled,
    }
}

/// Completes when a signal of the given kind is received.
/// Signals of a foreign kind are skipped, not consumed as cancellations. A
/// lagged receiver may have dropped its signal: keep waiting, the scheduler's
/// generation check guarantees eventual termination regardless.
pub(crate) async fn cancelled(kind: SignalKind, cancel: &mut broadcast::Receiver<SignalKind>) {
    loop {
        match cancel.recv().await {
            Ok(signal) if signal == kind => return,
            Ok(_) => continue,
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                tracing::warn!(skipped, "Cancellation receiver lagged");
                continue;
            }
            Err(broadcast::error::RecvError::Closed) => {
                // Nobody can cancel us anymore: leave the race to the timer.
                std::future::pending::<()>().await;
            }
        }
    }
}
