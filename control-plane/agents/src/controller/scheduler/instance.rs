//! A single refresh scheduler instance: waits out its start delay, then ticks
//! at the configured fixed delay until it is cancelled, superseded by a newer
//! instance or the session expires. Only the most recently started instance
//! is allowed to keep ticking; staleness is detected by comparing the
//! instance's own generation with the process-wide counter on every tick.

use super::{
    timer::{self, SignalKind, Wait},
    RefreshRequest,
};
use crate::controller::registry::Registry;
use console_port::types::{DelayConfig, RefreshFlags};
use std::{
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
    time::{Duration, Instant},
};
use tokio::sync::{broadcast, mpsc};

/// A refresh scheduler instance.
#[derive(Debug)]
pub(crate) struct SchedulerInstance {
    /// Generation this instance was started with.
    generation: u64,
    /// Process-wide generation counter identifying the authoritative instance.
    current_generation: Arc<AtomicU64>,
    /// Fixed delay between ticks.
    delay: Duration,
    /// Flags carried by the first dispatched tick only.
    flags: RefreshFlags,
    cancel: broadcast::Receiver<SignalKind>,
    refresh_channel: mpsc::Sender<RefreshRequest>,
    registry: Registry,
}

impl SchedulerInstance {
    /// Return a new `Self` for the given generation.
    #[allow(clippy::too_many_arguments)]
    pub(super) fn new(
        generation: u64,
        current_generation: Arc<AtomicU64>,
        delay: Duration,
        flags: RefreshFlags,
        cancel: broadcast::Receiver<SignalKind>,
        refresh_channel: mpsc::Sender<RefreshRequest>,
        registry: Registry,
    ) -> Self {
        Self {
            generation,
            current_generation,
            delay,
            flags,
            cancel,
            refresh_channel,
            registry,
        }
    }

    /// Run the instance to completion.
    pub(crate) async fn run(mut self, start_delay: Duration) {
        tracing::debug!(
            generation = self.generation,
            ?start_delay,
            delay = ?self.delay,
            "Scheduler instance waiting to start"
        );
        if timer::wait(start_delay, SignalKind::Refresh, &mut self.cancel).await == Wait::Cancelled
        {
            tracing::debug!(
                generation = self.generation,
                "Scheduler instance cancelled before its first tick"
            );
            return;
        }
        let mut first_tick = true;
        loop {
            if self.superseded() {
                tracing::trace!(
                    generation = self.generation,
                    "Scheduler instance superseded by a newer one"
                );
                return;
            }
            if self.registry.session().token_expired() {
                tracing::info!(
                    generation = self.generation,
                    "Session expired, stopping the refresh scheduler"
                );
                return;
            }
            if !self.registry.session().version_compatible() {
                // The skipped tick consumes neither the first-tick flags nor
                // the last-refresh timestamp.
                tracing::debug!(
                    generation = self.generation,
                    "Engine version below the minimum, skipping this refresh tick"
                );
            } else {
                let flags = match first_tick {
                    true => self.flags,
                    false => RefreshFlags::default(),
                };
                first_tick = false;
                self.registry.stamp_refresh();
                let request = RefreshRequest {
                    target: self.registry.target_page(),
                    flags,
                };
                if self.refresh_channel.send(request).await.is_err() {
                    tracing::warn!("The refresh worker is gone, stopping the scheduler instance");
                    return;
                }
            }
            if timer::wait(self.delay, SignalKind::Refresh, &mut self.cancel).await
                == Wait::Cancelled
            {
                tracing::debug!(generation = self.generation, "Scheduler instance stopped");
                return;
            }
        }
    }

    fn superseded(&self) -> bool {
        self.current_generation.load(Ordering::Acquire) != self.generation
    }
}

/// The delay before a new instance's first tick, carrying over the time
/// already elapsed since the last refresh. Restarting must neither reset the
/// full wait window (frequent reconfiguration would starve refreshes) nor
/// ignore elapsed time (a restart right before a due tick would burst).
pub(crate) fn effective_start_delay(config: &DelayConfig, last_refresh: Option<Instant>) -> Duration {
    if let Some(start_delay) = config.start_delay {
        return start_delay;
    }
    match last_refresh {
        // Nothing was ever refreshed: tick right away.
        None => Duration::ZERO,
        Some(last) => {
            let elapsed = last.elapsed().as_secs_f64().round() as u64;
            let delay = config.delay.as_secs();
            match elapsed > delay {
                true => Duration::ZERO,
                false => Duration::from_secs(delay - elapsed),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn carry_over_subtracts_the_elapsed_time() {
        let config = DelayConfig::new(Duration::from_secs(300));
        let last = Instant::now() - Duration::from_secs(90);
        assert_eq!(
            effective_start_delay(&config, Some(last)),
            Duration::from_secs(210)
        );
    }

    #[test]
    fn carry_over_saturates_at_zero() {
        let config = DelayConfig::new(Duration::from_secs(300));
        let last = Instant::now() - Duration::from_secs(400);
        assert_eq!(effective_start_delay(&config, Some(last)), Duration::ZERO);
    }

    #[test]
    fn no_previous_refresh_starts_immediately() {
        let config = DelayConfig::new(Duration::from_secs(300));
        assert_eq!(effective_start_delay(&config, None), Duration::ZERO);
    }

    #[test]
    fn an_explicit_start_delay_wins_over_carry_over() {
        let config =
            DelayConfig::new(Duration::from_secs(300)).with_start_delay(Duration::from_secs(7));
        let last = Instant::now() - Duration::from_secs(90);
        assert_eq!(
            effective_start_delay(&config, Some(last)),
            Duration::from_secs(7)
        );
    }
}
