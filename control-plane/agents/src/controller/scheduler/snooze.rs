//! Temporary suppression of the console notification stream. A snooze is a
//! single-shot cancellable delay which resumes the stream when it elapses;
//! a second snooze simply cancels and replaces the first, so no staleness
//! counter is needed.

use super::timer::{self, SignalKind, Wait};
use console_port::transport_api::NotificationGate;
use std::{sync::Arc, time::Duration};
use tokio::sync::broadcast;

/// Minutes value treated as "snooze until explicitly resumed".
pub(crate) const SNOOZE_FOREVER: u64 = u64::MAX;

/// A single-shot snooze of the notification stream.
#[derive(Debug)]
pub(crate) struct NotificationSnooze {
    minutes: u64,
    cancel: broadcast::Receiver<SignalKind>,
    notifications: Arc<dyn NotificationGate>,
}

impl NotificationSnooze {
    /// Return a new `Self` resuming through the given gate.
    pub(super) fn new(
        minutes: u64,
        cancel: broadcast::Receiver<SignalKind>,
        notifications: Arc<dyn NotificationGate>,
    ) -> Self {
        Self {
            minutes,
            cancel,
            notifications,
        }
    }

    /// Wait out the snooze and resume notifications, unless cancelled first.
    pub(super) async fn run(mut self) {
        if self.minutes == SNOOZE_FOREVER {
            tracing::info!("Notifications snoozed until explicitly resumed");
            timer::cancelled(SignalKind::Snooze, &mut self.cancel).await;
            tracing::debug!("Indefinite snooze cancelled");
            return;
        }
        let duration = Duration::from_secs(self.minutes.saturating_mul(60));
        tracing::info!(minutes = self.minutes, "Notifications snoozed");
        match timer::wait(duration, SignalKind::Snooze, &mut self.cancel).await {
            Wait::Elapsed => {
                tracing::info!(minutes = self.minutes, "Snooze elapsed, resuming notifications");
                self.notifications.resume();
            }
            Wait::Cancelled => {
                tracing::debug!("Snooze cancelled");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::mock::MockNotifications;

    #[tokio::test(start_paused = true)]
    async fn resumes_once_the_snooze_elapses() {
        let (sender, _keep) = broadcast::channel(8);
        let notifications = Arc::new(MockNotifications::default());

        let snooze = NotificationSnooze::new(5, sender.subscribe(), notifications.clone());
        let task = tokio::spawn(snooze.run());

        tokio::time::sleep(Duration::from_secs(5 * 60 + 1)).await;
        task.await.unwrap();
        assert_eq!(notifications.resumed(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn an_indefinite_snooze_never_resumes() {
        let (sender, _keep) = broadcast::channel(8);
        let notifications = Arc::new(MockNotifications::default());

        let snooze =
            NotificationSnooze::new(SNOOZE_FOREVER, sender.subscribe(), notifications.clone());
        let task = tokio::spawn(snooze.run());
        tokio::task::yield_now().await;

        // A year of paused time goes by without the stream resuming.
        tokio::time::advance(Duration::from_secs(365 * 24 * 3600)).await;
        tokio::task::yield_now().await;
        assert_eq!(notifications.resumed(), 0);

        // Only the explicit cancellation ends it, still without resuming.
        sender.send(SignalKind::Snooze).unwrap();
        task.await.unwrap();
        assert_eq!(notifications.resumed(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn a_new_snooze_replaces_the_pending_one() {
        let (sender, _keep) = broadcast::channel(8);
        let notifications = Arc::new(MockNotifications::default());

        let first = NotificationSnooze::new(5, sender.subscribe(), notifications.clone());
        let first = tokio::spawn(first.run());
        tokio::task::yield_now().await;

        // What the scheduler worker does on a second snooze command.
        sender.send(SignalKind::Snooze).unwrap();
        let second = NotificationSnooze::new(1, sender.subscribe(), notifications.clone());
        let second = tokio::spawn(second.run());

        tokio::time::sleep(Duration::from_secs(60 + 1)).await;
        first.await.unwrap();
        second.await.unwrap();
        // Only the replacement resumed the stream, and only once.
        assert_eq!(notifications.resumed(), 1);
    }
}
