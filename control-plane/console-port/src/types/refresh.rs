use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Cadence configuration for the refresh scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DelayConfig {
    /// Fixed delay between refresh ticks.
    pub delay: Duration,
    /// Explicit delay before the first tick; `None` carries over the time
    /// already elapsed since the last refresh.
    pub start_delay: Option<Duration>,
}

impl DelayConfig {
    /// A config ticking at the given delay, carrying over elapsed time on
    /// (re)start.
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            start_delay: None,
        }
    }
    /// Override the delay before the first tick.
    pub fn with_start_delay(mut self, start_delay: Duration) -> Self {
        self.start_delay = Some(start_delay);
        self
    }
    /// The scheduler declines to start with a non-positive tick delay.
    pub fn valid(&self) -> bool {
        !self.delay.is_zero()
    }
}

/// Why a refresh tick was requested, beyond the timer having elapsed.
/// Set on the first tick of a scheduler instance only.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RefreshFlags {
    /// First refresh after a page navigation.
    pub page_router_refresh: bool,
    /// First refresh after an explicit user request.
    pub manual_refresh: bool,
}

impl RefreshFlags {
    /// Flags for a navigation-triggered refresh.
    pub fn page_router() -> Self {
        Self {
            page_router_refresh: true,
            manual_refresh: false,
        }
    }
    /// Flags for a user-triggered refresh.
    pub fn manual() -> Self {
        Self {
            page_router_refresh: false,
            manual_refresh: true,
        }
    }
}

/// Aggregate counters derived from the cached list collections.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ListCounts {
    /// Total number of cached vms.
    pub vms: usize,
    /// Vms currently in the `Up` state.
    pub vms_up: usize,
    /// Vms currently in the `Down` state.
    pub vms_down: usize,
    /// Total number of cached pools.
    pub pools: usize,
}

/// User-tunable console options, reloaded from the remote engine when the
/// settings page refreshes.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UserOptions {
    /// Refresh interval selected by the user, in seconds.
    pub refresh_interval: u64,
    /// Whether desktop notifications are enabled.
    pub notifications: bool,
    /// Preferred console locale.
    pub locale: String,
}
