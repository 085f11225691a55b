//! The controller logic of the refresh agent: the shared-state registry, the
//! refresh scheduler and its timers, the page refresh routines and the
//! bounded confirmation poller.

/// The bounded eventually-consistent operation poller.
pub mod eventual;
/// Confirmation operations for fire-and-forget remote mutations.
pub mod operations;
/// The page refresh routines and their worker.
pub(crate) mod refresher;
/// The shared-state registry.
pub mod registry;
/// The refresh scheduler, its timers and the notification snooze.
pub(crate) mod scheduler;

/// Test doubles for the collaborator traits.
#[cfg(test)]
pub(crate) mod mock;
