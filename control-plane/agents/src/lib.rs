#![warn(missing_docs)]
//! The console control-plane refresh agent library: the shared-state
//! registry, the page-aware refresh scheduler and the bounded
//! eventually-consistent operation poller, behind the collaborator contracts
//! defined by `console-port`.

/// The controller logic of the refresh agent.
pub mod controller;
/// Agent level errors.
pub mod errors;
