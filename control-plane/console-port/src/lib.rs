#![warn(missing_docs)]
//! Shared types and collaborator contracts for the console control-plane.
//! The refresh agent consumes these; the remote engine client, the UI state
//! store and the session layer implement them.

/// Collaborator traits and errors at the transport boundary.
pub mod transport_api;
/// The cached-state types synchronized from the remote system of record.
pub mod types;
