//! Contracts between the refresh agent and its collaborators: the remote
//! engine client, the session/health layer and the console UI surfaces.
//! The agent owns no transport of its own; everything it knows about the
//! remote system of record arrives through these traits.

use crate::types::{
    AttachmentId, DiskAttachment, IsoImage, PoolId, UserOptions, Vm, VmId, VmPool,
};
use async_trait::async_trait;
use snafu::Snafu;
use std::fmt::Debug;
use strum_macros::{AsRefStr, Display};

/// All the different variants of resources fetched from the remote engine.
#[derive(Debug, Clone, Copy, Eq, PartialEq, AsRefStr, Display)]
#[allow(missing_docs)]
pub enum ResourceKind {
    Vm,
    VmPool,
    DiskAttachment,
    IsoImage,
    UserOptions,
    Unknown,
}

/// Error at the transport boundary towards the remote engine.
/// Not-found is not an error: snapshot reads report it as an absent value.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
#[allow(missing_docs)]
pub enum ClientError {
    #[snafu(display("Request '{}' for '{}' failed: {}", request, resource, reason))]
    Request {
        resource: ResourceKind,
        request: String,
        reason: String,
    },
    #[snafu(display("The remote engine endpoint is not reachable: {}", reason))]
    Unreachable { reason: String },
    #[snafu(display("Failed to deserialise the '{}' payload", resource))]
    Deserialise {
        resource: ResourceKind,
        source: serde_json::Error,
    },
}

/// Snapshot reads from the remote system of record.
/// Single-entity reads return `Ok(None)` when the remote explicitly reports
/// the entity as gone; transport failures are errors and are never retried
/// at this level.
#[async_trait]
pub trait RemoteClient: Send + Sync + Debug {
    /// List up to `max_results` vms.
    async fn vms(&self, max_results: usize) -> Result<Vec<Vm>, ClientError>;
    /// Get a single vm by id.
    async fn vm(&self, id: &VmId) -> Result<Option<Vm>, ClientError>;
    /// List up to `max_results` vm pools.
    async fn pools(&self, max_results: usize) -> Result<Vec<VmPool>, ClientError>;
    /// Get a single vm pool by id.
    async fn pool(&self, id: &PoolId) -> Result<Option<VmPool>, ClientError>;
    /// Get a single disk attachment of a vm.
    async fn disk_attachment(
        &self,
        vm: &VmId,
        id: &AttachmentId,
    ) -> Result<Option<DiskAttachment>, ClientError>;
    /// List the removable-media images available to attach.
    async fn iso_images(&self) -> Result<Vec<IsoImage>, ClientError>;
    /// Reload the user options.
    async fn user_options(&self) -> Result<UserOptions, ClientError>;
}

/// Point-in-time session and compatibility reads, checked by the scheduler
/// before every tick.
pub trait SessionGate: Send + Sync + Debug {
    /// Whether the session token is known to have expired.
    fn token_expired(&self) -> bool;
    /// Whether the remote engine API version satisfies the console's minimum.
    fn version_compatible(&self) -> bool;
}

/// Resumes a suppressed notification stream once a snooze ends.
pub trait NotificationGate: Send + Sync + Debug {
    /// Resume the notification stream.
    fn resume(&self);
}

/// User-visible sink for transport errors raised while refreshing.
pub trait MessageSink: Send + Sync + Debug {
    /// Surface a failure to the user.
    fn failure(&self, message: String);
}
