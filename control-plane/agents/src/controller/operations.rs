//! Confirmation of fire-and-forget remote mutations. The engine acknowledges
//! these requests before applying them, so completion must be confirmed by
//! re-querying state through the bounded poller. An unconfirmed outcome is
//! reported back as such, never raised as an error: callers leave the local
//! state pending and let the refresh cadence catch up eventually.

use super::{
    eventual::{self, PollMatch},
    registry::Registry,
};
use crate::errors::SvcError;
use console_port::types::{AttachmentId, VmId};

/// Confirm that a disk attachment's bootable flag reached the expected value.
#[tracing::instrument(level = "debug", skip(registry), fields(vm.id = %vm_id, attachment.id = %attachment_id))]
pub async fn confirm_attachment_bootable(
    registry: &Registry,
    vm_id: &VmId,
    attachment_id: &AttachmentId,
    bootable: bool,
) -> Result<PollMatch, SvcError> {
    let client = registry.client().clone();
    let matched = eventual::poll_until(
        || client.disk_attachment(vm_id, attachment_id),
        |attachment| attachment.bootable == bootable,
        false,
        |attachment| registry.cache_attachment(vm_id, attachment.clone()),
    )
    .await?;
    if matched == PollMatch::Unconfirmed {
        tracing::debug!("Bootable flag change unconfirmed after the poll budget");
    }
    Ok(matched)
}

/// Confirm that a disk attachment is gone from the remote engine, pruning it
/// from the cache once the remote reports it as not found.
#[tracing::instrument(level = "debug", skip(registry), fields(vm.id = %vm_id, attachment.id = %attachment_id))]
pub async fn confirm_attachment_removed(
    registry: &Registry,
    vm_id: &VmId,
    attachment_id: &AttachmentId,
) -> Result<PollMatch, SvcError> {
    let client = registry.client().clone();
    let matched = eventual::poll_until(
        || client.disk_attachment(vm_id, attachment_id),
        |_| false,
        true,
        |attachment| registry.cache_attachment(vm_id, attachment.clone()),
    )
    .await?;
    match matched {
        PollMatch::Matched => registry.remove_attachment(vm_id, attachment_id),
        PollMatch::Unconfirmed => {
            tracing::debug!("Disk removal unconfirmed after the poll budget");
        }
    }
    Ok(matched)
}

/// Wait for a vm to leave the transitional image-locked state.
#[tracing::instrument(level = "debug", skip(registry), fields(vm.id = %vm_id))]
pub async fn await_image_unlock(
    registry: &Registry,
    vm_id: &VmId,
) -> Result<PollMatch, SvcError> {
    let client = registry.client().clone();
    let matched = eventual::poll_until(
        || client.vm(vm_id),
        |vm| !vm.image_locked(),
        false,
        |vm| registry.insert_vm(vm.clone()),
    )
    .await?;
    if matched == PollMatch::Unconfirmed {
        tracing::debug!("Vm image still locked after the poll budget");
    }
    Ok(matched)
}
