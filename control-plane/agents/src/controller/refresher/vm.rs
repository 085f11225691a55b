//! Refresh of the single vm behind the detail, create and console pages.

use crate::{
    controller::{registry::Registry, scheduler::RefreshRequest},
    errors::SvcError,
};

/// Refresh the vm shown by the detail or create page. A manual refresh also
/// reloads the removable-media images; the timed cadence skips them to avoid
/// redundant load.
pub(super) async fn refresh(registry: &Registry, request: &RefreshRequest) -> Result<(), SvcError> {
    refresh_vm(registry, request).await?;
    if request.flags.manual_refresh {
        let images = registry.client().iso_images().await?;
        registry.set_iso_images(images);
    }
    Ok(())
}

/// Refresh the vm behind the console page.
pub(super) async fn refresh_console(
    registry: &Registry,
    request: &RefreshRequest,
) -> Result<(), SvcError> {
    refresh_vm(registry, request).await
}

async fn refresh_vm(registry: &Registry, request: &RefreshRequest) -> Result<(), SvcError> {
    let Some(id) = &request.target.id else {
        tracing::warn!(page = %request.target.kind, "No vm id recorded for the current page");
        return Ok(());
    };
    match registry.client().vm(id).await? {
        Some(vm) => registry.insert_vm(vm),
        None => {
            tracing::debug!(vm.id = %id, "Vm no longer exists on the remote engine, pruning");
            registry.remove_vm(id);
        }
    }
    Ok(())
}
