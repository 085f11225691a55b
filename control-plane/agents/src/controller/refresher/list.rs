//! Reconciliation of the list page collections against the remote engine.
//! The windowed re-fetch is authoritative for additions and updates; for
//! disappearances it is not, since an entity missing from a window may be
//! pagination drift. Only a direct not-found confirms an entity is gone.

use crate::{controller::registry::Registry, errors::SvcError};
use console_port::types::{Vm, VmPool};
use futures::future::join_all;
use std::collections::HashSet;

/// Number of entities fetched per list page.
pub(crate) const PAGE_SIZE: usize = 20;

/// Refresh the list page: an initial fetch of both sub-collections on the
/// first call, afterwards a windowed re-fetch of each sub-collection plus
/// pruning of the entities which disappeared remotely. The derived counters
/// are recomputed once both sub-collections are reconciled.
pub(super) async fn refresh(registry: &Registry) -> Result<(), SvcError> {
    if !registry.list_initialized() {
        let (vms, pools) = tokio::join!(
            registry.client().vms(PAGE_SIZE),
            registry.client().pools(PAGE_SIZE)
        );
        for vm in vms? {
            registry.insert_vm(vm);
        }
        for pool in pools? {
            registry.insert_pool(pool);
        }
        registry.set_list_initialized();
    } else {
        let (vms, pools) = tokio::join!(
            registry.client().vms(window(registry.vm_ids().len())),
            registry.client().pools(window(registry.pool_ids().len()))
        );
        let (vms, pools) = (vms?, pools?);
        let (vms, pools) = tokio::join!(
            reconcile_vms(registry, vms),
            reconcile_pools(registry, pools)
        );
        vms?;
        pools?;
    }
    registry.recompute_counts();
    Ok(())
}

/// The re-fetch window: the loaded count rounded up to a full page.
fn window(cached: usize) -> usize {
    cached.max(1).div_ceil(PAGE_SIZE) * PAGE_SIZE
}

/// Merge the fresh vm window and prune cached vms the remote no longer knows.
async fn reconcile_vms(registry: &Registry, fetched: Vec<Vm>) -> Result<(), SvcError> {
    let cached = registry.vm_ids();
    let fresh = fetched.iter().map(|vm| vm.id.clone()).collect::<HashSet<_>>();
    for vm in fetched {
        registry.insert_vm(vm);
    }
    let missing = cached
        .into_iter()
        .filter(|id| !fresh.contains(id))
        .collect::<Vec<_>>();
    let queried = join_all(missing.iter().map(|id| registry.client().vm(id))).await;
    for (id, result) in missing.iter().zip(queried) {
        match result? {
            Some(vm) => registry.insert_vm(vm),
            None => {
                tracing::debug!(vm.id = %id, "Vm no longer exists on the remote engine, pruning");
                registry.remove_vm(id);
            }
        }
    }
    Ok(())
}

/// Merge the fresh pool window and prune cached pools the remote no longer
/// knows.
async fn reconcile_pools(registry: &Registry, fetched: Vec<VmPool>) -> Result<(), SvcError> {
    let cached = registry.pool_ids();
    let fresh = fetched
        .iter()
        .map(|pool| pool.id.clone())
        .collect::<HashSet<_>>();
    for pool in fetched {
        registry.insert_pool(pool);
    }
    let missing = cached
        .into_iter()
        .filter(|id| !fresh.contains(id))
        .collect::<Vec<_>>();
    let queried = join_all(missing.iter().map(|id| registry.client().pool(id))).await;
    for (id, result) in missing.iter().zip(queried) {
        match result? {
            Some(pool) => registry.insert_pool(pool),
            None => {
                tracing::debug!(pool.id = %id, "Pool no longer exists on the remote engine, pruning");
                registry.remove_pool(id);
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::mock::{self, vm_named};
    use console_port::types::VmStatus;

    #[tokio::test]
    async fn the_first_refresh_fetches_both_collections() {
        let (registry, mocks) = mock::registry();
        mocks
            .client
            .set_list_vms(vec![vm_named("a"), vm_named("b")]);

        refresh(&registry).await.unwrap();

        assert!(registry.list_initialized());
        assert_eq!(registry.vm_ids().len(), 2);
        assert_eq!(registry.counts().vms, 2);
    }

    #[tokio::test]
    async fn a_vanished_vm_is_only_pruned_after_a_direct_not_found() {
        let (registry, mocks) = mock::registry();
        let (a, b, c) = (vm_named("a"), vm_named("b"), vm_named("c"));
        for vm in [&a, &b, &c] {
            registry.insert_vm(vm.clone());
        }
        registry.set_list_initialized();

        // The windowed re-fetch no longer returns b; its direct query 404s.
        mocks.client.set_list_vms(vec![a.clone(), c.clone()]);
        refresh(&registry).await.unwrap();

        assert_eq!(mocks.client.direct_vm_queries(), 1);
        assert_eq!(registry.vm(&b.id), None);
        assert!(registry.vm(&a.id).is_some());
        assert!(registry.vm(&c.id).is_some());
        assert_eq!(registry.counts().vms, 2);
    }

    #[tokio::test]
    async fn a_vm_missing_from_the_window_survives_when_directly_found() {
        let (registry, mocks) = mock::registry();
        let (a, b, c) = (vm_named("a"), vm_named("b"), vm_named("c"));
        for vm in [&a, &b, &c] {
            registry.insert_vm(vm.clone());
        }
        registry.set_list_initialized();

        // b is absent from the window due to pagination drift, yet the direct
        // query still finds it.
        mocks.client.set_list_vms(vec![a.clone(), c.clone()]);
        mocks.client.set_direct_vm(b.clone());
        refresh(&registry).await.unwrap();

        assert_eq!(mocks.client.direct_vm_queries(), 1);
        assert!(registry.vm(&b.id).is_some());
        assert_eq!(registry.counts().vms, 3);
    }

    #[tokio::test]
    async fn pools_are_reconciled_alongside_the_vms() {
        let (registry, mocks) = mock::registry();
        let (a, b, c) = (
            mock::pool_named("a"),
            mock::pool_named("b"),
            mock::pool_named("c"),
        );
        for pool in [&a, &b, &c] {
            registry.insert_pool(pool.clone());
        }
        registry.set_list_initialized();

        // b drifted out of the window yet still exists; c is truly gone.
        mocks.client.set_list_pools(vec![a.clone()]);
        mocks.client.set_direct_pool(b.clone());
        refresh(&registry).await.unwrap();

        assert!(registry.pool(&a.id).is_some());
        assert!(registry.pool(&b.id).is_some());
        assert_eq!(registry.pool(&c.id), None);
        assert_eq!(registry.counts().pools, 2);
    }

    #[tokio::test]
    async fn fresh_state_overwrites_the_cached_one() {
        let (registry, mocks) = mock::registry();
        let mut a = vm_named("a");
        a.status = VmStatus::Down;
        registry.insert_vm(a.clone());
        registry.set_list_initialized();

        a.status = VmStatus::Up;
        mocks.client.set_list_vms(vec![a.clone()]);
        refresh(&registry).await.unwrap();

        assert_eq!(registry.vm(&a.id).unwrap().status, VmStatus::Up);
        assert_eq!(registry.counts().vms_up, 1);
    }

    #[tokio::test]
    async fn transport_errors_propagate_without_pruning() {
        let (registry, mocks) = mock::registry();
        registry.insert_vm(vm_named("a"));
        registry.set_list_initialized();

        mocks.client.fail_next();
        let result = refresh(&registry).await;

        assert!(result.is_err());
        assert_eq!(registry.vm_ids().len(), 1);
    }

    #[test]
    fn the_window_rounds_up_to_a_full_page() {
        assert_eq!(window(0), PAGE_SIZE);
        assert_eq!(window(1), PAGE_SIZE);
        assert_eq!(window(PAGE_SIZE), PAGE_SIZE);
        assert_eq!(window(PAGE_SIZE + 1), 2 * PAGE_SIZE);
    }

    #[tokio::test]
    async fn reconciliation_queries_only_the_missing_ids() {
        let (registry, mocks) = mock::registry();
        let (a, b) = (vm_named("a"), vm_named("b"));
        registry.insert_vm(a.clone());
        registry.insert_vm(b.clone());
        registry.set_list_initialized();

        mocks.client.set_list_vms(vec![a, b]);
        refresh(&registry).await.unwrap();

        assert_eq!(mocks.client.direct_vm_queries(), 0);
    }
}
