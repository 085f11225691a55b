//! Registry containing the locally cached snapshot of the remote system of
//! record (vms, pools, removable media, user options) together with the
//! refresh scheduler control.
//!
//! The cache is merge-per-entity-id and last-writer-wins: refresh routines
//! and in-flight confirmation pollers may write concurrently for different
//! ids without conflict, and the most recent write wins for the same id.
//! The scheduler is the single writer of the generation counter and of the
//! last-refresh timestamp; both are only ever read by instances checking
//! staleness or computing carry-over.

use crate::{
    controller::scheduler::{SchedulerCommand, SchedulerControl},
    errors::{InvalidDelaySnafu, SvcError},
};
use console_port::{
    transport_api::{MessageSink, NotificationGate, RemoteClient, SessionGate},
    types::{
        AttachmentId, DelayConfig, DiskAttachment, IsoImage, ListCounts, PoolId, RefreshFlags,
        TargetPage, UserOptions, Vm, VmId, VmPool, VmStatus,
    },
};
use parking_lot::{Mutex, RwLock};
use snafu::ensure;
use std::{
    collections::HashMap,
    ops::Deref,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::Instant,
};

/// Registry containing the cached console state and the scheduler control.
#[derive(Clone, Debug)]
pub struct Registry {
    inner: Arc<RegistryInner>,
}

impl Deref for Registry {
    type Target = Arc<RegistryInner>;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

/// Registry Inner holding the caches and the collaborator handles.
#[derive(Debug)]
pub struct RegistryInner {
    /// The cached vms, keyed by id.
    vms: RwLock<HashMap<VmId, Vm>>,
    /// The cached vm pools, keyed by id.
    pools: RwLock<HashMap<PoolId, VmPool>>,
    /// The removable-media images available to attach.
    iso_images: RwLock<Vec<IsoImage>>,
    /// The most recently reloaded user options.
    user_options: RwLock<Option<UserOptions>>,
    /// Aggregate counters derived from the list collections.
    counts: RwLock<ListCounts>,
    /// What the scheduler should refresh; set on navigation, read every tick.
    target: RwLock<TargetPage>,
    /// Instant of the last dispatched refresh tick.
    last_refresh: Mutex<Option<Instant>>,
    /// Whether the list collections went through their initial fetch.
    list_initialized: AtomicBool,
    client: Arc<dyn RemoteClient>,
    session: Arc<dyn SessionGate>,
    notifications: Arc<dyn NotificationGate>,
    messages: Arc<dyn MessageSink>,
    scheduler: SchedulerControl,
}

impl Registry {
    /// Create a new registry wired to the given collaborators.
    pub fn new(
        client: Arc<dyn RemoteClient>,
        session: Arc<dyn SessionGate>,
        notifications: Arc<dyn NotificationGate>,
        messages: Arc<dyn MessageSink>,
    ) -> Self {
        Self {
            inner: Arc::new(RegistryInner {
                vms: Default::default(),
                pools: Default::default(),
                iso_images: Default::default(),
                user_options: Default::default(),
                counts: Default::default(),
                target: Default::default(),
                last_refresh: Default::default(),
                list_initialized: AtomicBool::new(false),
                client,
                session,
                notifications,
                messages,
                scheduler: SchedulerControl::new(),
            }),
        }
    }

    /// Start the scheduler worker tasks.
    pub async fn start(&self) {
        self.scheduler.start(self.clone()).await;
    }

    /// Stop the running scheduler instance.
    pub async fn stop(&self) {
        self.stop_scheduler().await;
    }

    /// Start (or restart) the refresh scheduler with the given cadence.
    /// An invalid cadence is rejected up front, before any running instance
    /// is stopped, so it cannot take down a healthy scheduler.
    pub async fn start_scheduler(
        &self,
        config: DelayConfig,
        target: TargetPage,
        flags: RefreshFlags,
    ) -> Result<(), SvcError> {
        ensure!(
            config.valid(),
            InvalidDelaySnafu {
                delay: config.delay
            }
        );
        self.scheduler
            .send(SchedulerCommand::Start {
                config,
                target,
                flags,
            })
            .await;
        Ok(())
    }

    /// Stop the running scheduler instance, if any.
    pub async fn stop_scheduler(&self) {
        self.scheduler.send(SchedulerCommand::Stop).await;
    }

    /// Record a navigation and refresh the new page immediately.
    pub async fn change_page(&self, target: TargetPage) {
        self.scheduler
            .send(SchedulerCommand::ChangePage { target })
            .await;
    }

    /// Refresh the current page immediately at the user's request.
    pub async fn manual_refresh(&self) {
        self.scheduler.send(SchedulerCommand::ManualRefresh).await;
    }

    /// Suppress notifications for the given number of minutes.
    pub async fn snooze_notifications(&self, minutes: u64) {
        self.scheduler
            .send(SchedulerCommand::Snooze { minutes })
            .await;
    }

    /// Resume a suppressed notification stream.
    pub async fn resume_notifications(&self) {
        self.scheduler
            .send(SchedulerCommand::ResumeNotifications)
            .await;
    }

    /// Get a reference to the remote-state client.
    pub(crate) fn client(&self) -> &Arc<dyn RemoteClient> {
        &self.client
    }
    /// Get a reference to the session gate.
    pub(crate) fn session(&self) -> &Arc<dyn SessionGate> {
        &self.session
    }
    /// Get a reference to the notification gate.
    pub(crate) fn notifications(&self) -> &Arc<dyn NotificationGate> {
        &self.notifications
    }
    /// Get a reference to the user-visible message sink.
    pub(crate) fn messages(&self) -> &Arc<dyn MessageSink> {
        &self.messages
    }

    /// The page the scheduler should refresh.
    pub(crate) fn target_page(&self) -> TargetPage {
        self.target.read().clone()
    }
    /// Record the page the scheduler should refresh.
    pub(crate) fn set_target_page(&self, target: TargetPage) {
        *self.target.write() = target;
    }

    /// Instant of the last dispatched refresh tick.
    pub(crate) fn last_refresh(&self) -> Option<Instant> {
        *self.last_refresh.lock()
    }
    /// Stamp the last-refresh timestamp with the current instant.
    pub(crate) fn stamp_refresh(&self) {
        *self.last_refresh.lock() = Some(Instant::now());
    }

    /// Whether the list collections went through their initial fetch.
    pub(crate) fn list_initialized(&self) -> bool {
        self.list_initialized.load(Ordering::Acquire)
    }
    /// Mark the list collections as initially fetched.
    pub(crate) fn set_list_initialized(&self) {
        self.list_initialized.store(true, Ordering::Release);
    }

    /// Ids of all currently cached vms.
    pub fn vm_ids(&self) -> Vec<VmId> {
        self.vms.read().keys().cloned().collect()
    }
    /// Get a cached vm by id.
    pub fn vm(&self, id: &VmId) -> Option<Vm> {
        self.vms.read().get(id).cloned()
    }
    /// Merge a vm into the cache, replacing any previous state for its id.
    pub(crate) fn insert_vm(&self, vm: Vm) {
        self.vms.write().insert(vm.id.clone(), vm);
    }
    /// Prune a vm from the cache.
    pub(crate) fn remove_vm(&self, id: &VmId) {
        self.vms.write().remove(id);
    }

    /// Ids of all currently cached pools.
    pub fn pool_ids(&self) -> Vec<PoolId> {
        self.pools.read().keys().cloned().collect()
    }
    /// Get a cached pool by id.
    pub fn pool(&self, id: &PoolId) -> Option<VmPool> {
        self.pools.read().get(id).cloned()
    }
    /// Merge a pool into the cache, replacing any previous state for its id.
    pub(crate) fn insert_pool(&self, pool: VmPool) {
        self.pools.write().insert(pool.id.clone(), pool);
    }
    /// Prune a pool from the cache.
    pub(crate) fn remove_pool(&self, id: &PoolId) {
        self.pools.write().remove(id);
    }

    /// Merge an observed disk attachment into its vm's cached state.
    pub(crate) fn cache_attachment(&self, vm_id: &VmId, attachment: DiskAttachment) {
        let mut vms = self.vms.write();
        let Some(vm) = vms.get_mut(vm_id) else {
            return;
        };
        match vm
            .disk_attachments
            .iter_mut()
            .find(|cached| cached.id == attachment.id)
        {
            Some(cached) => *cached = attachment,
            None => vm.disk_attachments.push(attachment),
        }
    }
    /// Prune a disk attachment from its vm's cached state.
    pub(crate) fn remove_attachment(&self, vm_id: &VmId, attachment_id: &AttachmentId) {
        let mut vms = self.vms.write();
        if let Some(vm) = vms.get_mut(vm_id) {
            vm.disk_attachments
                .retain(|attachment| &attachment.id != attachment_id);
        }
    }

    /// Replace the removable-media image cache.
    pub(crate) fn set_iso_images(&self, images: Vec<IsoImage>) {
        *self.iso_images.write() = images;
    }
    /// The cached removable-media images.
    pub fn iso_images(&self) -> Vec<IsoImage> {
        self.iso_images.read().clone()
    }

    /// Replace the cached user options.
    pub(crate) fn set_user_options(&self, options: UserOptions) {
        *self.user_options.write() = Some(options);
    }
    /// The cached user options.
    pub fn user_options(&self) -> Option<UserOptions> {
        self.user_options.read().clone()
    }

    /// The aggregate counters derived from the list collections.
    pub fn counts(&self) -> ListCounts {
        self.counts.read().clone()
    }
    /// Recompute the aggregate counters from the cached collections.
    pub(crate) fn recompute_counts(&self) {
        let vms = self.vms.read();
        let counts = ListCounts {
            vms: vms.len(),
            vms_up: vms
                .values()
                .filter(|vm| vm.status == VmStatus::Up)
                .count(),
            vms_down: vms
                .values()
                .filter(|vm| vm.status == VmStatus::Down)
                .count(),
            pools: self.pools.read().len(),
        };
        drop(vms);
        *self.counts.write() = counts;
    }
}
