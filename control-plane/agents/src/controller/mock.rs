//! Test doubles for the collaborator traits.

use super::registry::Registry;
use async_trait::async_trait;
use console_port::{
    transport_api::{
        ClientError, MessageSink, NotificationGate, RemoteClient, ResourceKind, SessionGate,
    },
    types::{
        AttachmentId, DiskAttachment, DiskStatus, IsoImage, PoolId, UserOptions, Vm, VmId, VmPool,
        VmStatus,
    },
};
use parking_lot::Mutex;
use std::{
    collections::{HashMap, VecDeque},
    sync::{
        atomic::{AtomicBool, AtomicUsize, Ordering},
        Arc,
    },
};

/// The collaborator doubles backing a mock registry.
pub(crate) struct Mocks {
    pub(crate) client: Arc<MockClient>,
    pub(crate) session: Arc<MockSession>,
    pub(crate) notifications: Arc<MockNotifications>,
    pub(crate) messages: Arc<MockMessages>,
}

/// A registry wired to fresh mocks.
pub(crate) fn registry() -> (Registry, Mocks) {
    let mocks = Mocks {
        client: Arc::new(MockClient::default()),
        session: Arc::new(MockSession::default()),
        notifications: Arc::new(MockNotifications::default()),
        messages: Arc::new(MockMessages::default()),
    };
    let registry = Registry::new(
        mocks.client.clone(),
        mocks.session.clone(),
        mocks.notifications.clone(),
        mocks.messages.clone(),
    );
    (registry, mocks)
}

/// A vm with a stable id derived from its name.
pub(crate) fn vm_named(name: &str) -> Vm {
    Vm {
        id: VmId::from(format!("vm-{name}")),
        name: name.to_string(),
        status: VmStatus::Up,
        disk_attachments: vec![],
    }
}

/// A pool with a stable id derived from its name.
pub(crate) fn pool_named(name: &str) -> VmPool {
    VmPool {
        id: PoolId::from(format!("pool-{name}")),
        name: name.to_string(),
        max_vms: 4,
        vms_in_use: 1,
    }
}

/// A disk attachment with a stable id derived from its name.
pub(crate) fn attachment_named(name: &str) -> DiskAttachment {
    DiskAttachment {
        id: AttachmentId::from(format!("attachment-{name}")),
        name: name.to_string(),
        bootable: false,
        status: DiskStatus::Ok,
    }
}

/// Scripted remote-state client. List and direct reads are served from
/// explicit state; attachment and vm scripts replay a sequence of responses,
/// repeating the last one once drained.
#[derive(Debug, Default)]
pub(crate) struct MockClient {
    list_vms: Mutex<Vec<Vm>>,
    list_pools: Mutex<Vec<VmPool>>,
    direct_vms: Mutex<HashMap<VmId, Vm>>,
    direct_pools: Mutex<HashMap<PoolId, VmPool>>,
    vm_script: Mutex<VecDeque<Option<Vm>>>,
    attachment_script: Mutex<VecDeque<Option<DiskAttachment>>>,
    iso_images: Mutex<Vec<IsoImage>>,
    user_options: Mutex<Option<UserOptions>>,
    fail_next: AtomicBool,
    queries: AtomicUsize,
    direct_vm_queries: AtomicUsize,
    attachment_queries: AtomicUsize,
}

impl MockClient {
    pub(crate) fn set_list_vms(&self, vms: Vec<Vm>) {
        *self.list_vms.lock() = vms;
    }
    pub(crate) fn set_list_pools(&self, pools: Vec<VmPool>) {
        *self.list_pools.lock() = pools;
    }
    pub(crate) fn set_direct_vm(&self, vm: Vm) {
        self.direct_vms.lock().insert(vm.id.clone(), vm);
    }
    pub(crate) fn set_direct_pool(&self, pool: VmPool) {
        self.direct_pools.lock().insert(pool.id.clone(), pool);
    }
    /// Replay these responses from `vm()`, repeating the last one.
    pub(crate) fn script_vms(&self, script: Vec<Option<Vm>>) {
        *self.vm_script.lock() = script.into();
    }
    /// Replay these responses from `disk_attachment()`, repeating the last one.
    pub(crate) fn script_attachments(&self, script: Vec<Option<DiskAttachment>>) {
        *self.attachment_script.lock() = script.into();
    }
    pub(crate) fn set_iso_images(&self, images: Vec<IsoImage>) {
        *self.iso_images.lock() = images;
    }
    pub(crate) fn set_user_options(&self, options: UserOptions) {
        *self.user_options.lock() = Some(options);
    }
    /// Fail the next query with a transport error.
    pub(crate) fn fail_next(&self) {
        self.fail_next.store(true, Ordering::Release);
    }
    /// Total number of queries served.
    pub(crate) fn queries(&self) -> usize {
        self.queries.load(Ordering::Acquire)
    }
    /// Number of direct (by-id) vm queries served.
    pub(crate) fn direct_vm_queries(&self) -> usize {
        self.direct_vm_queries.load(Ordering::Acquire)
    }
    /// Number of disk attachment queries served.
    pub(crate) fn attachment_queries(&self) -> usize {
        self.attachment_queries.load(Ordering::Acquire)
    }

    fn checked(&self, resource: ResourceKind) -> Result<(), ClientError> {
        self.queries.fetch_add(1, Ordering::AcqRel);
        match self.fail_next.swap(false, Ordering::AcqRel) {
            true => Err(ClientError::Request {
                resource,
                request: "mock".to_string(),
                reason: "injected failure".to_string(),
            }),
            false => Ok(()),
        }
    }

    fn replay<T: Clone>(script: &Mutex<VecDeque<Option<T>>>) -> Option<Option<T>> {
        let mut script = script.lock();
        match script.len() {
            0 => None,
            1 => Some(script.front().cloned().unwrap()),
            _ => Some(script.pop_front().unwrap()),
        }
    }
}

#[async_trait]
impl RemoteClient for MockClient {
    async fn vms(&self, max_results: usize) -> Result<Vec<Vm>, ClientError> {
        self.checked(ResourceKind::Vm)?;
        Ok(self.list_vms.lock().iter().take(max_results).cloned().collect())
    }

    async fn vm(&self, id: &VmId) -> Result<Option<Vm>, ClientError> {
        self.checked(ResourceKind::Vm)?;
        self.direct_vm_queries.fetch_add(1, Ordering::AcqRel);
        match Self::replay(&self.vm_script) {
            Some(response) => Ok(response),
            None => Ok(self.direct_vms.lock().get(id).cloned()),
        }
    }

    async fn pools(&self, max_results: usize) -> Result<Vec<VmPool>, ClientError> {
        self.checked(ResourceKind::VmPool)?;
        Ok(self
            .list_pools
            .lock()
            .iter()
            .take(max_results)
            .cloned()
            .collect())
    }

    async fn pool(&self, id: &PoolId) -> Result<Option<VmPool>, ClientError> {
        self.checked(ResourceKind::VmPool)?;
        Ok(self.direct_pools.lock().get(id).cloned())
    }

    async fn disk_attachment(
        &self,
        _vm: &VmId,
        _id: &AttachmentId,
    ) -> Result<Option<DiskAttachment>, ClientError> {
        self.checked(ResourceKind::DiskAttachment)?;
        self.attachment_queries.fetch_add(1, Ordering::AcqRel);
        Ok(Self::replay(&self.attachment_script).unwrap_or(None))
    }

    async fn iso_images(&self) -> Result<Vec<IsoImage>, ClientError> {
        self.checked(ResourceKind::IsoImage)?;
        Ok(self.iso_images.lock().clone())
    }

    async fn user_options(&self) -> Result<UserOptions, ClientError> {
        self.checked(ResourceKind::UserOptions)?;
        self.user_options
            .lock()
            .clone()
            .ok_or_else(|| ClientError::Request {
                resource: ResourceKind::UserOptions,
                request: "options".to_string(),
                reason: "not scripted".to_string(),
            })
    }
}

/// Session gate with settable expiry and version compatibility.
#[derive(Debug)]
pub(crate) struct MockSession {
    expired: AtomicBool,
    version_compatible: AtomicBool,
}

impl Default for MockSession {
    fn default() -> Self {
        Self {
            expired: AtomicBool::new(false),
            version_compatible: AtomicBool::new(true),
        }
    }
}

impl MockSession {
    pub(crate) fn expire(&self) {
        self.expired.store(true, Ordering::Release);
    }
    pub(crate) fn set_version_compatible(&self, compatible: bool) {
        self.version_compatible.store(compatible, Ordering::Release);
    }
}

impl SessionGate for MockSession {
    fn token_expired(&self) -> bool {
        self.expired.load(Ordering::Acquire)
    }
    fn version_compatible(&self) -> bool {
        self.version_compatible.load(Ordering::Acquire)
    }
}

/// Notification gate counting resumes.
#[derive(Debug, Default)]
pub(crate) struct MockNotifications {
    resumed: AtomicUsize,
}

impl MockNotifications {
    pub(crate) fn resumed(&self) -> usize {
        self.resumed.load(Ordering::Acquire)
    }
}

impl NotificationGate for MockNotifications {
    fn resume(&self) {
        self.resumed.fetch_add(1, Ordering::AcqRel);
    }
}

/// Message sink collecting user-visible failures.
#[derive(Debug, Default)]
pub(crate) struct MockMessages {
    failures: Mutex<Vec<String>>,
}

impl MockMessages {
    pub(crate) fn failures(&self) -> Vec<String> {
        self.failures.lock().clone()
    }
}

impl MessageSink for MockMessages {
    fn failure(&self, message: String) {
        self.failures.lock().push(message);
    }
}
