//! Collaborator adapters for the agent binary: a thin http client towards
//! the engine's REST api and a configuration-derived session gate. The
//! response payloads deserialise straight into the cached-state types; only
//! the list envelopes need their own shapes.

use crate::CliArgs;
use async_trait::async_trait;
use console_port::{
    transport_api::{
        ClientError, DeserialiseSnafu, MessageSink, NotificationGate, RemoteClient, ResourceKind,
        SessionGate,
    },
    types::{AttachmentId, DiskAttachment, IsoImage, PoolId, UserOptions, Vm, VmId, VmPool},
};
use serde::Deserialize;
use snafu::ResultExt;

/// Remote-state client towards the engine REST api.
#[derive(Debug)]
pub(crate) struct EngineClient {
    http: reqwest::Client,
    base: url::Url,
    token: String,
}

impl EngineClient {
    /// A new client for the configured endpoint.
    pub(crate) fn new(args: &CliArgs) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(args.request_timeout.into())
            .build()?;
        let mut base = args.engine_url.clone();
        // A base without a trailing slash would lose its last path segment
        // on every join.
        if !base.path().ends_with('/') {
            base.set_path(&format!("{}/", base.path()));
        }
        Ok(Self {
            http,
            base,
            token: args.token.clone(),
        })
    }

    /// Get the payload at `path`, `None` on an explicit not-found.
    pub(crate) async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        resource: ResourceKind,
        path: &str,
    ) -> Result<Option<T>, ClientError> {
        let url = self
            .base
            .join(path)
            .map_err(|error| ClientError::Request {
                resource,
                request: path.to_string(),
                reason: error.to_string(),
            })?;
        let response = self
            .http
            .get(url)
            .bearer_auth(&self.token)
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await
            .map_err(|error| ClientError::Unreachable {
                reason: error.to_string(),
            })?;
        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(ClientError::Request {
                resource,
                request: path.to_string(),
                reason: response.status().to_string(),
            });
        }
        let body = response
            .text()
            .await
            .map_err(|error| ClientError::Unreachable {
                reason: error.to_string(),
            })?;
        serde_json::from_str(&body)
            .context(DeserialiseSnafu { resource })
            .map(Some)
    }
}

/// List envelope of the vms collection endpoint.
#[derive(Debug, Deserialize)]
struct VmList {
    #[serde(default)]
    vm: Vec<Vm>,
}

/// List envelope of the pools collection endpoint.
#[derive(Debug, Deserialize)]
struct PoolList {
    #[serde(default, rename = "vmPool")]
    vm_pool: Vec<VmPool>,
}

/// List envelope of the removable-media collection endpoint.
#[derive(Debug, Deserialize)]
struct ImageList {
    #[serde(default, rename = "isoImage")]
    iso_image: Vec<IsoImage>,
}

#[async_trait]
impl RemoteClient for EngineClient {
    async fn vms(&self, max_results: usize) -> Result<Vec<Vm>, ClientError> {
        let list: Option<VmList> = self
            .get_json(ResourceKind::Vm, &format!("vms?max={max_results}"))
            .await?;
        Ok(list.map(|list| list.vm).unwrap_or_default())
    }

    async fn vm(&self, id: &VmId) -> Result<Option<Vm>, ClientError> {
        self.get_json(ResourceKind::Vm, &format!("vms/{id}")).await
    }

    async fn pools(&self, max_results: usize) -> Result<Vec<VmPool>, ClientError> {
        let list: Option<PoolList> = self
            .get_json(ResourceKind::VmPool, &format!("vmpools?max={max_results}"))
            .await?;
        Ok(list.map(|list| list.vm_pool).unwrap_or_default())
    }

    async fn pool(&self, id: &PoolId) -> Result<Option<VmPool>, ClientError> {
        self.get_json(ResourceKind::VmPool, &format!("vmpools/{id}"))
            .await
    }

    async fn disk_attachment(
        &self,
        vm: &VmId,
        id: &AttachmentId,
    ) -> Result<Option<DiskAttachment>, ClientError> {
        self.get_json(
            ResourceKind::DiskAttachment,
            &format!("vms/{vm}/diskattachments/{id}"),
        )
        .await
    }

    async fn iso_images(&self) -> Result<Vec<IsoImage>, ClientError> {
        let list: Option<ImageList> = self.get_json(ResourceKind::IsoImage, "isoimages").await?;
        Ok(list.map(|list| list.iso_image).unwrap_or_default())
    }

    async fn user_options(&self) -> Result<UserOptions, ClientError> {
        let options: Option<UserOptions> = self
            .get_json(ResourceKind::UserOptions, "options/user")
            .await?;
        options.ok_or_else(|| ClientError::Request {
            resource: ResourceKind::UserOptions,
            request: "options/user".to_string(),
            reason: "not found".to_string(),
        })
    }
}

/// Product version reported by the engine api root.
#[derive(Debug, Deserialize)]
struct EngineVersion {
    major: u64,
    minor: u64,
}

/// Payload of the engine api root.
#[derive(Debug, Deserialize)]
struct ApiInfo {
    #[serde(rename = "productInfo")]
    product_info: ProductInfo,
}

#[derive(Debug, Deserialize)]
struct ProductInfo {
    version: EngineVersion,
}

/// Session gate derived from the agent configuration and a one-time version
/// probe at startup.
#[derive(Debug)]
pub(crate) struct EngineSession {
    /// When the session token stops being valid.
    expires_at: chrono::DateTime<chrono::Utc>,
    /// Whether the engine version satisfied the minimum at startup.
    version_compatible: bool,
}

impl EngineSession {
    /// Probe the engine version and derive the session deadline.
    pub(crate) async fn new(args: &CliArgs, client: &EngineClient) -> anyhow::Result<Self> {
        let info: Option<ApiInfo> = client.get_json(ResourceKind::Unknown, "").await?;
        let version_compatible = match &info {
            Some(info) => version_satisfied(&info.product_info.version, &args.min_api_version),
            None => false,
        };
        tracing::info!(
            version = ?info.as_ref().map(|info| &info.product_info.version),
            minimum = %args.min_api_version,
            version_compatible,
            "Probed the engine api version"
        );
        let expires_at =
            chrono::Utc::now() + chrono::Duration::from_std(args.token_lifetime.into())?;
        Ok(Self {
            expires_at,
            version_compatible,
        })
    }
}

/// Whether the reported version satisfies a "major.minor" minimum.
fn version_satisfied(version: &EngineVersion, minimum: &str) -> bool {
    let mut parts = minimum.splitn(2, '.');
    let major = parts.next().and_then(|part| part.parse::<u64>().ok());
    let minor = parts.next().and_then(|part| part.parse::<u64>().ok());
    match (major, minor) {
        (Some(major), Some(minor)) => {
            (version.major, version.minor) >= (major, minor)
        }
        (Some(major), None) => version.major >= major,
        _ => {
            tracing::warn!(%minimum, "Invalid minimum api version, accepting any");
            true
        }
    }
}

impl SessionGate for EngineSession {
    fn token_expired(&self) -> bool {
        chrono::Utc::now() >= self.expires_at
    }
    fn version_compatible(&self) -> bool {
        self.version_compatible
    }
}

/// Notification gate which logs resumes; the console UI is the real consumer.
#[derive(Debug)]
pub(crate) struct LogNotifications {}
impl NotificationGate for LogNotifications {
    fn resume(&self) {
        tracing::info!("Resuming the notification stream");
    }
}

/// Message sink which logs user-visible failures.
#[derive(Debug)]
pub(crate) struct LogMessages {}
impl MessageSink for LogMessages {
    fn failure(&self, message: String) {
        tracing::warn!(%message, "User visible failure");
    }
}
