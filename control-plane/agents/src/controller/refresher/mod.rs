//! Page-aware refresh routines. A dedicated worker consumes the refresh
//! requests emitted by the scheduler and runs the routine for the requested
//! page, one request at a time so the logging stays readable and requests
//! never race each other.

mod list;
mod vm;

use crate::{
    controller::{registry::Registry, scheduler::RefreshRequest},
    errors::SvcError,
};
use console_port::types::PageKind;
use tokio::sync::mpsc;

/// Worker which serves refresh requests.
#[derive(Debug)]
pub(crate) struct RefreshWorker {
    refresh_channel: mpsc::Receiver<RefreshRequest>,
}

impl RefreshWorker {
    /// Return a new `Self` consuming the given request channel.
    pub(crate) fn new(refresh_channel: mpsc::Receiver<RefreshRequest>) -> Self {
        Self { refresh_channel }
    }

    /// Serve refresh requests until the channel closes.
    pub(crate) async fn run(mut self, registry: Registry) {
        while let Some(request) = self.refresh_channel.recv().await {
            if let Err(error) = Self::refresh(&registry, &request).await {
                tracing::error!(%error, page = %request.target.kind, "Failed to refresh the current page");
                registry
                    .messages()
                    .failure(format!("Refresh failed: {error}"));
            }
        }
        tracing::warn!("Refresh request channel closed");
    }

    /// Run the refresh routine for the requested page.
    #[tracing::instrument(level = "debug", skip(registry, request), fields(page = %request.target.kind))]
    async fn refresh(registry: &Registry, request: &RefreshRequest) -> Result<(), SvcError> {
        match request.target.kind {
            PageKind::List => list::refresh(registry).await,
            PageKind::Detail | PageKind::Create => vm::refresh(registry, request).await,
            PageKind::Console => vm::refresh_console(registry, request).await,
            PageKind::Settings => Self::refresh_user_options(registry).await,
            PageKind::None => Ok(()),
        }
    }

    /// Reload the user options from the remote engine.
    async fn refresh_user_options(registry: &Registry) -> Result<(), SvcError> {
        let options = registry.client().user_options().await?;
        registry.set_user_options(options);
        Ok(())
    }
}
