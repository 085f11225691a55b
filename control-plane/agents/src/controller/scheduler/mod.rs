//! The refresh scheduler: a long-lived cancellable periodic task which emits
//! a refresh request for the current console page at a configurable fixed
//! delay. Control flows in as typed commands over a channel into a
//! single-owner worker task; the worker owns all scheduler state and needs no
//! external locking.

pub(crate) mod instance;
pub(crate) mod snooze;
pub(crate) mod timer;

use crate::controller::{refresher::RefreshWorker, registry::Registry};
use console_port::types::{DelayConfig, RefreshFlags, TargetPage};
use instance::SchedulerInstance;
use snooze::NotificationSnooze;
use timer::SignalKind;

use parking_lot::Mutex;
use std::{
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
    time::Duration,
};
use tokio::sync::{broadcast, mpsc};

/// Queue depth for control commands.
const COMMAND_QUEUE_SIZE: usize = 8;
/// Queue depth for pending refresh requests.
const REFRESH_QUEUE_SIZE: usize = 8;
/// Queue depth for the cancellation broadcast.
const CANCEL_QUEUE_SIZE: usize = 8;

/// Control commands accepted by the scheduler worker.
#[derive(Debug)]
pub(crate) enum SchedulerCommand {
    /// Start (or restart) the scheduler with the given cadence and target.
    Start {
        /// Cadence of the new instance.
        config: DelayConfig,
        /// Page the new instance refreshes.
        target: TargetPage,
        /// First-tick flags of the new instance.
        flags: RefreshFlags,
    },
    /// Stop the running scheduler instance.
    Stop,
    /// The console navigated to another page.
    ChangePage {
        /// The newly displayed page.
        target: TargetPage,
    },
    /// The user requested an immediate refresh of the current page.
    ManualRefresh,
    /// Suppress notifications for the given number of minutes.
    Snooze {
        /// Snooze duration; `u64::MAX` means until explicitly resumed.
        minutes: u64,
    },
    /// Resume the notification stream and cancel any pending snooze.
    ResumeNotifications,
}

/// A request for the refresh worker to refresh one page.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct RefreshRequest {
    /// The page to refresh.
    pub(crate) target: TargetPage,
    /// First-tick flags, consumed once per scheduler instance.
    pub(crate) flags: RefreshFlags,
}

/// Used to start the scheduler and refresh workers and to send them commands.
#[derive(Debug)]
pub(crate) struct SchedulerControl {
    worker: Mutex<Option<SchedulerWorker>>,
    refresher: Mutex<Option<RefreshWorker>>,
    command_channel: mpsc::Sender<SchedulerCommand>,
}

impl SchedulerControl {
    /// Return a new `Self`.
    pub(crate) fn new() -> Self {
        let (refresh_tx, refresh_rx) = mpsc::channel(REFRESH_QUEUE_SIZE);
        let mut worker = SchedulerWorker::new(refresh_tx);
        Self {
            command_channel: worker.take_command_channel(),
            worker: Mutex::new(Some(worker)),
            refresher: Mutex::new(Some(RefreshWorker::new(refresh_rx))),
        }
    }

    /// Start the scheduler worker and the refresh worker.
    pub(crate) async fn start(&self, registry: Registry) {
        let worker = self.worker.lock().take().expect("Can only start once");
        let refresher = self.refresher.lock().take().expect("Can only start once");
        let refresh_registry = registry.clone();
        tokio::spawn(async move {
            tracing::info!("Starting the refresh scheduler control loop");
            worker.run(registry).await;
        });
        tokio::spawn(async move {
            refresher.run(refresh_registry).await;
        });
    }

    /// Send a control command to the scheduler worker.
    pub(crate) async fn send(&self, command: SchedulerCommand) {
        if let Err(error) = self.command_channel.send(command).await {
            tracing::warn!(%error, "Failed to send command to the scheduler worker");
        }
    }
}

/// The single-owner worker which reacts to control commands: it supersedes,
/// spawns and cancels scheduler instances and snoozes.
#[derive(Debug)]
pub(crate) struct SchedulerWorker {
    command_channel: mpsc::Receiver<SchedulerCommand>,
    command_channel_sender: Option<mpsc::Sender<SchedulerCommand>>,
    refresh_channel: mpsc::Sender<RefreshRequest>,
    /// Identifies the authoritative scheduler instance; bumped on every start.
    generation: Arc<AtomicU64>,
    /// One-shot cancellation bus raced against timer waits.
    cancel: broadcast::Sender<SignalKind>,
    /// Tick delay of the running instance, reused by restarts.
    current_delay: Option<Duration>,
}

impl SchedulerWorker {
    /// Return a new `Self` publishing refresh requests to the given channel.
    fn new(refresh_channel: mpsc::Sender<RefreshRequest>) -> Self {
        let command_channel = mpsc::channel(COMMAND_QUEUE_SIZE);
        let (cancel, _) = broadcast::channel(CANCEL_QUEUE_SIZE);
        Self {
            command_channel: command_channel.1,
            command_channel_sender: Some(command_channel.0),
            refresh_channel,
            generation: Arc::new(AtomicU64::new(0)),
            cancel,
            current_delay: None,
        }
    }

    /// Take the command channel sender (can only be called once).
    fn take_command_channel(&mut self) -> mpsc::Sender<SchedulerCommand> {
        self.command_channel_sender
            .take()
            .expect("initialised command sender")
    }

    /// Serve control commands until every sender is gone.
    pub(crate) async fn run(mut self, registry: Registry) {
        while let Some(command) = self.command_channel.recv().await {
            tracing::debug!(?command, "Scheduler command received");
            match command {
                SchedulerCommand::Start {
                    config,
                    target,
                    flags,
                } => self.start_instance(config, Some(target), flags, &registry),
                SchedulerCommand::Stop => self.stop_instance(),
                SchedulerCommand::ChangePage { target } => {
                    registry.set_target_page(target);
                    match self.current_delay {
                        Some(delay) => self.start_instance(
                            DelayConfig::new(delay).with_start_delay(Duration::ZERO),
                            None,
                            RefreshFlags::page_router(),
                            &registry,
                        ),
                        None => tracing::debug!("Page changed with no scheduler running"),
                    }
                }
                SchedulerCommand::ManualRefresh => match self.current_delay {
                    Some(delay) => self.start_instance(
                        DelayConfig::new(delay).with_start_delay(Duration::ZERO),
                        None,
                        RefreshFlags::manual(),
                        &registry,
                    ),
                    None => tracing::warn!("Manual refresh requested with no scheduler running"),
                },
                SchedulerCommand::Snooze { minutes } => self.snooze(minutes, &registry),
                SchedulerCommand::ResumeNotifications => {
                    self.cancel.send(SignalKind::Snooze).ok();
                    registry.notifications().resume();
                }
            }
        }
        tracing::warn!("Scheduler command channel closed, stopping the control loop");
        self.stop_instance();
    }

    /// Validate the cadence, supersede the previous instance and spawn a new
    /// one. An invalid cadence is declined up front so that it cannot take
    /// down a healthy running scheduler.
    fn start_instance(
        &mut self,
        config: DelayConfig,
        target: Option<TargetPage>,
        flags: RefreshFlags,
        registry: &Registry,
    ) {
        if !config.valid() {
            tracing::warn!(
                delay = ?config.delay,
                "Declining to start the refresh scheduler with a non-positive delay"
            );
            return;
        }
        if let Some(target) = target {
            registry.set_target_page(target);
        }
        self.stop_instance();
        let generation = self.generation.fetch_add(1, Ordering::AcqRel) + 1;
        let start_delay = instance::effective_start_delay(&config, registry.last_refresh());
        self.current_delay = Some(config.delay);
        let instance = SchedulerInstance::new(
            generation,
            self.generation.clone(),
            config.delay,
            flags,
            self.cancel.subscribe(),
            self.refresh_channel.clone(),
            registry.clone(),
        );
        tracing::info!(generation, delay = ?config.delay, ?start_delay, "Starting a scheduler instance");
        tokio::spawn(instance.run(start_delay));
    }

    /// Cancel the running instance's waits; an instance busy outside a wait
    /// point is caught by the generation check on its next tick.
    fn stop_instance(&self) {
        self.cancel.send(SignalKind::Refresh).ok();
    }

    /// Cancel any pending snooze and spawn the new one.
    fn snooze(&self, minutes: u64, registry: &Registry) {
        self.cancel.send(SignalKind::Snooze).ok();
        let snooze = NotificationSnooze::new(
            minutes,
            self.cancel.subscribe(),
            registry.notifications().clone(),
        );
        tokio::spawn(snooze.run());
    }
}
