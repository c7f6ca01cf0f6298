//! Completion Tracker
//!
//! One background task per triggered scan: wait for the scan to settle,
//! then hand the terminal scan to the webhook dispatcher. Tasks share nothing
//! but the remote platform. A panic inside a tracker is caught at the task
//! boundary and reported as [`TrackerOutcome::Aborted`].

use crate::client::error::ClientError;
use crate::client::traits::RemoteScanClient;
use crate::client::types::Scan;
use crate::core::error_handling::log_error_with_context;
use crate::core::poll::PollPolicy;
use crate::scans::webhook::{panic_message, Delivery, WebhookDispatcher, WebhookError};
use futures::FutureExt;
use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::task::JoinHandle;

/// How a tracker finished
#[derive(Debug, Clone, PartialEq)]
pub enum TrackerOutcome {
    /// Terminal scan reported and acknowledged with a 2xx status
    Delivered { scan: Scan, http_status: u16 },
    /// Terminal scan reached but no webhook destination is configured
    WebhookSkipped { scan: Scan },
    WebhookFailed { scan: Scan, error: WebhookError },
    /// Polling stopped on a remote error; no webhook was sent
    PollFailed { scan_id: String, error: ClientError },
    /// The task panicked or was cancelled
    Aborted { scan_id: String, message: String },
}

impl TrackerOutcome {
    pub fn scan_id(&self) -> &str {
        match self {
            TrackerOutcome::Delivered { scan, .. }
            | TrackerOutcome::WebhookSkipped { scan }
            | TrackerOutcome::WebhookFailed { scan, .. } => &scan.scan_id,
            TrackerOutcome::PollFailed { scan_id, .. } | TrackerOutcome::Aborted { scan_id, .. } => {
                scan_id
            }
        }
    }

    /// The terminal scan, when polling got that far
    pub fn terminal_scan(&self) -> Option<&Scan> {
        match self {
            TrackerOutcome::Delivered { scan, .. }
            | TrackerOutcome::WebhookSkipped { scan }
            | TrackerOutcome::WebhookFailed { scan, .. } => Some(scan),
            _ => None,
        }
    }
}

type HandleMap = HashMap<String, JoinHandle<TrackerOutcome>>;

/// Spawns trackers and keeps at most one live tracker per scan id
#[derive(Clone)]
pub struct CompletionTracker {
    client: Arc<dyn RemoteScanClient>,
    dispatcher: WebhookDispatcher,
    poll_policy: Option<PollPolicy>,
    handles: Arc<Mutex<HandleMap>>,
}

impl CompletionTracker {
    pub fn new(client: Arc<dyn RemoteScanClient>, dispatcher: WebhookDispatcher) -> Self {
        Self {
            client,
            dispatcher,
            poll_policy: None,
            handles: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Poll under this policy instead of the client's own
    pub fn with_poll_policy(mut self, policy: Option<PollPolicy>) -> Self {
        self.poll_policy = policy;
        self
    }

    /// Start tracking a scan in the background
    ///
    /// Returns false, starting nothing, when a tracker for the same scan id
    /// is still running. Trackers that have already finished are dropped from
    /// the registry first; their outcomes were logged by the task itself.
    /// Must be called from within a tokio runtime.
    pub fn start(&self, scan: Scan) -> bool {
        let mut handles = self.lock_handles();
        if let Some(existing) = handles.get(&scan.scan_id) {
            if !existing.is_finished() {
                log::debug!("Tracker for scan {} is already running", scan.scan_id);
                return false;
            }
        }

        let before = handles.len();
        handles.retain(|_, handle| !handle.is_finished());
        if handles.len() < before {
            log::debug!("Dropped {} finished scan trackers", before - handles.len());
        }

        let scan_id = scan.scan_id.clone();
        let client = self.client.clone();
        let dispatcher = self.dispatcher.clone();
        let policy = self.poll_policy.clone();
        let task_scan_id = scan_id.clone();
        let handle = tokio::spawn(async move {
            match AssertUnwindSafe(track(client, dispatcher, policy, scan))
                .catch_unwind()
                .await
            {
                Ok(outcome) => outcome,
                Err(panic) => {
                    let message = panic_message(panic.as_ref());
                    log::error!("Tracker for scan {} panicked: {}", task_scan_id, message);
                    TrackerOutcome::Aborted {
                        scan_id: task_scan_id,
                        message,
                    }
                }
            }
        });
        handles.insert(scan_id, handle);
        true
    }

    /// Number of trackers still running
    pub fn active(&self) -> usize {
        self.lock_handles()
            .values()
            .filter(|handle| !handle.is_finished())
            .count()
    }

    /// Wait for the tracker of a scan and take its outcome
    ///
    /// `None` when no tracker for the scan is registered, including one that
    /// finished before a later [`Self::start`] pruned it.
    pub async fn join(&self, scan_id: &str) -> Option<TrackerOutcome> {
        let handle = self.lock_handles().remove(scan_id)?;
        Some(join_handle(scan_id, handle).await)
    }

    /// Collect the outcomes of trackers that have already finished
    pub async fn reap_finished(&self) -> Vec<TrackerOutcome> {
        let finished: Vec<(String, JoinHandle<TrackerOutcome>)> = {
            let mut handles = self.lock_handles();
            let ids: Vec<String> = handles
                .iter()
                .filter(|(_, handle)| handle.is_finished())
                .map(|(id, _)| id.clone())
                .collect();
            ids.into_iter()
                .filter_map(|id| handles.remove(&id).map(|handle| (id, handle)))
                .collect()
        };

        let mut outcomes = Vec::with_capacity(finished.len());
        for (scan_id, handle) in finished {
            outcomes.push(join_handle(&scan_id, handle).await);
        }
        outcomes
    }

    /// Wait for every registered tracker to finish
    pub async fn shutdown(&self) -> Vec<TrackerOutcome> {
        let drained: Vec<(String, JoinHandle<TrackerOutcome>)> =
            self.lock_handles().drain().collect();
        if !drained.is_empty() {
            log::info!("Waiting for {} scan trackers to finish", drained.len());
        }

        let mut outcomes = Vec::with_capacity(drained.len());
        for (scan_id, handle) in drained {
            outcomes.push(join_handle(&scan_id, handle).await);
        }
        outcomes
    }

    fn lock_handles(&self) -> MutexGuard<'_, HandleMap> {
        self.handles
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

async fn join_handle(scan_id: &str, handle: JoinHandle<TrackerOutcome>) -> TrackerOutcome {
    match handle.await {
        Ok(outcome) => outcome,
        Err(e) => TrackerOutcome::Aborted {
            scan_id: scan_id.to_string(),
            message: e.to_string(),
        },
    }
}

async fn track(
    client: Arc<dyn RemoteScanClient>,
    dispatcher: WebhookDispatcher,
    policy: Option<PollPolicy>,
    scan: Scan,
) -> TrackerOutcome {
    log::info!("Polling status for scan {}", scan.scan_id);

    let polled = match &policy {
        Some(policy) => client.poll_scan_with_policy(&scan, policy).await,
        None => client.poll_scan_to_terminal(&scan).await,
    };
    let terminal = match polled {
        Ok(terminal) => terminal,
        Err(error) => {
            log_error_with_context(&error, &format!("Polling scan {}", scan.scan_id));
            return TrackerOutcome::PollFailed {
                scan_id: scan.scan_id,
                error,
            };
        }
    };
    log::info!(
        "Scan {} reached terminal status {}",
        terminal.scan_id,
        terminal.status
    );

    match dispatcher.send(&terminal).await {
        Ok(Delivery::Sent { status, .. }) => {
            log::info!(
                "Webhook for scan {} delivered (HTTP {})",
                terminal.scan_id,
                status
            );
            TrackerOutcome::Delivered {
                scan: terminal,
                http_status: status,
            }
        }
        Ok(Delivery::Skipped) => TrackerOutcome::WebhookSkipped { scan: terminal },
        Err(error) => {
            log_error_with_context(
                &error,
                &format!("Delivering webhook for scan {}", terminal.scan_id),
            );
            TrackerOutcome::WebhookFailed {
                scan: terminal,
                error,
            }
        }
    }
}
