//! Loopback device that keeps its datasets in memory.
//!
//! In [`SimulationMode::Manual`] requests queue up until the caller completes
//! or fails them, which makes request order observable and lets tests script
//! completions one at a time. In [`SimulationMode::Auto`] every request
//! completes on its own after a fixed latency.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use serde_json::Value;
use tracing::{debug, info};

use crate::resource::{CASCADE_ORDER, ResourceKind};

use super::transport::{RemoteDevice, Subscription, TransferManager, TransferOp, TransferOutcome};
use super::types::{DeviceId, DeviceProfile};

/// How a simulated device answers requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SimulationMode {
    /// Requests wait for [`SimulatedDevice::complete_next`] or [`SimulatedDevice::fail_next`].
    Manual,
    /// Requests complete by themselves after `latency`.
    Auto {
        /// Delay before each completion.
        latency: Duration,
    },
}

/// A simulated remote device.
#[derive(Debug)]
pub struct SimulatedDevice {
    id: DeviceId,
    profile: DeviceProfile,
    shared: Arc<Mutex<SimState>>,
    managers: [Arc<SimulatedTransfer>; 3],
}

#[derive(Debug)]
struct SimState {
    mode: SimulationMode,
    subscription: Option<Subscription>,
    datasets: [Value; 3],
    queue: VecDeque<PendingRequest>,
    log: Vec<(ResourceKind, TransferOp)>,
    scripted_failures: Vec<(ResourceKind, TransferOp, String)>,
    initial_complete: bool,
    next_id: u64,
}

#[derive(Debug)]
struct PendingRequest {
    id: u64,
    kind: ResourceKind,
    op: TransferOp,
    payload: Option<Value>,
    device_initiated: bool,
}

#[derive(Debug)]
struct SimulatedTransfer {
    kind: ResourceKind,
    shared: Arc<Mutex<SimState>>,
}

fn lock(shared: &Mutex<SimState>) -> MutexGuard<'_, SimState> {
    shared.lock().unwrap_or_else(PoisonError::into_inner)
}

impl SimulatedDevice {
    /// Creates a device with empty datasets.
    #[must_use]
    pub fn new(id: u8, profile: DeviceProfile, mode: SimulationMode) -> Self {
        let shared = Arc::new(Mutex::new(SimState {
            mode,
            subscription: None,
            datasets: CASCADE_ORDER.map(ResourceKind::empty_section),
            queue: VecDeque::new(),
            log: Vec::new(),
            scripted_failures: Vec::new(),
            initial_complete: true,
            next_id: 0,
        }));
        let managers = CASCADE_ORDER.map(|kind| {
            Arc::new(SimulatedTransfer {
                kind,
                shared: Arc::clone(&shared),
            })
        });

        Self {
            id: DeviceId(id),
            profile,
            shared,
            managers,
        }
    }

    /// Creates a device whose requests wait to be completed by the caller.
    #[must_use]
    pub fn manual(id: u8) -> Self {
        Self::new(id, DeviceProfile::default(), SimulationMode::Manual)
    }

    /// Creates a device whose requests complete after `latency`.
    #[must_use]
    pub fn auto(id: u8, latency: Duration) -> Self {
        Self::new(id, DeviceProfile::default(), SimulationMode::Auto { latency })
    }

    /// Replaces the device copy of one dataset.
    pub fn set_dataset(&self, kind: ResourceKind, dataset: Value) {
        lock(&self.shared).datasets[kind.index()] = dataset;
    }

    /// Returns the device copy of one dataset.
    #[must_use]
    pub fn dataset(&self, kind: ResourceKind) -> Value {
        lock(&self.shared).datasets[kind.index()].clone()
    }

    /// Starts the device's own initial plan download (route, boundary, rally points).
    ///
    /// Until the last stage completes, [`RemoteDevice::initial_plan_request_complete`]
    /// reports false. A failed stage stops the chain and leaves the handshake incomplete.
    pub fn begin_initial_plan_request(&self) {
        info!("Device {} starting initial plan request", self.id.0);
        lock(&self.shared).initial_complete = false;
        enqueue(&self.shared, ResourceKind::Route, TransferOp::Load, None, true);
    }

    /// Makes the next `op` request for `kind` fail with `reason`.
    pub fn script_failure(&self, kind: ResourceKind, op: TransferOp, reason: impl Into<String>) {
        lock(&self.shared)
            .scripted_failures
            .push((kind, op, reason.into()));
    }

    /// Outstanding requests, oldest first.
    #[must_use]
    pub fn pending(&self) -> Vec<(ResourceKind, TransferOp)> {
        lock(&self.shared)
            .queue
            .iter()
            .map(|r| (r.kind, r.op))
            .collect()
    }

    /// Every request received from the local side, in arrival order.
    #[must_use]
    pub fn request_log(&self) -> Vec<(ResourceKind, TransferOp)> {
        lock(&self.shared).log.clone()
    }

    /// Returns true while a completion channel is registered.
    #[must_use]
    pub fn is_subscribed(&self) -> bool {
        lock(&self.shared).subscription.is_some()
    }

    /// Completes the oldest outstanding request.
    pub fn complete_next(&self) -> Option<(ResourceKind, TransferOp)> {
        let id = lock(&self.shared).queue.front().map(|r| r.id)?;
        complete_request(&self.shared, id, None)
    }

    /// Fails the oldest outstanding request with `reason`.
    pub fn fail_next(&self, reason: impl Into<String>) -> Option<(ResourceKind, TransferOp)> {
        let id = lock(&self.shared).queue.front().map(|r| r.id)?;
        complete_request(&self.shared, id, Some(reason.into()))
    }

    /// Completes outstanding requests until the queue is empty.
    pub fn complete_all(&self) -> usize {
        let mut completed = 0;
        while self.complete_next().is_some() {
            completed += 1;
        }
        completed
    }
}

fn enqueue(
    shared: &Arc<Mutex<SimState>>,
    kind: ResourceKind,
    op: TransferOp,
    payload: Option<Value>,
    device_initiated: bool,
) {
    let (id, mode) = {
        let mut state = lock(shared);
        let id = state.next_id;
        state.next_id += 1;
        if !device_initiated {
            state.log.push((kind, op));
        }
        state.queue.push_back(PendingRequest {
            id,
            kind,
            op,
            payload,
            device_initiated,
        });
        (id, state.mode)
    };
    debug!("Simulated {op} request #{id} for {kind}");

    if let SimulationMode::Auto { latency } = mode {
        let shared = Arc::clone(shared);
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move {
                    tokio::time::sleep(latency).await;
                    complete_request(&shared, id, None);
                });
            }
            Err(_) => {
                complete_request(&shared, id, None);
            }
        }
    }
}

fn complete_request(
    shared: &Arc<Mutex<SimState>>,
    id: u64,
    forced_failure: Option<String>,
) -> Option<(ResourceKind, TransferOp)> {
    let (subscription, request_kind, request_op, outcome, follow_up) = {
        let mut state = lock(shared);
        let position = state.queue.iter().position(|r| r.id == id)?;
        let request = state.queue.remove(position)?;
        let slot = request.kind.index();

        let failure = forced_failure.or_else(|| {
            let scripted = state
                .scripted_failures
                .iter()
                .position(|(kind, op, _)| *kind == request.kind && *op == request.op)?;
            Some(state.scripted_failures.remove(scripted).2)
        });

        let outcome = match failure {
            Some(reason) => TransferOutcome::Failure(reason),
            None => match request.op {
                TransferOp::Load => TransferOutcome::Success(state.datasets[slot].clone()),
                TransferOp::Store => {
                    state.datasets[slot] = request
                        .payload
                        .unwrap_or_else(|| request.kind.empty_section());
                    TransferOutcome::Success(Value::Null)
                }
                TransferOp::RemoveAll => {
                    state.datasets[slot] = request.kind.empty_section();
                    TransferOutcome::Success(Value::Null)
                }
            },
        };

        let mut follow_up = None;
        if request.device_initiated && matches!(outcome, TransferOutcome::Success(_)) {
            follow_up = CASCADE_ORDER.get(slot + 1).copied();
            if follow_up.is_none() {
                state.initial_complete = true;
                info!("Initial plan request complete");
            }
        }

        (
            state.subscription.clone(),
            request.kind,
            request.op,
            outcome,
            follow_up,
        )
    };

    if let Some(subscription) = subscription {
        subscription.notify(request_kind, request_op, outcome);
    } else {
        debug!("No subscriber for {request_op} of {request_kind}");
    }

    if let Some(next) = follow_up {
        enqueue(shared, next, TransferOp::Load, None, true);
    }

    Some((request_kind, request_op))
}

impl TransferManager for SimulatedTransfer {
    fn request_load(&self) {
        enqueue(&self.shared, self.kind, TransferOp::Load, None, false);
    }

    fn request_store(&self, payload: Value) {
        enqueue(&self.shared, self.kind, TransferOp::Store, Some(payload), false);
    }

    fn request_remove_all(&self) {
        enqueue(&self.shared, self.kind, TransferOp::RemoveAll, None, false);
    }

    fn in_progress(&self) -> bool {
        lock(&self.shared).queue.iter().any(|r| r.kind == self.kind)
    }

    fn cached(&self) -> Value {
        lock(&self.shared).datasets[self.kind.index()].clone()
    }
}

impl RemoteDevice for SimulatedDevice {
    fn id(&self) -> Option<DeviceId> {
        Some(self.id)
    }

    fn profile(&self) -> DeviceProfile {
        self.profile
    }

    fn transfer(&self, kind: ResourceKind) -> Option<Arc<dyn TransferManager>> {
        let manager: Arc<dyn TransferManager> = self.managers[kind.index()].clone();
        Some(manager)
    }

    fn subscribe(&self, subscription: Subscription) {
        debug!(
            "Device {} subscribed at epoch {}",
            self.id.0,
            subscription.epoch()
        );
        lock(&self.shared).subscription = Some(subscription);
    }

    fn unsubscribe(&self) {
        debug!("Device {} unsubscribed", self.id.0);
        lock(&self.shared).subscription = None;
    }

    fn initial_plan_request_complete(&self) -> bool {
        lock(&self.shared).initial_complete
    }

    fn force_initial_plan_request_complete(&self) {
        lock(&self.shared).initial_complete = true;
    }
}
