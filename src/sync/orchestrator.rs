//! The synchronization orchestrator.
//!
//! The orchestrator owns the three sub-resource controllers and is the only
//! place where cascades are started, advanced, failed or abandoned. All state
//! transitions happen on `&mut self`, driven either by caller operations or by
//! [`SyncOrchestrator::process_next`] as completions and identity changes arrive.
//!
//! Every effective identity change bumps the epoch. Completions carry the epoch
//! of the subscription that delivered them, so anything produced for a previous
//! identity is recognised and dropped without touching the current cascade.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde_json::Value;
use tokio::sync::{broadcast, mpsc, watch};
use tracing::{debug, error, info, warn};

use crate::device::{
    DeviceHandle, DeviceIdentity, DeviceProfile, ManagerBinding, OfflineDevice, RemoteDevice,
    Subscription, TransferEvent,
};
use crate::document::{self, DocumentFormat, LoadedDocument, PlanDocument};
use crate::error::{PlanSyncError, RemoteError, Result, SyncError};
use crate::resource::{
    BoundarySection, CASCADE_ORDER, RallySection, ResourceKind, RouteSection, SectionController,
    SubResourceController,
};
use crate::store::{PlanStore, with_plan_extension};

use super::cascade::{Cascade, CascadeDirection};
use super::events::{NOTIFICATION_CAPACITY, SyncNotification, SyncStatus};
use super::history::{SyncHistory, SyncHistoryEntry, SyncOutcome};

/// Coordinates the route, boundary and rally point controllers with the
/// current manager identity.
pub struct SyncOrchestrator {
    controllers: [Box<dyn SubResourceController>; 3],
    stand_in: Arc<OfflineDevice>,
    manager: DeviceHandle,
    identity: DeviceIdentity,
    offline: bool,
    edit_mode: bool,
    epoch: u64,
    cascade: Option<Cascade>,
    ground_station: String,
    events_tx: mpsc::UnboundedSender<TransferEvent>,
    events_rx: mpsc::UnboundedReceiver<TransferEvent>,
    identity_rx: Option<watch::Receiver<Option<DeviceHandle>>>,
    notifications: broadcast::Sender<SyncNotification>,
    published: SyncStatus,
    history: SyncHistory,
    store: Option<Arc<dyn PlanStore>>,
}

enum Wakeup {
    Transfer(TransferEvent),
    Identity(Option<DeviceHandle>),
    IdentityClosed,
    Closed,
}

impl SyncOrchestrator {
    /// Creates an offline orchestrator with empty in-memory controllers.
    ///
    /// `profile` is the editing profile of the offline stand-in.
    #[must_use]
    pub fn new(ground_station: impl Into<String>, profile: DeviceProfile) -> Self {
        Self::with_controllers(
            ground_station,
            profile,
            [
                Box::new(SectionController::<RouteSection>::new()),
                Box::new(SectionController::<BoundarySection>::new()),
                Box::new(SectionController::<RallySection>::new()),
            ],
        )
    }

    /// Creates an offline orchestrator around the given controllers, in cascade order.
    #[must_use]
    pub fn with_controllers(
        ground_station: impl Into<String>,
        profile: DeviceProfile,
        controllers: [Box<dyn SubResourceController>; 3],
    ) -> Self {
        let stand_in = Arc::new(OfflineDevice::new(profile));
        let manager: DeviceHandle = stand_in.clone();
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let (notifications, _) = broadcast::channel(NOTIFICATION_CAPACITY);

        Self {
            controllers,
            stand_in,
            manager,
            identity: DeviceIdentity::None,
            offline: true,
            edit_mode: true,
            epoch: 0,
            cascade: None,
            ground_station: ground_station.into(),
            events_tx,
            events_rx,
            identity_rx: None,
            notifications,
            published: SyncStatus::default(),
            history: SyncHistory::default(),
            store: None,
        }
    }

    /// Sets the store used by [`Self::load_file`] and [`Self::save_file`].
    #[must_use]
    pub fn with_store(mut self, store: Arc<dyn PlanStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Enters editing or live-operation mode and follows the active device.
    ///
    /// The current value of `active` is applied immediately; later changes are
    /// picked up by [`Self::process_next`] and [`Self::drain_pending`].
    pub fn start(&mut self, edit_mode: bool, active: watch::Receiver<Option<DeviceHandle>>) {
        self.enter_mode(edit_mode);
        let mut active = active;
        let current = active.borrow_and_update().clone();
        self.identity_rx = Some(active);
        self.apply_identity(current, true);
    }

    /// Binds once to `device` in live-operation mode without following identity changes.
    pub fn start_with_fixed_identity(&mut self, device: DeviceHandle) {
        self.enter_mode(false);
        self.identity_rx = None;
        self.apply_identity(Some(device), true);
    }

    fn enter_mode(&mut self, edit_mode: bool) {
        info!(
            "Starting in {} mode",
            if edit_mode { "editing" } else { "live-operation" }
        );
        self.abandon_cascade("surface mode changed");
        self.edit_mode = edit_mode;
        for controller in &mut self.controllers {
            controller.start(edit_mode);
        }
    }

    /// Subscribes to orchestrator notifications.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<SyncNotification> {
        self.notifications.subscribe()
    }

    // ---------------------------------------------------------------------
    // Identity reconciliation
    // ---------------------------------------------------------------------

    /// Applies a change of the active device; `None` means no device.
    pub fn device_identity_changed(&mut self, device: Option<DeviceHandle>) {
        self.apply_identity(device, false);
    }

    fn apply_identity(&mut self, device: Option<DeviceHandle>, force: bool) {
        let device = device.filter(|d| !d.identity().is_offline());
        let identity = device
            .as_ref()
            .map_or(DeviceIdentity::None, |d| d.identity());

        if !force && identity == self.identity {
            debug!("Already bound to {identity}");
            return;
        }
        info!("Manager identity changed: {} -> {identity}", self.identity);

        self.manager.unsubscribe();
        self.epoch += 1;
        self.abandon_cascade("manager identity changed");

        let offline = match device {
            None => {
                let stand_in: DeviceHandle = self.stand_in.clone();
                self.manager = stand_in;
                true
            }
            Some(device) => {
                self.stand_in.set_profile(device.profile());
                device.subscribe(Subscription::new(self.epoch, self.events_tx.clone()));
                self.manager = device;
                false
            }
        };
        self.identity = identity;

        if offline != self.offline {
            self.offline = offline;
            self.notify(SyncNotification::OfflineChanged { offline });
        }

        let binding = ManagerBinding {
            device: Arc::clone(&self.manager),
            epoch: self.epoch,
            offline,
        };
        for controller in &mut self.controllers {
            controller.manager_identity_changed(&binding);
        }

        if self.edit_mode {
            if !self.offline {
                if self.contains_items() {
                    debug!("Editing surface already has a plan, leaving it alone");
                } else {
                    debug!("Editing surface is empty, showing plan from {identity}");
                    self.show_plan_from_manager();
                }
            }
        } else if self.offline {
            info!("Live view is offline, clearing plan");
            self.clear_local();
        } else {
            debug!("Live view follows {identity}");
            self.show_plan_from_manager();
        }

        self.publish_status();
    }

    fn show_plan_from_manager(&mut self) {
        if !self.manager.initial_plan_request_complete()
            && !self.controllers.iter().any(|c| c.sync_in_progress())
        {
            warn!("Initial plan request stalled with every controller idle, forcing it complete");
            self.manager.force_initial_plan_request_complete();
        }

        for controller in &mut self.controllers {
            if controller.show_plan_from_manager() {
                debug!("{} controller claimed the plan request", controller.kind());
                break;
            }
        }
    }

    // ---------------------------------------------------------------------
    // Cascades
    // ---------------------------------------------------------------------

    /// Loads the route, boundary and rally points from the device, in that order.
    ///
    /// # Errors
    ///
    /// Returns a precondition error when offline, in live-operation mode, or
    /// while a sync is in progress. No request is issued in that case.
    pub fn load_from_device(&mut self) -> Result<()> {
        const OPERATION: &str = "load_from_device";
        if self.offline {
            return Err(reject(SyncError::Offline { operation: OPERATION }));
        }
        if !self.edit_mode {
            return Err(reject(SyncError::WrongSurface { operation: OPERATION }));
        }
        if self.sync_in_progress() {
            return Err(reject(SyncError::SyncInProgress { operation: OPERATION }));
        }
        self.begin_cascade(CascadeDirection::Load)
    }

    /// Sends the route, boundary and rally points to the device, in that order.
    ///
    /// # Errors
    ///
    /// Returns a precondition error when offline or while a sync is in progress.
    pub fn store_to_device(&mut self) -> Result<()> {
        const OPERATION: &str = "store_to_device";
        if self.offline {
            return Err(reject(SyncError::Offline { operation: OPERATION }));
        }
        if self.sync_in_progress() {
            return Err(reject(SyncError::SyncInProgress { operation: OPERATION }));
        }
        self.begin_cascade(CascadeDirection::Store)
    }

    fn begin_cascade(&mut self, direction: CascadeDirection) -> Result<()> {
        let cascade = Cascade::begin(direction, self.epoch);
        let first = CASCADE_ORDER[0];
        info!(
            "Starting {direction} cascade {} against {}",
            cascade.id, self.identity
        );

        request(self.controller_mut(first), direction)?;
        self.cascade = Some(cascade);
        self.set_dirty_all(false);
        self.publish_status();
        Ok(())
    }

    fn handle_transfer_event(&mut self, event: TransferEvent) {
        if event.epoch != self.epoch {
            debug!(
                "Dropping stale {} completion for {} from epoch {} (current {})",
                event.op, event.kind, event.epoch, self.epoch
            );
            return;
        }

        let in_cascade = self.cascade.as_ref().is_some_and(|c| c.accepts(&event));
        let kind = event.kind;
        let result = self
            .controller_mut(kind)
            .on_transfer_complete(event.op, event.outcome);

        match result {
            Err(e) if in_cascade => self.fail_cascade(kind, &e),
            Err(e) => error!("{e}"),
            Ok(()) if in_cascade => self.advance_cascade(),
            Ok(()) => {}
        }
        self.publish_status();
    }

    fn advance_cascade(&mut self) {
        let Some(cascade) = self.cascade.as_mut() else {
            return;
        };
        let direction = cascade.direction;
        let completed = cascade.awaited();

        let Some(next) = cascade.advance() else {
            self.finish_cascade();
            return;
        };
        debug!(
            "Cascade {} {direction}: {completed:?} complete, requesting {next}",
            cascade.id
        );

        if let Err(e) = request(self.controller_mut(next), direction) {
            self.fail_cascade(next, &e);
            return;
        }

        // Stores only re-baseline after the route; loads after every stage.
        let clear_dirty = match direction {
            CascadeDirection::Load => true,
            CascadeDirection::Store => next == ResourceKind::Boundary,
        };
        if clear_dirty {
            self.set_dirty_all(false);
        }
    }

    fn finish_cascade(&mut self) {
        let Some(cascade) = self.cascade.take() else {
            return;
        };
        info!("{} cascade {} finished", cascade.direction, cascade.id);
        self.history.push(SyncHistoryEntry::ended(
            &cascade,
            self.identity,
            SyncOutcome::Finished,
        ));
        self.notify(SyncNotification::SyncFinished {
            cascade: cascade.id,
            direction: cascade.direction,
        });
    }

    fn fail_cascade(&mut self, kind: ResourceKind, error: &RemoteError) {
        let Some(cascade) = self.cascade.take() else {
            return;
        };
        error!("{} cascade {} failed: {error}", cascade.direction, cascade.id);
        let reason = match error {
            RemoteError::StageFailed { reason, .. } => reason.clone(),
            other => other.to_string(),
        };
        self.history.push(SyncHistoryEntry::ended(
            &cascade,
            self.identity,
            SyncOutcome::Failed {
                kind,
                reason: reason.clone(),
            },
        ));
        self.notify(SyncNotification::SyncFailed {
            cascade: cascade.id,
            direction: cascade.direction,
            kind,
            reason,
        });
    }

    fn abandon_cascade(&mut self, why: &str) {
        let Some(cascade) = self.cascade.take() else {
            return;
        };
        info!(
            "Abandoning {} cascade {} ({}): {why}",
            cascade.direction, cascade.id, cascade.stage
        );
        self.history.push(SyncHistoryEntry::ended(
            &cascade,
            self.identity,
            SyncOutcome::Abandoned,
        ));
    }

    // ---------------------------------------------------------------------
    // Event pump
    // ---------------------------------------------------------------------

    /// Waits for one completion or identity change and applies it.
    ///
    /// Returns `false` if nothing can arrive anymore.
    pub async fn process_next(&mut self) -> bool {
        let wakeup = match self.identity_rx.as_mut() {
            Some(identity) => tokio::select! {
                event = self.events_rx.recv() => event.map_or(Wakeup::Closed, Wakeup::Transfer),
                changed = identity.changed() => match changed {
                    Ok(()) => Wakeup::Identity(identity.borrow_and_update().clone()),
                    Err(_) => Wakeup::IdentityClosed,
                },
            },
            None => self
                .events_rx
                .recv()
                .await
                .map_or(Wakeup::Closed, Wakeup::Transfer),
        };

        match wakeup {
            Wakeup::Transfer(event) => self.handle_transfer_event(event),
            Wakeup::Identity(device) => self.device_identity_changed(device),
            Wakeup::IdentityClosed => {
                debug!("Active device channel closed, keeping current identity");
                self.identity_rx = None;
            }
            Wakeup::Closed => return false,
        }
        true
    }

    /// Processes events until no sync is in progress.
    pub async fn run_until_idle(&mut self) {
        while self.sync_in_progress() {
            if !self.process_next().await {
                break;
            }
        }
    }

    /// Applies every completion and identity change that has already arrived.
    ///
    /// Returns the number of events applied.
    pub fn drain_pending(&mut self) -> usize {
        let mut applied = 0;
        loop {
            if let Some(device) = self.take_identity_change() {
                self.device_identity_changed(device);
            } else if let Ok(event) = self.events_rx.try_recv() {
                self.handle_transfer_event(event);
            } else {
                return applied;
            }
            applied += 1;
        }
    }

    fn take_identity_change(&mut self) -> Option<Option<DeviceHandle>> {
        let identity = self.identity_rx.as_mut()?;
        match identity.has_changed() {
            Ok(true) => Some(identity.borrow_and_update().clone()),
            Ok(false) => None,
            Err(_) => {
                self.identity_rx = None;
                None
            }
        }
    }

    // ---------------------------------------------------------------------
    // Documents
    // ---------------------------------------------------------------------

    /// Loads a plan document.
    ///
    /// # Errors
    ///
    /// Returns an error if the document is malformed; nothing is applied then.
    pub fn load_document(&mut self, bytes: &[u8]) -> Result<()> {
        self.load_document_as(bytes, DocumentFormat::Plan)
    }

    /// Loads a document in any accepted format.
    ///
    /// Legacy formats replace the route and clear the boundary and rally points.
    ///
    /// # Errors
    ///
    /// Returns an error if a sync is in progress or the document is malformed;
    /// nothing is applied in either case.
    pub fn load_document_as(&mut self, bytes: &[u8], format: DocumentFormat) -> Result<()> {
        if self.sync_in_progress() {
            return Err(reject(SyncError::SyncInProgress {
                operation: "load_document",
            }));
        }

        let loaded = document::parse(bytes, format)?;
        let sections: [Value; 3] = match loaded {
            LoadedDocument::Plan(document) => CASCADE_ORDER.map(|kind| document.section(kind).clone()),
            LoadedDocument::RouteOnly(route) => [
                route,
                ResourceKind::Boundary.empty_section(),
                ResourceKind::RallyPoints.empty_section(),
            ],
        };

        for (controller, section) in self.controllers.iter().zip(&sections) {
            controller.check(section)?;
        }
        for (controller, section) in self.controllers.iter_mut().zip(&sections) {
            controller.load(section)?;
        }
        info!("Loaded {format} document");

        if !self.offline {
            self.set_dirty_all(true);
        }
        self.publish_status();
        Ok(())
    }

    /// Builds the plan document from the current sections.
    #[must_use]
    pub fn document(&self) -> PlanDocument {
        let [mission, geo_fence, rally_points] = self.controllers.each_ref().map(|c| c.save());
        PlanDocument::new(self.ground_station.clone(), mission, geo_fence, rally_points)
    }

    /// Serializes the plan; clears the dirty flag when offline.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn save_document(&mut self) -> Result<Vec<u8>> {
        let bytes = self.document().to_bytes()?;
        self.saved();
        Ok(bytes)
    }

    fn saved(&mut self) {
        // An online save says nothing about the device copy.
        if self.offline {
            self.set_dirty_all(false);
            self.publish_status();
        }
    }

    /// Reads and loads a file through the configured store.
    ///
    /// # Errors
    ///
    /// Returns an error if no store is configured, the extension is not
    /// recognised, the file cannot be read, or the document is malformed.
    pub async fn load_file(&mut self, path: &Path) -> Result<()> {
        let store = self.plan_store()?;
        let format = DocumentFormat::from_path(path)?;
        let bytes = store.read(path).await?;
        self.load_document_as(&bytes, format)
    }

    /// Saves the plan through the configured store and returns the path written.
    ///
    /// A file name without a dot gets the plan extension appended.
    ///
    /// # Errors
    ///
    /// Returns an error if no store is configured or the write fails.
    pub async fn save_file(&mut self, path: &Path) -> Result<PathBuf> {
        let store = self.plan_store()?;
        let path = with_plan_extension(path);
        let bytes = self.document().to_bytes()?;
        store.write(&path, &bytes).await?;
        self.saved();
        Ok(path)
    }

    fn plan_store(&self) -> Result<Arc<dyn PlanStore>> {
        self.store
            .clone()
            .ok_or_else(|| PlanSyncError::internal("no plan store configured"))
    }

    // ---------------------------------------------------------------------
    // Clearing
    // ---------------------------------------------------------------------

    /// Clears all three local datasets.
    pub fn remove_all(&mut self) {
        for controller in &mut self.controllers {
            controller.remove_all();
        }
        self.publish_status();
    }

    fn clear_local(&mut self) {
        for controller in &mut self.controllers {
            controller.remove_all();
        }
        self.set_dirty_all(false);
    }

    /// Clears all three datasets on the device.
    ///
    /// # Errors
    ///
    /// Returns a precondition error when offline or while a sync is in progress.
    pub fn remove_all_from_device(&mut self) -> Result<()> {
        const OPERATION: &str = "remove_all_from_device";
        if self.offline {
            return Err(reject(SyncError::Offline { operation: OPERATION }));
        }
        if self.sync_in_progress() {
            return Err(reject(SyncError::SyncInProgress { operation: OPERATION }));
        }

        info!("Clearing plan on {}", self.identity);
        for controller in &mut self.controllers {
            controller.remove_all_from_device()?;
        }
        self.set_dirty_all(false);
        self.publish_status();
        Ok(())
    }

    // ---------------------------------------------------------------------
    // Aggregate state
    // ---------------------------------------------------------------------

    /// Returns true if any dataset differs from its last loaded or stored snapshot.
    #[must_use]
    pub fn dirty(&self) -> bool {
        self.controllers.iter().any(|c| c.dirty())
    }

    /// Sets the dirty flag of all three datasets.
    pub fn set_dirty(&mut self, dirty: bool) {
        self.set_dirty_all(dirty);
        self.publish_status();
    }

    fn set_dirty_all(&mut self, dirty: bool) {
        for controller in &mut self.controllers {
            controller.set_dirty(dirty);
        }
    }

    /// Returns true if any dataset holds something.
    #[must_use]
    pub fn contains_items(&self) -> bool {
        self.controllers.iter().any(|c| c.contains_items())
    }

    /// Returns true while a cascade runs or any dataset has a transfer outstanding.
    #[must_use]
    pub fn sync_in_progress(&self) -> bool {
        self.cascade.is_some() || self.controllers.iter().any(|c| c.sync_in_progress())
    }

    /// Current aggregate flags.
    #[must_use]
    pub fn status(&self) -> SyncStatus {
        SyncStatus {
            dirty: self.dirty(),
            contains_items: self.contains_items(),
            sync_in_progress: self.sync_in_progress(),
        }
    }

    /// Returns true while the manager identity is the offline stand-in.
    #[must_use]
    pub const fn offline(&self) -> bool {
        self.offline
    }

    /// Returns true on the editing surface.
    #[must_use]
    pub const fn edit_mode(&self) -> bool {
        self.edit_mode
    }

    /// The current manager identity.
    #[must_use]
    pub const fn identity(&self) -> DeviceIdentity {
        self.identity
    }

    /// The current identity epoch.
    #[must_use]
    pub const fn epoch(&self) -> u64 {
        self.epoch
    }

    /// The running cascade, if any.
    #[must_use]
    pub const fn cascade(&self) -> Option<&Cascade> {
        self.cascade.as_ref()
    }

    /// Past cascades.
    #[must_use]
    pub const fn history(&self) -> &SyncHistory {
        &self.history
    }

    /// Profile used for offline editing.
    #[must_use]
    pub fn offline_profile(&self) -> DeviceProfile {
        self.stand_in.profile()
    }

    /// The controller of one sub-resource.
    #[must_use]
    pub fn controller(&self, kind: ResourceKind) -> &dyn SubResourceController {
        self.controllers[kind.index()].as_ref()
    }

    /// Runs `f` on the controller of one sub-resource and republishes the aggregate flags.
    pub fn edit_controller(&mut self, kind: ResourceKind, f: impl FnOnce(&mut dyn SubResourceController)) {
        f(self.controller_mut(kind));
        self.publish_status();
    }

    fn controller_mut(&mut self, kind: ResourceKind) -> &mut dyn SubResourceController {
        self.controllers[kind.index()].as_mut()
    }

    fn publish_status(&mut self) {
        let status = self.status();
        for change in status.changes_since(&self.published) {
            self.notify(change);
        }
        self.published = status;
    }

    fn notify(&self, notification: SyncNotification) {
        debug!("Notification: {notification:?}");
        // Having no receivers is fine.
        let _ = self.notifications.send(notification);
    }

    // ---------------------------------------------------------------------
    // One-shot transfer
    // ---------------------------------------------------------------------

    /// Sends a plan to `device` using a transient orchestrator bound to it.
    ///
    /// Waits for the store cascade to end and returns its history entry.
    ///
    /// # Errors
    ///
    /// Returns an error if the document is malformed or the cascade cannot start.
    pub async fn send_plan_to_device(
        device: DeviceHandle,
        bytes: &[u8],
        format: DocumentFormat,
    ) -> Result<SyncHistoryEntry> {
        let mut orchestrator = Self::new(String::new(), device.profile());
        orchestrator.start_with_fixed_identity(device);
        orchestrator.run_until_idle().await;
        orchestrator.load_document_as(bytes, format)?;
        orchestrator.store_to_device()?;
        orchestrator.run_until_idle().await;

        orchestrator
            .history
            .last()
            .cloned()
            .ok_or_else(|| PlanSyncError::internal("store cascade left no history"))
    }
}

fn request(
    controller: &mut dyn SubResourceController,
    direction: CascadeDirection,
) -> std::result::Result<(), RemoteError> {
    match direction {
        CascadeDirection::Load => controller.load_from_device(),
        CascadeDirection::Store => controller.send_to_device(),
    }
}

fn reject(error: SyncError) -> PlanSyncError {
    warn!("{error}");
    error.into()
}

impl Drop for SyncOrchestrator {
    fn drop(&mut self) {
        self.manager.unsubscribe();
    }
}

impl std::fmt::Debug for SyncOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncOrchestrator")
            .field("identity", &self.identity)
            .field("offline", &self.offline)
            .field("edit_mode", &self.edit_mode)
            .field("epoch", &self.epoch)
            .field("cascade", &self.cascade)
            .field("status", &self.status())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use std::time::Duration;

    use serde_json::json;

    use crate::device::{SimulatedDevice, TransferOp, TransferOutcome};
    use crate::error::DocumentError;
    use crate::resource::{FenceCircle, FencePolygon, MissionItem, PlanSection};

    fn handle(device: &Arc<SimulatedDevice>) -> DeviceHandle {
        device.clone()
    }

    fn route(items: u32) -> Value {
        let items: Vec<Value> = (0..items)
            .map(|i| {
                json!({
                    "type": "SimpleItem",
                    "command": 16,
                    "frame": 3,
                    "params": [0, 0, 0, null, 47.0, 8.0 + f64::from(i) / 100.0, 50],
                    "autoContinue": true,
                    "doJumpId": i + 1
                })
            })
            .collect();
        json!({ "version": 2, "items": items })
    }

    fn boundary() -> Value {
        json!({
            "version": 2,
            "polygons": [{ "inclusion": true, "polygon": [[47.0, 8.0], [47.1, 8.0], [47.1, 8.1]] }],
            "circles": []
        })
    }

    fn rally() -> Value {
        json!({ "version": 2, "points": [[47.05, 8.05, 30.0]] })
    }

    fn plan_bytes(version: i64) -> Vec<u8> {
        serde_json::to_vec(&json!({
            "fileType": "Plan",
            "version": version,
            "groundStation": "test",
            "mission": route(2),
            "geoFence": boundary(),
            "rallyPoints": rally()
        }))
        .expect("serializes")
    }

    fn seeded_device(id: u8) -> Arc<SimulatedDevice> {
        let device = Arc::new(SimulatedDevice::manual(id));
        device.set_dataset(ResourceKind::Route, route(3));
        device.set_dataset(ResourceKind::Boundary, boundary());
        device.set_dataset(ResourceKind::RallyPoints, rally());
        device
    }

    struct Harness {
        orchestrator: SyncOrchestrator,
        active: watch::Sender<Option<DeviceHandle>>,
        notifications: broadcast::Receiver<SyncNotification>,
    }

    impl Harness {
        fn offline(edit_mode: bool) -> Self {
            let mut orchestrator = SyncOrchestrator::new("test", DeviceProfile::default());
            let notifications = orchestrator.subscribe();
            let (active, rx) = watch::channel(None);
            orchestrator.start(edit_mode, rx);
            Self {
                orchestrator,
                active,
                notifications,
            }
        }

        fn connect(&mut self, device: &Arc<SimulatedDevice>) {
            self.active.send_replace(Some(handle(device)));
            self.orchestrator.drain_pending();
        }

        fn disconnect(&mut self) {
            self.active.send_replace(None);
            self.orchestrator.drain_pending();
        }

        fn complete(&mut self, device: &SimulatedDevice) {
            device.complete_next().expect("a request is pending");
            self.orchestrator.drain_pending();
        }

        fn notifications(&mut self) -> Vec<SyncNotification> {
            let mut seen = Vec::new();
            while let Ok(n) = self.notifications.try_recv() {
                seen.push(n);
            }
            seen
        }
    }

    fn count_finished(notifications: &[SyncNotification]) -> usize {
        notifications
            .iter()
            .filter(|n| matches!(n, SyncNotification::SyncFinished { .. }))
            .count()
    }

    #[test]
    fn test_starts_offline() {
        let harness = Harness::offline(true);
        let orchestrator = &harness.orchestrator;
        assert!(orchestrator.offline());
        assert_eq!(orchestrator.identity(), DeviceIdentity::None);
        assert!(!orchestrator.sync_in_progress());
        assert!(!orchestrator.contains_items());
    }

    #[test]
    fn test_load_cascade_order() {
        let device = Arc::new(SimulatedDevice::manual(1));
        let mut harness = Harness::offline(true);
        harness.orchestrator.load_document(&plan_bytes(1)).expect("valid plan");
        harness.connect(&device);
        device.set_dataset(ResourceKind::Route, route(3));

        harness.orchestrator.load_from_device().expect("cascade starts");
        assert_eq!(device.pending(), vec![(ResourceKind::Route, TransferOp::Load)]);

        harness.complete(&device);
        assert_eq!(device.pending(), vec![(ResourceKind::Boundary, TransferOp::Load)]);

        harness.complete(&device);
        assert_eq!(
            device.pending(),
            vec![(ResourceKind::RallyPoints, TransferOp::Load)]
        );

        harness.complete(&device);
        assert!(device.pending().is_empty());
        assert_eq!(
            device.request_log(),
            vec![
                (ResourceKind::Route, TransferOp::Load),
                (ResourceKind::Boundary, TransferOp::Load),
                (ResourceKind::RallyPoints, TransferOp::Load),
            ]
        );

        let orchestrator = &harness.orchestrator;
        assert!(!orchestrator.sync_in_progress());
        assert!(!orchestrator.dirty());
        assert_eq!(orchestrator.controller(ResourceKind::Route).item_count(), 3);
        assert_eq!(orchestrator.controller(ResourceKind::Boundary).item_count(), 0);
        assert_eq!(count_finished(&harness.notifications()), 1);
    }

    #[test]
    fn test_second_load_rejected_while_syncing() {
        let device = Arc::new(SimulatedDevice::manual(1));
        let mut harness = Harness::offline(true);
        harness.connect(&device);

        harness.orchestrator.load_from_device().expect("cascade starts");
        let err = harness
            .orchestrator
            .load_from_device()
            .expect_err("second load rejected");

        assert!(err.is_precondition_violation());
        assert_eq!(device.request_log().len(), 1);
    }

    #[test]
    fn test_load_preconditions() {
        let mut harness = Harness::offline(true);
        assert!(matches!(
            harness.orchestrator.load_from_device(),
            Err(PlanSyncError::Sync(SyncError::Offline { .. }))
        ));
        assert!(matches!(
            harness.orchestrator.store_to_device(),
            Err(PlanSyncError::Sync(SyncError::Offline { .. }))
        ));

        let device = Arc::new(SimulatedDevice::manual(1));
        let mut live = Harness::offline(false);
        live.connect(&device);
        assert!(matches!(
            live.orchestrator.load_from_device(),
            Err(PlanSyncError::Sync(SyncError::WrongSurface { .. }))
        ));
        assert!(device.request_log().is_empty());
    }

    #[test]
    fn test_store_cascade_finishes_clean() {
        let device = Arc::new(SimulatedDevice::manual(1));
        let mut harness = Harness::offline(true);
        harness.orchestrator.load_document(&plan_bytes(1)).expect("valid plan");
        harness.connect(&device);
        harness.orchestrator.set_dirty(true);
        assert!(harness.orchestrator.dirty());
        harness.notifications();

        harness.orchestrator.store_to_device().expect("cascade starts");
        for _ in CASCADE_ORDER {
            harness.complete(&device);
        }

        let orchestrator = &harness.orchestrator;
        assert!(!orchestrator.sync_in_progress());
        assert!(!orchestrator.dirty());
        assert_eq!(count_finished(&harness.notifications()), 1);
        assert_eq!(device.dataset(ResourceKind::RallyPoints), rally());
        assert_eq!(
            device.request_log(),
            CASCADE_ORDER.map(|kind| (kind, TransferOp::Store)).to_vec()
        );
        assert!(
            harness
                .orchestrator
                .history()
                .last()
                .is_some_and(SyncHistoryEntry::succeeded)
        );
    }

    #[test]
    fn test_store_only_clears_dirty_after_route() {
        let device = Arc::new(SimulatedDevice::manual(1));
        let mut harness = Harness::offline(true);
        harness.connect(&device);
        harness.orchestrator.store_to_device().expect("cascade starts");
        harness.complete(&device);

        harness.orchestrator.edit_controller(ResourceKind::RallyPoints, |c| {
            c.load(&rally()).expect("valid");
            c.set_dirty(true);
        });
        harness.complete(&device);
        assert!(harness.orchestrator.dirty());
    }

    #[test]
    fn test_failed_stage_releases_sync() {
        let device = Arc::new(SimulatedDevice::manual(1));
        let mut harness = Harness::offline(true);
        harness.connect(&device);

        harness.orchestrator.store_to_device().expect("cascade starts");
        harness.complete(&device);
        device.fail_next("fence rejected");
        harness.orchestrator.drain_pending();

        assert!(!harness.orchestrator.sync_in_progress());
        assert!(device.pending().is_empty());
        let notifications = harness.notifications();
        assert_eq!(count_finished(&notifications), 0);
        assert!(notifications.iter().any(|n| matches!(
            n,
            SyncNotification::SyncFailed { kind: ResourceKind::Boundary, reason, .. }
                if reason == "fence rejected"
        )));
        assert!(matches!(
            harness.orchestrator.history().last().map(|e| &e.outcome),
            Some(SyncOutcome::Failed { .. })
        ));
    }

    #[test]
    fn test_identity_switch_ignores_stale_completions() {
        let first = Arc::new(SimulatedDevice::manual(1));
        let second = Arc::new(SimulatedDevice::manual(2));
        let mut harness = Harness::offline(true);
        harness.orchestrator.load_document(&plan_bytes(1)).expect("valid plan");
        harness.connect(&first);

        harness.orchestrator.load_from_device().expect("cascade starts");
        let epoch = harness.orchestrator.epoch();

        // The completion is queued before the switch is applied.
        first.complete_next();
        harness
            .orchestrator
            .device_identity_changed(Some(handle(&second)));
        harness.orchestrator.drain_pending();
        assert_eq!(count_finished(&harness.notifications()), 0);

        let orchestrator = &harness.orchestrator;
        assert_eq!(orchestrator.epoch(), epoch + 1);
        assert!(orchestrator.cascade().is_none());
        assert!(!orchestrator.sync_in_progress());
        assert!(first.pending().is_empty());
        assert!(second.request_log().is_empty());
        assert!(matches!(
            orchestrator.history().last().map(|e| &e.outcome),
            Some(SyncOutcome::Abandoned)
        ));
        assert!(!first.is_subscribed());
        assert!(second.is_subscribed());
    }

    #[test]
    fn test_duplicate_identity_notification_is_ignored() {
        let device = Arc::new(SimulatedDevice::manual(1));
        let mut harness = Harness::offline(true);
        harness.connect(&device);
        let epoch = harness.orchestrator.epoch();

        harness
            .orchestrator
            .device_identity_changed(Some(handle(&device)));
        assert_eq!(harness.orchestrator.epoch(), epoch);
    }

    #[test]
    fn test_live_view_clears_on_disconnect() {
        let device = seeded_device(1);
        let mut harness = Harness::offline(false);
        harness.connect(&device);
        assert!(harness.orchestrator.contains_items());

        harness.disconnect();

        let orchestrator = &harness.orchestrator;
        assert!(orchestrator.offline());
        assert!(!orchestrator.contains_items());
        assert!(
            harness
                .notifications()
                .contains(&SyncNotification::OfflineChanged { offline: true })
        );
    }

    #[test]
    fn test_live_view_follows_new_device() {
        let first = seeded_device(1);
        let second = Arc::new(SimulatedDevice::manual(2));
        second.set_dataset(ResourceKind::RallyPoints, rally());

        let mut harness = Harness::offline(false);
        harness.connect(&first);
        assert_eq!(harness.orchestrator.controller(ResourceKind::Route).item_count(), 3);

        harness.connect(&second);
        let orchestrator = &harness.orchestrator;
        assert!(!orchestrator.controller(ResourceKind::Route).contains_items());
        assert!(orchestrator.controller(ResourceKind::RallyPoints).contains_items());
    }

    #[test]
    fn test_editing_keeps_local_plan_on_connect() {
        let device = seeded_device(1);
        let mut harness = Harness::offline(true);
        harness.orchestrator.load_document(&plan_bytes(1)).expect("valid plan");
        harness.connect(&device);

        let orchestrator = &harness.orchestrator;
        assert_eq!(orchestrator.controller(ResourceKind::Route).item_count(), 2);
        assert!(device.request_log().is_empty());
    }

    #[test]
    fn test_empty_editing_surface_shows_device_plan() {
        let device = seeded_device(1);
        let mut harness = Harness::offline(true);
        harness.connect(&device);

        let orchestrator = &harness.orchestrator;
        assert_eq!(orchestrator.controller(ResourceKind::Route).item_count(), 3);
        assert_eq!(orchestrator.controller(ResourceKind::Boundary).item_count(), 1);
        assert_eq!(orchestrator.controller(ResourceKind::RallyPoints).item_count(), 1);
        assert!(!orchestrator.dirty());
    }

    #[test]
    fn test_initial_request_propagates_by_itself() {
        let device = seeded_device(1);
        device.begin_initial_plan_request();
        let mut harness = Harness::offline(true);
        harness.connect(&device);

        // Route claims; nothing is adopted until the device's own download lands.
        assert!(!harness.orchestrator.contains_items());
        assert!(!device.initial_plan_request_complete());

        for _ in CASCADE_ORDER {
            harness.complete(&device);
        }
        let orchestrator = &harness.orchestrator;
        assert!(device.initial_plan_request_complete());
        assert_eq!(orchestrator.controller(ResourceKind::Route).item_count(), 3);
        assert_eq!(orchestrator.controller(ResourceKind::RallyPoints).item_count(), 1);
        assert!(device.request_log().is_empty());
    }

    #[test]
    fn test_watchdog_forces_stalled_handshake() {
        let device = seeded_device(1);
        device.begin_initial_plan_request();
        device.fail_next("no answer");
        assert!(!device.initial_plan_request_complete());

        let mut harness = Harness::offline(true);
        harness.connect(&device);

        assert!(device.initial_plan_request_complete());
        assert_eq!(harness.orchestrator.controller(ResourceKind::Route).item_count(), 3);
    }

    #[derive(Default)]
    struct ShowLog(Mutex<Vec<ResourceKind>>);

    struct RecordingController {
        inner: Box<dyn SubResourceController>,
        log: Arc<ShowLog>,
        claims: bool,
    }

    impl SubResourceController for RecordingController {
        fn kind(&self) -> ResourceKind {
            self.inner.kind()
        }
        fn start(&mut self, edit_mode: bool) {
            self.inner.start(edit_mode);
        }
        fn manager_identity_changed(&mut self, binding: &ManagerBinding) {
            self.inner.manager_identity_changed(binding);
        }
        fn check(&self, value: &Value) -> std::result::Result<(), DocumentError> {
            self.inner.check(value)
        }
        fn load(&mut self, value: &Value) -> std::result::Result<(), DocumentError> {
            self.inner.load(value)
        }
        fn save(&self) -> Value {
            self.inner.save()
        }
        fn remove_all(&mut self) {
            self.inner.remove_all();
        }
        fn load_from_device(&mut self) -> std::result::Result<(), RemoteError> {
            self.inner.load_from_device()
        }
        fn send_to_device(&mut self) -> std::result::Result<(), RemoteError> {
            self.inner.send_to_device()
        }
        fn remove_all_from_device(&mut self) -> std::result::Result<(), RemoteError> {
            self.inner.remove_all_from_device()
        }
        fn show_plan_from_manager(&mut self) -> bool {
            self.log.0.lock().expect("log lock").push(self.kind());
            self.claims
        }
        fn on_transfer_complete(
            &mut self,
            op: TransferOp,
            outcome: TransferOutcome,
        ) -> std::result::Result<(), RemoteError> {
            self.inner.on_transfer_complete(op, outcome)
        }
        fn dirty(&self) -> bool {
            self.inner.dirty()
        }
        fn set_dirty(&mut self, dirty: bool) {
            self.inner.set_dirty(dirty);
        }
        fn contains_items(&self) -> bool {
            self.inner.contains_items()
        }
        fn item_count(&self) -> usize {
            self.inner.item_count()
        }
        fn sync_in_progress(&self) -> bool {
            self.inner.sync_in_progress()
        }
    }

    fn recording(claims: [bool; 3], log: &Arc<ShowLog>) -> [Box<dyn SubResourceController>; 3] {
        let inner: [Box<dyn SubResourceController>; 3] = [
            Box::new(SectionController::<RouteSection>::new()),
            Box::new(SectionController::<BoundarySection>::new()),
            Box::new(SectionController::<RallySection>::new()),
        ];
        let mut claims = claims.into_iter();
        inner.map(|inner| {
            Box::new(RecordingController {
                inner,
                log: Arc::clone(log),
                claims: claims.next().unwrap_or(false),
            }) as Box<dyn SubResourceController>
        })
    }

    #[test]
    fn test_first_claim_stops_show_plan() {
        let log = Arc::new(ShowLog::default());
        let mut orchestrator = SyncOrchestrator::with_controllers(
            "test",
            DeviceProfile::default(),
            recording([true, false, false], &log),
        );
        let (_active, rx) = watch::channel(None);
        orchestrator.start(true, rx);

        let device = Arc::new(SimulatedDevice::manual(1));
        orchestrator.device_identity_changed(Some(handle(&device)));

        assert_eq!(*log.0.lock().expect("log lock"), vec![ResourceKind::Route]);
    }

    #[test]
    fn test_show_plan_falls_through_until_claimed() {
        let log = Arc::new(ShowLog::default());
        let mut orchestrator = SyncOrchestrator::with_controllers(
            "test",
            DeviceProfile::default(),
            recording([false, true, false], &log),
        );
        let (_active, rx) = watch::channel(None);
        orchestrator.start(false, rx);

        let device = Arc::new(SimulatedDevice::manual(1));
        orchestrator.device_identity_changed(Some(handle(&device)));

        assert_eq!(
            *log.0.lock().expect("log lock"),
            vec![ResourceKind::Route, ResourceKind::Boundary]
        );
    }

    #[test]
    fn test_save_load_round_trip() {
        let mut source = Harness::offline(true);
        source.orchestrator.load_document(&plan_bytes(1)).expect("valid plan");
        let saved = source.orchestrator.save_document().expect("serializes");

        let mut target = Harness::offline(true);
        target.orchestrator.load_document(&saved).expect("round trip");

        for kind in CASCADE_ORDER {
            assert_eq!(
                source.orchestrator.controller(kind).save(),
                target.orchestrator.controller(kind).save()
            );
        }
        assert_eq!(source.orchestrator.document(), target.orchestrator.document());
    }

    /// Deterministic coordinates spread over the full lat/lon range.
    struct Coordinates(u64);

    impl Coordinates {
        fn next_unit(&mut self) -> f64 {
            self.0 ^= self.0 << 13;
            self.0 ^= self.0 >> 7;
            self.0 ^= self.0 << 17;
            (self.0 >> 11) as f64 / (1_u64 << 53) as f64
        }

        fn lat(&mut self) -> f64 {
            self.next_unit().mul_add(180.0, -90.0)
        }

        fn lon(&mut self) -> f64 {
            self.next_unit().mul_add(360.0, -180.0)
        }

        fn alt(&mut self) -> f64 {
            self.next_unit().mul_add(500.0, 0.123_456_789)
        }
    }

    #[test]
    fn test_save_load_round_trip_keeps_full_precision() {
        let mut coords = Coordinates(0x9E37_79B9_7F4A_7C15);

        let mut route = RouteSection {
            cruise_speed: Some(coords.alt()),
            planned_home_position: Some([coords.lat(), coords.lon(), coords.alt()]),
            ..RouteSection::default()
        };
        for i in 0..500 {
            route.items.push(
                MissionItem::positional(16, 3, coords.lat(), coords.lon(), coords.alt())
                    .with_jump_id(i + 1),
            );
        }

        let boundary = BoundarySection {
            polygons: vec![FencePolygon {
                inclusion: true,
                polygon: (0..500).map(|_| [coords.lat(), coords.lon()]).collect(),
            }],
            circles: (0..200)
                .map(|_| FenceCircle {
                    inclusion: false,
                    center: [coords.lat(), coords.lon()],
                    radius: coords.alt() + 1.0,
                })
                .collect(),
            ..BoundarySection::default()
        };

        let rally = RallySection {
            points: (0..5000)
                .map(|_| [coords.lat(), coords.lon(), coords.alt()])
                .collect(),
            ..RallySection::default()
        };

        let bytes = serde_json::to_vec(&json!({
            "fileType": "Plan",
            "version": 1,
            "groundStation": "test",
            "mission": route.to_value(),
            "geoFence": boundary.to_value(),
            "rallyPoints": rally.to_value()
        }))
        .expect("serializes");

        let mut source = Harness::offline(true);
        source.orchestrator.load_document(&bytes).expect("valid plan");
        let saved = source.orchestrator.save_document().expect("serializes");

        let mut target = Harness::offline(true);
        target.orchestrator.load_document(&saved).expect("round trip");
        let orchestrator = &target.orchestrator;

        let loaded_route =
            RouteSection::from_value(&orchestrator.controller(ResourceKind::Route).save())
                .expect("valid route");
        let loaded_boundary =
            BoundarySection::from_value(&orchestrator.controller(ResourceKind::Boundary).save())
                .expect("valid boundary");
        let loaded_rally =
            RallySection::from_value(&orchestrator.controller(ResourceKind::RallyPoints).save())
                .expect("valid rally points");

        assert_eq!(loaded_route, route);
        assert_eq!(loaded_boundary, boundary);
        assert_eq!(loaded_rally, rally);
    }

    #[test]
    fn test_unsupported_version_leaves_plan_unchanged() {
        let mut harness = Harness::offline(true);
        harness.orchestrator.load_document(&plan_bytes(1)).expect("valid plan");
        let before = harness.orchestrator.document();

        let err = harness
            .orchestrator
            .load_document(&plan_bytes(2))
            .expect_err("version 2 is unsupported");

        assert!(err.is_malformed_document());
        assert_eq!(harness.orchestrator.document(), before);
    }

    #[test]
    fn test_invalid_section_is_not_partially_applied() {
        let mut harness = Harness::offline(true);
        let bytes = serde_json::to_vec(&json!({
            "fileType": "Plan",
            "version": 1,
            "mission": route(2),
            "geoFence": boundary(),
            "rallyPoints": { "version": 2, "points": [[123.0, 8.0, 30.0]] }
        }))
        .expect("serializes");

        assert!(harness.orchestrator.load_document(&bytes).is_err());
        assert!(!harness.orchestrator.contains_items());
    }

    #[test]
    fn test_legacy_load_clears_boundary_and_rally() {
        let mut harness = Harness::offline(true);
        harness.orchestrator.load_document(&plan_bytes(1)).expect("valid plan");

        let waypoints = "QGC WPL 110\n0\t1\t0\t16\t0\t0\t0\t0\t47.0\t8.0\t400\t1\n\
                         1\t0\t3\t16\t0\t0\t0\t0\t47.1\t8.1\t50\t1\n";
        harness
            .orchestrator
            .load_document_as(waypoints.as_bytes(), DocumentFormat::Waypoints)
            .expect("valid waypoints");

        let orchestrator = &harness.orchestrator;
        assert_eq!(orchestrator.controller(ResourceKind::Route).item_count(), 1);
        assert!(!orchestrator.controller(ResourceKind::Boundary).contains_items());
        assert!(!orchestrator.controller(ResourceKind::RallyPoints).contains_items());
    }

    #[test]
    fn test_dirty_after_load_and_save() {
        let mut offline = Harness::offline(true);
        offline.orchestrator.load_document(&plan_bytes(1)).expect("valid plan");
        assert!(!offline.orchestrator.dirty());
        offline.orchestrator.set_dirty(true);
        offline.orchestrator.save_document().expect("serializes");
        assert!(!offline.orchestrator.dirty());

        let device = seeded_device(1);
        let mut online = Harness::offline(true);
        online.connect(&device);
        online.orchestrator.load_document(&plan_bytes(1)).expect("valid plan");
        assert!(online.orchestrator.dirty());
        online.orchestrator.save_document().expect("serializes");
        assert!(online.orchestrator.dirty());
    }

    #[test]
    fn test_connect_copies_profile_to_stand_in() {
        use crate::device::{Firmware, VehicleClass};

        let rover = DeviceProfile::new(Firmware::Ardupilot, VehicleClass::Rover);
        let device = Arc::new(SimulatedDevice::new(1, rover, crate::device::SimulationMode::Manual));
        let mut harness = Harness::offline(true);
        harness.connect(&device);
        harness.disconnect();

        assert_eq!(harness.orchestrator.offline_profile(), rover);
    }

    #[test]
    fn test_remove_all_from_device() {
        let device = seeded_device(1);
        let mut harness = Harness::offline(true);
        harness.connect(&device);
        assert!(harness.orchestrator.contains_items());

        harness.orchestrator.remove_all_from_device().expect("issued");
        assert!(harness.orchestrator.sync_in_progress());
        while device.complete_next().is_some() {}
        harness.orchestrator.drain_pending();

        assert!(!harness.orchestrator.contains_items());
        assert!(!harness.orchestrator.sync_in_progress());
        assert_eq!(
            device.dataset(ResourceKind::Route),
            ResourceKind::Route.empty_section()
        );
    }

    #[test]
    fn test_status_notifications_only_on_change() {
        let mut harness = Harness::offline(true);
        harness.orchestrator.load_document(&plan_bytes(1)).expect("valid plan");
        assert_eq!(
            harness.notifications(),
            vec![SyncNotification::ContainsItemsChanged {
                contains_items: true
            }]
        );

        harness.orchestrator.set_dirty(false);
        assert!(harness.notifications().is_empty());

        harness.orchestrator.remove_all();
        assert!(harness.notifications().contains(&SyncNotification::ContainsItemsChanged {
            contains_items: false
        }));
    }

    #[tokio::test]
    async fn test_process_next_follows_watch_channel() {
        let device = Arc::new(SimulatedDevice::auto(7, Duration::from_millis(2)));
        device.set_dataset(ResourceKind::Route, route(1));

        let mut orchestrator = SyncOrchestrator::new("test", DeviceProfile::default());
        let (active, rx) = watch::channel(None);
        orchestrator.start(true, rx);

        active.send_replace(Some(handle(&device)));
        assert!(orchestrator.process_next().await);
        assert!(!orchestrator.offline());

        orchestrator.load_from_device().expect("cascade starts");
        orchestrator.run_until_idle().await;

        assert_eq!(orchestrator.controller(ResourceKind::Route).item_count(), 1);
        assert!(orchestrator.history().last().is_some_and(SyncHistoryEntry::succeeded));
    }

    #[tokio::test]
    async fn test_send_plan_to_device() {
        let device = Arc::new(SimulatedDevice::auto(3, Duration::from_millis(1)));

        let entry = SyncOrchestrator::send_plan_to_device(
            handle(&device),
            &plan_bytes(1),
            DocumentFormat::Plan,
        )
        .await
        .expect("plan sent");

        assert!(entry.succeeded());
        assert_eq!(entry.direction, CascadeDirection::Store);
        let stored = RouteSection::from_value(&device.dataset(ResourceKind::Route))
            .expect("device holds a valid route");
        assert_eq!(stored.items.len(), 2);
        assert!(!device.is_subscribed());
    }

    #[tokio::test]
    async fn test_file_round_trip_through_store() {
        let temp = tempfile::TempDir::new().expect("temp dir");
        let store: Arc<dyn PlanStore> = Arc::new(crate::store::LocalPlanStore::with_base_dir(temp.path()));

        let mut orchestrator =
            SyncOrchestrator::new("test", DeviceProfile::default()).with_store(Arc::clone(&store));
        orchestrator.load_document(&plan_bytes(1)).expect("valid plan");
        let written = orchestrator
            .save_file(Path::new("survey"))
            .await
            .expect("saved");
        assert_eq!(written, PathBuf::from("survey.plan"));

        let mut reloaded = SyncOrchestrator::new("test", DeviceProfile::default()).with_store(store);
        reloaded.load_file(&written).await.expect("loaded");
        assert_eq!(reloaded.document(), orchestrator.document());
    }
}
