//! Sub-resource controllers.
//!
//! A controller owns the in-memory editable copy of one dataset and delegates
//! remote transfers to the transfer manager of the current manager identity.
//! The orchestrator only ever talks to controllers through
//! [`SubResourceController`], so the cascade logic is independent of the
//! section formats.

use serde_json::Value;
use tracing::{debug, info, warn};

use crate::device::{ManagerBinding, TransferManager, TransferOp, TransferOutcome};
use crate::error::{DocumentError, RemoteError};

use super::hash::SectionHasher;
use super::kind::ResourceKind;
use super::section::PlanSection;

/// Contract between the orchestrator and one sub-resource.
pub trait SubResourceController: Send {
    /// Sub-resource this controller owns.
    fn kind(&self) -> ResourceKind;

    /// Enters editing (`true`) or live-operation (`false`) mode.
    fn start(&mut self, edit_mode: bool);

    /// Rebinds the controller to a new manager identity.
    ///
    /// Any request still outstanding against the previous identity is forgotten.
    fn manager_identity_changed(&mut self, binding: &ManagerBinding);

    /// Checks that `value` is a valid serialized section without applying it.
    ///
    /// # Errors
    ///
    /// Returns an error describing why the section is malformed.
    fn check(&self, value: &Value) -> Result<(), DocumentError>;

    /// Replaces the local copy with a serialized section.
    ///
    /// # Errors
    ///
    /// Returns an error if the section is malformed; the local copy is unchanged.
    fn load(&mut self, value: &Value) -> Result<(), DocumentError>;

    /// Serializes the local copy.
    fn save(&self) -> Value;

    /// Clears the local copy.
    fn remove_all(&mut self);

    /// Requests the device copy.
    ///
    /// # Errors
    ///
    /// Returns an error if the manager identity has no transport.
    fn load_from_device(&mut self) -> Result<(), RemoteError>;

    /// Sends the local copy to the device.
    ///
    /// # Errors
    ///
    /// Returns an error if the manager identity has no transport.
    fn send_to_device(&mut self) -> Result<(), RemoteError>;

    /// Clears the device copy.
    ///
    /// # Errors
    ///
    /// Returns an error if the manager identity has no transport.
    fn remove_all_from_device(&mut self) -> Result<(), RemoteError>;

    /// Offers to populate the view from the manager identity.
    ///
    /// Returns `true` if the controller claims the request, in which case the
    /// remaining controllers are not asked this round.
    fn show_plan_from_manager(&mut self) -> bool;

    /// Applies a completed transfer.
    ///
    /// # Errors
    ///
    /// Returns an error if a request issued by this controller failed, or if
    /// the device returned data that does not parse.
    fn on_transfer_complete(
        &mut self,
        op: TransferOp,
        outcome: TransferOutcome,
    ) -> Result<(), RemoteError>;

    /// Returns true if the local copy differs from the last loaded or stored snapshot.
    fn dirty(&self) -> bool;

    /// Forces the dirty flag; `false` makes the current copy the new snapshot.
    fn set_dirty(&mut self, dirty: bool);

    /// Returns true if the local copy holds anything.
    fn contains_items(&self) -> bool;

    /// Number of top-level entries in the local copy.
    fn item_count(&self) -> usize;

    /// Returns true while a transfer for this sub-resource is outstanding.
    fn sync_in_progress(&self) -> bool;
}

/// In-memory controller for one section type.
#[derive(Debug)]
pub struct SectionController<S: PlanSection> {
    section: S,
    baseline: String,
    forced_dirty: bool,
    edit_mode: bool,
    binding: Option<ManagerBinding>,
    pending: Option<TransferOp>,
    hasher: SectionHasher,
}

impl<S: PlanSection> Default for SectionController<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: PlanSection> SectionController<S> {
    /// Creates a controller holding an empty section.
    #[must_use]
    pub fn new() -> Self {
        let hasher = SectionHasher::new();
        let section = S::default();
        let baseline = hasher.fingerprint(&section);
        Self {
            section,
            baseline,
            forced_dirty: false,
            edit_mode: true,
            binding: None,
            pending: None,
            hasher,
        }
    }

    /// The local copy.
    #[must_use]
    pub const fn section(&self) -> &S {
        &self.section
    }

    /// Edits the local copy in place.
    pub fn edit(&mut self, f: impl FnOnce(&mut S)) {
        f(&mut self.section);
    }

    /// Request currently awaited from the device, if any.
    #[must_use]
    pub const fn pending(&self) -> Option<TransferOp> {
        self.pending
    }

    fn rebaseline(&mut self) {
        self.baseline = self.hasher.fingerprint(&self.section);
        self.forced_dirty = false;
    }

    fn transfer(&self) -> Result<std::sync::Arc<dyn TransferManager>, RemoteError> {
        self.binding
            .as_ref()
            .and_then(|binding| binding.transfer(S::KIND))
            .ok_or(RemoteError::NoTransport { kind: S::KIND })
    }

    fn adopt(&mut self, value: &Value) -> Result<(), RemoteError> {
        let section = S::from_value(value).map_err(|e| RemoteError::InvalidPayload {
            kind: S::KIND,
            message: e.to_string(),
        })?;
        self.section = section;
        self.rebaseline();
        Ok(())
    }
}

impl<S: PlanSection> SubResourceController for SectionController<S> {
    fn kind(&self) -> ResourceKind {
        S::KIND
    }

    fn start(&mut self, edit_mode: bool) {
        self.edit_mode = edit_mode;
    }

    fn manager_identity_changed(&mut self, binding: &ManagerBinding) {
        if let Some(op) = self.pending.take() {
            debug!("Abandoning outstanding {op} of {}", S::KIND);
        }
        self.binding = Some(binding.clone());
    }

    fn check(&self, value: &Value) -> Result<(), DocumentError> {
        S::from_value(value).map(|_| ())
    }

    fn load(&mut self, value: &Value) -> Result<(), DocumentError> {
        self.section = S::from_value(value)?;
        self.rebaseline();
        Ok(())
    }

    fn save(&self) -> Value {
        self.section.to_value()
    }

    fn remove_all(&mut self) {
        self.section = S::default();
    }

    fn load_from_device(&mut self) -> Result<(), RemoteError> {
        let transfer = self.transfer()?;
        self.pending = Some(TransferOp::Load);
        transfer.request_load();
        Ok(())
    }

    fn send_to_device(&mut self) -> Result<(), RemoteError> {
        let transfer = self.transfer()?;
        self.pending = Some(TransferOp::Store);
        transfer.request_store(self.section.to_value());
        Ok(())
    }

    fn remove_all_from_device(&mut self) -> Result<(), RemoteError> {
        let transfer = self.transfer()?;
        self.pending = Some(TransferOp::RemoveAll);
        transfer.request_remove_all();
        Ok(())
    }

    fn show_plan_from_manager(&mut self) -> bool {
        let Some(binding) = self.binding.as_ref() else {
            warn!("show plan for {} called without a manager identity", S::KIND);
            return true;
        };
        if binding.offline {
            warn!("show plan for {} called while offline", S::KIND);
            return true;
        }
        if !binding.device.initial_plan_request_complete() || self.sync_in_progress() {
            // The device-initiated load will arrive through the subscription.
            return true;
        }

        let Ok(transfer) = self.transfer() else {
            return true;
        };
        let cached = transfer.cached();
        if let Err(e) = self.adopt(&cached) {
            warn!("Ignoring cached {}: {e}", S::KIND);
        }
        false
    }

    fn on_transfer_complete(
        &mut self,
        op: TransferOp,
        outcome: TransferOutcome,
    ) -> Result<(), RemoteError> {
        let requested = self.pending == Some(op);
        if requested {
            self.pending = None;
        }

        match outcome {
            TransferOutcome::Failure(reason) => {
                if requested {
                    return Err(RemoteError::StageFailed {
                        kind: S::KIND,
                        op,
                        reason,
                    });
                }
                warn!("Device-initiated {op} of {} failed: {reason}", S::KIND);
            }
            TransferOutcome::Success(value) => match op {
                TransferOp::Load => {
                    if requested || !self.edit_mode || self.section.is_empty() {
                        self.adopt(&value)?;
                        debug!("Loaded {} ({} entries)", S::KIND, self.section.item_count());
                    } else {
                        info!("Keeping local {} edits over device copy", S::KIND);
                    }
                }
                TransferOp::Store if requested => self.rebaseline(),
                TransferOp::RemoveAll if requested => {
                    self.section = S::default();
                    self.rebaseline();
                }
                _ => debug!("Ignoring unrequested {op} completion for {}", S::KIND),
            },
        }
        Ok(())
    }

    fn dirty(&self) -> bool {
        self.forced_dirty || self.hasher.fingerprint(&self.section) != self.baseline
    }

    fn set_dirty(&mut self, dirty: bool) {
        if dirty {
            self.forced_dirty = true;
        } else {
            self.rebaseline();
        }
    }

    fn contains_items(&self) -> bool {
        !self.section.is_empty()
    }

    fn item_count(&self) -> usize {
        self.section.item_count()
    }

    fn sync_in_progress(&self) -> bool {
        self.pending.is_some()
            || self
                .binding
                .as_ref()
                .and_then(|binding| binding.transfer(S::KIND))
                .is_some_and(|transfer| transfer.in_progress())
    }
}
