/// Collaborator traits for Cabin Audio
use crate::error::Result;
use crate::types::{
    AudioAttribute, AudioUsage, ClientId, DuckingInfo, FocusChange, FocusEntry, FocusOutcome,
    FocusRequest, LostFocusEntry, ZoneId,
};

/// Hardware audio-routing abstraction
///
/// Every call is an outbound, fire-and-forget notification. Implementations
/// must not block: they are invoked from inside arbitration and gain critical
/// sections.
pub trait AudioControl: Send + Sync {
    /// One batched duck/unduck command covering every changed zone
    fn on_devices_to_duck_change(&self, ducking: &[DuckingInfo]);

    /// Apply an effective gain index to a device address
    fn set_gain_index(&self, zone: ZoneId, address: &str, index: i32);

    /// Last gain index applied to a device, if the hardware reports one
    fn gain_index(&self, zone: ZoneId, address: &str) -> Option<i32> {
        let _ = (zone, address);
        None
    }

    /// Focus change for a hardware-originated focus request
    fn on_hal_focus_change(&self, zone: ZoneId, usage: AudioUsage, change: FocusChange) {
        let _ = (zone, usage, change);
    }
}

/// Snapshot handed to an override collaborator for one focus request
#[derive(Debug, Clone, Copy)]
pub struct FocusEvaluationRequest<'a> {
    pub zone: ZoneId,
    pub request: &'a FocusRequest,
    pub holders: &'a [FocusEntry],
    pub losers: &'a [LostFocusEntry],
    pub delayed: &'a [FocusEntry],
    pub restricted: bool,
}

/// Authoritative verdict from an override collaborator
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OverrideFocusVerdict {
    /// Result returned to the requester
    pub outcome: FocusOutcome,

    /// Holders or losers that lose focus permanently
    pub newly_lost: Vec<ClientId>,

    /// Holders that lose focus until the requester abandons
    pub newly_blocked: Vec<ClientId>,
}

impl OverrideFocusVerdict {
    /// Verdict that changes nobody else's state
    pub fn outcome(outcome: FocusOutcome) -> Self {
        Self {
            outcome,
            newly_lost: Vec::new(),
            newly_blocked: Vec::new(),
        }
    }
}

/// Optional OEM arbitration and ducking override
///
/// A collaborator that is not ready, returns `Ok(None)`, or fails is treated
/// as absent and the built-in policy applies.
pub trait FocusOverride: Send + Sync {
    /// Whether the collaborator is connected and able to answer
    fn is_ready(&self) -> bool;

    /// Decide a focus request
    fn evaluate_focus(&self, request: &FocusEvaluationRequest<'_>) -> Result<Option<OverrideFocusVerdict>> {
        let _ = request;
        Ok(None)
    }

    /// Replacement list of attributes to duck, given the attributes holding focus
    fn evaluate_ducking(
        &self,
        zone: ZoneId,
        holding: &[AudioAttribute],
    ) -> Result<Option<Vec<AudioAttribute>>> {
        let _ = (zone, holding);
        Ok(None)
    }
}

/// Null-object override: never ready, never answers
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOverride;

impl FocusOverride for NoOverride {
    fn is_ready(&self) -> bool {
        false
    }
}
