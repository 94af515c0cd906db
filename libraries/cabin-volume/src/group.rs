//! Volume group gain state
//!
//! One `VolumeGroupState` per volume group per zone. It keeps the index the
//! user asked for and four override layers on top of it:
//!
//! - muted → min index (outranks everything)
//! - blocked → blocked index
//! - attenuated → attenuated index, capped by the limit when both are set
//! - limited → requested index capped at the limit index

use std::fmt;
use std::sync::Arc;

use tracing::{debug, warn};

use cabin_core::{
    CabinError, CarAudioContext, GainReason, GroupId, Result, SettingsStore, UserId,
    VolumeGroupConfig, ZoneId,
};

use crate::reasons::GainDirectives;

/// Which explicit changes are written to the settings store
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Persistence {
    pub gain: bool,
    pub mute: bool,
}

impl Default for Persistence {
    fn default() -> Self {
        Self {
            gain: true,
            mute: false,
        }
    }
}

/// Kind of change reported for a volume group
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum VolumeEventKind {
    /// Requested or effective index changed
    IndexChanged,

    BlockedChanged,

    /// Limit or attenuation changed
    AttenuationChanged,

    MuteChanged,
}

/// What a volume operation changed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VolumeGroupEvent {
    pub zone: ZoneId,
    pub group: GroupId,
    pub kinds: Vec<VolumeEventKind>,
    pub effective_index: i32,
}

impl VolumeGroupEvent {
    pub fn has(&self, kind: VolumeEventKind) -> bool {
        self.kinds.contains(&kind)
    }

    /// Fold a later event for the same group into this one
    pub(crate) fn merge(&mut self, later: Self) {
        for kind in later.kinds {
            if !self.kinds.contains(&kind) {
                self.kinds.push(kind);
            }
        }
        self.kinds.sort();
        self.effective_index = later.effective_index;
    }
}

/// Read-only copy of a group's gain state
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VolumeGroupSnapshot {
    pub zone: ZoneId,
    pub group: GroupId,
    pub name: String,
    pub min_index: i32,
    pub max_index: i32,
    pub requested_index: i32,
    pub effective_index: i32,
    pub muted: bool,
    pub blocked_index: Option<i32>,
    pub limited_index: Option<i32>,
    pub attenuated_index: Option<i32>,
}

pub struct VolumeGroupState {
    zone: ZoneId,
    id: GroupId,
    name: String,
    min_index: i32,
    max_index: i32,
    default_index: i32,
    step_size: i32,
    addresses: Vec<String>,
    contexts: Vec<CarAudioContext>,

    requested_index: i32,
    muted: bool,
    blocked_index: Option<i32>,
    limited_index: Option<i32>,
    attenuated_index: Option<i32>,

    user: UserId,
    settings: Arc<dyn SettingsStore>,
    persistence: Persistence,
}

impl fmt::Debug for VolumeGroupState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VolumeGroupState")
            .field("zone", &self.zone)
            .field("id", &self.id)
            .field("requested_index", &self.requested_index)
            .field("muted", &self.muted)
            .field("blocked_index", &self.blocked_index)
            .field("limited_index", &self.limited_index)
            .field("attenuated_index", &self.attenuated_index)
            .finish_non_exhaustive()
    }
}

impl VolumeGroupState {
    /// Build a group from configuration and load the user's stored settings
    ///
    /// # Errors
    /// `CabinError::Config` when the group configuration is invalid.
    pub fn new(
        zone: ZoneId,
        config: &VolumeGroupConfig,
        user: UserId,
        settings: Arc<dyn SettingsStore>,
        persistence: Persistence,
    ) -> Result<Self> {
        config.validate()?;
        let step_size = config
            .devices
            .first()
            .map(|device| device.step_size)
            .ok_or_else(|| CabinError::config(format!("volume group {} has no devices", config.id)))?;

        let mut state = Self {
            zone,
            id: config.id,
            name: config.name.clone(),
            min_index: config.min_index,
            max_index: config.max_index,
            default_index: config.default_index,
            step_size,
            addresses: config.addresses().map(str::to_string).collect(),
            contexts: config.contexts().collect(),
            requested_index: config.default_index,
            muted: false,
            blocked_index: None,
            limited_index: None,
            attenuated_index: None,
            user,
            settings,
            persistence,
        };
        state.load_for_user(user);
        Ok(state)
    }

    pub fn zone(&self) -> ZoneId {
        self.zone
    }

    pub fn id(&self) -> GroupId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn min_index(&self) -> i32 {
        self.min_index
    }

    pub fn max_index(&self) -> i32 {
        self.max_index
    }

    pub fn step_size(&self) -> i32 {
        self.step_size
    }

    pub fn addresses(&self) -> &[String] {
        &self.addresses
    }

    pub fn contexts(&self) -> &[CarAudioContext] {
        &self.contexts
    }

    /// Last explicitly requested index
    pub fn requested_index(&self) -> i32 {
        self.requested_index
    }

    /// Index actually applied to the hardware
    pub fn effective_index(&self) -> i32 {
        if self.muted {
            return self.min_index;
        }
        if let Some(blocked) = self.blocked_index {
            return blocked;
        }
        if let Some(attenuated) = self.attenuated_index {
            return self
                .limited_index
                .map_or(attenuated, |limit| attenuated.min(limit));
        }
        self.limited_index
            .map_or(self.requested_index, |limit| self.requested_index.min(limit))
    }

    pub fn is_muted(&self) -> bool {
        self.muted
    }

    pub fn is_blocked(&self) -> bool {
        self.blocked_index.is_some()
    }

    pub fn is_limited(&self) -> bool {
        self.limited_index.is_some()
    }

    pub fn is_attenuated(&self) -> bool {
        self.attenuated_index.is_some()
    }

    /// Limited, with the requested index above the limit
    pub fn is_over_limit(&self) -> bool {
        self.limited_index
            .is_some_and(|limit| self.requested_index > limit)
    }

    /// Set the requested index; clears mute
    ///
    /// While blocked the request is stored but the output stays at the
    /// blocked index.
    ///
    /// # Errors
    /// `CabinError::GainIndexOutOfRange` when `index` is outside [min, max];
    /// nothing is changed.
    pub fn set_current_gain_index(&mut self, index: i32) -> Result<Option<VolumeGroupEvent>> {
        if !self.in_range(index) {
            return Err(CabinError::GainIndexOutOfRange {
                index,
                min: self.min_index,
                max: self.max_index,
            });
        }

        let before = self.snapshot();
        self.requested_index = index;
        self.persist_gain();
        if self.muted {
            self.muted = false;
            self.persist_mute();
        }
        Ok(self.event_since(&before))
    }

    pub fn set_mute(&mut self, muted: bool) -> Option<VolumeGroupEvent> {
        if self.muted == muted {
            return None;
        }
        let before = self.snapshot();
        self.muted = muted;
        self.persist_mute();
        self.event_since(&before)
    }

    /// Apply one hardware gain change
    ///
    /// Each event carries the complete set of active reasons: every override
    /// it does not name is lifted. An empty reason list therefore restores
    /// the last requested index. Events whose index is used but outside
    /// [min, max] are dropped.
    pub fn on_hardware_gain_event(
        &mut self,
        reasons: &[GainReason],
        index: i32,
    ) -> Option<VolumeGroupEvent> {
        let directives = GainDirectives::from_reasons(reasons);
        if directives.uses_index() && !self.in_range(index) {
            warn!(
                zone = %self.zone,
                group = %self.id,
                index,
                min = self.min_index,
                max = self.max_index,
                "hardware gain index out of range, event dropped"
            );
            return None;
        }

        let before = self.snapshot();
        self.blocked_index = directives.block.then_some(index);
        self.limited_index = directives.limit.then_some(index);
        self.attenuated_index = directives.duck.then_some(index);
        if directives.amp_feedback && self.requested_index != index {
            debug!(zone = %self.zone, group = %self.id, index, "adopting amplifier volume feedback");
            self.requested_index = index;
            self.persist_gain();
        }

        let event = self.event_since(&before);
        if event.is_some() {
            debug!(
                zone = %self.zone,
                group = %self.id,
                ?directives,
                effective = self.effective_index(),
                "hardware gain override applied"
            );
        }
        event
    }

    /// Switch to another user's stored index and mute state
    ///
    /// Hardware overrides are not per-user and stay in place.
    pub fn load_for_user(&mut self, user: UserId) -> Option<VolumeGroupEvent> {
        let before = self.snapshot();
        self.user = user;

        let stored = match self.settings.load(user, self.zone, self.id) {
            Ok(stored) => stored,
            Err(error) => {
                warn!(zone = %self.zone, group = %self.id, %user, %error, "failed to load volume settings");
                None
            }
        };
        let stored = stored.unwrap_or_default();

        self.requested_index = stored
            .gain_index
            .filter(|index| self.in_range(*index))
            .unwrap_or(self.default_index);
        self.muted = self.persistence.mute && stored.muted;
        self.event_since(&before)
    }

    pub fn snapshot(&self) -> VolumeGroupSnapshot {
        VolumeGroupSnapshot {
            zone: self.zone,
            group: self.id,
            name: self.name.clone(),
            min_index: self.min_index,
            max_index: self.max_index,
            requested_index: self.requested_index,
            effective_index: self.effective_index(),
            muted: self.muted,
            blocked_index: self.blocked_index,
            limited_index: self.limited_index,
            attenuated_index: self.attenuated_index,
        }
    }

    fn in_range(&self, index: i32) -> bool {
        (self.min_index..=self.max_index).contains(&index)
    }

    fn event_since(&self, before: &VolumeGroupSnapshot) -> Option<VolumeGroupEvent> {
        let effective_index = self.effective_index();
        let mut kinds = Vec::new();
        if before.requested_index != self.requested_index
            || before.effective_index != effective_index
        {
            kinds.push(VolumeEventKind::IndexChanged);
        }
        if before.blocked_index != self.blocked_index {
            kinds.push(VolumeEventKind::BlockedChanged);
        }
        if before.limited_index != self.limited_index
            || before.attenuated_index != self.attenuated_index
        {
            kinds.push(VolumeEventKind::AttenuationChanged);
        }
        if before.muted != self.muted {
            kinds.push(VolumeEventKind::MuteChanged);
        }

        (!kinds.is_empty()).then(|| VolumeGroupEvent {
            zone: self.zone,
            group: self.id,
            kinds,
            effective_index,
        })
    }

    fn persist_gain(&self) {
        if !self.persistence.gain {
            return;
        }
        if let Err(error) =
            self.settings
                .store_gain_index(self.user, self.zone, self.id, self.requested_index)
        {
            warn!(zone = %self.zone, group = %self.id, %error, "failed to persist gain index");
        }
    }

    fn persist_mute(&self) {
        if !self.persistence.mute {
            return;
        }
        if let Err(error) = self
            .settings
            .store_mute(self.user, self.zone, self.id, self.muted)
        {
            warn!(zone = %self.zone, group = %self.id, %error, "failed to persist mute");
        }
    }
}
