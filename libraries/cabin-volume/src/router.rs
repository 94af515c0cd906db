//! Hardware gain event routing
//!
//! Owns every volume group of every zone, each behind its own mutex, and
//! resolves hardware device addresses back to their group. Groups are
//! independent: a gain change in one never waits on another.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

use tracing::{debug, warn};

use cabin_core::{
    AudioControl, CabinError, GainEvent, GainReason, GroupId, Result, SettingsStore, UserId,
    ZoneConfig, ZoneId,
};

use crate::group::{Persistence, VolumeGroupEvent, VolumeGroupSnapshot, VolumeGroupState};

type GroupKey = (ZoneId, GroupId);

pub struct GainEventRouter {
    groups: HashMap<GroupKey, Arc<Mutex<VolumeGroupState>>>,
    by_address: HashMap<(ZoneId, String), GroupId>,
    zones: BTreeSet<ZoneId>,
    hal: Arc<dyn AudioControl>,
}

impl fmt::Debug for GainEventRouter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GainEventRouter")
            .field("zones", &self.zones)
            .field("groups", &self.groups.len())
            .finish_non_exhaustive()
    }
}

impl GainEventRouter {
    /// Build every configured volume group for `user`
    ///
    /// # Errors
    /// `CabinError::Config` when the zone configuration is invalid.
    pub fn new(
        zones: &[ZoneConfig],
        user: UserId,
        settings: Arc<dyn SettingsStore>,
        persistence: Persistence,
        hal: Arc<dyn AudioControl>,
    ) -> Result<Self> {
        let mut groups = HashMap::new();
        let mut by_address = HashMap::new();
        let mut zone_ids = BTreeSet::new();

        for zone in zones {
            zone.validate()?;
            zone_ids.insert(zone.id);
            for config in &zone.volume_groups {
                let state = VolumeGroupState::new(
                    zone.id,
                    config,
                    user,
                    Arc::clone(&settings),
                    persistence,
                )?;
                for address in config.addresses() {
                    by_address.insert((zone.id, address.to_string()), config.id);
                }
                groups.insert((zone.id, config.id), Arc::new(Mutex::new(state)));
            }
        }

        let router = Self {
            groups,
            by_address,
            zones: zone_ids,
            hal,
        };
        for state in router.groups.values() {
            let state = state.lock().unwrap_or_else(PoisonError::into_inner);
            router.push_gain(&state);
        }
        Ok(router)
    }

    pub fn zone_ids(&self) -> Vec<ZoneId> {
        self.zones.iter().copied().collect()
    }

    /// Volume groups of a zone in id order
    pub fn group_ids(&self, zone: ZoneId) -> Vec<GroupId> {
        let mut ids: Vec<GroupId> = self
            .groups
            .keys()
            .filter(|(group_zone, _)| *group_zone == zone)
            .map(|(_, group)| *group)
            .collect();
        ids.sort();
        ids
    }

    pub fn group_for_address(&self, zone: ZoneId, address: &str) -> Option<GroupId> {
        self.by_address.get(&(zone, address.to_string())).copied()
    }

    pub fn snapshot(&self, zone: ZoneId, group: GroupId) -> Result<VolumeGroupSnapshot> {
        self.with_group(zone, group, |state| Ok(state.snapshot()))
    }

    pub fn set_current_gain_index(
        &self,
        zone: ZoneId,
        group: GroupId,
        index: i32,
    ) -> Result<Option<VolumeGroupEvent>> {
        self.apply(zone, group, |state| state.set_current_gain_index(index))
    }

    pub fn set_mute(
        &self,
        zone: ZoneId,
        group: GroupId,
        muted: bool,
    ) -> Result<Option<VolumeGroupEvent>> {
        self.apply(zone, group, |state| Ok(state.set_mute(muted)))
    }

    pub fn on_hardware_gain_event(
        &self,
        zone: ZoneId,
        group: GroupId,
        reasons: &[GainReason],
        index: i32,
    ) -> Result<Option<VolumeGroupEvent>> {
        self.apply(zone, group, |state| {
            Ok(state.on_hardware_gain_event(reasons, index))
        })
    }

    /// Dispatch a batch of per-address hardware gain changes
    ///
    /// Unknown zones and addresses are logged and skipped. Events for the
    /// same group are applied in order under one lock and reported as one
    /// merged event.
    pub fn on_gain_events(&self, zone: ZoneId, events: &[GainEvent]) -> Vec<VolumeGroupEvent> {
        if !self.zones.contains(&zone) {
            warn!(%zone, events = events.len(), "gain events for unknown zone dropped");
            return Vec::new();
        }

        let mut per_group: BTreeMap<GroupId, Vec<&GainEvent>> = BTreeMap::new();
        for event in events {
            match self.group_for_address(zone, &event.address) {
                Some(group) => per_group.entry(group).or_default().push(event),
                None => {
                    warn!(%zone, address = %event.address, "gain event for unknown address dropped");
                }
            }
        }

        let mut changed = Vec::new();
        for (group, group_events) in per_group {
            let result = self.apply(zone, group, |state| {
                let mut merged: Option<VolumeGroupEvent> = None;
                for event in group_events {
                    if let Some(later) = state.on_hardware_gain_event(&event.reasons, event.index) {
                        merged = Some(match merged.take() {
                            Some(mut earlier) => {
                                earlier.merge(later);
                                earlier
                            }
                            None => later,
                        });
                    }
                }
                Ok(merged)
            });
            match result {
                Ok(Some(event)) => changed.push(event),
                Ok(None) => {}
                Err(error) => warn!(%zone, %group, %error, "gain events not applied"),
            }
        }
        changed
    }

    /// Reload every group for a new active user
    pub fn load_user(&self, user: UserId) -> Vec<VolumeGroupEvent> {
        debug!(%user, "loading volume settings for user");
        let mut keys: Vec<GroupKey> = self.groups.keys().copied().collect();
        keys.sort();

        keys.into_iter()
            .filter_map(|(zone, group)| {
                self.apply(zone, group, |state| Ok(state.load_for_user(user)))
                    .ok()
                    .flatten()
            })
            .collect()
    }

    fn group(&self, zone: ZoneId, group: GroupId) -> Result<&Arc<Mutex<VolumeGroupState>>> {
        if !self.zones.contains(&zone) {
            return Err(CabinError::UnknownZone(zone));
        }
        self.groups
            .get(&(zone, group))
            .ok_or(CabinError::UnknownVolumeGroup { zone, group })
    }

    fn with_group<T>(
        &self,
        zone: ZoneId,
        group: GroupId,
        op: impl FnOnce(&mut VolumeGroupState) -> Result<T>,
    ) -> Result<T> {
        let mut state = self
            .group(zone, group)?
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        op(&mut state)
    }

    /// Run a mutation and push the effective index to the hardware if it moved
    ///
    /// The push happens under the group lock so hardware sees gain changes in
    /// the order they were applied.
    fn apply(
        &self,
        zone: ZoneId,
        group: GroupId,
        op: impl FnOnce(&mut VolumeGroupState) -> Result<Option<VolumeGroupEvent>>,
    ) -> Result<Option<VolumeGroupEvent>> {
        self.with_group(zone, group, |state| {
            let before = state.effective_index();
            let event = op(state)?;
            if state.effective_index() != before {
                self.push_gain(state);
            }
            Ok(event)
        })
    }

    fn push_gain(&self, state: &VolumeGroupState) {
        let index = state.effective_index();
        for address in state.addresses() {
            self.hal.set_gain_index(state.zone(), address, index);
        }
    }
}
