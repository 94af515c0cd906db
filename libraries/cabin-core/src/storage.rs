//! Settings store for persisted per-user volume state

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::types::{GroupId, UserId, ZoneId};

/// Persisted state of one volume group for one user
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupSettings {
    /// Last explicitly requested index, if one was ever stored
    pub gain_index: Option<i32>,
    pub muted: bool,
}

/// Per-user persisted {gain index, mute} keyed by (zone, group)
///
/// Read when a group is constructed or the active user changes, written on
/// explicit index/mute changes when persistence is enabled. Implementations
/// must not block for long: callers hold a volume-group lock while writing.
pub trait SettingsStore: Send + Sync {
    /// Stored settings, or `None` when nothing was persisted yet
    fn load(&self, user: UserId, zone: ZoneId, group: GroupId) -> Result<Option<GroupSettings>>;

    /// Persist an explicitly requested gain index
    fn store_gain_index(&self, user: UserId, zone: ZoneId, group: GroupId, index: i32)
        -> Result<()>;

    /// Persist an explicit mute change
    fn store_mute(&self, user: UserId, zone: ZoneId, group: GroupId, muted: bool) -> Result<()>;
}

/// Process-local settings store
#[derive(Debug, Default)]
pub struct InMemorySettingsStore {
    entries: Mutex<HashMap<(UserId, ZoneId, GroupId), GroupSettings>>,
}

impl InMemorySettingsStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a stored value (used to model settings from a previous session)
    pub fn insert(&self, user: UserId, zone: ZoneId, group: GroupId, settings: GroupSettings) {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert((user, zone, group), settings);
    }

    fn update(
        &self,
        key: (UserId, ZoneId, GroupId),
        apply: impl FnOnce(&mut GroupSettings),
    ) {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        apply(entries.entry(key).or_default());
    }
}

impl SettingsStore for InMemorySettingsStore {
    fn load(&self, user: UserId, zone: ZoneId, group: GroupId) -> Result<Option<GroupSettings>> {
        Ok(self
            .entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&(user, zone, group))
            .copied())
    }

    fn store_gain_index(
        &self,
        user: UserId,
        zone: ZoneId,
        group: GroupId,
        index: i32,
    ) -> Result<()> {
        self.update((user, zone, group), |settings| settings.gain_index = Some(index));
        Ok(())
    }

    fn store_mute(&self, user: UserId, zone: ZoneId, group: GroupId, muted: bool) -> Result<()> {
        self.update((user, zone, group), |settings| settings.muted = muted);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn settings_are_keyed_per_user() {
        let store = InMemorySettingsStore::new();
        let zone = ZoneId::PRIMARY;
        let group = GroupId::new(1);

        store.store_gain_index(UserId::new(10), zone, group, 17).unwrap();
        store.store_mute(UserId::new(10), zone, group, true).unwrap();

        assert_eq!(
            store.load(UserId::new(10), zone, group).unwrap(),
            Some(GroupSettings {
                gain_index: Some(17),
                muted: true
            })
        );
        assert_eq!(store.load(UserId::new(11), zone, group).unwrap(), None);
    }
}
