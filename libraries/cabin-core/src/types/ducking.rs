/// Ducking state exchanged with the hardware layer
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use super::{AudioAttribute, ZoneId};

/// Per-zone ducking delta
///
/// `addresses_to_duck` / `addresses_to_unduck` are the change relative to the
/// previous computation for the zone; `ducked_addresses` is the full current
/// set the delta was derived from.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DuckingInfo {
    pub zone: ZoneId,

    /// Newly ducked addresses
    pub addresses_to_duck: BTreeSet<String>,

    /// Addresses no longer ducked
    pub addresses_to_unduck: BTreeSet<String>,

    /// Every address ducked after this computation
    pub ducked_addresses: BTreeSet<String>,

    /// Attributes holding focus that justify the ducking decision
    pub attributes_holding_focus: Vec<AudioAttribute>,
}

impl DuckingInfo {
    /// Empty state for a zone
    pub fn empty(zone: ZoneId) -> Self {
        Self {
            zone,
            ..Self::default()
        }
    }

    /// Whether this computation changed which addresses are ducked
    pub fn has_delta(&self) -> bool {
        !self.addresses_to_duck.is_empty() || !self.addresses_to_unduck.is_empty()
    }
}
