//! Zone topology: volume-group configuration and the zone routing table
//!
//! How these are loaded is up to the embedding application; this module only
//! defines the shapes and checks their invariants.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap, HashSet};

use super::{CarAudioContext, GroupId, ZoneId};
use crate::error::{CabinError, Result};

/// One output device bound into a volume group
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceConfig {
    /// Hardware bus address
    pub address: String,

    /// Gain step size of the device; all devices of a group must agree
    pub step_size: i32,

    /// Contexts routed to this address
    pub contexts: Vec<CarAudioContext>,
}

/// A set of addresses sharing one gain control
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VolumeGroupConfig {
    pub id: GroupId,

    #[serde(default)]
    pub name: String,

    pub min_index: i32,
    pub max_index: i32,
    pub default_index: i32,

    pub devices: Vec<DeviceConfig>,
}

impl VolumeGroupConfig {
    /// Check index range, device list and step-size agreement
    pub fn validate(&self) -> Result<()> {
        if self.min_index > self.max_index {
            return Err(CabinError::config(format!(
                "volume group {}: min index {} above max index {}",
                self.id, self.min_index, self.max_index
            )));
        }
        if !(self.min_index..=self.max_index).contains(&self.default_index) {
            return Err(CabinError::config(format!(
                "volume group {}: default index {} outside [{}, {}]",
                self.id, self.default_index, self.min_index, self.max_index
            )));
        }
        let Some(first) = self.devices.first() else {
            return Err(CabinError::config(format!(
                "volume group {} has no devices",
                self.id
            )));
        };
        if let Some(device) = self
            .devices
            .iter()
            .find(|device| device.step_size != first.step_size)
        {
            return Err(CabinError::config(format!(
                "volume group {}: device {} step size {} differs from {}",
                self.id, device.address, device.step_size, first.step_size
            )));
        }
        if self
            .devices
            .iter()
            .any(|device| device.contexts.contains(&CarAudioContext::Invalid))
        {
            return Err(CabinError::config(format!(
                "volume group {}: INVALID context cannot be routed",
                self.id
            )));
        }
        Ok(())
    }

    /// Addresses bound into this group
    pub fn addresses(&self) -> impl Iterator<Item = &str> {
        self.devices.iter().map(|device| device.address.as_str())
    }

    /// Contexts bound into this group
    pub fn contexts(&self) -> impl Iterator<Item = CarAudioContext> + '_ {
        self.devices
            .iter()
            .flat_map(|device| device.contexts.iter().copied())
    }
}

/// An independently arbitrated output domain
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ZoneConfig {
    pub id: ZoneId,

    #[serde(default)]
    pub name: String,

    pub volume_groups: Vec<VolumeGroupConfig>,
}

impl ZoneConfig {
    /// Check group uniqueness and that each context and address is bound once
    pub fn validate(&self) -> Result<()> {
        let mut group_ids = HashSet::new();
        let mut addresses = HashSet::new();
        let mut contexts = HashSet::new();

        for group in &self.volume_groups {
            group.validate()?;
            if !group_ids.insert(group.id) {
                return Err(CabinError::config(format!(
                    "zone {}: duplicate volume group {}",
                    self.id, group.id
                )));
            }
            for device in &group.devices {
                if !addresses.insert(device.address.as_str()) {
                    return Err(CabinError::config(format!(
                        "zone {}: address {} bound more than once",
                        self.id, device.address
                    )));
                }
                for context in &device.contexts {
                    if !contexts.insert(*context) {
                        return Err(CabinError::config(format!(
                            "zone {}: context {} routed to more than one address",
                            self.id, context
                        )));
                    }
                }
            }
        }
        Ok(())
    }
}

/// Validate a whole zone list: non-empty, unique ids, primary zone present
pub fn validate_zones(zones: &[ZoneConfig]) -> Result<()> {
    if zones.is_empty() {
        return Err(CabinError::config("no audio zones configured"));
    }
    let mut seen = HashSet::new();
    for zone in zones {
        if !seen.insert(zone.id) {
            return Err(CabinError::config(format!("duplicate zone {}", zone.id)));
        }
        zone.validate()?;
    }
    if !seen.contains(&ZoneId::PRIMARY) {
        return Err(CabinError::config("primary zone 0 is not configured"));
    }
    Ok(())
}

/// Static, read-only (zone, context) → hardware address map
#[derive(Debug, Clone, Default)]
pub struct ZoneRoutingTable {
    routes: HashMap<ZoneId, HashMap<CarAudioContext, String>>,
}

impl ZoneRoutingTable {
    /// Build from validated zone configuration
    pub fn from_zones(zones: &[ZoneConfig]) -> Result<Self> {
        validate_zones(zones)?;
        let routes = zones
            .iter()
            .map(|zone| {
                let by_context: HashMap<CarAudioContext, String> = zone
                    .volume_groups
                    .iter()
                    .flat_map(|group| group.devices.iter())
                    .flat_map(|device| {
                        device
                            .contexts
                            .iter()
                            .map(move |context| (*context, device.address.clone()))
                    })
                    .collect();
                (zone.id, by_context)
            })
            .collect();
        Ok(Self { routes })
    }

    /// Build directly from explicit routes
    pub fn from_routes(
        routes: impl IntoIterator<Item = (ZoneId, CarAudioContext, String)>,
    ) -> Self {
        let mut table = Self::default();
        for (zone, context, address) in routes {
            table.routes.entry(zone).or_default().insert(context, address);
        }
        table
    }

    /// Address a context plays through in a zone
    pub fn address_for(&self, zone: ZoneId, context: CarAudioContext) -> Option<&str> {
        self.routes
            .get(&zone)
            .and_then(|by_context| by_context.get(&context))
            .map(String::as_str)
    }

    /// Addresses for a set of contexts; unrouted contexts are skipped
    pub fn addresses_for<I>(&self, zone: ZoneId, contexts: I) -> BTreeSet<String>
    where
        I: IntoIterator<Item = CarAudioContext>,
    {
        contexts
            .into_iter()
            .filter_map(|context| self.address_for(zone, context))
            .map(str::to_string)
            .collect()
    }

    pub fn has_zone(&self, zone: ZoneId) -> bool {
        self.routes.contains_key(&zone)
    }

    /// Zones in id order
    pub fn zone_ids(&self) -> Vec<ZoneId> {
        let mut zones: Vec<ZoneId> = self.routes.keys().copied().collect();
        zones.sort();
        zones
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn device(address: &str, step: i32, contexts: &[CarAudioContext]) -> DeviceConfig {
        DeviceConfig {
            address: address.to_string(),
            step_size: step,
            contexts: contexts.to_vec(),
        }
    }

    fn group(id: u32, devices: Vec<DeviceConfig>) -> VolumeGroupConfig {
        VolumeGroupConfig {
            id: GroupId::new(id),
            name: format!("group{id}"),
            min_index: 0,
            max_index: 40,
            default_index: 20,
            devices,
        }
    }

    fn zone(id: u32, groups: Vec<VolumeGroupConfig>) -> ZoneConfig {
        ZoneConfig {
            id: ZoneId::new(id),
            name: format!("zone{id}"),
            volume_groups: groups,
        }
    }

    #[test]
    fn mismatched_step_sizes_are_rejected() {
        let config = group(
            0,
            vec![
                device("bus0_media", 100, &[CarAudioContext::Media]),
                device("bus1_nav", 50, &[CarAudioContext::Navigation]),
            ],
        );
        assert!(matches!(config.validate(), Err(CabinError::Config(_))));
    }

    #[test]
    fn default_index_must_be_in_range() {
        let mut config = group(0, vec![device("bus0", 100, &[CarAudioContext::Media])]);
        config.default_index = 41;
        assert!(config.validate().is_err());
    }

    #[test]
    fn context_routed_twice_is_rejected() {
        let config = zone(
            0,
            vec![
                group(0, vec![device("bus0", 100, &[CarAudioContext::Media])]),
                group(1, vec![device("bus1", 100, &[CarAudioContext::Media])]),
            ],
        );
        assert!(config.validate().is_err());
    }

    #[test]
    fn primary_zone_is_required() {
        let zones = vec![zone(
            1,
            vec![group(0, vec![device("bus0", 100, &[CarAudioContext::Media])])],
        )];
        assert!(validate_zones(&zones).is_err());
        assert!(validate_zones(&[]).is_err());
    }

    #[test]
    fn routing_table_resolves_addresses() {
        let zones = vec![
            zone(
                0,
                vec![group(
                    0,
                    vec![
                        device("bus0_media", 100, &[CarAudioContext::Media]),
                        device(
                            "bus1_nav",
                            100,
                            &[CarAudioContext::Navigation, CarAudioContext::Call],
                        ),
                    ],
                )],
            ),
            zone(
                1,
                vec![group(0, vec![device("rear_media", 100, &[CarAudioContext::Media])])],
            ),
        ];
        let table = ZoneRoutingTable::from_zones(&zones).unwrap();

        assert_eq!(
            table.address_for(ZoneId::PRIMARY, CarAudioContext::Call),
            Some("bus1_nav")
        );
        assert_eq!(
            table.address_for(ZoneId::new(1), CarAudioContext::Media),
            Some("rear_media")
        );
        assert_eq!(table.address_for(ZoneId::new(1), CarAudioContext::Call), None);

        let addresses = table.addresses_for(
            ZoneId::PRIMARY,
            [CarAudioContext::Navigation, CarAudioContext::Call, CarAudioContext::Alarm],
        );
        assert_eq!(addresses.into_iter().collect::<Vec<_>>(), vec!["bus1_nav"]);
        assert_eq!(table.zone_ids(), vec![ZoneId::new(0), ZoneId::new(1)]);
    }
}
