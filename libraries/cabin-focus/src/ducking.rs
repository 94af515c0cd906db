//! Ducking coordination across zones
//!
//! Turns the attributes holding focus in each zone into the set of hardware
//! addresses that must be attenuated, and sends the change to the hardware
//! layer as one batch per invocation.

use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

use tracing::{debug, warn};

use cabin_core::{
    AudioAttribute, AudioControl, CarAudioContext, DuckingInfo, FocusOverride, NoOverride, ZoneId,
    ZoneRoutingTable,
};

use crate::classifier::ContextClassifier;
use crate::duck_graph::DuckGraph;

pub struct DuckingCoordinator {
    classifier: Arc<ContextClassifier>,
    graph: DuckGraph,
    routing: Arc<ZoneRoutingTable>,
    hal: Arc<dyn AudioControl>,
    focus_override: Arc<dyn FocusOverride>,
    state: Mutex<HashMap<ZoneId, DuckingInfo>>,
}

impl fmt::Debug for DuckingCoordinator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DuckingCoordinator")
            .field("graph", &self.graph)
            .field("routing", &self.routing)
            .finish_non_exhaustive()
    }
}

impl DuckingCoordinator {
    pub fn new(
        classifier: Arc<ContextClassifier>,
        graph: DuckGraph,
        routing: Arc<ZoneRoutingTable>,
        hal: Arc<dyn AudioControl>,
    ) -> Self {
        Self {
            classifier,
            graph,
            routing,
            hal,
            focus_override: Arc::new(NoOverride),
            state: Mutex::new(HashMap::new()),
        }
    }

    #[must_use]
    pub fn with_override(mut self, focus_override: Arc<dyn FocusOverride>) -> Self {
        self.focus_override = focus_override;
        self
    }

    /// Recompute ducking for `zones` and notify the hardware of what changed
    ///
    /// Zones missing from `holders_by_zone` hold nothing. Returns the per-zone
    /// states sent to the hardware; empty when no zone changed, in which case
    /// the hardware is not called.
    pub fn on_focus_change(
        &self,
        zones: &[ZoneId],
        holders_by_zone: &HashMap<ZoneId, Vec<AudioAttribute>>,
    ) -> Vec<DuckingInfo> {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        let mut changed = Vec::new();

        for zone in zones {
            if !self.routing.has_zone(*zone) {
                warn!(%zone, "ducking requested for unrouted zone");
            }
            let holding = holders_by_zone
                .get(zone)
                .map(Vec::as_slice)
                .unwrap_or_default();
            let previous = state.get(zone);
            let info = self.compute(*zone, holding, previous);

            let justification_changed = previous.map_or(!holding.is_empty(), |previous| {
                previous.attributes_holding_focus != info.attributes_holding_focus
            });
            if info.has_delta() || justification_changed {
                changed.push(info.clone());
            }
            state.insert(*zone, info);
        }

        if !changed.is_empty() {
            debug!(zones = changed.len(), "sending ducking batch to hardware");
            self.hal.on_devices_to_duck_change(&changed);
        }
        changed
    }

    /// Last computed state for a zone
    pub fn ducking_info(&self, zone: ZoneId) -> DuckingInfo {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&zone)
            .cloned()
            .unwrap_or_else(|| DuckingInfo::empty(zone))
    }

    fn compute(
        &self,
        zone: ZoneId,
        holding: &[AudioAttribute],
        previous: Option<&DuckingInfo>,
    ) -> DuckingInfo {
        let holding_contexts = self.classifier.unique_contexts(holding);
        let ducked_contexts = self
            .override_ducking(zone, holding)
            .unwrap_or_else(|| self.graph.ducked_among(&holding_contexts));

        let unducked_addresses = self
            .routing
            .addresses_for(zone, holding_contexts.difference(&ducked_contexts).copied());
        let ducked_addresses: BTreeSet<String> = self
            .routing
            .addresses_for(zone, ducked_contexts.iter().copied())
            .difference(&unducked_addresses)
            .cloned()
            .collect();

        let none = BTreeSet::new();
        let before = previous.map_or(&none, |previous| &previous.ducked_addresses);
        let info = DuckingInfo {
            zone,
            addresses_to_duck: ducked_addresses.difference(before).cloned().collect(),
            addresses_to_unduck: before.difference(&ducked_addresses).cloned().collect(),
            ducked_addresses,
            attributes_holding_focus: holding.to_vec(),
        };
        if info.has_delta() {
            debug!(
                %zone,
                duck = ?info.addresses_to_duck,
                unduck = ?info.addresses_to_unduck,
                "ducking changed"
            );
        }
        info
    }

    fn override_ducking(
        &self,
        zone: ZoneId,
        holding: &[AudioAttribute],
    ) -> Option<BTreeSet<CarAudioContext>> {
        if !self.focus_override.is_ready() {
            return None;
        }
        match self.focus_override.evaluate_ducking(zone, holding) {
            Ok(replacement) => {
                replacement.map(|attributes| self.classifier.unique_contexts(&attributes))
            }
            Err(error) => {
                warn!(%zone, %error, "ducking override failed, using duck graph");
                None
            }
        }
    }
}
