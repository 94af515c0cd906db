//! Zone audio service
//!
//! One arbiter per zone behind its own mutex, a shared ducking coordinator
//! and the volume group router. Zones never wait on each other; calls for
//! one zone are serialized and see arbitration, ducking and hardware
//! notification as one step.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use tracing::{debug, error, info};

use cabin_core::{
    AudioAttribute, AudioControl, AudioUsage, CabinError, ClientId, DuckingInfo, FocusChange,
    FocusEntry, FocusNotification, FocusOutcome, FocusOverride, FocusRequest, GainEvent,
    GainReason, GrantKind, GroupId, InMemorySettingsStore, LostFocusEntry, NoOverride,
    SettingsStore, UserId, ZoneId, ZoneRoutingTable,
};
use cabin_focus::{
    ContextClassifier, DuckGraph, DuckingCoordinator, FocusInteractionPolicy, ZoneFocusArbiter,
};
use cabin_volume::{GainEventRouter, VolumeGroupEvent, VolumeGroupSnapshot};

use crate::config::ServiceConfig;
use crate::error::Result;
use crate::hal_focus::{hal_client_id, parse_hal_client_id};
use crate::listener::{NoopListener, ZoneEventListener};

/// External collaborators of the service
#[derive(Clone)]
pub struct ServiceCollaborators {
    pub hal: Arc<dyn AudioControl>,
    pub settings: Arc<dyn SettingsStore>,
    pub focus_override: Arc<dyn FocusOverride>,
    pub listener: Arc<dyn ZoneEventListener>,
}

impl ServiceCollaborators {
    /// Hardware only; in-memory settings, no override, no listener
    pub fn new(hal: Arc<dyn AudioControl>) -> Self {
        Self {
            hal,
            settings: Arc::new(InMemorySettingsStore::new()),
            focus_override: Arc::new(NoOverride),
            listener: Arc::new(NoopListener),
        }
    }

    #[must_use]
    pub fn with_settings(mut self, settings: Arc<dyn SettingsStore>) -> Self {
        self.settings = settings;
        self
    }

    #[must_use]
    pub fn with_override(mut self, focus_override: Arc<dyn FocusOverride>) -> Self {
        self.focus_override = focus_override;
        self
    }

    #[must_use]
    pub fn with_listener(mut self, listener: Arc<dyn ZoneEventListener>) -> Self {
        self.listener = listener;
        self
    }
}

pub struct ZoneAudioService {
    arbiters: BTreeMap<ZoneId, Mutex<ZoneFocusArbiter>>,
    policy: Arc<FocusInteractionPolicy>,
    ducking: DuckingCoordinator,
    volume: GainEventRouter,
    hal: Arc<dyn AudioControl>,
    listener: Arc<dyn ZoneEventListener>,
    active_user: AtomicU32,
}

impl fmt::Debug for ZoneAudioService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ZoneAudioService")
            .field("zones", &self.arbiters.keys().collect::<Vec<_>>())
            .field("active_user", &self.active_user())
            .finish_non_exhaustive()
    }
}

impl ZoneAudioService {
    /// Build the service for every configured zone
    ///
    /// # Errors
    /// Invalid zone configuration, or built-in tables that fail their own
    /// consistency checks.
    pub fn new(config: &ServiceConfig, collaborators: ServiceCollaborators) -> Result<Self> {
        if let Err(err) = config.validate() {
            error!(error = %err, "invalid audio zone configuration");
            return Err(err);
        }

        let ServiceCollaborators {
            hal,
            settings,
            focus_override,
            listener,
        } = collaborators;

        let classifier = Arc::new(ContextClassifier::new(cabin_focus::default_registry())?);
        let policy = Arc::new(FocusInteractionPolicy::new(
            config.focus.reject_navigation_on_call,
        ));
        let routing = Arc::new(ZoneRoutingTable::from_zones(&config.zones)?);

        let arbiters = config
            .zones
            .iter()
            .map(|zone| {
                let arbiter =
                    ZoneFocusArbiter::new(zone.id, Arc::clone(&classifier), Arc::clone(&policy))
                        .with_override(Arc::clone(&focus_override))
                        .with_delayed_focus(config.focus.delayed_focus_enabled);
                (zone.id, Mutex::new(arbiter))
            })
            .collect();

        let ducking = DuckingCoordinator::new(
            classifier,
            DuckGraph::built_in()?,
            routing,
            Arc::clone(&hal),
        )
        .with_override(focus_override);

        let user = config.initial_user();
        let volume = GainEventRouter::new(
            &config.zones,
            user,
            settings,
            config.persistence(),
            Arc::clone(&hal),
        )?;

        info!(
            zones = config.zones.len(),
            %user,
            delayed_focus = config.focus.delayed_focus_enabled,
            "zone audio service ready"
        );

        Ok(Self {
            arbiters,
            policy,
            ducking,
            volume,
            hal,
            listener,
            active_user: AtomicU32::new(user.as_u32()),
        })
    }

    pub fn zone_ids(&self) -> Vec<ZoneId> {
        self.arbiters.keys().copied().collect()
    }

    pub fn active_user(&self) -> UserId {
        UserId::new(self.active_user.load(Ordering::Acquire))
    }

    // ===== Focus =====

    /// Arbitrate a focus request in `zone`
    ///
    /// Software clients affected by the decision are notified through the
    /// listener after the zone is unlocked. The requester itself learns its
    /// result only from the return value. Ids of the form `hal:<zone>:<usage>`
    /// are reserved for hardware sources and rejected here.
    pub fn request(&self, zone: ZoneId, request: FocusRequest) -> Result<FocusOutcome> {
        ensure_software_client(&request.client_id)?;
        self.arbitrate(zone, request, None)
    }

    /// Release whatever `client` holds, has lost or waits for in `zone`
    pub fn abandon(&self, zone: ZoneId, client: &ClientId) -> Result<()> {
        ensure_software_client(client)?;
        self.release(zone, client)
    }

    /// Enter or leave restricted mode, where only critical contexts keep focus
    pub fn set_restrict_focus(&self, zone: ZoneId, restricted: bool) -> Result<()> {
        let notifications = self.with_zone(zone, |arbiter| {
            let notifications = arbiter.set_restrict_focus(restricted);
            self.update_ducking(arbiter);
            self.forward_to_hal(&notifications);
            notifications
        })?;
        self.notify_listener(&notifications);
        Ok(())
    }

    /// Focus request on behalf of a hardware source
    ///
    /// The hardware hears its own outcome, and any change to other hardware
    /// clients, before the zone is unlocked, so a later decision in the same
    /// zone can never reach it first.
    pub(crate) fn request_hal_focus(
        &self,
        zone: ZoneId,
        usage: AudioUsage,
        grant: GrantKind,
    ) -> Result<FocusOutcome> {
        let request = FocusRequest::new(hal_client_id(zone, usage), AudioAttribute::new(usage), grant);
        self.arbitrate(zone, request, Some(usage))
    }

    pub(crate) fn abandon_hal_focus(&self, zone: ZoneId, usage: AudioUsage) -> Result<()> {
        self.release(zone, &hal_client_id(zone, usage))
    }

    pub fn current_holders(&self, zone: ZoneId) -> Result<Vec<FocusEntry>> {
        self.with_zone(zone, |arbiter| arbiter.current_holders())
    }

    pub fn current_losers(&self, zone: ZoneId) -> Result<Vec<LostFocusEntry>> {
        self.with_zone(zone, |arbiter| arbiter.current_losers())
    }

    pub fn delayed_requests(&self, zone: ZoneId) -> Result<Vec<FocusEntry>> {
        self.with_zone(zone, |arbiter| arbiter.delayed_requests())
    }

    /// Applies to every zone, from the next request on
    pub fn set_reject_navigation_on_call(&self, reject: bool) {
        info!(reject, "navigation during calls policy changed");
        self.policy.set_reject_navigation_on_call(reject);
    }

    pub fn ducking_info(&self, zone: ZoneId) -> Result<DuckingInfo> {
        if !self.arbiters.contains_key(&zone) {
            return Err(CabinError::UnknownZone(zone).into());
        }
        Ok(self.ducking.ducking_info(zone))
    }

    // ===== Volume =====

    pub fn set_current_gain_index(&self, zone: ZoneId, group: GroupId, index: i32) -> Result<()> {
        let event = self.volume.set_current_gain_index(zone, group, index)?;
        self.dispatch_volume(event);
        Ok(())
    }

    pub fn set_mute(&self, zone: ZoneId, group: GroupId, muted: bool) -> Result<()> {
        let event = self.volume.set_mute(zone, group, muted)?;
        self.dispatch_volume(event);
        Ok(())
    }

    pub fn on_hardware_gain_event(
        &self,
        zone: ZoneId,
        group: GroupId,
        reasons: &[GainReason],
        index: i32,
    ) -> Result<()> {
        let event = self
            .volume
            .on_hardware_gain_event(zone, group, reasons, index)?;
        self.dispatch_volume(event);
        Ok(())
    }

    /// Per-address hardware gain changes; unknown entries are dropped
    pub fn on_gain_events(&self, zone: ZoneId, events: &[GainEvent]) {
        for event in self.volume.on_gain_events(zone, events) {
            self.dispatch_volume(Some(event));
        }
    }

    pub fn group_ids(&self, zone: ZoneId) -> Result<Vec<GroupId>> {
        if !self.arbiters.contains_key(&zone) {
            return Err(CabinError::UnknownZone(zone).into());
        }
        Ok(self.volume.group_ids(zone))
    }

    pub fn group_state(&self, zone: ZoneId, group: GroupId) -> Result<VolumeGroupSnapshot> {
        Ok(self.volume.snapshot(zone, group)?)
    }

    /// Reload every volume group from the new user's stored settings
    pub fn switch_user(&self, user: UserId) {
        let previous = self.active_user.swap(user.as_u32(), Ordering::AcqRel);
        info!(from = previous, to = %user, "switching active user");
        for event in self.volume.load_user(user) {
            self.dispatch_volume(Some(event));
        }
    }

    // ===== Internals =====

    fn with_zone<T>(&self, zone: ZoneId, op: impl FnOnce(&mut ZoneFocusArbiter) -> T) -> Result<T> {
        let arbiter = self
            .arbiters
            .get(&zone)
            .ok_or(CabinError::UnknownZone(zone))?;
        let mut arbiter = arbiter.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(op(&mut arbiter))
    }

    /// Run one request under the zone lock; `echo` is the usage of a hardware
    /// requester that must hear its own outcome
    fn arbitrate(
        &self,
        zone: ZoneId,
        request: FocusRequest,
        echo: Option<AudioUsage>,
    ) -> Result<FocusOutcome> {
        let decision = self.with_zone(zone, |arbiter| {
            let decision = arbiter.request(request);
            self.update_ducking(arbiter);
            if let Some(usage) = echo {
                let change = match decision.outcome {
                    FocusOutcome::Granted => Some(FocusChange::Gain),
                    FocusOutcome::Failed => Some(FocusChange::Loss),
                    FocusOutcome::Delayed => None,
                };
                if let Some(change) = change {
                    self.hal.on_hal_focus_change(zone, usage, change);
                }
            }
            self.forward_to_hal(&decision.notifications);
            decision
        })?;
        self.notify_listener(&decision.notifications);
        Ok(decision.outcome)
    }

    fn release(&self, zone: ZoneId, client: &ClientId) -> Result<()> {
        let notifications = self.with_zone(zone, |arbiter| {
            let notifications = arbiter.abandon(client);
            self.update_ducking(arbiter);
            self.forward_to_hal(&notifications);
            notifications
        })?;
        self.notify_listener(&notifications);
        Ok(())
    }

    /// Recompute ducking for the arbiter's zone; called with the zone locked
    fn update_ducking(&self, arbiter: &ZoneFocusArbiter) {
        let zone = arbiter.zone();
        let holders = HashMap::from([(zone, arbiter.holder_attributes())]);
        let changed = self.ducking.on_focus_change(&[zone], &holders);
        if !changed.is_empty() {
            debug!(%zone, "ducking updated");
        }
    }

    /// Hardware clients hear about changes with the zone still locked
    fn forward_to_hal(&self, notifications: &[FocusNotification]) {
        for notification in notifications {
            if let Some((zone, usage)) = parse_hal_client_id(&notification.client) {
                self.hal
                    .on_hal_focus_change(zone, usage, notification.change);
            }
        }
    }

    /// Software clients hear about changes once the zone is unlocked
    fn notify_listener(&self, notifications: &[FocusNotification]) {
        notifications
            .iter()
            .filter(|notification| parse_hal_client_id(&notification.client).is_none())
            .for_each(|notification| self.listener.on_focus_change(notification));
    }

    fn dispatch_volume(&self, event: Option<VolumeGroupEvent>) {
        if let Some(event) = event {
            self.listener.on_volume_group_change(&event);
        }
    }
}

fn ensure_software_client(client: &ClientId) -> Result<()> {
    if parse_hal_client_id(client).is_some() {
        return Err(CabinError::invalid_argument(format!(
            "client id {client} is reserved for hardware focus"
        ))
        .into());
    }
    Ok(())
}
