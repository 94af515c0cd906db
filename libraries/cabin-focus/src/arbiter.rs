//! Per-zone focus arbitration
//!
//! A `ZoneFocusArbiter` owns the focus state of one zone: the ordered holders,
//! the transient losers waiting for restoration, and the delayed queue. It is a
//! plain struct; callers serialize access per zone (the service keeps one
//! mutex per arbiter).
//!
//! Every operation computes its decision against the current state before
//! mutating anything, then returns the notifications it produced. The client
//! that made a request is never notified about it; the returned outcome is
//! its answer.

use std::fmt;
use std::sync::Arc;

use tracing::{debug, info, warn};

use cabin_core::{
    AudioAttribute, CarAudioContext, ClientId, FocusChange, FocusEntry, FocusEvaluationRequest,
    FocusNotification, FocusOutcome, FocusOverride, FocusRequest, GrantKind, LostFocusEntry,
    NoOverride, OverrideFocusVerdict, ZoneId,
};

use crate::classifier::ContextClassifier;
use crate::interaction::{FocusInteractionPolicy, Interaction};

/// Outcome of one request plus the focus changes it caused for other clients
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FocusDecision {
    pub outcome: FocusOutcome,
    pub notifications: Vec<FocusNotification>,
}

impl FocusDecision {
    pub fn is_granted(&self) -> bool {
        self.outcome == FocusOutcome::Granted
    }
}

/// Where a client's single entry currently lives
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ClientFocusState {
    Holding,
    TransientLost,
    Delayed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum HolderAction {
    Abandon,
    Lose(FocusChange),
    Duck,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LoserAction {
    Abandon,
    Block,
}

/// Effects of granting a request, computed before anything is mutated
#[derive(Debug, Default)]
struct Plan {
    holders: Vec<(ClientId, HolderAction)>,
    losers: Vec<(ClientId, LoserAction)>,
}

fn transient_loss(grant: GrantKind) -> FocusChange {
    if grant == GrantKind::TransientMayDuck {
        FocusChange::LossTransientCanDuck
    } else {
        FocusChange::LossTransient
    }
}

fn push_unique(clients: &mut Vec<ClientId>, client: &ClientId) {
    if !clients.contains(client) {
        clients.push(client.clone());
    }
}

/// Focus state machine for one audio zone
pub struct ZoneFocusArbiter {
    zone: ZoneId,
    classifier: Arc<ContextClassifier>,
    policy: Arc<FocusInteractionPolicy>,
    focus_override: Arc<dyn FocusOverride>,
    delayed_focus_enabled: bool,
    holders: Vec<FocusEntry>,
    losers: Vec<LostFocusEntry>,
    delayed: Vec<FocusEntry>,
    restricted: bool,
}

impl fmt::Debug for ZoneFocusArbiter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ZoneFocusArbiter")
            .field("zone", &self.zone)
            .field("holders", &self.holders)
            .field("losers", &self.losers)
            .field("delayed", &self.delayed)
            .field("restricted", &self.restricted)
            .finish_non_exhaustive()
    }
}

impl ZoneFocusArbiter {
    /// Empty arbiter with delayed focus enabled and no override
    pub fn new(
        zone: ZoneId,
        classifier: Arc<ContextClassifier>,
        policy: Arc<FocusInteractionPolicy>,
    ) -> Self {
        Self {
            zone,
            classifier,
            policy,
            focus_override: Arc::new(NoOverride),
            delayed_focus_enabled: true,
            holders: Vec::new(),
            losers: Vec::new(),
            delayed: Vec::new(),
            restricted: false,
        }
    }

    #[must_use]
    pub fn with_override(mut self, focus_override: Arc<dyn FocusOverride>) -> Self {
        self.focus_override = focus_override;
        self
    }

    /// When disabled, REJECT always yields FAILED even for delay-accepting requests
    #[must_use]
    pub fn with_delayed_focus(mut self, enabled: bool) -> Self {
        self.delayed_focus_enabled = enabled;
        self
    }

    pub fn zone(&self) -> ZoneId {
        self.zone
    }

    /// Arbitrate a focus request
    pub fn request(&mut self, request: FocusRequest) -> FocusDecision {
        let context = self.classifier.context_for(&request.attribute);
        let client = request.client_id.clone();
        let mut notifications = Vec::new();

        if let Some((previous, _)) = self.take_entry(&client) {
            debug!(zone = %self.zone, %client, ?previous, "replacing existing focus entry");
            // The old entry's blocks and ducks go with it
            self.release_references(&client);
        }

        let outcome = match self.consult_override(&request) {
            Some(verdict) => self.apply_verdict(request, context, verdict, &mut notifications),
            None => self.arbitrate(request, context, &mut notifications),
        };

        if outcome != FocusOutcome::Granted {
            self.release_references(&client);
        }
        self.restore_unblocked(&mut notifications);

        debug!(
            zone = %self.zone,
            %client,
            %context,
            ?outcome,
            notified = notifications.len(),
            "focus request decided"
        );
        FocusDecision {
            outcome,
            notifications,
        }
    }

    /// Remove a client's entry, restoring and promoting whatever it was holding back
    ///
    /// Unknown clients are ignored. A delayed entry is removed silently.
    pub fn abandon(&mut self, client: &ClientId) -> Vec<FocusNotification> {
        let mut notifications = Vec::new();
        let Some((state, _)) = self.take_entry(client) else {
            debug!(zone = %self.zone, %client, "abandon for unknown client ignored");
            return notifications;
        };
        debug!(zone = %self.zone, %client, ?state, "focus abandoned");

        self.release_references(client);
        self.settle(&mut notifications);
        notifications
    }

    /// Enter or leave restricted mode
    ///
    /// Entering abandons every non-critical entry with a loss notification.
    /// Leaving only clears the flag; nothing is re-granted.
    pub fn set_restrict_focus(&mut self, restricted: bool) -> Vec<FocusNotification> {
        info!(zone = %self.zone, restricted, "focus restriction changed");
        self.restricted = restricted;

        let mut notifications = Vec::new();
        if !restricted {
            return notifications;
        }

        let doomed: Vec<ClientId> = self
            .holders
            .iter()
            .chain(self.losers.iter().map(|loser| &loser.entry))
            .chain(self.delayed.iter())
            .filter(|entry| self.policy.is_rejected_during_restriction(entry.context))
            .map(|entry| entry.client_id().clone())
            .collect();

        for client in doomed {
            if self.take_entry(&client).is_some() {
                self.push_notification(&mut notifications, client.clone(), FocusChange::Loss);
                self.release_references(&client);
            }
        }
        self.settle(&mut notifications);
        notifications
    }

    pub fn is_restricted(&self) -> bool {
        self.restricted
    }

    /// Copy of the current holders, in grant order
    pub fn current_holders(&self) -> Vec<FocusEntry> {
        self.holders.clone()
    }

    /// Copy of the transient losers, in loss order
    pub fn current_losers(&self) -> Vec<LostFocusEntry> {
        self.losers.clone()
    }

    /// Copy of the delayed queue, oldest first
    pub fn delayed_requests(&self) -> Vec<FocusEntry> {
        self.delayed.clone()
    }

    /// Attributes of the current holders, fed to ducking
    pub fn holder_attributes(&self) -> Vec<AudioAttribute> {
        self.holders.iter().map(FocusEntry::attribute).collect()
    }

    pub fn entry_state(&self, client: &ClientId) -> Option<ClientFocusState> {
        if self.holders.iter().any(|entry| entry.client_id() == client) {
            Some(ClientFocusState::Holding)
        } else if self.losers.iter().any(|loser| loser.client_id() == client) {
            Some(ClientFocusState::TransientLost)
        } else if self.delayed.iter().any(|entry| entry.client_id() == client) {
            Some(ClientFocusState::Delayed)
        } else {
            None
        }
    }

    fn consult_override(&self, request: &FocusRequest) -> Option<OverrideFocusVerdict> {
        if !self.focus_override.is_ready() {
            return None;
        }
        let evaluation = FocusEvaluationRequest {
            zone: self.zone,
            request,
            holders: &self.holders,
            losers: &self.losers,
            delayed: &self.delayed,
            restricted: self.restricted,
        };
        match self.focus_override.evaluate_focus(&evaluation) {
            Ok(verdict) => verdict,
            Err(error) => {
                warn!(zone = %self.zone, %error, "focus override failed, using built-in policy");
                None
            }
        }
    }

    fn arbitrate(
        &mut self,
        request: FocusRequest,
        context: CarAudioContext,
        notifications: &mut Vec<FocusNotification>,
    ) -> FocusOutcome {
        if !context.is_valid() {
            debug!(zone = %self.zone, attribute = %request.attribute, "unsupported audio attribute");
            return FocusOutcome::Failed;
        }
        if self.restricted && self.policy.is_rejected_during_restriction(context) {
            return FocusOutcome::Failed;
        }

        match self.plan(&request, context) {
            Some(plan) => {
                self.grant(request, context, plan, notifications);
                FocusOutcome::Granted
            }
            None if request.accepts_delayed && self.delayed_focus_enabled => {
                self.enqueue_delayed(FocusEntry::new(request, context), notifications);
                FocusOutcome::Delayed
            }
            None => FocusOutcome::Failed,
        }
    }

    fn apply_verdict(
        &mut self,
        request: FocusRequest,
        context: CarAudioContext,
        verdict: OverrideFocusVerdict,
        notifications: &mut Vec<FocusNotification>,
    ) -> FocusOutcome {
        debug!(zone = %self.zone, client = %request.client_id, outcome = ?verdict.outcome, "focus override verdict");
        let requester = request.client_id.clone();

        for client in &verdict.newly_lost {
            if self.take_entry(client).is_some() {
                self.push_notification(notifications, client.clone(), FocusChange::Loss);
                self.release_references(client);
            }
        }
        for client in &verdict.newly_blocked {
            if let Some(index) = self.holder_index(client) {
                let entry = self.holders.remove(index);
                self.losers.push(LostFocusEntry {
                    entry,
                    blocked_by: vec![requester.clone()],
                    can_duck: false,
                });
                self.push_notification(notifications, client.clone(), FocusChange::LossTransient);
            } else if let Some(loser) = self.losers.iter_mut().find(|loser| loser.client_id() == client)
            {
                push_unique(&mut loser.blocked_by, &requester);
            }
        }

        match verdict.outcome {
            FocusOutcome::Granted => {
                let mut entry = FocusEntry::new(request, context);
                self.refresh_duck_markers(&mut entry);
                self.holders.push(entry);
            }
            FocusOutcome::Delayed => {
                self.enqueue_delayed(FocusEntry::new(request, context), notifications);
            }
            FocusOutcome::Failed => {}
        }
        verdict.outcome
    }

    /// What granting `request` would do to every holder and loser, or `None`
    /// when some entry rejects it
    fn plan(&self, request: &FocusRequest, context: CarAudioContext) -> Option<Plan> {
        let mut plan = Plan::default();

        for holder in &self.holders {
            let action = match self.policy.interaction_of(holder.context, context) {
                Interaction::Reject => {
                    debug!(zone = %self.zone, holder = %holder.client_id(), "request rejected by holder");
                    return None;
                }
                Interaction::Exclusive if request.grant == GrantKind::Permanent => {
                    Some(HolderAction::Abandon)
                }
                Interaction::Exclusive => Some(HolderAction::Lose(transient_loss(request.grant))),
                Interaction::Concurrent => match request.grant {
                    GrantKind::TransientExclusive => {
                        Some(HolderAction::Lose(FocusChange::LossTransient))
                    }
                    GrantKind::TransientMayDuck if holder.request.pauses_on_duck => {
                        Some(HolderAction::Lose(FocusChange::LossTransientCanDuck))
                    }
                    GrantKind::TransientMayDuck => Some(HolderAction::Duck),
                    GrantKind::Permanent | GrantKind::Transient => None,
                },
                Interaction::Allow => None,
            };
            if let Some(action) = action {
                plan.holders.push((holder.client_id().clone(), action));
            }
        }

        for loser in &self.losers {
            let action = match self.policy.interaction_of(loser.entry.context, context) {
                Interaction::Reject => {
                    debug!(zone = %self.zone, loser = %loser.client_id(), "request rejected by transient loser");
                    return None;
                }
                Interaction::Exclusive if request.grant == GrantKind::Permanent => {
                    Some(LoserAction::Abandon)
                }
                Interaction::Exclusive => Some(LoserAction::Block),
                Interaction::Concurrent if request.grant == GrantKind::TransientExclusive => {
                    Some(LoserAction::Block)
                }
                Interaction::Concurrent | Interaction::Allow => None,
            };
            if let Some(action) = action {
                plan.losers.push((loser.client_id().clone(), action));
            }
        }

        Some(plan)
    }

    fn grant(
        &mut self,
        request: FocusRequest,
        context: CarAudioContext,
        plan: Plan,
        notifications: &mut Vec<FocusNotification>,
    ) {
        let requester = request.client_id.clone();

        for (client, action) in plan.holders {
            let Some(index) = self.holder_index(&client) else {
                continue;
            };
            match action {
                HolderAction::Abandon => {
                    self.holders.remove(index);
                    self.push_notification(notifications, client.clone(), FocusChange::Loss);
                    self.release_references(&client);
                }
                HolderAction::Lose(change) => {
                    let entry = self.holders.remove(index);
                    self.losers.push(LostFocusEntry {
                        entry,
                        blocked_by: vec![requester.clone()],
                        can_duck: change == FocusChange::LossTransientCanDuck,
                    });
                    self.push_notification(notifications, client, change);
                }
                HolderAction::Duck => {
                    push_unique(&mut self.holders[index].ducked_by, &requester);
                }
            }
        }

        for (client, action) in plan.losers {
            let Some(index) = self.losers.iter().position(|loser| loser.client_id() == &client)
            else {
                continue;
            };
            match action {
                LoserAction::Abandon => {
                    self.losers.remove(index);
                    self.push_notification(notifications, client.clone(), FocusChange::Loss);
                    self.release_references(&client);
                }
                LoserAction::Block => push_unique(&mut self.losers[index].blocked_by, &requester),
            }
        }

        let mut entry = FocusEntry::new(request, context);
        self.refresh_duck_markers(&mut entry);
        self.holders.push(entry);
    }

    fn enqueue_delayed(&mut self, entry: FocusEntry, notifications: &mut Vec<FocusNotification>) {
        let policy = Arc::clone(&self.policy);
        let (evicted, kept): (Vec<FocusEntry>, Vec<FocusEntry>) = std::mem::take(&mut self.delayed)
            .into_iter()
            .partition(|queued| policy.are_mutually_exclusive(queued.context, entry.context));
        self.delayed = kept;

        for queued in evicted {
            debug!(zone = %self.zone, evicted = %queued.client_id(), by = %entry.client_id(), "delayed request evicted");
            self.push_notification(notifications, queued.client_id().clone(), FocusChange::Loss);
        }
        self.delayed.push(entry);
    }

    /// Restore unblocked losers and promote delayed requests until nothing moves
    ///
    /// Only departures settle the delayed queue; a new request restores
    /// losers but never promotes.
    fn settle(&mut self, notifications: &mut Vec<FocusNotification>) {
        loop {
            let restored = self.restore_unblocked(notifications);
            let promoted = self.promote_next_delayed(notifications);
            if !restored && !promoted {
                break;
            }
        }
    }

    fn restore_unblocked(&mut self, notifications: &mut Vec<FocusNotification>) -> bool {
        let mut restored = false;
        let mut index = 0;
        while index < self.losers.len() {
            if !self.losers[index].blocked_by.is_empty() {
                index += 1;
                continue;
            }
            let blockers = self.conflicting_holders(&self.losers[index].entry);
            if !blockers.is_empty() {
                self.losers[index].blocked_by = blockers;
                index += 1;
                continue;
            }

            let mut entry = self.losers.remove(index).entry;
            self.refresh_duck_markers(&mut entry);
            debug!(zone = %self.zone, client = %entry.client_id(), "transient loser restored");
            self.push_notification(notifications, entry.client_id().clone(), FocusChange::Gain);
            self.holders.push(entry);
            restored = true;
        }
        restored
    }

    fn promote_next_delayed(&mut self, notifications: &mut Vec<FocusNotification>) -> bool {
        let candidate = self
            .delayed
            .iter()
            .enumerate()
            .filter(|(_, entry)| {
                !(self.restricted && self.policy.is_rejected_during_restriction(entry.context))
            })
            .find_map(|(index, entry)| self.plan(&entry.request, entry.context).map(|plan| (index, plan)));
        let Some((index, plan)) = candidate else {
            return false;
        };

        let entry = self.delayed.remove(index);
        let client = entry.client_id().clone();
        let context = entry.context;
        debug!(zone = %self.zone, %client, "delayed request promoted");

        self.grant(entry.request, context, plan, notifications);
        self.push_notification(notifications, client.clone(), FocusChange::Gain);

        let policy = Arc::clone(&self.policy);
        let (evicted, kept): (Vec<FocusEntry>, Vec<FocusEntry>) = std::mem::take(&mut self.delayed)
            .into_iter()
            .partition(|queued| policy.are_mutually_exclusive(queued.context, context));
        self.delayed = kept;
        for queued in evicted {
            debug!(zone = %self.zone, evicted = %queued.client_id(), by = %client, "delayed request evicted");
            self.push_notification(notifications, queued.client_id().clone(), FocusChange::Loss);
        }
        true
    }

    /// Holders that would keep `entry` from holding focus again
    fn conflicting_holders(&self, entry: &FocusEntry) -> Vec<ClientId> {
        self.holders
            .iter()
            .filter(|holder| {
                match self.policy.interaction_of(entry.context, holder.context) {
                    Interaction::Reject | Interaction::Exclusive => true,
                    Interaction::Concurrent => {
                        holder.request.grant == GrantKind::TransientExclusive
                    }
                    Interaction::Allow => false,
                }
            })
            .map(|holder| holder.client_id().clone())
            .collect()
    }

    fn refresh_duck_markers(&self, entry: &mut FocusEntry) {
        entry.ducked_by = self
            .holders
            .iter()
            .filter(|holder| {
                holder.request.grant == GrantKind::TransientMayDuck
                    && self.policy.interaction_of(entry.context, holder.context)
                        == Interaction::Concurrent
            })
            .map(|holder| holder.client_id().clone())
            .collect();
    }

    /// Detach a client's entry without notifying it
    fn take_entry(&mut self, client: &ClientId) -> Option<(ClientFocusState, FocusEntry)> {
        if let Some(index) = self.holder_index(client) {
            return Some((ClientFocusState::Holding, self.holders.remove(index)));
        }
        if let Some(index) = self.losers.iter().position(|loser| loser.client_id() == client) {
            return Some((ClientFocusState::TransientLost, self.losers.remove(index).entry));
        }
        if let Some(index) = self.delayed.iter().position(|entry| entry.client_id() == client) {
            return Some((ClientFocusState::Delayed, self.delayed.remove(index)));
        }
        None
    }

    /// Forget a departed client as a ducker or blocker of anyone else
    fn release_references(&mut self, client: &ClientId) {
        for holder in &mut self.holders {
            holder.ducked_by.retain(|ducker| ducker != client);
        }
        for loser in &mut self.losers {
            loser.blocked_by.retain(|blocker| blocker != client);
            loser.entry.ducked_by.retain(|ducker| ducker != client);
        }
    }

    fn holder_index(&self, client: &ClientId) -> Option<usize> {
        self.holders.iter().position(|entry| entry.client_id() == client)
    }

    fn push_notification(
        &self,
        notifications: &mut Vec<FocusNotification>,
        client: ClientId,
        change: FocusChange,
    ) {
        notifications.push(FocusNotification {
            zone: self.zone,
            client,
            change,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cabin_core::AudioUsage;

    fn arbiter() -> ZoneFocusArbiter {
        ZoneFocusArbiter::new(
            ZoneId::PRIMARY,
            Arc::new(ContextClassifier::default()),
            Arc::new(FocusInteractionPolicy::default()),
        )
    }

    fn request(client: &str, usage: AudioUsage, grant: GrantKind) -> FocusRequest {
        FocusRequest::new(ClientId::new(client), usage, grant)
    }

    #[test]
    fn repeat_request_replaces_entry_silently() {
        let mut arbiter = arbiter();
        arbiter.request(request("music", AudioUsage::Media, GrantKind::Permanent));
        let decision = arbiter.request(request("music", AudioUsage::Game, GrantKind::Permanent));

        assert!(decision.is_granted());
        assert!(decision.notifications.is_empty());
        assert_eq!(arbiter.current_holders().len(), 1);
    }

    #[test]
    fn transient_exclusive_concurrent_request_pauses_holder() {
        let mut arbiter = arbiter();
        arbiter.request(request("music", AudioUsage::Media, GrantKind::Permanent));
        let decision = arbiter.request(request(
            "nav",
            AudioUsage::AssistanceNavigationGuidance,
            GrantKind::TransientExclusive,
        ));

        assert!(decision.is_granted());
        assert_eq!(
            decision.notifications[0].change,
            FocusChange::LossTransient
        );
        assert_eq!(
            arbiter.entry_state(&ClientId::new("music")),
            Some(ClientFocusState::TransientLost)
        );

        let restored = arbiter.abandon(&ClientId::new("nav"));
        assert_eq!(restored.len(), 1);
        assert_eq!(restored[0].change, FocusChange::Gain);
        assert_eq!(
            arbiter.entry_state(&ClientId::new("music")),
            Some(ClientFocusState::Holding)
        );
    }

    #[test]
    fn pauses_on_duck_prefers_transient_loss() {
        let mut arbiter = arbiter();
        arbiter.request(
            request("podcast", AudioUsage::Media, GrantKind::Permanent).pausing_on_duck(),
        );
        let decision = arbiter.request(request(
            "nav",
            AudioUsage::AssistanceNavigationGuidance,
            GrantKind::TransientMayDuck,
        ));

        assert_eq!(
            decision.notifications[0].change,
            FocusChange::LossTransientCanDuck
        );
        assert!(arbiter.current_losers()[0].can_duck);
    }

    #[test]
    fn unsupported_attribute_fails() {
        let mut arbiter = arbiter();
        let decision = arbiter.request(FocusRequest::new(
            ClientId::new("odd"),
            AudioAttribute::with_system_flag(AudioUsage::Media, true),
            GrantKind::Permanent,
        ));
        assert_eq!(decision.outcome, FocusOutcome::Failed);
        assert!(arbiter.current_holders().is_empty());
    }

    #[test]
    fn delayed_focus_can_be_disabled() {
        let mut arbiter = arbiter().with_delayed_focus(false);
        arbiter.request(request("call", AudioUsage::VoiceCommunication, GrantKind::Transient));
        let decision = arbiter.request(
            request("music", AudioUsage::Media, GrantKind::Permanent).accepting_delay(),
        );
        assert_eq!(decision.outcome, FocusOutcome::Failed);
        assert!(arbiter.delayed_requests().is_empty());
    }

    #[test]
    fn abandoning_unknown_client_is_a_no_op() {
        let mut arbiter = arbiter();
        arbiter.request(request("music", AudioUsage::Media, GrantKind::Permanent));
        assert!(arbiter.abandon(&ClientId::new("ghost")).is_empty());
        assert_eq!(arbiter.current_holders().len(), 1);
    }
}
