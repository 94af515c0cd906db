//! Focus arbitration scenarios
//!
//! Drives `ZoneFocusArbiter` through the request / abandon / restriction
//! sequences a car head unit sees and checks holders, losers and
//! notifications after every step.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use cabin_core::{
    AudioUsage, CabinError, ClientId, FocusChange, FocusEvaluationRequest, FocusNotification,
    FocusOutcome, FocusOverride, FocusRequest, GrantKind, OverrideFocusVerdict, Result, ZoneId,
};
use cabin_focus::{ClientFocusState, ContextClassifier, FocusInteractionPolicy, ZoneFocusArbiter};

// ===== Helpers =====

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

fn changes_for(notifications: &[FocusNotification], client: &str) -> Vec<FocusChange> {
    notifications
        .iter()
        .filter(|notification| notification.client.as_str() == client)
        .map(|notification| notification.change)
        .collect()
}

fn holder_ids(arbiter: &ZoneFocusArbiter) -> Vec<String> {
    arbiter
        .current_holders()
        .iter()
        .map(|entry| entry.client_id().as_str().to_string())
        .collect()
}

/// Override with a scripted answer that can be switched off
struct ScriptedOverride {
    ready: AtomicBool,
    verdict: Option<OverrideFocusVerdict>,
    fail: bool,
}

impl FocusOverride for ScriptedOverride {
    fn is_ready(&self) -> bool {
        self.ready.load(Ordering::SeqCst)
    }

    fn evaluate_focus(
        &self,
        _request: &FocusEvaluationRequest<'_>,
    ) -> Result<Option<OverrideFocusVerdict>> {
        if self.fail {
            return Err(CabinError::override_failure("service disconnected"));
        }
        Ok(self.verdict.clone())
    }
}

// ===== Basic grants =====

#[test]
fn empty_zone_grants_media() {
    let mut arbiter = arbiter();
    let media = request("music", AudioUsage::Media, GrantKind::Permanent);

    let decision = arbiter.request(media.clone());

    assert_eq!(decision.outcome, FocusOutcome::Granted);
    assert!(decision.notifications.is_empty());
    let holders = arbiter.current_holders();
    assert_eq!(holders.len(), 1);
    assert_eq!(holders[0].request, media);
}

#[test]
fn exclusive_media_request_replaces_media_holder() {
    let mut arbiter = arbiter();
    arbiter.request(request("a", AudioUsage::Media, GrantKind::Permanent));

    let decision = arbiter.request(request("b", AudioUsage::Media, GrantKind::Permanent));

    assert_eq!(decision.outcome, FocusOutcome::Granted);
    assert_eq!(changes_for(&decision.notifications, "a"), vec![FocusChange::Loss]);
    assert!(changes_for(&decision.notifications, "b").is_empty());
    assert_eq!(holder_ids(&arbiter), vec!["b"]);
    assert!(arbiter.current_losers().is_empty());
}

#[test]
fn navigation_ducks_call_holder() {
    let mut arbiter = arbiter();
    arbiter.request(request(
        "call",
        AudioUsage::VoiceCommunication,
        GrantKind::TransientMayDuck,
    ));

    let decision = arbiter.request(request(
        "nav",
        AudioUsage::AssistanceNavigationGuidance,
        GrantKind::TransientMayDuck,
    ));

    assert_eq!(decision.outcome, FocusOutcome::Granted);
    assert!(decision.notifications.is_empty());
    let holders = arbiter.current_holders();
    assert_eq!(holders.len(), 2);
    let call = holders
        .iter()
        .find(|entry| entry.client_id().as_str() == "call")
        .unwrap();
    assert!(call.is_ducked());
    assert_eq!(call.ducked_by, vec![ClientId::new("nav")]);

    arbiter.abandon(&ClientId::new("nav"));
    assert!(!arbiter.current_holders()[0].is_ducked());
}

#[test]
fn call_takes_media_transiently_and_restores_it() {
    let mut arbiter = arbiter();
    arbiter.request(request("music", AudioUsage::Media, GrantKind::Permanent));

    let decision = arbiter.request(request(
        "phone",
        AudioUsage::VoiceCommunication,
        GrantKind::Transient,
    ));
    assert_eq!(decision.outcome, FocusOutcome::Granted);
    assert_eq!(
        changes_for(&decision.notifications, "music"),
        vec![FocusChange::LossTransient]
    );
    assert_eq!(arbiter.current_losers()[0].blocked_by, vec![ClientId::new("phone")]);

    let notifications = arbiter.abandon(&ClientId::new("phone"));
    assert_eq!(changes_for(&notifications, "music"), vec![FocusChange::Gain]);
    assert_eq!(holder_ids(&arbiter), vec!["music"]);
}

#[test]
fn loser_is_restored_only_when_every_blocker_leaves() {
    let mut arbiter = arbiter();
    arbiter.request(request("music", AudioUsage::Media, GrantKind::Permanent));
    arbiter.request(request(
        "alarm",
        AudioUsage::Alarm,
        GrantKind::Transient,
    ));
    arbiter.request(request(
        "phone",
        AudioUsage::VoiceCommunication,
        GrantKind::Transient,
    ));

    let losers = arbiter.current_losers();
    let music = losers
        .iter()
        .find(|loser| loser.client_id().as_str() == "music")
        .unwrap();
    assert!(music.blocked_by.contains(&ClientId::new("alarm")));
    assert!(music.blocked_by.contains(&ClientId::new("phone")));

    let notifications = arbiter.abandon(&ClientId::new("alarm"));
    assert!(changes_for(&notifications, "music").is_empty());

    let notifications = arbiter.abandon(&ClientId::new("phone"));
    assert_eq!(changes_for(&notifications, "music"), vec![FocusChange::Gain]);
}

#[test]
fn restoration_follows_loss_order() {
    let mut arbiter = arbiter();
    arbiter.request(request("music", AudioUsage::Media, GrantKind::Permanent));
    arbiter.request(request(
        "nav",
        AudioUsage::AssistanceNavigationGuidance,
        GrantKind::Permanent,
    ));
    arbiter.request(request(
        "emergency",
        AudioUsage::Emergency,
        GrantKind::TransientExclusive,
    ));

    let notifications = arbiter.abandon(&ClientId::new("emergency"));
    let restored: Vec<&str> = notifications
        .iter()
        .filter(|notification| notification.change == FocusChange::Gain)
        .map(|notification| notification.client.as_str())
        .collect();
    assert_eq!(restored, vec!["music", "nav"]);
}

// ===== Rejection and delay =====

#[test]
fn media_during_call_fails_without_delay() {
    let mut arbiter = arbiter();
    arbiter.request(request(
        "phone",
        AudioUsage::VoiceCommunication,
        GrantKind::Transient,
    ));

    let decision = arbiter.request(request("music", AudioUsage::Media, GrantKind::Permanent));

    assert_eq!(decision.outcome, FocusOutcome::Failed);
    assert!(decision.notifications.is_empty());
    assert_eq!(holder_ids(&arbiter), vec!["phone"]);
    assert_eq!(arbiter.entry_state(&ClientId::new("music")), None);
}

#[test]
fn later_delayed_media_evicts_earlier_and_is_promoted() {
    let mut arbiter = arbiter();
    arbiter.request(request(
        "phone",
        AudioUsage::VoiceCommunication,
        GrantKind::Transient,
    ));

    let x = arbiter.request(request("x", AudioUsage::Media, GrantKind::Permanent).accepting_delay());
    assert_eq!(x.outcome, FocusOutcome::Delayed);

    let y = arbiter.request(request("y", AudioUsage::Media, GrantKind::Permanent).accepting_delay());
    assert_eq!(y.outcome, FocusOutcome::Delayed);
    assert_eq!(changes_for(&y.notifications, "x"), vec![FocusChange::Loss]);

    let delayed = arbiter.delayed_requests();
    assert_eq!(delayed.len(), 1);
    assert_eq!(delayed[0].client_id().as_str(), "y");

    let notifications = arbiter.abandon(&ClientId::new("phone"));
    assert_eq!(changes_for(&notifications, "y"), vec![FocusChange::Gain]);
    assert!(changes_for(&notifications, "x").is_empty());
    assert_eq!(holder_ids(&arbiter), vec!["y"]);
    assert!(arbiter.delayed_requests().is_empty());
}

#[test]
fn abandoning_delayed_request_is_silent() {
    let mut arbiter = arbiter();
    arbiter.request(request(
        "phone",
        AudioUsage::VoiceCommunication,
        GrantKind::Transient,
    ));
    arbiter.request(request("music", AudioUsage::Media, GrantKind::Permanent).accepting_delay());

    let notifications = arbiter.abandon(&ClientId::new("music"));

    assert!(notifications.is_empty());
    assert!(arbiter.delayed_requests().is_empty());
}

#[test]
fn navigation_during_call_follows_runtime_setting() {
    let policy = Arc::new(FocusInteractionPolicy::default());
    let mut arbiter = ZoneFocusArbiter::new(
        ZoneId::PRIMARY,
        Arc::new(ContextClassifier::default()),
        Arc::clone(&policy),
    );
    arbiter.request(request(
        "phone",
        AudioUsage::VoiceCommunication,
        GrantKind::Transient,
    ));

    let nav = request(
        "nav",
        AudioUsage::AssistanceNavigationGuidance,
        GrantKind::TransientMayDuck,
    );
    assert_eq!(arbiter.request(nav.clone()).outcome, FocusOutcome::Granted);
    arbiter.abandon(&ClientId::new("nav"));

    policy.set_reject_navigation_on_call(true);
    assert_eq!(arbiter.request(nav).outcome, FocusOutcome::Failed);
}

// ===== Restriction =====

#[test]
fn restriction_abandons_non_critical_entries_only() {
    let mut arbiter = arbiter();
    arbiter.request(request("music", AudioUsage::Media, GrantKind::Permanent));
    arbiter.request(request(
        "nav",
        AudioUsage::AssistanceNavigationGuidance,
        GrantKind::TransientMayDuck,
    ));
    arbiter.request(request("emergency", AudioUsage::Emergency, GrantKind::Transient));

    let notifications = arbiter.set_restrict_focus(true);

    for client in ["music", "nav"] {
        assert_eq!(changes_for(&notifications, client), vec![FocusChange::Loss]);
    }
    assert!(changes_for(&notifications, "emergency").is_empty());
    assert_eq!(holder_ids(&arbiter), vec!["emergency"]);
    assert!(arbiter.current_losers().is_empty());
    assert!(arbiter.delayed_requests().is_empty());
}

#[test]
fn restricted_zone_fails_non_critical_requests() {
    let mut arbiter = arbiter();
    arbiter.set_restrict_focus(true);

    let media = arbiter.request(request("music", AudioUsage::Media, GrantKind::Permanent));
    assert_eq!(media.outcome, FocusOutcome::Failed);

    let safety = arbiter.request(request("chime", AudioUsage::Safety, GrantKind::Transient));
    assert_eq!(safety.outcome, FocusOutcome::Granted);

    let notifications = arbiter.set_restrict_focus(false);
    assert!(notifications.is_empty());
    assert!(!arbiter.is_restricted());
    assert_eq!(holder_ids(&arbiter), vec!["chime"]);
}

// ===== Snapshots =====

#[test]
fn snapshots_do_not_follow_later_changes() {
    let mut arbiter = arbiter();
    arbiter.request(request("music", AudioUsage::Media, GrantKind::Permanent));
    let before = arbiter.current_holders();

    arbiter.request(request(
        "phone",
        AudioUsage::VoiceCommunication,
        GrantKind::Transient,
    ));
    let losers_before = arbiter.current_losers();
    arbiter.abandon(&ClientId::new("phone"));

    assert_eq!(before.len(), 1);
    assert_eq!(before[0].client_id().as_str(), "music");
    assert_eq!(losers_before.len(), 1);
    assert!(arbiter.current_losers().is_empty());
}

#[test]
fn requester_replacing_itself_is_never_notified() {
    let mut arbiter = arbiter();
    arbiter.request(request("music", AudioUsage::Media, GrantKind::Permanent));
    arbiter.request(request(
        "phone",
        AudioUsage::VoiceCommunication,
        GrantKind::Transient,
    ));

    let decision = arbiter.request(request("music", AudioUsage::Media, GrantKind::Permanent));

    assert_eq!(decision.outcome, FocusOutcome::Failed);
    assert!(changes_for(&decision.notifications, "music").is_empty());
    assert_eq!(arbiter.entry_state(&ClientId::new("music")), None);
}

#[test]
fn regranted_client_releases_its_old_transient_block() {
    let mut arbiter = arbiter();
    arbiter.request(request("music", AudioUsage::Media, GrantKind::Permanent));
    arbiter.request(request(
        "nav",
        AudioUsage::AssistanceNavigationGuidance,
        GrantKind::TransientExclusive,
    ));
    assert_eq!(
        arbiter.entry_state(&ClientId::new("music")),
        Some(ClientFocusState::TransientLost)
    );

    let decision = arbiter.request(request(
        "nav",
        AudioUsage::AssistanceNavigationGuidance,
        GrantKind::Permanent,
    ));

    assert_eq!(decision.outcome, FocusOutcome::Granted);
    assert_eq!(changes_for(&decision.notifications, "music"), vec![FocusChange::Gain]);
    assert!(changes_for(&decision.notifications, "nav").is_empty());
    assert_eq!(
        arbiter.entry_state(&ClientId::new("music")),
        Some(ClientFocusState::Holding)
    );
    assert!(arbiter.current_losers().is_empty());
}

#[test]
fn regranted_client_stops_ducking_when_it_no_longer_may_duck() {
    let mut arbiter = arbiter();
    arbiter.request(request("music", AudioUsage::Media, GrantKind::Permanent));
    arbiter.request(request(
        "nav",
        AudioUsage::AssistanceNavigationGuidance,
        GrantKind::TransientMayDuck,
    ));

    let decision = arbiter.request(request(
        "nav",
        AudioUsage::AssistanceNavigationGuidance,
        GrantKind::Permanent,
    ));

    assert_eq!(decision.outcome, FocusOutcome::Granted);
    let holders = arbiter.current_holders();
    let music = holders
        .iter()
        .find(|entry| entry.client_id().as_str() == "music")
        .unwrap();
    assert!(!music.is_ducked());
    assert!(music.ducked_by.is_empty());
}

// ===== Override collaborator =====

#[test]
fn ready_override_verdict_is_authoritative() {
    let focus_override = Arc::new(ScriptedOverride {
        ready: AtomicBool::new(true),
        verdict: Some(OverrideFocusVerdict {
            outcome: FocusOutcome::Granted,
            newly_lost: Vec::new(),
            newly_blocked: vec![ClientId::new("phone")],
        }),
        fail: false,
    });
    let mut arbiter = arbiter().with_override(focus_override.clone());
    arbiter.request(request(
        "phone",
        AudioUsage::VoiceCommunication,
        GrantKind::Transient,
    ));

    let decision = arbiter.request(request("music", AudioUsage::Media, GrantKind::Permanent));

    assert_eq!(decision.outcome, FocusOutcome::Granted);
    assert_eq!(
        changes_for(&decision.notifications, "phone"),
        vec![FocusChange::LossTransient]
    );
    assert_eq!(
        arbiter.entry_state(&ClientId::new("phone")),
        Some(ClientFocusState::TransientLost)
    );

    focus_override.ready.store(false, Ordering::SeqCst);
    let notifications = arbiter.abandon(&ClientId::new("music"));
    assert_eq!(changes_for(&notifications, "phone"), vec![FocusChange::Gain]);
}

#[test]
fn failing_override_falls_back_to_policy() {
    let mut arbiter = arbiter().with_override(Arc::new(ScriptedOverride {
        ready: AtomicBool::new(true),
        verdict: None,
        fail: true,
    }));
    arbiter.request(request(
        "phone",
        AudioUsage::VoiceCommunication,
        GrantKind::Transient,
    ));

    let decision = arbiter.request(request("music", AudioUsage::Media, GrantKind::Permanent));
    assert_eq!(decision.outcome, FocusOutcome::Failed);
}
