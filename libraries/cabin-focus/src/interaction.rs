//! Focus interaction policy
//!
//! A static (holder, requester) → interaction lookup. The table is not
//! symmetric: CALL excludes MEDIA requests while MEDIA lets a CALL take over,
//! and MEDIA ⇄ NAVIGATION play concurrently.

use std::sync::atomic::{AtomicBool, Ordering};

use cabin_core::CarAudioContext;

/// How an incoming request interacts with an existing focus entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Interaction {
    /// Both proceed; the existing entry is not considered at all
    Allow,

    /// Both proceed; the request may still duck or pause the holder
    Concurrent,

    /// The request cannot proceed while the entry exists
    Reject,

    /// The request takes focus away from the entry
    Exclusive,
}

use Interaction::{Concurrent as C, Exclusive as E, Reject as R};

const CONTEXTS: usize = CarAudioContext::COUNT;

/// Rows: holder context, columns: requester context, both indexed by context id
pub type InteractionMatrix = [[Interaction; CONTEXTS]; CONTEXTS];

#[rustfmt::skip]
const DEFAULT_MATRIX: InteractionMatrix = [
    //  INV MED NAV VOI RNG CAL ALM NTF SYS EMG SAF VEH ANN
    [R, R, R, R, R, R, R, R, R, R, R, R, R], // INVALID
    [R, E, C, E, E, E, E, C, C, E, C, C, E], // MEDIA
    [R, C, C, E, C, E, C, C, C, E, C, C, C], // NAVIGATION
    [R, C, R, C, E, E, R, R, R, E, C, C, R], // VOICE_COMMAND
    [R, R, C, C, C, C, R, R, C, E, C, C, R], // CALL_RING
    [R, R, C, R, C, C, C, C, R, C, C, C, R], // CALL
    [R, C, C, E, E, E, C, C, C, E, C, C, R], // ALARM
    [R, C, C, E, E, E, C, C, C, E, C, C, R], // NOTIFICATION
    [R, C, C, E, E, E, C, C, C, E, C, C, R], // SYSTEM_SOUND
    [R, R, R, R, R, C, R, R, R, C, C, R, R], // EMERGENCY
    [R, C, C, C, C, C, C, C, C, C, C, C, C], // SAFETY
    [R, C, C, C, C, C, C, C, C, E, C, C, C], // VEHICLE_STATUS
    [R, E, C, E, E, E, E, C, C, E, C, C, E], // ANNOUNCEMENT
];

/// Lookup table plus the runtime "reject navigation during calls" rule
///
/// Shared by every zone arbiter; the toggle is atomic so a settings change is
/// seen by the next request in any zone.
#[derive(Debug)]
pub struct FocusInteractionPolicy {
    matrix: InteractionMatrix,
    reject_navigation_on_call: AtomicBool,
}

impl FocusInteractionPolicy {
    pub fn new(reject_navigation_on_call: bool) -> Self {
        Self::with_matrix(DEFAULT_MATRIX, reject_navigation_on_call)
    }

    /// Policy over a custom table
    pub fn with_matrix(matrix: InteractionMatrix, reject_navigation_on_call: bool) -> Self {
        Self {
            matrix,
            reject_navigation_on_call: AtomicBool::new(reject_navigation_on_call),
        }
    }

    /// Interaction of a requester with an existing holder
    pub fn interaction_of(
        &self,
        holder: CarAudioContext,
        requester: CarAudioContext,
    ) -> Interaction {
        if holder == CarAudioContext::Call
            && requester == CarAudioContext::Navigation
            && self.reject_navigation_on_call()
        {
            return Interaction::Reject;
        }
        self.matrix[holder.index()][requester.index()]
    }

    /// Either side excludes the other
    pub fn are_mutually_exclusive(&self, a: CarAudioContext, b: CarAudioContext) -> bool {
        self.interaction_of(a, b) == Interaction::Exclusive
            || self.interaction_of(b, a) == Interaction::Exclusive
    }

    /// Contexts refused while focus is restricted: everything but critical ones
    pub fn is_rejected_during_restriction(&self, context: CarAudioContext) -> bool {
        !context.is_critical()
    }

    pub fn reject_navigation_on_call(&self) -> bool {
        self.reject_navigation_on_call.load(Ordering::Acquire)
    }

    pub fn set_reject_navigation_on_call(&self, reject: bool) {
        self.reject_navigation_on_call.store(reject, Ordering::Release);
    }
}

impl Default for FocusInteractionPolicy {
    fn default() -> Self {
        Self::new(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use CarAudioContext as Ctx;

    #[test]
    fn table_is_asymmetric() {
        let policy = FocusInteractionPolicy::default();
        assert_eq!(policy.interaction_of(Ctx::Call, Ctx::Media), Interaction::Reject);
        assert_eq!(policy.interaction_of(Ctx::Media, Ctx::Call), Interaction::Exclusive);
        assert_eq!(
            policy.interaction_of(Ctx::Media, Ctx::Navigation),
            Interaction::Concurrent
        );
        assert_eq!(
            policy.interaction_of(Ctx::Navigation, Ctx::Media),
            Interaction::Concurrent
        );
    }

    #[test]
    fn invalid_is_always_rejected() {
        let policy = FocusInteractionPolicy::default();
        for context in CarAudioContext::ALL {
            assert_eq!(
                policy.interaction_of(Ctx::Invalid, context),
                Interaction::Reject
            );
            assert_eq!(
                policy.interaction_of(context, Ctx::Invalid),
                Interaction::Reject
            );
        }
    }

    #[test]
    fn safety_never_blocks_others() {
        let policy = FocusInteractionPolicy::default();
        for context in CarAudioContext::ALL {
            assert_eq!(
                policy.interaction_of(Ctx::Safety, context),
                Interaction::Concurrent
            );
        }
    }

    #[test]
    fn navigation_during_call_toggle() {
        let policy = FocusInteractionPolicy::default();
        assert_eq!(
            policy.interaction_of(Ctx::Call, Ctx::Navigation),
            Interaction::Concurrent
        );

        policy.set_reject_navigation_on_call(true);
        assert_eq!(
            policy.interaction_of(Ctx::Call, Ctx::Navigation),
            Interaction::Reject
        );
        assert_eq!(
            policy.interaction_of(Ctx::Navigation, Ctx::Call),
            Interaction::Exclusive
        );

        policy.set_reject_navigation_on_call(false);
        assert_eq!(
            policy.interaction_of(Ctx::Call, Ctx::Navigation),
            Interaction::Concurrent
        );
    }

    #[test]
    fn restriction_spares_critical_contexts() {
        let policy = FocusInteractionPolicy::default();
        assert!(!policy.is_rejected_during_restriction(Ctx::Emergency));
        assert!(!policy.is_rejected_during_restriction(Ctx::Safety));
        assert!(policy.is_rejected_during_restriction(Ctx::VehicleStatus));
        assert!(policy.is_rejected_during_restriction(Ctx::Media));
    }

    #[test]
    fn media_requests_are_mutually_exclusive() {
        let policy = FocusInteractionPolicy::default();
        assert!(policy.are_mutually_exclusive(Ctx::Media, Ctx::Media));
        assert!(policy.are_mutually_exclusive(Ctx::Media, Ctx::Call));
        assert!(!policy.are_mutually_exclusive(Ctx::Media, Ctx::Navigation));
    }
}
