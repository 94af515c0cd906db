//! Focus request and notification types
//!
//! A `FocusRequest` is created by a caller and consumed by a zone arbiter.
//! It ends in exactly one of: holder, transient loser, delayed, rejected,
//! or abandoned.

use serde::{Deserialize, Serialize};

use super::{AudioAttribute, CarAudioContext, ClientId, ZoneId};

/// Requested focus strength
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GrantKind {
    /// Long-lived focus (media playback)
    Permanent,

    /// Short-lived focus; others should pause
    Transient,

    /// Short-lived focus; others may keep playing attenuated
    TransientMayDuck,

    /// Short-lived focus; nothing else may play
    TransientExclusive,
}

impl GrantKind {
    /// Any of the transient kinds
    pub const fn is_transient(self) -> bool {
        !matches!(self, Self::Permanent)
    }
}

/// A client's request for focus in one zone
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FocusRequest {
    /// Requesting client
    pub client_id: ClientId,

    /// Playback intent
    pub attribute: AudioAttribute,

    /// Requested focus strength
    pub grant: GrantKind,

    /// Client accepts a DELAYED outcome instead of FAILED
    pub accepts_delayed: bool,

    /// Client prefers a transient loss over being attenuated
    pub pauses_on_duck: bool,
}

impl FocusRequest {
    /// Create a request that neither accepts delay nor pauses on duck
    pub fn new(client_id: ClientId, attribute: impl Into<AudioAttribute>, grant: GrantKind) -> Self {
        Self {
            client_id,
            attribute: attribute.into(),
            grant,
            accepts_delayed: false,
            pauses_on_duck: false,
        }
    }

    /// Accept a DELAYED outcome
    #[must_use]
    pub fn accepting_delay(mut self) -> Self {
        self.accepts_delayed = true;
        self
    }

    /// Prefer a transient loss over attenuation
    #[must_use]
    pub fn pausing_on_duck(mut self) -> Self {
        self.pauses_on_duck = true;
        self
    }
}

/// Synchronous result of a focus request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FocusOutcome {
    Granted,
    Delayed,
    Failed,
}

/// Asynchronous focus change delivered to a client
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FocusChange {
    /// Focus granted (restored transient loser or promoted delayed request)
    Gain,

    /// Focus lost for good; the entry is abandoned
    Loss,

    /// Focus lost until the blocking clients leave
    LossTransient,

    /// Transient loss where attenuated playback would have been acceptable
    LossTransientCanDuck,
}

impl FocusChange {
    /// Loss kinds
    pub const fn is_loss(self) -> bool {
        !matches!(self, Self::Gain)
    }
}

/// Focus change addressed to one client in one zone
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FocusNotification {
    pub zone: ZoneId,
    pub client: ClientId,
    pub change: FocusChange,
}

/// A focus entry held by a zone arbiter
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FocusEntry {
    /// The request that created this entry
    pub request: FocusRequest,

    /// Context the request's attribute classified into
    pub context: CarAudioContext,

    /// Clients whose concurrent may-duck requests attenuate this holder
    pub ducked_by: Vec<ClientId>,
}

impl FocusEntry {
    pub fn new(request: FocusRequest, context: CarAudioContext) -> Self {
        Self {
            request,
            context,
            ducked_by: Vec::new(),
        }
    }

    pub fn client_id(&self) -> &ClientId {
        &self.request.client_id
    }

    pub fn attribute(&self) -> AudioAttribute {
        self.request.attribute
    }

    /// Holder is attenuated by at least one concurrent client
    pub fn is_ducked(&self) -> bool {
        !self.ducked_by.is_empty()
    }
}

/// An entry that lost focus transiently and waits for restoration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LostFocusEntry {
    pub entry: FocusEntry,

    /// Clients this entry lost to; restored once empty
    pub blocked_by: Vec<ClientId>,

    /// The loss was a may-duck loss
    pub can_duck: bool,
}

impl LostFocusEntry {
    pub fn client_id(&self) -> &ClientId {
        self.entry.client_id()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::AudioUsage;

    #[test]
    fn builder_sets_flags() {
        let request = FocusRequest::new(
            ClientId::new("nav"),
            AudioUsage::AssistanceNavigationGuidance,
            GrantKind::TransientMayDuck,
        );
        assert!(!request.accepts_delayed);
        assert!(!request.pauses_on_duck);

        let request = request.accepting_delay().pausing_on_duck();
        assert!(request.accepts_delayed);
        assert!(request.pauses_on_duck);
    }

    #[test]
    fn transient_kinds() {
        assert!(!GrantKind::Permanent.is_transient());
        assert!(GrantKind::Transient.is_transient());
        assert!(GrantKind::TransientMayDuck.is_transient());
        assert!(GrantKind::TransientExclusive.is_transient());
    }
}
