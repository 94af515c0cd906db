/// Hardware gain-change event types
use serde::{Deserialize, Serialize};

/// Reason code attached to a hardware gain change
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GainReason {
    ForcedMasterMute,
    RemoteMute,
    TcuMute,
    AdasDucking,
    NavDucking,
    ProjectionDucking,
    ThermalLimitation,
    SuspendExitVolLimitation,
    ExternalAmpVolFeedback,
    Other,
}

impl GainReason {
    /// Bit code used by the hardware layer
    pub const fn code(self) -> u32 {
        match self {
            Self::ForcedMasterMute => 0x1,
            Self::RemoteMute => 0x2,
            Self::TcuMute => 0x4,
            Self::AdasDucking => 0x8,
            Self::NavDucking => 0x10,
            Self::ProjectionDucking => 0x20,
            Self::ThermalLimitation => 0x40,
            Self::SuspendExitVolLimitation => 0x80,
            Self::ExternalAmpVolFeedback => 0x100,
            Self::Other => 0x8000_0000,
        }
    }

    /// Decode a reason bit mask; unknown bits map to `Other`
    pub fn from_mask(mask: u32) -> Vec<GainReason> {
        const KNOWN: [GainReason; 9] = [
            GainReason::ForcedMasterMute,
            GainReason::RemoteMute,
            GainReason::TcuMute,
            GainReason::AdasDucking,
            GainReason::NavDucking,
            GainReason::ProjectionDucking,
            GainReason::ThermalLimitation,
            GainReason::SuspendExitVolLimitation,
            GainReason::ExternalAmpVolFeedback,
        ];
        let mut reasons: Vec<GainReason> = KNOWN
            .into_iter()
            .filter(|reason| mask & reason.code() != 0)
            .collect();
        let known_bits = KNOWN.iter().fold(0, |bits, reason| bits | reason.code());
        if mask & !known_bits != 0 {
            reasons.push(GainReason::Other);
        }
        reasons
    }
}

/// One hardware gain change for one device address
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GainEvent {
    /// Device address the change applies to
    pub address: String,

    /// Why the hardware changed the gain (empty = overrides lifted)
    pub reasons: Vec<GainReason>,

    /// Gain index reported by the hardware
    pub index: i32,
}
