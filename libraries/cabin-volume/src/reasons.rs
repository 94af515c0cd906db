//! Hardware gain reason predicates

use cabin_core::GainReason;

/// Reasons that block gain at the reported index
pub const BLOCKING_REASONS: [GainReason; 3] = [
    GainReason::ForcedMasterMute,
    GainReason::RemoteMute,
    GainReason::TcuMute,
];

/// Reasons that cap gain at the reported index
pub const LIMITING_REASONS: [GainReason; 2] = [
    GainReason::ThermalLimitation,
    GainReason::SuspendExitVolLimitation,
];

/// Reasons that attenuate gain to the reported index
pub const DUCKING_REASONS: [GainReason; 3] = [
    GainReason::AdasDucking,
    GainReason::NavDucking,
    GainReason::ProjectionDucking,
];

pub fn should_block(reasons: &[GainReason]) -> bool {
    reasons.iter().any(|reason| BLOCKING_REASONS.contains(reason))
}

pub fn should_limit(reasons: &[GainReason]) -> bool {
    reasons.iter().any(|reason| LIMITING_REASONS.contains(reason))
}

pub fn should_duck(reasons: &[GainReason]) -> bool {
    reasons.iter().any(|reason| DUCKING_REASONS.contains(reason))
}

/// What one hardware gain event asks a volume group to do
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GainDirectives {
    pub block: bool,
    pub limit: bool,
    pub duck: bool,

    /// External amplifier reported a new volume with no other override
    pub amp_feedback: bool,
}

impl GainDirectives {
    pub fn from_reasons(reasons: &[GainReason]) -> Self {
        let block = should_block(reasons);
        let limit = should_limit(reasons);
        let duck = should_duck(reasons);
        let amp_feedback = !(block || limit || duck)
            && reasons.contains(&GainReason::ExternalAmpVolFeedback);
        Self {
            block,
            limit,
            duck,
            amp_feedback,
        }
    }

    /// Whether the reported index is used at all
    pub fn uses_index(&self) -> bool {
        self.block || self.limit || self.duck || self.amp_feedback
    }
}
