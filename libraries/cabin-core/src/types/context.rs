/// Car audio contexts: named integer classes of playback intent
use serde::{Deserialize, Serialize};
use std::fmt;

/// Context used for focus arbitration, ducking and routing
///
/// `Invalid` (id 0) is never part of an "all contexts" enumeration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CarAudioContext {
    Invalid,
    Media,
    Navigation,
    VoiceCommand,
    CallRing,
    Call,
    Alarm,
    Notification,
    SystemSound,
    Emergency,
    Safety,
    VehicleStatus,
    Announcement,
}

impl CarAudioContext {
    /// Every valid context, in id order
    pub const ALL: [CarAudioContext; 12] = [
        Self::Media,
        Self::Navigation,
        Self::VoiceCommand,
        Self::CallRing,
        Self::Call,
        Self::Alarm,
        Self::Notification,
        Self::SystemSound,
        Self::Emergency,
        Self::Safety,
        Self::VehicleStatus,
        Self::Announcement,
    ];

    /// Number of context ids including `Invalid`
    pub const COUNT: usize = 13;

    /// Integer context id
    pub const fn id(self) -> i32 {
        self as i32
    }

    /// Index into per-context tables
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Parse from a context id (including 0 for `Invalid`)
    pub fn from_id(id: i32) -> Option<Self> {
        if id == 0 {
            return Some(Self::Invalid);
        }
        Self::ALL.into_iter().find(|context| context.id() == id)
    }

    /// Upper-case context name
    pub const fn name(self) -> &'static str {
        match self {
            Self::Invalid => "INVALID",
            Self::Media => "MEDIA",
            Self::Navigation => "NAVIGATION",
            Self::VoiceCommand => "VOICE_COMMAND",
            Self::CallRing => "CALL_RING",
            Self::Call => "CALL",
            Self::Alarm => "ALARM",
            Self::Notification => "NOTIFICATION",
            Self::SystemSound => "SYSTEM_SOUND",
            Self::Emergency => "EMERGENCY",
            Self::Safety => "SAFETY",
            Self::VehicleStatus => "VEHICLE_STATUS",
            Self::Announcement => "ANNOUNCEMENT",
        }
    }

    /// Critical contexts survive focus restriction
    pub const fn is_critical(self) -> bool {
        matches!(self, Self::Emergency | Self::Safety)
    }

    /// Contexts reserved for vehicle system clients
    pub const fn is_car_system(self) -> bool {
        matches!(
            self,
            Self::Emergency | Self::Safety | Self::VehicleStatus | Self::Announcement
        )
    }

    /// Whether this is a real (non-INVALID) context
    pub const fn is_valid(self) -> bool {
        !matches!(self, Self::Invalid)
    }
}

impl fmt::Display for CarAudioContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
