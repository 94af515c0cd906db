/// Audio attributes: the playback intent a client declares with a focus request
use serde::{Deserialize, Serialize};
use std::fmt;

/// Usage tag describing why a stream is played
///
/// Codes match the platform usage constants. Codes of 1000 and above are
/// system usages reserved for privileged vehicle clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AudioUsage {
    Unknown,
    Media,
    VoiceCommunication,
    VoiceCommunicationSignalling,
    Alarm,
    Notification,
    NotificationRingtone,
    NotificationEvent,
    AssistanceAccessibility,
    AssistanceNavigationGuidance,
    AssistanceSonification,
    Game,
    Assistant,
    CallAssistant,
    Emergency,
    Safety,
    VehicleStatus,
    Announcement,
}

impl AudioUsage {
    /// Every usage, in code order
    pub const ALL: [AudioUsage; 18] = [
        Self::Unknown,
        Self::Media,
        Self::VoiceCommunication,
        Self::VoiceCommunicationSignalling,
        Self::Alarm,
        Self::Notification,
        Self::NotificationRingtone,
        Self::NotificationEvent,
        Self::AssistanceAccessibility,
        Self::AssistanceNavigationGuidance,
        Self::AssistanceSonification,
        Self::Game,
        Self::Assistant,
        Self::CallAssistant,
        Self::Emergency,
        Self::Safety,
        Self::VehicleStatus,
        Self::Announcement,
    ];

    /// Integer usage code
    pub const fn code(self) -> i32 {
        match self {
            Self::Unknown => 0,
            Self::Media => 1,
            Self::VoiceCommunication => 2,
            Self::VoiceCommunicationSignalling => 3,
            Self::Alarm => 4,
            Self::Notification => 5,
            Self::NotificationRingtone => 6,
            Self::NotificationEvent => 10,
            Self::AssistanceAccessibility => 11,
            Self::AssistanceNavigationGuidance => 12,
            Self::AssistanceSonification => 13,
            Self::Game => 14,
            Self::Assistant => 16,
            Self::CallAssistant => 17,
            Self::Emergency => 1000,
            Self::Safety => 1001,
            Self::VehicleStatus => 1002,
            Self::Announcement => 1003,
        }
    }

    /// Parse from an integer usage code
    pub fn from_code(code: i32) -> Option<Self> {
        Self::ALL.into_iter().find(|usage| usage.code() == code)
    }

    /// Whether this usage is reserved for system clients
    pub const fn is_system_usage(self) -> bool {
        self.code() >= 1000
    }
}

impl fmt::Display for AudioUsage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}({})", self, self.code())
    }
}

/// Immutable playback-intent descriptor: usage plus system-privilege flag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AudioAttribute {
    usage: AudioUsage,
    system_usage: bool,
}

impl AudioAttribute {
    /// Attribute for a usage, with the system flag derived from the usage code
    pub const fn new(usage: AudioUsage) -> Self {
        Self {
            usage,
            system_usage: usage.is_system_usage(),
        }
    }

    /// Attribute with an explicit system flag
    ///
    /// Combinations absent from the context registry classify as INVALID.
    pub const fn with_system_flag(usage: AudioUsage, system_usage: bool) -> Self {
        Self {
            usage,
            system_usage,
        }
    }

    /// Usage tag
    pub const fn usage(&self) -> AudioUsage {
        self.usage
    }

    /// System-privilege flag
    pub const fn is_system_usage(&self) -> bool {
        self.system_usage
    }
}

impl From<AudioUsage> for AudioAttribute {
    fn from(usage: AudioUsage) -> Self {
        Self::new(usage)
    }
}

impl fmt::Display for AudioAttribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.system_usage {
            write!(f, "{} [system]", self.usage)
        } else {
            write!(f, "{}", self.usage)
        }
    }
}
