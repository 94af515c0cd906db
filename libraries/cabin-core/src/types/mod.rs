mod attributes;
mod context;
mod ducking;
mod focus;
mod gain;
mod ids;
mod zone;

pub use attributes::{AudioAttribute, AudioUsage};
pub use context::CarAudioContext;
pub use ducking::DuckingInfo;
pub use focus::{
    FocusChange, FocusEntry, FocusNotification, FocusOutcome, FocusRequest, GrantKind,
    LostFocusEntry,
};
pub use gain::{GainEvent, GainReason};
pub use ids::{ClientId, GroupId, UserId, ZoneId};
pub use zone::{validate_zones, DeviceConfig, VolumeGroupConfig, ZoneConfig, ZoneRoutingTable};
