//! Cabin Audio Core
//!
//! Platform-agnostic types, collaborator traits, and error handling shared by
//! the focus arbitration, ducking, and volume crates.
//!
//! # Architecture
//!
//! The core crate defines:
//! - **Domain Types**: `AudioAttribute`, `CarAudioContext`, `FocusRequest`,
//!   zone and volume-group configuration, the zone routing table
//! - **Collaborator Traits**: `AudioControl` (hardware routing layer),
//!   `FocusOverride` (optional OEM arbitration), `SettingsStore`
//! - **Error Handling**: Unified `CabinError` and `Result` types
//!
//! # Example
//!
//! ```rust
//! use cabin_core::types::{AudioAttribute, AudioUsage, ClientId, FocusRequest, GrantKind};
//!
//! let request = FocusRequest::new(
//!     ClientId::new("media-player"),
//!     AudioAttribute::new(AudioUsage::Media),
//!     GrantKind::Permanent,
//! )
//! .accepting_delay();
//!
//! assert!(request.accepts_delayed);
//! ```

#![forbid(unsafe_code)]

pub mod error;
pub mod storage;
pub mod traits;
pub mod types;

pub use error::{CabinError, Result};
pub use storage::{GroupSettings, InMemorySettingsStore, SettingsStore};
pub use traits::{AudioControl, FocusEvaluationRequest, FocusOverride, NoOverride, OverrideFocusVerdict};

pub use types::{
    AudioAttribute, AudioUsage, CarAudioContext, ClientId, DeviceConfig, DuckingInfo,
    FocusChange, FocusEntry, FocusNotification, FocusOutcome, FocusRequest, GainEvent,
    GainReason, GrantKind, GroupId, LostFocusEntry, UserId, VolumeGroupConfig, ZoneConfig,
    ZoneId, ZoneRoutingTable,
};
