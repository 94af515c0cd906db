//! Cabin Audio volume groups
//!
//! Per-group gain state with hardware override layers (block, limit,
//! attenuate, mute), and the router that feeds hardware gain events into it.
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use cabin_core::{
//!     CarAudioContext, DeviceConfig, GainReason, GroupId, InMemorySettingsStore, UserId,
//!     VolumeGroupConfig, ZoneId,
//! };
//! use cabin_volume::{Persistence, VolumeGroupState};
//!
//! let config = VolumeGroupConfig {
//!     id: GroupId::new(0),
//!     name: "front".to_string(),
//!     min_index: 0,
//!     max_index: 40,
//!     default_index: 20,
//!     devices: vec![DeviceConfig {
//!         address: "bus0_media_out".to_string(),
//!         step_size: 100,
//!         contexts: vec![CarAudioContext::Media],
//!     }],
//! };
//! let mut group = VolumeGroupState::new(
//!     ZoneId::PRIMARY,
//!     &config,
//!     UserId::new(10),
//!     Arc::new(InMemorySettingsStore::new()),
//!     Persistence::default(),
//! )
//! .unwrap();
//!
//! group.on_hardware_gain_event(&[GainReason::ThermalLimitation], 15);
//! assert_eq!(group.effective_index(), 15);
//! assert!(group.is_over_limit());
//! ```

#![forbid(unsafe_code)]

mod group;
pub mod reasons;
mod router;

pub use group::{Persistence, VolumeEventKind, VolumeGroupEvent, VolumeGroupSnapshot, VolumeGroupState};
pub use reasons::GainDirectives;
pub use router::GainEventRouter;
