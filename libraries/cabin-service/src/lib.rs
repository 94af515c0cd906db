//! Cabin Audio service
//!
//! In-process facade over the focus engine and volume groups: loads the zone
//! configuration, owns one arbiter per zone, keeps ducking and gain in step
//! with arbitration, and consumes hardware events.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use cabin_core::{AudioControl, AudioUsage, ClientId, DuckingInfo, FocusRequest, GrantKind, ZoneId};
//! use cabin_service::{ServiceCollaborators, ServiceConfig, ZoneAudioService};
//!
//! struct Hal;
//!
//! impl AudioControl for Hal {
//!     fn on_devices_to_duck_change(&self, _ducking: &[DuckingInfo]) {}
//!     fn set_gain_index(&self, _zone: ZoneId, _address: &str, _index: i32) {}
//! }
//!
//! # fn main() -> cabin_service::Result<()> {
//! let config = ServiceConfig::load()?;
//! let service = ZoneAudioService::new(&config, ServiceCollaborators::new(Arc::new(Hal)))?;
//!
//! let outcome = service.request(
//!     ZoneId::PRIMARY,
//!     FocusRequest::new(ClientId::new("music"), AudioUsage::Media, GrantKind::Permanent),
//! )?;
//! println!("{outcome:?}");
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]

pub mod config;
pub mod error;
mod hal_events;
mod hal_focus;
mod listener;
mod service;

pub use config::ServiceConfig;
pub use error::{Result, ServiceError};
pub use hal_events::{run_hal_event_loop, spawn_hal_event_loop, HalEvent};
pub use hal_focus::{hal_client_id, parse_hal_client_id, HalFocusBridge};
pub use listener::{NoopListener, ZoneEventListener};
pub use service::{ServiceCollaborators, ZoneAudioService};
