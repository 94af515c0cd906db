//! Cabin Audio focus engine
//!
//! Audio focus arbitration and ducking for multi-zone car audio.
//!
//! # Components
//!
//! - [`ContextClassifier`]: maps audio attributes to car audio contexts
//! - [`FocusInteractionPolicy`]: (holder, requester) → interaction lookup
//! - [`ZoneFocusArbiter`]: the per-zone focus state machine
//! - [`DuckGraph`] / [`DuckingCoordinator`]: which hardware addresses to attenuate
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use cabin_core::{AudioUsage, ClientId, FocusOutcome, FocusRequest, GrantKind, ZoneId};
//! use cabin_focus::{ContextClassifier, FocusInteractionPolicy, ZoneFocusArbiter};
//!
//! let mut arbiter = ZoneFocusArbiter::new(
//!     ZoneId::PRIMARY,
//!     Arc::new(ContextClassifier::default()),
//!     Arc::new(FocusInteractionPolicy::default()),
//! );
//!
//! let decision = arbiter.request(FocusRequest::new(
//!     ClientId::new("music"),
//!     AudioUsage::Media,
//!     GrantKind::Permanent,
//! ));
//! assert_eq!(decision.outcome, FocusOutcome::Granted);
//! ```

#![forbid(unsafe_code)]

mod arbiter;
mod classifier;
mod duck_graph;
mod ducking;
mod interaction;

pub use arbiter::{ClientFocusState, FocusDecision, ZoneFocusArbiter};
pub use classifier::{default_registry, ContextClassifier, ContextInfo};
pub use duck_graph::DuckGraph;
pub use ducking::DuckingCoordinator;
pub use interaction::{FocusInteractionPolicy, Interaction, InteractionMatrix};
