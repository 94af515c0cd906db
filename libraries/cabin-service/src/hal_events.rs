/// Asynchronous hardware event intake
use crate::{hal_focus::HalFocusBridge, service::ZoneAudioService};
use cabin_core::{AudioUsage, GainEvent, GrantKind, ZoneId};
use std::sync::Arc;
use tokio::{sync::mpsc, task::JoinHandle};

/// Event delivered by the hardware audio layer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HalEvent {
    /// Gain changes for one or more device addresses of a zone
    GainChanged { zone: ZoneId, events: Vec<GainEvent> },

    /// A hardware source asks for focus
    FocusRequested {
        zone: ZoneId,
        usage: AudioUsage,
        grant: GrantKind,
    },

    /// A hardware source gives focus up
    FocusAbandoned { zone: ZoneId, usage: AudioUsage },
}

/// Start the event loop on the current runtime
pub fn spawn_hal_event_loop(
    service: Arc<ZoneAudioService>,
    events: mpsc::Receiver<HalEvent>,
) -> JoinHandle<()> {
    tokio::spawn(run_hal_event_loop(service, events))
}

/// Apply hardware events in arrival order until the sender side closes
///
/// A failing event is logged and skipped; it never stops the loop.
pub async fn run_hal_event_loop(service: Arc<ZoneAudioService>, mut events: mpsc::Receiver<HalEvent>) {
    let bridge = HalFocusBridge::new(Arc::clone(&service));
    tracing::info!("HAL event loop started");

    while let Some(event) = events.recv().await {
        match event {
            HalEvent::GainChanged { zone, events } => {
                service.on_gain_events(zone, &events);
            }
            HalEvent::FocusRequested { zone, usage, grant } => {
                if let Err(e) = bridge.request_focus(zone, usage, grant) {
                    tracing::warn!("Hardware focus request for {} in zone {} failed: {}", usage, zone, e);
                }
            }
            HalEvent::FocusAbandoned { zone, usage } => {
                if let Err(e) = bridge.abandon_focus(zone, usage) {
                    tracing::warn!("Hardware focus abandon for {} in zone {} failed: {}", usage, zone, e);
                }
            }
        }
    }

    tracing::info!("HAL event loop stopped");
}
