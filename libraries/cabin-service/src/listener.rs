//! Outbound event sink for service clients

use cabin_core::FocusNotification;
use cabin_volume::VolumeGroupEvent;

/// Receives focus and volume changes after the service has applied them
///
/// Called outside of any zone lock. Implementations may call back into the
/// service.
pub trait ZoneEventListener: Send + Sync {
    /// A software client gained or lost focus
    fn on_focus_change(&self, notification: &FocusNotification) {
        let _ = notification;
    }

    /// A volume group's index, mute or override state changed
    fn on_volume_group_change(&self, event: &VolumeGroupEvent) {
        let _ = event;
    }
}

/// Listener that ignores every event
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopListener;

impl ZoneEventListener for NoopListener {}
