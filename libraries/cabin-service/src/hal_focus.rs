//! Hardware-originated focus requests
//!
//! The hardware layer can ask for focus on behalf of sources the software
//! stack never sees (tuner, aux in, amplifier chimes). Each (zone, usage)
//! pair is represented in the arbiter by one synthetic client whose focus
//! changes are reported back through `AudioControl::on_hal_focus_change`.

use std::sync::Arc;

use tracing::debug;

use cabin_core::{AudioUsage, ClientId, FocusOutcome, GrantKind, ZoneId};

use crate::error::Result;
use crate::service::ZoneAudioService;

const HAL_CLIENT_PREFIX: &str = "hal";

/// Client id used for hardware focus on `usage` in `zone`
pub fn hal_client_id(zone: ZoneId, usage: AudioUsage) -> ClientId {
    ClientId::new(format!("{HAL_CLIENT_PREFIX}:{zone}:{}", usage.code()))
}

/// Inverse of [`hal_client_id`]; `None` for software clients
pub fn parse_hal_client_id(client: &ClientId) -> Option<(ZoneId, AudioUsage)> {
    let mut parts = client.as_str().split(':');
    if parts.next() != Some(HAL_CLIENT_PREFIX) {
        return None;
    }
    let zone = parts.next()?.parse::<u32>().ok()?;
    let usage = AudioUsage::from_code(parts.next()?.parse().ok()?)?;
    if parts.next().is_some() {
        return None;
    }
    Some((ZoneId::new(zone), usage))
}

/// Issues focus requests on behalf of the hardware layer
#[derive(Debug, Clone)]
pub struct HalFocusBridge {
    service: Arc<ZoneAudioService>,
}

impl HalFocusBridge {
    pub fn new(service: Arc<ZoneAudioService>) -> Self {
        Self { service }
    }

    /// Request focus for a hardware source
    ///
    /// A repeated request for the same (zone, usage) replaces the previous
    /// one. The immediate outcome is reported to the hardware as well, before
    /// the zone is released: a grant as `Gain`, a failure as `Loss`. Hardware
    /// requests never wait in the delayed queue.
    pub fn request_focus(
        &self,
        zone: ZoneId,
        usage: AudioUsage,
        grant: GrantKind,
    ) -> Result<FocusOutcome> {
        let outcome = self.service.request_hal_focus(zone, usage, grant)?;
        debug!(%zone, %usage, ?grant, ?outcome, "hardware focus request");
        Ok(outcome)
    }

    /// Drop hardware focus for `usage`; unknown requests are ignored
    pub fn abandon_focus(&self, zone: ZoneId, usage: AudioUsage) -> Result<()> {
        debug!(%zone, %usage, "hardware focus abandoned");
        self.service.abandon_hal_focus(zone, usage)
    }
}
