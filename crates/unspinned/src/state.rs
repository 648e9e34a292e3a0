use serde::{Deserialize, Serialize};

use crate::angle::Degrees;

/// A telescope pointing direction in horizontal coordinates.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct AltAz {
    /// Altitude above the horizon.
    pub alt: Degrees,
    /// Azimuth.
    pub az: Degrees,
}

/// Site position, rotator angle and pointing, as reported by TheSkyX.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct State {
    /// Site longitude.
    pub longitude: Degrees,
    /// Site latitude.
    pub latitude: Degrees,
    /// Current rotator position angle.
    pub rotator_angle: Degrees,
    /// Where the telescope points.
    pub pointing_at: AltAz,
}
