//! Sky tracking rates and the field rotation they cause.

use std::str::FromStr;

use thiserror::Error;
use unspinned::{Radians, State};

const SIDEREAL: Radians = Radians(0.000_072_921_15);
const LUNAR: Radians = Radians(0.000_071_194_889_1);
const SOLAR: Radians = Radians(0.000_072_722_1);

/// How fast the mount follows the sky, in radians per second.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum TrackingRate {
    Sidereal,
    Lunar,
    Solar,
    Custom(Radians),
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("invalid tracking rate '{0}'")]
pub(crate) struct InvalidTrackingRate(String);

impl TrackingRate {
    pub(crate) fn radians_per_second(self) -> Radians {
        match self {
            TrackingRate::Sidereal => SIDEREAL,
            TrackingRate::Lunar => LUNAR,
            TrackingRate::Solar => SOLAR,
            TrackingRate::Custom(rate) => rate,
        }
    }
}

impl FromStr for TrackingRate {
    type Err = InvalidTrackingRate;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "sidereal" => Ok(TrackingRate::Sidereal),
            "lunar" => Ok(TrackingRate::Lunar),
            "solar" => Ok(TrackingRate::Solar),
            other => other
                .parse::<f64>()
                .ok()
                .filter(|rate| rate.is_finite())
                .map(|rate| TrackingRate::Custom(Radians(rate)))
                .ok_or_else(|| InvalidTrackingRate(other.to_owned())),
        }
    }
}

/// Rate at which the field turns for an alt-az mount, in radians per second.
///
/// `-rate * cos(az) * cos(lat) / cos(alt)`
pub(crate) fn field_rotation_rate(rate: TrackingRate, state: &State) -> Radians {
    let pointing = state.pointing_at;
    Radians(
        -rate.radians_per_second().0 * pointing.az.to_radians().cos()
            * state.latitude.to_radians().cos()
            / pointing.alt.to_radians().cos(),
    )
}
