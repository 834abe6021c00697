// Listener-relative coordinates for spatial playback
//
// Pure functions: every call works from the listener state it is given, so
// the player can call them at dequeue time with the freshest reading.

use serde::Serialize;

use super::geo::{DistanceUnits, GeoPoint};
use super::location::ListenerState;

/// Offset of a target from the listener in meters.
///
/// The listener sits at the origin facing +y; +x is to the listener's right.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct RelativePosition {
    pub x: f64,
    pub y: f64,
}

impl RelativePosition {
    /// Non-spatialized placement used for items without a location
    pub const ORIGIN: RelativePosition = RelativePosition { x: 0.0, y: 0.0 };

    pub fn distance(&self) -> f64 {
        self.x.hypot(self.y)
    }

    /// Angle from straight ahead in degrees, positive to the right, in -180..=180
    pub fn azimuth(&self) -> f64 {
        if self.x == 0.0 && self.y == 0.0 {
            return 0.0;
        }
        self.x.atan2(self.y).to_degrees()
    }
}

/// Position of `target` as heard by `listener`
pub fn relative_position(listener: &ListenerState, target: &GeoPoint) -> RelativePosition {
    let meters = listener.position.distance_m(target);
    let bearing = listener.position.bearing_to(target);
    let theta = (bearing - listener.heading).to_radians();

    RelativePosition {
        x: meters * theta.sin(),
        y: meters * theta.cos(),
    }
}

/// Distance from the listener to `target` expressed in `units`
pub fn distance(listener: &ListenerState, target: &GeoPoint, units: DistanceUnits) -> f64 {
    units.from_meters(listener.position.distance_m(target))
}
