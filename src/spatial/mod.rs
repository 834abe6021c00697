// Spatial module
// Geodesy, listener state and listener-relative positioning

pub mod geo;
pub mod location;
pub mod normalizer;
pub mod source;

pub use geo::{DistanceUnits, GeoPoint};
pub use location::{ListenerState, LocationProvider, LocationReading, LocationSubscription, SubscriptionHandle};
pub use normalizer::{distance, relative_position, RelativePosition};
pub use source::{LocationSource, ReplayLocationSource};
