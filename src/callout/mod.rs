// Callout module
// Places of interest and the announcer that turns them into speech

pub mod announcer;
pub mod places;

pub use announcer::{CalloutAnnouncer, CalloutPolicy};
pub use places::{Place, PlaceSource, StaticPlaces};
