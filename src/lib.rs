// Spatial Callouts - spoken, positioned announcements of nearby places
// Module declarations
pub mod audio;
pub mod callout;
pub mod error;
pub mod mode;
pub mod queue;
pub mod settings;
pub mod spatial;
pub mod state;

pub use audio::SpatialPlayer;
pub use callout::{CalloutAnnouncer, CalloutPolicy, Place};
pub use mode::{ModeController, ModeSounds, OperatingMode};
pub use queue::QueueItem;
pub use settings::NavigatorSettings;
pub use spatial::{GeoPoint, ListenerState, LocationProvider};
pub use state::{Backends, Navigator};
