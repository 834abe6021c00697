// Queue module
// Announcement items and the FIFO they wait in

pub mod item;
pub mod playback;

pub use item::QueueItem;
pub use playback::PlaybackQueue;
