pub mod listener;
pub mod slot;

pub use listener::{PoseListener, DEFAULT_PORT};
pub use slot::PoseSlot;
