//! Signal controller and optional filesystem watcher: both translate an
//! external trigger into a [`SignalEvent`] delivered over one channel that
//! the main loop drains serially.

pub mod controller;
pub mod event;
pub mod watcher;

pub use controller::{abort_for_coredump, SignalController};
pub use event::SignalEvent;
pub use watcher::spawn_watcher;
