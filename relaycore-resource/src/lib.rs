//! Generational connection resource manager: tracks every accepted
//! connection from accept through disposal, defers destruction to a
//! sweeper fiber distinct from the resource's own, and implements the two
//! shutdown modes (fast, graceful).

pub mod manager;
pub mod resource;
pub mod state;

pub use manager::{GracePoller, ResourceManager, Slot};
pub use resource::{ConnectionResource, ResourceBookkeeping};
pub use state::ResourceState;
