// Execution module

pub mod deriver;
pub mod events;
pub mod listener;
pub mod tracker;

pub use deriver::{Derivation, derive, derive_result};
pub use events::ListenerEvent;
pub use listener::{BackendErrorPolicy, EventListener, OutcomeTally};
pub use tracker::{GroupStatusPolicy, RunTracker, TrackerOptions};
