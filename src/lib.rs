pub mod cli;
pub mod config;
pub mod error;
pub mod execution;
pub mod logging;
pub mod report;
pub mod state;
pub mod time;

pub use error::{AdapterError, BackendError, Result};
pub use execution::{EventListener, ListenerEvent, RunTracker, derive};
