//! The lifecycle controller.
//!
//! ```text
//! Stopped --begin_startup--> Starting --> Started | Faulted
//! Started --begin_shutdown-> Stopping --> Stopped | Faulted
//! ```

mod execution;
mod orchestrator;
mod shutdown;
mod startup;
mod state;
mod types;

#[cfg(test)]
mod tests;

pub use orchestrator::{Bootstrapper, DEFAULT_ADDITIONAL_TIME, DEFAULT_EVENT_CAPACITY};
pub use types::BootstrapperState;
