//! Domain event plumbing for the onboarding engine.
//!
//! - [`EventBus`]: in-process publish/subscribe hub backed by
//!   `tokio::sync::broadcast`.
//! - [`PlatformEvent`]: the event envelope.
//! - [`topics`]: the event names the worker publishes.

pub mod bus;
pub mod topics;

pub use bus::{EventBus, PlatformEvent};
