//! Domain layer for tenant onboarding workflows. No I/O, no logging.

pub mod clock;
pub mod error;
pub mod onboarding;
pub mod types;
