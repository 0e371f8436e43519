//! Event names published for onboarding aggregates.

/// Source entity type attached to every onboarding event.
pub const ONBOARDING_ENTITY: &str = "onboarding";

pub const ONBOARDING_CREATED: &str = "onboarding.created";
pub const ONBOARDING_STARTED: &str = "onboarding.started";
pub const ONBOARDING_PAUSED: &str = "onboarding.paused";
pub const ONBOARDING_RESUMED: &str = "onboarding.resumed";
pub const ONBOARDING_STEP_COMPLETED: &str = "onboarding.step_completed";
pub const ONBOARDING_STEP_SKIPPED: &str = "onboarding.step_skipped";
pub const ONBOARDING_COMPLETED: &str = "onboarding.completed";
pub const ONBOARDING_CANCELLED: &str = "onboarding.cancelled";

// Scheduler-originated.
pub const ONBOARDING_REMINDER_DUE: &str = "onboarding.reminder_due";
pub const ONBOARDING_OVERDUE: &str = "onboarding.overdue";
