//! Tenant onboarding: a guided, ordered sequence of steps for one user,
//! with side tasks, progress tracking, and a small lifecycle state machine.

pub mod aggregate;
pub mod progress;
pub mod repository;
pub mod status;
pub mod step;
pub mod task;
pub mod templates;

pub use aggregate::{
    CompletionDetails, NewOnboarding, Onboarding, OnboardingConfiguration, TargetDetails,
    UsageDetails,
};
pub use progress::StepProgress;
pub use repository::{OnboardingRepository, Version, Versioned};
pub use status::{
    OnboardingStatus, OnboardingType, StepStatus, StepType, TaskPriority, TaskStatus,
};
pub use step::{OnboardingStep, StepContent, StepResponse};
pub use task::OnboardingTask;
