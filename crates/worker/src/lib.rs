//! Application layer around the onboarding domain: storage, the service that
//! drives aggregates and publishes events, and the reminder scanner.

pub mod config;
pub mod listener;
pub mod memory_repo;
pub mod reminders;
pub mod service;
pub mod state;

pub use config::{LogFormat, WorkerConfig};
pub use memory_repo::InMemoryOnboardingRepo;
pub use reminders::{ReminderScheduler, ScanReport};
pub use service::OnboardingService;
pub use state::WorkerState;
