use std::sync::Arc;

use tenantry_core::clock::Clock;
use tenantry_core::onboarding::OnboardingRepository;
use tenantry_events::EventBus;

use crate::config::WorkerConfig;
use crate::memory_repo::InMemoryOnboardingRepo;
use crate::reminders::ReminderScheduler;
use crate::service::OnboardingService;

/// Everything the worker runs on, wired over one store and one event bus.
///
/// Cheap to clone; every part is behind an `Arc`.
#[derive(Clone)]
pub struct WorkerState {
    pub config: Arc<WorkerConfig>,
    pub repo: Arc<dyn OnboardingRepository>,
    pub event_bus: Arc<EventBus>,
    /// Entry point for every onboarding write.
    pub service: Arc<OnboardingService>,
    /// Reads the same store the service writes to.
    pub scheduler: Arc<ReminderScheduler>,
}

impl WorkerState {
    /// Wire the worker over a fresh in-memory store.
    pub fn new(config: WorkerConfig, clock: Arc<dyn Clock>) -> Self {
        Self::with_repo(config, Arc::new(InMemoryOnboardingRepo::new()), clock)
    }

    pub fn with_repo(
        config: WorkerConfig,
        repo: Arc<dyn OnboardingRepository>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let event_bus = Arc::new(EventBus::new(config.event_bus_capacity));
        let service = Arc::new(OnboardingService::new(
            Arc::clone(&repo),
            Arc::clone(&event_bus),
            Arc::clone(&clock),
        ));
        let scheduler = Arc::new(ReminderScheduler::new(
            Arc::clone(&repo),
            Arc::clone(&event_bus),
            clock,
            config.reminder_scan_interval(),
        ));
        Self {
            config: Arc::new(config),
            repo,
            event_bus,
            service,
            scheduler,
        }
    }
}
