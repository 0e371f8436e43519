//! Reminder and overdue scanner.
//!
//! [`ReminderScheduler`] runs as a background task. On every tick it walks the
//! active onboardings and publishes `onboarding.reminder_due` for those that
//! have gone quiet for their reminder window, and `onboarding.overdue` the
//! first time an onboarding is seen past its due date.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use tenantry_core::clock::Clock;
use tenantry_core::error::CoreError;
use tenantry_core::onboarding::{Onboarding, OnboardingRepository};
use tenantry_core::types::{EntityId, Timestamp};
use tenantry_events::topics;
use tenantry_events::{EventBus, PlatformEvent};
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

/// Counts from a single scan.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScanReport {
    pub scanned: usize,
    pub reminders: usize,
    pub overdue: usize,
}

#[derive(Default)]
struct ScanState {
    last_reminded: HashMap<EntityId, Timestamp>,
    overdue_reported: HashSet<EntityId>,
}

pub struct ReminderScheduler {
    repo: Arc<dyn OnboardingRepository>,
    bus: Arc<EventBus>,
    clock: Arc<dyn Clock>,
    interval: Duration,
    state: Mutex<ScanState>,
}

impl ReminderScheduler {
    pub fn new(
        repo: Arc<dyn OnboardingRepository>,
        bus: Arc<EventBus>,
        clock: Arc<dyn Clock>,
        interval: Duration,
    ) -> Self {
        Self {
            repo,
            bus,
            clock,
            interval,
            state: Mutex::new(ScanState::default()),
        }
    }

    /// Scan on every interval tick until `cancel` fires. The first tick is
    /// immediate.
    pub async fn run(&self, cancel: CancellationToken) {
        let mut interval = tokio::time::interval(self.interval);
        tracing::info!(interval_secs = self.interval.as_secs(), "Reminder scheduler started");

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::info!("Reminder scheduler cancelled");
                    break;
                }
                _ = interval.tick() => {
                    match self.scan_once().await {
                        Ok(report) if report.reminders + report.overdue > 0 => {
                            tracing::info!(
                                scanned = report.scanned,
                                reminders = report.reminders,
                                overdue = report.overdue,
                                "Published onboarding reminders"
                            );
                        }
                        Ok(_) => {}
                        Err(e) => {
                            tracing::error!(error = %e, "Failed to scan onboardings for reminders");
                        }
                    }
                }
            }
        }
    }

    /// One pass over the active onboardings.
    pub async fn scan_once(&self) -> Result<ScanReport, CoreError> {
        let active = self.repo.list_active().await?;
        let clock = self.clock.as_ref();
        let now = clock.now();

        let mut state = self.state.lock().await;
        let active_ids: HashSet<EntityId> = active.iter().map(|v| v.value.id()).collect();
        state.last_reminded.retain(|id, _| active_ids.contains(id));
        state.overdue_reported.retain(|id| active_ids.contains(id));

        let mut report = ScanReport {
            scanned: active.len(),
            ..Default::default()
        };

        for stored in &active {
            let onboarding = &stored.value;
            let id = onboarding.id();

            if onboarding.needs_reminder(clock) && reminder_window_elapsed(&state, onboarding, now) {
                self.publish(topics::ONBOARDING_REMINDER_DUE, onboarding, now);
                state.last_reminded.insert(id, now);
                report.reminders += 1;
                tracing::debug!(onboarding_id = %id, status = onboarding.status().as_str(), "Reminder due");
            }

            if onboarding.is_overdue(clock) && state.overdue_reported.insert(id) {
                self.publish(topics::ONBOARDING_OVERDUE, onboarding, now);
                report.overdue += 1;
                tracing::debug!(onboarding_id = %id, status = onboarding.status().as_str(), "Onboarding overdue");
            }
        }

        Ok(report)
    }

    fn publish(&self, topic: &'static str, onboarding: &Onboarding, now: Timestamp) {
        let event = PlatformEvent::new(topic)
            .with_source(topics::ONBOARDING_ENTITY, onboarding.id())
            .with_payload(json!({
                "status": onboarding.status().as_str(),
                "progress_percentage": onboarding.progress_percentage(),
                "target_user_id": onboarding.target_user_id(),
                "target_user_email": onboarding.target_user_email(),
                "due_date": onboarding.configuration().due_date,
                "last_activity_at": onboarding.last_activity_at(),
            }))
            .at(now);
        self.bus.publish(event);
    }
}

fn reminder_window_elapsed(state: &ScanState, onboarding: &Onboarding, now: Timestamp) -> bool {
    let window =
        chrono::Duration::days(i64::from(onboarding.configuration().reminder_frequency_days));
    match state.last_reminded.get(&onboarding.id()) {
        Some(last) => now - *last >= window,
        None => true,
    }
}
