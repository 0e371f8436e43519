//! Derived step counters.

use serde::Serialize;

use crate::onboarding::status::StepStatus;
use crate::onboarding::step::OnboardingStep;

/// Step counters and the percentage derived from them.
///
/// Always produced by [`StepProgress::from_steps`]; there is no way to set a
/// field independently.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StepProgress {
    total_steps: u32,
    completed_steps: u32,
    skipped_steps: u32,
    progress_percentage: u8,
}

impl StepProgress {
    pub fn from_steps(steps: &[OnboardingStep]) -> Self {
        let total_steps = steps.len() as u32;
        let completed_steps = count(steps, StepStatus::Completed);
        let skipped_steps = count(steps, StepStatus::Skipped);
        Self {
            total_steps,
            completed_steps,
            skipped_steps,
            progress_percentage: percentage(completed_steps + skipped_steps, total_steps),
        }
    }

    pub fn total_steps(&self) -> u32 {
        self.total_steps
    }

    pub fn completed_steps(&self) -> u32 {
        self.completed_steps
    }

    pub fn skipped_steps(&self) -> u32 {
        self.skipped_steps
    }

    /// Steps neither completed nor skipped.
    pub fn remaining_steps(&self) -> u32 {
        self.total_steps
            .saturating_sub(self.completed_steps)
            .saturating_sub(self.skipped_steps)
    }

    pub fn progress_percentage(&self) -> u8 {
        self.progress_percentage
    }
}

fn count(steps: &[OnboardingStep], status: StepStatus) -> u32 {
    steps.iter().filter(|s| s.status() == status).count() as u32
}

/// `round(100 * done / total)` with halves rounded up; 0 when `total` is 0.
pub fn percentage(done: u32, total: u32) -> u8 {
    if total == 0 {
        return 0;
    }
    let done = u64::from(done.min(total));
    let total = u64::from(total);
    ((200 * done + total) / (2 * total)) as u8
}
