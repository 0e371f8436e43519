//! The onboarding aggregate root.
//!
//! Owns the ordered step list and the task list, the lifecycle status, the
//! derived [`StepProgress`], and the per-onboarding configuration. Every
//! operation validates first and mutates second, so a returned error means
//! nothing changed.

use chrono::Duration;
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidateEmail};

use crate::clock::Clock;
use crate::error::{require_text, CoreError};
use crate::onboarding::progress::StepProgress;
use crate::onboarding::status::{OnboardingStatus, OnboardingType};
use crate::onboarding::step::{OnboardingStep, StepContent, StepResponse};
use crate::onboarding::task::OnboardingTask;
use crate::onboarding::templates;
use crate::types::{actor_or_system, EntityId, Timestamp};

/// Days between reminders when no configuration has been applied.
pub const DEFAULT_REMINDER_FREQUENCY_DAYS: u32 = 3;

/// Prefix written into the completion feedback on cancellation.
pub const CANCELLED_FEEDBACK_PREFIX: &str = "[Cancelled] ";

// ---------------------------------------------------------------------------
// Inputs
// ---------------------------------------------------------------------------

/// Everything needed to create an onboarding.
#[derive(Debug, Clone, Deserialize)]
pub struct NewOnboarding {
    pub name: String,
    pub onboarding_type: OnboardingType,
    pub target_user_id: String,
    pub target_user_email: String,
    pub target_user_name: String,
    pub created_by: String,
    pub description: Option<String>,
    /// Whether the onboarding is mandatory for the target user.
    #[serde(default = "default_true")]
    pub is_required: bool,
}

fn default_true() -> bool {
    true
}

/// Organisational context of the target user.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Validate)]
pub struct TargetDetails {
    pub target_role: Option<String>,
    pub target_department: Option<String>,
    pub manager_id: Option<String>,
    #[validate(email(message = "Manager email must be a valid email address"))]
    pub manager_email: Option<String>,
}

/// Where and how the target user spends time in the product.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Validate)]
pub struct UsageDetails {
    #[validate(length(max = 256, message = "Most visited section is limited to 256 characters"))]
    pub most_visited_section: Option<String>,
    #[validate(length(max = 256, message = "Device info is limited to 256 characters"))]
    pub device_info: Option<String>,
}

/// Behavioural switches for one onboarding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct OnboardingConfiguration {
    /// Lets required steps be skipped through the aggregate.
    pub allow_skip: bool,
    pub send_reminders: bool,
    #[validate(range(
        min = 1,
        max = 365,
        message = "Reminder frequency must be between 1 and 365 days"
    ))]
    pub reminder_frequency_days: u32,
    pub require_manager_approval: bool,
    pub due_date: Option<Timestamp>,
}

impl Default for OnboardingConfiguration {
    fn default() -> Self {
        Self {
            allow_skip: false,
            send_reminders: false,
            reminder_frequency_days: DEFAULT_REMINDER_FREQUENCY_DAYS,
            require_manager_approval: false,
            due_date: None,
        }
    }
}

/// Outcome record filled in after (or instead of) completion.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Validate)]
pub struct CompletionDetails {
    #[validate(url(message = "Certificate URL must be a valid URL"))]
    pub certificate_url: Option<String>,
    #[validate(range(min = 0.0, max = 100.0, message = "Completion score must be between 0 and 100"))]
    pub score: Option<f64>,
    pub feedback: Option<String>,
    #[validate(range(min = 1, max = 5, message = "Satisfaction rating must be between 1 and 5"))]
    pub satisfaction_rating: Option<u8>,
}

// ---------------------------------------------------------------------------
// Aggregate
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Onboarding {
    id: EntityId,
    name: String,
    description: Option<String>,
    onboarding_type: OnboardingType,
    status: OnboardingStatus,
    is_required: bool,

    target_user_id: String,
    target_user_email: String,
    target_user_name: String,
    target: TargetDetails,

    steps: Vec<OnboardingStep>,
    tasks: Vec<OnboardingTask>,
    actual_duration_secs: Option<i64>,

    started_at: Option<Timestamp>,
    paused_at: Option<Timestamp>,
    resumed_at: Option<Timestamp>,
    completed_at: Option<Timestamp>,
    last_activity_at: Option<Timestamp>,

    login_count: u32,
    first_login_at: Option<Timestamp>,
    last_login_at: Option<Timestamp>,
    help_request_count: u32,
    usage: UsageDetails,

    config: OnboardingConfiguration,
    completion: CompletionDetails,

    created_at: Timestamp,
    created_by: String,
    modified_at: Option<Timestamp>,
    modified_by: Option<String>,
}

impl Onboarding {
    /// Create an onboarding in `NotStarted`, seeded with the default steps
    /// for its type.
    pub fn create(input: NewOnboarding, clock: &dyn Clock) -> Result<Self, CoreError> {
        require_text(&input.name, "Onboarding name is required")?;
        require_text(&input.target_user_id, "Target user ID is required")?;
        require_text(&input.target_user_email, "Target user email is required")?;
        if !input.target_user_email.validate_email() {
            return Err(CoreError::Validation(format!(
                "Target user email '{}' is not a valid email address",
                input.target_user_email
            )));
        }
        require_text(&input.created_by, "Creator is required")?;

        Ok(Self {
            id: EntityId::new_v4(),
            name: input.name,
            description: input.description,
            onboarding_type: input.onboarding_type,
            status: OnboardingStatus::NotStarted,
            is_required: input.is_required,
            target_user_id: input.target_user_id,
            target_user_email: input.target_user_email,
            target_user_name: input.target_user_name,
            target: TargetDetails::default(),
            steps: templates::default_steps(input.onboarding_type),
            tasks: Vec::new(),
            actual_duration_secs: None,
            started_at: None,
            paused_at: None,
            resumed_at: None,
            completed_at: None,
            last_activity_at: None,
            login_count: 0,
            first_login_at: None,
            last_login_at: None,
            help_request_count: 0,
            usage: UsageDetails::default(),
            config: OnboardingConfiguration::default(),
            completion: CompletionDetails::default(),
            created_at: clock.now(),
            created_by: input.created_by,
            modified_at: None,
            modified_by: None,
        })
    }

    // -- accessors --

    pub fn id(&self) -> EntityId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn onboarding_type(&self) -> OnboardingType {
        self.onboarding_type
    }

    pub fn status(&self) -> OnboardingStatus {
        self.status
    }

    pub fn is_required(&self) -> bool {
        self.is_required
    }

    pub fn target_user_id(&self) -> &str {
        &self.target_user_id
    }

    pub fn target_user_email(&self) -> &str {
        &self.target_user_email
    }

    pub fn target_user_name(&self) -> &str {
        &self.target_user_name
    }

    pub fn target(&self) -> &TargetDetails {
        &self.target
    }

    /// Steps sorted by `order`.
    pub fn steps(&self) -> &[OnboardingStep] {
        &self.steps
    }

    pub fn tasks(&self) -> &[OnboardingTask] {
        &self.tasks
    }

    pub fn step(&self, step_id: EntityId) -> Option<&OnboardingStep> {
        self.steps.iter().find(|s| s.id() == step_id)
    }

    pub fn task(&self, task_id: EntityId) -> Option<&OnboardingTask> {
        self.tasks.iter().find(|t| t.id() == task_id)
    }

    /// Counters derived from the current steps on every call.
    pub fn progress(&self) -> StepProgress {
        StepProgress::from_steps(&self.steps)
    }

    pub fn total_steps(&self) -> u32 {
        self.progress().total_steps()
    }

    pub fn completed_steps(&self) -> u32 {
        self.progress().completed_steps()
    }

    pub fn skipped_steps(&self) -> u32 {
        self.progress().skipped_steps()
    }

    pub fn progress_percentage(&self) -> u8 {
        self.progress().progress_percentage()
    }

    /// Sum of the step estimates; steps without one count as zero.
    pub fn estimated_duration(&self) -> Duration {
        let minutes: u32 = self
            .steps
            .iter()
            .filter_map(|s| s.estimated_duration_minutes())
            .sum();
        Duration::minutes(i64::from(minutes))
    }

    /// Wall-clock span from first start to completion.
    pub fn actual_duration(&self) -> Option<Duration> {
        self.actual_duration_secs.map(Duration::seconds)
    }

    pub fn started_at(&self) -> Option<Timestamp> {
        self.started_at
    }

    pub fn paused_at(&self) -> Option<Timestamp> {
        self.paused_at
    }

    pub fn resumed_at(&self) -> Option<Timestamp> {
        self.resumed_at
    }

    pub fn completed_at(&self) -> Option<Timestamp> {
        self.completed_at
    }

    pub fn last_activity_at(&self) -> Option<Timestamp> {
        self.last_activity_at
    }

    pub fn login_count(&self) -> u32 {
        self.login_count
    }

    pub fn first_login_at(&self) -> Option<Timestamp> {
        self.first_login_at
    }

    pub fn last_login_at(&self) -> Option<Timestamp> {
        self.last_login_at
    }

    pub fn help_request_count(&self) -> u32 {
        self.help_request_count
    }

    pub fn usage(&self) -> &UsageDetails {
        &self.usage
    }

    pub fn configuration(&self) -> &OnboardingConfiguration {
        &self.config
    }

    pub fn completion(&self) -> &CompletionDetails {
        &self.completion
    }

    pub fn created_at(&self) -> Timestamp {
        self.created_at
    }

    pub fn created_by(&self) -> &str {
        &self.created_by
    }

    pub fn modified_at(&self) -> Option<Timestamp> {
        self.modified_at
    }

    pub fn modified_by(&self) -> Option<&str> {
        self.modified_by.as_deref()
    }

    // -- queries --

    /// Required steps that are neither completed nor skipped.
    pub fn pending_required_steps(&self) -> impl Iterator<Item = &OnboardingStep> {
        self.steps
            .iter()
            .filter(|s| s.is_required() && !s.is_finished())
    }

    pub fn all_required_steps_finished(&self) -> bool {
        self.pending_required_steps().next().is_none()
    }

    /// Due date set, already passed, and not completed.
    pub fn is_overdue(&self, clock: &dyn Clock) -> bool {
        let past_due = self
            .config
            .due_date
            .is_some_and(|due| due < clock.now());
        past_due && self.status != OnboardingStatus::Completed
    }

    /// Reminders are on, the onboarding is in progress, and no activity has
    /// been recorded for at least the reminder frequency.
    pub fn needs_reminder(&self, clock: &dyn Clock) -> bool {
        if !self.config.send_reminders || self.status != OnboardingStatus::InProgress {
            return false;
        }
        let window = Duration::days(i64::from(self.config.reminder_frequency_days));
        match self.last_activity_at {
            Some(last) => clock.now() - last >= window,
            None => true,
        }
    }

    pub fn overdue_tasks(&self, clock: &dyn Clock) -> Vec<&OnboardingTask> {
        let now = clock.now();
        self.tasks.iter().filter(|t| t.is_overdue(now)).collect()
    }

    // -- composition --

    /// Insert a step, keeping the list sorted by `order`. Steps sharing an
    /// order keep insertion order.
    pub fn add_step(&mut self, step: OnboardingStep) -> Result<(), CoreError> {
        if self.step(step.id()).is_some() {
            return Err(CoreError::Conflict(format!(
                "Step {} already belongs to this onboarding",
                step.id()
            )));
        }
        let at = self.steps.partition_point(|s| s.order() <= step.order());
        self.steps.insert(at, step);
        Ok(())
    }

    pub fn add_task(&mut self, task: OnboardingTask) -> Result<(), CoreError> {
        if self.task(task.id()).is_some() {
            return Err(CoreError::Conflict(format!(
                "Task {} already belongs to this onboarding",
                task.id()
            )));
        }
        self.tasks.push(task);
        Ok(())
    }

    // -- lifecycle --

    /// Start a fresh onboarding, or resume a paused one.
    pub fn start(&mut self, modified_by: Option<&str>, clock: &dyn Clock) -> Result<(), CoreError> {
        if !matches!(
            self.status,
            OnboardingStatus::NotStarted | OnboardingStatus::Paused
        ) {
            return Err(CoreError::transition(
                "Onboarding can only be started from NotStarted or Paused status",
            ));
        }
        self.begin(clock.now(), modified_by);
        Ok(())
    }

    pub fn pause(&mut self, modified_by: Option<&str>, clock: &dyn Clock) -> Result<(), CoreError> {
        if self.status != OnboardingStatus::InProgress {
            return Err(CoreError::transition("Can only pause in-progress onboarding"));
        }
        let now = clock.now();
        self.status = OnboardingStatus::Paused;
        self.paused_at = Some(now);
        self.touch(now, modified_by);
        Ok(())
    }

    pub fn resume(&mut self, modified_by: Option<&str>, clock: &dyn Clock) -> Result<(), CoreError> {
        if self.status != OnboardingStatus::Paused {
            return Err(CoreError::transition("Can only resume paused onboarding"));
        }
        let now = clock.now();
        self.status = OnboardingStatus::InProgress;
        self.resumed_at = Some(now);
        self.paused_at = None;
        self.last_activity_at = Some(now);
        self.touch(now, modified_by);
        Ok(())
    }

    /// Explicitly complete an in-progress onboarding.
    pub fn complete(&mut self, modified_by: Option<&str>, clock: &dyn Clock) -> Result<(), CoreError> {
        if self.status != OnboardingStatus::InProgress {
            return Err(CoreError::transition("Can only complete in-progress onboarding"));
        }
        if !self.all_required_steps_finished() {
            return Err(CoreError::transition(
                "Cannot complete onboarding with pending required steps",
            ));
        }
        self.finish(clock.now(), modified_by);
        Ok(())
    }

    pub fn cancel(
        &mut self,
        reason: &str,
        modified_by: Option<&str>,
        clock: &dyn Clock,
    ) -> Result<(), CoreError> {
        if self.status.is_terminal() {
            return Err(CoreError::transition(
                "Cannot cancel completed or already cancelled onboarding",
            ));
        }
        require_text(reason, "Cancellation reason is required")?;

        let now = clock.now();
        let note = format!("{CANCELLED_FEEDBACK_PREFIX}{}", reason.trim());
        self.completion.feedback = Some(match self.completion.feedback.take() {
            Some(existing) if !existing.trim().is_empty() => format!("{existing}\n{note}"),
            _ => note,
        });
        self.status = OnboardingStatus::Cancelled;
        self.touch(now, modified_by);
        Ok(())
    }

    // -- steps --

    pub fn start_step(
        &mut self,
        step_id: EntityId,
        modified_by: Option<&str>,
        clock: &dyn Clock,
    ) -> Result<(), CoreError> {
        let idx = self.step_index(step_id)?;
        self.ensure_steps_mutable()?;

        let now = clock.now();
        self.steps[idx].start(now)?;
        self.after_step_change(now, modified_by);
        Ok(())
    }

    /// Mark a step completed. Completing the last outstanding required step
    /// completes the onboarding.
    pub fn complete_step(
        &mut self,
        step_id: EntityId,
        modified_by: Option<&str>,
        clock: &dyn Clock,
    ) -> Result<(), CoreError> {
        let idx = self.step_index(step_id)?;
        self.ensure_steps_mutable()?;

        let now = clock.now();
        self.steps[idx].complete(modified_by, now)?;
        self.after_step_change(now, modified_by);
        Ok(())
    }

    /// Skip a step. Required steps are only skippable while `allow_skip` is
    /// on; the aggregate then bypasses the step's own required guard.
    pub fn skip_step(
        &mut self,
        step_id: EntityId,
        reason: &str,
        modified_by: Option<&str>,
        clock: &dyn Clock,
    ) -> Result<(), CoreError> {
        let idx = self.step_index(step_id)?;
        self.ensure_steps_mutable()?;

        let now = clock.now();
        let step = &mut self.steps[idx];
        if step.is_required() {
            if !self.config.allow_skip {
                return Err(CoreError::transition("Cannot skip required step"));
            }
            step.skip_unchecked(reason, modified_by, now)?;
        } else {
            step.skip(reason, modified_by, now)?;
        }
        self.after_step_change(now, modified_by);
        Ok(())
    }

    pub fn set_step_content(
        &mut self,
        step_id: EntityId,
        content: StepContent,
        modified_by: Option<&str>,
        clock: &dyn Clock,
    ) -> Result<(), CoreError> {
        let idx = self.step_index(step_id)?;
        self.steps[idx].set_content(content)?;
        self.touch(clock.now(), modified_by);
        Ok(())
    }

    /// Store the target user's answer, feedback, and rating for a step.
    pub fn record_step_response(
        &mut self,
        step_id: EntityId,
        response: StepResponse,
        clock: &dyn Clock,
    ) -> Result<(), CoreError> {
        let idx = self.step_index(step_id)?;
        self.steps[idx].record_response(response)?;
        let now = clock.now();
        self.last_activity_at = Some(now);
        self.touch(now, None);
        Ok(())
    }

    pub fn require_step_verification(
        &mut self,
        step_id: EntityId,
        required: bool,
        modified_by: Option<&str>,
        clock: &dyn Clock,
    ) -> Result<(), CoreError> {
        let idx = self.step_index(step_id)?;
        self.steps[idx].set_requires_verification(required);
        self.touch(clock.now(), modified_by);
        Ok(())
    }

    pub fn verify_step(
        &mut self,
        step_id: EntityId,
        verified_by: &str,
        clock: &dyn Clock,
    ) -> Result<(), CoreError> {
        let idx = self.step_index(step_id)?;
        let now = clock.now();
        self.steps[idx].verify(verified_by, now)?;
        self.touch(now, Some(verified_by));
        Ok(())
    }

    // -- tasks --

    pub fn assign_task(
        &mut self,
        task_id: EntityId,
        assigned_to: &str,
        assigned_by: &str,
        clock: &dyn Clock,
    ) -> Result<(), CoreError> {
        let idx = self.task_index(task_id)?;
        let now = clock.now();
        self.tasks[idx].assign(assigned_to, assigned_by, now)?;
        self.touch(now, Some(assigned_by));
        Ok(())
    }

    pub fn start_task(
        &mut self,
        task_id: EntityId,
        modified_by: Option<&str>,
        clock: &dyn Clock,
    ) -> Result<(), CoreError> {
        let idx = self.task_index(task_id)?;
        let now = clock.now();
        self.tasks[idx].start(now)?;
        self.touch(now, modified_by);
        Ok(())
    }

    pub fn complete_task(
        &mut self,
        task_id: EntityId,
        completion_notes: Option<String>,
        modified_by: Option<&str>,
        clock: &dyn Clock,
    ) -> Result<(), CoreError> {
        let idx = self.task_index(task_id)?;
        let now = clock.now();
        self.tasks[idx].complete(completion_notes, now)?;
        self.touch(now, modified_by);
        Ok(())
    }

    pub fn cancel_task(
        &mut self,
        task_id: EntityId,
        modified_by: Option<&str>,
        clock: &dyn Clock,
    ) -> Result<(), CoreError> {
        let idx = self.task_index(task_id)?;
        let now = clock.now();
        self.tasks[idx].cancel(now)?;
        self.touch(now, modified_by);
        Ok(())
    }

    pub fn set_task_notes(
        &mut self,
        task_id: EntityId,
        notes: Option<String>,
        modified_by: Option<&str>,
        clock: &dyn Clock,
    ) -> Result<(), CoreError> {
        let idx = self.task_index(task_id)?;
        self.tasks[idx].set_notes(notes);
        self.touch(clock.now(), modified_by);
        Ok(())
    }

    // -- analytics --

    /// Count a login by the target user. The first login of a not-started
    /// onboarding starts it.
    pub fn record_login(&mut self, clock: &dyn Clock) {
        let now = clock.now();
        self.login_count += 1;
        self.last_login_at = Some(now);
        if self.first_login_at.is_none() {
            self.first_login_at = Some(now);
        }
        if self.status == OnboardingStatus::NotStarted {
            self.begin(now, None);
        }
    }

    pub fn record_help_request(&mut self, clock: &dyn Clock) {
        self.help_request_count += 1;
        self.last_activity_at = Some(clock.now());
    }

    /// Replace the usage snapshot reported by the client.
    pub fn record_usage(
        &mut self,
        usage: UsageDetails,
        clock: &dyn Clock,
    ) -> Result<(), CoreError> {
        usage.validate()?;
        self.usage = usage;
        self.last_activity_at = Some(clock.now());
        Ok(())
    }

    // -- settings --

    pub fn set_target_details(
        &mut self,
        details: TargetDetails,
        modified_by: &str,
        clock: &dyn Clock,
    ) -> Result<(), CoreError> {
        details.validate()?;
        self.target = details;
        self.touch(clock.now(), Some(modified_by));
        Ok(())
    }

    pub fn set_configuration(
        &mut self,
        config: OnboardingConfiguration,
        modified_by: &str,
        clock: &dyn Clock,
    ) -> Result<(), CoreError> {
        config.validate()?;
        self.config = config;
        self.touch(clock.now(), Some(modified_by));
        Ok(())
    }

    pub fn set_completion_details(
        &mut self,
        details: CompletionDetails,
        modified_by: &str,
        clock: &dyn Clock,
    ) -> Result<(), CoreError> {
        details.validate()?;
        self.completion = details;
        self.touch(clock.now(), Some(modified_by));
        Ok(())
    }

    // -- internals --

    fn step_index(&self, step_id: EntityId) -> Result<usize, CoreError> {
        self.steps
            .iter()
            .position(|s| s.id() == step_id)
            .ok_or(CoreError::NotFound {
                entity: "Step",
                id: step_id,
            })
    }

    fn task_index(&self, task_id: EntityId) -> Result<usize, CoreError> {
        self.tasks
            .iter()
            .position(|t| t.id() == task_id)
            .ok_or(CoreError::NotFound {
                entity: "Task",
                id: task_id,
            })
    }

    /// Steps stay mutable after completion; only cancellation freezes them.
    fn ensure_steps_mutable(&self) -> Result<(), CoreError> {
        if self.status == OnboardingStatus::Cancelled {
            return Err(CoreError::transition(
                "Cannot modify steps of a cancelled onboarding",
            ));
        }
        Ok(())
    }

    fn begin(&mut self, now: Timestamp, modified_by: Option<&str>) {
        if self.status == OnboardingStatus::Paused {
            self.resumed_at = Some(now);
            self.paused_at = None;
        }
        if self.started_at.is_none() {
            self.started_at = Some(now);
        }
        self.status = OnboardingStatus::InProgress;
        self.last_activity_at = Some(now);
        self.touch(now, modified_by);
    }

    fn finish(&mut self, now: Timestamp, modified_by: Option<&str>) {
        self.status = OnboardingStatus::Completed;
        self.completed_at = Some(now);
        self.actual_duration_secs = self.started_at.map(|s| (now - s).num_seconds());
        self.touch(now, modified_by);
    }

    fn after_step_change(&mut self, now: Timestamp, modified_by: Option<&str>) {
        self.last_activity_at = Some(now);
        self.touch(now, modified_by);

        if !self.status.is_terminal() && self.all_required_steps_finished() {
            self.finish(now, modified_by);
        }
    }

    fn touch(&mut self, now: Timestamp, modified_by: Option<&str>) {
        self.modified_at = Some(now);
        self.modified_by = Some(actor_or_system(modified_by));
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::onboarding::status::{StepStatus, StepType, TaskPriority, TaskStatus};
    use crate::types::SYSTEM_USER;
    use assert_matches::assert_matches;
    use chrono::{TimeZone, Utc};

    fn clock() -> ManualClock {
        ManualClock::new(Utc.with_ymd_and_hms(2025, 1, 6, 9, 0, 0).unwrap())
    }

    fn new_input(t: OnboardingType) -> NewOnboarding {
        NewOnboarding {
            name: "Jane's onboarding".into(),
            onboarding_type: t,
            target_user_id: "user-42".into(),
            target_user_email: "jane@acme.test".into(),
            target_user_name: "Jane Doe".into(),
            created_by: "hr@acme.test".into(),
            description: Some("First week".into()),
            is_required: true,
        }
    }

    fn employee(clock: &ManualClock) -> Onboarding {
        Onboarding::create(new_input(OnboardingType::NewEmployee), clock).unwrap()
    }

    fn step_id(o: &Onboarding, title: &str) -> EntityId {
        o.steps()
            .iter()
            .find(|s| s.title() == title)
            .map(|s| s.id())
            .unwrap()
    }

    // -- create --

    #[test]
    fn create_seeds_template_and_defaults() {
        let clock = clock();
        let o = employee(&clock);

        assert_eq!(o.status(), OnboardingStatus::NotStarted);
        assert_eq!(o.total_steps(), 5);
        assert_eq!(o.completed_steps(), 0);
        assert_eq!(o.skipped_steps(), 0);
        assert_eq!(o.progress_percentage(), 0);
        assert_eq!(o.login_count(), 0);
        assert_eq!(o.help_request_count(), 0);
        assert_eq!(o.configuration().reminder_frequency_days, 3);
        assert!(!o.configuration().allow_skip);
        assert_eq!(o.created_at(), clock.now());
        assert_eq!(o.created_by(), "hr@acme.test");
        assert_eq!(o.estimated_duration(), Duration::minutes(30));
    }

    #[test]
    fn create_rejects_missing_fields() {
        let clock = clock();
        let cases: [fn(&mut NewOnboarding); 5] = [
            |i| i.name = " ".into(),
            |i| i.target_user_id = String::new(),
            |i| i.target_user_email = String::new(),
            |i| i.target_user_email = "not-an-email".into(),
            |i| i.created_by = String::new(),
        ];
        for mutate in cases {
            let mut input = new_input(OnboardingType::NewEmployee);
            mutate(&mut input);
            assert_matches!(Onboarding::create(input, &clock), Err(CoreError::Validation(_)));
        }
    }

    #[test]
    fn custom_type_starts_empty() {
        let clock = clock();
        let o = Onboarding::create(new_input(OnboardingType::Custom), &clock).unwrap();
        assert_eq!(o.total_steps(), 0);
        assert_eq!(o.progress_percentage(), 0);
    }

    // -- composition --

    #[test]
    fn add_step_keeps_order_and_recounts() {
        let clock = clock();
        let mut o = employee(&clock);
        let step = OnboardingStep::new(3, "Meet the Team", StepType::Action, false)
            .unwrap()
            .with_estimated_minutes(45);
        let id = step.id();
        o.add_step(step.clone()).unwrap();

        assert_eq!(o.total_steps(), 6);
        assert_eq!(o.estimated_duration(), Duration::minutes(75));
        let orders: Vec<i32> = o.steps().iter().map(|s| s.order()).collect();
        assert_eq!(orders, [1, 2, 3, 3, 4, 5]);
        assert_eq!(o.steps()[3].id(), id);

        assert_matches!(o.add_step(step), Err(CoreError::Conflict(_)));
        assert_eq!(o.total_steps(), 6);
    }

    #[test]
    fn add_task_appends() {
        let clock = clock();
        let mut o = employee(&clock);
        let task = OnboardingTask::new("Order laptop", None, TaskPriority::High, None).unwrap();
        let id = task.id();
        o.add_task(task).unwrap();
        assert_eq!(o.tasks().len(), 1);
        assert!(o.task(id).is_some());
    }

    // -- lifecycle --

    #[test]
    fn start_from_not_started() {
        let clock = clock();
        let mut o = employee(&clock);
        o.start(Some("manager@acme.test"), &clock).unwrap();

        assert_eq!(o.status(), OnboardingStatus::InProgress);
        assert_eq!(o.started_at(), Some(clock.now()));
        assert_eq!(o.last_activity_at(), Some(clock.now()));
        assert_eq!(o.modified_by(), Some("manager@acme.test"));
    }

    #[test]
    fn start_twice_fails() {
        let clock = clock();
        let mut o = employee(&clock);
        o.start(None, &clock).unwrap();
        let err = o.start(None, &clock).unwrap_err();
        assert!(err
            .to_string()
            .contains("Onboarding can only be started from NotStarted or Paused status"));
    }

    #[test]
    fn start_from_paused_resumes_and_keeps_first_start() {
        let clock = clock();
        let mut o = employee(&clock);
        let first = clock.now();
        o.start(None, &clock).unwrap();
        clock.advance(Duration::hours(1));
        o.pause(None, &clock).unwrap();
        assert_eq!(o.paused_at(), Some(clock.now()));

        clock.advance(Duration::hours(1));
        o.start(None, &clock).unwrap();
        assert_eq!(o.status(), OnboardingStatus::InProgress);
        assert_eq!(o.resumed_at(), Some(clock.now()));
        assert!(o.paused_at().is_none());
        assert_eq!(o.started_at(), Some(first));
    }

    #[test]
    fn pause_and_resume_guards() {
        let clock = clock();
        let mut o = employee(&clock);
        assert!(o
            .pause(None, &clock)
            .unwrap_err()
            .to_string()
            .contains("Can only pause in-progress onboarding"));
        assert!(o
            .resume(None, &clock)
            .unwrap_err()
            .to_string()
            .contains("Can only resume paused onboarding"));

        o.start(None, &clock).unwrap();
        o.pause(Some("lead"), &clock).unwrap();
        o.resume(Some("lead"), &clock).unwrap();
        assert_eq!(o.status(), OnboardingStatus::InProgress);
        assert!(o.paused_at().is_none());
        assert_eq!(o.resumed_at(), Some(clock.now()));
    }

    #[test]
    fn explicit_complete_requires_required_steps() {
        let clock = clock();
        let mut o = employee(&clock);
        o.start(None, &clock).unwrap();
        let before = o.clone();

        let err = o.complete(None, &clock).unwrap_err();
        assert!(err
            .to_string()
            .contains("Cannot complete onboarding with pending required steps"));
        assert_eq!(o, before);
    }

    #[test]
    fn explicit_complete_of_stepless_onboarding() {
        let clock = clock();
        let mut o = Onboarding::create(new_input(OnboardingType::Custom), &clock).unwrap();
        assert_matches!(o.complete(None, &clock), Err(CoreError::InvalidTransition(_)));

        o.start(None, &clock).unwrap();
        clock.advance(Duration::minutes(30));
        o.complete(Some("hr"), &clock).unwrap();
        assert_eq!(o.status(), OnboardingStatus::Completed);
        assert_eq!(o.actual_duration(), Some(Duration::minutes(30)));
    }

    #[test]
    fn cancel_appends_feedback() {
        let clock = clock();
        let mut o = employee(&clock);
        o.set_completion_details(
            CompletionDetails {
                feedback: Some("Going well".into()),
                ..Default::default()
            },
            "hr",
            &clock,
        )
        .unwrap();
        o.cancel("Offer withdrawn", Some("hr"), &clock).unwrap();

        assert_eq!(o.status(), OnboardingStatus::Cancelled);
        assert_eq!(
            o.completion().feedback.as_deref(),
            Some("Going well\n[Cancelled] Offer withdrawn")
        );
    }

    #[test]
    fn cancel_terminal_fails() {
        let clock = clock();
        let mut o = employee(&clock);
        o.cancel("Duplicate", None, &clock).unwrap();
        let err = o.cancel("Again", None, &clock).unwrap_err();
        assert!(err
            .to_string()
            .contains("Cannot cancel completed or already cancelled onboarding"));
        assert_eq!(o.completion().feedback.as_deref(), Some("[Cancelled] Duplicate"));
    }

    #[test]
    fn cancel_requires_reason() {
        let clock = clock();
        let mut o = employee(&clock);
        assert_matches!(o.cancel("", None, &clock), Err(CoreError::Validation(_)));
        assert_eq!(o.status(), OnboardingStatus::NotStarted);
    }

    // -- steps --

    #[test]
    fn complete_step_updates_progress_and_activity() {
        let clock = clock();
        let mut o = employee(&clock);
        o.start(None, &clock).unwrap();
        clock.advance(Duration::minutes(5));
        o.complete_step(step_id(&o, "Welcome"), Some("jane"), &clock)
            .unwrap();

        assert_eq!(o.completed_steps(), 1);
        assert_eq!(o.progress_percentage(), 20);
        assert_eq!(o.last_activity_at(), Some(clock.now()));
        assert_eq!(o.modified_by(), Some("jane"));
        assert_eq!(o.status(), OnboardingStatus::InProgress);
    }

    #[test]
    fn unknown_step_is_not_found_and_changes_nothing() {
        let clock = clock();
        let mut o = employee(&clock);
        let before = o.clone();

        let err = o
            .complete_step(EntityId::new_v4(), None, &clock)
            .unwrap_err();
        assert_matches!(err, CoreError::NotFound { entity: "Step", .. });
        assert!(err.to_string().contains("Step not found"));
        assert_eq!(o, before);
    }

    #[test]
    fn completing_required_steps_auto_completes() {
        let clock = clock();
        let mut o = employee(&clock);
        o.start(None, &clock).unwrap();
        let started = clock.now();

        for title in ["Company Policies", "Welcome", "Profile Setup"] {
            clock.advance(Duration::minutes(10));
            o.complete_step(step_id(&o, title), None, &clock).unwrap();
        }

        assert_eq!(o.status(), OnboardingStatus::Completed);
        assert_eq!(o.completed_steps(), 3);
        assert_eq!(o.progress_percentage(), 60);
        assert_eq!(o.completed_at(), Some(clock.now()));
        assert_eq!(o.actual_duration(), Some(clock.now() - started));
        assert_eq!(o.pending_required_steps().count(), 0);
    }

    #[test]
    fn steps_stay_mutable_after_completion() {
        let clock = clock();
        let mut o = employee(&clock);
        for title in ["Welcome", "Profile Setup", "Company Policies"] {
            o.complete_step(step_id(&o, title), None, &clock).unwrap();
        }
        let completed_at = o.completed_at();

        o.skip_step(step_id(&o, "Training Videos"), "Later", None, &clock)
            .unwrap();
        o.skip_step(step_id(&o, "System Tour"), "Later", None, &clock)
            .unwrap();

        assert_eq!(o.progress_percentage(), 100);
        assert_eq!(o.status(), OnboardingStatus::Completed);
        assert_eq!(o.completed_at(), completed_at);
    }

    #[test]
    fn skip_required_step_honours_allow_skip() {
        let clock = clock();
        let mut o = employee(&clock);
        let welcome = step_id(&o, "Welcome");
        let before = o.clone();

        let err = o.skip_step(welcome, "No time", None, &clock).unwrap_err();
        assert!(err.to_string().contains("Cannot skip required step"));
        assert_eq!(o, before);

        o.set_configuration(
            OnboardingConfiguration {
                allow_skip: true,
                ..Default::default()
            },
            "admin",
            &clock,
        )
        .unwrap();
        o.skip_step(welcome, "No time", Some("admin"), &clock).unwrap();
        assert_eq!(o.skipped_steps(), 1);
        assert_eq!(o.step(welcome).unwrap().status(), StepStatus::Skipped);
    }

    #[test]
    fn skipping_last_required_step_auto_completes() {
        let clock = clock();
        let mut o = Onboarding::create(new_input(OnboardingType::NewCustomer), &clock).unwrap();
        o.set_configuration(
            OnboardingConfiguration {
                allow_skip: true,
                ..Default::default()
            },
            "admin",
            &clock,
        )
        .unwrap();
        o.skip_step(step_id(&o, "Account Setup"), "Migrated", None, &clock)
            .unwrap();
        assert_eq!(o.status(), OnboardingStatus::Completed);
        assert_eq!(o.progress_percentage(), 33);
    }

    #[test]
    fn finished_step_cannot_be_completed_again() {
        let clock = clock();
        let mut o = employee(&clock);
        let welcome = step_id(&o, "Welcome");
        o.complete_step(welcome, None, &clock).unwrap();
        let before = o.clone();

        assert_matches!(
            o.complete_step(welcome, None, &clock),
            Err(CoreError::InvalidTransition(_))
        );
        assert_eq!(o, before);
    }

    #[test]
    fn cancelled_onboarding_freezes_steps() {
        let clock = clock();
        let mut o = employee(&clock);
        o.cancel("Left company", None, &clock).unwrap();
        assert_matches!(
            o.complete_step(step_id(&o, "Welcome"), None, &clock),
            Err(CoreError::InvalidTransition(_))
        );
        assert_eq!(o.completed_steps(), 0);
    }

    #[test]
    fn start_step_marks_in_progress() {
        let clock = clock();
        let mut o = employee(&clock);
        let tour = step_id(&o, "System Tour");
        o.start_step(tour, None, &clock).unwrap();
        assert_eq!(o.step(tour).unwrap().status(), StepStatus::InProgress);
        assert_eq!(o.progress_percentage(), 0);
    }

    #[test]
    fn step_details_flow_through_aggregate() {
        let clock = clock();
        let mut o = employee(&clock);
        let policies = step_id(&o, "Company Policies");

        o.set_step_content(
            policies,
            StepContent {
                document_url: Some("https://docs.acme.test/handbook.pdf".into()),
                ..Default::default()
            },
            Some("hr"),
            &clock,
        )
        .unwrap();
        o.record_step_response(
            policies,
            StepResponse {
                feedback: Some("Clear".into()),
                rating: Some(4),
                ..Default::default()
            },
            &clock,
        )
        .unwrap();
        o.require_step_verification(policies, true, Some("hr"), &clock)
            .unwrap();
        o.verify_step(policies, "legal@acme.test", &clock).unwrap();

        let step = o.step(policies).unwrap();
        assert!(step.content().document_url.is_some());
        assert_eq!(step.response().rating, Some(4));
        assert!(step.is_verified());
        assert_eq!(o.modified_by(), Some("legal@acme.test"));
    }

    // -- tasks --

    #[test]
    fn task_operations_are_mediated() {
        let clock = clock();
        let mut o = employee(&clock);
        let task = OnboardingTask::new(
            "Badge photo",
            None,
            TaskPriority::Medium,
            Some(clock.now() + Duration::days(1)),
        )
        .unwrap();
        let id = task.id();
        o.add_task(task).unwrap();

        o.assign_task(id, "security@acme.test", "hr@acme.test", &clock)
            .unwrap();
        o.start_task(id, None, &clock).unwrap();
        o.complete_task(id, Some("Done".into()), None, &clock).unwrap();
        assert_eq!(o.task(id).unwrap().status(), TaskStatus::Completed);

        // Tasks never gate the onboarding.
        assert_eq!(o.status(), OnboardingStatus::NotStarted);

        assert_matches!(
            o.start_task(EntityId::new_v4(), None, &clock),
            Err(CoreError::NotFound { entity: "Task", .. })
        );
    }

    #[test]
    fn cancelled_task_cannot_be_reopened() {
        let clock = clock();
        let mut o = employee(&clock);
        let task = OnboardingTask::new("Parking pass", None, TaskPriority::Low, None).unwrap();
        let id = task.id();
        o.add_task(task).unwrap();
        o.cancel_task(id, Some("hr"), &clock).unwrap();
        let modified_at = o.modified_at();

        clock.advance(Duration::hours(1));
        assert_matches!(
            o.start_task(id, None, &clock),
            Err(CoreError::InvalidTransition(_))
        );
        assert_matches!(
            o.complete_task(id, None, None, &clock),
            Err(CoreError::InvalidTransition(_))
        );
        assert_eq!(o.task(id).unwrap().status(), TaskStatus::Cancelled);
        assert_eq!(o.modified_at(), modified_at);
    }

    #[test]
    fn overdue_tasks_are_listed() {
        let clock = clock();
        let mut o = employee(&clock);
        let due = clock.now() + Duration::days(1);
        let late = OnboardingTask::new("Sign NDA", None, TaskPriority::Urgent, Some(due)).unwrap();
        let done = OnboardingTask::new("Tax form", None, TaskPriority::Low, Some(due)).unwrap();
        let done_id = done.id();
        o.add_task(late).unwrap();
        o.add_task(done).unwrap();
        o.complete_task(done_id, None, None, &clock).unwrap();

        clock.advance(Duration::days(2));
        let overdue = o.overdue_tasks(&clock);
        assert_eq!(overdue.len(), 1);
        assert_eq!(overdue[0].title(), "Sign NDA");
    }

    // -- analytics --

    #[test]
    fn first_login_starts_onboarding() {
        let clock = clock();
        let mut o = employee(&clock);
        o.record_login(&clock);

        assert_eq!(o.status(), OnboardingStatus::InProgress);
        assert_eq!(o.login_count(), 1);
        assert!(o.first_login_at().is_some());
        assert_eq!(o.first_login_at(), o.last_login_at());
        assert_eq!(o.modified_by(), Some(SYSTEM_USER));
    }

    #[test]
    fn later_logins_only_move_last_login() {
        let clock = clock();
        let mut o = employee(&clock);
        let first = clock.now();
        o.record_login(&clock);
        clock.advance(Duration::days(1));
        o.record_login(&clock);

        assert_eq!(o.login_count(), 2);
        assert_eq!(o.first_login_at(), Some(first));
        assert_eq!(o.last_login_at(), Some(clock.now()));
    }

    #[test]
    fn login_does_not_restart_paused_onboarding() {
        let clock = clock();
        let mut o = employee(&clock);
        o.start(None, &clock).unwrap();
        o.pause(None, &clock).unwrap();
        o.record_login(&clock);
        assert_eq!(o.status(), OnboardingStatus::Paused);
    }

    #[test]
    fn usage_snapshot_is_validated_and_stored() {
        let clock = clock();
        let mut o = employee(&clock);
        clock.advance(Duration::minutes(20));
        o.record_usage(
            UsageDetails {
                most_visited_section: Some("inventory".into()),
                device_info: Some("Firefox 131 / Linux".into()),
            },
            &clock,
        )
        .unwrap();
        assert_eq!(o.usage().most_visited_section.as_deref(), Some("inventory"));
        assert_eq!(o.usage().device_info.as_deref(), Some("Firefox 131 / Linux"));
        assert_eq!(o.last_activity_at(), Some(clock.now()));

        let too_long = UsageDetails {
            most_visited_section: Some("x".repeat(257)),
            device_info: None,
        };
        assert_matches!(o.record_usage(too_long, &clock), Err(CoreError::Validation(_)));
        assert_eq!(o.usage().most_visited_section.as_deref(), Some("inventory"));
    }

    #[test]
    fn help_request_counts_as_activity() {
        let clock = clock();
        let mut o = employee(&clock);
        clock.advance(Duration::hours(2));
        o.record_help_request(&clock);
        assert_eq!(o.help_request_count(), 1);
        assert_eq!(o.last_activity_at(), Some(clock.now()));
    }

    // -- settings --

    #[test]
    fn satisfaction_rating_must_be_in_range() {
        let clock = clock();
        let mut o = employee(&clock);
        for rating in [0, 6] {
            let before = o.clone();
            let err = o
                .set_completion_details(
                    CompletionDetails {
                        satisfaction_rating: Some(rating),
                        feedback: Some("ignored".into()),
                        ..Default::default()
                    },
                    "hr",
                    &clock,
                )
                .unwrap_err();
            assert!(err
                .to_string()
                .contains("Satisfaction rating must be between 1 and 5"));
            assert_eq!(o, before);
        }

        o.set_completion_details(
            CompletionDetails {
                certificate_url: Some("https://certs.acme.test/42".into()),
                score: Some(92.5),
                feedback: Some("Great".into()),
                satisfaction_rating: Some(5),
            },
            "hr",
            &clock,
        )
        .unwrap();
        assert_eq!(o.completion().satisfaction_rating, Some(5));
    }

    #[test]
    fn target_details_validate_manager_email() {
        let clock = clock();
        let mut o = employee(&clock);
        let bad = TargetDetails {
            manager_email: Some("boss".into()),
            ..Default::default()
        };
        assert_matches!(
            o.set_target_details(bad, "hr", &clock),
            Err(CoreError::Validation(_))
        );

        let good = TargetDetails {
            target_role: Some("Engineer".into()),
            target_department: Some("R&D".into()),
            manager_id: Some("mgr-7".into()),
            manager_email: Some("boss@acme.test".into()),
        };
        o.set_target_details(good.clone(), "hr", &clock).unwrap();
        assert_eq!(o.target(), &good);
        assert_eq!(o.modified_by(), Some("hr"));
    }

    #[test]
    fn configuration_rejects_zero_frequency() {
        let clock = clock();
        let mut o = employee(&clock);
        let config = OnboardingConfiguration {
            reminder_frequency_days: 0,
            ..Default::default()
        };
        assert_matches!(
            o.set_configuration(config, "hr", &clock),
            Err(CoreError::Validation(_))
        );
        assert_eq!(o.configuration().reminder_frequency_days, 3);
    }

    // -- queries --

    #[test]
    fn overdue_tracks_due_date_and_status() {
        let clock = clock();
        let mut o = employee(&clock);
        assert!(!o.is_overdue(&clock));

        o.set_configuration(
            OnboardingConfiguration {
                due_date: Some(clock.now() + Duration::days(7)),
                ..Default::default()
            },
            "hr",
            &clock,
        )
        .unwrap();
        assert!(!o.is_overdue(&clock));

        clock.advance(Duration::days(8));
        assert!(o.is_overdue(&clock));

        for title in ["Welcome", "Profile Setup", "Company Policies"] {
            o.complete_step(step_id(&o, title), None, &clock).unwrap();
        }
        assert!(!o.is_overdue(&clock));
    }

    #[test]
    fn reminder_after_inactivity_window() {
        let clock = clock();
        let mut o = employee(&clock);
        o.set_configuration(
            OnboardingConfiguration {
                send_reminders: true,
                reminder_frequency_days: 2,
                ..Default::default()
            },
            "hr",
            &clock,
        )
        .unwrap();
        assert!(!o.needs_reminder(&clock), "not started yet");

        o.start(None, &clock).unwrap();
        clock.advance(Duration::days(1));
        assert!(!o.needs_reminder(&clock));

        clock.advance(Duration::days(1));
        assert!(o.needs_reminder(&clock));

        o.record_help_request(&clock);
        assert!(!o.needs_reminder(&clock));

        clock.advance(Duration::days(3));
        o.pause(None, &clock).unwrap();
        assert!(!o.needs_reminder(&clock), "paused onboardings are quiet");
    }

    #[test]
    fn reminders_off_by_default() {
        let clock = clock();
        let mut o = employee(&clock);
        o.start(None, &clock).unwrap();
        clock.advance(Duration::days(30));
        assert!(!o.needs_reminder(&clock));
    }

    #[test]
    fn serializes_for_persistence() {
        let clock = clock();
        let mut o = employee(&clock);
        o.start(None, &clock).unwrap();
        let json = serde_json::to_value(&o).unwrap();
        assert_eq!(json["status"], "in_progress");
        assert_eq!(json["onboarding_type"], "new_employee");

        let back: Onboarding = serde_json::from_value(json).unwrap();
        assert_eq!(back, o);
    }

    #[test]
    fn stored_counters_are_ignored_on_load() {
        let clock = clock();
        let mut o = employee(&clock);
        o.complete_step(step_id(&o, "Welcome"), None, &clock).unwrap();

        let mut json = serde_json::to_value(&o).unwrap();
        json["progress"] = serde_json::json!({
            "total_steps": 5,
            "completed_steps": 9,
            "skipped_steps": 0,
            "progress_percentage": 77
        });
        json["estimated_duration_minutes"] = serde_json::json!(999);

        let back: Onboarding = serde_json::from_value(json).unwrap();
        assert_eq!(back.completed_steps(), 1);
        assert_eq!(back.progress_percentage(), 20);
        assert_eq!(back.progress().remaining_steps(), 4);
        assert_eq!(back.estimated_duration(), Duration::minutes(30));
    }
}
