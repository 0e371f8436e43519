//! A single ordered unit of work inside an onboarding.
//!
//! Steps are owned by [`Onboarding`](super::Onboarding). Their mutators are
//! crate-private so every change flows through the aggregate and its
//! lifecycle checks.

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::error::{require_text, CoreError};
use crate::onboarding::status::{StepStatus, StepType};
use crate::types::{EntityId, Timestamp};

/// Estimate given to a step unless one is set explicitly.
pub const DEFAULT_STEP_MINUTES: u32 = 5;

/// Rich content attached to a step. All links must be absolute URLs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Validate)]
pub struct StepContent {
    #[validate(url(message = "Content URL must be a valid URL"))]
    pub content_url: Option<String>,
    pub content_html: Option<String>,
    #[validate(url(message = "Video URL must be a valid URL"))]
    pub video_url: Option<String>,
    #[validate(url(message = "Document URL must be a valid URL"))]
    pub document_url: Option<String>,
    #[validate(url(message = "Action URL must be a valid URL"))]
    pub action_url: Option<String>,
}

/// What the target user submitted for a step.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Validate)]
pub struct StepResponse {
    pub response: Option<serde_json::Value>,
    pub feedback: Option<String>,
    #[validate(range(min = 1, max = 5, message = "Rating must be between 1 and 5"))]
    pub rating: Option<u8>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OnboardingStep {
    id: EntityId,
    order: i32,
    title: String,
    description: Option<String>,
    step_type: StepType,
    is_required: bool,
    estimated_duration_minutes: Option<u32>,

    status: StepStatus,
    started_at: Option<Timestamp>,
    completed_at: Option<Timestamp>,
    completed_by: Option<String>,
    skipped_at: Option<Timestamp>,
    skipped_by: Option<String>,
    skip_reason: Option<String>,
    actual_duration_minutes: Option<i64>,

    content: StepContent,
    response: StepResponse,

    requires_verification: bool,
    is_verified: bool,
    verified_at: Option<Timestamp>,
    verified_by: Option<String>,
}

impl OnboardingStep {
    /// Create a pending step. The title must not be blank.
    pub fn new(
        order: i32,
        title: impl Into<String>,
        step_type: StepType,
        is_required: bool,
    ) -> Result<Self, CoreError> {
        let title = title.into();
        require_text(&title, "Step title is required")?;
        Ok(Self::pending(order, title, step_type, is_required))
    }

    /// Infallible constructor for built-in templates.
    pub(crate) fn pending(order: i32, title: String, step_type: StepType, is_required: bool) -> Self {
        Self {
            id: EntityId::new_v4(),
            order,
            title,
            description: None,
            step_type,
            is_required,
            estimated_duration_minutes: Some(DEFAULT_STEP_MINUTES),
            status: StepStatus::Pending,
            started_at: None,
            completed_at: None,
            completed_by: None,
            skipped_at: None,
            skipped_by: None,
            skip_reason: None,
            actual_duration_minutes: None,
            content: StepContent::default(),
            response: StepResponse::default(),
            requires_verification: false,
            is_verified: false,
            verified_at: None,
            verified_by: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_estimated_minutes(mut self, minutes: u32) -> Self {
        self.estimated_duration_minutes = Some(minutes);
        self
    }

    pub fn with_verification(mut self) -> Self {
        self.requires_verification = true;
        self
    }

    // -- accessors --

    pub fn id(&self) -> EntityId {
        self.id
    }

    pub fn order(&self) -> i32 {
        self.order
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn step_type(&self) -> StepType {
        self.step_type
    }

    pub fn is_required(&self) -> bool {
        self.is_required
    }

    pub fn estimated_duration_minutes(&self) -> Option<u32> {
        self.estimated_duration_minutes
    }

    pub fn status(&self) -> StepStatus {
        self.status
    }

    pub fn started_at(&self) -> Option<Timestamp> {
        self.started_at
    }

    pub fn completed_at(&self) -> Option<Timestamp> {
        self.completed_at
    }

    pub fn completed_by(&self) -> Option<&str> {
        self.completed_by.as_deref()
    }

    pub fn skipped_at(&self) -> Option<Timestamp> {
        self.skipped_at
    }

    pub fn skipped_by(&self) -> Option<&str> {
        self.skipped_by.as_deref()
    }

    pub fn skip_reason(&self) -> Option<&str> {
        self.skip_reason.as_deref()
    }

    /// Whole minutes between start and completion; `Some(0)` for a step
    /// completed without being started, `None` until completed.
    pub fn actual_duration_minutes(&self) -> Option<i64> {
        self.actual_duration_minutes
    }

    pub fn content(&self) -> &StepContent {
        &self.content
    }

    pub fn response(&self) -> &StepResponse {
        &self.response
    }

    pub fn requires_verification(&self) -> bool {
        self.requires_verification
    }

    pub fn is_verified(&self) -> bool {
        self.is_verified
    }

    pub fn verified_at(&self) -> Option<Timestamp> {
        self.verified_at
    }

    pub fn verified_by(&self) -> Option<&str> {
        self.verified_by.as_deref()
    }

    /// Completed or skipped.
    pub fn is_finished(&self) -> bool {
        self.status.is_terminal()
    }

    // -- transitions --

    fn ensure_open(&self) -> Result<(), CoreError> {
        if self.status.is_terminal() {
            return Err(CoreError::transition(format!(
                "Step '{}' is already {}",
                self.title,
                self.status.as_str()
            )));
        }
        Ok(())
    }

    /// Pending -> InProgress. Starting an in-progress step is a no-op.
    pub(crate) fn start(&mut self, now: Timestamp) -> Result<(), CoreError> {
        self.ensure_open()?;
        if self.status == StepStatus::Pending {
            self.status = StepStatus::InProgress;
            self.started_at = Some(now);
        }
        Ok(())
    }

    pub(crate) fn complete(
        &mut self,
        completed_by: Option<&str>,
        now: Timestamp,
    ) -> Result<(), CoreError> {
        self.ensure_open()?;

        self.status = StepStatus::Completed;
        self.completed_at = Some(now);
        self.completed_by = completed_by.map(str::to_string);
        self.actual_duration_minutes = Some(
            self.started_at
                .map(|started| (now - started).num_minutes().max(0))
                .unwrap_or(0),
        );
        Ok(())
    }

    /// Skip an optional step. Required steps are always refused here; the
    /// aggregate decides when its `allow_skip` override applies and then
    /// calls [`skip_unchecked`](Self::skip_unchecked).
    pub(crate) fn skip(
        &mut self,
        reason: &str,
        skipped_by: Option<&str>,
        now: Timestamp,
    ) -> Result<(), CoreError> {
        if self.is_required {
            return Err(CoreError::transition("Cannot skip a required step"));
        }
        self.skip_unchecked(reason, skipped_by, now)
    }

    /// Skip without the required-step guard.
    pub(crate) fn skip_unchecked(
        &mut self,
        reason: &str,
        skipped_by: Option<&str>,
        now: Timestamp,
    ) -> Result<(), CoreError> {
        require_text(reason, "Skip reason is required")?;
        self.ensure_open()?;

        self.status = StepStatus::Skipped;
        self.skipped_at = Some(now);
        self.skip_reason = Some(reason.trim().to_string());
        self.skipped_by = skipped_by.map(str::to_string);
        Ok(())
    }

    pub(crate) fn set_content(&mut self, content: StepContent) -> Result<(), CoreError> {
        content.validate()?;
        self.content = content;
        Ok(())
    }

    pub(crate) fn record_response(&mut self, response: StepResponse) -> Result<(), CoreError> {
        response.validate()?;
        self.response = response;
        Ok(())
    }

    pub(crate) fn set_requires_verification(&mut self, required: bool) {
        self.requires_verification = required;
    }

    pub(crate) fn verify(&mut self, verified_by: &str, now: Timestamp) -> Result<(), CoreError> {
        if !self.requires_verification {
            return Err(CoreError::transition("Step does not require verification"));
        }
        require_text(verified_by, "Verifier is required")?;

        self.is_verified = true;
        self.verified_at = Some(now);
        self.verified_by = Some(verified_by.to_string());
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
