//! Loosely tracked to-do items attached to an onboarding.
//!
//! Tasks never gate onboarding completion. Their transitions are permissive
//! (an assignment can be made from any state) and exist for bookkeeping.

use serde::{Deserialize, Serialize};

use crate::error::{require_text, CoreError};
use crate::onboarding::status::{TaskPriority, TaskStatus};
use crate::types::{EntityId, Timestamp};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OnboardingTask {
    id: EntityId,
    title: String,
    description: Option<String>,
    status: TaskStatus,
    priority: TaskPriority,

    assigned_to: Option<String>,
    assigned_by: Option<String>,
    assigned_at: Option<Timestamp>,

    due_date: Option<Timestamp>,
    started_at: Option<Timestamp>,
    completed_at: Option<Timestamp>,
    cancelled_at: Option<Timestamp>,

    notes: Option<String>,
    completion_notes: Option<String>,
}

impl OnboardingTask {
    pub fn new(
        title: impl Into<String>,
        description: Option<String>,
        priority: TaskPriority,
        due_date: Option<Timestamp>,
    ) -> Result<Self, CoreError> {
        let title = title.into();
        require_text(&title, "Task title is required")?;

        Ok(Self {
            id: EntityId::new_v4(),
            title,
            description,
            status: TaskStatus::Todo,
            priority,
            assigned_to: None,
            assigned_by: None,
            assigned_at: None,
            due_date,
            started_at: None,
            completed_at: None,
            cancelled_at: None,
            notes: None,
            completion_notes: None,
        })
    }

    pub fn id(&self) -> EntityId {
        self.id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn status(&self) -> TaskStatus {
        self.status
    }

    pub fn priority(&self) -> TaskPriority {
        self.priority
    }

    pub fn assigned_to(&self) -> Option<&str> {
        self.assigned_to.as_deref()
    }

    pub fn assigned_by(&self) -> Option<&str> {
        self.assigned_by.as_deref()
    }

    pub fn assigned_at(&self) -> Option<Timestamp> {
        self.assigned_at
    }

    pub fn due_date(&self) -> Option<Timestamp> {
        self.due_date
    }

    pub fn started_at(&self) -> Option<Timestamp> {
        self.started_at
    }

    pub fn completed_at(&self) -> Option<Timestamp> {
        self.completed_at
    }

    pub fn cancelled_at(&self) -> Option<Timestamp> {
        self.cancelled_at
    }

    pub fn notes(&self) -> Option<&str> {
        self.notes.as_deref()
    }

    pub fn completion_notes(&self) -> Option<&str> {
        self.completion_notes.as_deref()
    }

    /// Past its due date and still open.
    pub fn is_overdue(&self, now: Timestamp) -> bool {
        match self.due_date {
            Some(due) => due < now && !self.status.is_closed(),
            None => false,
        }
    }

    // -- transitions --

    pub(crate) fn assign(
        &mut self,
        assigned_to: &str,
        assigned_by: &str,
        now: Timestamp,
    ) -> Result<(), CoreError> {
        require_text(assigned_to, "Assignee is required")?;
        require_text(assigned_by, "Assigner is required")?;
        self.ensure_not_cancelled("assign")?;

        self.assigned_to = Some(assigned_to.to_string());
        self.assigned_by = Some(assigned_by.to_string());
        self.assigned_at = Some(now);
        self.status = TaskStatus::Assigned;
        Ok(())
    }

    pub(crate) fn start(&mut self, now: Timestamp) -> Result<(), CoreError> {
        self.ensure_not_cancelled("start")?;
        self.status = TaskStatus::InProgress;
        self.started_at = Some(now);
        Ok(())
    }

    pub(crate) fn complete(
        &mut self,
        completion_notes: Option<String>,
        now: Timestamp,
    ) -> Result<(), CoreError> {
        self.ensure_not_cancelled("complete")?;
        self.status = TaskStatus::Completed;
        self.completed_at = Some(now);
        self.completion_notes = completion_notes;
        Ok(())
    }

    pub(crate) fn cancel(&mut self, now: Timestamp) -> Result<(), CoreError> {
        if self.status == TaskStatus::Completed {
            return Err(CoreError::transition("Cannot cancel a completed task"));
        }
        self.status = TaskStatus::Cancelled;
        self.cancelled_at = Some(now);
        Ok(())
    }

    pub(crate) fn set_notes(&mut self, notes: Option<String>) {
        self.notes = notes;
    }

    /// Cancelled is final; nothing reopens it.
    fn ensure_not_cancelled(&self, action: &str) -> Result<(), CoreError> {
        if self.status == TaskStatus::Cancelled {
            return Err(CoreError::transition(format!(
                "Cannot {action} a cancelled task"
            )));
        }
        Ok(())
    }
}
