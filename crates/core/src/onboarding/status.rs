//! Status, kind, and priority enumerations for onboarding entities.
//!
//! Every enum serializes as `snake_case`, which is also the database
//! representation returned by `as_str`.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

// ---------------------------------------------------------------------------
// Onboarding type
// ---------------------------------------------------------------------------

/// What kind of introduction an onboarding represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OnboardingType {
    NewEmployee,
    NewCustomer,
    NewVendor,
    NewPartner,
    NewAdmin,
    RoleChange,
    DepartmentChange,
    SystemMigration,
    ProductTraining,
    ComplianceTraining,
    Custom,
}

impl OnboardingType {
    pub const ALL: [OnboardingType; 11] = [
        Self::NewEmployee,
        Self::NewCustomer,
        Self::NewVendor,
        Self::NewPartner,
        Self::NewAdmin,
        Self::RoleChange,
        Self::DepartmentChange,
        Self::SystemMigration,
        Self::ProductTraining,
        Self::ComplianceTraining,
        Self::Custom,
    ];

    /// Parse a type string from the database.
    pub fn from_str_db(s: &str) -> Result<Self, CoreError> {
        Self::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| CoreError::Validation(format!("Invalid onboarding type '{s}'")))
    }

    /// Convert to a database-compatible string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NewEmployee => "new_employee",
            Self::NewCustomer => "new_customer",
            Self::NewVendor => "new_vendor",
            Self::NewPartner => "new_partner",
            Self::NewAdmin => "new_admin",
            Self::RoleChange => "role_change",
            Self::DepartmentChange => "department_change",
            Self::SystemMigration => "system_migration",
            Self::ProductTraining => "product_training",
            Self::ComplianceTraining => "compliance_training",
            Self::Custom => "custom",
        }
    }
}

// ---------------------------------------------------------------------------
// Onboarding status
// ---------------------------------------------------------------------------

/// Lifecycle of the onboarding aggregate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OnboardingStatus {
    NotStarted,
    InProgress,
    Paused,
    Completed,
    Cancelled,
}

impl OnboardingStatus {
    /// Parse a status string from the database.
    pub fn from_str_db(s: &str) -> Result<Self, CoreError> {
        match s {
            "not_started" => Ok(Self::NotStarted),
            "in_progress" => Ok(Self::InProgress),
            "paused" => Ok(Self::Paused),
            "completed" => Ok(Self::Completed),
            "cancelled" => Ok(Self::Cancelled),
            _ => Err(CoreError::Validation(format!(
                "Invalid onboarding status '{s}'. Must be one of: \
                 not_started, in_progress, paused, completed, cancelled"
            ))),
        }
    }

    /// Convert to a database-compatible string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NotStarted => "not_started",
            Self::InProgress => "in_progress",
            Self::Paused => "paused",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
        }
    }

    /// Completed and Cancelled accept no further lifecycle transitions.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled)
    }
}

// ---------------------------------------------------------------------------
// Steps
// ---------------------------------------------------------------------------

/// Presentation kind of a step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepType {
    Information,
    Video,
    Document,
    Form,
    Quiz,
    Task,
    Action,
    Review,
    Interactive,
    External,
}

/// Per-step state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    Pending,
    InProgress,
    Completed,
    Skipped,
}

impl StepStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
            Self::Skipped => "skipped",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Skipped)
    }
}

// ---------------------------------------------------------------------------
// Tasks
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Todo,
    Assigned,
    InProgress,
    Completed,
    Cancelled,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Todo => "todo",
            Self::Assigned => "assigned",
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
        }
    }

    /// Completed or cancelled tasks no longer count toward open work.
    pub fn is_closed(&self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskPriority {
    Low,
    Medium,
    High,
    Urgent,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
