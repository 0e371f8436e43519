use crate::types::EntityId;

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: EntityId },

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Invalid transition: {0}")]
    InvalidTransition(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl CoreError {
    /// Shorthand for an invalid state transition.
    pub fn transition(msg: impl Into<String>) -> Self {
        Self::InvalidTransition(msg.into())
    }

    /// Shorthand for a rejected argument.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }
}

/// Flatten derive-based validation failures into a single message.
///
/// Field messages are sorted so the resulting text is stable across runs.
impl From<validator::ValidationErrors> for CoreError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let mut messages: Vec<String> = errors
            .field_errors()
            .into_iter()
            .flat_map(|(field, errs)| {
                errs.iter()
                    .map(|e| match &e.message {
                        Some(msg) => msg.to_string(),
                        None => format!("{field} is invalid ({})", e.code),
                    })
                    .collect::<Vec<_>>()
            })
            .collect();
        messages.sort();
        CoreError::Validation(messages.join("; "))
    }
}

/// Reject empty or whitespace-only required text.
pub fn require_text(value: &str, message: &str) -> Result<(), CoreError> {
    if value.trim().is_empty() {
        return Err(CoreError::validation(message));
    }
    Ok(())
}
