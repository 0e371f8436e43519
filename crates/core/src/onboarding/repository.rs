//! Persistence port for onboarding aggregates.

use async_trait::async_trait;

use crate::error::CoreError;
use crate::onboarding::aggregate::Onboarding;
use crate::types::EntityId;

/// Optimistic concurrency token. A freshly inserted aggregate is version 1.
pub type Version = u64;

/// A stored aggregate together with the version it was read at.
#[derive(Debug, Clone, PartialEq)]
pub struct Versioned<T> {
    pub value: T,
    pub version: Version,
}

/// Storage for onboarding aggregates.
///
/// `update` must reject a write whose `expected_version` is not the stored
/// version with [`CoreError::Conflict`], leaving the stored copy untouched.
#[async_trait]
pub trait OnboardingRepository: Send + Sync {
    /// Store a new aggregate. Fails with `Conflict` if the id already exists.
    async fn insert(&self, onboarding: Onboarding) -> Result<Version, CoreError>;

    async fn find(&self, id: EntityId) -> Result<Option<Versioned<Onboarding>>, CoreError>;

    /// Replace the stored aggregate and return the new version.
    async fn update(
        &self,
        onboarding: Onboarding,
        expected_version: Version,
    ) -> Result<Version, CoreError>;

    /// Aggregates that are neither completed nor cancelled.
    async fn list_active(&self) -> Result<Vec<Versioned<Onboarding>>, CoreError>;
}
