//! In-memory [`OnboardingRepository`] with optimistic versioning.

use std::collections::HashMap;

use async_trait::async_trait;
use tenantry_core::error::CoreError;
use tenantry_core::onboarding::{Onboarding, OnboardingRepository, Version, Versioned};
use tenantry_core::types::EntityId;
use tokio::sync::RwLock;

#[derive(Default)]
pub struct InMemoryOnboardingRepo {
    items: RwLock<HashMap<EntityId, Versioned<Onboarding>>>,
}

impl InMemoryOnboardingRepo {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.items.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.items.read().await.is_empty()
    }
}

#[async_trait]
impl OnboardingRepository for InMemoryOnboardingRepo {
    async fn insert(&self, onboarding: Onboarding) -> Result<Version, CoreError> {
        let mut items = self.items.write().await;
        let id = onboarding.id();
        if items.contains_key(&id) {
            return Err(CoreError::Conflict(format!("Onboarding {id} already exists")));
        }
        items.insert(
            id,
            Versioned {
                value: onboarding,
                version: 1,
            },
        );
        Ok(1)
    }

    async fn find(&self, id: EntityId) -> Result<Option<Versioned<Onboarding>>, CoreError> {
        Ok(self.items.read().await.get(&id).cloned())
    }

    async fn update(
        &self,
        onboarding: Onboarding,
        expected_version: Version,
    ) -> Result<Version, CoreError> {
        let mut items = self.items.write().await;
        let id = onboarding.id();
        let stored = items.get_mut(&id).ok_or(CoreError::NotFound {
            entity: "Onboarding",
            id,
        })?;

        if stored.version != expected_version {
            return Err(CoreError::Conflict(format!(
                "Onboarding {id} was modified concurrently (expected version {expected_version}, found {})",
                stored.version
            )));
        }

        stored.value = onboarding;
        stored.version += 1;
        Ok(stored.version)
    }

    async fn list_active(&self) -> Result<Vec<Versioned<Onboarding>>, CoreError> {
        let items = self.items.read().await;
        Ok(items
            .values()
            .filter(|v| !v.value.status().is_terminal())
            .cloned()
            .collect())
    }
}
