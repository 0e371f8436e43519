//! Application service: load, apply one aggregate operation, save with the
//! read version, then publish the resulting domain events.
//!
//! Lifecycle events are derived from the status change an operation caused,
//! so an auto-completion triggered by `complete_step` publishes
//! `onboarding.completed` the same way an explicit `complete` does.

use std::sync::Arc;

use serde_json::json;
use tenantry_core::clock::Clock;
use tenantry_core::error::CoreError;
use tenantry_core::onboarding::{
    CompletionDetails, NewOnboarding, Onboarding, OnboardingConfiguration, OnboardingRepository,
    OnboardingStatus, OnboardingStep, OnboardingTask, StepContent, StepResponse, TargetDetails,
    UsageDetails,
};
use tenantry_core::types::EntityId;
use tenantry_events::topics;
use tenantry_events::{EventBus, PlatformEvent};

/// Name of an operation plus the event it publishes on success, if any.
#[derive(Debug, Clone, Copy)]
struct Op {
    name: &'static str,
    topic: Option<&'static str>,
    step_id: Option<EntityId>,
}

impl Op {
    fn plain(name: &'static str) -> Self {
        Self {
            name,
            topic: None,
            step_id: None,
        }
    }

    fn on_step(name: &'static str, step_id: EntityId) -> Self {
        Self {
            name,
            topic: None,
            step_id: Some(step_id),
        }
    }

    fn publishing(mut self, topic: &'static str) -> Self {
        self.topic = Some(topic);
        self
    }
}

pub struct OnboardingService {
    repo: Arc<dyn OnboardingRepository>,
    bus: Arc<EventBus>,
    clock: Arc<dyn Clock>,
}

impl OnboardingService {
    pub fn new(
        repo: Arc<dyn OnboardingRepository>,
        bus: Arc<EventBus>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self { repo, bus, clock }
    }

    pub async fn create(&self, input: NewOnboarding) -> Result<Onboarding, CoreError> {
        let actor = input.created_by.clone();
        let onboarding = Onboarding::create(input, self.clock.as_ref()).inspect_err(|e| {
            tracing::warn!(error = %e, "Rejected onboarding creation");
        })?;
        self.repo.insert(onboarding.clone()).await?;

        tracing::info!(
            onboarding_id = %onboarding.id(),
            onboarding_type = onboarding.onboarding_type().as_str(),
            total_steps = onboarding.total_steps(),
            "Onboarding created"
        );
        self.publish(topics::ONBOARDING_CREATED, &onboarding, Some(&actor), None);
        Ok(onboarding)
    }

    pub async fn get(&self, id: EntityId) -> Result<Onboarding, CoreError> {
        self.repo
            .find(id)
            .await?
            .map(|v| v.value)
            .ok_or(CoreError::NotFound {
                entity: "Onboarding",
                id,
            })
    }

    // -- lifecycle --

    pub async fn start(&self, id: EntityId, actor: Option<&str>) -> Result<Onboarding, CoreError> {
        self.apply(id, Op::plain("start"), actor, |o, c| o.start(actor, c))
            .await
    }

    pub async fn pause(&self, id: EntityId, actor: Option<&str>) -> Result<Onboarding, CoreError> {
        self.apply(id, Op::plain("pause"), actor, |o, c| o.pause(actor, c))
            .await
    }

    pub async fn resume(&self, id: EntityId, actor: Option<&str>) -> Result<Onboarding, CoreError> {
        self.apply(id, Op::plain("resume"), actor, |o, c| o.resume(actor, c))
            .await
    }

    pub async fn complete(
        &self,
        id: EntityId,
        actor: Option<&str>,
    ) -> Result<Onboarding, CoreError> {
        self.apply(id, Op::plain("complete"), actor, |o, c| o.complete(actor, c))
            .await
    }

    pub async fn cancel(
        &self,
        id: EntityId,
        reason: &str,
        actor: Option<&str>,
    ) -> Result<Onboarding, CoreError> {
        self.apply(id, Op::plain("cancel"), actor, |o, c| {
            o.cancel(reason, actor, c)
        })
        .await
    }

    // -- steps --

    pub async fn add_step(
        &self,
        id: EntityId,
        step: OnboardingStep,
        actor: Option<&str>,
    ) -> Result<Onboarding, CoreError> {
        let op = Op::on_step("add_step", step.id());
        self.apply(id, op, actor, |o, _| o.add_step(step)).await
    }

    pub async fn start_step(
        &self,
        id: EntityId,
        step_id: EntityId,
        actor: Option<&str>,
    ) -> Result<Onboarding, CoreError> {
        self.apply(id, Op::on_step("start_step", step_id), actor, |o, c| {
            o.start_step(step_id, actor, c)
        })
        .await
    }

    pub async fn complete_step(
        &self,
        id: EntityId,
        step_id: EntityId,
        actor: Option<&str>,
    ) -> Result<Onboarding, CoreError> {
        let op = Op::on_step("complete_step", step_id).publishing(topics::ONBOARDING_STEP_COMPLETED);
        self.apply(id, op, actor, |o, c| o.complete_step(step_id, actor, c))
            .await
    }

    pub async fn skip_step(
        &self,
        id: EntityId,
        step_id: EntityId,
        reason: &str,
        actor: Option<&str>,
    ) -> Result<Onboarding, CoreError> {
        let op = Op::on_step("skip_step", step_id).publishing(topics::ONBOARDING_STEP_SKIPPED);
        self.apply(id, op, actor, |o, c| o.skip_step(step_id, reason, actor, c))
            .await
    }

    pub async fn set_step_content(
        &self,
        id: EntityId,
        step_id: EntityId,
        content: StepContent,
        actor: Option<&str>,
    ) -> Result<Onboarding, CoreError> {
        self.apply(id, Op::on_step("set_step_content", step_id), actor, |o, c| {
            o.set_step_content(step_id, content, actor, c)
        })
        .await
    }

    pub async fn record_step_response(
        &self,
        id: EntityId,
        step_id: EntityId,
        response: StepResponse,
    ) -> Result<Onboarding, CoreError> {
        self.apply(id, Op::on_step("record_step_response", step_id), None, |o, c| {
            o.record_step_response(step_id, response, c)
        })
        .await
    }

    pub async fn require_step_verification(
        &self,
        id: EntityId,
        step_id: EntityId,
        required: bool,
        actor: Option<&str>,
    ) -> Result<Onboarding, CoreError> {
        let op = Op::on_step("require_step_verification", step_id);
        self.apply(id, op, actor, |o, c| {
            o.require_step_verification(step_id, required, actor, c)
        })
        .await
    }

    pub async fn verify_step(
        &self,
        id: EntityId,
        step_id: EntityId,
        verified_by: &str,
    ) -> Result<Onboarding, CoreError> {
        let op = Op::on_step("verify_step", step_id);
        self.apply(id, op, Some(verified_by), |o, c| {
            o.verify_step(step_id, verified_by, c)
        })
        .await
    }

    // -- tasks --

    pub async fn add_task(
        &self,
        id: EntityId,
        task: OnboardingTask,
        actor: Option<&str>,
    ) -> Result<Onboarding, CoreError> {
        self.apply(id, Op::plain("add_task"), actor, |o, _| o.add_task(task))
            .await
    }

    pub async fn assign_task(
        &self,
        id: EntityId,
        task_id: EntityId,
        assigned_to: &str,
        assigned_by: &str,
    ) -> Result<Onboarding, CoreError> {
        self.apply(id, Op::plain("assign_task"), Some(assigned_by), |o, c| {
            o.assign_task(task_id, assigned_to, assigned_by, c)
        })
        .await
    }

    pub async fn start_task(
        &self,
        id: EntityId,
        task_id: EntityId,
        actor: Option<&str>,
    ) -> Result<Onboarding, CoreError> {
        self.apply(id, Op::plain("start_task"), actor, |o, c| {
            o.start_task(task_id, actor, c)
        })
        .await
    }

    pub async fn complete_task(
        &self,
        id: EntityId,
        task_id: EntityId,
        notes: Option<String>,
        actor: Option<&str>,
    ) -> Result<Onboarding, CoreError> {
        self.apply(id, Op::plain("complete_task"), actor, |o, c| {
            o.complete_task(task_id, notes, actor, c)
        })
        .await
    }

    pub async fn cancel_task(
        &self,
        id: EntityId,
        task_id: EntityId,
        actor: Option<&str>,
    ) -> Result<Onboarding, CoreError> {
        self.apply(id, Op::plain("cancel_task"), actor, |o, c| {
            o.cancel_task(task_id, actor, c)
        })
        .await
    }

    // -- analytics --

    pub async fn record_login(&self, id: EntityId) -> Result<Onboarding, CoreError> {
        self.apply(id, Op::plain("record_login"), None, |o, c| {
            o.record_login(c);
            Ok(())
        })
        .await
    }

    pub async fn record_help_request(&self, id: EntityId) -> Result<Onboarding, CoreError> {
        self.apply(id, Op::plain("record_help_request"), None, |o, c| {
            o.record_help_request(c);
            Ok(())
        })
        .await
    }

    pub async fn record_usage(
        &self,
        id: EntityId,
        usage: UsageDetails,
    ) -> Result<Onboarding, CoreError> {
        self.apply(id, Op::plain("record_usage"), None, |o, c| {
            o.record_usage(usage, c)
        })
        .await
    }

    // -- settings --

    pub async fn configure(
        &self,
        id: EntityId,
        config: OnboardingConfiguration,
        actor: &str,
    ) -> Result<Onboarding, CoreError> {
        self.apply(id, Op::plain("configure"), Some(actor), |o, c| {
            o.set_configuration(config, actor, c)
        })
        .await
    }

    pub async fn set_target_details(
        &self,
        id: EntityId,
        details: TargetDetails,
        actor: &str,
    ) -> Result<Onboarding, CoreError> {
        self.apply(id, Op::plain("set_target_details"), Some(actor), |o, c| {
            o.set_target_details(details, actor, c)
        })
        .await
    }

    pub async fn set_completion_details(
        &self,
        id: EntityId,
        details: CompletionDetails,
        actor: &str,
    ) -> Result<Onboarding, CoreError> {
        self.apply(id, Op::plain("set_completion_details"), Some(actor), |o, c| {
            o.set_completion_details(details, actor, c)
        })
        .await
    }

    // -- internals --

    async fn apply<F>(
        &self,
        id: EntityId,
        op: Op,
        actor: Option<&str>,
        mutate: F,
    ) -> Result<Onboarding, CoreError>
    where
        F: FnOnce(&mut Onboarding, &dyn Clock) -> Result<(), CoreError> + Send,
    {
        let stored = self.repo.find(id).await?.ok_or(CoreError::NotFound {
            entity: "Onboarding",
            id,
        })?;
        let mut onboarding = stored.value;
        let before = onboarding.status();

        if let Err(e) = mutate(&mut onboarding, self.clock.as_ref()) {
            tracing::warn!(
                onboarding_id = %id,
                step_id = ?op.step_id,
                status = before.as_str(),
                operation = op.name,
                error = %e,
                "Rejected onboarding operation"
            );
            return Err(e);
        }

        let version = self
            .repo
            .update(onboarding.clone(), stored.version)
            .await
            .inspect_err(|e| {
                tracing::warn!(onboarding_id = %id, operation = op.name, error = %e, "Failed to save onboarding");
            })?;

        let after = onboarding.status();
        tracing::info!(
            onboarding_id = %id,
            step_id = ?op.step_id,
            status = after.as_str(),
            progress = onboarding.progress_percentage(),
            version,
            operation = op.name,
            "Onboarding updated"
        );

        if let Some(topic) = op.topic {
            self.publish(topic, &onboarding, actor, op.step_id);
        }
        if let Some(topic) = transition_topic(before, after) {
            self.publish(topic, &onboarding, actor, None);
        }
        Ok(onboarding)
    }

    fn publish(
        &self,
        topic: &'static str,
        onboarding: &Onboarding,
        actor: Option<&str>,
        step_id: Option<EntityId>,
    ) {
        let mut payload = json!({
            "status": onboarding.status().as_str(),
            "progress_percentage": onboarding.progress_percentage(),
            "target_user_id": onboarding.target_user_id(),
        });
        if let Some(step_id) = step_id {
            payload["step_id"] = json!(step_id);
        }

        let mut event = PlatformEvent::new(topic)
            .with_source(topics::ONBOARDING_ENTITY, onboarding.id())
            .with_payload(payload)
            .at(self.clock.now());
        if let Some(actor) = actor.filter(|a| !a.trim().is_empty()) {
            event = event.with_actor(actor);
        }
        self.bus.publish(event);
    }
}

/// The lifecycle event implied by a status change, if any.
fn transition_topic(before: OnboardingStatus, after: OnboardingStatus) -> Option<&'static str> {
    use OnboardingStatus::*;
    match (before, after) {
        (b, a) if b == a => None,
        (NotStarted, InProgress) => Some(topics::ONBOARDING_STARTED),
        (Paused, InProgress) => Some(topics::ONBOARDING_RESUMED),
        (_, Paused) => Some(topics::ONBOARDING_PAUSED),
        (_, Completed) => Some(topics::ONBOARDING_COMPLETED),
        (_, Cancelled) => Some(topics::ONBOARDING_CANCELLED),
        _ => None,
    }
}
