//! Default step lists per onboarding type.
//!
//! Types without a template start empty; their steps are added explicitly
//! with [`Onboarding::add_step`](super::Onboarding::add_step).

use crate::onboarding::status::{OnboardingType, StepType};
use crate::onboarding::step::OnboardingStep;

/// Static description of a step created at onboarding creation time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StepTemplate {
    pub order: i32,
    pub title: &'static str,
    pub description: &'static str,
    pub step_type: StepType,
    pub is_required: bool,
    pub estimated_minutes: u32,
}

const fn tpl(
    order: i32,
    title: &'static str,
    description: &'static str,
    step_type: StepType,
    is_required: bool,
    estimated_minutes: u32,
) -> StepTemplate {
    StepTemplate {
        order,
        title,
        description,
        step_type,
        is_required,
        estimated_minutes,
    }
}

const NEW_EMPLOYEE: &[StepTemplate] = &[
    tpl(1, "Welcome", "Introduction to the company", StepType::Information, true, 10),
    tpl(2, "Profile Setup", "Complete your profile information", StepType::Form, true, 5),
    tpl(3, "Company Policies", "Review company policies", StepType::Document, true, 5),
    tpl(4, "Training Videos", "Watch training materials", StepType::Video, false, 5),
    tpl(5, "System Tour", "Guided tour of the system", StepType::Interactive, false, 5),
];

const NEW_CUSTOMER: &[StepTemplate] = &[
    tpl(1, "Account Setup", "Set up your account", StepType::Form, true, 5),
    tpl(2, "Product Tour", "Learn about our products", StepType::Interactive, false, 5),
    tpl(3, "First Order", "Place your first order", StepType::Action, false, 5),
];

const NEW_ADMIN: &[StepTemplate] = &[
    tpl(1, "Admin Training", "Admin system training", StepType::Video, true, 5),
    tpl(2, "Security Setup", "Configure security settings", StepType::Form, true, 5),
    tpl(3, "Team Setup", "Set up your team", StepType::Action, false, 5),
];

const SYSTEM_MIGRATION: &[StepTemplate] = &[
    tpl(1, "Data Review", "Review migrated data", StepType::Review, true, 5),
    tpl(2, "Settings Configuration", "Configure system settings", StepType::Form, true, 5),
    tpl(3, "Test Transactions", "Perform test transactions", StepType::Action, false, 5),
];

/// Template rows for a type, in display order.
pub fn templates_for(onboarding_type: OnboardingType) -> &'static [StepTemplate] {
    match onboarding_type {
        OnboardingType::NewEmployee => NEW_EMPLOYEE,
        OnboardingType::NewCustomer => NEW_CUSTOMER,
        OnboardingType::NewAdmin => NEW_ADMIN,
        OnboardingType::SystemMigration => SYSTEM_MIGRATION,
        _ => &[],
    }
}

/// Fresh pending steps for a type, each with a new id.
pub fn default_steps(onboarding_type: OnboardingType) -> Vec<OnboardingStep> {
    templates_for(onboarding_type)
        .iter()
        .map(|t| {
            OnboardingStep::pending(t.order, t.title.to_string(), t.step_type, t.is_required)
                .with_description(t.description)
                .with_estimated_minutes(t.estimated_minutes)
        })
        .collect()
}
