// src/variant.rs
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use thiserror::Error;

const VARIANT_TOKEN_MARKER: &str = "|variant:";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkoutPlan {
    pub id: String,
    pub name: String,
    pub active_variant_id: Option<String>,
}

#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("Workout data backend failed: {0}")]
    Backend(String),
    #[error("Workout data request was abandoned")]
    Abandoned,
}

/// Source of workout plans for the detail page.
pub trait WorkoutDataService {
    fn get_workout_plan_by_id(&self, id: &str) -> Result<Option<WorkoutPlan>, ServiceError>;
}

/// A plan assigned to an athlete, optionally pinned to one variant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanAssignment {
    pub plan_id: String,
    pub variant_id: Option<String>,
}

#[derive(Error, Debug, PartialEq, Eq)]
#[error("Invalid plan assignment token: {0:?}")]
pub struct InvalidAssignmentToken(pub String);

impl PlanAssignment {
    pub fn new(plan_id: impl Into<String>, variant_id: Option<String>) -> Self {
        Self { plan_id: plan_id.into(), variant_id: variant_id.filter(|v| !v.is_empty()) }
    }

    /// Reads the stored `"<planId>|variant:<variantId>"` form. A bare plan id
    /// is an assignment without a variant.
    pub fn from_token(token: &str) -> Result<Self, InvalidAssignmentToken> {
        let token = token.trim();
        let (plan_id, variant_id) = match token.split_once(VARIANT_TOKEN_MARKER) {
            Some((plan, variant)) => (plan, Some(variant.to_string())),
            None => (token, None),
        };
        if plan_id.is_empty() || plan_id.contains('|') {
            return Err(InvalidAssignmentToken(token.to_string()));
        }
        Ok(Self::new(plan_id, variant_id))
    }

    #[must_use]
    pub fn to_token(&self) -> String {
        match &self.variant_id {
            Some(variant) => format!("{}{VARIANT_TOKEN_MARKER}{variant}", self.plan_id),
            None => self.plan_id.clone(),
        }
    }
}

impl FromStr for PlanAssignment {
    type Err = InvalidAssignmentToken;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_token(s)
    }
}

/// The signed-in athlete as far as navigation cares.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserContext {
    pub user_id: Option<String>,
    pub workout_plans: Vec<PlanAssignment>,
}

impl UserContext {
    #[must_use]
    pub fn variant_for(&self, plan_id: &str) -> Option<&str> {
        self.workout_plans
            .iter()
            .filter(|a| a.plan_id == plan_id)
            .find_map(|a| a.variant_id.as_deref())
            .filter(|v| !v.is_empty())
    }
}

/// Picks the variant to show: URL parameter, then the athlete's assignment,
/// then the plan's own active variant.
#[must_use]
pub fn resolve_variant(
    url_variant: Option<&str>,
    user: Option<&UserContext>,
    plan_id: &str,
    plan: Option<&WorkoutPlan>,
) -> Option<String> {
    let non_empty = |v: Option<&str>| v.filter(|s| !s.is_empty()).map(str::to_string);
    non_empty(url_variant)
        .or_else(|| non_empty(user.and_then(|u| u.variant_for(plan_id))))
        .or_else(|| non_empty(plan.and_then(|p| p.active_variant_id.as_deref())))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plan_b() -> WorkoutPlan {
        WorkoutPlan { id: "p1".into(), name: "Strength".into(), active_variant_id: Some("B".into()) }
    }

    fn user_a() -> UserContext {
        UserContext {
            user_id: Some("u1".into()),
            workout_plans: vec![PlanAssignment::from_token("p1|variant:A").unwrap()],
        }
    }

    #[test]
    fn precedence_ladder() {
        let plan = plan_b();
        let user = user_a();
        assert_eq!(resolve_variant(Some("C"), Some(&user), "p1", Some(&plan)).as_deref(), Some("C"));
        assert_eq!(resolve_variant(None, Some(&user), "p1", Some(&plan)).as_deref(), Some("A"));
        assert_eq!(resolve_variant(None, None, "p1", Some(&plan)).as_deref(), Some("B"));
        assert_eq!(resolve_variant(None, None, "p1", None), None);
    }

    #[test]
    fn empty_values_count_as_absent() {
        let plan = WorkoutPlan { active_variant_id: Some(String::new()), ..plan_b() };
        assert_eq!(resolve_variant(Some(""), None, "p1", Some(&plan)), None);
    }

    #[test]
    fn assignments_for_other_plans_are_ignored() {
        let user = UserContext {
            user_id: None,
            workout_plans: vec![PlanAssignment::new("p2", Some("Z".into())), PlanAssignment::new("p1", None)],
        };
        assert_eq!(resolve_variant(None, Some(&user), "p1", Some(&plan_b())).as_deref(), Some("B"));
    }

    #[test]
    fn tokens_parse_into_two_fields() {
        let a: PlanAssignment = "plan-9|variant:light".parse().unwrap();
        assert_eq!(a, PlanAssignment::new("plan-9", Some("light".into())));
        assert_eq!(a.to_token(), "plan-9|variant:light");
        assert_eq!(PlanAssignment::from_token("plan-9").unwrap().variant_id, None);
        assert_eq!(PlanAssignment::from_token("plan-9|variant:").unwrap().variant_id, None);
        assert!(PlanAssignment::from_token("").is_err());
        assert!(PlanAssignment::from_token("a|b").is_err());
    }
}
