//! PLAN entity type - Inspection plans binding a sampling plan and
//! specification limits to a product characteristic

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core::entity::Entity;
use crate::core::identity::EntityId;
use crate::sampling::SamplingPlan;
use crate::spc::SpecLimits;

/// An inspection plan: what to sample and what the characteristic's
/// specification is. Looked up by identifier when an inspection starts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InspectionPlan {
    /// Unique identifier (PLAN-xxx)
    pub id: EntityId,

    /// Descriptive title
    pub title: String,

    /// Product the plan applies to
    pub product: String,

    /// Characteristic being inspected
    pub characteristic: String,

    /// Acceptance sampling configuration
    pub sampling_plan: SamplingPlan,

    /// Specification limits for the characteristic
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spec_limits: Option<SpecLimits>,

    /// Creation timestamp
    pub created: DateTime<Utc>,

    /// Author
    pub author: String,

    /// Document revision
    #[serde(default = "default_revision")]
    pub entity_revision: u64,
}

fn default_revision() -> u64 {
    1
}

impl Entity for InspectionPlan {
    const PREFIX: &'static str = "PLAN";

    fn id(&self) -> &EntityId {
        &self.id
    }

    fn title(&self) -> &str {
        &self.title
    }

    fn created(&self) -> DateTime<Utc> {
        self.created
    }

    fn author(&self) -> &str {
        &self.author
    }

    fn version(&self) -> u64 {
        self.entity_revision
    }

    fn bump_version(&mut self) {
        self.entity_revision += 1;
    }
}

impl InspectionPlan {
    /// Create a new inspection plan
    pub fn new(
        title: String,
        product: String,
        characteristic: String,
        sampling_plan: SamplingPlan,
        author: String,
    ) -> Self {
        Self {
            id: EntityId::new(crate::core::EntityPrefix::Plan),
            title,
            product,
            characteristic,
            sampling_plan,
            spec_limits: None,
            created: Utc::now(),
            author,
            entity_revision: 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sampling::InspectionLevel;

    #[test]
    fn test_plan_creation() {
        let plan = InspectionPlan::new(
            "Incoming bore inspection".to_string(),
            "widget-7".to_string(),
            "bore-diameter".to_string(),
            SamplingPlan::aql(InspectionLevel::II, 1.0),
            "test".to_string(),
        );
        assert!(plan.id.to_string().starts_with("PLAN-"));
        assert_eq!(plan.sampling_plan.aql, 1.0);
    }

    #[test]
    fn test_plan_yaml_roundtrip() {
        let mut plan = InspectionPlan::new(
            "Incoming bore inspection".to_string(),
            "widget-7".to_string(),
            "bore-diameter".to_string(),
            SamplingPlan::aql(InspectionLevel::II, 1.0),
            "test".to_string(),
        );
        plan.spec_limits = Some(SpecLimits::two_sided(21.1, 20.9).unwrap());

        let yaml = serde_yml::to_string(&plan).unwrap();
        let parsed: InspectionPlan = serde_yml::from_str(&yaml).unwrap();
        assert_eq!(parsed.id, plan.id);
        assert_eq!(parsed.sampling_plan, plan.sampling_plan);
        assert_eq!(parsed.spec_limits, plan.spec_limits);
    }
}
