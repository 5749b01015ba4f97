//! NCR entity type - Non-Conformance Reports for quality issues

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core::entity::Entity;
use crate::core::identity::EntityId;

/// Where the non-conformance was found
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[derive(Default)]
pub enum NcrSource {
    #[default]
    Inspection,
    Production,
    Customer,
    Supplier,
}

impl std::fmt::Display for NcrSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NcrSource::Inspection => write!(f, "inspection"),
            NcrSource::Production => write!(f, "production"),
            NcrSource::Customer => write!(f, "customer"),
            NcrSource::Supplier => write!(f, "supplier"),
        }
    }
}

impl std::str::FromStr for NcrSource {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "inspection" => Ok(NcrSource::Inspection),
            "production" => Ok(NcrSource::Production),
            "customer" => Ok(NcrSource::Customer),
            "supplier" => Ok(NcrSource::Supplier),
            _ => Err(format!(
                "Invalid NCR source: {}. Use inspection, production, customer, or supplier",
                s
            )),
        }
    }
}

/// NCR severity level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[derive(Default)]
pub enum NcrSeverity {
    #[default]
    Minor,
    Major,
    Critical,
}

impl std::fmt::Display for NcrSeverity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NcrSeverity::Minor => write!(f, "minor"),
            NcrSeverity::Major => write!(f, "major"),
            NcrSeverity::Critical => write!(f, "critical"),
        }
    }
}

impl std::str::FromStr for NcrSeverity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "minor" => Ok(NcrSeverity::Minor),
            "major" => Ok(NcrSeverity::Major),
            "critical" => Ok(NcrSeverity::Critical),
            _ => Err(format!(
                "Invalid NCR severity: {}. Use minor, major, or critical",
                s
            )),
        }
    }
}

/// One affected item, referenced by identifier only
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AffectedItem {
    /// Item kind (e.g., "lot", "serial", "batch")
    pub item_type: String,

    /// Item identifier
    pub identifier: String,

    /// Quantity affected
    pub quantity: u32,

    /// Whether containment has quarantined this item
    #[serde(default)]
    pub quarantined: bool,
}

impl AffectedItem {
    pub fn new(
        item_type: impl Into<String>,
        identifier: impl Into<String>,
        quantity: u32,
    ) -> Self {
        Self {
            item_type: item_type.into(),
            identifier: identifier.into(),
            quantity,
            quarantined: false,
        }
    }
}

/// Defect description
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Defect {
    /// Defect kind (e.g., "dimensional", "cosmetic")
    pub defect_type: String,

    /// What was observed
    pub description: String,

    /// Severity classification
    #[serde(default)]
    pub severity: NcrSeverity,
}

impl Defect {
    pub fn new(
        defect_type: impl Into<String>,
        description: impl Into<String>,
        severity: NcrSeverity,
    ) -> Self {
        Self {
            defect_type: defect_type.into(),
            description: description.into(),
            severity,
        }
    }
}

/// Containment action taken to stop suspect material from moving
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Containment {
    /// Action description
    pub action: String,

    /// Who implemented it ("system" for automatic quarantine)
    pub implemented_by: String,

    /// When it was implemented
    pub implemented_at: DateTime<Utc>,
}

/// Disposition decision
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DispositionDecision {
    UseAsIs,
    Rework,
    Repair,
    Scrap,
    Return,
    Sort,
}

impl DispositionDecision {
    /// Decisions that put material back through inspection
    pub fn requires_reinspection(&self) -> bool {
        matches!(self, DispositionDecision::Rework | DispositionDecision::Repair)
    }
}

impl std::fmt::Display for DispositionDecision {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DispositionDecision::UseAsIs => write!(f, "use_as_is"),
            DispositionDecision::Rework => write!(f, "rework"),
            DispositionDecision::Repair => write!(f, "repair"),
            DispositionDecision::Scrap => write!(f, "scrap"),
            DispositionDecision::Return => write!(f, "return"),
            DispositionDecision::Sort => write!(f, "sort"),
        }
    }
}

impl std::str::FromStr for DispositionDecision {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "use_as_is" | "useasis" => Ok(DispositionDecision::UseAsIs),
            "rework" => Ok(DispositionDecision::Rework),
            "repair" => Ok(DispositionDecision::Repair),
            "scrap" => Ok(DispositionDecision::Scrap),
            "return" | "return_to_supplier" => Ok(DispositionDecision::Return),
            "sort" => Ok(DispositionDecision::Sort),
            _ => Err(format!(
                "Invalid disposition: {}. Use use_as_is, rework, repair, scrap, return, or sort",
                s
            )),
        }
    }
}

/// Disposition information
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Disposition {
    /// Decision
    pub decision: DispositionDecision,

    /// Why the decision was made
    pub justification: String,

    /// Who approved it
    pub approver: String,

    /// Required for rework and repair decisions
    #[serde(default)]
    pub reinspection_required: bool,

    /// Decision timestamp
    pub decided_at: DateTime<Utc>,
}

/// NCR lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[derive(Default)]
pub enum NcrStatus {
    #[default]
    Open,
    UnderReview,
    Dispositioned,
    Closed,
    Cancelled,
}

impl std::fmt::Display for NcrStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NcrStatus::Open => write!(f, "open"),
            NcrStatus::UnderReview => write!(f, "under_review"),
            NcrStatus::Dispositioned => write!(f, "dispositioned"),
            NcrStatus::Closed => write!(f, "closed"),
            NcrStatus::Cancelled => write!(f, "cancelled"),
        }
    }
}

impl std::str::FromStr for NcrStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "open" => Ok(NcrStatus::Open),
            "under_review" | "underreview" => Ok(NcrStatus::UnderReview),
            "dispositioned" => Ok(NcrStatus::Dispositioned),
            "closed" => Ok(NcrStatus::Closed),
            "cancelled" => Ok(NcrStatus::Cancelled),
            _ => Err(format!(
                "Invalid NCR status: {}. Use open, under_review, dispositioned, closed, or cancelled",
                s
            )),
        }
    }
}

/// An NCR entity - Non-Conformance Report.
///
/// The aggregate root of the disposition workflow. Mutated only through
/// the workflow engine's transitions; never deleted, only closed or
/// cancelled.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ncr {
    /// Unique identifier
    pub id: EntityId,

    /// NCR title/summary
    pub title: String,

    /// Where the issue was found
    #[serde(default)]
    pub source: NcrSource,

    /// Affected items (weak references by identifier)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub affected_items: Vec<AffectedItem>,

    /// Defect details
    pub defect: Defect,

    /// Reference to the triggering signal (chart ID, lot number)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trigger: Option<String>,

    /// Containment action, if one was taken
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub containment: Option<Containment>,

    /// Assigned reviewer
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reviewer: Option<String>,

    /// Disposition, once decided
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disposition: Option<Disposition>,

    /// Linked corrective action, referenced by identifier only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub capa: Option<EntityId>,

    /// Reason recorded when the NCR was cancelled
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cancellation_reason: Option<String>,

    /// Lifecycle status
    #[serde(default)]
    pub status: NcrStatus,

    /// Creation timestamp
    pub created: DateTime<Utc>,

    /// Author (who or what created this NCR)
    pub author: String,

    /// Document revision for optimistic concurrency
    #[serde(default = "default_revision")]
    pub entity_revision: u64,
}

fn default_revision() -> u64 {
    1
}

impl Entity for Ncr {
    const PREFIX: &'static str = "NCR";

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

impl Ncr {
    /// Create a new open NCR
    pub fn new(
        title: String,
        source: NcrSource,
        defect: Defect,
        affected_items: Vec<AffectedItem>,
        author: String,
    ) -> Self {
        Self {
            id: EntityId::new(crate::core::EntityPrefix::Ncr),
            title,
            source,
            affected_items,
            defect,
            trigger: None,
            containment: None,
            reviewer: None,
            disposition: None,
            capa: None,
            cancellation_reason: None,
            status: NcrStatus::Open,
            created: Utc::now(),
            author,
            entity_revision: 1,
        }
    }

    /// Severity shortcut
    pub fn severity(&self) -> NcrSeverity {
        self.defect.severity
    }
}
