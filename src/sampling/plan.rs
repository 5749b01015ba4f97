//! Sampling plan configuration and lot evaluation.

use rand::seq::index::sample as sample_indices;
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::tables::{CodeTables, DoubleSamplingPlan, Z14Tables};
use super::SamplingError;
use crate::spc::chart::Measurement;

/// Sampling plan family
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[derive(Default)]
pub enum PlanType {
    #[default]
    Aql,
    Ltpd,
    SkipLot,
    Custom,
}

impl std::fmt::Display for PlanType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PlanType::Aql => write!(f, "aql"),
            PlanType::Ltpd => write!(f, "ltpd"),
            PlanType::SkipLot => write!(f, "skip_lot"),
            PlanType::Custom => write!(f, "custom"),
        }
    }
}

impl std::str::FromStr for PlanType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "aql" => Ok(PlanType::Aql),
            "ltpd" => Ok(PlanType::Ltpd),
            "skip_lot" | "skiplot" => Ok(PlanType::SkipLot),
            "custom" => Ok(PlanType::Custom),
            _ => Err(format!(
                "Invalid plan type: {}. Use aql, ltpd, skip_lot, or custom",
                s
            )),
        }
    }
}

/// Inspection level selecting a code-letter column: the special levels
/// S1-S4 for small or expensive samples, general levels I-III otherwise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[derive(Default)]
pub enum InspectionLevel {
    #[serde(rename = "S1")]
    S1,
    #[serde(rename = "S2")]
    S2,
    #[serde(rename = "S3")]
    S3,
    #[serde(rename = "S4")]
    S4,
    #[serde(rename = "I")]
    I,
    #[serde(rename = "II")]
    #[default]
    II,
    #[serde(rename = "III")]
    III,
}

impl InspectionLevel {
    /// Column index into the code letter table (S1..S4, I..III).
    pub(crate) fn column(&self) -> usize {
        match self {
            InspectionLevel::S1 => 0,
            InspectionLevel::S2 => 1,
            InspectionLevel::S3 => 2,
            InspectionLevel::S4 => 3,
            InspectionLevel::I => 4,
            InspectionLevel::II => 5,
            InspectionLevel::III => 6,
        }
    }
}

impl std::fmt::Display for InspectionLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InspectionLevel::S1 => write!(f, "S1"),
            InspectionLevel::S2 => write!(f, "S2"),
            InspectionLevel::S3 => write!(f, "S3"),
            InspectionLevel::S4 => write!(f, "S4"),
            InspectionLevel::I => write!(f, "I"),
            InspectionLevel::II => write!(f, "II"),
            InspectionLevel::III => write!(f, "III"),
        }
    }
}

impl std::str::FromStr for InspectionLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "S1" | "S-1" => Ok(InspectionLevel::S1),
            "S2" | "S-2" => Ok(InspectionLevel::S2),
            "S3" | "S-3" => Ok(InspectionLevel::S3),
            "S4" | "S-4" => Ok(InspectionLevel::S4),
            "I" | "1" => Ok(InspectionLevel::I),
            "II" | "2" => Ok(InspectionLevel::II),
            "III" | "3" => Ok(InspectionLevel::III),
            _ => Err(format!(
                "Invalid inspection level: {}. Use S1-S4, I, II, or III",
                s
            )),
        }
    }
}

/// Explicit thresholds for `custom` plans that bypass the code tables
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomThresholds {
    pub sample_size: u32,
    pub accept_number: u32,
    pub reject_number: u32,
}

/// Consecutive-lot counts that move a plan between inspection regimes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SwitchingRules {
    /// Consecutive rejections before normal switches to tightened
    pub to_tightened: u32,

    /// Consecutive acceptances under normal before switching to reduced
    pub to_reduced: u32,

    /// Consecutive non-rejections that return tightened or reduced
    /// inspection to normal
    pub to_normal: u32,
}

impl Default for SwitchingRules {
    fn default() -> Self {
        Self {
            to_tightened: 2,
            to_reduced: 10,
            to_normal: 5,
        }
    }
}

/// Acceptance sampling plan configuration. Immutable once an inspection
/// starts; resolution derives everything else from it and the lot size.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SamplingPlan {
    /// Plan family
    #[serde(default)]
    pub plan_type: PlanType,

    /// Inspection level (code letter column)
    #[serde(default)]
    pub inspection_level: InspectionLevel,

    /// Acceptable quality level, percent defective
    pub aql: f64,

    /// Regime switching counts, when the process uses them
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub switching_rules: Option<SwitchingRules>,

    /// Explicit thresholds, required for `custom` plans
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom: Option<CustomThresholds>,
}

impl SamplingPlan {
    /// Create a standard AQL plan
    pub fn aql(inspection_level: InspectionLevel, aql: f64) -> Self {
        Self {
            plan_type: PlanType::Aql,
            inspection_level,
            aql,
            switching_rules: None,
            custom: None,
        }
    }

    /// Create a custom plan with explicit thresholds
    pub fn custom(sample_size: u32, accept_number: u32, reject_number: u32) -> Self {
        Self {
            plan_type: PlanType::Custom,
            inspection_level: InspectionLevel::default(),
            aql: 0.0,
            switching_rules: None,
            custom: Some(CustomThresholds {
                sample_size,
                accept_number,
                reject_number,
            }),
        }
    }
}

/// A resolved sampling plan for one lot. Derived, never stored: the code
/// tables are the source of truth and the result is recomputed per lot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SampleSizeResult {
    /// Effective code letter after arrow resolution
    pub code: char,
    pub sample_size: u32,
    pub accept_number: u32,
    pub reject_number: u32,
}

impl SampleSizeResult {
    /// Judge a defect count against the plan thresholds.
    pub fn decide(&self, defects: u32) -> LotDecision {
        if defects <= self.accept_number {
            LotDecision::Accept
        } else if defects >= self.reject_number {
            LotDecision::Reject
        } else {
            LotDecision::SecondSampleRequired
        }
    }
}

/// Outcome of evaluating a sample against a plan. The indeterminate band
/// between the accept and reject numbers is a normal branch of acceptance
/// sampling, never folded into accept or reject.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LotDecision {
    Accept,
    Reject,
    SecondSampleRequired,
}

impl std::fmt::Display for LotDecision {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LotDecision::Accept => write!(f, "accept"),
            LotDecision::Reject => write!(f, "reject"),
            LotDecision::SecondSampleRequired => write!(f, "second_sample_required"),
        }
    }
}

/// Resolve a plan against the shipped Z1.4 tables.
pub fn resolve_sample_size(
    plan: &SamplingPlan,
    lot_size: u64,
) -> Result<SampleSizeResult, SamplingError> {
    resolve_with(&Z14Tables, plan, lot_size)
}

/// Resolve a plan against an injected table edition.
pub fn resolve_with(
    tables: &dyn CodeTables,
    plan: &SamplingPlan,
    lot_size: u64,
) -> Result<SampleSizeResult, SamplingError> {
    if lot_size == 0 {
        return Err(SamplingError::EmptyLot);
    }

    let mut result = match plan.plan_type {
        PlanType::Aql => {
            let code = tables.code_for(plan.inspection_level, lot_size)?;
            tables.single_plan(code, plan.aql)?
        }
        PlanType::Custom => {
            let thresholds = plan
                .custom
                .ok_or(SamplingError::MissingCustomThresholds)?;
            if thresholds.accept_number >= thresholds.reject_number {
                return Err(SamplingError::InvalidThresholds {
                    ac: thresholds.accept_number,
                    re: thresholds.reject_number,
                });
            }
            SampleSizeResult {
                code: '-',
                sample_size: thresholds.sample_size,
                accept_number: thresholds.accept_number,
                reject_number: thresholds.reject_number,
            }
        }
        PlanType::Ltpd | PlanType::SkipLot => {
            return Err(SamplingError::UnsupportedPlanType(plan.plan_type));
        }
    };

    // A sample that meets or exceeds the lot is 100% inspection.
    if u64::from(result.sample_size) >= lot_size {
        result.sample_size = lot_size as u32;
    }

    Ok(result)
}

/// Count nonconforming measurements and judge them against an already
/// resolved plan.
pub fn evaluate(
    measurements: &[Measurement],
    result: &SampleSizeResult,
) -> Result<LotDecision, SamplingError> {
    if measurements.len() < result.sample_size as usize {
        return Err(SamplingError::ShortSample {
            expected: result.sample_size,
            actual: measurements.len(),
        });
    }

    let defects = measurements.iter().filter(|m| !m.conforming).count() as u32;
    Ok(result.decide(defects))
}

/// Resolve and evaluate in one call.
pub fn evaluate_lot(
    measurements: &[Measurement],
    plan: &SamplingPlan,
    lot_size: u64,
) -> Result<LotDecision, SamplingError> {
    let result = resolve_sample_size(plan, lot_size)?;
    evaluate(measurements, &result)
}

impl DoubleSamplingPlan {
    /// Judge the first sample alone.
    pub fn first_stage(&self, defects: u32) -> LotDecision {
        if defects <= self.ac1 {
            LotDecision::Accept
        } else if defects >= self.re1 {
            LotDecision::Reject
        } else {
            LotDecision::SecondSampleRequired
        }
    }

    /// Judge the cumulative defect count after the second sample. The
    /// second stage has no indeterminate band.
    pub fn combined(&self, first_defects: u32, second_defects: u32) -> LotDecision {
        let cumulative = first_defects + second_defects;
        if cumulative <= self.ac2 {
            LotDecision::Accept
        } else {
            LotDecision::Reject
        }
    }
}

/// Draw the indices of the lot units to pull for inspection, without
/// replacement.
pub fn draw_sample_indices<R: Rng + ?Sized>(
    rng: &mut R,
    lot_size: u64,
    sample_size: u32,
) -> Vec<u64> {
    let n = (sample_size as u64).min(lot_size) as usize;
    let mut picked: Vec<u64> = sample_indices(rng, lot_size as usize, n)
        .into_iter()
        .map(|i| i as u64)
        .collect();
    picked.sort_unstable();
    picked
}
