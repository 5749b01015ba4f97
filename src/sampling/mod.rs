//! Acceptance sampling: AQL plan resolution, lot evaluation, and
//! normal/tightened/reduced switching-rule state.

pub mod plan;
pub mod switching;
pub mod tables;

use thiserror::Error;

pub use plan::{
    draw_sample_indices, evaluate, evaluate_lot, resolve_sample_size, resolve_with,
    CustomThresholds, InspectionLevel, LotDecision, PlanType, SampleSizeResult, SamplingPlan,
    SwitchingRules,
};
pub use switching::{LotOutcome, Regime, RegimeKey, RegimeRecord, RegimeShift};
pub use tables::{CodeTables, DoubleSamplingPlan, Z14Tables};

/// Errors produced while resolving or evaluating sampling plans
#[derive(Debug, Error)]
pub enum SamplingError {
    #[error("lot size must be a positive integer")]
    EmptyLot,

    #[error(
        "AQL {0} is not a standard table step (valid: 0.065, 0.10, 0.15, 0.25, 0.40, 0.65, 1.0, 1.5, 2.5, 4.0, 6.5)"
    )]
    UnknownAql(f64),

    #[error("no lot-size range covers {lot_size} for level {level}; the code table edition is defective")]
    TableGap {
        level: plan::InspectionLevel,
        lot_size: u64,
    },

    #[error("unknown sample size code letter '{0}'")]
    UnknownCode(char),

    #[error("plan type '{0}' has no shipped code tables; use an aql or custom plan")]
    UnsupportedPlanType(plan::PlanType),

    #[error("custom plan is missing explicit thresholds")]
    MissingCustomThresholds,

    #[error("accept number {ac} must be below reject number {re}")]
    InvalidThresholds { ac: u32, re: u32 },

    #[error("sample of {actual} measurement(s) is smaller than the required sample size {expected}")]
    ShortSample { expected: u32, actual: usize },
}
