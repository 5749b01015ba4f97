//! Statistical process control: control chart aggregates, limit
//! computation per chart type, out-of-control rule detection, and
//! process capability analysis.

pub mod capability;
pub mod chart;
mod factors;
pub mod rules;
mod stats;
mod variants;

use thiserror::Error;

pub use capability::{capability, CapabilityStudy};
pub use chart::{
    ChartLimits, ChartType, ControlChart, ControlLimits, Measurement, SpecLimits, Subgroup,
};
pub use rules::{detect_violations, DetectionRule, Violation};

/// Errors produced by chart operations
#[derive(Debug, Error)]
pub enum ChartError {
    #[error("subgroup size {actual} does not match the chart's established size {expected}")]
    SubgroupSizeMismatch { expected: usize, actual: usize },

    #[error("subgroup size {size} is outside the supported range {min}..={max} for {chart_type} charts")]
    UnsupportedSubgroupSize {
        chart_type: chart::ChartType,
        size: usize,
        min: usize,
        max: usize,
    },

    #[error("measurement {index} in the subgroup is not finite")]
    NonFiniteMeasurement { index: usize },

    #[error("measurement {index} in the subgroup is negative; {chart_type} charts take counts")]
    NegativeCount {
        chart_type: chart::ChartType,
        index: usize,
    },

    #[error("control limits require at least 2 subgroups (chart has {0})")]
    InsufficientData(usize),

    #[error("capability analysis requires specification limits on the chart")]
    MissingSpecLimits,

    #[error("invalid specification limits: {0}")]
    InvalidSpecLimits(&'static str),

    #[error("{operation} is not defined for {chart_type} charts")]
    UnsupportedChartType {
        chart_type: chart::ChartType,
        operation: &'static str,
    },
}
