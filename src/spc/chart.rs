//! Control chart aggregate: subgroups, limits, and chart types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::variants;
use super::ChartError;
use crate::core::entity::Entity;
use crate::core::identity::{EntityId, EntityPrefix};

/// One observed value plus its conformance judgement. Control charts use
/// the value; acceptance sampling counts the nonconforming flags.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Measurement {
    pub value: f64,

    #[serde(default = "default_conforming")]
    pub conforming: bool,
}

fn default_conforming() -> bool {
    true
}

impl Measurement {
    /// A measurement judged conforming
    pub fn conforming(value: f64) -> Self {
        Self {
            value,
            conforming: true,
        }
    }

    /// A measurement judged nonconforming
    pub fn nonconforming(value: f64) -> Self {
        Self {
            value,
            conforming: false,
        }
    }

    /// Judge a raw value against specification limits
    pub fn graded(value: f64, spec: &SpecLimits) -> Self {
        Self {
            value,
            conforming: spec.contains(value),
        }
    }
}

/// An ordered set of measurements captured at one timestamp for one
/// characteristic. Immutable once appended to a chart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subgroup {
    pub timestamp: DateTime<Utc>,
    pub measurements: Vec<Measurement>,
}

impl Subgroup {
    /// Create a subgroup timestamped now
    pub fn new(measurements: Vec<Measurement>) -> Self {
        Self {
            timestamp: Utc::now(),
            measurements,
        }
    }

    /// Create a subgroup of conforming measurements from raw values
    pub fn from_values(values: &[f64]) -> Self {
        Self::new(values.iter().map(|&v| Measurement::conforming(v)).collect())
    }

    pub fn size(&self) -> usize {
        self.measurements.len()
    }

    pub fn values(&self) -> Vec<f64> {
        self.measurements.iter().map(|m| m.value).collect()
    }

    /// Count of nonconforming measurements
    pub fn defectives(&self) -> usize {
        self.measurements.iter().filter(|m| !m.conforming).count()
    }
}

/// Specification limits for a characteristic. At least one limit is
/// required; both limits must satisfy USL > LSL.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpecLimits {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usl: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lsl: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<f64>,
}

impl SpecLimits {
    pub fn new(usl: Option<f64>, lsl: Option<f64>) -> Result<Self, ChartError> {
        if usl.is_none() && lsl.is_none() {
            return Err(ChartError::InvalidSpecLimits(
                "at least one specification limit (USL or LSL) is required",
            ));
        }
        if let Some(u) = usl {
            if !u.is_finite() {
                return Err(ChartError::InvalidSpecLimits("USL must be finite"));
            }
        }
        if let Some(l) = lsl {
            if !l.is_finite() {
                return Err(ChartError::InvalidSpecLimits("LSL must be finite"));
            }
        }
        if let (Some(u), Some(l)) = (usl, lsl) {
            if u <= l {
                return Err(ChartError::InvalidSpecLimits("USL must be greater than LSL"));
            }
        }
        Ok(Self {
            usl,
            lsl,
            target: None,
        })
    }

    /// Two-sided limits
    pub fn two_sided(usl: f64, lsl: f64) -> Result<Self, ChartError> {
        Self::new(Some(usl), Some(lsl))
    }

    pub fn with_target(mut self, target: f64) -> Self {
        self.target = Some(target);
        self
    }

    /// Whether a value lies inside the specification
    pub fn contains(&self, value: f64) -> bool {
        if let Some(u) = self.usl {
            if value > u {
                return false;
            }
        }
        if let Some(l) = self.lsl {
            if value < l {
                return false;
            }
        }
        true
    }
}

/// Control limits for one chart: upper control limit, center line, lower
/// control limit. Invariant: lcl <= cl <= ucl, all finite.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ControlLimits {
    pub ucl: f64,
    pub cl: f64,
    pub lcl: f64,
}

/// Limits for a chart pair: the primary statistic chart (X-bar,
/// individuals, p, ...) and, for variables charts, the companion
/// dispersion chart (R, S, or moving range).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ChartLimits {
    pub primary: ControlLimits,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secondary: Option<ControlLimits>,
}

/// Chart type, selecting the statistic and limit formulas. Variables
/// charts monitor continuous measurements; attribute charts (p, np, c, u)
/// monitor counts and proportions with binomial/Poisson-based limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[derive(Default)]
pub enum ChartType {
    #[default]
    XbarR,
    XbarS,
    Individuals,
    P,
    Np,
    C,
    U,
}

impl std::fmt::Display for ChartType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChartType::XbarR => write!(f, "xbar_r"),
            ChartType::XbarS => write!(f, "xbar_s"),
            ChartType::Individuals => write!(f, "individuals"),
            ChartType::P => write!(f, "p"),
            ChartType::Np => write!(f, "np"),
            ChartType::C => write!(f, "c"),
            ChartType::U => write!(f, "u"),
        }
    }
}

impl std::str::FromStr for ChartType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "xbar_r" | "xbarr" => Ok(ChartType::XbarR),
            "xbar_s" | "xbars" => Ok(ChartType::XbarS),
            "individuals" | "imr" | "i" => Ok(ChartType::Individuals),
            "p" => Ok(ChartType::P),
            "np" => Ok(ChartType::Np),
            "c" => Ok(ChartType::C),
            "u" => Ok(ChartType::U),
            _ => Err(format!(
                "Invalid chart type: {}. Use xbar_r, xbar_s, individuals, p, np, c, or u",
                s
            )),
        }
    }
}

/// Control chart for exactly one process characteristic.
///
/// The subgroup sequence is append-only: subgroups are never removed or
/// reordered once added, because the run-based detection rules depend on
/// their order. Limits are recomputed after every append.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ControlChart {
    /// Unique identifier (CHART-xxx)
    pub id: EntityId,

    /// Descriptive title
    pub title: String,

    /// Characteristic being charted (e.g., "bore diameter")
    pub characteristic: String,

    /// Chart type
    #[serde(default)]
    pub chart_type: ChartType,

    /// Established subgroup size; the first appended subgroup sets it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subgroup_size: Option<usize>,

    /// Ordered subgroup history (append-only)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    subgroups: Vec<Subgroup>,

    /// Specification limits, needed for capability analysis
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spec_limits: Option<SpecLimits>,

    /// Computed control limits; absent until 2 subgroups exist
    #[serde(default, skip_serializing_if = "Option::is_none")]
    limits: Option<ChartLimits>,

    /// Creation timestamp
    pub created: DateTime<Utc>,

    /// Author
    pub author: String,

    /// Document revision for optimistic concurrency
    #[serde(default = "default_revision")]
    pub entity_revision: u64,
}

fn default_revision() -> u64 {
    1
}

impl Entity for ControlChart {
    const PREFIX: &'static str = "CHART";

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

impl ControlChart {
    /// Create an empty chart
    pub fn new(
        title: String,
        characteristic: String,
        chart_type: ChartType,
        author: String,
    ) -> Self {
        Self {
            id: EntityId::new(EntityPrefix::Chart),
            title,
            characteristic,
            chart_type,
            subgroup_size: None,
            subgroups: Vec::new(),
            spec_limits: None,
            limits: None,
            created: Utc::now(),
            author,
            entity_revision: 1,
        }
    }

    /// Attach specification limits
    pub fn with_spec_limits(mut self, spec_limits: SpecLimits) -> Self {
        self.spec_limits = Some(spec_limits);
        self
    }

    /// Append a subgroup. The first subgroup establishes the chart's
    /// subgroup size; later ones must match it, and every measurement
    /// must be finite. Limits are recomputed on success.
    pub fn add_subgroup(&mut self, subgroup: Subgroup) -> Result<(), ChartError> {
        let size = subgroup.size();
        let (min, max) = variants::subgroup_size_bounds(self.chart_type);

        match self.subgroup_size {
            Some(expected) if size != expected => {
                return Err(ChartError::SubgroupSizeMismatch {
                    expected,
                    actual: size,
                });
            }
            None if size < min || size > max => {
                return Err(ChartError::UnsupportedSubgroupSize {
                    chart_type: self.chart_type,
                    size,
                    min,
                    max,
                });
            }
            _ => {}
        }

        for (index, m) in subgroup.measurements.iter().enumerate() {
            if !m.value.is_finite() {
                return Err(ChartError::NonFiniteMeasurement { index });
            }
            if variants::takes_counts(self.chart_type) && m.value < 0.0 {
                return Err(ChartError::NegativeCount {
                    chart_type: self.chart_type,
                    index,
                });
            }
        }

        self.subgroup_size.get_or_insert(size);
        self.subgroups.push(subgroup);
        self.limits = self.recompute_control_limits().ok();
        self.bump_version();
        Ok(())
    }

    /// Read-only subgroup history
    pub fn subgroups(&self) -> &[Subgroup] {
        &self.subgroups
    }

    /// The computed limits, failing while fewer than 2 subgroups exist
    pub fn control_limits(&self) -> Result<ChartLimits, ChartError> {
        self.limits
            .ok_or(ChartError::InsufficientData(self.subgroups.len()))
    }

    /// Recompute limits from the full subgroup history. Pure with respect
    /// to the chart; `add_subgroup` caches the result.
    pub fn recompute_control_limits(&self) -> Result<ChartLimits, ChartError> {
        variants::compute_limits(self.chart_type, &self.subgroups)
    }

    /// Per-subgroup primary statistic series, in append order
    pub fn statistics(&self) -> Vec<f64> {
        self.subgroups
            .iter()
            .map(|sg| variants::statistic(self.chart_type, sg))
            .collect()
    }

    /// All individual measurement values, in append order
    pub fn all_values(&self) -> Vec<f64> {
        self.subgroups
            .iter()
            .flat_map(|sg| sg.measurements.iter().map(|m| m.value))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chart(chart_type: ChartType) -> ControlChart {
        ControlChart::new(
            "Bore Diameter".to_string(),
            "bore-diameter".to_string(),
            chart_type,
            "test".to_string(),
        )
    }

    #[test]
    fn test_chart_creation() {
        let c = chart(ChartType::XbarR);
        assert!(c.id.to_string().starts_with("CHART-"));
        assert_eq!(c.chart_type, ChartType::XbarR);
        assert!(c.subgroups().is_empty());
        assert!(c.control_limits().is_err());
    }

    #[test]
    fn test_first_subgroup_establishes_size() {
        let mut c = chart(ChartType::XbarR);
        c.add_subgroup(Subgroup::from_values(&[1.0, 2.0, 3.0])).unwrap();
        assert_eq!(c.subgroup_size, Some(3));

        let err = c
            .add_subgroup(Subgroup::from_values(&[1.0, 2.0]))
            .unwrap_err();
        assert!(matches!(
            err,
            ChartError::SubgroupSizeMismatch {
                expected: 3,
                actual: 2
            }
        ));
    }

    #[test]
    fn test_rejects_non_finite_measurement() {
        let mut c = chart(ChartType::XbarR);
        let err = c
            .add_subgroup(Subgroup::from_values(&[1.0, f64::NAN, 3.0]))
            .unwrap_err();
        assert!(matches!(err, ChartError::NonFiniteMeasurement { index: 1 }));
        assert!(c.subgroups().is_empty());
    }

    #[test]
    fn test_rejects_unsupported_subgroup_size() {
        let mut c = chart(ChartType::XbarR);
        let err = c.add_subgroup(Subgroup::from_values(&[1.0])).unwrap_err();
        assert!(matches!(err, ChartError::UnsupportedSubgroupSize { .. }));

        let mut c = chart(ChartType::Individuals);
        let err = c
            .add_subgroup(Subgroup::from_values(&[1.0, 2.0]))
            .unwrap_err();
        assert!(matches!(err, ChartError::UnsupportedSubgroupSize { .. }));
    }

    #[test]
    fn test_append_preserves_order() {
        let mut c = chart(ChartType::Individuals);
        for i in 0..8 {
            c.add_subgroup(Subgroup::from_values(&[i as f64])).unwrap();
        }
        let values: Vec<f64> = c.statistics();
        let expected: Vec<f64> = (0..8).map(|i| i as f64).collect();
        assert_eq!(values, expected);

        // Recomputation does not disturb the sequence either.
        c.recompute_control_limits().unwrap();
        assert_eq!(c.statistics(), expected);
    }

    #[test]
    fn test_limits_need_two_subgroups() {
        let mut c = chart(ChartType::XbarR);
        c.add_subgroup(Subgroup::from_values(&[1.0, 2.0, 3.0])).unwrap();
        let err = c.control_limits().unwrap_err();
        assert!(matches!(err, ChartError::InsufficientData(1)));

        c.add_subgroup(Subgroup::from_values(&[2.0, 3.0, 4.0])).unwrap();
        assert!(c.control_limits().is_ok());
    }

    #[test]
    fn test_version_bumps_on_append() {
        let mut c = chart(ChartType::XbarR);
        assert_eq!(c.version(), 1);
        c.add_subgroup(Subgroup::from_values(&[1.0, 2.0, 3.0])).unwrap();
        assert_eq!(c.version(), 2);
    }

    #[test]
    fn test_spec_limits_validation() {
        assert!(SpecLimits::new(None, None).is_err());
        assert!(SpecLimits::new(Some(1.0), Some(2.0)).is_err());
        assert!(SpecLimits::new(Some(f64::NAN), None).is_err());
        assert!(SpecLimits::two_sided(2.0, 1.0).is_ok());
    }

    #[test]
    fn test_spec_limits_contains() {
        let spec = SpecLimits::two_sided(10.0, 5.0).unwrap();
        assert!(spec.contains(7.5));
        assert!(spec.contains(10.0));
        assert!(!spec.contains(10.1));
        assert!(!spec.contains(4.9));
    }

    #[test]
    fn test_measurement_graded() {
        let spec = SpecLimits::two_sided(10.0, 5.0).unwrap();
        assert!(Measurement::graded(7.0, &spec).conforming);
        assert!(!Measurement::graded(11.0, &spec).conforming);
    }

    #[test]
    fn test_chart_yaml_roundtrip() {
        let mut c = chart(ChartType::XbarR).with_spec_limits(
            SpecLimits::two_sided(10.5, 9.5).unwrap(),
        );
        c.add_subgroup(Subgroup::from_values(&[9.9, 10.0, 10.1])).unwrap();
        c.add_subgroup(Subgroup::from_values(&[10.0, 10.1, 10.2])).unwrap();

        let yaml = serde_yml::to_string(&c).unwrap();
        let parsed: ControlChart = serde_yml::from_str(&yaml).unwrap();
        assert_eq!(parsed.id, c.id);
        assert_eq!(parsed.subgroups().len(), 2);
        assert_eq!(parsed.subgroup_size, Some(3));
        assert!(parsed.control_limits().is_ok());
    }
}
