//! Out-of-control detection rules.
//!
//! Rules run over the chart's primary statistic series against limits
//! that were computed before the scan started. Limits are fixed inputs
//! for a detection pass; recomputing them mid-scan would make the
//! reported violations depend on scan order.
//!
//! # References
//!
//! - Western Electric (1956). *Statistical Quality Control Handbook*.
//! - Nelson, L.S. (1984). "The Shewhart Control Chart — Tests for Special
//!   Causes", *Journal of Quality Technology* 16(4), pp. 237-239.

use serde::{Deserialize, Serialize};

use super::chart::{ControlChart, ControlLimits};
use super::ChartError;

/// Detection rules. The default set is rules 1-3; the alternation test
/// is available but opt-in, since editions disagree on its exact window
/// and strictness.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DetectionRule {
    /// Single point strictly beyond the control limits
    BeyondLimits,
    /// 9 consecutive points strictly on one side of the center line
    RunOfNine,
    /// 6 consecutive points strictly increasing or strictly decreasing
    TrendOfSix,
    /// 14 consecutive points strictly alternating up and down
    AlternatingFourteen,
}

impl DetectionRule {
    /// The rules enabled when the caller does not choose
    pub fn default_set() -> &'static [DetectionRule] {
        &[
            DetectionRule::BeyondLimits,
            DetectionRule::RunOfNine,
            DetectionRule::TrendOfSix,
        ]
    }

    /// Every implemented rule
    pub fn all() -> &'static [DetectionRule] {
        &[
            DetectionRule::BeyondLimits,
            DetectionRule::RunOfNine,
            DetectionRule::TrendOfSix,
            DetectionRule::AlternatingFourteen,
        ]
    }
}

impl std::fmt::Display for DetectionRule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DetectionRule::BeyondLimits => write!(f, "beyond_limits"),
            DetectionRule::RunOfNine => write!(f, "run_of_nine"),
            DetectionRule::TrendOfSix => write!(f, "trend_of_six"),
            DetectionRule::AlternatingFourteen => write!(f, "alternating_fourteen"),
        }
    }
}

/// An immutable out-of-control finding. Produced by a detection pass,
/// never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Violation {
    pub rule: DetectionRule,
    pub subgroup_index: usize,
    pub value: f64,
    pub description: String,
}

/// Run the enabled rules over a chart. Every applicable rule is checked
/// independently; one subgroup may appear in several violations.
pub fn detect_violations(
    chart: &ControlChart,
    enabled: &[DetectionRule],
) -> Result<Vec<Violation>, ChartError> {
    let limits = chart.control_limits()?;
    let points = chart.statistics();

    let mut violations = Vec::new();
    for rule in enabled {
        match rule {
            DetectionRule::BeyondLimits => check_beyond_limits(&points, &limits.primary, &mut violations),
            DetectionRule::RunOfNine => check_run_of_nine(&points, &limits.primary, &mut violations),
            DetectionRule::TrendOfSix => check_trend_of_six(&points, &mut violations),
            DetectionRule::AlternatingFourteen => check_alternating(&points, &mut violations),
        }
    }

    violations.sort_by_key(|v| v.subgroup_index);
    Ok(violations)
}

/// Rule 1: a point strictly beyond UCL or LCL. A value exactly on a
/// limit is in control.
fn check_beyond_limits(points: &[f64], limits: &ControlLimits, out: &mut Vec<Violation>) {
    for (i, &value) in points.iter().enumerate() {
        if value > limits.ucl {
            out.push(Violation {
                rule: DetectionRule::BeyondLimits,
                subgroup_index: i,
                value,
                description: format!("point {value} above UCL {}", limits.ucl),
            });
        } else if value < limits.lcl {
            out.push(Violation {
                rule: DetectionRule::BeyondLimits,
                subgroup_index: i,
                value,
                description: format!("point {value} below LCL {}", limits.lcl),
            });
        }
    }
}

/// Rule 2: 9 consecutive points strictly on the same side of the center
/// line. A point exactly on the line belongs to neither side and breaks
/// the run.
fn check_run_of_nine(points: &[f64], limits: &ControlLimits, out: &mut Vec<Violation>) {
    let sides: Vec<i8> = points
        .iter()
        .map(|&v| {
            if v > limits.cl {
                1
            } else if v < limits.cl {
                -1
            } else {
                0
            }
        })
        .collect();

    let mut run = 0usize;
    for (i, &side) in sides.iter().enumerate() {
        if side != 0 && i > 0 && side == sides[i - 1] {
            run += 1;
        } else if side != 0 {
            run = 1;
        } else {
            run = 0;
        }
        if run >= 9 {
            let side_name = if side > 0 { "above" } else { "below" };
            out.push(Violation {
                rule: DetectionRule::RunOfNine,
                subgroup_index: i,
                value: points[i],
                description: format!("{run} consecutive points {side_name} the center line"),
            });
        }
    }
}

/// Rule 3: 6 consecutive points strictly monotonic. A repeated value is
/// a plateau and breaks the run.
fn check_trend_of_six(points: &[f64], out: &mut Vec<Violation>) {
    if points.len() < 6 {
        return;
    }

    // Direction of each step: +1 up, -1 down, 0 flat.
    let dirs: Vec<i8> = points
        .windows(2)
        .map(|w| {
            if w[1] > w[0] {
                1
            } else if w[1] < w[0] {
                -1
            } else {
                0
            }
        })
        .collect();

    let mut run = 1usize;
    for i in 1..dirs.len() {
        if dirs[i] != 0 && dirs[i] == dirs[i - 1] {
            run += 1;
        } else {
            run = 1;
        }
        // 5 same-direction steps span 6 points; report the last point.
        if dirs[i] != 0 && run >= 5 {
            let trend = if dirs[i] > 0 { "increasing" } else { "decreasing" };
            out.push(Violation {
                rule: DetectionRule::TrendOfSix,
                subgroup_index: i + 1,
                value: points[i + 1],
                description: format!("{} consecutive {trend} points", run + 1),
            });
        }
    }
}

/// Rule 4: 14 consecutive points strictly alternating up and down.
fn check_alternating(points: &[f64], out: &mut Vec<Violation>) {
    if points.len() < 14 {
        return;
    }

    let dirs: Vec<i8> = points
        .windows(2)
        .map(|w| {
            if w[1] > w[0] {
                1
            } else if w[1] < w[0] {
                -1
            } else {
                0
            }
        })
        .collect();

    let mut run = 1usize;
    for i in 1..dirs.len() {
        if dirs[i] != 0 && dirs[i - 1] != 0 && dirs[i] == -dirs[i - 1] {
            run += 1;
        } else {
            run = 1;
        }
        // 13 alternating steps span 14 points.
        if run >= 13 {
            out.push(Violation {
                rule: DetectionRule::AlternatingFourteen,
                subgroup_index: i + 1,
                value: points[i + 1],
                description: format!("{} consecutive alternating points", run + 1),
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spc::chart::{ChartType, ControlChart, Subgroup};

    /// Chart of individuals whose first points pin the limits at
    /// CL = 25, UCL = 30.32, LCL = 19.68 (x-bar 25, MR-bar 2).
    fn individuals_chart(values: &[f64]) -> ControlChart {
        let mut chart = ControlChart::new(
            "test".to_string(),
            "char".to_string(),
            ChartType::Individuals,
            "test".to_string(),
        );
        for &v in values {
            chart.add_subgroup(Subgroup::from_values(&[v])).unwrap();
        }
        chart
    }

    #[test]
    fn test_rule1_fires_strictly_beyond_ucl() {
        let chart = individuals_chart(&[24.0, 26.0, 24.0, 26.0, 24.0, 26.0, 60.0]);
        let violations =
            detect_violations(&chart, &[DetectionRule::BeyondLimits]).unwrap();
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].subgroup_index, 6);
        assert_eq!(violations[0].rule, DetectionRule::BeyondLimits);
    }

    #[test]
    fn test_rule1_does_not_fire_on_limit() {
        let chart = individuals_chart(&[24.0, 26.0, 24.0, 26.0]);
        let limits = chart.control_limits().unwrap().primary;

        let mut out = Vec::new();
        check_beyond_limits(&[limits.ucl], &limits, &mut out);
        assert!(out.is_empty(), "value exactly at UCL must not fire");

        check_beyond_limits(&[limits.ucl + 1e-9], &limits, &mut out);
        assert_eq!(out.len(), 1, "any positive epsilon above UCL fires");
    }

    #[test]
    fn test_rule2_requires_nine() {
        let limits = ControlLimits {
            ucl: 30.0,
            cl: 25.0,
            lcl: 20.0,
        };

        let mut out = Vec::new();
        check_run_of_nine(&[26.0; 8], &limits, &mut out);
        assert!(out.is_empty());

        check_run_of_nine(&[26.0; 9], &limits, &mut out);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].subgroup_index, 8);
    }

    #[test]
    fn test_rule2_does_not_merge_across_break() {
        let limits = ControlLimits {
            ucl: 30.0,
            cl: 25.0,
            lcl: 20.0,
        };

        // 8 above + 1 below + 9 above: the first 8 never combine with the
        // later run; only the second run's 9th point fires.
        let mut points = vec![26.0; 8];
        points.push(24.0);
        points.extend(vec![26.0; 9]);

        let mut out = Vec::new();
        check_run_of_nine(&points, &limits, &mut out);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].subgroup_index, 17);
    }

    #[test]
    fn test_rule2_point_on_center_line_breaks_run() {
        let limits = ControlLimits {
            ucl: 30.0,
            cl: 25.0,
            lcl: 20.0,
        };
        let mut points = vec![26.0; 5];
        points.push(25.0); // exactly on CL
        points.extend(vec![26.0; 8]);

        let mut out = Vec::new();
        check_run_of_nine(&points, &limits, &mut out);
        assert!(out.is_empty());
    }

    #[test]
    fn test_rule3_six_increasing() {
        let mut out = Vec::new();
        check_trend_of_six(&[20.0, 21.0, 22.0, 23.0, 24.0, 25.0], &mut out);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].subgroup_index, 5);
    }

    #[test]
    fn test_rule3_six_decreasing() {
        let mut out = Vec::new();
        check_trend_of_six(&[30.0, 29.0, 28.0, 27.0, 26.0, 25.0], &mut out);
        assert_eq!(out.len(), 1);
    }

    #[test]
    fn test_rule3_five_not_enough() {
        let mut out = Vec::new();
        check_trend_of_six(&[20.0, 21.0, 22.0, 23.0, 24.0], &mut out);
        assert!(out.is_empty());
    }

    #[test]
    fn test_rule3_plateau_breaks_run() {
        // A repeated value interrupts the monotonic run: 5 rising steps
        // never accumulate.
        let mut out = Vec::new();
        check_trend_of_six(
            &[20.0, 21.0, 22.0, 22.0, 23.0, 24.0, 25.0, 26.0],
            &mut out,
        );
        assert!(out.is_empty());
    }

    #[test]
    fn test_rule4_fourteen_alternating() {
        let points: Vec<f64> = (0..14)
            .map(|i| if i % 2 == 0 { 24.0 } else { 26.0 })
            .collect();
        let mut out = Vec::new();
        check_alternating(&points, &mut out);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].subgroup_index, 13);
    }

    #[test]
    fn test_rule4_thirteen_not_enough() {
        let points: Vec<f64> = (0..13)
            .map(|i| if i % 2 == 0 { 24.0 } else { 26.0 })
            .collect();
        let mut out = Vec::new();
        check_alternating(&points, &mut out);
        assert!(out.is_empty());
    }

    #[test]
    fn test_rule4_not_in_default_set() {
        assert!(!DetectionRule::default_set().contains(&DetectionRule::AlternatingFourteen));
        assert!(DetectionRule::all().contains(&DetectionRule::AlternatingFourteen));
    }

    #[test]
    fn test_rules_evaluated_independently() {
        // A monotonic climb whose last point also exceeds the UCL
        // triggers both rules on the same subgroup.
        let chart = individuals_chart(&[
            24.0, 26.0, 24.0, 26.0, 24.0, 25.0, 26.0, 27.0, 28.0, 29.0, 45.0,
        ]);
        let violations = detect_violations(&chart, DetectionRule::default_set()).unwrap();

        let last_idx = chart.subgroups().len() - 1;
        let rules_at_last: Vec<DetectionRule> = violations
            .iter()
            .filter(|v| v.subgroup_index == last_idx)
            .map(|v| v.rule)
            .collect();
        assert!(rules_at_last.contains(&DetectionRule::BeyondLimits));
        assert!(rules_at_last.contains(&DetectionRule::TrendOfSix));
    }

    #[test]
    fn test_detection_requires_limits() {
        let chart = individuals_chart(&[25.0]);
        let err = detect_violations(&chart, DetectionRule::default_set()).unwrap_err();
        assert!(matches!(err, ChartError::InsufficientData(1)));
    }

    #[test]
    fn test_violations_sorted_by_index() {
        let chart = individuals_chart(&[
            24.0, 26.0, 24.0, 26.0, 60.0, 26.0, 24.0, 26.0, 24.0, -10.0,
        ]);
        let violations = detect_violations(&chart, DetectionRule::default_set()).unwrap();
        assert!(violations.len() >= 2);
        assert!(violations
            .windows(2)
            .all(|w| w[0].subgroup_index <= w[1].subgroup_index));
    }
}
