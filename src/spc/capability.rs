//! Process capability indices (Cp, Cpk, Pp, Ppk).
//!
//! Short-term indices (Cp, Cpk) use the within-subgroup sigma estimated
//! from the chart's dispersion statistic; long-term indices (Pp, Ppk)
//! use the overall standard deviation of every individual measurement.
//!
//! Indices that cannot be computed (a one-sided specification, or a
//! process with zero estimated spread) are `None`. A zero sigma must
//! never surface as infinity or a division panic; "indeterminate" is a
//! real analysis outcome that callers present as such.
//!
//! # References
//!
//! - Montgomery, D.C. (2019). *Introduction to Statistical Quality
//!   Control*, 8th ed., Chapter 8.
//! - Kane (1986), "Process Capability Indices", *Journal of Quality
//!   Technology* 18(1), pp. 41-52.

use serde::{Deserialize, Serialize};

use super::chart::{ChartType, ControlChart};
use super::{factors, stats, variants, ChartError};

/// Computed capability indices for one chart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CapabilityStudy {
    /// Cp = (USL - LSL) / (6·sigma_within). Requires both limits.
    pub cp: Option<f64>,
    /// Cpk = min(Cpu, Cpl); the one-sided index when one limit is set.
    pub cpk: Option<f64>,
    /// Pp = (USL - LSL) / (6·sigma_overall). Requires both limits.
    pub pp: Option<f64>,
    /// Ppk = min(Ppu, Ppl); the one-sided index when one limit is set.
    pub ppk: Option<f64>,
    /// Grand mean of all individual measurements.
    pub mean: f64,
    /// Short-term (within-subgroup) sigma estimate.
    pub sigma_within: f64,
    /// Long-term (overall) sigma estimate.
    pub sigma_overall: f64,
}

impl CapabilityStudy {
    /// True when no index could be computed (zero process spread)
    pub fn is_indeterminate(&self) -> bool {
        self.cp.is_none() && self.cpk.is_none() && self.pp.is_none() && self.ppk.is_none()
    }
}

/// Compute capability indices for a variables chart against its
/// specification limits.
pub fn capability(chart: &ControlChart) -> Result<CapabilityStudy, ChartError> {
    if !variants::is_variables(chart.chart_type) {
        return Err(ChartError::UnsupportedChartType {
            chart_type: chart.chart_type,
            operation: "capability analysis",
        });
    }

    let spec = chart.spec_limits.ok_or(ChartError::MissingSpecLimits)?;

    let subgroups = chart.subgroups();
    if subgroups.len() < 2 {
        return Err(ChartError::InsufficientData(subgroups.len()));
    }

    let values = chart.all_values();
    let mean = stats::mean(&values);
    let sigma_within = sigma_within(chart);
    let sigma_overall = stats::sample_std_dev(&values);

    let (cp, cpk) = indices(&spec, mean, sigma_within);
    let (pp, ppk) = indices(&spec, mean, sigma_overall);

    Ok(CapabilityStudy {
        cp,
        cpk,
        pp,
        ppk,
        mean,
        sigma_within,
        sigma_overall,
    })
}

/// Short-term sigma from the chart's dispersion statistic: R-bar/d2 for
/// range charts, S-bar/c4 for sigma charts, MR-bar/d2(2) for
/// individuals.
fn sigma_within(chart: &ControlChart) -> f64 {
    let subgroups = chart.subgroups();
    match chart.chart_type {
        ChartType::XbarR => {
            let n = subgroups[0].size();
            let ranges: Vec<f64> =
                subgroups.iter().map(|sg| stats::range(&sg.values())).collect();
            stats::mean(&ranges) / factors::d2(n)
        }
        ChartType::XbarS => {
            let n = subgroups[0].size();
            let sds: Vec<f64> = subgroups
                .iter()
                .map(|sg| stats::sample_std_dev(&sg.values()))
                .collect();
            stats::mean(&sds) / factors::c4(n)
        }
        ChartType::Individuals => {
            let values: Vec<f64> = subgroups.iter().map(|sg| sg.values()[0]).collect();
            let moving_ranges: Vec<f64> =
                values.windows(2).map(|w| (w[1] - w[0]).abs()).collect();
            stats::mean(&moving_ranges) / factors::d2(2)
        }
        // Guarded by the is_variables check above.
        _ => unreachable!("capability is only computed for variables charts"),
    }
}

/// (two-sided index, centered index) for one sigma estimate; `None`
/// where the sigma is zero or a limit is missing.
fn indices(
    spec: &super::chart::SpecLimits,
    mean: f64,
    sigma: f64,
) -> (Option<f64>, Option<f64>) {
    if sigma <= 0.0 {
        return (None, None);
    }

    let upper = spec.usl.map(|u| (u - mean) / (3.0 * sigma));
    let lower = spec.lsl.map(|l| (mean - l) / (3.0 * sigma));

    let spread = match (spec.usl, spec.lsl) {
        (Some(u), Some(l)) => Some((u - l) / (6.0 * sigma)),
        _ => None,
    };

    let centered = match (upper, lower) {
        (Some(u), Some(l)) => Some(u.min(l)),
        (Some(u), None) => Some(u),
        (None, Some(l)) => Some(l),
        (None, None) => None,
    };

    (spread, centered)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spc::chart::{SpecLimits, Subgroup};

    fn xbar_r_chart(spec: Option<SpecLimits>, rows: &[&[f64]]) -> ControlChart {
        let mut chart = ControlChart::new(
            "test".to_string(),
            "char".to_string(),
            ChartType::XbarR,
            "test".to_string(),
        );
        if let Some(s) = spec {
            chart = chart.with_spec_limits(s);
        }
        for row in rows {
            chart.add_subgroup(Subgroup::from_values(row)).unwrap();
        }
        chart
    }

    #[test]
    fn test_capability_requires_spec_limits() {
        let chart = xbar_r_chart(None, &[&[9.9, 10.0, 10.1], &[10.0, 10.1, 10.2]]);
        let err = capability(&chart).unwrap_err();
        assert!(matches!(err, ChartError::MissingSpecLimits));
    }

    #[test]
    fn test_capability_requires_two_subgroups() {
        let chart = xbar_r_chart(
            Some(SpecLimits::two_sided(11.0, 9.0).unwrap()),
            &[&[9.9, 10.0, 10.1]],
        );
        let err = capability(&chart).unwrap_err();
        assert!(matches!(err, ChartError::InsufficientData(1)));
    }

    #[test]
    fn test_capability_rejects_attribute_charts() {
        let mut chart = ControlChart::new(
            "test".to_string(),
            "char".to_string(),
            ChartType::C,
            "test".to_string(),
        );
        chart.add_subgroup(Subgroup::from_values(&[3.0])).unwrap();
        chart.add_subgroup(Subgroup::from_values(&[4.0])).unwrap();
        chart.spec_limits = Some(SpecLimits::two_sided(10.0, 0.0).unwrap());

        let err = capability(&chart).unwrap_err();
        assert!(matches!(err, ChartError::UnsupportedChartType { .. }));
    }

    #[test]
    fn test_exact_indices_from_known_sigma() {
        // Subgroups of 2 with constant range 1.128 = d2(2), so
        // sigma_within = 1.0 exactly. Means alternate around 5.0.
        let chart = xbar_r_chart(
            Some(SpecLimits::two_sided(10.0, 0.0).unwrap()),
            &[
                &[4.436, 5.564],
                &[4.436, 5.564],
                &[4.436, 5.564],
                &[4.436, 5.564],
            ],
        );
        let study = capability(&chart).unwrap();

        assert!((study.sigma_within - 1.0).abs() < 1e-9);
        assert!((study.mean - 5.0).abs() < 1e-9);

        // Cp = 10 / 6, Cpu = Cpl = 5/3, Cpk = 5/3.
        assert!((study.cp.unwrap() - 10.0 / 6.0).abs() < 1e-9);
        assert!((study.cpk.unwrap() - 5.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_cpk_tracks_nearest_limit() {
        // Mean pushed toward the USL: Cpk = Cpu < Cpl.
        let chart = xbar_r_chart(
            Some(SpecLimits::two_sided(10.0, 0.0).unwrap()),
            &[
                &[7.436, 8.564],
                &[7.436, 8.564],
                &[7.436, 8.564],
            ],
        );
        let study = capability(&chart).unwrap();

        let cpu: f64 = (10.0 - 8.0) / 3.0;
        let cpl: f64 = (8.0 - 0.0) / 3.0;
        assert!((study.cpk.unwrap() - cpu.min(cpl)).abs() < 1e-9);
        assert!((study.cpk.unwrap() - cpu).abs() < 1e-9);
    }

    #[test]
    fn test_zero_sigma_is_indeterminate_sentinel() {
        // Constant process: R-bar = 0 and overall sd = 0. All indices
        // are None, not infinity, and nothing panics.
        let chart = xbar_r_chart(
            Some(SpecLimits::two_sided(11.0, 9.0).unwrap()),
            &[&[10.0, 10.0, 10.0], &[10.0, 10.0, 10.0]],
        );
        let study = capability(&chart).unwrap();

        assert!(study.is_indeterminate());
        assert!(study.cp.is_none());
        assert!(study.cpk.is_none());
        assert!(study.pp.is_none());
        assert!(study.ppk.is_none());
    }

    #[test]
    fn test_one_sided_spec() {
        let chart = xbar_r_chart(
            Some(SpecLimits::new(Some(10.0), None).unwrap()),
            &[&[4.436, 5.564], &[4.436, 5.564]],
        );
        let study = capability(&chart).unwrap();

        assert!(study.cp.is_none(), "Cp requires both limits");
        assert!(study.cpk.is_some(), "Cpk is the one-sided index");
        assert!((study.cpk.unwrap() - 5.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_pp_uses_overall_sigma() {
        // Subgroup means drift, so overall sigma exceeds within sigma
        // and Pp < Cp.
        let chart = xbar_r_chart(
            Some(SpecLimits::two_sided(10.0, 0.0).unwrap()),
            &[
                &[3.436, 4.564],
                &[4.436, 5.564],
                &[5.436, 6.564],
                &[6.436, 7.564],
            ],
        );
        let study = capability(&chart).unwrap();

        assert!(study.sigma_overall > study.sigma_within);
        assert!(study.pp.unwrap() < study.cp.unwrap());
    }

    #[test]
    fn test_individuals_sigma_from_moving_range() {
        let mut chart = ControlChart::new(
            "test".to_string(),
            "char".to_string(),
            ChartType::Individuals,
            "test".to_string(),
        )
        .with_spec_limits(SpecLimits::two_sided(110.0, 90.0).unwrap());
        for v in [99.0, 101.0, 99.0, 101.0] {
            chart.add_subgroup(Subgroup::from_values(&[v])).unwrap();
        }

        let study = capability(&chart).unwrap();
        // MR-bar = 2, sigma_within = 2 / 1.128.
        assert!((study.sigma_within - 2.0 / 1.128).abs() < 1e-9);
        assert!(study.cp.is_some());
    }
}
