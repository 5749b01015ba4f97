//! Per-chart-type statistic and limit strategies.
//!
//! Each chart type carries genuinely different formulas: variables charts
//! use the tabulated range/standard-deviation factors, attribute charts
//! use binomial or Poisson limits. The strategy is selected by the
//! chart's type tag; nothing here branches on data shape at computation
//! time.
//!
//! # References
//!
//! - Montgomery, D.C. (2019). *Introduction to Statistical Quality
//!   Control*, 8th ed., Chapters 6-7.
//! - ASTM E2587 — Standard Practice for Use of Control Charts.

use super::chart::{ChartLimits, ChartType, ControlLimits, Subgroup};
use super::factors;
use super::stats;
use super::ChartError;

/// Allowed subgroup sizes per chart type: factor-based charts are bound
/// by the factor tables, individuals and c charts take one value per
/// subgroup, attribute proportions need at least one unit.
pub(crate) fn subgroup_size_bounds(chart_type: ChartType) -> (usize, usize) {
    match chart_type {
        ChartType::XbarR | ChartType::XbarS => (factors::MIN_SUBGROUP, factors::MAX_SUBGROUP),
        ChartType::Individuals | ChartType::C => (1, 1),
        ChartType::P | ChartType::Np | ChartType::U => (1, usize::MAX),
    }
}

/// Whether the chart's measurements are defect counts (must be >= 0)
pub(crate) fn takes_counts(chart_type: ChartType) -> bool {
    matches!(chart_type, ChartType::C | ChartType::U)
}

/// Whether the chart monitors continuous measurements. Capability
/// analysis is only defined for these.
pub(crate) fn is_variables(chart_type: ChartType) -> bool {
    matches!(
        chart_type,
        ChartType::XbarR | ChartType::XbarS | ChartType::Individuals
    )
}

/// The primary statistic plotted for one subgroup
pub(crate) fn statistic(chart_type: ChartType, sg: &Subgroup) -> f64 {
    match chart_type {
        ChartType::XbarR | ChartType::XbarS => stats::mean(&sg.values()),
        ChartType::Individuals | ChartType::C => sg.values()[0],
        ChartType::P => sg.defectives() as f64 / sg.size() as f64,
        ChartType::Np => sg.defectives() as f64,
        // Defects per unit over the subgroup's units
        ChartType::U => stats::mean(&sg.values()),
    }
}

/// Compute limits for the chart's full subgroup history.
pub(crate) fn compute_limits(
    chart_type: ChartType,
    subgroups: &[Subgroup],
) -> Result<ChartLimits, ChartError> {
    if subgroups.len() < 2 {
        return Err(ChartError::InsufficientData(subgroups.len()));
    }

    let limits = match chart_type {
        ChartType::XbarR => xbar_r_limits(subgroups),
        ChartType::XbarS => xbar_s_limits(subgroups),
        ChartType::Individuals => individuals_limits(subgroups),
        ChartType::P => p_limits(subgroups),
        ChartType::Np => np_limits(subgroups),
        ChartType::C => c_limits(subgroups),
        ChartType::U => u_limits(subgroups),
    };
    Ok(limits)
}

/// X-bar-R: X-bar limits from A2·R-bar, R limits from D3/D4.
fn xbar_r_limits(subgroups: &[Subgroup]) -> ChartLimits {
    let n = subgroups[0].size();
    let means: Vec<f64> = subgroups.iter().map(|sg| stats::mean(&sg.values())).collect();
    let ranges: Vec<f64> = subgroups.iter().map(|sg| stats::range(&sg.values())).collect();

    let grand_mean = stats::mean(&means);
    let r_bar = stats::mean(&ranges);

    let a2 = factors::a2(n);
    ChartLimits {
        primary: ControlLimits {
            ucl: grand_mean + a2 * r_bar,
            cl: grand_mean,
            lcl: grand_mean - a2 * r_bar,
        },
        secondary: Some(ControlLimits {
            ucl: factors::d4(n) * r_bar,
            cl: r_bar,
            lcl: (factors::d3(n) * r_bar).max(0.0),
        }),
    }
}

/// X-bar-S: X-bar limits from A3·S-bar, S limits from B3/B4.
fn xbar_s_limits(subgroups: &[Subgroup]) -> ChartLimits {
    let n = subgroups[0].size();
    let means: Vec<f64> = subgroups.iter().map(|sg| stats::mean(&sg.values())).collect();
    let sds: Vec<f64> = subgroups
        .iter()
        .map(|sg| stats::sample_std_dev(&sg.values()))
        .collect();

    let grand_mean = stats::mean(&means);
    let s_bar = stats::mean(&sds);

    let a3 = factors::a3(n);
    ChartLimits {
        primary: ControlLimits {
            ucl: grand_mean + a3 * s_bar,
            cl: grand_mean,
            lcl: grand_mean - a3 * s_bar,
        },
        secondary: Some(ControlLimits {
            ucl: factors::b4(n) * s_bar,
            cl: s_bar,
            lcl: (factors::b3(n) * s_bar).max(0.0),
        }),
    }
}

/// Individuals: I limits from E2·MR-bar, MR limits from D4(2).
fn individuals_limits(subgroups: &[Subgroup]) -> ChartLimits {
    let values: Vec<f64> = subgroups.iter().map(|sg| sg.values()[0]).collect();
    let moving_ranges: Vec<f64> = values.windows(2).map(|w| (w[1] - w[0]).abs()).collect();

    let x_bar = stats::mean(&values);
    let mr_bar = stats::mean(&moving_ranges);

    ChartLimits {
        primary: ControlLimits {
            ucl: x_bar + factors::E2 * mr_bar,
            cl: x_bar,
            lcl: x_bar - factors::E2 * mr_bar,
        },
        secondary: Some(ControlLimits {
            ucl: factors::D4_MR * mr_bar,
            cl: mr_bar,
            lcl: 0.0,
        }),
    }
}

/// P chart: binomial limits around the pooled fraction defective.
fn p_limits(subgroups: &[Subgroup]) -> ChartLimits {
    let n = subgroups[0].size() as f64;
    let total_defectives: usize = subgroups.iter().map(|sg| sg.defectives()).sum();
    let total_inspected: usize = subgroups.iter().map(|sg| sg.size()).sum();
    let p_bar = total_defectives as f64 / total_inspected as f64;

    let sigma = (p_bar * (1.0 - p_bar) / n).sqrt();
    ChartLimits {
        primary: ControlLimits {
            ucl: (p_bar + 3.0 * sigma).min(1.0),
            cl: p_bar,
            lcl: (p_bar - 3.0 * sigma).max(0.0),
        },
        secondary: None,
    }
}

/// NP chart: binomial limits around the mean defective count.
fn np_limits(subgroups: &[Subgroup]) -> ChartLimits {
    let n = subgroups[0].size() as f64;
    let total_defectives: usize = subgroups.iter().map(|sg| sg.defectives()).sum();
    let total_inspected: usize = subgroups.iter().map(|sg| sg.size()).sum();
    let p_bar = total_defectives as f64 / total_inspected as f64;
    let np_bar = n * p_bar;

    let sigma = (np_bar * (1.0 - p_bar)).sqrt();
    ChartLimits {
        primary: ControlLimits {
            ucl: np_bar + 3.0 * sigma,
            cl: np_bar,
            lcl: (np_bar - 3.0 * sigma).max(0.0),
        },
        secondary: None,
    }
}

/// C chart: Poisson limits around the mean defect count per unit.
fn c_limits(subgroups: &[Subgroup]) -> ChartLimits {
    let counts: Vec<f64> = subgroups.iter().map(|sg| sg.values()[0]).collect();
    let c_bar = stats::mean(&counts);

    let sigma = c_bar.sqrt();
    ChartLimits {
        primary: ControlLimits {
            ucl: c_bar + 3.0 * sigma,
            cl: c_bar,
            lcl: (c_bar - 3.0 * sigma).max(0.0),
        },
        secondary: None,
    }
}

/// U chart: Poisson limits around the pooled defects-per-unit rate.
fn u_limits(subgroups: &[Subgroup]) -> ChartLimits {
    let n = subgroups[0].size() as f64;
    let total_defects: f64 = subgroups.iter().flat_map(|sg| sg.values()).sum();
    let total_units: usize = subgroups.iter().map(|sg| sg.size()).sum();
    let u_bar = total_defects / total_units as f64;

    let sigma = (u_bar / n).sqrt();
    ChartLimits {
        primary: ControlLimits {
            ucl: u_bar + 3.0 * sigma,
            cl: u_bar,
            lcl: (u_bar - 3.0 * sigma).max(0.0),
        },
        secondary: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spc::chart::Measurement;

    fn subgroups_from(rows: &[&[f64]]) -> Vec<Subgroup> {
        rows.iter().map(|r| Subgroup::from_values(r)).collect()
    }

    #[test]
    fn test_xbar_r_reference_factors_n5() {
        // Two identical subgroups with mean 50 and range 10:
        // UCL = 50 + 0.577·10, LCL = 50 - 0.577·10.
        let sgs = subgroups_from(&[
            &[45.0, 47.0, 50.0, 53.0, 55.0],
            &[45.0, 47.0, 50.0, 53.0, 55.0],
        ]);
        let limits = compute_limits(ChartType::XbarR, &sgs).unwrap();

        assert!((limits.primary.cl - 50.0).abs() < f64::EPSILON);
        assert!((limits.primary.ucl - 55.77).abs() < 0.01);
        assert!((limits.primary.lcl - 44.23).abs() < 0.01);

        let r = limits.secondary.unwrap();
        assert!((r.cl - 10.0).abs() < f64::EPSILON);
        assert!((r.ucl - 21.14).abs() < 0.01);
        assert!((r.lcl - 0.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_xbar_r_constant_values_collapse_limits() {
        // R-bar = 0: UCL = LCL = CL = grand mean.
        let sgs = subgroups_from(&[&[10.0, 10.0, 10.0], &[10.0, 10.0, 10.0]]);
        let limits = compute_limits(ChartType::XbarR, &sgs).unwrap();
        assert!((limits.primary.ucl - 10.0).abs() < f64::EPSILON);
        assert!((limits.primary.cl - 10.0).abs() < f64::EPSILON);
        assert!((limits.primary.lcl - 10.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_insufficient_data() {
        let sgs = subgroups_from(&[&[1.0, 2.0, 3.0]]);
        let err = compute_limits(ChartType::XbarR, &sgs).unwrap_err();
        assert!(matches!(err, ChartError::InsufficientData(1)));
    }

    #[test]
    fn test_xbar_s_limits_ordering() {
        let sgs = subgroups_from(&[
            &[72.0, 84.0, 79.0, 49.0],
            &[56.0, 87.0, 33.0, 42.0],
            &[55.0, 73.0, 22.0, 60.0],
        ]);
        let limits = compute_limits(ChartType::XbarS, &sgs).unwrap();
        assert!(limits.primary.ucl > limits.primary.cl);
        assert!(limits.primary.cl > limits.primary.lcl);

        let s = limits.secondary.unwrap();
        assert!(s.ucl > s.cl);
        assert!(s.lcl >= 0.0);
    }

    #[test]
    fn test_individuals_e2_factor() {
        // Two observations: X-bar = 100, MR-bar = 10.
        // UCL = 100 + 2.660·10, LCL = 100 - 2.660·10.
        let sgs = subgroups_from(&[&[95.0], &[105.0]]);
        let limits = compute_limits(ChartType::Individuals, &sgs).unwrap();
        assert!((limits.primary.cl - 100.0).abs() < f64::EPSILON);
        assert!((limits.primary.ucl - 126.6).abs() < 0.1);
        assert!((limits.primary.lcl - 73.4).abs() < 0.1);

        let mr = limits.secondary.unwrap();
        assert!((mr.cl - 10.0).abs() < f64::EPSILON);
        assert!((mr.lcl - 0.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_p_chart_limits() {
        // 2 defectives in 100 across two subgroups of 50: p-bar = 0.02.
        let make = |defectives: usize| {
            Subgroup::new(
                (0..50)
                    .map(|i| {
                        if i < defectives {
                            Measurement::nonconforming(0.0)
                        } else {
                            Measurement::conforming(1.0)
                        }
                    })
                    .collect(),
            )
        };
        let sgs = vec![make(1), make(1)];
        let limits = compute_limits(ChartType::P, &sgs).unwrap();

        assert!((limits.primary.cl - 0.02).abs() < 1e-12);
        let sigma = (0.02_f64 * 0.98 / 50.0).sqrt();
        assert!((limits.primary.ucl - (0.02 + 3.0 * sigma)).abs() < 1e-12);
        // LCL would be negative; clamped to zero.
        assert!((limits.primary.lcl - 0.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_np_chart_statistic_and_limits() {
        let sg = Subgroup::new(
            (0..50)
                .map(|i| {
                    if i < 3 {
                        Measurement::nonconforming(0.0)
                    } else {
                        Measurement::conforming(1.0)
                    }
                })
                .collect(),
        );
        assert!((statistic(ChartType::Np, &sg) - 3.0).abs() < f64::EPSILON);

        let sgs = vec![sg.clone(), sg];
        let limits = compute_limits(ChartType::Np, &sgs).unwrap();
        assert!((limits.primary.cl - 3.0).abs() < 1e-12);
        assert!(limits.primary.lcl >= 0.0);
    }

    #[test]
    fn test_c_chart_poisson_limits() {
        // Counts 4 and 6: c-bar = 5, UCL = 5 + 3·sqrt(5).
        let sgs = subgroups_from(&[&[4.0], &[6.0]]);
        let limits = compute_limits(ChartType::C, &sgs).unwrap();
        assert!((limits.primary.cl - 5.0).abs() < f64::EPSILON);
        assert!((limits.primary.ucl - (5.0 + 3.0 * 5.0_f64.sqrt())).abs() < 1e-12);
        assert!((limits.primary.lcl - 0.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_u_chart_rate_limits() {
        // Two subgroups of 4 units, 8 defects total: u-bar = 1.0.
        let sgs = subgroups_from(&[&[1.0, 2.0, 0.0, 1.0], &[2.0, 0.0, 1.0, 1.0]]);
        let limits = compute_limits(ChartType::U, &sgs).unwrap();
        assert!((limits.primary.cl - 1.0).abs() < 1e-12);
        let sigma = (1.0_f64 / 4.0).sqrt();
        assert!((limits.primary.ucl - (1.0 + 3.0 * sigma)).abs() < 1e-12);
    }

    #[test]
    fn test_statistic_per_type() {
        let sg = Subgroup::from_values(&[2.0, 4.0, 6.0]);
        assert!((statistic(ChartType::XbarR, &sg) - 4.0).abs() < f64::EPSILON);
        assert!((statistic(ChartType::U, &sg) - 4.0).abs() < f64::EPSILON);

        let single = Subgroup::from_values(&[7.0]);
        assert!((statistic(ChartType::Individuals, &single) - 7.0).abs() < f64::EPSILON);
        assert!((statistic(ChartType::C, &single) - 7.0).abs() < f64::EPSILON);
    }
}
