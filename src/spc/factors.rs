//! Control chart factor tables, indexed by subgroup size n = 2..=10.
//! Index 0 corresponds to n = 2.
//!
//! All constants are sourced from ASTM E2587 — Standard Practice for Use
//! of Control Charts in Statistical Process Control.

/// A2 factors for X-bar-R chart limits: UCL/LCL = x-double-bar ± A2·R-bar.
const A2: [f64; 9] = [1.880, 1.023, 0.729, 0.577, 0.483, 0.419, 0.373, 0.337, 0.308];

/// D3 factors for the R chart lower limit: LCL_R = D3·R-bar.
const D3: [f64; 9] = [0.0, 0.0, 0.0, 0.0, 0.0, 0.076, 0.136, 0.184, 0.223];

/// D4 factors for the R chart upper limit: UCL_R = D4·R-bar.
const D4: [f64; 9] = [3.267, 2.575, 2.282, 2.114, 2.004, 1.924, 1.864, 1.816, 1.777];

/// d2 factors (mean of the range distribution): sigma-hat = R-bar / d2.
const D2: [f64; 9] = [1.128, 1.693, 2.059, 2.326, 2.534, 2.704, 2.847, 2.970, 3.078];

/// A3 factors for X-bar-S chart limits: UCL/LCL = x-double-bar ± A3·S-bar.
const A3: [f64; 9] = [2.659, 1.954, 1.628, 1.427, 1.287, 1.182, 1.099, 1.032, 0.975];

/// B3 factors for the S chart lower limit: LCL_S = B3·S-bar.
const B3: [f64; 9] = [0.0, 0.0, 0.0, 0.0, 0.030, 0.118, 0.185, 0.239, 0.284];

/// B4 factors for the S chart upper limit: UCL_S = B4·S-bar.
const B4: [f64; 9] = [3.267, 2.568, 2.266, 2.089, 1.970, 1.882, 1.815, 1.761, 1.716];

/// c4 factors for unbiased sigma estimation: sigma-hat = S-bar / c4.
const C4: [f64; 9] = [
    0.7979, 0.8862, 0.9213, 0.9400, 0.9515, 0.9594, 0.9650, 0.9693, 0.9727,
];

/// E2 factor for the individuals chart: UCL/LCL = x-bar ± E2·MR-bar.
/// E2 = 3 / d2(n=2).
pub(crate) const E2: f64 = 2.660;

/// D4 factor for the moving range chart (n = 2 moving range).
pub(crate) const D4_MR: f64 = 3.267;

/// Supported subgroup sizes for factor-based charts.
pub(crate) const MIN_SUBGROUP: usize = 2;
pub(crate) const MAX_SUBGROUP: usize = 10;

pub(crate) fn a2(n: usize) -> f64 {
    A2[n - MIN_SUBGROUP]
}

pub(crate) fn d3(n: usize) -> f64 {
    D3[n - MIN_SUBGROUP]
}

pub(crate) fn d4(n: usize) -> f64 {
    D4[n - MIN_SUBGROUP]
}

pub(crate) fn d2(n: usize) -> f64 {
    D2[n - MIN_SUBGROUP]
}

pub(crate) fn a3(n: usize) -> f64 {
    A3[n - MIN_SUBGROUP]
}

pub(crate) fn b3(n: usize) -> f64 {
    B3[n - MIN_SUBGROUP]
}

pub(crate) fn b4(n: usize) -> f64 {
    B4[n - MIN_SUBGROUP]
}

pub(crate) fn c4(n: usize) -> f64 {
    C4[n - MIN_SUBGROUP]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reference_factors_n5() {
        assert!((a2(5) - 0.577).abs() < f64::EPSILON);
        assert!((d3(5) - 0.0).abs() < f64::EPSILON);
        assert!((d4(5) - 2.114).abs() < f64::EPSILON);
        assert!((d2(5) - 2.326).abs() < f64::EPSILON);
    }

    #[test]
    fn test_e2_matches_d2_of_two() {
        // E2 = 3 / d2(2) = 3 / 1.128
        assert!((E2 - 3.0 / d2(2)).abs() < 0.001);
    }
}
