//! ANSI/ASQ Z1.4 code tables for single and double acceptance sampling.
//!
//! Two lookups drive plan resolution: lot-size range + inspection level
//! gives a sample size code letter, and (code letter, AQL) gives the
//! sample size and accept/reject numbers from the normal-inspection
//! master table. Cells the master table leaves empty carry arrows in the
//! printed standard; `single_plan` resolves them the same way an
//! inspector would: follow the column to the nearest plan, taking that
//! plan's sample size with it.
//!
//! All lookups live behind the [`CodeTables`] trait so a different table
//! edition (tightened or reduced regimes, a corporate deviation) can be
//! plugged in without touching the decision logic. [`Z14Tables`] is the
//! shipped edition.
//!
//! # References
//!
//! - ANSI/ASQ Z1.4 — Sampling Procedures and Tables for Inspection by
//!   Attributes (Tables I, II-A, III-A).
//! - Montgomery, D.C. (2019). *Introduction to Statistical Quality
//!   Control*, 8th ed., Chapter 15.

use super::plan::{InspectionLevel, SampleSizeResult};
use super::SamplingError;

/// Sample size code letters in table order. I and O are skipped by the
/// standard to avoid confusion with 1 and 0.
pub const CODE_LETTERS: [char; 16] = [
    'A', 'B', 'C', 'D', 'E', 'F', 'G', 'H', 'J', 'K', 'L', 'M', 'N', 'P', 'Q', 'R',
];

/// Single sampling sample sizes, indexed by code letter.
const SAMPLE_SIZE: [u32; 16] = [
    2, 3, 5, 8, 13, 20, 32, 50, 80, 125, 200, 315, 500, 800, 1250, 2000,
];

/// Lot-size ranges (inclusive). Together the ranges cover every positive
/// lot size; a gap would be a defect in the table data, not a user error.
const LOT_RANGES: [(u64, u64); 15] = [
    (1, 8),
    (9, 15),
    (16, 25),
    (26, 50),
    (51, 90),
    (91, 150),
    (151, 280),
    (281, 500),
    (501, 1_200),
    (1_201, 3_200),
    (3_201, 10_000),
    (10_001, 35_000),
    (35_001, 150_000),
    (150_001, 500_000),
    (500_001, u64::MAX),
];

/// Code letter index per lot-size range row, one column per inspection
/// level in the order S1, S2, S3, S4, I, II, III (Z1.4 Table I).
const CODE_BY_RANGE: [[usize; 7]; 15] = [
    [0, 0, 0, 0, 0, 0, 1], // 1-8
    [0, 0, 0, 0, 0, 1, 2], // 9-15
    [0, 0, 1, 1, 1, 2, 3], // 16-25
    [0, 1, 1, 2, 2, 3, 4], // 26-50
    [1, 1, 2, 2, 2, 4, 5], // 51-90
    [1, 1, 2, 3, 3, 5, 6], // 91-150
    [1, 2, 3, 4, 4, 6, 7], // 151-280
    [1, 2, 3, 4, 5, 7, 8], // 281-500
    [2, 2, 4, 5, 6, 8, 9], // 501-1200
    [2, 3, 4, 6, 7, 9, 10], // 1201-3200
    [2, 3, 5, 6, 8, 10, 11], // 3201-10000
    [2, 3, 5, 7, 9, 11, 12], // 10001-35000
    [3, 4, 6, 8, 10, 12, 13], // 35001-150000
    [3, 4, 6, 8, 11, 13, 14], // 150001-500000
    [3, 4, 7, 9, 12, 14, 15], // 500001+
];

/// Standard AQL steps carried by the master table, in percent.
pub const AQL_STEPS: [f64; 11] = [
    0.065, 0.10, 0.15, 0.25, 0.40, 0.65, 1.0, 1.5, 2.5, 4.0, 6.5,
];

/// Code letter index of each AQL column's Ac=0 cell. The remaining plans
/// of the column sit two or more letters below it (see `AC_SEQUENCE`).
const AC0_CODE: [usize; 11] = [11, 10, 9, 8, 7, 6, 5, 4, 3, 2, 1];

/// Accept numbers down a column after the Ac=0 cell. Reject numbers are
/// Ac + 1 throughout the single normal table.
const AC_SEQUENCE: [u32; 8] = [1, 2, 3, 5, 7, 10, 14, 21];

/// Double sampling accept/reject pairs, keyed by the single plan's accept
/// number: (ac1, re1, ac2, re2). Cumulative counts apply at stage two.
const DOUBLE_PAIRS: [(u32, (u32, u32, u32, u32)); 8] = [
    (1, (0, 2, 1, 2)),
    (2, (0, 3, 3, 4)),
    (3, (1, 4, 4, 5)),
    (5, (2, 5, 6, 7)),
    (7, (3, 7, 8, 9)),
    (10, (5, 9, 12, 13)),
    (14, (7, 11, 18, 19)),
    (21, (11, 16, 26, 27)),
];

/// A resolved double sampling plan: first sample of `n1`, and when the
/// first stage is inconclusive, a second sample of `n2` judged on the
/// cumulative defect count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DoubleSamplingPlan {
    pub n1: u32,
    pub ac1: u32,
    pub re1: u32,
    pub n2: u32,
    pub ac2: u32,
    pub re2: u32,
}

/// Code-table lookups behind a trait so a different edition can be
/// injected. All methods are pure: identical inputs give identical
/// results.
pub trait CodeTables {
    /// Resolve the sample size code letter for a lot size.
    fn code_for(&self, level: InspectionLevel, lot_size: u64) -> Result<char, SamplingError>;

    /// Resolve the single sampling plan for a code letter and AQL,
    /// following the master table's arrows where the cell is empty. The
    /// returned result carries the effective code letter, which may
    /// differ from the requested one.
    fn single_plan(&self, code: char, aql: f64) -> Result<SampleSizeResult, SamplingError>;

    /// Resolve the matching double sampling plan, or `None` where the
    /// standard provides no double plan (single Ac = 0 cells).
    fn double_plan(
        &self,
        code: char,
        aql: f64,
    ) -> Result<Option<DoubleSamplingPlan>, SamplingError>;
}

/// The shipped ANSI/ASQ Z1.4 normal-inspection edition.
#[derive(Debug, Default, Clone, Copy)]
pub struct Z14Tables;

fn code_index(code: char) -> Result<usize, SamplingError> {
    CODE_LETTERS
        .iter()
        .position(|&c| c == code.to_ascii_uppercase())
        .ok_or(SamplingError::UnknownCode(code))
}

fn aql_index(aql: f64) -> Result<usize, SamplingError> {
    AQL_STEPS
        .iter()
        .position(|&step| (step - aql).abs() < 1e-9)
        .ok_or(SamplingError::UnknownAql(aql))
}

/// Resolve a master-table cell to (effective code index, ac).
fn resolve_cell(code_idx: usize, aql_idx: usize) -> (usize, u32) {
    let base = AC0_CODE[aql_idx];

    if code_idx <= base {
        // Above the first plan of the column: arrow down to the Ac=0 cell.
        return (base, 0);
    }
    if code_idx == base + 1 {
        // The empty cell between Ac=0 and Ac=1: arrow down to Ac=1.
        return (base + 2, 1);
    }

    let seq_idx = code_idx - (base + 2);
    let last_seq = AC_SEQUENCE.len() - 1;
    let last_code = (base + 2 + last_seq).min(CODE_LETTERS.len() - 1);

    if seq_idx <= last_seq && code_idx <= last_code {
        (code_idx, AC_SEQUENCE[seq_idx])
    } else {
        // Below the last plan of the column: arrow up to it.
        (last_code, AC_SEQUENCE[last_code - (base + 2)])
    }
}

impl CodeTables for Z14Tables {
    fn code_for(&self, level: InspectionLevel, lot_size: u64) -> Result<char, SamplingError> {
        if lot_size == 0 {
            return Err(SamplingError::EmptyLot);
        }

        let row = LOT_RANGES
            .iter()
            .position(|&(min, max)| lot_size >= min && lot_size <= max)
            .ok_or(SamplingError::TableGap { level, lot_size })?;

        Ok(CODE_LETTERS[CODE_BY_RANGE[row][level.column()]])
    }

    fn single_plan(&self, code: char, aql: f64) -> Result<SampleSizeResult, SamplingError> {
        let code_idx = code_index(code)?;
        let aql_idx = aql_index(aql)?;
        let (effective, ac) = resolve_cell(code_idx, aql_idx);

        Ok(SampleSizeResult {
            code: CODE_LETTERS[effective],
            sample_size: SAMPLE_SIZE[effective],
            accept_number: ac,
            reject_number: ac + 1,
        })
    }

    fn double_plan(
        &self,
        code: char,
        aql: f64,
    ) -> Result<Option<DoubleSamplingPlan>, SamplingError> {
        let code_idx = code_index(code)?;
        let aql_idx = aql_index(aql)?;
        let (effective, ac) = resolve_cell(code_idx, aql_idx);

        if ac == 0 {
            // The standard marks these cells "use single sampling".
            return Ok(None);
        }

        let (_, (ac1, re1, ac2, re2)) = DOUBLE_PAIRS
            .iter()
            .copied()
            .find(|&(single_ac, _)| single_ac == ac)
            .expect("every nonzero accept number has a double pair");

        // Double sample sizes are one code letter smaller than the single
        // plan's (Z1.4 Table III-A).
        let n = SAMPLE_SIZE[effective - 1];

        Ok(Some(DoubleSamplingPlan {
            n1: n,
            ac1,
            re1,
            n2: n,
            ac2,
            re2,
        }))
    }
}
