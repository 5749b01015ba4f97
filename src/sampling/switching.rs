//! Switching-rule regime state, kept per (product, characteristic).
//!
//! The regime is process-wide state that outlives any single lot
//! evaluation, so it is modeled as an explicit keyed record that callers
//! load, update, and persist, never as ambient module state. Updates
//! must be an atomic read-modify-write; the record carries a version
//! counter for the store's optimistic concurrency check.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::plan::SwitchingRules;

/// Inspection regime for a (product, characteristic) process
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[derive(Default)]
pub enum Regime {
    #[default]
    Normal,
    Tightened,
    Reduced,
}

impl std::fmt::Display for Regime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Regime::Normal => write!(f, "normal"),
            Regime::Tightened => write!(f, "tightened"),
            Regime::Reduced => write!(f, "reduced"),
        }
    }
}

/// Key identifying one regime record. Lots for different keys are fully
/// independent.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RegimeKey {
    pub product: String,
    pub characteristic: String,
}

impl RegimeKey {
    pub fn new(product: impl Into<String>, characteristic: impl Into<String>) -> Self {
        Self {
            product: product.into(),
            characteristic: characteristic.into(),
        }
    }

    /// Filesystem-safe slug used as the record's document key
    pub fn slug(&self) -> String {
        let clean = |s: &str| {
            s.chars()
                .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
                .collect::<String>()
        };
        format!("{}__{}", clean(&self.product), clean(&self.characteristic))
    }
}

/// A regime change produced by recording a lot outcome
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegimeShift {
    pub from: Regime,
    pub to: Regime,
}

/// Final lot outcome fed into the switching counters. Indeterminate
/// (second-sample-pending) evaluations never reach here.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LotOutcome {
    Accepted,
    Rejected,
}

/// Per-key switching-rule state, persisted between lots
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegimeRecord {
    pub key: RegimeKey,

    #[serde(default)]
    pub regime: Regime,

    /// Consecutive accepted lots in the current regime
    #[serde(default)]
    pub consecutive_accepts: u32,

    /// Consecutive rejected lots in the current regime
    #[serde(default)]
    pub consecutive_rejects: u32,

    pub updated: DateTime<Utc>,

    /// Document revision for optimistic concurrency
    #[serde(default = "default_version")]
    pub version: u64,
}

fn default_version() -> u64 {
    1
}

impl RegimeRecord {
    /// Create a fresh record at normal inspection
    pub fn new(key: RegimeKey) -> Self {
        Self {
            key,
            regime: Regime::Normal,
            consecutive_accepts: 0,
            consecutive_rejects: 0,
            updated: Utc::now(),
            version: 1,
        }
    }

    /// Record one lot outcome and apply the switching rules. Returns the
    /// regime shift, if the outcome triggered one. Counters reset when
    /// the regime changes.
    pub fn record_outcome(
        &mut self,
        outcome: LotOutcome,
        rules: &SwitchingRules,
    ) -> Option<RegimeShift> {
        let from = self.regime;

        match outcome {
            LotOutcome::Accepted => {
                self.consecutive_accepts += 1;
                self.consecutive_rejects = 0;

                let to = match self.regime {
                    Regime::Normal if self.consecutive_accepts >= rules.to_reduced => {
                        Some(Regime::Reduced)
                    }
                    Regime::Tightened if self.consecutive_accepts >= rules.to_normal => {
                        Some(Regime::Normal)
                    }
                    Regime::Reduced if self.consecutive_accepts >= rules.to_normal => {
                        Some(Regime::Normal)
                    }
                    _ => None,
                };
                self.finish(to, from)
            }
            LotOutcome::Rejected => {
                self.consecutive_rejects += 1;
                self.consecutive_accepts = 0;

                let to = match self.regime {
                    Regime::Normal if self.consecutive_rejects >= rules.to_tightened => {
                        Some(Regime::Tightened)
                    }
                    // A rejection under reduced inspection reinstates
                    // normal immediately.
                    Regime::Reduced => Some(Regime::Normal),
                    _ => None,
                };
                self.finish(to, from)
            }
        }
    }

    fn finish(&mut self, to: Option<Regime>, from: Regime) -> Option<RegimeShift> {
        self.updated = Utc::now();
        self.version += 1;
        let to = to?;
        self.regime = to;
        self.consecutive_accepts = 0;
        self.consecutive_rejects = 0;
        Some(RegimeShift { from, to })
    }
}
