//! Disposition workflow engine for NCR status transitions
//!
//! Provides transition validation and the lifecycle operations that
//! mutate an NCR. Every state change goes through here: no transition
//! skips a state, and nothing moves backward except into `cancelled`.

use chrono::Utc;
use thiserror::Error;

use crate::core::identity::EntityId;
use crate::core::provider::{
    CorrectiveActionProvider, NotificationSink, ProviderError, QualityEvent,
};
use crate::entities::ncr::{
    AffectedItem, Containment, Defect, Disposition, Ncr, NcrSeverity, NcrSource, NcrStatus,
};
use crate::core::entity::Entity;
use crate::spc::Violation;

/// Errors that can occur during NCR workflow operations
#[derive(Debug, Error)]
pub enum NcrError {
    #[error("invalid status transition: {from} → {attempted} (allowed: {allowed})")]
    StateTransition {
        from: NcrStatus,
        attempted: NcrStatus,
        allowed: String,
    },

    #[error("a reviewer must be assigned to begin review")]
    MissingReviewer,

    #[error("a disposition requires a justification")]
    MissingJustification,

    #[error("a disposition requires an approver")]
    MissingApprover,

    #[error("disposition '{0}' requires the reinspection flag to be set")]
    ReinspectionFlagRequired(crate::entities::ncr::DispositionDecision),

    #[error("linked corrective action {0} is not verified effective")]
    CorrectiveActionIncomplete(EntityId),

    #[error("cancellation requires a reason")]
    MissingCancellationReason,

    #[error(transparent)]
    Provider(#[from] ProviderError),
}

/// A reject or out-of-control finding that opens an NCR
#[derive(Debug, Clone)]
pub enum QualitySignal {
    /// A lot failed acceptance sampling
    LotRejected {
        product: String,
        characteristic: String,
        lot_number: String,
        defects: u32,
        severity: NcrSeverity,
        affected_items: Vec<AffectedItem>,
        source: NcrSource,
    },

    /// A control chart reported out-of-control findings
    OutOfControl {
        chart_id: EntityId,
        characteristic: String,
        violations: Vec<Violation>,
        severity: NcrSeverity,
        affected_items: Vec<AffectedItem>,
    },
}

/// Workflow engine for NCR lifecycle transitions
pub struct DispositionEngine<'a> {
    sink: &'a dyn NotificationSink,
}

impl<'a> DispositionEngine<'a> {
    /// Create an engine that emits events to the given sink
    pub fn new(sink: &'a dyn NotificationSink) -> Self {
        Self { sink }
    }

    /// Check if a status transition is valid
    pub fn is_valid_transition(&self, from: NcrStatus, to: NcrStatus) -> bool {
        matches!(
            (from, to),
            // Forward transitions
            (NcrStatus::Open, NcrStatus::UnderReview)
                | (NcrStatus::UnderReview, NcrStatus::Dispositioned)
                | (NcrStatus::Dispositioned, NcrStatus::Closed)
                // Cancellation, before a disposition authorizes material
                // movement
                | (NcrStatus::Open, NcrStatus::Cancelled)
                | (NcrStatus::UnderReview, NcrStatus::Cancelled)
        )
    }

    /// Get allowed transitions from the current status
    pub fn allowed_transitions(&self, current: NcrStatus) -> Vec<NcrStatus> {
        match current {
            NcrStatus::Open => vec![NcrStatus::UnderReview, NcrStatus::Cancelled],
            NcrStatus::UnderReview => vec![NcrStatus::Dispositioned, NcrStatus::Cancelled],
            NcrStatus::Dispositioned => vec![NcrStatus::Closed],
            NcrStatus::Closed => vec![],
            NcrStatus::Cancelled => vec![],
        }
    }

    fn check_transition(&self, from: NcrStatus, to: NcrStatus) -> Result<(), NcrError> {
        if self.is_valid_transition(from, to) {
            return Ok(());
        }
        let allowed = self
            .allowed_transitions(from)
            .iter()
            .map(|s| s.to_string())
            .collect::<Vec<_>>()
            .join(", ");
        Err(NcrError::StateTransition {
            from,
            attempted: to,
            allowed: if allowed.is_empty() {
                "none".to_string()
            } else {
                allowed
            },
        })
    }

    /// Open an NCR from a quality signal.
    ///
    /// Critical severity atomically records an auto-quarantine
    /// containment over every affected item as part of construction;
    /// there is no observable NCR state with a critical defect and no
    /// containment. Notification delivery is fire-and-forget.
    pub fn open_from_signal(&self, signal: QualitySignal, author: &str) -> Ncr {
        let (title, source, defect, affected_items, trigger) = match signal {
            QualitySignal::LotRejected {
                product,
                characteristic,
                lot_number,
                defects,
                severity,
                affected_items,
                source,
            } => (
                format!("Lot {lot_number} rejected: {characteristic}"),
                source,
                Defect::new(
                    "acceptance_sampling",
                    format!(
                        "{defects} nonconforming unit(s) of {product}/{characteristic} in lot {lot_number}"
                    ),
                    severity,
                ),
                affected_items,
                Some(format!("lot:{lot_number}")),
            ),
            QualitySignal::OutOfControl {
                chart_id,
                characteristic,
                violations,
                severity,
                affected_items,
            } => {
                let summary = violations
                    .iter()
                    .map(|v| v.rule.to_string())
                    .collect::<Vec<_>>()
                    .join(", ");
                (
                    format!("Out-of-control signal: {characteristic}"),
                    NcrSource::Production,
                    Defect::new(
                        "process_control",
                        format!("{} violation(s) on {chart_id}: {summary}", violations.len()),
                        severity,
                    ),
                    affected_items,
                    Some(chart_id.to_string()),
                )
            }
        };

        let mut ncr = Ncr::new(title, source, defect, affected_items, author.to_string());
        ncr.trigger = trigger;

        if ncr.severity() == NcrSeverity::Critical {
            for item in &mut ncr.affected_items {
                item.quarantined = true;
            }
            ncr.containment = Some(Containment {
                action: "auto-quarantine".to_string(),
                implemented_by: "system".to_string(),
                implemented_at: Utc::now(),
            });
        }

        self.sink.notify(&QualityEvent::NcrOpened {
            ncr_id: ncr.id.clone(),
            severity: ncr.severity(),
            title: ncr.title.clone(),
        });

        if ncr.severity() == NcrSeverity::Critical {
            self.sink.notify(&QualityEvent::CriticalQuarantine {
                ncr_id: ncr.id.clone(),
                items: ncr
                    .affected_items
                    .iter()
                    .map(|i| i.identifier.clone())
                    .collect(),
            });
        }

        ncr
    }

    /// Open → UnderReview. Requires an assigned reviewer.
    pub fn begin_review(&self, ncr: &mut Ncr, reviewer: &str) -> Result<(), NcrError> {
        self.check_transition(ncr.status, NcrStatus::UnderReview)?;
        if reviewer.trim().is_empty() {
            return Err(NcrError::MissingReviewer);
        }

        ncr.reviewer = Some(reviewer.to_string());
        ncr.status = NcrStatus::UnderReview;
        ncr.bump_version();
        Ok(())
    }

    /// UnderReview → Dispositioned. Rework and repair decisions must
    /// carry the reinspection flag; a missing flag is a validation
    /// failure, not a silent default.
    pub fn disposition(&self, ncr: &mut Ncr, disposition: Disposition) -> Result<(), NcrError> {
        self.check_transition(ncr.status, NcrStatus::Dispositioned)?;
        if disposition.justification.trim().is_empty() {
            return Err(NcrError::MissingJustification);
        }
        if disposition.approver.trim().is_empty() {
            return Err(NcrError::MissingApprover);
        }
        if disposition.decision.requires_reinspection() && !disposition.reinspection_required {
            return Err(NcrError::ReinspectionFlagRequired(disposition.decision));
        }

        ncr.disposition = Some(disposition);
        ncr.status = NcrStatus::Dispositioned;
        ncr.bump_version();
        Ok(())
    }

    /// Dispositioned → Closed. A linked corrective action must be
    /// verified effective before the NCR can close.
    pub fn close(
        &self,
        ncr: &mut Ncr,
        capa_provider: &dyn CorrectiveActionProvider,
    ) -> Result<(), NcrError> {
        self.check_transition(ncr.status, NcrStatus::Closed)?;

        if let Some(capa_id) = &ncr.capa {
            if !capa_provider.verification_effective(capa_id)? {
                return Err(NcrError::CorrectiveActionIncomplete(capa_id.clone()));
            }
        }

        ncr.status = NcrStatus::Closed;
        ncr.bump_version();
        Ok(())
    }

    /// Open or UnderReview → Cancelled. Terminal; requires a reason.
    pub fn cancel(&self, ncr: &mut Ncr, reason: &str) -> Result<(), NcrError> {
        self.check_transition(ncr.status, NcrStatus::Cancelled)?;
        if reason.trim().is_empty() {
            return Err(NcrError::MissingCancellationReason);
        }

        ncr.cancellation_reason = Some(reason.to_string());
        ncr.status = NcrStatus::Cancelled;
        ncr.bump_version();
        Ok(())
    }
}
