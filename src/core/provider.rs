//! Collaborator traits at the subsystem boundary.
//!
//! The decision engine never fetches, notifies, or verifies anything
//! itself; callers plug these seams with whatever the surrounding
//! application uses.

use std::collections::HashMap;
use std::sync::Mutex;

use thiserror::Error;

use crate::core::identity::EntityId;
use crate::entities::ncr::NcrSeverity;
use crate::entities::plan::InspectionPlan;

/// Errors from collaborator lookups
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("no record found matching '{0}'")]
    NotFound(String),
}

/// Supplies the inspection plan applicable to an inspection. Idempotent
/// read; unknown identifiers fail rather than defaulting.
pub trait InspectionPlanProvider {
    fn plan_for(&self, id: &EntityId) -> Result<InspectionPlan, ProviderError>;
}

/// Reads the verification outcome of an externally-owned corrective
/// action. This subsystem never creates or mutates corrective actions.
pub trait CorrectiveActionProvider {
    /// Whether the corrective action's effectiveness verification passed
    fn verification_effective(&self, id: &EntityId) -> Result<bool, ProviderError>;
}

/// Fixed map of corrective-action verification outcomes. Useful in tests
/// and wherever the real service is consulted up front.
#[derive(Debug, Default)]
pub struct StaticCapaProvider {
    outcomes: HashMap<String, bool>,
}

impl StaticCapaProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_outcome(mut self, id: &EntityId, effective: bool) -> Self {
        self.outcomes.insert(id.to_string(), effective);
        self
    }
}

impl CorrectiveActionProvider for StaticCapaProvider {
    fn verification_effective(&self, id: &EntityId) -> Result<bool, ProviderError> {
        self.outcomes
            .get(&id.to_string())
            .copied()
            .ok_or_else(|| ProviderError::NotFound(id.to_string()))
    }
}

/// Events emitted by the disposition workflow
#[derive(Debug, Clone, PartialEq)]
pub enum QualityEvent {
    /// An NCR was opened
    NcrOpened {
        ncr_id: EntityId,
        severity: NcrSeverity,
        title: String,
    },

    /// Critical severity triggered automatic quarantine
    CriticalQuarantine {
        ncr_id: EntityId,
        items: Vec<String>,
    },
}

/// Fire-and-forget notification seam. Implementations must swallow their
/// own delivery failures; a failed notification never rolls back the
/// state change that produced it.
pub trait NotificationSink {
    fn notify(&self, event: &QualityEvent);
}

/// Sink that drops every event
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl NotificationSink for NullSink {
    fn notify(&self, _event: &QualityEvent) {}
}

/// Sink that records events for inspection in tests
#[derive(Debug, Default)]
pub struct RecordingSink {
    events: Mutex<Vec<QualityEvent>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<QualityEvent> {
        self.events.lock().expect("sink lock poisoned").clone()
    }
}

impl NotificationSink for RecordingSink {
    fn notify(&self, event: &QualityEvent) {
        self.events
            .lock()
            .expect("sink lock poisoned")
            .push(event.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::identity::EntityPrefix;

    #[test]
    fn test_static_capa_provider() {
        let capa_id = EntityId::new(EntityPrefix::Capa);
        let provider = StaticCapaProvider::new().with_outcome(&capa_id, true);

        assert!(provider.verification_effective(&capa_id).unwrap());

        let unknown = EntityId::new(EntityPrefix::Capa);
        assert!(matches!(
            provider.verification_effective(&unknown),
            Err(ProviderError::NotFound(_))
        ));
    }

    #[test]
    fn test_recording_sink_captures_events() {
        let sink = RecordingSink::new();
        let event = QualityEvent::NcrOpened {
            ncr_id: EntityId::new(EntityPrefix::Ncr),
            severity: NcrSeverity::Major,
            title: "test".to_string(),
        };
        sink.notify(&event);
        assert_eq!(sink.events(), vec![event]);
    }
}
