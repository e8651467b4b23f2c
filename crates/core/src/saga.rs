//! Bookkeeping for the hardware + trial bundle.
//!
//! The CRM has no multi-record transaction, so the bundle runs as an ordered
//! list of steps. Every committed step is recorded together with the action
//! that would undo it; callers always learn which steps are live in the CRM.

use serde::Serialize;
use thiserror::Error;

use crate::crm::AssociationTarget;
use crate::errors::CrmError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BundleStep {
    HardwareDeal,
    TrialDeal,
    Device,
    DeviceAssociation,
}

impl BundleStep {
    pub const ORDER: [BundleStep; 4] =
        [Self::HardwareDeal, Self::TrialDeal, Self::Device, Self::DeviceAssociation];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::HardwareDeal => "hardware_deal",
            Self::TrialDeal => "trial_deal",
            Self::Device => "device",
            Self::DeviceAssociation => "device_association",
        }
    }
}

/// Undo action for a committed step.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Compensation {
    ArchiveObject { object_type: String, object_id: String },
    RemoveAssociation(AssociationTarget),
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommittedStep {
    pub step: BundleStep,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub record_id: Option<String>,
}

#[derive(Clone, Debug, Default)]
pub struct SagaLog {
    entries: Vec<(CommittedStep, Compensation)>,
}

impl SagaLog {
    pub fn record(
        &mut self,
        step: BundleStep,
        record_id: Option<String>,
        compensation: Compensation,
    ) {
        self.entries.push((CommittedStep { step, record_id }, compensation));
    }

    pub fn committed(&self) -> Vec<CommittedStep> {
        self.entries.iter().map(|(step, _)| step.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Compensations newest first.
    pub fn unwind(&self) -> impl Iterator<Item = (BundleStep, &Compensation)> {
        self.entries.iter().rev().map(|(step, compensation)| (step.step, compensation))
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error(
    "bundle step `{}` failed after {} committed step(s): {cause}",
    failed_step.as_str(),
    committed.len()
)]
pub struct BundleFailure {
    pub failed_step: BundleStep,
    pub committed: Vec<CommittedStep>,
    /// Committed steps that were successfully undone.
    pub rolled_back: Vec<BundleStep>,
    pub cause: CrmError,
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use crate::crm::AssociationTarget;
    use crate::errors::CrmError;

    use super::{BundleFailure, BundleStep, Compensation, SagaLog};

    fn archive(id: &str) -> Compensation {
        Compensation::ArchiveObject { object_type: "deals".to_string(), object_id: id.to_string() }
    }

    #[test]
    fn unwind_yields_compensations_newest_first() {
        let mut log = SagaLog::default();
        log.record(BundleStep::HardwareDeal, Some("d-1".to_string()), archive("d-1"));
        log.record(BundleStep::TrialDeal, Some("d-2".to_string()), archive("d-2"));
        log.record(
            BundleStep::DeviceAssociation,
            None,
            Compensation::RemoveAssociation(AssociationTarget {
                from_type: "2-1".to_string(),
                from_id: "x".to_string(),
                to_type: "contacts".to_string(),
                to_id: "c".to_string(),
            }),
        );

        let order: Vec<BundleStep> = log.unwind().map(|(step, _)| step).collect();
        assert_eq!(
            order,
            vec![BundleStep::DeviceAssociation, BundleStep::TrialDeal, BundleStep::HardwareDeal]
        );
        assert_eq!(log.len(), 3);
    }

    #[test]
    fn committed_steps_serialize_with_optional_record_id() {
        let mut log = SagaLog::default();
        log.record(BundleStep::HardwareDeal, Some("d-1".to_string()), archive("d-1"));

        assert_eq!(
            serde_json::to_value(log.committed()).expect("serialize"),
            json!([{ "step": "hardware_deal", "recordId": "d-1" }])
        );
    }

    #[test]
    fn failure_message_names_step_and_commit_count() {
        let failure = BundleFailure {
            failed_step: BundleStep::Device,
            committed: SagaLog::default().committed(),
            rolled_back: Vec::new(),
            cause: CrmError::Status { status: 400, body: "bad property".to_string() },
        };

        let message = failure.to_string();
        assert!(message.contains("bundle step `device` failed"));
        assert!(message.contains("0 committed"));
        assert!(message.contains("bad property"));
    }
}
