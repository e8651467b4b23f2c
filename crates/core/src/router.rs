//! Deal routing: a single subscription deal, or the hardware + trial bundle.

use chrono::{SecondsFormat, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use tracing::{error, info, warn};

use crate::catalog::CrmCatalog;
use crate::crm::{AssociationTarget, CrmGateway, CONTACTS, DEALS};
use crate::domain::deal::{object_id, AssociationSpec, DealProperties, NewDeal, RequestedDeal};
use crate::domain::device::{DeviceSerial, NewDevice};
use crate::domain::product::ProductKind;
use crate::errors::CrmError;
use crate::saga::{BundleFailure, BundleStep, CommittedStep, Compensation, SagaLog};

pub const HARDWARE_DEAL_NAME: &str = "Thermostat Hardware Purchase";
pub const TRIAL_DEAL_NAME: &str = "Breezy Premium (Free Trial)";

#[derive(Clone, Debug, PartialEq)]
pub struct DealRequest {
    pub contact_id: String,
    pub product: Option<ProductKind>,
    pub deal: RequestedDeal,
}

impl DealRequest {
    pub fn product(&self) -> ProductKind {
        ProductKind::resolve(self.product, &self.deal.dealname)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum DealOutcome {
    Bundle(BundleReceipt),
    /// The CRM's created-deal object, untouched.
    Subscription(Value),
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BundleReceipt {
    pub status: &'static str,
    pub message: &'static str,
    pub committed_steps: Vec<CommittedStep>,
}

impl BundleReceipt {
    fn completed(committed_steps: Vec<CommittedStep>) -> Self {
        Self { status: "success", message: "Bundle Created", committed_steps }
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum DealRoutingError {
    #[error("subscription deal creation failed: {0}")]
    Subscription(#[source] CrmError),
    #[error(transparent)]
    Bundle(#[from] BundleFailure),
}

#[derive(Clone, Debug)]
pub struct DealRouter {
    catalog: CrmCatalog,
    compensate_on_failure: bool,
}

impl DealRouter {
    pub fn new(catalog: CrmCatalog, compensate_on_failure: bool) -> Self {
        Self { catalog, compensate_on_failure }
    }

    pub fn catalog(&self) -> &CrmCatalog {
        &self.catalog
    }

    pub async fn route(
        &self,
        gateway: &dyn CrmGateway,
        request: &DealRequest,
    ) -> Result<DealOutcome, DealRoutingError> {
        let product = request.product();
        if product.is_bundle() {
            info!(
                event_name = "crm.deal.route",
                contact_id = %request.contact_id,
                product = product.as_str(),
                "processing bundle: hardware + device + trial"
            );
            let committed = self.run_bundle(gateway, &request.contact_id).await?;
            return Ok(DealOutcome::Bundle(BundleReceipt::completed(committed)));
        }

        info!(
            event_name = "crm.deal.route",
            contact_id = %request.contact_id,
            product = product.as_str(),
            "processing subscription upgrade"
        );
        let deal = self.subscription_deal(&request.contact_id, &request.deal);
        gateway
            .create_deal(&deal)
            .await
            .map(DealOutcome::Subscription)
            .map_err(DealRoutingError::Subscription)
    }

    async fn run_bundle(
        &self,
        gateway: &dyn CrmGateway,
        contact_id: &str,
    ) -> Result<Vec<CommittedStep>, BundleFailure> {
        let mut log = SagaLog::default();

        let hardware = self.hardware_deal(contact_id);
        let deal_id = match gateway.create_deal(&hardware).await.and_then(require_id) {
            Ok(id) => id,
            Err(cause) => {
                return Err(self.abort(gateway, BundleStep::HardwareDeal, log, cause).await)
            }
        };
        let undo = archive(DEALS, &deal_id);
        commit(&mut log, BundleStep::HardwareDeal, Some(deal_id), undo);

        let closedate = Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true);
        let trial = self.trial_deal(contact_id, &closedate);
        let deal_id = match gateway.create_deal(&trial).await.and_then(require_id) {
            Ok(id) => id,
            Err(cause) => {
                return Err(self.abort(gateway, BundleStep::TrialDeal, log, cause).await)
            }
        };
        let undo = archive(DEALS, &deal_id);
        commit(&mut log, BundleStep::TrialDeal, Some(deal_id), undo);

        let device = NewDevice::thermostat(DeviceSerial::random(&mut rand::thread_rng()));
        let schema = &self.catalog.device;
        let device_id = match gateway
            .create_object(&schema.type_id, &device.properties(schema))
            .await
            .and_then(require_id)
        {
            Ok(id) => id,
            Err(cause) => return Err(self.abort(gateway, BundleStep::Device, log, cause).await),
        };
        commit(
            &mut log,
            BundleStep::Device,
            Some(device_id.clone()),
            archive(&schema.type_id, &device_id),
        );

        // Device -> contact: the standard object type is the simpler path
        // segment for the CRM to resolve.
        let target = AssociationTarget {
            from_type: schema.type_id.clone(),
            from_id: device_id.clone(),
            to_type: CONTACTS.to_string(),
            to_id: contact_id.to_string(),
        };
        info!(
            event_name = "crm.bundle.associating",
            device_id = %device_id,
            contact_id = %contact_id,
            "associating device to contact"
        );
        let spec = AssociationSpec::user_defined(schema.association_type_id);
        if let Err(cause) = gateway.associate(&target, spec).await {
            return Err(self.abort(gateway, BundleStep::DeviceAssociation, log, cause).await);
        }
        // Last step: nothing later can fail and unwind this. The entry keeps the
        // committed log complete for an operator-driven reconcile.
        let undo = Compensation::RemoveAssociation(target);
        commit(&mut log, BundleStep::DeviceAssociation, None, undo);

        info!(event_name = "crm.bundle.completed", contact_id = %contact_id, "bundle created");
        Ok(log.committed())
    }

    async fn abort(
        &self,
        gateway: &dyn CrmGateway,
        failed_step: BundleStep,
        log: SagaLog,
        cause: CrmError,
    ) -> BundleFailure {
        error!(
            event_name = "crm.bundle.step_failed",
            step = failed_step.as_str(),
            committed_steps = log.len(),
            error = %cause,
            "bundle step failed; earlier steps remain committed"
        );

        let rolled_back =
            if self.compensate_on_failure { compensate(gateway, &log).await } else { Vec::new() };

        BundleFailure { failed_step, committed: log.committed(), rolled_back, cause }
    }

    fn hardware_deal(&self, contact_id: &str) -> NewDeal {
        NewDeal {
            properties: DealProperties {
                dealname: HARDWARE_DEAL_NAME.to_string(),
                amount: Some(Decimal::new(29900, 2)),
                pipeline: self.catalog.hardware.id.clone(),
                dealstage: self.catalog.hardware.stage_purchase_completed.clone(),
                closedate: None,
            },
            contact_id: contact_id.to_string(),
            association: self.deal_association(),
        }
    }

    fn trial_deal(&self, contact_id: &str, closedate: &str) -> NewDeal {
        NewDeal {
            properties: DealProperties {
                dealname: TRIAL_DEAL_NAME.to_string(),
                amount: Some(Decimal::new(0, 2)),
                pipeline: self.catalog.subscription.id.clone(),
                dealstage: self.catalog.subscription.stage_trial_started.clone(),
                closedate: Some(closedate.to_string()),
            },
            contact_id: contact_id.to_string(),
            association: self.deal_association(),
        }
    }

    fn subscription_deal(&self, contact_id: &str, requested: &RequestedDeal) -> NewDeal {
        NewDeal {
            properties: DealProperties {
                dealname: requested.dealname.clone(),
                amount: requested.amount,
                pipeline: self.catalog.subscription.id.clone(),
                dealstage: self.catalog.subscription.stage_purchased.clone(),
                closedate: None,
            },
            contact_id: contact_id.to_string(),
            association: self.deal_association(),
        }
    }

    fn deal_association(&self) -> AssociationSpec {
        AssociationSpec::hubspot_defined(self.catalog.deal_to_contact_association_id)
    }
}

fn require_id(response: Value) -> Result<String, CrmError> {
    object_id(&response).ok_or(CrmError::MissingField("id"))
}

fn archive(object_type: &str, object_id: &str) -> Compensation {
    Compensation::ArchiveObject {
        object_type: object_type.to_string(),
        object_id: object_id.to_string(),
    }
}

fn commit(log: &mut SagaLog, step: BundleStep, record_id: Option<String>, undo: Compensation) {
    info!(
        event_name = "crm.bundle.step_committed",
        step = step.as_str(),
        record_id = record_id.as_deref().unwrap_or("-"),
        "bundle step committed"
    );
    log.record(step, record_id, undo);
}

/// Best-effort undo of committed steps, newest first. Returns the steps that
/// were undone.
async fn compensate(gateway: &dyn CrmGateway, log: &SagaLog) -> Vec<BundleStep> {
    let mut rolled_back = Vec::new();
    for (step, compensation) in log.unwind() {
        let result = match compensation {
            Compensation::ArchiveObject { object_type, object_id } => {
                gateway.archive_object(object_type, object_id).await
            }
            Compensation::RemoveAssociation(target) => gateway.remove_association(target).await,
        };
        match result {
            Ok(()) => rolled_back.push(step),
            Err(error) => warn!(
                event_name = "crm.bundle.compensation_failed",
                step = step.as_str(),
                error = %error,
                "could not undo committed bundle step"
            ),
        }
    }
    rolled_back
}
