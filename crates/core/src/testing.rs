//! In-memory CRM used by unit and handler tests.

use std::collections::BTreeMap;
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::{json, Map, Value};

use crate::crm::{AssociationTarget, ContactSearch, CrmGateway};
use crate::domain::deal::{AssociationSpec, NewDeal};
use crate::errors::CrmError;

#[derive(Clone, Debug, PartialEq)]
pub enum CrmCall {
    SearchContacts(ContactSearch),
    CreateContact(Map<String, Value>),
    PatchContact { contact_id: String, properties: Map<String, Value> },
    DealIds(String),
    ReadDeals(Vec<String>),
    CreateDeal(NewDeal),
    CreateObject { object_type: String, properties: BTreeMap<String, String> },
    Associate { target: AssociationTarget, spec: AssociationSpec },
    ArchiveObject { object_type: String, object_id: String },
    RemoveAssociation(AssociationTarget),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CallKind {
    SearchContacts,
    CreateContact,
    PatchContact,
    DealIds,
    ReadDeals,
    CreateDeal,
    CreateObject,
    Associate,
    ArchiveObject,
    RemoveAssociation,
}

impl CrmCall {
    pub fn kind(&self) -> CallKind {
        match self {
            Self::SearchContacts(_) => CallKind::SearchContacts,
            Self::CreateContact(_) => CallKind::CreateContact,
            Self::PatchContact { .. } => CallKind::PatchContact,
            Self::DealIds(_) => CallKind::DealIds,
            Self::ReadDeals(_) => CallKind::ReadDeals,
            Self::CreateDeal(_) => CallKind::CreateDeal,
            Self::CreateObject { .. } => CallKind::CreateObject,
            Self::Associate { .. } => CallKind::Associate,
            Self::ArchiveObject { .. } => CallKind::ArchiveObject,
            Self::RemoveAssociation(_) => CallKind::RemoveAssociation,
        }
    }
}

/// Records every call in order and answers with canned records.
///
/// Created deals get ids `deal-1`, `deal-2`, ...; created objects `object-1`, ...
#[derive(Default)]
pub struct RecordingCrm {
    calls: Mutex<Vec<CrmCall>>,
    failures: Mutex<Vec<(CallKind, usize, CrmError)>>,
    contacts: Mutex<Vec<Value>>,
    deal_ids: Mutex<Option<Vec<String>>>,
}

impl RecordingCrm {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail the `nth` (1-based) call of `kind` with `error`.
    pub fn fail_nth(self, kind: CallKind, nth: usize, error: CrmError) -> Self {
        self.lock_failures().push((kind, nth, error));
        self
    }

    pub fn fail_on(self, kind: CallKind, error: CrmError) -> Self {
        self.fail_nth(kind, 1, error)
    }

    pub fn with_contacts(self, contacts: Vec<Value>) -> Self {
        *self.contacts.lock().unwrap_or_else(|poisoned| poisoned.into_inner()) = contacts;
        self
    }

    pub fn with_deal_ids(self, ids: &[&str]) -> Self {
        *self.deal_ids.lock().unwrap_or_else(|poisoned| poisoned.into_inner()) =
            Some(ids.iter().map(ToString::to_string).collect());
        self
    }

    pub fn calls(&self) -> Vec<CrmCall> {
        self.lock_calls().clone()
    }

    pub fn call_kinds(&self) -> Vec<CallKind> {
        self.lock_calls().iter().map(CrmCall::kind).collect()
    }

    fn lock_calls(&self) -> std::sync::MutexGuard<'_, Vec<CrmCall>> {
        self.calls.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn lock_failures(&self) -> std::sync::MutexGuard<'_, Vec<(CallKind, usize, CrmError)>> {
        self.failures.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Records the call and returns its 1-based ordinal among calls of the
    /// same kind, or the scripted failure.
    fn record(&self, call: CrmCall) -> Result<usize, CrmError> {
        let kind = call.kind();
        let ordinal = {
            let mut calls = self.lock_calls();
            calls.push(call);
            calls.iter().filter(|recorded| recorded.kind() == kind).count()
        };

        let failures = self.lock_failures();
        match failures.iter().find(|(failing, nth, _)| *failing == kind && *nth == ordinal) {
            Some((_, _, error)) => Err(error.clone()),
            None => Ok(ordinal),
        }
    }
}

#[async_trait]
impl CrmGateway for RecordingCrm {
    async fn search_contacts(&self, search: &ContactSearch) -> Result<Value, CrmError> {
        self.record(CrmCall::SearchContacts(search.clone()))?;
        let contacts = self.contacts.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        Ok(json!({ "total": contacts.len(), "results": contacts.clone() }))
    }

    async fn create_contact(&self, properties: Map<String, Value>) -> Result<Value, CrmError> {
        let ordinal = self.record(CrmCall::CreateContact(properties.clone()))?;
        Ok(json!({ "id": format!("contact-{ordinal}"), "properties": properties }))
    }

    async fn patch_contact(
        &self,
        contact_id: &str,
        properties: Map<String, Value>,
    ) -> Result<Value, CrmError> {
        self.record(CrmCall::PatchContact {
            contact_id: contact_id.to_string(),
            properties: properties.clone(),
        })?;
        Ok(json!({ "id": contact_id, "properties": properties }))
    }

    async fn deal_ids_for_contact(&self, contact_id: &str) -> Result<Vec<String>, CrmError> {
        self.record(CrmCall::DealIds(contact_id.to_string()))?;
        Ok(self
            .deal_ids
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
            .unwrap_or_default())
    }

    async fn read_deals(
        &self,
        deal_ids: &[String],
        _properties: &[&str],
    ) -> Result<Vec<Value>, CrmError> {
        self.record(CrmCall::ReadDeals(deal_ids.to_vec()))?;
        Ok(deal_ids
            .iter()
            .map(|id| {
                json!({
                    "id": id,
                    "properties": { "dealname": format!("Deal {id}"), "amount": "99", "dealstage": "1232706853" }
                })
            })
            .collect())
    }

    async fn create_deal(&self, deal: &NewDeal) -> Result<Value, CrmError> {
        let ordinal = self.record(CrmCall::CreateDeal(deal.clone()))?;
        Ok(json!({
            "id": format!("deal-{ordinal}"),
            "properties": deal.properties,
        }))
    }

    async fn create_object(
        &self,
        object_type: &str,
        properties: &BTreeMap<String, String>,
    ) -> Result<Value, CrmError> {
        let ordinal = self.record(CrmCall::CreateObject {
            object_type: object_type.to_string(),
            properties: properties.clone(),
        })?;
        Ok(json!({ "id": format!("object-{ordinal}"), "properties": properties }))
    }

    async fn associate(
        &self,
        target: &AssociationTarget,
        spec: AssociationSpec,
    ) -> Result<(), CrmError> {
        self.record(CrmCall::Associate { target: target.clone(), spec })?;
        Ok(())
    }

    async fn archive_object(&self, object_type: &str, object_id: &str) -> Result<(), CrmError> {
        self.record(CrmCall::ArchiveObject {
            object_type: object_type.to_string(),
            object_id: object_id.to_string(),
        })?;
        Ok(())
    }

    async fn remove_association(&self, target: &AssociationTarget) -> Result<(), CrmError> {
        self.record(CrmCall::RemoveAssociation(target.clone()))?;
        Ok(())
    }
}
