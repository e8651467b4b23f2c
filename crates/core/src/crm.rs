//! The seam between Breezy and the CRM's REST API.
//!
//! Implementations translate each call 1:1 into a CRM request and hand back
//! the raw JSON. Nothing here retries.

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::domain::deal::{AssociationSpec, NewDeal};
use crate::errors::CrmError;

/// CRM object type path segments for the standard objects Breezy touches.
pub const CONTACTS: &str = "contacts";
pub const DEALS: &str = "deals";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ContactSearch {
    pub properties: Vec<String>,
    pub sort_property: String,
    pub descending: bool,
    pub limit: u32,
}

impl ContactSearch {
    /// Newest contacts first, with the fixed list property set.
    pub fn newest_first() -> Self {
        Self {
            properties: crate::domain::contact::CONTACT_LIST_PROPERTIES
                .iter()
                .map(ToString::to_string)
                .collect(),
            sort_property: "createdate".to_string(),
            descending: true,
            limit: crate::domain::contact::CONTACT_LIST_LIMIT,
        }
    }
}

/// A typed link between two CRM records, addressed as `from -> to`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AssociationTarget {
    pub from_type: String,
    pub from_id: String,
    pub to_type: String,
    pub to_id: String,
}

#[async_trait]
pub trait CrmGateway: Send + Sync {
    async fn search_contacts(&self, search: &ContactSearch) -> Result<Value, CrmError>;

    async fn create_contact(&self, properties: Map<String, Value>) -> Result<Value, CrmError>;

    async fn patch_contact(
        &self,
        contact_id: &str,
        properties: Map<String, Value>,
    ) -> Result<Value, CrmError>;

    /// Ids of deals associated with a contact. A 404 from the CRM means the
    /// contact has no association record and yields an empty list.
    async fn deal_ids_for_contact(&self, contact_id: &str) -> Result<Vec<String>, CrmError>;

    /// Batch read of deals; returns the CRM's `results` array.
    async fn read_deals(&self, deal_ids: &[String], properties: &[&str])
        -> Result<Vec<Value>, CrmError>;

    async fn create_deal(&self, deal: &NewDeal) -> Result<Value, CrmError>;

    async fn create_object(
        &self,
        object_type: &str,
        properties: &BTreeMap<String, String>,
    ) -> Result<Value, CrmError>;

    async fn associate(
        &self,
        target: &AssociationTarget,
        spec: AssociationSpec,
    ) -> Result<(), CrmError>;

    async fn archive_object(&self, object_type: &str, object_id: &str) -> Result<(), CrmError>;

    async fn remove_association(&self, target: &AssociationTarget) -> Result<(), CrmError>;
}
