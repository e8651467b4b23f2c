//! HubSpot REST implementation of [`CrmGateway`].

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use breezy_core::config::CrmConfig;
use breezy_core::crm::{AssociationTarget, ContactSearch, CrmGateway, CONTACTS, DEALS};
use breezy_core::domain::deal::{object_id, AssociationSpec, NewDeal};
use breezy_core::errors::CrmError;
use reqwest::{Client, RequestBuilder, Response};
use secrecy::{ExposeSecret, SecretString};
use serde_json::{json, Map, Value};
use tracing::{debug, warn};

#[derive(Clone, Debug)]
pub struct HubSpotClient {
    client: Client,
    base_url: String,
    access_token: SecretString,
}

impl HubSpotClient {
    pub fn from_config(config: &CrmConfig) -> Result<Self, CrmError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|error| CrmError::Transport(error.to_string()))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            access_token: config.access_token.clone(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .bearer_auth(self.access_token.expose_secret())
            .header(reqwest::header::CONTENT_TYPE, "application/json")
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response, CrmError> {
        let response = self
            .authorized(request)
            .send()
            .await
            .map_err(|error| CrmError::Transport(error.to_string()))?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        debug!(status = %status, body = %body, "crm returned an error status");
        Err(CrmError::Status { status: status.as_u16(), body })
    }

    async fn send_json(&self, request: RequestBuilder) -> Result<Value, CrmError> {
        self.send(request)
            .await?
            .json::<Value>()
            .await
            .map_err(|error| CrmError::Decode(error.to_string()))
    }

    fn association_path(target: &AssociationTarget) -> String {
        format!(
            "/crm/v4/objects/{}/{}/associations/{}/{}",
            target.from_type, target.from_id, target.to_type, target.to_id
        )
    }
}

fn search_body(search: &ContactSearch) -> Value {
    json!({
        "filterGroups": [],
        "sorts": [{
            "propertyName": search.sort_property,
            "direction": if search.descending { "DESCENDING" } else { "ASCENDING" },
        }],
        "properties": search.properties,
        "limit": search.limit,
    })
}

fn deal_body(deal: &NewDeal) -> Value {
    json!({
        "properties": deal.properties,
        "associations": [{
            "to": { "id": deal.contact_id },
            "types": [deal.association],
        }],
    })
}

fn association_ids(response: &Value) -> Vec<String> {
    response
        .get("results")
        .and_then(Value::as_array)
        .map(|results| results.iter().filter_map(object_id).collect())
        .unwrap_or_default()
}

#[async_trait]
impl CrmGateway for HubSpotClient {
    async fn search_contacts(&self, search: &ContactSearch) -> Result<Value, CrmError> {
        let url = self.url(&format!("/crm/v3/objects/{CONTACTS}/search"));
        self.send_json(self.client.post(url).json(&search_body(search))).await
    }

    async fn create_contact(&self, properties: Map<String, Value>) -> Result<Value, CrmError> {
        let url = self.url(&format!("/crm/v3/objects/{CONTACTS}"));
        self.send_json(self.client.post(url).json(&json!({ "properties": properties }))).await
    }

    async fn patch_contact(
        &self,
        contact_id: &str,
        properties: Map<String, Value>,
    ) -> Result<Value, CrmError> {
        let url = self.url(&format!("/crm/v3/objects/{CONTACTS}/{contact_id}"));
        self.send_json(self.client.patch(url).json(&json!({ "properties": properties }))).await
    }

    async fn deal_ids_for_contact(&self, contact_id: &str) -> Result<Vec<String>, CrmError> {
        let url =
            self.url(&format!("/crm/v3/objects/{CONTACTS}/{contact_id}/associations/{DEALS}"));
        match self.send_json(self.client.get(url)).await {
            Ok(response) => Ok(association_ids(&response)),
            Err(error) if error.is_not_found() => {
                debug!(contact_id, "contact has no deal associations");
                Ok(Vec::new())
            }
            Err(error) => Err(error),
        }
    }

    async fn read_deals(
        &self,
        deal_ids: &[String],
        properties: &[&str],
    ) -> Result<Vec<Value>, CrmError> {
        let inputs: Vec<Value> = deal_ids.iter().map(|id| json!({ "id": id })).collect();
        let url = self.url(&format!("/crm/v3/objects/{DEALS}/batch/read"));
        let response = self
            .send_json(
                self.client.post(url).json(&json!({ "inputs": inputs, "properties": properties })),
            )
            .await?;

        match response.get("results") {
            Some(Value::Array(results)) => Ok(results.clone()),
            _ => Err(CrmError::MissingField("results")),
        }
    }

    async fn create_deal(&self, deal: &NewDeal) -> Result<Value, CrmError> {
        let url = self.url(&format!("/crm/v3/objects/{DEALS}"));
        self.send_json(self.client.post(url).json(&deal_body(deal))).await
    }

    async fn create_object(
        &self,
        object_type: &str,
        properties: &BTreeMap<String, String>,
    ) -> Result<Value, CrmError> {
        let url = self.url(&format!("/crm/v3/objects/{object_type}"));
        self.send_json(self.client.post(url).json(&json!({ "properties": properties }))).await
    }

    async fn associate(
        &self,
        target: &AssociationTarget,
        spec: AssociationSpec,
    ) -> Result<(), CrmError> {
        let url = self.url(&Self::association_path(target));
        self.send(self.client.put(url).json(&[spec])).await.map(|_| ())
    }

    async fn archive_object(&self, object_type: &str, object_id: &str) -> Result<(), CrmError> {
        let url = self.url(&format!("/crm/v3/objects/{object_type}/{object_id}"));
        self.send(self.client.delete(url)).await.map(|_| ())
    }

    async fn remove_association(&self, target: &AssociationTarget) -> Result<(), CrmError> {
        let url = self.url(&Self::association_path(target));
        match self.send(self.client.delete(url)).await {
            Ok(_) => Ok(()),
            Err(error) => {
                warn!(
                    from_id = %target.from_id,
                    to_id = %target.to_id,
                    error = %error,
                    "association removal failed"
                );
                Err(error)
            }
        }
    }
}
