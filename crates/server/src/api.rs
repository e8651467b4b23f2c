//! JSON endpoints used by the contact page.
//!
//! - `GET  /api/contacts`                 - newest contacts from the CRM search
//! - `POST /api/contacts`                 - create a contact, blank fields dropped
//! - `GET  /api/contacts/{id}/deals`      - deals associated with a contact
//! - `POST /api/deals`                    - subscription deal or hardware bundle
//! - `POST /api/ai/detect-opportunity`    - upsell verdict, flagged on the contact when High
//!
//! Downstream failures never leak detail to the browser: every error is a 500
//! with a fixed message, and the detail goes to the log under a correlation id.
//! Malformed bodies get the same `{error}` shape with a 4xx status.

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::{HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use breezy_agent::{opportunity::SpendSample, OpportunityClassifier};
use breezy_core::crm::{ContactSearch, CrmGateway};
use breezy_core::domain::contact::without_blank_properties;
use breezy_core::domain::deal::{RequestedDeal, DEAL_READ_PROPERTIES};
use breezy_core::domain::opportunity::{OpportunityReport, Verdict, UPSELL_PROPERTY};
use breezy_core::domain::product::ProductKind;
use breezy_core::errors::{InterfaceError, Operation};
use breezy_core::router::{DealOutcome, DealRequest, DealRouter, DealRoutingError};
use breezy_core::saga::BundleFailure;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use tracing::{error, info, warn};
use uuid::Uuid;

pub const CORRELATION_HEADER: &str = "x-correlation-id";

#[derive(Clone)]
pub struct AppState {
    pub crm: Arc<dyn CrmGateway>,
    pub classifier: Arc<OpportunityClassifier>,
    pub deals: Arc<DealRouter>,
}

#[derive(Debug, Deserialize)]
pub struct CreateContactRequest {
    #[serde(default)]
    pub properties: Map<String, Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateDealRequest {
    pub contact_id: String,
    #[serde(default)]
    pub product: Option<ProductKind>,
    pub deal_properties: RequestedDeal,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectOpportunityRequest {
    pub contact_id: String,
    #[serde(default)]
    pub contact_name: String,
}

#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    interface: InterfaceError,
    bundle: Option<BundleFailure>,
}

impl ApiError {
    fn new(operation: Operation, detail: impl std::fmt::Display) -> Self {
        let correlation_id = Uuid::new_v4().to_string();
        error!(
            event_name = "api.request.failed",
            operation = operation.as_str(),
            correlation_id = %correlation_id,
            error = %detail,
            "{}",
            operation.user_message()
        );
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            interface: InterfaceError::new(operation, detail.to_string(), correlation_id),
            bundle: None,
        }
    }

    /// Malformed request bodies keep the axum status but use the JSON error shape.
    fn rejected(operation: Operation, rejection: JsonRejection) -> Self {
        let correlation_id = Uuid::new_v4().to_string();
        let detail = rejection.body_text();
        warn!(
            event_name = "api.request.rejected",
            operation = operation.as_str(),
            correlation_id = %correlation_id,
            status = rejection.status().as_u16(),
            error = %detail,
            "request body rejected"
        );
        Self {
            status: rejection.status(),
            interface: InterfaceError::new(operation, detail, correlation_id),
            bundle: None,
        }
    }

    fn from_routing(error: DealRoutingError) -> Self {
        match error {
            DealRoutingError::Bundle(failure) => {
                let mut api_error = Self::new(Operation::CreateDeal, &failure);
                api_error.bundle = Some(failure);
                api_error
            }
            other => Self::new(Operation::CreateDeal, other),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let mut body = json!({ "error": self.interface.user_message() });
        if let Some(failure) = &self.bundle {
            body["failedStep"] = json!(failure.failed_step);
            body["committedSteps"] = json!(failure.committed);
            if !failure.rolled_back.is_empty() {
                body["rolledBackSteps"] = json!(failure.rolled_back);
            }
        }

        let mut response = (self.status, Json(body)).into_response();
        if let Ok(value) = HeaderValue::from_str(&self.interface.correlation_id) {
            response.headers_mut().insert(CORRELATION_HEADER, value);
        }
        response
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/contacts", get(list_contacts).post(create_contact))
        .route("/api/contacts/{contact_id}/deals", get(contact_deals))
        .route("/api/deals", post(create_deal))
        .route("/api/ai/detect-opportunity", post(detect_opportunity))
        .with_state(state)
}

async fn list_contacts(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    state
        .crm
        .search_contacts(&ContactSearch::newest_first())
        .await
        .map(Json)
        .map_err(|error| ApiError::new(Operation::FetchContacts, error))
}

async fn create_contact(
    State(state): State<AppState>,
    payload: Result<Json<CreateContactRequest>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let Json(request) =
        payload.map_err(|rejection| ApiError::rejected(Operation::CreateContact, rejection))?;
    let properties = without_blank_properties(request.properties);
    state
        .crm
        .create_contact(properties)
        .await
        .map(Json)
        .map_err(|error| ApiError::new(Operation::CreateContact, error))
}

async fn contact_deals(
    Path(contact_id): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<Vec<Value>>, ApiError> {
    let deal_ids = match state.crm.deal_ids_for_contact(&contact_id).await {
        Ok(ids) => ids,
        Err(error) if error.is_not_found() => Vec::new(),
        Err(error) => return Err(ApiError::new(Operation::FetchDeals, error)),
    };
    if deal_ids.is_empty() {
        return Ok(Json(Vec::new()));
    }

    state
        .crm
        .read_deals(&deal_ids, &DEAL_READ_PROPERTIES)
        .await
        .map(Json)
        .map_err(|error| ApiError::new(Operation::FetchDeals, error))
}

async fn create_deal(
    State(state): State<AppState>,
    payload: Result<Json<CreateDealRequest>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let Json(request) =
        payload.map_err(|rejection| ApiError::rejected(Operation::CreateDeal, rejection))?;
    let request = DealRequest {
        contact_id: request.contact_id,
        product: request.product,
        deal: request.deal_properties,
    };

    match state.deals.route(state.crm.as_ref(), &request).await {
        Ok(DealOutcome::Bundle(receipt)) => Ok(Json(json!(receipt))),
        Ok(DealOutcome::Subscription(deal)) => Ok(Json(deal)),
        Err(error) => Err(ApiError::from_routing(error)),
    }
}

async fn detect_opportunity(
    State(state): State<AppState>,
    payload: Result<Json<DetectOpportunityRequest>, JsonRejection>,
) -> Result<Json<OpportunityReport>, ApiError> {
    let Json(request) =
        payload.map_err(|rejection| ApiError::rejected(Operation::DetectOpportunity, rejection))?;
    let sample = SpendSample::draw(&mut rand::thread_rng());

    let assessment = state
        .classifier
        .assess(&request.contact_name, sample.monthly_spend)
        .await
        .map_err(|error| ApiError::new(Operation::DetectOpportunity, error))?;

    if assessment.verdict == Verdict::High {
        info!(
            event_name = "api.opportunity.flagged",
            contact_id = %request.contact_id,
            monthly_spend = sample.monthly_spend,
            "high opportunity; flagging contact"
        );
        let mut properties = Map::new();
        properties.insert(UPSELL_PROPERTY.to_string(), json!(Verdict::High.as_str()));
        state
            .crm
            .patch_contact(&request.contact_id, properties)
            .await
            .map_err(|error| ApiError::new(Operation::DetectOpportunity, error))?;
    }

    Ok(Json(OpportunityReport {
        spend: sample.monthly_spend,
        verdict: assessment.verdict,
        insight: assessment.insight,
    }))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;
    use axum::{
        body::Body,
        http::{Request, StatusCode},
        Router,
    };
    use breezy_agent::{AssessmentPolicy, LlmClient, LlmError, OpportunityClassifier};
    use breezy_core::catalog::CrmCatalog;
    use breezy_core::errors::CrmError;
    use breezy_core::router::DealRouter;
    use breezy_core::testing::{CallKind, CrmCall, RecordingCrm};
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use super::{router, AppState, CORRELATION_HEADER};

    struct FixedLlm(&'static str);

    #[async_trait]
    impl LlmClient for FixedLlm {
        async fn complete(&self, _prompt: &str) -> Result<String, LlmError> {
            Ok(self.0.to_string())
        }
    }

    fn app_with(crm: Arc<RecordingCrm>, reply: &'static str) -> Router {
        router(AppState {
            crm,
            classifier: Arc::new(OpportunityClassifier::new(
                Arc::new(FixedLlm(reply)),
                AssessmentPolicy::default(),
            )),
            deals: Arc::new(DealRouter::new(CrmCatalog::default(), false)),
        })
    }

    fn app(crm: Arc<RecordingCrm>) -> Router {
        app_with(crm, "{\"verdict\":\"Low\",\"reasoning\":\"Spend is modest.\"}")
    }

    async fn send(app: Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .body(body.map_or_else(Body::empty, |json| Body::from(json.to_string())))
            .expect("request");
        let response = app.oneshot(request).await.expect("response");
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.expect("body");
        (status, serde_json::from_slice(&bytes).expect("json body"))
    }

    #[tokio::test]
    async fn contacts_are_forwarded_verbatim() {
        let crm = Arc::new(
            RecordingCrm::new().with_contacts(vec![json!({ "id": "1", "properties": {} })]),
        );

        let (status, body) = send(app(crm.clone()), "GET", "/api/contacts", None).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "total": 1, "results": [{ "id": "1", "properties": {} }] }));
        assert_eq!(crm.call_kinds(), vec![CallKind::SearchContacts]);
    }

    #[tokio::test]
    async fn contact_search_failure_returns_fixed_message() {
        let crm = Arc::new(
            RecordingCrm::new().fail_on(CallKind::SearchContacts, CrmError::Transport("down".into())),
        );

        let (status, body) = send(app(crm), "GET", "/api/contacts", None).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body, json!({ "error": "Failed to fetch contacts" }));
    }

    #[tokio::test]
    async fn email_only_contact_sends_only_email() {
        let crm = Arc::new(RecordingCrm::new());
        let payload = json!({
            "properties": { "firstname": "", "lastname": "  ", "email": "ada@example.com", "phone": "" }
        });

        let (status, _) = send(app(crm.clone()), "POST", "/api/contacts", Some(payload)).await;

        assert_eq!(status, StatusCode::OK);
        let calls = crm.calls();
        let CrmCall::CreateContact(properties) = &calls[0] else { panic!("expected create") };
        assert_eq!(Value::Object(properties.clone()), json!({ "email": "ada@example.com" }));
    }

    #[tokio::test]
    async fn deals_lookup_404_returns_empty_list() {
        let crm = Arc::new(RecordingCrm::new().fail_on(
            CallKind::DealIds,
            CrmError::Status { status: 404, body: "not found".to_string() },
        ));

        let (status, body) = send(app(crm.clone()), "GET", "/api/contacts/51/deals", None).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!([]));
        assert_eq!(crm.call_kinds(), vec![CallKind::DealIds]);
    }

    #[tokio::test]
    async fn associated_deals_are_batch_read() {
        let crm = Arc::new(RecordingCrm::new().with_deal_ids(&["7", "8"]));

        let (status, body) = send(app(crm.clone()), "GET", "/api/contacts/51/deals", None).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.as_array().map(Vec::len), Some(2));
        assert_eq!(body[0]["id"], "7");
        assert_eq!(crm.calls()[1], CrmCall::ReadDeals(vec!["7".to_string(), "8".to_string()]));
    }

    #[tokio::test]
    async fn trial_deal_runs_bundle_and_returns_generic_ack() {
        let crm = Arc::new(RecordingCrm::new());
        let payload = json!({
            "contactId": "51",
            "dealProperties": { "dealname": "Breezy Trial", "amount": "0", "dealstage": "closedwon" }
        });

        let (status, body) = send(app(crm.clone()), "POST", "/api/deals", Some(payload)).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "success");
        assert_eq!(body["message"], "Bundle Created");
        assert_eq!(body["committedSteps"].as_array().map(Vec::len), Some(4));
        assert_eq!(
            crm.call_kinds(),
            vec![
                CallKind::CreateDeal,
                CallKind::CreateDeal,
                CallKind::CreateObject,
                CallKind::Associate
            ]
        );
    }

    #[tokio::test]
    async fn annual_deal_returns_raw_crm_object() {
        let crm = Arc::new(RecordingCrm::new());
        let payload = json!({
            "contactId": "51",
            "dealProperties": { "dealname": "Breezy Premium (Annually)", "amount": "99", "dealstage": "closedwon" }
        });

        let (status, body) = send(app(crm.clone()), "POST", "/api/deals", Some(payload)).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["id"], "deal-1");
        assert_eq!(body["properties"]["dealname"], "Breezy Premium (Annually)");
        let purchased = CrmCatalog::default().subscription.stage_purchased;
        assert_eq!(body["properties"]["dealstage"], json!(purchased));
        assert_eq!(crm.call_kinds(), vec![CallKind::CreateDeal]);
    }

    #[tokio::test]
    async fn explicit_product_tag_overrides_deal_name() {
        let crm = Arc::new(RecordingCrm::new());
        let payload = json!({
            "contactId": "51",
            "product": "annual",
            "dealProperties": { "dealname": "Trial upgrade", "amount": 99 }
        });

        let (status, _) = send(app(crm.clone()), "POST", "/api/deals", Some(payload)).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(crm.call_kinds(), vec![CallKind::CreateDeal]);
    }

    #[tokio::test]
    async fn failed_bundle_reports_step_and_committed_records() {
        let crm = Arc::new(RecordingCrm::new().fail_on(
            CallKind::CreateObject,
            CrmError::Status { status: 400, body: "unknown property".to_string() },
        ));
        let payload = json!({
            "contactId": "51",
            "product": "bundle",
            "dealProperties": { "dealname": "Thermostat bundle" }
        });

        let request = axum::http::Request::builder()
            .method("POST")
            .uri("/api/deals")
            .header("content-type", "application/json")
            .body(Body::from(payload.to_string()))
            .expect("request");
        let response = app(crm).oneshot(request).await.expect("response");
        assert!(response.headers().contains_key(CORRELATION_HEADER));

        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.expect("body");
        let body: Value = serde_json::from_slice(&bytes).expect("json");

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], "Failed processing transaction");
        assert_eq!(body["failedStep"], "device");
        assert_eq!(
            body["committedSteps"],
            json!([
                { "step": "hardware_deal", "recordId": "deal-1" },
                { "step": "trial_deal", "recordId": "deal-2" }
            ])
        );
        assert!(body.get("rolledBackSteps").is_none());
        assert!(!body.to_string().contains("unknown property"));
    }

    #[tokio::test]
    async fn high_verdict_patches_contact_once() {
        let crm = Arc::new(RecordingCrm::new());
        let app = app_with(
            crm.clone(),
            "```json\n{\"verdict\":\"High\",\"reasoning\":\"30% of spend exceeds $40.\"}\n```",
        );
        let payload = json!({ "contactId": "51", "contactName": "Ada Lovelace" });

        let (status, body) = send(app, "POST", "/api/ai/detect-opportunity", Some(payload)).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["verdict"], "High");
        assert_eq!(body["insight"], "30% of spend exceeds $40.");
        let spend = body["spend"].as_u64().expect("spend");
        assert!((50..120).contains(&spend) || (150..300).contains(&spend));

        let calls = crm.calls();
        assert_eq!(calls.len(), 1);
        let CrmCall::PatchContact { contact_id, properties } = &calls[0] else {
            panic!("expected contact patch")
        };
        assert_eq!(contact_id, "51");
        assert_eq!(Value::Object(properties.clone()), json!({ "upsell_opportunity": "High" }));
    }

    #[tokio::test]
    async fn low_verdict_leaves_contact_untouched() {
        let crm = Arc::new(RecordingCrm::new());
        let payload = json!({ "contactId": "51", "contactName": "Ada Lovelace" });

        let (status, body) =
            send(app(crm.clone()), "POST", "/api/ai/detect-opportunity", Some(payload)).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["verdict"], "Low");
        assert!(crm.calls().is_empty());
    }

    #[tokio::test]
    async fn untrusted_verdict_never_patches() {
        let crm = Arc::new(RecordingCrm::new());
        let app = app_with(crm.clone(), "{\"verdict\":\"HIGH!!\",\"reasoning\":\"trust me\"}");
        let payload = json!({ "contactId": "51", "contactName": "Ada" });

        let (status, body) = send(app, "POST", "/api/ai/detect-opportunity", Some(payload)).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["verdict"], "Low");
        assert!(crm.calls().is_empty());
    }

    #[tokio::test]
    async fn non_json_reply_is_analysis_failed() {
        let crm = Arc::new(RecordingCrm::new());
        let app = app_with(crm.clone(), "I think they are a great fit!");
        let payload = json!({ "contactId": "51", "contactName": "Ada" });

        let (status, body) = send(app, "POST", "/api/ai/detect-opportunity", Some(payload)).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body, json!({ "error": "Analysis Failed" }));
        assert!(crm.calls().is_empty());
    }

    #[tokio::test]
    async fn deal_lookup_failure_returns_fixed_message() {
        let crm = Arc::new(RecordingCrm::new().fail_on(
            CallKind::DealIds,
            CrmError::Status { status: 500, body: "internal".to_string() },
        ));

        let (status, body) = send(app(crm), "GET", "/api/contacts/51/deals", None).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body, json!({ "error": "Failed to fetch deals" }));
    }

    #[tokio::test]
    async fn deal_batch_read_failure_returns_fixed_message() {
        let crm = Arc::new(
            RecordingCrm::new()
                .with_deal_ids(&["7"])
                .fail_on(CallKind::ReadDeals, CrmError::Transport("reset".into())),
        );

        let (status, body) = send(app(crm), "GET", "/api/contacts/51/deals", None).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body, json!({ "error": "Failed to fetch deals" }));
    }

    #[tokio::test]
    async fn contact_creation_failure_returns_fixed_message() {
        let crm = Arc::new(RecordingCrm::new().fail_on(
            CallKind::CreateContact,
            CrmError::Status { status: 409, body: "Contact already exists".to_string() },
        ));
        let payload = json!({ "properties": { "email": "ada@example.com" } });

        let (status, body) = send(app(crm), "POST", "/api/contacts", Some(payload)).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body, json!({ "error": "Failed to create contact" }));
    }

    #[tokio::test]
    async fn malformed_deal_body_gets_json_error_without_crm_calls() {
        let crm = Arc::new(RecordingCrm::new());
        let payload = json!({
            "contactId": "51",
            "dealProperties": { "dealname": "Breezy Premium (Monthly)", "amount": "lots" }
        });

        let (status, body) = send(app(crm.clone()), "POST", "/api/deals", Some(payload)).await;

        assert!(status.is_client_error(), "{status}");
        assert_eq!(body, json!({ "error": "Failed processing transaction" }));
        assert!(crm.calls().is_empty());
    }

    #[tokio::test]
    async fn missing_deal_properties_gets_json_error() {
        let crm = Arc::new(RecordingCrm::new());

        let (status, body) =
            send(app(crm.clone()), "POST", "/api/deals", Some(json!({ "contactId": "51" }))).await;

        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body, json!({ "error": "Failed processing transaction" }));
        assert!(crm.calls().is_empty());
    }

    #[tokio::test]
    async fn unparseable_opportunity_body_gets_json_error() {
        let request = Request::builder()
            .method("POST")
            .uri("/api/ai/detect-opportunity")
            .header("content-type", "application/json")
            .body(Body::from("{not json"))
            .expect("request");

        let response = app(Arc::new(RecordingCrm::new())).oneshot(request).await.expect("response");

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(response.headers().contains_key(CORRELATION_HEADER));
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.expect("body");
        let body: Value = serde_json::from_slice(&bytes).expect("json");
        assert_eq!(body, json!({ "error": "Analysis Failed" }));
    }
}
