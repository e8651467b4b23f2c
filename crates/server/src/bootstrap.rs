use std::sync::Arc;

use axum::Router;
use breezy_agent::{AssessmentPolicy, GeminiClient, LlmError, OpportunityClassifier};
use breezy_core::config::AppConfig;
use breezy_core::errors::CrmError;
use breezy_core::router::DealRouter;
use thiserror::Error;
use tower_http::services::ServeDir;
use tracing::{info, warn};

use crate::api::{self, AppState};
use crate::hubspot::HubSpotClient;
use crate::{health, page};

pub struct Application {
    pub config: AppConfig,
    pub state: AppState,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error("crm client setup failed: {0}")]
    Crm(#[source] CrmError),
    #[error("llm client setup failed: {0}")]
    Llm(#[source] LlmError),
    #[error("page templates failed to load: {0}")]
    Templates(#[source] tera::Error),
}

pub fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    info!(
        event_name = "system.bootstrap.start",
        correlation_id = "bootstrap",
        "starting application bootstrap"
    );

    let crm = HubSpotClient::from_config(&config.crm).map_err(BootstrapError::Crm)?;
    info!(
        event_name = "system.bootstrap.crm_ready",
        correlation_id = "bootstrap",
        base_url = %config.crm.base_url,
        compensate_on_failure = config.crm.compensate_on_failure,
        "crm client configured"
    );

    if config.llm.api_key.is_none() {
        warn!(
            event_name = "system.bootstrap.llm_key_missing",
            correlation_id = "bootstrap",
            "no llm api key configured; opportunity scans will fail"
        );
    }
    let llm = GeminiClient::from_config(&config.llm).map_err(BootstrapError::Llm)?;
    let classifier = OpportunityClassifier::new(Arc::new(llm), AssessmentPolicy::default());

    let deals = DealRouter::new(config.catalog.clone(), config.crm.compensate_on_failure);

    let state =
        AppState { crm: Arc::new(crm), classifier: Arc::new(classifier), deals: Arc::new(deals) };
    Ok(Application { config, state })
}

impl Application {
    /// Health, page and API routes, with static assets as the fallback.
    pub fn router(&self) -> Result<Router, BootstrapError> {
        let page = page::router(self.state.crm.clone()).map_err(BootstrapError::Templates)?;
        Ok(Router::new()
            .merge(health::router())
            .merge(page)
            .merge(api::router(self.state.clone()))
            .fallback_service(ServeDir::new(&self.config.server.static_dir)))
    }
}
