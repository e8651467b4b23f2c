//! Upsell classification for a single contact.

use std::sync::Arc;

use breezy_core::domain::opportunity::Verdict;
use rand::Rng;
use serde_json::Value;
use thiserror::Error;
use tracing::{info, warn};

use crate::guardrails::{AssessmentDecision, AssessmentPolicy};
use crate::llm::{LlmClient, LlmError};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SpendScenario {
    High,
    Low,
}

/// Synthetic monthly spend standing in for real telemetry.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SpendSample {
    pub scenario: SpendScenario,
    pub monthly_spend: u32,
}

impl SpendSample {
    pub fn draw<R: Rng + ?Sized>(rng: &mut R) -> Self {
        if rng.gen_bool(0.5) {
            Self { scenario: SpendScenario::High, monthly_spend: rng.gen_range(150..300) }
        } else {
            Self { scenario: SpendScenario::Low, monthly_spend: rng.gen_range(50..120) }
        }
    }
}

pub fn build_prompt(contact_name: &str, monthly_spend: u32) -> String {
    format!(
        "Act as a Data Analyst. Analyze this customer:\n\
         - Name: {contact_name}\n\
         - Current Spend: ${monthly_spend}/month\n\
         - Subscription: NONE\n\
         \n\
         Logic: If (Spend * 0.30) > $40, verdict is \"High\". Else \"Low\".\n\
         \n\
         Output JSON ONLY: {{ \"verdict\": \"High\" or \"Low\", \"reasoning\": \"short sentence\" }}"
    )
}

/// Removes markdown code fences the model tends to wrap JSON in.
pub fn strip_code_fences(text: &str) -> String {
    text.replace("```json", "").replace("```", "").trim().to_string()
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ClassifierError {
    #[error(transparent)]
    Llm(#[from] LlmError),
    #[error("classifier reply is not json: {0}")]
    Unparseable(String),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Assessment {
    pub verdict: Verdict,
    pub insight: String,
    /// False when the reply failed validation and was downgraded.
    pub trusted: bool,
}

pub struct OpportunityClassifier {
    llm: Arc<dyn LlmClient>,
    policy: AssessmentPolicy,
}

impl OpportunityClassifier {
    pub fn new(llm: Arc<dyn LlmClient>, policy: AssessmentPolicy) -> Self {
        Self { llm, policy }
    }

    pub async fn assess(
        &self,
        contact_name: &str,
        monthly_spend: u32,
    ) -> Result<Assessment, ClassifierError> {
        let text = self.llm.complete(&build_prompt(contact_name, monthly_spend)).await?;
        let cleaned = strip_code_fences(&text);
        let reply: Value = serde_json::from_str(&cleaned)
            .map_err(|error| ClassifierError::Unparseable(error.to_string()))?;

        let decision = self.policy.evaluate(&reply);
        if let AssessmentDecision::Degrade { reason_code, .. } = &decision {
            warn!(
                event_name = "agent.opportunity.reply_rejected",
                reason_code = %reason_code,
                monthly_spend,
                "classifier reply failed validation; treating as low"
            );
        } else {
            info!(
                event_name = "agent.opportunity.assessed",
                verdict = decision.verdict().as_str(),
                monthly_spend,
                "classifier verdict accepted"
            );
        }

        Ok(Assessment {
            verdict: decision.verdict(),
            insight: decision.insight().to_string(),
            trusted: matches!(decision, AssessmentDecision::Accept { .. }),
        })
    }
}
