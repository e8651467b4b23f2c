use serde::{Deserialize, Serialize};

/// What the browser's product selector offers.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProductKind {
    /// Thermostat hardware plus a free subscription trial.
    Bundle,
    Annual,
    Monthly,
}

impl ProductKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Bundle => "bundle",
            Self::Annual => "annual",
            Self::Monthly => "monthly",
        }
    }

    /// Legacy routing for callers that only send a deal name.
    pub fn infer_from_deal_name(deal_name: &str) -> Self {
        if deal_name.contains("Thermostat") || deal_name.contains("Trial") {
            Self::Bundle
        } else if deal_name.contains("Monthly") {
            Self::Monthly
        } else {
            Self::Annual
        }
    }

    pub fn resolve(explicit: Option<Self>, deal_name: &str) -> Self {
        explicit.unwrap_or_else(|| Self::infer_from_deal_name(deal_name))
    }

    pub fn is_bundle(&self) -> bool {
        matches!(self, Self::Bundle)
    }
}
