use serde::{Deserialize, Serialize};

/// CRM contact property set when an upsell opportunity is found.
pub const UPSELL_PROPERTY: &str = "upsell_opportunity";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Verdict {
    High,
    Low,
}

impl Verdict {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::High => "High",
            Self::Low => "Low",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "High" => Some(Self::High),
            "Low" => Some(Self::Low),
            _ => None,
        }
    }
}

/// Body returned by the opportunity endpoint.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpportunityReport {
    pub spend: u32,
    pub verdict: Verdict,
    pub insight: String,
}
