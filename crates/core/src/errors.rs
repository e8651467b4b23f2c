use thiserror::Error;

/// Failure talking to the CRM.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum CrmError {
    #[error("crm request failed: {0}")]
    Transport(String),
    #[error("crm responded {status}: {body}")]
    Status { status: u16, body: String },
    #[error("crm response could not be decoded: {0}")]
    Decode(String),
    #[error("crm response is missing `{0}`")]
    MissingField(&'static str),
}

impl CrmError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Status { status: 404, .. })
    }
}

/// The operations exposed to the browser, each with a fixed client-safe message.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Operation {
    FetchContacts,
    CreateContact,
    FetchDeals,
    CreateDeal,
    DetectOpportunity,
}

impl Operation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::FetchContacts => "fetch_contacts",
            Self::CreateContact => "create_contact",
            Self::FetchDeals => "fetch_deals",
            Self::CreateDeal => "create_deal",
            Self::DetectOpportunity => "detect_opportunity",
        }
    }

    pub fn user_message(&self) -> &'static str {
        match self {
            Self::FetchContacts => "Failed to fetch contacts",
            Self::CreateContact => "Failed to create contact",
            Self::FetchDeals => "Failed to fetch deals",
            Self::CreateDeal => "Failed processing transaction",
            Self::DetectOpportunity => "Analysis Failed",
        }
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("{} failed: {detail}", operation.as_str())]
pub struct InterfaceError {
    pub operation: Operation,
    pub detail: String,
    pub correlation_id: String,
}

impl InterfaceError {
    pub fn new(
        operation: Operation,
        detail: impl Into<String>,
        correlation_id: impl Into<String>,
    ) -> Self {
        Self { operation, detail: detail.into(), correlation_id: correlation_id.into() }
    }

    pub fn user_message(&self) -> &'static str {
        self.operation.user_message()
    }
}
