//! Upsell classification for Breezy contacts.
//!
//! - `llm` - the text-generation seam and its Gemini implementation
//! - `opportunity` - synthetic spend, the classification prompt, reply parsing
//! - `guardrails` - shape checks applied before a reply drives a CRM write
//!
//! The model only sees a synthetic spend figure and a fixed threshold rule.
//! Its reply is untrusted: anything that does not match the expected shape is
//! treated as a Low verdict.

pub mod guardrails;
pub mod llm;
pub mod opportunity;

pub use guardrails::{AssessmentDecision, AssessmentPolicy};
pub use llm::{GeminiClient, LlmClient, LlmError};
pub use opportunity::{Assessment, ClassifierError, OpportunityClassifier, SpendSample};
