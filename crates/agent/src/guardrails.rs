use breezy_core::domain::opportunity::Verdict;
use serde_json::Value;

pub const FAIL_CLOSED_INSIGHT: &str =
    "Classifier reply did not match the expected shape; treated as low priority.";

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AssessmentDecision {
    Accept { verdict: Verdict, reasoning: String },
    Degrade { reason_code: &'static str, user_message: String },
}

impl AssessmentDecision {
    pub fn verdict(&self) -> Verdict {
        match self {
            Self::Accept { verdict, .. } => *verdict,
            Self::Degrade { .. } => Verdict::Low,
        }
    }

    pub fn insight(&self) -> &str {
        match self {
            Self::Accept { reasoning, .. } => reasoning,
            Self::Degrade { user_message, .. } => user_message,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AssessmentPolicy {
    pub max_reasoning_chars: usize,
}

impl Default for AssessmentPolicy {
    fn default() -> Self {
        Self { max_reasoning_chars: 280 }
    }
}

impl AssessmentPolicy {
    /// Checks a parsed classifier reply. Anything unexpected degrades to Low.
    pub fn evaluate(&self, reply: &Value) -> AssessmentDecision {
        let Some(object) = reply.as_object() else {
            return degrade("reply_not_object");
        };

        let verdict = match object.get("verdict").and_then(Value::as_str) {
            Some(raw) => match Verdict::parse(raw) {
                Some(verdict) => verdict,
                None => return degrade("unknown_verdict"),
            },
            None => return degrade("missing_verdict"),
        };

        let reasoning = match object.get("reasoning").and_then(Value::as_str) {
            Some(text) if text.trim().is_empty() => return degrade("empty_reasoning"),
            Some(text) if text.chars().count() > self.max_reasoning_chars => {
                return degrade("reasoning_too_long")
            }
            Some(text) => text.trim().to_string(),
            None => return degrade("missing_reasoning"),
        };

        AssessmentDecision::Accept { verdict, reasoning }
    }
}

fn degrade(reason_code: &'static str) -> AssessmentDecision {
    AssessmentDecision::Degrade { reason_code, user_message: FAIL_CLOSED_INSIGHT.to_string() }
}
