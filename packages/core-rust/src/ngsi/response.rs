//! Context responses and protocol status codes.
//!
//! The Context Broker answers both `updateContext` and `queryContext` with
//! an HTTP 200 envelope; the real outcome is the `statusCode` embedded in
//! the first context response (or a top-level `errorCode` when the request
//! as a whole was rejected).

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use super::element::ContextElement;

// ---------------------------------------------------------------------------
// String-or-number helper
// ---------------------------------------------------------------------------

/// Accepts a status code given either as a JSON string (`"200"`) or as a
/// JSON number (`200`), normalising both to a string.
fn deserialize_code<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "status code must be a string or number, got {other}"
        ))),
    }
}

// ---------------------------------------------------------------------------
// StatusCode
// ---------------------------------------------------------------------------

/// NGSI protocol-level status carried inside a 200 HTTP envelope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusCode {
    #[serde(deserialize_with = "deserialize_code")]
    pub code: String,
    #[serde(default)]
    pub reason_phrase: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub details: Option<String>,
}

impl StatusCode {
    /// The `200 OK` status used in acknowledgements.
    #[must_use]
    pub fn ok() -> Self {
        Self {
            code: "200".to_string(),
            reason_phrase: "OK".to_string(),
            details: None,
        }
    }

    /// A code is successful iff it begins with `'2'`.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.code.starts_with('2')
    }
}

impl std::fmt::Display for StatusCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.code, self.reason_phrase)?;
        if let Some(details) = &self.details {
            write!(f, " ({details})")?;
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// ContextResponse / envelope
// ---------------------------------------------------------------------------

/// One element of the `contextResponses` array.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContextResponse {
    #[serde(default)]
    pub context_element: ContextElement,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub status_code: Option<StatusCode>,
}

/// Response body of `updateContext` and `queryContext`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContextResponseEnvelope {
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub context_responses: Vec<ContextResponse>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub error_code: Option<StatusCode>,
}

impl ContextResponseEnvelope {
    /// Status of the first context response, falling back to the top-level
    /// `errorCode`. `None` when the body carries neither.
    #[must_use]
    pub fn first_status(&self) -> Option<&StatusCode> {
        self.context_responses
            .first()
            .and_then(|r| r.status_code.as_ref())
            .or(self.error_code.as_ref())
    }

    /// Value of the first attribute of the first returned element, if the
    /// response has that shape.
    #[must_use]
    pub fn first_attribute_value(&self) -> Option<&Value> {
        self.context_responses
            .first()
            .and_then(|r| r.context_element.first_attribute())
            .map(|a| &a.value)
    }
}
