//! `updateContext` request bodies and the synchronous command acknowledgement.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::element::{ContextAttribute, ContextElement, EntityRef};
use super::response::{ContextResponse, ContextResponseEnvelope, StatusCode};

// ---------------------------------------------------------------------------
// UpdateAction
// ---------------------------------------------------------------------------

/// NGSI update action. Outbound requests from this system always use `APPEND`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UpdateAction {
    Append,
    AppendStrict,
    Update,
    Delete,
    Replace,
    /// Any action string this system does not interpret.
    #[serde(other)]
    Other,
}

// ---------------------------------------------------------------------------
// UpdateContextRequest
// ---------------------------------------------------------------------------

/// Body of `POST /v1/updateContext`, both inbound (a command from the
/// Context Broker) and outbound (a state report to it).
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateContextRequest {
    #[serde(default)]
    pub context_elements: Vec<ContextElement>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub update_action: Option<UpdateAction>,
}

impl UpdateContextRequest {
    /// Builds an `APPEND` request adding `attributes` to a single entity.
    #[must_use]
    pub fn append(entity: &EntityRef, attributes: Vec<ContextAttribute>) -> Self {
        Self {
            context_elements: vec![ContextElement::outbound(entity, attributes)],
            update_action: Some(UpdateAction::Append),
        }
    }

    /// Returns the first context element. Only the first element of an
    /// inbound command is ever consulted.
    #[must_use]
    pub fn first_element(&self) -> Option<&ContextElement> {
        self.context_elements.first()
    }

    /// Builds the protocol acknowledgement returned synchronously to the
    /// caller of an inbound command.
    ///
    /// The acknowledgement echoes the first element's id/type and the first
    /// attribute's name/type with an empty value, always with status
    /// `200 OK`. It is independent of whatever the delayed actuation later
    /// decides.
    #[must_use]
    pub fn acknowledgement(&self) -> ContextResponseEnvelope {
        let element = self.first_element();
        let attribute = element.and_then(ContextElement::first_attribute);

        let ack_element = ContextElement {
            id: element.map(|e| e.id.clone()).unwrap_or_default(),
            entity_type: element.map(|e| e.entity_type.clone()).unwrap_or_default(),
            is_pattern: Value::Bool(false),
            attributes: vec![ContextAttribute {
                name: attribute.map(|a| a.name.clone()).unwrap_or_default(),
                attr_type: attribute.map(|a| a.attr_type.clone()).unwrap_or_default(),
                value: Value::String(String::new()),
            }],
        };

        ContextResponseEnvelope {
            context_responses: vec![ContextResponse {
                context_element: ack_element,
                status_code: Some(StatusCode::ok()),
            }],
            error_code: None,
        }
    }
}
