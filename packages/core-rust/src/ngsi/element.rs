//! Context elements, attributes, and entity references.

use serde::{Deserialize, Serialize};
use serde_json::Value;

// ---------------------------------------------------------------------------
// EntityRef
// ---------------------------------------------------------------------------

/// Addressable entity identity: the `(id, type)` pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct EntityRef {
    /// Entity identifier.
    pub id: String,
    /// Entity type. `type` is a Rust keyword, hence the rename.
    #[serde(rename = "type", default)]
    pub entity_type: String,
}

impl EntityRef {
    #[must_use]
    pub fn new(id: impl Into<String>, entity_type: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            entity_type: entity_type.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// ContextAttribute
// ---------------------------------------------------------------------------

/// A named, typed attribute of a context element.
///
/// `value` is arbitrary JSON: inbound command values arrive as strings,
/// while outbound power states are sent as JSON numbers.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ContextAttribute {
    #[serde(default)]
    pub name: String,
    #[serde(rename = "type", default)]
    pub attr_type: String,
    #[serde(default)]
    pub value: Value,
}

impl ContextAttribute {
    #[must_use]
    pub fn new(name: impl Into<String>, attr_type: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            name: name.into(),
            attr_type: attr_type.into(),
            value: value.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// ContextElement
// ---------------------------------------------------------------------------

/// An entity together with a set of attributes.
///
/// Every field defaults when absent so that a sparse inbound payload can
/// still be acknowledged. `isPattern` is kept as raw JSON because the
/// Context Broker accepts both `false` and `"false"`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContextElement {
    #[serde(default)]
    pub id: String,
    #[serde(rename = "type", default)]
    pub entity_type: String,
    #[serde(default = "default_is_pattern")]
    pub is_pattern: Value,
    #[serde(default)]
    pub attributes: Vec<ContextAttribute>,
}

fn default_is_pattern() -> Value {
    Value::Bool(false)
}

impl ContextElement {
    /// Builds an element for an outbound request. The broker expects the
    /// string form `"false"` for `isPattern` on updates and queries.
    #[must_use]
    pub fn outbound(entity: &EntityRef, attributes: Vec<ContextAttribute>) -> Self {
        Self {
            id: entity.id.clone(),
            entity_type: entity.entity_type.clone(),
            is_pattern: Value::String("false".to_string()),
            attributes,
        }
    }

    /// Returns the `(id, type)` pair of this element.
    #[must_use]
    pub fn entity(&self) -> EntityRef {
        EntityRef::new(self.id.clone(), self.entity_type.clone())
    }

    /// Returns the first attribute, if any. Additional attributes are ignored
    /// by every consumer in this system.
    #[must_use]
    pub fn first_attribute(&self) -> Option<&ContextAttribute> {
        self.attributes.first()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn sparse_element_deserializes_with_defaults() {
        let element: ContextElement = serde_json::from_value(json!({ "id": "dev-1" })).unwrap();
        assert_eq!(element.id, "dev-1");
        assert_eq!(element.entity_type, "");
        assert_eq!(element.is_pattern, json!(false));
        assert!(element.first_attribute().is_none());
    }

    #[test]
    fn outbound_element_uses_string_is_pattern() {
        let entity = EntityRef::new("dev-1", "Device");
        let element = ContextElement::outbound(
            &entity,
            vec![ContextAttribute::new("powerState_general", "Number", 1)],
        );
        let wire = serde_json::to_value(&element).unwrap();
        assert_eq!(
            wire,
            json!({
                "id": "dev-1",
                "type": "Device",
                "isPattern": "false",
                "attributes": [{ "name": "powerState_general", "type": "Number", "value": 1 }]
            })
        );
    }

    #[test]
    fn attribute_value_keeps_json_kind() {
        let attr: ContextAttribute =
            serde_json::from_value(json!({ "name": "a", "type": "Number", "value": 0 })).unwrap();
        assert_eq!(attr.value, json!(0));
        assert!(attr.value.as_str().is_none());
    }
}
