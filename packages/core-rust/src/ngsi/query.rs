//! `queryContext` request bodies.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::element::EntityRef;

/// Entity selector inside a query. Same shape as [`EntityRef`] plus the
/// `isPattern` flag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryEntity {
    pub id: String,
    #[serde(rename = "type")]
    pub entity_type: String,
    pub is_pattern: Value,
}

/// Body of `POST /v1/queryContext`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryContextRequest {
    pub entities: Vec<QueryEntity>,
    #[serde(default)]
    pub attributes: Vec<String>,
}

impl QueryContextRequest {
    /// Builds a query for a single attribute of a single, non-pattern entity.
    #[must_use]
    pub fn single(entity: &EntityRef, attribute: &str) -> Self {
        Self {
            entities: vec![QueryEntity {
                id: entity.id.clone(),
                entity_type: entity.entity_type.clone(),
                is_pattern: Value::String("false".to_string()),
            }],
            attributes: vec![attribute.to_string()],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn single_attribute_query_wire_format() {
        let query = QueryContextRequest::single(
            &EntityRef::new("farola-7", "Luminaria"),
            "powerState_general",
        );
        assert_eq!(
            serde_json::to_value(&query).unwrap(),
            json!({
                "entities": [{ "id": "farola-7", "type": "Luminaria", "isPattern": "false" }],
                "attributes": ["powerState_general"]
            })
        );
    }
}
