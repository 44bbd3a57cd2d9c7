//! Wire-compatible NGSI v1 context schemas.
//!
//! These types model the JSON bodies exchanged with the Context Broker on
//! `POST /v1/updateContext` and `POST /v1/queryContext`, plus the inbound
//! command payload and its synchronous acknowledgement. All structs use
//! `#[serde(rename_all = "camelCase")]` to match the NGSI wire format.

pub mod element;
pub mod query;
pub mod response;
pub mod update;

pub use element::{ContextAttribute, ContextElement, EntityRef};
pub use query::{QueryContextRequest, QueryEntity};
pub use response::{ContextResponse, ContextResponseEnvelope, StatusCode};
pub use update::{UpdateAction, UpdateContextRequest};

/// Attribute type used for free-text attributes.
pub const TYPE_TEXT: &str = "Text";
/// Attribute type used for numeric attributes.
pub const TYPE_NUMBER: &str = "Number";
/// Attribute type used for ISO-8601 timestamps.
pub const TYPE_DATE_TIME: &str = "DateTime";
