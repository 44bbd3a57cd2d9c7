//! Inbound actuation commands, decoded once at ingress.

use serde_json::Value;

use crate::ngsi::{ContextAttribute, EntityRef, UpdateContextRequest};

/// Attribute name of the dual safety-interlock switch (kind A).
pub const SAFETY_INTERLOCK_DUAL: &str = "ACTUACION:EncendidoconSeguridad2ONOFF";
/// Attribute name of the single safety-interlock switch (kind B).
pub const SAFETY_INTERLOCK: &str = "ACTUACION:EncendidoconSeguridadONOFF";

/// Suffix of the attribute reporting a command's completion status.
pub const STATUS_SUFFIX: &str = "Status";
/// Value reported on the status attribute after a successful actuation.
pub const STATUS_OK: &str = "OK";

// ---------------------------------------------------------------------------
// CommandKind
// ---------------------------------------------------------------------------

/// Closed set of recognised command attributes.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CommandKind {
    /// `ACTUACION:EncendidoconSeguridad2ONOFF`: switches general power
    /// unconditionally.
    SafetyInterlockDual,
    /// `ACTUACION:EncendidoconSeguridadONOFF`: toggles reduced power, only
    /// while general power is already on.
    SafetyInterlock,
    /// Any other attribute name. Processed as a silent no-op.
    Unrecognized(String),
}

impl CommandKind {
    #[must_use]
    pub fn from_attribute_name(name: &str) -> Self {
        match name {
            SAFETY_INTERLOCK_DUAL => Self::SafetyInterlockDual,
            SAFETY_INTERLOCK => Self::SafetyInterlock,
            other => Self::Unrecognized(other.to_string()),
        }
    }

    /// Whether deciding this command needs the entity's current
    /// `powerState_general` from the Context Broker.
    #[must_use]
    pub fn requires_power_state(&self) -> bool {
        matches!(self, Self::SafetyInterlock)
    }
}

// ---------------------------------------------------------------------------
// CommandValue
// ---------------------------------------------------------------------------

/// Requested switch position. Only the JSON strings `"1"` and `"0"` are
/// recognised; numbers and every other string decode to `Other`.
#[derive(Debug, Clone, PartialEq)]
pub enum CommandValue {
    On,
    Off,
    Other(Value),
}

impl CommandValue {
    #[must_use]
    pub fn from_json(value: &Value) -> Self {
        match value.as_str() {
            Some("1") => Self::On,
            Some("0") => Self::Off,
            _ => Self::Other(value.clone()),
        }
    }
}

// ---------------------------------------------------------------------------
// Command
// ---------------------------------------------------------------------------

/// One inbound command: the first attribute of the first context element.
#[derive(Debug, Clone, PartialEq)]
pub struct Command {
    pub entity: EntityRef,
    pub attribute_name: String,
    pub attribute_type: String,
    pub kind: CommandKind,
    pub value: CommandValue,
}

impl Command {
    /// Extracts the command from an inbound `updateContext` payload.
    ///
    /// Returns `None` when the payload has no context element or the first
    /// element has no attribute. Additional elements and attributes are
    /// ignored.
    #[must_use]
    pub fn from_update(request: &UpdateContextRequest) -> Option<Self> {
        let element = request.first_element()?;
        let attribute = element.first_attribute()?;
        Some(Self {
            entity: element.entity(),
            attribute_name: attribute.name.clone(),
            attribute_type: attribute.attr_type.clone(),
            kind: CommandKind::from_attribute_name(&attribute.name),
            value: CommandValue::from_json(&attribute.value),
        })
    }

    /// The `<attributeName>Status = "OK"` attribute reported after a
    /// successful state update.
    #[must_use]
    pub fn status_attribute(&self) -> ContextAttribute {
        ContextAttribute::new(
            format!("{}{STATUS_SUFFIX}", self.attribute_name),
            self.attribute_type.clone(),
            STATUS_OK,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn request(name: &str, value: Value) -> UpdateContextRequest {
        serde_json::from_value(json!({
            "contextElements": [{
                "id": "farola-7",
                "type": "Luminaria",
                "attributes": [{ "name": name, "type": "command", "value": value }]
            }],
            "updateAction": "UPDATE"
        }))
        .unwrap()
    }

    #[test]
    fn decodes_recognised_kinds() {
        assert_eq!(
            CommandKind::from_attribute_name(SAFETY_INTERLOCK_DUAL),
            CommandKind::SafetyInterlockDual
        );
        assert_eq!(
            CommandKind::from_attribute_name(SAFETY_INTERLOCK),
            CommandKind::SafetyInterlock
        );
        assert_eq!(
            CommandKind::from_attribute_name("ACTUACION:Otro"),
            CommandKind::Unrecognized("ACTUACION:Otro".to_string())
        );
    }

    #[test]
    fn only_interlock_requires_power_state() {
        assert!(CommandKind::SafetyInterlock.requires_power_state());
        assert!(!CommandKind::SafetyInterlockDual.requires_power_state());
        assert!(!CommandKind::Unrecognized("x".into()).requires_power_state());
    }

    #[test]
    fn decodes_values_strictly() {
        assert_eq!(CommandValue::from_json(&json!("1")), CommandValue::On);
        assert_eq!(CommandValue::from_json(&json!("0")), CommandValue::Off);
        assert_eq!(CommandValue::from_json(&json!(1)), CommandValue::Other(json!(1)));
        assert_eq!(CommandValue::from_json(&json!(" 1")), CommandValue::Other(json!(" 1")));
    }

    #[test]
    fn extracts_first_attribute_of_first_element() {
        let cmd = Command::from_update(&request(SAFETY_INTERLOCK, json!("0"))).unwrap();
        assert_eq!(cmd.entity, EntityRef::new("farola-7", "Luminaria"));
        assert_eq!(cmd.attribute_type, "command");
        assert_eq!(cmd.kind, CommandKind::SafetyInterlock);
        assert_eq!(cmd.value, CommandValue::Off);
    }

    #[test]
    fn no_command_without_attribute() {
        let req: UpdateContextRequest = serde_json::from_value(json!({
            "contextElements": [{ "id": "farola-7", "type": "Luminaria", "attributes": [] }]
        }))
        .unwrap();
        assert!(Command::from_update(&req).is_none());
        assert!(Command::from_update(&UpdateContextRequest::default()).is_none());
    }

    #[test]
    fn status_attribute_is_suffixed_ok() {
        let cmd = Command::from_update(&request(SAFETY_INTERLOCK_DUAL, json!("1"))).unwrap();
        let status = cmd.status_attribute();
        assert_eq!(status.name, "ACTUACION:EncendidoconSeguridad2ONOFFStatus");
        assert_eq!(status.attr_type, "command");
        assert_eq!(status.value, json!("OK"));
    }
}
