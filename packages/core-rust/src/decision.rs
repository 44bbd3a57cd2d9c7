//! Actuation decision engine.
//!
//! A pure function of (command kind, command value, currently reported
//! `powerState_general`) to either an outbound state update or a no-op:
//!
//! | kind                  | value | precondition        | outbound state             |
//! |-----------------------|-------|---------------------|----------------------------|
//! | `SafetyInterlockDual` | `"1"` | none                | GENERAL, general=1, reduced=0  |
//! | `SafetyInterlockDual` | `"0"` | none                | OFF, general=0, reduced=0      |
//! | `SafetyInterlock`     | `"1"` | general == `"1"`    | REDUCIDA, general=1, reduced=1 |
//! | `SafetyInterlock`     | `"0"` | general == `"1"`    | GENERAL, general=1, reduced=0  |
//! | `SafetyInterlock`     | any   | general != `"1"`    | no-op                      |
//! | anything else         |       |                     | no-op                      |

use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::Value;

use crate::command::{Command, CommandKind, CommandValue};
use crate::ngsi::{ContextAttribute, TYPE_DATE_TIME, TYPE_NUMBER, TYPE_TEXT};

pub const LAST_COMMAND: &str = "lastCommand";
pub const LAST_COMMAND_TIMESTAMP: &str = "lastCommandTimestamp";
pub const POWER_STATE_GENERAL: &str = "powerState_general";
pub const POWER_STATE_REDUCED: &str = "powerState_reduced";

// ---------------------------------------------------------------------------
// Outbound state
// ---------------------------------------------------------------------------

/// Mode reported in the `lastCommand` attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LastCommand {
    General,
    Reducida,
    Off,
}

impl LastCommand {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::General => "GENERAL",
            Self::Reducida => "REDUCIDA",
            Self::Off => "OFF",
        }
    }
}

/// The pair of power-state attributes reported to the Context Broker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PowerState {
    pub general: bool,
    pub reduced: bool,
}

/// State produced by a decision, stamped with the decision's wall-clock time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateUpdate {
    pub last_command: LastCommand,
    pub power: PowerState,
    pub decided_at: DateTime<Utc>,
}

impl StateUpdate {
    fn new(last_command: LastCommand, general: bool, reduced: bool, decided_at: DateTime<Utc>) -> Self {
        Self {
            last_command,
            power: PowerState { general, reduced },
            decided_at,
        }
    }

    /// Renders the update as the four attributes appended to the entity,
    /// in wire order.
    #[must_use]
    pub fn attributes(&self) -> Vec<ContextAttribute> {
        vec![
            ContextAttribute::new(LAST_COMMAND, TYPE_TEXT, self.last_command.as_str()),
            ContextAttribute::new(
                LAST_COMMAND_TIMESTAMP,
                TYPE_DATE_TIME,
                self.decided_at.to_rfc3339_opts(SecondsFormat::Millis, true),
            ),
            ContextAttribute::new(POWER_STATE_GENERAL, TYPE_NUMBER, u8::from(self.power.general)),
            ContextAttribute::new(POWER_STATE_REDUCED, TYPE_NUMBER, u8::from(self.power.reduced)),
        ]
    }
}

// ---------------------------------------------------------------------------
// Decision
// ---------------------------------------------------------------------------

/// Why a command produced no update.
#[derive(Debug, Clone, PartialEq)]
pub enum NoOpReason {
    /// The attribute name is not one of the recognised command kinds.
    UnrecognizedCommand(String),
    /// The value is neither `"1"` nor `"0"`.
    UnrecognizedValue(Value),
    /// `SafetyInterlock` requires `powerState_general == "1"`; carries what
    /// the broker reported, `None` when nothing was found.
    GeneralPowerOff(Option<Value>),
}

/// Outcome of evaluating the decision table.
#[derive(Debug, Clone, PartialEq)]
pub enum Decision {
    Update(StateUpdate),
    NoOp(NoOpReason),
}

/// Evaluates the decision table.
///
/// `power_state_general` is the value queried from the Context Broker; it
/// is only consulted for [`CommandKind::SafetyInterlock`].
#[must_use]
pub fn decide(
    kind: &CommandKind,
    value: &CommandValue,
    power_state_general: Option<&Value>,
    now: DateTime<Utc>,
) -> Decision {
    match kind {
        CommandKind::SafetyInterlockDual => match value {
            CommandValue::On => Decision::Update(StateUpdate::new(LastCommand::General, true, false, now)),
            CommandValue::Off => Decision::Update(StateUpdate::new(LastCommand::Off, false, false, now)),
            CommandValue::Other(v) => Decision::NoOp(NoOpReason::UnrecognizedValue(v.clone())),
        },
        CommandKind::SafetyInterlock => {
            if power_state_general.and_then(Value::as_str) != Some("1") {
                return Decision::NoOp(NoOpReason::GeneralPowerOff(power_state_general.cloned()));
            }
            match value {
                CommandValue::On => Decision::Update(StateUpdate::new(LastCommand::Reducida, true, true, now)),
                CommandValue::Off => Decision::Update(StateUpdate::new(LastCommand::General, true, false, now)),
                CommandValue::Other(v) => Decision::NoOp(NoOpReason::UnrecognizedValue(v.clone())),
            }
        }
        CommandKind::Unrecognized(name) => Decision::NoOp(NoOpReason::UnrecognizedCommand(name.clone())),
    }
}

/// Convenience wrapper over [`decide`] for a decoded [`Command`].
#[must_use]
pub fn decide_command(command: &Command, power_state_general: Option<&Value>, now: DateTime<Utc>) -> Decision {
    decide(&command.kind, &command.value, power_state_general, now)
}
