//! HCP Core: NGSI context types, command model, and the actuation decision engine.
//!
//! Everything in this crate is pure: no I/O, no clocks other than the
//! timestamp handed to [`decision::decide`].

pub mod command;
pub mod context;
pub mod decision;
pub mod ngsi;

pub use command::{Command, CommandKind, CommandValue};
pub use context::{CorrelationContext, Tenant};
pub use decision::{decide, decide_command, Decision, LastCommand, NoOpReason, PowerState, StateUpdate};
pub use ngsi::{
    ContextAttribute, ContextElement, ContextResponse, ContextResponseEnvelope, EntityRef,
    QueryContextRequest, StatusCode, UpdateAction, UpdateContextRequest,
};
