//! HCP Server: NGSI command ingress, delayed actuation against the Context
//! Broker, Identity Manager authentication.

pub mod config;
pub mod network;
pub mod service;
pub mod telemetry;
pub mod traits;

pub use config::{FileConfig, Settings};
pub use traits::{ContextBroker, IdentityProvider};
