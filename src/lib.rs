//! SMS gateway dispatcher.
//!
//! Sends short messages to SMS gateway hardware over a line delimited
//! JSON protocol, choosing gateways by SIM capacity, failing over once,
//! and alerting when a gateway stays unreachable.

pub mod alert;
pub mod cluster;
pub mod codec;
pub mod config;
pub mod dispatch;
pub mod protocol;
pub mod telemetry;
