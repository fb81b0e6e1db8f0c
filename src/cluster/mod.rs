//! Gateway cluster: the configured gateways, how one is picked for an
//! attempt, and when an unreachable gateway warrants an alert.
//!
//! - [`Gateway`] pairs a descriptor with its protocol client and failure history
//! - [`Selector`] strategies pick the gateway for each attempt
//! - [`FailureTracker`] decides when sustained failures should alert
//! - [`MockGateway`] stands in for hardware in tests

mod endpoint;
mod failure;
mod lb;
mod mock;

pub use endpoint::Gateway;
pub use failure::{far_past, FailureHistory, FailureTracker, DEFAULT_HISTORY_LEN};
pub use lb::{Selector, Weighted};
pub use mock::{MockBehavior, MockGateway, ReceivedMessage};
