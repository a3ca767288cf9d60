//! Connection worker, connection manager, and gateways manager: the parts
//! that take a resolved set of payloads and actually get them delivered,
//! with bounded concurrency and scheduled retry.

pub mod callbacks;
pub mod gateways_manager;
pub mod manager;
pub mod message;
mod worker;

pub use callbacks::{ExceptionCallback, StatusCallback};
pub use gateways_manager::GatewaysManager;
pub use manager::ConnectionManager;
pub use message::InFlightMessage;
