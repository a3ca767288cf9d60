//! Shared types used across the alarm gateway crates: the gateway-kind tag,
//! the per-attempt status record, and the error taxonomy each crate boundary
//! converts into.

use serde::{Deserialize, Serialize};

pub mod logging;

/// Identifies which connection manager / send implementation a payload is
/// routed to. New kinds can be added by config without a code change as long
/// as a matching [`crate::GatewayKind`] variant exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GatewayKind {
    Email,
    Rest,
    External,
}

impl std::fmt::Display for GatewayKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GatewayKind::Email => write!(f, "email"),
            GatewayKind::Rest => write!(f, "rest"),
            GatewayKind::External => write!(f, "external"),
        }
    }
}

/// Terminal or in-progress code for one send attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StatusCode {
    InProcessing,
    Success,
    NonFatalFailure,
    FatalFailure,
    TimeoutFailure,
    NotInDatabase,
    NoMessage,
}

/// A status record reported once per terminal transition of one attempt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusRecord {
    pub code: StatusCode,
    pub text: String,
}

impl StatusRecord {
    pub fn new(code: StatusCode, text: impl Into<String>) -> Self {
        Self {
            code,
            text: text.into(),
        }
    }

    pub fn success() -> Self {
        Self::new(StatusCode::Success, "sent")
    }

    pub fn in_processing() -> Self {
        Self::new(StatusCode::InProcessing, "in processing")
    }
}

/// Errors raised while building or reading the validity/payload/routing data
/// model (components B, C, D, E). Construction-time invariant violations live
/// here; they are fatal to whatever loaded the data.
#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    #[error("invalid validity predicate: {0}")]
    InvalidPredicate(String),

    #[error("invalid payload: {0}")]
    InvalidPayload(String),

    #[error("duplicate validity predicate for this entry")]
    DuplicatePredicate,

    #[error("validity predicate not found")]
    PredicateNotFound,

    #[error("cannot remove the default entry while other predicates remain")]
    DefaultStillRequired,

    #[error("an AlarmValidities set must contain a default entry")]
    MissingDefault,

    #[error("invalid local time: {0}")]
    InvalidTime(String),
}

/// Errors raised by the routing database's `search`.
#[derive(Debug, thiserror::Error)]
pub enum RoutingError {
    #[error("no matching, non-empty payload for this code and time")]
    NoMatch,
}

/// Errors raised while dispatching a resolved payload to its gateway.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("no connection manager registered for gateway kind {0}")]
    UnknownGateway(GatewayKind),

    #[error(transparent)]
    Routing(#[from] RoutingError),
}

/// Errors raised by one channel send attempt (component J). Every variant
/// maps to exactly one [`StatusCode`] via [`SendError::is_recoverable`].
#[derive(Debug, thiserror::Error)]
pub enum SendError {
    #[error("transient failure: {0}")]
    Transient(String),

    #[error("fatal failure: {0}")]
    Fatal(String),
}

impl SendError {
    /// Whether this failure should be retried by the connection manager.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, SendError::Transient(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gateway_kind_display() {
        assert_eq!(GatewayKind::Email.to_string(), "email");
        assert_eq!(GatewayKind::Rest.to_string(), "rest");
        assert_eq!(GatewayKind::External.to_string(), "external");
    }

    #[test]
    fn send_error_recoverability() {
        assert!(SendError::Transient("timeout".into()).is_recoverable());
        assert!(!SendError::Fatal("bad cert".into()).is_recoverable());
    }
}
