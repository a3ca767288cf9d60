use crate::message::InFlightMessage;
use alarm_common::{GatewayKind, StatusRecord};

/// Invoked for every terminal per-attempt status of every message, from the
/// driver task of whichever connection manager produced it.
pub trait StatusCallback: Send + Sync {
    fn on_status(&self, kind: GatewayKind, status: &StatusRecord, message: &InFlightMessage);
}

/// Invoked once if a connection manager's driver or one of its workers
/// terminates abnormally. The manager is considered dead afterwards.
pub trait ExceptionCallback: Send + Sync {
    fn on_exception(&self, kind: GatewayKind, error: &str);
}
