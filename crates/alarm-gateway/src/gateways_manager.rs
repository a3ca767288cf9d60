//! Gateways manager (component I): routes a tone detection to payloads via
//! the routing database, then to connection managers keyed by gateway kind.

use crate::callbacks::{ExceptionCallback, StatusCallback};
use crate::manager::ConnectionManager;
use crate::message::InFlightMessage;
use alarm_channels::{AudioAttachment, GatewayLoginDatabase};
use alarm_common::{DispatchError, GatewayKind};
use alarm_routing::{AlarmMessageDatabase, ToneCode};
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{info, warn};

/// Owns the routing database, the login database, and one connection
/// manager per configured gateway kind. Safe to share behind an `Arc` and
/// call from multiple tasks: `send` only takes read locks, and config
/// reloads take write locks that block new sends briefly.
pub struct GatewaysManager {
    message_db: RwLock<AlarmMessageDatabase>,
    login_db: RwLock<GatewayLoginDatabase>,
    managers: RwLock<HashMap<GatewayKind, ConnectionManager>>,
    status_cb: Arc<dyn StatusCallback>,
    exception_cb: Arc<dyn ExceptionCallback>,
    next_sequence: AtomicU64,
    log_all_codes: bool,
}

impl GatewaysManager {
    pub fn new(
        message_db: AlarmMessageDatabase,
        login_db: GatewayLoginDatabase,
        status_cb: Arc<dyn StatusCallback>,
        exception_cb: Arc<dyn ExceptionCallback>,
    ) -> Self {
        Self::with_protocol_logging(message_db, login_db, status_cb, exception_cb, false)
    }

    /// `log_all_codes` mirrors the `protocol.default` config flag: when set,
    /// every call to [`Self::send`] is logged regardless of whether routing
    /// found a match.
    pub fn with_protocol_logging(
        message_db: AlarmMessageDatabase,
        login_db: GatewayLoginDatabase,
        status_cb: Arc<dyn StatusCallback>,
        exception_cb: Arc<dyn ExceptionCallback>,
        log_all_codes: bool,
    ) -> Self {
        let managers = build_managers(&login_db, &status_cb, &exception_cb);
        Self {
            message_db: RwLock::new(message_db),
            login_db: RwLock::new(login_db),
            managers: RwLock::new(managers),
            status_cb,
            exception_cb,
            next_sequence: AtomicU64::new(0),
            log_all_codes,
        }
    }

    /// Swaps in a newly loaded routing database; existing connection
    /// managers and in-flight messages are unaffected.
    pub fn reset_message_db(&self, message_db: AlarmMessageDatabase) {
        *self.message_db.write() = message_db;
    }

    /// Swaps in a newly loaded login database and rebuilds every connection
    /// manager against it. Managers for kinds no longer present are drained
    /// and dropped; messages already dispatched to them finish normally.
    pub async fn reset_login_db(&self, login_db: GatewayLoginDatabase) {
        let new_managers = build_managers(&login_db, &self.status_cb, &self.exception_cb);
        let old_managers = {
            let mut guard = self.managers.write();
            std::mem::replace(&mut *guard, new_managers)
        };
        *self.login_db.write() = login_db;
        for (_, manager) in old_managers {
            manager.shutdown().await;
        }
    }

    /// Resolves `code` at `event_time_utc` and dispatches every resulting
    /// payload to its connection manager. Returns an error only if routing
    /// itself found nothing; a payload whose gateway kind has no configured
    /// connection manager is reported via the exception callback and
    /// otherwise skipped, so the remaining payloads still go out.
    pub fn send(
        &self,
        code: &ToneCode,
        event_time_utc: DateTime<Utc>,
        is_real_alarm: bool,
        audio: Option<AudioAttachment>,
    ) -> Result<(), DispatchError> {
        if self.log_all_codes {
            info!(code = %code, is_real_alarm, "detected code");
        }

        let result = self.message_db.read().search(code, event_time_utc)?;
        let login_db = self.login_db.read();
        let managers = self.managers.read();

        let mut dispatched = 0usize;
        let mut first_unreachable: Option<GatewayKind> = None;
        for payload in result.payloads {
            let Some(kind) = payload.gateway_kind() else {
                continue;
            };
            let Some(manager) = managers.get(&kind) else {
                warn!(kind = %kind, code = %code, "no connection manager configured for this gateway kind");
                self.exception_cb
                    .on_exception(kind, &format!("no connection manager configured for {kind}"));
                first_unreachable.get_or_insert(kind);
                continue;
            };
            let Some(login) = login_db.search(kind) else {
                warn!(kind = %kind, code = %code, "no login data configured for this gateway kind");
                self.exception_cb.on_exception(kind, &format!("no login data configured for {kind}"));
                first_unreachable.get_or_insert(kind);
                continue;
            };

            let sequence = self.next_sequence.fetch_add(1, Ordering::Relaxed);
            manager.add_message(InFlightMessage {
                sequence,
                code: code.digits().to_string(),
                event_time_utc,
                is_real_alarm,
                payload,
                login,
                audio: audio.clone(),
                attempt_count: 0,
            });
            dispatched += 1;
        }

        if dispatched == 0 {
            if let Some(kind) = first_unreachable {
                return Err(DispatchError::UnknownGateway(kind));
            }
        }
        Ok(())
    }

    pub async fn shutdown(&self) {
        let managers = std::mem::take(&mut *self.managers.write());
        for (_, manager) in managers {
            manager.shutdown().await;
        }
    }
}

fn build_managers(
    login_db: &GatewayLoginDatabase,
    status_cb: &Arc<dyn StatusCallback>,
    exception_cb: &Arc<dyn ExceptionCallback>,
) -> HashMap<GatewayKind, ConnectionManager> {
    let mut managers = HashMap::new();
    for kind in login_db.kinds() {
        if let Some(login) = login_db.search(kind) {
            managers.insert(
                kind,
                ConnectionManager::new(kind, login, status_cb.clone(), exception_cb.clone()),
            );
        }
    }
    managers
}

#[cfg(test)]
mod tests {
    use super::*;
    use alarm_channels::{ExternalLogin, GatewayLogin, LoginData, RetryPolicy};
    use alarm_message::{AlarmValidities, ExternalPayload, MessagePayload};
    use alarm_validity::ValidityPredicate;
    use alarm_common::StatusRecord;
    use std::sync::Mutex;

    struct CountingStatus(Mutex<usize>);
    impl StatusCallback for CountingStatus {
        fn on_status(&self, _kind: GatewayKind, _status: &StatusRecord, _message: &InFlightMessage) {
            *self.0.lock().unwrap() += 1;
        }
    }

    struct RecordingException(Mutex<Vec<String>>);
    impl ExceptionCallback for RecordingException {
        fn on_exception(&self, kind: GatewayKind, error: &str) {
            self.0.lock().unwrap().push(format!("{kind}: {error}"));
        }
    }

    fn retry_policy() -> RetryPolicy {
        RetryPolicy {
            max_attempts: 1,
            retry_delay_seconds: 0,
            max_concurrent_connections: 1,
        }
    }

    #[tokio::test]
    async fn unknown_gateway_kind_is_reported_and_returns_error() {
        let mut db = alarm_routing::AlarmMessageDatabase::new();
        db.add(
            "12345".parse().unwrap(),
            AlarmValidities::new(vec![(
                ValidityPredicate::Default,
                vec![MessagePayload::External(ExternalPayload {
                    command: "true".into(),
                    arguments: String::new(),
                })],
            )])
            .unwrap(),
        );
        // Deliberately no login data at all, so no connection manager exists
        // for the external gateway kind.
        let login_db = GatewayLoginDatabase::new();
        let status_cb = Arc::new(CountingStatus(Mutex::new(0)));
        let exception_cb = Arc::new(RecordingException(Mutex::new(Vec::new())));

        let manager = GatewaysManager::new(db, login_db, status_cb, exception_cb.clone());
        let err = manager
            .send(&"12345".parse().unwrap(), Utc::now(), false, None)
            .unwrap_err();
        assert!(matches!(err, DispatchError::UnknownGateway(GatewayKind::External)));
        assert_eq!(exception_cb.0.lock().unwrap().len(), 1);
        manager.shutdown().await;
    }

    #[tokio::test]
    async fn matching_code_dispatches_to_its_configured_manager() {
        let mut db = alarm_routing::AlarmMessageDatabase::new();
        db.add(
            "12345".parse().unwrap(),
            AlarmValidities::new(vec![(
                ValidityPredicate::Default,
                vec![MessagePayload::External(ExternalPayload {
                    command: "true".into(),
                    arguments: String::new(),
                })],
            )])
            .unwrap(),
        );
        let mut login_db = GatewayLoginDatabase::new();
        login_db.add(GatewayLogin {
            login: LoginData::External(ExternalLogin {
                working_directory: None,
            }),
            retry_policy: retry_policy(),
        });
        let status_cb = Arc::new(CountingStatus(Mutex::new(0)));
        let exception_cb = Arc::new(RecordingException(Mutex::new(Vec::new())));

        let manager = GatewaysManager::new(db, login_db, status_cb.clone(), exception_cb);
        manager
            .send(&"12345".parse().unwrap(), Utc::now(), false, None)
            .unwrap();

        tokio::time::sleep(std::time::Duration::from_millis(200)).await;
        manager.shutdown().await;
        assert_eq!(*status_cb.0.lock().unwrap(), 1);
    }
}
