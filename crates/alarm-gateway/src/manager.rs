//! Connection manager (component H): a fixed worker pool, a time-ordered
//! retry queue, and one driver task doing reap-then-dispatch on every wake.
//! The reap/dispatch/sleep cycle mirrors a classic condition-variable manager
//! thread, expressed here as a single `tokio::select!` loop instead.

use crate::callbacks::{ExceptionCallback, StatusCallback};
use crate::message::InFlightMessage;
use crate::worker::{spawn_worker, WorkerHandle};
use alarm_channels::GatewayLogin;
use alarm_common::{GatewayKind, StatusCode, StatusRecord};
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use std::collections::{BTreeMap, HashSet, VecDeque};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tracing::{error, info, warn};

enum Command {
    Enqueue(InFlightMessage),
    Shutdown(oneshot::Sender<()>),
}

/// Owns a fixed pool of workers for one gateway kind and drives message
/// dispatch and retry for it.
pub struct ConnectionManager {
    kind: GatewayKind,
    command_tx: mpsc::UnboundedSender<Command>,
}

impl ConnectionManager {
    pub fn new(
        kind: GatewayKind,
        login: GatewayLogin,
        status_cb: Arc<dyn StatusCallback>,
        exception_cb: Arc<dyn ExceptionCallback>,
    ) -> Self {
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let (done_tx, done_rx) = mpsc::unbounded_channel();

        let pool_size = login.retry_policy.max_concurrent_connections.max(1);
        let workers: Vec<WorkerHandle> = (0..pool_size).map(|id| spawn_worker(id, done_tx.clone())).collect();
        drop(done_tx);

        tokio::spawn(driver_loop(
            kind,
            login,
            workers,
            command_rx,
            done_rx,
            status_cb,
            exception_cb,
        ));

        Self { kind, command_tx }
    }

    pub fn kind(&self) -> GatewayKind {
        self.kind
    }

    /// Enqueues a message, due immediately. Never blocks on I/O.
    pub fn add_message(&self, message: InFlightMessage) {
        if self.command_tx.send(Command::Enqueue(message)).is_err() {
            warn!(kind = %self.kind, "connection manager driver is gone, dropping message");
        }
    }

    /// Drains: waits for in-flight workers to finish their current attempt,
    /// drops pending-but-undispatched messages, joins all workers.
    pub async fn shutdown(&self) {
        let (tx, rx) = oneshot::channel();
        if self.command_tx.send(Command::Shutdown(tx)).is_ok() {
            let _ = rx.await;
        }
    }
}

async fn driver_loop(
    kind: GatewayKind,
    login: GatewayLogin,
    mut workers: Vec<WorkerHandle>,
    mut command_rx: mpsc::UnboundedReceiver<Command>,
    mut done_rx: mpsc::UnboundedReceiver<(usize, InFlightMessage, StatusRecord)>,
    status_cb: Arc<dyn StatusCallback>,
    exception_cb: Arc<dyn ExceptionCallback>,
) {
    let mut available: VecDeque<usize> = (0..workers.len()).collect();
    let mut busy: HashSet<usize> = HashSet::new();
    let mut pending: BTreeMap<(DateTime<Utc>, u64), InFlightMessage> = BTreeMap::new();
    let mut next_seq: u64 = 0;
    let retry_policy = login.retry_policy;

    loop {
        let sleep_duration = match pending.keys().next() {
            Some((due, _)) => (*due - Utc::now()).to_std().unwrap_or(std::time::Duration::ZERO),
            None => std::time::Duration::from_secs(3600),
        };

        tokio::select! {
            _ = tokio::time::sleep(sleep_duration) => {}
            command = command_rx.recv() => {
                match command {
                    Some(Command::Enqueue(message)) => {
                        pending.insert((Utc::now(), next_seq), message);
                        next_seq += 1;
                    }
                    Some(Command::Shutdown(ack)) => {
                        pending.clear();
                        while !busy.is_empty() {
                            match done_rx.recv().await {
                                Some((worker_id, message, status)) => {
                                    busy.remove(&worker_id);
                                    status_cb.on_status(kind, &status, &message);
                                }
                                None => break,
                            }
                        }
                        for worker in workers.drain(..) {
                            drop(worker.submit_tx);
                            if let Err(e) = worker.join_handle.await {
                                error!(kind = %kind, worker_id = worker.id, "worker task panicked: {e}");
                                exception_cb.on_exception(kind, &format!("worker {} panicked: {e}", worker.id));
                            }
                        }
                        let _ = ack.send(());
                        return;
                    }
                    None => {
                        warn!(kind = %kind, "all manager handles dropped, shutting down driver");
                        return;
                    }
                }
            }
            finished = done_rx.recv() => {
                match finished {
                    Some((worker_id, message, status)) => {
                        reap_one(kind, worker_id, message, status, &mut busy, &mut available, &mut pending, &mut next_seq, retry_policy, &status_cb);
                    }
                    None => {
                        error!(kind = %kind, "all workers gone unexpectedly");
                        exception_cb.on_exception(kind, "all workers terminated unexpectedly");
                        return;
                    }
                }
            }
        }

        dispatch_due(&mut pending, &mut available, &workers);
    }
}

#[allow(clippy::too_many_arguments)]
fn reap_one(
    kind: GatewayKind,
    worker_id: usize,
    message: InFlightMessage,
    status: StatusRecord,
    busy: &mut HashSet<usize>,
    available: &mut VecDeque<usize>,
    pending: &mut BTreeMap<(DateTime<Utc>, u64), InFlightMessage>,
    next_seq: &mut u64,
    retry_policy: alarm_channels::RetryPolicy,
    status_cb: &Arc<dyn StatusCallback>,
) {
    busy.remove(&worker_id);
    available.push_back(worker_id);

    match status.code {
        StatusCode::NonFatalFailure if message.attempt_count < retry_policy.max_attempts => {
            info!(
                kind = %kind,
                code = %message.code,
                attempt = message.attempt_count,
                delay_seconds = retry_policy.retry_delay_seconds,
                "retrying after non-fatal failure"
            );
            status_cb.on_status(kind, &status, &message);
            let due = Utc::now() + ChronoDuration::seconds(retry_policy.retry_delay_seconds as i64);
            pending.insert((due, *next_seq), message);
            *next_seq += 1;
        }
        StatusCode::NonFatalFailure => {
            let timeout_status = StatusRecord::new(
                StatusCode::TimeoutFailure,
                format!("aborted after {} attempts: {}", message.attempt_count, status.text),
            );
            warn!(kind = %kind, code = %message.code, "attempts exhausted, giving up");
            status_cb.on_status(kind, &timeout_status, &message);
        }
        _ => {
            status_cb.on_status(kind, &status, &message);
        }
    }
}

fn dispatch_due(
    pending: &mut BTreeMap<(DateTime<Utc>, u64), InFlightMessage>,
    available: &mut VecDeque<usize>,
    workers: &[WorkerHandle],
) {
    loop {
        if available.is_empty() {
            return;
        }
        let due_now = match pending.keys().next() {
            Some((due, _)) if *due <= Utc::now() => true,
            _ => false,
        };
        if !due_now {
            return;
        }

        let key = *pending.keys().next().unwrap();
        let message = pending.remove(&key).unwrap();
        let worker_id = available.pop_front().unwrap();
        if workers[worker_id].submit_tx.send(message).is_err() {
            // worker task is gone; put the slot back unavailable permanently
            // by simply not re-queueing it as available.
            continue;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alarm_channels::{ExternalLogin, LoginData, RetryPolicy};
    use alarm_message::{ExternalPayload, MessagePayload};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    struct RecordingStatus {
        statuses: Mutex<Vec<StatusCode>>,
        count: AtomicUsize,
    }

    impl StatusCallback for RecordingStatus {
        fn on_status(&self, _kind: GatewayKind, status: &StatusRecord, _message: &InFlightMessage) {
            self.statuses.lock().unwrap().push(status.code);
            self.count.fetch_add(1, Ordering::SeqCst);
        }
    }

    struct NoopException;
    impl ExceptionCallback for NoopException {
        fn on_exception(&self, _kind: GatewayKind, _error: &str) {}
    }

    #[tokio::test]
    async fn dispatches_and_reports_success_for_external_command() {
        let status_cb = Arc::new(RecordingStatus {
            statuses: Mutex::new(Vec::new()),
            count: AtomicUsize::new(0),
        });
        let login = GatewayLogin {
            login: LoginData::External(ExternalLogin {
                working_directory: None,
            }),
            retry_policy: RetryPolicy {
                max_attempts: 2,
                retry_delay_seconds: 1,
                max_concurrent_connections: 1,
            },
        };
        let manager = ConnectionManager::new(
            GatewayKind::External,
            login.clone(),
            status_cb.clone(),
            Arc::new(NoopException),
        );

        manager.add_message(InFlightMessage {
            sequence: 1,
            code: "12345".into(),
            event_time_utc: Utc::now(),
            is_real_alarm: false,
            payload: MessagePayload::External(ExternalPayload {
                command: "true".into(),
                arguments: String::new(),
            }),
            login,
            audio: None,
            attempt_count: 0,
        });

        tokio::time::sleep(std::time::Duration::from_millis(200)).await;
        manager.shutdown().await;

        let statuses = status_cb.statuses.lock().unwrap();
        assert_eq!(statuses.as_slice(), &[StatusCode::Success]);
    }
}
