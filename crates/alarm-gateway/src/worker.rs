//! Connection worker (component G): one task bound to one gateway instance,
//! sending exactly one payload at a time and reporting its terminal status
//! back to the owning connection manager.

use crate::message::InFlightMessage;
use alarm_channels::SendContext;
use alarm_common::{StatusCode, StatusRecord};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

pub struct WorkerHandle {
    pub id: usize,
    pub submit_tx: mpsc::UnboundedSender<InFlightMessage>,
    pub join_handle: JoinHandle<()>,
}

/// Spawns one worker task. `done_tx` carries `(worker_id, message-with-
/// incremented-attempt-count, terminal status)` back to the owning manager's
/// driver once a send attempt finishes.
pub fn spawn_worker(
    id: usize,
    done_tx: mpsc::UnboundedSender<(usize, InFlightMessage, StatusRecord)>,
) -> WorkerHandle {
    let (submit_tx, mut submit_rx) = mpsc::unbounded_channel::<InFlightMessage>();

    let join_handle = tokio::spawn(async move {
        while let Some(mut message) = submit_rx.recv().await {
            debug!(worker_id = id, code = %message.code, attempt = message.attempt_count + 1, "sending");

            let ctx = SendContext {
                code: message.code.clone(),
                event_time_utc: message.event_time_utc,
                is_real_alarm: message.is_real_alarm,
                audio: message.audio.clone(),
            };

            let outcome = alarm_channels::send_payload(&message.payload, &message.login.login, &ctx).await;
            message.attempt_count += 1;

            let status = match outcome {
                Ok(()) => StatusRecord::success(),
                Err(e) if e.is_recoverable() => StatusRecord::new(StatusCode::NonFatalFailure, e.to_string()),
                Err(e) => StatusRecord::new(StatusCode::FatalFailure, e.to_string()),
            };

            if done_tx.send((id, message, status)).is_err() {
                warn!(worker_id = id, "manager driver gone, worker exiting");
                break;
            }
        }
    });

    WorkerHandle {
        id,
        submit_tx,
        join_handle,
    }
}
