//! Status and exception callbacks (component L, applied to per-message
//! outcomes): every terminal status becomes one structured `tracing` event
//! instead of a line appended to a bespoke log file.

use alarm_gateway::{ExceptionCallback, InFlightMessage, StatusCallback};
use alarm_common::{GatewayKind, StatusRecord};
use alarm_message::{MessagePayload, RestTarget};
use tracing::{error, info};

pub struct LoggingStatusCallback;

impl StatusCallback for LoggingStatusCallback {
    fn on_status(&self, kind: GatewayKind, status: &StatusRecord, message: &InFlightMessage) {
        let target = summarize_target(&message.payload);
        let local_time = alarm_time::format_local(message.event_time_utc);
        info!(
            gateway_kind = %kind,
            code = %message.code,
            local_time = %local_time,
            target = %target,
            status = ?status.code,
            detail = %status.text,
            "send status"
        );
    }
}

pub struct LoggingExceptionCallback;

impl ExceptionCallback for LoggingExceptionCallback {
    fn on_exception(&self, kind: GatewayKind, error: &str) {
        error!(gateway_kind = %kind, %error, "connection manager exception");
    }
}

fn summarize_target(payload: &MessagePayload) -> String {
    match payload {
        MessagePayload::Empty => "none".to_string(),
        MessagePayload::Email(email) => format!("{} recipient(s)", email.recipients.len()),
        MessagePayload::Rest(rest) => match rest {
            alarm_message::RestPayload::AlarmTemplate { template, .. } => format!("template {template}"),
            alarm_message::RestPayload::Target { target, .. } => match target {
                RestTarget::AllUsers => "all users".to_string(),
                RestTarget::Combination { labels, units, scenarios, individuals } => format!(
                    "{} label(s), {} unit(s), {} scenario(s), {} individual(s)",
                    labels.len(),
                    units.len(),
                    scenarios.len(),
                    individuals.len()
                ),
            },
        },
        MessagePayload::External(external) => external.command.clone(),
        MessagePayload::Infoalarm(decorator) => {
            format!("infoalarm({})", summarize_target(decorator.inner()))
        }
    }
}
