use alarm_channels::{AudioAttachment, GatewayLogin};
use alarm_message::MessagePayload;
use chrono::{DateTime, Utc};

/// One message owned exclusively while it is enqueued or being handled by
/// exactly one worker.
#[derive(Debug, Clone)]
pub struct InFlightMessage {
    pub sequence: u64,
    pub code: String,
    pub event_time_utc: DateTime<Utc>,
    pub is_real_alarm: bool,
    pub payload: MessagePayload,
    pub login: GatewayLogin,
    pub audio: Option<AudioAttachment>,
    pub attempt_count: u32,
}
