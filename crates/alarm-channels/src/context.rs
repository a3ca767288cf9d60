use chrono::{DateTime, Utc};
use std::path::PathBuf;

/// A recorded-audio attachment, present only on non-immediate messages.
#[derive(Debug, Clone)]
pub struct AudioAttachment {
    pub path: PathBuf,
    pub media_type: String,
}

/// Per-message context a send implementation needs beyond the payload
/// itself: the originating code, its timestamp, and whether this is a real
/// alarm or a test. Used for `$CODE`/`$TIME`/`$TYPE` substitution and for
/// REST body fields.
#[derive(Debug, Clone)]
pub struct SendContext {
    pub code: String,
    pub event_time_utc: DateTime<Utc>,
    pub is_real_alarm: bool,
    pub audio: Option<AudioAttachment>,
}

impl SendContext {
    pub fn formatted_local_time(&self) -> String {
        alarm_time::format_local(self.event_time_utc)
    }

    /// `Einsatzalarmierung` for a real alarm, `Probealarm` for a test —
    /// matching the `$TYPE` placeholder's two original values.
    pub fn type_label(&self) -> &'static str {
        if self.is_real_alarm {
            "Einsatzalarmierung"
        } else {
            "Probealarm"
        }
    }

    pub fn substitute_placeholders(&self, template: &str) -> String {
        template
            .replace("$CODE", &self.code)
            .replace("$TIME", &self.formatted_local_time())
            .replace("$TYPE", self.type_label())
    }
}
