//! Message payload variants: one per outbound gateway kind, plus the
//! decorator variant that fans a detection out to more than one payload.

use alarm_common::{GatewayKind, ModelError};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmailPayload {
    pub site_id: String,
    pub alarm_id: String,
    pub recipients: Vec<(String, String)>,
    pub body: String,
    pub deliver_immediately: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelCount {
    pub label: String,
    pub count: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Individual {
    pub first_name: String,
    pub last_name: String,
}

/// Who a REST alarm should reach.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RestTarget {
    AllUsers,
    Combination {
        labels: Vec<LabelCount>,
        units: Vec<String>,
        scenarios: Vec<String>,
        individuals: Vec<Individual>,
    },
}

/// How a REST alarm describes itself to recipients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RestContent {
    Text(String),
    MessageTemplate(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RestPayload {
    AlarmTemplate {
        template: String,
        event_open_hours_millis: u64,
    },
    Target {
        target: RestTarget,
        content: RestContent,
        event_open_hours_millis: u64,
    },
}

impl RestPayload {
    pub fn new_alarm_template(template: String, event_open_hours: f64) -> Result<Self, ModelError> {
        if event_open_hours < 0.0 {
            return Err(ModelError::InvalidPayload(
                "event-open duration must not be negative".into(),
            ));
        }
        if template.is_empty() {
            return Err(ModelError::InvalidPayload(
                "alarm template reference must not be empty".into(),
            ));
        }
        Ok(Self::AlarmTemplate {
            template,
            event_open_hours_millis: (event_open_hours * 3_600_000.0) as u64,
        })
    }

    pub fn new_target(
        target: RestTarget,
        content: RestContent,
        event_open_hours: f64,
    ) -> Result<Self, ModelError> {
        if event_open_hours < 0.0 {
            return Err(ModelError::InvalidPayload(
                "event-open duration must not be negative".into(),
            ));
        }
        if let RestContent::Text(text) = &content {
            if text.is_empty() {
                return Err(ModelError::InvalidPayload(
                    "message text must not be empty when no template is given".into(),
                ));
            }
        }
        Ok(Self::Target {
            target,
            content,
            event_open_hours_millis: (event_open_hours * 3_600_000.0) as u64,
        })
    }

    pub fn event_open_hours(&self) -> f64 {
        let millis = match self {
            RestPayload::AlarmTemplate {
                event_open_hours_millis,
                ..
            } => *event_open_hours_millis,
            RestPayload::Target {
                event_open_hours_millis,
                ..
            } => *event_open_hours_millis,
        };
        millis as f64 / 3_600_000.0
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExternalPayload {
    pub command: String,
    /// May contain the placeholder tokens `$CODE`, `$TIME`, `$TYPE`,
    /// substituted at send time.
    pub arguments: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InfoalarmPayload {
    inner: Box<MessagePayload>,
    siblings: Vec<MessagePayload>,
}

impl InfoalarmPayload {
    pub fn new(inner: MessagePayload, siblings: Vec<MessagePayload>) -> Result<Self, ModelError> {
        if matches!(inner, MessagePayload::Empty | MessagePayload::Infoalarm(_)) {
            return Err(ModelError::InvalidPayload(
                "infoalarm payload cannot wrap an empty or another infoalarm payload".into(),
            ));
        }
        Ok(Self {
            inner: Box::new(inner),
            siblings,
        })
    }

    pub fn inner(&self) -> &MessagePayload {
        &self.inner
    }

    pub fn siblings(&self) -> &[MessagePayload] {
        &self.siblings
    }
}

/// A payload to deliver, or the empty sentinel meaning "suppress this
/// outbound for the matching code".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum MessagePayload {
    Empty,
    Email(EmailPayload),
    Rest(RestPayload),
    External(ExternalPayload),
    Infoalarm(InfoalarmPayload),
}

impl MessagePayload {
    pub fn is_empty(&self) -> bool {
        matches!(self, MessagePayload::Empty)
    }

    /// The gateway this payload is routed to. `Infoalarm` reports its inner
    /// payload's kind; `Empty` has none.
    pub fn gateway_kind(&self) -> Option<GatewayKind> {
        match self {
            MessagePayload::Empty => None,
            MessagePayload::Email(_) => Some(GatewayKind::Email),
            MessagePayload::Rest(_) => Some(GatewayKind::Rest),
            MessagePayload::External(_) => Some(GatewayKind::External),
            MessagePayload::Infoalarm(decorator) => decorator.inner().gateway_kind(),
        }
    }

    /// Whether this message should be dispatched immediately at detection
    /// time rather than staged for after-recording delivery.
    pub fn deliver_immediately(&self) -> bool {
        match self {
            MessagePayload::Empty => false,
            MessagePayload::Email(e) => e.deliver_immediately,
            MessagePayload::Rest(_) => true,
            MessagePayload::External(_) => true,
            MessagePayload::Infoalarm(_) => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn infoalarm_rejects_empty_inner() {
        assert!(InfoalarmPayload::new(MessagePayload::Empty, vec![]).is_err());
    }

    #[test]
    fn infoalarm_rejects_nested_infoalarm() {
        let inner = InfoalarmPayload::new(
            MessagePayload::External(ExternalPayload {
                command: "/bin/true".into(),
                arguments: String::new(),
            }),
            vec![],
        )
        .unwrap();
        let err = InfoalarmPayload::new(MessagePayload::Infoalarm(inner), vec![]);
        assert!(err.is_err());
    }

    #[test]
    fn infoalarm_reports_inner_gateway_kind() {
        let inner = MessagePayload::External(ExternalPayload {
            command: "/bin/true".into(),
            arguments: String::new(),
        });
        let decorated = MessagePayload::Infoalarm(InfoalarmPayload::new(inner, vec![]).unwrap());
        assert_eq!(decorated.gateway_kind(), Some(GatewayKind::External));
    }

    #[test]
    fn rest_rejects_negative_event_open() {
        assert!(RestPayload::new_alarm_template("tpl".into(), -1.0).is_err());
    }

    #[test]
    fn rest_rejects_empty_text_without_template() {
        assert!(RestPayload::new_target(RestTarget::AllUsers, RestContent::Text(String::new()), 1.0).is_err());
    }

    #[test]
    fn empty_payload_has_no_gateway_kind() {
        assert_eq!(MessagePayload::Empty.gateway_kind(), None);
        assert!(!MessagePayload::Empty.deliver_immediately());
    }
}
