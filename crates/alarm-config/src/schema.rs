//! The TOML-deserializable shape of a configuration file. Field names follow
//! the section layout of the schema this loader implements (see the crate's
//! docs); conversion into the domain model lives in [`crate::build`].

use serde::Deserialize;
use std::collections::HashMap;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RawConfig {
    pub audio: RawAudioConfig,
    pub protocol: RawProtocolConfig,
    pub logins: RawLoginsConfig,
    pub alarms: RawAlarmsConfig,
}

impl Default for RawConfig {
    fn default() -> Self {
        Self {
            audio: RawAudioConfig::default(),
            protocol: RawProtocolConfig::default(),
            logins: RawLoginsConfig::default(),
            alarms: RawAlarmsConfig::default(),
        }
    }
}

/// Accepted and round-tripped for schema fidelity; no audio capture runs in
/// this repository.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RawAudioConfig {
    pub driver_name: String,
    pub device_name: String,
    pub voice_capture_seconds: u32,
    pub min_detection_dist_seconds: u32,
    pub play_tone: bool,
    pub audio_format_id: String,
}

impl Default for RawAudioConfig {
    fn default() -> Self {
        Self {
            driver_name: "default".to_string(),
            device_name: "default".to_string(),
            voice_capture_seconds: 15,
            min_detection_dist_seconds: 3,
            play_tone: true,
            audio_format_id: "wav".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct RawProtocolConfig {
    /// Whether every detected code, matched or not, is logged at `info`.
    pub default: bool,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct RawLoginsConfig {
    pub email: Option<RawEmailLogin>,
    pub rest: Option<RawRestLogin>,
    pub external: Option<RawExternalLogin>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawRetryPolicy {
    pub retry_max_attempts: u32,
    pub retry_delay_seconds: u64,
    pub retry_max_concurrent_connections: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawEmailLogin {
    pub smtp_host: String,
    pub smtp_port: u16,
    /// `plain` | `starttls` | `implicit_tls`
    pub security: String,
    /// `none` | `plain` | `cram_md5`
    pub auth_mode: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    pub from_address: String,
    #[serde(flatten)]
    pub retry: RawRetryPolicy,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawRestLogin {
    pub base_url: String,
    pub api_token: String,
    pub organization_id: String,
    #[serde(flatten)]
    pub retry: RawRetryPolicy,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawExternalLogin {
    pub working_directory: Option<String>,
    #[serde(flatten)]
    pub retry: RawRetryPolicy,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct RawAlarmsConfig {
    pub code: HashMap<String, RawAlarmGroup>,
    pub all: Option<RawAlarmGroup>,
    pub fallback: Option<RawAlarmGroup>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct RawAlarmGroup {
    pub default: Vec<RawPayload>,
    pub weekly_exceptions: Vec<RawWeeklyException>,
    pub monthly_exceptions: Vec<RawMonthlyException>,
    pub single_time_exceptions: Vec<RawSingleTimeException>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawWeeklyException {
    /// `first` | `second` | `third` | `fourth` | `last`
    pub weeks: Vec<String>,
    /// full lowercase English weekday name
    pub weekday: String,
    pub begin: String,
    pub end: String,
    pub payloads: Vec<RawPayload>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawMonthlyException {
    pub day: u32,
    pub months: Vec<u32>,
    pub begin: String,
    pub end: String,
    pub payloads: Vec<RawPayload>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawSingleTimeException {
    /// `"YYYY-MM-DD HH:MM:SS"`, local civil time
    pub begin: String,
    pub end: String,
    pub payloads: Vec<RawPayload>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RawPayload {
    Empty,
    Email {
        site_id: String,
        alarm_id: String,
        recipients: Vec<RawRecipient>,
        body: String,
        #[serde(default)]
        deliver_immediately: bool,
    },
    Rest {
        /// `alarm_template` | `target`
        mode: String,
        template: Option<String>,
        /// `all_users` | `combination`, required when `mode = "target"`
        target_kind: Option<String>,
        #[serde(default)]
        labels: Vec<RawLabelCount>,
        #[serde(default)]
        units: Vec<String>,
        #[serde(default)]
        scenarios: Vec<String>,
        #[serde(default)]
        individuals: Vec<RawIndividual>,
        text: Option<String>,
        message_template: Option<String>,
        event_open_hours: f64,
    },
    External {
        command: String,
        #[serde(default)]
        arguments: String,
    },
    Infoalarm {
        inner: Box<RawPayload>,
        #[serde(default)]
        siblings: Vec<RawPayload>,
    },
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawRecipient {
    pub name: String,
    pub address: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawLabelCount {
    pub label: String,
    pub count: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawIndividual {
    pub first_name: String,
    pub last_name: String,
}
