//! Converts a [`RawConfig`] into the routing and login databases, applying
//! the same construction-time invariants the domain types enforce on their
//! own (`§4.C, §4.D, §4.E` in the design docs): the loader does not bypass
//! `AlarmValidities::new` or any `*Validity::new`, it only feeds them.

use crate::schema::{
    RawAlarmGroup, RawAlarmsConfig, RawConfig, RawEmailLogin, RawExternalLogin, RawLoginsConfig,
    RawMonthlyException, RawPayload, RawRestLogin, RawRetryPolicy, RawSingleTimeException,
    RawWeeklyException,
};
use crate::ConfigError;
use alarm_channels::{
    EmailLogin, ExternalLogin, GatewayLogin, GatewayLoginDatabase, LoginData, RestLogin,
    RetryPolicy, SmtpAuth, SmtpSecurity,
};
use alarm_message::{
    AlarmValidities, EmailPayload, ExternalPayload, Individual, InfoalarmPayload, LabelCount,
    MessagePayload, RestContent, RestPayload, RestTarget,
};
use alarm_routing::{AlarmMessageDatabase, ToneCode};
use alarm_validity::{MonthlyValidity, SingleTimeValidity, ValidityPredicate, WeekOrdinal, WeeklyValidity};
use chrono::{NaiveDateTime, NaiveTime, Weekday};
use std::collections::BTreeSet;
use std::str::FromStr;

pub fn build_routing_database(raw: &RawAlarmsConfig) -> Result<AlarmMessageDatabase, ConfigError> {
    let mut db = AlarmMessageDatabase::new();

    for (code_str, group) in &raw.code {
        let code = ToneCode::from_str(code_str)
            .map_err(|e| ConfigError::Validation(format!("alarms.code {code_str:?}: {e}")))?;
        let validities = build_validities(group, false)?;
        db.add(code, validities);
    }

    if let Some(group) = &raw.all {
        db.replace_for_all_codes(build_validities(group, true)?);
    }

    if let Some(group) = &raw.fallback {
        db.replace_fallback(build_validities(group, false)?);
    }

    Ok(db)
}

fn build_validities(group: &RawAlarmGroup, allow_infoalarm: bool) -> Result<AlarmValidities, ConfigError> {
    if group.default.is_empty() {
        return Err(ConfigError::Validation(
            "an alarm group must carry at least one default payload".to_string(),
        ));
    }

    let mut entries = Vec::new();
    entries.push((
        ValidityPredicate::Default,
        build_payloads(&group.default, allow_infoalarm)?,
    ));

    for exception in &group.weekly_exceptions {
        entries.push((
            ValidityPredicate::Weekly(build_weekly(exception)?),
            build_payloads(&exception.payloads, allow_infoalarm)?,
        ));
    }
    for exception in &group.monthly_exceptions {
        entries.push((
            ValidityPredicate::Monthly(build_monthly(exception)?),
            build_payloads(&exception.payloads, allow_infoalarm)?,
        ));
    }
    for exception in &group.single_time_exceptions {
        entries.push((
            ValidityPredicate::SingleTime(build_single(exception)?),
            build_payloads(&exception.payloads, allow_infoalarm)?,
        ));
    }

    Ok(AlarmValidities::new(entries)?)
}

fn parse_time(s: &str) -> Result<NaiveTime, ConfigError> {
    NaiveTime::parse_from_str(s, "%H:%M:%S")
        .map_err(|e| ConfigError::Validation(format!("invalid time {s:?}: {e}")))
}

fn parse_local_datetime(s: &str) -> Result<NaiveDateTime, ConfigError> {
    NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S")
        .map_err(|e| ConfigError::Validation(format!("invalid local date-time {s:?}: {e}")))
}

fn parse_weekday(s: &str) -> Result<Weekday, ConfigError> {
    match s.to_ascii_lowercase().as_str() {
        "monday" => Ok(Weekday::Mon),
        "tuesday" => Ok(Weekday::Tue),
        "wednesday" => Ok(Weekday::Wed),
        "thursday" => Ok(Weekday::Thu),
        "friday" => Ok(Weekday::Fri),
        "saturday" => Ok(Weekday::Sat),
        "sunday" => Ok(Weekday::Sun),
        other => Err(ConfigError::Validation(format!("unknown weekday {other:?}"))),
    }
}

fn parse_week_ordinal(s: &str) -> Result<WeekOrdinal, ConfigError> {
    match s.to_ascii_lowercase().as_str() {
        "first" => Ok(WeekOrdinal::First),
        "second" => Ok(WeekOrdinal::Second),
        "third" => Ok(WeekOrdinal::Third),
        "fourth" => Ok(WeekOrdinal::Fourth),
        "last" => Ok(WeekOrdinal::Last),
        other => Err(ConfigError::Validation(format!("unknown week ordinal {other:?}"))),
    }
}

fn build_weekly(exception: &RawWeeklyException) -> Result<WeeklyValidity, ConfigError> {
    let weeks: BTreeSet<WeekOrdinal> = exception
        .weeks
        .iter()
        .map(|w| parse_week_ordinal(w))
        .collect::<Result<_, _>>()?;
    let weekday = parse_weekday(&exception.weekday)?;
    let begin = parse_time(&exception.begin)?;
    let end = parse_time(&exception.end)?;
    Ok(WeeklyValidity::new(weeks, weekday, begin, end)?)
}

fn build_monthly(exception: &RawMonthlyException) -> Result<MonthlyValidity, ConfigError> {
    let begin = parse_time(&exception.begin)?;
    let end = parse_time(&exception.end)?;
    Ok(MonthlyValidity::new(
        exception.day,
        exception.months.iter().copied().collect(),
        begin,
        end,
    )?)
}

fn build_single(exception: &RawSingleTimeException) -> Result<SingleTimeValidity, ConfigError> {
    let begin = parse_local_datetime(&exception.begin)?;
    let end = parse_local_datetime(&exception.end)?;
    Ok(SingleTimeValidity::new(begin, end)?)
}

fn build_payloads(raw: &[RawPayload], allow_infoalarm: bool) -> Result<Vec<MessagePayload>, ConfigError> {
    raw.iter().map(|p| build_payload(p, allow_infoalarm)).collect()
}

fn build_payload(raw: &RawPayload, allow_infoalarm: bool) -> Result<MessagePayload, ConfigError> {
    match raw {
        RawPayload::Empty => Ok(MessagePayload::Empty),
        RawPayload::Email {
            site_id,
            alarm_id,
            recipients,
            body,
            deliver_immediately,
        } => Ok(MessagePayload::Email(EmailPayload {
            site_id: site_id.clone(),
            alarm_id: alarm_id.clone(),
            recipients: recipients.iter().map(|r| (r.name.clone(), r.address.clone())).collect(),
            body: body.clone(),
            deliver_immediately: *deliver_immediately,
        })),
        RawPayload::Rest {
            mode,
            template,
            target_kind,
            labels,
            units,
            scenarios,
            individuals,
            text,
            message_template,
            event_open_hours,
        } => {
            let rest = match mode.as_str() {
                "alarm_template" => {
                    let template = template.clone().ok_or_else(|| {
                        ConfigError::Validation("rest alarm_template payload needs `template`".to_string())
                    })?;
                    RestPayload::new_alarm_template(template, *event_open_hours)?
                }
                "target" => {
                    let target = match target_kind.as_deref() {
                        Some("all_users") => RestTarget::AllUsers,
                        Some("combination") => RestTarget::Combination {
                            labels: labels
                                .iter()
                                .map(|l| LabelCount {
                                    label: l.label.clone(),
                                    count: l.count,
                                })
                                .collect(),
                            units: units.clone(),
                            scenarios: scenarios.clone(),
                            individuals: individuals
                                .iter()
                                .map(|i| Individual {
                                    first_name: i.first_name.clone(),
                                    last_name: i.last_name.clone(),
                                })
                                .collect(),
                        },
                        other => {
                            return Err(ConfigError::Validation(format!(
                                "rest target payload needs target_kind `all_users` or `combination`, got {other:?}"
                            )))
                        }
                    };
                    let content = match (message_template, text) {
                        (Some(t), _) => RestContent::MessageTemplate(t.clone()),
                        (None, Some(t)) => RestContent::Text(t.clone()),
                        (None, None) => {
                            return Err(ConfigError::Validation(
                                "rest target payload needs `text` or `message_template`".to_string(),
                            ))
                        }
                    };
                    RestPayload::new_target(target, content, *event_open_hours)?
                }
                other => {
                    return Err(ConfigError::Validation(format!(
                        "unknown rest payload mode {other:?}, expected alarm_template or target"
                    )))
                }
            };
            Ok(MessagePayload::Rest(rest))
        }
        RawPayload::External { command, arguments } => Ok(MessagePayload::External(ExternalPayload {
            command: command.clone(),
            arguments: arguments.clone(),
        })),
        RawPayload::Infoalarm { inner, siblings } => {
            if !allow_infoalarm {
                return Err(ConfigError::Validation(
                    "infoalarm payloads are only permitted in the all-codes group".to_string(),
                ));
            }
            let inner = build_payload(inner, allow_infoalarm)?;
            let siblings = build_payloads(siblings, allow_infoalarm)?;
            Ok(MessagePayload::Infoalarm(InfoalarmPayload::new(inner, siblings)?))
        }
    }
}

pub fn build_login_database(raw: &RawLoginsConfig) -> Result<GatewayLoginDatabase, ConfigError> {
    let mut db = GatewayLoginDatabase::new();

    if let Some(email) = raw.email.as_ref() {
        db.add(build_email_login(email)?);
    }
    if let Some(rest) = raw.rest.as_ref() {
        db.add(build_rest_login(rest)?);
    }
    if let Some(external) = raw.external.as_ref() {
        db.add(build_external_login(external));
    }

    Ok(db)
}

fn build_retry_policy(raw: &RawRetryPolicy) -> RetryPolicy {
    RetryPolicy {
        max_attempts: raw.retry_max_attempts,
        retry_delay_seconds: raw.retry_delay_seconds,
        max_concurrent_connections: raw.retry_max_concurrent_connections,
    }
}

fn build_email_login(raw: &RawEmailLogin) -> Result<GatewayLogin, ConfigError> {
    let security = match raw.security.as_str() {
        "plain" => SmtpSecurity::Plain,
        "starttls" => SmtpSecurity::StartTls,
        "implicit_tls" => SmtpSecurity::ImplicitTls,
        other => return Err(ConfigError::Validation(format!("unknown smtp security {other:?}"))),
    };
    let auth = match raw.auth_mode.as_str() {
        "none" => SmtpAuth::None,
        "plain" => SmtpAuth::Plain {
            username: raw.username.clone(),
            password: raw.password.clone(),
        },
        "cram_md5" => SmtpAuth::CramMd5 {
            username: raw.username.clone(),
            password: raw.password.clone(),
        },
        other => return Err(ConfigError::Validation(format!("unknown smtp auth mode {other:?}"))),
    };
    Ok(GatewayLogin {
        login: LoginData::Email(EmailLogin {
            smtp_host: raw.smtp_host.clone(),
            smtp_port: raw.smtp_port,
            security,
            auth,
            from_address: raw.from_address.clone(),
        }),
        retry_policy: build_retry_policy(&raw.retry),
    })
}

fn build_rest_login(raw: &RawRestLogin) -> Result<GatewayLogin, ConfigError> {
    Ok(GatewayLogin {
        login: LoginData::Rest(RestLogin {
            base_url: raw.base_url.clone(),
            api_token: raw.api_token.clone(),
            organization_id: raw.organization_id.clone(),
        }),
        retry_policy: build_retry_policy(&raw.retry),
    })
}

fn build_external_login(raw: &RawExternalLogin) -> GatewayLogin {
    GatewayLogin {
        login: LoginData::External(ExternalLogin {
            working_directory: raw.working_directory.clone(),
        }),
        retry_policy: build_retry_policy(&raw.retry),
    }
}

pub fn build(raw: &RawConfig) -> Result<(AlarmMessageDatabase, GatewayLoginDatabase), ConfigError> {
    let routing = build_routing_database(&raw.alarms)?;
    let logins = build_login_database(&raw.logins)?;
    Ok((routing, logins))
}
