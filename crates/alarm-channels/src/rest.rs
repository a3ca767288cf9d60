//! HTTPS REST alarm service send implementation (component J): a reqwest
//! client posting either a prebuilt alarm template or an ad hoc target
//! description, with status classification following the same
//! success/recoverable/fatal split the other gateways use.

use crate::context::SendContext;
use crate::login::RestLogin;
use alarm_common::SendError;
use alarm_message::{LabelCount, RestContent, RestPayload, RestTarget};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{debug, warn};

#[derive(Debug, Serialize)]
struct AlarmResourcesBody {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    label_ids: Vec<(i64, u32)>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    unit_ids: Vec<i64>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    scenario_ids: Vec<i64>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    user_ids: Vec<i64>,
    all_users: bool,
}

#[derive(Debug, Serialize)]
struct AlarmRequestBody {
    #[serde(rename = "organizationID")]
    organization_id: String,
    #[serde(rename = "startTime")]
    start_time: String,
    #[serde(rename = "eventName")]
    event_name: String,
    #[serde(skip_serializing_if = "Option::is_none", rename = "alarmResourceTemplateID")]
    alarm_resource_template_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", rename = "alarmResources")]
    alarm_resources: Option<AlarmResourcesBody>,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", rename = "alarmTemplateID")]
    alarm_template_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", rename = "scheduledEndTime")]
    scheduled_end_time: Option<String>,
}

#[derive(Debug, Deserialize)]
struct NamedEntity {
    id: i64,
    name: String,
}

#[derive(Debug, Deserialize)]
struct NamedEntityPage {
    entities: Vec<NamedEntity>,
    #[serde(default)]
    has_more: bool,
}

pub struct RestSender {
    client: Client,
}

impl RestSender {
    pub fn new() -> Self {
        Self {
            client: Client::builder()
                .use_rustls_tls()
                .build()
                .expect("reqwest client with rustls builds"),
        }
    }

    /// Resolves a set of user-visible names to opaque IDs by paging through
    /// `{base_url}{endpoint}`. Fails with [`SendError::Fatal`] naming
    /// whichever requested names were never found.
    async fn resolve_names(
        &self,
        login: &RestLogin,
        endpoint: &str,
        names: &[String],
    ) -> Result<HashMap<String, i64>, SendError> {
        let mut resolved = HashMap::new();
        if names.is_empty() {
            return Ok(resolved);
        }

        let mut page = 0u32;
        loop {
            let url = format!("{}{endpoint}?page={page}", login.base_url);
            let response = self
                .client
                .get(&url)
                .header("API-Token", &login.api_token)
                .send()
                .await
                .map_err(classify_transport_error)?;

            if !response.status().is_success() {
                return Err(SendError::Fatal(format!(
                    "name lookup against {url} returned {}",
                    response.status()
                )));
            }

            let page_body: NamedEntityPage = response
                .json()
                .await
                .map_err(|e| SendError::Fatal(format!("could not parse name lookup response: {e}")))?;

            for entity in page_body.entities {
                resolved.insert(entity.name, entity.id);
            }

            if names.iter().all(|n| resolved.contains_key(n)) || !page_body.has_more {
                break;
            }
            page += 1;
        }

        let missing: Vec<&String> = names.iter().filter(|n| !resolved.contains_key(*n)).collect();
        if !missing.is_empty() {
            return Err(SendError::Fatal(format!(
                "could not resolve names: {missing:?}"
            )));
        }

        Ok(resolved)
    }

    async fn build_resources(
        &self,
        login: &RestLogin,
        target: &RestTarget,
    ) -> Result<AlarmResourcesBody, SendError> {
        match target {
            RestTarget::AllUsers => Ok(AlarmResourcesBody {
                label_ids: Vec::new(),
                unit_ids: Vec::new(),
                scenario_ids: Vec::new(),
                user_ids: Vec::new(),
                all_users: true,
            }),
            RestTarget::Combination {
                labels,
                units,
                scenarios,
                individuals,
            } => {
                let label_names: Vec<String> = labels.iter().map(|l: &LabelCount| l.label.clone()).collect();
                let label_lookup = self.resolve_names(login, "/api/v1/labels", &label_names).await?;
                let label_ids = labels
                    .iter()
                    .map(|l| (label_lookup[&l.label], l.count))
                    .collect();

                let unit_lookup = self.resolve_names(login, "/api/v1/units", units).await?;
                let unit_ids = units.iter().map(|u| unit_lookup[u]).collect();

                let scenario_lookup = self.resolve_names(login, "/api/v1/scenarios", scenarios).await?;
                let scenario_ids = scenarios.iter().map(|s| scenario_lookup[s]).collect();

                let individual_names: Vec<String> = individuals
                    .iter()
                    .map(|i| format!("{} {}", i.first_name, i.last_name))
                    .collect();
                let user_lookup = self.resolve_names(login, "/api/v1/users", &individual_names).await?;
                let user_ids = individual_names.iter().map(|n| user_lookup[n]).collect();

                Ok(AlarmResourcesBody {
                    label_ids,
                    unit_ids,
                    scenario_ids,
                    user_ids,
                    all_users: false,
                })
            }
        }
    }

    pub async fn send(
        &self,
        payload: &RestPayload,
        login: &RestLogin,
        ctx: &SendContext,
    ) -> Result<(), SendError> {
        let start_time = ctx.event_time_utc.format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string();
        let scheduled_end_time = if payload.event_open_hours() > 0.0 {
            Some(
                (ctx.event_time_utc + chrono::Duration::milliseconds((payload.event_open_hours() * 3_600_000.0) as i64))
                    .format("%Y-%m-%dT%H:%M:%S%.3fZ")
                    .to_string(),
            )
        } else {
            None
        };

        let body = match payload {
            RestPayload::AlarmTemplate { template, .. } => AlarmRequestBody {
                organization_id: login.organization_id.clone(),
                start_time,
                event_name: ctx.code.clone(),
                alarm_resource_template_id: Some(template.clone()),
                alarm_resources: None,
                message: None,
                alarm_template_id: None,
                scheduled_end_time,
            },
            RestPayload::Target { target, content, .. } => {
                let resources = self.build_resources(login, target).await?;
                let (message, alarm_template_id) = match content {
                    RestContent::Text(text) => (Some(text.clone()), None),
                    RestContent::MessageTemplate(template) => (None, Some(template.clone())),
                };
                AlarmRequestBody {
                    organization_id: login.organization_id.clone(),
                    start_time,
                    event_name: ctx.code.clone(),
                    alarm_resource_template_id: None,
                    alarm_resources: Some(resources),
                    message,
                    alarm_template_id,
                    scheduled_end_time,
                }
            }
        };

        let url = format!("{}/api/v1/alarm", login.base_url);
        debug!(%url, code = %ctx.code, "posting alarm to rest service");

        let response = self
            .client
            .post(&url)
            .header("Content-Type", "application/json")
            .header("API-Token", &login.api_token)
            .json(&body)
            .send()
            .await
            .map_err(classify_transport_error)?;

        if response.status().is_success() {
            Ok(())
        } else {
            warn!(status = %response.status(), %url, "rest alarm service rejected request");
            Err(SendError::Fatal(format!(
                "rest service responded {}",
                response.status()
            )))
        }
    }
}

impl Default for RestSender {
    fn default() -> Self {
        Self::new()
    }
}

fn classify_transport_error(e: reqwest::Error) -> SendError {
    if e.is_connect() {
        SendError::Transient(format!("could not reach rest service: {e}"))
    } else {
        SendError::Fatal(format!("rest service request failed: {e}"))
    }
}
