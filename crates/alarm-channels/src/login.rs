//! Gateway login database (component F): per gateway-kind credentials and
//! retry policy.

use alarm_common::GatewayKind;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SmtpSecurity {
    Plain,
    StartTls,
    ImplicitTls,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SmtpAuth {
    None,
    Plain { username: String, password: String },
    CramMd5 { username: String, password: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmailLogin {
    pub smtp_host: String,
    pub smtp_port: u16,
    pub security: SmtpSecurity,
    pub auth: SmtpAuth,
    pub from_address: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RestLogin {
    pub base_url: String,
    pub api_token: String,
    pub organization_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExternalLogin {
    pub working_directory: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum LoginData {
    Email(EmailLogin),
    Rest(RestLogin),
    External(ExternalLogin),
}

impl LoginData {
    pub fn kind(&self) -> GatewayKind {
        match self {
            LoginData::Email(_) => GatewayKind::Email,
            LoginData::Rest(_) => GatewayKind::Rest,
            LoginData::External(_) => GatewayKind::External,
        }
    }
}

/// Per gateway-kind retry policy: how many attempts, how long to wait
/// between them, and how many workers a connection manager runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub retry_delay_seconds: u64,
    pub max_concurrent_connections: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatewayLogin {
    pub login: LoginData,
    pub retry_policy: RetryPolicy,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GatewayLoginDatabase {
    entries: HashMap<GatewayKind, GatewayLogin>,
}

impl GatewayLoginDatabase {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, login: GatewayLogin) {
        self.entries.insert(login.login.kind(), login);
    }

    pub fn search(&self, kind: GatewayKind) -> Option<GatewayLogin> {
        self.entries.get(&kind).cloned()
    }

    pub fn kinds(&self) -> Vec<GatewayKind> {
        self.entries.keys().copied().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn search_returns_clone_keyed_by_kind() {
        let mut db = GatewayLoginDatabase::new();
        db.add(GatewayLogin {
            login: LoginData::External(ExternalLogin {
                working_directory: None,
            }),
            retry_policy: RetryPolicy {
                max_attempts: 3,
                retry_delay_seconds: 30,
                max_concurrent_connections: 2,
            },
        });
        assert!(db.search(GatewayKind::External).is_some());
        assert!(db.search(GatewayKind::Email).is_none());
    }
}
