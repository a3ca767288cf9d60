//! Configuration loader with file discovery and environment variable
//! overrides. Grounded on `fc-config/src/loader.rs`'s search-path and
//! override pattern, renamed to the `ALARMGW_*` prefix and narrowed to the
//! secrets the original's config loader flagged as override-worthy.

use crate::schema::RawConfig;
use crate::ConfigError;
use std::env;
use std::path::PathBuf;
use tracing::info;

const CONFIG_PATHS: &[&str] = &[
    "alarmgw.toml",
    "config.toml",
    "./config/alarmgw.toml",
    "/etc/alarmgw/alarmgw.toml",
];

pub struct ConfigLoader {
    config_path: Option<PathBuf>,
}

impl ConfigLoader {
    pub fn new() -> Self {
        Self { config_path: None }
    }

    pub fn with_path<P: Into<PathBuf>>(path: P) -> Self {
        Self {
            config_path: Some(path.into()),
        }
    }

    pub fn load(&self) -> Result<RawConfig, ConfigError> {
        let mut config = match self.find_config_file() {
            Some(path) => {
                info!(?path, "loading configuration from file");
                let content = std::fs::read_to_string(&path)?;
                toml::from_str(&content)?
            }
            None => RawConfig::default(),
        };
        self.apply_env_overrides(&mut config);
        Ok(config)
    }

    fn find_config_file(&self) -> Option<PathBuf> {
        if let Some(path) = &self.config_path {
            if path.exists() {
                return Some(path.clone());
            }
        }
        if let Ok(path) = env::var("ALARMGW_CONFIG") {
            let path = PathBuf::from(path);
            if path.exists() {
                return Some(path);
            }
        }
        for path in CONFIG_PATHS {
            let path = PathBuf::from(path);
            if path.exists() {
                return Some(path);
            }
        }
        None
    }

    fn apply_env_overrides(&self, config: &mut RawConfig) {
        if let Some(email) = config.logins.email.as_mut() {
            if let Ok(val) = env::var("ALARMGW_LOGINS_EMAIL_USERNAME") {
                email.username = val;
            }
            if let Ok(val) = env::var("ALARMGW_LOGINS_EMAIL_PASSWORD") {
                email.password = val;
            }
            if let Ok(val) = env::var("ALARMGW_LOGINS_EMAIL_SMTP_HOST") {
                email.smtp_host = val;
            }
        }
        if let Some(rest) = config.logins.rest.as_mut() {
            if let Ok(val) = env::var("ALARMGW_LOGINS_REST_API_TOKEN") {
                rest.api_token = val;
            }
            if let Ok(val) = env::var("ALARMGW_LOGINS_REST_BASE_URL") {
                rest.base_url = val;
            }
            if let Ok(val) = env::var("ALARMGW_LOGINS_REST_ORGANIZATION_ID") {
                rest.organization_id = val;
            }
        }
        if let Ok(val) = env::var("ALARMGW_PROTOCOL_DEFAULT") {
            if let Ok(flag) = val.parse() {
                config.protocol.default = flag;
            }
        }
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn loads_defaults_when_no_file_present() {
        let loader = ConfigLoader::with_path("/nonexistent/path/alarmgw.toml");
        let config = loader.load().unwrap();
        assert!(config.logins.email.is_none());
    }

    #[test]
    fn env_override_replaces_password_after_file_load() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
            [logins.email]
            smtp_host = "smtp.example.org"
            smtp_port = 587
            security = "starttls"
            auth_mode = "plain"
            username = "alice"
            password = "from-file"
            from_address = "alarm@example.org"
            retry_max_attempts = 3
            retry_delay_seconds = 30
            retry_max_concurrent_connections = 2
            "#
        )
        .unwrap();

        std::env::set_var("ALARMGW_LOGINS_EMAIL_PASSWORD", "from-env");
        let loader = ConfigLoader::with_path(file.path());
        let config = loader.load().unwrap();
        std::env::remove_var("ALARMGW_LOGINS_EMAIL_PASSWORD");

        assert_eq!(config.logins.email.unwrap().password, "from-env");
    }
}
