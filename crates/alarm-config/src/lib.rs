//! Configuration loading (component K): reads a TOML file into
//! [`schema::RawConfig`], applies `ALARMGW_*` environment overrides for
//! gateway secrets, then builds the routing and login databases while
//! enforcing the same construction-time invariants the domain types already
//! carry.

mod build;
mod loader;
pub mod schema;

pub use build::{build, build_login_database, build_routing_database};
pub use loader::ConfigLoader;
pub use schema::RawConfig;

/// Errors raised while loading or building configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Read(#[from] std::io::Error),

    #[error("failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid configuration: {0}")]
    Validation(String),

    #[error(transparent)]
    Model(#[from] alarm_common::ModelError),
}
