use figment::{
    providers::{Env, Format, Json},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{FleetError, Result};

pub const DEFAULT_API_PORT: u16 = 7070;
pub const DEFAULT_MESSAGE_ENCODING: &str = "GBK";
pub const DEFAULT_CONFIG_PATH: &str = "data/config.json";
pub const DEFAULT_PROMPT_PATH: &str = "data/prompt.md";

/// Bot admission policy for the connection queue (C5).
///
/// `Queued` admits at most one per-destination bot at a time; `Aggressive`
/// admits every eligible bot in the same cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionPolicy {
    Queued = 0,
    Aggressive = 1,
}

impl Default for ConnectionPolicy {
    fn default() -> Self {
        ConnectionPolicy::Queued
    }
}

/// Top-level config (`data/config.json` + `BOTFLEET_*` env overrides).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BotFleetConfig {
    #[serde(default = "default_api_port")]
    pub api_port: u16,
    #[serde(default)]
    pub connection_policy: ConnectionPolicy,
    #[serde(default = "default_message_encoding")]
    pub message_encoding: String,
    #[serde(default = "default_db_path")]
    pub database_path: String,
}

impl Default for BotFleetConfig {
    fn default() -> Self {
        Self {
            api_port: default_api_port(),
            connection_policy: ConnectionPolicy::default(),
            message_encoding: default_message_encoding(),
            database_path: default_db_path(),
        }
    }
}

fn default_api_port() -> u16 {
    DEFAULT_API_PORT
}
fn default_message_encoding() -> String {
    DEFAULT_MESSAGE_ENCODING.to_string()
}
fn default_db_path() -> String {
    "data/botfleet.db".to_string()
}

impl BotFleetConfig {
    /// Load config from the JSON file at `path` (default `data/config.json`),
    /// creating it with defaults if absent, with `BOTFLEET_*` env var
    /// overrides layered on top.
    pub fn load(config_path: Option<&str>) -> Result<Self> {
        let path = config_path.unwrap_or(DEFAULT_CONFIG_PATH);

        if !Path::new(path).exists() {
            let defaults = BotFleetConfig::default();
            if let Some(parent) = Path::new(path).parent() {
                std::fs::create_dir_all(parent)?;
            }
            let json = serde_json::to_string_pretty(&defaults)?;
            std::fs::write(path, json)?;
        }

        let config: BotFleetConfig = Figment::new()
            .merge(Json::file(path))
            .merge(Env::prefixed("BOTFLEET_"))
            .extract()
            .map_err(|e| FleetError::Config(e.to_string()))?;

        Ok(config)
    }
}

/// Load the base LLM system prompt from `data/prompt.md` verbatim.
///
/// Falls back to an empty string if the file doesn't exist yet so first-run
/// bootstrapping doesn't need to ship a seed file.
pub fn load_base_prompt(path: Option<&str>) -> Result<String> {
    let path = path.unwrap_or(DEFAULT_PROMPT_PATH);
    match std::fs::read_to_string(path) {
        Ok(contents) => Ok(contents),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(String::new()),
        Err(e) => Err(e.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_matches_spec_defaults() {
        let cfg = BotFleetConfig::default();
        assert_eq!(cfg.api_port, 7070);
        assert_eq!(cfg.connection_policy, ConnectionPolicy::Queued);
        assert_eq!(cfg.message_encoding, "GBK");
    }

    #[test]
    fn missing_prompt_file_yields_empty_string() {
        let prompt = load_base_prompt(Some("data/__does_not_exist__.md")).unwrap();
        assert_eq!(prompt, "");
    }
}
