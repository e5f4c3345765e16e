use crate::domain::Address;
use std::collections::HashMap;
use thiserror::Error;

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub database_path: String,
    pub starknet_rpc_url: String,
    /// Scope all persisted entities are keyed by.
    pub indexer_name: String,
    pub root_source_address: Address,
    pub root_source_start_block: u64,
    /// Per-pool multipliers; every stability pool is indexed for points.
    pub points_weights_path: String,
    pub flash_loan_event_key: Option<Address>,
    /// Newline-delimited envelopes replayed at startup.
    pub events_path: Option<String>,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnv(String),
    #[error("Invalid value for {0}: {1}")]
    InvalidValue(String, String),
}

fn required(env_map: &HashMap<String, String>, key: &str) -> Result<String, ConfigError> {
    env_map
        .get(key)
        .cloned()
        .ok_or_else(|| ConfigError::MissingEnv(key.to_string()))
}

fn optional(env_map: &HashMap<String, String>, key: &str) -> Option<String> {
    env_map
        .get(key)
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

fn parse_address(key: &str, raw: &str) -> Result<Address, ConfigError> {
    Address::parse(raw.trim()).map_err(|_| {
        ConfigError::InvalidValue(key.to_string(), format!("not a hex or decimal felt: {}", raw))
    })
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_env_map(std::env::vars().collect())
    }

    pub fn from_env_map(env_map: HashMap<String, String>) -> Result<Self, ConfigError> {
        let port = env_map
            .get("PORT")
            .map(|s| s.as_str())
            .unwrap_or("8080")
            .parse::<u16>()
            .map_err(|_| {
                ConfigError::InvalidValue("PORT".to_string(), "must be a valid u16".to_string())
            })?;

        let database_path = required(&env_map, "DATABASE_PATH")?;
        let starknet_rpc_url = required(&env_map, "STARKNET_RPC_URL")?;
        let points_weights_path = optional(&env_map, "POINTS_WEIGHTS_PATH")
            .ok_or_else(|| ConfigError::MissingEnv("POINTS_WEIGHTS_PATH".to_string()))?;

        let indexer_name = optional(&env_map, "INDEXER_NAME").unwrap_or_else(|| "mainnet".to_string());

        let root_source_address =
            parse_address("ROOT_SOURCE_ADDRESS", &required(&env_map, "ROOT_SOURCE_ADDRESS")?)?;

        let root_source_start_block = env_map
            .get("ROOT_SOURCE_START_BLOCK")
            .map(|s| s.as_str())
            .unwrap_or("0")
            .parse::<u64>()
            .map_err(|_| {
                ConfigError::InvalidValue(
                    "ROOT_SOURCE_START_BLOCK".to_string(),
                    "must be a valid u64".to_string(),
                )
            })?;

        let flash_loan_event_key = optional(&env_map, "FLASH_LOAN_EVENT_KEY")
            .map(|raw| parse_address("FLASH_LOAN_EVENT_KEY", &raw))
            .transpose()?;

        Ok(Config {
            port,
            database_path,
            starknet_rpc_url,
            indexer_name,
            root_source_address,
            root_source_start_block,
            points_weights_path,
            flash_loan_event_key,
            events_path: optional(&env_map, "EVENTS_PATH"),
        })
    }
}
