use std::env;
use std::time::Duration;

use log::{debug, error, info};

use crate::error::{BotError, Result};

const DEFAULT_NICKNAMES: &str = "奶茶,小奶茶";
const DEFAULT_COMMAND_PREFIX: &str = "/";
const DEFAULT_PROMPT_TIMEOUT_SECS: u64 = 300;

#[derive(Debug, Clone)]
pub struct Config {
    pub discord_token: String,
    pub tuling_api_keys: Vec<String>,
    pub tuling_api_url: Option<String>,
    pub ltp_cloud_api_key: Option<String>,
    pub nicknames: Vec<String>,
    pub command_prefix: String,
    pub prompt_timeout: Duration,
    pub pending_session_ttl: Option<Duration>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        debug!("Loading configuration from environment");
        dotenvy::dotenv().ok();

        let discord_token = env::var("DISCORD_TOKEN").map_err(|e| {
            error!("Failed to load DISCORD_TOKEN from environment: {e}");
            e
        })?;

        let tuling_api_keys = env::var("TULING_API_KEYS").map_err(|e| {
            error!("Failed to load TULING_API_KEYS from environment: {e}");
            e
        })?;
        let tuling_api_keys = split_list(&tuling_api_keys);
        if tuling_api_keys.is_empty() {
            error!("TULING_API_KEYS does not contain any key");
            return Err(BotError::Config(
                "TULING_API_KEYS must contain at least one key".to_string(),
            ));
        }

        let tuling_api_url = optional_var("TULING_API_URL");
        let ltp_cloud_api_key = optional_var("LTP_CLOUD_API_KEY");

        let nicknames = split_list(
            &optional_var("BOT_NICKNAMES").unwrap_or_else(|| DEFAULT_NICKNAMES.to_string()),
        );
        let command_prefix =
            optional_var("COMMAND_PREFIX").unwrap_or_else(|| DEFAULT_COMMAND_PREFIX.to_string());

        let prompt_timeout = optional_secs("PROMPT_TIMEOUT_SECS")?
            .unwrap_or(Duration::from_secs(DEFAULT_PROMPT_TIMEOUT_SECS));
        let pending_session_ttl = optional_secs("PENDING_SESSION_TTL_SECS")?;

        info!("Configuration loaded successfully");
        debug!("Discord token length: {} characters", discord_token.len());
        debug!("Tuling key pool size: {}", tuling_api_keys.len());
        debug!(
            "LTP cloud lexer: {}",
            if ltp_cloud_api_key.is_some() {
                "enabled"
            } else {
                "disabled"
            }
        );
        debug!("Nicknames: {nicknames:?}");
        debug!("Command prefix: {command_prefix}");
        debug!("Prompt timeout: {prompt_timeout:?}");
        debug!("Pending session TTL: {pending_session_ttl:?}");

        Ok(Self {
            discord_token,
            tuling_api_keys,
            tuling_api_url,
            ltp_cloud_api_key,
            nicknames,
            command_prefix,
            prompt_timeout,
            pending_session_ttl,
        })
    }
}

fn optional_var(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn optional_secs(name: &str) -> Result<Option<Duration>> {
    optional_var(name)
        .map(|value| parse_secs(name, &value))
        .transpose()
}

fn parse_secs(name: &str, value: &str) -> Result<Duration> {
    value.parse::<u64>().map(Duration::from_secs).map_err(|e| {
        error!("Invalid value for {name}: {value} ({e})");
        BotError::Config(format!("{name} must be a number of seconds, got '{value}'"))
    })
}

/// Splits a comma-separated list, preserving order and dropping blanks.
fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(ToString::to_string)
        .collect()
}
