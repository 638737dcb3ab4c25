use crate::error::{Error, Result};
use std::env;
use std::time::Duration;

pub const DEFAULT_CIRCLECI_API_URL: &str = "https://circleci.com/api/v2/";
pub const DEFAULT_ATHENIAN_API_URL: &str = "https://api.athenian.co/v1/";

#[derive(Debug, Clone)]
pub struct Config {
    pub circleci_token: String,
    pub athenian_token: String,
    pub circleci_api_url: String,
    pub athenian_api_url: String,
    pub batch_size: usize,
    pub max_attempts: u32,
    pub throttle_budget_secs: u64,
    pub delivery_attempts: u32,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let circleci_token = required("CIRCLECI_TOKEN")?;
        let athenian_token = required("ATHENIAN_TOKEN")?;

        let circleci_api_url = env::var("CIRCLECI_API_URL")
            .unwrap_or_else(|_| DEFAULT_CIRCLECI_API_URL.to_string());

        let athenian_api_url = env::var("ATHENIAN_API_URL")
            .unwrap_or_else(|_| DEFAULT_ATHENIAN_API_URL.to_string());

        let batch_size = env::var("EXPORT_BATCH_SIZE")
            .ok()
            .and_then(|v| v.parse().ok())
            .filter(|&size: &usize| size > 0)
            .unwrap_or(100);

        let max_attempts = env::var("EXPORT_MAX_ATTEMPTS")
            .ok()
            .and_then(|v| v.parse().ok())
            .filter(|&n: &u32| n > 0)
            .unwrap_or(10);

        let throttle_budget_secs = env::var("EXPORT_THROTTLE_BUDGET_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(900);

        let delivery_attempts = env::var("EXPORT_DELIVERY_ATTEMPTS")
            .ok()
            .and_then(|v| v.parse().ok())
            .filter(|&n: &u32| n > 0)
            .unwrap_or(5);

        Ok(Self {
            circleci_token,
            athenian_token,
            circleci_api_url,
            athenian_api_url,
            batch_size,
            max_attempts,
            throttle_budget_secs,
            delivery_attempts,
        })
    }
}

fn required(name: &str) -> Result<String> {
    match env::var(name) {
        Ok(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(Error::Config(format!(
            "Must set {} environment variable",
            name
        ))),
    }
}

/// Tunables shared by the collector and the relay.
#[derive(Debug, Clone)]
pub struct ExportConfig {
    pub batch_size: usize,
    pub max_attempts: u32,
    pub cooldown: Duration,
    pub throttle_budget: Duration,
    pub delivery_attempts: u32,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            batch_size: 100,
            max_attempts: 10,
            cooldown: Duration::from_secs(60),
            throttle_budget: Duration::from_secs(900),
            delivery_attempts: 5,
        }
    }
}

impl From<&Config> for ExportConfig {
    fn from(config: &Config) -> Self {
        Self {
            batch_size: config.batch_size,
            max_attempts: config.max_attempts,
            throttle_budget: Duration::from_secs(config.throttle_budget_secs),
            delivery_attempts: config.delivery_attempts,
            ..Self::default()
        }
    }
}
