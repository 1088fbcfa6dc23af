pub mod profiles;

use dotenvy::dotenv;
use profiles::{Profile, ProfileDefaults};
use serde::Deserialize;
use std::env;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub server_port: u16,
    pub database_url: String,
    pub callback_poll_interval_secs: u64,
    pub callback_timeout_secs: u64,
}

pub struct ConfigInfo {
    pub config: Config,
    pub profile: Profile,
    pub overrides: Vec<String>,
}

impl Config {
    pub fn from_env() -> anyhow::Result<ConfigInfo> {
        dotenv().ok();

        let profile = Profile::from_env();
        let defaults = ProfileDefaults::for_profile(profile);
        let mut overrides = Vec::new();

        let server_port = env::var("SERVER_PORT")
            .ok()
            .and_then(|v| {
                overrides.push("SERVER_PORT".to_string());
                v.parse().ok()
            })
            .unwrap_or(defaults.server_port);

        let database_url = env::var("DATABASE_URL").or_else(|_| {
            defaults
                .database_url
                .ok_or_else(|| anyhow::anyhow!("DATABASE_URL must be set"))
        })?;
        if env::var("DATABASE_URL").is_ok() {
            overrides.push("DATABASE_URL".to_string());
        }

        let callback_poll_interval_secs = env::var("CALLBACK_POLL_INTERVAL_SECS")
            .ok()
            .and_then(|v| {
                overrides.push("CALLBACK_POLL_INTERVAL_SECS".to_string());
                v.parse().ok()
            })
            .unwrap_or(defaults.callback_poll_interval_secs);

        let callback_timeout_secs = env::var("CALLBACK_TIMEOUT_SECS")
            .ok()
            .and_then(|v| {
                overrides.push("CALLBACK_TIMEOUT_SECS".to_string());
                v.parse().ok()
            })
            .unwrap_or(defaults.callback_timeout_secs);

        Ok(ConfigInfo {
            config: Config {
                server_port,
                database_url,
                callback_poll_interval_secs,
                callback_timeout_secs,
            },
            profile,
            overrides,
        })
    }
}
