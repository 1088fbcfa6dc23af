use serde::Deserialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Profile {
    Development,
    Staging,
    Production,
}

impl Profile {
    pub fn from_env() -> Self {
        std::env::var("APP_PROFILE")
            .ok()
            .and_then(|s| match s.to_lowercase().as_str() {
                "development" | "dev" => Some(Self::Development),
                "staging" | "stage" => Some(Self::Staging),
                "production" | "prod" => Some(Self::Production),
                _ => None,
            })
            .unwrap_or(Self::Development)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Development => "development",
            Self::Staging => "staging",
            Self::Production => "production",
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct ProfileDefaults {
    pub server_port: u16,
    pub database_url: Option<String>,
    pub callback_poll_interval_secs: u64,
    pub callback_timeout_secs: u64,
}

impl ProfileDefaults {
    pub fn for_profile(profile: Profile) -> Self {
        match profile {
            Profile::Development => Self {
                server_port: 3000,
                database_url: Some("sqlite://forwarder-dev.db".to_string()),
                callback_poll_interval_secs: 5,
                callback_timeout_secs: 10,
            },
            Profile::Staging => Self {
                server_port: 8080,
                database_url: None,
                callback_poll_interval_secs: 15,
                callback_timeout_secs: 10,
            },
            Profile::Production => Self {
                server_port: 8080,
                database_url: None,
                callback_poll_interval_secs: 30,
                callback_timeout_secs: 10,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_profile_as_str() {
        assert_eq!(Profile::Development.as_str(), "development");
        assert_eq!(Profile::Staging.as_str(), "staging");
        assert_eq!(Profile::Production.as_str(), "production");
    }

    #[test]
    fn test_development_defaults_carry_database_url() {
        let defaults = ProfileDefaults::for_profile(Profile::Development);
        assert_eq!(defaults.server_port, 3000);
        assert!(defaults.database_url.is_some());
        assert_eq!(defaults.callback_poll_interval_secs, 5);
    }

    #[test]
    fn test_deployed_profiles_require_explicit_database_url() {
        assert!(ProfileDefaults::for_profile(Profile::Staging)
            .database_url
            .is_none());
        assert!(ProfileDefaults::for_profile(Profile::Production)
            .database_url
            .is_none());
    }

    #[test]
    fn test_production_polls_slower_than_development() {
        let dev = ProfileDefaults::for_profile(Profile::Development);
        let prod = ProfileDefaults::for_profile(Profile::Production);
        assert!(prod.callback_poll_interval_secs > dev.callback_poll_interval_secs);
    }
}
